//! Non-dispatchable stake logic: escrow accounts, reward settlement, tier
//! recomputation, lock/queue bookkeeping and the end-of-block workers.

use frame_support::{
    pallet_prelude::*,
    traits::{Currency, ExistenceRequirement::AllowDeath},
};
use frame_system::pallet_prelude::BlockNumberFor;
use pallet_reputation::{OnReputationUpdate, Score};
use sp_runtime::traits::{AccountIdConversion, One, SaturatedConversion, Saturating, Zero};
use sp_std::prelude::*;

use super::pallet::*;
use super::PALLET_ID;
use crate::{
    log,
    rewards::{member_weight, PoolKind},
    pool_share, LockKind, SlashReason, StakeLedger, StakeOf, Tier, UnbondingRequest,
};

impl<T: Config> Pallet<T> {
    /// The escrow holding all staked and unbonding funds.
    pub fn escrow_account() -> T::AccountId {
        PALLET_ID.into_account_truncating()
    }

    /// The account holding distributed-but-unclaimed rewards.
    pub fn reward_account() -> T::AccountId {
        PALLET_ID.into_sub_account_truncating(b"reward")
    }

    /// The recovery reserve fed by escrow fees.
    pub fn reserve_account() -> T::AccountId {
        PALLET_ID.into_sub_account_truncating(b"reserve")
    }

    /// Current balance of the recovery reserve.
    pub fn reserve_balance() -> StakeOf<T> {
        T::Currency::free_balance(&Self::reserve_account())
    }

    /// Staked amount of `who`, zero if no record.
    pub fn staked(who: &T::AccountId) -> StakeOf<T> {
        Ledgers::<T>::get(who).map(|l| l.staked).unwrap_or_default()
    }

    /// Cached tier of `who`.
    pub fn tier_of(who: &T::AccountId) -> Tier {
        Ledgers::<T>::get(who).map(|l| l.tier).unwrap_or_default()
    }

    /// Blocks since `who` first staked, `None` without a record.
    pub fn stake_age(who: &T::AccountId) -> Option<BlockNumberFor<T>> {
        let now = <frame_system::Pallet<T>>::block_number();
        Ledgers::<T>::get(who).map(|l| now.saturating_sub(l.staked_at))
    }

    /// Whether `who` carries an active Ban lock.
    pub fn is_banned(who: &T::AccountId) -> bool {
        let now = <frame_system::Pallet<T>>::block_number();
        Locks::<T>::get(who, LockKind::Ban)
            .map(|state| state.is_active(now))
            .unwrap_or(false)
    }

    /// Whether any lock currently binds `who`.
    pub fn has_active_lock(who: &T::AccountId) -> bool {
        let now = <frame_system::Pallet<T>>::block_number();
        Locks::<T>::iter_prefix(who).any(|(_, state)| state.is_active(now))
    }

    pub(crate) fn ensure_not_banned(who: &T::AccountId) -> DispatchResult {
        ensure!(!Self::is_banned(who), Error::<T>::Banned);
        Ok(())
    }

    pub(crate) fn ensure_authorized(who: &T::AccountId) -> DispatchResult {
        ensure!(
            AuthorizedModules::<T>::contains_key(who),
            Error::<T>::NotAuthorized
        );
        Ok(())
    }

    /// Recompute the cached tier from the current thresholds, emitting
    /// `TierChanged` when it moves.
    pub(crate) fn retier(
        who: &T::AccountId,
        ledger: &mut StakeLedger<StakeOf<T>, BlockNumberFor<T>>,
    ) {
        let params = Params::<T>::get();
        let new = Tier::for_stake(&params.tier_thresholds, ledger.staked);
        if new != ledger.tier {
            let old = ledger.tier;
            ledger.tier = new;
            Self::deposit_event(Event::TierChanged { account: who.clone(), old, new });
        }
    }

    /// Settle `who`'s standing in all three pools: move accrued rewards into
    /// `pending_rewards` at the *old* weight snapshot, then re-snapshot the
    /// weight from the current stake, tier, reputation and ban state.
    pub(crate) fn settle_ledger(
        who: &T::AccountId,
        ledger: &mut StakeLedger<StakeOf<T>, BlockNumberFor<T>>,
    ) {
        let params = Params::<T>::get();
        let score = pallet_reputation::Pallet::<T>::score(who);
        let banned = Self::is_banned(who);

        let stake: u128 = ledger.staked.saturated_into();
        let base_weight = member_weight(stake, ledger.tier.multiplier(&params), *score);

        let mut owed: u128 = 0;
        Pools::<T>::mutate(|pools| {
            for kind in PoolKind::ALL {
                let eligible_weight = match kind {
                    PoolKind::Staker => base_weight,
                    PoolKind::Validator if ledger.is_validator && !banned => base_weight,
                    PoolKind::Governance
                        if score >= params.governance_reward_threshold && !banned =>
                    {
                        base_weight
                    },
                    _ => 0,
                };

                let pool = pools.pool_mut(kind);
                let snapshot = &mut ledger.snapshots[kind.index()];
                owed = owed.saturating_add(pool.owed(snapshot.weight, snapshot.checkpoint));
                pool.total_weight = pool
                    .total_weight
                    .saturating_sub(snapshot.weight)
                    .saturating_add(eligible_weight);
                snapshot.weight = eligible_weight;
                snapshot.checkpoint = pool.acc_per_weight;
            }
        });

        if owed > 0 {
            let owed: StakeOf<T> = owed.saturated_into();
            ledger.pending_rewards = ledger.pending_rewards.saturating_add(owed);
            TotalPendingRewards::<T>::mutate(|total| *total = total.saturating_add(owed));
        }
        ledger.last_reward_epoch = CurrentEpoch::<T>::get();
    }

    /// Settle a ledger in place in storage; no-op for unknown accounts.
    pub fn settle(who: &T::AccountId) {
        if let Some(mut ledger) = Ledgers::<T>::get(who) {
            Self::settle_ledger(who, &mut ledger);
            Ledgers::<T>::insert(who, ledger);
        }
    }

    /// Split a treasury transfer across the sub-pools and fold it into the
    /// accumulators.
    pub(crate) fn inject_distribution(amount: StakeOf<T>) {
        let params = Params::<T>::get();
        let amount: u128 = amount.saturated_into();
        let staker = pool_share(amount, params.staker_pool_pct);
        let validator = pool_share(amount, params.validator_pool_pct);
        // integer dust from the two floors lands in the governance share
        let governance = amount.saturating_sub(staker).saturating_sub(validator);

        Pools::<T>::mutate(|pools| {
            let mut attributed = 0u128;
            attributed += pools.pool_mut(PoolKind::Staker).inject(staker);
            attributed += pools.pool_mut(PoolKind::Validator).inject(validator);
            attributed += pools.pool_mut(PoolKind::Governance).inject(governance);
            pools.distributed_this_epoch = pools.distributed_this_epoch.saturating_add(attributed);
        });
    }

    /// Add (or deepen) a lock of `kind` on `who`.
    pub fn lock(
        who: &T::AccountId,
        kind: LockKind,
        expires_at: Option<BlockNumberFor<T>>,
    ) -> DispatchResult {
        let now = <frame_system::Pallet<T>>::block_number();
        if let Some(expiry) = expires_at {
            ensure!(expiry > now, Error::<T>::InvalidExpiry);
            LockExpiry::<T>::try_mutate(expiry, |bucket| {
                bucket
                    .try_push((who.clone(), kind))
                    .map_err(|_| Error::<T>::ScheduleFull)
            })?;
        }

        Locks::<T>::mutate(who, kind, |state| match state {
            Some(existing) if existing.is_active(now) => {
                existing.count = existing.count.saturating_add(1);
                existing.expires_at = match (existing.expires_at, expires_at) {
                    (None, _) | (_, None) => None,
                    (Some(a), Some(b)) => Some(a.max(b)),
                };
            },
            _ => {
                *state = Some(crate::LockState { count: 1, expires_at });
            },
        });

        Self::deposit_event(Event::LockAdded { account: who.clone(), kind, expires_at });
        Ok(())
    }

    /// Release one hold of a lock; removes the entry when the count hits zero.
    pub fn unlock(who: &T::AccountId, kind: LockKind) {
        let mut released = false;
        Locks::<T>::mutate_exists(who, kind, |state| {
            if let Some(existing) = state {
                existing.count = existing.count.saturating_sub(1);
                if existing.count == 0 {
                    *state = None;
                    released = true;
                }
            }
        });
        if released {
            Self::deposit_event(Event::LockReleased { account: who.clone(), kind });
        }
    }

    /// Ban `who` until `until` (`None` = permanent). Settles eligibility so
    /// the validator/governance weights drop immediately.
    pub fn ban(who: &T::AccountId, until: Option<BlockNumberFor<T>>) -> DispatchResult {
        Self::lock(who, LockKind::Ban, until)?;
        Self::settle(who);
        Ok(())
    }

    /// Slash up to `amount` directly out of `who`'s stake, paying the
    /// proceeds to `beneficiary`. Returns the amount actually taken.
    ///
    /// Commitments are trimmed afterwards if the reduced stake no longer
    /// covers them, keeping the trust-ceiling invariant intact.
    pub fn slash_stake(
        who: &T::AccountId,
        amount: StakeOf<T>,
        beneficiary: &T::AccountId,
        reason: SlashReason,
    ) -> StakeOf<T> {
        let Some(mut ledger) = Ledgers::<T>::get(who) else {
            return Zero::zero();
        };
        let actual = amount.min(ledger.staked);
        if actual.is_zero() {
            return Zero::zero();
        }

        if let Err(error) =
            T::Currency::transfer(&Self::escrow_account(), beneficiary, actual, AllowDeath)
        {
            // conservation guarantees the escrow can cover every slash
            log!(error, "escrow transfer failed during slash: {:?}", error);
            return Zero::zero();
        }
        ledger.staked = ledger.staked.saturating_sub(actual);
        TotalStaked::<T>::mutate(|total| *total = total.saturating_sub(actual));

        Self::trim_commitments(who, ledger.staked);
        Self::retier(who, &mut ledger);
        Self::settle_ledger(who, &mut ledger);
        Ledgers::<T>::insert(who, ledger);

        Self::deposit_event(Event::Slashed {
            account: who.clone(),
            amount: actual,
            reason,
            beneficiary: beneficiary.clone(),
        });
        actual
    }

    /// Debit up to `amount` from `who`'s bank balance into `to`. Returns the
    /// amount actually moved. Used by the recovery clawback.
    pub fn claw_from_bank(
        who: &T::AccountId,
        amount: StakeOf<T>,
        to: &T::AccountId,
    ) -> StakeOf<T> {
        let available = T::Currency::free_balance(who);
        let actual = amount.min(available);
        if actual.is_zero() {
            return Zero::zero();
        }
        match T::Currency::transfer(who, to, actual, AllowDeath) {
            Ok(()) => actual,
            Err(_) => Zero::zero(),
        }
    }

    /// Pay up to `amount` out of the recovery reserve into `to`. Returns the
    /// amount actually paid.
    pub fn pay_from_reserve(to: &T::AccountId, amount: StakeOf<T>) -> StakeOf<T> {
        let actual = amount.min(Self::reserve_balance());
        if actual.is_zero() {
            return Zero::zero();
        }
        match T::Currency::transfer(&Self::reserve_account(), to, actual, AllowDeath) {
            Ok(()) => actual,
            Err(_) => Zero::zero(),
        }
    }

    /// Accounts eligible to moderate a dispute of the given size: stake at or
    /// above the disputed value, tier at or above the minimum, reputation at
    /// or above `min_score`, and no active ban.
    pub fn candidates(
        min_stake: StakeOf<T>,
        min_tier: Tier,
        min_score: Score,
    ) -> Vec<T::AccountId> {
        Ledgers::<T>::iter()
            .filter(|(who, ledger)| {
                ledger.staked >= min_stake
                    && ledger.tier >= min_tier
                    && pallet_reputation::Pallet::<T>::score(who) >= min_score
                    && !Self::is_banned(who)
            })
            .map(|(who, _)| who)
            .collect()
    }

    /// Remove the ledger once nothing references it any more.
    pub(crate) fn try_reap(who: &T::AccountId) {
        let Some(ledger) = Ledgers::<T>::get(who) else {
            return;
        };
        if !ledger.is_empty()
            || Unbonding::<T>::contains_key(who)
            || Commitments::<T>::iter_prefix(who).next().is_some()
            || Locks::<T>::iter_prefix(who).next().is_some()
        {
            return;
        }

        Ledgers::<T>::remove(who);
        Committed::<T>::remove(who);
        pallet_reputation::Pallet::<T>::remove_account(who);
    }

    /// Reduce commitments (in iteration order) until they fit under `staked`.
    fn trim_commitments(who: &T::AccountId, staked: StakeOf<T>) {
        let mut committed = Committed::<T>::get(who);
        if committed <= staked {
            return;
        }

        let entries: Vec<_> = Commitments::<T>::iter_prefix(who).collect();
        for (key, mut commitment) in entries {
            if committed <= staked {
                break;
            }
            let excess = committed.saturating_sub(staked);
            let cut = commitment.amount.min(excess);
            commitment.amount = commitment.amount.saturating_sub(cut);
            committed = committed.saturating_sub(cut);
            if commitment.amount.is_zero() {
                Commitments::<T>::remove(who, key);
                Self::deposit_event(Event::CommitmentReleased {
                    account: who.clone(),
                    kind: key.0,
                    reference: key.1,
                });
            } else {
                Commitments::<T>::insert(who, key, commitment);
            }
        }
        Committed::<T>::insert(who, committed);
    }

    /// Pay out one matured withdrawal.
    pub(crate) fn pay_out_unbonding(
        who: &T::AccountId,
        request: &UnbondingRequest<StakeOf<T>, BlockNumberFor<T>>,
    ) -> DispatchResult {
        T::Currency::transfer(&Self::escrow_account(), who, request.amount, AllowDeath)?;
        TotalUnbonding::<T>::mutate(|total| *total = total.saturating_sub(request.amount));
        Unbonding::<T>::remove(who);

        Self::deposit_event(Event::UnbondingCompleted {
            account: who.clone(),
            amount: request.amount,
        });
        Self::try_reap(who);
        Ok(())
    }

    // ---- end-of-block workers -------------------------------------------------

    /// Fixed-order bounded housekeeping, shared across a single work budget:
    /// unbonding queue, lock expiry (bans included), commitment expiry, epoch
    /// roll, reputation sweep, post-parameter-change tier sweep.
    pub(crate) fn do_housekeeping(now: BlockNumberFor<T>) -> Weight {
        let params = Params::<T>::get();
        let mut budget = params.work_budget;

        budget = budget.saturating_sub(Self::advance_unbonding_queue(now, budget));
        budget = budget.saturating_sub(Self::sweep_lock_expiries(now, budget));
        budget = budget.saturating_sub(Self::sweep_commitment_expiries(now, budget));

        if !params.epoch_length.is_zero() && (now % params.epoch_length).is_zero() {
            Self::roll_epoch();
        }
        let swept = pallet_reputation::Pallet::<T>::advance_sweep(
            params.decay_bp_per_epoch,
            params.recovery_per_epoch,
            budget,
        );
        budget = budget.saturating_sub(swept);
        Self::advance_retier(budget);

        let touched = params.work_budget as u64 + 1;
        T::DbWeight::get().reads_writes(touched, touched)
    }

    /// Drain matured unbonding buckets from the cursor up to `now`. Returns
    /// units of work consumed (one per bucket plus one per payout).
    fn advance_unbonding_queue(now: BlockNumberFor<T>, budget: u32) -> u32 {
        let mut cursor = UnbondingCursor::<T>::get();
        let mut spent = 0u32;

        while cursor <= now && spent < budget {
            let bucket = UnbondingQueue::<T>::take(cursor);
            spent = spent.saturating_add(1);
            for who in bucket {
                let Some(request) = Unbonding::<T>::get(&who) else {
                    // completed manually or cancelled; stale entry
                    continue;
                };
                if request.completes_at != cursor {
                    continue;
                }
                if let Err(error) = Self::pay_out_unbonding(&who, &request) {
                    log!(error, "unbonding payout failed: {:?}", error);
                }
                spent = spent.saturating_add(1);
            }
            cursor = cursor.saturating_add(One::one());
        }

        UnbondingCursor::<T>::put(cursor);
        spent
    }

    /// Remove locks whose expiry has passed; lifts bans.
    fn sweep_lock_expiries(now: BlockNumberFor<T>, budget: u32) -> u32 {
        let mut cursor = LockExpiryCursor::<T>::get();
        let mut spent = 0u32;

        while cursor <= now && spent < budget {
            let bucket = LockExpiry::<T>::take(cursor);
            spent = spent.saturating_add(1);
            for (who, kind) in bucket {
                let Some(state) = Locks::<T>::get(&who, kind) else {
                    continue;
                };
                // the lock may have been re-added with a later expiry
                if state.expires_at != Some(cursor) {
                    continue;
                }
                Locks::<T>::remove(&who, kind);
                Self::deposit_event(Event::LockReleased { account: who.clone(), kind });
                if kind == LockKind::Ban {
                    // eligibility for the validator/governance pools returns
                    Self::settle(&who);
                    Self::deposit_event(Event::Unbanned { account: who.clone() });
                }
                Self::try_reap(&who);
                spent = spent.saturating_add(1);
            }
            cursor = cursor.saturating_add(One::one());
        }

        LockExpiryCursor::<T>::put(cursor);
        spent
    }

    /// Auto-release commitments whose expiry has passed.
    fn sweep_commitment_expiries(now: BlockNumberFor<T>, budget: u32) -> u32 {
        let mut cursor = CommitmentExpiryCursor::<T>::get();
        let mut spent = 0u32;

        while cursor <= now && spent < budget {
            let bucket = CommitmentExpiry::<T>::take(cursor);
            spent = spent.saturating_add(1);
            for (who, kind, reference) in bucket {
                let Some(commitment) = Commitments::<T>::get(&who, (kind, reference)) else {
                    continue;
                };
                if commitment.expires_at != Some(cursor) {
                    continue;
                }
                Commitments::<T>::remove(&who, (kind, reference));
                Committed::<T>::mutate(&who, |total| {
                    *total = total.saturating_sub(commitment.amount)
                });
                Self::deposit_event(Event::CommitmentExpired {
                    account: who.clone(),
                    kind,
                    reference,
                    amount: commitment.amount,
                });
                Self::try_reap(&who);
                spent = spent.saturating_add(1);
            }
            cursor = cursor.saturating_add(One::one());
        }

        CommitmentExpiryCursor::<T>::put(cursor);
        spent
    }

    /// Start a new epoch: arm the reputation sweep and reset the audit
    /// counter.
    fn roll_epoch() {
        let epoch = CurrentEpoch::<T>::mutate(|index| {
            *index = index.saturating_add(1);
            *index
        });
        Pools::<T>::mutate(|pools| pools.distributed_this_epoch = 0);
        pallet_reputation::Pallet::<T>::begin_sweep();
        log!(debug, "epoch {} started", epoch);
    }

    /// After a parameter change, walk the ledger and refresh cached tiers,
    /// `budget` accounts per block.
    fn advance_retier(budget: u32) {
        if !RetierActive::<T>::get() || budget == 0 {
            return;
        }

        let mut iter = match RetierCursor::<T>::get() {
            Some(cursor) => Ledgers::<T>::iter_from(cursor),
            None => Ledgers::<T>::iter(),
        };

        let mut processed = 0u32;
        loop {
            if processed >= budget {
                RetierCursor::<T>::put(iter.last_raw_key().to_vec());
                return;
            }
            let Some((who, mut ledger)) = iter.next() else {
                break;
            };
            Self::retier(&who, &mut ledger);
            Self::settle_ledger(&who, &mut ledger);
            Ledgers::<T>::insert(&who, ledger);
            processed += 1;
        }

        RetierCursor::<T>::kill();
        RetierActive::<T>::put(false);
    }
}

impl<T: Config> OnReputationUpdate<T::AccountId> for Pallet<T> {
    fn on_reputation_update(who: &T::AccountId, _score: Score) {
        Self::settle(who);
    }
}
