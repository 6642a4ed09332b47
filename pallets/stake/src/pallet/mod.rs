//! Trust-stake FRAME pallet.

use frame_support::{
    pallet_prelude::*,
    traits::{Currency, EnsureOrigin, ExistenceRequirement::KeepAlive, Get},
    PalletId,
};
use frame_system::{ensure_signed, pallet_prelude::*};
use sp_core::H256;
use sp_runtime::{
    traits::{AtLeast32BitUnsigned, MaybeSerializeDeserialize, Saturating, Zero},
    Perbill,
};
use sp_std::prelude::*;

mod impls;

pub use impls::*;

use crate::{
    rewards::RewardPools, weights::WeightInfo, Commitment, CommitmentKind, LockKind, LockState,
    OffenseKind, SlashReason, StakeLedger, StakeOf, Tier, TrustParams, UnbondingRequest,
};

/// Escrow for staked and unbonding funds; reward pool and recovery reserve
/// hang off it as sub-accounts.
pub(crate) const PALLET_ID: PalletId = PalletId(*b"trststke");

#[allow(clippy::module_inception)]
#[frame_support::pallet]
pub mod pallet {
    #![allow(missing_docs)]

    use super::*;

    #[pallet::pallet]
    #[pallet::without_storage_info]
    pub struct Pallet<T>(_);

    #[pallet::config]
    pub trait Config: frame_system::Config + pallet_reputation::Config {
        /// The overarching event type.
        type RuntimeEvent: From<Event<Self>> + IsType<<Self as frame_system::Config>::RuntimeEvent>;

        /// The bank interface all escrowed funds move through.
        type Currency: Currency<Self::AccountId, Balance = Self::StakeBalance>;

        /// Just the `Currency::Balance` type; we have this item to allow us to
        /// constrain it to `From<u64>` for the threshold defaults.
        type StakeBalance: AtLeast32BitUnsigned
            + parity_scale_codec::FullCodec
            + Copy
            + MaybeSerializeDeserialize
            + sp_std::fmt::Debug
            + Default
            + From<u64>
            + TypeInfo
            + MaxEncodedLen;

        /// The origin allowed to rewrite [`TrustParams`] and manage the module
        /// whitelist.
        type GovernanceOrigin: EnsureOrigin<Self::RuntimeOrigin>;

        /// Capacity of one maturity/expiry bucket in the block-indexed queues.
        #[pallet::constant]
        type MaxSchedulePerBlock: Get<u32>;

        /// Weight information for extrinsics in this pallet.
        type WeightInfo: WeightInfo;
    }

    /// Governance-mutable engine parameters.
    #[pallet::storage]
    #[pallet::getter(fn params)]
    pub type Params<T: Config> =
        StorageValue<_, TrustParams<StakeOf<T>, BlockNumberFor<T>>, ValueQuery>;

    /// External module identities allowed to drive the commitment, lock,
    /// reserve and dispute hooks.
    #[pallet::storage]
    #[pallet::getter(fn is_authorized_module)]
    pub type AuthorizedModules<T: Config> =
        StorageMap<_, Twox64Concat, T::AccountId, (), OptionQuery>;

    /// The per-account trust-stake ledger.
    #[pallet::storage]
    #[pallet::getter(fn ledger)]
    pub type Ledgers<T: Config> =
        StorageMap<_, Blake2_128Concat, T::AccountId, StakeLedger<StakeOf<T>, BlockNumberFor<T>>>;

    /// Active commitments keyed by account and (kind, external reference).
    #[pallet::storage]
    #[pallet::getter(fn commitment)]
    pub type Commitments<T: Config> = StorageDoubleMap<
        _,
        Blake2_128Concat,
        T::AccountId,
        Blake2_128Concat,
        (CommitmentKind, H256),
        Commitment<StakeOf<T>, BlockNumberFor<T>>,
    >;

    /// Running sum of active commitment amounts per account.
    #[pallet::storage]
    #[pallet::getter(fn committed)]
    pub type Committed<T: Config> =
        StorageMap<_, Blake2_128Concat, T::AccountId, StakeOf<T>, ValueQuery>;

    /// Active locks keyed by account and kind.
    #[pallet::storage]
    #[pallet::getter(fn lock_state)]
    pub type Locks<T: Config> = StorageDoubleMap<
        _,
        Blake2_128Concat,
        T::AccountId,
        Twox64Concat,
        LockKind,
        LockState<BlockNumberFor<T>>,
    >;

    /// The in-flight withdrawal per account, if any.
    #[pallet::storage]
    #[pallet::getter(fn unbonding)]
    pub type Unbonding<T: Config> = StorageMap<
        _,
        Blake2_128Concat,
        T::AccountId,
        UnbondingRequest<StakeOf<T>, BlockNumberFor<T>>,
    >;

    /// Withdrawals maturing at a given block, in account order of insertion.
    #[pallet::storage]
    pub type UnbondingQueue<T: Config> = StorageMap<
        _,
        Twox64Concat,
        BlockNumberFor<T>,
        BoundedVec<T::AccountId, T::MaxSchedulePerBlock>,
        ValueQuery,
    >;

    /// First maturity height the end-of-block hook has not fully drained.
    #[pallet::storage]
    pub type UnbondingCursor<T: Config> = StorageValue<_, BlockNumberFor<T>, ValueQuery>;

    /// Locks scheduled to expire at a given block.
    #[pallet::storage]
    pub type LockExpiry<T: Config> = StorageMap<
        _,
        Twox64Concat,
        BlockNumberFor<T>,
        BoundedVec<(T::AccountId, LockKind), T::MaxSchedulePerBlock>,
        ValueQuery,
    >;

    /// First lock-expiry height not fully swept.
    #[pallet::storage]
    pub type LockExpiryCursor<T: Config> = StorageValue<_, BlockNumberFor<T>, ValueQuery>;

    /// Commitments scheduled to auto-release at a given block.
    #[pallet::storage]
    pub type CommitmentExpiry<T: Config> = StorageMap<
        _,
        Twox64Concat,
        BlockNumberFor<T>,
        BoundedVec<(T::AccountId, CommitmentKind, H256), T::MaxSchedulePerBlock>,
        ValueQuery,
    >;

    /// First commitment-expiry height not fully swept.
    #[pallet::storage]
    pub type CommitmentExpiryCursor<T: Config> = StorageValue<_, BlockNumberFor<T>, ValueQuery>;

    /// Reward accumulators for the three sub-pools.
    #[pallet::storage]
    #[pallet::getter(fn pools)]
    pub type Pools<T: Config> = StorageValue<_, RewardPools, ValueQuery>;

    /// Index of the current epoch.
    #[pallet::storage]
    #[pallet::getter(fn current_epoch)]
    pub type CurrentEpoch<T: Config> = StorageValue<_, u32, ValueQuery>;

    /// Whether a parameter change still has a tier sweep in flight.
    #[pallet::storage]
    pub type RetierActive<T: Config> = StorageValue<_, bool, ValueQuery>;

    /// Raw storage key the tier sweep resumes from.
    #[pallet::storage]
    #[pallet::unbounded]
    pub type RetierCursor<T: Config> = StorageValue<_, Vec<u8>, OptionQuery>;

    /// Sum of all staked amounts; the escrow account holds this plus
    /// [`TotalUnbonding`].
    #[pallet::storage]
    #[pallet::getter(fn total_staked)]
    pub type TotalStaked<T: Config> = StorageValue<_, StakeOf<T>, ValueQuery>;

    /// Sum of all in-flight withdrawal amounts.
    #[pallet::storage]
    #[pallet::getter(fn total_unbonding)]
    pub type TotalUnbonding<T: Config> = StorageValue<_, StakeOf<T>, ValueQuery>;

    /// Sum of all settled-but-unclaimed rewards, held by the reward account.
    #[pallet::storage]
    #[pallet::getter(fn total_pending_rewards)]
    pub type TotalPendingRewards<T: Config> = StorageValue<_, StakeOf<T>, ValueQuery>;

    #[pallet::event]
    #[pallet::generate_deposit(pub(super) fn deposit_event)]
    pub enum Event<T: Config> {
        /// An account added stake. [account, amount]
        Staked { account: T::AccountId, amount: StakeOf<T> },
        /// A withdrawal entered the unbonding queue. [account, amount, completes_at]
        UnbondingStarted {
            account: T::AccountId,
            amount: StakeOf<T>,
            completes_at: BlockNumberFor<T>,
        },
        /// A matured withdrawal was paid out. [account, amount]
        UnbondingCompleted { account: T::AccountId, amount: StakeOf<T> },
        /// An immature withdrawal was cancelled and re-staked. [account, amount]
        UnbondingCancelled { account: T::AccountId, amount: StakeOf<T> },
        /// The cached tier moved. [account, old, new]
        TierChanged { account: T::AccountId, old: Tier, new: Tier },
        /// A lock was added or its hold count increased. [account, kind]
        LockAdded { account: T::AccountId, kind: LockKind, expires_at: Option<BlockNumberFor<T>> },
        /// A lock was fully released. [account, kind]
        LockReleased { account: T::AccountId, kind: LockKind },
        /// Stake was pledged to an external activity. [account, kind, reference, amount]
        CommitmentAdded {
            account: T::AccountId,
            kind: CommitmentKind,
            reference: H256,
            amount: StakeOf<T>,
        },
        /// A pledge was released by its module. [account, kind, reference]
        CommitmentReleased { account: T::AccountId, kind: CommitmentKind, reference: H256 },
        /// A pledge hit its expiry and was auto-released. [account, kind, reference, amount]
        CommitmentExpired {
            account: T::AccountId,
            kind: CommitmentKind,
            reference: H256,
            amount: StakeOf<T>,
        },
        /// Stake was taken as a penalty or clawback. [account, amount, reason, beneficiary]
        Slashed {
            account: T::AccountId,
            amount: StakeOf<T>,
            reason: SlashReason,
            beneficiary: T::AccountId,
        },
        /// An expired ban was lifted. [account]
        Unbanned { account: T::AccountId },
        /// Governance rewrote the engine parameters.
        ParamsUpdated,
        /// A module identity was added to the hook whitelist. [module]
        ModuleAuthorized { module: T::AccountId },
        /// A module identity was removed from the hook whitelist. [module]
        ModuleDeauthorized { module: T::AccountId },
        /// A treasury transfer was folded into the reward pools. [amount]
        RewardsDistributed { amount: StakeOf<T> },
        /// Pending rewards were paid out. [account, amount]
        RewardsClaimed { account: T::AccountId, amount: StakeOf<T> },
        /// An account took up the validator role. [account]
        ValidatorDeclared { account: T::AccountId },
        /// An account retired from the validator role. [account]
        ValidatorRetired { account: T::AccountId },
        /// The recovery reserve received funds. [amount]
        ReserveFunded { amount: StakeOf<T> },
    }

    #[pallet::error]
    pub enum Error<T> {
        /// The amount must be strictly positive.
        AmountNotPositive,
        /// The caller's bank balance cannot cover the transfer.
        InsufficientFunds,
        /// Withdrawal exceeds the stake not pledged to commitments.
        ExceedsAvailable,
        /// An active lock forbids unstaking.
        LockActive,
        /// A withdrawal is already in flight.
        UnbondingInProgress,
        /// No withdrawal is in flight.
        NoUnbonding,
        /// The withdrawal already matured and can only be completed.
        UnbondingMatured,
        /// The account has no stake record.
        StakeNotFound,
        /// The pledge would push commitments above the staked amount.
        ExceedsTrustCeiling,
        /// A commitment with this kind and reference already exists.
        DuplicateCommitment,
        /// No such commitment.
        CommitmentNotFound,
        /// The caller is not a whitelisted module identity.
        NotAuthorized,
        /// The account is banned.
        Banned,
        /// The account's tier does not permit the operation.
        TierTooLow,
        /// The validator role is already declared.
        AlreadyValidator,
        /// The validator role is not declared.
        NotValidator,
        /// The parameter set failed validation.
        InvalidParams,
        /// The expiry height is not in the future.
        InvalidExpiry,
        /// The per-block schedule bucket is full.
        ScheduleFull,
    }

    #[pallet::hooks]
    impl<T: Config> Hooks<BlockNumberFor<T>> for Pallet<T> {
        fn on_initialize(now: BlockNumberFor<T>) -> Weight {
            Self::do_housekeeping(now)
        }
    }

    #[pallet::call]
    impl<T: Config> Pallet<T> {
        /// Rewrite the engine parameters. Gated by the governance origin.
        ///
        /// Existing stakes are not re-bucketed inside this block; a bounded
        /// sweep retiers them over the following blocks.
        #[pallet::call_index(0)]
        #[pallet::weight(<T as Config>::WeightInfo::update_params())]
        pub fn update_params(
            origin: OriginFor<T>,
            new: TrustParams<StakeOf<T>, BlockNumberFor<T>>,
        ) -> DispatchResult {
            T::GovernanceOrigin::ensure_origin(origin)?;
            ensure!(new.is_valid(), Error::<T>::InvalidParams);

            Params::<T>::put(new);
            RetierCursor::<T>::kill();
            RetierActive::<T>::put(true);

            Self::deposit_event(Event::ParamsUpdated);
            Ok(())
        }

        /// Whitelist an external module identity for the hook extrinsics.
        #[pallet::call_index(1)]
        #[pallet::weight(<T as Config>::WeightInfo::authorize_module())]
        pub fn authorize_module(origin: OriginFor<T>, module: T::AccountId) -> DispatchResult {
            T::GovernanceOrigin::ensure_origin(origin)?;
            AuthorizedModules::<T>::insert(&module, ());
            Self::deposit_event(Event::ModuleAuthorized { module });
            Ok(())
        }

        /// Remove an external module identity from the whitelist.
        #[pallet::call_index(2)]
        #[pallet::weight(<T as Config>::WeightInfo::authorize_module())]
        pub fn deauthorize_module(origin: OriginFor<T>, module: T::AccountId) -> DispatchResult {
            T::GovernanceOrigin::ensure_origin(origin)?;
            AuthorizedModules::<T>::remove(&module);
            Self::deposit_event(Event::ModuleDeauthorized { module });
            Ok(())
        }

        /// Move `amount` from the caller's bank balance into the stake escrow.
        ///
        /// Creates the ledger entry (and the baseline reputation record) on
        /// first use, then recomputes the tier.
        #[pallet::call_index(3)]
        #[pallet::weight(<T as Config>::WeightInfo::stake())]
        pub fn stake(origin: OriginFor<T>, amount: StakeOf<T>) -> DispatchResult {
            let who = ensure_signed(origin)?;
            ensure!(!amount.is_zero(), Error::<T>::AmountNotPositive);
            Self::ensure_not_banned(&who)?;
            ensure!(
                T::Currency::free_balance(&who) >= amount,
                Error::<T>::InsufficientFunds
            );

            T::Currency::transfer(&who, &Self::escrow_account(), amount, KeepAlive)?;

            let now = <frame_system::Pallet<T>>::block_number();
            let mut ledger = match Ledgers::<T>::get(&who) {
                Some(ledger) => ledger,
                None => {
                    pallet_reputation::Pallet::<T>::ensure_account(&who);
                    StakeLedger::new(now)
                },
            };
            ledger.staked = ledger.staked.saturating_add(amount);
            TotalStaked::<T>::mutate(|total| *total = total.saturating_add(amount));

            Self::retier(&who, &mut ledger);
            Self::settle_ledger(&who, &mut ledger);
            Ledgers::<T>::insert(&who, ledger);

            Self::deposit_event(Event::Staked { account: who, amount });
            Ok(())
        }

        /// Request withdrawal of `amount` of uncommitted stake.
        ///
        /// The stake drops immediately (so the tier may drop with it); the
        /// funds stay escrowed until the unbonding delay elapses.
        #[pallet::call_index(4)]
        #[pallet::weight(<T as Config>::WeightInfo::begin_unstake())]
        pub fn begin_unstake(origin: OriginFor<T>, amount: StakeOf<T>) -> DispatchResult {
            let who = ensure_signed(origin)?;
            ensure!(!amount.is_zero(), Error::<T>::AmountNotPositive);
            Self::ensure_not_banned(&who)?;
            let mut ledger = Ledgers::<T>::get(&who).ok_or(Error::<T>::StakeNotFound)?;
            ensure!(!Unbonding::<T>::contains_key(&who), Error::<T>::UnbondingInProgress);

            let available = ledger.staked.saturating_sub(Committed::<T>::get(&who));
            ensure!(amount <= available, Error::<T>::ExceedsAvailable);
            ensure!(!Self::has_active_lock(&who), Error::<T>::LockActive);

            let now = <frame_system::Pallet<T>>::block_number();
            let completes_at = now.saturating_add(Params::<T>::get().unbonding_delay);

            UnbondingQueue::<T>::try_mutate(completes_at, |bucket| {
                bucket.try_push(who.clone()).map_err(|_| Error::<T>::ScheduleFull)
            })?;
            Unbonding::<T>::insert(
                &who,
                UnbondingRequest { amount, requested_at: now, completes_at },
            );

            ledger.staked = ledger.staked.saturating_sub(amount);
            TotalStaked::<T>::mutate(|total| *total = total.saturating_sub(amount));
            TotalUnbonding::<T>::mutate(|total| *total = total.saturating_add(amount));

            Self::retier(&who, &mut ledger);
            Self::settle_ledger(&who, &mut ledger);
            Ledgers::<T>::insert(&who, ledger);

            Self::deposit_event(Event::UnbondingStarted { account: who, amount, completes_at });
            Ok(())
        }

        /// Pay out the caller's withdrawal if it has matured. Idempotent, and
        /// deliberately not blocked by a ban: escrowed funds must be able to
        /// exit eventually.
        #[pallet::call_index(5)]
        #[pallet::weight(<T as Config>::WeightInfo::complete_unstake())]
        pub fn complete_unstake(origin: OriginFor<T>) -> DispatchResult {
            let who = ensure_signed(origin)?;
            let now = <frame_system::Pallet<T>>::block_number();

            if let Some(request) = Unbonding::<T>::get(&who) {
                if request.completes_at <= now {
                    Self::pay_out_unbonding(&who, &request)?;
                }
            }
            Ok(())
        }

        /// Cancel an immature withdrawal, returning the amount to the stake.
        #[pallet::call_index(6)]
        #[pallet::weight(<T as Config>::WeightInfo::cancel_unstake())]
        pub fn cancel_unstake(origin: OriginFor<T>) -> DispatchResult {
            let who = ensure_signed(origin)?;
            Self::ensure_not_banned(&who)?;
            let request = Unbonding::<T>::get(&who).ok_or(Error::<T>::NoUnbonding)?;
            let now = <frame_system::Pallet<T>>::block_number();
            ensure!(request.completes_at > now, Error::<T>::UnbondingMatured);

            Unbonding::<T>::remove(&who);
            UnbondingQueue::<T>::mutate(request.completes_at, |bucket| {
                bucket.retain(|account| account != &who)
            });

            let mut ledger = Ledgers::<T>::get(&who).ok_or(Error::<T>::StakeNotFound)?;
            ledger.staked = ledger.staked.saturating_add(request.amount);
            TotalStaked::<T>::mutate(|total| *total = total.saturating_add(request.amount));
            TotalUnbonding::<T>::mutate(|total| *total = total.saturating_sub(request.amount));

            Self::retier(&who, &mut ledger);
            Self::settle_ledger(&who, &mut ledger);
            Ledgers::<T>::insert(&who, ledger);

            Self::deposit_event(Event::UnbondingCancelled { account: who, amount: request.amount });
            Ok(())
        }

        /// Settle and pay out the caller's pending rewards.
        #[pallet::call_index(7)]
        #[pallet::weight(<T as Config>::WeightInfo::claim_rewards())]
        pub fn claim_rewards(origin: OriginFor<T>) -> DispatchResult {
            let who = ensure_signed(origin)?;
            Self::ensure_not_banned(&who)?;
            let mut ledger = Ledgers::<T>::get(&who).ok_or(Error::<T>::StakeNotFound)?;

            Self::settle_ledger(&who, &mut ledger);
            let amount = ledger.pending_rewards;
            if amount.is_zero() {
                Ledgers::<T>::insert(&who, ledger);
                return Ok(());
            }

            T::Currency::transfer(
                &Self::reward_account(),
                &who,
                amount,
                frame_support::traits::ExistenceRequirement::AllowDeath,
            )?;
            ledger.pending_rewards = Zero::zero();
            TotalPendingRewards::<T>::mutate(|total| *total = total.saturating_sub(amount));
            Ledgers::<T>::insert(&who, ledger);
            Self::try_reap(&who);

            Self::deposit_event(Event::RewardsClaimed { account: who, amount });
            Ok(())
        }

        /// Take up the validator role. Requires the top tier.
        #[pallet::call_index(8)]
        #[pallet::weight(<T as Config>::WeightInfo::declare_validator())]
        pub fn declare_validator(origin: OriginFor<T>) -> DispatchResult {
            let who = ensure_signed(origin)?;
            Self::ensure_not_banned(&who)?;
            let mut ledger = Ledgers::<T>::get(&who).ok_or(Error::<T>::StakeNotFound)?;
            ensure!(ledger.tier == Tier::Validator, Error::<T>::TierTooLow);
            ensure!(!ledger.is_validator, Error::<T>::AlreadyValidator);

            ledger.is_validator = true;
            Self::lock(&who, LockKind::ValidatorRole, None)?;
            Self::settle_ledger(&who, &mut ledger);
            Ledgers::<T>::insert(&who, ledger);

            Self::deposit_event(Event::ValidatorDeclared { account: who });
            Ok(())
        }

        /// Retire from the validator role and release its lock.
        #[pallet::call_index(9)]
        #[pallet::weight(<T as Config>::WeightInfo::declare_validator())]
        pub fn retire_validator(origin: OriginFor<T>) -> DispatchResult {
            let who = ensure_signed(origin)?;
            Self::ensure_not_banned(&who)?;
            let mut ledger = Ledgers::<T>::get(&who).ok_or(Error::<T>::StakeNotFound)?;
            ensure!(ledger.is_validator, Error::<T>::NotValidator);

            ledger.is_validator = false;
            Self::unlock(&who, LockKind::ValidatorRole);
            Self::settle_ledger(&who, &mut ledger);
            Ledgers::<T>::insert(&who, ledger);

            Self::deposit_event(Event::ValidatorRetired { account: who });
            Ok(())
        }

        /// Fold a treasury transfer into the reward pools, split by the
        /// governance percentages. Callable by whitelisted modules.
        #[pallet::call_index(10)]
        #[pallet::weight(<T as Config>::WeightInfo::distribute())]
        pub fn distribute(origin: OriginFor<T>, amount: StakeOf<T>) -> DispatchResult {
            let caller = ensure_signed(origin)?;
            Self::ensure_authorized(&caller)?;
            ensure!(!amount.is_zero(), Error::<T>::AmountNotPositive);
            ensure!(
                T::Currency::free_balance(&caller) >= amount,
                Error::<T>::InsufficientFunds
            );

            T::Currency::transfer(&caller, &Self::reward_account(), amount, KeepAlive)?;
            Self::inject_distribution(amount);

            Self::deposit_event(Event::RewardsDistributed { amount });
            Ok(())
        }

        /// Pledge `amount` of `account`'s stake to an external activity.
        /// Callable by whitelisted modules only.
        #[pallet::call_index(11)]
        #[pallet::weight(<T as Config>::WeightInfo::add_commitment())]
        pub fn add_commitment(
            origin: OriginFor<T>,
            account: T::AccountId,
            kind: CommitmentKind,
            reference: H256,
            amount: StakeOf<T>,
            expires_at: Option<BlockNumberFor<T>>,
        ) -> DispatchResult {
            let caller = ensure_signed(origin)?;
            Self::ensure_authorized(&caller)?;
            ensure!(!amount.is_zero(), Error::<T>::AmountNotPositive);
            Self::ensure_not_banned(&account)?;

            let ledger = Ledgers::<T>::get(&account).ok_or(Error::<T>::StakeNotFound)?;
            ensure!(
                !Commitments::<T>::contains_key(&account, (kind, reference)),
                Error::<T>::DuplicateCommitment
            );

            let committed = Committed::<T>::get(&account);
            ensure!(
                committed.saturating_add(amount) <= ledger.staked,
                Error::<T>::ExceedsTrustCeiling
            );

            let now = <frame_system::Pallet<T>>::block_number();
            if let Some(expiry) = expires_at {
                ensure!(expiry > now, Error::<T>::InvalidExpiry);
                CommitmentExpiry::<T>::try_mutate(expiry, |bucket| {
                    bucket
                        .try_push((account.clone(), kind, reference))
                        .map_err(|_| Error::<T>::ScheduleFull)
                })?;
            }

            Commitments::<T>::insert(
                &account,
                (kind, reference),
                Commitment { amount, created_at: now, expires_at },
            );
            Committed::<T>::insert(&account, committed.saturating_add(amount));

            Self::deposit_event(Event::CommitmentAdded { account, kind, reference, amount });
            Ok(())
        }

        /// Release a pledge. No-op if it does not exist.
        /// Callable by whitelisted modules only.
        #[pallet::call_index(12)]
        #[pallet::weight(<T as Config>::WeightInfo::release_commitment())]
        pub fn release_commitment(
            origin: OriginFor<T>,
            account: T::AccountId,
            kind: CommitmentKind,
            reference: H256,
        ) -> DispatchResult {
            let caller = ensure_signed(origin)?;
            Self::ensure_authorized(&caller)?;

            if let Some(commitment) = Commitments::<T>::take(&account, (kind, reference)) {
                Committed::<T>::mutate(&account, |total| {
                    *total = total.saturating_sub(commitment.amount)
                });
                Self::deposit_event(Event::CommitmentReleased { account: account.clone(), kind, reference });
                Self::try_reap(&account);
            }
            Ok(())
        }

        /// Slash up to `slash_amount` out of a pledge, paying the proceeds to
        /// `beneficiary`. Callable by whitelisted modules only.
        #[pallet::call_index(13)]
        #[pallet::weight(<T as Config>::WeightInfo::slash_commitment())]
        pub fn slash_commitment(
            origin: OriginFor<T>,
            account: T::AccountId,
            kind: CommitmentKind,
            reference: H256,
            slash_amount: StakeOf<T>,
            beneficiary: T::AccountId,
        ) -> DispatchResult {
            let caller = ensure_signed(origin)?;
            Self::ensure_authorized(&caller)?;

            let mut commitment = Commitments::<T>::get(&account, (kind, reference))
                .ok_or(Error::<T>::CommitmentNotFound)?;
            let actual = slash_amount.min(commitment.amount);
            ensure!(!actual.is_zero(), Error::<T>::AmountNotPositive);

            commitment.amount = commitment.amount.saturating_sub(actual);
            if commitment.amount.is_zero() {
                Commitments::<T>::remove(&account, (kind, reference));
            } else {
                Commitments::<T>::insert(&account, (kind, reference), commitment);
            }
            Committed::<T>::mutate(&account, |total| *total = total.saturating_sub(actual));

            let mut ledger = Ledgers::<T>::get(&account).ok_or(Error::<T>::StakeNotFound)?;
            ledger.staked = ledger.staked.saturating_sub(actual);
            TotalStaked::<T>::mutate(|total| *total = total.saturating_sub(actual));
            T::Currency::transfer(
                &Self::escrow_account(),
                &beneficiary,
                actual,
                frame_support::traits::ExistenceRequirement::AllowDeath,
            )?;

            Self::retier(&account, &mut ledger);
            Self::settle_ledger(&account, &mut ledger);
            Ledgers::<T>::insert(&account, ledger);

            Self::deposit_event(Event::Slashed {
                account,
                amount: actual,
                reason: SlashReason::Commitment,
                beneficiary,
            });
            Ok(())
        }

        /// Add a lock of `kind` on `account`. Callable by whitelisted modules
        /// only.
        #[pallet::call_index(14)]
        #[pallet::weight(<T as Config>::WeightInfo::add_lock())]
        pub fn add_lock(
            origin: OriginFor<T>,
            account: T::AccountId,
            kind: LockKind,
            expires_at: Option<BlockNumberFor<T>>,
        ) -> DispatchResult {
            let caller = ensure_signed(origin)?;
            Self::ensure_authorized(&caller)?;
            ensure!(Ledgers::<T>::contains_key(&account), Error::<T>::StakeNotFound);

            Self::lock(&account, kind, expires_at)
        }

        /// Release one hold of a lock of `kind` on `account`. No-op if absent.
        /// Callable by whitelisted modules only.
        #[pallet::call_index(15)]
        #[pallet::weight(<T as Config>::WeightInfo::release_lock())]
        pub fn release_lock(
            origin: OriginFor<T>,
            account: T::AccountId,
            kind: LockKind,
        ) -> DispatchResult {
            let caller = ensure_signed(origin)?;
            Self::ensure_authorized(&caller)?;

            Self::unlock(&account, kind);
            Ok(())
        }

        /// Forward an escrow-fee share into the recovery reserve.
        /// Callable by whitelisted modules only.
        #[pallet::call_index(16)]
        #[pallet::weight(<T as Config>::WeightInfo::fund_reserve())]
        pub fn fund_reserve(origin: OriginFor<T>, amount: StakeOf<T>) -> DispatchResult {
            let caller = ensure_signed(origin)?;
            Self::ensure_authorized(&caller)?;
            ensure!(!amount.is_zero(), Error::<T>::AmountNotPositive);
            ensure!(
                T::Currency::free_balance(&caller) >= amount,
                Error::<T>::InsufficientFunds
            );

            T::Currency::transfer(&caller, &Self::reserve_account(), amount, KeepAlive)?;
            Self::deposit_event(Event::ReserveFunded { amount });
            Ok(())
        }

        /// Slash a validator for a reported offense, at the governance-set
        /// fraction of the current stake, routing the proceeds to the
        /// recovery reserve. Callable by whitelisted modules only.
        #[pallet::call_index(17)]
        #[pallet::weight(<T as Config>::WeightInfo::report_offense())]
        pub fn report_offense(
            origin: OriginFor<T>,
            account: T::AccountId,
            offense: OffenseKind,
        ) -> DispatchResult {
            let caller = ensure_signed(origin)?;
            Self::ensure_authorized(&caller)?;
            let ledger = Ledgers::<T>::get(&account).ok_or(Error::<T>::StakeNotFound)?;
            ensure!(ledger.is_validator, Error::<T>::NotValidator);

            let params = Params::<T>::get();
            let amount =
                Perbill::from_rational(offense.slash_bp(&params), 10_000u32).mul_floor(ledger.staked);
            if !amount.is_zero() {
                Self::slash_stake(&account, amount, &Self::reserve_account(), SlashReason::Offense);
            }
            pallet_reputation::Pallet::<T>::apply_event(&account, offense.reputation_event());
            Ok(())
        }

        /// Record the outcome of a stake-backed loan for reputation purposes.
        /// Callable by whitelisted modules only.
        #[pallet::call_index(18)]
        #[pallet::weight(<T as Config>::WeightInfo::note_loan_outcome())]
        pub fn note_loan_outcome(
            origin: OriginFor<T>,
            account: T::AccountId,
            repaid: bool,
        ) -> DispatchResult {
            let caller = ensure_signed(origin)?;
            Self::ensure_authorized(&caller)?;
            ensure!(Ledgers::<T>::contains_key(&account), Error::<T>::StakeNotFound);

            let event = if repaid {
                pallet_reputation::ReputationEvent::LoanRepaid
            } else {
                pallet_reputation::ReputationEvent::LoanDefault
            };
            pallet_reputation::Pallet::<T>::apply_event(&account, event);
            Ok(())
        }
    }

    #[pallet::genesis_config]
    pub struct GenesisConfig<T: Config> {
        /// Engine parameters at genesis.
        pub params: TrustParams<StakeOf<T>, BlockNumberFor<T>>,
        /// Module identities whitelisted from the start.
        pub authorized_modules: Vec<T::AccountId>,
        /// Pre-seeded stakes, minted straight into the escrow.
        pub stakes: Vec<(T::AccountId, StakeOf<T>)>,
    }

    impl<T: Config> Default for GenesisConfig<T> {
        fn default() -> Self {
            Self {
                params: TrustParams::default(),
                authorized_modules: Vec::new(),
                stakes: Vec::new(),
            }
        }
    }

    #[pallet::genesis_build]
    impl<T: Config> BuildGenesisConfig for GenesisConfig<T> {
        fn build(&self) {
            assert!(self.params.is_valid(), "genesis trust params are invalid");
            Params::<T>::put(self.params.clone());

            for module in &self.authorized_modules {
                AuthorizedModules::<T>::insert(module, ());
            }

            for (account, amount) in &self.stakes {
                assert!(!amount.is_zero(), "genesis stake must be positive");
                let _ = T::Currency::deposit_creating(&Pallet::<T>::escrow_account(), *amount);
                pallet_reputation::Pallet::<T>::ensure_account(account);

                let mut ledger = StakeLedger::new(Zero::zero());
                ledger.staked = *amount;
                TotalStaked::<T>::mutate(|total| *total = total.saturating_add(*amount));
                Pallet::<T>::retier(account, &mut ledger);
                Pallet::<T>::settle_ledger(account, &mut ledger);
                Ledgers::<T>::insert(account, ledger);
            }
        }
    }
}
