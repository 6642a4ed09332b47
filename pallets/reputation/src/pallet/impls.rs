//! Non-dispatchable reputation logic: event application and the epoch sweep.

use crate::{OnReputationUpdate, ReputationEvent, Score};

use super::pallet::*;
use frame_support::pallet_prelude::*;

impl<T: Config> Pallet<T> {
    /// Materialize a score entry for `who` at the baseline, if absent.
    ///
    /// Accounts read as the baseline either way; an explicit entry is what
    /// makes the account visible to the epoch sweep.
    pub fn ensure_account(who: &T::AccountId) {
        if !Scores::<T>::contains_key(who) {
            Scores::<T>::insert(who, Score::BASELINE);
        }
    }

    /// Drop the score entry for a fully dismantled account.
    pub fn remove_account(who: &T::AccountId) {
        Scores::<T>::remove(who);
    }

    /// The signed delta currently configured for `event`, in hundredths.
    pub fn delta_for(event: &ReputationEvent) -> i32 {
        DeltaOverrides::<T>::get(event).unwrap_or_else(|| event.default_delta())
    }

    /// Apply a named event to `who`, saturating at the score bounds.
    ///
    /// Returns the new score. Emits `ReputationChanged` and notifies the
    /// listener even when the delta saturated to a no-op, so dependent weight
    /// snapshots stay in step with the stored value.
    pub fn apply_event(who: &T::AccountId, event: ReputationEvent) -> Score {
        let old = Scores::<T>::get(who);
        let new = old.apply(Self::delta_for(&event));
        Scores::<T>::insert(who, new);

        T::ReputationListener::on_reputation_update(who, new);
        Self::deposit_event(Event::ReputationChanged { account: who.clone(), event, old, new });

        new
    }

    /// Whether `who` clears the bar for moderation assignments.
    pub fn can_moderate(who: &T::AccountId) -> bool {
        Scores::<T>::get(who).meets(Score::MODERATION_GATE)
    }

    /// Whether `who` may review appeals that can end in moderator slashes.
    pub fn can_slash_moderators(who: &T::AccountId) -> bool {
        Scores::<T>::get(who).meets(Score::SLASHING_GATE)
    }

    /// Arm the epoch sweep so subsequent [`Self::advance_sweep`] calls walk
    /// every stored score exactly once.
    pub fn begin_sweep() {
        SweepCursor::<T>::kill();
        SweepActive::<T>::put(true);
    }

    /// Process up to `budget` accounts of the in-flight sweep: decay by
    /// `decay_bp`, then recover below-baseline scores by `recovery` hundredths.
    ///
    /// Returns the number of accounts touched; `0` when no sweep is pending.
    pub fn advance_sweep(decay_bp: u32, recovery: u16, budget: u32) -> u32 {
        if !SweepActive::<T>::get() {
            return 0;
        }

        let mut iter = match SweepCursor::<T>::get() {
            Some(cursor) => Scores::<T>::iter_from(cursor),
            None => Scores::<T>::iter(),
        };

        let mut processed = 0u32;
        loop {
            if processed >= budget {
                SweepCursor::<T>::put(iter.last_raw_key().to_vec());
                return processed;
            }
            let Some((account, score)) = iter.next() else {
                break;
            };

            let swept = score.decay(decay_bp).recover(recovery);
            if swept != score {
                Scores::<T>::insert(&account, swept);
            }
            // Settle even on unchanged scores: the sweep is the periodic
            // checkpoint for reward weights.
            T::ReputationListener::on_reputation_update(&account, swept);
            processed += 1;
        }

        SweepCursor::<T>::kill();
        SweepActive::<T>::put(false);
        processed
    }
}
