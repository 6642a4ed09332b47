use crate::weights::*;
use crate::{ReputationEvent, Score};
pub use impls::*;
pub use pallet::*;

mod impls;

#[allow(clippy::module_inception)]
#[frame_support::pallet]
pub mod pallet {
    // because substrate's macros won't allow us to add docs in some places
    #![allow(missing_docs)]

    use super::*;
    use crate::OnReputationUpdate;
    use frame_support::pallet_prelude::*;
    use frame_system::pallet_prelude::*;
    use sp_std::vec::Vec;

    #[pallet::pallet]
    pub struct Pallet<T>(_);

    #[pallet::config]
    pub trait Config: frame_system::Config {
        /// Because this pallet emits events, it depends on the runtime definition of an event.
        type RuntimeEvent: From<Event<Self>> + IsType<<Self as frame_system::Config>::RuntimeEvent>;

        /// Notified after every score change so dependent state (reward weight
        /// snapshots) can be settled.
        type ReputationListener: OnReputationUpdate<Self::AccountId>;

        /// Type representing the weight of this pallet.
        type WeightInfo: WeightInfo;
    }

    /// Score per account. Accounts without an entry read as the baseline.
    #[pallet::storage]
    #[pallet::getter(fn score)]
    pub type Scores<T: Config> = StorageMap<_, Twox64Concat, T::AccountId, Score, ValueQuery>;

    /// Governance overrides for event deltas, in hundredths. Events without an
    /// entry use [`ReputationEvent::default_delta`].
    #[pallet::storage]
    #[pallet::getter(fn delta_override)]
    pub type DeltaOverrides<T: Config> = StorageMap<_, Twox64Concat, ReputationEvent, i32>;

    /// Raw storage key the in-flight epoch sweep resumes from. `None` with
    /// [`SweepActive`] set means the sweep starts from the first account.
    #[pallet::storage]
    #[pallet::unbounded]
    pub type SweepCursor<T: Config> = StorageValue<_, Vec<u8>, OptionQuery>;

    /// Whether an epoch sweep is still in flight.
    #[pallet::storage]
    #[pallet::getter(fn sweep_active)]
    pub type SweepActive<T: Config> = StorageValue<_, bool, ValueQuery>;

    #[pallet::event]
    #[pallet::generate_deposit(pub fn deposit_event)]
    pub enum Event<T: Config> {
        /// An account's score changed. [account, event, old, new]
        ReputationChanged {
            account: T::AccountId,
            event: ReputationEvent,
            old: Score,
            new: Score,
        },
        /// A score was forcibly set by governance. [account, score]
        ReputationSetForcibly { account: T::AccountId, score: Score },
        /// The delta for an event was overridden. [event, delta]
        EventDeltaSet { event: ReputationEvent, delta: i32 },
    }

    #[pallet::error]
    #[derive(PartialEq, Clone)]
    pub enum Error<T> {
        /// Account not found.
        AccountNotFound,
    }

    #[pallet::call]
    impl<T: Config> Pallet<T> {
        /// Force set the score for an account. Should be called by root.
        ///
        /// The associated account will be inserted in the store if it's not there.
        #[pallet::call_index(0)]
        #[pallet::weight(T::WeightInfo::force_set_score())]
        pub fn force_set_score(
            origin: OriginFor<T>,
            account: T::AccountId,
            score: Score,
        ) -> DispatchResult {
            ensure_root(origin)?;

            <Scores<T>>::insert(&account, score);
            T::ReputationListener::on_reputation_update(&account, score);

            Self::deposit_event(Event::ReputationSetForcibly { account, score });

            Ok(())
        }

        /// Override the delta applied for a named event. Should be called by root.
        #[pallet::call_index(1)]
        #[pallet::weight(T::WeightInfo::set_event_delta())]
        pub fn set_event_delta(
            origin: OriginFor<T>,
            event: ReputationEvent,
            delta: i32,
        ) -> DispatchResult {
            ensure_root(origin)?;

            <DeltaOverrides<T>>::insert(event, delta);
            Self::deposit_event(Event::EventDeltaSet { event, delta });

            Ok(())
        }
    }

    #[pallet::genesis_config]
    #[derive(frame_support::DefaultNoBound)]
    pub struct GenesisConfig<T: Config> {
        /// Accounts with preset scores.
        pub accounts: Vec<(T::AccountId, Score)>,
    }

    #[pallet::genesis_build]
    impl<T: Config> BuildGenesisConfig for GenesisConfig<T> {
        fn build(&self) {
            for (account, score) in &self.accounts {
                Scores::<T>::insert(account, score);
            }
        }
    }
}
