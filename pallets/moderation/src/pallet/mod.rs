//! Moderation FRAME pallet.

use frame_support::pallet_prelude::*;
use frame_system::{ensure_signed, pallet_prelude::*};
use pallet_stake::{StakeOf, Tier};
use sp_core::H256;
use sp_runtime::traits::{Saturating, Zero};
use sp_std::prelude::*;

mod impls;

pub use impls::*;

use crate::{
    weights::WeightInfo, AppealLevel, AppealRecord, CaseId, DisputeCase, DisputeState,
    RecoveryCase, ReporterRecord, Resolution, Vote, WrongResolutionReport,
};

/// Moderator panel size for first-instance cases.
pub(crate) const CASE_PANEL: u32 = 3;

/// Days in the rolling moderator-offense window.
pub(crate) const OFFENSE_WINDOW_DAYS: u32 = 30;

/// Minimum stake age, in days, before an account may file reports.
pub(crate) const REPORTER_MIN_STAKE_AGE_DAYS: u32 = 7;

/// Reports allowed per reporter inside one trailing day.
pub(crate) const REPORTS_PER_DAY: u32 = 3;

/// Lifetime report count above which the false-report ratio rule applies.
pub(crate) const REPORTER_RATIO_MIN_REPORTS: u32 = 10;

/// Invalid-report percentage that triggers a permanent ban once the lifetime
/// minimum is met.
pub(crate) const REPORTER_RATIO_BAN_PCT: u32 = 80;

pub(crate) type CaseOf<T> = DisputeCase<
    <T as frame_system::Config>::AccountId,
    StakeOf<T>,
    frame_system::pallet_prelude::BlockNumberFor<T>,
>;
pub(crate) type AppealOf<T> = AppealRecord<
    <T as frame_system::Config>::AccountId,
    frame_system::pallet_prelude::BlockNumberFor<T>,
>;
pub(crate) type ReportOf<T> = WrongResolutionReport<
    <T as frame_system::Config>::AccountId,
    StakeOf<T>,
    frame_system::pallet_prelude::BlockNumberFor<T>,
>;
pub(crate) type RecoveryOf<T> = RecoveryCase<
    <T as frame_system::Config>::AccountId,
    StakeOf<T>,
    frame_system::pallet_prelude::BlockNumberFor<T>,
>;

#[allow(clippy::module_inception)]
#[frame_support::pallet]
pub mod pallet {
    #![allow(missing_docs)]

    use super::*;

    #[pallet::pallet]
    #[pallet::without_storage_info]
    pub struct Pallet<T>(_);

    #[pallet::config]
    pub trait Config: frame_system::Config + pallet_stake::Config {
        /// The overarching event type.
        type RuntimeEvent: From<Event<Self>> + IsType<<Self as frame_system::Config>::RuntimeEvent>;

        /// Weight information for extrinsics in this pallet.
        type WeightInfo: WeightInfo;
    }

    /// Monotonic case counter.
    #[pallet::storage]
    pub type NextCaseId<T: Config> = StorageValue<_, u64, ValueQuery>;

    /// All live (and audit-retained) dispute cases.
    #[pallet::storage]
    #[pallet::getter(fn case)]
    pub type Cases<T: Config> = StorageMap<_, Twox64Concat, CaseId, CaseOf<T>>;

    /// Review records, one per concluded or in-flight level.
    #[pallet::storage]
    #[pallet::getter(fn appeal)]
    pub type Appeals<T: Config> =
        StorageDoubleMap<_, Twox64Concat, CaseId, Twox64Concat, AppealLevel, AppealOf<T>>;

    /// Wrong-resolution reports by case.
    #[pallet::storage]
    #[pallet::getter(fn report)]
    pub type WrongResolutions<T: Config> = StorageMap<_, Twox64Concat, CaseId, ReportOf<T>>;

    /// Report history per reporter.
    #[pallet::storage]
    #[pallet::getter(fn reporter)]
    pub type Reporters<T: Config> =
        StorageMap<_, Blake2_128Concat, T::AccountId, ReporterRecord<BlockNumberFor<T>>, ValueQuery>;

    /// Offense blocks per moderator inside the rolling window.
    #[pallet::storage]
    pub type ModeratorOffenses<T: Config> = StorageMap<
        _,
        Blake2_128Concat,
        T::AccountId,
        BoundedVec<BlockNumberFor<T>, ConstU32<32>>,
        ValueQuery,
    >;

    /// In-flight recovery waterfalls by case.
    #[pallet::storage]
    #[pallet::getter(fn recovery)]
    pub type Recoveries<T: Config> = StorageMap<_, Twox64Concat, CaseId, RecoveryOf<T>>;

    /// Case voting deadlines by block.
    #[pallet::storage]
    pub type CaseDeadlines<T: Config> = StorageMap<
        _,
        Twox64Concat,
        BlockNumberFor<T>,
        BoundedVec<CaseId, T::MaxSchedulePerBlock>,
        ValueQuery,
    >;

    /// First case-deadline height not fully swept.
    #[pallet::storage]
    pub type CaseDeadlineCursor<T: Config> = StorageValue<_, BlockNumberFor<T>, ValueQuery>;

    /// Review deadlines by block.
    #[pallet::storage]
    pub type AppealDeadlines<T: Config> = StorageMap<
        _,
        Twox64Concat,
        BlockNumberFor<T>,
        BoundedVec<CaseId, T::MaxSchedulePerBlock>,
        ValueQuery,
    >;

    /// First review-deadline height not fully swept.
    #[pallet::storage]
    pub type AppealDeadlineCursor<T: Config> = StorageValue<_, BlockNumberFor<T>, ValueQuery>;

    /// Voluntary-return windows ending at a block.
    #[pallet::storage]
    pub type RecoveryQueue<T: Config> = StorageMap<
        _,
        Twox64Concat,
        BlockNumberFor<T>,
        BoundedVec<CaseId, T::MaxSchedulePerBlock>,
        ValueQuery,
    >;

    /// First recovery height not fully swept.
    #[pallet::storage]
    pub type RecoveryCursor<T: Config> = StorageValue<_, BlockNumberFor<T>, ValueQuery>;

    /// Audit-window expiries by block.
    #[pallet::storage]
    pub type PruneQueue<T: Config> = StorageMap<
        _,
        Twox64Concat,
        BlockNumberFor<T>,
        BoundedVec<CaseId, T::MaxSchedulePerBlock>,
        ValueQuery,
    >;

    /// First prune height not fully swept.
    #[pallet::storage]
    pub type PruneCursor<T: Config> = StorageValue<_, BlockNumberFor<T>, ValueQuery>;

    /// Monotonic nonce folded into every panel-selection seed.
    #[pallet::storage]
    pub type SelectionNonce<T: Config> = StorageValue<_, u64, ValueQuery>;

    #[pallet::event]
    #[pallet::generate_deposit(pub(super) fn deposit_event)]
    pub enum Event<T: Config> {
        /// A dispute was opened. [case, escrow_ref, disputed_value]
        DisputeOpened { case_id: CaseId, escrow_ref: H256, disputed_value: StakeOf<T> },
        /// A moderator panel was assigned. [case, moderators]
        ModeratorsAssigned { case_id: CaseId, moderators: Vec<T::AccountId> },
        /// Not enough eligible moderators; the case will fall back to an
        /// emergency even split at its deadline. [case]
        InsufficientModerators { case_id: CaseId },
        /// A moderator or reviewer voted. [case, voter]
        VoteSubmitted { case_id: CaseId, voter: T::AccountId },
        /// A case was resolved. [case, resolution]
        DisputeResolved { case_id: CaseId, resolution: Resolution },
        /// A re-review was opened. [case, level, appellant]
        AppealOpened { case_id: CaseId, level: AppealLevel, appellant: T::AccountId },
        /// The review upheld the standing resolution. [case, level]
        AppealUpheld { case_id: CaseId, level: AppealLevel },
        /// The review overturned the resolution. [case, level, old, new]
        AppealOverturned {
            case_id: CaseId,
            level: AppealLevel,
            old: Resolution,
            new: Resolution,
        },
        /// A wrong-resolution report was filed. [case, reporter]
        WrongResolutionFiled { case_id: CaseId, reporter: T::AccountId },
        /// Governance adjudicated a report. [case, valid]
        ReportAdjudicated { case_id: CaseId, valid: bool },
        /// The wrongful recipient was put on notice. [case, recipient, amount, window_ends]
        VoluntaryReturnWindowOpened {
            case_id: CaseId,
            recipient: T::AccountId,
            amount: StakeOf<T>,
            window_ends: BlockNumberFor<T>,
        },
        /// Funds came back voluntarily; no penalties follow. [case, amount]
        FundsReturned { case_id: CaseId, amount: StakeOf<T> },
        /// The waterfall compensated the victim. [case, victim, amount]
        RecoveryPaid { case_id: CaseId, victim: T::AccountId, amount: StakeOf<T> },
        /// The waterfall ran dry before the victim was made whole.
        /// The protocol never mints to cover the gap. [case, remaining]
        RecoveryShortfall { case_id: CaseId, remaining: StakeOf<T> },
        /// An account was banned. [account, until; None = permanent]
        Banned { account: T::AccountId, until: Option<BlockNumberFor<T>> },
    }

    #[pallet::error]
    pub enum Error<T> {
        /// No such case.
        CaseNotFound,
        /// The case is not collecting votes.
        CaseNotOpen,
        /// The caller is not on the moderator panel.
        NotModerator,
        /// Votes are final; this panel member already voted.
        AlreadyVoted,
        /// The voting deadline has passed.
        VotingClosed,
        /// The caller is not a participant of the case.
        NotParticipant,
        /// The case has no standing resolution.
        CaseNotResolved,
        /// The appeal window has closed.
        AppealWindowClosed,
        /// This level was already appealed.
        AppealAlreadyOpen,
        /// Level 3 is terminal.
        AppealLevelExhausted,
        /// Not enough eligible reviewers for this level.
        InsufficientReviewers,
        /// No review is in flight for this case.
        NoAppealInProgress,
        /// The caller is not on the review panel.
        NotReviewer,
        /// A report for this case was already filed.
        ReportAlreadyFiled,
        /// No such report.
        ReportNotFound,
        /// The report was already adjudicated.
        ReportClosed,
        /// The caller's tier does not permit the operation.
        TierTooLow,
        /// The caller's stake is too young to file reports.
        StakeTooYoung,
        /// Rate limit: too many reports in the trailing day.
        TooManyReports,
        /// No recovery is pending for this case.
        NoRecoveryPending,
        /// Only the wrongful recipient may return the funds.
        NotRecipient,
        /// The caller's bank balance cannot cover the return.
        InsufficientFunds,
        /// The account is banned.
        Banned,
        /// The caller is not a whitelisted module identity.
        NotAuthorized,
        /// Buyer and seller must differ.
        InvalidParticipants,
        /// The amount must be strictly positive.
        AmountNotPositive,
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
        /// Open a dispute over an external escrow. Callable only by
        /// whitelisted module identities (the escrow module).
        ///
        /// Selects a deterministic moderator panel under the trust-ceiling
        /// rule and locks each member until the case closes. If fewer than
        /// three candidates qualify, the case is flagged and falls back to an
        /// emergency even split at its deadline.
        #[pallet::call_index(0)]
        #[pallet::weight(<T as Config>::WeightInfo::open_dispute())]
        pub fn open_dispute(
            origin: OriginFor<T>,
            escrow_ref: H256,
            disputed_value: StakeOf<T>,
            buyer: T::AccountId,
            seller: T::AccountId,
        ) -> DispatchResult {
            let caller = ensure_signed(origin)?;
            ensure!(
                pallet_stake::Pallet::<T>::is_authorized_module(&caller).is_some(),
                Error::<T>::NotAuthorized
            );
            ensure!(!disputed_value.is_zero(), Error::<T>::AmountNotPositive);
            ensure!(buyer != seller, Error::<T>::InvalidParticipants);

            Self::do_open_dispute(escrow_ref, disputed_value, buyer, seller)
        }

        /// Submit a moderator vote. Votes are final.
        #[pallet::call_index(1)]
        #[pallet::weight(<T as Config>::WeightInfo::submit_vote())]
        pub fn submit_vote(origin: OriginFor<T>, case_id: CaseId, vote: Vote) -> DispatchResult {
            let who = ensure_signed(origin)?;
            Self::ensure_not_banned(&who)?;

            let mut case = Cases::<T>::get(case_id).ok_or(Error::<T>::CaseNotFound)?;
            ensure!(case.state == DisputeState::Voting, Error::<T>::CaseNotOpen);
            ensure!(case.is_moderator(&who), Error::<T>::NotModerator);
            ensure!(!case.has_voted(&who), Error::<T>::AlreadyVoted);

            let now = <frame_system::Pallet<T>>::block_number();
            ensure!(now < case.deadline_at, Error::<T>::VotingClosed);

            case.votes
                .try_push((who.clone(), vote))
                .map_err(|_| Error::<T>::AlreadyVoted)?;
            Self::deposit_event(Event::VoteSubmitted { case_id, voter: who });

            if case.votes.len() == case.moderators.len() {
                Self::resolve_case(case_id, &mut case, now);
            }
            Cases::<T>::insert(case_id, case);
            Ok(())
        }

        /// Escalate a resolved case to the next review level.
        #[pallet::call_index(2)]
        #[pallet::weight(<T as Config>::WeightInfo::open_appeal())]
        pub fn open_appeal(
            origin: OriginFor<T>,
            case_id: CaseId,
            evidence: H256,
        ) -> DispatchResult {
            let who = ensure_signed(origin)?;
            Self::ensure_not_banned(&who)?;

            let mut case = Cases::<T>::get(case_id).ok_or(Error::<T>::CaseNotFound)?;
            ensure!(case.is_participant(&who), Error::<T>::NotParticipant);
            ensure!(case.state == DisputeState::Resolved, Error::<T>::CaseNotResolved);

            let level = AppealLevel::from_count(case.appeals_concluded)
                .ok_or(Error::<T>::AppealLevelExhausted)?;
            ensure!(
                !Appeals::<T>::contains_key(case_id, level),
                Error::<T>::AppealAlreadyOpen
            );

            let now = <frame_system::Pallet<T>>::block_number();
            let params = pallet_stake::Pallet::<T>::params();
            let resolved_at = case.resolved_at.ok_or(Error::<T>::CaseNotResolved)?;
            ensure!(
                now <= resolved_at.saturating_add(params.appeal_window),
                Error::<T>::AppealWindowClosed
            );

            Self::do_open_appeal(case_id, &mut case, level, who, evidence, now)?;
            Cases::<T>::insert(case_id, case);
            Ok(())
        }

        /// Submit a reviewer vote at the in-flight review level.
        #[pallet::call_index(3)]
        #[pallet::weight(<T as Config>::WeightInfo::submit_appeal_vote())]
        pub fn submit_appeal_vote(
            origin: OriginFor<T>,
            case_id: CaseId,
            vote: Vote,
        ) -> DispatchResult {
            let who = ensure_signed(origin)?;
            Self::ensure_not_banned(&who)?;

            let mut case = Cases::<T>::get(case_id).ok_or(Error::<T>::CaseNotFound)?;
            let level = match case.state {
                DisputeState::Appealed(level) => level,
                _ => return Err(Error::<T>::NoAppealInProgress.into()),
            };
            let mut appeal =
                Appeals::<T>::get(case_id, level).ok_or(Error::<T>::NoAppealInProgress)?;
            ensure!(appeal.is_reviewer(&who), Error::<T>::NotReviewer);
            ensure!(!appeal.has_voted(&who), Error::<T>::AlreadyVoted);

            let now = <frame_system::Pallet<T>>::block_number();
            ensure!(now < appeal.deadline_at, Error::<T>::VotingClosed);

            appeal
                .votes
                .try_push((who.clone(), vote))
                .map_err(|_| Error::<T>::AlreadyVoted)?;
            Self::deposit_event(Event::VoteSubmitted { case_id, voter: who });

            if appeal.votes.len() == appeal.reviewers.len() {
                Self::conclude_appeal(case_id, &mut case, level, &mut appeal, now);
            }
            Appeals::<T>::insert(case_id, level, appeal);
            Cases::<T>::insert(case_id, case);
            Ok(())
        }

        /// File a claim that a resolved case wrongfully deprived a participant.
        ///
        /// Admissible only from a case participant of tier Keeper or above
        /// whose stake is at least seven days old, within the report rate
        /// limit, and not banned.
        #[pallet::call_index(4)]
        #[pallet::weight(<T as Config>::WeightInfo::file_wrong_resolution())]
        pub fn file_wrong_resolution(
            origin: OriginFor<T>,
            case_id: CaseId,
            claimed_amount: StakeOf<T>,
        ) -> DispatchResult {
            let who = ensure_signed(origin)?;
            Self::ensure_not_banned(&who)?;
            ensure!(!claimed_amount.is_zero(), Error::<T>::AmountNotPositive);

            let case = Cases::<T>::get(case_id).ok_or(Error::<T>::CaseNotFound)?;
            ensure!(case.is_participant(&who), Error::<T>::NotParticipant);
            ensure!(
                matches!(case.state, DisputeState::Resolved | DisputeState::Finalized),
                Error::<T>::CaseNotResolved
            );
            ensure!(
                !WrongResolutions::<T>::contains_key(case_id),
                Error::<T>::ReportAlreadyFiled
            );

            ensure!(
                pallet_stake::Pallet::<T>::tier_of(&who) >= Tier::Keeper,
                Error::<T>::TierTooLow
            );
            let params = pallet_stake::Pallet::<T>::params();
            let min_age = params
                .blocks_per_day
                .saturating_mul(REPORTER_MIN_STAKE_AGE_DAYS.into());
            let age = pallet_stake::Pallet::<T>::stake_age(&who).unwrap_or_else(Zero::zero);
            ensure!(age >= min_age, Error::<T>::StakeTooYoung);

            let now = <frame_system::Pallet<T>>::block_number();
            Self::note_report(&who, now, params.blocks_per_day)?;

            let counterparty =
                if case.buyer == who { case.seller.clone() } else { case.buyer.clone() };
            let claimed = claimed_amount.min(case.disputed_value);
            WrongResolutions::<T>::insert(
                case_id,
                ReportOf::<T> {
                    reporter: who.clone(),
                    alleged_victim: who.clone(),
                    stated_counterparty: counterparty,
                    claimed_amount: claimed,
                    state: crate::ReportState::UnderInvestigation,
                    filed_at: now,
                },
            );

            Self::deposit_event(Event::WrongResolutionFiled { case_id, reporter: who });
            Ok(())
        }

        /// Return wrongfully received funds inside the voluntary window,
        /// closing the recovery with no slashing and no reputation damage.
        #[pallet::call_index(5)]
        #[pallet::weight(<T as Config>::WeightInfo::voluntary_return())]
        pub fn voluntary_return(origin: OriginFor<T>, case_id: CaseId) -> DispatchResult {
            let who = ensure_signed(origin)?;

            let recovery = Recoveries::<T>::get(case_id).ok_or(Error::<T>::NoRecoveryPending)?;
            ensure!(recovery.recipient == who, Error::<T>::NotRecipient);

            let moved =
                pallet_stake::Pallet::<T>::claw_from_bank(&who, recovery.owed, &recovery.victim);
            ensure!(moved == recovery.owed, Error::<T>::InsufficientFunds);

            Recoveries::<T>::remove(case_id);
            Self::close_report_as_settled(case_id);

            Self::deposit_event(Event::FundsReturned { case_id, amount: recovery.owed });
            Ok(())
        }

        /// Adjudicate a wrong-resolution report. Gated by the governance
        /// origin. A valid finding opens the recovery waterfall; an invalid
        /// one walks the reporter up the abuse-penalty schedule.
        #[pallet::call_index(6)]
        #[pallet::weight(<T as Config>::WeightInfo::adjudicate_report())]
        pub fn adjudicate_report(
            origin: OriginFor<T>,
            case_id: CaseId,
            valid: bool,
        ) -> DispatchResult {
            <T as pallet_stake::Config>::GovernanceOrigin::ensure_origin(origin)?;

            let mut report =
                WrongResolutions::<T>::get(case_id).ok_or(Error::<T>::ReportNotFound)?;
            ensure!(
                report.state == crate::ReportState::UnderInvestigation,
                Error::<T>::ReportClosed
            );

            let now = <frame_system::Pallet<T>>::block_number();
            if valid {
                Self::accept_report(case_id, &mut report, now)?;
            } else {
                Self::punish_reporter(case_id, &mut report, now);
            }
            WrongResolutions::<T>::insert(case_id, report);

            Self::deposit_event(Event::ReportAdjudicated { case_id, valid });
            Ok(())
        }
    }
}
