//! Non-dispatchable moderation logic: panel selection, tallying, the penalty
//! schedule, the recovery waterfall and the deadline sweeps.

use frame_support::{pallet_prelude::*, BoundedVec};
use frame_system::pallet_prelude::BlockNumberFor;
use pallet_reputation::{ReputationEvent, Score};
use pallet_stake::{LockKind, SlashReason, StakeOf, Tier};
use parity_scale_codec::Encode;
use sp_core::H256;
use sp_io::hashing::blake2_256;
use sp_runtime::{
    traits::{One, Saturating, Zero},
    Perbill,
};
use sp_std::prelude::*;

use super::pallet::*;
use super::{
    AppealOf, CaseOf, RecoveryOf, ReportOf, CASE_PANEL, OFFENSE_WINDOW_DAYS,
    REPORTER_RATIO_BAN_PCT, REPORTER_RATIO_MIN_REPORTS, REPORTS_PER_DAY,
};
use crate::{
    false_report_ban_days, false_report_slash_pct, log, offense_ban_days, offense_slash_pct,
    AppealLevel, AppealOutcome, CaseId, DisputeState, ReportState, Resolution, Vote, MAX_PANEL,
};

impl<T: Config> Pallet<T> {
    pub(crate) fn ensure_not_banned(who: &T::AccountId) -> DispatchResult {
        ensure!(!pallet_stake::Pallet::<T>::is_banned(who), Error::<T>::Banned);
        Ok(())
    }

    /// Unique-plurality tally. `None` when no votes were cast or two options
    /// tie for first place; the caller falls back to the emergency even split.
    pub(crate) fn tally(votes: &[(T::AccountId, Vote)]) -> Option<Resolution> {
        if votes.is_empty() {
            return None;
        }
        let mut counts = [0u32; 3];
        for (_, vote) in votes {
            let slot = match vote {
                Vote::ReleaseBuyer => 0,
                Vote::RefundSeller => 1,
                Vote::Split => 2,
            };
            counts[slot] += 1;
        }

        let best = *counts.iter().max().expect("three fixed slots; qed");
        if counts.iter().filter(|count| **count == best).count() > 1 {
            return None;
        }
        match counts.iter().position(|count| *count == best) {
            Some(0) => Some(Resolution::ReleaseBuyer),
            Some(1) => Some(Resolution::RefundSeller),
            _ => Some(Resolution::Split),
        }
    }

    /// Deterministically draw up to `count` panel members for `case_id`.
    ///
    /// Candidates must carry stake at or above the disputed value (the trust
    /// ceiling), sit at or above `min_tier`, clear `min_score`, be unbanned,
    /// hold no active dispute lock, and not appear in `exclude`. The draw
    /// sorts by `blake2(seed ‖ account)` where the seed commits to the parent
    /// block hash, the case and a monotonic nonce.
    pub(crate) fn select_panel(
        case_id: CaseId,
        disputed_value: StakeOf<T>,
        count: u32,
        min_tier: Tier,
        min_score: Score,
        exclude: &[T::AccountId],
    ) -> Vec<T::AccountId> {
        let params = pallet_stake::Pallet::<T>::params();
        let value_tier = Tier::for_stake(&params.tier_thresholds, disputed_value).max(Tier::Holder);
        let min_tier = min_tier.max(value_tier);

        let now = <frame_system::Pallet<T>>::block_number();
        let mut candidates = pallet_stake::Pallet::<T>::candidates(disputed_value, min_tier, min_score);
        candidates.retain(|who| {
            !exclude.contains(who)
                && pallet_stake::Pallet::<T>::lock_state(who, LockKind::ActiveDispute)
                    .map(|state| !state.is_active(now))
                    .unwrap_or(true)
        });

        let nonce = SelectionNonce::<T>::mutate(|nonce| {
            *nonce = nonce.wrapping_add(1);
            *nonce
        });
        let parent = <frame_system::Pallet<T>>::parent_hash();
        let seed = (parent, case_id, nonce).using_encoded(blake2_256);

        let mut keyed: Vec<([u8; 32], T::AccountId)> = candidates
            .into_iter()
            .map(|who| ((&seed, &who).using_encoded(blake2_256), who))
            .collect();
        keyed.sort();
        keyed.truncate(count as usize);
        keyed.into_iter().map(|(_, who)| who).collect()
    }

    pub(crate) fn do_open_dispute(
        escrow_ref: H256,
        disputed_value: StakeOf<T>,
        buyer: T::AccountId,
        seller: T::AccountId,
    ) -> DispatchResult {
        let case_id = CaseId(NextCaseId::<T>::mutate(|next| {
            let id = *next;
            *next += 1;
            id
        }));
        let now = <frame_system::Pallet<T>>::block_number();
        let params = pallet_stake::Pallet::<T>::params();
        let deadline_at = now.saturating_add(params.dispute_voting_period);

        let exclude = [buyer.clone(), seller.clone()];
        let panel = Self::select_panel(
            case_id,
            disputed_value,
            CASE_PANEL,
            Tier::Holder,
            Score::MODERATION_GATE,
            &exclude,
        );

        let mut case = CaseOf::<T> {
            escrow_ref,
            disputed_value,
            buyer,
            seller,
            moderators: Default::default(),
            votes: Default::default(),
            state: DisputeState::Open,
            resolution: None,
            opened_at: now,
            deadline_at,
            resolved_at: None,
            appeals_concluded: 0,
        };

        if (panel.len() as u32) < CASE_PANEL {
            // routed to the emergency even split once the deadline passes
            Self::deposit_event(Event::InsufficientModerators { case_id });
        } else {
            for moderator in &panel {
                let _ = pallet_stake::Pallet::<T>::lock(moderator, LockKind::ActiveDispute, None);
            }
            case.moderators =
                BoundedVec::try_from(panel.clone()).map_err(|_| Error::<T>::ScheduleFull)?;
            case.state = DisputeState::Voting;
            Self::deposit_event(Event::ModeratorsAssigned { case_id, moderators: panel });
        }

        CaseDeadlines::<T>::try_mutate(deadline_at, |bucket| {
            bucket.try_push(case_id).map_err(|_| Error::<T>::ScheduleFull)
        })?;
        Cases::<T>::insert(case_id, case);

        Self::deposit_event(Event::DisputeOpened { case_id, escrow_ref, disputed_value });
        Ok(())
    }

    /// Close the voting phase: pick the resolution, apply moderator
    /// reputation deltas, release the panel locks and open the appeal window.
    pub(crate) fn resolve_case(case_id: CaseId, case: &mut CaseOf<T>, now: BlockNumberFor<T>) {
        let resolution = Self::tally(&case.votes).unwrap_or(Resolution::EmergencyEvenSplit);

        for (moderator, vote) in case.votes.iter() {
            if Resolution::from(*vote) == resolution {
                pallet_reputation::Pallet::<T>::apply_event(
                    moderator,
                    ReputationEvent::SuccessfulModeration,
                );
            }
        }
        for moderator in case.moderators.iter() {
            if !case.has_voted(moderator) {
                pallet_reputation::Pallet::<T>::apply_event(
                    moderator,
                    ReputationEvent::ModerationAbsence,
                );
            }
            pallet_stake::Pallet::<T>::unlock(moderator, LockKind::ActiveDispute);
        }

        case.state = DisputeState::Resolved;
        case.resolution = Some(resolution);
        case.resolved_at = Some(now);

        let params = pallet_stake::Pallet::<T>::params();
        Self::schedule_prune(
            case_id,
            now.saturating_add(params.appeal_window)
                .saturating_add(params.case_audit_window),
        );

        Self::deposit_event(Event::DisputeResolved { case_id, resolution });
    }

    pub(crate) fn do_open_appeal(
        case_id: CaseId,
        case: &mut CaseOf<T>,
        level: AppealLevel,
        appellant: T::AccountId,
        evidence: H256,
        now: BlockNumberFor<T>,
    ) -> DispatchResult {
        // prior moderators and reviewers of this case never review it again
        let mut exclude: Vec<T::AccountId> = vec![case.buyer.clone(), case.seller.clone()];
        exclude.extend(case.moderators.iter().cloned());
        for (_, record) in Appeals::<T>::iter_prefix(case_id) {
            exclude.extend(record.reviewers.iter().cloned());
        }

        let count = level.reviewer_count();
        let panel = Self::select_panel(
            case_id,
            case.disputed_value,
            count,
            level.min_tier(),
            Score::SLASHING_GATE,
            &exclude,
        );
        ensure!(panel.len() as u32 == count, Error::<T>::InsufficientReviewers);

        for reviewer in &panel {
            let _ = pallet_stake::Pallet::<T>::lock(reviewer, LockKind::ActiveDispute, None);
        }

        let params = pallet_stake::Pallet::<T>::params();
        let deadline_at = now.saturating_add(
            params.blocks_per_day.saturating_mul(level.deadline_days().into()),
        );
        AppealDeadlines::<T>::try_mutate(deadline_at, |bucket| {
            bucket.try_push(case_id).map_err(|_| Error::<T>::ScheduleFull)
        })?;

        Appeals::<T>::insert(
            case_id,
            level,
            AppealOf::<T> {
                appellant: appellant.clone(),
                evidence,
                reviewers: BoundedVec::try_from(panel)
                    .map_err(|_| Error::<T>::InsufficientReviewers)?,
                votes: Default::default(),
                deadline_at,
                outcome: None,
            },
        );
        case.state = DisputeState::Appealed(level);

        Self::deposit_event(Event::AppealOpened { case_id, level, appellant });
        Ok(())
    }

    /// Conclude a review level: decide upheld/overturned, settle reviewer
    /// reputation, and on overturn run the penalty schedule and open the
    /// recovery waterfall.
    pub(crate) fn conclude_appeal(
        case_id: CaseId,
        case: &mut CaseOf<T>,
        level: AppealLevel,
        appeal: &mut AppealOf<T>,
        now: BlockNumberFor<T>,
    ) {
        let standing = match case.resolution {
            Some(resolution) => resolution,
            None => {
                log!(error, "appeal concluded on unresolved case {:?}", case_id);
                return;
            },
        };

        let review = Self::tally(&appeal.votes);
        let (outcome, final_resolution) = match review {
            Some(resolution) if resolution != standing => (AppealOutcome::Overturned, resolution),
            _ => (AppealOutcome::Upheld, standing),
        };

        for (reviewer, vote) in appeal.votes.iter() {
            if Resolution::from(*vote) != final_resolution {
                pallet_reputation::Pallet::<T>::apply_event(
                    reviewer,
                    ReputationEvent::OverturnedReview,
                );
            }
        }
        for reviewer in appeal.reviewers.iter() {
            if !appeal.has_voted(reviewer) {
                pallet_reputation::Pallet::<T>::apply_event(
                    reviewer,
                    ReputationEvent::ModerationAbsence,
                );
            }
            pallet_stake::Pallet::<T>::unlock(reviewer, LockKind::ActiveDispute);
        }

        appeal.outcome = Some(outcome);
        case.appeals_concluded = case.appeals_concluded.saturating_add(1);
        case.resolved_at = Some(now);
        case.state = if level == AppealLevel::Three {
            DisputeState::Finalized
        } else {
            DisputeState::Resolved
        };

        let params = pallet_stake::Pallet::<T>::params();
        let prune_at = match case.state {
            DisputeState::Finalized => now.saturating_add(params.case_audit_window),
            _ => now
                .saturating_add(params.appeal_window)
                .saturating_add(params.case_audit_window),
        };
        Self::schedule_prune(case_id, prune_at);

        match outcome {
            AppealOutcome::Upheld => {
                Self::deposit_event(Event::AppealUpheld { case_id, level });
            },
            AppealOutcome::Overturned => {
                case.resolution = Some(final_resolution);
                Self::deposit_event(Event::AppealOverturned {
                    case_id,
                    level,
                    old: standing,
                    new: final_resolution,
                });

                let offenders = Self::penalize_overturned_majority(case, standing, now);
                Self::start_recovery_from_overturn(
                    case_id,
                    case,
                    standing,
                    final_resolution,
                    offenders,
                    now,
                );
            },
        }
    }

    /// Walk every original-majority moderator up the repeat-offense schedule.
    /// Returns the offenders with their scheduled slash percents for the
    /// recovery waterfall.
    fn penalize_overturned_majority(
        case: &CaseOf<T>,
        wrong: Resolution,
        now: BlockNumberFor<T>,
    ) -> BoundedVec<(T::AccountId, u8), ConstU32<MAX_PANEL>> {
        let params = pallet_stake::Pallet::<T>::params();
        let window = params
            .blocks_per_day
            .saturating_mul(OFFENSE_WINDOW_DAYS.into());

        let mut offenders: BoundedVec<_, _> = Default::default();
        for (moderator, vote) in case.votes.iter() {
            if Resolution::from(*vote) != wrong {
                continue;
            }

            let offense = Self::record_offense(moderator, now, window);
            pallet_reputation::Pallet::<T>::apply_event(
                moderator,
                ReputationEvent::UnfairModeration,
            );
            if let Some(days) = offense_ban_days(offense) {
                let until = now.saturating_add(params.blocks_per_day.saturating_mul(days.into()));
                let _ = pallet_stake::Pallet::<T>::ban(moderator, Some(until));
                Self::deposit_event(Event::Banned {
                    account: moderator.clone(),
                    until: Some(until),
                });
            }
            if offenders
                .try_push((moderator.clone(), offense_slash_pct(offense)))
                .is_err()
            {
                log!(error, "offender list overflow on case panel");
            }
        }
        offenders
    }

    /// Record one offense for `who` at `now` and return its 1-based position
    /// inside the rolling window.
    fn record_offense(who: &T::AccountId, now: BlockNumberFor<T>, window: BlockNumberFor<T>) -> u32 {
        ModeratorOffenses::<T>::mutate(who, |offenses| {
            offenses.retain(|block| block.saturating_add(window) > now);
            if offenses.try_push(now).is_err() {
                offenses.remove(0);
                let _ = offenses.try_push(now);
            }
            offenses.len() as u32
        })
    }

    fn start_recovery_from_overturn(
        case_id: CaseId,
        case: &CaseOf<T>,
        old: Resolution,
        new: Resolution,
        offenders: BoundedVec<(T::AccountId, u8), ConstU32<MAX_PANEL>>,
        now: BlockNumberFor<T>,
    ) {
        let (old_buyer, old_seller) = old.shares(case.disputed_value);
        let (new_buyer, new_seller) = new.shares(case.disputed_value);

        let (victim, recipient, owed) = if new_buyer > old_buyer {
            (case.buyer.clone(), case.seller.clone(), new_buyer - old_buyer)
        } else if new_seller > old_seller {
            (case.seller.clone(), case.buyer.clone(), new_seller - old_seller)
        } else {
            return;
        };

        Self::start_recovery(case_id, victim, recipient, owed, offenders, now);
    }

    /// Open the voluntary-return window; the waterfall executes when it ends.
    fn start_recovery(
        case_id: CaseId,
        victim: T::AccountId,
        recipient: T::AccountId,
        owed: StakeOf<T>,
        offenders: BoundedVec<(T::AccountId, u8), ConstU32<MAX_PANEL>>,
        now: BlockNumberFor<T>,
    ) {
        let params = pallet_stake::Pallet::<T>::params();
        let window_ends = now.saturating_add(params.voluntary_return_window);

        Recoveries::<T>::insert(
            case_id,
            RecoveryOf::<T> {
                victim,
                recipient: recipient.clone(),
                owed,
                window_ends,
                offenders,
            },
        );
        let scheduled = RecoveryQueue::<T>::try_mutate(window_ends, |bucket| {
            bucket.try_push(case_id).map_err(|_| ())
        });
        if scheduled.is_err() {
            // bucket overflow: skip the grace window rather than lose the case
            Self::execute_recovery(case_id);
            return;
        }

        Self::deposit_event(Event::VoluntaryReturnWindowOpened {
            case_id,
            recipient,
            amount: owed,
            window_ends,
        });
    }

    /// Run the waterfall: clawback (bank, then stake), reserve, moderator
    /// slashes, shortfall event. Never mints.
    pub(crate) fn execute_recovery(case_id: CaseId) {
        let Some(recovery) = Recoveries::<T>::take(case_id) else {
            return;
        };
        let victim = &recovery.victim;
        let mut remaining = recovery.owed;

        remaining = remaining.saturating_sub(pallet_stake::Pallet::<T>::claw_from_bank(
            &recovery.recipient,
            remaining,
            victim,
        ));
        if !remaining.is_zero() {
            remaining = remaining.saturating_sub(pallet_stake::Pallet::<T>::slash_stake(
                &recovery.recipient,
                remaining,
                victim,
                SlashReason::Clawback,
            ));
        }
        if !remaining.is_zero() {
            remaining =
                remaining.saturating_sub(pallet_stake::Pallet::<T>::pay_from_reserve(victim, remaining));
        }

        let reserve = pallet_stake::Pallet::<T>::reserve_account();
        for (offender, pct) in recovery.offenders.iter() {
            if *pct == 0 {
                continue;
            }
            let scheduled = Perbill::from_percent(*pct as u32)
                .mul_floor(pallet_stake::Pallet::<T>::staked(offender));
            let to_victim = scheduled.min(remaining);
            if !to_victim.is_zero() {
                let taken = pallet_stake::Pallet::<T>::slash_stake(
                    offender,
                    to_victim,
                    victim,
                    SlashReason::ModeratorPenalty,
                );
                remaining = remaining.saturating_sub(taken);
            }
            let leftover = scheduled.saturating_sub(to_victim);
            if !leftover.is_zero() {
                // the schedule binds in full; what the victim no longer needs
                // replenishes the reserve
                pallet_stake::Pallet::<T>::slash_stake(
                    offender,
                    leftover,
                    &reserve,
                    SlashReason::ModeratorPenalty,
                );
            }
        }

        let paid = recovery.owed.saturating_sub(remaining);
        if !paid.is_zero() {
            Self::deposit_event(Event::RecoveryPaid {
                case_id,
                victim: victim.clone(),
                amount: paid,
            });
        }
        if !remaining.is_zero() {
            Self::deposit_event(Event::RecoveryShortfall { case_id, remaining });
        }
        Self::close_report_as_settled(case_id);
    }

    /// Rate-limit bookkeeping for a newly filed report.
    pub(crate) fn note_report(
        who: &T::AccountId,
        now: BlockNumberFor<T>,
        day: BlockNumberFor<T>,
    ) -> DispatchResult {
        Reporters::<T>::try_mutate(who, |record| -> DispatchResult {
            record.recent_reports.retain(|block| block.saturating_add(day) > now);
            ensure!(
                (record.recent_reports.len() as u32) < REPORTS_PER_DAY,
                Error::<T>::TooManyReports
            );
            record
                .recent_reports
                .try_push(now)
                .map_err(|_| Error::<T>::TooManyReports)?;
            record.total_reports = record.total_reports.saturating_add(1);
            Ok(())
        })
    }

    /// A valid report: penalize the standing majority and open the waterfall
    /// for the reported amount.
    pub(crate) fn accept_report(
        case_id: CaseId,
        report: &mut ReportOf<T>,
        now: BlockNumberFor<T>,
    ) -> DispatchResult {
        let case = Cases::<T>::get(case_id).ok_or(Error::<T>::CaseNotFound)?;
        let standing = case.resolution.ok_or(Error::<T>::CaseNotResolved)?;

        report.state = ReportState::VoluntaryReturnPending;
        let offenders = Self::penalize_overturned_majority(&case, standing, now);
        Self::start_recovery(
            case_id,
            report.alleged_victim.clone(),
            report.stated_counterparty.clone(),
            report.claimed_amount,
            offenders,
            now,
        );
        Ok(())
    }

    /// An invalid report: escalate the reporter's penalty schedule.
    pub(crate) fn punish_reporter(
        case_id: CaseId,
        report: &mut ReportOf<T>,
        now: BlockNumberFor<T>,
    ) {
        report.state = ReportState::Invalid;
        let reporter = &report.reporter;

        let (offense, total) = Reporters::<T>::mutate(reporter, |record| {
            record.invalid_reports = record.invalid_reports.saturating_add(1);
            (record.invalid_reports, record.total_reports)
        });

        pallet_reputation::Pallet::<T>::apply_event(
            reporter,
            ReputationEvent::FalseReport { offense: offense.min(u8::MAX as u32) as u8 },
        );

        let pct = false_report_slash_pct(offense);
        if pct > 0 {
            let amount = Perbill::from_percent(pct as u32)
                .mul_floor(pallet_stake::Pallet::<T>::staked(reporter));
            if !amount.is_zero() {
                pallet_stake::Pallet::<T>::slash_stake(
                    reporter,
                    amount,
                    &pallet_stake::Pallet::<T>::reserve_account(),
                    SlashReason::FalseReport,
                );
            }
        }

        let params = pallet_stake::Pallet::<T>::params();
        let mut ban: Option<Option<BlockNumberFor<T>>> = false_report_ban_days(offense).map(|days| {
            days.map(|days| now.saturating_add(params.blocks_per_day.saturating_mul(days.into())))
        });
        // chronic abusers are banned for good regardless of the step schedule
        if total >= REPORTER_RATIO_MIN_REPORTS
            && offense.saturating_mul(100) > total.saturating_mul(REPORTER_RATIO_BAN_PCT)
        {
            ban = Some(None);
        }
        if let Some(until) = ban {
            let _ = pallet_stake::Pallet::<T>::ban(reporter, until);
            Self::deposit_event(Event::Banned { account: reporter.clone(), until });
        }

        Self::schedule_prune(
            case_id,
            now.saturating_add(params.case_audit_window),
        );
    }

    /// Mark the case's report (if any) as genuinely settled.
    pub(crate) fn close_report_as_settled(case_id: CaseId) {
        WrongResolutions::<T>::mutate(case_id, |report| {
            if let Some(report) = report {
                report.state = ReportState::Valid;
            }
        });
    }

    fn schedule_prune(case_id: CaseId, at: BlockNumberFor<T>) {
        let result = PruneQueue::<T>::try_mutate(at, |bucket| {
            bucket.try_push(case_id).map_err(|_| ())
        });
        if result.is_err() {
            log!(warn, "prune bucket full; case {:?} retained", case_id);
        }
    }

    // ---- end-of-block workers -------------------------------------------------

    /// Bounded sweeps in fixed order: case deadlines, review deadlines,
    /// recovery windows, audit-window pruning.
    pub(crate) fn do_housekeeping(now: BlockNumberFor<T>) -> Weight {
        let budget = pallet_stake::Pallet::<T>::params().work_budget;
        let mut remaining = budget;

        remaining = remaining.saturating_sub(Self::sweep_case_deadlines(now, remaining));
        remaining = remaining.saturating_sub(Self::sweep_appeal_deadlines(now, remaining));
        remaining = remaining.saturating_sub(Self::sweep_recoveries(now, remaining));
        Self::sweep_prunes(now, remaining);

        let touched = budget as u64 + 1;
        T::DbWeight::get().reads_writes(touched, touched)
    }

    /// Resolve cases whose voting deadline passed with missing votes.
    fn sweep_case_deadlines(now: BlockNumberFor<T>, budget: u32) -> u32 {
        let mut cursor = CaseDeadlineCursor::<T>::get();
        let mut spent = 0u32;

        while cursor <= now && spent < budget {
            let bucket = CaseDeadlines::<T>::take(cursor);
            spent = spent.saturating_add(1);
            for case_id in bucket {
                let Some(mut case) = Cases::<T>::get(case_id) else {
                    continue;
                };
                let voting = matches!(case.state, DisputeState::Open | DisputeState::Voting);
                if voting && case.deadline_at == cursor {
                    Self::resolve_case(case_id, &mut case, now);
                    Cases::<T>::insert(case_id, case);
                }
                spent = spent.saturating_add(1);
            }
            cursor = cursor.saturating_add(One::one());
        }

        CaseDeadlineCursor::<T>::put(cursor);
        spent
    }

    /// Conclude reviews whose deadline passed with missing votes.
    fn sweep_appeal_deadlines(now: BlockNumberFor<T>, budget: u32) -> u32 {
        let mut cursor = AppealDeadlineCursor::<T>::get();
        let mut spent = 0u32;

        while cursor <= now && spent < budget {
            let bucket = AppealDeadlines::<T>::take(cursor);
            spent = spent.saturating_add(1);
            for case_id in bucket {
                let Some(mut case) = Cases::<T>::get(case_id) else {
                    continue;
                };
                let DisputeState::Appealed(level) = case.state else {
                    continue;
                };
                let Some(mut appeal) = Appeals::<T>::get(case_id, level) else {
                    continue;
                };
                if appeal.deadline_at == cursor && appeal.outcome.is_none() {
                    Self::conclude_appeal(case_id, &mut case, level, &mut appeal, now);
                    Appeals::<T>::insert(case_id, level, appeal);
                    Cases::<T>::insert(case_id, case);
                }
                spent = spent.saturating_add(1);
            }
            cursor = cursor.saturating_add(One::one());
        }

        AppealDeadlineCursor::<T>::put(cursor);
        spent
    }

    /// Execute waterfalls whose voluntary-return window ended.
    fn sweep_recoveries(now: BlockNumberFor<T>, budget: u32) -> u32 {
        let mut cursor = RecoveryCursor::<T>::get();
        let mut spent = 0u32;

        while cursor <= now && spent < budget {
            let bucket = RecoveryQueue::<T>::take(cursor);
            spent = spent.saturating_add(1);
            for case_id in bucket {
                Self::execute_recovery(case_id);
                spent = spent.saturating_add(1);
            }
            cursor = cursor.saturating_add(One::one());
        }

        RecoveryCursor::<T>::put(cursor);
        spent
    }

    /// Drop cases whose audit window ended, along with their reviews and
    /// reports. Cases with pending reports or recoveries are retained.
    fn sweep_prunes(now: BlockNumberFor<T>, budget: u32) -> u32 {
        let mut cursor = PruneCursor::<T>::get();
        let mut spent = 0u32;
        let params = pallet_stake::Pallet::<T>::params();

        while cursor <= now && spent < budget {
            let bucket = PruneQueue::<T>::take(cursor);
            spent = spent.saturating_add(1);
            for case_id in bucket {
                let Some(case) = Cases::<T>::get(case_id) else {
                    continue;
                };
                let Some(resolved_at) = case.resolved_at else {
                    continue;
                };
                let due = match case.state {
                    DisputeState::Finalized => {
                        resolved_at.saturating_add(params.case_audit_window) <= now
                    },
                    DisputeState::Resolved => resolved_at
                        .saturating_add(params.appeal_window)
                        .saturating_add(params.case_audit_window)
                        <= now,
                    _ => false,
                };
                let blocked = Recoveries::<T>::contains_key(case_id)
                    || WrongResolutions::<T>::get(case_id).map_or(false, |report| {
                        matches!(
                            report.state,
                            ReportState::UnderInvestigation | ReportState::VoluntaryReturnPending
                        )
                    });
                if !due || blocked {
                    continue;
                }

                Cases::<T>::remove(case_id);
                let _ = Appeals::<T>::clear_prefix(case_id, MAX_PANEL, None);
                WrongResolutions::<T>::remove(case_id);
                log!(debug, "case {:?} pruned after audit window", case_id);
                spent = spent.saturating_add(1);
            }
            cursor = cursor.saturating_add(One::one());
        }

        PruneCursor::<T>::put(cursor);
        spent
    }
}
