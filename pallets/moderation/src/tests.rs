use crate::{
    mock::*, AppealLevel, CaseId, DisputeState, Error, Event, ReportState, Resolution, Vote,
};
use frame_support::{assert_noop, assert_ok};
use pallet_reputation::Score;
use pallet_stake::{LockKind, Tier};
use sp_core::H256;

fn escrow_ref(byte: u8) -> H256 {
    H256::repeat_byte(byte)
}

fn open_case(value: u128) -> CaseId {
    open_case_between(value, BUYER, SELLER)
}

fn open_case_between(value: u128, buyer: u64, seller: u64) -> CaseId {
    let id = CaseId(crate::NextCaseId::<Test>::get());
    assert_ok!(Moderation::open_dispute(
        RuntimeOrigin::signed(MODULE),
        escrow_ref(id.0 as u8),
        value,
        buyer,
        seller,
    ));
    id
}

/// All three pool moderators vote; the first two with `majority`, the third
/// with `minority`.
fn vote_all(case_id: CaseId, majority: Vote, minority: Vote) {
    assert_ok!(Moderation::submit_vote(RuntimeOrigin::signed(MODS[0]), case_id, majority));
    assert_ok!(Moderation::submit_vote(RuntimeOrigin::signed(MODS[1]), case_id, majority));
    assert_ok!(Moderation::submit_vote(RuntimeOrigin::signed(MODS[2]), case_id, minority));
}

#[test]
fn open_dispute_requires_whitelisted_module() {
    new_test_ext().execute_with(|| {
        assert_noop!(
            Moderation::open_dispute(RuntimeOrigin::signed(3), escrow_ref(1), 10_000, BUYER, SELLER),
            Error::<Test>::NotAuthorized
        );
        assert_noop!(
            Moderation::open_dispute(
                RuntimeOrigin::signed(MODULE),
                escrow_ref(1),
                10_000,
                BUYER,
                BUYER
            ),
            Error::<Test>::InvalidParticipants
        );
    });
}

#[test]
fn open_dispute_assigns_eligible_panel() {
    new_test_ext().execute_with(|| {
        stake_mods([15_000, 20_000, 30_000]);
        let case_id = open_case(10_000);

        let case = Moderation::case(case_id).unwrap();
        assert_eq!(case.state, DisputeState::Voting);
        let mut panel: Vec<u64> = case.moderators.clone().into_inner();
        panel.sort_unstable();
        assert_eq!(panel, MODS.to_vec());

        // every panel member is locked in until the case closes
        for m in MODS {
            assert!(Stake::lock_state(m, LockKind::ActiveDispute).is_some());
            assert_noop!(
                Stake::begin_unstake(RuntimeOrigin::signed(m), 1_000),
                pallet_stake::Error::<Test>::LockActive
            );
        }
    });
}

#[test]
fn clean_dispute_resolution() {
    new_test_ext().execute_with(|| {
        // moderators with stakes 15k/20k/30k, all reputation 100
        stake_mods([15_000, 20_000, 30_000]);
        let case_id = open_case(10_000);

        vote_all(case_id, Vote::ReleaseBuyer, Vote::RefundSeller);

        let case = Moderation::case(case_id).unwrap();
        assert_eq!(case.state, DisputeState::Resolved);
        assert_eq!(case.resolution, Some(Resolution::ReleaseBuyer));
        System::assert_has_event(
            Event::DisputeResolved { case_id, resolution: Resolution::ReleaseBuyer }.into(),
        );

        // the majority voters earn the moderation bonus; the minority voter
        // is left untouched
        assert_eq!(Reputation::score(MODS[0]), Score(10_400));
        assert_eq!(Reputation::score(MODS[1]), Score(10_400));
        assert_eq!(Reputation::score(MODS[2]), Score(10_000));

        // dispute locks are gone
        for m in MODS {
            assert!(Stake::lock_state(m, LockKind::ActiveDispute).is_none());
        }
    });
}

#[test]
fn votes_are_final_and_outsiders_rejected() {
    new_test_ext().execute_with(|| {
        stake_mods([15_000, 20_000, 30_000]);
        let case_id = open_case(10_000);

        assert_ok!(Moderation::submit_vote(
            RuntimeOrigin::signed(MODS[0]),
            case_id,
            Vote::ReleaseBuyer
        ));
        assert_noop!(
            Moderation::submit_vote(RuntimeOrigin::signed(MODS[0]), case_id, Vote::Split),
            Error::<Test>::AlreadyVoted
        );
        assert_noop!(
            Moderation::submit_vote(RuntimeOrigin::signed(3), case_id, Vote::Split),
            Error::<Test>::NotModerator
        );

        // past the deadline, votes bounce even before the sweep runs
        System::set_block_number(20);
        assert_noop!(
            Moderation::submit_vote(RuntimeOrigin::signed(MODS[1]), case_id, Vote::Split),
            Error::<Test>::VotingClosed
        );
    });
}

#[test]
fn insufficient_moderators_falls_back_to_even_split() {
    new_test_ext().execute_with(|| {
        // nobody staked: no eligible panel
        let case_id = open_case(10_000);
        System::assert_has_event(Event::InsufficientModerators { case_id }.into());
        assert_eq!(Moderation::case(case_id).unwrap().state, DisputeState::Open);

        run_to_block(12);
        let case = Moderation::case(case_id).unwrap();
        assert_eq!(case.state, DisputeState::Resolved);
        assert_eq!(case.resolution, Some(Resolution::EmergencyEvenSplit));
    });
}

#[test]
fn timeout_resolves_from_received_votes() {
    new_test_ext().execute_with(|| {
        stake_mods([15_000, 20_000, 30_000]);
        let case_id = open_case(10_000);

        assert_ok!(Moderation::submit_vote(
            RuntimeOrigin::signed(MODS[0]),
            case_id,
            Vote::ReleaseBuyer
        ));
        assert_ok!(Moderation::submit_vote(
            RuntimeOrigin::signed(MODS[1]),
            case_id,
            Vote::ReleaseBuyer
        ));

        run_to_block(12);
        let case = Moderation::case(case_id).unwrap();
        assert_eq!(case.resolution, Some(Resolution::ReleaseBuyer));

        // the absentee pays the absence penalty
        assert_eq!(Reputation::score(MODS[0]), Score(10_400));
        assert_eq!(Reputation::score(MODS[2]), Score(9_800));
        assert!(Stake::lock_state(MODS[2], LockKind::ActiveDispute).is_none());
    });
}

#[test]
fn timeout_tie_gives_emergency_even_split() {
    new_test_ext().execute_with(|| {
        stake_mods([15_000, 20_000, 30_000]);
        let case_id = open_case(10_000);

        assert_ok!(Moderation::submit_vote(
            RuntimeOrigin::signed(MODS[0]),
            case_id,
            Vote::ReleaseBuyer
        ));
        assert_ok!(Moderation::submit_vote(
            RuntimeOrigin::signed(MODS[1]),
            case_id,
            Vote::RefundSeller
        ));

        run_to_block(12);
        let case = Moderation::case(case_id).unwrap();
        assert_eq!(case.resolution, Some(Resolution::EmergencyEvenSplit));

        // no majority, no bonus for anyone
        assert_eq!(Reputation::score(MODS[0]), Score(10_000));
        assert_eq!(Reputation::score(MODS[1]), Score(10_000));
        assert_eq!(Reputation::score(MODS[2]), Score(9_800));
    });
}

#[test]
fn banned_or_low_reputation_accounts_are_never_selected() {
    new_test_ext().execute_with(|| {
        stake_mods([15_000, 20_000, 30_000]);
        assert_ok!(Stake::ban(&MODS[2], None));

        // two eligible candidates are not enough for a panel of three
        let case_id = open_case(10_000);
        System::assert_has_event(Event::InsufficientModerators { case_id }.into());

        // a low score disqualifies just the same
        assert_ok!(Reputation::force_set_score(RuntimeOrigin::root(), MODS[1], Score(6_000)));
        let second = open_case(10_000);
        System::assert_has_event(Event::InsufficientModerators { case_id: second }.into());
    });
}

#[test]
fn appeal_overturn_applies_first_offense_penalties() {
    new_test_ext().execute_with(|| {
        stake_mods([15_000, 20_000, 30_000]);
        let case_id = open_case(10_000);
        vote_all(case_id, Vote::ReleaseBuyer, Vote::RefundSeller);

        stake_reviewers();
        assert_ok!(Moderation::open_appeal(
            RuntimeOrigin::signed(SELLER),
            case_id,
            escrow_ref(0xEE)
        ));
        let case = Moderation::case(case_id).unwrap();
        assert_eq!(case.state, DisputeState::Appealed(AppealLevel::One));
        let appeal = Moderation::appeal(case_id, AppealLevel::One).unwrap();
        let mut panel: Vec<u64> = appeal.reviewers.clone().into_inner();
        panel.sort_unstable();
        assert_eq!(panel, REVIEWERS.to_vec());

        // 4-1 to refund the seller: the resolution flips
        for reviewer in &REVIEWERS[..4] {
            assert_ok!(Moderation::submit_appeal_vote(
                RuntimeOrigin::signed(*reviewer),
                case_id,
                Vote::RefundSeller
            ));
        }
        assert_ok!(Moderation::submit_appeal_vote(
            RuntimeOrigin::signed(REVIEWERS[4]),
            case_id,
            Vote::ReleaseBuyer
        ));

        let case = Moderation::case(case_id).unwrap();
        assert_eq!(case.resolution, Some(Resolution::RefundSeller));
        assert_eq!(case.state, DisputeState::Resolved);
        assert_eq!(case.appeals_concluded, 1);
        System::assert_has_event(
            Event::AppealOverturned {
                case_id,
                level: AppealLevel::One,
                old: Resolution::ReleaseBuyer,
                new: Resolution::RefundSeller,
            }
            .into(),
        );

        // original majority: −25 each, first offense so no slash and no ban
        assert_eq!(Reputation::score(MODS[0]), Score(7_900));
        assert_eq!(Reputation::score(MODS[1]), Score(7_900));
        assert_eq!(Stake::staked(&MODS[0]), 15_000);
        assert!(!Stake::is_banned(&MODS[0]));
        // the minority voter walks away clean
        assert_eq!(Reputation::score(MODS[2]), Score(10_000));
        // the dissenting reviewer loses the review
        assert_eq!(Reputation::score(REVIEWERS[4]), Score(9_200));

        // the recovery waterfall opens with a voluntary-return window
        let recovery = Moderation::recovery(case_id).unwrap();
        assert_eq!(recovery.victim, SELLER);
        assert_eq!(recovery.recipient, BUYER);
        assert_eq!(recovery.owed, 10_000);
        System::assert_has_event(
            Event::VoluntaryReturnWindowOpened {
                case_id,
                recipient: BUYER,
                amount: 10_000,
                window_ends: recovery.window_ends,
            }
            .into(),
        );
    });
}

#[test]
fn voluntary_return_closes_recovery_without_penalties() {
    new_test_ext().execute_with(|| {
        stake_mods([15_000, 20_000, 30_000]);
        let case_id = open_case(10_000);
        vote_all(case_id, Vote::ReleaseBuyer, Vote::RefundSeller);
        stake_reviewers();
        assert_ok!(Moderation::open_appeal(
            RuntimeOrigin::signed(SELLER),
            case_id,
            escrow_ref(0xEE)
        ));
        for reviewer in REVIEWERS {
            assert_ok!(Moderation::submit_appeal_vote(
                RuntimeOrigin::signed(reviewer),
                case_id,
                Vote::RefundSeller
            ));
        }

        assert_noop!(
            Moderation::voluntary_return(RuntimeOrigin::signed(SELLER), case_id),
            Error::<Test>::NotRecipient
        );

        let seller_before = Balances::free_balance(SELLER);
        let buyer_before = Balances::free_balance(BUYER);
        assert_ok!(Moderation::voluntary_return(RuntimeOrigin::signed(BUYER), case_id));

        assert_eq!(Balances::free_balance(SELLER), seller_before + 10_000);
        assert_eq!(Balances::free_balance(BUYER), buyer_before - 10_000);
        assert!(Moderation::recovery(case_id).is_none());
        System::assert_has_event(Event::FundsReturned { case_id, amount: 10_000 }.into());

        // returning voluntarily costs no stake and no reputation
        assert_eq!(Stake::staked(&BUYER), 0);
        assert_eq!(Reputation::score(BUYER), Score(10_000));

        // the window sweep later finds nothing to execute
        run_to_block(15);
        assert!(Moderation::recovery(case_id).is_none());
    });
}

#[test]
fn appeal_window_and_participant_rules() {
    new_test_ext().execute_with(|| {
        stake_mods([15_000, 20_000, 30_000]);
        let case_id = open_case(10_000);

        // no appeal while voting is still open
        assert_noop!(
            Moderation::open_appeal(RuntimeOrigin::signed(SELLER), case_id, escrow_ref(9)),
            Error::<Test>::CaseNotResolved
        );

        vote_all(case_id, Vote::ReleaseBuyer, Vote::RefundSeller);
        assert_noop!(
            Moderation::open_appeal(RuntimeOrigin::signed(3), case_id, escrow_ref(9)),
            Error::<Test>::NotParticipant
        );

        // resolved at block 1, window 10: block 12 is too late
        run_to_block(12);
        assert_noop!(
            Moderation::open_appeal(RuntimeOrigin::signed(SELLER), case_id, escrow_ref(9)),
            Error::<Test>::AppealWindowClosed
        );
    });
}

#[test]
fn appeal_without_eligible_reviewers_is_rejected() {
    new_test_ext().execute_with(|| {
        stake_mods([15_000, 20_000, 30_000]);
        let case_id = open_case(10_000);
        vote_all(case_id, Vote::ReleaseBuyer, Vote::RefundSeller);

        // nobody at Warden tier with review-grade reputation
        assert_noop!(
            Moderation::open_appeal(RuntimeOrigin::signed(SELLER), case_id, escrow_ref(9)),
            Error::<Test>::InsufficientReviewers
        );
    });
}

#[test]
fn appeal_levels_escalate_monotonically() {
    new_test_ext().execute_with(|| {
        stake_mods([15_000, 20_000, 30_000]);
        let case_id = open_case(10_000);
        vote_all(case_id, Vote::ReleaseBuyer, Vote::RefundSeller);

        // level 1: upheld unanimously
        stake_reviewers();
        assert_ok!(Moderation::open_appeal(RuntimeOrigin::signed(SELLER), case_id, escrow_ref(1)));
        for reviewer in REVIEWERS {
            assert_ok!(Moderation::submit_appeal_vote(
                RuntimeOrigin::signed(reviewer),
                case_id,
                Vote::ReleaseBuyer
            ));
        }
        let case = Moderation::case(case_id).unwrap();
        assert_eq!(case.state, DisputeState::Resolved);
        assert_eq!(case.appeals_concluded, 1);
        System::assert_has_event(
            Event::AppealUpheld { case_id, level: AppealLevel::One }.into(),
        );
        // upholding costs the original majority nothing
        assert_eq!(Reputation::score(MODS[0]), Score(10_400));

        // level 2 needs a fresh, larger, Steward-tier panel
        for steward in 30..=36u64 {
            assert_ok!(Stake::stake(RuntimeOrigin::signed(steward), 1_000_000));
        }
        assert_ok!(Moderation::open_appeal(RuntimeOrigin::signed(SELLER), case_id, escrow_ref(2)));
        let appeal = Moderation::appeal(case_id, AppealLevel::Two).unwrap();
        assert_eq!(appeal.reviewers.len(), 7);
        for reviewer in appeal.reviewers.clone() {
            assert!((30..=36).contains(&reviewer));
            assert_ok!(Moderation::submit_appeal_vote(
                RuntimeOrigin::signed(reviewer),
                case_id,
                Vote::ReleaseBuyer
            ));
        }
        assert_eq!(Moderation::case(case_id).unwrap().appeals_concluded, 2);

        // level 3 would need nine Archons; nobody qualifies
        assert_noop!(
            Moderation::open_appeal(RuntimeOrigin::signed(SELLER), case_id, escrow_ref(3)),
            Error::<Test>::InsufficientReviewers
        );
    });
}

#[test]
fn recovery_waterfall_reports_shortfall() {
    new_test_ext().execute_with(|| {
        // wrongful recipient: 700 in bank, 400 of it staked, leaving 300 cash
        assert_ok!(Stake::stake(RuntimeOrigin::signed(6), 400));
        stake_mods([15_000, 20_000, 30_000]);
        assert_ok!(Stake::fund_reserve(RuntimeOrigin::signed(MODULE), 100));

        let case_id = open_case_between(10_000, 6, SELLER);
        // unanimous for the buyer, later overturned
        for m in MODS {
            assert_ok!(Moderation::submit_vote(
                RuntimeOrigin::signed(m),
                case_id,
                Vote::ReleaseBuyer
            ));
        }
        stake_reviewers();
        assert_ok!(Moderation::open_appeal(
            RuntimeOrigin::signed(SELLER),
            case_id,
            escrow_ref(0xEE)
        ));
        for reviewer in REVIEWERS {
            assert_ok!(Moderation::submit_appeal_vote(
                RuntimeOrigin::signed(reviewer),
                case_id,
                Vote::RefundSeller
            ));
        }

        let seller_before = Balances::free_balance(SELLER);
        // nobody returns anything; the window lapses and the waterfall runs:
        // 300 bank + 400 stake + 100 reserve + 0 first-offense slashes = 800
        run_to_block(13);

        assert_eq!(Balances::free_balance(SELLER), seller_before + 800);
        assert_eq!(Balances::free_balance(6), 0);
        assert_eq!(Stake::staked(&6), 0);
        assert_eq!(Stake::reserve_balance(), 0);
        System::assert_has_event(
            Event::RecoveryPaid { case_id, victim: SELLER, amount: 800 }.into(),
        );
        System::assert_has_event(
            Event::RecoveryShortfall { case_id, remaining: 9_200 }.into(),
        );
        assert!(Moderation::recovery(case_id).is_none());
    });
}

#[test]
fn repeat_offenses_escalate_to_slashes_and_bans() {
    new_test_ext().execute_with(|| {
        stake_mods([300_000, 300_000, 300_000]);
        assert_ok!(Stake::stake(RuntimeOrigin::signed(SELLER), 50_000));
        run_to_block(40);

        let mut reserve_expected = 0;
        for round in 1u32..=3 {
            let case_id = open_case(200_000);
            vote_all(case_id, Vote::ReleaseBuyer, Vote::RefundSeller);

            assert_ok!(Moderation::file_wrong_resolution(
                RuntimeOrigin::signed(SELLER),
                case_id,
                1_000
            ));
            let stake_before = Stake::staked(&MODS[0]);
            assert_ok!(Moderation::adjudicate_report(RuntimeOrigin::root(), case_id, true));
            assert_eq!(
                Moderation::report(case_id).unwrap().state,
                ReportState::VoluntaryReturnPending
            );

            // run past the voluntary window so the waterfall executes
            run_to_block(System::block_number() + 11);

            let expected_slash = match round {
                1 => 0,
                2 => stake_before / 20,  // 5%
                _ => stake_before / 10,  // 10%
            };
            assert_eq!(Stake::staked(&MODS[0]), stake_before - expected_slash);
            assert_eq!(Stake::staked(&MODS[1]), stake_before - expected_slash);
            // the victim was made whole from the bank clawback, so slash
            // proceeds replenish the reserve
            reserve_expected += 2 * expected_slash;
            assert_eq!(Stake::reserve_balance(), reserve_expected);

            match round {
                1 | 2 => assert!(!Stake::is_banned(&MODS[0])),
                _ => {
                    // third offense inside the window: 14-day ban
                    assert!(Stake::is_banned(&MODS[0]));
                    assert!(Stake::is_banned(&MODS[1]));
                    assert!(!Stake::is_banned(&MODS[2]));
                },
            }

            // the schedule keys off the offense history, not the score;
            // restore scores so the same panel stays eligible
            for m in &MODS[..2] {
                assert_ok!(Reputation::force_set_score(
                    RuntimeOrigin::root(),
                    *m,
                    Score(10_000)
                ));
            }
        }
    });
}

#[test]
fn false_reports_walk_the_escalating_schedule() {
    new_test_ext().execute_with(|| {
        stake_mods([15_000, 20_000, 30_000]);
        assert_ok!(Stake::stake(RuntimeOrigin::signed(SELLER), 50_000));
        run_to_block(40);

        let expected_stake = [50_000u128, 50_000, 45_000, 38_250, 28_688, 14_344];
        let expected_score =
            [Score(10_000), Score(9_000), Score(7_500), Score(5_500), Score(2_500), Score(0)];

        for offense in 1usize..=5 {
            let case_id = open_case(10_000);
            for m in MODS {
                assert_ok!(Moderation::submit_vote(
                    RuntimeOrigin::signed(m),
                    case_id,
                    Vote::ReleaseBuyer
                ));
            }

            assert_ok!(Moderation::file_wrong_resolution(
                RuntimeOrigin::signed(SELLER),
                case_id,
                1_000
            ));
            assert_ok!(Moderation::adjudicate_report(RuntimeOrigin::root(), case_id, false));
            assert_eq!(Moderation::report(case_id).unwrap().state, ReportState::Invalid);

            assert_eq!(Reputation::score(SELLER), expected_score[offense]);
            assert_eq!(Stake::staked(&SELLER), expected_stake[offense]);

            match offense {
                1 | 2 => assert!(!Stake::is_banned(&SELLER)),
                3 => {
                    // 7-day ban; wait it out before the next report
                    assert!(Stake::is_banned(&SELLER));
                    run_to_block(System::block_number() + 40);
                    assert!(!Stake::is_banned(&SELLER));
                },
                4 => {
                    // 30-day ban
                    assert!(Stake::is_banned(&SELLER));
                    run_to_block(System::block_number() + 160);
                    assert!(!Stake::is_banned(&SELLER));
                },
                _ => {
                    // fifth invalid report: 50% slash, score floored at zero,
                    // permanent ban
                    assert!(Stake::is_banned(&SELLER));
                },
            }
            if offense < 5 {
                run_to_block(System::block_number() + 6);
            }
        }

        // a permanently banned reporter is refused outright
        let case_id = open_case(10_000);
        for m in MODS {
            assert_ok!(Moderation::submit_vote(
                RuntimeOrigin::signed(m),
                case_id,
                Vote::ReleaseBuyer
            ));
        }
        assert_noop!(
            Moderation::file_wrong_resolution(RuntimeOrigin::signed(SELLER), case_id, 1_000),
            Error::<Test>::Banned
        );
        run_to_block(System::block_number() + 200);
        assert!(Stake::is_banned(&SELLER));
    });
}

#[test]
fn report_admissibility_rules() {
    new_test_ext().execute_with(|| {
        stake_mods([15_000, 20_000, 30_000]);
        let case_id = open_case(10_000);

        // unresolved case
        assert_noop!(
            Moderation::file_wrong_resolution(RuntimeOrigin::signed(SELLER), case_id, 1_000),
            Error::<Test>::CaseNotResolved
        );
        vote_all(case_id, Vote::ReleaseBuyer, Vote::RefundSeller);

        // not a participant
        assert_noop!(
            Moderation::file_wrong_resolution(RuntimeOrigin::signed(3), case_id, 1_000),
            Error::<Test>::NotParticipant
        );

        // no stake record at all
        assert_noop!(
            Moderation::file_wrong_resolution(RuntimeOrigin::signed(SELLER), case_id, 1_000),
            Error::<Test>::TierTooLow
        );

        // Holder tier is not enough
        assert_ok!(Stake::stake(RuntimeOrigin::signed(SELLER), 5_000));
        assert_eq!(Stake::tier_of(&SELLER), Tier::Holder);
        assert_noop!(
            Moderation::file_wrong_resolution(RuntimeOrigin::signed(SELLER), case_id, 1_000),
            Error::<Test>::TierTooLow
        );

        // Keeper tier but the stake is too young
        assert_ok!(Stake::stake(RuntimeOrigin::signed(SELLER), 45_000));
        assert_noop!(
            Moderation::file_wrong_resolution(RuntimeOrigin::signed(SELLER), case_id, 1_000),
            Error::<Test>::StakeTooYoung
        );

        run_to_block(40);
        // rate limit: three reports per trailing day
        let mut cases = vec![case_id];
        for _ in 0..3 {
            let id = open_case(10_000);
            vote_all(id, Vote::ReleaseBuyer, Vote::RefundSeller);
            cases.push(id);
        }
        for id in &cases[..3] {
            assert_ok!(Moderation::file_wrong_resolution(
                RuntimeOrigin::signed(SELLER),
                *id,
                1_000
            ));
        }
        assert_noop!(
            Moderation::file_wrong_resolution(RuntimeOrigin::signed(SELLER), cases[3], 1_000),
            Error::<Test>::TooManyReports
        );

        // duplicate report for the same case
        assert_noop!(
            Moderation::file_wrong_resolution(RuntimeOrigin::signed(SELLER), cases[0], 1_000),
            Error::<Test>::ReportAlreadyFiled
        );
    });
}

#[test]
fn cases_are_pruned_after_the_audit_window() {
    new_test_ext().execute_with(|| {
        stake_mods([15_000, 20_000, 30_000]);
        let case_id = open_case(10_000);
        vote_all(case_id, Vote::ReleaseBuyer, Vote::RefundSeller);
        assert!(Moderation::case(case_id).is_some());

        // resolved at block 1; retained through appeal window + audit window
        run_to_block(100);
        assert!(Moderation::case(case_id).is_some());

        run_to_block(115);
        assert!(Moderation::case(case_id).is_none());
    });
}

#[test]
fn selection_draws_full_panels_from_eligible_set() {
    new_test_ext().execute_with(|| {
        stake_mods([15_000, 20_000, 30_000]);
        stake_reviewers();

        // eight eligible candidates, panel of three: the draw must be a
        // function of on-chain inputs only
        let case_id = open_case(10_000);
        let panel = Moderation::case(case_id).unwrap().moderators;
        assert_eq!(panel.len(), 3);
        for member in panel.iter() {
            assert!(MODS.contains(member) || REVIEWERS.contains(member));
        }

        // a second draw in the same block uses a fresh nonce but still yields
        // a full, eligible panel
        let second = open_case(10_000);
        let second_panel = Moderation::case(second).unwrap().moderators;
        assert_eq!(second_panel.len(), 3);
    });
}
