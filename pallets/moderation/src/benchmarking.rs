//! Benchmarking setup for pallet-moderation.
#![cfg(feature = "runtime-benchmarks")]
use super::*;

use frame_benchmarking::v2::*;
use frame_support::{traits::Currency, weights::Weight};
use frame_system::RawOrigin;
use sp_core::H256;
use sp_std::prelude::*;

fn fund<T: Config>(who: &T::AccountId, amount: pallet_stake::StakeOf<T>) {
    let _ = <T as pallet_stake::Config>::Currency::make_free_balance_be(who, amount);
}

fn stake<T: Config>(who: &T::AccountId, amount: u64) {
    fund::<T>(who, (amount * 2).into());
    pallet_stake::Pallet::<T>::stake(RawOrigin::Signed(who.clone()).into(), amount.into())
        .expect("funded account can stake");
}

/// A funded, whitelisted escrow-module identity.
fn module<T: Config>() -> T::AccountId {
    let module: T::AccountId = account("module", 0, 0);
    pallet_stake::AuthorizedModules::<T>::insert(&module, ());
    fund::<T>(&module, 1_000_000_000u64.into());
    module
}

/// Three eligible moderators for a 10_000-value case.
fn seed_panel<T: Config>() {
    for index in 0..3u32 {
        let moderator: T::AccountId = account("moderator", index, 0);
        stake::<T>(&moderator, 30_000);
    }
}

/// Five Warden-tier reviewers for a level-one appeal.
fn seed_reviewers<T: Config>() {
    for index in 0..5u32 {
        let reviewer: T::AccountId = account("reviewer", index, 0);
        stake::<T>(&reviewer, 150_000);
    }
}

/// Open a case between fresh participants and return it with its panel.
fn open_case<T: Config>() -> (CaseId, T::AccountId, T::AccountId) {
    let buyer: T::AccountId = account("buyer", 0, 0);
    let seller: T::AccountId = account("seller", 0, 0);
    fund::<T>(&buyer, 1_000_000u64.into());
    let case_id = CaseId(NextCaseId::<T>::get());
    let module = module::<T>();
    Pallet::<T>::open_dispute(
        RawOrigin::Signed(module).into(),
        H256::repeat_byte(0xCA),
        10_000u64.into(),
        buyer.clone(),
        seller.clone(),
    )
    .expect("module can open a dispute");
    (case_id, buyer, seller)
}

fn resolve_case<T: Config>(case_id: CaseId) {
    let case = Cases::<T>::get(case_id).expect("case exists");
    for moderator in case.moderators.iter() {
        Pallet::<T>::submit_vote(
            RawOrigin::Signed(moderator.clone()).into(),
            case_id,
            Vote::ReleaseBuyer,
        )
        .expect("panel member can vote");
    }
}

#[benchmarks]
mod benchmarks {
    use super::*;

    #[benchmark]
    fn open_dispute() {
        seed_panel::<T>();
        let module = module::<T>();
        let buyer: T::AccountId = account("buyer", 0, 0);
        let seller: T::AccountId = account("seller", 0, 0);
        let case_id = CaseId(NextCaseId::<T>::get());

        #[extrinsic_call]
        _(
            RawOrigin::Signed(module),
            H256::repeat_byte(0xCA),
            10_000u64.into(),
            buyer,
            seller,
        );

        assert_eq!(Cases::<T>::get(case_id).expect("case exists").state, DisputeState::Voting);
    }

    #[benchmark]
    fn submit_vote() {
        seed_panel::<T>();
        let (case_id, _, _) = open_case::<T>();
        let moderator =
            Cases::<T>::get(case_id).expect("case exists").moderators[0].clone();

        #[extrinsic_call]
        _(RawOrigin::Signed(moderator), case_id, Vote::ReleaseBuyer);

        assert_eq!(Cases::<T>::get(case_id).expect("case exists").votes.len(), 1);
    }

    #[benchmark]
    fn open_appeal() {
        seed_panel::<T>();
        let (case_id, _, seller) = open_case::<T>();
        resolve_case::<T>(case_id);
        seed_reviewers::<T>();

        #[extrinsic_call]
        _(RawOrigin::Signed(seller), case_id, H256::repeat_byte(0xEE));

        assert_eq!(
            Cases::<T>::get(case_id).expect("case exists").state,
            DisputeState::Appealed(AppealLevel::One)
        );
    }

    #[benchmark]
    fn submit_appeal_vote() {
        seed_panel::<T>();
        let (case_id, _, seller) = open_case::<T>();
        resolve_case::<T>(case_id);
        seed_reviewers::<T>();
        Pallet::<T>::open_appeal(
            RawOrigin::Signed(seller).into(),
            case_id,
            H256::repeat_byte(0xEE),
        )
        .expect("participant can appeal");
        let reviewer = Appeals::<T>::get(case_id, AppealLevel::One)
            .expect("appeal exists")
            .reviewers[0]
            .clone();

        #[extrinsic_call]
        _(RawOrigin::Signed(reviewer), case_id, Vote::RefundSeller);

        assert_eq!(
            Appeals::<T>::get(case_id, AppealLevel::One).expect("appeal exists").votes.len(),
            1
        );
    }

    #[benchmark]
    fn file_wrong_resolution() {
        seed_panel::<T>();
        let seller: T::AccountId = account("seller", 0, 0);
        stake::<T>(&seller, 50_000);
        // age the stake past the reporter minimum
        let params = pallet_stake::Pallet::<T>::params();
        let aged = frame_system::Pallet::<T>::block_number()
            + params.blocks_per_day * 8u32.into();
        frame_system::Pallet::<T>::set_block_number(aged);

        let (case_id, _, _) = open_case::<T>();
        resolve_case::<T>(case_id);

        #[extrinsic_call]
        _(RawOrigin::Signed(seller), case_id, 1_000u64.into());

        assert!(WrongResolutions::<T>::contains_key(case_id));
    }

    #[benchmark]
    fn voluntary_return() {
        let victim: T::AccountId = account("victim", 0, 0);
        let recipient: T::AccountId = account("recipient", 0, 0);
        fund::<T>(&victim, 1_000u64.into());
        fund::<T>(&recipient, 100_000u64.into());
        let case_id = CaseId(7);
        Recoveries::<T>::insert(
            case_id,
            RecoveryOf::<T> {
                victim,
                recipient: recipient.clone(),
                owed: 10_000u64.into(),
                window_ends: frame_system::Pallet::<T>::block_number() + 100u32.into(),
                offenders: Default::default(),
            },
        );

        #[extrinsic_call]
        _(RawOrigin::Signed(recipient), case_id);

        assert!(!Recoveries::<T>::contains_key(case_id));
    }

    #[benchmark]
    fn adjudicate_report() -> Result<(), BenchmarkError> {
        seed_panel::<T>();
        let seller: T::AccountId = account("seller", 0, 0);
        stake::<T>(&seller, 50_000);
        let reporter = seller.clone();
        let counterparty: T::AccountId = account("buyer", 0, 0);
        let case_id = CaseId(7);
        WrongResolutions::<T>::insert(
            case_id,
            ReportOf::<T> {
                reporter: reporter.clone(),
                alleged_victim: reporter.clone(),
                stated_counterparty: counterparty,
                claimed_amount: 1_000u64.into(),
                state: ReportState::UnderInvestigation,
                filed_at: frame_system::Pallet::<T>::block_number(),
            },
        );
        let origin = <T as pallet_stake::Config>::GovernanceOrigin::try_successful_origin()
            .map_err(|_| BenchmarkError::Weight(Weight::zero()))?;

        #[extrinsic_call]
        _(origin as T::RuntimeOrigin, case_id, false);

        assert_eq!(
            WrongResolutions::<T>::get(case_id).expect("report exists").state,
            ReportState::Invalid
        );
        Ok(())
    }

    impl_benchmark_test_suite!(Pallet, crate::mock::new_test_ext(), crate::mock::Test);
}
