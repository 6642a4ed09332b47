//! Benchmarking setup for pallet-reputation.
#![cfg(feature = "runtime-benchmarks")]
use super::*;

use frame_benchmarking::v2::*;
use frame_system::RawOrigin;

#[benchmarks]
mod benchmarks {
    use super::*;

    #[benchmark]
    fn force_set_score() {
        let account: T::AccountId = whitelisted_caller();
        let score = Score::from_hundredths(12_000);

        #[extrinsic_call]
        _(RawOrigin::Root, account.clone(), score);

        assert_eq!(Pallet::<T>::score(account), score);
    }

    #[benchmark]
    fn set_event_delta() {
        #[extrinsic_call]
        _(RawOrigin::Root, ReputationEvent::LoanRepaid, 700);

        assert_eq!(Pallet::<T>::delta_override(ReputationEvent::LoanRepaid), Some(700));
    }

    impl_benchmark_test_suite!(Pallet, crate::mock::new_test_ext(), crate::mock::Test);
}
