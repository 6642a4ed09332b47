//! Benchmarking setup for pallet-stake.
#![cfg(feature = "runtime-benchmarks")]
use super::*;

use frame_benchmarking::v2::*;
use frame_support::{traits::Currency, weights::Weight};
use frame_system::RawOrigin;
use sp_core::H256;
use sp_runtime::traits::Zero;

fn fund<T: Config>(who: &T::AccountId, amount: StakeOf<T>) {
    let _ = T::Currency::make_free_balance_be(who, amount);
}

/// A funded, whitelisted external-module identity.
fn module<T: Config>() -> T::AccountId {
    let module: T::AccountId = account("module", 0, 0);
    AuthorizedModules::<T>::insert(&module, ());
    fund::<T>(&module, 1_000_000_000u64.into());
    module
}

/// A funded staker with the given stake already in the ledger.
fn staker<T: Config>(amount: u64) -> T::AccountId {
    let who: T::AccountId = whitelisted_caller();
    fund::<T>(&who, (amount * 2).into());
    Pallet::<T>::stake(RawOrigin::Signed(who.clone()).into(), amount.into())
        .expect("funded caller can stake");
    who
}

#[benchmarks]
mod benchmarks {
    use super::*;

    #[benchmark]
    fn update_params() -> Result<(), BenchmarkError> {
        let origin = T::GovernanceOrigin::try_successful_origin()
            .map_err(|_| BenchmarkError::Weight(Weight::zero()))?;

        #[extrinsic_call]
        _(origin as T::RuntimeOrigin, TrustParams::default());

        assert!(RetierActive::<T>::get());
        Ok(())
    }

    #[benchmark]
    fn authorize_module() -> Result<(), BenchmarkError> {
        let origin = T::GovernanceOrigin::try_successful_origin()
            .map_err(|_| BenchmarkError::Weight(Weight::zero()))?;
        let module: T::AccountId = account("module", 0, 0);

        #[extrinsic_call]
        _(origin as T::RuntimeOrigin, module.clone());

        assert!(AuthorizedModules::<T>::contains_key(&module));
        Ok(())
    }

    #[benchmark]
    fn stake() {
        let who: T::AccountId = whitelisted_caller();
        fund::<T>(&who, 400_000u64.into());

        #[extrinsic_call]
        _(RawOrigin::Signed(who.clone()), 200_000u64.into());

        assert_eq!(Pallet::<T>::staked(&who), 200_000u64.into());
    }

    #[benchmark]
    fn begin_unstake() {
        let who = staker::<T>(200_000);

        #[extrinsic_call]
        _(RawOrigin::Signed(who.clone()), 100_000u64.into());

        assert!(Unbonding::<T>::contains_key(&who));
    }

    #[benchmark]
    fn complete_unstake() {
        let who = staker::<T>(200_000);
        Pallet::<T>::begin_unstake(RawOrigin::Signed(who.clone()).into(), 100_000u64.into())
            .expect("staker can begin unstaking");
        let matured = frame_system::Pallet::<T>::block_number()
            + Params::<T>::get().unbonding_delay
            + 1u32.into();
        frame_system::Pallet::<T>::set_block_number(matured);

        #[extrinsic_call]
        _(RawOrigin::Signed(who.clone()));

        assert!(!Unbonding::<T>::contains_key(&who));
    }

    #[benchmark]
    fn cancel_unstake() {
        let who = staker::<T>(200_000);
        Pallet::<T>::begin_unstake(RawOrigin::Signed(who.clone()).into(), 100_000u64.into())
            .expect("staker can begin unstaking");

        #[extrinsic_call]
        _(RawOrigin::Signed(who.clone()));

        assert_eq!(Pallet::<T>::staked(&who), 200_000u64.into());
    }

    #[benchmark]
    fn claim_rewards() {
        let who = staker::<T>(200_000);
        let module = module::<T>();
        Pallet::<T>::distribute(RawOrigin::Signed(module).into(), 1_000_000u64.into())
            .expect("module can distribute");

        #[extrinsic_call]
        _(RawOrigin::Signed(who.clone()));

        assert!(Pallet::<T>::ledger(&who).expect("ledger exists").pending_rewards.is_zero());
    }

    #[benchmark]
    fn declare_validator() {
        let threshold = Params::<T>::get().tier_thresholds[5];
        let who: T::AccountId = whitelisted_caller();
        fund::<T>(&who, threshold + threshold);
        Pallet::<T>::stake(RawOrigin::Signed(who.clone()).into(), threshold)
            .expect("funded caller can stake to the top tier");

        #[extrinsic_call]
        _(RawOrigin::Signed(who.clone()));

        assert!(Pallet::<T>::ledger(&who).expect("ledger exists").is_validator);
    }

    #[benchmark]
    fn distribute() {
        let module = module::<T>();

        #[extrinsic_call]
        _(RawOrigin::Signed(module), 1_000_000u64.into());

        assert!(!Pools::<T>::get().distributed_this_epoch.is_zero()
            || !Pools::<T>::get().pool(crate::PoolKind::Staker).undistributed.is_zero());
    }

    #[benchmark]
    fn add_commitment() {
        let who = staker::<T>(200_000);
        let module = module::<T>();

        #[extrinsic_call]
        _(
            RawOrigin::Signed(module),
            who.clone(),
            CommitmentKind::Escrow,
            H256::repeat_byte(1),
            100_000u64.into(),
            None,
        );

        assert_eq!(Pallet::<T>::committed(&who), 100_000u64.into());
    }

    #[benchmark]
    fn release_commitment() {
        let who = staker::<T>(200_000);
        let module = module::<T>();
        Pallet::<T>::add_commitment(
            RawOrigin::Signed(module.clone()).into(),
            who.clone(),
            CommitmentKind::Escrow,
            H256::repeat_byte(1),
            100_000u64.into(),
            None,
        )
        .expect("module can pledge");

        #[extrinsic_call]
        _(RawOrigin::Signed(module), who.clone(), CommitmentKind::Escrow, H256::repeat_byte(1));

        assert!(Pallet::<T>::committed(&who).is_zero());
    }

    #[benchmark]
    fn slash_commitment() {
        let who = staker::<T>(200_000);
        let module = module::<T>();
        let beneficiary: T::AccountId = account("beneficiary", 0, 0);
        Pallet::<T>::add_commitment(
            RawOrigin::Signed(module.clone()).into(),
            who.clone(),
            CommitmentKind::Escrow,
            H256::repeat_byte(1),
            100_000u64.into(),
            None,
        )
        .expect("module can pledge");

        #[extrinsic_call]
        _(
            RawOrigin::Signed(module),
            who.clone(),
            CommitmentKind::Escrow,
            H256::repeat_byte(1),
            100_000u64.into(),
            beneficiary.clone(),
        );

        assert_eq!(Pallet::<T>::staked(&who), 100_000u64.into());
        assert_eq!(T::Currency::free_balance(&beneficiary), 100_000u64.into());
    }

    #[benchmark]
    fn add_lock() {
        let who = staker::<T>(200_000);
        let module = module::<T>();

        #[extrinsic_call]
        _(RawOrigin::Signed(module), who.clone(), LockKind::ActiveLoan, None);

        assert!(Pallet::<T>::lock_state(&who, LockKind::ActiveLoan).is_some());
    }

    #[benchmark]
    fn release_lock() {
        let who = staker::<T>(200_000);
        let module = module::<T>();
        Pallet::<T>::add_lock(
            RawOrigin::Signed(module.clone()).into(),
            who.clone(),
            LockKind::ActiveLoan,
            None,
        )
        .expect("module can lock");

        #[extrinsic_call]
        _(RawOrigin::Signed(module), who.clone(), LockKind::ActiveLoan);

        assert!(Pallet::<T>::lock_state(&who, LockKind::ActiveLoan).is_none());
    }

    #[benchmark]
    fn fund_reserve() {
        let module = module::<T>();

        #[extrinsic_call]
        _(RawOrigin::Signed(module), 100_000u64.into());

        assert_eq!(Pallet::<T>::reserve_balance(), 100_000u64.into());
    }

    impl_benchmark_test_suite!(Pallet, crate::mock::new_test_ext(), crate::mock::Test);
}
