//! Test environment for the stake pallet.

use crate as pallet_stake;
use crate::TrustParams;
use frame_support::{
    derive_impl,
    traits::{ConstU16, ConstU32, ConstU64, ConstU128},
};
use frame_system::EnsureRoot;
use sp_core::H256;
use sp_runtime::{
    traits::{BlakeTwo256, IdentityLookup},
    BuildStorage,
};

type Block = frame_system::mocking::MockBlock<Test>;
pub type Balance = u128;

/// The whitelisted external-module identity used by tests.
pub const MODULE: u64 = 99;

frame_support::construct_runtime!(
    pub enum Test {
        System: frame_system,
        Balances: pallet_balances,
        Reputation: pallet_reputation,
        Stake: pallet_stake,
    }
);

#[derive_impl(frame_system::config_preludes::TestDefaultConfig)]
impl frame_system::Config for Test {
    type BaseCallFilter = frame_support::traits::Everything;
    type BlockWeights = ();
    type BlockLength = ();
    type DbWeight = ();
    type RuntimeOrigin = RuntimeOrigin;
    type RuntimeCall = RuntimeCall;
    type Hash = H256;
    type Hashing = BlakeTwo256;
    type AccountId = u64;
    type Lookup = IdentityLookup<Self::AccountId>;
    type RuntimeEvent = RuntimeEvent;
    type BlockHashCount = ConstU64<250>;
    type Version = ();
    type Nonce = u64;
    type Block = Block;
    type PalletInfo = PalletInfo;
    type AccountData = pallet_balances::AccountData<Balance>;
    type OnNewAccount = ();
    type OnKilledAccount = ();
    type SystemWeightInfo = ();
    type SS58Prefix = ConstU16<42>;
    type OnSetCode = ();
    type MaxConsumers = ConstU32<16>;
}

impl pallet_balances::Config for Test {
    type MaxLocks = ConstU32<1024>;
    type MaxReserves = ();
    type ReserveIdentifier = [u8; 8];
    type Balance = Balance;
    type RuntimeEvent = RuntimeEvent;
    type DustRemoval = ();
    type ExistentialDeposit = ConstU128<1>;
    type AccountStore = System;
    type WeightInfo = ();
    type FreezeIdentifier = ();
    type MaxFreezes = ();
    type RuntimeHoldReason = ();
    type RuntimeFreezeReason = ();
    type DoneSlashHandler = ();
}

impl pallet_reputation::Config for Test {
    type RuntimeEvent = RuntimeEvent;
    type ReputationListener = Stake;
    type WeightInfo = ();
}

impl pallet_stake::Config for Test {
    type RuntimeEvent = RuntimeEvent;
    type Currency = Balances;
    type StakeBalance = Balance;
    type GovernanceOrigin = EnsureRoot<u64>;
    type MaxSchedulePerBlock = ConstU32<64>;
    type WeightInfo = ();
}

/// Short timings so tests can cross every deadline quickly.
pub fn test_params() -> TrustParams<Balance, u64> {
    TrustParams {
        epoch_length: 10,
        unbonding_delay: 20,
        dispute_voting_period: 10,
        appeal_window: 10,
        voluntary_return_window: 10,
        case_audit_window: 100,
        blocks_per_day: 5,
        work_budget: 16,
        ..TrustParams::default()
    }
}

pub fn new_test_ext() -> sp_io::TestExternalities {
    let mut t = frame_system::GenesisConfig::<Test>::default().build_storage().unwrap();
    pallet_balances::GenesisConfig::<Test> {
        balances: vec![
            (1, 200_000),
            (2, 1_000_000),
            (3, 1_000_000),
            (4, 1_000_000),
            (5, 1_000_000),
            (MODULE, 1_000_000),
        ],
        dev_accounts: None,
    }
    .assimilate_storage(&mut t)
    .unwrap();
    pallet_stake::GenesisConfig::<Test> {
        params: test_params(),
        authorized_modules: vec![MODULE],
        stakes: vec![],
    }
    .assimilate_storage(&mut t)
    .unwrap();

    let mut ext: sp_io::TestExternalities = t.into();
    ext.execute_with(|| System::set_block_number(1));
    ext
}

/// Walk block by block, running the stake pallet's end-of-block hook.
pub fn run_to_block(n: u64) {
    use frame_support::traits::Hooks;
    while System::block_number() < n {
        let next = System::block_number() + 1;
        System::set_block_number(next);
        Stake::on_initialize(next);
    }
}
