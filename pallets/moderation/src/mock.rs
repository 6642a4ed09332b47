//! Test environment for the moderation pallet.

use crate as pallet_moderation;
use frame_support::{
    derive_impl,
    traits::{ConstU16, ConstU32, ConstU64, ConstU128},
};
use frame_system::EnsureRoot;
use pallet_stake::TrustParams;
use sp_core::H256;
use sp_runtime::{
    traits::{BlakeTwo256, IdentityLookup},
    BuildStorage,
};

type Block = frame_system::mocking::MockBlock<Test>;
pub type Balance = u128;

/// The whitelisted escrow-module identity used by tests.
pub const MODULE: u64 = 99;
/// Default case participants.
pub const BUYER: u64 = 1;
pub const SELLER: u64 = 2;
/// The first-instance moderator pool.
pub const MODS: [u64; 3] = [10, 11, 12];
/// The appeal reviewer pool.
pub const REVIEWERS: [u64; 5] = [20, 21, 22, 23, 24];

frame_support::construct_runtime!(
    pub enum Test {
        System: frame_system,
        Balances: pallet_balances,
        Reputation: pallet_reputation,
        Stake: pallet_stake,
        Moderation: pallet_moderation,
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

impl pallet_moderation::Config for Test {
    type RuntimeEvent = RuntimeEvent;
    type WeightInfo = ();
}

/// Short timings so tests can cross every deadline quickly. One "day" is five
/// blocks.
pub fn test_params() -> TrustParams<Balance, u64> {
    TrustParams {
        epoch_length: 1_000,
        unbonding_delay: 20,
        dispute_voting_period: 10,
        appeal_window: 10,
        voluntary_return_window: 10,
        case_audit_window: 100,
        blocks_per_day: 5,
        work_budget: 32,
        ..TrustParams::default()
    }
}

pub fn new_test_ext() -> sp_io::TestExternalities {
    let mut t = frame_system::GenesisConfig::<Test>::default().build_storage().unwrap();
    pallet_balances::GenesisConfig::<Test> {
        balances: vec![
            (BUYER, 200_000),
            (SELLER, 1_000_000),
            (3, 1_000_000),
            (6, 700),
            (10, 1_000_000),
            (11, 1_000_000),
            (12, 1_000_000),
            (20, 1_000_000),
            (21, 1_000_000),
            (22, 1_000_000),
            (23, 1_000_000),
            (24, 1_000_000),
            (30, 2_000_000),
            (31, 2_000_000),
            (32, 2_000_000),
            (33, 2_000_000),
            (34, 2_000_000),
            (35, 2_000_000),
            (36, 2_000_000),
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

/// Walk block by block, running both pallets' end-of-block hooks.
pub fn run_to_block(n: u64) {
    use frame_support::traits::Hooks;
    while System::block_number() < n {
        let next = System::block_number() + 1;
        System::set_block_number(next);
        Stake::on_initialize(next);
        Moderation::on_initialize(next);
    }
}

/// Stake the three-member moderator pool at the given amounts.
pub fn stake_mods(amounts: [Balance; 3]) {
    for (who, amount) in MODS.iter().zip(amounts) {
        frame_support::assert_ok!(Stake::stake(RuntimeOrigin::signed(*who), amount));
    }
}

/// Stake all five reviewers high enough for Warden-tier review duty.
pub fn stake_reviewers() {
    for who in REVIEWERS {
        frame_support::assert_ok!(Stake::stake(RuntimeOrigin::signed(who), 150_000));
    }
}
