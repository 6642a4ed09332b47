//!
//! # Module Overview
//!
//! Unified trust-stake ledger: the single staked balance that simultaneously
//! places an account in a capability tier, caps the value of activities the
//! account may pledge itself to, and provides slashable collateral.
//!
//! The pallet owns four tightly coupled pieces of state:
//!
//! - **Parameter store** — governance-mutable thresholds, multipliers, slash
//!   rates, epoch/unbonding timings and the shared per-block work budget.
//!   Threshold changes never re-bucket stakes inside the block of the change;
//!   a cursor-bounded sweep retiers accounts afterwards.
//! - **Stake ledger** — per-account staked amount, cached tier, pending
//!   rewards and validator flag. Funds live in a pallet-owned escrow account;
//!   staking and unstaking are plain `Currency` transfers against it.
//! - **Commitment & lock book** — amounts pledged to named external activities
//!   (escrow, lending, P2P) and boolean locks. The sum of active commitments
//!   caps withdrawals; any active lock vetoes `begin_unstake` entirely.
//! - **Unbonding queue** — at most one in-flight withdrawal per account,
//!   matured by the end-of-block hook in deterministic maturity order.
//!
//! Rewards are distributed accumulator-style: each pool tracks reward-per-unit
//! weight, each account keeps a weight snapshot plus checkpoint, and the owed
//! amount is settled whenever the weight inputs (stake, tier, reputation,
//! validator flag, ban state) change.
//!
//! The commitment/lock hooks and the treasury `distribute` entry point are
//! callable only by governance-whitelisted module identities; everything else
//! is gated by the signed caller or the governance origin.

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(clippy::all)]

use pallet_reputation::{ReputationEvent, Score};
use parity_scale_codec::{Decode, DecodeWithMemTracking, Encode, MaxEncodedLen};
use scale_info::TypeInfo;
use sp_runtime::{
    traits::{AtLeast32BitUnsigned, Zero},
    RuntimeDebug,
};

#[cfg(test)]
pub(crate) mod mock;

#[cfg(feature = "runtime-benchmarks")]
mod benchmarking;

pub mod rewards;
pub mod weights;

mod pallet;

pub use pallet::{pallet::*, *};
pub use rewards::{PoolKind, RewardPools};
pub use weights::WeightInfo;

pub(crate) const LOG_TARGET: &str = "runtime::stake";

// syntactic sugar for logging.
#[macro_export]
macro_rules! log {
    ($level:tt, $patter:expr $(, $values:expr)* $(,)?) => {
        log::$level!(
            target: $crate::LOG_TARGET,
            concat!("[{:?}] ", $patter), <frame_system::Pallet<T>>::block_number() $(, $values)*
        )
    };
}

/// The balance type of this pallet.
pub type StakeOf<T> = <T as Config>::StakeBalance;

/// Capability tier derived from the staked amount under the current
/// thresholds. Ordering follows privilege: `Holder < … < Validator`.
#[derive(
    Clone,
    Copy,
    Default,
    Encode,
    Decode, DecodeWithMemTracking,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    MaxEncodedLen,
    TypeInfo,
    RuntimeDebug,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum Tier {
    /// Stake below the lowest threshold.
    #[default]
    None,
    Holder,
    Keeper,
    Warden,
    Steward,
    Archon,
    Validator,
}

impl Tier {
    /// All six funded tiers, lowest first. Indexes into the threshold and
    /// multiplier arrays of [`TrustParams`].
    pub const FUNDED: [Tier; 6] =
        [Tier::Holder, Tier::Keeper, Tier::Warden, Tier::Steward, Tier::Archon, Tier::Validator];

    /// Index into the parameter arrays; `None` for the unfunded tier.
    pub fn index(self) -> Option<usize> {
        Self::FUNDED.iter().position(|t| *t == self)
    }

    /// The highest tier whose threshold is satisfied by `stake`.
    pub fn for_stake<Balance: Ord + Copy>(thresholds: &[Balance; 6], stake: Balance) -> Tier {
        let mut tier = Tier::None;
        for (i, threshold) in thresholds.iter().enumerate() {
            if stake >= *threshold {
                tier = Self::FUNDED[i];
            }
        }
        tier
    }

    /// Reward multiplier in hundredths under `params`; neutral (`1.00×`) for
    /// the unfunded tier.
    pub fn multiplier<Balance, BlockNumber>(
        self,
        params: &TrustParams<Balance, BlockNumber>,
    ) -> u32 {
        match self.index() {
            Some(i) => params.tier_multipliers[i],
            None => 100,
        }
    }
}

/// Which external activity a commitment pledges stake to.
#[derive(
    Clone, Copy, Encode, Decode, DecodeWithMemTracking, PartialEq, Eq, MaxEncodedLen, TypeInfo, RuntimeDebug,
)]
pub enum CommitmentKind {
    /// Escrowed P2P trade under dispute protection.
    Escrow,
    /// Collateral behind an active loan.
    Lending,
    /// Direct P2P trade pledge.
    P2p,
}

/// An amount of stake pledged against a specific external activity reference.
#[derive(Clone, Encode, Decode, PartialEq, Eq, MaxEncodedLen, TypeInfo, RuntimeDebug)]
pub struct Commitment<Balance, BlockNumber> {
    /// Portion of the stake pledged.
    pub amount: Balance,
    /// Block the pledge was made at.
    pub created_at: BlockNumber,
    /// Automatic release height, if any.
    pub expires_at: Option<BlockNumber>,
}

/// Qualitative markers that veto unstaking while present.
#[derive(
    Clone, Copy, Encode, Decode, DecodeWithMemTracking, PartialEq, Eq, MaxEncodedLen, TypeInfo, RuntimeDebug,
)]
pub enum LockKind {
    CompanyListing,
    PendingListing,
    ActiveLoan,
    ActiveDispute,
    PendingVote,
    Ban,
    ValidatorRole,
    ModeratorRole,
}

/// State of a lock of one kind on one account. `count` tracks overlapping
/// holds of the same kind (a moderator sitting on two live cases holds one
/// `ActiveDispute` entry with `count == 2`).
#[derive(Clone, Encode, Decode, PartialEq, Eq, MaxEncodedLen, TypeInfo, RuntimeDebug)]
pub struct LockState<BlockNumber> {
    /// Number of overlapping holds.
    pub count: u32,
    /// Expiry height; `None` holds until released (or forever, for a
    /// permanent ban).
    pub expires_at: Option<BlockNumber>,
}

impl<BlockNumber: PartialOrd + Copy> LockState<BlockNumber> {
    /// Whether the lock still binds at `now`.
    pub fn is_active(&self, now: BlockNumber) -> bool {
        match self.expires_at {
            Some(expiry) => expiry > now,
            None => true,
        }
    }
}

/// An in-flight withdrawal. At most one per account.
#[derive(Clone, Encode, Decode, PartialEq, Eq, MaxEncodedLen, TypeInfo, RuntimeDebug)]
pub struct UnbondingRequest<Balance, BlockNumber> {
    /// Amount moved out of the staked balance.
    pub amount: Balance,
    /// Block the withdrawal was requested at.
    pub requested_at: BlockNumber,
    /// First block the funds can be paid out at.
    pub completes_at: BlockNumber,
}

/// Snapshot of one account's standing in one reward pool.
#[derive(
    Clone, Copy, Default, Encode, Decode, PartialEq, Eq, MaxEncodedLen, TypeInfo, RuntimeDebug,
)]
pub struct PoolSnapshot {
    /// The weight the account entered the pool with.
    pub weight: u128,
    /// Pool accumulator value at the last settlement.
    pub checkpoint: u128,
}

/// Per-account ledger entry: the root of all trust-stake state.
#[derive(Clone, Encode, Decode, PartialEq, Eq, MaxEncodedLen, TypeInfo, RuntimeDebug)]
pub struct StakeLedger<Balance, BlockNumber> {
    /// Currently staked amount, in micro-units of the native token.
    pub staked: Balance,
    /// Cached tier; always equals `Tier::for_stake` of `staked` under the
    /// current thresholds, except while a parameter-change sweep is catching
    /// up.
    pub tier: Tier,
    /// Settled but unclaimed rewards.
    pub pending_rewards: Balance,
    /// Block of the first stake (reset when the record is recreated).
    pub staked_at: BlockNumber,
    /// Epoch of the last reward settlement, for audit.
    pub last_reward_epoch: u32,
    /// Whether the account has declared the validator role.
    pub is_validator: bool,
    /// Reward-pool snapshots, indexed by [`PoolKind`].
    pub snapshots: [PoolSnapshot; 3],
}

impl<Balance: Zero + Copy, BlockNumber: Copy> StakeLedger<Balance, BlockNumber> {
    /// A fresh ledger entry created at `now`.
    pub fn new(now: BlockNumber) -> Self {
        Self {
            staked: Balance::zero(),
            tier: Tier::None,
            pending_rewards: Balance::zero(),
            staked_at: now,
            last_reward_epoch: 0,
            is_validator: false,
            snapshots: [PoolSnapshot::default(); 3],
        }
    }

    /// Whether the entry carries no state worth keeping.
    pub fn is_empty(&self) -> bool {
        self.staked.is_zero() && self.pending_rewards.is_zero() && !self.is_validator
    }
}

/// Why stake was taken from an account. Carried on the `Slashed` event.
#[derive(
    Clone, Copy, Encode, Decode, DecodeWithMemTracking, PartialEq, Eq, MaxEncodedLen, TypeInfo, RuntimeDebug,
)]
pub enum SlashReason {
    /// A pledged commitment was slashed by the module that held it.
    Commitment,
    /// Moderator penalty after an overturned resolution.
    ModeratorPenalty,
    /// Clawback of wrongfully received funds.
    Clawback,
    /// Escalating penalty for invalid wrong-resolution reports.
    FalseReport,
    /// Validator offense reported by the host consensus layer.
    Offense,
}

/// Validator offenses the host consensus layer can report. Each maps to a
/// governance-set slash fraction and a reputation event.
#[derive(
    Clone, Copy, Encode, Decode, DecodeWithMemTracking, PartialEq, Eq, MaxEncodedLen, TypeInfo, RuntimeDebug,
)]
pub enum OffenseKind {
    /// Missed liveness duty.
    Downtime,
    /// Equivocation.
    DoubleSign,
    /// Provable fraud attempt.
    Fraud,
}

impl OffenseKind {
    /// The slash fraction for this offense under `params`, in basis points.
    pub fn slash_bp<Balance, BlockNumber>(self, params: &TrustParams<Balance, BlockNumber>) -> u32 {
        match self {
            OffenseKind::Downtime => params.downtime_slash_bp,
            OffenseKind::DoubleSign => params.double_sign_slash_bp,
            OffenseKind::Fraud => params.fraud_slash_bp,
        }
    }

    /// The reputation event charged alongside the slash.
    pub fn reputation_event(self) -> ReputationEvent {
        match self {
            OffenseKind::Downtime => ReputationEvent::Downtime,
            OffenseKind::DoubleSign => ReputationEvent::DoubleSign,
            OffenseKind::Fraud => ReputationEvent::Fraud,
        }
    }
}

/// Every governance-mutable constant of the engine.
///
/// `update_params` validates the whole struct at once; invalid combinations
/// never reach storage.
#[derive(
    Clone,
    Encode,
    Decode,
    DecodeWithMemTracking,
    PartialEq,
    Eq,
    MaxEncodedLen,
    TypeInfo,
    RuntimeDebug,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct TrustParams<Balance, BlockNumber> {
    /// Minimum stake per funded tier, strictly ascending.
    pub tier_thresholds: [Balance; 6],
    /// Reward multiplier per funded tier, hundredths, each in `[100, 1000]`.
    pub tier_multipliers: [u32; 6],
    /// Validator downtime slash, basis points of stake.
    pub downtime_slash_bp: u32,
    /// Double-sign slash, basis points of stake.
    pub double_sign_slash_bp: u32,
    /// Fraud slash, basis points of stake.
    pub fraud_slash_bp: u32,
    /// Blocks per reward/reputation epoch.
    pub epoch_length: BlockNumber,
    /// Blocks between `begin_unstake` and payout eligibility.
    pub unbonding_delay: BlockNumber,
    /// Reputation decay per epoch, basis points.
    pub decay_bp_per_epoch: u32,
    /// Reputation recovery per epoch for below-baseline scores, hundredths.
    pub recovery_per_epoch: u16,
    /// Minimum score for the governance reward pool.
    pub governance_reward_threshold: Score,
    /// Staker pool share of each distribution, percent.
    pub staker_pool_pct: u8,
    /// Validator pool share, percent.
    pub validator_pool_pct: u8,
    /// Governance pool share, percent.
    pub governance_pool_pct: u8,
    /// Blocks a dispute stays open for moderator votes.
    pub dispute_voting_period: BlockNumber,
    /// Blocks after a resolution during which an appeal may be opened.
    pub appeal_window: BlockNumber,
    /// Blocks the wrongful recipient has to return funds voluntarily.
    pub voluntary_return_window: BlockNumber,
    /// Blocks a closed case stays readable before pruning.
    pub case_audit_window: BlockNumber,
    /// Block equivalent of one day, for appeal deadlines and report rate
    /// limiting.
    pub blocks_per_day: BlockNumber,
    /// Shared per-block budget for end-of-block housekeeping, in accounts or
    /// queue buckets.
    pub work_budget: u32,
}

impl<Balance, BlockNumber> TrustParams<Balance, BlockNumber>
where
    Balance: Ord + Copy,
    BlockNumber: AtLeast32BitUnsigned + Copy,
{
    /// Structural validity: ascending thresholds, multipliers and slashes in
    /// range, pool split summing to exactly 100, non-degenerate timings.
    pub fn is_valid(&self) -> bool {
        self.tier_thresholds.windows(2).all(|w| w[0] < w[1])
            && self.tier_multipliers.iter().all(|m| (100..=1_000).contains(m))
            && self.downtime_slash_bp <= 10_000
            && self.double_sign_slash_bp <= 10_000
            && self.fraud_slash_bp <= 10_000
            && self.staker_pool_pct as u16
                + self.validator_pool_pct as u16
                + self.governance_pool_pct as u16
                == 100
            && !self.epoch_length.is_zero()
            && !self.blocks_per_day.is_zero()
            && self.work_budget > 0
    }
}

impl<Balance, BlockNumber> Default for TrustParams<Balance, BlockNumber>
where
    Balance: From<u64>,
    BlockNumber: From<u32>,
{
    fn default() -> Self {
        Self {
            tier_thresholds: [
                100u64.into(),
                10_000u64.into(),
                100_000u64.into(),
                1_000_000u64.into(),
                10_000_000u64.into(),
                100_000_000u64.into(),
            ],
            tier_multipliers: [100, 110, 125, 150, 200, 300],
            downtime_slash_bp: 500,
            double_sign_slash_bp: 3_000,
            fraud_slash_bp: 5_000,
            epoch_length: 600u32.into(),
            unbonding_delay: 100_800u32.into(),
            decay_bp_per_epoch: 100,
            recovery_per_epoch: 50,
            governance_reward_threshold: Score::BASELINE,
            staker_pool_pct: 50,
            validator_pool_pct: 30,
            governance_pool_pct: 20,
            dispute_voting_period: 14_400u32.into(),
            appeal_window: 14_400u32.into(),
            voluntary_return_window: 28_800u32.into(),
            case_audit_window: 403_200u32.into(),
            blocks_per_day: 14_400u32.into(),
            work_budget: 64,
        }
    }
}

/// Pool share of `amount` under the split percentage `pct`.
pub(crate) fn pool_share(amount: u128, pct: u8) -> u128 {
    amount.saturating_mul(pct as u128) / 100
}
