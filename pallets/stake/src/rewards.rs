//! Accumulator-based reward bookkeeping.
//!
//! Each sub-pool keeps a single running `reward-per-unit-weight` accumulator.
//! Injecting a distribution advances the accumulator by `amount / total_weight`
//! (fixed-point, [`ACC_SCALE`]); what a member is owed is its weight snapshot
//! times the accumulator movement since its last checkpoint. Per-distribution
//! work is O(1) regardless of the member count.
//!
//! Rounding never leaks funds: the floor remainder of every injection is
//! carried in `undistributed` and folded into the next one.

use parity_scale_codec::{Decode, Encode, MaxEncodedLen};
use scale_info::TypeInfo;
use sp_runtime::RuntimeDebug;

/// Fixed-point scale of the reward-per-weight accumulators.
pub const ACC_SCALE: u128 = 1_000_000_000_000;

/// The three reward sub-pools.
#[derive(Clone, Copy, Encode, Decode, PartialEq, Eq, MaxEncodedLen, TypeInfo, RuntimeDebug)]
pub enum PoolKind {
    /// Every staker, weighted by stake × tier multiplier × reputation.
    Staker,
    /// Declared validators without an active ban.
    Validator,
    /// Accounts above the governance reputation threshold.
    Governance,
}

impl PoolKind {
    /// All pools, in snapshot-array order.
    pub const ALL: [PoolKind; 3] = [PoolKind::Staker, PoolKind::Validator, PoolKind::Governance];

    /// Index into per-account snapshot arrays.
    pub const fn index(self) -> usize {
        match self {
            PoolKind::Staker => 0,
            PoolKind::Validator => 1,
            PoolKind::Governance => 2,
        }
    }
}

/// One sub-pool's accumulator state.
#[derive(
    Clone, Copy, Default, Encode, Decode, PartialEq, Eq, MaxEncodedLen, TypeInfo, RuntimeDebug,
)]
pub struct Pool {
    /// Reward per unit weight so far, scaled by [`ACC_SCALE`].
    pub acc_per_weight: u128,
    /// Sum of all member weight snapshots.
    pub total_weight: u128,
    /// Injected funds not yet reflected in the accumulator (zero-weight pools
    /// and rounding remainders).
    pub undistributed: u128,
}

impl Pool {
    /// Fold `amount` into the accumulator. Funds that cannot be attributed
    /// (no weight, or the sub-unit rounding floor) stay in `undistributed`.
    /// Returns the amount actually attributed.
    pub fn inject(&mut self, amount: u128) -> u128 {
        let available = self.undistributed.saturating_add(amount);
        if self.total_weight == 0 {
            self.undistributed = available;
            return 0;
        }

        let delta = available.saturating_mul(ACC_SCALE) / self.total_weight;
        let attributed = delta.saturating_mul(self.total_weight) / ACC_SCALE;
        self.acc_per_weight = self.acc_per_weight.saturating_add(delta);
        self.undistributed = available.saturating_sub(attributed);
        attributed
    }

    /// Amount owed to a member with the given snapshot since `checkpoint`.
    pub fn owed(&self, weight: u128, checkpoint: u128) -> u128 {
        weight.saturating_mul(self.acc_per_weight.saturating_sub(checkpoint)) / ACC_SCALE
    }
}

/// All three pools plus the per-epoch audit counter.
#[derive(
    Clone, Copy, Default, Encode, Decode, PartialEq, Eq, MaxEncodedLen, TypeInfo, RuntimeDebug,
)]
pub struct RewardPools {
    /// Sub-pools indexed by [`PoolKind`].
    pub pools: [Pool; 3],
    /// Total attributed in the current epoch, for audit.
    pub distributed_this_epoch: u128,
}

impl RewardPools {
    /// Shared access by pool kind.
    pub fn pool(&self, kind: PoolKind) -> &Pool {
        &self.pools[kind.index()]
    }

    /// Mutable access by pool kind.
    pub fn pool_mut(&mut self, kind: PoolKind) -> &mut Pool {
        &mut self.pools[kind.index()]
    }
}

/// Reward weight of an account in a pool:
/// `stake × multiplier/100 × reputation/100.00`.
pub fn member_weight(stake: u128, multiplier_hundredths: u32, score_hundredths: u16) -> u128 {
    stake
        .saturating_mul(multiplier_hundredths as u128)
        .saturating_mul(score_hundredths as u128)
        / 1_000_000
}
