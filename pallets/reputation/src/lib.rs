//! Reputation pallet: per-account behaviour score used for capability gating
//! and reward weighting.
//!
//! The score is a fixed-point value in hundredths, bounded to `[0.00, 150.00]`,
//! starting at `100.00`. Other pallets apply [`ReputationEvent`]s (each carrying
//! a signed delta) and the score saturates at the bounds. Once per epoch the
//! owning runtime drives a cursor-bounded sweep which decays every score and
//! then recovers scores sitting below the baseline; the sweep never touches
//! more accounts per block than the budget it is given.
//!
//! Scores can't be transferred, sold or bought, and there is deliberately no
//! way to move score between accounts.

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(clippy::all)]

use core::ops::Deref;

use parity_scale_codec::{Decode, DecodeWithMemTracking, Encode, MaxEncodedLen};
use scale_info::TypeInfo;
use sp_runtime::RuntimeDebug;

pub use pallet::*;

#[cfg(test)]
mod mock;


#[cfg(feature = "runtime-benchmarks")]
mod benchmarking;
pub mod pallet;
pub mod weights;

/// Scores are stored in hundredths: `10_000` reads as `100.00`.
pub const SCORE_DECIMALS: u16 = 100;

/// The per-account behaviour score, fixed-point with two decimal places.
#[derive(
    Clone,
    Copy,
    Encode,
    Decode,
    DecodeWithMemTracking,
    serde::Serialize,
    serde::Deserialize,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    MaxEncodedLen,
    TypeInfo,
    RuntimeDebug,
)]
pub struct Score(pub u16);

impl Score {
    /// Lower saturation bound, `0.00`.
    pub const FLOOR: Score = Score(0);
    /// Upper saturation bound, `150.00`.
    pub const CEILING: Score = Score(150 * SCORE_DECIMALS);
    /// The score every account starts with, `100.00`.
    pub const BASELINE: Score = Score(100 * SCORE_DECIMALS);
    /// Minimum score to be selected for moderation duty at all, `50.00`.
    pub const ELIGIBILITY_GATE: Score = Score(50 * SCORE_DECIMALS);
    /// Minimum score for routine moderation assignments, `65.00`.
    pub const MODERATION_GATE: Score = Score(65 * SCORE_DECIMALS);
    /// Minimum score to review appeals whose outcome can slash moderators, `80.00`.
    pub const SLASHING_GATE: Score = Score(80 * SCORE_DECIMALS);

    /// Construct from raw hundredths, saturating at the ceiling.
    pub const fn from_hundredths(value: u16) -> Self {
        if value > Self::CEILING.0 {
            Self::CEILING
        } else {
            Score(value)
        }
    }

    /// Apply a signed delta in hundredths, saturating at both bounds.
    pub fn apply(self, delta: i32) -> Self {
        let next = (self.0 as i32).saturating_add(delta);
        Score(next.clamp(Self::FLOOR.0 as i32, Self::CEILING.0 as i32) as u16)
    }

    /// Multiply by `(1 - decay_bp / 10_000)`, rounding down.
    pub fn decay(self, decay_bp: u32) -> Self {
        let decay_bp = decay_bp.min(10_000) as u64;
        let kept = (self.0 as u64) * (10_000 - decay_bp) / 10_000;
        Score(kept as u16)
    }

    /// Add `amount` hundredths if strictly below the baseline, never
    /// overshooting the baseline.
    pub fn recover(self, amount: u16) -> Self {
        if self >= Self::BASELINE {
            return self;
        }
        Score(self.0.saturating_add(amount).min(Self::BASELINE.0))
    }

    /// Whether the score meets the given capability gate.
    pub fn meets(self, gate: Score) -> bool {
        self >= gate
    }
}

impl Default for Score {
    fn default() -> Self {
        Self::BASELINE
    }
}

impl From<u16> for Score {
    fn from(value: u16) -> Self {
        Self::from_hundredths(value)
    }
}

impl Deref for Score {
    type Target = u16;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Named behaviour events. Each carries a default signed delta in hundredths;
/// governance may override any of them through `set_event_delta`.
#[derive(Clone, Copy, Encode, Decode, DecodeWithMemTracking, PartialEq, Eq, MaxEncodedLen, TypeInfo, RuntimeDebug)]
pub enum ReputationEvent {
    /// Voted with the winning majority on a dispute that was not overturned.
    SuccessfulModeration,
    /// Was assigned to a dispute and never voted.
    ModerationAbsence,
    /// Reviewed an appeal and voted with the side that lost the review.
    OverturnedReview,
    /// Original-majority moderator on a case overturned on appeal.
    UnfairModeration,
    /// Filed a wrong-resolution report that was adjudicated invalid.
    FalseReport {
        /// 1-based lifetime count of invalid reports for the reporter.
        offense: u8,
    },
    /// Repaid a stake-backed loan on schedule.
    LoanRepaid,
    /// Defaulted on a stake-backed loan.
    LoanDefault,
    /// Validator slashed for downtime.
    Downtime,
    /// Validator slashed for double signing.
    DoubleSign,
    /// Attempted fraud anywhere in the protocol.
    Fraud,
}

impl ReputationEvent {
    /// The built-in delta for the event, in hundredths.
    pub fn default_delta(&self) -> i32 {
        match self {
            Self::SuccessfulModeration => 400,
            Self::ModerationAbsence => -200,
            Self::OverturnedReview => -800,
            Self::UnfairModeration => -2_500,
            Self::FalseReport { offense } => match offense {
                0 | 1 => -1_000,
                2 => -1_500,
                3 => -2_000,
                4 => -3_000,
                _ => -5_000,
            },
            Self::LoanRepaid => 300,
            Self::LoanDefault => -1_500,
            Self::Downtime => -1_000,
            Self::DoubleSign => -3_000,
            Self::Fraud => -5_000,
        }
    }
}

/// Something that wants to know when an account's score changed. The stake
/// pallet uses this to settle reward accumulators before the stale weight
/// snapshot diverges further.
pub trait OnReputationUpdate<AccountId> {
    /// Called after `who`'s score has been written; `score` is the new value.
    fn on_reputation_update(who: &AccountId, score: Score);
}

impl<AccountId> OnReputationUpdate<AccountId> for () {
    fn on_reputation_update(_: &AccountId, _: Score) {}
}
