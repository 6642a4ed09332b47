//! Moderation, appeals and wrong-resolution recovery.
//!
//! Escrow disputes are decided by panels of stake-holding moderators drawn
//! deterministically from the trust-stake ledger under the trust-ceiling rule:
//! nobody may moderate a dispute worth more than their own stake. Losing
//! parties can escalate through three review levels with progressively larger,
//! higher-tier panels; an overturned resolution puts the original majority on
//! an escalating penalty schedule and opens the recovery waterfall that makes
//! the wronged participant whole (voluntary return, clawback, reserve,
//! moderator slashes, shortfall event — strictly in that order, never minting).
//!
//! Wrong-resolution reports are a parallel entry into the same waterfall,
//! guarded by rate limits and an escalating false-report penalty schedule so
//! the mechanism cannot be farmed.

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(clippy::all)]

use frame_support::{pallet_prelude::*, BoundedVec};
use pallet_stake::Tier;
use parity_scale_codec::{Decode, DecodeWithMemTracking, Encode, MaxEncodedLen};
use scale_info::TypeInfo;
use sp_core::H256;
use sp_runtime::RuntimeDebug;

#[cfg(test)]
pub(crate) mod mock;
#[cfg(test)]
mod tests;

#[cfg(feature = "runtime-benchmarks")]
mod benchmarking;

pub mod weights;

mod pallet;

pub use pallet::{pallet::*, *};
pub use weights::WeightInfo;

pub(crate) const LOG_TARGET: &str = "runtime::moderation";

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

/// The largest panel any case or review can carry.
pub const MAX_PANEL: u32 = 9;

/// Dispute case identifier, assigned from a monotonic counter.
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
)]
pub struct CaseId(pub u64);

/// A moderator's or reviewer's verdict on a dispute.
#[derive(Clone, Copy, Encode, Decode, DecodeWithMemTracking, PartialEq, Eq, MaxEncodedLen, TypeInfo, RuntimeDebug)]
pub enum Vote {
    /// Release the escrowed funds to the buyer.
    ReleaseBuyer,
    /// Refund the escrowed funds to the seller.
    RefundSeller,
    /// Split the escrowed funds evenly.
    Split,
}

/// How a case pays out.
#[derive(Clone, Copy, Encode, Decode, DecodeWithMemTracking, PartialEq, Eq, MaxEncodedLen, TypeInfo, RuntimeDebug)]
pub enum Resolution {
    ReleaseBuyer,
    RefundSeller,
    Split,
    /// Fallback 50/50 when moderator participation or eligibility was
    /// insufficient.
    EmergencyEvenSplit,
}

impl From<Vote> for Resolution {
    fn from(vote: Vote) -> Self {
        match vote {
            Vote::ReleaseBuyer => Resolution::ReleaseBuyer,
            Vote::RefundSeller => Resolution::RefundSeller,
            Vote::Split => Resolution::Split,
        }
    }
}

impl Resolution {
    /// The (buyer, seller) shares of `value` under this resolution.
    pub fn shares<Balance>(&self, value: Balance) -> (Balance, Balance)
    where
        Balance: sp_runtime::traits::AtLeast32BitUnsigned + Copy,
    {
        let half = value / 2u32.into();
        match self {
            Resolution::ReleaseBuyer => (value, Balance::zero()),
            Resolution::RefundSeller => (Balance::zero(), value),
            Resolution::Split | Resolution::EmergencyEvenSplit => (half, value - half),
        }
    }
}

/// Escalation level of a re-review.
#[derive(
    Clone,
    Copy,
    Encode,
    Decode, DecodeWithMemTracking,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    MaxEncodedLen,
    TypeInfo,
    RuntimeDebug,
)]
pub enum AppealLevel {
    One,
    Two,
    Three,
}

impl AppealLevel {
    /// Level following a 1-based count of concluded appeals; `None` past the
    /// terminal level.
    pub fn from_count(concluded: u8) -> Option<Self> {
        match concluded {
            0 => Some(AppealLevel::One),
            1 => Some(AppealLevel::Two),
            2 => Some(AppealLevel::Three),
            _ => None,
        }
    }

    /// 1-based numeric level.
    pub fn number(self) -> u8 {
        match self {
            AppealLevel::One => 1,
            AppealLevel::Two => 2,
            AppealLevel::Three => 3,
        }
    }

    /// Reviewer panel size: 5, 7 or 9.
    pub fn reviewer_count(self) -> u32 {
        match self {
            AppealLevel::One => 5,
            AppealLevel::Two => 7,
            AppealLevel::Three => 9,
        }
    }

    /// Minimum reviewer tier: Warden, Steward or Archon.
    pub fn min_tier(self) -> Tier {
        match self {
            AppealLevel::One => Tier::Warden,
            AppealLevel::Two => Tier::Steward,
            AppealLevel::Three => Tier::Archon,
        }
    }

    /// Review deadline in days: 5, 7 or 10.
    pub fn deadline_days(self) -> u32 {
        match self {
            AppealLevel::One => 5,
            AppealLevel::Two => 7,
            AppealLevel::Three => 10,
        }
    }
}

/// Lifecycle of a dispute case.
#[derive(Clone, Copy, Encode, Decode, PartialEq, Eq, MaxEncodedLen, TypeInfo, RuntimeDebug)]
pub enum DisputeState {
    /// Opened but without a full moderator panel.
    Open,
    /// Panel assigned, votes being collected.
    Voting,
    /// Resolved; appealable while the window is open.
    Resolved,
    /// Under re-review at the given level.
    Appealed(AppealLevel),
    /// Terminal; retained read-only until the audit window ends.
    Finalized,
}

/// One escrow dispute.
#[derive(Clone, Encode, Decode, PartialEq, Eq, MaxEncodedLen, TypeInfo, RuntimeDebug)]
pub struct DisputeCase<AccountId, Balance, BlockNumber> {
    /// External escrow this dispute belongs to.
    pub escrow_ref: H256,
    /// Native-token-equivalent value under dispute.
    pub disputed_value: Balance,
    pub buyer: AccountId,
    pub seller: AccountId,
    /// Assigned moderator panel, empty while `Open`.
    pub moderators: BoundedVec<AccountId, ConstU32<MAX_PANEL>>,
    /// Final votes received so far.
    pub votes: BoundedVec<(AccountId, Vote), ConstU32<MAX_PANEL>>,
    pub state: DisputeState,
    /// Standing payout, set at first resolution and rewritten on overturn.
    pub resolution: Option<Resolution>,
    pub opened_at: BlockNumber,
    /// Moderator voting deadline.
    pub deadline_at: BlockNumber,
    /// Block of the most recent resolution; anchors the appeal window.
    pub resolved_at: Option<BlockNumber>,
    /// Number of concluded appeals.
    pub appeals_concluded: u8,
}

impl<AccountId: PartialEq, Balance, BlockNumber> DisputeCase<AccountId, Balance, BlockNumber> {
    /// Whether `who` is the buyer or the seller.
    pub fn is_participant(&self, who: &AccountId) -> bool {
        &self.buyer == who || &self.seller == who
    }

    /// Whether `who` sits on the moderator panel.
    pub fn is_moderator(&self, who: &AccountId) -> bool {
        self.moderators.iter().any(|m| m == who)
    }

    /// Whether `who` already voted.
    pub fn has_voted(&self, who: &AccountId) -> bool {
        self.votes.iter().any(|(m, _)| m == who)
    }
}

/// Outcome of one review level.
#[derive(Clone, Copy, Encode, Decode, PartialEq, Eq, MaxEncodedLen, TypeInfo, RuntimeDebug)]
pub enum AppealOutcome {
    /// The standing resolution survived.
    Upheld,
    /// The resolution was rewritten; penalties and recovery follow.
    Overturned,
}

/// One level of re-review.
#[derive(Clone, Encode, Decode, PartialEq, Eq, MaxEncodedLen, TypeInfo, RuntimeDebug)]
pub struct AppealRecord<AccountId, BlockNumber> {
    /// Who escalated.
    pub appellant: AccountId,
    /// Hash of the off-chain evidence bundle backing the appeal.
    pub evidence: H256,
    /// Reviewer panel.
    pub reviewers: BoundedVec<AccountId, ConstU32<MAX_PANEL>>,
    /// Reviewer votes received so far.
    pub votes: BoundedVec<(AccountId, Vote), ConstU32<MAX_PANEL>>,
    pub deadline_at: BlockNumber,
    pub outcome: Option<AppealOutcome>,
}

impl<AccountId: PartialEq, BlockNumber> AppealRecord<AccountId, BlockNumber> {
    /// Whether `who` sits on this review panel.
    pub fn is_reviewer(&self, who: &AccountId) -> bool {
        self.reviewers.iter().any(|r| r == who)
    }

    /// Whether `who` already voted at this level.
    pub fn has_voted(&self, who: &AccountId) -> bool {
        self.votes.iter().any(|(r, _)| r == who)
    }
}

/// Adjudication state of a wrong-resolution report.
#[derive(Clone, Copy, Encode, Decode, PartialEq, Eq, MaxEncodedLen, TypeInfo, RuntimeDebug)]
pub enum ReportState {
    /// Filed, awaiting governance adjudication.
    UnderInvestigation,
    /// Adjudicated genuine; the voluntary-return window is open.
    VoluntaryReturnPending,
    /// Genuine and settled (voluntarily or through the waterfall).
    Valid,
    /// Adjudicated false; the reporter was penalized.
    Invalid,
}

/// A participant's claim that a resolved case robbed them.
#[derive(Clone, Encode, Decode, PartialEq, Eq, MaxEncodedLen, TypeInfo, RuntimeDebug)]
pub struct WrongResolutionReport<AccountId, Balance, BlockNumber> {
    pub reporter: AccountId,
    pub alleged_victim: AccountId,
    pub stated_counterparty: AccountId,
    pub claimed_amount: Balance,
    pub state: ReportState,
    pub filed_at: BlockNumber,
}

/// Per-account report history backing the abuse-prevention schedule.
#[derive(Clone, Default, Encode, Decode, PartialEq, Eq, MaxEncodedLen, TypeInfo, RuntimeDebug)]
pub struct ReporterRecord<BlockNumber> {
    /// Lifetime report count.
    pub total_reports: u32,
    /// Lifetime reports adjudicated invalid.
    pub invalid_reports: u32,
    /// Filing blocks inside the trailing rate-limit window.
    pub recent_reports: BoundedVec<BlockNumber, ConstU32<16>>,
}

/// An in-flight recovery waterfall.
#[derive(Clone, Encode, Decode, PartialEq, Eq, MaxEncodedLen, TypeInfo, RuntimeDebug)]
pub struct RecoveryCase<AccountId, Balance, BlockNumber> {
    /// The participant owed funds.
    pub victim: AccountId,
    /// The participant holding funds they should not have.
    pub recipient: AccountId,
    /// Outstanding amount.
    pub owed: Balance,
    /// End of the voluntary-return window; the waterfall executes here.
    pub window_ends: BlockNumber,
    /// Overturned-majority moderators and their scheduled slash percent.
    pub offenders: BoundedVec<(AccountId, u8), ConstU32<MAX_PANEL>>,
}

/// Moderator penalty schedule: slash percent for the n-th offense (1-based)
/// inside the rolling window.
pub fn offense_slash_pct(offense: u32) -> u8 {
    match offense {
        0 | 1 => 0,
        2 => 5,
        3 => 10,
        _ => 15,
    }
}

/// Moderator penalty schedule: ban length in days for the n-th offense,
/// `None` when no ban applies.
pub fn offense_ban_days(offense: u32) -> Option<u32> {
    match offense {
        0 | 1 | 2 => None,
        3 => Some(14),
        _ => Some(28),
    }
}

/// Reporter penalty schedule: slash percent for the n-th invalid report.
pub fn false_report_slash_pct(offense: u32) -> u8 {
    match offense {
        0 | 1 => 0,
        2 => 10,
        3 => 15,
        4 => 25,
        _ => 50,
    }
}

/// Reporter penalty schedule: ban for the n-th invalid report.
/// `Some(None)` is a permanent ban, `Some(Some(d))` a ban of `d` days.
pub fn false_report_ban_days(offense: u32) -> Option<Option<u32>> {
    match offense {
        0 | 1 | 2 => None,
        3 => Some(Some(7)),
        4 => Some(Some(30)),
        _ => Some(None),
    }
}

#[cfg(test)]
mod schedule_tests {
    use super::*;

    #[test]
    fn moderator_schedule_matches_design() {
        assert_eq!(offense_slash_pct(1), 0);
        assert_eq!(offense_slash_pct(2), 5);
        assert_eq!(offense_slash_pct(3), 10);
        assert_eq!(offense_slash_pct(4), 15);
        assert_eq!(offense_slash_pct(7), 15);

        assert_eq!(offense_ban_days(1), None);
        assert_eq!(offense_ban_days(2), None);
        assert_eq!(offense_ban_days(3), Some(14));
        assert_eq!(offense_ban_days(4), Some(28));
    }

    #[test]
    fn reporter_schedule_matches_design() {
        assert_eq!(false_report_slash_pct(1), 0);
        assert_eq!(false_report_slash_pct(2), 10);
        assert_eq!(false_report_slash_pct(3), 15);
        assert_eq!(false_report_slash_pct(4), 25);
        assert_eq!(false_report_slash_pct(5), 50);

        assert_eq!(false_report_ban_days(2), None);
        assert_eq!(false_report_ban_days(3), Some(Some(7)));
        assert_eq!(false_report_ban_days(4), Some(Some(30)));
        assert_eq!(false_report_ban_days(5), Some(None));
    }

    #[test]
    fn resolution_shares_split_odd_values() {
        assert_eq!(Resolution::ReleaseBuyer.shares(1_000u64), (1_000, 0));
        assert_eq!(Resolution::RefundSeller.shares(1_000u64), (0, 1_000));
        assert_eq!(Resolution::Split.shares(1_001u64), (500, 501));
        assert_eq!(Resolution::EmergencyEvenSplit.shares(1_000u64), (500, 500));
    }
}
