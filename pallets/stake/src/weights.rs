#![allow(missing_docs)]
#![allow(unused_imports)]
#![allow(unused_parens)]
#![cfg_attr(rustfmt, rustfmt_skip)]

use frame_support::{traits::Get, weights::{Weight, constants::RocksDbWeight, RuntimeDbWeight}};
use core::marker::PhantomData;

/// Weight functions needed for pallet_stake.
pub trait WeightInfo {
    fn update_params() -> Weight;
    fn authorize_module() -> Weight;
    fn stake() -> Weight;
    fn begin_unstake() -> Weight;
    fn complete_unstake() -> Weight;
    fn cancel_unstake() -> Weight;
    fn claim_rewards() -> Weight;
    fn declare_validator() -> Weight;
    fn distribute() -> Weight;
    fn add_commitment() -> Weight;
    fn release_commitment() -> Weight;
    fn slash_commitment() -> Weight;
    fn add_lock() -> Weight;
    fn release_lock() -> Weight;
    fn fund_reserve() -> Weight;
    fn report_offense() -> Weight;
    fn note_loan_outcome() -> Weight;
}

impl WeightInfo for () {
    fn update_params() -> Weight {
        RuntimeDbWeight::default().writes(3)
    }

    fn authorize_module() -> Weight {
        RuntimeDbWeight::default().writes(1)
    }

    fn stake() -> Weight {
        RuntimeDbWeight::default().reads_writes(6, 5)
    }

    fn begin_unstake() -> Weight {
        RuntimeDbWeight::default().reads_writes(8, 7)
    }

    fn complete_unstake() -> Weight {
        RuntimeDbWeight::default().reads_writes(4, 4)
    }

    fn cancel_unstake() -> Weight {
        RuntimeDbWeight::default().reads_writes(6, 6)
    }

    fn claim_rewards() -> Weight {
        RuntimeDbWeight::default().reads_writes(6, 5)
    }

    fn declare_validator() -> Weight {
        RuntimeDbWeight::default().reads_writes(5, 4)
    }

    fn distribute() -> Weight {
        RuntimeDbWeight::default().reads_writes(4, 3)
    }

    fn add_commitment() -> Weight {
        RuntimeDbWeight::default().reads_writes(6, 3)
    }

    fn release_commitment() -> Weight {
        RuntimeDbWeight::default().reads_writes(3, 2)
    }

    fn slash_commitment() -> Weight {
        RuntimeDbWeight::default().reads_writes(7, 6)
    }

    fn add_lock() -> Weight {
        RuntimeDbWeight::default().reads_writes(3, 2)
    }

    fn release_lock() -> Weight {
        RuntimeDbWeight::default().reads_writes(2, 1)
    }

    fn fund_reserve() -> Weight {
        RuntimeDbWeight::default().reads_writes(2, 2)
    }

    fn report_offense() -> Weight {
        RuntimeDbWeight::default().reads_writes(8, 7)
    }

    fn note_loan_outcome() -> Weight {
        RuntimeDbWeight::default().reads_writes(3, 2)
    }
}
