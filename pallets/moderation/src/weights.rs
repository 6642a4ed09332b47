#![allow(missing_docs)]
#![allow(unused_imports)]
#![allow(unused_parens)]
#![cfg_attr(rustfmt, rustfmt_skip)]

use frame_support::{traits::Get, weights::{Weight, constants::RocksDbWeight, RuntimeDbWeight}};
use core::marker::PhantomData;

/// Weight functions needed for pallet_moderation.
pub trait WeightInfo {
    fn open_dispute() -> Weight;
    fn submit_vote() -> Weight;
    fn open_appeal() -> Weight;
    fn submit_appeal_vote() -> Weight;
    fn file_wrong_resolution() -> Weight;
    fn voluntary_return() -> Weight;
    fn adjudicate_report() -> Weight;
}

impl WeightInfo for () {
    fn open_dispute() -> Weight {
        // candidate filtering walks the ledger
        RuntimeDbWeight::default().reads_writes(64, 8)
    }

    fn submit_vote() -> Weight {
        RuntimeDbWeight::default().reads_writes(8, 8)
    }

    fn open_appeal() -> Weight {
        RuntimeDbWeight::default().reads_writes(64, 12)
    }

    fn submit_appeal_vote() -> Weight {
        RuntimeDbWeight::default().reads_writes(10, 10)
    }

    fn file_wrong_resolution() -> Weight {
        RuntimeDbWeight::default().reads_writes(8, 3)
    }

    fn voluntary_return() -> Weight {
        RuntimeDbWeight::default().reads_writes(5, 4)
    }

    fn adjudicate_report() -> Weight {
        RuntimeDbWeight::default().reads_writes(16, 16)
    }
}
