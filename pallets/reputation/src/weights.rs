#![allow(missing_docs)]
#![allow(unused_imports)]
#![allow(unused_parens)]
#![cfg_attr(rustfmt, rustfmt_skip)]

use frame_support::{traits::Get, weights::{Weight, constants::RocksDbWeight, RuntimeDbWeight}};
use core::marker::PhantomData;

/// Weight functions needed for pallet_reputation.
pub trait WeightInfo {
    fn force_set_score() -> Weight;
    fn set_event_delta() -> Weight;
}

impl WeightInfo for () {
    fn force_set_score() -> Weight {
        RuntimeDbWeight::default().writes(1)
    }

    fn set_event_delta() -> Weight {
        RuntimeDbWeight::default().writes(1)
    }
}
