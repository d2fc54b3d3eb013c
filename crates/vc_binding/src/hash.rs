//! Hash containers with a fixed seed.

use core::hash::BuildHasher;

use foldhash::fast::{FixedState, FoldHasher};

const FIXED_STATE: FixedState = FixedState::with_seed(0xB1ED_CAC4_E5EE_D001);

/// Deterministic `foldhash` state shared by every map in this crate.
#[derive(Copy, Clone, Default, Debug)]
pub struct FixedHashState;

impl BuildHasher for FixedHashState {
    type Hasher = FoldHasher<'static>;

    #[inline(always)]
    fn build_hasher(&self) -> Self::Hasher {
        FIXED_STATE.build_hasher()
    }
}

pub type HashMap<K, V> = hashbrown::HashMap<K, V, FixedHashState>;
