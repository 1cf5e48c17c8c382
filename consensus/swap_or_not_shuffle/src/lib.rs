//! Provides list-shuffling functions matching the consensus "swap-or-not" shuffle.
//!
//! There are two functions exported by this crate:
//!
//! - `compute_shuffled_index`: given a single index, computes the index resulting from a shuffle.
//! Runs in less time than it takes to run `shuffle_list`.
//! - `shuffle_list`: shuffles an entire list in-place. Runs in less time than it takes to run
//! `compute_shuffled_index` on each index.
//!
//! Both are pure functions of `(seed, index)`; no state other than the arguments is read.
//!
//! In general, use `compute_shuffled_index` to calculate the shuffling of a small subset of a much
//! larger list (e.g., selecting a single block proposer).

mod compute_shuffled_index;
mod shuffle_list;

pub use compute_shuffled_index::compute_shuffled_index;
pub use shuffle_list::shuffle_list;

/// Number of bytes in a shuffling seed.
pub const SEED_SIZE: usize = 32;

/// Lists larger than this cannot be shuffled, the position is encoded in 4 bytes and divided by
/// 256.
pub const MAX_LIST_SIZE: usize = 1 << 24;

/// Reads the first 8 bytes of `bytes` as a little-endian `u64`.
fn bytes_to_int64(bytes: &[u8]) -> u64 {
    let mut array = [0; 8];
    array.copy_from_slice(&bytes[0..8]);
    u64::from_le_bytes(array)
}
