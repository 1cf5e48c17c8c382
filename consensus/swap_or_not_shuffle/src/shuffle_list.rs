use crate::{bytes_to_int64, MAX_LIST_SIZE, SEED_SIZE};
use ethereum_hashing::hash_fixed;

const ROUND_SIZE: usize = 1;
const POSITION_WINDOW_SIZE: usize = 4;
const PIVOT_VIEW_SIZE: usize = SEED_SIZE + ROUND_SIZE;
const TOTAL_SIZE: usize = SEED_SIZE + ROUND_SIZE + POSITION_WINDOW_SIZE;

/// A buffer for the hash preimages used by the shuffle, laid out as `seed | round | position`.
struct Buf([u8; TOTAL_SIZE]);

impl Buf {
    fn new(seed: &[u8]) -> Self {
        let mut buf = [0; TOTAL_SIZE];
        buf[0..SEED_SIZE].copy_from_slice(seed);
        Self(buf)
    }

    fn set_round(&mut self, round: u8) {
        self.0[SEED_SIZE] = round;
    }

    /// Returns the pivot for the current round.
    fn raw_pivot(&self) -> u64 {
        bytes_to_int64(&hash_fixed(&self.0[0..PIVOT_VIEW_SIZE])[..])
    }

    /// Hashes `seed | round | position_window` where the window covers 256 positions.
    fn hash_for_position(&mut self, position: usize) -> [u8; 32] {
        self.0[PIVOT_VIEW_SIZE..].copy_from_slice(&((position >> 8) as u32).to_le_bytes());
        hash_fixed(&self.0)
    }
}

/// Shuffles an entire list in-place.
///
/// Note: this is equivalent to the `compute_shuffled_index` function, except it shuffles an entire
/// list not just a single index. With large lists this function has been observed to be 250x
/// faster than running `compute_shuffled_index` across an entire list.
///
/// Shuffles if `forwards == true`, otherwise un-shuffles. Un-shuffling is the direction used to
/// build committees: `shuffle_list(l, r, s, false)[i] == l[compute_shuffled_index(i, ..)]`.
///
/// Returns `None` under any of the following conditions:
///  - `list_size == 0`
///  - `list_size > 2**24`
///  - `seed.len() != 32`
pub fn shuffle_list(
    mut input: Vec<usize>,
    rounds: u8,
    seed: &[u8],
    forwards: bool,
) -> Option<Vec<usize>> {
    let list_size = input.len();

    if input.is_empty() || list_size > MAX_LIST_SIZE || seed.len() != SEED_SIZE {
        return None;
    }

    if rounds == 0 {
        return Some(input);
    }

    let mut buf = Buf::new(seed);
    let mut r = if forwards { 0 } else { rounds - 1 };

    loop {
        buf.set_round(r);

        let pivot = buf.raw_pivot() as usize % list_size;

        // Swap the lower half, mirrored around `pivot / 2`.
        let mirror = (pivot + 1) >> 1;
        let mut source = buf.hash_for_position(pivot);
        let mut byte_v = source[(pivot & 0xff) >> 3];

        for i in 0..mirror {
            let j = pivot - i;

            if j & 0xff == 0xff {
                source = buf.hash_for_position(j);
            }

            if j & 0x07 == 0x07 {
                byte_v = source[(j & 0xff) >> 3];
            }
            let bit_v = (byte_v >> (j & 0x07)) & 0x01;

            if bit_v == 1 {
                input.swap(i, j);
            }
        }

        // Swap the upper half, mirrored around `(pivot + list_size) / 2`.
        let mirror = (pivot + list_size + 1) >> 1;
        let end = list_size - 1;
        let mut source = buf.hash_for_position(end);
        let mut byte_v = source[(end & 0xff) >> 3];

        for (loop_iter, i) in ((pivot + 1)..mirror).enumerate() {
            let j = end - loop_iter;

            if j & 0xff == 0xff {
                source = buf.hash_for_position(j);
            }

            if j & 0x07 == 0x07 {
                byte_v = source[(j & 0xff) >> 3];
            }
            let bit_v = (byte_v >> (j & 0x07)) & 0x01;

            if bit_v == 1 {
                input.swap(i, j);
            }
        }

        if forwards {
            r += 1;
            if r == rounds {
                break;
            }
        } else {
            if r == 0 {
                break;
            }
            r -= 1;
        }
    }

    Some(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute_shuffled_index;

    #[test]
    fn returns_none_for_zero_length_list() {
        assert_eq!(None, shuffle_list(vec![], 90, &[42; 32], true));
    }

    #[test]
    fn returns_none_for_short_seed() {
        assert_eq!(None, shuffle_list(vec![1, 2, 3], 90, &[42, 42], true));
    }

    #[test]
    fn zero_rounds_is_identity() {
        let list: Vec<usize> = (0..10).collect();
        assert_eq!(shuffle_list(list.clone(), 0, &[1; 32], false), Some(list));
    }

    #[test]
    fn unshuffle_matches_compute_shuffled_index() {
        for list_size in [1, 2, 7, 64, 300, 1_000] {
            let seed = [list_size as u8; 32];
            let list: Vec<usize> = (0..list_size).map(|i| i * 3 + 11).collect();

            let shuffled = shuffle_list(list.clone(), 90, &seed, false).unwrap();

            for (i, value) in shuffled.iter().enumerate() {
                let source = compute_shuffled_index(i, list_size, &seed, 90).unwrap();
                assert_eq!(*value, list[source], "list_size {} index {}", list_size, i);
            }
        }
    }

    #[test]
    fn forwards_then_backwards_is_identity() {
        let seed = [9; 32];
        let list: Vec<usize> = (0..513).collect();

        let shuffled = shuffle_list(list.clone(), 90, &seed, true).unwrap();
        assert_ne!(shuffled, list);

        let restored = shuffle_list(shuffled, 90, &seed, false).unwrap();
        assert_eq!(restored, list);
    }
}
