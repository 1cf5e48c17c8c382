use crate::{bytes_to_int64, MAX_LIST_SIZE};
use ethereum_hashing::hash_fixed;

/// Return `p(index)` in a pseudorandom permutation `p` of `0...list_size-1` with ``seed`` as entropy.
///
/// Utilizes 'swap or not' shuffling found in
/// https://link.springer.com/content/pdf/10.1007%2F978-3-642-32009-5_1.pdf
/// See the 'generalized domain' algorithm on page 3.
///
/// Note: this function is significantly slower than the `shuffle_list` function in this crate.
/// Using `compute_shuffled_index` to shuffle an entire list is very inefficient.
///
/// Returns `None` under any of the following conditions:
///  - `list_size == 0`
///  - `index >= list_size`
///  - `list_size > 2**24`
pub fn compute_shuffled_index(
    index: usize,
    list_size: usize,
    seed: &[u8],
    shuffle_round_count: u8,
) -> Option<usize> {
    if list_size == 0 || index >= list_size || list_size > MAX_LIST_SIZE {
        return None;
    }

    let list_size = list_size as u64;
    let mut index = index as u64;

    for round in 0..shuffle_round_count {
        let pivot = bytes_to_int64(&hash_with_round(seed, round)[..]) % list_size;
        index = do_round(seed, index, pivot, round, list_size);
    }

    Some(index as usize)
}

fn do_round(seed: &[u8], index: u64, pivot: u64, round: u8, list_size: u64) -> u64 {
    let flip = (pivot + (list_size - index)) % list_size;
    let position = std::cmp::max(index, flip);
    let source = hash_with_round_and_position(seed, round, position);
    let byte = source[((position % 256) / 8) as usize];
    let bit = (byte >> (position % 8)) % 2;

    if bit == 1 {
        flip
    } else {
        index
    }
}

fn hash_with_round_and_position(seed: &[u8], round: u8, position: u64) -> [u8; 32] {
    let mut preimage = Vec::with_capacity(seed.len() + 5);
    preimage.extend_from_slice(seed);
    preimage.push(round);
    preimage.extend_from_slice(&((position / 256) as u32).to_le_bytes());
    hash_fixed(&preimage)
}

fn hash_with_round(seed: &[u8], round: u8) -> [u8; 32] {
    let mut preimage = Vec::with_capacity(seed.len() + 1);
    preimage.extend_from_slice(seed);
    preimage.push(round);
    hash_fixed(&preimage)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_none_for_zero_length_list() {
        assert_eq!(None, compute_shuffled_index(100, 0, &[42; 32], 90));
    }

    #[test]
    fn returns_none_for_out_of_bounds_index() {
        assert_eq!(None, compute_shuffled_index(100, 100, &[42; 32], 90));
    }

    #[test]
    fn returns_none_for_too_large_list() {
        assert_eq!(
            None,
            compute_shuffled_index(100, MAX_LIST_SIZE + 1, &[42; 32], 90)
        );
    }

    #[test]
    fn zero_rounds_is_identity() {
        for i in 0..16 {
            assert_eq!(compute_shuffled_index(i, 16, &[7; 32], 0), Some(i));
        }
    }

    #[test]
    fn single_element_list_maps_to_itself() {
        assert_eq!(compute_shuffled_index(0, 1, &[1; 32], 90), Some(0));
    }

    #[test]
    fn produces_a_permutation() {
        let list_size = 257;
        let seed = [3; 32];
        let mut seen = vec![false; list_size];

        for i in 0..list_size {
            let shuffled = compute_shuffled_index(i, list_size, &seed, 10).unwrap();
            assert!(!seen[shuffled], "index {} produced twice", shuffled);
            seen[shuffled] = true;
        }

        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn is_deterministic_and_seed_dependent() {
        let a: Vec<_> = (0..64)
            .map(|i| compute_shuffled_index(i, 64, &[1; 32], 90).unwrap())
            .collect();
        let b: Vec<_> = (0..64)
            .map(|i| compute_shuffled_index(i, 64, &[1; 32], 90).unwrap())
            .collect();
        let c: Vec<_> = (0..64)
            .map(|i| compute_shuffled_index(i, 64, &[2; 32], 90).unwrap())
            .collect();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
