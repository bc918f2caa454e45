//! Triangular addressing of relay pairs.
//!
//! Every symmetric all-pairs relationship (costs, route entries, ping
//! statistics) is stored as a flat array holding one slot per unordered
//! pair of fleet relative indices. Pair `(i, j)` with `i > j` lives at
//! `i * (i - 1) / 2 + j`: row `i` starts right after the `i * (i - 1) / 2`
//! slots used by the rows above it.
//!
//! ```text
//!        j=0 j=1 j=2
//!   i=1 [ 0 ]
//!   i=2 [ 1 , 2 ]
//!   i=3 [ 3 , 4 , 5 ]
//! ```

/// Number of slots needed for `size` relays.
///
/// ```
/// # use nextroute_core::pair::tri_matrix_length;
/// assert_eq!(tri_matrix_length(0), 0);
/// assert_eq!(tri_matrix_length(1), 0);
/// assert_eq!(tri_matrix_length(2), 1);
/// assert_eq!(tri_matrix_length(4), 6);
/// ```
#[inline]
pub const fn tri_matrix_length(size: usize) -> usize {
    size * size.saturating_sub(1) / 2
}

/// Slot of the unordered pair `(i, j)`.
///
/// The function is symmetric. `i` and `j` must differ, the diagonal is
/// not addressable.
///
/// ```
/// # use nextroute_core::pair::tri_matrix_index;
/// assert_eq!(tri_matrix_index(1, 0), 0);
/// assert_eq!(tri_matrix_index(0, 1), 0);
/// assert_eq!(tri_matrix_index(3, 2), 5);
/// ```
#[inline]
pub const fn tri_matrix_index(i: usize, j: usize) -> usize {
    debug_assert!(i != j, "the diagonal of a triangular matrix is not addressable");
    let (row, col) = if i > j { (i, j) } else { (j, i) };
    row * (row + 1) / 2 - row + col
}

/// Pair stored at `index`, larger index first.
///
/// This is the inverse of [`tri_matrix_index`].
///
/// ```
/// # use nextroute_core::pair::{tri_matrix_index, tri_matrix_pair};
/// assert_eq!(tri_matrix_pair(4), (3, 1));
/// assert_eq!(tri_matrix_index(3, 1), 4);
/// ```
pub fn tri_matrix_pair(index: usize) -> (usize, usize) {
    // first guess from the closed form, then fix any rounding error
    let mut row = ((1.0 + (1.0 + 8.0 * index as f64).sqrt()) / 2.0) as usize;
    row = row.max(1);
    while row * (row - 1) / 2 > index {
        row -= 1;
    }
    while row * (row + 1) / 2 <= index {
        row += 1;
    }
    (row, index - row * (row - 1) / 2)
}

/// Iterates over every `(i, j)` with `i > j` for `size` relays, in slot
/// order.
///
/// ```
/// # use nextroute_core::pair::pairs;
/// let all: Vec<_> = pairs(3).collect();
/// assert_eq!(all, [(1, 0), (2, 0), (2, 1)]);
/// ```
pub fn pairs(size: usize) -> impl Iterator<Item = (usize, usize)> {
    (1..size).flat_map(|i| (0..i).map(move |j| (i, j)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaChaRng;
    use rand_core::{Rng as _, SeedableRng as _};

    #[test]
    fn two_relays() {
        assert_eq!(tri_matrix_length(2), 1);
        assert_eq!(tri_matrix_index(1, 0), 0);
    }

    #[test]
    fn bijection() {
        for size in 2..64 {
            let length = tri_matrix_length(size);
            let mut seen = vec![false; length];

            for (i, j) in pairs(size) {
                let index = tri_matrix_index(i, j);
                assert!(index < length, "{i},{j} -> {index} out of {length}");
                assert!(!seen[index], "{i},{j} collides on {index}");
                seen[index] = true;
            }

            assert!(seen.into_iter().all(|seen| seen));
        }
    }

    #[test]
    fn symmetric() {
        for (i, j) in pairs(50) {
            assert_eq!(tri_matrix_index(i, j), tri_matrix_index(j, i));
        }
    }

    #[test]
    fn pairs_follow_slot_order() {
        for (index, (i, j)) in pairs(40).enumerate() {
            assert_eq!(tri_matrix_index(i, j), index);
        }
    }

    #[test]
    fn inverse() {
        let mut rng = ChaChaRng::seed_from_u64(42);

        for _ in 0..10_000 {
            let index = (rng.next_u64() % 50_000_000) as usize;
            let (i, j) = tri_matrix_pair(index);
            assert!(i > j);
            assert_eq!(tri_matrix_index(i, j), index);
        }
    }
}
