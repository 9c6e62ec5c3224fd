//! Contiguous index blocks, one per rank.

use std::ops::Range;

use crate::sa::Objective;

fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Smallest granularity that is a multiple of both alignments.
pub fn effective_alignment(requested: usize, group_width: usize) -> usize {
    let a = requested.max(1);
    let b = group_width.max(1);
    a / gcd(a, b) * b
}

/// Block of `rank` when `[0, n)` is split among `size` ranks in units of
/// `alignment` indices. Earlier ranks take one extra unit when the units do
/// not divide evenly; trailing ranks may receive an empty block.
pub fn block_range(n: usize, size: usize, rank: usize, alignment: usize) -> Range<usize> {
    assert!(size > 0, "size must be positive");
    assert!(rank < size, "rank {rank} out of range for size {size}");

    let alignment = alignment.max(1);
    let units = n.div_ceil(alignment);
    let base = units / size;
    let extra = units % size;

    let first_unit = rank * base + rank.min(extra);
    let unit_count = base + usize::from(rank < extra);

    let start = (first_unit * alignment).min(n);
    let end = ((first_unit + unit_count) * alignment).min(n);
    start..end
}

/// All blocks, in rank order.
pub fn blocks(n: usize, size: usize, alignment: usize) -> Vec<Range<usize>> {
    (0..size)
        .map(|rank| block_range(n, size, rank, alignment))
        .collect()
}

/// Evaluates `x` block by block and sums the partials in block order.
///
/// With the `parallel` feature the blocks are evaluated on the rayon pool;
/// this is the in-process reference for what the ranks compute together.
pub fn evaluate_partitioned<O: Objective + ?Sized>(
    objective: &O,
    x: &[f64],
    blocks: &[Range<usize>],
) -> f64 {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        let partials: Vec<f64> = blocks
            .par_iter()
            .map(|b| objective.evaluate_partial(x, b.start, b.end))
            .collect();
        partials.iter().sum()
    }

    #[cfg(not(feature = "parallel"))]
    {
        blocks
            .iter()
            .map(|b| objective.evaluate_partial(x, b.start, b.end))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_even_split() {
        assert_eq!(blocks(8, 4, 1), vec![0..2, 2..4, 4..6, 6..8]);
    }

    #[test]
    fn test_remainder_goes_to_first_ranks() {
        assert_eq!(blocks(10, 4, 1), vec![0..3, 3..6, 6..8, 8..10]);
    }

    #[test]
    fn test_alignment_keeps_groups_whole() {
        assert_eq!(blocks(20, 3, 4), vec![0..8, 8..16, 16..20]);
        for b in blocks(800_000, 7, 4) {
            assert_eq!(b.start % 4, 0);
            assert_eq!(b.end % 4, 0);
        }
    }

    #[test]
    fn test_more_ranks_than_units() {
        assert_eq!(blocks(2, 4, 1), vec![0..1, 1..2, 2..2, 2..2]);
        assert_eq!(blocks(4, 3, 4), vec![0..4, 4..4, 4..4]);
    }

    #[test]
    fn test_trailing_empty_blocks_clamp_to_n() {
        // n not a multiple of the alignment: empty tails start at n, unaligned.
        assert_eq!(blocks(5, 4, 4), vec![0..4, 4..5, 5..5, 5..5]);
        assert_eq!(blocks(9, 3, 5), vec![0..5, 5..9, 9..9]);
    }

    #[test]
    fn test_effective_alignment() {
        assert_eq!(effective_alignment(1, 4), 4);
        assert_eq!(effective_alignment(6, 4), 12);
        assert_eq!(effective_alignment(8, 4), 8);
        assert_eq!(effective_alignment(0, 1), 1);
    }

    #[test]
    #[should_panic(expected = "rank 4 out of range")]
    fn test_rank_out_of_range() {
        block_range(10, 4, 4, 1);
    }

    proptest! {
        #[test]
        fn prop_blocks_tile_the_range(
            n in 0usize..10_000,
            size in 1usize..65,
            alignment in 1usize..9,
        ) {
            let blocks = blocks(n, size, alignment);
            prop_assert_eq!(blocks.len(), size);
            prop_assert_eq!(blocks[0].start, 0);
            prop_assert_eq!(blocks[size - 1].end, n);
            for w in blocks.windows(2) {
                prop_assert_eq!(w[0].end, w[1].start);
            }
            for b in &blocks {
                prop_assert!(b.start <= b.end);
                prop_assert!(b.start % alignment == 0 || b.start == n);
                prop_assert!(b.end % alignment == 0 || b.end == n);
            }
        }
    }
}
