//! Hierarchical interval binning for genomic coordinates.
//!
//! This is the UCSC binning scheme with five levels.
//! The finest level has bins of 128 KiB (`2^17`) and each coarser level is eight times larger.
//! Each level uses a disjoint range of bin numbers:
//!
//! | Level | Bin size | Bin numbers |
//! |-------|----------|-------------|
//! | 4     | `2^17`   | `585..`     |
//! | 3     | `2^20`   | `73..585`   |
//! | 2     | `2^23`   | `9..73`     |
//! | 1     | `2^26`   | `1..9`      |
//! | 0     | `2^29`   | `0`         |
//!
//! An interval is stored in the smallest bin that contains it ([`smallest_bin`]).
//! A query interval may overlap intervals stored in any of its [`candidate_bins`].
//! Index queries use [`candidate_ranges`], which describes the same bins with a fixed number of ranges.
//! Bins 0 and 1 are always candidates, as they cover intervals that do not fit into a smaller bin.
//! The scheme is exact for coordinates below [`MAX_POSITION`].
//!
//! All functions take half-open intervals `[start, end)` with `start < end`.

use std::collections::BTreeSet;
use std::ops::RangeInclusive;

//-----------------------------------------------------------------------------

/// Coordinates below this bound are binned exactly.
pub const MAX_POSITION: usize = 1 << 29;

// Bin number offsets for each level, from finest to coarsest.
const BIN_OFFSETS: [usize; 5] = [512 + 64 + 8 + 1, 64 + 8 + 1, 8 + 1, 1, 0];

// Shift for the finest level.
const FIRST_SHIFT: usize = 17;

// Additional shift for each coarser level.
const NEXT_SHIFT: usize = 3;

// (shift, offset) pairs for the levels listed by `candidate_bins`, from coarsest to finest.
const CANDIDATE_LEVELS: [(usize, usize); 4] = [(26, 1), (23, 9), (20, 73), (17, 585)];

//-----------------------------------------------------------------------------

/// Returns the smallest bin containing the half-open interval `[start, end)`.
///
/// Returns bin 0 if the interval does not fit into any smaller bin.
///
/// # Examples
///
/// ```
/// use maf_base::binning;
///
/// // Fits into the first 128 KiB bin.
/// assert_eq!(binning::smallest_bin(100, 105), 585);
/// // Crosses a 128 KiB boundary but fits into the first 1 MiB bin.
/// assert_eq!(binning::smallest_bin(131_000, 132_000), 73);
/// ```
pub fn smallest_bin(start: usize, end: usize) -> usize {
    debug_assert!(start < end, "Empty interval [{}, {})", start, end);
    let mut start_bin = start >> FIRST_SHIFT;
    let mut end_bin = (end - 1) >> FIRST_SHIFT;
    for offset in BIN_OFFSETS {
        if start_bin == end_bin {
            return offset + start_bin;
        }
        start_bin >>= NEXT_SHIFT;
        end_bin >>= NEXT_SHIFT;
    }
    0
}

/// Returns the set of bins that may contain intervals overlapping with `[start, end)`.
///
/// The set always contains bins 0 and 1.
/// It over-approximates the overlaps: stored intervals must still be compared with the query.
///
/// # Examples
///
/// ```
/// use maf_base::binning;
///
/// let bins = binning::candidate_bins(100, 105);
/// let expected: Vec<usize> = vec![0, 1, 9, 73, 585];
/// assert_eq!(bins.into_iter().collect::<Vec<_>>(), expected);
/// ```
pub fn candidate_bins(start: usize, end: usize) -> BTreeSet<usize> {
    debug_assert!(start < end, "Empty interval [{}, {})", start, end);
    let mut result: BTreeSet<usize> = BTreeSet::from([0, 1]);
    let last = end - 1;
    for (shift, offset) in CANDIDATE_LEVELS {
        result.extend((offset + (start >> shift))..=(offset + (last >> shift)));
    }
    result
}

/// Returns the candidate bins for `[start, end)` as inclusive ranges of bin numbers.
///
/// The first range is `0..=1`, followed by one range per level from coarsest to finest.
/// The union of the ranges contains [`candidate_bins`], and the number of ranges does not depend on the length of the interval.
///
/// # Examples
///
/// ```
/// use maf_base::binning;
///
/// let ranges = binning::candidate_ranges(100, 300_000);
/// assert_eq!(ranges, vec![0..=1, 1..=1, 9..=9, 73..=73, 585..=587]);
/// ```
pub fn candidate_ranges(start: usize, end: usize) -> Vec<RangeInclusive<usize>> {
    debug_assert!(start < end, "Empty interval [{}, {})", start, end);
    let last = end - 1;
    let mut result = Vec::with_capacity(CANDIDATE_LEVELS.len() + 1);
    result.push(0..=1);
    for (shift, offset) in CANDIDATE_LEVELS {
        result.push((offset + (start >> shift))..=(offset + (last >> shift)));
    }
    result
}

//-----------------------------------------------------------------------------


//-----------------------------------------------------------------------------
