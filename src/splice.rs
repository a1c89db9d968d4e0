//! Spliced alignments over multiple reference intervals.
//!
//! A spliced alignment joins the alignment columns for a list of reference intervals, such as the exons of a transcript.
//! The result contains one gapped sequence for each sequence name in the overlapping blocks, with the reference first.
//!
//! Each reference position owns a fragment of aligned text in each sequence.
//! The fragment ends with the column containing the reference symbol and starts with the preceding columns where the reference has a gap.
//! Columns after the last reference symbol of a block belong to the last position of the block.
//! The output is built by concatenating the fragments for each interval in the given order.
//! Positions without alignment data are filled with `N` in the reference and with gaps in the other sequences.
//! When a sequence is missing from a block, its filler has the same length as the reference fragment.
//!
//! Blocks are identified by their file offsets.
//! A block overlapping with several intervals is used once.

use crate::db::{self, MafIndex};
use crate::error::{Error, Result};
use crate::maf::{AlignmentBlock, SequenceRecord, Strand};
use crate::utils::{self, GAP, UNKNOWN};

use std::collections::{HashMap, HashSet};
use std::iter;
use std::ops::Range;

use log::debug;


//-----------------------------------------------------------------------------

/// A gapped sequence in a spliced alignment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplicedSequence {
    /// Sequence name.
    pub name: String,
    /// Aligned text, with `-` for gaps.
    pub text: Vec<u8>,
}

/// A spliced alignment.
///
/// The first sequence is the reference.
/// All texts have the same length.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SplicedAlignment {
    sequences: Vec<SplicedSequence>,
}

impl SplicedAlignment {
    // Alignment with only the reference, consisting of unknown symbols.
    fn no_coverage(target: &str, len: usize) -> Self {
        SplicedAlignment {
            sequences: vec![SplicedSequence { name: target.to_string(), text: vec![UNKNOWN; len] }],
        }
    }

    /// Returns the number of sequences.
    #[inline]
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    /// Returns `true` if the alignment has no sequences.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Returns the number of alignment columns.
    pub fn alignment_len(&self) -> usize {
        self.sequences.first().map(|x| x.text.len()).unwrap_or(0)
    }

    /// Returns the reference sequence, or [`None`] if the alignment is empty.
    pub fn reference(&self) -> Option<&SplicedSequence> {
        self.sequences.first()
    }

    /// Returns the text for the sequence with the given name, or [`None`] if there is no such sequence.
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.sequences.iter().find(|x| x.name == name).map(|x| x.text.as_slice())
    }

    /// Returns an iterator over the sequences, starting with the reference.
    pub fn iter(&self) -> impl Iterator<Item = &SplicedSequence> {
        self.sequences.iter()
    }
}

//-----------------------------------------------------------------------------

// Text fragments for each reference position in each sequence.
struct Fragments {
    // Sequence names in order of first appearance, with the reference first.
    names: Vec<String>,
    ids: HashMap<String, usize>,
    // Position to fragment, for each sequence identifier.
    fragments: Vec<HashMap<usize, Vec<u8>>>,
}

impl Fragments {
    fn new(target: &str) -> Self {
        let mut result = Fragments { names: Vec::new(), ids: HashMap::new(), fragments: Vec::new() };
        result.id(target);
        result
    }

    fn id(&mut self, name: &str) -> usize {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = self.names.len();
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), id);
        self.fragments.push(HashMap::new());
        id
    }

    // Assigns the columns of the block to reference positions `reference.start..=end`.
    fn add_block(&mut self, block: &AlignmentBlock, reference: &SequenceRecord, end: usize) {
        let ids: Vec<usize> = block.iter().map(|record| self.id(&record.name)).collect();
        for &id in ids.iter() {
            for pos in reference.start..=end {
                self.fragments[id].insert(pos, Vec::new());
            }
        }

        let mut cursor = reference.start;
        for column in 0..block.alignment_len() {
            for (record, &id) in block.iter().zip(ids.iter()) {
                self.fragments[id].entry(cursor).or_default().push(record.text[column]);
            }
            if reference.text[column] != GAP && cursor < end {
                cursor += 1;
            }
        }
    }

    // Concatenates the fragments for the given sequence over the intervals.
    fn splice(&self, id: usize, intervals: &[Range<usize>]) -> Vec<u8> {
        let filler = if id == 0 { UNKNOWN } else { GAP };
        let fragments = &self.fragments[id];
        let reference = &self.fragments[0];
        let mut result = Vec::new();
        for interval in intervals {
            for pos in interval.clone() {
                if let Some(fragment) = fragments.get(&pos) {
                    result.extend_from_slice(fragment);
                } else if let Some(fragment) = reference.get(&pos) {
                    result.extend(iter::repeat(filler).take(fragment.len()));
                } else {
                    result.push(filler);
                }
            }
        }
        result
    }
}

//-----------------------------------------------------------------------------

/// Builds a spliced alignment from the blocks overlapping with the intervals.
///
/// `blocks` should contain each relevant block once, and the reference intervals of the blocks should not overlap.
/// The strand of the reference sequence is taken from the first block.
/// If `strand` differs from it, all texts are reverse-complemented.
/// If there are no blocks, the result contains only the reference with `N` at every position.
///
/// # Errors
///
/// Returns [`Error::Query`] if an interval is empty.
/// Returns [`Error::Consistency`] if a block does not contain the reference, if the blocks disagree on the reference strand,
/// if the reference intervals of the blocks overlap, or if the result is inconsistent.
///
/// # Examples
///
/// ```
/// use maf_base::{MafReader, Strand};
/// use maf_base::splice;
///
/// let maf = "a\ns ref 100 5 + 1000 ACG-TA\ns alt 200 6 + 500 ACGGTA\n";
/// let blocks: Vec<_> = MafReader::new(maf.as_bytes()).map(|x| x.unwrap()).collect();
/// let alignment = splice::splice_blocks(&blocks, "ref", &[101..104], Strand::Forward).unwrap();
/// assert_eq!(alignment.get("ref").unwrap(), b"CG-T");
/// assert_eq!(alignment.get("alt").unwrap(), b"CGGT");
/// ```
pub fn splice_blocks(blocks: &[AlignmentBlock], target: &str, intervals: &[Range<usize>], strand: Strand) -> Result<SplicedAlignment> {
    if let Some(interval) = intervals.iter().find(|x| x.is_empty()) {
        return Err(Error::Query(format!("Interval ({}, {}) invalid: length < 1", interval.start, interval.end)));
    }
    let expected_letters: usize = intervals.iter().map(|x| x.len()).sum();
    if blocks.is_empty() {
        return Ok(SplicedAlignment::no_coverage(target, expected_letters));
    }

    for block in blocks {
        block.validate()?;
    }

    let mut fragments = Fragments::new(target);
    let mut reference_strand: Option<Strand> = None;
    let mut total_len = 0;
    for block in blocks {
        let reference = block.find(target).ok_or_else(|| {
            Error::Consistency(format!("Did not find {} in alignment block", target))
        })?;
        match reference_strand {
            None => reference_strand = Some(reference.strand),
            Some(s) if s != reference.strand => {
                return Err(Error::Consistency(format!(
                    "Inconsistent strands: {} vs. {}", s, reference.strand
                )));
            },
            _ => {},
        }
        let end = reference.end().ok_or_else(|| {
            Error::Consistency(format!("Empty reference interval at {}", reference.start))
        })?;
        fragments.add_block(block, reference, end);
        total_len += reference.size;
    }

    let covered = fragments.fragments[0].len();
    if covered != total_len {
        return Err(Error::Consistency(format!(
            "Number of reference positions ({}) does not match the total size of the blocks ({})", covered, total_len
        )));
    }

    let mut sequences = Vec::with_capacity(fragments.names.len());
    for (id, name) in fragments.names.iter().enumerate() {
        sequences.push(SplicedSequence { name: name.clone(), text: fragments.splice(id, intervals) });
    }

    let reference_letters = utils::ungapped_len(&sequences[0].text);
    if reference_letters != expected_letters {
        return Err(Error::Consistency(format!(
            "Returned sequence for {} has {} letters, expected {}", target, reference_letters, expected_letters
        )));
    }
    let len = sequences[0].text.len();
    if let Some(sequence) = sequences.iter().find(|x| x.text.len() != len) {
        return Err(Error::Consistency(format!(
            "Returned sequence for {} has length {}, expected {}", sequence.name, sequence.text.len(), len
        )));
    }

    if reference_strand.is_some_and(|s| s != strand) {
        for sequence in sequences.iter_mut() {
            sequence.text = utils::reverse_complement(&sequence.text);
        }
    }

    Ok(SplicedAlignment { sequences })
}

//-----------------------------------------------------------------------------

/// Spliced alignments.
impl MafIndex {
    /// Returns a spliced alignment over the half-open reference intervals `starts[i]..ends[i]`.
    ///
    /// The intervals are joined in the given order.
    /// Each block overlapping with the intervals is used once, even if it overlaps with several of them.
    /// The result is reverse-complemented if `strand` differs from the strand of the reference in the blocks.
    /// See [`crate::splice`] for details.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Query`] if the lists have different lengths or an interval is empty.
    /// Returns [`Error::Consistency`] if the blocks cannot be spliced consistently.
    /// Passes through errors from [`MafIndex::search`].
    ///
    /// # Examples
    ///
    /// ```
    /// use maf_base::{utils, MafIndex, Strand};
    ///
    /// let maf_file = utils::get_test_data("example.maf");
    /// let temp_dir = tempfile::tempdir().unwrap();
    /// let db_file = temp_dir.path().join("example.maf.db");
    /// let mut index = MafIndex::new(&db_file, &maf_file, "hg38.chr1").unwrap();
    ///
    /// // Last two positions of the first block and the first three of the second one.
    /// let alignment = index.get_spliced(&[1008, 1010], &[1010, 1013], Strand::Forward).unwrap();
    /// assert_eq!(alignment.get("hg38.chr1").unwrap(), b"ACGG--A");
    /// assert_eq!(alignment.get("mm10.chr4").unwrap(), b"ACGGTTA");
    /// assert_eq!(alignment.get("rn6.chr5").unwrap(), b"AC-----");
    /// ```
    pub fn get_spliced(&mut self, starts: &[usize], ends: &[usize], strand: Strand) -> Result<SplicedAlignment> {
        let intervals = db::validate_intervals(starts, ends)?;

        let mut offsets: HashSet<usize> = HashSet::new();
        let mut blocks: Vec<AlignmentBlock> = Vec::new();
        let mut search = self.search(starts, ends)?;
        while let Some(hit) = search.next_hit() {
            let (entry, block) = hit?;
            if offsets.insert(entry.offset) {
                blocks.push(block);
            }
        }
        drop(search);
        debug!("Splicing {} blocks over {} intervals", blocks.len(), intervals.len());

        splice_blocks(&blocks, self.target(), &intervals, strand)
    }
}

//-----------------------------------------------------------------------------
