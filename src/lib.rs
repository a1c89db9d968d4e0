//! # MAF-base: random access to multiple alignments using SQLite databases.
//!
//! This is a library for querying a Multiple Alignment Format (MAF) file by coordinates on a reference sequence.
//! A MAF file stores a series of alignment blocks, each of them aligning intervals of several sequences.
//! Reading the entire file is slow for whole-genome alignments, while a typical application needs only a few regions.
//!
//! The index is stored in a SQLite database next to the MAF file.
//! It is built once by scanning the file and reused by later sessions.
//! The database is tied to a single MAF file and a single reference sequence (target).
//! Every block in the file must contain the reference sequence.
//!
//! See [`MafIndex`] for the index and [`AlignmentBlock`] and [`MafReader`] for the MAF format.
//!
//! ### Basic concepts
//!
//! Each alignment block corresponds to a row in table `Entries`.
//! The row stores the interval covered by the reference sequence in the block and the byte offset of the block in the file.
//! Intervals are assigned to bins using the UCSC binning scheme (see [`binning`]).
//! A query interval is translated into a set of candidate bins, and the database returns the overlapping entries in those bins.
//! The blocks are then read from the MAF file and checked against the index.
//!
//! Table `MetaData` stores key-value pairs identifying the index: version, file name, reference sequence, and record count.
//! The record count is finalized only after all entries have been inserted, which makes an interrupted construction detectable.
//!
//! ### Spliced alignments
//!
//! [`MafIndex::get_spliced`] builds a gap-consistent alignment over a list of reference intervals, such as the exons of a transcript.
//! The result contains one gapped sequence for each species present in the overlapping blocks.
//! Uncovered reference positions are filled with `N` in the reference and with gaps in the other sequences.
//! See [`splice`] for details.

pub mod binning;
pub mod db;
pub mod error;
pub mod formats;
pub mod maf;
pub mod splice;
pub mod utils;

pub use db::{IndexEntry, MafIndex, MafIndexParams, Search};
pub use error::{Error, Result};
pub use maf::{AlignmentBlock, BlockAnnotation, MafReader, SequenceRecord, Strand};
pub use splice::{SplicedAlignment, SplicedSequence};

//-----------------------------------------------------------------------------

#[cfg(test)]
mod internal;

//-----------------------------------------------------------------------------
