//! Structures for representing blocks of multiple alignments in the MAF format.
//!
//! The Multiple Alignment Format (MAF) stores a series of multiple alignments in a single file.
//! See [the UCSC documentation](https://genome.ucsc.edu/FAQ/FAQformat.html#format5) for details.
//! Each alignment block starts with an `a` line containing the annotation and continues with one `s` line per aligned sequence.
//! A blank line or the end of the file ends the block.
//!
//! ```text
//! a score=23262.0
//! s hg16.chr7    27707221 13 + 158545518 gcagctgaaaaca
//! s panTro1.chr6 28869787 13 + 161576975 gcagctgaaaaca
//! s baboon         249182 13 +   4622798 gcagctgaaaaca
//! ```
//!
//! An [`AlignmentBlock`] contains a [`BlockAnnotation`] and a [`SequenceRecord`] for each `s` line.
//! Blocks can be read from a file using [`MafReader`], which also reports the byte offset of each block.
//! See [`crate::formats`] for writing.

use crate::error::{Error, Result};
use crate::utils;

use std::collections::BTreeMap;
use std::fmt::Display;
use std::io::BufRead;
use std::ops::Range;
use std::path::Path;
use std::str;

#[cfg(test)]
mod tests;

//-----------------------------------------------------------------------------

/// Strand of an aligned sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Strand {
    /// Forward strand (`+`, `1`).
    Forward,
    /// Reverse strand (`-`, `-1`).
    Reverse,
}

impl Strand {
    /// Returns the strand corresponding to a MAF strand symbol, or [`None`] if the symbol is invalid.
    pub fn from_symbol(symbol: &[u8]) -> Option<Self> {
        match symbol {
            b"+" => Some(Strand::Forward),
            b"-" => Some(Strand::Reverse),
            _ => None,
        }
    }

    /// Returns the MAF strand symbol.
    pub fn symbol(&self) -> char {
        match self {
            Strand::Forward => '+',
            Strand::Reverse => '-',
        }
    }

    /// Returns the opposite strand.
    pub fn flip(&self) -> Self {
        match self {
            Strand::Forward => Strand::Reverse,
            Strand::Reverse => Strand::Forward,
        }
    }
}

/// Conversion from the numeric representation `1` / `-1`.
///
/// # Examples
///
/// ```
/// use maf_base::Strand;
///
/// assert_eq!(Strand::try_from(1_isize).unwrap(), Strand::Forward);
/// assert_eq!(Strand::try_from(-1_isize).unwrap(), Strand::Reverse);
/// assert!(Strand::try_from(0_isize).is_err());
/// ```
impl TryFrom<isize> for Strand {
    type Error = Error;

    fn try_from(value: isize) -> Result<Self> {
        match value {
            1 => Ok(Strand::Forward),
            -1 => Ok(Strand::Reverse),
            _ => Err(Error::Query(format!("Strand must be 1 or -1, got {}", value))),
        }
    }
}

impl Display for Strand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

//-----------------------------------------------------------------------------

/// An aligned sequence, corresponding to an `s` line in a MAF block.
///
/// Coordinates are 0-based on the strand given by `strand`.
/// The aligned interval is `start..start + size`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SequenceRecord {
    /// Name of the source sequence, usually `assembly.contig`.
    pub name: String,
    /// Start of the aligned interval.
    pub start: usize,
    /// Length of the aligned interval, or the number of non-gap symbols in the text.
    pub size: usize,
    /// Strand of the source sequence.
    pub strand: Strand,
    /// Total length of the source sequence.
    pub src_size: usize,
    /// Aligned text, with `-` for gaps.
    pub text: Vec<u8>,
}

impl SequenceRecord {
    // Number of whitespace-separated fields in an `s` line.
    const FIELDS: usize = 7;

    /// Returns the length of the aligned text, including gaps.
    #[inline]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Returns `true` if the aligned text is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Returns the half-open aligned interval `start..start + size`.
    #[inline]
    pub fn interval(&self) -> Range<usize> {
        self.start..self.start + self.size
    }

    /// Returns the inclusive end of the aligned interval, or [`None`] if the interval is empty.
    #[inline]
    pub fn end(&self) -> Option<usize> {
        if self.size == 0 { None } else { Some(self.start + self.size - 1) }
    }

    /// Returns the number of non-gap symbols in the aligned text.
    #[inline]
    pub fn ungapped_len(&self) -> usize {
        utils::ungapped_len(&self.text)
    }

    /// Returns `true` if the size matches the number of non-gap symbols in the text.
    #[inline]
    pub fn has_valid_size(&self) -> bool {
        self.size == self.ungapped_len()
    }

    // Parses a numeric field.
    fn parse_usize(field: &[u8], field_name: &str) -> Result<usize> {
        let value = str::from_utf8(field).map_err(|err| {
            Error::Format(format!("Invalid {}: {}", field_name, err))
        })?;
        value.parse().map_err(|err| {
            Error::Format(format!("Invalid {} {}: {}", field_name, value, err))
        })
    }

    /// Parses the record from an `s` line.
    ///
    /// A `.` in the text copies the symbol in the same column from `first`, which should be the first record in the block.
    ///
    /// # Errors
    ///
    /// Returns an error if the line does not have 7 fields or a field cannot be parsed.
    /// The aligned interval must fit within the source sequence, and each `.` must be resolvable.
    pub fn from_maf(line: &[u8], first: Option<&SequenceRecord>) -> Result<Self> {
        let fields: Vec<&[u8]> = line.split(|c| c.is_ascii_whitespace()).filter(|x| !x.is_empty()).collect();
        if fields.len() != Self::FIELDS || fields[0] != b"s" {
            return Err(Error::Format(format!(
                "Sequence line must have {} fields: {}", Self::FIELDS, String::from_utf8_lossy(line).trim_end()
            )));
        }

        let name = String::from_utf8(fields[1].to_vec()).map_err(|err| {
            Error::Format(format!("Invalid sequence name: {}", err))
        })?;
        let start = Self::parse_usize(fields[2], "start")?;
        let size = Self::parse_usize(fields[3], "size")?;
        let strand = Strand::from_symbol(fields[4]).ok_or_else(|| {
            Error::Format(format!("Invalid strand for {}: {}", name, String::from_utf8_lossy(fields[4])))
        })?;
        let src_size = Self::parse_usize(fields[5], "source size")?;
        match start.checked_add(size) {
            Some(end) if end <= src_size => {},
            _ => {
                return Err(Error::Format(format!(
                    "Interval {} + {} for {} exceeds source size {}", start, size, name, src_size
                )));
            },
        }

        let mut text = fields[6].to_vec();
        if text.contains(&b'.') {
            let reference = first.ok_or_else(|| {
                Error::Format(format!("Found '.' in the first sequence of the block ({})", name))
            })?;
            for (column, symbol) in text.iter_mut().enumerate() {
                if *symbol == b'.' {
                    *symbol = *reference.text.get(column).ok_or_else(|| {
                        Error::Format(format!("Cannot resolve '.' at column {} for {}", column, name))
                    })?;
                }
            }
        }

        Ok(SequenceRecord { name, start, size, strand, src_size, text })
    }
}

//-----------------------------------------------------------------------------

/// Annotation of an alignment block, corresponding to the `a` line.
///
/// Keys `score` and `pass` are interpreted.
/// Any other `key=value` pairs are stored as strings in `extra`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BlockAnnotation {
    /// Alignment score.
    pub score: Option<f64>,
    /// Pass number of the aligner.
    pub pass: Option<usize>,
    /// Other annotations.
    pub extra: BTreeMap<String, String>,
}

impl BlockAnnotation {
    /// Parses the annotation from an `a` line.
    ///
    /// # Errors
    ///
    /// Returns an error if the number of tokens does not match the number of `=` characters or a value cannot be parsed.
    pub fn from_maf(line: &[u8]) -> Result<Self> {
        let tokens: Vec<&[u8]> = line.split(|c| c.is_ascii_whitespace()).filter(|x| !x.is_empty()).skip(1).collect();
        let separators = line.iter().filter(|&&c| c == b'=').count();
        if tokens.len() != separators {
            return Err(Error::Format(format!(
                "Invalid key in annotation line: {}", String::from_utf8_lossy(line).trim_end()
            )));
        }

        let mut result = BlockAnnotation::default();
        for token in tokens {
            let token = str::from_utf8(token).map_err(|err| {
                Error::Format(format!("Invalid annotation: {}", err))
            })?;
            let (key, value) = token.split_once('=').ok_or_else(|| {
                Error::Format(format!("Invalid annotation: {}", token))
            })?;
            match key {
                "score" => {
                    let score = value.parse::<f64>().map_err(|err| {
                        Error::Format(format!("Invalid score {}: {}", value, err))
                    })?;
                    result.score = Some(score);
                },
                "pass" => {
                    let pass = value.parse::<usize>().map_err(|err| {
                        Error::Format(format!("Invalid pass {}: {}", value, err))
                    })?;
                    result.pass = Some(pass);
                },
                _ => {
                    result.extra.insert(key.to_string(), value.to_string());
                },
            }
        }

        Ok(result)
    }
}

//-----------------------------------------------------------------------------

/// A block of multiple alignment.
///
/// All records in a block have aligned texts of the same length.
/// The same sequence name may occur more than once.
///
/// # Examples
///
/// ```
/// use maf_base::{MafReader, Strand};
///
/// let maf = "a score=10.0\ns ref 100 5 + 1000 ACGTA\ns alt 200 5 + 500 ACC.A\n";
/// let mut reader = MafReader::new(maf.as_bytes());
/// let block = reader.next().unwrap().unwrap();
/// assert_eq!(block.len(), 2);
/// assert_eq!(block.alignment_len(), 5);
/// assert_eq!(block.annotation.score, Some(10.0));
///
/// let alt = block.find("alt").unwrap();
/// assert_eq!(alt.text, b"ACCTA");
/// assert_eq!(alt.strand, Strand::Forward);
/// assert_eq!(alt.end(), Some(204));
/// assert!(reader.next().is_none());
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AlignmentBlock {
    /// Block annotation from the `a` line.
    pub annotation: BlockAnnotation,
    /// Aligned sequences in the order of the `s` lines.
    pub records: Vec<SequenceRecord>,
}

impl AlignmentBlock {
    /// Returns the number of aligned sequences.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the block contains no sequences.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the number of alignment columns.
    #[inline]
    pub fn alignment_len(&self) -> usize {
        self.records.first().map(|x| x.len()).unwrap_or(0)
    }

    /// Returns the first record with the given sequence name, or [`None`] if there is no such record.
    pub fn find(&self, name: &str) -> Option<&SequenceRecord> {
        self.records.iter().find(|x| x.name == name)
    }

    /// Returns an iterator over the records.
    pub fn iter(&self) -> impl Iterator<Item = &SequenceRecord> {
        self.records.iter()
    }

    // Checks that all aligned texts have the same length.
    pub(crate) fn validate(&self) -> Result<()> {
        let len = self.alignment_len();
        for record in self.records.iter() {
            if record.len() != len {
                return Err(Error::Format(format!(
                    "Aligned text for {} has length {}, expected {}", record.name, record.len(), len
                )));
            }
        }
        Ok(())
    }
}

//-----------------------------------------------------------------------------

// Line types in a MAF file, determined by the first character.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LineType {
    // `a`
    Annotation,
    // `s`
    Sequence,
    // `i`, `e`, `q`: accepted inside a block but not interpreted.
    Information,
    // `#`
    Comment,
    // Empty or whitespace only.
    Blank,
    // Anything else.
    Other,
}

impl LineType {
    fn classify(line: &[u8]) -> Self {
        match line.first() {
            Some(b'a') => LineType::Annotation,
            Some(b's') => LineType::Sequence,
            Some(b'i') | Some(b'e') | Some(b'q') => LineType::Information,
            Some(b'#') => LineType::Comment,
            _ if line.iter().all(|c| c.is_ascii_whitespace()) => LineType::Blank,
            _ => LineType::Other,
        }
    }
}

// Parser state between lines.
enum ParserState {
    OutsideBlock,
    InsideBlock(AlignmentBlock),
}

/// A reader that parses MAF blocks from a buffered source.
///
/// The reader is a state machine with states outside a block and inside a block.
/// Outside a block, an `a` line starts a new block, while other lines are ignored.
/// Inside a block, `s` lines add records, `i`, `e`, and `q` lines and comments are ignored, and a blank line ends the block.
/// The end of the input also ends the current block.
/// Any other line inside a block is an error.
///
/// The reader keeps track of byte offsets in the source.
/// [`MafReader::next_block`] returns the offset of the `a` line together with the block.
/// The iterator interface returns only the blocks.
pub struct MafReader<R: BufRead> {
    reader: R,
    offset: usize,
    line_num: usize,
    failed: bool,
}

impl MafReader<Box<dyn BufRead>> {
    /// Opens a MAF file for sequential reading.
    ///
    /// The file may be gzip-compressed.
    /// In that case, the offsets refer to the decompressed stream.
    pub fn open<P: AsRef<Path>>(filename: P) -> Result<Self> {
        let reader = utils::open_file(filename)?;
        Ok(Self::new(reader))
    }
}

impl<R: BufRead> MafReader<R> {
    /// Creates a new reader starting at offset 0.
    pub fn new(reader: R) -> Self {
        Self::with_offset(reader, 0)
    }

    /// Creates a new reader that assumes the source is currently at the given byte offset.
    pub fn with_offset(reader: R, offset: usize) -> Self {
        MafReader { reader, offset, line_num: 0, failed: false }
    }

    /// Returns the byte offset of the next unread line.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    // Reads the next line into the buffer and returns the number of bytes read.
    fn read_line(&mut self, buf: &mut Vec<u8>) -> Result<usize> {
        buf.clear();
        let len = self.reader.read_until(b'\n', buf)?;
        self.offset += len;
        self.line_num += 1;
        while buf.last() == Some(&b'\n') || buf.last() == Some(&b'\r') {
            buf.pop();
        }
        Ok(len)
    }

    /// Reads the next block and returns it together with the byte offset of its `a` line.
    ///
    /// Returns [`None`] at the end of the input.
    ///
    /// # Errors
    ///
    /// Passes through I/O errors and returns an error if the block is malformed.
    pub fn next_block(&mut self) -> Result<Option<(usize, AlignmentBlock)>> {
        let mut state = ParserState::OutsideBlock;
        let mut block_offset = self.offset;
        let mut buf: Vec<u8> = Vec::new();
        loop {
            let line_offset = self.offset;
            let len = self.read_line(&mut buf)?;
            if len == 0 {
                return match state {
                    ParserState::OutsideBlock => Ok(None),
                    ParserState::InsideBlock(block) => {
                        block.validate()?;
                        Ok(Some((block_offset, block)))
                    },
                };
            }

            let line_type = LineType::classify(&buf);
            state = match (state, line_type) {
                (ParserState::OutsideBlock, LineType::Annotation) => {
                    block_offset = line_offset;
                    let annotation = BlockAnnotation::from_maf(&buf).map_err(|err| self.with_line(err))?;
                    ParserState::InsideBlock(AlignmentBlock { annotation, records: Vec::new() })
                },
                (ParserState::OutsideBlock, _) => ParserState::OutsideBlock,
                (ParserState::InsideBlock(mut block), LineType::Sequence) => {
                    let record = SequenceRecord::from_maf(&buf, block.records.first()).map_err(|err| self.with_line(err))?;
                    block.records.push(record);
                    ParserState::InsideBlock(block)
                },
                (ParserState::InsideBlock(block), LineType::Information | LineType::Comment) => {
                    ParserState::InsideBlock(block)
                },
                (ParserState::InsideBlock(block), LineType::Blank) => {
                    block.validate().map_err(|err| self.with_line(err))?;
                    return Ok(Some((block_offset, block)));
                },
                (ParserState::InsideBlock(_), LineType::Annotation | LineType::Other) => {
                    return Err(self.with_line(Error::Format(format!(
                        "Unexpected line: {}", String::from_utf8_lossy(&buf)
                    ))));
                },
            };
        }
    }

    // Adds the line number to a format error.
    fn with_line(&self, err: Error) -> Error {
        match err {
            Error::Format(message) => Error::Format(format!("Line {}: {}", self.line_num, message)),
            err => err,
        }
    }
}

impl<R: BufRead> Iterator for MafReader<R> {
    type Item = Result<AlignmentBlock>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_block() {
            Ok(Some((_, block))) => Some(Ok(block)),
            Ok(None) => None,
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            },
        }
    }
}

//-----------------------------------------------------------------------------
