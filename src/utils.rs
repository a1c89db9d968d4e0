//! Utility functions and structures.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::io::{BufRead, BufReader, Read};

use flate2::read::MultiGzDecoder;

//-----------------------------------------------------------------------------

/// Returns the full file name for a specific test file.
pub fn get_test_data(filename: &'static str) -> PathBuf {
    let mut buf = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    buf.push("test-data");
    buf.push(filename);
    buf
}

//-----------------------------------------------------------------------------

// Utilities for working with files.

const SIZE_UNITS: [(f64, &str); 6] = [
    (1.0, "B"),
    (1024.0, "KiB"),
    (1024.0 * 1024.0, "MiB"),
    (1024.0 * 1024.0 * 1024.0, "GiB"),
    (1024.0 * 1024.0 * 1024.0 * 1024.0, "TiB"),
    (1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0, "PiB"),
];

/// Returns a human-readable representation of the given number of bytes.
pub fn human_readable_size(bytes: usize) -> String {
    let mut unit = 0;
    let value = bytes as f64;
    while unit + 1 < SIZE_UNITS.len() && value >= SIZE_UNITS[unit + 1].0 {
        unit += 1;
    }
    format!("{:.3} {}", value / SIZE_UNITS[unit].0, SIZE_UNITS[unit].1)
}

/// Returns a human-readable size of the file.
pub fn file_size<P: AsRef<Path>>(filename: P) -> Option<String> {
    let metadata = fs::metadata(filename).ok()?;
    Some(human_readable_size(metadata.len() as usize))
}

/// Returns `true` if the file exists.
pub fn file_exists<P: AsRef<Path>>(filename: P) -> bool {
    fs::metadata(filename).is_ok()
}

/// Returns `true` if the file appears to be gzip-compressed.
pub fn is_gzipped<P: AsRef<Path>>(filename: P) -> bool {
    let file = match File::open(filename) {
        Ok(file) => file,
        Err(_) => return false,
    };
    let mut reader = BufReader::new(file);
    let mut magic = [0; 2];
    let len = reader.read(&mut magic).ok();
    len == Some(2) && magic == [0x1F, 0x8B]
}

/// Returns a buffered reader for the file, which may be gzip-compressed.
///
/// Byte offsets reported by a reader over a compressed file refer to the decompressed stream.
/// They cannot be used for seeking in the file.
pub fn open_file<P: AsRef<Path>>(filename: P) -> std::io::Result<Box<dyn BufRead>> {
    let file = File::open(&filename)?;
    let inner = BufReader::new(file);
    if is_gzipped(&filename) {
        let inner = MultiGzDecoder::new(inner);
        Ok(Box::new(BufReader::new(inner)))
    } else {
        Ok(Box::new(inner))
    }
}

//-----------------------------------------------------------------------------

// Sequence utilities.

/// Gap symbol in aligned sequences.
pub const GAP: u8 = b'-';

/// Filler symbol for reference positions without alignment data.
pub const UNKNOWN: u8 = b'N';

const fn generate_complement() -> [u8; 256] {
    let mut result = [0; 256];
    let mut i = 0;
    while i < 256 {
        result[i] = i as u8;
        i += 1;
    }
    let pairs: [(u8, u8); 12] = [
        (b'A', b'T'), (b'C', b'G'), (b'U', b'A'), (b'N', b'N'),
        (b'R', b'Y'), (b'K', b'M'), (b'S', b'S'), (b'W', b'W'),
        (b'B', b'V'), (b'D', b'H'), (b'X', b'X'), (GAP, GAP),
    ];
    let mut j = 0;
    while j < pairs.len() {
        let (a, b) = pairs[j];
        result[a as usize] = b;
        result[a.to_ascii_lowercase() as usize] = b.to_ascii_lowercase();
        if a != b'U' {
            result[b as usize] = a;
            result[b.to_ascii_lowercase() as usize] = a.to_ascii_lowercase();
        }
        j += 1;
    }
    result
}

const COMPLEMENT: [u8; 256] = generate_complement();

/// Returns the reverse complement of an aligned sequence.
///
/// Gaps stay gaps, IUPAC ambiguity codes are complemented, and case is preserved.
/// Other symbols are left unchanged.
///
/// # Examples
///
/// ```
/// use maf_base::utils;
///
/// assert_eq!(utils::reverse_complement(b"ACG-tn"), b"na-CGT".to_vec());
/// assert_eq!(utils::reverse_complement(b"RyKm"), b"kMrY".to_vec());
/// ```
pub fn reverse_complement(sequence: &[u8]) -> Vec<u8> {
    sequence.iter().rev().map(|&c| COMPLEMENT[c as usize]).collect()
}

/// Returns the number of non-gap symbols in an aligned sequence.
#[inline]
pub fn ungapped_len(sequence: &[u8]) -> usize {
    sequence.iter().filter(|&&c| c != GAP).count()
}

//-----------------------------------------------------------------------------


//-----------------------------------------------------------------------------
