//! Support for writing alignments in various file formats.
//!
//! ### MAF (writing)
//!
//! The following functions support block-by-block writing of MAF files:
//!
//! * [`write_maf_header`]: Write a MAF file header.
//! * [`write_header_lines`]: Write additional comment lines.
//! * [`write_maf_block`]: Write an alignment block.
//!
//! Sequence lines within a block are aligned into columns, and each block ends with a blank line.
//! See [`crate::maf`] for reading.
//!
//! ### FASTA (writing)
//!
//! Spliced alignments are usually written in FASTA format with gaps.
//!
//! * [`write_fasta`]: Write a spliced alignment.
//! * [`write_fasta_record`]: Write a single sequence.
//!
//! Sequence lines are wrapped at [`FASTA_LINE_LEN`] columns.

use crate::{AlignmentBlock, SplicedAlignment};

use std::io::{self, Write};

#[cfg(test)]
mod tests;

//-----------------------------------------------------------------------------

// MAF writing.

/// Writes the MAF header line.
///
/// The header specifies format version 1 and the optional scoring scheme.
pub fn write_maf_header<T: Write>(scoring: Option<&str>, output: &mut T) -> io::Result<()> {
    let header = if let Some(scoring) = scoring {
        format!("##maf version=1 scoring={}\n", scoring)
    } else {
        "##maf version=1\n".to_string()
    };
    output.write_all(header.as_bytes())?;
    Ok(())
}

/// Writes the given lines as comments, followed by a blank line.
///
/// A `#` is added to the start of each line that does not already have one.
pub fn write_header_lines<T: Write>(header_lines: &[String], output: &mut T) -> io::Result<()> {
    for line in header_lines.iter() {
        if !line.starts_with('#') {
            output.write_all(b"# ")?;
        }
        output.write_all(line.as_bytes())?;
        output.write_all(b"\n")?;
    }
    output.write_all(b"\n")?;
    Ok(())
}

/// Writes the alignment block, including the blank line that ends it.
///
/// # Examples
///
/// ```
/// use maf_base::{formats, MafReader};
///
/// let maf = "a score=10.5 pass=2\ns ref 100 5 + 1000 ACGTA\ns alt.chr1 2000 4 - 5000 AC-TA\n";
/// let block = MafReader::new(maf.as_bytes()).next().unwrap().unwrap();
/// let mut output: Vec<u8> = Vec::new();
/// formats::write_maf_block(&block, &mut output).unwrap();
/// let truth = "a score=10.5 pass=2\n\
///              s ref       100 5 + 1000 ACGTA\n\
///              s alt.chr1 2000 4 - 5000 AC-TA\n\n";
/// assert_eq!(String::from_utf8(output).unwrap(), truth);
/// ```
pub fn write_maf_block<T: Write>(block: &AlignmentBlock, output: &mut T) -> io::Result<()> {
    let mut buffer: Vec<u8> = Vec::new();

    buffer.push(b'a');
    if let Some(score) = block.annotation.score {
        // Integral scores keep the decimal point, as in `score=1200.0`.
        if score.is_finite() && score.fract() == 0.0 && score.abs() < 1e15 {
            write!(buffer, " score={:.1}", score)?;
        } else {
            write!(buffer, " score={}", score)?;
        }
    }
    if let Some(pass) = block.annotation.pass {
        write!(buffer, " pass={}", pass)?;
    }
    for (key, value) in block.annotation.extra.iter() {
        write!(buffer, " {}={}", key, value)?;
    }
    buffer.push(b'\n');

    let name_width = block.iter().map(|x| x.name.len()).max().unwrap_or(0);
    let start_width = block.iter().map(|x| x.start.to_string().len()).max().unwrap_or(0);
    let size_width = block.iter().map(|x| x.size.to_string().len()).max().unwrap_or(0);
    let src_width = block.iter().map(|x| x.src_size.to_string().len()).max().unwrap_or(0);
    for record in block.iter() {
        write!(
            buffer, "s {:<nw$} {:>sw$} {:>zw$} {} {:>lw$} ",
            record.name, record.start, record.size, record.strand, record.src_size,
            nw = name_width, sw = start_width, zw = size_width, lw = src_width
        )?;
        buffer.extend_from_slice(&record.text);
        buffer.push(b'\n');
    }
    buffer.push(b'\n');

    output.write_all(&buffer)?;
    Ok(())
}

//-----------------------------------------------------------------------------

// FASTA writing.

/// Maximum number of sequence symbols on a FASTA line.
pub const FASTA_LINE_LEN: usize = 60;

/// Writes a FASTA record with the given name and sequence.
pub fn write_fasta_record<T: Write>(name: &str, sequence: &[u8], output: &mut T) -> io::Result<()> {
    let mut buffer: Vec<u8> = Vec::with_capacity(name.len() + sequence.len() + sequence.len() / FASTA_LINE_LEN + 3);

    buffer.push(b'>');
    buffer.extend_from_slice(name.as_bytes());
    buffer.push(b'\n');
    for line in sequence.chunks(FASTA_LINE_LEN) {
        buffer.extend_from_slice(line);
        buffer.push(b'\n');
    }

    output.write_all(&buffer)?;
    Ok(())
}

/// Writes the spliced alignment in FASTA format, with the reference first.
pub fn write_fasta<T: Write>(alignment: &SplicedAlignment, output: &mut T) -> io::Result<()> {
    for sequence in alignment.iter() {
        write_fasta_record(&sequence.name, &sequence.text, output)?;
    }
    Ok(())
}

//-----------------------------------------------------------------------------
