use super::*;

use crate::internal::{self, TestFiles};
use crate::{MafReader, Strand};

use std::fs;

//-----------------------------------------------------------------------------

// Tests for MAF writing.

#[test]
fn maf_header() {
    let mut output: Vec<u8> = Vec::new();
    write_maf_header(Some("blastz"), &mut output).unwrap();
    assert_eq!(String::from_utf8(output).unwrap(), "##maf version=1 scoring=blastz\n", "Wrong header with scoring");

    let mut output: Vec<u8> = Vec::new();
    write_maf_header(None, &mut output).unwrap();
    assert_eq!(String::from_utf8(output).unwrap(), "##maf version=1\n", "Wrong header without scoring");

    let mut output: Vec<u8> = Vec::new();
    let lines = vec![String::from("query 100-200"), String::from("# already a comment")];
    write_header_lines(&lines, &mut output).unwrap();
    assert_eq!(String::from_utf8(output).unwrap(), "# query 100-200\n# already a comment\n\n", "Wrong header lines");
}

#[test]
fn maf_block_annotation() {
    let maf = "a pass=3 score=7 origin=test\ns ref 0 1 + 1 A\n\n";
    let block = MafReader::new(maf.as_bytes()).next().unwrap().unwrap();
    let mut output: Vec<u8> = Vec::new();
    write_maf_block(&block, &mut output).unwrap();
    assert_eq!(
        String::from_utf8(output).unwrap(), "a score=7.0 pass=3 origin=test\ns ref 0 1 + 1 A\n\n",
        "Wrong block with a reordered annotation"
    );
}

#[test]
fn rewrite_maf_file() {
    let files = TestFiles::example();
    let truth: Vec<AlignmentBlock> = MafReader::open(&files.maf_file).unwrap().map(|x| x.unwrap()).collect();

    let mut output: Vec<u8> = Vec::new();
    write_maf_header(Some("autoMZ.v1"), &mut output).unwrap();
    write_header_lines(&[String::from("rewritten")], &mut output).unwrap();
    for block in truth.iter() {
        write_maf_block(block, &mut output).unwrap();
    }

    let blocks: Vec<AlignmentBlock> = MafReader::new(output.as_slice()).map(|x| x.unwrap()).collect();
    assert_eq!(blocks.len(), internal::EXAMPLE_BLOCKS, "Wrong number of blocks after rewriting");
    assert_eq!(blocks, truth, "Wrong blocks after rewriting");

    // Annotation lines are written as they appear in the file.
    let original = fs::read_to_string(&files.maf_file).unwrap();
    let original_lines: Vec<&str> = original.lines().filter(|line| line.starts_with('a')).collect();
    let output = String::from_utf8(output).unwrap();
    let output_lines: Vec<&str> = output.lines().filter(|line| line.starts_with('a')).collect();
    assert_eq!(output_lines, original_lines, "Wrong annotation lines after rewriting");
}

#[test]
fn maf_block_scores() {
    let scores = [("0", "0.0"), ("1200.0", "1200.0"), ("-3", "-3.0"), ("10.25", "10.25"), ("1e20", "100000000000000000000")];
    for (score, truth) in scores {
        let maf = format!("a score={}\ns ref 0 1 + 1 A\n\n", score);
        let block = MafReader::new(maf.as_bytes()).next().unwrap().unwrap();
        let mut output: Vec<u8> = Vec::new();
        write_maf_block(&block, &mut output).unwrap();
        let output = String::from_utf8(output).unwrap();
        assert_eq!(output.lines().next(), Some(format!("a score={}", truth).as_str()), "Wrong score line for {}", score);
    }
}

//-----------------------------------------------------------------------------

// Tests for FASTA writing.

#[test]
fn fasta_line_wrapping() {
    let sequence: Vec<u8> = b"ACGT-".iter().copied().cycle().take(2 * FASTA_LINE_LEN + 7).collect();
    let mut output: Vec<u8> = Vec::new();
    write_fasta_record("seq", &sequence, &mut output).unwrap();
    let output = String::from_utf8(output).unwrap();
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 4, "Wrong number of lines");
    assert_eq!(lines[0], ">seq", "Wrong header line");
    assert_eq!(lines[1].len(), FASTA_LINE_LEN, "Wrong length for a full line");
    assert_eq!(lines[2].len(), FASTA_LINE_LEN, "Wrong length for a full line");
    assert_eq!(lines[3].len(), 7, "Wrong length for the last line");
    assert_eq!(lines[1..].concat().as_bytes(), sequence.as_slice(), "Wrong sequence");

    let mut output: Vec<u8> = Vec::new();
    write_fasta_record("empty", b"", &mut output).unwrap();
    assert_eq!(String::from_utf8(output).unwrap(), ">empty\n", "Wrong record for an empty sequence");
}

#[test]
fn spliced_fasta() {
    let files = TestFiles::example();
    let mut index = files.build(internal::EXAMPLE_TARGET);
    let alignment = index.get_spliced(&[1008, 1010], &[1010, 1013], Strand::Forward).unwrap();
    let mut output: Vec<u8> = Vec::new();
    write_fasta(&alignment, &mut output).unwrap();
    let truth = ">hg38.chr1\nACGG--A\n>mm10.chr4\nACGGTTA\n>rn6.chr5\nAC-----\n";
    assert_eq!(String::from_utf8(output).unwrap(), truth, "Wrong FASTA output");
}

//-----------------------------------------------------------------------------
