use super::*;

use crate::internal::{self, TestFiles};
use crate::{MafIndex, MafIndexParams};

use flate2::write::GzEncoder;
use flate2::Compression;

use std::io::Write;

//-----------------------------------------------------------------------------

// Reads all blocks with offsets, expecting success.
fn read_all(maf: &str) -> Vec<(usize, AlignmentBlock)> {
    let mut reader = MafReader::new(maf.as_bytes());
    let mut result = Vec::new();
    loop {
        let block = reader.next_block();
        assert!(block.is_ok(), "Failed to read a block: {}", block.unwrap_err());
        match block.unwrap() {
            Some(block) => result.push(block),
            None => break,
        }
    }
    result
}

// Reads blocks until the first error and returns it.
fn first_error(maf: &str) -> Error {
    let reader = MafReader::new(maf.as_bytes());
    for block in reader {
        if let Err(err) = block {
            return err;
        }
    }
    panic!("Expected an error while reading:\n{}", maf);
}

fn assert_format_error(maf: &str, what: &str) {
    let err = first_error(maf);
    assert!(matches!(err, Error::Format(_)), "Expected a format error for {}, got {}", what, err);
}

//-----------------------------------------------------------------------------

// Tests for `SequenceRecord` and `BlockAnnotation`.

#[test]
fn parse_sequence_line() {
    let line = b"s hg16.chr7    27707221 13 - 158545518 gcagctg-aaaaca";
    let record = SequenceRecord::from_maf(line, None);
    assert!(record.is_ok(), "Failed to parse the line: {}", record.unwrap_err());
    let record = record.unwrap();
    assert_eq!(record.name, "hg16.chr7", "Wrong name");
    assert_eq!(record.start, 27707221, "Wrong start");
    assert_eq!(record.size, 13, "Wrong size");
    assert_eq!(record.strand, Strand::Reverse, "Wrong strand");
    assert_eq!(record.src_size, 158545518, "Wrong source size");
    assert_eq!(record.text, b"gcagctg-aaaaca".to_vec(), "Wrong text");
    assert_eq!(record.len(), 14, "Wrong aligned length");
    assert_eq!(record.ungapped_len(), 13, "Wrong ungapped length");
    assert!(record.has_valid_size(), "The size should match the text");
    assert_eq!(record.interval(), 27707221..27707234, "Wrong interval");
    assert_eq!(record.end(), Some(27707233), "Wrong inclusive end");
}

#[test]
fn invalid_sequence_lines() {
    let lines: [&[u8]; 6] = [
        b"s hg16.chr7 27707221 13 + 158545518",
        b"s hg16.chr7 27707221 13 + 158545518 gcagctgaaaaca extra",
        b"s hg16.chr7 -5 13 + 158545518 gcagctgaaaaca",
        b"s hg16.chr7 27707221 x + 158545518 gcagctgaaaaca",
        b"s hg16.chr7 27707221 13 * 158545518 gcagctgaaaaca",
        b"s hg16.chr7 27707221 13 + 158545518 gcag.tgaaaaca",
    ];
    for line in lines {
        let result = SequenceRecord::from_maf(line, None);
        assert!(
            matches!(result, Err(Error::Format(_))),
            "Expected a format error for line {}", String::from_utf8_lossy(line)
        );
    }
}

#[test]
fn interval_outside_source() {
    let lines: [&[u8]; 4] = [
        b"s ref 18446744073709551615 2 + 10 AC",
        b"s ref 1 18446744073709551615 + 10 AC",
        b"s ref 9 2 + 10 AC",
        b"s ref 0 1 + 0 A",
    ];
    for line in lines {
        let result = SequenceRecord::from_maf(line, None);
        assert!(
            matches!(result, Err(Error::Format(_))),
            "Expected a format error for line {}", String::from_utf8_lossy(line)
        );
    }

    let record = SequenceRecord::from_maf(b"s ref 8 2 + 10 AC", None);
    assert!(record.is_ok(), "Failed to parse a record at the end of the source: {}", record.unwrap_err());

    // The builder reports the error instead of failing on the coordinates.
    let files = TestFiles::with_contents("##maf version=1\na\ns ref 18446744073709551615 2 + 10 AC\n\n");
    let result = MafIndex::create(&files.db_file, &files.maf_file, "ref", &MafIndexParams::default());
    assert!(matches!(result, Err(Error::Format(_))), "Expected a format error from the builder");
}

#[test]
fn empty_record() {
    let record = SequenceRecord::from_maf(b"s mm4.chr6 100 0 + 1000 ----", None).unwrap();
    assert_eq!(record.end(), None, "An empty record should not have an inclusive end");
    assert_eq!(record.interval(), 100..100, "Wrong interval for an empty record");
    assert!(record.has_valid_size(), "The size should match the text");
}

#[test]
fn parse_annotation() {
    let annotation = BlockAnnotation::from_maf(b"a score=23262.0 pass=2 label=cds");
    assert!(annotation.is_ok(), "Failed to parse the annotation: {}", annotation.unwrap_err());
    let annotation = annotation.unwrap();
    assert_eq!(annotation.score, Some(23262.0), "Wrong score");
    assert_eq!(annotation.pass, Some(2), "Wrong pass");
    assert_eq!(annotation.extra.len(), 1, "Wrong number of extra annotations");
    assert_eq!(annotation.extra.get("label").map(|x| x.as_str()), Some("cds"), "Wrong extra annotation");

    let empty = BlockAnnotation::from_maf(b"a").unwrap();
    assert_eq!(empty, BlockAnnotation::default(), "A bare annotation line should be empty");
}

#[test]
fn invalid_annotations() {
    let lines: [&[u8]; 4] = [
        b"a score=1.0 junk",
        b"a score=1.0=2.0",
        b"a score=high",
        b"a pass=-1",
    ];
    for line in lines {
        let result = BlockAnnotation::from_maf(line);
        assert!(
            matches!(result, Err(Error::Format(_))),
            "Expected a format error for line {}", String::from_utf8_lossy(line)
        );
    }
}

//-----------------------------------------------------------------------------

// Tests for `MafReader`: the state machine.

#[test]
fn blocks_and_offsets() {
    let maf = internal::TWO_BLOCKS_MAF;
    let blocks = read_all(maf);
    assert_eq!(blocks.len(), 2, "Wrong number of blocks");

    for (offset, block) in blocks.iter() {
        assert!(maf[*offset..].starts_with("a "), "Offset {} is not at the start of an annotation line", offset);
        assert!(block.find("ref").is_some(), "Missing reference in the block at offset {}", offset);
    }

    let (_, first) = &blocks[0];
    assert_eq!(first.len(), 3, "Wrong number of sequences in the first block");
    assert_eq!(first.alignment_len(), 5, "Wrong alignment length in the first block");
    assert_eq!(first.annotation.score, Some(100.0), "Wrong score in the first block");

    let (_, second) = &blocks[1];
    assert_eq!(second.len(), 2, "Wrong number of sequences in the second block");
    let names: Vec<&str> = second.iter().map(|x| x.name.as_str()).collect();
    assert_eq!(names, vec!["ref", "alt"], "Wrong sequence order in the second block");
}

#[test]
fn ignored_lines() {
    let maf = "##maf version=1\n# comment\n\na score=1\ns ref 0 4 + 10 ACGT\n# inside\ni ref C 0 C 0\ne alt 0 4 + 10 I\nq alt 9999\ns alt 0 4 + 10 AC-GT\n\n";
    let err = first_error(maf);
    assert!(matches!(err, Error::Format(_)), "Unequal text lengths should be a format error, got {}", err);

    let maf = "##maf version=1\n# comment\n\na score=1\ns ref 0 4 + 10 ACGT\n# inside\ni ref C 0 C 0\nq alt 9999\ns alt 0 3 + 10 AC-T\n\n";
    let blocks = read_all(maf);
    assert_eq!(blocks.len(), 1, "Wrong number of blocks");
    assert_eq!(blocks[0].1.len(), 2, "Information lines should not create records");
    assert_eq!(blocks[0].0, maf.find("a score").unwrap(), "Wrong block offset");
}

#[test]
fn end_of_input_ends_block() {
    let maf = "a\ns ref 5 2 + 10 AC\ns alt 7 2 - 10 GT";
    let blocks = read_all(maf);
    assert_eq!(blocks.len(), 1, "Wrong number of blocks");
    let (offset, block) = &blocks[0];
    assert_eq!(*offset, 0, "Wrong offset");
    assert_eq!(block.find("alt").unwrap().strand, Strand::Reverse, "Wrong strand");
}

#[test]
fn crlf_line_endings() {
    let maf = "a score=2\r\ns ref 0 2 + 10 AC\r\n\r\na score=3\r\ns ref 2 2 + 10 GT\r\n";
    let blocks = read_all(maf);
    assert_eq!(blocks.len(), 2, "Wrong number of blocks");
    assert_eq!(blocks[1].0, maf.find("a score=3").unwrap(), "Wrong offset for the second block");
    assert_eq!(blocks[1].1.records[0].text, b"GT".to_vec(), "Carriage returns should be removed");
}

#[test]
fn dot_expansion() {
    let maf = "a\ns ref 0 5 + 10 ACGTA\ns alt 0 5 + 10 ..C.T\n\n";
    let blocks = read_all(maf);
    let alt = blocks[0].1.find("alt").unwrap();
    assert_eq!(alt.text, b"ACCTT".to_vec(), "Wrong text after '.' expansion");
}

#[test]
fn malformed_blocks() {
    assert_format_error("a\ns ref 0 5 + 10 AC.TA\n\n", "'.' in the first sequence");
    assert_format_error("a\ns ref 0 2 + 10 AC\ns alt 0 4 + 10 AC..\n\n", "'.' beyond the first sequence");
    assert_format_error("a\ns ref 0 5 + 10 ACGTA\nx unexpected\n\n", "an unexpected line");
    assert_format_error("a\ns ref 0 5 + 10 ACGTA\na\ns ref 5 5 + 10 ACGTA\n\n", "an annotation line inside a block");
    assert_format_error("a score=1 x\ns ref 0 5 + 10 ACGTA\n\n", "an invalid annotation");
    assert_format_error("a\ns ref 0 5 + 10\n\n", "a short sequence line");
}

#[test]
fn iterator_stops_after_error() {
    let maf = "a\ns ref 0 5 + 10 ACGTA\nbad line\n\na\ns ref 5 5 + 10 ACGTA\n\n";
    let mut reader = MafReader::new(maf.as_bytes());
    assert!(matches!(reader.next(), Some(Err(Error::Format(_)))), "Expected a format error");
    assert!(reader.next().is_none(), "The iterator should stop after an error");
}

#[test]
fn reader_with_offset() {
    let maf = internal::TWO_BLOCKS_MAF;
    let blocks = read_all(maf);
    let (offset, truth) = &blocks[1];

    let mut reader = MafReader::with_offset(maf[*offset..].as_bytes(), *offset);
    let result = reader.next_block().unwrap();
    assert_eq!(result.as_ref().map(|x| x.0), Some(*offset), "Wrong offset when starting in the middle");
    assert_eq!(result.map(|x| x.1).as_ref(), Some(truth), "Wrong block when starting in the middle");
}

//-----------------------------------------------------------------------------

// Tests for `MafReader`: files.

#[test]
fn read_test_file() {
    let filename = crate::utils::get_test_data("example.maf");
    let reader = MafReader::open(&filename);
    assert!(reader.is_ok(), "Failed to open {}: {}", filename.display(), reader.err().unwrap());
    let mut count = 0;
    for block in reader.unwrap() {
        assert!(block.is_ok(), "Failed to read block {}: {}", count, block.unwrap_err());
        let block = block.unwrap();
        let reference = block.find(internal::EXAMPLE_TARGET);
        assert!(reference.is_some(), "Missing reference in block {}", count);
        assert!(reference.unwrap().has_valid_size(), "Invalid reference size in block {}", count);
        count += 1;
    }
    assert_eq!(count, internal::EXAMPLE_BLOCKS, "Wrong number of blocks in the test file");
}

#[test]
fn read_gzipped_file() {
    let maf = internal::TWO_BLOCKS_MAF;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    {
        let mut encoder = GzEncoder::new(file.as_file_mut(), Compression::default());
        encoder.write_all(maf.as_bytes()).unwrap();
        encoder.finish().unwrap();
    }
    assert!(crate::utils::is_gzipped(file.path()), "The file should be gzip-compressed");

    let reader = MafReader::open(file.path());
    assert!(reader.is_ok(), "Failed to open the compressed file: {}", reader.err().unwrap());
    let blocks: Vec<AlignmentBlock> = reader.unwrap().map(|x| x.unwrap()).collect();
    let truth: Vec<AlignmentBlock> = read_all(maf).into_iter().map(|x| x.1).collect();
    assert_eq!(blocks, truth, "Wrong blocks from the compressed file");
}

//-----------------------------------------------------------------------------
