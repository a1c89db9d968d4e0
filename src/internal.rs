use crate::{MafIndex, MafIndexParams};
use crate::utils;

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

//-----------------------------------------------------------------------------

// Test cases.

// Reference sequence in `test-data/example.maf`.
pub(crate) const EXAMPLE_TARGET: &str = "hg38.chr1";

// Number of blocks in `test-data/example.maf`.
pub(crate) const EXAMPLE_BLOCKS: usize = 5;

// Two blocks for sequence `ref`, with an insertion in the second one.
pub(crate) const TWO_BLOCKS_MAF: &str = "##maf version=1 scoring=none
# two blocks

a score=100.0
s ref    100 5 + 1000 ACGTA
s alt    200 5 +  500 ACCTA
s other   50 4 -  300 AC-TA

a score=50.0
s ref    110 5 + 1000 GG-CAT
s alt    210 6 +  500 GGTCAT

";

//-----------------------------------------------------------------------------

// A MAF file and a database path in a temporary directory.
// The directory is removed when the structure is dropped.
pub(crate) struct TestFiles {
    dir: TempDir,
    pub maf_file: PathBuf,
    pub db_file: PathBuf,
}

impl TestFiles {
    // Writes the MAF file into the temporary directory.
    pub fn with_contents(maf: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let maf_file = dir.path().join("test.maf");
        let result = fs::write(&maf_file, maf);
        assert!(result.is_ok(), "Failed to write {}: {}", maf_file.display(), result.unwrap_err());
        let db_file = dir.path().join("test.maf.db");
        TestFiles { dir, maf_file, db_file }
    }

    // Uses `test-data/example.maf` with a temporary database.
    pub fn example() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let maf_file = utils::get_test_data("example.maf");
        let db_file = dir.path().join("example.maf.db");
        TestFiles { dir, maf_file, db_file }
    }

    // Another database path in the same directory.
    pub fn other_db(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn create(&self, target: &str, params: &MafIndexParams) {
        assert!(!utils::file_exists(&self.db_file), "Database {} already exists", self.db_file.display());
        let result = MafIndex::create(&self.db_file, &self.maf_file, target, params);
        assert!(result.is_ok(), "Failed to create the index: {}", result.unwrap_err());
    }

    pub fn open(&self, target: &str) -> MafIndex {
        let index = MafIndex::open(&self.db_file, &self.maf_file, target);
        assert!(index.is_ok(), "Failed to open the index: {}", index.unwrap_err());
        index.unwrap()
    }

    // Creates the index with default parameters and opens it.
    pub fn build(&self, target: &str) -> MafIndex {
        self.create(target, &MafIndexParams::default());
        self.open(target)
    }
}

//-----------------------------------------------------------------------------
