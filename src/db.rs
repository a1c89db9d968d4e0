//! MAF-base: an SQLite index for random access to a MAF file by reference coordinates.

use crate::{binning, utils};
use crate::error::{Error, Result};
use crate::maf::{AlignmentBlock, MafReader};

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Seek, SeekFrom};
use std::ops::{Range, RangeInclusive};
use std::path::Path;

use log::{debug, info};

use rusqlite::{params_from_iter, Connection, OpenFlags, OptionalExtension, Statement};


//-----------------------------------------------------------------------------

/// An index entry for an alignment block.
///
/// The entry corresponds to one row in table `Entries`.
/// Coordinates are 0-based and inclusive, and they refer to the reference sequence record in the block.
/// The offset is the byte offset of the `a` line of the block in the MAF file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndexEntry {
    /// Smallest bin containing the interval.
    pub bin: usize,
    /// First reference position covered by the block.
    pub start: usize,
    /// Last reference position covered by the block.
    pub end: usize,
    /// Byte offset of the block in the MAF file.
    pub offset: usize,
}

impl IndexEntry {
    /// Creates an index entry for the block at the given offset.
    ///
    /// # Errors
    ///
    /// Returns an error if the block does not contain a record for the reference sequence,
    /// if the size of the reference record does not match its text, or if the reference record is empty.
    pub fn from_block(block: &AlignmentBlock, target: &str, offset: usize) -> Result<Self> {
        let reference = block.find(target).ok_or_else(|| {
            Error::Format(format!("Target for indexing ({}) not found in the block at offset {}", target, offset))
        })?;
        let found = reference.ungapped_len();
        if reference.size != found {
            return Err(Error::Format(format!(
                "Invalid length for target coordinates at offset {} (expected {}, found {})", offset, reference.size, found
            )));
        }
        let end = reference.end().ok_or_else(|| {
            Error::Format(format!("Empty target interval in the block at offset {}", offset))
        })?;
        let bin = binning::smallest_bin(reference.start, end + 1);
        Ok(IndexEntry { bin, start: reference.start, end, offset })
    }

    /// Returns `true` if the entry overlaps with the inclusive interval `[start, end]`.
    #[inline]
    pub fn overlaps(&self, start: usize, end: usize) -> bool {
        self.end >= start && end >= self.start
    }
}

//-----------------------------------------------------------------------------

/// MAF-base construction parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MafIndexParams {
    /// Number of index entries inserted in a single transaction.
    pub batch_size: usize,
}

impl Default for MafIndexParams {
    fn default() -> Self {
        Self {
            batch_size: MafIndex::BATCH_SIZE,
        }
    }
}

//-----------------------------------------------------------------------------

/// An index over a MAF file, stored in a SQLite database.
///
/// The index stores an [`IndexEntry`] for each alignment block.
/// The entries are based on the record for the reference sequence (target) in each block.
/// Every block in the file must contain the reference sequence.
/// Blocks overlapping with reference intervals can be retrieved with [`MafIndex::search`],
/// and a spliced alignment over multiple intervals can be built with [`MafIndex::get_spliced`].
///
/// The structure owns a read-only database connection and a handle to the MAF file.
/// Queries move the file cursor and therefore require a mutable reference.
/// In multi-threaded applications, each thread should open its own index.
///
/// # Examples
///
/// ```
/// use maf_base::{utils, MafIndex};
///
/// let maf_file = utils::get_test_data("example.maf");
/// let temp_dir = tempfile::tempdir().unwrap();
/// let db_file = temp_dir.path().join("example.maf.db");
///
/// // Build the index if it does not exist and open it.
/// let mut index = MafIndex::new(&db_file, &maf_file, "hg38.chr1").unwrap();
/// assert_eq!(index.len(), 5);
///
/// // Blocks overlapping with reference interval [1005, 1012).
/// let blocks: Vec<_> = index.search(&[1005], &[1012]).unwrap().collect();
/// assert_eq!(blocks.len(), 2);
/// let reference = blocks[1].as_ref().unwrap().find("hg38.chr1").unwrap();
/// assert_eq!(reference.start, 1010);
///
/// // Opening an index built for a different reference fails.
/// drop(index);
/// assert!(MafIndex::open(&db_file, &maf_file, "mm10.chr4").is_err());
/// ```
#[derive(Debug)]
pub struct MafIndex {
    connection: Connection,
    source: BufReader<File>,
    maf_file: String,
    target: String,
    records: usize,
}

/// Using the index.
impl MafIndex {
    // Key for index version.
    const KEY_VERSION: &'static str = "version";

    /// Current index version.
    pub const VERSION: usize = 1;

    // Key for the MAF file name.
    const KEY_FILENAME: &'static str = "filename";

    // Key for the name of the reference sequence.
    const KEY_TARGET: &'static str = "target_seqname";

    // Key for the number of index entries.
    const KEY_RECORD_COUNT: &'static str = "record_count";

    // Record count while the index is being built.
    const UNFINISHED: &'static str = "-1";

    /// Default number of entries inserted in a single transaction.
    pub const BATCH_SIZE: usize = 100;

    // Largest coordinate that can be bound as an SQLite integer.
    const MAX_SQL_VALUE: usize = i64::MAX as usize;

    // Returns the identity of the MAF file stored in the database.
    fn source_identity<P: AsRef<Path>>(maf_file: P) -> String {
        maf_file.as_ref().display().to_string()
    }

    /// Opens an existing index for the given MAF file and reference sequence.
    ///
    /// # Errors
    ///
    /// * [`Error::VersionMismatch`] if the index was built by an incompatible version.
    /// * [`Error::IdentityMismatch`] if the index was built for another file or reference sequence.
    /// * [`Error::CorruptIndex`] if the index is unfinished or the number of entries is wrong.
    ///
    /// Passes through any database and I/O errors.
    pub fn open<P: AsRef<Path>, Q: AsRef<Path>>(db_file: P, maf_file: Q, target: &str) -> Result<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let connection = Connection::open_with_flags(&db_file, flags)?;
        let maf_name = Self::source_identity(&maf_file);

        let mut get_value = connection.prepare(
            "SELECT value FROM MetaData WHERE key = ?1"
        ).map_err(|x| Error::CorruptIndex(format!("Cannot read index metadata: {}", x)))?;

        let version = get_string_value(&mut get_value, Self::KEY_VERSION)?;
        if version != Self::VERSION.to_string() {
            return Err(Error::VersionMismatch { found: version, expected: Self::VERSION });
        }

        let filename = get_string_value(&mut get_value, Self::KEY_FILENAME)?;
        if filename != maf_name {
            return Err(Error::IdentityMismatch(format!(
                "Index uses a different file ({} != {})", filename, maf_name
            )));
        }

        let indexed_target = get_string_value(&mut get_value, Self::KEY_TARGET)?;
        if indexed_target != target {
            return Err(Error::IdentityMismatch(format!(
                "Index built for {}, expected {}", indexed_target, target
            )));
        }

        let record_count = get_string_value(&mut get_value, Self::KEY_RECORD_COUNT)?;
        if record_count == Self::UNFINISHED {
            return Err(Error::CorruptIndex(String::from("Unfinished or partial index")));
        }
        let records = record_count.parse::<usize>().map_err(|x| {
            Error::CorruptIndex(format!("Invalid record count {}: {}", record_count, x))
        })?;
        drop(get_value);

        let found = connection.query_row(
            "SELECT COUNT(*) FROM Entries", (), |row| row.get::<_, usize>(0)
        ).map_err(|x| Error::CorruptIndex(format!("Cannot count index entries: {}", x)))?;
        if found != records {
            return Err(Error::CorruptIndex(format!("Expected {} records, found {}", records, found)));
        }

        let source = BufReader::new(File::open(&maf_file)?);
        debug!("Opened index {} for {} with {} records", db_file.as_ref().display(), maf_name, records);

        Ok(MafIndex {
            connection,
            source,
            maf_file: maf_name,
            target: target.to_string(),
            records,
        })
    }

    /// Opens the index for the given MAF file and reference sequence, building it first if the database does not exist.
    ///
    /// Uses default construction parameters.
    /// See [`MafIndex::create`] and [`MafIndex::open`] for details.
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(db_file: P, maf_file: Q, target: &str) -> Result<Self> {
        if !utils::file_exists(&db_file) {
            Self::create(&db_file, &maf_file, target, &MafIndexParams::default())?;
        }
        Self::open(db_file, maf_file, target)
    }

    /// Returns the filename of the database, or [`None`] if there is no filename.
    pub fn filename(&self) -> Option<&str> {
        self.connection.path()
    }

    /// Returns the size of the database file in a human-readable format.
    pub fn file_size(&self) -> Option<String> {
        let filename = self.filename()?;
        utils::file_size(filename)
    }

    /// Returns the name of the indexed MAF file, as stored in the database.
    pub fn maf_file(&self) -> &str {
        &self.maf_file
    }

    /// Returns the name of the reference sequence.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Returns the number of indexed alignment blocks.
    #[inline]
    pub fn len(&self) -> usize {
        self.records
    }

    /// Returns `true` if the index is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records == 0
    }
}

//-----------------------------------------------------------------------------

/// Creating the index.
impl MafIndex {
    /// Creates a new index for the reference sequence `target` in the MAF file.
    ///
    /// The file is scanned sequentially, and an [`IndexEntry`] is inserted for each block.
    /// Entries are committed in batches of `params.batch_size`.
    /// The record count is finalized only after all entries have been inserted.
    /// If the construction fails, the database is left in an unfinished state that [`MafIndex::open`] rejects.
    ///
    /// # Errors
    ///
    /// Returns an error if the database already exists or if the MAF file is gzip-compressed.
    /// Returns [`Error::Format`] if a block is malformed or it does not contain a valid record for the reference sequence.
    /// Passes through any database and I/O errors.
    pub fn create<P: AsRef<Path>, Q: AsRef<Path>>(db_file: P, maf_file: Q, target: &str, params: &MafIndexParams) -> Result<()> {
        info!("Creating database {}", db_file.as_ref().display());
        if utils::file_exists(&db_file) {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("Database {} already exists", db_file.as_ref().display())
            )));
        }
        if utils::is_gzipped(&maf_file) {
            return Err(Error::Format(format!(
                "Cannot index gzip-compressed file {}", maf_file.as_ref().display()
            )));
        }
        let mut reader = MafReader::new(BufReader::new(File::open(&maf_file)?));

        let mut connection = Connection::open(&db_file)?;
        Self::insert_metadata(&mut connection, &Self::source_identity(&maf_file), target)?;
        let records = Self::insert_entries(&mut connection, &mut reader, target, params)?;
        Self::index_entries(&mut connection)?;
        Self::finalize(&mut connection, records)?;

        info!("Database size: {}", utils::file_size(&db_file).unwrap_or(String::from("unknown")));
        Ok(())
    }

    fn insert_metadata(connection: &mut Connection, maf_file: &str, target: &str) -> rusqlite::Result<()> {
        info!("Inserting metadata");

        connection.execute(
            "CREATE TABLE MetaData (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            ) STRICT",
            (),
        )?;

        let transaction = connection.transaction()?;
        {
            let mut insert = transaction.prepare(
                "INSERT INTO MetaData(key, value) VALUES (?1, ?2)"
            )?;
            insert.execute((Self::KEY_VERSION, Self::VERSION.to_string()))?;
            insert.execute((Self::KEY_RECORD_COUNT, Self::UNFINISHED))?;
            insert.execute((Self::KEY_TARGET, target))?;
            insert.execute((Self::KEY_FILENAME, maf_file))?;
        }
        transaction.commit()?;

        Ok(())
    }

    // Returns the number of inserted entries.
    fn insert_entries<R: BufRead>(
        connection: &mut Connection, reader: &mut MafReader<R>,
        target: &str, params: &MafIndexParams
    ) -> Result<usize> {
        info!("Inserting index entries for {}", target);

        connection.execute(
            "CREATE TABLE Entries (
                bin INTEGER NOT NULL,
                start INTEGER NOT NULL,
                end INTEGER NOT NULL,
                offset INTEGER NOT NULL
            ) STRICT",
            (),
        )?;

        let batch_size = params.batch_size.max(1);
        let mut inserted = 0;
        let mut batch: Vec<IndexEntry> = Vec::with_capacity(batch_size);
        while let Some((offset, block)) = reader.next_block()? {
            batch.push(IndexEntry::from_block(&block, target, offset)?);
            if batch.len() >= batch_size {
                inserted += Self::insert_batch(connection, &batch)?;
                batch.clear();
            }
        }
        if !batch.is_empty() {
            inserted += Self::insert_batch(connection, &batch)?;
        }

        info!("Inserted {} index entries", inserted);
        Ok(inserted)
    }

    fn insert_batch(connection: &mut Connection, batch: &[IndexEntry]) -> rusqlite::Result<usize> {
        let transaction = connection.transaction()?;
        {
            let mut insert = transaction.prepare_cached(
                "INSERT INTO Entries(bin, start, end, offset) VALUES (?1, ?2, ?3, ?4)"
            )?;
            for entry in batch {
                insert.execute((entry.bin, entry.start, entry.end, entry.offset))?;
            }
        }
        transaction.commit()?;
        Ok(batch.len())
    }

    fn index_entries(connection: &mut Connection) -> rusqlite::Result<()> {
        info!("Indexing entries");
        connection.execute("CREATE INDEX EntryBin ON Entries(bin)", ())?;
        connection.execute("CREATE INDEX EntryStart ON Entries(start)", ())?;
        connection.execute("CREATE INDEX EntryEnd ON Entries(end)", ())?;
        Ok(())
    }

    fn finalize(connection: &mut Connection, records: usize) -> rusqlite::Result<()> {
        connection.execute(
            "UPDATE MetaData SET value = ?1 WHERE key = ?2",
            (records.to_string(), Self::KEY_RECORD_COUNT),
        )?;
        Ok(())
    }
}

//-----------------------------------------------------------------------------

/// Querying the index.
impl MafIndex {
    /// Returns all index entries in the order of the MAF file.
    pub fn entries(&self) -> Result<Vec<IndexEntry>> {
        let mut statement = self.connection.prepare(
            "SELECT bin, start, end, offset FROM Entries ORDER BY offset"
        )?;
        let mut result = Vec::new();
        let mut rows = statement.query(())?;
        while let Some(row) = rows.next()? {
            result.push(IndexEntry { bin: row.get(0)?, start: row.get(1)?, end: row.get(2)?, offset: row.get(3)? });
        }
        Ok(result)
    }

    /// Returns the entries in the given bin ranges that overlap with the inclusive interval `[start, end]`.
    ///
    /// Each range is an inclusive range of bin numbers, as returned by [`binning::candidate_ranges`].
    /// The entries are sorted by `(start, end, offset)`.
    pub fn entries_overlapping(&self, bins: &[RangeInclusive<usize>], start: usize, end: usize) -> Result<Vec<IndexEntry>> {
        let mut conditions = vec!["bin BETWEEN ? AND ?"; bins.len()].join(" OR ");
        if conditions.is_empty() {
            conditions = String::from("0");
        }
        let mut statement = self.connection.prepare(&format!(
            "SELECT bin, start, end, offset FROM Entries
            WHERE ({}) AND end >= ? AND start <= ?
            ORDER BY start, end, offset ASC",
            conditions
        ))?;

        // SQLite integers are signed.
        let params = bins.iter()
            .flat_map(|range| [*range.start(), *range.end()])
            .chain([start, end])
            .map(|value| value.min(Self::MAX_SQL_VALUE));
        let mut result = Vec::new();
        let mut rows = statement.query(params_from_iter(params))?;
        while let Some(row) = rows.next()? {
            result.push(IndexEntry { bin: row.get(0)?, start: row.get(1)?, end: row.get(2)?, offset: row.get(3)? });
        }
        Ok(result)
    }

    /// Returns a lazy iterator over the blocks overlapping with the given reference intervals.
    ///
    /// Interval `i` is the half-open interval `starts[i]..ends[i]`.
    /// The intervals are processed in the given order.
    /// For each interval, the overlapping blocks are returned in `(start, end, offset)` order, where the coordinates are inclusive reference coordinates.
    /// A block overlapping with multiple intervals is returned once for each of them.
    ///
    /// Each fetched block is checked against the index.
    /// If the reference record in the block does not match the index entry, the iterator returns [`Error::CorruptIndex`] and stops.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Query`] if the lists have different lengths or an interval is empty.
    pub fn search(&mut self, starts: &[usize], ends: &[usize]) -> Result<Search<'_>> {
        let intervals = validate_intervals(starts, ends)?;
        Ok(Search {
            index: self,
            intervals,
            next_interval: 0,
            pending: VecDeque::new(),
            failed: false,
        })
    }

    // Reads the block for the entry from the MAF file and checks that it matches the entry.
    fn fetch_block(&mut self, entry: &IndexEntry) -> Result<AlignmentBlock> {
        self.source.seek(SeekFrom::Start(entry.offset as u64))?;
        let mut reader = MafReader::with_offset(&mut self.source, entry.offset);
        let (offset, block) = reader.next_block()?.ok_or_else(|| {
            Error::CorruptIndex(format!("No alignment block at offset {}", entry.offset))
        })?;
        if offset != entry.offset {
            return Err(Error::CorruptIndex(format!(
                "Expected an alignment block at offset {}, found one at offset {}", entry.offset, offset
            )));
        }

        let reference = block.find(&self.target).ok_or_else(|| {
            Error::CorruptIndex(format!("Target {} not found in the block at offset {}", self.target, entry.offset))
        })?;
        if reference.start != entry.start || reference.end() != Some(entry.end) {
            return Err(Error::CorruptIndex(format!(
                "Expected {}-{} @ offset {}, found start {} size {}",
                entry.start, entry.end, entry.offset, reference.start, reference.size
            )));
        }

        Ok(block)
    }
}

//-----------------------------------------------------------------------------

/// A lazy iterator over alignment blocks overlapping with a list of reference intervals.
///
/// Created with [`MafIndex::search`].
/// The iterator returns [`AlignmentBlock`] objects, while [`Search::next_hit`] also returns the corresponding [`IndexEntry`].
/// After an error, the iterator returns no more items.
#[derive(Debug)]
pub struct Search<'a> {
    index: &'a mut MafIndex,
    intervals: Vec<Range<usize>>,
    next_interval: usize,
    pending: VecDeque<IndexEntry>,
    failed: bool,
}

impl<'a> Search<'a> {
    /// Returns the next index entry and the corresponding block, or [`None`] if there are no more blocks.
    pub fn next_hit(&mut self) -> Option<Result<(IndexEntry, AlignmentBlock)>> {
        if self.failed {
            return None;
        }
        match self.advance() {
            Ok(Some(hit)) => Some(Ok(hit)),
            Ok(None) => None,
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            },
        }
    }

    fn advance(&mut self) -> Result<Option<(IndexEntry, AlignmentBlock)>> {
        loop {
            if let Some(entry) = self.pending.pop_front() {
                let block = self.index.fetch_block(&entry)?;
                return Ok(Some((entry, block)));
            }
            if self.next_interval >= self.intervals.len() {
                return Ok(None);
            }

            // Query end is inclusive.
            let interval = self.intervals[self.next_interval].clone();
            self.next_interval += 1;
            let bins = binning::candidate_ranges(interval.start, interval.end);
            let entries = self.index.entries_overlapping(&bins, interval.start, interval.end - 1)?;
            debug!("Interval {}..{}: {} overlapping blocks", interval.start, interval.end, entries.len());
            self.pending.extend(entries);
        }
    }
}

impl<'a> Iterator for Search<'a> {
    type Item = Result<AlignmentBlock>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_hit().map(|hit| hit.map(|(_, block)| block))
    }
}

//-----------------------------------------------------------------------------

// Helper functions for using the database.

/// Converts lists of starts and ends into half-open intervals.
///
/// # Errors
///
/// Returns [`Error::Query`] if the lists have different lengths or an interval is empty.
pub fn validate_intervals(starts: &[usize], ends: &[usize]) -> Result<Vec<Range<usize>>> {
    if starts.len() != ends.len() {
        return Err(Error::Query(format!(
            "Every position in starts must have a match in ends ({} starts, {} ends)", starts.len(), ends.len()
        )));
    }
    let mut result = Vec::with_capacity(starts.len());
    for (&start, &end) in starts.iter().zip(ends.iter()) {
        if end <= start {
            return Err(Error::Query(format!(
                "Interval ({}, {}) invalid: length < 1", start, end
            )));
        }
        result.push(start..end);
    }
    Ok(result)
}

// Executes the statement, which is expected to return a single string value.
// Then returns the value.
fn get_string_value(statement: &mut Statement, key: &str) -> Result<String> {
    let value: Option<String> = statement.query_row(
        (key,),
        |row| row.get(0)
    ).optional()?;
    value.ok_or_else(|| Error::CorruptIndex(format!("Metadata key not found: {}", key)))
}

//-----------------------------------------------------------------------------
