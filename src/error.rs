//! Error type for MAF-base operations.

/// Result type for MAF-base operations, wrapping [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing, indexing, querying, or splicing alignments.
///
/// None of the errors are recovered from within the crate.
/// The first violation aborts the current operation and is passed to the caller.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A malformed MAF block or line, or a block that cannot be indexed.
    #[error("Format error: {0}")]
    Format(String),

    /// The database was created by an incompatible version of the index.
    #[error("Unsupported index version: {found} (expected {expected})")]
    VersionMismatch { found: String, expected: usize },

    /// The database was built for a different alignment file or reference sequence.
    #[error("Identity mismatch: {0}")]
    IdentityMismatch(String),

    /// The database is unfinished, incomplete, or out of sync with the alignment file.
    #[error("Corrupt index: {0}")]
    CorruptIndex(String),

    /// An invalid query.
    #[error("Invalid query: {0}")]
    Query(String),

    /// The fetched alignments cannot be spliced consistently.
    #[error("Consistency error: {0}")]
    Consistency(String),

    /// Passed through from SQLite.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Passed through from the standard library.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
