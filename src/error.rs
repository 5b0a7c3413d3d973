use thiserror::Error;

/// Failures of the storage layer. None of these are recoverable by the
/// interpreter: once one is raised the on-disk invariants can no longer be
/// trusted, so callers propagate them up to process exit.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tried to fetch page number out of bounds. {page_num} >= {max}")]
    PageOutOfBounds { page_num: usize, max: usize },

    #[error("Short read on page {page_num}: expected {expected} bytes, got {actual}")]
    ShortRead {
        page_num: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Backing file holds {pages} pages, more than the {max} a table can address")]
    TooManyPages { pages: usize, max: usize },

    #[error("Tried to flush page {0} which is not cached")]
    FlushUncachedPage(usize),
}

pub type Result<T> = std::result::Result<T, StorageError>;
