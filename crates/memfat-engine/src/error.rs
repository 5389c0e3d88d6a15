use thiserror::Error;

pub type Result<T> = core::result::Result<T, FsError>;

/// Errors surfaced by the public engine operations.
///
/// Nothing is retried or recovered silently; every failure propagates to
/// the caller. The one compound case is [`FsError::DeleteIncomplete`],
/// raised when a delete has already freed an entry's data blocks but could
/// not remove the entry itself from its parent directory.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("disk full, no free block available")]
    DiskFull,

    #[error("directory full, no free entry slot in its block chain")]
    DirectoryFull,

    #[error("invalid block {0}")]
    InvalidBlock(i32),

    #[error("block chain hit invalid pointer {0}")]
    CorruptChain(i32),

    #[error("entry '{0}' not found")]
    EntryNotFound(String),

    #[error("an entry named '{0}' already exists")]
    DuplicateName(String),

    #[error("name too long ({0} bytes)")]
    NameTooLong(usize),

    #[error("name must not be empty")]
    NameEmpty,

    #[error("'{0}' is not a directory")]
    NotADirectory(String),

    #[error("'{0}' is not a file")]
    NotAFile(String),

    #[error("directory '{name}' is not empty ({entries} entries)")]
    DirectoryNotEmpty { name: String, entries: usize },

    #[error("inconsistent metadata for '{name}': size {size} but start block {start_block}")]
    InconsistentMetadata {
        name: String,
        size: i64,
        start_block: i32,
    },

    #[error("'{0}' cannot be deleted")]
    ReservedName(String),

    #[error("freed data blocks of '{name}' but failed to remove its entry: {source}")]
    DeleteIncomplete {
        name: String,
        #[source]
        source: Box<FsError>,
    },
}
