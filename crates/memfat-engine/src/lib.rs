//! An in-memory simulation of a FAT-style block filesystem.
//!
//! The whole disk lives in one owned [`Filesystem`] value: a fixed array of
//! fixed-size blocks plus a parallel allocation table. Directory entries,
//! allocation chains and file contents all reside inside the simulated
//! blocks, in the wire layout defined by [`memfat_fs`].
//!
//! Operations are synchronous and assume a single caller. Sharing the value
//! across threads requires serializing every call behind one exclusive
//! lock; there is no finer-grained discipline to rely on.

mod dir;
mod error;
mod file;
mod fs;
mod session;

pub use error::{FsError, Result};
pub use fs::Filesystem;
pub use session::{new_filesystem, Session};

pub use memfat_fs::{
    BlockPtr, DirEntry, FileType, BLOCK_SIZE, DIRECTORY_ENTRY_SIZE, ENTRIES_PER_BLOCK, FAT_EOF,
    FAT_FREE, MAX_FILENAME_LEN, ROOT_DIR_BLOCK, TOTAL_BLOCKS,
};
