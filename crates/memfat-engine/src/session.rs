use log::debug;
use memfat_fs::BlockPtr;

use crate::error::{FsError, Result};
use crate::fs::Filesystem;

/// Tracks the caller's current directory. The shell layer owns one of
/// these and hands it to [`Filesystem::change_directory`] for relative
/// operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    current: BlockPtr,
}

impl Session {
    /// A session positioned at the root directory.
    pub fn new() -> Self {
        Session {
            current: BlockPtr::ROOT,
        }
    }

    /// First block of the current directory.
    pub fn current_dir(&self) -> BlockPtr {
        self.current
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Formats a fresh disk and opens a session at the root directory.
pub fn new_filesystem() -> (Filesystem, Session) {
    (Filesystem::new(), Session::new())
}

impl Filesystem {
    /// Moves the session: `/` jumps to the root, `.` is a no-op, `..` or a
    /// plain directory name move one hop. Multi-segment paths are the
    /// caller's business.
    pub fn change_directory(&self, session: &mut Session, target: &str) -> Result<()> {
        if target == "/" {
            session.current = BlockPtr::ROOT;
            return Ok(());
        }
        if target == "." {
            return Ok(());
        }

        let entries = self.list_entries(session.current)?;
        let mut destination = None;
        for entry in &entries {
            if entry.name_bytes() != target.as_bytes() {
                continue;
            }
            if entry.is_directory() {
                destination = Some(entry);
                break;
            }
            if target != ".." {
                return Err(FsError::NotADirectory(target.to_string()));
            }
        }
        let Some(dest) = destination else {
            return Err(FsError::EntryNotFound(target.to_string()));
        };

        self.require_allocated(dest.start_block)?;
        session.current = dest.start_block;
        debug!("changed directory to '{}' (block {})", target, dest.start_block);
        Ok(())
    }
}
