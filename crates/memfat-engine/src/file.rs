use log::{debug, warn};
use memfat_fs::{
    BlockPtr, DirEntry, FileType, BLOCK_SIZE, DIRECTORY_ENTRY_SIZE, MAX_FILENAME_LEN, TOTAL_BLOCKS,
};

use crate::error::{FsError, Result};
use crate::fs::{now_nanos, Filesystem};

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(FsError::NameEmpty);
    }
    if name.len() > MAX_FILENAME_LEN {
        return Err(FsError::NameTooLong(name.len()));
    }
    Ok(())
}

impl Filesystem {
    fn ensure_absent(&self, parent: BlockPtr, name: &str) -> Result<()> {
        let exists = self
            .list_entries(parent)?
            .iter()
            .any(|e| e.name_bytes() == name.as_bytes());
        if exists {
            return Err(FsError::DuplicateName(name.to_string()));
        }
        Ok(())
    }

    /// Creates an empty file in the directory starting at `parent` and
    /// returns the entry recorded there. The file gets one data block up
    /// front so its start pointer is valid from the beginning.
    pub fn create_file(&mut self, parent: BlockPtr, name: &str) -> Result<DirEntry> {
        validate_name(name)?;
        self.ensure_absent(parent, name)?;

        let block = self.find_free_block()?;
        self.set_fat(block, BlockPtr::Eof);
        debug!("allocated block {} for file '{}'", block, name);

        let entry = DirEntry::new(
            name,
            FileType::File,
            BlockPtr::Index(block as i32),
            0,
            now_nanos(),
        );
        if let Err(err) = self.add_entry(parent, &entry) {
            self.set_fat(block, BlockPtr::Free);
            return Err(err);
        }
        Ok(entry)
    }

    /// Creates a directory in `parent`, seeds its first block with `.` and
    /// `..` entries and returns the entry recorded in the parent.
    pub fn create_directory(&mut self, parent: BlockPtr, name: &str) -> Result<DirEntry> {
        validate_name(name)?;
        self.ensure_absent(parent, name)?;

        let block = self.find_free_block()?;
        self.set_fat(block, BlockPtr::Eof);
        debug!("allocated block {} for directory '{}'", block, name);

        let now = now_nanos();
        let self_ptr = BlockPtr::Index(block as i32);
        let initial_size = (2 * DIRECTORY_ENTRY_SIZE) as i64;
        let dot = DirEntry::new(".", FileType::Directory, self_ptr, initial_size, now);
        let dotdot = DirEntry::new("..", FileType::Directory, parent, 0, now);

        // a reused block may hold stale bytes; unused slots must read as
        // tombstones
        let data = self.block_at_mut(block);
        data.fill(0);
        data[..DIRECTORY_ENTRY_SIZE].copy_from_slice(&dot.encode());
        data[DIRECTORY_ENTRY_SIZE..2 * DIRECTORY_ENTRY_SIZE].copy_from_slice(&dotdot.encode());

        let entry = DirEntry::new(name, FileType::Directory, self_ptr, initial_size, now);
        if let Err(err) = self.add_entry(parent, &entry) {
            self.set_fat(block, BlockPtr::Free);
            return Err(err);
        }
        Ok(entry)
    }

    /// Reads the whole contents of the file described by `entry`.
    ///
    /// A chain that ends before `entry.size` bytes were collected returns
    /// what was read so far with a warning rather than an error.
    pub fn read_file(&self, entry: &DirEntry) -> Result<Vec<u8>> {
        if !entry.is_file() {
            return Err(FsError::NotAFile(entry.name_as_str().to_string()));
        }
        if entry.size == 0 {
            return Ok(Vec::new());
        }
        if entry.start_block.index().is_none() {
            return Err(FsError::InconsistentMetadata {
                name: entry.name_as_str().to_string(),
                size: entry.size,
                start_block: entry.start_block.to_raw(),
            });
        }

        let mut data = Vec::new();
        let mut remaining = entry.size;
        let mut current = entry.start_block;
        let mut steps = 0;
        while remaining > 0 {
            let idx = match current {
                BlockPtr::Eof | BlockPtr::Free => break,
                ptr => ptr.index().ok_or(FsError::CorruptChain(ptr.to_raw()))?,
            };
            let block = self.block_at(idx);
            let chunk = (BLOCK_SIZE as i64).min(remaining) as usize;
            data.extend_from_slice(&block[..chunk]);
            remaining -= chunk as i64;
            current = self.fat_at(idx);
            steps += 1;
            if steps > TOTAL_BLOCKS {
                return Err(FsError::CorruptChain(current.to_raw()));
            }
        }
        if remaining > 0 {
            warn!(
                "file '{}' may be truncated: chain ended with {} of {} bytes unread",
                entry.name_as_str(),
                remaining,
                entry.size
            );
        }
        Ok(data)
    }

    /// Overwrites the file's contents with `data`, replacing its block
    /// chain and updating the entry both in memory and in the parent
    /// directory.
    ///
    /// The entry's start pointer and size are reset before the new chain
    /// is allocated. If allocation then fails, the in-memory entry stays
    /// reset while the parent's on-disk copy still shows the old, now
    /// freed, chain; the next successful write repairs both.
    pub fn write_file(&mut self, entry: &mut DirEntry, parent: BlockPtr, data: &[u8]) -> Result<()> {
        if !entry.is_file() {
            return Err(FsError::NotAFile(entry.name_as_str().to_string()));
        }
        self.require_allocated(parent)?;

        if let BlockPtr::Index(_) = entry.start_block {
            self.free_chain(entry.start_block)?;
        }
        entry.start_block = BlockPtr::Eof;
        entry.size = 0;

        if data.is_empty() {
            entry.mod_time = now_nanos();
            return self.update_entry(parent, entry);
        }

        let mut allocated = Vec::with_capacity(data.len().div_ceil(BLOCK_SIZE));
        let mut first = BlockPtr::Eof;
        let mut prev: Option<usize> = None;

        for chunk in data.chunks(BLOCK_SIZE) {
            let block = match self.find_free_block() {
                Ok(b) => b,
                Err(_) => {
                    self.release(&allocated);
                    return Err(FsError::DiskFull);
                }
            };
            self.set_fat(block, BlockPtr::Eof);
            allocated.push(block);
            if first == BlockPtr::Eof {
                first = BlockPtr::Index(block as i32);
            }
            if let Some(p) = prev {
                self.set_fat(p, BlockPtr::Index(block as i32));
            }
            prev = Some(block);

            let dest = self.block_at_mut(block);
            dest[..chunk.len()].copy_from_slice(chunk);
            dest[chunk.len()..].fill(0);
        }

        entry.start_block = first;
        entry.size = data.len() as i64;
        entry.mod_time = now_nanos();

        if let Err(err) = self.update_entry(parent, entry) {
            self.release(&allocated);
            return Err(err);
        }
        debug!(
            "wrote {} bytes to '{}' across {} blocks",
            data.len(),
            entry.name_as_str(),
            allocated.len()
        );
        Ok(())
    }

    /// Deletes a file or an empty directory from `parent`.
    ///
    /// Data blocks are freed before the parent entry is invalidated; if
    /// the second step fails the blocks are already gone and the compound
    /// [`FsError::DeleteIncomplete`] reports it.
    pub fn delete_entry(&mut self, parent: BlockPtr, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(FsError::NameEmpty);
        }
        if name == "." || name == ".." {
            return Err(FsError::ReservedName(name.to_string()));
        }

        let entry = self.find_entry(parent, name)?;

        match entry.ftype {
            FileType::File => {
                debug!("deleting file '{}', freeing chain from {}", name, entry.start_block);
                self.free_chain(entry.start_block)?;
            }
            FileType::Directory => {
                // a directory without a valid data block counts as empty
                if entry.start_block.index().is_some() {
                    let live = self
                        .list_entries(entry.start_block)?
                        .iter()
                        .filter(|e| e.name_bytes() != b"." && e.name_bytes() != b"..")
                        .count();
                    if live > 0 {
                        return Err(FsError::DirectoryNotEmpty {
                            name: name.to_string(),
                            entries: live,
                        });
                    }
                }
                debug!("deleting directory '{}', freeing chain from {}", name, entry.start_block);
                self.free_chain(entry.start_block)?;
            }
        }

        self.invalidate_entry(parent, name)
            .map_err(|err| FsError::DeleteIncomplete {
                name: name.to_string(),
                source: Box::new(err),
            })
    }

    fn release(&mut self, blocks: &[usize]) {
        for &b in blocks {
            self.set_fat(b, BlockPtr::Free);
        }
    }
}
