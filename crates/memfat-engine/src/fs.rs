use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info};
use memfat_fs::{
    BlockPtr, DirEntry, FileType, BLOCK_SIZE, DIRECTORY_ENTRY_SIZE, ROOT_DIR_BLOCK, TOTAL_BLOCKS,
};

use crate::error::{FsError, Result};

/// The simulated disk: a block store and its allocation table, owned as one
/// value. Every mutating operation borrows it exclusively; there are no
/// globals and no interior mutability.
pub struct Filesystem {
    blocks: Vec<u8>,
    fat: Vec<BlockPtr>,
}

/// Outcome of following one FAT link.
pub(crate) enum ChainStep {
    Next(usize),
    /// `Eof` or `Free` both end a walk.
    End,
}

impl Filesystem {
    /// Creates a freshly formatted disk.
    pub fn new() -> Self {
        let mut fs = Filesystem {
            blocks: vec![0u8; TOTAL_BLOCKS * BLOCK_SIZE],
            fat: vec![BlockPtr::Free; TOTAL_BLOCKS],
        };
        fs.format();
        fs
    }

    /// Reinitializes the disk: zeroes every block, frees every FAT entry
    /// and rebuilds the root directory with its `.` and `..` entries.
    /// Calling this on a used disk discards all contents.
    pub fn format(&mut self) {
        self.blocks.fill(0);
        self.fat.fill(BlockPtr::Free);

        let root = ROOT_DIR_BLOCK as usize;
        self.fat[root] = BlockPtr::Eof;

        let now = now_nanos();
        let dot = DirEntry::new(".", FileType::Directory, BlockPtr::ROOT, 0, now);
        let dotdot = DirEntry::new("..", FileType::Directory, BlockPtr::ROOT, 0, now);

        // the rest of the block is already zero, which keeps every unused
        // slot a tombstone
        let block = self.block_at_mut(root);
        block[..DIRECTORY_ENTRY_SIZE].copy_from_slice(&dot.encode());
        block[DIRECTORY_ENTRY_SIZE..2 * DIRECTORY_ENTRY_SIZE].copy_from_slice(&dotdot.encode());

        info!(
            "formatted disk: {} blocks of {} bytes, root directory at block {}",
            TOTAL_BLOCKS, BLOCK_SIZE, root
        );
    }

    /// Read-only view of one data block.
    pub fn block(&self, ptr: BlockPtr) -> Result<&[u8]> {
        let idx = ptr.index().ok_or(FsError::InvalidBlock(ptr.to_raw()))?;
        Ok(self.block_at(idx))
    }

    /// Read-only view of the whole allocation table.
    pub fn fat(&self) -> &[BlockPtr] {
        &self.fat
    }

    /// The FAT entry of one block.
    pub fn fat_entry(&self, ptr: BlockPtr) -> Result<BlockPtr> {
        let idx = ptr.index().ok_or(FsError::InvalidBlock(ptr.to_raw()))?;
        Ok(self.fat[idx])
    }

    pub(crate) fn block_at(&self, idx: usize) -> &[u8] {
        &self.blocks[idx * BLOCK_SIZE..(idx + 1) * BLOCK_SIZE]
    }

    pub(crate) fn block_at_mut(&mut self, idx: usize) -> &mut [u8] {
        &mut self.blocks[idx * BLOCK_SIZE..(idx + 1) * BLOCK_SIZE]
    }

    pub(crate) fn fat_at(&self, idx: usize) -> BlockPtr {
        self.fat[idx]
    }

    pub(crate) fn set_fat(&mut self, idx: usize, ptr: BlockPtr) {
        self.fat[idx] = ptr;
    }

    /// Smallest free block index.
    pub(crate) fn find_free_block(&self) -> Result<usize> {
        self.fat
            .iter()
            .position(|&e| e == BlockPtr::Free)
            .ok_or(FsError::DiskFull)
    }

    /// Frees every block of the chain starting at `start`. `Eof` and
    /// `Free` starts free nothing and succeed.
    pub(crate) fn free_chain(&mut self, start: BlockPtr) -> Result<()> {
        let mut current = start;
        let mut steps = 0;
        while let BlockPtr::Index(raw) = current {
            let idx = current.index().ok_or(FsError::CorruptChain(raw))?;
            let next = self.fat[idx];
            self.fat[idx] = BlockPtr::Free;
            debug!("freed block {}", idx);
            current = next;
            steps += 1;
            if steps > TOTAL_BLOCKS {
                return Err(FsError::CorruptChain(current.to_raw()));
            }
        }
        Ok(())
    }

    /// Follows the FAT link out of `idx`, validating the next pointer.
    pub(crate) fn next_in_chain(&self, idx: usize) -> Result<ChainStep> {
        match self.fat[idx] {
            BlockPtr::Eof | BlockPtr::Free => Ok(ChainStep::End),
            ptr => ptr
                .index()
                .map(ChainStep::Next)
                .ok_or(FsError::CorruptChain(ptr.to_raw())),
        }
    }

    /// Validates that `ptr` names an in-range block whose FAT entry is not
    /// free, i.e. a directory that actually exists on disk.
    pub(crate) fn require_allocated(&self, ptr: BlockPtr) -> Result<usize> {
        let idx = ptr.index().ok_or(FsError::InvalidBlock(ptr.to_raw()))?;
        if self.fat[idx] == BlockPtr::Free {
            return Err(FsError::InvalidBlock(ptr.to_raw()));
        }
        Ok(idx)
    }
}

impl Default for Filesystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Nanoseconds since the Unix epoch, the `mod_time` unit of the on-disk
/// format.
pub(crate) fn now_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}
