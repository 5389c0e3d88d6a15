use log::{debug, warn};
use memfat_fs::{BlockPtr, DirEntry, DIRECTORY_ENTRY_SIZE, ENTRIES_PER_BLOCK, FAT_FREE, TOTAL_BLOCKS};

use crate::error::{FsError, Result};
use crate::fs::{ChainStep, Filesystem};

/// Byte offsets of the entry slots within one directory block. Slots are
/// laid out at a fixed 49-byte stride; trailing bytes that cannot hold a
/// whole slot stay zero and are never examined.
fn slot_offsets() -> impl Iterator<Item = usize> {
    (0..ENTRIES_PER_BLOCK).map(|i| i * DIRECTORY_ENTRY_SIZE)
}

impl Filesystem {
    /// Collects every live entry of the directory starting at `dir_start`,
    /// in chain order then in-block slot order.
    ///
    /// Tombstoned slots are skipped. Slots that fail to decode are logged
    /// and skipped; enumeration never aborts over one bad record. A `Free`
    /// start yields an empty listing, any other non-block start is an
    /// error.
    pub fn list_entries(&self, dir_start: BlockPtr) -> Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        if dir_start == BlockPtr::Free {
            return Ok(entries);
        }
        let mut current = dir_start
            .index()
            .ok_or(FsError::InvalidBlock(dir_start.to_raw()))?;
        let mut steps = 0;
        loop {
            let block = self.block_at(current);
            for offset in slot_offsets() {
                let slot = &block[offset..offset + DIRECTORY_ENTRY_SIZE];
                if slot[0] == 0 {
                    continue;
                }
                match DirEntry::decode(slot) {
                    Ok(entry) => entries.push(entry),
                    Err(err) => {
                        warn!(
                            "skipping undecodable entry at block {} offset {}: {}",
                            current, offset, err
                        );
                    }
                }
            }
            match self.next_in_chain(current)? {
                ChainStep::Next(next) => current = next,
                ChainStep::End => break,
            }
            steps += 1;
            if steps > TOTAL_BLOCKS {
                return Err(FsError::CorruptChain(current as i32));
            }
        }
        Ok(entries)
    }

    /// Finds a live entry by name. Name comparison is byte-wise up to the
    /// first null.
    pub fn find_entry(&self, dir_start: BlockPtr, name: &str) -> Result<DirEntry> {
        self.list_entries(dir_start)?
            .into_iter()
            .find(|e| e.name_bytes() == name.as_bytes())
            .ok_or_else(|| FsError::EntryNotFound(name.to_string()))
    }

    /// Writes `entry` into the first slot whose leading byte is zero, which
    /// covers both never-used and tombstoned slots.
    ///
    /// Fails with `DirectoryFull` once the chain ends without a free slot;
    /// the chain is never extended with a fresh block.
    pub(crate) fn add_entry(&mut self, parent: BlockPtr, entry: &DirEntry) -> Result<()> {
        let start = self.require_allocated(parent)?;
        let bytes = entry.encode();
        let mut current = start;
        let mut steps = 0;
        loop {
            let block = self.block_at_mut(current);
            for offset in slot_offsets() {
                if block[offset] == 0 {
                    block[offset..offset + DIRECTORY_ENTRY_SIZE].copy_from_slice(&bytes);
                    debug!(
                        "added entry '{}' at block {} offset {}",
                        entry.name_as_str(),
                        current,
                        offset
                    );
                    return Ok(());
                }
            }
            match self.fat_at(current) {
                BlockPtr::Eof => return Err(FsError::DirectoryFull),
                BlockPtr::Free => return Err(FsError::CorruptChain(FAT_FREE)),
                ptr => {
                    current = ptr.index().ok_or(FsError::CorruptChain(ptr.to_raw()))?;
                }
            }
            steps += 1;
            if steps > TOTAL_BLOCKS {
                return Err(FsError::CorruptChain(current as i32));
            }
        }
    }

    /// Overwrites the slot holding the entry named like `updated` with the
    /// freshly serialized record.
    pub(crate) fn update_entry(&mut self, parent: BlockPtr, updated: &DirEntry) -> Result<()> {
        let start = self.require_allocated(parent)?;
        let bytes = updated.encode();
        let mut current = start;
        let mut steps = 0;
        loop {
            if let Some(offset) = self.match_slot(current, updated.name_bytes()) {
                let block = self.block_at_mut(current);
                block[offset..offset + DIRECTORY_ENTRY_SIZE].copy_from_slice(&bytes);
                return Ok(());
            }
            match self.next_in_chain(current)? {
                ChainStep::Next(next) => current = next,
                ChainStep::End => {
                    return Err(FsError::EntryNotFound(updated.name_as_str().to_string()))
                }
            }
            steps += 1;
            if steps > TOTAL_BLOCKS {
                return Err(FsError::CorruptChain(current as i32));
            }
        }
    }

    /// Tombstones the slot holding `name` by zeroing its first byte. The
    /// residual bytes stay in place; enumeration ignores them.
    pub(crate) fn invalidate_entry(&mut self, parent: BlockPtr, name: &str) -> Result<()> {
        let start = self.require_allocated(parent)?;
        let mut current = start;
        let mut steps = 0;
        loop {
            if let Some(offset) = self.match_slot(current, name.as_bytes()) {
                self.block_at_mut(current)[offset] = 0;
                debug!(
                    "invalidated entry '{}' at block {} offset {}",
                    name, current, offset
                );
                return Ok(());
            }
            match self.next_in_chain(current)? {
                ChainStep::Next(next) => current = next,
                ChainStep::End => return Err(FsError::EntryNotFound(name.to_string())),
            }
            steps += 1;
            if steps > TOTAL_BLOCKS {
                return Err(FsError::CorruptChain(current as i32));
            }
        }
    }

    /// Offset of the live slot in block `idx` whose name matches, if any.
    /// Undecodable slots are skipped here exactly as in enumeration.
    fn match_slot(&self, idx: usize, name: &[u8]) -> Option<usize> {
        let block = self.block_at(idx);
        for offset in slot_offsets() {
            let slot = &block[offset..offset + DIRECTORY_ENTRY_SIZE];
            if slot[0] == 0 {
                continue;
            }
            match DirEntry::decode(slot) {
                Ok(existing) if existing.name_bytes() == name => return Some(offset),
                Ok(_) => {}
                Err(err) => {
                    debug!(
                        "skipping undecodable entry at block {} offset {}: {}",
                        idx, offset, err
                    );
                }
            }
        }
        None
    }
}
