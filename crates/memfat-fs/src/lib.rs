#![no_std]

//! On-disk format of the MemFAT simulated filesystem.
//!
//! The disk is `TOTAL_BLOCKS` blocks of `BLOCK_SIZE` bytes plus a parallel
//! allocation table holding one signed 32-bit pointer per block. Directory
//! contents are packed 49-byte records, little-endian throughout:
//!
//! | offset | size | field       |
//! |--------|------|-------------|
//! | 0      | 28   | name        |
//! | 28     | 1    | type        |
//! | 29     | 4    | start block |
//! | 33     | 8    | size        |
//! | 41     | 8    | mod time    |
//!
//! A record whose first name byte is zero is an empty slot. Enumeration
//! skips such slots and insertion reuses them.

use core::fmt;

use zerocopy::byteorder::{LittleEndian, I32, I64};
use zerocopy::{AsBytes, FromBytes, FromZeroes, Unaligned};

pub const BLOCK_SIZE: usize = 256;
pub const TOTAL_BLOCKS: usize = 256;
pub const MAX_FILENAME_LEN: usize = 28;
pub const DIRECTORY_ENTRY_SIZE: usize = 49;
pub const ENTRIES_PER_BLOCK: usize = BLOCK_SIZE / DIRECTORY_ENTRY_SIZE;

/// First data block of the root directory. Block 0 stays unused by
/// convention but is not withheld from the allocator.
pub const ROOT_DIR_BLOCK: i32 = 1;

/// FAT wire value marking an unallocated block.
pub const FAT_FREE: i32 = -2;
/// FAT wire value terminating a block chain.
pub const FAT_EOF: i32 = -1;

const _: () = assert!(DIRECTORY_ENTRY_SIZE == MAX_FILENAME_LEN + 1 + 4 + 8 + 8);
const _: () = assert!(core::mem::size_of::<RawDirEntry>() == DIRECTORY_ENTRY_SIZE);
const _: () = assert!(ROOT_DIR_BLOCK >= 0 && (ROOT_DIR_BLOCK as usize) < TOTAL_BLOCKS);

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    File = 0,
    Directory = 1,
}

impl FileType {
    pub const fn from_raw(raw: u8) -> Option<FileType> {
        match raw {
            0 => Some(FileType::File),
            1 => Some(FileType::Directory),
            _ => None,
        }
    }
}

/// A block pointer as stored in the FAT and in directory entries.
///
/// The wire encoding is a signed 32-bit integer: -2 marks a free block, -1
/// terminates a chain and anything else names a block. Values outside
/// `0..TOTAL_BLOCKS` survive decoding; range checks belong to the call
/// sites that walk chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockPtr {
    Free,
    Eof,
    Index(i32),
}

impl BlockPtr {
    pub const ROOT: BlockPtr = BlockPtr::Index(ROOT_DIR_BLOCK);

    pub const fn from_raw(raw: i32) -> BlockPtr {
        match raw {
            FAT_FREE => BlockPtr::Free,
            FAT_EOF => BlockPtr::Eof,
            v => BlockPtr::Index(v),
        }
    }

    pub const fn to_raw(self) -> i32 {
        match self {
            BlockPtr::Free => FAT_FREE,
            BlockPtr::Eof => FAT_EOF,
            BlockPtr::Index(v) => v,
        }
    }

    /// The in-range block index, if this pointer names one.
    pub fn index(self) -> Option<usize> {
        match self {
            BlockPtr::Index(v) if v >= 0 && (v as usize) < TOTAL_BLOCKS => Some(v as usize),
            _ => None,
        }
    }
}

impl fmt::Display for BlockPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockPtr::Free => write!(f, "free"),
            BlockPtr::Eof => write!(f, "eof"),
            BlockPtr::Index(v) => write!(f, "{}", v),
        }
    }
}

/// Wire layout of a directory record. Field order and the absence of
/// padding are the on-disk contract; the size assertion above pins it to
/// 49 bytes.
#[repr(C)]
#[derive(FromZeroes, FromBytes, AsBytes, Unaligned, Clone, Copy)]
pub struct RawDirEntry {
    pub name: [u8; MAX_FILENAME_LEN],
    pub ftype: u8,
    pub start_block: I32<LittleEndian>,
    pub size: I64<LittleEndian>,
    pub mod_time: I64<LittleEndian>,
}

/// One directory record in decoded form.
///
/// `name` is null-padded; `size` counts payload bytes for files and is
/// informational for directories; `mod_time` is nanoseconds since the Unix
/// epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry {
    pub name: [u8; MAX_FILENAME_LEN],
    pub ftype: FileType,
    pub start_block: BlockPtr,
    pub size: i64,
    pub mod_time: i64,
}

impl DirEntry {
    /// Builds a record, truncating `name` to `MAX_FILENAME_LEN` bytes.
    /// Callers that care about overlong names must validate before.
    pub fn new(name: &str, ftype: FileType, start_block: BlockPtr, size: i64, mod_time: i64) -> Self {
        let mut buf = [0u8; MAX_FILENAME_LEN];
        let bytes = name.as_bytes();
        let len = bytes.len().min(MAX_FILENAME_LEN);
        buf[..len].copy_from_slice(&bytes[..len]);
        Self {
            name: buf,
            ftype,
            start_block,
            size,
            mod_time,
        }
    }

    /// Name bytes up to the first null terminator.
    pub fn name_bytes(&self) -> &[u8] {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(MAX_FILENAME_LEN);
        &self.name[..end]
    }

    pub fn name_as_str(&self) -> &str {
        core::str::from_utf8(self.name_bytes()).unwrap_or("<invalid>")
    }

    pub fn is_directory(&self) -> bool {
        self.ftype == FileType::Directory
    }

    pub fn is_file(&self) -> bool {
        self.ftype == FileType::File
    }

    /// Encodes the record into its fixed 49-byte wire form.
    pub fn encode(&self) -> [u8; DIRECTORY_ENTRY_SIZE] {
        let raw = RawDirEntry {
            name: self.name,
            ftype: self.ftype as u8,
            start_block: I32::new(self.start_block.to_raw()),
            size: I64::new(self.size),
            mod_time: I64::new(self.mod_time),
        };
        let mut out = [0u8; DIRECTORY_ENTRY_SIZE];
        out.copy_from_slice(raw.as_bytes());
        out
    }

    /// Decodes a record from the first 49 bytes of `data`.
    ///
    /// Only the buffer length and the type byte are checked here;
    /// `start_block` may be out of range and is validated by callers.
    pub fn decode(data: &[u8]) -> Result<DirEntry, DecodeError> {
        let raw = RawDirEntry::read_from_prefix(data).ok_or(DecodeError::Truncated {
            expected: DIRECTORY_ENTRY_SIZE,
            actual: data.len(),
        })?;
        let ftype = FileType::from_raw(raw.ftype).ok_or(DecodeError::UnknownType(raw.ftype))?;
        Ok(DirEntry {
            name: raw.name,
            ftype,
            start_block: BlockPtr::from_raw(raw.start_block.get()),
            size: raw.size.get(),
            mod_time: raw.mod_time.get(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    Truncated { expected: usize, actual: usize },
    UnknownType(u8),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Truncated { expected, actual } => {
                write!(f, "directory entry needs {} bytes, got {}", expected, actual)
            }
            DecodeError::UnknownType(t) => write!(f, "unknown entry type {:#x}", t),
        }
    }
}

impl core::error::Error for DecodeError {}
