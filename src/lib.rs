//! A small block file system exposing descriptor-based, POSIX-like file I/O.
//! For simplicity, a single flat directory and no permissions or timestamps.
//!
//! Linear layout on the device:
//! - Superblock
//! - Inode Table
//! - Directory
//! - Free Block Bitmap
//! - Data Blocks
//!
//! Layers (from bottom to top):
//! 1. Block Device: whole-block reads and writes by disk block number.   | `FileDisk`, `MemDisk`, or user implemented
//! 2. Volume: superblock, inodes, directory and free list.               | Implements `InodeAddressing`
//! 3. File: byte ranges split into per-block spans, read-modify-write.   | Works over any `InodeAddressing`
//! 4. Open File Table: descriptors bound to `{inode, cursor}`.
//! 5. FileSystem: format, mount and the descriptor operations.           | Single actor; wrap in a lock to share

#![forbid(unsafe_code)]

mod config;
mod block_dev;
mod structs;
mod bitmap;
mod superblock;
mod inode;
mod directory;
mod volume;
mod oft;
mod seek;
mod file;
mod fs;
mod error;

/// Inode number.
pub type Inum = u32;
/// File block number: block index within one file.
pub type Fbn = u64;
/// Disk block number: block index on the device.
pub type Dbn = u32;

pub use block_dev::{Block, BlockDevice, FileDisk, MemDisk};
pub use config::*;
pub use superblock::{read_superblock, write_superblock};
pub use structs::{DirEntry, DiskInode, SuperBlock};
pub use volume::{InodeAddressing, Volume};
pub use oft::{Fd, OpenFile, OpenFileTable};
pub use seek::{new_cursor, Whence, SEEK_CUR, SEEK_END, SEEK_SET};
pub use file::{read_at, spans, write_at, BlockSpan};
pub use fs::*;
pub use error::FsError as Error;
pub use error::{Result, Severity};
