//! On-disk structures and their little-endian encodings.

use crate::config::*;
use crate::{Dbn, Error, Result};

fn get_u32(buf: &[u8], offset: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&buf[offset..offset + 4]);
    u32::from_le_bytes(bytes)
}

fn put_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

fn blocks_for(bytes: usize) -> u32 {
    bytes.div_ceil(BYTES_PER_BLOCK) as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuperBlock {
    pub magic: u32,               // Magic number to identify the filesystem
    pub num_blocks: u32,          // Total number of blocks on the device
    pub num_inodes: u32,          // Total number of inodes (and directory slots)
    pub inode_start: u32,         // Block number where the inode table starts
    pub inode_blocks: u32,        // Size of the inode table in blocks
    pub dir_start: u32,           // Block number where the directory starts
    pub dir_blocks: u32,          // Size of the directory in blocks
    pub bitmap_start: u32,        // Block number where the free bitmap starts
    pub bitmap_blocks: u32,       // Size of the free bitmap in blocks
    pub data_start: u32,          // Block number where data blocks start
}

impl SuperBlock {
    const FIELDS: usize = 10;

    /// Lays out a volume of `num_blocks` blocks holding `num_inodes` files.
    pub fn new(num_blocks: u32, num_inodes: u32) -> Result<Self> {
        if num_inodes == 0 {
            return Err(Error::InvalidSuperBlock);
        }
        let inode_start = SUPERBLOCK_DBN + 1;
        let inode_blocks = blocks_for(num_inodes as usize * INODE_SIZE);
        let dir_start = inode_start + inode_blocks;
        let dir_blocks = blocks_for(num_inodes as usize * DIR_ENTRY_SIZE);
        let bitmap_start = dir_start + dir_blocks;
        let bitmap_blocks = (num_blocks as usize).div_ceil(BITS_PER_BLOCK) as u32;
        let data_start = bitmap_start + bitmap_blocks;
        // At least one data block must remain.
        if data_start >= num_blocks {
            return Err(Error::InvalidSuperBlock);
        }
        Ok(Self {
            magic: MAGIC,
            num_blocks,
            num_inodes,
            inode_start,
            inode_blocks,
            dir_start,
            dir_blocks,
            bitmap_start,
            bitmap_blocks,
            data_start,
        })
    }

    pub fn data_blocks(&self) -> u32 {
        self.num_blocks - self.data_start
    }

    fn fields(&self) -> [u32; Self::FIELDS] {
        [
            self.magic,
            self.num_blocks,
            self.num_inodes,
            self.inode_start,
            self.inode_blocks,
            self.dir_start,
            self.dir_blocks,
            self.bitmap_start,
            self.bitmap_blocks,
            self.data_start,
        ]
    }

    pub fn encode(&self, buf: &mut [u8]) {
        buf.fill(0);
        for (i, field) in self.fields().into_iter().enumerate() {
            put_u32(buf, i * 4, field);
        }
    }

    pub fn decode(buf: &[u8]) -> Self {
        let f = |i: usize| get_u32(buf, i * 4);
        Self {
            magic: f(0),
            num_blocks: f(1),
            num_inodes: f(2),
            inode_start: f(3),
            inode_blocks: f(4),
            dir_start: f(5),
            dir_blocks: f(6),
            bitmap_start: f(7),
            bitmap_blocks: f(8),
            data_start: f(9),
        }
    }
}

/// Inode as stored in the inode table. A pointer of 0 is unallocated, since
/// block 0 always holds the superblock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskInode {
    pub size: u32,
    pub direct_ptrs: [Dbn; NUM_DIRECT_PTRS],
    pub indirect_ptr: Dbn,
}

impl DiskInode {
    pub fn encode(&self, buf: &mut [u8]) {
        buf[..INODE_SIZE].fill(0);
        put_u32(buf, 0, self.size);
        for (i, ptr) in self.direct_ptrs.iter().enumerate() {
            put_u32(buf, 4 + i * 4, *ptr);
        }
        put_u32(buf, 4 + NUM_DIRECT_PTRS * 4, self.indirect_ptr);
    }

    pub fn decode(buf: &[u8]) -> Self {
        let mut direct_ptrs = [0; NUM_DIRECT_PTRS];
        for (i, ptr) in direct_ptrs.iter_mut().enumerate() {
            *ptr = get_u32(buf, 4 + i * 4);
        }
        Self {
            size: get_u32(buf, 0),
            direct_ptrs,
            indirect_ptr: get_u32(buf, 4 + NUM_DIRECT_PTRS * 4),
        }
    }
}

/// Decodes the pointer array of an indirect block.
pub fn decode_ptrs(buf: &[u8]) -> [Dbn; PTRS_PER_BLOCK] {
    let mut ptrs = [0; PTRS_PER_BLOCK];
    for (i, ptr) in ptrs.iter_mut().enumerate() {
        *ptr = get_u32(buf, i * 4);
    }
    ptrs
}

pub fn encode_ptrs(ptrs: &[Dbn; PTRS_PER_BLOCK], buf: &mut [u8]) {
    for (i, ptr) in ptrs.iter().enumerate() {
        put_u32(buf, i * 4, *ptr);
    }
}

/// Directory slot. Its position in the directory is the inode number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry {
    pub name: [u8; MAX_FILE_NAME_LEN],
}

impl DirEntry {
    pub const NULL: Self = Self {
        name: [0; MAX_FILE_NAME_LEN],
    };

    pub fn new(name: &str) -> Result<Self> {
        let bytes = name.as_bytes();
        if bytes.is_empty() || bytes.len() > MAX_FILE_NAME_LEN || bytes.contains(&0) {
            return Err(Error::InvalidFileName(name.to_string()));
        }
        let mut arr = [0; MAX_FILE_NAME_LEN];
        arr[..bytes.len()].copy_from_slice(bytes);
        Ok(Self { name: arr })
    }

    pub fn decode(buf: &[u8]) -> Self {
        let mut name = [0; MAX_FILE_NAME_LEN];
        name.copy_from_slice(&buf[..MAX_FILE_NAME_LEN]);
        Self { name }
    }

    pub fn encode(&self, buf: &mut [u8]) {
        buf[..MAX_FILE_NAME_LEN].copy_from_slice(&self.name);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_geometry() {
        let sb = SuperBlock::new(100, 16).unwrap();
        assert_eq!(sb.inode_start, 1);
        assert_eq!(sb.inode_blocks, 1);
        assert_eq!(sb.dir_start, 2);
        assert_eq!(sb.dir_blocks, 1);
        assert_eq!(sb.bitmap_start, 3);
        assert_eq!(sb.bitmap_blocks, 1);
        assert_eq!(sb.data_start, 4);
        assert_eq!(sb.data_blocks(), 96);
    }

    #[test]
    fn geometry_needs_a_data_block() {
        assert!(SuperBlock::new(4, 16).is_err());
        assert!(SuperBlock::new(5, 16).is_ok());
        assert!(SuperBlock::new(100, 0).is_err());
    }

    #[test]
    fn superblock_codec() {
        let sb = SuperBlock::new(100, 40).unwrap();
        let mut buf = [0xFFu8; BYTES_PER_BLOCK];
        sb.encode(&mut buf);
        assert_eq!(SuperBlock::decode(&buf), sb);
        assert_eq!(&buf[..4], &MAGIC.to_le_bytes());
    }

    #[test]
    fn inode_codec() {
        let inode = DiskInode {
            size: 1234,
            direct_ptrs: [4, 5, 6, 0, 9],
            indirect_ptr: 17,
        };
        let mut buf = [0u8; INODE_SIZE];
        inode.encode(&mut buf);
        assert_eq!(DiskInode::decode(&buf), inode);
    }

    #[test]
    fn dir_entry_names() {
        assert!(DirEntry::new("").is_err());
        assert!(DirEntry::new(&"x".repeat(MAX_FILE_NAME_LEN + 1)).is_err());
        assert!(DirEntry::new("a\0b").is_err());
        let entry = DirEntry::new(&"x".repeat(MAX_FILE_NAME_LEN)).unwrap();
        assert!(entry.name.iter().all(|&c| c == b'x'));
    }
}
