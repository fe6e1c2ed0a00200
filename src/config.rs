use std::path::PathBuf;

pub const MAGIC: u32 = 0x4246_5331; // "BFS1" in ASCII

pub const BYTES_PER_BLOCK: usize = 512;
pub const SUPERBLOCK_DBN: u32 = 0; // Block number of the superblock

pub const INODE_SIZE: usize = 32;
pub const INODES_PER_BLOCK: usize = BYTES_PER_BLOCK / INODE_SIZE;
pub const NUM_DIRECT_PTRS: usize = 5; // Number of direct pointers in an inode
pub const PTRS_PER_BLOCK: usize = BYTES_PER_BLOCK / 4; // 32-bit pointers in the indirect block
pub const MAX_FILE_BLOCKS: u64 = (NUM_DIRECT_PTRS + PTRS_PER_BLOCK) as u64;
pub const MAX_FILE_SIZE: u64 = MAX_FILE_BLOCKS * BYTES_PER_BLOCK as u64;

pub const DIR_ENTRY_SIZE: usize = 32; // One NUL-padded name per inode number
pub const ENTRIES_PER_BLOCK: usize = BYTES_PER_BLOCK / DIR_ENTRY_SIZE;
pub const MAX_FILE_NAME_LEN: usize = DIR_ENTRY_SIZE;

pub const BITS_PER_BLOCK: usize = BYTES_PER_BLOCK * 8;

pub const FIRST_FD: usize = 3; // 0, 1 and 2 stay reserved for the standard streams

pub const DEFAULT_DISK_PATH: &str = "BFSDISK";
pub const DEFAULT_NUM_BLOCKS: u32 = 100;
pub const DEFAULT_NUM_INODES: u32 = 16;
pub const DEFAULT_MAX_OPEN_FILES: usize = 20;

/// What a write starting past end-of-file leaves in the bytes between the
/// old size and the write offset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FillPolicy {
    /// The engine writes zeros over the gap before the payload.
    #[default]
    Zero,
    /// The gap keeps whatever the freshly allocated blocks already contain.
    Preserve,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Host file backing a `FileDisk`.
    pub disk_path: PathBuf,
    /// Size of the backing store created by `format`.
    pub num_blocks: u32,
    pub num_inodes: u32,
    /// Capacity of the open file table.
    pub max_open_files: usize,
    pub fill_policy: FillPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            disk_path: PathBuf::from(DEFAULT_DISK_PATH),
            num_blocks: DEFAULT_NUM_BLOCKS,
            num_inodes: DEFAULT_NUM_INODES,
            max_open_files: DEFAULT_MAX_OPEN_FILES,
            fill_policy: FillPolicy::default(),
        }
    }
}

impl Config {
    pub fn with_disk_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.disk_path = path.into();
        self
    }

    pub fn with_num_blocks(mut self, num_blocks: u32) -> Self {
        self.num_blocks = num_blocks;
        self
    }

    pub fn with_num_inodes(mut self, num_inodes: u32) -> Self {
        self.num_inodes = num_inodes;
        self
    }

    pub fn with_max_open_files(mut self, max_open_files: usize) -> Self {
        self.max_open_files = max_open_files;
        self
    }

    pub fn with_fill_policy(mut self, fill_policy: FillPolicy) -> Self {
        self.fill_policy = fill_policy;
        self
    }
}
