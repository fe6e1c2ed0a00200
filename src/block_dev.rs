use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

use log::debug;
use parking_lot::Mutex;

use crate::config::BYTES_PER_BLOCK;
use crate::error::FsError;
use crate::{Dbn, Result};

/// One whole block of device storage.
pub type Block = [u8; BYTES_PER_BLOCK];

pub trait BlockDevice: Send + Sync {
    /// Returns the number of blocks in the block device.
    fn num_blocks(&self) -> u32;

    /// Reads block `dbn` into `buf`.
    fn read_block(&self, dbn: Dbn, buf: &mut Block) -> Result<()>;

    /// Writes `buf` to block `dbn`.
    fn write_block(&self, dbn: Dbn, buf: &Block) -> Result<()>;

    /// Flushes any buffered data to the underlying medium.
    fn flush(&self) -> Result<()>;
}

fn check_range(dbn: Dbn, num_blocks: u32) -> Result<u64> {
    if dbn >= num_blocks {
        return Err(FsError::InvalidBlockId(dbn));
    }
    Ok(dbn as u64 * BYTES_PER_BLOCK as u64)
}

/// Block device backed by a host file, using positional reads and writes so
/// no seek position is shared between callers.
#[derive(Debug)]
pub struct FileDisk {
    file: File,
    path: PathBuf,
    num_blocks: u32,
}

impl FileDisk {
    /// Creates the backing store at `path`, truncating any existing file, and
    /// sizes it to `num_blocks` zeroed blocks.
    pub fn create(path: impl AsRef<Path>, num_blocks: u32) -> Result<Self> {
        let path = path.as_ref();
        let create_err = |source| FsError::DiskCreate {
            path: path.to_path_buf(),
            source,
        };
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(create_err)?;
        file.set_len(num_blocks as u64 * BYTES_PER_BLOCK as u64)
            .map_err(create_err)?;
        debug!("created backing store {} ({num_blocks} blocks)", path.display());
        Ok(Self {
            file,
            path: path.to_path_buf(),
            num_blocks,
        })
    }

    /// Opens an existing backing store. Its length decides the block count.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => FsError::NoDisk(path.to_path_buf()),
                _ => FsError::Io(e),
            })?;
        let len = file.metadata()?.len();
        let num_blocks = u32::try_from(len / BYTES_PER_BLOCK as u64)
            .map_err(|_| FsError::InvalidSuperBlock)?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
            num_blocks,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BlockDevice for FileDisk {
    fn num_blocks(&self) -> u32 {
        self.num_blocks
    }

    fn read_block(&self, dbn: Dbn, buf: &mut Block) -> Result<()> {
        let offset = check_range(dbn, self.num_blocks)?;
        self.file.read_exact_at(buf, offset)?;
        Ok(())
    }

    fn write_block(&self, dbn: Dbn, buf: &Block) -> Result<()> {
        let offset = check_range(dbn, self.num_blocks)?;
        self.file.write_all_at(buf, offset)?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.file.sync_data()?;
        Ok(())
    }
}

/// Block device held entirely in memory.
#[derive(Debug)]
pub struct MemDisk {
    inner: Mutex<Vec<u8>>,
    num_blocks: u32,
}

impl MemDisk {
    /// Creates a zeroed disk of `num_blocks` blocks.
    pub fn new(num_blocks: u32) -> Self {
        Self {
            inner: Mutex::new(vec![0u8; num_blocks as usize * BYTES_PER_BLOCK]),
            num_blocks,
        }
    }
}

impl BlockDevice for MemDisk {
    fn num_blocks(&self) -> u32 {
        self.num_blocks
    }

    fn read_block(&self, dbn: Dbn, buf: &mut Block) -> Result<()> {
        let start = check_range(dbn, self.num_blocks)? as usize;
        let data = self.inner.lock();
        buf.copy_from_slice(&data[start..start + BYTES_PER_BLOCK]);
        Ok(())
    }

    fn write_block(&self, dbn: Dbn, buf: &Block) -> Result<()> {
        let start = check_range(dbn, self.num_blocks)? as usize;
        let mut data = self.inner.lock();
        data[start..start + BYTES_PER_BLOCK].copy_from_slice(buf);
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        // Nothing is buffered outside the vector.
        Ok(())
    }
}
