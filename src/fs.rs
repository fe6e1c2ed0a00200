use std::sync::Arc;

use log::{debug, info, warn};

use crate::file::{read_at, write_at};
use crate::oft::{Fd, OpenFileTable};
use crate::seek::{new_cursor, SEEK_CUR};
use crate::superblock::read_superblock;
use crate::volume::{InodeAddressing, Volume};
use crate::{BlockDevice, Config, Error, FileDisk, Result, SuperBlock};

/// Logs fatal errors on their way out of the operation surface.
fn report<T>(op: &str, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        if e.is_fatal() {
            warn!("{op} failed: {e}");
        }
    }
    result
}

#[derive(Debug)]
pub struct FileSystem<D: BlockDevice> {
    device: Arc<D>,
    volume: Volume<D>,
    oft: OpenFileTable,
    config: Config,
}

impl FileSystem<FileDisk> {
    /// Creates (or truncates) the backing store at `config.disk_path` and
    /// formats it.
    pub fn format(config: Config) -> Result<Self> {
        let disk = report("format", FileDisk::create(&config.disk_path, config.num_blocks))?;
        Self::format_device(Arc::new(disk), config)
    }

    /// Mounts the backing store at `config.disk_path`, which must exist.
    pub fn mount(config: Config) -> Result<Self> {
        let disk = report("mount", FileDisk::open(&config.disk_path))?;
        Self::mount_device(Arc::new(disk), config)
    }
}

impl<D: BlockDevice> FileSystem<D> {
    /// Lays down superblock, inode table, directory and free list on
    /// `device`, in that order. Any failing step aborts the format.
    pub fn format_device(device: Arc<D>, config: Config) -> Result<Self> {
        report("format", Self::init(device, config))
    }

    fn init(device: Arc<D>, config: Config) -> Result<Self> {
        let superblock = SuperBlock::new(device.num_blocks(), config.num_inodes)
            .map_err(Error::init("superblock"))?;
        let volume = Volume::new(Arc::clone(&device), superblock);
        volume.init_super().map_err(Error::init("superblock"))?;
        volume.init_inodes().map_err(Error::init("inodes"))?;
        volume.init_dir().map_err(Error::init("directory"))?;
        volume.init_free_list().map_err(Error::init("free list"))?;
        device.flush()?;
        info!(
            "formatted {} blocks, {} inodes, data from block {}",
            superblock.num_blocks, superblock.num_inodes, superblock.data_start
        );
        Ok(Self::assemble(device, volume, config))
    }

    /// Attaches to an already formatted `device`. The layout comes from the
    /// superblock on disk, not from `config`.
    pub fn mount_device(device: Arc<D>, config: Config) -> Result<Self> {
        let superblock = report("mount", read_superblock(&*device))?;
        let volume = Volume::new(Arc::clone(&device), superblock);
        info!(
            "mounted {} blocks, {} inodes",
            superblock.num_blocks, superblock.num_inodes
        );
        Ok(Self::assemble(device, volume, config))
    }

    fn assemble(device: Arc<D>, volume: Volume<D>, config: Config) -> Self {
        Self {
            device,
            volume,
            oft: OpenFileTable::with_capacity(config.max_open_files),
            config,
        }
    }

    // Following methods directly operate on the fs instance, user should wrap a lock around it if needed.

    /// Opens the existing file `name`.
    pub fn open(&mut self, name: &str) -> Result<Fd> {
        let inum = self.volume.lookup(name)?;
        let fd = report("open", self.oft.bind(inum))?;
        debug!("open {name}: inode {inum} on fd {fd}");
        Ok(fd)
    }

    /// Creates `name`, emptying any existing file of that name, and opens it.
    pub fn create(&mut self, name: &str) -> Result<Fd> {
        let inum = report("create", self.volume.create(name))?;
        let fd = report("create", self.oft.bind(inum))?;
        debug!("create {name}: inode {inum} on fd {fd}");
        Ok(fd)
    }

    pub fn close(&mut self, fd: Fd) -> Result<()> {
        let entry = report("close", self.oft.release(fd))?;
        debug!("close fd {fd} (inode {})", entry.inum);
        Ok(())
    }

    /// Reads from the cursor into `buf`, stopping at end-of-file, and advances
    /// the cursor. Returns the number of bytes read.
    pub fn read(&mut self, fd: Fd, buf: &mut [u8]) -> Result<usize> {
        let entry = *report("read", self.oft.entry(fd))?;
        let n = report(
            "read",
            read_at(&*self.device, &self.volume, entry.inum, entry.cursor, buf),
        )?;
        self.seek(fd, n as i64, SEEK_CUR)?;
        Ok(n)
    }

    /// Writes all of `data` at the cursor and advances the cursor past it.
    pub fn write(&mut self, fd: Fd, data: &[u8]) -> Result<()> {
        let entry = *report("write", self.oft.entry(fd))?;
        report(
            "write",
            write_at(
                &*self.device,
                &mut self.volume,
                entry.inum,
                entry.cursor,
                data,
                self.config.fill_policy,
            ),
        )?;
        self.seek(fd, data.len() as i64, SEEK_CUR)
    }

    /// Moves the cursor of `fd`. `whence` is one of `SEEK_SET`, `SEEK_CUR`
    /// or `SEEK_END`; `offset` must not be negative.
    pub fn seek(&mut self, fd: Fd, offset: i64, whence: i32) -> Result<()> {
        let entry = *report("seek", self.oft.entry(fd))?;
        let volume = &self.volume;
        let cursor = report(
            "seek",
            new_cursor(entry.cursor, offset, whence, || volume.size_of(entry.inum)),
        )?;
        self.oft.entry_mut(fd)?.cursor = cursor;
        debug!("seek fd {fd} to {cursor}");
        Ok(())
    }

    pub fn tell(&self, fd: Fd) -> Result<u64> {
        Ok(self.oft.entry(fd)?.cursor)
    }

    /// Current size in bytes of the file open on `fd`.
    pub fn size(&self, fd: Fd) -> Result<u64> {
        self.volume.size_of(self.oft.resolve(fd)?)
    }

    /// Deletes `name`. Refused while any descriptor still has it open.
    pub fn remove(&mut self, name: &str) -> Result<()> {
        let inum = self.volume.lookup(name)?;
        if self.oft.is_open(inum) {
            return Err(Error::Busy(name.to_string()));
        }
        report("remove", self.volume.remove(name))?;
        debug!("removed {name} (inode {inum})");
        Ok(())
    }

    /// Names of all files, in inode order.
    pub fn list(&self) -> Result<Vec<String>> {
        self.volume.list()
    }

    pub fn flush(&self) -> Result<()> {
        self.device.flush()
    }

    /// Reads the superblock back from the device.
    pub fn superblock(&self) -> Result<SuperBlock> {
        read_superblock(&*self.device)
    }

    pub fn free_blocks(&self) -> Result<u32> {
        self.volume.free_blocks()
    }

    /// Number of descriptors currently open.
    pub fn open_files(&self) -> usize {
        self.oft.len()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn device(&self) -> Arc<D> {
        Arc::clone(&self.device)
    }
}
