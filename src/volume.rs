//! Inode addressing: the seam between the byte-range engine and whatever owns
//! the storage topology.

use std::sync::Arc;

use log::debug;

use crate::bitmap::{count_free_blocks, init_free_list};
use crate::config::MAX_FILE_SIZE;
use crate::directory::{dir_add_entry, dir_lookup, dir_rm_entry, init_dir, read_dir};
use crate::inode::{bmap, get_inode, init_inodes, release_blocks, write_inode};
use crate::superblock::write_superblock;
use crate::{BlockDevice, Dbn, DiskInode, Error, Fbn, Inum, Result, SuperBlock};

/// Name lookup, size bookkeeping and block mapping for files.
pub trait InodeAddressing {
    /// Returns the inode filed under `name`, or `NotFound`.
    fn lookup(&self, name: &str) -> Result<Inum>;

    /// Returns an empty inode filed under `name`. An existing file of that
    /// name is emptied and keeps its inode number.
    fn create(&mut self, name: &str) -> Result<Inum>;

    /// Unfiles `name`, releases its blocks and returns its former inode.
    fn remove(&mut self, name: &str) -> Result<Inum>;

    fn size_of(&self, inum: Inum) -> Result<u64>;

    fn set_size(&mut self, inum: Inum, size: u64) -> Result<()>;

    /// Translates a file block number to a disk block number. The block must
    /// already be allocated.
    fn fbn_to_dbn(&self, inum: Inum, fbn: Fbn) -> Result<Dbn>;

    /// Allocates every file block up to and including `target`.
    fn extend(&mut self, inum: Inum, target: Fbn) -> Result<()>;
}

/// Single-directory volume over a block device.
#[derive(Debug)]
pub struct Volume<D: BlockDevice> {
    device: Arc<D>,
    superblock: SuperBlock,
}

impl<D: BlockDevice> Volume<D> {
    pub fn new(device: Arc<D>, superblock: SuperBlock) -> Self {
        Self { device, superblock }
    }

    pub fn superblock(&self) -> &SuperBlock {
        &self.superblock
    }

    pub fn init_super(&self) -> Result<()> {
        write_superblock(&*self.device, &self.superblock)
    }

    pub fn init_inodes(&self) -> Result<()> {
        init_inodes(&*self.device, &self.superblock)
    }

    pub fn init_dir(&self) -> Result<()> {
        init_dir(&*self.device, &self.superblock)
    }

    pub fn init_free_list(&self) -> Result<()> {
        init_free_list(&*self.device, &self.superblock)
    }

    pub fn free_blocks(&self) -> Result<u32> {
        count_free_blocks(&*self.device, &self.superblock)
    }

    pub fn list(&self) -> Result<Vec<String>> {
        Ok(read_dir(&*self.device, &self.superblock)?
            .into_iter()
            .map(|(_, name)| name)
            .collect())
    }

    fn inode(&self, inum: Inum) -> Result<DiskInode> {
        get_inode(&*self.device, &self.superblock, inum)
    }

    fn put_inode(&self, inum: Inum, inode: &DiskInode) -> Result<()> {
        write_inode(&*self.device, &self.superblock, inum, inode)
    }

    fn empty(&self, inum: Inum) -> Result<()> {
        let mut inode = self.inode(inum)?;
        release_blocks(&*self.device, &self.superblock, &mut inode)?;
        self.put_inode(inum, &inode)
    }
}

impl<D: BlockDevice> InodeAddressing for Volume<D> {
    fn lookup(&self, name: &str) -> Result<Inum> {
        dir_lookup(&*self.device, &self.superblock, name)
    }

    fn create(&mut self, name: &str) -> Result<Inum> {
        match self.lookup(name) {
            Ok(inum) => {
                debug!("overwriting {name} (inode {inum})");
                self.empty(inum)?;
                Ok(inum)
            }
            Err(Error::NotFound(_)) => {
                let inum = dir_add_entry(&*self.device, &self.superblock, name)?;
                self.put_inode(inum, &DiskInode::default())?;
                debug!("filed {name} as inode {inum}");
                Ok(inum)
            }
            Err(e) => Err(e),
        }
    }

    fn remove(&mut self, name: &str) -> Result<Inum> {
        let inum = dir_rm_entry(&*self.device, &self.superblock, name)?;
        self.empty(inum)?;
        Ok(inum)
    }

    fn size_of(&self, inum: Inum) -> Result<u64> {
        Ok(self.inode(inum)?.size as u64)
    }

    fn set_size(&mut self, inum: Inum, size: u64) -> Result<()> {
        if size > MAX_FILE_SIZE {
            return Err(Error::FileTooLarge(size.div_ceil(crate::BYTES_PER_BLOCK as u64)));
        }
        let mut inode = self.inode(inum)?;
        inode.size = size as u32;
        self.put_inode(inum, &inode)
    }

    fn fbn_to_dbn(&self, inum: Inum, fbn: Fbn) -> Result<Dbn> {
        let mut inode = self.inode(inum)?;
        bmap(&*self.device, &self.superblock, inum, &mut inode, fbn, false)
    }

    fn extend(&mut self, inum: Inum, target: Fbn) -> Result<()> {
        let mut inode = self.inode(inum)?;
        let mut result = Ok(());
        for fbn in 0..=target {
            if let Err(e) = bmap(&*self.device, &self.superblock, inum, &mut inode, fbn, true) {
                result = Err(e);
                break;
            }
        }
        // Blocks mapped before a failure stay with the inode.
        self.put_inode(inum, &inode)?;
        result
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::MemDisk;

    fn volume(num_blocks: u32, num_inodes: u32) -> Volume<MemDisk> {
        let disk = Arc::new(MemDisk::new(num_blocks));
        let sb = SuperBlock::new(num_blocks, num_inodes).unwrap();
        let volume = Volume::new(disk, sb);
        volume.init_super().unwrap();
        volume.init_inodes().unwrap();
        volume.init_dir().unwrap();
        volume.init_free_list().unwrap();
        volume
    }

    #[test]
    fn create_twice_empties_the_file() {
        let mut vol = volume(32, 8);
        let inum = vol.create("a").unwrap();
        vol.extend(inum, 3).unwrap();
        vol.set_size(inum, 2000).unwrap();
        let free = vol.free_blocks().unwrap();

        assert_eq!(vol.create("a").unwrap(), inum);
        assert_eq!(vol.size_of(inum).unwrap(), 0);
        assert_eq!(vol.free_blocks().unwrap(), free + 4);
        assert!(matches!(vol.fbn_to_dbn(inum, 0), Err(Error::Unmapped { .. })));
    }

    #[test]
    fn extend_failure_keeps_partial_allocation() {
        // 10 blocks, 4 of metadata: 6 data blocks.
        let mut vol = volume(10, 8);
        let inum = vol.create("big").unwrap();
        assert!(matches!(vol.extend(inum, 9), Err(Error::OutOfSpace)));
        assert_eq!(vol.free_blocks().unwrap(), 0);
        assert!(vol.fbn_to_dbn(inum, 4).is_ok());
    }

    #[test]
    fn remove_frees_name_and_blocks() {
        let mut vol = volume(32, 8);
        let free = vol.free_blocks().unwrap();
        let inum = vol.create("gone").unwrap();
        vol.extend(inum, 6).unwrap();
        assert_eq!(vol.remove("gone").unwrap(), inum);
        assert_eq!(vol.free_blocks().unwrap(), free);
        assert!(matches!(vol.lookup("gone"), Err(Error::NotFound(_))));
        assert!(matches!(vol.remove("gone"), Err(Error::NotFound(_))));
    }

    #[test]
    fn size_is_capped() {
        let mut vol = volume(32, 8);
        let inum = vol.create("a").unwrap();
        assert!(vol.set_size(inum, MAX_FILE_SIZE).is_ok());
        assert!(matches!(
            vol.set_size(inum, MAX_FILE_SIZE + 1),
            Err(Error::FileTooLarge(_))
        ));
    }
}
