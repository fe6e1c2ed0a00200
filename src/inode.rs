//! Management of reading and writing to inodes.

use crate::bitmap::{alloc_data_block, free_data_block};
use crate::config::*;
use crate::error::FsError;
use crate::structs::{decode_ptrs, encode_ptrs};
use crate::superblock::zero_region;
use crate::{BlockDevice, Dbn, DiskInode, Fbn, Inum, Result, SuperBlock};

fn locate(superblock: &SuperBlock, inum: Inum) -> Result<(Dbn, usize)> {
    if inum >= superblock.num_inodes {
        return Err(FsError::InvalidInode(inum));
    }
    let dbn = superblock.inode_start + inum / INODES_PER_BLOCK as u32;
    let offset = (inum as usize % INODES_PER_BLOCK) * INODE_SIZE;
    Ok((dbn, offset))
}

pub fn init_inodes(device: &impl BlockDevice, superblock: &SuperBlock) -> Result<()> {
    zero_region(device, superblock.inode_start, superblock.inode_blocks)
}

pub fn get_inode(
    device: &impl BlockDevice,
    superblock: &SuperBlock,
    inum: Inum,
) -> Result<DiskInode> {
    let (dbn, offset) = locate(superblock, inum)?;
    let mut buf = [0u8; BYTES_PER_BLOCK];
    device.read_block(dbn, &mut buf)?;
    Ok(DiskInode::decode(&buf[offset..offset + INODE_SIZE]))
}

pub fn write_inode(
    device: &impl BlockDevice,
    superblock: &SuperBlock,
    inum: Inum,
    inode: &DiskInode,
) -> Result<()> {
    let (dbn, offset) = locate(superblock, inum)?;
    let mut buf = [0u8; BYTES_PER_BLOCK];
    device.read_block(dbn, &mut buf)?;
    inode.encode(&mut buf[offset..offset + INODE_SIZE]);
    device.write_block(dbn, &buf)?;
    Ok(())
}

/// Maps file block `fbn` of `inode` to a disk block.
/// With `create`, missing blocks (and the indirect block) are allocated;
/// the caller writes the inode back.
pub fn bmap(
    device: &impl BlockDevice,
    superblock: &SuperBlock,
    inum: Inum,
    inode: &mut DiskInode,
    fbn: Fbn,
    create: bool,
) -> Result<Dbn> {
    if fbn >= MAX_FILE_BLOCKS {
        return Err(FsError::FileTooLarge(fbn));
    }

    // Direct blocks
    if fbn < NUM_DIRECT_PTRS as u64 {
        let slot = &mut inode.direct_ptrs[fbn as usize];
        if *slot == 0 {
            if !create {
                return Err(FsError::Unmapped { inum, fbn });
            }
            *slot = alloc_data_block(device, superblock)?;
        }
        return Ok(*slot);
    }

    // Indirect blocks
    let index = fbn as usize - NUM_DIRECT_PTRS;
    if inode.indirect_ptr == 0 {
        if !create {
            return Err(FsError::Unmapped { inum, fbn });
        }
        let indirect = alloc_data_block(device, superblock)?;
        // A fresh pointer block must read as all-unallocated.
        device.write_block(indirect, &[0u8; BYTES_PER_BLOCK])?;
        inode.indirect_ptr = indirect;
    }

    let mut buf = [0u8; BYTES_PER_BLOCK];
    device.read_block(inode.indirect_ptr, &mut buf)?;
    let mut ptrs = decode_ptrs(&buf);
    if ptrs[index] == 0 {
        if !create {
            return Err(FsError::Unmapped { inum, fbn });
        }
        ptrs[index] = alloc_data_block(device, superblock)?;
        encode_ptrs(&ptrs, &mut buf);
        device.write_block(inode.indirect_ptr, &buf)?;
    }
    Ok(ptrs[index])
}

/// Frees every block owned by `inode` and resets it to an empty file.
pub fn release_blocks(
    device: &impl BlockDevice,
    superblock: &SuperBlock,
    inode: &mut DiskInode,
) -> Result<()> {
    for ptr in inode.direct_ptrs.iter().filter(|&&p| p != 0) {
        free_data_block(device, superblock, *ptr)?;
    }
    if inode.indirect_ptr != 0 {
        let mut buf = [0u8; BYTES_PER_BLOCK];
        device.read_block(inode.indirect_ptr, &mut buf)?;
        for ptr in decode_ptrs(&buf).into_iter().filter(|&p| p != 0) {
            free_data_block(device, superblock, ptr)?;
        }
        free_data_block(device, superblock, inode.indirect_ptr)?;
    }
    *inode = DiskInode::default();
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::bitmap::{count_free_blocks, init_free_list};
    use crate::MemDisk;

    fn setup(num_blocks: u32) -> (MemDisk, SuperBlock) {
        let disk = MemDisk::new(num_blocks);
        let sb = SuperBlock::new(num_blocks, 16).unwrap();
        init_inodes(&disk, &sb).unwrap();
        init_free_list(&disk, &sb).unwrap();
        (disk, sb)
    }

    #[test]
    fn inode_table_round_trip() {
        let (disk, sb) = setup(32);
        let inode = DiskInode {
            size: 77,
            direct_ptrs: [10, 0, 0, 0, 0],
            indirect_ptr: 0,
        };
        write_inode(&disk, &sb, 5, &inode).unwrap();
        assert_eq!(get_inode(&disk, &sb, 5).unwrap(), inode);
        assert_eq!(get_inode(&disk, &sb, 4).unwrap(), DiskInode::default());
        assert!(matches!(
            get_inode(&disk, &sb, 16),
            Err(FsError::InvalidInode(16))
        ));
    }

    #[test]
    fn bmap_without_create_reports_unmapped() {
        let (disk, sb) = setup(32);
        let mut inode = DiskInode::default();
        assert!(matches!(
            bmap(&disk, &sb, 3, &mut inode, 0, false),
            Err(FsError::Unmapped { inum: 3, fbn: 0 })
        ));
        assert!(matches!(
            bmap(&disk, &sb, 3, &mut inode, 7, false),
            Err(FsError::Unmapped { inum: 3, fbn: 7 })
        ));
    }

    #[test]
    fn bmap_crosses_into_indirect_block() {
        let (disk, sb) = setup(32);
        let mut inode = DiskInode::default();
        let last_direct = bmap(&disk, &sb, 0, &mut inode, 4, true).unwrap();
        let first_indirect = bmap(&disk, &sb, 0, &mut inode, 5, true).unwrap();
        assert_ne!(inode.indirect_ptr, 0);
        assert_ne!(first_indirect, last_direct);
        assert_ne!(first_indirect, inode.indirect_ptr);
        // Stable on a second lookup.
        assert_eq!(bmap(&disk, &sb, 0, &mut inode, 5, false).unwrap(), first_indirect);
        assert!(matches!(
            bmap(&disk, &sb, 0, &mut inode, MAX_FILE_BLOCKS, true),
            Err(FsError::FileTooLarge(_))
        ));
    }

    #[test]
    fn release_returns_every_block() {
        let (disk, sb) = setup(32);
        let before = count_free_blocks(&disk, &sb).unwrap();
        let mut inode = DiskInode::default();
        for fbn in 0..8 {
            bmap(&disk, &sb, 0, &mut inode, fbn, true).unwrap();
        }
        // 8 data blocks plus the indirect block.
        assert_eq!(count_free_blocks(&disk, &sb).unwrap(), before - 9);
        release_blocks(&disk, &sb, &mut inode).unwrap();
        assert_eq!(inode, DiskInode::default());
        assert_eq!(count_free_blocks(&disk, &sb).unwrap(), before);
    }
}
