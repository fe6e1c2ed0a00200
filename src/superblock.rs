use crate::config::*;
use crate::{BlockDevice, Error, Result, SuperBlock};

pub fn read_superblock<D: BlockDevice + ?Sized>(device: &D) -> Result<SuperBlock> {
    let mut buf = [0u8; BYTES_PER_BLOCK];
    device.read_block(SUPERBLOCK_DBN, &mut buf)?;
    let superblock = SuperBlock::decode(&buf);

    // Only the magic number and the block count are checked.
    if superblock.magic != MAGIC {
        return Err(Error::InvalidSuperBlock);
    }
    if superblock.num_blocks != device.num_blocks() {
        return Err(Error::InvalidSuperBlock);
    }

    Ok(superblock)
}

pub fn write_superblock<D: BlockDevice + ?Sized>(device: &D, superblock: &SuperBlock) -> Result<()> {
    let mut buf = [0u8; BYTES_PER_BLOCK];
    superblock.encode(&mut buf);
    device.write_block(SUPERBLOCK_DBN, &buf)?;
    Ok(())
}

/// Zeroes `count` blocks starting at `start`.
pub(crate) fn zero_region<D: BlockDevice + ?Sized>(device: &D, start: u32, count: u32) -> Result<()> {
    let zero = [0u8; BYTES_PER_BLOCK];
    for dbn in start..start + count {
        device.write_block(dbn, &zero)?;
    }
    Ok(())
}
