//! Free list of data blocks, kept as a bitmap with one bit per disk block.
//! A set bit marks a block in use. Metadata blocks are marked at format time,
//! so allocation only ever hands out blocks from the data region.

use log::debug;

use crate::config::*;
use crate::error::FsError;
use crate::superblock::zero_region;
use crate::{BlockDevice, Dbn, Result, SuperBlock};

/// Sets the first clear bit in `[from, to)` and returns its index.
fn set_first_clear_bit(
    device: &impl BlockDevice,
    superblock: &SuperBlock,
    from: u32,
    to: u32,
) -> Result<u32> {
    let mut buf = [0u8; BYTES_PER_BLOCK];
    let bits = BITS_PER_BLOCK as u32;

    for i in from / bits..superblock.bitmap_blocks {
        let current_block_id = superblock.bitmap_start + i;
        device.read_block(current_block_id, &mut buf)?;

        let first = if i == from / bits { from % bits } else { 0 };
        for bit in first..bits {
            let item = i * bits + bit;
            if item >= to {
                return Err(FsError::OutOfSpace);
            }
            let (byte, mask) = ((bit / 8) as usize, 1u8 << (bit % 8));
            if buf[byte] & mask == 0 {
                buf[byte] |= mask;
                device.write_block(current_block_id, &buf)?;
                return Ok(item);
            }
        }
    }

    Err(FsError::OutOfSpace)
}

/// Sets bit `item` to `value` and returns its previous value.
fn set_bit_at(
    device: &impl BlockDevice,
    superblock: &SuperBlock,
    item: u32,
    value: bool,
) -> Result<bool> {
    if item >= superblock.num_blocks {
        return Err(FsError::InvalidBlockId(item));
    }

    let bits = BITS_PER_BLOCK as u32;
    let target_block_id = superblock.bitmap_start + item / bits;
    let bit = item % bits;
    let (byte, mask) = ((bit / 8) as usize, 1u8 << (bit % 8));

    let mut buf = [0u8; BYTES_PER_BLOCK];
    device.read_block(target_block_id, &mut buf)?;
    let previous = buf[byte] & mask != 0;
    if value {
        buf[byte] |= mask;
    } else {
        buf[byte] &= !mask;
    }
    device.write_block(target_block_id, &buf)?;

    Ok(previous)
}

/// Clears the bitmap, then marks every metadata block as used.
pub fn init_free_list(device: &impl BlockDevice, superblock: &SuperBlock) -> Result<()> {
    zero_region(device, superblock.bitmap_start, superblock.bitmap_blocks)?;
    for dbn in 0..superblock.data_start {
        set_bit_at(device, superblock, dbn, true)?;
    }
    Ok(())
}

/// Takes the first free data block off the free list.
/// The block keeps whatever content it had.
pub fn alloc_data_block(device: &impl BlockDevice, superblock: &SuperBlock) -> Result<Dbn> {
    let dbn = set_first_clear_bit(
        device,
        superblock,
        superblock.data_start,
        superblock.num_blocks,
    )?;
    debug!("allocated block {dbn}");
    Ok(dbn)
}

/// Returns a data block to the free list.
pub fn free_data_block(device: &impl BlockDevice, superblock: &SuperBlock, dbn: Dbn) -> Result<()> {
    if dbn < superblock.data_start || dbn >= superblock.num_blocks {
        return Err(FsError::InvalidBlockId(dbn));
    }
    set_bit_at(device, superblock, dbn, false)?;
    debug!("freed block {dbn}");
    Ok(())
}

/// Counts the free data blocks.
pub fn count_free_blocks(device: &impl BlockDevice, superblock: &SuperBlock) -> Result<u32> {
    let mut buf = [0u8; BYTES_PER_BLOCK];
    let mut used = 0;
    for i in 0..superblock.bitmap_blocks {
        device.read_block(superblock.bitmap_start + i, &mut buf)?;
        used += buf.iter().map(|b| b.count_ones()).sum::<u32>();
    }
    Ok(superblock.num_blocks - used)
}
