//! Byte-range engine: turns `(cursor, length)` into per-block spans and moves
//! bytes between caller buffers and whole device blocks.

use log::trace;

use crate::config::{BYTES_PER_BLOCK, FillPolicy};
use crate::error::FsError;
use crate::volume::InodeAddressing;
use crate::{BlockDevice, Fbn, Inum, Result};

const B: u64 = BYTES_PER_BLOCK as u64;

/// The share of a byte range that falls in one file block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpan {
    pub fbn: Fbn,
    /// Start of the span inside the block.
    pub start: usize,
    /// End (exclusive) of the span inside the block.
    pub end: usize,
    /// Where the span starts in the caller's buffer.
    pub buf_offset: usize,
}

impl BlockSpan {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Splits `[cursor, cursor + len)` into one span per file block it touches.
/// An empty range touches no block. The range must not overflow `u64`.
pub fn spans(cursor: u64, len: usize) -> impl Iterator<Item = BlockSpan> {
    let end = cursor + len as u64;
    let first = cursor / B;
    let count = if len == 0 { 0 } else { (end - 1) / B - first + 1 };
    (first..first + count).map(move |fbn| {
        let base = fbn * B;
        let lo = cursor.max(base);
        let hi = end.min(base + B);
        BlockSpan {
            fbn,
            start: (lo - base) as usize,
            end: (hi - base) as usize,
            buf_offset: (lo - cursor) as usize,
        }
    })
}

/// Reads up to `buf.len()` bytes of `inum` starting at `cursor`, stopping at
/// end-of-file. Returns the number of bytes copied.
pub fn read_at(
    device: &impl BlockDevice,
    addr: &impl InodeAddressing,
    inum: Inum,
    cursor: u64,
    buf: &mut [u8],
) -> Result<usize> {
    let size = addr.size_of(inum)?;
    let len = if cursor >= size {
        0
    } else {
        (size - cursor).min(buf.len() as u64) as usize
    };

    let mut block = [0u8; BYTES_PER_BLOCK];
    for span in spans(cursor, len) {
        trace!("read inode {inum} {span:?}");
        let dbn = addr.fbn_to_dbn(inum, span.fbn)?;
        device.read_block(dbn, &mut block)?;
        buf[span.buf_offset..span.buf_offset + span.len()]
            .copy_from_slice(&block[span.start..span.end]);
    }

    Ok(len)
}

/// Read-modify-writes every block of `[offset, offset + len)`, letting `fill`
/// produce the new bytes of each span.
fn overwrite(
    device: &impl BlockDevice,
    addr: &impl InodeAddressing,
    inum: Inum,
    offset: u64,
    len: usize,
    mut fill: impl FnMut(&BlockSpan, &mut [u8]),
) -> Result<()> {
    let mut block = [0u8; BYTES_PER_BLOCK];
    for span in spans(offset, len) {
        trace!("write inode {inum} {span:?}");
        let dbn = addr.fbn_to_dbn(inum, span.fbn)?;
        device.read_block(dbn, &mut block)?;
        fill(&span, &mut block[span.start..span.end]);
        device.write_block(dbn, &block)?;
    }
    Ok(())
}

/// Writes all of `data` to `inum` at `cursor`, growing the file first when
/// the write ends past its current size.
pub fn write_at(
    device: &impl BlockDevice,
    addr: &mut impl InodeAddressing,
    inum: Inum,
    cursor: u64,
    data: &[u8],
    policy: FillPolicy,
) -> Result<()> {
    if data.is_empty() {
        return Ok(());
    }

    let end = cursor
        .checked_add(data.len() as u64)
        .ok_or(FsError::FileTooLarge(cursor / B))?;
    let size = addr.size_of(inum)?;
    if end > size {
        let last = (end - 1) / B;
        addr.extend(inum, last).map_err(|source| FsError::Extend {
            inum,
            fbn: last,
            source: Box::new(source),
        })?;
        addr.set_size(inum, end)?;

        if policy == FillPolicy::Zero && cursor > size {
            overwrite(device, &*addr, inum, size, (cursor - size) as usize, |_, dst| {
                dst.fill(0)
            })?;
        }
    }

    overwrite(device, &*addr, inum, cursor, data.len(), |span, dst| {
        dst.copy_from_slice(&data[span.buf_offset..span.buf_offset + span.len()])
    })
}
