//! Flat directory: slot `i` holds the name of inode `i`, an all-zero slot is
//! free.

use crate::config::*;
use crate::error::{FsError, Result};
use crate::superblock::zero_region;
use crate::{BlockDevice, DirEntry, Inum, SuperBlock};

pub fn trim_zero(name: &[u8]) -> &[u8] {
    let mut end = name.len();
    while end > 0 && name[end - 1] == 0 {
        end -= 1;
    }
    &name[..end]
}

impl DirEntry {
    pub fn is_empty(&self) -> bool {
        self.name.iter().all(|&c| c == 0)
    }

    pub fn name_eq(&self, name: &str) -> bool {
        trim_zero(&self.name) == name.as_bytes()
    }

    pub fn name(&self) -> String {
        String::from_utf8_lossy(trim_zero(&self.name)).into_owned()
    }
}

fn locate(superblock: &SuperBlock, inum: Inum) -> (u32, usize) {
    let dbn = superblock.dir_start + inum / ENTRIES_PER_BLOCK as u32;
    let offset = (inum as usize % ENTRIES_PER_BLOCK) * DIR_ENTRY_SIZE;
    (dbn, offset)
}

/// Visits every slot in inode order until `f` returns `Some`.
fn scan<T>(
    device: &impl BlockDevice,
    superblock: &SuperBlock,
    mut f: impl FnMut(Inum, &DirEntry) -> Option<T>,
) -> Result<Option<T>> {
    let mut buf = [0u8; BYTES_PER_BLOCK];
    for i in 0..superblock.dir_blocks {
        device.read_block(superblock.dir_start + i, &mut buf)?;
        for j in 0..ENTRIES_PER_BLOCK {
            let inum = i * ENTRIES_PER_BLOCK as u32 + j as u32;
            if inum >= superblock.num_inodes {
                return Ok(None);
            }
            let offset = j * DIR_ENTRY_SIZE;
            let entry = DirEntry::decode(&buf[offset..offset + DIR_ENTRY_SIZE]);
            if let Some(found) = f(inum, &entry) {
                return Ok(Some(found));
            }
        }
    }
    Ok(None)
}

pub fn init_dir(device: &impl BlockDevice, superblock: &SuperBlock) -> Result<()> {
    zero_region(device, superblock.dir_start, superblock.dir_blocks)
}

pub fn write_entry(
    device: &impl BlockDevice,
    superblock: &SuperBlock,
    inum: Inum,
    entry: &DirEntry,
) -> Result<()> {
    if inum >= superblock.num_inodes {
        return Err(FsError::InvalidInode(inum));
    }
    let (dbn, offset) = locate(superblock, inum);
    let mut buf = [0u8; BYTES_PER_BLOCK];
    device.read_block(dbn, &mut buf)?;
    entry.encode(&mut buf[offset..offset + DIR_ENTRY_SIZE]);
    device.write_block(dbn, &buf)?;
    Ok(())
}

/// Returns the inode number filed under `name`.
pub fn dir_lookup(device: &impl BlockDevice, superblock: &SuperBlock, name: &str) -> Result<Inum> {
    let found = scan(device, superblock, |inum, entry| {
        (!entry.is_empty() && entry.name_eq(name)).then_some(inum)
    })?;
    found.ok_or_else(|| FsError::NotFound(name.to_string()))
}

/// Files `name` under the first free slot and returns its inode number.
/// The caller has already checked that `name` is not present.
pub fn dir_add_entry(
    device: &impl BlockDevice,
    superblock: &SuperBlock,
    name: &str,
) -> Result<Inum> {
    let entry = DirEntry::new(name)?;
    let free = scan(device, superblock, |inum, slot| slot.is_empty().then_some(inum))?;
    let inum = free.ok_or_else(|| FsError::NamespaceFull(name.to_string()))?;
    write_entry(device, superblock, inum, &entry)?;
    Ok(inum)
}

/// Clears the slot of `name` and returns the inode number it held.
pub fn dir_rm_entry(device: &impl BlockDevice, superblock: &SuperBlock, name: &str) -> Result<Inum> {
    let inum = dir_lookup(device, superblock, name)?;
    write_entry(device, superblock, inum, &DirEntry::NULL)?;
    Ok(inum)
}

pub fn read_dir(device: &impl BlockDevice, superblock: &SuperBlock) -> Result<Vec<(Inum, String)>> {
    let mut entries = vec![];
    scan(device, superblock, |inum, entry| {
        if !entry.is_empty() {
            entries.push((inum, entry.name()));
        }
        None::<()>
    })?;
    Ok(entries)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::MemDisk;

    fn setup(num_inodes: u32) -> (MemDisk, SuperBlock) {
        let disk = MemDisk::new(64);
        let sb = SuperBlock::new(64, num_inodes).unwrap();
        init_dir(&disk, &sb).unwrap();
        (disk, sb)
    }

    #[test]
    fn test_trim_zero() {
        assert_eq!(trim_zero(b"test\0\0"), b"test");
        assert_eq!(trim_zero(b"\0\0"), b"");
        assert_eq!(trim_zero(b"te\0st"), b"te\0st");
    }

    #[test]
    fn add_lookup_remove() {
        let (disk, sb) = setup(8);
        assert_eq!(dir_add_entry(&disk, &sb, "a").unwrap(), 0);
        assert_eq!(dir_add_entry(&disk, &sb, "b").unwrap(), 1);
        assert_eq!(dir_lookup(&disk, &sb, "b").unwrap(), 1);
        assert!(matches!(dir_lookup(&disk, &sb, "c"), Err(FsError::NotFound(_))));

        assert_eq!(dir_rm_entry(&disk, &sb, "a").unwrap(), 0);
        assert!(dir_lookup(&disk, &sb, "a").is_err());
        // The freed slot is reused first.
        assert_eq!(dir_add_entry(&disk, &sb, "c").unwrap(), 0);
        let names: Vec<_> = read_dir(&disk, &sb).unwrap();
        assert_eq!(names, vec![(0, "c".to_string()), (1, "b".to_string())]);
    }

    #[test]
    fn prefix_names_do_not_match() {
        let (disk, sb) = setup(8);
        dir_add_entry(&disk, &sb, "file").unwrap();
        assert!(dir_lookup(&disk, &sb, "fil").is_err());
        assert!(dir_lookup(&disk, &sb, "file1").is_err());
    }

    #[test]
    fn full_directory() {
        let (disk, sb) = setup(20);
        for i in 0..20 {
            dir_add_entry(&disk, &sb, &format!("f{i}")).unwrap();
        }
        assert_eq!(dir_lookup(&disk, &sb, "f19").unwrap(), 19);
        assert!(matches!(
            dir_add_entry(&disk, &sb, "extra"),
            Err(FsError::NamespaceFull(_))
        ));
    }
}
