//! Open file table: binds descriptors to `{inode, cursor}` entries.

use std::fmt;

use crate::config::FIRST_FD;
use crate::error::FsError;
use crate::{Inum, Result};

/// Descriptor handed out for an open file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fd(usize);

impl Fd {
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    pub const fn as_raw(self) -> usize {
        self.0
    }

    fn slot(self) -> Option<usize> {
        self.0.checked_sub(FIRST_FD)
    }
}

impl fmt::Display for Fd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenFile {
    pub inum: Inum,
    pub cursor: u64,
}

#[derive(Debug)]
pub struct OpenFileTable {
    slots: Vec<Option<OpenFile>>,
}

impl OpenFileTable {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of bound descriptors.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Binds a fresh descriptor to `inum` with its cursor at 0.
    pub fn bind(&mut self, inum: Inum) -> Result<Fd> {
        let slot = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(FsError::TableFull(self.slots.len()))?;
        self.slots[slot] = Some(OpenFile { inum, cursor: 0 });
        Ok(Fd(slot + FIRST_FD))
    }

    pub fn entry(&self, fd: Fd) -> Result<&OpenFile> {
        fd.slot()
            .and_then(|slot| self.slots.get(slot))
            .and_then(Option::as_ref)
            .ok_or(FsError::BadDescriptor(fd.as_raw()))
    }

    pub fn entry_mut(&mut self, fd: Fd) -> Result<&mut OpenFile> {
        fd.slot()
            .and_then(|slot| self.slots.get_mut(slot))
            .and_then(Option::as_mut)
            .ok_or(FsError::BadDescriptor(fd.as_raw()))
    }

    pub fn resolve(&self, fd: Fd) -> Result<Inum> {
        Ok(self.entry(fd)?.inum)
    }

    /// Unbinds `fd` and returns the entry it held.
    pub fn release(&mut self, fd: Fd) -> Result<OpenFile> {
        fd.slot()
            .and_then(|slot| self.slots.get_mut(slot))
            .and_then(Option::take)
            .ok_or(FsError::BadDescriptor(fd.as_raw()))
    }

    /// Whether any descriptor references `inum`.
    pub fn is_open(&self, inum: Inum) -> bool {
        self.slots.iter().flatten().any(|e| e.inum == inum)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bind_resolve_release() {
        let mut oft = OpenFileTable::with_capacity(4);
        let a = oft.bind(7).unwrap();
        let b = oft.bind(7).unwrap();
        assert_eq!(a.as_raw(), FIRST_FD);
        assert_ne!(a, b);
        assert_eq!(oft.resolve(b).unwrap(), 7);
        assert_eq!(oft.len(), 2);

        oft.entry_mut(a).unwrap().cursor = 40;
        assert_eq!(oft.entry(b).unwrap().cursor, 0);

        assert_eq!(oft.release(a).unwrap(), OpenFile { inum: 7, cursor: 40 });
        assert!(oft.is_open(7));
        oft.release(b).unwrap();
        assert!(!oft.is_open(7));
        assert!(oft.is_empty());
    }

    #[test]
    fn released_slot_is_reused() {
        let mut oft = OpenFileTable::with_capacity(4);
        let a = oft.bind(1).unwrap();
        oft.bind(2).unwrap();
        oft.release(a).unwrap();
        assert_eq!(oft.bind(3).unwrap(), a);
        assert_eq!(oft.resolve(a).unwrap(), 3);
    }

    #[test]
    fn table_full() {
        let mut oft = OpenFileTable::with_capacity(2);
        oft.bind(0).unwrap();
        oft.bind(1).unwrap();
        assert!(matches!(oft.bind(2), Err(FsError::TableFull(2))));
    }

    #[test]
    fn unbound_descriptors_are_rejected() {
        let mut oft = OpenFileTable::with_capacity(2);
        let fd = oft.bind(0).unwrap();
        oft.release(fd).unwrap();
        assert!(matches!(oft.resolve(fd), Err(FsError::BadDescriptor(_))));
        assert!(matches!(oft.release(fd), Err(FsError::BadDescriptor(_))));
        assert!(oft.resolve(Fd::from_raw(0)).is_err());
        assert!(oft.resolve(Fd::from_raw(1000)).is_err());
    }
}
