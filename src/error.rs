//! Error type shared by every layer of the crate.
//!
//! Errors fall in two classes. Recoverable ones report a condition the caller
//! is expected to handle (a name that does not exist, a full namespace) and
//! leave all state intact. Fatal ones report a violated precondition or a
//! broken backing store; the caller should propagate them or abort.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::{Dbn, Fbn, Inum};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Recoverable,
    Fatal,
}

#[derive(Debug, Error)]
pub enum FsError {
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("no free inode left for {0}")]
    NamespaceFull(String),

    #[error("invalid file name {0:?}")]
    InvalidFileName(String),

    #[error("file {0} is still open")]
    Busy(String),

    #[error("bad file descriptor {0}")]
    BadDescriptor(usize),

    #[error("open file table is full ({0} entries)")]
    TableFull(usize),

    #[error("invalid cursor offset {0}")]
    BadCursor(i64),

    #[error("invalid whence {0}")]
    BadWhence(i32),

    #[error("backing store {} does not exist", .0.display())]
    NoDisk(PathBuf),

    #[error("cannot create backing store {}: {source}", .path.display())]
    DiskCreate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("format step `{step}` failed: {source}")]
    Init {
        step: &'static str,
        #[source]
        source: Box<FsError>,
    },

    #[error("cannot extend inode {inum} to file block {fbn}: {source}")]
    Extend {
        inum: Inum,
        fbn: Fbn,
        #[source]
        source: Box<FsError>,
    },

    #[error("no free data blocks")]
    OutOfSpace,

    #[error("file block {fbn} of inode {inum} is not allocated")]
    Unmapped { inum: Inum, fbn: Fbn },

    #[error("file block {0} is beyond the maximum file size")]
    FileTooLarge(Fbn),

    #[error("block {0} is out of range")]
    InvalidBlockId(Dbn),

    #[error("inode {0} is out of range")]
    InvalidInode(Inum),

    #[error("invalid superblock")]
    InvalidSuperBlock,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl FsError {
    pub(crate) fn init(step: &'static str) -> impl FnOnce(FsError) -> FsError {
        move |source| FsError::Init {
            step,
            source: Box::new(source),
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            FsError::NotFound(_)
            | FsError::NamespaceFull(_)
            | FsError::InvalidFileName(_)
            | FsError::Busy(_) => Severity::Recoverable,
            FsError::BadDescriptor(_)
            | FsError::TableFull(_)
            | FsError::BadCursor(_)
            | FsError::BadWhence(_)
            | FsError::NoDisk(_)
            | FsError::DiskCreate { .. }
            | FsError::Init { .. }
            | FsError::Extend { .. }
            | FsError::OutOfSpace
            | FsError::Unmapped { .. }
            | FsError::FileTooLarge(_)
            | FsError::InvalidBlockId(_)
            | FsError::InvalidInode(_)
            | FsError::InvalidSuperBlock
            | FsError::Io(_) => Severity::Fatal,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

pub type Result<T> = core::result::Result<T, FsError>;
