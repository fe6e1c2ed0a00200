//! Cursor arithmetic for `seek`.

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::error::FsError;
use crate::Result;

pub const SEEK_SET: i32 = 0;
pub const SEEK_CUR: i32 = 1;
pub const SEEK_END: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(i32)]
pub enum Whence {
    Set = 0,
    Cur = 1,
    End = 2,
}

/// Computes the cursor a seek lands on.
///
/// A negative `offset` is rejected whatever `whence` is, even when the
/// resulting position would be valid. `size` is only consulted for
/// `SEEK_END`.
pub fn new_cursor(
    cursor: u64,
    offset: i64,
    whence: i32,
    size: impl FnOnce() -> Result<u64>,
) -> Result<u64> {
    if offset < 0 {
        return Err(FsError::BadCursor(offset));
    }
    let whence = Whence::try_from(whence).map_err(|e| FsError::BadWhence(e.number))?;
    let base = match whence {
        Whence::Set => 0,
        Whence::Cur => cursor,
        Whence::End => size()?,
    };
    base.checked_add(offset as u64)
        .ok_or(FsError::BadCursor(offset))
}

#[cfg(test)]
mod test {
    use super::*;

    fn no_size() -> Result<u64> {
        panic!("size consulted outside SEEK_END")
    }

    #[test]
    fn each_whence() {
        assert_eq!(new_cursor(10, 5, SEEK_SET, no_size).unwrap(), 5);
        assert_eq!(new_cursor(10, 5, SEEK_CUR, no_size).unwrap(), 15);
        assert_eq!(new_cursor(10, 5, SEEK_END, || Ok(100)).unwrap(), 105);
        assert_eq!(new_cursor(10, 0, SEEK_END, || Ok(100)).unwrap(), 100);
    }

    #[test]
    fn negative_offset_rejected_for_every_whence() {
        for whence in [SEEK_SET, SEEK_CUR, SEEK_END] {
            assert!(matches!(
                new_cursor(500, -1, whence, || Ok(1000)),
                Err(FsError::BadCursor(-1))
            ));
        }
    }

    #[test]
    fn unknown_whence() {
        assert!(matches!(
            new_cursor(0, 0, 3, no_size),
            Err(FsError::BadWhence(3))
        ));
        assert!(matches!(
            new_cursor(0, 0, -1, no_size),
            Err(FsError::BadWhence(-1))
        ));
    }

    #[test]
    fn overflow_is_rejected() {
        assert!(matches!(
            new_cursor(u64::MAX, 1, SEEK_CUR, no_size),
            Err(FsError::BadCursor(1))
        ));
    }

    #[test]
    fn whence_conversions() {
        assert_eq!(Whence::try_from(2).unwrap(), Whence::End);
        assert_eq!(i32::from(Whence::Cur), SEEK_CUR);
    }
}
