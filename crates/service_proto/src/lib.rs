//! Wire protocol shared by the application, the filesystem server and the
//! ramdisk.
//!
//! A request is a label plus up to four machine-word arguments; bulk data
//! (path strings, file contents, `stat` records) travels in the shared
//! payload page. A reply is a single signed machine word: non-negative on
//! success, a negated errno value on failure.

use bitflags::bitflags;
use dataview::Pod;
use strum::FromRepr;

/// Validates the init data handed to each process at spawn.
pub const INIT_MAGIC: u64 = 0xdead_beef;

/// Request labels on the application ↔ filesystem server edge.
///
/// `Ret` is never sent as a request; it tags replies (and doubles as the
/// empty-slot marker in the polled transport).
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
#[repr(u32)]
pub enum FsCall {
    Ret = 0,
    Open = 1,
    Close = 2,
    Read = 3,
    Write = 4,
    Pread = 5,
    Pwrite = 6,
    Lseek = 7,
    Fstat = 8,
    Lstat = 9,
    Unlink = 10,
    Getcwd = 11,
    Chdir = 12,
    Mkdir = 13,
    Mknod = 14,
    Link = 15,
    Dup = 16,
}

/// Request labels on the filesystem server ↔ ramdisk edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
#[repr(u32)]
pub enum DiskCall {
    Ret = 0,
    Init = 1,
    Read = 2,
    Write = 3,
}

bitflags! {
    /// `open` mode flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[repr(transparent)]
    pub struct OpenFlags: u32 {
        const READ_ONLY = 0x000;
        const WRITE_ONLY = 0x001;
        const READ_WRITE = 0x002;
        const CREATE = 0x200;
        const TRUNC = 0x400;
    }
}

/// `lseek` origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
#[repr(u32)]
pub enum Whence {
    Set = 0,
    Cur = 1,
    End = 2,
}

/// File metadata as reported to clients.
///
/// `mode` is the file type shifted left by 14 — a quirk inherited from the
/// on-disk format's ancestry, not a POSIX mode. Fields the filesystem does
/// not track (permissions, timestamps) are simply absent; unknown values
/// are zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod)]
#[repr(C)]
pub struct Stat {
    /// File system's disk device.
    pub dev: u32,
    /// Inode number.
    pub ino: u32,
    /// File type shifted left by 14.
    pub mode: u16,
    /// Number of links to file.
    pub nlink: i16,
    pub padding: [u8; 4],
    /// Size of file in bytes.
    pub size: u64,
}

const _: () = assert!(core::mem::size_of::<Stat>() == 24);

/// Errors a reply can carry, as errno values.
///
/// The reply word is `-(errno)`; anything the taxonomy does not name
/// explicitly travels as the generic failure `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr, thiserror::Error)]
#[repr(i64)]
pub enum WireError {
    /// Catch-all failure: resource exhaustion, type errors.
    #[error("operation failed")]
    Failed = 1,
    // ENOENT
    #[error("no such file or directory")]
    NotFound = 2,
    // EINVAL
    #[error("invalid argument")]
    InvalidArgument = 22,
}

impl WireError {
    /// Encodes this error as a reply word.
    #[must_use]
    pub fn to_ret(self) -> i64 {
        -(self as i64)
    }

    /// Decodes a reply word; `Ok` carries the non-negative return value.
    pub fn decode(ret: i64) -> Result<i64, Self> {
        if ret >= 0 {
            return Ok(ret);
        }
        Err(Self::from_repr(-ret).unwrap_or(Self::Failed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_match_wire_numbering() {
        assert_eq!(FsCall::Open as u32, 1);
        assert_eq!(FsCall::Dup as u32, 16);
        assert_eq!(FsCall::from_repr(11), Some(FsCall::Getcwd));
        assert_eq!(FsCall::from_repr(17), None);
    }

    #[test]
    fn wire_error_roundtrip() {
        assert_eq!(WireError::decode(3), Ok(3));
        assert_eq!(WireError::decode(-2), Err(WireError::NotFound));
        assert_eq!(WireError::decode(-22), Err(WireError::InvalidArgument));
        assert_eq!(WireError::decode(-1), Err(WireError::Failed));
        // Unknown negative values degrade to the generic failure.
        assert_eq!(WireError::decode(-99), Err(WireError::Failed));
        assert_eq!(WireError::InvalidArgument.to_ret(), -22);
    }

    #[test]
    fn open_flags_accessors() {
        let flags = OpenFlags::CREATE | OpenFlags::READ_WRITE;
        assert!(flags.contains(OpenFlags::CREATE));
        assert!(!flags.contains(OpenFlags::TRUNC));
        assert_eq!(flags.bits(), 0x202);
    }
}
