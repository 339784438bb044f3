use service_proto::WireError;

/// Failures the server reports back to the client.
///
/// Anything indicating corruption or a programming bug (cache exhausted
/// with all buffers pinned, double block free, a free inode reached through
/// a directory, inode table overflow) panics instead of taking a variant
/// here — the server never crashes on bad client input, only on a broken
/// image or a broken server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FsError {
    #[error("bad file descriptor")]
    BadFileDescriptor,
    #[error("file descriptor not readable")]
    NotReadable,
    #[error("file descriptor not writable")]
    NotWritable,
    #[error("path too long")]
    PathTooLong,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("file system entry not found")]
    EntryNotFound,
    #[error("not a directory")]
    NotADirectory,
    #[error("directory not empty")]
    DirectoryNotEmpty,
    #[error("entry already exists")]
    AlreadyExists,
    #[error("refusing to unlink dot entry")]
    UnlinkDots,
    #[error("link across devices")]
    CrossesDevices,
    #[error("link target is a directory")]
    LinkToDirectory,
    #[error("file too large")]
    FileTooLarge,
    #[error("offset out of range")]
    InvalidOffset,
    #[error("no device with major {0}")]
    DeviceNotFound(i16),
    #[error("out of data blocks")]
    OutOfBlocks,
    #[error("out of inodes")]
    OutOfInodes,
    #[error("too many open files for client")]
    TooManyOpenFiles,
    #[error("system file table full")]
    FileTableFull,
}

impl FsError {
    /// Encodes this error as the wire reply word.
    ///
    /// Argument errors surface as `-EINVAL`, failed path resolution as
    /// `-ENOENT`, everything else as the generic `-1`.
    #[must_use]
    pub fn to_ret(self) -> i64 {
        match self {
            Self::BadFileDescriptor | Self::InvalidArgument | Self::PathTooLong => {
                WireError::InvalidArgument.to_ret()
            }
            Self::EntryNotFound => WireError::NotFound.to_ret(),
            _ => WireError::Failed.to_ret(),
        }
    }
}
