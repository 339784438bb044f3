//! Open-file objects and the system-wide file table.

use log::warn;
use service_proto::{Stat, Whence};
use xv6fs_params::{MAX_OP_BLOCKS, NFILE};
use xv6fs_types::FS_BLOCK_SIZE;

use crate::{Disk, FsError, Xv6Fs, inode::InodeRef};

/// A counted reference to a file-table slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileRef(pub(crate) usize);

/// What an open file refers to.
#[derive(Debug, Clone, Copy)]
pub(crate) enum OpenFile {
    None,
    Inode {
        ip: InodeRef,
        off: usize,
        readable: bool,
        writable: bool,
    },
    Device {
        ip: InodeRef,
        major: i16,
        readable: bool,
        writable: bool,
    },
}

struct FileSlot {
    refcount: u32,
    open: OpenFile,
}

pub(crate) struct FileTable {
    slots: Vec<FileSlot>,
}

impl FileTable {
    pub(crate) fn new() -> Self {
        Self {
            slots: (0..NFILE)
                .map(|_| FileSlot {
                    refcount: 0,
                    open: OpenFile::None,
                })
                .collect(),
        }
    }

    pub(crate) fn live(&self) -> usize {
        self.slots.iter().filter(|s| s.refcount > 0).count()
    }
}

impl<D: Disk> Xv6Fs<D> {
    /// Claims a free file-table slot with one reference.
    pub(crate) fn file_alloc(&mut self) -> Result<FileRef, FsError> {
        for (i, slot) in self.ftable.slots.iter_mut().enumerate() {
            if slot.refcount == 0 {
                slot.refcount = 1;
                slot.open = OpenFile::None;
                return Ok(FileRef(i));
            }
        }
        warn!("filealloc: file table full");
        Err(FsError::FileTableFull)
    }

    pub(crate) fn file_set(&mut self, f: FileRef, open: OpenFile) {
        self.ftable.slots[f.0].open = open;
    }

    /// Increments the reference count of `f`.
    pub(crate) fn file_dup(&mut self, f: FileRef) -> FileRef {
        let slot = &mut self.ftable.slots[f.0];
        assert!(slot.refcount > 0, "filedup of closed file");
        slot.refcount += 1;
        f
    }

    /// Drops one reference to `f`, releasing the slot (and the inode
    /// reference it holds) when the last reference goes away.
    pub(crate) fn file_close(&mut self, f: FileRef) {
        let slot = &mut self.ftable.slots[f.0];
        assert!(slot.refcount > 0, "fileclose of closed file");
        slot.refcount -= 1;
        if slot.refcount > 0 {
            return;
        }

        let open = std::mem::replace(&mut slot.open, OpenFile::None);
        match open {
            OpenFile::Inode { ip, .. } | OpenFile::Device { ip, .. } => self.inode_put(ip),
            OpenFile::None => {}
        }
    }

    /// Reads from `f` into `dst`, advancing the file offset.
    pub(crate) fn file_read(&mut self, f: FileRef, dst: &mut [u8]) -> Result<usize, FsError> {
        match self.ftable.slots[f.0].open {
            OpenFile::Inode { ip, off, readable, .. } => {
                if !readable {
                    return Err(FsError::NotReadable);
                }
                self.inode_load(ip);
                let n = self.read_inode(ip, dst, off);
                if let OpenFile::Inode { off, .. } = &mut self.ftable.slots[f.0].open {
                    *off += n;
                }
                Ok(n)
            }
            OpenFile::Device { major, readable, .. } => {
                if !readable {
                    return Err(FsError::NotReadable);
                }
                self.devices.get_mut(major)?.read(dst)
            }
            OpenFile::None => Err(FsError::BadFileDescriptor),
        }
    }

    /// Writes `src` to `f`, advancing the file offset.
    ///
    /// Inode writes go out in pieces bounded by the largest batch a
    /// journaled variant could commit at once.
    pub(crate) fn file_write(&mut self, f: FileRef, src: &[u8]) -> Result<usize, FsError> {
        match self.ftable.slots[f.0].open {
            OpenFile::Inode { ip, off, writable, .. } => {
                if !writable {
                    return Err(FsError::NotWritable);
                }
                self.inode_load(ip);

                let max = MAX_OP_BLOCKS * FS_BLOCK_SIZE;
                let mut done = 0;
                let mut failure = None;
                while done < src.len() {
                    let n1 = usize::min(src.len() - done, max);
                    match self.write_inode(ip, &src[done..done + n1], off + done) {
                        Ok(written) => {
                            done += written;
                            if written != n1 {
                                failure = Some(FsError::OutOfBlocks);
                                break;
                            }
                        }
                        Err(e) => {
                            failure = Some(e);
                            break;
                        }
                    }
                }

                // The offset keeps whatever made it to disk, error or not.
                if let OpenFile::Inode { off, .. } = &mut self.ftable.slots[f.0].open {
                    *off += done;
                }
                match failure {
                    None => Ok(done),
                    Some(e) => Err(e),
                }
            }
            OpenFile::Device { major, writable, .. } => {
                if !writable {
                    return Err(FsError::NotWritable);
                }
                self.devices.get_mut(major)?.write(src)
            }
            OpenFile::None => Err(FsError::BadFileDescriptor),
        }
    }

    /// Repositions the file offset.
    ///
    /// A resulting negative offset is an error; devices are not seekable.
    pub(crate) fn file_seek(&mut self, f: FileRef, off: i64, whence: Whence) -> Result<i64, FsError> {
        let OpenFile::Inode { ip, off: cur, .. } = self.ftable.slots[f.0].open else {
            return Err(FsError::InvalidOffset);
        };

        let base = match whence {
            Whence::Set => 0,
            Whence::Cur => i64::try_from(cur).map_err(|_| FsError::InvalidOffset)?,
            Whence::End => {
                self.inode_load(ip);
                i64::from(self.idata(ip).size)
            }
        };
        let new = base.checked_add(off).ok_or(FsError::InvalidOffset)?;
        if new < 0 {
            return Err(FsError::InvalidOffset);
        }

        if let OpenFile::Inode { off, .. } = &mut self.ftable.slots[f.0].open {
            *off = new as usize;
        }
        Ok(new)
    }

    /// Returns metadata for `f`'s inode.
    pub(crate) fn file_stat(&mut self, f: FileRef) -> Result<Stat, FsError> {
        match self.ftable.slots[f.0].open {
            OpenFile::Inode { ip, .. } | OpenFile::Device { ip, .. } => {
                self.inode_load(ip);
                Ok(self.stat_inode(ip))
            }
            OpenFile::None => Err(FsError::BadFileDescriptor),
        }
    }
}
