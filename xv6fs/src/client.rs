//! Per-connection client state: the open-file descriptor table and the
//! current working directory.

use arrayvec::ArrayVec;
use xv6fs_params::{MAX_PATH, NOFILE, RESERVED_FDS};

use crate::{Disk, FsError, Xv6Fs, file::FileRef, inode::InodeRef};

/// A client file descriptor.
pub type Fd = usize;

pub(crate) struct Client {
    /// Open files; slots 0–2 are reserved for stdio and stay empty.
    ofile: [Option<FileRef>; NOFILE],
    cwd: Option<InodeRef>,
    /// Path string reported by `getcwd`: whatever the last successful
    /// `chdir` was handed.
    cwd_path: ArrayVec<u8, MAX_PATH>,
}

impl Client {
    pub(crate) fn new() -> Self {
        Self {
            ofile: [None; NOFILE],
            cwd: None,
            cwd_path: ArrayVec::new(),
        }
    }

    pub(crate) fn cwd(&self) -> Option<InodeRef> {
        self.cwd
    }

    pub(crate) fn set_cwd(&mut self, ip: InodeRef, path: &[u8]) {
        self.cwd = Some(ip);
        self.cwd_path.clear();
        self.cwd_path
            .try_extend_from_slice(path)
            .expect("cwd path bounds-checked by caller");
    }

    pub(crate) fn cwd_path(&self) -> &[u8] {
        &self.cwd_path
    }

    pub(crate) fn fd_in_use(&self, fd: usize) -> bool {
        self.ofile.get(fd).is_some_and(|slot| slot.is_some())
    }
}

impl<D: Disk> Xv6Fs<D> {
    /// Allocates a file descriptor for `f`, taking over the caller's file
    /// reference on success.
    ///
    /// Descriptors 0–2 are never handed out.
    pub(crate) fn fd_alloc(&mut self, f: FileRef) -> Result<Fd, FsError> {
        for fd in RESERVED_FDS..NOFILE {
            if self.client.ofile[fd].is_none() {
                self.client.ofile[fd] = Some(f);
                return Ok(fd);
            }
        }
        Err(FsError::TooManyOpenFiles)
    }

    /// Looks up an allocated descriptor.
    pub(crate) fn fd_get(&self, fd: u64) -> Result<FileRef, FsError> {
        usize::try_from(fd)
            .ok()
            .filter(|fd| *fd < NOFILE)
            .and_then(|fd| self.client.ofile[fd])
            .ok_or(FsError::BadFileDescriptor)
    }

    /// Clears a descriptor slot, returning the file it held.
    pub(crate) fn fd_take(&mut self, fd: u64) -> Result<FileRef, FsError> {
        let f = self.fd_get(fd)?;
        self.client.ofile[fd as usize] = None;
        Ok(f)
    }
}
