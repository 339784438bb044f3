//! File-system system calls.
//!
//! Mostly argument checking; the real work happens in the inode, file and
//! ops layers.

use log::debug;
use service_proto::{OpenFlags, Stat, Whence};
use xv6fs_params::{MAX_PATH, NDEV};
use xv6fs_types::FileType;

use crate::{
    Disk, FsError, Xv6Fs,
    client::Fd,
    file::OpenFile,
};

impl<D: Disk> Xv6Fs<D> {
    /// Opens (and with `CREATE`, creates) `path`.
    pub fn open(&mut self, path: &[u8], flags: OpenFlags) -> Result<Fd, FsError> {
        debug!(
            "open {:?} flags={flags:?}",
            String::from_utf8_lossy(path)
        );

        let ip = if flags.contains(OpenFlags::CREATE) {
            self.create(path, FileType::File, 0, 0)?
        } else {
            let ip = self.resolve_path(path)?;
            self.inode_load(ip);
            ip
        };

        let (ty, major) = {
            let data = self.idata(ip);
            (data.ty, data.major)
        };
        if ty == FileType::Device && !(0..NDEV as i16).contains(&major) {
            self.inode_put(ip);
            return Err(FsError::DeviceNotFound(major));
        }

        let readable = !flags.contains(OpenFlags::WRITE_ONLY);
        let writable =
            flags.contains(OpenFlags::WRITE_ONLY) || flags.contains(OpenFlags::READ_WRITE);

        let f = match self.file_alloc() {
            Ok(f) => f,
            Err(e) => {
                self.inode_put(ip);
                return Err(e);
            }
        };
        let fd = match self.fd_alloc(f) {
            Ok(fd) => fd,
            Err(e) => {
                self.file_close(f); // still OpenFile::None; drops no inode
                self.inode_put(ip);
                return Err(e);
            }
        };

        let open = if self.idata(ip).ty == FileType::Device {
            OpenFile::Device {
                ip,
                major: self.idata(ip).major,
                readable,
                writable,
            }
        } else {
            OpenFile::Inode {
                ip,
                off: 0,
                readable,
                writable,
            }
        };
        self.file_set(f, open);

        if flags.contains(OpenFlags::TRUNC) && self.idata(ip).ty == FileType::File {
            self.inode_trunc(ip);
        }

        Ok(fd)
    }

    /// Releases a descriptor.
    pub fn close(&mut self, fd: u64) -> Result<(), FsError> {
        let f = self.fd_take(fd)?;
        self.file_close(f);
        Ok(())
    }

    /// Reads from a descriptor at its current offset.
    pub fn read(&mut self, fd: u64, dst: &mut [u8]) -> Result<usize, FsError> {
        let f = self.fd_get(fd)?;
        self.file_read(f, dst)
    }

    /// Writes to a descriptor at its current offset.
    pub fn write(&mut self, fd: u64, src: &[u8]) -> Result<usize, FsError> {
        let f = self.fd_get(fd)?;
        self.file_write(f, src)
    }

    /// Positioned read: seek to `off`, then read.
    pub fn pread(&mut self, fd: u64, dst: &mut [u8], off: i64) -> Result<usize, FsError> {
        let f = self.fd_get(fd)?;
        self.file_seek(f, off, Whence::Set)?;
        self.file_read(f, dst)
    }

    /// Positioned write: seek to `off`, then write.
    pub fn pwrite(&mut self, fd: u64, src: &[u8], off: i64) -> Result<usize, FsError> {
        let f = self.fd_get(fd)?;
        self.file_seek(f, off, Whence::Set)?;
        self.file_write(f, src)
    }

    /// Repositions a descriptor's offset.
    pub fn lseek(&mut self, fd: u64, off: i64, whence: Whence) -> Result<i64, FsError> {
        let f = self.fd_get(fd)?;
        self.file_seek(f, off, whence)
    }

    /// Metadata of an open descriptor.
    pub fn fstat(&mut self, fd: u64) -> Result<Stat, FsError> {
        let f = self.fd_get(fd)?;
        self.file_stat(f)
    }

    /// Metadata of a path.
    pub fn lstat(&mut self, path: &[u8]) -> Result<Stat, FsError> {
        debug!("lstat {:?}", String::from_utf8_lossy(path));
        let ip = self.resolve_path(path)?;
        self.inode_load(ip);
        let st = self.stat_inode(ip);
        self.inode_put(ip);
        Ok(st)
    }

    /// Removes `path`'s directory entry.
    pub fn sys_unlink(&mut self, path: &[u8]) -> Result<(), FsError> {
        self.unlink(path)
    }

    /// The cached working-directory path.
    pub fn getcwd(&self) -> &[u8] {
        self.client.cwd_path()
    }

    /// Changes the working directory.
    pub fn chdir(&mut self, path: &[u8]) -> Result<(), FsError> {
        if path.len() > MAX_PATH {
            return Err(FsError::PathTooLong);
        }

        let ip = self.resolve_path(path)?;
        self.inode_load(ip);
        if !self.idata(ip).is_dir() {
            self.inode_put(ip);
            return Err(FsError::NotADirectory);
        }

        let old = self.client.cwd().expect("client has no cwd");
        self.inode_put(old);
        self.client.set_cwd(ip, path);
        Ok(())
    }

    /// Creates a directory.
    pub fn mkdir(&mut self, path: &[u8]) -> Result<(), FsError> {
        let ip = self.create(path, FileType::Dir, 0, 0)?;
        self.inode_put(ip);
        Ok(())
    }

    /// Creates a device file.
    pub fn mknod(&mut self, path: &[u8], major: i16, minor: i16) -> Result<(), FsError> {
        let ip = self.create(path, FileType::Device, major, minor)?;
        self.inode_put(ip);
        Ok(())
    }

    /// Creates `new` as a link to the same inode as `old`.
    pub fn sys_link(&mut self, old: &[u8], new: &[u8]) -> Result<(), FsError> {
        self.link(old, new)
    }

    /// Duplicates a descriptor.
    pub fn dup(&mut self, fd: u64) -> Result<Fd, FsError> {
        let f = self.fd_get(fd)?;
        let new_fd = self.fd_alloc(f)?;
        self.file_dup(f);
        Ok(new_fd)
    }
}
