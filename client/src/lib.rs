//! Application-side file API.
//!
//! Marshals POSIX-style file operations into requests on a connected
//! transport: the register file carries the opcode and word arguments,
//! the shared page carries path strings and data. Transfers larger than
//! one page are split into page-sized calls.

use dataview::PodMethods as _;
use log::trace;
use service_proto::{FsCall, OpenFlags, Stat, Whence, WireError};
use shm_transport::{Caller, PAGE_SIZE, Request};
use xv6fs_params::MAX_PATH;

/// A file descriptor held on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fd(i64);

impl Fd {
    #[must_use]
    pub fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub fn raw(self) -> i64 {
        self.0
    }
}

/// Errors surfaced by the file API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error("invalid argument")]
    InvalidArgument,
    #[error("no such file or directory")]
    NotFound,
    #[error("operation failed")]
    Failed,
    #[error("path too long")]
    PathTooLong,
    #[error("malformed reply")]
    BadReply,
}

impl From<WireError> for ClientError {
    fn from(e: WireError) -> Self {
        match e {
            WireError::InvalidArgument => Self::InvalidArgument,
            WireError::NotFound => Self::NotFound,
            WireError::Failed => Self::Failed,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// A connection to the filesystem server.
pub struct FsClient<C> {
    port: C,
}

impl<C: Caller> FsClient<C> {
    pub fn new(port: C) -> Self {
        Self { port }
    }

    fn call(&self, call: FsCall, args: [u64; 4]) -> Result<i64> {
        trace!("{call:?} {args:?}");
        let ret = self.port.call(Request::new(call as u32, args));
        WireError::decode(ret).map_err(ClientError::from)
    }

    /// Writes a NUL-terminated path at `off` in the payload page.
    fn put_path(&self, off: usize, path: &str) -> Result<()> {
        if path.len() + 1 > MAX_PATH {
            return Err(ClientError::PathTooLong);
        }
        self.port.page().write_cstr_at(off, path.as_bytes());
        Ok(())
    }

    pub fn open(&self, path: &str, flags: OpenFlags) -> Result<Fd> {
        self.put_path(0, path)?;
        let fd = self.call(FsCall::Open, [0, u64::from(flags.bits()), 0, 0])?;
        Ok(Fd(fd))
    }

    pub fn close(&self, fd: Fd) -> Result<()> {
        self.call(FsCall::Close, [fd.0 as u64, 0, 0, 0])?;
        Ok(())
    }

    /// Reads at the descriptor's offset; short counts mean end of file.
    pub fn read(&self, fd: Fd, buf: &mut [u8]) -> Result<usize> {
        let mut tot = 0;
        while tot < buf.len() {
            let chunk = usize::min(buf.len() - tot, PAGE_SIZE);
            let n = self.call(FsCall::Read, [fd.0 as u64, 0, chunk as u64, 0])?;
            let n = usize::try_from(n).map_err(|_| ClientError::BadReply)?;
            if n > chunk {
                return Err(ClientError::BadReply);
            }
            self.port.page().read(0, &mut buf[tot..tot + n]);
            tot += n;
            if n < chunk {
                break;
            }
        }
        Ok(tot)
    }

    pub fn write(&self, fd: Fd, buf: &[u8]) -> Result<usize> {
        let mut tot = 0;
        while tot < buf.len() {
            let chunk = usize::min(buf.len() - tot, PAGE_SIZE);
            self.port.page().write(0, &buf[tot..tot + chunk]);
            let n = self.call(FsCall::Write, [fd.0 as u64, 0, chunk as u64, 0])?;
            let n = usize::try_from(n).map_err(|_| ClientError::BadReply)?;
            if n > chunk {
                return Err(ClientError::BadReply);
            }
            tot += n;
            if n < chunk {
                break;
            }
        }
        Ok(tot)
    }

    /// Positioned read. The server implements this as seek-then-read, so
    /// the descriptor's offset does move.
    pub fn pread(&self, fd: Fd, buf: &mut [u8], off: u64) -> Result<usize> {
        let mut tot = 0;
        while tot < buf.len() {
            let chunk = usize::min(buf.len() - tot, PAGE_SIZE);
            let n = self.call(
                FsCall::Pread,
                [fd.0 as u64, 0, chunk as u64, off + tot as u64],
            )?;
            let n = usize::try_from(n).map_err(|_| ClientError::BadReply)?;
            if n > chunk {
                return Err(ClientError::BadReply);
            }
            self.port.page().read(0, &mut buf[tot..tot + n]);
            tot += n;
            if n < chunk {
                break;
            }
        }
        Ok(tot)
    }

    pub fn pwrite(&self, fd: Fd, buf: &[u8], off: u64) -> Result<usize> {
        let mut tot = 0;
        while tot < buf.len() {
            let chunk = usize::min(buf.len() - tot, PAGE_SIZE);
            self.port.page().write(0, &buf[tot..tot + chunk]);
            let n = self.call(
                FsCall::Pwrite,
                [fd.0 as u64, 0, chunk as u64, off + tot as u64],
            )?;
            let n = usize::try_from(n).map_err(|_| ClientError::BadReply)?;
            if n > chunk {
                return Err(ClientError::BadReply);
            }
            tot += n;
            if n < chunk {
                break;
            }
        }
        Ok(tot)
    }

    pub fn lseek(&self, fd: Fd, off: i64, whence: Whence) -> Result<i64> {
        self.call(FsCall::Lseek, [fd.0 as u64, off as u64, whence as u64, 0])
    }

    pub fn fstat(&self, fd: Fd) -> Result<Stat> {
        self.call(FsCall::Fstat, [fd.0 as u64, 0, 0, 0])?;
        Ok(self.read_stat())
    }

    pub fn lstat(&self, path: &str) -> Result<Stat> {
        self.put_path(0, path)?;
        self.call(FsCall::Lstat, [0, 0, 0, 0])?;
        Ok(self.read_stat())
    }

    fn read_stat(&self) -> Stat {
        let mut st = Stat::zeroed();
        self.port.page().read(0, st.as_bytes_mut());
        st
    }

    pub fn unlink(&self, path: &str) -> Result<()> {
        self.put_path(0, path)?;
        self.call(FsCall::Unlink, [0, 0, 0, 0])?;
        Ok(())
    }

    pub fn getcwd(&self) -> Result<String> {
        self.call(FsCall::Getcwd, [0, MAX_PATH as u64, 0, 0])?;
        let raw = self
            .port
            .page()
            .read_cstr(MAX_PATH)
            .ok_or(ClientError::BadReply)?;
        String::from_utf8(raw).map_err(|_| ClientError::BadReply)
    }

    pub fn chdir(&self, path: &str) -> Result<()> {
        self.put_path(0, path)?;
        self.call(FsCall::Chdir, [0, 0, 0, 0])?;
        Ok(())
    }

    pub fn mkdir(&self, path: &str) -> Result<()> {
        self.put_path(0, path)?;
        self.call(FsCall::Mkdir, [0, 0, 0, 0])?;
        Ok(())
    }

    pub fn mknod(&self, path: &str, major: i16, minor: i16) -> Result<()> {
        self.put_path(0, path)?;
        self.call(FsCall::Mknod, [0, major as u64, minor as u64, 0])?;
        Ok(())
    }

    pub fn link(&self, old: &str, new: &str) -> Result<()> {
        self.put_path(0, old)?;
        self.put_path(MAX_PATH, new)?;
        self.call(FsCall::Link, [0, MAX_PATH as u64, 0, 0])?;
        Ok(())
    }

    pub fn dup(&self, fd: Fd) -> Result<Fd> {
        let new = self.call(FsCall::Dup, [fd.0 as u64, 0, 0, 0])?;
        Ok(Fd(new))
    }
}
