//! Request decode, reply encode, and the serve loop.
//!
//! Each request carries a label and four machine-word arguments; path
//! strings and bulk data travel in the shared I/O page, with "address"
//! arguments interpreted as offsets into that page.

use log::{debug, trace};
use service_proto::{FsCall, OpenFlags, Whence};
use shm_transport::{IoPage, Listener, PAGE_SIZE, Request};
use xv6fs_params::MAX_PATH;

use crate::{Disk, FsError, Xv6Fs};

/// The register file of one request, with the payload page it came with.
struct Regs<'a> {
    label: u32,
    args: [u64; 4],
    page: &'a IoPage,
}

impl Regs<'_> {
    /// Fetches the `n`th word-sized argument; index -1 designates the
    /// label itself.
    fn argint(&self, n: i32) -> i64 {
        if n == -1 {
            return i64::from(self.label);
        }
        self.args[usize::try_from(n).unwrap()] as i64
    }

    /// Fetches the `n`th argument as a payload offset.
    fn argaddr(&self, n: i32) -> Result<usize, FsError> {
        usize::try_from(self.argint(n))
            .ok()
            .filter(|off| *off < PAGE_SIZE)
            .ok_or(FsError::InvalidArgument)
    }

    /// Fetches the NUL-terminated string the `n`th argument points at.
    fn argstr(&self, n: i32, max: usize) -> Result<Vec<u8>, FsError> {
        let off = self.argaddr(n)?;
        self.page.read_cstr_at(off, max).ok_or(FsError::PathTooLong)
    }
}

/// Decodes one request, runs it, and encodes the reply word.
pub fn dispatch<D: Disk>(fs: &mut Xv6Fs<D>, req: &Request, page: &IoPage) -> i64 {
    let regs = Regs {
        label: req.label,
        args: req.args,
        page,
    };

    let result = handle(fs, &regs);
    match result {
        Ok(ret) => ret,
        Err(e) => {
            debug!("request {} failed: {e}", regs.label);
            e.to_ret()
        }
    }
}

fn handle<D: Disk>(fs: &mut Xv6Fs<D>, regs: &Regs<'_>) -> Result<i64, FsError> {
    let Some(call) = FsCall::from_repr(regs.label) else {
        debug!("bad opcode {}", regs.argint(-1));
        return Err(FsError::InvalidArgument);
    };
    trace!("dispatch {call:?}");

    match call {
        FsCall::Ret => Err(FsError::InvalidArgument),
        FsCall::Open => {
            let path = regs.argstr(0, MAX_PATH)?;
            let omode = u32::try_from(regs.argint(1)).map_err(|_| FsError::InvalidArgument)?;
            let fd = fs.open(&path, OpenFlags::from_bits_truncate(omode))?;
            Ok(fd as i64)
        }
        FsCall::Close => {
            fs.close(regs.argint(0) as u64)?;
            Ok(0)
        }
        FsCall::Read => {
            let (buf_off, mut buf) = read_buffer(regs)?;
            let n = fs.read(regs.argint(0) as u64, &mut buf)?;
            regs.page.write(buf_off, &buf[..n]);
            Ok(n as i64)
        }
        FsCall::Write => {
            let buf = write_buffer(regs)?;
            let n = fs.write(regs.argint(0) as u64, &buf)?;
            Ok(n as i64)
        }
        FsCall::Pread => {
            let (buf_off, mut buf) = read_buffer(regs)?;
            let off = regs.argint(3);
            let n = fs.pread(regs.argint(0) as u64, &mut buf, off)?;
            regs.page.write(buf_off, &buf[..n]);
            Ok(n as i64)
        }
        FsCall::Pwrite => {
            let buf = write_buffer(regs)?;
            let off = regs.argint(3);
            let n = fs.pwrite(regs.argint(0) as u64, &buf, off)?;
            Ok(n as i64)
        }
        FsCall::Lseek => {
            let whence = u32::try_from(regs.argint(2))
                .ok()
                .and_then(Whence::from_repr)
                .ok_or(FsError::InvalidArgument)?;
            fs.lseek(regs.argint(0) as u64, regs.argint(1), whence)
        }
        FsCall::Fstat => {
            let st = fs.fstat(regs.argint(0) as u64)?;
            write_stat(regs, 1, &st)?;
            Ok(0)
        }
        FsCall::Lstat => {
            let path = regs.argstr(0, MAX_PATH)?;
            let st = fs.lstat(&path)?;
            write_stat(regs, 1, &st)?;
            Ok(0)
        }
        FsCall::Unlink => {
            let path = regs.argstr(0, MAX_PATH)?;
            fs.sys_unlink(&path)?;
            Ok(0)
        }
        FsCall::Getcwd => {
            let buf_off = regs.argaddr(0)?;
            let size = regs.argaddr(1)?;
            let cwd = fs.getcwd().to_vec();
            let n = usize::min(cwd.len() + 1, usize::min(size, PAGE_SIZE - buf_off));
            if n > 0 {
                let mut out = cwd;
                out.push(0);
                regs.page.write(buf_off, &out[..n]);
            }
            Ok(0)
        }
        FsCall::Chdir => {
            let path = regs.argstr(0, MAX_PATH)?;
            fs.chdir(&path)?;
            Ok(0)
        }
        FsCall::Mkdir => {
            let path = regs.argstr(0, MAX_PATH)?;
            fs.mkdir(&path)?;
            Ok(0)
        }
        FsCall::Mknod => {
            let path = regs.argstr(0, MAX_PATH)?;
            let major = i16::try_from(regs.argint(1)).map_err(|_| FsError::InvalidArgument)?;
            let minor = i16::try_from(regs.argint(2)).map_err(|_| FsError::InvalidArgument)?;
            fs.mknod(&path, major, minor)?;
            Ok(0)
        }
        FsCall::Link => {
            let old = regs.argstr(0, MAX_PATH)?;
            let new = regs.argstr(1, MAX_PATH)?;
            fs.sys_link(&old, &new)?;
            Ok(0)
        }
        FsCall::Dup => {
            let fd = fs.dup(regs.argint(0) as u64)?;
            Ok(fd as i64)
        }
    }
}

/// Decodes `(ubuf, n)` for a read-style call, capping the transfer at what
/// fits in the page after `ubuf`.
fn read_buffer(regs: &Regs<'_>) -> Result<(usize, Vec<u8>), FsError> {
    let buf_off = regs.argaddr(1)?;
    let n = usize::try_from(regs.argint(2)).map_err(|_| FsError::InvalidArgument)?;
    let n = usize::min(n, PAGE_SIZE - buf_off);
    Ok((buf_off, vec![0; n]))
}

/// Decodes `(ubuf, n)` for a write-style call and copies the payload in.
fn write_buffer(regs: &Regs<'_>) -> Result<Vec<u8>, FsError> {
    let (buf_off, mut buf) = read_buffer(regs)?;
    regs.page.read(buf_off, &mut buf);
    Ok(buf)
}

fn write_stat(regs: &Regs<'_>, n: i32, st: &service_proto::Stat) -> Result<(), FsError> {
    use dataview::PodMethods as _;
    let off = regs.argaddr(n)?;
    if off + size_of::<service_proto::Stat>() > PAGE_SIZE {
        return Err(FsError::InvalidArgument);
    }
    regs.page.write(off, st.as_bytes());
    Ok(())
}

/// Serves requests forever: one request, one response, in order.
pub fn serve<D: Disk, L: Listener>(fs: &mut Xv6Fs<D>, port: &L) -> ! {
    loop {
        let req = port.recv();
        let ret = dispatch(fs, &req, port.page());
        port.reply(ret);
    }
}
