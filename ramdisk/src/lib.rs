//! Ramdisk block device service.
//!
//! Owns a contiguous byte array standing in for physically contiguous
//! frames and answers three requests: `DISK_INIT` (acknowledgment only),
//! `DISK_READ` (copy one block into the shared I/O page) and `DISK_WRITE`
//! (the reverse). Block numbers from the wire are bounds-checked; the
//! in-process [`BlockDevice`] view trusts its caller and panics instead.

use std::{convert::Infallible, sync::Mutex};

use block_io::BlockDevice;
use log::{debug, info, trace};
use service_proto::{DiskCall, WireError};
use shm_transport::{Listener, Request};
use xv6fs_params::MAX_RAMDISK_SIZE;
use xv6fs_types::FS_BLOCK_SIZE;

pub struct Ramdisk {
    storage: Mutex<Vec<u8>>,
}

impl Ramdisk {
    /// Creates a ramdisk backing `nblocks` blocks of storage.
    ///
    /// # Panics
    ///
    /// Panics if the backing store would exceed [`MAX_RAMDISK_SIZE`].
    #[must_use]
    pub fn new(nblocks: usize) -> Self {
        let size = nblocks * FS_BLOCK_SIZE;
        assert!(size <= MAX_RAMDISK_SIZE, "ramdisk too large: {size} bytes");
        info!("ramdisk: {nblocks} blocks ({size} bytes)");
        Self {
            storage: Mutex::new(vec![0; size]),
        }
    }

    #[must_use]
    pub fn nblocks(&self) -> usize {
        self.storage.lock().unwrap().len() / FS_BLOCK_SIZE
    }

    fn block_range(storage_len: usize, blockno: usize) -> Result<usize, ()> {
        let off = blockno.checked_mul(FS_BLOCK_SIZE).ok_or(())?;
        let end = off.checked_add(FS_BLOCK_SIZE).ok_or(())?;
        if end > storage_len {
            return Err(());
        }
        Ok(off)
    }

    fn copy_out(&self, blockno: usize, data: &mut [u8; FS_BLOCK_SIZE]) -> Result<(), ()> {
        let storage = self.storage.lock().unwrap();
        let off = Self::block_range(storage.len(), blockno)?;
        data.copy_from_slice(&storage[off..off + FS_BLOCK_SIZE]);
        Ok(())
    }

    fn copy_in(&self, blockno: usize, data: &[u8; FS_BLOCK_SIZE]) -> Result<(), ()> {
        let mut storage = self.storage.lock().unwrap();
        let off = Self::block_range(storage.len(), blockno)?;
        storage[off..off + FS_BLOCK_SIZE].copy_from_slice(data);
        Ok(())
    }

    /// Handles one wire request, returning the reply word.
    pub fn handle(&self, req: &Request, page: &shm_transport::IoPage) -> i64 {
        let Some(call) = DiskCall::from_repr(req.label) else {
            return WireError::InvalidArgument.to_ret();
        };
        let blockno = req.args[0] as usize;
        trace!("ramdisk: {call:?} block {blockno}");

        match call {
            DiskCall::Init => {
                debug!("ramdisk: init");
                0
            }
            DiskCall::Read => {
                let mut buf = [0; FS_BLOCK_SIZE];
                if self.copy_out(blockno, &mut buf).is_err() {
                    return WireError::InvalidArgument.to_ret();
                }
                page.write(0, &buf);
                0
            }
            DiskCall::Write => {
                let mut buf = [0; FS_BLOCK_SIZE];
                page.read(0, &mut buf);
                if self.copy_in(blockno, &buf).is_err() {
                    return WireError::InvalidArgument.to_ret();
                }
                0
            }
            DiskCall::Ret => WireError::InvalidArgument.to_ret(),
        }
    }

    /// Serves requests forever.
    pub fn serve<L: Listener>(&self, port: &L) -> ! {
        loop {
            let req = port.recv();
            let ret = self.handle(&req, port.page());
            port.reply(ret);
        }
    }
}

/// Direct in-process device view, used by tests and the image builder.
///
/// Block numbers out of range are a caller bug here, unlike on the wire.
impl BlockDevice<FS_BLOCK_SIZE> for &Ramdisk {
    type Error = Infallible;

    fn read(&self, index: usize, data: &mut [u8; FS_BLOCK_SIZE]) -> Result<(), Self::Error> {
        self.copy_out(index, data)
            .unwrap_or_else(|()| panic!("ramdisk: read of block {index} out of range"));
        Ok(())
    }

    fn write(&self, index: usize, data: &[u8; FS_BLOCK_SIZE]) -> Result<(), Self::Error> {
        self.copy_in(index, data)
            .unwrap_or_else(|()| panic!("ramdisk: write of block {index} out of range"));
        Ok(())
    }
}
