//! Client side of the ramdisk protocol.
//!
//! Presents the ramdisk service as a [`block_io::BlockDevice`]: every read
//! or write becomes one blocking request over the transport, with the
//! block's bytes in the shared I/O page. The ramdisk is a trusted
//! collaborator — any nonzero reply means the storage under the filesystem
//! is gone, and the server cannot limp on.

use std::convert::Infallible;

use block_io::BlockDevice;
use log::debug;
use service_proto::DiskCall;
use shm_transport::{Caller, Request};
use xv6fs_types::FS_BLOCK_SIZE;

pub struct DiskDev<C> {
    port: C,
}

impl<C: Caller> DiskDev<C> {
    /// Wraps a connected transport and wakes the ramdisk with `DISK_INIT`.
    ///
    /// # Panics
    ///
    /// Panics if the ramdisk rejects initialization.
    pub fn new(port: C) -> Self {
        let ret = port.call(Request::new(DiskCall::Init as u32, [0; 4]));
        assert_eq!(ret, 0, "ramdisk init failed: {ret}");
        debug!("ramdisk ready");
        Self { port }
    }
}

impl<C: Caller> BlockDevice<FS_BLOCK_SIZE> for DiskDev<C> {
    type Error = Infallible;

    fn read(&self, index: usize, data: &mut [u8; FS_BLOCK_SIZE]) -> Result<(), Self::Error> {
        let ret = self
            .port
            .call(Request::new(DiskCall::Read as u32, [index as u64, 0, 0, 0]));
        assert_eq!(ret, 0, "disk read of block {index} failed: {ret}");
        self.port.page().read(0, data);
        Ok(())
    }

    fn write(&self, index: usize, data: &[u8; FS_BLOCK_SIZE]) -> Result<(), Self::Error> {
        self.port.page().write(0, data);
        let ret = self
            .port
            .call(Request::new(DiskCall::Write as u32, [index as u64, 0, 0, 0]));
        assert_eq!(ret, 0, "disk write of block {index} failed: {ret}");
        Ok(())
    }
}
