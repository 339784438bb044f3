//! Character devices reachable through `T_DEVICE` inodes.
//!
//! Dispatch is keyed by major number, one slot per major. The console sits
//! at major 1 and writes into the server's log.

use log::info;
use xv6fs_params::NDEV;

use crate::FsError;

/// Major number of the console device.
pub const CONSOLE: i16 = 1;

/// A device reachable through read/write on a device file.
pub trait CharDevice {
    fn read(&mut self, dst: &mut [u8]) -> Result<usize, FsError>;
    fn write(&mut self, src: &[u8]) -> Result<usize, FsError>;
}

pub(crate) struct DeviceTable {
    devs: [Option<Box<dyn CharDevice>>; NDEV],
}

impl DeviceTable {
    pub(crate) fn new() -> Self {
        let mut table = Self {
            devs: std::array::from_fn(|_| None),
        };
        table.register(CONSOLE, Box::new(Console));
        table
    }

    /// Installs `dev` at `major`, replacing any previous device.
    pub(crate) fn register(&mut self, major: i16, dev: Box<dyn CharDevice>) {
        self.devs[usize::try_from(major).expect("bad major")] = Some(dev);
    }

    pub(crate) fn get_mut(&mut self, major: i16) -> Result<&mut (dyn CharDevice + 'static), FsError> {
        let idx = usize::try_from(major).ok().filter(|m| *m < NDEV);
        match idx {
            Some(m) => self.devs[m]
                .as_deref_mut()
                .ok_or(FsError::DeviceNotFound(major)),
            None => Err(FsError::DeviceNotFound(major)),
        }
    }
}

/// The console: write-only from the client's point of view; reads hit EOF.
struct Console;

impl CharDevice for Console {
    fn read(&mut self, _dst: &mut [u8]) -> Result<usize, FsError> {
        Ok(0)
    }

    fn write(&mut self, src: &[u8]) -> Result<usize, FsError> {
        info!(target: "console", "{}", String::from_utf8_lossy(src));
        Ok(src.len())
    }
}
