//! File system server.
//!
//! Five layers:
//!   + Blocks: allocator for raw disk blocks.
//!   + Files: inode allocator, reading, writing, metadata.
//!   + Directories: inode with special contents (list of other inodes!)
//!   + Names: paths like /a/bb/c for convenient naming.
//!   + Syscalls: argument checking and dispatch over the transport.
//!
//! The classic design keeps the buffer pool, inode table and file table as
//! process-wide globals guarded by spin- and sleep-locks. This server runs
//! strictly serially — one request, one response — so all of that state
//! lives in one explicit [`Xv6Fs`] record threaded through every operation,
//! and the lock/unlock steps of the inode lifecycle collapse into loading
//! and invalidating the cached copy.

use log::info;
use xv6fs_params::ROOT_DEV;
use xv6fs_types::{InodeNo, SuperBlock};

pub mod bio;
mod client;
mod data_block;
pub mod device;
mod dir;
pub mod dispatch;
pub mod disk;
mod error;
mod file;
mod inode;
mod ops;
mod path;
mod sysfile;

pub use self::{
    bio::Disk,
    client::Fd,
    error::FsError,
    file::FileRef,
    inode::InodeRef,
};

/// The whole state of the filesystem server.
pub struct Xv6Fs<D> {
    /// Device number of the disk this server sits on.
    dev: u32,
    sb: SuperBlock,
    cache: bio::BlockCache<D>,
    itable: inode::InodeTable,
    ftable: file::FileTable,
    devices: device::DeviceTable,
    client: client::Client,
}

impl<D: Disk> Xv6Fs<D> {
    /// Boots the filesystem: rebuilds a fresh image on `device`, then reads
    /// the superblock back through the cache.
    ///
    /// # Panics
    ///
    /// Panics if the freshly written superblock does not check out.
    pub fn init(device: D) -> Self {
        mkfs::format(&device).unwrap();

        let cache = bio::new_cache(device);
        let sb = {
            let mut br = cache.get(SuperBlock::SUPER_BLOCK_NO.as_index());
            let bg = br.lock().read().unwrap();
            bg.data::<SuperBlock>().clone()
        };
        assert_eq!(sb.magic, SuperBlock::FS_MAGIC, "invalid file system");
        info!(
            "fs: {} blocks, {} inodes, data starts after {} meta blocks",
            sb.size,
            sb.ninodes,
            sb.size - sb.nblocks
        );

        let mut fs = Self {
            dev: ROOT_DEV,
            sb,
            cache,
            itable: inode::InodeTable::new(),
            ftable: file::FileTable::new(),
            devices: device::DeviceTable::new(),
            client: client::Client::new(),
        };

        let root = fs.inode_get(InodeNo::ROOT);
        fs.client.set_cwd(root, b"/");
        fs
    }

    /// The superblock as read at boot.
    #[must_use]
    pub fn superblock(&self) -> &SuperBlock {
        &self.sb
    }

    /// Installs a character device at `major`, replacing any previous one.
    pub fn register_device(&mut self, major: i16, dev: Box<dyn device::CharDevice>) {
        self.devices.register(major, dev);
    }

    /// Number of file-table slots currently referenced.
    #[must_use]
    pub fn live_files(&self) -> usize {
        self.ftable.live()
    }

    /// Number of inode-table slots currently referenced (the client's cwd
    /// always accounts for one).
    #[must_use]
    pub fn live_inodes(&self) -> usize {
        self.itable.live()
    }

    /// Whether `fd` currently refers to an open file.
    #[must_use]
    pub fn fd_in_use(&self, fd: usize) -> bool {
        self.client.fd_in_use(fd)
    }
}
