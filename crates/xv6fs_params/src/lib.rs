//! System-wide parameters shared by the filesystem server, the ramdisk and
//! the tooling.

/// Maximum major device number.
pub const NDEV: usize = 10;

/// Open files per client connection.
pub const NOFILE: usize = 16;

/// File descriptors reserved for stdio; `fd_alloc` never hands these out.
pub const RESERVED_FDS: usize = 3;

/// Open files per system.
pub const NFILE: usize = 100;

/// Maximum number of active i-nodes.
pub const NINODE: usize = 50;

/// Max # of blocks any FS op writes.
pub const MAX_OP_BLOCKS: usize = 10;

/// Size of disk block cache.
pub const NBUF: usize = MAX_OP_BLOCKS * 3;

/// Maximum file path name.
pub const MAX_PATH: usize = 128;

/// Size of file system image in blocks.
pub const FS_SIZE: usize = 2000;

/// Maximum number of i-nodes on file system.
pub const NUM_FS_INODES: usize = 200;

/// Blocks reserved for the (stubbed) write-ahead log.
pub const FS_LOG_SIZE: usize = MAX_OP_BLOCKS * 3;

/// Device number of the file system root disk.
pub const ROOT_DEV: u32 = 1;

/// Upper bound on the ramdisk backing store.
pub const MAX_RAMDISK_SIZE: usize = 256 * 1024 * 1024;
