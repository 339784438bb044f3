//! Buffer cache instantiation.

use std::convert::Infallible;

use block_io::{BlockData, BlockDevice, BlockIoCache, BufferList};
use mutex_api::StdMutex;
use xv6fs_params::NBUF;
use xv6fs_types::FS_BLOCK_SIZE;

/// Devices the server can sit on: block-addressed, with failures already
/// treated as fatal below this layer.
pub trait Disk: BlockDevice<FS_BLOCK_SIZE, Error = Infallible> {}

impl<T> Disk for T where T: BlockDevice<FS_BLOCK_SIZE, Error = Infallible> {}

pub(crate) type BlockDataMutex = StdMutex<BlockData<FS_BLOCK_SIZE>>;
pub(crate) type BufferListMutex = StdMutex<BufferList<BlockDataMutex>>;

pub type BlockCache<D> = BlockIoCache<D, BufferListMutex>;

/// Creates the fixed-size cache over `device`.
pub fn new_cache<D: Disk>(device: D) -> BlockCache<D> {
    let cache = BlockIoCache::new(device);
    cache.init(NBUF);
    cache
}
