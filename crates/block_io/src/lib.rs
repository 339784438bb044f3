//! Cache for block I/O.

use std::{mem, sync::Arc};

use dataview::{Pod, PodMethods as _};
use mutex_api::Mutex;

/// A fixed-size block device.
pub trait BlockDevice<const BLOCK_SIZE: usize> {
    type Error;

    fn read(&self, index: usize, data: &mut [u8; BLOCK_SIZE]) -> Result<(), Self::Error>;
    fn write(&self, index: usize, data: &[u8; BLOCK_SIZE]) -> Result<(), Self::Error>;
}

/// A buffer cache for block I/O.
///
/// Holds a fixed pool of buffers; a buffer not referenced by any handle is
/// eligible for recycling, least recently used first.
pub struct BlockIoCache<Device, BufferListMutex> {
    device: Device,

    /// All buffers, most recently used first.
    buffers: BufferListMutex,
}

pub struct BufferList<BlockDataMutex>(Vec<Arc<Block<BlockDataMutex>>>);

/// A block buffer.
struct Block<BlockDataMutex> {
    /// Block index.
    index: usize,

    /// Block data.
    data: BlockDataMutex,
}

/// A counted reference to a cached buffer.
///
/// While any handle for a block is alive the buffer cannot be recycled.
/// Dropping the handle marks the buffer most recently used.
pub struct BlockHandle<'a, Device, BufferListMutex, BlockDataMutex>
where
    BufferListMutex: Mutex<Data = BufferList<BlockDataMutex>>,
{
    index: usize,
    cache: &'a BlockIoCache<Device, BufferListMutex>,
    block: Arc<Block<BlockDataMutex>>,
}

/// Exclusive access to a buffer's data.
///
/// `VALID` tracks whether the buffer holds the block's contents; only a
/// valid guard exposes the bytes.
pub struct BlockGuard<
    'a,
    'b,
    Device,
    BufferListMutex,
    BlockDataMutex,
    const BLOCK_SIZE: usize,
    const VALID: bool,
> where
    BufferListMutex: Mutex<Data = BufferList<BlockDataMutex>>,
    BlockDataMutex: Mutex<Data = BlockData<BLOCK_SIZE>> + 'b,
{
    index: usize,
    cache: &'a BlockIoCache<Device, BufferListMutex>,
    data: BlockDataMutex::Guard<'b>,
}

/// A block buffer's data.
pub struct BlockData<const BLOCK_SIZE: usize> {
    index: usize,
    valid: bool,
    data: Box<[u8; BLOCK_SIZE]>,
}

impl<Device, BufferListMutex, BlockDataMutex, const BLOCK_SIZE: usize>
    BlockIoCache<Device, BufferListMutex>
where
    BufferListMutex: Mutex<Data = BufferList<BlockDataMutex>>,
    BlockDataMutex: Mutex<Data = BlockData<BLOCK_SIZE>>,
{
    pub fn new(device: Device) -> Self {
        Self {
            device,
            buffers: BufferListMutex::new(BufferList(Vec::new())),
        }
    }

    /// Initializes the cache with `num_block` buffers.
    ///
    /// # Panics
    ///
    /// Panics if `num_block` is 0 or the cache is already initialized.
    pub fn init(&self, num_block: usize) {
        assert!(num_block > 0);
        let mut buffers = self.buffers.lock();
        assert!(buffers.0.is_empty(), "cache already initialized");

        for _ in 0..num_block {
            buffers.0.push(Arc::new(Block {
                index: usize::MAX,
                data: BlockDataMutex::new(BlockData {
                    index: usize::MAX,
                    valid: false,
                    data: Box::new([0; BLOCK_SIZE]),
                }),
            }));
        }
    }

    /// Returns a handle to the buffer for the given block number.
    ///
    /// If the block is already cached, returns a handle to it. Otherwise
    /// recycles the least recently used unreferenced buffer. Returns `None`
    /// if every buffer is referenced.
    ///
    /// # Panics
    ///
    /// Panics if the cache is not initialized.
    pub fn try_get(
        &self,
        index: usize,
    ) -> Option<BlockHandle<'_, Device, BufferListMutex, BlockDataMutex>> {
        let mut buffers = self.buffers.lock();
        assert!(!buffers.0.is_empty(), "cache not initialized");

        if let Some(block) = buffers.0.iter().find(|b| b.index == index) {
            // NOTE: the buffer contents may not be valid yet.
            return Some(BlockHandle {
                index,
                cache: self,
                block: Arc::clone(block),
            });
        }

        // Not cached; recycle the least recently used unreferenced buffer.
        let block = buffers.0.iter_mut().rev().find_map(|block| {
            let unshared = Arc::get_mut(block)?;
            unshared.index = index;
            Some(block)
        })?;
        Some(BlockHandle {
            index,
            cache: self,
            block: Arc::clone(block),
        })
    }

    /// Like [`Self::try_get`], but panics if every buffer is referenced.
    pub fn get(&self, index: usize) -> BlockHandle<'_, Device, BufferListMutex, BlockDataMutex> {
        match self.try_get(index) {
            Some(handle) => handle,
            None => panic!("block buffer exhausted"),
        }
    }
}

impl<Device, BufferListMutex, BlockDataMutex> Drop
    for BlockHandle<'_, Device, BufferListMutex, BlockDataMutex>
where
    BufferListMutex: Mutex<Data = BufferList<BlockDataMutex>>,
{
    fn drop(&mut self) {
        // Mark most recently used.
        let mut buffers = self.cache.buffers.lock();
        if let Some(pos) = buffers.0.iter().position(|b| b.index == self.index) {
            let block = buffers.0.remove(pos);
            buffers.0.insert(0, block);
        }
    }
}

impl<'a, Device, BufferListMutex, BlockDataMutex>
    BlockHandle<'a, Device, BufferListMutex, BlockDataMutex>
where
    BufferListMutex: Mutex<Data = BufferList<BlockDataMutex>>,
{
    pub fn index(&self) -> usize {
        self.index
    }

    /// Keeps the buffer resident after this handle is dropped.
    ///
    /// A pinned buffer is never recycled until a matching [`Self::unpin`].
    pub fn pin(&self) {
        mem::forget(Arc::clone(&self.block));
    }

    /// Releases a [`Self::pin`].
    ///
    /// # Safety
    ///
    /// The buffer must have been pinned, exactly once per `unpin` call.
    pub unsafe fn unpin(&self) {
        unsafe {
            Arc::decrement_strong_count(Arc::as_ptr(&self.block));
        }
    }

    pub fn lock<'b, const BLOCK_SIZE: usize>(
        &'b mut self,
    ) -> BlockGuard<'a, 'b, Device, BufferListMutex, BlockDataMutex, BLOCK_SIZE, false>
    where
        BlockDataMutex: Mutex<Data = BlockData<BLOCK_SIZE>>,
    {
        let mut data = self.block.data.lock();

        if data.index != self.index {
            // the buffer was recycled since its last use
            data.index = self.index;
            data.valid = false;
        }

        BlockGuard {
            index: self.index,
            cache: self.cache,
            data,
        }
    }
}

impl<'a, 'b, Device, BufferListMutex, BlockDataMutex, const BLOCK_SIZE: usize, const VALID: bool>
    BlockGuard<'a, 'b, Device, BufferListMutex, BlockDataMutex, BLOCK_SIZE, VALID>
where
    Device: BlockDevice<BLOCK_SIZE>,
    BufferListMutex: Mutex<Data = BufferList<BlockDataMutex>>,
    BlockDataMutex: Mutex<Data = BlockData<BLOCK_SIZE>> + 'b,
{
    /// Returns the block number.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Reads the block from the device if the cached data is not valid.
    pub fn read(
        mut self,
    ) -> Result<
        BlockGuard<'a, 'b, Device, BufferListMutex, BlockDataMutex, BLOCK_SIZE, true>,
        Device::Error,
    > {
        if !self.data.valid {
            self.cache.device.read(self.index, &mut self.data.data)?;
            self.data.valid = true;
        }

        Ok(BlockGuard {
            index: self.index,
            cache: self.cache,
            data: self.data,
        })
    }

    /// Sets the whole block data.
    pub fn set_data(
        mut self,
        data: &[u8],
    ) -> BlockGuard<'a, 'b, Device, BufferListMutex, BlockDataMutex, BLOCK_SIZE, true> {
        self.data.valid = true;
        self.data.data.copy_from_slice(data);
        BlockGuard {
            index: self.index,
            cache: self.cache,
            data: self.data,
        }
    }

    /// Fills the whole block data with zero.
    pub fn zeroed(
        mut self,
    ) -> BlockGuard<'a, 'b, Device, BufferListMutex, BlockDataMutex, BLOCK_SIZE, true> {
        self.data.valid = true;
        self.data.data.fill(0);
        BlockGuard {
            index: self.index,
            cache: self.cache,
            data: self.data,
        }
    }
}

impl<Device, BufferListMutex, BlockDataMutex, const BLOCK_SIZE: usize>
    BlockGuard<'_, '_, Device, BufferListMutex, BlockDataMutex, BLOCK_SIZE, true>
where
    Device: BlockDevice<BLOCK_SIZE>,
    BufferListMutex: Mutex<Data = BufferList<BlockDataMutex>>,
    BlockDataMutex: Mutex<Data = BlockData<BLOCK_SIZE>>,
{
    /// Returns a reference to the block data bytes.
    pub fn bytes(&self) -> &[u8; BLOCK_SIZE] {
        &self.data.data
    }

    /// Returns a mutable reference to the block data bytes.
    pub fn bytes_mut(&mut self) -> &mut [u8; BLOCK_SIZE] {
        &mut self.data.data
    }

    /// Returns a reference to the block data as POD.
    pub fn data<T>(&self) -> &T
    where
        T: Pod,
    {
        self.bytes().as_data_view().get(0)
    }

    /// Returns a mutable reference to the block data as POD.
    pub fn data_mut<T>(&mut self) -> &mut T
    where
        T: Pod,
    {
        self.bytes_mut().as_data_view_mut().get_mut(0)
    }

    /// Writes the block through to the device.
    pub fn write(&mut self) -> Result<(), Device::Error> {
        assert!(self.data.valid);
        self.cache.device.write(self.index, self.bytes())
    }
}
