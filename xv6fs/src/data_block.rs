//! Data block allocator over the on-disk bitmap.

use log::warn;
use xv6fs_types::{BITS_PER_BLOCK, BlockNo, BmapBlock};

use crate::{Disk, Xv6Fs};

impl<D: Disk> Xv6Fs<D> {
    /// Zeroes a block on disk.
    fn block_zero(&mut self, bn: BlockNo) {
        let mut br = self.cache.get(bn.as_index());
        let mut bg = br.lock().zeroed();
        bg.write().unwrap();
    }

    /// Allocates a zeroed disk block.
    ///
    /// Returns `None` if out of disk space.
    pub(crate) fn block_alloc(&mut self) -> Option<BlockNo> {
        let sb_size = self.sb.size as usize;
        for bn0 in (0..sb_size).step_by(BITS_PER_BLOCK) {
            let found = {
                let mut br = self.cache.get(self.sb.bmap_block(bn0).as_index());
                let mut bg = br.lock().read().unwrap();
                let bni = (0..BITS_PER_BLOCK)
                    .take_while(|bni| bn0 + *bni < sb_size)
                    .find(|bni| {
                        !bg.data::<BmapBlock>().bit(*bni) // block is free (bit = 0)
                    });
                if let Some(bni) = bni {
                    bg.data_mut::<BmapBlock>().set_bit(bni); // mark block in use
                    bg.write().unwrap();
                }
                bni
            };
            let Some(bni) = found else { continue };

            let bn = BlockNo::new((bn0 + bni) as u32);
            self.block_zero(bn);
            return Some(bn);
        }
        warn!("balloc: out of blocks");
        None
    }

    /// Frees a disk block.
    ///
    /// # Panics
    ///
    /// Panics if the block is already free — a double free means the image
    /// is corrupt.
    pub(crate) fn block_free(&mut self, b: BlockNo) {
        let mut br = self.cache.get(self.sb.bmap_block(b.as_index()).as_index());
        let mut bg = br.lock().read().unwrap();
        let bi = b.as_index() % BITS_PER_BLOCK;
        assert!(bg.data::<BmapBlock>().bit(bi), "freeing free block");
        bg.data_mut::<BmapBlock>().clear_bit(bi);
        bg.write().unwrap();
    }
}
