//! File system image builder.
//!
//! Writes a fresh image straight through a [`BlockDevice`], bypassing any
//! cache: zero every block, lay down the superblock, create the root
//! directory (with its size rounded up to a whole block), and mark all meta
//! blocks allocated in the bitmap. The filesystem server runs the same code
//! against the ramdisk at startup; the `mkfs` binary runs it against an
//! image file and can preload host files into the root directory.

use std::mem;

use block_io::BlockDevice;
use dataview::PodMethods as _;
use log::debug;
use xv6fs_params::{FS_LOG_SIZE, FS_SIZE, NUM_FS_INODES};
use xv6fs_types::{
    BITS_PER_BLOCK, BlockNo, DirEntry, FS_BLOCK_SIZE, FileType, INODE_PER_BLOCK, Inode, InodeNo,
    MAX_FILE, NUM_DIRECT_REFS, SuperBlock,
};

const _: () = {
    assert!(FS_BLOCK_SIZE % mem::size_of::<Inode>() == 0);
    assert!(FS_BLOCK_SIZE % mem::size_of::<DirEntry>() == 0);
};

/// Builds a fresh file system image on `dev`.
pub struct ImageBuilder<'a, D> {
    dev: &'a D,
    num_inodes: u32,
    next_free_inode: InodeNo,
    next_free_block: BlockNo,
    total_blocks: u32,
    sb: SuperBlock,
}

impl<'a, D> ImageBuilder<'a, D>
where
    D: BlockDevice<FS_BLOCK_SIZE>,
{
    pub fn new(dev: &'a D) -> Self {
        let total_blocks = u32::try_from(FS_SIZE).unwrap();
        let num_bmap_blocks = u32::try_from(FS_SIZE / BITS_PER_BLOCK + 1).unwrap();
        let num_inode_blocks = u32::try_from(NUM_FS_INODES / INODE_PER_BLOCK + 1).unwrap();
        let num_log_blocks = u32::try_from(FS_LOG_SIZE).unwrap();
        let num_meta_blocks = 2 + num_log_blocks + num_inode_blocks + num_bmap_blocks;
        let num_blocks = total_blocks - num_meta_blocks;

        let sb = SuperBlock {
            magic: SuperBlock::FS_MAGIC,
            size: total_blocks,
            nblocks: num_blocks,
            ninodes: u32::try_from(NUM_FS_INODES).unwrap(),
            nlog: num_log_blocks,
            logstart: 2,
            inodestart: 2 + num_log_blocks,
            bmapstart: 2 + num_log_blocks + num_inode_blocks,
        };

        debug!(
            "nmeta {num_meta_blocks} (boot, super, log blocks {num_log_blocks}, inode blocks \
             {num_inode_blocks}, bitmap blocks {num_bmap_blocks}) blocks {num_blocks} total \
             {total_blocks}"
        );

        Self {
            dev,
            num_inodes: sb.ninodes,
            next_free_inode: InodeNo::new(1),
            next_free_block: BlockNo::new(num_meta_blocks),
            total_blocks,
            sb,
        }
    }

    /// Zeroes the image and writes the superblock and root directory.
    pub fn begin(&mut self) -> Result<(), D::Error> {
        self.clear_all_sections()?;
        self.write_super_block()?;

        let root_ino = self.create_directory()?;
        assert_eq!(root_ino, InodeNo::ROOT);
        Ok(())
    }

    /// Rounds the root directory up to a block boundary and writes the
    /// bitmap covering everything allocated so far.
    pub fn finish(&mut self) -> Result<(), D::Error> {
        let mut inode = Inode::zeroed();
        self.read_inode(InodeNo::ROOT, &mut inode)?;
        inode.size = inode.size.next_multiple_of(u32::try_from(FS_BLOCK_SIZE).unwrap());
        self.write_inode(InodeNo::ROOT, &inode)?;

        self.write_bitmap()
    }

    /// Creates a file in the root directory holding `content`.
    pub fn add_file(&mut self, name: &str, content: &[u8]) -> Result<InodeNo, D::Error> {
        let ino = self.alloc_inode(FileType::File)?;
        self.append_inode(ino, content)?;
        self.add_directory_entry(InodeNo::ROOT, ino, name)?;
        Ok(ino)
    }

    fn clear_all_sections(&mut self) -> Result<(), D::Error> {
        let zeroes = [0u8; FS_BLOCK_SIZE];
        for i in 0..self.total_blocks {
            self.write_section(BlockNo::new(i), &zeroes)?;
        }
        Ok(())
    }

    fn write_super_block(&mut self) -> Result<(), D::Error> {
        let mut buf = [0u8; FS_BLOCK_SIZE];
        let sb_bytes = self.sb.as_bytes();
        buf[..sb_bytes.len()].copy_from_slice(sb_bytes);
        self.write_section(SuperBlock::SUPER_BLOCK_NO, &buf)
    }

    fn create_directory(&mut self) -> Result<InodeNo, D::Error> {
        let dir_ino = self.alloc_inode(FileType::Dir)?;
        self.add_directory_entry(dir_ino, dir_ino, ".")?;
        self.add_directory_entry(dir_ino, dir_ino, "..")?;
        Ok(dir_ino)
    }

    fn add_directory_entry(
        &mut self,
        dir_ino: InodeNo,
        ino: InodeNo,
        name: &str,
    ) -> Result<(), D::Error> {
        let mut de = DirEntry::zeroed();
        de.set_ino(Some(ino));
        de.set_name(name.as_bytes());
        self.append_inode(dir_ino, de.as_bytes())
    }

    fn write_bitmap(&mut self) -> Result<(), D::Error> {
        let used = self.next_free_block.as_index();
        debug!("balloc: first {used} blocks have been allocated");
        assert!(used < BITS_PER_BLOCK);

        let mut buf = [0u8; FS_BLOCK_SIZE];
        for i in 0..used {
            buf[i / 8] |= 1 << (i % 8);
        }
        debug!("balloc: write bitmap block at sector {}", self.sb.bmapstart);
        self.write_section(BlockNo::new(self.sb.bmapstart), &buf)
    }

    fn write_section(&mut self, bn: BlockNo, data: &[u8; FS_BLOCK_SIZE]) -> Result<(), D::Error> {
        self.dev.write(bn.as_index(), data)
    }

    fn read_section(&mut self, bn: BlockNo, data: &mut [u8; FS_BLOCK_SIZE]) -> Result<(), D::Error> {
        self.dev.read(bn.as_index(), data)
    }

    fn write_inode(&mut self, ino: InodeNo, data: &Inode) -> Result<(), D::Error> {
        let mut buf = [0u8; FS_BLOCK_SIZE];
        let bn = self.sb.inode_block(ino);
        self.read_section(bn, &mut buf)?;
        let offset = (ino.as_index() % INODE_PER_BLOCK) * mem::size_of::<Inode>();
        buf[offset..offset + mem::size_of::<Inode>()].copy_from_slice(data.as_bytes());
        self.write_section(bn, &buf)
    }

    fn read_inode(&mut self, ino: InodeNo, data: &mut Inode) -> Result<(), D::Error> {
        let mut buf = [0u8; FS_BLOCK_SIZE];
        let bn = self.sb.inode_block(ino);
        self.read_section(bn, &mut buf)?;
        let offset = (ino.as_index() % INODE_PER_BLOCK) * mem::size_of::<Inode>();
        data.as_bytes_mut()
            .copy_from_slice(&buf[offset..offset + mem::size_of::<Inode>()]);
        Ok(())
    }

    fn alloc_inode(&mut self, ty: FileType) -> Result<InodeNo, D::Error> {
        let ino = self.next_free_inode;
        assert!(ino.value() < self.num_inodes, "image out of inodes");
        self.next_free_inode = InodeNo::new(ino.value() + 1);

        let mut inode = Inode::zeroed();
        inode.ty = ty as i16;
        inode.nlink = 1;
        self.write_inode(ino, &inode)?;
        Ok(ino)
    }

    fn alloc_block(&mut self) -> BlockNo {
        let bn = self.next_free_block;
        assert!(bn.value() < self.total_blocks, "image out of blocks");
        self.next_free_block = BlockNo::new(bn.value() + 1);
        bn
    }

    /// Appends `data` to the inode's contents, allocating blocks from the
    /// build cursor.
    fn append_inode(&mut self, ino: InodeNo, data: &[u8]) -> Result<(), D::Error> {
        let mut data = data;

        let mut inode = Inode::zeroed();
        self.read_inode(ino, &mut inode)?;
        let mut file_off = inode.size as usize;

        while !data.is_empty() {
            let file_bidx = file_off / FS_BLOCK_SIZE;
            assert!(file_bidx < MAX_FILE);
            let bn = if file_bidx < NUM_DIRECT_REFS {
                if inode.addrs[file_bidx] == 0 {
                    inode.addrs[file_bidx] = self.alloc_block().value();
                }
                BlockNo::new(inode.addrs[file_bidx])
            } else {
                if inode.addrs[NUM_DIRECT_REFS] == 0 {
                    inode.addrs[NUM_DIRECT_REFS] = self.alloc_block().value();
                }
                let ind_bn = BlockNo::new(inode.addrs[NUM_DIRECT_REFS]);
                let mut ind_buf = [0u8; FS_BLOCK_SIZE];
                self.read_section(ind_bn, &mut ind_buf)?;
                let pos = (file_bidx - NUM_DIRECT_REFS) * mem::size_of::<u32>();
                let mut target = u32::from_le_bytes(ind_buf[pos..pos + 4].try_into().unwrap());
                if target == 0 {
                    target = self.alloc_block().value();
                    ind_buf[pos..pos + 4].copy_from_slice(&target.to_le_bytes());
                    self.write_section(ind_bn, &ind_buf)?;
                }
                BlockNo::new(target)
            };

            let mut buf = [0u8; FS_BLOCK_SIZE];
            self.read_section(bn, &mut buf)?;

            let block_start = file_bidx * FS_BLOCK_SIZE;
            let block_end = (file_bidx + 1) * FS_BLOCK_SIZE;
            let copy_len = usize::min(data.len(), block_end - file_off);
            buf[file_off - block_start..][..copy_len].copy_from_slice(&data[..copy_len]);
            self.write_section(bn, &buf)?;

            file_off += copy_len;
            data = &data[copy_len..];
        }

        inode.size = u32::try_from(file_off).unwrap();
        self.write_inode(ino, &inode)?;
        Ok(())
    }
}

/// Writes an empty file system (root directory only) on `dev`.
pub fn format<D>(dev: &D) -> Result<(), D::Error>
where
    D: BlockDevice<FS_BLOCK_SIZE>,
{
    let mut builder = ImageBuilder::new(dev);
    builder.begin()?;
    builder.finish()
}
