//! Data types for the on-disk file system format.
//!
//! The data layout:
//!
//! | block no.       | # of blocks          | content     | type              |
//! |-----------------|----------------------|-------------|-------------------|
//! | 0               | 1                    | boot block  | (unused)          |
//! | 1               | 1                    | super block | [`SuperBlock`]    |
//! | `sb.logstart`   | `sb.nlog`            | log         | (reserved)        |
//! | `sb.inodestart` | `sb.ninodes / IPB`   | inode table | [`InodeBlock`]    |
//! | `sb.bmapstart`  | `sb.size / BPB`      | bitmap      | [`BmapBlock`]     |
//! | …               | `sb.nblocks`         | data blocks | raw bytes         |
//!
//! All multi-byte fields are little-endian; records are read and written as
//! plain-old-data views over whole blocks.

use core::{fmt, mem};

use dataview::{Pod, PodMethods as _};
use strum::FromRepr;

/// Block size in bytes.
pub const FS_BLOCK_SIZE: usize = 1024;

/// Number of blocks directly referenced by an inode.
pub const NUM_DIRECT_REFS: usize = 12;

/// Number of blocks referenced through the indirect block.
pub const NUM_INDIRECT_REFS: usize = FS_BLOCK_SIZE / mem::size_of::<u32>();

/// Largest file, in blocks.
pub const MAX_FILE: usize = NUM_DIRECT_REFS + NUM_INDIRECT_REFS;

/// File system block number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Pod)]
#[repr(transparent)]
pub struct BlockNo(u32);

impl fmt::Display for BlockNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl BlockNo {
    #[must_use]
    pub const fn new(n: u32) -> Self {
        Self(n)
    }

    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }

    #[must_use]
    pub fn as_index(&self) -> usize {
        self.0 as usize
    }
}

/// File system inode number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Pod)]
#[repr(transparent)]
pub struct InodeNo(u32);

impl fmt::Display for InodeNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl InodeNo {
    /// The root directory's inode number.
    pub const ROOT: Self = Self::new(1);

    #[must_use]
    pub const fn new(n: u32) -> Self {
        Self(n)
    }

    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }

    #[must_use]
    pub fn as_index(&self) -> usize {
        self.0 as usize
    }
}

/// Super block of the file system.
#[derive(Clone, Pod)]
#[repr(C)]
pub struct SuperBlock {
    /// Magic number. Must be [`Self::FS_MAGIC`].
    pub magic: u32,
    /// Size of file system image (blocks).
    pub size: u32,
    /// Number of data blocks.
    pub nblocks: u32,
    /// Number of inodes.
    pub ninodes: u32,
    /// Number of log blocks.
    pub nlog: u32,
    /// Block number of first log block.
    pub logstart: u32,
    /// Block number of first inode block.
    pub inodestart: u32,
    /// Block number of first free map block.
    pub bmapstart: u32,
}

impl SuperBlock {
    pub const FS_MAGIC: u32 = 0x1020_3040;

    pub const SUPER_BLOCK_NO: BlockNo = BlockNo::new(1);

    /// Returns the block number that contains the specified inode.
    #[must_use]
    pub fn inode_block(&self, ino: InodeNo) -> BlockNo {
        let block_index = u32::try_from(ino.as_index() / INODE_PER_BLOCK).unwrap();
        BlockNo::new(self.inodestart + block_index)
    }

    /// Returns the block number of the bitmap block covering block `bn`.
    #[must_use]
    pub fn bmap_block(&self, bn: usize) -> BlockNo {
        let block_index = u32::try_from(bn / BITS_PER_BLOCK).unwrap();
        BlockNo::new(self.bmapstart + block_index)
    }
}

/// File types stored in an inode's `ty` field.
///
/// On disk, `0` marks a free inode; a live inode carries one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
#[repr(i16)]
pub enum FileType {
    Dir = 1,
    File = 2,
    Device = 3,
}

/// On-disk inode.
#[derive(Pod)]
#[repr(C)]
pub struct Inode {
    /// File type; `0` means the inode is free.
    pub ty: i16,
    /// Major device number ([`FileType::Device`] only).
    pub major: i16,
    /// Minor device number ([`FileType::Device`] only).
    pub minor: i16,
    /// Number of links to inode in file system.
    pub nlink: i16,
    /// Size of file (bytes).
    pub size: u32,
    /// Data block addresses; slot [`NUM_DIRECT_REFS`] addresses the
    /// indirect block.
    pub addrs: [u32; NUM_DIRECT_REFS + 1],
}

impl Inode {
    #[must_use]
    pub fn is_free(&self) -> bool {
        self.ty == 0
    }

    #[must_use]
    pub fn file_type(&self) -> Option<FileType> {
        FileType::from_repr(self.ty)
    }

    /// Marks a free inode as allocated with type `ty`, zeroing everything
    /// else.
    pub fn allocate(&mut self, ty: FileType) {
        assert_eq!(self.ty, 0, "allocating in-use inode");
        *self = Self::zeroed();
        self.ty = ty as i16;
    }

    pub fn write_addrs(&mut self, addrs: &[Option<BlockNo>; NUM_DIRECT_REFS + 1]) {
        for (dst, src) in self.addrs.iter_mut().zip(addrs) {
            *dst = src.map_or(0, |bn| {
                assert_ne!(bn.value(), 0);
                bn.value()
            });
        }
    }

    pub fn read_addrs(&self, addrs: &mut [Option<BlockNo>; NUM_DIRECT_REFS + 1]) {
        for (dst, src) in addrs.iter_mut().zip(&self.addrs) {
            *dst = if *src == 0 {
                None
            } else {
                Some(BlockNo::new(*src))
            };
        }
    }
}

/// Inodes per block.
pub const INODE_PER_BLOCK: usize = FS_BLOCK_SIZE / mem::size_of::<Inode>();

/// A whole block of the inode table.
#[derive(Pod)]
#[repr(transparent)]
pub struct InodeBlock([Inode; INODE_PER_BLOCK]);

impl InodeBlock {
    #[must_use]
    pub fn inode(&self, ino: InodeNo) -> &Inode {
        &self.0[ino.as_index() % INODE_PER_BLOCK]
    }

    #[must_use]
    pub fn inode_mut(&mut self, ino: InodeNo) -> &mut Inode {
        &mut self.0[ino.as_index() % INODE_PER_BLOCK]
    }
}

/// Bitmap bits per block.
pub const BITS_PER_BLOCK: usize = FS_BLOCK_SIZE * 8;

/// A free-map block; bit `n` is set iff block `n` (within this block's
/// coverage) is allocated.
#[derive(Pod)]
#[repr(transparent)]
pub struct BmapBlock([u8; FS_BLOCK_SIZE]);

impl BmapBlock {
    #[must_use]
    pub fn bit(&self, n: usize) -> bool {
        assert!(n < BITS_PER_BLOCK);
        self.0[n / 8] & (1 << (n % 8)) != 0
    }

    pub fn set_bit(&mut self, n: usize) {
        assert!(n < BITS_PER_BLOCK);
        self.0[n / 8] |= 1 << (n % 8);
    }

    pub fn clear_bit(&mut self, n: usize) {
        assert!(n < BITS_PER_BLOCK);
        self.0[n / 8] &= !(1 << (n % 8));
    }
}

/// The indirect block: an array of data block addresses.
#[derive(Pod)]
#[repr(transparent)]
pub struct IndirectBlock([u32; NUM_INDIRECT_REFS]);

impl IndirectBlock {
    #[must_use]
    pub fn get(&self, i: usize) -> Option<BlockNo> {
        if self.0[i] == 0 {
            None
        } else {
            Some(BlockNo::new(self.0[i]))
        }
    }

    pub fn set(&mut self, i: usize, n: Option<BlockNo>) {
        self.0[i] = n.map_or(0, |n| {
            assert_ne!(n.value(), 0);
            n.value()
        });
    }

    /// Takes every address out of the block, leaving it zeroed.
    pub fn drain(&mut self) -> impl Iterator<Item = Option<BlockNo>> + '_ {
        self.0.iter_mut().map(|n| {
            let n = mem::take(n);
            if n == 0 { None } else { Some(BlockNo::new(n)) }
        })
    }
}

/// Length of the fixed-width name field of a directory entry.
pub const DIR_SIZE: usize = 62;

/// A directory entry. A directory is a file containing a sequence of these.
///
/// An entry with inode number 0 is a free slot. The name is NUL-padded; a
/// name of exactly [`DIR_SIZE`] bytes has no terminator, and lookups compare
/// at most [`DIR_SIZE`] bytes.
#[derive(Debug, Pod)]
#[repr(C)]
pub struct DirEntry {
    ino: u16,
    name: [u8; DIR_SIZE],
}

impl DirEntry {
    #[must_use]
    pub fn ino(&self) -> Option<InodeNo> {
        if self.ino == 0 {
            None
        } else {
            Some(InodeNo::new(self.ino.into()))
        }
    }

    pub fn set_ino(&mut self, ino: Option<InodeNo>) {
        if let Some(ino) = ino {
            assert_ne!(ino.value(), 0);
            self.ino = ino.value().try_into().unwrap();
        } else {
            self.ino = 0;
        }
    }

    /// The stored name, up to the first NUL.
    #[must_use]
    pub fn name(&self) -> &[u8] {
        let len = memchr::memchr(0, &self.name).unwrap_or(self.name.len());
        &self.name[..len]
    }

    /// Compares against `name`, looking at the first [`DIR_SIZE`] bytes only.
    #[must_use]
    pub fn is_same_name(&self, name: &[u8]) -> bool {
        let len = usize::min(name.len(), DIR_SIZE);
        self.name() == &name[..len]
    }

    /// Stores `name`, truncating to [`DIR_SIZE`] bytes and NUL-padding the
    /// remainder.
    pub fn set_name(&mut self, name: &[u8]) {
        let len = usize::min(name.len(), self.name.len());
        self.name[..len].copy_from_slice(&name[..len]);
        self.name[len..].fill(0);
    }
}

const _: () = {
    assert!(mem::size_of::<SuperBlock>() == 32);
    assert!(mem::size_of::<Inode>() == 64);
    assert!(mem::size_of::<DirEntry>() == 64);
    assert!(mem::size_of::<InodeBlock>() == FS_BLOCK_SIZE);
    assert!(mem::size_of::<BmapBlock>() == FS_BLOCK_SIZE);
    assert!(mem::size_of::<IndirectBlock>() == FS_BLOCK_SIZE);
    assert!(FS_BLOCK_SIZE % mem::size_of::<Inode>() == 0);
    assert!(FS_BLOCK_SIZE % mem::size_of::<DirEntry>() == 0);
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inode_per_block() {
        assert_eq!(INODE_PER_BLOCK, 16);
        assert_eq!(NUM_INDIRECT_REFS, 256);
        assert_eq!(MAX_FILE, 268);
    }

    #[test]
    fn bmap_bits() {
        let mut b = BmapBlock::zeroed();
        assert!(!b.bit(0));
        b.set_bit(0);
        b.set_bit(17);
        assert!(b.bit(0));
        assert!(b.bit(17));
        assert!(!b.bit(16));
        b.clear_bit(17);
        assert!(!b.bit(17));
    }

    #[test]
    fn dirent_name_roundtrip() {
        let mut de = DirEntry::zeroed();
        de.set_name(b"hello");
        de.set_ino(Some(InodeNo::new(7)));
        assert_eq!(de.name(), b"hello");
        assert_eq!(de.ino(), Some(InodeNo::new(7)));
        assert!(de.is_same_name(b"hello"));
        assert!(!de.is_same_name(b"hellx"));
        assert!(!de.is_same_name(b"hell"));
    }

    #[test]
    fn dirent_name_truncates_without_terminator() {
        let long = [b'a'; DIR_SIZE + 10];
        let mut de = DirEntry::zeroed();
        de.set_name(&long);
        // Stored name fills the field; any request sharing the first
        // DIR_SIZE bytes matches.
        assert_eq!(de.name().len(), DIR_SIZE);
        assert!(de.is_same_name(&long));
        assert!(de.is_same_name(&[b'a'; DIR_SIZE]));
        assert!(!de.is_same_name(&[b'a'; DIR_SIZE - 1]));
    }

    #[test]
    fn free_slot_has_no_ino() {
        let de = DirEntry::zeroed();
        assert_eq!(de.ino(), None);
    }

    #[test]
    fn indirect_drain_zeroes() {
        let mut ind = IndirectBlock::zeroed();
        ind.set(0, Some(BlockNo::new(100)));
        ind.set(255, Some(BlockNo::new(101)));
        let got: Vec<_> = ind.drain().flatten().collect();
        assert_eq!(got, vec![BlockNo::new(100), BlockNo::new(101)]);
        assert_eq!(ind.get(0), None);
        assert_eq!(ind.get(255), None);
    }
}
