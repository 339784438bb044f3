//! Inodes.
//!
//! An inode describes a single unnamed file. The inode disk structure
//! holds metadata: the file's type, its size, the number of links
//! referring to it, and the list of blocks holding the file's content.
//!
//! The inodes are laid out sequentially on disk at block `sb.inodestart`.
//! Each inode has a number, indicating its position on the disk.
//!
//! The server keeps a fixed table of in-use inodes in memory. The
//! in-memory inodes carry book-keeping that is not stored on disk: the
//! reference count, and whether the disk copy has been loaded.
//!
//! An inode and its in-memory representation go through a sequence of
//! states before they can be used by the rest of the file system code:
//!
//! * Allocation: an inode is allocated if its type (on disk) is non-zero.
//!   `inode_alloc()` allocates, and `inode_put()` frees if the reference
//!   and link counts have fallen to zero.
//!
//! * Referencing in table: an entry in the inode table is free if its
//!   reference count is zero. Otherwise the count tracks the number of
//!   outstanding [`InodeRef`]s to the entry (open files and the current
//!   directory). `inode_get()` finds or creates a table entry and
//!   increments its count; `inode_put()` decrements it.
//!
//! * Loaded: the information (type, size, &c) in a table entry is only
//!   correct once `inode_load()` has read it from disk; `inode_put()`
//!   discards the cached copy when the count falls to zero.
//!
//! Thus a typical sequence is:
//!
//! ```text
//! let ip = fs.inode_get(inum);
//! fs.inode_load(ip);
//! ... examine and modify ...
//! fs.inode_put(ip);
//! ```
//!
//! The classic design interposes a per-inode sleep lock between `get` and
//! the loaded state; with the server strictly serial there is nothing to
//! hold the lock against, and `inode_load` keeps only the load-on-first-use
//! behavior. Every [`InodeRef`] handed out must be balanced by exactly one
//! `inode_put`.

use dataview::{Pod, PodMethods as _};
use log::warn;
use xv6fs_params::NINODE;
use xv6fs_types::{
    BlockNo, FS_BLOCK_SIZE, FileType, IndirectBlock, Inode, InodeBlock, InodeNo, MAX_FILE,
    NUM_DIRECT_REFS, NUM_INDIRECT_REFS,
};

use crate::{Disk, FsError, Xv6Fs};

/// A counted reference to an inode-table slot.
///
/// Plain index, deliberately cheap to copy; the holder owes the table one
/// `inode_put`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InodeRef(pub(crate) usize);

pub(crate) struct InodeTable {
    slots: Vec<InodeSlot>,
}

struct InodeSlot {
    dev: u32,
    inum: InodeNo,
    refcount: u32,
    /// In-memory copy of the disk inode; `None` until first load.
    data: Option<InodeData>,
}

/// In-memory copy of an inode.
#[derive(Clone)]
pub(crate) struct InodeData {
    pub(crate) ty: FileType,
    pub(crate) major: i16,
    pub(crate) minor: i16,
    pub(crate) nlink: i16,
    pub(crate) size: u32,
    pub(crate) addrs: [Option<BlockNo>; NUM_DIRECT_REFS + 1],
}

impl InodeData {
    fn from_repr(r: &Inode) -> Self {
        let ty = r.file_type().expect("inode load: no type");
        let mut addrs = [None; NUM_DIRECT_REFS + 1];
        r.read_addrs(&mut addrs);
        Self {
            ty,
            major: r.major,
            minor: r.minor,
            nlink: r.nlink,
            size: r.size,
            addrs,
        }
    }

    fn write_repr(&self, r: &mut Inode) {
        r.ty = self.ty as i16;
        r.major = self.major;
        r.minor = self.minor;
        r.nlink = self.nlink;
        r.size = self.size;
        r.write_addrs(&self.addrs);
    }

    pub(crate) fn is_dir(&self) -> bool {
        self.ty == FileType::Dir
    }
}

impl InodeTable {
    pub(crate) fn new() -> Self {
        Self {
            slots: (0..NINODE)
                .map(|_| InodeSlot {
                    dev: 0,
                    inum: InodeNo::new(0),
                    refcount: 0,
                    data: None,
                })
                .collect(),
        }
    }

    pub(crate) fn live(&self) -> usize {
        self.slots.iter().filter(|s| s.refcount > 0).count()
    }
}

impl<D: Disk> Xv6Fs<D> {
    /// Finds the inode with number `inum` and returns a counted reference
    /// to its table entry, claiming a free slot if it is not resident.
    ///
    /// Does not read the inode from disk.
    ///
    /// # Panics
    ///
    /// Panics if the table is full — the working set of a single client
    /// fits in [`NINODE`] by construction, so overflow is a server bug.
    pub(crate) fn inode_get(&mut self, inum: InodeNo) -> InodeRef {
        let mut empty = None;
        for (i, slot) in self.itable.slots.iter_mut().enumerate() {
            if slot.refcount > 0 && slot.dev == self.dev && slot.inum == inum {
                slot.refcount += 1;
                return InodeRef(i);
            }
            if empty.is_none() && slot.refcount == 0 {
                empty = Some(i);
            }
        }

        let Some(i) = empty else {
            panic!("iget: no inodes");
        };
        let slot = &mut self.itable.slots[i];
        slot.dev = self.dev;
        slot.inum = inum;
        slot.refcount = 1;
        slot.data = None;
        InodeRef(i)
    }

    /// Increments the reference count for `ip`.
    ///
    /// Returns `ip` to enable the `let ip = fs.inode_dup(ip);` idiom.
    pub(crate) fn inode_dup(&mut self, ip: InodeRef) -> InodeRef {
        self.itable.slots[ip.0].refcount += 1;
        ip
    }

    /// Loads the inode from disk if it is not already in memory.
    pub(crate) fn inode_load(&mut self, ip: InodeRef) {
        let slot = &self.itable.slots[ip.0];
        assert!(slot.refcount > 0);
        if slot.data.is_some() {
            return;
        }

        let inum = slot.inum;
        let data = {
            let mut br = self.cache.get(self.sb.inode_block(inum).as_index());
            let bg = br.lock().read().unwrap();
            InodeData::from_repr(bg.data::<InodeBlock>().inode(inum))
        };
        self.itable.slots[ip.0].data = Some(data);
    }

    /// Copies the modified in-memory inode to disk.
    ///
    /// Must be called after every change to a field that lives on disk.
    pub(crate) fn inode_update(&mut self, ip: InodeRef) {
        let inum = self.inum_of(ip);
        let data = self.idata(ip).clone();
        let mut br = self.cache.get(self.sb.inode_block(inum).as_index());
        let mut bg = br.lock().read().unwrap();
        data.write_repr(bg.data_mut::<InodeBlock>().inode_mut(inum));
        bg.write().unwrap();
    }

    /// Drops a reference to an in-memory inode.
    ///
    /// If that was the last reference, the table entry can be recycled.
    /// If that was the last reference and the inode has no links to it,
    /// the inode (and its content) is freed on disk.
    pub(crate) fn inode_put(&mut self, ip: InodeRef) {
        let slot = &self.itable.slots[ip.0];
        assert!(slot.refcount > 0, "iput of unreferenced inode");

        if slot.refcount == 1 && slot.data.as_ref().is_some_and(|d| d.nlink == 0) {
            // no links and no other references: truncate and free
            self.inode_trunc(ip);

            let inum = self.inum_of(ip);
            {
                let mut br = self.cache.get(self.sb.inode_block(inum).as_index());
                let mut bg = br.lock().read().unwrap();
                *bg.data_mut::<InodeBlock>().inode_mut(inum) = Inode::zeroed();
                bg.write().unwrap();
            }
            self.itable.slots[ip.0].data = None;
        }

        self.itable.slots[ip.0].refcount -= 1;
    }

    /// Allocates an inode on disk, marked with type `ty`.
    ///
    /// Returns a referenced (but not loaded) inode.
    pub(crate) fn inode_alloc(&mut self, ty: FileType) -> Result<InodeRef, FsError> {
        for inum in 1..self.sb.ninodes {
            let inum = InodeNo::new(inum);
            let free = {
                let mut br = self.cache.get(self.sb.inode_block(inum).as_index());
                let mut bg = br.lock().read().unwrap();
                let dip = bg.data_mut::<InodeBlock>().inode_mut(inum);
                if dip.is_free() {
                    dip.allocate(ty);
                    bg.write().unwrap();
                    true
                } else {
                    false
                }
            };
            if free {
                return Ok(self.inode_get(inum));
            }
        }
        warn!("ialloc: no inodes");
        Err(FsError::OutOfInodes)
    }

    pub(crate) fn inum_of(&self, ip: InodeRef) -> InodeNo {
        self.itable.slots[ip.0].inum
    }

    /// The loaded contents of `ip`.
    ///
    /// # Panics
    ///
    /// Panics if the inode has not been loaded.
    pub(crate) fn idata(&self, ip: InodeRef) -> &InodeData {
        self.itable.slots[ip.0].data.as_ref().expect("inode not loaded")
    }

    pub(crate) fn idata_mut(&mut self, ip: InodeRef) -> &mut InodeData {
        self.itable.slots[ip.0].data.as_mut().expect("inode not loaded")
    }

    // Inode content.
    //
    // The content (data) associated with each inode is stored in blocks on
    // the disk. The first NUM_DIRECT_REFS block numbers are listed in
    // `addrs[]`; the next NUM_INDIRECT_REFS are listed in the block at
    // `addrs[NUM_DIRECT_REFS]`.

    /// Returns the disk block backing file block `ibn` of inode `ip`,
    /// allocating on demand.
    ///
    /// Returns `None` if out of disk space.
    ///
    /// # Panics
    ///
    /// Panics if `ibn` is beyond the representable file size.
    pub(crate) fn block_map(&mut self, ip: InodeRef, ibn: usize) -> Option<BlockNo> {
        if ibn < NUM_DIRECT_REFS {
            if let Some(bn) = self.idata(ip).addrs[ibn] {
                return Some(bn);
            }
            let bn = self.block_alloc()?;
            self.idata_mut(ip).addrs[ibn] = Some(bn);
            return Some(bn);
        }

        let ibn = ibn - NUM_DIRECT_REFS;
        if ibn < NUM_INDIRECT_REFS {
            // Load the indirect block, allocating if necessary.
            let (ind_bn, newly_allocated) = match self.idata(ip).addrs[NUM_DIRECT_REFS] {
                Some(bn) => (bn, false),
                None => {
                    let bn = self.block_alloc()?;
                    self.idata_mut(ip).addrs[NUM_DIRECT_REFS] = Some(bn);
                    (bn, true)
                }
            };

            if !newly_allocated {
                let mut br = self.cache.get(ind_bn.as_index());
                let bg = br.lock().read().unwrap();
                if let Some(bn) = bg.data::<IndirectBlock>().get(ibn) {
                    return Some(bn);
                }
            }

            let bn = self.block_alloc()?;
            let mut br = self.cache.get(ind_bn.as_index());
            let mut bg = br.lock().read().unwrap();
            bg.data_mut::<IndirectBlock>().set(ibn, Some(bn));
            bg.write().unwrap();
            return Some(bn);
        }

        panic!("bmap: out of range: ibn={ibn}");
    }

    /// Truncates inode (discard contents).
    pub(crate) fn inode_trunc(&mut self, ip: InodeRef) {
        for i in 0..NUM_DIRECT_REFS {
            if let Some(bn) = self.idata_mut(ip).addrs[i].take() {
                self.block_free(bn);
            }
        }

        if let Some(ind_bn) = self.idata_mut(ip).addrs[NUM_DIRECT_REFS].take() {
            let refs: Vec<BlockNo> = {
                let mut br = self.cache.get(ind_bn.as_index());
                let mut bg = br.lock().read().unwrap();
                bg.data_mut::<IndirectBlock>().drain().flatten().collect()
            };
            for bn in refs {
                self.block_free(bn);
            }
            self.block_free(ind_bn);
        }

        self.idata_mut(ip).size = 0;
        self.inode_update(ip);
    }

    /// Copies stat information from the (loaded) inode.
    pub(crate) fn stat_inode(&self, ip: InodeRef) -> service_proto::Stat {
        let data = self.idata(ip);
        service_proto::Stat {
            dev: self.dev,
            ino: self.inum_of(ip).value(),
            mode: (data.ty as u16) << 14,
            nlink: data.nlink,
            padding: [0; 4],
            size: u64::from(data.size),
        }
    }

    /// Reads data from the inode into `dst`, starting at byte `off`.
    ///
    /// Returns the number of bytes read; reads past the end are clipped,
    /// and an offset beyond the end reads nothing.
    pub(crate) fn read_inode(&mut self, ip: InodeRef, dst: &mut [u8], off: usize) -> usize {
        let size = self.idata(ip).size as usize;
        let mut n = dst.len();
        if off > size || off.checked_add(n).is_none() {
            return 0;
        }
        if off + n > size {
            n = size - off;
        }

        let mut tot = 0;
        while tot < n {
            let off = off + tot;
            let Some(bn) = self.block_map(ip, off / FS_BLOCK_SIZE) else {
                break;
            };
            let mut br = self.cache.get(bn.as_index());
            let bg = br.lock().read().unwrap();
            let m = usize::min(n - tot, FS_BLOCK_SIZE - off % FS_BLOCK_SIZE);
            dst[tot..tot + m].copy_from_slice(&bg.bytes()[off % FS_BLOCK_SIZE..][..m]);
            tot += m;
        }
        tot
    }

    /// Reads a POD record out of the inode at byte `off`.
    ///
    /// # Panics
    ///
    /// Panics on a short read; record-granular contents (directory
    /// entries) never end mid-record on an intact image.
    pub(crate) fn read_inode_as<T: Pod>(&mut self, ip: InodeRef, off: usize) -> T {
        let mut val = T::zeroed();
        let read = self.read_inode(ip, val.as_bytes_mut(), off);
        assert_eq!(read, size_of::<T>(), "inode short read");
        val
    }

    /// Writes `src` into the inode starting at byte `off`, growing the file
    /// as needed. Writing past the current end leaves a hole.
    ///
    /// Returns the number of bytes written, which is less than requested
    /// only if the disk fills up mid-write.
    pub(crate) fn write_inode(
        &mut self,
        ip: InodeRef,
        src: &[u8],
        off: usize,
    ) -> Result<usize, FsError> {
        let n = src.len();
        if off.checked_add(n).is_none() {
            return Err(FsError::InvalidOffset);
        }
        if off + n > MAX_FILE * FS_BLOCK_SIZE {
            return Err(FsError::FileTooLarge);
        }

        let mut tot = 0;
        while tot < n {
            let off = off + tot;
            let Some(bn) = self.block_map(ip, off / FS_BLOCK_SIZE) else {
                break;
            };
            let mut br = self.cache.get(bn.as_index());
            let mut bg = br.lock().read().unwrap();
            let m = usize::min(n - tot, FS_BLOCK_SIZE - off % FS_BLOCK_SIZE);
            bg.bytes_mut()[off % FS_BLOCK_SIZE..][..m].copy_from_slice(&src[tot..tot + m]);
            bg.write().unwrap();
            tot += m;
        }

        if off + tot > self.idata(ip).size as usize {
            self.idata_mut(ip).size = (off + tot) as u32;
        }
        // Write the inode back even if the size didn't change: the loop may
        // have grown `addrs` through block_map.
        self.inode_update(ip);

        Ok(tot)
    }

    /// Writes a POD record into the inode at byte `off`.
    pub(crate) fn write_inode_data<T: Pod>(
        &mut self,
        ip: InodeRef,
        off: usize,
        data: &T,
    ) -> Result<(), FsError> {
        let written = self.write_inode(ip, data.as_bytes(), off)?;
        if written != size_of::<T>() {
            return Err(FsError::OutOfBlocks);
        }
        Ok(())
    }
}
