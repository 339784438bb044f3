//! Directories: an inode whose contents are a sequence of fixed-size
//! entries.

use dataview::PodMethods as _;
use xv6fs_types::{DirEntry, InodeNo};

use crate::{Disk, FsError, Xv6Fs, inode::InodeRef};

const DE_SIZE: usize = size_of::<DirEntry>();

impl<D: Disk> Xv6Fs<D> {
    /// Looks for an entry named `name` in directory `dp`.
    ///
    /// On a hit, returns a referenced inode for the entry and the entry's
    /// byte offset within the directory. The caller owes an `inode_put`.
    ///
    /// # Panics
    ///
    /// Panics if `dp` is not a directory; callers establish that during
    /// path resolution.
    pub(crate) fn dir_lookup(
        &mut self,
        dp: InodeRef,
        name: &[u8],
    ) -> Option<(InodeRef, usize)> {
        assert!(self.idata(dp).is_dir(), "dirlookup not DIR");

        let size = self.idata(dp).size as usize;
        for off in (0..size).step_by(DE_SIZE) {
            let de: DirEntry = self.read_inode_as(dp, off);
            let Some(inum) = de.ino() else { continue };
            if !de.is_same_name(name) {
                continue;
            }
            return Some((self.inode_get(inum), off));
        }
        None
    }

    /// Writes a new directory entry (`name`, `inum`) into directory `dp`,
    /// reusing the first free slot or appending.
    pub(crate) fn dir_link(
        &mut self,
        dp: InodeRef,
        name: &[u8],
        inum: InodeNo,
    ) -> Result<(), FsError> {
        // Check that name is not present.
        if let Some((ip, _off)) = self.dir_lookup(dp, name) {
            self.inode_put(ip);
            return Err(FsError::AlreadyExists);
        }

        // Look for an empty dirent.
        let size = self.idata(dp).size as usize;
        debug_assert_eq!(size % DE_SIZE, 0);
        let mut off = size;
        for o in (0..size).step_by(DE_SIZE) {
            let de: DirEntry = self.read_inode_as(dp, o);
            if de.ino().is_none() {
                off = o;
                break;
            }
        }

        let mut de = DirEntry::zeroed();
        de.set_name(name);
        de.set_ino(Some(inum));
        self.write_inode_data(dp, off, &de)
    }

    /// Returns whether directory `dp` is empty except for `"."` and `".."`.
    pub(crate) fn dir_is_empty(&mut self, dp: InodeRef) -> bool {
        let size = self.idata(dp).size as usize;
        // Skip the first two entries ("." and "..").
        for off in (2 * DE_SIZE..size).step_by(DE_SIZE) {
            let de: DirEntry = self.read_inode_as(dp, off);
            if de.ino().is_some() {
                return false;
            }
        }
        true
    }
}
