//! Composite name-space operations: create, unlink, link.

use dataview::PodMethods as _;
use log::debug;
use xv6fs_types::{DIR_SIZE, DirEntry, FileType};

use crate::{Disk, FsError, Xv6Fs, inode::InodeRef};

impl<D: Disk> Xv6Fs<D> {
    /// Creates `path` as a new inode of type `ty`.
    ///
    /// Returns a referenced, loaded inode. A path that already resolves is
    /// an error, whatever its type.
    pub(crate) fn create(
        &mut self,
        path: &[u8],
        ty: FileType,
        major: i16,
        minor: i16,
    ) -> Result<InodeRef, FsError> {
        let mut name = [0; DIR_SIZE];
        let (dp, name) = self.resolve_path_parent(path, &mut name)?;
        let name = name.to_vec();

        self.inode_load(dp);

        if let Some((ip, _off)) = self.dir_lookup(dp, &name) {
            self.inode_put(dp);
            self.inode_put(ip);
            return Err(FsError::AlreadyExists);
        }

        let ip = match self.inode_alloc(ty) {
            Ok(ip) => ip,
            Err(e) => {
                self.inode_put(dp);
                return Err(e);
            }
        };

        self.inode_load(ip);
        {
            let data = self.idata_mut(ip);
            data.major = major;
            data.minor = minor;
            data.nlink = 1;
        }
        self.inode_update(ip);

        let linked = (|| {
            let inum = self.inum_of(ip);
            if ty == FileType::Dir {
                // Create "." and ".." entries. No nlink bump for ".":
                // a directory referring to itself must not keep itself
                // alive.
                let parent_inum = self.inum_of(dp);
                self.dir_link(ip, b".", inum)?;
                self.dir_link(ip, b"..", parent_inum)?;
            }

            self.dir_link(dp, &name, inum)?;

            if ty == FileType::Dir {
                // now that success is guaranteed:
                self.idata_mut(dp).nlink += 1; // for ".."
                self.inode_update(dp);
            }
            Ok(())
        })();

        if let Err(e) = linked {
            // something went wrong; de-allocate ip
            self.idata_mut(ip).nlink = 0;
            self.inode_update(ip);
            self.inode_put(ip);
            self.inode_put(dp);
            return Err(e);
        }

        self.inode_put(dp);
        Ok(ip)
    }

    /// Removes the directory entry for `path`.
    pub(crate) fn unlink(&mut self, path: &[u8]) -> Result<(), FsError> {
        let mut name = [0; DIR_SIZE];
        let (dp, name) = self.resolve_path_parent(path, &mut name)?;
        let name = name.to_vec();

        self.inode_load(dp);

        // Cannot unlink "." or "..".
        if name == b"." || name == b".." {
            self.inode_put(dp);
            return Err(FsError::UnlinkDots);
        }

        let Some((ip, off)) = self.dir_lookup(dp, &name) else {
            self.inode_put(dp);
            return Err(FsError::EntryNotFound);
        };
        self.inode_load(ip);

        assert!(self.idata(ip).nlink >= 1, "unlink: nlink < 1");
        if self.idata(ip).is_dir() && !self.dir_is_empty(ip) {
            self.inode_put(ip);
            self.inode_put(dp);
            return Err(FsError::DirectoryNotEmpty);
        }

        let de = DirEntry::zeroed();
        self.write_inode_data(dp, off, &de)
            .expect("unlink: dirent write failed");
        if self.idata(ip).is_dir() {
            self.idata_mut(dp).nlink -= 1;
            self.inode_update(dp);
        }
        self.inode_put(dp);

        self.idata_mut(ip).nlink -= 1;
        self.inode_update(ip);
        self.inode_put(ip);

        debug!("unlink {:?}", String::from_utf8_lossy(path));
        Ok(())
    }

    /// Creates `new_path` as a link to the same inode as `old_path`.
    pub(crate) fn link(&mut self, old_path: &[u8], new_path: &[u8]) -> Result<(), FsError> {
        let ip = self.resolve_path(old_path)?;

        self.inode_load(ip);
        if self.idata(ip).is_dir() {
            self.inode_put(ip);
            return Err(FsError::LinkToDirectory);
        }

        self.idata_mut(ip).nlink += 1;
        self.inode_update(ip);

        let linked = (|| {
            let mut name = [0; DIR_SIZE];
            let (dp, name) = self.resolve_path_parent(new_path, &mut name)?;
            let name = name.to_vec();
            self.inode_load(dp);
            if !self.idata(dp).is_dir() {
                self.inode_put(dp);
                return Err(FsError::NotADirectory);
            }
            let inum = self.inum_of(ip);
            if let Err(e) = self.dir_link(dp, &name, inum) {
                self.inode_put(dp);
                return Err(e);
            }
            self.inode_put(dp);
            Ok(())
        })();

        if let Err(e) = linked {
            self.idata_mut(ip).nlink -= 1;
            self.inode_update(ip);
            self.inode_put(ip);
            return Err(e);
        }

        self.inode_put(ip);
        Ok(())
    }
}
