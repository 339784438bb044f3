//! Path resolution.

use xv6fs_types::{DIR_SIZE, InodeNo};

use crate::{Disk, FsError, Xv6Fs, inode::InodeRef};

/// Copies the next path element out of `path`.
///
/// Returns the element and the remainder of the path with its leading
/// slashes removed, so the caller can check for emptiness to see whether
/// the element was the last one. Returns `None` if there is no element.
///
/// # Examples
///
/// ```text
/// skip_elem(b"a/bb/c") == Some((b"a", b"bb/c"))
/// skip_elem(b"///a//bb") == Some((b"a", b"bb"))
/// skip_elem(b"a") == Some((b"a", b""))
/// skip_elem(b"") == skip_elem(b"////") == None
/// ```
fn skip_elem(path: &[u8]) -> Option<(&[u8], &[u8])> {
    let start = path.iter().position(|&c| c != b'/')?;
    let path = &path[start..];
    let end = path.iter().position(|&c| c == b'/').unwrap_or(path.len());
    let elem = &path[..end];
    let path = &path[end..];
    let next = path.iter().position(|&c| c != b'/').unwrap_or(path.len());
    Some((elem, &path[next..]))
}

impl<D: Disk> Xv6Fs<D> {
    /// Looks up the inode for `path`.
    ///
    /// If `parent` is true, stops one level early, returning the inode for
    /// the parent directory and leaving the final path element in
    /// `name_out` (truncated to [`DIR_SIZE`] bytes, NUL-padded, matching
    /// how directory entries store names).
    fn resolve_impl(
        &mut self,
        path: &[u8],
        parent: bool,
        mut name_out: Option<&mut [u8; DIR_SIZE]>,
    ) -> Result<InodeRef, FsError> {
        let mut ip = if path.first() == Some(&b'/') {
            self.inode_get(InodeNo::ROOT)
        } else {
            let cwd = self.client.cwd().expect("client has no cwd");
            self.inode_dup(cwd)
        };

        let mut path = path;
        while let Some((name, rest)) = skip_elem(path) {
            path = rest;
            if let Some(name_out) = &mut name_out {
                let copy_len = usize::min(name.len(), name_out.len());
                name_out[..copy_len].copy_from_slice(&name[..copy_len]);
                name_out[copy_len..].fill(0);
            }

            self.inode_load(ip);
            if !self.idata(ip).is_dir() {
                self.inode_put(ip);
                return Err(FsError::EntryNotFound);
            }

            if parent && path.is_empty() {
                // Stop one level early.
                return Ok(ip);
            }

            let Some((next, _off)) = self.dir_lookup(ip, name) else {
                self.inode_put(ip);
                return Err(FsError::EntryNotFound);
            };
            self.inode_put(ip);
            ip = next;
        }

        if parent {
            self.inode_put(ip);
            return Err(FsError::EntryNotFound);
        }
        Ok(ip)
    }

    /// Resolves `path` to a referenced inode.
    pub(crate) fn resolve_path(&mut self, path: &[u8]) -> Result<InodeRef, FsError> {
        self.resolve_impl(path, false, None)
    }

    /// Resolves `path` to its parent directory and final element.
    pub(crate) fn resolve_path_parent<'n>(
        &mut self,
        path: &[u8],
        name: &'n mut [u8; DIR_SIZE],
    ) -> Result<(InodeRef, &'n [u8]), FsError> {
        let ip = self.resolve_impl(path, true, Some(name))?;
        let len = name.iter().position(|b| *b == 0).unwrap_or(name.len());
        Ok((ip, &name[..len]))
    }
}
