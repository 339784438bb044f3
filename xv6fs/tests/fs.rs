//! Whole-filesystem tests against an in-process ramdisk, no transports.

use block_io::BlockDevice as _;
use dataview::PodMethods as _;
use ramdisk::Ramdisk;
use service_proto::{OpenFlags, Whence};
use xv6fs::{FsError, Xv6Fs};
use xv6fs_params::{FS_SIZE, NOFILE, RESERVED_FDS};
use xv6fs_types::{DIR_SIZE, FS_BLOCK_SIZE, MAX_FILE, NUM_DIRECT_REFS, SuperBlock};

fn read_block(disk: &Ramdisk, bn: usize) -> [u8; FS_BLOCK_SIZE] {
    let mut buf = [0; FS_BLOCK_SIZE];
    (&disk).read(bn, &mut buf).unwrap();
    buf
}

fn snapshot(disk: &Ramdisk) -> Vec<u8> {
    let mut image = Vec::with_capacity(FS_SIZE * FS_BLOCK_SIZE);
    for bn in 0..FS_SIZE {
        image.extend_from_slice(&read_block(disk, bn));
    }
    image
}

/// Number of blocks marked allocated in the bitmap.
fn bitmap_used(disk: &Ramdisk, sb: &SuperBlock) -> usize {
    let buf = read_block(disk, sb.bmapstart as usize);
    buf.iter().map(|b| b.count_ones() as usize).sum()
}

#[test]
fn fresh_image_root_stat() {
    let disk = Ramdisk::new(FS_SIZE);
    let mut fs = Xv6Fs::init(&disk);

    let st = fs.lstat(b"/").unwrap();
    assert_eq!(st.mode >> 14, 1); // directory
    assert_eq!(st.nlink, 1);
    assert_eq!(st.size, FS_BLOCK_SIZE as u64);
    assert_eq!(st.ino, 1);
}

#[test]
fn create_write_read_back() {
    let disk = Ramdisk::new(FS_SIZE);
    let mut fs = Xv6Fs::init(&disk);

    let fd = fs
        .open(b"/hello", OpenFlags::CREATE | OpenFlags::READ_WRITE)
        .unwrap() as u64;
    assert_eq!(fs.write(fd, b"abc").unwrap(), 3);
    fs.lseek(fd, 0, Whence::Set).unwrap();
    let mut buf = [0; 3];
    assert_eq!(fs.read(fd, &mut buf).unwrap(), 3);
    assert_eq!(&buf, b"abc");
    assert_eq!(fs.fstat(fd).unwrap().size, 3);
    assert_eq!(fs.fstat(fd).unwrap().mode >> 14, 2); // regular file
    fs.close(fd).unwrap();
}

#[test]
fn indirect_block_boundary() {
    let disk = Ramdisk::new(FS_SIZE);
    let mut fs = Xv6Fs::init(&disk);
    let sb = fs.superblock().clone();
    let before = bitmap_used(&disk, &sb);

    let n = NUM_DIRECT_REFS * FS_BLOCK_SIZE + 1; // 12289
    let data: Vec<u8> = (0..n).map(|i| (i % 251) as u8).collect();

    let fd = fs
        .open(b"/big", OpenFlags::CREATE | OpenFlags::READ_WRITE)
        .unwrap() as u64;
    assert_eq!(fs.write(fd, &data).unwrap(), n);
    assert_eq!(fs.fstat(fd).unwrap().size, n as u64);

    let mut last = [0; 1];
    assert_eq!(fs.pread(fd, &mut last, (n - 1) as i64).unwrap(), 1);
    assert_eq!(last[0], data[n - 1]);

    // 13 data blocks plus the indirect block itself.
    assert_eq!(bitmap_used(&disk, &sb) - before, NUM_DIRECT_REFS + 2);
    fs.close(fd).unwrap();
}

#[test]
fn unlink_reclaims_inode_and_blocks() {
    let disk = Ramdisk::new(FS_SIZE);
    let mut fs = Xv6Fs::init(&disk);
    let sb = fs.superblock().clone();
    let baseline = bitmap_used(&disk, &sb);

    let fd = fs
        .open(b"/a", OpenFlags::CREATE | OpenFlags::READ_WRITE)
        .unwrap() as u64;
    fs.write(fd, &[b'x'; FS_BLOCK_SIZE]).unwrap();
    let ino_a = fs.fstat(fd).unwrap().ino;
    fs.close(fd).unwrap();
    assert_eq!(bitmap_used(&disk, &sb), baseline + 1);

    fs.sys_unlink(b"/a").unwrap();
    // Data block free again once the last reference went away.
    assert_eq!(bitmap_used(&disk, &sb), baseline);

    // First-free allocation hands the same inode to the next create.
    let fd = fs.open(b"/b", OpenFlags::CREATE).unwrap() as u64;
    assert_eq!(fs.fstat(fd).unwrap().ino, ino_a);
    fs.close(fd).unwrap();
}

#[test]
fn unlink_waits_for_last_close() {
    let disk = Ramdisk::new(FS_SIZE);
    let mut fs = Xv6Fs::init(&disk);
    let sb = fs.superblock().clone();
    let baseline = bitmap_used(&disk, &sb);

    let fd = fs
        .open(b"/a", OpenFlags::CREATE | OpenFlags::READ_WRITE)
        .unwrap() as u64;
    fs.write(fd, &[b'x'; FS_BLOCK_SIZE]).unwrap();
    fs.sys_unlink(b"/a").unwrap();

    // Still open: contents remain reachable through the descriptor.
    let mut buf = [0; 4];
    assert_eq!(fs.pread(fd, &mut buf, 0).unwrap(), 4);
    assert_eq!(&buf, b"xxxx");
    assert_eq!(bitmap_used(&disk, &sb), baseline + 1);

    fs.close(fd).unwrap();
    assert_eq!(bitmap_used(&disk, &sb), baseline);
}

#[test]
fn unlink_refuses_nonempty_dir() {
    let disk = Ramdisk::new(FS_SIZE);
    let mut fs = Xv6Fs::init(&disk);

    fs.mkdir(b"/d").unwrap();
    let fd = fs.open(b"/d/f", OpenFlags::CREATE).unwrap() as u64;
    fs.close(fd).unwrap();

    assert_eq!(fs.sys_unlink(b"/d"), Err(FsError::DirectoryNotEmpty));
    assert!(fs.lstat(b"/d").is_ok());

    fs.sys_unlink(b"/d/f").unwrap();
    fs.sys_unlink(b"/d").unwrap();
    assert_eq!(fs.lstat(b"/d"), Err(FsError::EntryNotFound));
}

#[test]
fn unlink_refuses_dot_entries() {
    let disk = Ramdisk::new(FS_SIZE);
    let mut fs = Xv6Fs::init(&disk);

    fs.mkdir(b"/d").unwrap();
    assert_eq!(fs.sys_unlink(b"/d/."), Err(FsError::UnlinkDots));
    assert_eq!(fs.sys_unlink(b"/d/.."), Err(FsError::UnlinkDots));
    assert!(fs.lstat(b"/d").is_ok());
}

#[test]
fn mkdir_existing_fails_without_state_change() {
    let disk = Ramdisk::new(FS_SIZE);
    let mut fs = Xv6Fs::init(&disk);

    fs.mkdir(b"/d").unwrap();
    let before = snapshot(&disk);
    assert_eq!(fs.mkdir(b"/d"), Err(FsError::AlreadyExists));
    assert_eq!(snapshot(&disk), before);
}

#[test]
fn create_on_existing_file_fails() {
    let disk = Ramdisk::new(FS_SIZE);
    let mut fs = Xv6Fs::init(&disk);

    let fd = fs.open(b"/x", OpenFlags::CREATE).unwrap() as u64;
    fs.close(fd).unwrap();
    assert_eq!(
        fs.open(b"/x", OpenFlags::CREATE),
        Err(FsError::AlreadyExists)
    );
    // Without CREATE the existing file opens fine.
    let fd = fs.open(b"/x", OpenFlags::READ_ONLY).unwrap() as u64;
    fs.close(fd).unwrap();
}

#[test]
fn fd_table_starts_at_three_and_recycles() {
    let disk = Ramdisk::new(FS_SIZE);
    let mut fs = Xv6Fs::init(&disk);

    let fd1 = fs.open(b"/a", OpenFlags::CREATE).unwrap();
    let fd2 = fs.open(b"/b", OpenFlags::CREATE).unwrap();
    assert_eq!(fd1, RESERVED_FDS);
    assert_eq!(fd2, RESERVED_FDS + 1);

    fs.close(fd1 as u64).unwrap();
    let fd3 = fs.open(b"/c", OpenFlags::CREATE).unwrap();
    assert_eq!(fd3, RESERVED_FDS);
    fs.close(fd2 as u64).unwrap();
    fs.close(fd3 as u64).unwrap();
}

#[test]
fn open_close_releases_all_references() {
    let disk = Ramdisk::new(FS_SIZE);
    let mut fs = Xv6Fs::init(&disk);

    // The cwd holds the only baseline inode reference.
    assert_eq!(fs.live_files(), 0);
    assert_eq!(fs.live_inodes(), 1);

    let fd = fs.open(b"/f", OpenFlags::CREATE).unwrap();
    assert!(fs.fd_in_use(fd));
    assert_eq!(fs.live_files(), 1);
    assert_eq!(fs.live_inodes(), 2);

    fs.close(fd as u64).unwrap();
    assert!(!fs.fd_in_use(fd));
    assert_eq!(fs.live_files(), 0);
    assert_eq!(fs.live_inodes(), 1);
}

#[test]
fn fd_table_exhaustion() {
    let disk = Ramdisk::new(FS_SIZE);
    let mut fs = Xv6Fs::init(&disk);

    let mut fds = Vec::new();
    for i in 0..NOFILE - RESERVED_FDS {
        let path = format!("/f{i}");
        fds.push(fs.open(path.as_bytes(), OpenFlags::CREATE).unwrap());
    }
    assert_eq!(
        fs.open(b"/overflow", OpenFlags::CREATE),
        Err(FsError::TooManyOpenFiles)
    );
    for fd in fds {
        fs.close(fd as u64).unwrap();
    }
}

#[test]
fn dot_and_dotdot_resolve() {
    let disk = Ramdisk::new(FS_SIZE);
    let mut fs = Xv6Fs::init(&disk);

    fs.mkdir(b"/d").unwrap();
    let root = fs.lstat(b"/").unwrap().ino;
    let d = fs.lstat(b"/d").unwrap().ino;

    assert_eq!(fs.lstat(b"/d/.").unwrap().ino, d);
    assert_eq!(fs.lstat(b"/d/..").unwrap().ino, root);
    // The root is its own parent.
    assert_eq!(fs.lstat(b"/..").unwrap().ino, root);
    assert_eq!(fs.lstat(b"/.").unwrap().ino, root);

    // ".." on a subdirectory bumps the parent's link count.
    assert_eq!(fs.lstat(b"/").unwrap().nlink, 2);
    assert_eq!(fs.lstat(b"/d").unwrap().nlink, 1);
}

#[test]
fn long_names_truncate_to_dir_size() {
    let disk = Ramdisk::new(FS_SIZE);
    let mut fs = Xv6Fs::init(&disk);

    let mut name_a = vec![b'/'];
    name_a.extend(std::iter::repeat(b'a').take(DIR_SIZE + 8));
    let fd = fs.open(&name_a, OpenFlags::CREATE).unwrap() as u64;
    let ino = fs.fstat(fd).unwrap().ino;
    fs.close(fd).unwrap();

    // Any name sharing the first DIR_SIZE bytes matches the stored entry.
    let mut name_b = vec![b'/'];
    name_b.extend(std::iter::repeat(b'a').take(DIR_SIZE));
    name_b.extend(b"zzzz");
    assert_eq!(fs.lstat(&name_b).unwrap().ino, ino);

    // A shorter prefix does not.
    let mut name_c = vec![b'/'];
    name_c.extend(std::iter::repeat(b'a').take(DIR_SIZE - 1));
    assert_eq!(fs.lstat(&name_c), Err(FsError::EntryNotFound));
}

#[test]
fn seek_rules() {
    let disk = Ramdisk::new(FS_SIZE);
    let mut fs = Xv6Fs::init(&disk);

    let fd = fs
        .open(b"/f", OpenFlags::CREATE | OpenFlags::READ_WRITE)
        .unwrap() as u64;
    fs.write(fd, b"0123456789").unwrap();

    assert_eq!(fs.lseek(fd, 0, Whence::End).unwrap(), 10);
    assert_eq!(fs.lseek(fd, -4, Whence::Cur).unwrap(), 6);
    assert_eq!(fs.lseek(fd, 2, Whence::Set).unwrap(), 2);
    let mut buf = [0; 4];
    fs.read(fd, &mut buf).unwrap();
    assert_eq!(&buf, b"2345");

    assert_eq!(fs.lseek(fd, -1, Whence::Set), Err(FsError::InvalidOffset));
    assert_eq!(fs.lseek(fd, -11, Whence::End), Err(FsError::InvalidOffset));
    fs.close(fd).unwrap();
}

#[test]
fn writes_past_end_leave_a_hole() {
    let disk = Ramdisk::new(FS_SIZE);
    let mut fs = Xv6Fs::init(&disk);

    let fd = fs
        .open(b"/f", OpenFlags::CREATE | OpenFlags::READ_WRITE)
        .unwrap() as u64;
    assert_eq!(fs.pwrite(fd, b"xyz", 100).unwrap(), 3);
    assert_eq!(fs.fstat(fd).unwrap().size, 103);

    let mut buf = [0xff; 103];
    assert_eq!(fs.pread(fd, &mut buf, 0).unwrap(), 103);
    assert!(buf[..100].iter().all(|&b| b == 0));
    assert_eq!(&buf[100..], b"xyz");
    fs.close(fd).unwrap();
}

#[test]
fn writes_beyond_max_file_fail() {
    let disk = Ramdisk::new(FS_SIZE);
    let mut fs = Xv6Fs::init(&disk);

    let fd = fs
        .open(b"/f", OpenFlags::CREATE | OpenFlags::READ_WRITE)
        .unwrap() as u64;
    let max = (MAX_FILE * FS_BLOCK_SIZE) as i64;
    assert_eq!(fs.pwrite(fd, b"x", max), Err(FsError::FileTooLarge));
    assert_eq!(fs.pwrite(fd, b"xy", max - 1), Err(FsError::FileTooLarge));
    // The last representable byte is writable.
    assert_eq!(fs.pwrite(fd, b"x", max - 1).unwrap(), 1);
    fs.close(fd).unwrap();
}

#[test]
fn access_mode_checks() {
    let disk = Ramdisk::new(FS_SIZE);
    let mut fs = Xv6Fs::init(&disk);

    let fd = fs.open(b"/f", OpenFlags::CREATE).unwrap() as u64;
    fs.close(fd).unwrap();

    let ro = fs.open(b"/f", OpenFlags::READ_ONLY).unwrap() as u64;
    assert_eq!(fs.write(ro, b"x"), Err(FsError::NotWritable));
    let mut buf = [0; 1];
    assert_eq!(fs.read(ro, &mut buf).unwrap(), 0);
    fs.close(ro).unwrap();

    let wo = fs.open(b"/f", OpenFlags::WRITE_ONLY).unwrap() as u64;
    assert_eq!(fs.read(wo, &mut buf), Err(FsError::NotReadable));
    assert_eq!(fs.write(wo, b"x").unwrap(), 1);
    fs.close(wo).unwrap();
}

#[test]
fn bad_descriptors_are_rejected() {
    let disk = Ramdisk::new(FS_SIZE);
    let mut fs = Xv6Fs::init(&disk);

    let mut buf = [0; 1];
    assert_eq!(fs.read(99, &mut buf), Err(FsError::BadFileDescriptor));
    assert_eq!(fs.close(0), Err(FsError::BadFileDescriptor));
    assert_eq!(fs.close(2), Err(FsError::BadFileDescriptor));
    assert_eq!(fs.fstat(u64::MAX), Err(FsError::BadFileDescriptor));
}

#[test]
fn trunc_discards_contents() {
    let disk = Ramdisk::new(FS_SIZE);
    let mut fs = Xv6Fs::init(&disk);

    let fd = fs
        .open(b"/f", OpenFlags::CREATE | OpenFlags::READ_WRITE)
        .unwrap() as u64;
    fs.write(fd, b"some data").unwrap();
    fs.close(fd).unwrap();

    let fd = fs
        .open(b"/f", OpenFlags::TRUNC | OpenFlags::READ_WRITE)
        .unwrap() as u64;
    assert_eq!(fs.fstat(fd).unwrap().size, 0);
    fs.close(fd).unwrap();
}

#[test]
fn link_shares_an_inode() {
    let disk = Ramdisk::new(FS_SIZE);
    let mut fs = Xv6Fs::init(&disk);

    let fd = fs
        .open(b"/f", OpenFlags::CREATE | OpenFlags::READ_WRITE)
        .unwrap() as u64;
    fs.write(fd, b"shared").unwrap();
    fs.close(fd).unwrap();

    fs.sys_link(b"/f", b"/g").unwrap();
    assert_eq!(fs.lstat(b"/f").unwrap().nlink, 2);
    assert_eq!(fs.lstat(b"/g").unwrap().ino, fs.lstat(b"/f").unwrap().ino);

    fs.sys_unlink(b"/f").unwrap();
    assert_eq!(fs.lstat(b"/g").unwrap().nlink, 1);
    let fd = fs.open(b"/g", OpenFlags::READ_ONLY).unwrap() as u64;
    let mut buf = [0; 6];
    assert_eq!(fs.read(fd, &mut buf).unwrap(), 6);
    assert_eq!(&buf, b"shared");
    fs.close(fd).unwrap();
}

#[test]
fn link_refuses_directories() {
    let disk = Ramdisk::new(FS_SIZE);
    let mut fs = Xv6Fs::init(&disk);

    fs.mkdir(b"/d").unwrap();
    assert_eq!(fs.sys_link(b"/d", b"/e"), Err(FsError::LinkToDirectory));
    // The failed link must not disturb the directory's link count.
    assert_eq!(fs.lstat(b"/d").unwrap().nlink, 1);
}

#[test]
fn chdir_and_relative_paths() {
    let disk = Ramdisk::new(FS_SIZE);
    let mut fs = Xv6Fs::init(&disk);

    assert_eq!(fs.getcwd(), b"/");
    fs.mkdir(b"/d").unwrap();
    fs.chdir(b"/d").unwrap();
    assert_eq!(fs.getcwd(), b"/d");

    let fd = fs.open(b"f", OpenFlags::CREATE).unwrap() as u64;
    fs.close(fd).unwrap();
    assert!(fs.lstat(b"/d/f").is_ok());

    // Relative lookup through "..".
    assert_eq!(fs.lstat(b"..").unwrap().ino, 1);

    // chdir to a file fails and leaves the cwd alone.
    assert_eq!(fs.chdir(b"/d/f"), Err(FsError::NotADirectory));
    assert_eq!(fs.getcwd(), b"/d");
}

#[test]
fn dup_shares_the_offset() {
    let disk = Ramdisk::new(FS_SIZE);
    let mut fs = Xv6Fs::init(&disk);

    let fd1 = fs
        .open(b"/f", OpenFlags::CREATE | OpenFlags::READ_WRITE)
        .unwrap() as u64;
    let fd2 = fs.dup(fd1).unwrap() as u64;
    assert_ne!(fd1, fd2);

    fs.write(fd1, b"ab").unwrap();
    fs.write(fd2, b"cd").unwrap();

    let mut buf = [0; 4];
    assert_eq!(fs.pread(fd1, &mut buf, 0).unwrap(), 4);
    assert_eq!(&buf, b"abcd");

    fs.close(fd1).unwrap();
    assert_eq!(fs.live_files(), 1); // dup kept the file alive
    fs.close(fd2).unwrap();
    assert_eq!(fs.live_files(), 0);
}

#[test]
fn device_files_dispatch_by_major() {
    let disk = Ramdisk::new(FS_SIZE);
    let mut fs = Xv6Fs::init(&disk);

    fs.mknod(b"/console", 1, 0).unwrap();
    let st = fs.lstat(b"/console").unwrap();
    assert_eq!(st.mode >> 14, 3); // device

    let fd = fs
        .open(b"/console", OpenFlags::READ_WRITE)
        .unwrap() as u64;
    assert_eq!(fs.write(fd, b"hi console").unwrap(), 10);
    let mut buf = [0; 8];
    assert_eq!(fs.read(fd, &mut buf).unwrap(), 0); // console reads hit EOF
    fs.close(fd).unwrap();

    // A major with no registered device opens but cannot transfer.
    fs.mknod(b"/null", 5, 0).unwrap();
    let fd = fs.open(b"/null", OpenFlags::READ_WRITE).unwrap() as u64;
    assert_eq!(fs.write(fd, b"x"), Err(FsError::DeviceNotFound(5)));
    fs.close(fd).unwrap();

    // A major outside the device table does not even open.
    fs.mknod(b"/bogus", 99, 0).unwrap();
    assert_eq!(
        fs.open(b"/bogus", OpenFlags::READ_ONLY),
        Err(FsError::DeviceNotFound(99))
    );
}

#[test]
fn tokenizer_edge_paths() {
    let disk = Ramdisk::new(FS_SIZE);
    let mut fs = Xv6Fs::init(&disk);

    fs.mkdir(b"/a").unwrap();
    fs.mkdir(b"/a/bb").unwrap();
    let bb = fs.lstat(b"/a/bb").unwrap().ino;

    // Repeated and trailing slashes collapse.
    assert_eq!(fs.lstat(b"///a//bb").unwrap().ino, bb);
    assert_eq!(fs.lstat(b"/a/bb/").unwrap().ino, bb);

    // An empty or all-slash path resolves to nothing for parents, but
    // "/" alone names the root.
    assert_eq!(fs.lstat(b"/").unwrap().ino, 1);
    assert_eq!(fs.sys_unlink(b"/"), Err(FsError::EntryNotFound));
    assert_eq!(fs.sys_unlink(b""), Err(FsError::EntryNotFound));
}

#[test]
fn deep_nesting_and_rmdir_chain() {
    let disk = Ramdisk::new(FS_SIZE);
    let mut fs = Xv6Fs::init(&disk);

    fs.mkdir(b"/1").unwrap();
    fs.mkdir(b"/1/2").unwrap();
    fs.mkdir(b"/1/2/3").unwrap();
    let fd = fs.open(b"/1/2/3/f", OpenFlags::CREATE).unwrap() as u64;
    fs.close(fd).unwrap();

    assert!(fs.lstat(b"/1/2/3/f").is_ok());
    assert_eq!(fs.lstat(b"/1/2").unwrap().nlink, 2); // "." of /1/2 plus ".." of /1/2/3

    fs.sys_unlink(b"/1/2/3/f").unwrap();
    fs.sys_unlink(b"/1/2/3").unwrap();
    fs.sys_unlink(b"/1/2").unwrap();
    fs.sys_unlink(b"/1").unwrap();
    assert_eq!(fs.lstat(b"/1"), Err(FsError::EntryNotFound));
}

#[test]
fn dirent_slot_reuse() {
    let disk = Ramdisk::new(FS_SIZE);
    let mut fs = Xv6Fs::init(&disk);

    // Fill a few entries, punch a hole, and check the next create lands
    // in the freed slot (directory size must not grow).
    for name in [&b"/a"[..], b"/b", b"/c"] {
        let fd = fs.open(name, OpenFlags::CREATE).unwrap() as u64;
        fs.close(fd).unwrap();
    }
    let size_before = fs.lstat(b"/").unwrap().size;
    fs.sys_unlink(b"/b").unwrap();
    let fd = fs.open(b"/d", OpenFlags::CREATE).unwrap() as u64;
    fs.close(fd).unwrap();
    assert_eq!(fs.lstat(b"/").unwrap().size, size_before);
}

#[test]
fn stat_matches_dirent_identity() {
    let disk = Ramdisk::new(FS_SIZE);
    let mut fs = Xv6Fs::init(&disk);

    let fd = fs.open(b"/f", OpenFlags::CREATE).unwrap() as u64;
    let by_fd = fs.fstat(fd).unwrap();
    fs.close(fd).unwrap();
    let by_path = fs.lstat(b"/f").unwrap();

    assert_eq!(by_fd, by_path);
    assert_eq!(by_fd.dev, 1);
    assert_eq!(by_fd.nlink, 1);
}

#[test]
fn superblock_geometry() {
    let disk = Ramdisk::new(FS_SIZE);
    let fs = Xv6Fs::init(&disk);
    let sb = fs.superblock();

    assert_eq!(sb.magic, SuperBlock::FS_MAGIC);
    assert_eq!(sb.size as usize, FS_SIZE);
    assert_eq!(sb.nlog, 30);
    assert_eq!(sb.logstart, 2);
    assert_eq!(sb.inodestart, 32);
    assert_eq!(sb.bmapstart, 45);
    assert_eq!(sb.size, sb.nblocks + 46);

    // Raw superblock on disk agrees with the in-memory copy.
    let raw = read_block(&disk, 1);
    let mut on_disk = SuperBlock::zeroed();
    on_disk.as_bytes_mut().copy_from_slice(&raw[..32]);
    assert_eq!(on_disk.magic, sb.magic);
    assert_eq!(on_disk.nblocks, sb.nblocks);
}
