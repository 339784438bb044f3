//! Randomized properties of the read/write paths.

use proptest::prelude::*;
use ramdisk::Ramdisk;
use service_proto::{OpenFlags, Whence};
use xv6fs::Xv6Fs;
use xv6fs_params::FS_SIZE;
use xv6fs_types::FS_BLOCK_SIZE;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Whatever is written comes back byte-identical, across block
    /// boundaries and the direct/indirect split.
    #[test]
    fn write_read_roundtrip(data in proptest::collection::vec(any::<u8>(), 0..4 * FS_BLOCK_SIZE)) {
        let disk = Ramdisk::new(FS_SIZE);
        let mut fs = Xv6Fs::init(&disk);

        let fd = fs.open(b"/blob", OpenFlags::CREATE | OpenFlags::READ_WRITE).unwrap() as u64;
        prop_assert_eq!(fs.write(fd, &data).unwrap(), data.len());
        prop_assert_eq!(fs.fstat(fd).unwrap().size, data.len() as u64);

        fs.lseek(fd, 0, Whence::Set).unwrap();
        let mut back = vec![0; data.len()];
        prop_assert_eq!(fs.read(fd, &mut back).unwrap(), data.len());
        prop_assert_eq!(back, data);
        fs.close(fd).unwrap();
    }

    /// `seek(SET, off)` followed by `read(n)` is `pread(n, off)`.
    #[test]
    fn pread_is_seek_then_read(
        off in 0usize..3 * FS_BLOCK_SIZE,
        n in 0usize..2 * FS_BLOCK_SIZE,
    ) {
        let disk = Ramdisk::new(FS_SIZE);
        let mut fs = Xv6Fs::init(&disk);

        let data: Vec<u8> = (0..4 * FS_BLOCK_SIZE).map(|i| (i % 241) as u8).collect();
        let fd = fs.open(b"/blob", OpenFlags::CREATE | OpenFlags::READ_WRITE).unwrap() as u64;
        fs.write(fd, &data).unwrap();

        let mut via_seek = vec![0; n];
        fs.lseek(fd, off as i64, Whence::Set).unwrap();
        let n1 = fs.read(fd, &mut via_seek).unwrap();

        let mut via_pread = vec![0; n];
        let n2 = fs.pread(fd, &mut via_pread, off as i64).unwrap();

        prop_assert_eq!(n1, n2);
        prop_assert_eq!(via_seek, via_pread);
        fs.close(fd).unwrap();
    }

    /// Creating and fully deleting files always returns the bitmap to its
    /// starting population.
    #[test]
    fn delete_restores_bitmap(sizes in proptest::collection::vec(0usize..3 * FS_BLOCK_SIZE, 1..5)) {
        let disk = Ramdisk::new(FS_SIZE);
        let mut fs = Xv6Fs::init(&disk);
        let before = fs.live_inodes();

        for (i, size) in sizes.iter().enumerate() {
            let path = format!("/f{i}");
            let fd = fs.open(path.as_bytes(), OpenFlags::CREATE | OpenFlags::READ_WRITE).unwrap() as u64;
            fs.write(fd, &vec![0xa5; *size]).unwrap();
            fs.close(fd).unwrap();
        }
        for i in 0..sizes.len() {
            let path = format!("/f{i}");
            fs.sys_unlink(path.as_bytes()).unwrap();
        }

        prop_assert_eq!(fs.live_inodes(), before);
        prop_assert_eq!(fs.live_files(), 0);

        // Every inode and data block is reusable: the next create gets
        // inode 2 again (the first free after the root).
        let fd = fs.open(b"/again", OpenFlags::CREATE).unwrap() as u64;
        prop_assert_eq!(fs.fstat(fd).unwrap().ino, 2);
        fs.close(fd).unwrap();
    }
}
