use std::{
    fs::File,
    io::{self, Read as _},
    os::unix::fs::FileExt as _,
    path::PathBuf,
    process,
};

use block_io::BlockDevice;
use clap::Parser;
use log::error;
use xv6fs_types::{DIR_SIZE, FS_BLOCK_SIZE};

/// Builds a file system image.
#[derive(Parser)]
struct Args {
    /// Output image file.
    image: PathBuf,
    /// Files to copy into the root directory.
    contents: Vec<PathBuf>,
}

/// A [`BlockDevice`] over an image file.
struct FileDevice {
    file: File,
}

impl BlockDevice<FS_BLOCK_SIZE> for FileDevice {
    type Error = io::Error;

    fn read(&self, index: usize, data: &mut [u8; FS_BLOCK_SIZE]) -> Result<(), Self::Error> {
        self.file.read_exact_at(data, (index * FS_BLOCK_SIZE) as u64)
    }

    fn write(&self, index: usize, data: &[u8; FS_BLOCK_SIZE]) -> Result<(), Self::Error> {
        self.file.write_all_at(data, (index * FS_BLOCK_SIZE) as u64)
    }
}

fn run(args: &Args) -> io::Result<()> {
    let file = File::options()
        .read(true)
        .write(true)
        .truncate(true)
        .create(true)
        .open(&args.image)?;
    let dev = FileDevice { file };

    let mut builder = mkfs::ImageBuilder::new(&dev);
    builder.begin()?;

    for path in &args.contents {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "bad file name"))?;
        if name.len() >= DIR_SIZE {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "name too long"));
        }

        let mut buf = Vec::new();
        File::open(path)?.read_to_end(&mut buf)?;
        builder.add_file(name, &buf)?;
    }

    builder.finish()
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(e) = run(&args) {
        error!("mkfs: {e}");
        process::exit(1);
    }
}
