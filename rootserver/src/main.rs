use clap::Parser;
use log::info;
use rootserver::{InitData, Transport, launch};
use service_proto::{OpenFlags, Whence};

/// Boots the ramdisk and filesystem server, then runs a short demo
/// workload from the application's address space.
#[derive(Parser)]
struct Args {
    /// Coordination discipline for both edges of the pipeline.
    #[arg(long, value_enum, default_value = "rendezvous")]
    transport: Transport,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let system = launch(&InitData::new(args.transport));
    let fs = system.client();

    let st = fs.lstat("/").expect("stat root");
    info!("/: ino={} nlink={} size={}", st.ino, st.nlink, st.size);

    let fd = fs
        .open("/hello", OpenFlags::CREATE | OpenFlags::READ_WRITE)
        .expect("create /hello");
    fs.write(fd, b"hello, filesystem\n").expect("write");
    fs.lseek(fd, 0, Whence::Set).expect("rewind");
    let mut buf = [0; 64];
    let n = fs.read(fd, &mut buf).expect("read");
    info!("read back: {:?}", String::from_utf8_lossy(&buf[..n]));

    let st = fs.fstat(fd).expect("fstat");
    info!("/hello: ino={} size={}", st.ino, st.size);

    fs.close(fd).expect("close");
    fs.unlink("/hello").expect("unlink");

    info!("cwd = {}", fs.getcwd().expect("getcwd"));
    println!("ok");
}
