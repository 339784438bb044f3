//! Bootstrap for the three-address-space pipeline.
//!
//! The root task's job: set up the shared pages and channels, start the
//! ramdisk and filesystem server in their own (thread-modeled) address
//! spaces, validate the init data it hands each of them, and give the
//! application a connected client. Process spawning, capability wiring
//! and memory retyping belong to the platform underneath and are not
//! modeled beyond this.

use std::{sync::Arc, thread};

use clap::ValueEnum;
use fsclient::FsClient;
use log::info;
use ramdisk::Ramdisk;
use service_proto::INIT_MAGIC;
use shm_transport::{Caller, Listener, polled, rendezvous, uintr};
use xv6fs::{Xv6Fs, disk::DiskDev, dispatch};
use xv6fs_params::FS_SIZE;

/// Coordination discipline used on both edges of the pipeline.
///
/// All three satisfy the same request/response contract; the root task
/// picks one when wiring the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Transport {
    #[default]
    Rendezvous,
    Polled,
    Uintr,
}

/// Init data handed to each spawned component.
pub struct InitData {
    pub magic: u64,
    pub transport: Transport,
    /// Blocks of backing storage given to the ramdisk.
    pub nblocks: usize,
}

impl InitData {
    #[must_use]
    pub fn new(transport: Transport) -> Self {
        Self {
            magic: INIT_MAGIC,
            transport,
            nblocks: FS_SIZE,
        }
    }
}

pub type BoxedCaller = Box<dyn Caller + Send + Sync>;
pub type BoxedListener = Box<dyn Listener + Send + Sync>;

/// A running system, seen from the application's address space.
pub struct System {
    client: FsClient<BoxedCaller>,
}

impl System {
    pub fn client(&self) -> &FsClient<BoxedCaller> {
        &self.client
    }
}

/// Wires up the pipeline and starts the ramdisk and filesystem server.
///
/// The two service threads run forever; they die with the process, the
/// way the real address spaces die with the machine.
///
/// # Panics
///
/// Panics if the init data magic does not check out, or a component
/// thread cannot be spawned.
pub fn launch(init: &InitData) -> System {
    assert_eq!(init.magic, INIT_MAGIC, "bad init data");
    info!("rootserver: launching with {:?} transport", init.transport);

    let (app_caller, app_listener, disk_caller, disk_listener) = wire(init.transport);

    let nblocks = init.nblocks;
    thread::Builder::new()
        .name("ramdisk".into())
        .spawn(move || {
            let disk = Ramdisk::new(nblocks);
            disk.serve(&disk_listener);
        })
        .expect("spawn ramdisk");

    thread::Builder::new()
        .name("xv6fs".into())
        .spawn(move || {
            let dev = DiskDev::new(disk_caller);
            let mut fs = Xv6Fs::init(dev);
            dispatch::serve(&mut fs, &app_listener);
        })
        .expect("spawn xv6fs");

    System {
        client: FsClient::new(app_caller),
    }
}

/// Builds the two channels: app ↔ fs server, fs server ↔ ramdisk.
fn wire(transport: Transport) -> (BoxedCaller, BoxedListener, BoxedCaller, BoxedListener) {
    match transport {
        Transport::Rendezvous => {
            let (ac, al) = rendezvous::channel();
            let (dc, dl) = rendezvous::channel();
            (Box::new(ac), Box::new(al), Box::new(dc), Box::new(dl))
        }
        Transport::Polled => {
            let (ac, al) = polled::channel();
            let (dc, dl) = polled::channel();
            (Box::new(ac), Box::new(al), Box::new(dc), Box::new(dl))
        }
        Transport::Uintr => {
            // One interrupt vector per address space. The server's vector
            // sees request badges from the app and response badges from
            // the ramdisk.
            let app_vec = Arc::new(uintr::UintrVector::new());
            let fs_vec = Arc::new(uintr::UintrVector::new());
            let disk_vec = Arc::new(uintr::UintrVector::new());
            let (ac, al) = uintr::channel(&app_vec, &fs_vec);
            let (dc, dl) = uintr::channel(&fs_vec, &disk_vec);
            (Box::new(ac), Box::new(al), Box::new(dc), Box::new(dl))
        }
    }
}
