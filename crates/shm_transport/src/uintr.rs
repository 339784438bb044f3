//! Signal-plus-shared-memory transport.
//!
//! The payload page is unlocked (one producer per direction). A user-level
//! interrupt poked from sender to receiver signals arrival and completion;
//! here the interrupt vector is modeled by a pending bitmask per address
//! space. The receiver polls the mask non-blockingly and acknowledges the
//! bit it consumes. Bit 1 means "request", bit 2 means "response"; badges
//! let two senders (the application and the ramdisk) share the filesystem
//! server's vector.

use std::{
    cell::UnsafeCell,
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
};

use crate::{Caller, IoPage, Listener, Request, relax};

/// Badge bit carried by request notifications.
pub const UINTR_REQUEST: u32 = 1 << 0;

/// Badge bit carried by response notifications.
pub const UINTR_RESPONSE: u32 = 1 << 1;

/// A user-interrupt vector: the pending bitmask of one address space.
#[derive(Default)]
pub struct UintrVector {
    pending: AtomicU32,
}

impl UintrVector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-blocking poll of the pending bitmask.
    #[must_use]
    pub fn poll(&self) -> u32 {
        self.pending.load(Ordering::Acquire)
    }

    /// Acknowledges (clears) `bits`.
    pub fn ack(&self, bits: u32) {
        self.pending.fetch_and(!bits, Ordering::AcqRel);
    }

    /// Polls until one of `bits` is pending, then acknowledges it.
    pub fn wait(&self, bits: u32) {
        let mut spins = 0;
        loop {
            if self.poll() & bits != 0 {
                self.ack(bits);
                return;
            }
            relax(&mut spins);
        }
    }
}

/// The sending half of a badged user interrupt.
pub struct UintrSender {
    target: Arc<UintrVector>,
    badge: u32,
}

impl UintrSender {
    #[must_use]
    pub fn new(target: Arc<UintrVector>, badge: u32) -> Self {
        Self { target, badge }
    }

    /// Pokes the receiver: sets this sender's badge bit in its mask.
    pub fn send(&self) {
        self.target.pending.fetch_or(self.badge, Ordering::Release);
    }
}

/// Register slots on the shared page.
struct SignalPage {
    regs: UnsafeCell<Request>,
    ret: UnsafeCell<i64>,
    page: IoPage,
}

// Single producer per direction: the caller writes `regs` strictly before
// poking the request bit, the listener writes `ret` strictly before poking
// the response bit, and neither reads until it has consumed the matching
// bit. The release/acquire pair on the mask orders the accesses.
unsafe impl Sync for SignalPage {}

pub struct UintrCaller {
    shared: Arc<SignalPage>,
    poke: UintrSender,
    vector: Arc<UintrVector>,
}

pub struct UintrListener {
    shared: Arc<SignalPage>,
    poke: UintrSender,
    vector: Arc<UintrVector>,
}

/// Creates a connected pair over one shared page.
///
/// `caller_vec` is the caller's vector (where responses are posted);
/// `listener_vec` the listener's (where requests are posted). The listener
/// side may share its vector with other channels — the badge bits keep the
/// traffic apart.
#[must_use]
pub fn channel(
    caller_vec: &Arc<UintrVector>,
    listener_vec: &Arc<UintrVector>,
) -> (UintrCaller, UintrListener) {
    let shared = Arc::new(SignalPage {
        regs: UnsafeCell::new(Request::new(0, [0; 4])),
        ret: UnsafeCell::new(0),
        page: IoPage::new(),
    });
    (
        UintrCaller {
            shared: Arc::clone(&shared),
            poke: UintrSender::new(Arc::clone(listener_vec), UINTR_REQUEST),
            vector: Arc::clone(caller_vec),
        },
        UintrListener {
            shared,
            poke: UintrSender::new(Arc::clone(caller_vec), UINTR_RESPONSE),
            vector: Arc::clone(listener_vec),
        },
    )
}

impl Caller for UintrCaller {
    fn call(&self, req: Request) -> i64 {
        // SAFETY: we are the only producer of `regs`, and the listener does
        // not read it until it has observed the request bit we set below.
        unsafe {
            *self.shared.regs.get() = req;
        }
        self.poke.send();
        self.vector.wait(UINTR_RESPONSE);
        // SAFETY: the response bit orders the listener's `ret` write before
        // this read.
        unsafe { *self.shared.ret.get() }
    }

    fn page(&self) -> &IoPage {
        &self.shared.page
    }
}

impl Listener for UintrListener {
    fn recv(&self) -> Request {
        self.vector.wait(UINTR_REQUEST);
        // SAFETY: the request bit orders the caller's `regs` write before
        // this read.
        unsafe { *self.shared.regs.get() }
    }

    fn reply(&self, ret: i64) {
        // SAFETY: the caller does not read `ret` until it has observed the
        // response bit we set below.
        unsafe {
            *self.shared.ret.get() = ret;
        }
        self.poke.send();
    }

    fn page(&self) -> &IoPage {
        &self.shared.page
    }
}
