//! Polled shared queue.
//!
//! One shared page laid out as `[ spinlock | tag | args | ret | payload ]`.
//! The producer takes the lock, writes the register file, and sets the tag
//! to the request label; the consumer spins reading the tag, dispatches when
//! it sees a non-`RET` value, and writes `(RET, retval)` back. The tag
//! doubles as the valid-signal, and correctness rests on the release/acquire
//! ordering of the lock.

use std::{
    cell::UnsafeCell,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use crate::{Caller, IoPage, Listener, Request, relax};

/// Tag value marking "no request pending / reply ready".
const TAG_RET: u32 = 0;

/// The shared queue page.
pub struct QueuePage {
    lock: AtomicBool,
    tag: UnsafeCell<u32>,
    args: UnsafeCell<[u64; 4]>,
    ret: UnsafeCell<i64>,
    page: IoPage,
}

// The register cells are only touched while `lock` is held; the
// acquire/release pair on the lock orders those accesses.
unsafe impl Sync for QueuePage {}

impl QueuePage {
    fn new() -> Self {
        Self {
            lock: AtomicBool::new(false),
            tag: UnsafeCell::new(TAG_RET),
            args: UnsafeCell::new([0; 4]),
            ret: UnsafeCell::new(0),
            page: IoPage::new(),
        }
    }

    fn acquire(&self) {
        let mut spins = 0;
        while self.lock.swap(true, Ordering::Acquire) {
            relax(&mut spins);
        }
    }

    fn release(&self) {
        self.lock.store(false, Ordering::Release);
    }

    /// Runs `f` with the lock held.
    fn with_regs<R>(&self, f: impl FnOnce(&mut u32, &mut [u64; 4], &mut i64) -> R) -> R {
        self.acquire();
        // SAFETY: the spinlock is held, so no other thread accesses the
        // register cells.
        let ret = unsafe { f(&mut *self.tag.get(), &mut *self.args.get(), &mut *self.ret.get()) };
        self.release();
        ret
    }
}

pub struct PolledCaller {
    queue: Arc<QueuePage>,
}

pub struct PolledListener {
    queue: Arc<QueuePage>,
}

/// Creates a connected polled-queue pair sharing one I/O page.
#[must_use]
pub fn channel() -> (PolledCaller, PolledListener) {
    let queue = Arc::new(QueuePage::new());
    (
        PolledCaller {
            queue: Arc::clone(&queue),
        },
        PolledListener { queue },
    )
}

impl Caller for PolledCaller {
    fn call(&self, req: Request) -> i64 {
        assert_ne!(req.label, TAG_RET, "label 0 is reserved for replies");

        self.queue.with_regs(|tag, args, _ret| {
            debug_assert_eq!(*tag, TAG_RET, "overlapping call");
            *args = req.args;
            *tag = req.label;
        });

        // Spin until the consumer has written the reply back.
        let mut spins = 0;
        loop {
            let done = self.queue.with_regs(|tag, _args, ret| {
                if *tag == TAG_RET { Some(*ret) } else { None }
            });
            if let Some(ret) = done {
                return ret;
            }
            relax(&mut spins);
        }
    }

    fn page(&self) -> &IoPage {
        &self.queue.page
    }
}

impl Listener for PolledListener {
    fn recv(&self) -> Request {
        let mut spins = 0;
        loop {
            let req = self.queue.with_regs(|tag, args, _ret| {
                if *tag == TAG_RET {
                    None
                } else {
                    Some(Request::new(*tag, *args))
                }
            });
            if let Some(req) = req {
                return req;
            }
            relax(&mut spins);
        }
    }

    fn reply(&self, retval: i64) {
        self.queue.with_regs(|tag, _args, ret| {
            *ret = retval;
            *tag = TAG_RET;
        });
    }

    fn page(&self) -> &IoPage {
        &self.queue.page
    }
}
