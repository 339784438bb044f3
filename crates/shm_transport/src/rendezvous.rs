//! Blocking rendezvous over an endpoint object.
//!
//! The endpoint stands in for a kernel's synchronous IPC capability: the
//! caller blocks in [`Caller::call`] until the listener has replied, the
//! listener blocks in [`Listener::recv`] until a request arrives. The
//! register file travels through the endpoint; bulk payload goes through
//! the shared page.

use std::sync::{Arc, Condvar, Mutex};

use crate::{Caller, IoPage, Listener, Request};

#[derive(Default)]
struct Slots {
    req: Option<Request>,
    ret: Option<i64>,
}

/// A synchronous IPC endpoint.
pub struct Endpoint {
    slots: Mutex<Slots>,
    arrived: Condvar,
    replied: Condvar,
}

impl Endpoint {
    fn new() -> Self {
        Self {
            slots: Mutex::new(Slots::default()),
            arrived: Condvar::new(),
            replied: Condvar::new(),
        }
    }
}

pub struct RendezvousCaller {
    ep: Arc<Endpoint>,
    page: Arc<IoPage>,
}

pub struct RendezvousListener {
    ep: Arc<Endpoint>,
    page: Arc<IoPage>,
}

/// Creates a connected endpoint pair sharing one I/O page.
#[must_use]
pub fn channel() -> (RendezvousCaller, RendezvousListener) {
    let ep = Arc::new(Endpoint::new());
    let page = Arc::new(IoPage::new());
    (
        RendezvousCaller {
            ep: Arc::clone(&ep),
            page: Arc::clone(&page),
        },
        RendezvousListener { ep, page },
    )
}

impl Caller for RendezvousCaller {
    fn call(&self, req: Request) -> i64 {
        let mut slots = self.ep.slots.lock().unwrap();
        debug_assert!(slots.req.is_none(), "overlapping call");
        slots.req = Some(req);
        self.ep.arrived.notify_one();
        loop {
            slots = self.ep.replied.wait(slots).unwrap();
            if let Some(ret) = slots.ret.take() {
                return ret;
            }
        }
    }

    fn page(&self) -> &IoPage {
        &self.page
    }
}

impl Listener for RendezvousListener {
    fn recv(&self) -> Request {
        let mut slots = self.ep.slots.lock().unwrap();
        loop {
            if let Some(req) = slots.req.take() {
                return req;
            }
            slots = self.ep.arrived.wait(slots).unwrap();
        }
    }

    fn reply(&self, ret: i64) {
        let mut slots = self.ep.slots.lock().unwrap();
        debug_assert!(slots.ret.is_none(), "reply without request");
        slots.ret = Some(ret);
        self.ep.replied.notify_one();
    }

    fn page(&self) -> &IoPage {
        &self.page
    }
}
