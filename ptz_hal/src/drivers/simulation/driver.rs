//! Simulation driver implementation.
//!
//! `SimulatedMotorDriver` accepts every request and records it in a journal
//! shared by all clones, so a test can keep one clone while the session owns
//! another. Channel loss and request rejection can be injected per axis.

use nix::errno::Errno;
use parking_lot::Mutex;
use ptz_common::hal::driver::{ControlChannel, HalError, MotorDriver};
use ptz_common::hal::types::Axis;
use std::sync::Arc;
use tracing::debug;

/// One request accepted by the simulated driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssuedRequest {
    /// Target axis
    pub axis: Axis,
    /// Request code
    pub code: u64,
    /// Step payload (0 for wide requests)
    pub step: i32,
    /// Sent with an 8-byte buffer
    pub wide: bool,
}

#[derive(Debug, Clone, Copy)]
struct Rejection {
    after: usize,
    errno: Errno,
}

#[derive(Debug, Default)]
struct Journal {
    requests: Vec<IssuedRequest>,
    opens: [usize; 2],
    closes: [usize; 2],
    accepted: [usize; 2],
    unavailable: [bool; 2],
    rejection: [Option<Rejection>; 2],
}

impl Journal {
    fn accept(&mut self, request: IssuedRequest) -> Result<(), Errno> {
        let idx = request.axis.index();
        if let Some(rejection) = self.rejection[idx] {
            if self.accepted[idx] >= rejection.after {
                return Err(rejection.errno);
            }
        }
        self.accepted[idx] += 1;
        self.requests.push(request);
        Ok(())
    }
}

/// Simulated motor driver.
#[derive(Debug, Clone, Default)]
pub struct SimulatedMotorDriver {
    journal: Arc<Mutex<Journal>>,
}

impl SimulatedMotorDriver {
    /// Create a driver with an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `open()` fail for `axis`.
    pub fn set_unavailable(&self, axis: Axis, unavailable: bool) {
        self.journal.lock().unavailable[axis.index()] = unavailable;
    }

    /// Reject every request on `axis` with `errno`.
    pub fn set_rejecting(&self, axis: Axis, errno: Errno) {
        self.reject_after(axis, 0, errno);
    }

    /// Accept `accepted` more requests on `axis`, then reject with `errno`.
    pub fn reject_after(&self, axis: Axis, accepted: usize, errno: Errno) {
        let mut journal = self.journal.lock();
        let idx = axis.index();
        let after = journal.accepted[idx] + accepted;
        journal.rejection[idx] = Some(Rejection { after, errno });
    }

    /// Accept requests on `axis` again.
    pub fn clear_rejection(&self, axis: Axis) {
        self.journal.lock().rejection[axis.index()] = None;
    }

    /// All accepted requests, in order.
    pub fn requests(&self) -> Vec<IssuedRequest> {
        self.journal.lock().requests.clone()
    }

    /// Step payloads accepted on `axis` with `code`, in order.
    pub fn steps(&self, axis: Axis, code: u64) -> Vec<i32> {
        self.journal
            .lock()
            .requests
            .iter()
            .filter(|r| r.axis == axis && r.code == code)
            .map(|r| r.step)
            .collect()
    }

    /// Channels opened / closed for `axis` so far.
    pub fn channel_counts(&self, axis: Axis) -> (usize, usize) {
        let journal = self.journal.lock();
        (journal.opens[axis.index()], journal.closes[axis.index()])
    }

    /// Forget recorded requests and channel counts (injections stay).
    pub fn clear(&self) {
        let mut journal = self.journal.lock();
        journal.requests.clear();
        journal.opens = [0; 2];
        journal.closes = [0; 2];
    }
}

impl MotorDriver for SimulatedMotorDriver {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn open(&self, axis: Axis) -> Result<Box<dyn ControlChannel>, HalError> {
        let mut journal = self.journal.lock();
        if journal.unavailable[axis.index()] {
            return Err(HalError::ChannelUnavailable {
                axis,
                reason: "simulated channel loss".to_string(),
            });
        }
        journal.opens[axis.index()] += 1;

        Ok(Box::new(SimulatedChannel {
            axis,
            via: format!("sim:{axis}"),
            journal: Arc::clone(&self.journal),
        }))
    }
}

#[derive(Debug)]
struct SimulatedChannel {
    axis: Axis,
    via: String,
    journal: Arc<Mutex<Journal>>,
}

impl ControlChannel for SimulatedChannel {
    fn describe(&self) -> &str {
        &self.via
    }

    fn send(&mut self, code: u64, step: i32) -> Result<(), Errno> {
        debug!("sim {} request {:#x} step={}", self.axis, code, step);
        self.journal.lock().accept(IssuedRequest {
            axis: self.axis,
            code,
            step,
            wide: false,
        })
    }

    fn send_wide(&mut self, code: u64) -> Result<u64, Errno> {
        debug!("sim {} wide request {:#x}", self.axis, code);
        self.journal
            .lock()
            .accept(IssuedRequest {
                axis: self.axis,
                code,
                step: 0,
                wide: true,
            })
            .map(|()| 0)
    }
}

impl Drop for SimulatedChannel {
    fn drop(&mut self) {
        self.journal.lock().closes[self.axis.index()] += 1;
    }
}
