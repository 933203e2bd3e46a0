//! Kernel motor driver.
//!
//! Resolves a fresh control channel per request using the strategies in
//! [`discovery`], selected by the configured [`ChannelBackend`]:
//!
//! | Backend | Device node | Remote descriptor |
//! |---------|-------------|-------------------|
//! | `Auto` | first | fallback, when an address is configured |
//! | `DeviceOnly` | yes | no |
//! | `LegacyOnly` | no | when an address is configured |
//!
//! The driver keeps no handle between calls.

mod channel;
pub mod discovery;

pub use channel::DeviceChannel;
pub use discovery::{DescriptorLookup, DiscoveryError, ReadFailure, ProcessTarget, Strategy};

use ptz_common::hal::config::{ChannelBackend, PtzConfig};
use ptz_common::hal::driver::{ControlChannel, HalError, MotorDriver};
use ptz_common::hal::types::Axis;
use std::path::PathBuf;
use tracing::{debug, trace};

/// Default procfs mount point.
pub const PROC_ROOT: &str = "/proc";

/// Per-axis addressing of the motor channel.
#[derive(Debug, Clone, PartialEq, Eq)]
struct AxisChannel {
    device: PathBuf,
    fd_addr: u64,
}

/// Motor driver talking to the kernel module through ioctl requests.
#[derive(Debug, Clone)]
pub struct KernelMotorDriver {
    backend: ChannelBackend,
    proc_root: PathBuf,
    target: ProcessTarget,
    axes: [AxisChannel; 2],
}

impl KernelMotorDriver {
    /// Build the resolver from a session configuration.
    pub fn from_config(config: &PtzConfig) -> Self {
        let channel = |axis| {
            let params = config.axis(axis);
            AxisChannel {
                device: params.device,
                fd_addr: params.fd_addr,
            }
        };
        Self {
            backend: config.motor_backend,
            proc_root: PathBuf::from(PROC_ROOT),
            target: ProcessTarget::from_config(config.owner_pid, &config.owner_process),
            axes: [channel(Axis::Pan), channel(Axis::Tilt)],
        }
    }

    /// Use a different procfs root (tests, chroots).
    pub fn with_proc_root(mut self, proc_root: impl Into<PathBuf>) -> Self {
        self.proc_root = proc_root.into();
        self
    }

    /// Strategies tried for `axis`, in order.
    pub fn strategies(&self, axis: Axis) -> Vec<Strategy> {
        let channel = &self.axes[axis.index()];
        let mut strategies = Vec::with_capacity(2);

        if self.backend.tries_device() {
            strategies.push(Strategy::DirectPath {
                path: channel.device.clone(),
            });
        }
        if self.backend.tries_legacy() && channel.fd_addr != 0 {
            strategies.push(Strategy::RemoteDescriptor {
                proc_root: self.proc_root.clone(),
                target: self.target.clone(),
                address: channel.fd_addr,
            });
        }

        strategies
    }
}

impl MotorDriver for KernelMotorDriver {
    fn name(&self) -> &'static str {
        "kernel"
    }

    fn open(&self, axis: Axis) -> Result<Box<dyn ControlChannel>, HalError> {
        let channel = &self.axes[axis.index()];
        let mut failures = Vec::new();

        for strategy in self.strategies(axis) {
            match strategy.open() {
                Ok(handle) => {
                    trace!("Opened {} channel via {}", axis, handle.describe());
                    return Ok(Box::new(handle));
                }
                Err(e) => {
                    debug!("{} strategy failed for {} axis: {}", strategy.label(), axis, e);
                    failures.push(format!("{}: {}", strategy.label(), e));
                }
            }
        }

        if failures.is_empty() {
            failures.push("no descriptor address configured".to_string());
        }

        Err(HalError::ChannelUnavailable {
            axis,
            reason: format!(
                "backend={:?} dev={} fd_addr={:#x} ({})",
                self.backend,
                channel.device.display(),
                channel.fd_addr,
                failures.join("; ")
            ),
        })
    }
}

/// Factory function registered under "kernel".
pub fn create_driver(config: &PtzConfig) -> Box<dyn MotorDriver> {
    Box::new(KernelMotorDriver::from_config(config))
}
