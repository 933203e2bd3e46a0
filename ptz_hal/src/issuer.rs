//! Command issuance.
//!
//! Every request opens its own channel through the driver and drops it
//! before returning, whatever the outcome. Handles are never cached, so a
//! restarted owner process cannot leave a stale descriptor behind.

use ptz_common::consts::REPEAT_PACING;
use ptz_common::hal::driver::{HalError, MotorDriver};
use ptz_common::hal::types::{Axis, Direction};
use std::thread;
use tracing::{debug, error, info, warn};

/// A parameterized motor request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorCommand {
    /// Target axis.
    pub axis: Axis,
    /// Direction for logs; `None` for stop/speed requests.
    pub direction: Option<Direction>,
    /// Signed step payload.
    pub step: i32,
    /// Times the request is sent (values < 1 count as 1).
    pub repeat: i32,
    /// Device-control request code.
    pub code: u64,
}

/// Sends motor requests through freshly resolved channels.
pub struct CommandIssuer {
    driver: Box<dyn MotorDriver>,
}

impl CommandIssuer {
    /// Wrap a driver.
    pub fn new(driver: Box<dyn MotorDriver>) -> Self {
        Self { driver }
    }

    /// Send `command.repeat` times, pausing [`REPEAT_PACING`] between sends.
    ///
    /// Stops at the first rejected send. With `log` unset, successful
    /// commands are only traced at debug level.
    ///
    /// # Errors
    /// `ChannelUnavailable` when no channel could be opened (nothing was
    /// sent), `CommandFailed` when the driver rejected a send.
    pub fn issue(&self, command: &MotorCommand, log: bool) -> Result<(), HalError> {
        let mut channel = self.driver.open(command.axis).inspect_err(|e| {
            error!("open motor failed axis={} code={:#x}: {}", command.axis, command.code, e);
        })?;

        let repeat = command.repeat.max(1);
        let mut outcome = Ok(());
        for i in 0..repeat {
            if i > 0 {
                thread::sleep(REPEAT_PACING);
            }
            if let Err(errno) = channel.send(command.code, command.step) {
                outcome = Err(HalError::CommandFailed {
                    axis: command.axis,
                    code: command.code,
                    errno,
                });
                break;
            }
        }

        let dir = command.direction.map(Direction::name).unwrap_or("");
        match &outcome {
            Ok(()) if log => info!(
                "motor axis={} via={} dir={} step={} rep={} cmd={:#x} ok",
                command.axis,
                channel.describe(),
                dir,
                command.step,
                repeat,
                command.code
            ),
            Ok(()) => debug!(
                "motor axis={} via={} dir={} step={} rep={} cmd={:#x} ok",
                command.axis,
                channel.describe(),
                dir,
                command.step,
                repeat,
                command.code
            ),
            Err(e) => warn!(
                "motor axis={} via={} dir={} step={} rep={}: {}",
                command.axis,
                channel.describe(),
                dir,
                command.step,
                repeat,
                e
            ),
        }

        drop(channel);
        outcome
    }

    /// Ask the driver to drive `axis` to its mechanical center.
    ///
    /// Returns the 8 bytes the driver wrote back.
    ///
    /// # Errors
    /// `Unsupported` when `code` is 0, otherwise as for [`issue`](Self::issue).
    pub fn center(&self, axis: Axis, code: u64, log: bool) -> Result<u64, HalError> {
        if code == 0 {
            return Err(HalError::Unsupported(
                "center request not configured".to_string(),
            ));
        }

        let mut channel = self.driver.open(axis).inspect_err(|e| {
            error!("open motor failed (center) axis={} code={:#x}: {}", axis, code, e);
        })?;

        let outcome = channel
            .send_wide(code)
            .map_err(|errno| HalError::CommandFailed { axis, code, errno });

        match &outcome {
            Ok(out) if log => info!(
                "motor axis={} via={} center cmd={:#x} out={:#x}",
                axis,
                channel.describe(),
                code,
                out
            ),
            Ok(_) => {}
            Err(e) => warn!("motor axis={} via={} center: {}", axis, channel.describe(), e),
        }

        outcome
    }
}
