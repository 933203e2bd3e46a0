//! Motor driver traits and error types.
//!
//! This module defines:
//! - `MotorDriver` trait - Produces a fresh control channel per axis
//! - `ControlChannel` trait - Sends device-control requests through one open handle
//! - `HalError` enum - Error types for motor operations
//! - `DriverFactory` type alias - Factory function type

use crate::hal::config::PtzConfig;
use crate::hal::types::Axis;
use nix::errno::Errno;
use std::fmt;
use thiserror::Error;

/// Error types for motor operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HalError {
    /// No control channel could be opened for the axis.
    #[error("Channel unavailable for {axis} axis: {reason}")]
    ChannelUnavailable {
        /// Axis whose channel was requested
        axis: Axis,
        /// Strategy-level diagnostic
        reason: String,
    },

    /// The driver accepted the channel but rejected the request.
    #[error("Command {code:#x} failed on {axis} axis: {errno}")]
    CommandFailed {
        /// Axis the request was sent to
        axis: Axis,
        /// Device-control request code
        code: u64,
        /// Error reported by the driver
        errno: Errno,
    },

    /// Centering failed on both axes.
    #[error("Homing failed (pan: {pan}; tilt: {tilt})")]
    HomingFailed {
        /// Pan centering failure
        pan: String,
        /// Tilt centering failure
        tilt: String,
    },

    /// Requested item (preset) does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Feature not configured on this device.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Malformed request from the caller.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// State persistence error
    #[error("State persistence error: {0}")]
    PersistenceError(String),

    /// Driver not found
    #[error("Driver not found: {0}")]
    DriverNotFound(String),
}

impl HalError {
    /// True for the "channel unavailable" outcome, which a caller may retry later.
    pub fn is_channel_unavailable(&self) -> bool {
        matches!(self, Self::ChannelUnavailable { .. })
    }
}

/// Factory function type for creating driver instances.
pub type DriverFactory = fn(&PtzConfig) -> Box<dyn MotorDriver>;

/// An exclusively owned handle to one axis' motor driver.
///
/// Dropping the channel closes the handle.
pub trait ControlChannel: fmt::Debug {
    /// Human-readable description of how the channel was obtained
    /// (e.g. `dev:/dev/motor0`).
    fn describe(&self) -> &str;

    /// Send `code` with a 32-bit signed step payload.
    fn send(&mut self, code: u64, step: i32) -> Result<(), Errno>;

    /// Send `code` with a zeroed 8-byte buffer and return what the driver wrote back.
    fn send_wide(&mut self, code: u64) -> Result<u64, Errno>;
}

/// Trait defining the interface for motor drivers.
///
/// A driver holds no open handles between calls: every `open()` yields a new
/// channel that the caller owns and drops when the command is done.
pub trait MotorDriver: Send {
    /// Returns the driver's unique identifier (e.g., "kernel", "simulation").
    fn name(&self) -> &'static str;

    /// Open a fresh control channel for `axis`.
    ///
    /// # Errors
    /// Returns `HalError::ChannelUnavailable` when no strategy yields a handle.
    fn open(&self, axis: Axis) -> Result<Box<dyn ControlChannel>, HalError>;
}
