//! Prelude module for common re-exports.
//!
//! ```rust
//! use ptz_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel};
pub use crate::hal::config::{AxisParameters, ChannelBackend, DirectionOverride, PtzConfig};

// ─── Motion types ───────────────────────────────────────────────────
pub use crate::hal::types::{Axis, Direction, NormalizedPosition, Preset};

// ─── Driver seam ────────────────────────────────────────────────────
pub use crate::hal::driver::{ControlChannel, DriverFactory, HalError, MotorDriver};
