//! Motor hardware abstraction.
//!
//! - [`config`] - `PtzConfig` and the per-axis `AxisParameters` view
//! - [`types`] - Axes, directions, positions and presets
//! - [`driver`] - `MotorDriver` / `ControlChannel` traits and `HalError`

pub mod config;
pub mod driver;
pub mod types;
