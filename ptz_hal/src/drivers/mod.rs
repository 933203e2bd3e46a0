//! Motor driver implementations.
//!
//! - [`kernel`] - ioctl requests to the motor kernel module (device node or
//!   cross-process descriptor)
//! - [`simulation`] - Software driver for development and testing
//!
//! # Adding New Drivers
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement the `MotorDriver` trait from `ptz_common::hal::driver`
//! 3. Register the factory in [`builtin_registry`]

pub mod kernel;
pub mod simulation;

use crate::driver_registry::DriverRegistry;

/// Registry populated with every built-in driver.
pub fn builtin_registry() -> DriverRegistry {
    let mut registry = DriverRegistry::new();
    registry.register("kernel", kernel::create_driver);
    registry.register("simulation", simulation::create_driver);
    registry
}
