//! Simulation driver module.
//!
//! Software stand-in for the motor kernel module, for development and
//! testing without a camera head.

mod driver;

pub use driver::{IssuedRequest, SimulatedMotorDriver};

use ptz_common::hal::config::PtzConfig;
use ptz_common::hal::driver::MotorDriver;

/// Factory function to create a simulation driver instance.
pub fn create_driver(_config: &PtzConfig) -> Box<dyn MotorDriver> {
    Box::new(SimulatedMotorDriver::new())
}
