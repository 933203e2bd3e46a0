//! # PTZ HAL Library
//!
//! Motion command engine for stepper-driven pan/tilt heads whose motor
//! driver is only reachable through ioctl requests.
//!
//! Drivers implement the `MotorDriver` trait defined in
//! `ptz_common::hal::driver`; everything above that seam is hardware
//! independent and runs unchanged against the simulation driver.
//!
//! # Module Structure
//!
//! - [`units`] - Speed, degree and step conversions
//! - [`drivers`] - Kernel and simulation motor drivers
//! - [`driver_registry`] - Driver factory registration
//! - [`issuer`] - One-shot request issuance over fresh channels
//! - [`scheduler`] - Caller-driven continuous re-issue
//! - [`session`] - `MotionSession`, the operation surface
//! - [`state`] - Position record and preset table
//! - [`logging`] - Console and file log sinks
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         ptz_hal                              │
//! │  ┌─────────────┐    ┌──────────────┐    ┌────────────────┐   │
//! │  │ StateStore  │◄──►│ MotionSession│◄──►│ Continuous     │   │
//! │  │ (files)     │    │              │    │ Scheduler      │   │
//! │  └─────────────┘    └──────┬───────┘    └───────┬────────┘   │
//! │                            ▼                    │            │
//! │                   ┌────────────────┐            │            │
//! │                   │ CommandIssuer  │◄───────────┘            │
//! │                   └───────┬────────┘                         │
//! │                           ▼                                  │
//! │                   ┌────────────────┐                         │
//! │                   │  MotorDriver   │ (trait object)          │
//! │                   └────────────────┘                         │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]

pub mod driver_registry;
pub mod drivers;
pub mod issuer;
pub mod logging;
pub mod scheduler;
pub mod session;
pub mod state;
pub mod units;

// Re-export key types for convenience
pub use crate::driver_registry::DriverRegistry;
pub use crate::drivers::builtin_registry;
pub use crate::session::MotionSession;
pub use crate::state::StateStore;
