//! PTZ Common Library
//!
//! This crate provides shared constants, configuration loading and the motor
//! driver interface for all PTZ workspace crates.
//!
//! # Module Structure
//!
//! - [`consts`] - System-wide defaults (paths, pacing, neutral position)
//! - [`config`] - Configuration loading traits and helpers
//! - [`hal`] - Motor configuration, domain types and the driver seam
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use ptz_common::prelude::*;
//!
//! let config = PtzConfig::default();
//! assert_eq!(config.axis(Axis::Pan).max_deg, 360);
//! ```

pub mod config;
pub mod consts;
pub mod hal;
pub mod prelude;
