//! Shared motion types.

use crate::consts::{NEUTRAL_POSITION, ZOOM_MAX};
use crate::hal::driver::HalError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One independently actuated degree of freedom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Axis {
    /// Horizontal rotation.
    Pan = 0,
    /// Vertical rotation.
    Tilt = 1,
}

impl Axis {
    /// Both motorized axes, in index order.
    pub const ALL: [Axis; 2] = [Axis::Pan, Axis::Tilt];

    /// Index into per-axis arrays.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Lowercase name used in logs.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Pan => "pan",
            Self::Tilt => "tilt",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Jog direction.
///
/// `In`/`Out` address the zoom, which has no motor in this hardware
/// generation and only moves the persisted zoom percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Pan towards lower degrees.
    Left,
    /// Pan towards higher degrees.
    Right,
    /// Tilt towards higher degrees.
    Up,
    /// Tilt towards lower degrees.
    Down,
    /// Zoom in.
    In,
    /// Zoom out.
    Out,
}

impl Direction {
    /// Motor axis driven by this direction, `None` for zoom.
    pub const fn axis(self) -> Option<Axis> {
        match self {
            Self::Left | Self::Right => Some(Axis::Pan),
            Self::Up | Self::Down => Some(Axis::Tilt),
            Self::In | Self::Out => None,
        }
    }

    /// Sign of travel in position space (+1 or -1).
    pub const fn sign(self) -> i32 {
        match self {
            Self::Right | Self::Up | Self::In => 1,
            Self::Left | Self::Down | Self::Out => -1,
        }
    }

    /// Direction that moves `axis` by a delta of the given sign.
    pub const fn for_delta(axis: Axis, delta: i32) -> Self {
        match (axis, delta >= 0) {
            (Axis::Pan, true) => Self::Right,
            (Axis::Pan, false) => Self::Left,
            (Axis::Tilt, true) => Self::Up,
            (Axis::Tilt, false) => Self::Down,
        }
    }

    /// Lowercase name as accepted on the command line.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Up => "up",
            Self::Down => "down",
            Self::In => "in",
            Self::Out => "out",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Direction {
    type Err = HalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            "in" => Ok(Self::In),
            "out" => Ok(Self::Out),
            other => Err(HalError::InvalidRequest(format!(
                "unknown direction '{other}'"
            ))),
        }
    }
}

/// Dead-reckoned head position: pan/tilt degrees and zoom percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedPosition {
    /// Pan degrees in `[0, pan_max_deg]`.
    pub pan: i32,
    /// Tilt degrees in `[0, tilt_max_deg]`.
    pub tilt: i32,
    /// Zoom percent in `[0, 100]`.
    pub zoom: i32,
}

impl NormalizedPosition {
    /// Create a position without clamping.
    pub const fn new(pan: i32, tilt: i32, zoom: i32) -> Self {
        Self { pan, tilt, zoom }
    }

    /// Clamp every component into its travel range.
    pub fn clamped(self, pan_max_deg: i32, tilt_max_deg: i32) -> Self {
        Self {
            pan: self.pan.clamp(0, pan_max_deg.max(0)),
            tilt: self.tilt.clamp(0, tilt_max_deg.max(0)),
            zoom: self.zoom.clamp(0, ZOOM_MAX),
        }
    }

    /// Degrees of the given axis.
    pub const fn degrees(&self, axis: Axis) -> i32 {
        match axis {
            Axis::Pan => self.pan,
            Axis::Tilt => self.tilt,
        }
    }

    /// Mutable degrees of the given axis.
    pub fn degrees_mut(&mut self, axis: Axis) -> &mut i32 {
        match axis {
            Axis::Pan => &mut self.pan,
            Axis::Tilt => &mut self.tilt,
        }
    }
}

impl Default for NormalizedPosition {
    fn default() -> Self {
        let (pan, tilt, zoom) = NEUTRAL_POSITION;
        Self { pan, tilt, zoom }
    }
}

impl fmt::Display for NormalizedPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.pan, self.tilt, self.zoom)
    }
}

/// A named stored position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    /// Numeric identifier used for recall.
    pub id: i32,
    /// Free-form label (no commas).
    pub name: String,
    /// Stored position.
    pub position: NormalizedPosition,
}
