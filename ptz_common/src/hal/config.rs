//! PTZ configuration types.
//!
//! This module contains the configuration for the motor engine:
//! - `PtzConfig` - Flat parameter set, loaded once per session
//! - `AxisParameters` - Immutable per-axis view derived from `PtzConfig`
//! - `ChannelBackend` - Channel discovery mode
//!
//! Parameters come either from a legacy `KEY=VALUE` file (keys are the
//! uppercase field names, e.g. `PAN_MAX_DEG=360`) or from a TOML file with
//! the lowercase field names. Unknown keys are ignored and malformed values
//! keep their compiled-in defaults.

use crate::config::{
    kv_pairs, parse_hex, parse_int, read_config_file, ConfigError, ConfigLoader, LogLevel,
};
use crate::consts::{
    DEFAULT_LOG_FILE, DEFAULT_STATE_DIR, MAX_CHUNK_INTERVAL_MS, MAX_CONTINUOUS_INTERVAL_MS,
    MIN_CONTINUOUS_INTERVAL_MS,
};
use crate::hal::types::{Axis, Direction};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::trace;

/// How a control channel to the motor driver is located.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChannelBackend {
    /// Device node first, then cross-process discovery if an address is configured.
    #[default]
    Auto,
    /// Device node only.
    DeviceOnly,
    /// Cross-process descriptor discovery only.
    LegacyOnly,
}

impl ChannelBackend {
    /// Map the numeric `MOTOR_BACKEND` value; unknown values select `Auto`.
    pub const fn from_i32(value: i32) -> Self {
        match value {
            1 => Self::DeviceOnly,
            2 => Self::LegacyOnly,
            _ => Self::Auto,
        }
    }

    /// Whether the device-node strategy may be tried.
    pub const fn tries_device(self) -> bool {
        matches!(self, Self::Auto | Self::DeviceOnly)
    }

    /// Whether the cross-process strategy may be tried.
    pub const fn tries_legacy(self) -> bool {
        matches!(self, Self::Auto | Self::LegacyOnly)
    }
}

/// Complete parameter set of a motion session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PtzConfig {
    /// Process name owning the motor driver descriptors (`ANYKA_PROC`).
    pub owner_process: String,
    /// Explicit owner pid; used instead of scanning when > 1 (`ANYKA_PID`).
    pub owner_pid: i32,
    /// Directory of the position record and preset database.
    pub state_dir: PathBuf,
    /// Append-only log file.
    pub log_file: PathBuf,

    /// Pan device node.
    pub pan_dev: PathBuf,
    /// Tilt device node.
    pub tilt_dev: PathBuf,
    /// Channel discovery mode (`MOTOR_BACKEND`).
    pub motor_backend: ChannelBackend,

    /// Address of the pan descriptor number inside the owner process.
    pub pan_fd_addr: u64,
    /// Address of the tilt descriptor number inside the owner process.
    pub tilt_fd_addr: u64,
    /// Move request code.
    pub ioctl_move: u64,
    /// Stop request code.
    pub ioctl_stop: u64,
    /// Speed-set request code.
    pub ioctl_set_speed: u64,
    /// Center request code; 0 disables hardware centering.
    pub ioctl_turn_middle: u64,

    /// Pan travel in degrees.
    pub pan_max_deg: i32,
    /// Motor steps over the full pan travel.
    pub pan_total_steps: i32,
    /// Tilt travel in degrees.
    pub tilt_max_deg: i32,
    /// Motor steps over the full tilt travel.
    pub tilt_total_steps: i32,

    /// Negate pan step payloads.
    pub pan_invert: bool,
    /// Negate tilt step payloads.
    pub tilt_invert: bool,

    /// Global step multiplier.
    pub step_mult: i32,
    /// Global repeat count.
    pub step_repeat: i32,
    /// Pan multiplier override (> 0 to apply).
    pub pan_step_mult: i32,
    /// Pan repeat override (> 0 to apply).
    pub pan_step_repeat: i32,

    /// Tilt multiplier override (> 0 to apply).
    pub tilt_step_mult: i32,
    /// Tilt repeat override (> 0 to apply).
    pub tilt_step_repeat: i32,
    /// Tilt step magnitude cap (0 = uncapped).
    pub tilt_step_abs_max: i32,

    /// Tilt-up multiplier override.
    pub tilt_up_step_mult: i32,
    /// Tilt-up repeat override.
    pub tilt_up_step_repeat: i32,
    /// Tilt-up step magnitude cap.
    pub tilt_up_step_abs_max: i32,

    /// Tilt-down multiplier override.
    pub tilt_down_step_mult: i32,
    /// Tilt-down repeat override.
    pub tilt_down_step_repeat: i32,
    /// Tilt-down step magnitude cap.
    pub tilt_down_step_abs_max: i32,

    /// Pan full-speed step unit for the speed-set request.
    pub pan_speed_step: i32,
    /// Tilt full-speed step unit for the speed-set request.
    pub tilt_speed_step: i32,
    /// Issue a speed-set request before every move.
    pub set_speed_each_move: bool,

    /// Jogs arm the continuous scheduler instead of moving once.
    pub continuous_mode: bool,
    /// Continuous re-issue interval in ms (clamped to 5..=1000).
    pub worker_interval_ms: i32,
    /// Divisor applied to the jog step in continuous mode.
    pub continuous_step_div: i32,
    /// Repeat count of each continuous re-issue.
    pub continuous_rep: i32,

    /// Maximum steps per absolute/relative chunk.
    pub absrel_chunk_steps: i32,
    /// Pause between absolute/relative chunks in ms.
    pub absrel_interval_ms: i32,

    /// The head has a (state-only) zoom.
    pub zoom_supported: bool,
    /// Enable the append-only log file.
    pub debug_log: bool,
    /// Console/file log verbosity.
    pub log_level: LogLevel,
}

impl Default for PtzConfig {
    fn default() -> Self {
        Self {
            owner_process: "anyka_ipc".to_string(),
            owner_pid: 0,
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            pan_dev: PathBuf::from("/dev/motor0"),
            tilt_dev: PathBuf::from("/dev/motor1"),
            motor_backend: ChannelBackend::Auto,
            pan_fd_addr: 0x53_7760,
            tilt_fd_addr: 0x53_77d0,
            ioctl_move: 0x4004_6d40,
            ioctl_stop: 0x4004_6d42,
            ioctl_set_speed: 0x4004_6d20,
            ioctl_turn_middle: 0x4004_6d60,
            pan_max_deg: 360,
            pan_total_steps: 4096,
            tilt_max_deg: 196,
            tilt_total_steps: 2230,
            pan_invert: false,
            tilt_invert: false,
            step_mult: 4,
            step_repeat: 8,
            pan_step_mult: -1,
            pan_step_repeat: -1,
            tilt_step_mult: -1,
            tilt_step_repeat: -1,
            tilt_step_abs_max: 0,
            tilt_up_step_mult: -1,
            tilt_up_step_repeat: -1,
            tilt_up_step_abs_max: 0,
            tilt_down_step_mult: -1,
            tilt_down_step_repeat: -1,
            tilt_down_step_abs_max: 0,
            pan_speed_step: 800,
            tilt_speed_step: 600,
            set_speed_each_move: false,
            continuous_mode: true,
            worker_interval_ms: 80,
            continuous_step_div: 8,
            continuous_rep: 1,
            absrel_chunk_steps: 64,
            absrel_interval_ms: 30,
            zoom_supported: false,
            debug_log: true,
            log_level: LogLevel::Info,
        }
    }
}

impl PtzConfig {
    /// Load a configuration file.
    ///
    /// `*.toml` files are parsed as TOML; anything else as legacy `KEY=VALUE`.
    ///
    /// # Errors
    /// `ConfigError::FileNotFound` if the file is missing, `ParseError` for
    /// unreadable files or invalid TOML. Malformed legacy values never fail.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        if is_toml {
            return <Self as ConfigLoader>::load(path);
        }

        let content = read_config_file(path)?;
        Ok(Self::from_kv_str(&content))
    }

    /// Build a configuration from legacy `KEY=VALUE` text on top of the defaults.
    pub fn from_kv_str(content: &str) -> Self {
        let mut config = Self::default();
        for (key, value) in kv_pairs(content) {
            if !config.apply_kv(key, value) {
                trace!("Ignoring unknown config key {}", key);
            }
        }
        config
    }

    /// Apply one legacy parameter. Returns false for unknown keys.
    pub fn apply_kv(&mut self, key: &str, value: &str) -> bool {
        fn int(slot: &mut i32, value: &str) {
            *slot = parse_int(value, *slot);
        }
        fn hex(slot: &mut u64, value: &str) {
            *slot = parse_hex(value, *slot);
        }
        fn flag(slot: &mut bool, value: &str) {
            *slot = parse_int(value, i32::from(*slot)) != 0;
        }

        match key {
            "ANYKA_PROC" => self.owner_process = value.to_string(),
            "STATE_DIR" => self.state_dir = PathBuf::from(value),
            "LOG_FILE" => self.log_file = PathBuf::from(value),
            "PAN_DEV" => self.pan_dev = PathBuf::from(value),
            "TILT_DEV" => self.tilt_dev = PathBuf::from(value),

            "PAN_FD_ADDR" => hex(&mut self.pan_fd_addr, value),
            "TILT_FD_ADDR" => hex(&mut self.tilt_fd_addr, value),
            "IOCTL_MOVE" => hex(&mut self.ioctl_move, value),
            "IOCTL_STOP" => hex(&mut self.ioctl_stop, value),
            "IOCTL_SET_SPEED" => hex(&mut self.ioctl_set_speed, value),
            "IOCTL_TURN_MIDDLE" => hex(&mut self.ioctl_turn_middle, value),

            "ANYKA_PID" => int(&mut self.owner_pid, value),
            "MOTOR_BACKEND" => {
                let current = self.motor_backend as i32;
                self.motor_backend = ChannelBackend::from_i32(parse_int(value, current));
            }
            "PAN_MAX_DEG" => int(&mut self.pan_max_deg, value),
            "PAN_TOTAL_STEPS" => int(&mut self.pan_total_steps, value),
            "TILT_MAX_DEG" => int(&mut self.tilt_max_deg, value),
            "TILT_TOTAL_STEPS" => int(&mut self.tilt_total_steps, value),
            "PAN_INVERT" => flag(&mut self.pan_invert, value),
            "TILT_INVERT" => flag(&mut self.tilt_invert, value),
            "STEP_MULT" => int(&mut self.step_mult, value),
            "STEP_REPEAT" => int(&mut self.step_repeat, value),
            "PAN_STEP_MULT" => int(&mut self.pan_step_mult, value),
            "PAN_STEP_REPEAT" => int(&mut self.pan_step_repeat, value),
            "TILT_STEP_MULT" => int(&mut self.tilt_step_mult, value),
            "TILT_STEP_REPEAT" => int(&mut self.tilt_step_repeat, value),
            "TILT_STEP_ABS_MAX" => int(&mut self.tilt_step_abs_max, value),
            "TILT_UP_STEP_MULT" => int(&mut self.tilt_up_step_mult, value),
            "TILT_UP_STEP_REPEAT" => int(&mut self.tilt_up_step_repeat, value),
            "TILT_UP_STEP_ABS_MAX" => int(&mut self.tilt_up_step_abs_max, value),
            "TILT_DOWN_STEP_MULT" => int(&mut self.tilt_down_step_mult, value),
            "TILT_DOWN_STEP_REPEAT" => int(&mut self.tilt_down_step_repeat, value),
            "TILT_DOWN_STEP_ABS_MAX" => int(&mut self.tilt_down_step_abs_max, value),
            "PAN_SPEED_STEP" => int(&mut self.pan_speed_step, value),
            "TILT_SPEED_STEP" => int(&mut self.tilt_speed_step, value),
            "SET_SPEED_EACH_MOVE" => flag(&mut self.set_speed_each_move, value),
            "CONTINUOUS_MODE" => flag(&mut self.continuous_mode, value),
            "WORKER_INTERVAL_MS" => int(&mut self.worker_interval_ms, value),
            "CONTINUOUS_STEP_DIV" => int(&mut self.continuous_step_div, value),
            "CONTINUOUS_REP" => int(&mut self.continuous_rep, value),
            "ABSREL_CHUNK_STEPS" => int(&mut self.absrel_chunk_steps, value),
            "ABSREL_INTERVAL_MS" => int(&mut self.absrel_interval_ms, value),
            "ZOOM_SUPPORTED" => flag(&mut self.zoom_supported, value),
            "DEBUG_LOG" => flag(&mut self.debug_log, value),
            "LOG_LEVEL" => {
                if let Some(level) = LogLevel::parse(value) {
                    self.log_level = level;
                }
            }
            _ => return false,
        }
        true
    }

    /// Immutable parameter view of one axis.
    pub fn axis(&self, axis: Axis) -> AxisParameters {
        match axis {
            Axis::Pan => AxisParameters {
                axis,
                total_steps: self.pan_total_steps,
                max_deg: self.pan_max_deg,
                invert: self.pan_invert,
                step_mult: positive(self.pan_step_mult),
                step_repeat: positive(self.pan_step_repeat),
                step_abs_max: 0,
                up: DirectionOverride::NONE,
                down: DirectionOverride::NONE,
                speed_step: self.pan_speed_step,
                device: self.pan_dev.clone(),
                fd_addr: self.pan_fd_addr,
            },
            Axis::Tilt => AxisParameters {
                axis,
                total_steps: self.tilt_total_steps,
                max_deg: self.tilt_max_deg,
                invert: self.tilt_invert,
                step_mult: positive(self.tilt_step_mult),
                step_repeat: positive(self.tilt_step_repeat),
                step_abs_max: self.tilt_step_abs_max,
                up: DirectionOverride {
                    step_mult: positive(self.tilt_up_step_mult),
                    step_repeat: positive(self.tilt_up_step_repeat),
                    step_abs_max: self.tilt_up_step_abs_max,
                },
                down: DirectionOverride {
                    step_mult: positive(self.tilt_down_step_mult),
                    step_repeat: positive(self.tilt_down_step_repeat),
                    step_abs_max: self.tilt_down_step_abs_max,
                },
                speed_step: self.tilt_speed_step,
                device: self.tilt_dev.clone(),
                fd_addr: self.tilt_fd_addr,
            },
        }
    }

    /// Travel limit of an axis in degrees.
    pub fn max_deg(&self, axis: Axis) -> i32 {
        match axis {
            Axis::Pan => self.pan_max_deg,
            Axis::Tilt => self.tilt_max_deg,
        }
    }

    /// Continuous re-issue interval, clamped to 5..=1000 ms.
    pub fn continuous_interval(&self) -> Duration {
        let ms = self
            .worker_interval_ms
            .clamp(MIN_CONTINUOUS_INTERVAL_MS, MAX_CONTINUOUS_INTERVAL_MS);
        Duration::from_millis(ms as u64)
    }

    /// Pause between absolute/relative chunks, clamped to 0..=1000 ms.
    pub fn chunk_interval(&self) -> Duration {
        let ms = self.absrel_interval_ms.clamp(0, MAX_CHUNK_INTERVAL_MS);
        Duration::from_millis(ms as u64)
    }

    /// Maximum steps per chunk (at least 1).
    pub fn chunk_steps(&self) -> i32 {
        self.absrel_chunk_steps.max(1)
    }

    /// Continuous step divisor (at least 1).
    pub fn continuous_divisor(&self) -> i32 {
        self.continuous_step_div.max(1)
    }

    /// Continuous repeat count (at least 1).
    pub fn continuous_repeat(&self) -> i32 {
        self.continuous_rep.max(1)
    }
}

/// Tilt per-direction overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DirectionOverride {
    /// Multiplier override.
    pub step_mult: Option<i32>,
    /// Repeat override.
    pub step_repeat: Option<i32>,
    /// Step magnitude cap (0 = uncapped).
    pub step_abs_max: i32,
}

impl DirectionOverride {
    /// No overrides, uncapped.
    pub const NONE: Self = Self {
        step_mult: None,
        step_repeat: None,
        step_abs_max: 0,
    };
}

/// Per-axis parameters, immutable for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisParameters {
    /// Axis described.
    pub axis: Axis,
    /// Motor steps over the full travel.
    pub total_steps: i32,
    /// Travel in degrees.
    pub max_deg: i32,
    /// Negate step payloads.
    pub invert: bool,
    /// Axis-level multiplier override.
    pub step_mult: Option<i32>,
    /// Axis-level repeat override.
    pub step_repeat: Option<i32>,
    /// Axis-level step magnitude cap (0 = uncapped).
    pub step_abs_max: i32,
    /// Overrides applied when moving up (tilt only).
    pub up: DirectionOverride,
    /// Overrides applied when moving down (tilt only).
    pub down: DirectionOverride,
    /// Full-speed step unit for speed-set requests.
    pub speed_step: i32,
    /// Device node of the motor channel.
    pub device: PathBuf,
    /// Descriptor-number address inside the owner process (0 = none).
    pub fd_addr: u64,
}

impl AxisParameters {
    /// Direction-level overrides for `direction`, if any.
    pub fn direction_override(&self, direction: Direction) -> DirectionOverride {
        match direction {
            Direction::Up => self.up,
            Direction::Down => self.down,
            _ => DirectionOverride::NONE,
        }
    }
}

/// "Override present" means strictly positive.
fn positive(value: i32) -> Option<i32> {
    (value > 0).then_some(value)
}
