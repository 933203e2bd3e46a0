//! System-wide constants for the PTZ workspace.
//!
//! Single source of truth for default paths and timing limits.

use std::time::Duration;

/// Default configuration file consumed by `ptzctl`.
pub const DEFAULT_CONFIG_PATH: &str = "/tmp/sd/custom/configs/ptz.conf";

/// Default directory for the position record and the preset database.
pub const DEFAULT_STATE_DIR: &str = "/tmp/sd/custom/state";

/// Default append-only log file.
pub const DEFAULT_LOG_FILE: &str = "/tmp/sd/logs/ptz.log";

/// Name of the position record inside the state directory.
pub const POSITION_FILE: &str = "ptz_position";

/// Name of the preset database inside the state directory.
pub const PRESET_FILE: &str = "ptz_presets.db";

/// Position reported when no valid record has been persisted yet
/// (pan degrees, tilt degrees, zoom percent).
pub const NEUTRAL_POSITION: (i32, i32, i32) = (180, 98, 0);

/// Pause between repeats of the same control request.
pub const REPEAT_PACING: Duration = Duration::from_millis(10);

/// Lower bound of the continuous re-issue interval.
pub const MIN_CONTINUOUS_INTERVAL_MS: i32 = 5;

/// Upper bound of the continuous re-issue interval.
pub const MAX_CONTINUOUS_INTERVAL_MS: i32 = 1000;

/// Upper bound of the pause between chunks of an absolute/relative move.
pub const MAX_CHUNK_INTERVAL_MS: i32 = 1000;

/// Cadence at which `ptzctl` drives the continuous scheduler.
pub const TICK_CADENCE: Duration = Duration::from_millis(5);

/// Zoom range in percent.
pub const ZOOM_MAX: i32 = 100;
