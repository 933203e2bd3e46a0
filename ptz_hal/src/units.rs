//! Degree/step conversion and per-axis step shaping.
//!
//! Position bookkeeping is done in integer degrees; motor requests carry
//! signed step counts. Everything that turns one into the other lives here
//! and is free of I/O.

use ptz_common::consts::ZOOM_MAX;
use ptz_common::hal::config::{AxisParameters, PtzConfig};
use ptz_common::hal::types::Direction;

/// Speed assumed when a jog does not state one.
pub const DEFAULT_SPEED: f64 = 0.5;

const MIN_SPEED_FACTOR: f64 = 0.01;
const MAX_SPEED_FACTOR: f64 = 1.0;
const MIN_JOG_DEGREES: i32 = 1;
const MAX_JOG_DEGREES: i32 = 25;

/// Parse a textual speed. Empty input means [`DEFAULT_SPEED`], garbage means 0.
pub fn parse_speed(text: &str) -> f64 {
    let text = text.trim();
    if text.is_empty() {
        return DEFAULT_SPEED;
    }
    text.parse().unwrap_or(0.0)
}

/// Sign-stripped speed clamped to `[0.01, 1.0]`.
pub fn speed_factor(speed: f64) -> f64 {
    if speed.is_nan() {
        return MIN_SPEED_FACTOR;
    }
    speed.abs().clamp(MIN_SPEED_FACTOR, MAX_SPEED_FACTOR)
}

/// Degrees represented by a single jog at `speed`, in `[1, 25]`.
pub fn degrees_for_speed(speed: f64) -> i32 {
    let quantum = (speed_factor(speed) * 20.0) as i32 + 2;
    quantum.clamp(MIN_JOG_DEGREES, MAX_JOG_DEGREES)
}

/// Motor steps for `degrees` of travel; never less than 1.
///
/// A degenerate axis (`max_degrees <= 0`) always yields 1.
pub fn steps_for_degrees(degrees: i32, total_steps: i32, max_degrees: i32) -> i32 {
    if max_degrees <= 0 {
        return 1;
    }
    let steps = i64::from(degrees) * i64::from(total_steps) / i64::from(max_degrees);
    steps.clamp(1, i64::from(i32::MAX)) as i32
}

/// Multiplier and repeat for a move in `direction`.
///
/// Cascade: global default, then the axis override, then the tilt
/// up/down override. Only strictly positive values override.
pub fn resolve_multiplier_and_repeat(
    step_mult: i32,
    step_repeat: i32,
    params: &AxisParameters,
    direction: Direction,
) -> (i32, i32) {
    let overrides = params.direction_override(direction);
    let mult = overrides
        .step_mult
        .or(params.step_mult)
        .unwrap_or(step_mult);
    let repeat = overrides
        .step_repeat
        .or(params.step_repeat)
        .unwrap_or(step_repeat);
    (mult, repeat)
}

/// Clamp `|step|` to `cap`, keeping the sign. A cap `<= 0` means uncapped.
pub fn clamp_absolute_step(step: i32, cap: i32) -> i32 {
    if cap <= 0 {
        return step;
    }
    step.clamp(-cap, cap)
}

/// Negate `step` when the axis is wired inverted.
pub fn apply_polarity(params: &AxisParameters, step: i32) -> i32 {
    if params.invert { -step } else { step }
}

/// Shaped motor request for one jog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JogStep {
    /// Steps for the degree quantum before multiplier and sign.
    pub base_step: i32,
    /// Final signed payload.
    pub step: i32,
    /// Multiplier applied.
    pub mult: i32,
    /// Repeat count for a one-shot move.
    pub repeat: i32,
}

/// Shape the step of a pan/tilt jog covering `degrees`.
///
/// Order: base steps, direction sign, multiplier (when > 1), polarity,
/// then the tilt caps (axis cap, then the up/down cap).
pub fn plan_jog(config: &PtzConfig, params: &AxisParameters, direction: Direction, degrees: i32) -> JogStep {
    let base_step = steps_for_degrees(degrees, params.total_steps, params.max_deg);
    let (mult, repeat) =
        resolve_multiplier_and_repeat(config.step_mult, config.step_repeat, params, direction);

    let mut step = direction.sign() * base_step;
    if mult > 1 {
        step = step.saturating_mul(mult);
    }
    step = apply_polarity(params, step);
    step = clamp_absolute_step(step, params.step_abs_max);
    step = clamp_absolute_step(step, params.direction_override(direction).step_abs_max);

    JogStep {
        base_step,
        step,
        mult,
        repeat,
    }
}

/// Per-tick step of a continuous jog: `step / divisor`, never 0.
pub fn continuous_step(step: i32, divisor: i32) -> i32 {
    let run = step / divisor.max(1);
    match run {
        0 if step < 0 => -1,
        0 => 1,
        run => run,
    }
}

/// Speed-set payload for a factor, or `None` when the axis has no speed unit.
pub fn speed_step_for(base_speed_step: i32, factor: f64) -> Option<i32> {
    if base_speed_step <= 0 {
        return None;
    }
    let scaled = (f64::from(base_speed_step) * factor).round() as i32;
    Some(scaled.clamp(1, base_speed_step))
}

/// Degree target of a normalized coordinate in `[-1, 1]`.
pub fn absolute_degrees(normalized: f64, max_degrees: i32) -> i32 {
    let target = ((normalized + 1.0) * (f64::from(max_degrees) / 2.0)) as i32;
    target.clamp(0, max_degrees.max(0))
}

/// Degree delta of a normalized offset.
pub fn relative_degrees(normalized: f64, max_degrees: i32) -> i32 {
    (normalized * (f64::from(max_degrees) / 2.0)) as i32
}

/// Zoom percent of a normalized coordinate in `[-1, 1]`.
pub fn absolute_zoom(normalized: f64) -> i32 {
    (((normalized + 1.0) * 50.0) as i32).clamp(0, ZOOM_MAX)
}

/// Zoom percent delta of a normalized offset.
pub fn relative_zoom(normalized: f64) -> i32 {
    (normalized * 10.0) as i32
}
