//! Motion session: the orchestrator behind every PTZ operation.
//!
//! `MotionSession` owns the configuration, the command issuer, the per-axis
//! continuous scheduler and the state store. Physical actuation and position
//! bookkeeping are independently best effort: a failed position write is
//! logged and never rolled back against motion already performed, and homing
//! records the centered position even when the hardware refused to center.

use crate::issuer::{CommandIssuer, MotorCommand};
use crate::scheduler::ContinuousScheduler;
use crate::state::StateStore;
use crate::units::{
    absolute_degrees, absolute_zoom, apply_polarity, continuous_step, degrees_for_speed,
    plan_jog, relative_degrees, relative_zoom, speed_factor, speed_step_for, steps_for_degrees,
};
use ptz_common::consts::ZOOM_MAX;
use ptz_common::hal::config::PtzConfig;
use ptz_common::hal::driver::{HalError, MotorDriver};
use ptz_common::hal::types::{Axis, Direction, NormalizedPosition};
use std::thread;
use std::time::Instant;
use tracing::{info, warn};

/// Motion session bound to one configuration and one motor driver.
pub struct MotionSession {
    /// Parameters, fixed for the session lifetime
    config: PtzConfig,
    /// Per-request channel owner
    issuer: CommandIssuer,
    /// Continuous re-issue state for both axes
    scheduler: ContinuousScheduler,
    /// Position and preset files
    store: StateStore,
}

impl MotionSession {
    /// Start a session. The state directory is created on a best-effort basis.
    pub fn new(config: PtzConfig, driver: Box<dyn MotorDriver>) -> Self {
        let store = StateStore::new(&config.state_dir);
        if let Err(e) = store.ensure_dir() {
            warn!("{}", e);
        }

        info!(
            "session driver={} backend={:?} continuous={} interval={:?}",
            driver.name(),
            config.motor_backend,
            config.continuous_mode,
            config.continuous_interval()
        );

        Self {
            scheduler: ContinuousScheduler::from_config(&config),
            issuer: CommandIssuer::new(driver),
            store,
            config,
        }
    }

    /// Session parameters.
    pub fn config(&self) -> &PtzConfig {
        &self.config
    }

    /// Position and preset store.
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Continuous scheduler state.
    pub fn scheduler(&self) -> &ContinuousScheduler {
        &self.scheduler
    }

    /// Last persisted position, clamped into the travel range.
    pub fn position(&self) -> NormalizedPosition {
        self.store
            .read_position()
            .clamped(self.config.pan_max_deg, self.config.tilt_max_deg)
    }

    /// Whether continuous motion is armed on any axis.
    pub fn is_moving(&self) -> bool {
        self.scheduler.is_active()
    }

    /// Jog in `direction`; see [`jog_at`](Self::jog_at).
    pub fn jog(&mut self, direction: Direction, speed: f64) -> Result<NormalizedPosition, HalError> {
        self.jog_at(direction, speed, Instant::now())
    }

    /// Jog in `direction` at a normalized `speed`, arming continuous motion
    /// due at `now` when continuous mode is on.
    ///
    /// The speed doubles as the distance of the jog: it selects a degree
    /// quantum by which the persisted position moves, whatever the step
    /// count actually sent. Zoom jogs only adjust the persisted zoom, and
    /// only when the device has a zoom axis.
    ///
    /// # Errors
    /// Channel or command failures of the one-shot move. Nothing is
    /// persisted in that case. In continuous mode nothing is sent here.
    pub fn jog_at(
        &mut self,
        direction: Direction,
        speed: f64,
        now: Instant,
    ) -> Result<NormalizedPosition, HalError> {
        let degrees = degrees_for_speed(speed);
        let factor = speed_factor(speed);

        let Some(axis) = direction.axis() else {
            let mut position = self.position();
            if self.config.zoom_supported {
                position.zoom = (position.zoom + direction.sign() * degrees).clamp(0, ZOOM_MAX);
                self.persist(position);
            }
            info!("move dir={} deg={} pos={}", direction, degrees, position);
            return Ok(position);
        };

        let params = self.config.axis(axis);
        let plan = plan_jog(&self.config, &params, direction, degrees);

        self.set_speed(axis, direction, factor);

        if self.config.continuous_mode {
            let run_step = continuous_step(plan.step, self.config.continuous_divisor());
            self.scheduler
                .arm(axis, direction, run_step, self.config.continuous_repeat(), now);
        } else {
            let command = MotorCommand {
                axis,
                direction: Some(direction),
                step: plan.step,
                repeat: plan.repeat,
                code: self.config.ioctl_move,
            };
            self.issuer.issue(&command, true).inspect_err(|_| {
                warn!("move failed dir={} step={} addr={:#x}", direction, plan.step, params.fd_addr);
            })?;
        }

        let mut position = self.position();
        let degrees_at = position.degrees_mut(axis);
        *degrees_at = degrees_at.saturating_add(direction.sign() * degrees);
        let position = position.clamped(self.config.pan_max_deg, self.config.tilt_max_deg);
        self.persist(position);

        info!(
            "move dir={} factor={} deg={} base_step={} step={} mult={} rep={} invert={}/{} pos={}",
            direction,
            factor,
            degrees,
            plan.base_step,
            plan.step,
            plan.mult,
            plan.repeat,
            u8::from(self.config.pan_invert),
            u8::from(self.config.tilt_invert),
            position
        );
        Ok(position)
    }

    /// Disarm both axes, then send a stop request to each.
    ///
    /// Always sends, even when nothing was armed; some drivers only halt on
    /// an explicit stop. Stop failures are logged by the issuer and ignored.
    pub fn stop(&mut self) {
        for axis in Axis::ALL {
            self.scheduler.disarm(axis);
        }
        for axis in Axis::ALL {
            let command = MotorCommand {
                axis,
                direction: None,
                step: 0,
                repeat: 1,
                code: self.config.ioctl_stop,
            };
            let _ = self.issuer.issue(&command, true);
        }
        info!("move stop");
    }

    /// Stop, center both axes when a center request is configured, and
    /// persist the centered position regardless of the outcome.
    ///
    /// # Errors
    /// `HomingFailed` only when neither axis centered. The position has
    /// been persisted by then.
    pub fn home(&mut self) -> Result<NormalizedPosition, HalError> {
        self.stop();

        let code = self.config.ioctl_turn_middle;
        let pan = self.issuer.center(Axis::Pan, code, true);
        let tilt = self.issuer.center(Axis::Tilt, code, true);

        let position = NormalizedPosition::new(
            self.config.pan_max_deg / 2,
            self.config.tilt_max_deg / 2,
            0,
        );
        self.persist(position);

        info!("move home pan_ok={} tilt_ok={}", pan.is_ok(), tilt.is_ok());
        match (pan, tilt) {
            (Err(pan), Err(tilt)) => Err(HalError::HomingFailed {
                pan: pan.to_string(),
                tilt: tilt.to_string(),
            }),
            _ => Ok(position),
        }
    }

    /// Move to a normalized target `(x, y, z)`, each in `[-1, 1]`.
    ///
    /// # Errors
    /// The first failed chunk aborts the move. An axis already moved stays
    /// moved and the target is not persisted.
    pub fn move_absolute(&mut self, x: f64, y: f64, z: f64) -> Result<NormalizedPosition, HalError> {
        let target = NormalizedPosition::new(
            absolute_degrees(x, self.config.pan_max_deg),
            absolute_degrees(y, self.config.tilt_max_deg),
            absolute_zoom(z),
        );
        let current = self.position();

        for axis in Axis::ALL {
            self.run_axis_delta(axis, target.degrees(axis).saturating_sub(current.degrees(axis)))?;
        }

        self.persist(target);
        info!("move abs -> pos={} (norm={},{},{})", target, x, y, z);
        Ok(target)
    }

    /// Move by a normalized offset `(dx, dy, dz)`.
    ///
    /// # Errors
    /// As for [`move_absolute`](Self::move_absolute).
    pub fn move_relative(
        &mut self,
        dx: f64,
        dy: f64,
        dz: f64,
    ) -> Result<NormalizedPosition, HalError> {
        let current = self.position();
        let pan = relative_degrees(dx, self.config.pan_max_deg);
        let tilt = relative_degrees(dy, self.config.tilt_max_deg);

        self.run_axis_delta(Axis::Pan, pan)?;
        self.run_axis_delta(Axis::Tilt, tilt)?;

        let position = NormalizedPosition::new(
            current.pan.saturating_add(pan),
            current.tilt.saturating_add(tilt),
            current.zoom.saturating_add(relative_zoom(dz)),
        )
        .clamped(self.config.pan_max_deg, self.config.tilt_max_deg);
        self.persist(position);
        info!("move rel -> pos={} (delta={},{},{})", position, dx, dy, dz);
        Ok(position)
    }

    /// Persist the position stored under preset `id`.
    ///
    /// # Errors
    /// `NotFound` when no record carries `id`; nothing is changed then.
    pub fn recall_preset(&mut self, id: i32) -> Result<NormalizedPosition, HalError> {
        match self.store.find_preset(id)? {
            Some(preset) => {
                let position = preset
                    .position
                    .clamped(self.config.pan_max_deg, self.config.tilt_max_deg);
                self.persist(position);
                info!("move preset={} ({}) -> pos={}", preset.id, preset.name, position);
                Ok(position)
            }
            None => {
                info!("preset {} not found", id);
                Err(HalError::NotFound(format!("preset {id}")))
            }
        }
    }

    /// Drive the continuous scheduler with the current time.
    pub fn tick(&mut self) -> Result<bool, HalError> {
        self.tick_at(Instant::now())
    }

    /// Drive the continuous scheduler at `now`. Returns whether anything was
    /// re-issued.
    pub fn tick_at(&mut self, now: Instant) -> Result<bool, HalError> {
        self.scheduler.tick(&self.issuer, now)
    }

    /// Move `axis` by a signed degree delta as a sequence of capped chunks.
    fn run_axis_delta(&self, axis: Axis, delta: i32) -> Result<(), HalError> {
        if delta == 0 {
            return Ok(());
        }

        let params = self.config.axis(axis);
        let direction = Direction::for_delta(axis, delta);
        let sign = delta.signum();
        let chunk = self.config.chunk_steps();
        let interval = self.config.chunk_interval();
        let mut remaining = steps_for_degrees(delta.saturating_abs(), params.total_steps, params.max_deg);

        // Abs/rel moves carry no speed of their own.
        self.set_speed(axis, direction, 1.0);

        while remaining > 0 {
            let one = remaining.min(chunk);
            let command = MotorCommand {
                axis,
                direction: Some(direction),
                step: apply_polarity(&params, sign * one),
                repeat: 1,
                code: self.config.ioctl_move,
            };
            self.issuer.issue(&command, false).inspect_err(|_| {
                warn!(
                    "absrel move failed dir={} step={} addr={:#x}",
                    direction, command.step, params.fd_addr
                );
            })?;

            remaining -= one;
            if remaining > 0 && !interval.is_zero() {
                thread::sleep(interval);
            }
        }
        Ok(())
    }

    /// One-shot speed-set ahead of a move, when enabled. Failures only log.
    fn set_speed(&self, axis: Axis, direction: Direction, factor: f64) {
        if !self.config.set_speed_each_move {
            return;
        }
        let params = self.config.axis(axis);
        let Some(speed_step) = speed_step_for(params.speed_step, factor) else {
            return;
        };

        let command = MotorCommand {
            axis,
            direction: Some(direction),
            step: speed_step,
            repeat: 1,
            code: self.config.ioctl_set_speed,
        };
        if self.issuer.issue(&command, true).is_err() {
            warn!(
                "speed set failed dir={} speed_step={} factor={} addr={:#x}",
                direction, speed_step, factor, params.fd_addr
            );
        }
    }

    fn persist(&self, position: NormalizedPosition) {
        if let Err(e) = self.store.write_position(position) {
            warn!("{}", e);
        }
    }
}
