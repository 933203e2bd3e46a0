//! Continuous motion scheduler.
//!
//! There is no thread or timer behind continuous motion: the caller drives
//! [`ContinuousScheduler::tick`] on its own cadence and every tick re-issues
//! the armed command of each axis whose due time has passed.
//!
//! ```text
//!   Idle ──arm──► Armed ──disarm / failed re-issue──► Idle
//!                  │  ▲
//!                  └──┘ tick (due): issue, next_due += interval
//! ```
//!
//! Time is always passed in explicitly, so the state machine is
//! deterministic under test.

use crate::issuer::{CommandIssuer, MotorCommand};
use ptz_common::hal::config::PtzConfig;
use ptz_common::hal::driver::HalError;
use ptz_common::hal::types::{Axis, Direction};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Continuous state of one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContinuousState {
    /// Armed.
    pub active: bool,
    /// Direction of the armed command.
    pub direction: Option<Direction>,
    /// Signed step re-issued on every due tick.
    pub step: i32,
    /// Repeat count of each re-issue.
    pub repeat: i32,
    /// Monotonic time at which the next re-issue is due.
    pub next_due: Option<Instant>,
}

/// Per-axis armable re-issue schedule.
#[derive(Debug, Clone)]
pub struct ContinuousScheduler {
    states: [ContinuousState; 2],
    interval: Duration,
    move_code: u64,
}

impl ContinuousScheduler {
    /// Create an idle scheduler re-issuing `move_code` every `interval`.
    pub fn new(interval: Duration, move_code: u64) -> Self {
        Self {
            states: [ContinuousState::default(); 2],
            interval,
            move_code,
        }
    }

    /// Scheduler configured from the session parameters.
    pub fn from_config(config: &PtzConfig) -> Self {
        Self::new(config.continuous_interval(), config.ioctl_move)
    }

    /// Current state of `axis`.
    pub fn state(&self, axis: Axis) -> &ContinuousState {
        &self.states[axis.index()]
    }

    /// Whether any axis is armed.
    pub fn is_active(&self) -> bool {
        self.states.iter().any(|s| s.active)
    }

    /// Arm `axis`, due immediately at `now`. Replaces any armed command.
    pub fn arm(&mut self, axis: Axis, direction: Direction, step: i32, repeat: i32, now: Instant) {
        self.states[axis.index()] = ContinuousState {
            active: true,
            direction: Some(direction),
            step,
            repeat: repeat.max(1),
            next_due: Some(now),
        };
        debug!("continuous arm axis={} dir={} step={} rep={}", axis, direction, step, repeat.max(1));
    }

    /// Return `axis` to idle. Sends nothing.
    pub fn disarm(&mut self, axis: Axis) {
        self.states[axis.index()].active = false;
    }

    /// Re-issue every armed command that is due at `now`.
    ///
    /// Returns whether anything was issued. Never blocks beyond the repeat
    /// pacing of the issued commands.
    ///
    /// # Errors
    /// The first failed re-issue disarms its axis and aborts the tick; the
    /// other axis is not attempted in the same call.
    pub fn tick(&mut self, issuer: &CommandIssuer, now: Instant) -> Result<bool, HalError> {
        let mut issued = false;

        for axis in Axis::ALL {
            let state = self.states[axis.index()];
            if !state.active {
                continue;
            }
            let due = state.next_due.unwrap_or(now);
            if now < due {
                continue;
            }

            let command = MotorCommand {
                axis,
                direction: state.direction,
                step: state.step,
                repeat: state.repeat,
                code: self.move_code,
            };
            if let Err(e) = issuer.issue(&command, true) {
                warn!("continuous re-issue failed, disarming {} axis", axis);
                self.disarm(axis);
                return Err(e);
            }

            // After a stall, resume from now instead of bursting to catch up.
            let mut next = due + self.interval;
            if next <= now {
                next = now + self.interval;
            }
            self.states[axis.index()].next_due = Some(next);
            issued = true;
        }

        Ok(issued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::simulation::SimulatedMotorDriver;
    use nix::errno::Errno;

    const MOVE: u64 = 0x4004_6d40;
    const INTERVAL: Duration = Duration::from_millis(80);

    fn setup() -> (SimulatedMotorDriver, CommandIssuer, ContinuousScheduler) {
        let sim = SimulatedMotorDriver::new();
        let issuer = CommandIssuer::new(Box::new(sim.clone()));
        (sim, issuer, ContinuousScheduler::new(INTERVAL, MOVE))
    }

    #[test]
    fn idle_tick_issues_nothing() {
        let (sim, issuer, mut scheduler) = setup();
        assert!(!scheduler.tick(&issuer, Instant::now()).unwrap());
        assert!(sim.requests().is_empty());
    }

    #[test]
    fn armed_axis_is_due_immediately() {
        let (sim, issuer, mut scheduler) = setup();
        let t0 = Instant::now();
        scheduler.arm(Axis::Pan, Direction::Right, 68, 1, t0);

        assert!(scheduler.tick(&issuer, t0).unwrap());
        assert_eq!(sim.steps(Axis::Pan, MOVE), vec![68]);
        assert_eq!(scheduler.state(Axis::Pan).next_due, Some(t0 + INTERVAL));
    }

    #[test]
    fn tick_before_due_does_nothing() {
        let (sim, issuer, mut scheduler) = setup();
        let t0 = Instant::now();
        scheduler.arm(Axis::Pan, Direction::Right, 68, 1, t0);
        scheduler.tick(&issuer, t0).unwrap();

        let early = t0 + INTERVAL - Duration::from_millis(1);
        assert!(!scheduler.tick(&issuer, early).unwrap());
        assert_eq!(sim.steps(Axis::Pan, MOVE).len(), 1);

        assert!(scheduler.tick(&issuer, t0 + INTERVAL).unwrap());
        assert_eq!(sim.steps(Axis::Pan, MOVE).len(), 2);
        assert_eq!(scheduler.state(Axis::Pan).next_due, Some(t0 + INTERVAL * 2));
    }

    #[test]
    fn rearm_replaces_previous_command() {
        let (sim, issuer, mut scheduler) = setup();
        let t0 = Instant::now();
        scheduler.arm(Axis::Tilt, Direction::Up, 20, 1, t0);
        scheduler.arm(Axis::Tilt, Direction::Down, -30, 2, t0);

        scheduler.tick(&issuer, t0).unwrap();
        assert_eq!(sim.steps(Axis::Tilt, MOVE), vec![-30, -30]);
        assert_eq!(scheduler.state(Axis::Tilt).direction, Some(Direction::Down));
    }

    #[test]
    fn stall_snaps_schedule_forward() {
        let (sim, issuer, mut scheduler) = setup();
        let t0 = Instant::now();
        scheduler.arm(Axis::Pan, Direction::Left, -68, 1, t0);
        scheduler.tick(&issuer, t0).unwrap();

        let late = t0 + Duration::from_secs(2);
        assert!(scheduler.tick(&issuer, late).unwrap());
        assert_eq!(scheduler.state(Axis::Pan).next_due, Some(late + INTERVAL));

        // No catch-up burst right after the stall.
        assert!(!scheduler.tick(&issuer, late + Duration::from_millis(1)).unwrap());
        assert_eq!(sim.steps(Axis::Pan, MOVE).len(), 2);
    }

    #[test]
    fn next_due_always_in_future_after_success() {
        let (_sim, issuer, mut scheduler) = setup();
        let t0 = Instant::now();
        scheduler.arm(Axis::Pan, Direction::Right, 1, 1, t0);

        let mut now = t0;
        for step_ms in [0u64, 80, 95, 170, 900, 905, 3000] {
            now = t0 + Duration::from_millis(step_ms);
            let before = scheduler.state(Axis::Pan).next_due;
            if scheduler.tick(&issuer, now).unwrap() {
                let after = scheduler.state(Axis::Pan).next_due.unwrap();
                assert!(after > now);
                assert!(Some(after) > before);
            }
        }
        assert!(scheduler.state(Axis::Pan).next_due.unwrap() > now);
    }

    #[test]
    fn disarm_stops_reissue() {
        let (sim, issuer, mut scheduler) = setup();
        let t0 = Instant::now();
        scheduler.arm(Axis::Pan, Direction::Right, 68, 1, t0);
        scheduler.disarm(Axis::Pan);

        assert!(!scheduler.is_active());
        assert!(!scheduler.tick(&issuer, t0 + INTERVAL).unwrap());
        assert!(sim.requests().is_empty());
    }

    #[test]
    fn failure_disarms_and_skips_other_axis() {
        let (sim, issuer, mut scheduler) = setup();
        let t0 = Instant::now();
        scheduler.arm(Axis::Pan, Direction::Right, 68, 1, t0);
        scheduler.arm(Axis::Tilt, Direction::Up, 17, 1, t0);
        sim.set_rejecting(Axis::Pan, Errno::EIO);

        let err = scheduler.tick(&issuer, t0).unwrap_err();
        assert!(matches!(err, HalError::CommandFailed { axis: Axis::Pan, .. }));
        assert!(!scheduler.state(Axis::Pan).active);
        assert!(scheduler.state(Axis::Tilt).active);
        assert!(sim.steps(Axis::Tilt, MOVE).is_empty());
    }
}
