//! End-to-end motion scenarios against the simulation driver.
//!
//! Each test builds a session from a legacy `KEY=VALUE` configuration with
//! the state directory redirected into a temp dir.

use nix::errno::Errno;
use ptz_common::hal::config::PtzConfig;
use ptz_common::hal::driver::HalError;
use ptz_common::hal::types::{Axis, Direction, NormalizedPosition};
use ptz_hal::MotionSession;
use ptz_hal::drivers::simulation::SimulatedMotorDriver;
use ptz_hal::units::parse_speed;
use std::fs;
use std::time::{Duration, Instant};
use tempfile::TempDir;

struct Rig {
    _dir: TempDir,
    sim: SimulatedMotorDriver,
    session: MotionSession,
}

fn rig(extra: &str) -> Rig {
    let dir = TempDir::new().unwrap();
    let text = format!(
        "STATE_DIR={}\nCONTINUOUS_MODE=0\nABSREL_INTERVAL_MS=0\nDEBUG_LOG=0\n{extra}",
        dir.path().join("state").display()
    );
    let config = PtzConfig::from_kv_str(&text);
    let sim = SimulatedMotorDriver::new();
    let session = MotionSession::new(config, Box::new(sim.clone()));
    Rig {
        _dir: dir,
        sim,
        session,
    }
}

#[test]
fn jog_right_at_half_speed() {
    let mut rig = rig("STEP_MULT=4\nSTEP_REPEAT=1");
    let move_code = rig.session.config().ioctl_move;

    let position = rig.session.jog(Direction::Right, parse_speed("0.5")).unwrap();

    assert_eq!(rig.sim.steps(Axis::Pan, move_code), vec![544]);
    assert_eq!(position.pan, 192);
    assert_eq!(rig.session.position(), NormalizedPosition::new(192, 98, 0));
}

#[test]
fn jog_position_saturates_at_travel_limit() {
    let mut rig = rig("STEP_REPEAT=1");
    for _ in 0..20 {
        rig.session.jog(Direction::Left, 1.0).unwrap();
    }
    assert_eq!(rig.session.position().pan, 0);
    assert_eq!(rig.sim.steps(Axis::Pan, rig.session.config().ioctl_move).len(), 20);
}

#[test]
fn tilt_overrides_and_caps_shape_the_step() {
    let mut rig = rig(
        "STEP_REPEAT=1\nTILT_STEP_MULT=2\nTILT_DOWN_STEP_MULT=6\nTILT_DOWN_STEP_REPEAT=3\n\
         TILT_STEP_ABS_MAX=500\nTILT_UP_STEP_ABS_MAX=100\nTILT_INVERT=1",
    );
    let move_code = rig.session.config().ioctl_move;

    // 12 degrees of tilt = 136 steps
    rig.session.jog(Direction::Up, 0.5).unwrap();
    assert_eq!(rig.sim.steps(Axis::Tilt, move_code), vec![-100]);

    rig.sim.clear();
    rig.session.jog(Direction::Down, 0.5).unwrap();
    assert_eq!(rig.sim.steps(Axis::Tilt, move_code), vec![500, 500, 500]);
}

#[test]
fn continuous_jog_keeps_reissuing_until_stop() {
    let mut rig = rig("CONTINUOUS_MODE=1\nWORKER_INTERVAL_MS=50");
    let move_code = rig.session.config().ioctl_move;
    let stop_code = rig.session.config().ioctl_stop;
    let t0 = Instant::now();

    rig.session.jog_at(Direction::Right, 0.5, t0).unwrap();
    for ms in (0..=200).step_by(5) {
        rig.session.tick_at(t0 + Duration::from_millis(ms)).unwrap();
    }
    // due at 0, 50, 100, 150, 200
    assert_eq!(rig.sim.steps(Axis::Pan, move_code), vec![68; 5]);

    rig.session.stop();
    assert!(!rig.session.tick_at(t0 + Duration::from_secs(1)).unwrap());
    assert_eq!(rig.sim.steps(Axis::Pan, move_code).len(), 5);
    assert_eq!(rig.sim.steps(Axis::Pan, stop_code), vec![0]);
    assert_eq!(rig.sim.steps(Axis::Tilt, stop_code), vec![0]);
}

#[test]
fn continuous_reissue_failure_ends_motion() {
    let mut rig = rig("CONTINUOUS_MODE=1");
    let t0 = Instant::now();

    rig.session.jog_at(Direction::Down, 0.5, t0).unwrap();
    rig.sim.set_unavailable(Axis::Tilt, true);

    let err = rig.session.tick_at(t0).unwrap_err();
    assert!(err.is_channel_unavailable());
    assert!(!rig.session.is_moving());
}

#[test]
fn home_persists_center_even_when_both_axes_fail() {
    let mut rig = rig("");
    rig.session.jog(Direction::Right, 1.0).unwrap();
    rig.sim.set_rejecting(Axis::Pan, Errno::EIO);
    rig.sim.set_rejecting(Axis::Tilt, Errno::EIO);

    let err = rig.session.home().unwrap_err();

    assert!(matches!(err, HalError::HomingFailed { .. }));
    assert_eq!(rig.session.position(), NormalizedPosition::new(180, 98, 0));
}

#[test]
fn missing_preset_leaves_position_untouched() {
    let rig = rig("");
    let mut session = rig.session;
    let store = session.store().clone();
    store.write_position(NormalizedPosition::new(100, 50, 20)).unwrap();
    fs::write(store.preset_path(), "1,door,10,20,0\n3,desk,90,45,10\n").unwrap();

    let err = session.recall_preset(7).unwrap_err();

    assert!(matches!(err, HalError::NotFound(_)));
    assert_eq!(session.position(), NormalizedPosition::new(100, 50, 20));
    assert!(rig.sim.requests().is_empty());
}

#[test]
fn absolute_move_to_corner() {
    let mut rig = rig("ABSREL_CHUNK_STEPS=64");
    let move_code = rig.session.config().ioctl_move;

    let position = rig.session.move_absolute(1.0, -1.0, 0.0).unwrap();
    assert_eq!(position, NormalizedPosition::new(360, 0, 50));
    assert_eq!(rig.session.position(), position);

    // 180 degrees of pan = 2048 steps, 98 degrees of tilt = 1115 steps
    let pan = rig.sim.steps(Axis::Pan, move_code);
    let tilt = rig.sim.steps(Axis::Tilt, move_code);
    assert_eq!(pan.iter().sum::<i32>(), 2048);
    assert_eq!(tilt.iter().sum::<i32>(), -1115);
    assert!(pan.iter().all(|&s| s > 0 && s <= 64));
    assert!(tilt.iter().all(|&s| s < 0 && s >= -64));
    assert_eq!(tilt.len(), 18);
}

#[test]
fn absolute_move_to_current_position_sends_nothing() {
    let mut rig = rig("");
    rig.session.move_absolute(0.0, 0.0, 0.0).unwrap();
    assert!(rig.sim.requests().is_empty());
    assert_eq!(rig.session.position(), NormalizedPosition::new(180, 98, 50));
}

#[test]
fn partial_move_is_not_rolled_back() {
    let mut rig = rig("ABSREL_CHUNK_STEPS=5000");
    let move_code = rig.session.config().ioctl_move;
    rig.sim.set_rejecting(Axis::Tilt, Errno::EBUSY);

    let err = rig.session.move_relative(0.5, 0.5, 0.0).unwrap_err();

    assert!(matches!(err, HalError::CommandFailed { axis: Axis::Tilt, errno: Errno::EBUSY, .. }));
    assert_eq!(rig.sim.steps(Axis::Pan, move_code), vec![1024]);
    assert_eq!(rig.session.position(), NormalizedPosition::default());
}

#[test]
fn lost_channel_is_reported_as_unavailable() {
    let mut rig = rig("");
    rig.sim.set_unavailable(Axis::Pan, true);

    let err = rig.session.move_relative(-0.2, 0.0, 0.0).unwrap_err();
    assert!(err.is_channel_unavailable());
    let (opens, closes) = rig.sim.channel_counts(Axis::Pan);
    assert_eq!((opens, closes), (0, 0));
}

#[test]
fn every_request_uses_a_fresh_channel() {
    let mut rig = rig("STEP_REPEAT=3");
    rig.session.jog(Direction::Left, 0.2).unwrap();
    rig.session.jog(Direction::Right, 0.2).unwrap();
    rig.session.stop();

    let (opens, closes) = rig.sim.channel_counts(Axis::Pan);
    assert_eq!(opens, 3);
    assert_eq!(closes, 3);
}
