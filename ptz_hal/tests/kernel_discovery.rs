//! Kernel driver resolution against a fake procfs tree.
//!
//! The owner process is faked with `comm`, a plain `mem` file holding the
//! descriptor number at the configured address, and a regular file standing
//! in for the descriptor under `fd/`. Regular files reject motor ioctls, so a
//! resolved channel shows up as `CommandFailed` rather than
//! `ChannelUnavailable`.

use ptz_common::hal::config::PtzConfig;
use ptz_common::hal::driver::{HalError, MotorDriver};
use ptz_common::hal::types::{Axis, Direction, NormalizedPosition};
use ptz_hal::MotionSession;
use ptz_hal::drivers::kernel::KernelMotorDriver;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const PAN_ADDR: usize = 0x80;

fn fake_owner(proc_root: &Path, pid: i32, descriptor: u32) {
    let dir = proc_root.join(pid.to_string());
    fs::create_dir_all(dir.join("fd")).unwrap();
    fs::write(dir.join("comm"), "anyka_ipc\n").unwrap();

    let mut mem = vec![0u8; PAN_ADDR + 4];
    mem[PAN_ADDR..].copy_from_slice(&descriptor.to_ne_bytes());
    fs::write(dir.join("mem"), mem).unwrap();
    fs::write(dir.join("fd").join(descriptor.to_string()), b"").unwrap();
}

fn legacy_config(state: &Path) -> PtzConfig {
    PtzConfig::from_kv_str(&format!(
        "# legacy-only discovery\n\
         MOTOR_BACKEND=2\n\
         ANYKA_PROC=anyka_ipc\n\
         PAN_FD_ADDR={PAN_ADDR:#x}\n\
         TILT_FD_ADDR=0\n\
         CONTINUOUS_MODE=0\n\
         STEP_REPEAT=1\n\
         DEBUG_LOG=0\n\
         STATE_DIR={}\n",
        state.display()
    ))
}

#[test]
fn legacy_channel_is_resolved_through_owner_process() {
    let proc_root = TempDir::new().unwrap();
    fake_owner(proc_root.path(), 314, 11);
    let state = TempDir::new().unwrap();

    let driver = KernelMotorDriver::from_config(&legacy_config(state.path()))
        .with_proc_root(proc_root.path());

    let channel = driver.open(Axis::Pan).unwrap();
    assert!(channel.describe().starts_with("proc:"));
    assert!(channel.describe().contains("pid=314 mfd=11"));
}

#[test]
fn session_reports_rejected_ioctl_and_keeps_position() {
    let proc_root = TempDir::new().unwrap();
    fake_owner(proc_root.path(), 314, 11);
    let state = TempDir::new().unwrap();
    let config = legacy_config(state.path());

    let driver = KernelMotorDriver::from_config(&config).with_proc_root(proc_root.path());
    let mut session = MotionSession::new(config, Box::new(driver));

    let err = session.jog(Direction::Right, 0.5).unwrap_err();
    assert!(matches!(err, HalError::CommandFailed { axis: Axis::Pan, .. }));
    assert_eq!(session.position(), NormalizedPosition::default());
}

#[test]
fn axis_without_address_is_unavailable() {
    let proc_root = TempDir::new().unwrap();
    fake_owner(proc_root.path(), 314, 11);
    let state = TempDir::new().unwrap();
    let config = legacy_config(state.path());

    let driver = KernelMotorDriver::from_config(&config).with_proc_root(proc_root.path());
    let mut session = MotionSession::new(config, Box::new(driver));

    let err = session.jog(Direction::Up, 0.5).unwrap_err();
    assert!(err.is_channel_unavailable());
}

#[test]
fn dead_owner_process_is_unavailable() {
    let proc_root = TempDir::new().unwrap();
    let state = TempDir::new().unwrap();

    let driver = KernelMotorDriver::from_config(&legacy_config(state.path()))
        .with_proc_root(proc_root.path());

    let err = driver.open(Axis::Pan).unwrap_err();
    match err {
        HalError::ChannelUnavailable { axis, reason } => {
            assert_eq!(axis, Axis::Pan);
            assert!(reason.contains("anyka_ipc"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn stale_descriptor_number_is_unavailable() {
    let proc_root = TempDir::new().unwrap();
    fake_owner(proc_root.path(), 314, 11);
    fs::remove_file(proc_root.path().join("314").join("fd").join("11")).unwrap();
    let state = TempDir::new().unwrap();

    let driver = KernelMotorDriver::from_config(&legacy_config(state.path()))
        .with_proc_root(proc_root.path());

    assert!(driver.open(Axis::Pan).unwrap_err().is_channel_unavailable());
}
