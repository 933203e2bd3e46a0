//! Open handle to a motor driver node.

use nix::errno::Errno;
use ptz_common::hal::driver::ControlChannel;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::AsRawFd;
use std::path::Path;

/// A read/write handle on a motor device, closed on drop.
#[derive(Debug)]
pub struct DeviceChannel {
    file: File,
    via: String,
}

impl DeviceChannel {
    /// Open `path` read/write. `via` describes the discovery route for logs.
    pub fn open(path: &Path, via: String) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self { file, via })
    }
}

impl ControlChannel for DeviceChannel {
    fn describe(&self) -> &str {
        &self.via
    }

    fn send(&mut self, code: u64, step: i32) -> Result<(), Errno> {
        let mut payload: i32 = step;
        // SAFETY: the fd is owned by `self.file` and stays open for the call;
        // the driver reads a single i32 through the pointer.
        let rc = unsafe {
            libc::ioctl(
                self.file.as_raw_fd(),
                code as _,
                &mut payload as *mut i32,
            )
        };
        Errno::result(rc).map(drop)
    }

    fn send_wide(&mut self, code: u64) -> Result<u64, Errno> {
        let mut buf: u64 = 0;
        // SAFETY: as above; the centering request takes an 8-byte user buffer.
        let rc = unsafe {
            libc::ioctl(self.file.as_raw_fd(), code as _, &mut buf as *mut u64)
        };
        Errno::result(rc).map(|_| buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn open_missing_node_fails() {
        let result = DeviceChannel::open(Path::new("/nonexistent/motor0"), "dev".into());
        assert!(result.is_err());
    }

    #[test]
    fn ioctl_on_regular_file_is_rejected() {
        let file = NamedTempFile::new().unwrap();
        let mut channel = DeviceChannel::open(file.path(), "dev:test".into()).unwrap();
        assert_eq!(channel.describe(), "dev:test");
        // Regular files do not implement motor requests.
        assert!(channel.send(0x4004_6d40, 12).is_err());
    }
}
