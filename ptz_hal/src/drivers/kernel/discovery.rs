//! Channel discovery strategies.
//!
//! Two ways lead to the motor driver:
//!
//! - [`Strategy::DirectPath`]: the driver exposes a device node per axis;
//! - [`Strategy::RemoteDescriptor`]: the driver is only reachable through a
//!   descriptor held by another long-running process. The descriptor number
//!   is stored at a known address in that process; it is read through
//!   `<proc>/<pid>/mem` and the descriptor is reopened through
//!   `<proc>/<pid>/fd/<n>`, giving this process its own handle.

use super::channel::DeviceChannel;
use nix::unistd::Pid;
use std::fs::{self, File};
use std::io;
use std::os::fd::RawFd;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Why the descriptor number could not be recovered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadFailure {
    /// `<proc>/<pid>/mem` could not be opened or read.
    #[error("cannot read {path}: {reason}")]
    MemoryUnreadable {
        /// Memory file path
        path: String,
        /// OS error text
        reason: String,
    },

    /// Fewer than four bytes came back.
    #[error("short read at {address:#x} ({read} of 4 bytes)")]
    ShortRead {
        /// Address read
        address: u64,
        /// Bytes actually read
        read: usize,
    },

    /// The address does not fit a file offset.
    #[error("address {0:#x} out of range")]
    AddressOutOfRange(u64),

    /// The stored value is not a usable descriptor number.
    #[error("invalid descriptor number {0}")]
    InvalidDescriptor(i32),
}

/// Outcome of reading a descriptor number out of another process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorLookup {
    /// The target process holds the driver open under this number.
    Found(RawFd),
    /// Nothing usable at the address.
    NotFound(ReadFailure),
}

/// Discovery failures. The driver collapses all of them into
/// `HalError::ChannelUnavailable`.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Device node does not exist.
    #[error("device node {0} does not exist")]
    DeviceAbsent(PathBuf),

    /// Opening the final path failed.
    #[error("cannot open {path}: {source}")]
    Open {
        /// Path that failed to open
        path: PathBuf,
        /// OS error
        #[source]
        source: io::Error,
    },

    /// No process with the configured name.
    #[error("no process named '{0}'")]
    ProcessNotFound(String),

    /// Descriptor number could not be recovered.
    #[error("pid {pid}: {failure}")]
    DescriptorUnreadable {
        /// Target process
        pid: Pid,
        /// Read diagnostic
        failure: ReadFailure,
    },
}

/// Identity of the process that owns the driver descriptors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessTarget {
    /// Explicitly configured pid.
    Pid(Pid),
    /// Found by scanning `<proc>/*/comm` for this name.
    Name(String),
}

impl ProcessTarget {
    /// Configured pid when > 1, else scan by `name`.
    pub fn from_config(pid: i32, name: &str) -> Self {
        if pid > 1 {
            Self::Pid(Pid::from_raw(pid))
        } else {
            Self::Name(name.to_string())
        }
    }

    fn resolve(&self, proc_root: &Path) -> Result<Pid, DiscoveryError> {
        match self {
            Self::Pid(pid) => Ok(*pid),
            Self::Name(name) => find_pid_by_name(proc_root, name)
                .ok_or_else(|| DiscoveryError::ProcessNotFound(name.clone())),
        }
    }
}

/// One way of obtaining a channel for an axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// Open a device node directly.
    DirectPath {
        /// Device node path
        path: PathBuf,
    },
    /// Reopen a descriptor held by another process.
    RemoteDescriptor {
        /// procfs mount point
        proc_root: PathBuf,
        /// Owner process
        target: ProcessTarget,
        /// Address of the descriptor number in the owner's memory
        address: u64,
    },
}

impl Strategy {
    /// Short name for diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::DirectPath { .. } => "dev",
            Self::RemoteDescriptor { .. } => "proc",
        }
    }

    /// Try to open a fresh channel.
    pub fn open(&self) -> Result<DeviceChannel, DiscoveryError> {
        match self {
            Self::DirectPath { path } => {
                if !path.exists() {
                    return Err(DiscoveryError::DeviceAbsent(path.clone()));
                }
                DeviceChannel::open(path, format!("dev:{}", path.display())).map_err(|source| {
                    DiscoveryError::Open {
                        path: path.clone(),
                        source,
                    }
                })
            }
            Self::RemoteDescriptor {
                proc_root,
                target,
                address,
            } => {
                let pid = target.resolve(proc_root)?;
                let fd = match read_remote_descriptor(proc_root, pid, *address) {
                    DescriptorLookup::Found(fd) => fd,
                    DescriptorLookup::NotFound(failure) => {
                        return Err(DiscoveryError::DescriptorUnreadable { pid, failure });
                    }
                };

                let path = proc_root
                    .join(pid.to_string())
                    .join("fd")
                    .join(fd.to_string());
                let via = format!("proc:{} (pid={} mfd={})", path.display(), pid, fd);
                DeviceChannel::open(&path, via)
                    .map_err(|source| DiscoveryError::Open { path, source })
            }
        }
    }
}

/// Find the first process whose `comm` equals `name`.
pub fn find_pid_by_name(proc_root: &Path, name: &str) -> Option<Pid> {
    let entries = fs::read_dir(proc_root).ok()?;

    for entry in entries.flatten() {
        let file_name = entry.file_name();
        let Some(raw) = file_name.to_str() else {
            continue;
        };
        if !raw.starts_with(|c: char| c.is_ascii_digit()) {
            continue;
        }
        let Ok(pid) = raw.parse::<i32>() else {
            continue;
        };

        let Ok(comm) = fs::read_to_string(entry.path().join("comm")) else {
            continue;
        };
        if comm.trim_end_matches(['\r', '\n']) == name {
            return Some(Pid::from_raw(pid));
        }
    }

    None
}

/// Read the 32-bit descriptor number stored at `address` in process `pid`.
pub fn read_remote_descriptor(proc_root: &Path, pid: Pid, address: u64) -> DescriptorLookup {
    let mem_path = proc_root.join(pid.to_string()).join("mem");

    let Ok(offset) = i64::try_from(address) else {
        return DescriptorLookup::NotFound(ReadFailure::AddressOutOfRange(address));
    };

    let unreadable = |reason: String| {
        DescriptorLookup::NotFound(ReadFailure::MemoryUnreadable {
            path: mem_path.display().to_string(),
            reason,
        })
    };

    let file = match File::open(&mem_path) {
        Ok(file) => file,
        Err(e) => return unreadable(e.to_string()),
    };

    let mut buf = [0u8; 4];
    let read = match nix::sys::uio::pread(&file, &mut buf, offset) {
        Ok(read) => read,
        Err(errno) => return unreadable(errno.to_string()),
    };
    if read != buf.len() {
        return DescriptorLookup::NotFound(ReadFailure::ShortRead { address, read });
    }

    let fd = u32::from_ne_bytes(buf) as i32;
    if fd <= 0 {
        return DescriptorLookup::NotFound(ReadFailure::InvalidDescriptor(fd));
    }
    DescriptorLookup::Found(fd)
}
