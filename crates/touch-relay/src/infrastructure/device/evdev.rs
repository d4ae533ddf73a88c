//! Source touch screens under `/dev/input`.
//!
//! # How a touch screen is found (for beginners)
//!
//! Every input device the kernel knows about appears as a character device
//! `/dev/input/eventN`.  Keyboards, mice, lid switches and touch screens all
//! look the same from the file system, so each node is opened and probed:
//!
//! 1. `EVIOCGBIT` / `EVIOCGPROP` return capability bitmaps.
//! 2. [`Capabilities::is_touch_source`] decides whether the node is a slotted
//!    direct-touch screen.
//! 3. For qualifying nodes, `EVIOCGABS` reads the calibration of every axis
//!    and `EVIOCGID` / `EVIOCGVERSION` / `EVIOCGNAME` / `EVIOCGPHYS` read the
//!    identity.
//!
//! The result is a [`SourceDevice`]: the open file plus its immutable
//! [`DeviceDescriptor`].  It implements [`EventSource`] so the reader thread
//! can pull events from it.

use std::collections::{BTreeMap, VecDeque};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::fs::{FileTypeExt, OpenOptionsExt};
use std::path::{Path, PathBuf};
use std::time::Duration;

use touch_core::abi::codec::{c_string_lossy, ABS_INFO_SIZE, INPUT_EVENT_SIZE, INPUT_ID_SIZE};
use touch_core::abi::codes::{EV_ABS, EV_KEY, UINPUT_MAX_NAME_SIZE};
use touch_core::abi::ioctl::{
    eviocgabs, eviocgbit, eviocgprop, EVIOCGID, EVIOCGNAME, EVIOCGPHYS, EVIOCGRAB, EVIOCGVERSION,
};
use touch_core::{AbsInfo, Capabilities, DeviceDescriptor, InputEvent, InputId};
use tracing::{debug, info};

use crate::application::device_io::EventSource;
use crate::application::error::RelayError;
use crate::infrastructure::device::sys;

/// Directory scanned for source nodes.
pub const INPUT_DIR: &str = "/dev/input";

/// Events fetched per `read` call.
const READ_BATCH: usize = 64;

/// An opened, probed touch screen.
pub struct SourceDevice {
    file: File,
    descriptor: DeviceDescriptor,
    grabbed: bool,
    pending: VecDeque<InputEvent>,
    buf: Vec<u8>,
}

impl std::fmt::Debug for SourceDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceDevice")
            .field("path", &self.descriptor.path)
            .field("grabbed", &self.grabbed)
            .finish()
    }
}

impl SourceDevice {
    /// Opens `path` read-only and non-blocking and probes it.
    ///
    /// Returns `Ok(None)` if the node is readable but not a touch screen.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::ControlCallFailed`] if the node cannot be opened
    /// or a probing call fails.
    pub fn probe(path: &Path) -> Result<Option<Self>, RelayError> {
        let file = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)
            .map_err(|e| RelayError::control("open", e))?;
        let fd = file.as_raw_fd();

        let capabilities = read_capabilities(fd)?;
        if !capabilities.is_touch_source() {
            return Ok(None);
        }

        let mut axes = BTreeMap::new();
        for axis in capabilities.abs.iter_set() {
            let Ok(axis) = u16::try_from(axis) else { continue };
            axes.insert(axis, read_abs_info(fd, axis)?);
        }

        let mut id = [0u8; INPUT_ID_SIZE];
        sys::ioctl_read(fd, EVIOCGID, &mut id).map_err(|e| RelayError::control("EVIOCGID", e))?;
        let id = InputId::decode(&id).unwrap_or_default();

        let mut version = [0u8; 4];
        sys::ioctl_read(fd, EVIOCGVERSION, &mut version)
            .map_err(|e| RelayError::control("EVIOCGVERSION", e))?;

        let name = read_string(fd, EVIOCGNAME, "EVIOCGNAME")?;
        // Many drivers have no physical location; that is not an error.
        let phys = read_string(fd, EVIOCGPHYS, "EVIOCGPHYS").unwrap_or_default();

        let descriptor = DeviceDescriptor::new(
            path,
            name,
            phys,
            i32::from_le_bytes(version),
            id,
            capabilities,
            axes,
        );
        debug!(
            path = %path.display(),
            name = %descriptor.name,
            slots = descriptor.slot_count(),
            "touch screen qualifies"
        );

        Ok(Some(Self {
            file,
            descriptor,
            grabbed: false,
            pending: VecDeque::new(),
            buf: vec![0u8; INPUT_EVENT_SIZE * READ_BATCH],
        }))
    }

    pub fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    pub fn path(&self) -> &Path {
        &self.descriptor.path
    }

    pub fn is_grabbed(&self) -> bool {
        self.grabbed
    }

    /// Takes exclusive ownership of the device: other readers stop seeing
    /// its events.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::ControlCallFailed`] if `EVIOCGRAB` fails.
    pub fn grab(&mut self) -> Result<(), RelayError> {
        sys::ioctl_int(self.file.as_raw_fd(), EVIOCGRAB, 1)
            .map_err(|e| RelayError::control("EVIOCGRAB", e))?;
        self.grabbed = true;
        debug!(path = %self.path().display(), "touch screen grabbed");
        Ok(())
    }

    fn fill_pending(&mut self) -> Result<(), RelayError> {
        match self.file.read(&mut self.buf) {
            Ok(0) => Err(RelayError::ReadFailed(io::Error::from(
                io::ErrorKind::UnexpectedEof,
            ))),
            Ok(n) => {
                self.pending.extend(
                    self.buf[..n]
                        .chunks_exact(INPUT_EVENT_SIZE)
                        .filter_map(|chunk| InputEvent::decode(chunk).ok()),
                );
                Ok(())
            }
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) =>
            {
                Ok(())
            }
            Err(e) => Err(RelayError::ReadFailed(e)),
        }
    }
}

impl EventSource for SourceDevice {
    fn next_event(&mut self, wait: Duration) -> Result<Option<InputEvent>, RelayError> {
        if let Some(event) = self.pending.pop_front() {
            return Ok(Some(event));
        }
        let readable =
            sys::poll_readable(self.file.as_raw_fd(), wait).map_err(RelayError::ReadFailed)?;
        if readable {
            self.fill_pending()?;
        }
        Ok(self.pending.pop_front())
    }

    fn release(&mut self) -> Result<(), RelayError> {
        if !self.grabbed {
            return Ok(());
        }
        sys::ioctl_int(self.file.as_raw_fd(), EVIOCGRAB, 0)
            .map_err(|e| RelayError::control("EVIOCGRAB", e))?;
        self.grabbed = false;
        debug!(path = %self.path().display(), "touch screen released");
        Ok(())
    }
}

// ── Enumeration ───────────────────────────────────────────────────────────────

/// Probes every `event*` character device in `dir`, sorted by path.
///
/// Nodes that cannot be opened or probed are logged at debug level and
/// skipped.
///
/// # Errors
///
/// Returns [`RelayError::DeviceNotFound`] if no node qualifies.
pub fn enumerate_in(dir: &Path) -> Result<Vec<SourceDevice>, RelayError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = %dir.display(), "cannot list input nodes: {e}");
            return Err(RelayError::DeviceNotFound);
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().starts_with("event"))
        .filter(|entry| {
            fs::metadata(entry.path())
                .map(|meta| meta.file_type().is_char_device())
                .unwrap_or(false)
        })
        .map(|entry| entry.path())
        .collect();
    paths.sort();

    let mut devices = Vec::new();
    for path in paths {
        match SourceDevice::probe(&path) {
            Ok(Some(device)) => devices.push(device),
            Ok(None) => debug!(path = %path.display(), "not a touch screen"),
            Err(e) => debug!(path = %path.display(), "skipping input node: {e}"),
        }
    }

    if devices.is_empty() {
        return Err(RelayError::DeviceNotFound);
    }
    Ok(devices)
}

/// Descriptors of every qualifying touch screen under `/dev/input`.
///
/// # Errors
///
/// Returns [`RelayError::DeviceNotFound`] if no node qualifies.
pub fn list_touch_devices() -> Result<Vec<DeviceDescriptor>, RelayError> {
    Ok(enumerate_in(Path::new(INPUT_DIR))?
        .into_iter()
        .map(|device| device.descriptor)
        .collect())
}

/// Opens the touch screen to relay: `path` if given, else the first
/// qualifying node.
///
/// # Errors
///
/// Returns [`RelayError::DeviceNotFound`] if nothing qualifies or `path` is
/// not among the qualifying nodes.
pub fn open_touch_device(path: Option<&Path>) -> Result<SourceDevice, RelayError> {
    select(enumerate_in(Path::new(INPUT_DIR))?, path)
}

fn select(devices: Vec<SourceDevice>, path: Option<&Path>) -> Result<SourceDevice, RelayError> {
    let device = match path {
        Some(wanted) => devices.into_iter().find(|d| d.path() == wanted),
        None => devices.into_iter().next(),
    }
    .ok_or(RelayError::DeviceNotFound)?;
    info!(
        path = %device.path().display(),
        name = %device.descriptor.name,
        "selected touch screen"
    );
    Ok(device)
}

// ── Probing helpers ───────────────────────────────────────────────────────────

fn read_capabilities(fd: RawFd) -> Result<Capabilities, RelayError> {
    let mut caps = Capabilities::default();

    let len = caps.event_types.as_bytes().len();
    sys::ioctl_read(fd, eviocgbit(0, len), caps.event_types.as_bytes_mut())
        .map_err(|e| RelayError::control("EVIOCGBIT", e))?;

    let len = caps.abs.as_bytes().len();
    sys::ioctl_read(fd, eviocgbit(EV_ABS, len), caps.abs.as_bytes_mut())
        .map_err(|e| RelayError::control("EVIOCGBIT", e))?;

    let len = caps.keys.as_bytes().len();
    sys::ioctl_read(fd, eviocgbit(EV_KEY, len), caps.keys.as_bytes_mut())
        .map_err(|e| RelayError::control("EVIOCGBIT", e))?;

    let len = caps.props.as_bytes().len();
    sys::ioctl_read(fd, eviocgprop(len), caps.props.as_bytes_mut())
        .map_err(|e| RelayError::control("EVIOCGPROP", e))?;

    Ok(caps)
}

fn read_abs_info(fd: RawFd, axis: u16) -> Result<AbsInfo, RelayError> {
    let mut buf = [0u8; ABS_INFO_SIZE];
    sys::ioctl_read(fd, eviocgabs(axis), &mut buf)
        .map_err(|e| RelayError::control("EVIOCGABS", e))?;
    Ok(AbsInfo::decode(&buf).unwrap_or_default())
}

fn read_string(fd: RawFd, request: u32, call: &'static str) -> Result<String, RelayError> {
    let mut buf = [0u8; UINPUT_MAX_NAME_SIZE];
    sys::ioctl_read(fd, request, &mut buf).map_err(|e| RelayError::control(call, e))?;
    Ok(c_string_lossy(&buf))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("touch_relay_test_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_enumerate_missing_dir_is_device_not_found() {
        let result = enumerate_in(Path::new("/nonexistent/input/dir"));

        assert!(matches!(result, Err(RelayError::DeviceNotFound)));
    }

    #[test]
    fn test_enumerate_skips_regular_files_named_event() {
        // Arrange
        let dir = scratch_dir();
        fs::write(dir.join("event0"), b"not a device").unwrap();

        // Act
        let result = enumerate_in(&dir);

        // Assert
        assert!(matches!(result, Err(RelayError::DeviceNotFound)));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_enumerate_skips_char_devices_that_are_not_input_nodes() {
        // /dev/null is a character device; probing it fails and is skipped.
        let dir = scratch_dir();
        std::os::unix::fs::symlink("/dev/null", dir.join("event1")).unwrap();

        let result = enumerate_in(&dir);

        assert!(matches!(result, Err(RelayError::DeviceNotFound)));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_probe_of_missing_node_reports_open_failure() {
        let result = SourceDevice::probe(Path::new("/nonexistent/event0"));

        let err = result.unwrap_err();
        assert!(matches!(err, RelayError::ControlCallFailed { call: "open", .. }));
        assert_eq!(err.errno(), Some(libc::ENOENT));
    }

    #[test]
    fn test_select_from_empty_list_is_device_not_found() {
        let result = select(Vec::new(), Some(Path::new("/dev/input/event3")));

        assert!(matches!(result, Err(RelayError::DeviceNotFound)));
    }
}
