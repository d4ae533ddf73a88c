//! Virtual touch screen created through `/dev/uinput`.
//!
//! Setup follows the legacy uinput sequence:
//!
//! ```text
//! open /dev/uinput (write-only, non-blocking)
//! UI_SET_EVBIT EV_KEY, UI_SET_KEYBIT ...      key bits of the source
//! UI_SET_EVBIT EV_ABS, UI_SET_ABSBIT ...      axes the variant mirrors
//! UI_SET_PROPBIT ...                          property bits of the source
//! UI_SET_PHYS                                 physical location, if any
//! write(uinput_user_dev)                      name, identity, axis ranges
//! UI_DEV_CREATE
//! EVIOCGRAB on the source, then settle
//! ```
//!
//! A failure at any step destroys the half-built device and closes the
//! handle before the error is returned.

use std::ffi::CString;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use touch_core::abi::codes::{EV_ABS, EV_KEY};
use touch_core::abi::ioctl::{
    UI_DEV_CREATE, UI_DEV_DESTROY, UI_SET_ABSBIT, UI_SET_EVBIT, UI_SET_KEYBIT, UI_SET_PHYS,
    UI_SET_PROPBIT,
};
use touch_core::{DeviceDescriptor, DeviceVariant, InputEvent, InputId, UinputUserDev};
use tracing::{debug, info};
use uuid::Uuid;

use crate::application::device_io::EventSink;
use crate::application::error::RelayError;
use crate::infrastructure::device::evdev::SourceDevice;
use crate::infrastructure::device::sys;

/// The uinput control node.
pub const UINPUT_PATH: &str = "/dev/uinput";

/// Force-feedback effect slots declared when the source supports `EV_FF`.
const FF_EFFECTS_MAX: u32 = 10;

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// How the virtual device presents itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdentityMode {
    /// Source name plus a short random suffix, source vendor/product.
    Mirror,
    /// Random 7-letter name and random vendor/product/version on bus 0.
    #[default]
    Randomized,
}

/// Name and identity written into the uinput setup record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualIdentity {
    pub name: String,
    pub id: InputId,
}

/// Derives the virtual identity from `random` (16 bytes of entropy).
pub fn virtual_identity(
    mode: IdentityMode,
    descriptor: &DeviceDescriptor,
    random: [u8; 16],
) -> VirtualIdentity {
    match mode {
        IdentityMode::Mirror => VirtualIdentity {
            name: format!("{}_{}", descriptor.name, letters(&random[..4])),
            id: descriptor.id,
        },
        IdentityMode::Randomized => VirtualIdentity {
            name: letters(&random[..7]),
            id: InputId {
                bustype: 0,
                vendor: u16::from_le_bytes([random[7], random[8]]) % 0x2000,
                product: u16::from_le_bytes([random[9], random[10]]) % 0x2000,
                version: u16::from(random[11]) % 0x20,
            },
        },
    }
}

fn letters(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| char::from(LETTERS[usize::from(*b) % LETTERS.len()]))
        .collect()
}

/// Axes the virtual device declares, in ascending code order.
pub fn declared_axes(descriptor: &DeviceDescriptor, variant: DeviceVariant) -> Vec<u16> {
    descriptor
        .axes()
        .map(|(code, _)| code)
        .filter(|code| variant.mirrors_axis(*code))
        .collect()
}

/// Builds the `uinput_user_dev` record for `descriptor`.
pub fn setup_record(
    descriptor: &DeviceDescriptor,
    variant: DeviceVariant,
    identity: &VirtualIdentity,
) -> UinputUserDev {
    let mut record = UinputUserDev::default();
    record.set_name(&identity.name);
    record.id = identity.id;
    record.ff_effects_max = if descriptor.features.force_feedback {
        FF_EFFECTS_MAX
    } else {
        0
    };
    for code in declared_axes(descriptor, variant) {
        if let Some(info) = descriptor.axis(code) {
            record.set_axis(code, info);
        }
    }
    record
}

/// A created uinput device.  Writing events to it injects them into the
/// input subsystem.
pub struct VirtualDevice {
    file: File,
    name: String,
    destroyed: bool,
}

impl VirtualDevice {
    /// Creates the virtual twin of `source` and grabs `source`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::ControlCallFailed`] for the first failing open,
    /// control call or write.
    pub fn create(
        source: &mut SourceDevice,
        variant: DeviceVariant,
        mode: IdentityMode,
        settle: Duration,
    ) -> Result<Self, RelayError> {
        let file = OpenOptions::new()
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(UINPUT_PATH)
            .map_err(|e| RelayError::control("open /dev/uinput", e))?;

        let identity = virtual_identity(mode, source.descriptor(), *Uuid::new_v4().as_bytes());
        let mut device = Self {
            file,
            name: identity.name.clone(),
            destroyed: false,
        };

        if let Err(e) = device.configure(source, variant, &identity) {
            device.rollback();
            return Err(e);
        }

        thread::sleep(settle);
        info!(
            name = %device.name,
            source = %source.path().display(),
            ?variant,
            "virtual touch screen created"
        );
        Ok(device)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn configure(
        &mut self,
        source: &mut SourceDevice,
        variant: DeviceVariant,
        identity: &VirtualIdentity,
    ) -> Result<(), RelayError> {
        let fd = self.file.as_raw_fd();
        let descriptor = source.descriptor().clone();
        let caps = &descriptor.capabilities;

        set_bit(fd, UI_SET_EVBIT, EV_KEY, "UI_SET_EVBIT")?;
        for key in caps.keys.iter_set() {
            set_bit(fd, UI_SET_KEYBIT, key, "UI_SET_KEYBIT")?;
        }

        set_bit(fd, UI_SET_EVBIT, EV_ABS, "UI_SET_EVBIT")?;
        for axis in declared_axes(&descriptor, variant) {
            set_bit(fd, UI_SET_ABSBIT, axis, "UI_SET_ABSBIT")?;
        }

        for prop in caps.props.iter_set() {
            set_bit(fd, UI_SET_PROPBIT, prop, "UI_SET_PROPBIT")?;
        }

        if !descriptor.phys.is_empty() {
            if let Ok(phys) = CString::new(descriptor.phys.as_str()) {
                sys::ioctl_str(fd, UI_SET_PHYS, &phys)
                    .map_err(|e| RelayError::control("UI_SET_PHYS", e))?;
            }
        }

        let record = setup_record(&descriptor, variant, identity);
        self.file
            .write_all(&record.encode())
            .map_err(|e| RelayError::control("write uinput_user_dev", e))?;

        sys::ioctl_none(fd, UI_DEV_CREATE).map_err(|e| RelayError::control("UI_DEV_CREATE", e))?;

        source.grab()
    }

    fn rollback(&mut self) {
        if let Err(e) = sys::ioctl_none(self.file.as_raw_fd(), UI_DEV_DESTROY) {
            debug!("rollback of partial virtual device: {e}");
        }
        self.destroyed = true;
    }
}

fn set_bit(
    fd: std::os::fd::RawFd,
    request: u32,
    bit: impl TryInto<libc::c_int>,
    call: &'static str,
) -> Result<(), RelayError> {
    let bit = bit
        .try_into()
        .map_err(|_| RelayError::control(call, std::io::Error::from_raw_os_error(libc::EINVAL)))?;
    sys::ioctl_int(fd, request, bit).map_err(|e| RelayError::control(call, e))
}

impl EventSink for VirtualDevice {
    fn write_event(&mut self, event: &InputEvent) -> Result<(), RelayError> {
        self.file
            .write_all(&event.encode())
            .map_err(RelayError::WriteFailed)
    }

    fn destroy(&mut self) -> Result<(), RelayError> {
        if self.destroyed {
            return Ok(());
        }
        self.destroyed = true;
        sys::ioctl_none(self.file.as_raw_fd(), UI_DEV_DESTROY)
            .map_err(|e| RelayError::control("UI_DEV_DESTROY", e))?;
        debug!(name = %self.name, "virtual touch screen destroyed");
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::device::mock::touch_descriptor;
    use touch_core::abi::codes::{
        ABS_MT_POSITION_X, ABS_MT_POSITION_Y, ABS_MT_PRESSURE, ABS_MT_SLOT, ABS_MT_TOUCH_MAJOR,
        ABS_MT_TRACKING_ID,
    };

    const RANDOM: [u8; 16] = [
        0, 1, 2, 3, 4, 5, 6, 0xff, 0xff, 0x34, 0x12, 0x7f, 0, 0, 0, 0,
    ];

    #[test]
    fn test_mirror_identity_keeps_source_id_and_suffixes_name() {
        let descriptor = touch_descriptor(10);

        let identity = virtual_identity(IdentityMode::Mirror, &descriptor, RANDOM);

        assert_eq!(identity.name, "mock touchscreen_abcd");
        assert_eq!(identity.id, descriptor.id);
    }

    #[test]
    fn test_randomized_identity_stays_in_range() {
        let identity = virtual_identity(IdentityMode::Randomized, &touch_descriptor(10), RANDOM);

        assert_eq!(identity.name, "abcdefg");
        assert_eq!(identity.id.bustype, 0);
        assert_eq!(identity.id.vendor, 0xffff % 0x2000);
        assert_eq!(identity.id.product, 0x1234);
        assert_eq!(identity.id.version, 0x1f);
    }

    #[test]
    fn test_randomized_identity_from_uuid_is_bounded() {
        for _ in 0..32 {
            let identity = virtual_identity(
                IdentityMode::Randomized,
                &touch_descriptor(10),
                *Uuid::new_v4().as_bytes(),
            );
            assert_eq!(identity.name.len(), 7);
            assert!(identity.name.chars().all(|c| c.is_ascii_alphabetic()));
            assert!(identity.id.vendor < 0x2000);
            assert!(identity.id.product < 0x2000);
            assert!(identity.id.version < 0x20);
        }
    }

    #[test]
    fn test_restricted_variant_declares_only_position_and_tracking() {
        let axes = declared_axes(&touch_descriptor(10), DeviceVariant::Restricted);

        assert_eq!(
            axes,
            vec![ABS_MT_POSITION_X, ABS_MT_POSITION_Y, ABS_MT_TRACKING_ID]
        );
    }

    #[test]
    fn test_full_variant_declares_every_source_axis() {
        let axes = declared_axes(&touch_descriptor(10), DeviceVariant::Full);

        assert!(axes.contains(&ABS_MT_SLOT));
        assert!(axes.contains(&ABS_MT_TOUCH_MAJOR));
        assert!(axes.contains(&ABS_MT_PRESSURE));
    }

    #[test]
    fn test_setup_record_copies_axis_ranges_and_identity() {
        // Arrange
        let descriptor = touch_descriptor(10);
        let identity = virtual_identity(IdentityMode::Mirror, &descriptor, RANDOM);

        // Act
        let record = setup_record(&descriptor, DeviceVariant::Restricted, &identity);

        // Assert
        assert_eq!(record.absmax[usize::from(ABS_MT_POSITION_X)], 1079);
        assert_eq!(record.absmax[usize::from(ABS_MT_POSITION_Y)], 2339);
        assert_eq!(record.absmax[usize::from(ABS_MT_TRACKING_ID)], 65535);
        assert_eq!(record.absmax[usize::from(ABS_MT_PRESSURE)], 0);
        assert_eq!(record.ff_effects_max, 0);
        assert_eq!(record.id, descriptor.id);
        assert_eq!(&record.name[..21], b"mock touchscreen_abcd");
    }
}
