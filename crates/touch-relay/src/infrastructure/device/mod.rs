//! Kernel device adapters: the evdev source, the uinput sink, and the
//! in-memory doubles used by tests.
//!
//! [`setup`] wires them into a running [`TouchRelaySession`]:
//!
//! ```text
//! open_touch_device ──► VirtualDevice::create ──► TouchRelaySession::start
//!  (probe + select)      (declare, create, grab)    (reader + dispatcher)
//! ```

pub mod evdev;
pub mod mock;
pub mod sys;
pub mod uinput;

use tracing::info;

use crate::application::error::RelayError;
use crate::application::session::TouchRelaySession;
use crate::infrastructure::config::RelayConfig;
use evdev::open_touch_device;
use uinput::VirtualDevice;

/// Finds the touch screen, creates its virtual twin and starts relaying.
///
/// # Errors
///
/// - [`RelayError::InvalidDisplaySize`] if the configured display has a
///   zero dimension (checked before any device is touched).
/// - [`RelayError::DeviceNotFound`] if no touch screen qualifies.
/// - [`RelayError::ControlCallFailed`] if creating the virtual device or
///   grabbing the source fails.
/// - [`RelayError::ThreadSpawn`] if a relay thread cannot be started.
pub fn setup(config: &RelayConfig) -> Result<TouchRelaySession, RelayError> {
    let options = config.session_options()?;

    let mut source = open_touch_device(config.device.path.as_deref())?;
    let sink = VirtualDevice::create(
        &mut source,
        options.protocol.device_variant(),
        config.device.identity,
        config.timing.settle(),
    )?;
    info!(
        virtual_name = sink.name(),
        protocol = %options.protocol,
        "relay devices ready"
    );

    let descriptor = source.descriptor().clone();
    TouchRelaySession::start(descriptor, Box::new(source), Box::new(sink), options)
}
