//! Device-facing ports of the relay pipeline.
//!
//! The reader pulls kernel events from an [`EventSource`]; the dispatcher
//! pushes events into an [`EventSink`].  The evdev and uinput adapters in
//! the infrastructure layer implement them for real hardware, and the
//! scripted/recording mocks implement them for tests.

use std::time::Duration;

use touch_core::InputEvent;

use crate::application::error::RelayError;

/// A stream of input events from a touch device.
pub trait EventSource: Send {
    /// Waits up to `wait` for the next event.
    ///
    /// Returns `Ok(None)` if nothing arrived in time ("no event yet").
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::ReadFailed`] if the device can no longer be read.
    fn next_event(&mut self, wait: Duration) -> Result<Option<InputEvent>, RelayError>;

    /// Releases any exclusive grab held on the device.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::ControlCallFailed`] if the release call fails.
    fn release(&mut self) -> Result<(), RelayError>;
}

/// A destination for relayed or synthesized events.
#[cfg_attr(test, mockall::automock)]
pub trait EventSink: Send {
    /// Writes one event.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::WriteFailed`] if the event could not be written.
    fn write_event(&mut self, event: &InputEvent) -> Result<(), RelayError>;

    /// Destroys the device behind the sink.  Further writes fail.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::ControlCallFailed`] if the destroy call fails.
    fn destroy(&mut self) -> Result<(), RelayError>;
}
