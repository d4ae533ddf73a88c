//! Error type shared by the relay pipeline and its device adapters.

use std::io;

use thiserror::Error;
use touch_core::MappingError;

/// Errors raised while setting up, running or driving a relay session.
#[derive(Debug, Error)]
pub enum RelayError {
    /// No input node qualifies as a touch source (or the configured path
    /// does not).
    #[error("no qualifying touch device found")]
    DeviceNotFound,

    /// A control call, or an open/write on a device node during setup or
    /// teardown, failed.
    #[error("{call} failed: {source}")]
    ControlCallFailed {
        call: &'static str,
        #[source]
        source: io::Error,
    },

    /// Reading from the source device failed.
    #[error("read from touch device failed: {0}")]
    ReadFailed(#[source] io::Error),

    /// Writing an event to the virtual device failed.
    #[error("write to virtual device failed: {0}")]
    WriteFailed(#[source] io::Error),

    /// The device has too few slots to host the synthetic contact.
    #[error("synthetic injection needs more than 9 contact slots, device has {slots}")]
    ReservedSlotUnavailable { slots: usize },

    /// A display size with a zero dimension was supplied.
    #[error("invalid display size {width}x{height}")]
    InvalidDisplaySize { width: u32, height: u32 },

    /// The dispatcher is no longer accepting frames.
    #[error("relay session is stopped")]
    SessionStopped,

    /// A relay thread could not be spawned.
    #[error("failed to spawn {name} thread: {source}")]
    ThreadSpawn {
        name: &'static str,
        #[source]
        source: io::Error,
    },
}

impl RelayError {
    /// Wraps an I/O error from a control call.
    pub fn control(call: &'static str, source: io::Error) -> Self {
        Self::ControlCallFailed { call, source }
    }

    /// The OS error number behind this error, if any.
    pub fn errno(&self) -> Option<i32> {
        match self {
            Self::ControlCallFailed { source, .. }
            | Self::ReadFailed(source)
            | Self::WriteFailed(source)
            | Self::ThreadSpawn { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }
}

impl From<MappingError> for RelayError {
    fn from(err: MappingError) -> Self {
        match err {
            MappingError::InvalidDisplaySize { width, height } => {
                Self::InvalidDisplaySize { width, height }
            }
        }
    }
}
