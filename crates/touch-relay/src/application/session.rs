//! TouchRelaySession: owns the reader and dispatcher threads and the
//! injector, and tears everything down exactly once.
//!
//! # Lifecycle
//!
//! ```text
//! start()
//!  ├─ spawn "touch-dispatcher"  (frame channel → EventSink)
//!  └─ spawn "touch-reader"      (EventSource → contact table → frame channel)
//! move_to / up / tap / swipe     (caller's thread, through the Injector)
//! stop() or Drop
//!  ├─ lift the synthetic contact, if down
//!  ├─ clear the running flag and join both threads
//!  ├─ destroy the virtual device, then close it
//!  └─ release the source grab
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use touch_core::{ContactTable, DeviceDescriptor, ProtocolKind};
use tracing::{info, warn};

use crate::application::device_io::{EventSink, EventSource};
use crate::application::dispatcher::Dispatcher;
use crate::application::error::RelayError;
use crate::application::injector::{Injector, InjectorOptions};
use crate::application::protocol::protocol_for;
use crate::application::reader::Reader;

/// Runtime tunables of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub protocol: ProtocolKind,
    pub injector: InjectorOptions,
    /// Longest time a relay thread waits before re-checking the running flag.
    pub idle_poll: Duration,
}

/// A running relay between one source device and one virtual device.
pub struct TouchRelaySession {
    descriptor: DeviceDescriptor,
    protocol: ProtocolKind,
    injector: Injector,
    running: Arc<AtomicBool>,
    reader: Option<JoinHandle<Box<dyn EventSource>>>,
    dispatcher: Option<JoinHandle<Box<dyn EventSink>>>,
    stopped: bool,
}

impl TouchRelaySession {
    /// Starts relaying from `source` to `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::ThreadSpawn`] if a relay thread cannot be
    /// started.
    pub fn start(
        descriptor: DeviceDescriptor,
        source: Box<dyn EventSource>,
        sink: Box<dyn EventSink>,
        options: SessionOptions,
    ) -> Result<Self, RelayError> {
        let protocol = protocol_for(options.protocol, &descriptor);
        let table = Arc::new(Mutex::new(ContactTable::new(descriptor.slot_count())));
        let running = Arc::new(AtomicBool::new(true));
        let (frames_tx, frames_rx) = mpsc::sync_channel(0);

        let dispatcher = Dispatcher::new(
            sink,
            Arc::clone(&protocol),
            frames_rx,
            Arc::clone(&running),
            options.idle_poll,
        );
        let dispatcher = thread::Builder::new()
            .name("touch-dispatcher".to_string())
            .spawn(move || dispatcher.run())
            .map_err(|source| RelayError::ThreadSpawn {
                name: "touch-dispatcher",
                source,
            })?;

        let injector = Injector::new(
            Arc::clone(&protocol),
            Arc::clone(&table),
            frames_tx.clone(),
            &descriptor,
            options.injector,
        );
        let mut session = Self {
            descriptor,
            protocol: options.protocol,
            injector,
            running: Arc::clone(&running),
            reader: None,
            dispatcher: Some(dispatcher),
            stopped: false,
        };

        let reader = Reader::new(
            source,
            protocol,
            table,
            frames_tx,
            running,
            options.idle_poll,
        );
        let reader = thread::Builder::new()
            .name("touch-reader".to_string())
            .spawn(move || reader.run())
            .map_err(|source| RelayError::ThreadSpawn {
                name: "touch-reader",
                source,
            })?;
        session.reader = Some(reader);

        info!(
            device = %session.descriptor.path.display(),
            name = %session.descriptor.name,
            slots = session.descriptor.slot_count(),
            protocol = %session.protocol,
            "touch relay started"
        );
        Ok(session)
    }

    pub fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    pub fn protocol(&self) -> ProtocolKind {
        self.protocol
    }

    /// Returns `true` until the session is stopped or the reader exits.
    pub fn is_running(&self) -> bool {
        !self.stopped
            && self
                .reader
                .as_ref()
                .is_some_and(|handle| !handle.is_finished())
    }

    /// See [`Injector::move_to`].
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::SessionStopped`] after [`TouchRelaySession::stop`].
    pub fn move_to(&mut self, x: i32, y: i32) -> Result<(), RelayError> {
        self.ensure_live()?;
        self.injector.move_to(x, y)
    }

    /// See [`Injector::up`].
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::SessionStopped`] after [`TouchRelaySession::stop`].
    pub fn up(&mut self) -> Result<(), RelayError> {
        self.ensure_live()?;
        self.injector.up()
    }

    /// See [`Injector::tap`].
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::SessionStopped`] after [`TouchRelaySession::stop`].
    pub fn tap(&mut self, x: i32, y: i32) -> Result<(), RelayError> {
        self.ensure_live()?;
        self.injector.tap(x, y)
    }

    /// See [`Injector::swipe`].
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::SessionStopped`] after [`TouchRelaySession::stop`].
    pub fn swipe(&mut self, sx: i32, sy: i32, ex: i32, ey: i32) -> Result<(), RelayError> {
        self.ensure_live()?;
        self.injector.swipe(sx, sy, ex, ey)
    }

    /// See [`Injector::set_display_size`].
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidDisplaySize`] for a zero dimension.
    pub fn set_display_size(&mut self, width: u32, height: u32) -> Result<(), RelayError> {
        self.injector.set_display_size(width, height)
    }

    /// Stops the session.  Teardown failures are logged, not returned.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn ensure_live(&self) -> Result<(), RelayError> {
        if self.stopped {
            Err(RelayError::SessionStopped)
        } else {
            Ok(())
        }
    }

    fn shutdown(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;

        if let Err(e) = self.injector.up() {
            warn!("could not lift synthetic contact: {e}");
        }

        self.running.store(false, Ordering::Relaxed);

        let source = self.reader.take().and_then(|handle| match handle.join() {
            Ok(source) => Some(source),
            Err(_) => {
                warn!("reader thread panicked");
                None
            }
        });
        let sink = self.dispatcher.take().and_then(|handle| match handle.join() {
            Ok(sink) => Some(sink),
            Err(_) => {
                warn!("dispatcher thread panicked");
                None
            }
        });

        if let Some(mut sink) = sink {
            if let Err(e) = sink.destroy() {
                warn!("could not destroy virtual device: {e}");
            }
            drop(sink);
        }
        if let Some(mut source) = source {
            if let Err(e) = source.release() {
                warn!("could not release touch device: {e}");
            }
        }

        info!(device = %self.descriptor.path.display(), "touch relay stopped");
    }
}

impl Drop for TouchRelaySession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::device::mock::{touch_descriptor, RecordingSink, ScriptedSource};
    use touch_core::abi::codes::{ABS_MT_POSITION_X, ABS_MT_TRACKING_ID, SYN_REPORT};
    use touch_core::{DisplaySize, InputEvent, SwipeParams};

    fn options(protocol: ProtocolKind) -> SessionOptions {
        SessionOptions {
            protocol,
            injector: InjectorOptions {
                display: DisplaySize::new(1080, 2340).unwrap(),
                frame_interval: Duration::ZERO,
                swipe: SwipeParams::default(),
            },
            idle_poll: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_stop_destroys_sink_then_releases_source() {
        // Arrange
        let source = ScriptedSource::new(Vec::new());
        let released = source.released_flag();
        let sink = RecordingSink::new();
        let session = TouchRelaySession::start(
            touch_descriptor(10),
            Box::new(source),
            Box::new(sink.clone()),
            options(ProtocolKind::TypeB),
        )
        .unwrap();

        // Act
        session.stop();

        // Assert
        assert!(sink.is_destroyed());
        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn test_drop_tears_down_once() {
        let source = ScriptedSource::new(Vec::new());
        let released = source.released_flag();
        let sink = RecordingSink::new();

        {
            let _session = TouchRelaySession::start(
                touch_descriptor(10),
                Box::new(source),
                Box::new(sink.clone()),
                options(ProtocolKind::TypeA),
            )
            .unwrap();
        }

        assert_eq!(sink.destroy_count(), 1);
        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn test_stop_lifts_synthetic_contact_first() {
        // Arrange
        let sink = RecordingSink::new();
        let mut session = TouchRelaySession::start(
            touch_descriptor(10),
            Box::new(ScriptedSource::new(Vec::new())),
            Box::new(sink.clone()),
            options(ProtocolKind::TypeB),
        )
        .unwrap();
        session.move_to(100, 100).unwrap();

        // Act
        session.stop();

        // Assert
        let events = sink.events();
        assert!(events.contains(&InputEvent::abs(ABS_MT_TRACKING_ID, -1)));
        assert_eq!(events.last(), Some(&InputEvent::syn(SYN_REPORT)));
    }

    #[test]
    fn test_relays_source_frames_to_sink() {
        // Arrange
        let source = ScriptedSource::new(vec![
            InputEvent::abs(ABS_MT_TRACKING_ID, 3),
            InputEvent::abs(ABS_MT_POSITION_X, 400),
            InputEvent::syn(SYN_REPORT),
        ]);
        let sink = RecordingSink::new();
        let session = TouchRelaySession::start(
            touch_descriptor(10),
            Box::new(source),
            Box::new(sink.clone()),
            options(ProtocolKind::TypeB),
        )
        .unwrap();

        // Act
        let delivered = sink.wait_for_frames(1, Duration::from_secs(2));
        session.stop();

        // Assert
        assert!(delivered);
        assert!(sink.events().contains(&InputEvent::abs(ABS_MT_POSITION_X, 400)));
    }

    #[test]
    fn test_session_exposes_descriptor_and_protocol() {
        let session = TouchRelaySession::start(
            touch_descriptor(10),
            Box::new(ScriptedSource::new(Vec::new())),
            Box::new(RecordingSink::new()),
            options(ProtocolKind::TypeA),
        )
        .unwrap();

        assert_eq!(session.protocol(), ProtocolKind::TypeA);
        assert_eq!(session.descriptor().slot_count(), 10);
        assert!(session.is_running());
    }
}
