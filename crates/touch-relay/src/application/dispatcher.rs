//! Dispatcher: re-emits each frame on the virtual device.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use touch_core::ContactTable;
use tracing::{debug, warn};

use crate::application::device_io::EventSink;
use crate::application::protocol::MultitouchProtocol;

/// Consumes frame snapshots and writes the protocol's events to the sink.
pub struct Dispatcher {
    sink: Box<dyn EventSink>,
    protocol: Arc<dyn MultitouchProtocol>,
    frames: Receiver<ContactTable>,
    running: Arc<AtomicBool>,
    idle_poll: Duration,
    button_down: bool,
}

impl Dispatcher {
    pub fn new(
        sink: Box<dyn EventSink>,
        protocol: Arc<dyn MultitouchProtocol>,
        frames: Receiver<ContactTable>,
        running: Arc<AtomicBool>,
        idle_poll: Duration,
    ) -> Self {
        Self {
            sink,
            protocol,
            frames,
            running,
            idle_poll,
            button_down: false,
        }
    }

    /// Runs until the shutdown flag clears or every frame sender is gone.
    /// Returns the sink so the caller can destroy the virtual device.
    pub fn run(mut self) -> Box<dyn EventSink> {
        debug!("dispatcher started");
        while self.running.load(Ordering::Relaxed) {
            match self.frames.recv_timeout(self.idle_poll) {
                Ok(frame) => {
                    self.dispatch(frame);
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        debug!("dispatcher stopped");
        self.sink
    }

    /// Emits one frame.  Write failures are logged and skipped.  Returns the
    /// number of events written.
    pub fn dispatch(&mut self, mut frame: ContactTable) -> usize {
        let events = self.protocol.emit_frame(&mut frame, &mut self.button_down);
        let mut written = 0;
        for event in &events {
            match self.sink.write_event(event) {
                Ok(()) => written += 1,
                Err(e) => warn!(
                    event_type = event.event_type,
                    code = event.code,
                    "dropping event: {e}"
                ),
            }
        }
        debug!(written, total = events.len(), "frame dispatched");
        written
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::mpsc;
    use std::thread;

    use super::*;
    use crate::application::device_io::MockEventSink;
    use crate::application::error::RelayError;
    use crate::application::protocol::{TypeA, TypeB};
    use crate::infrastructure::device::mock::{touch_descriptor, RecordingSink};
    use touch_core::abi::codes::{
        ABS_MT_POSITION_X, ABS_MT_POSITION_Y, ABS_MT_SLOT, ABS_MT_TRACKING_ID, BTN_TOUCH,
        SYN_REPORT,
    };
    use touch_core::InputEvent;

    fn dispatcher(
        sink: Box<dyn EventSink>,
        protocol: Arc<dyn MultitouchProtocol>,
    ) -> (Dispatcher, mpsc::SyncSender<ContactTable>, Arc<AtomicBool>) {
        let (tx, rx) = mpsc::sync_channel(0);
        let running = Arc::new(AtomicBool::new(true));
        let d = Dispatcher::new(sink, protocol, rx, Arc::clone(&running), Duration::from_millis(5));
        (d, tx, running)
    }

    fn touched_frame() -> ContactTable {
        let mut table = ContactTable::new(10);
        let slot = table.slot_mut(1).unwrap();
        slot.apply_tracking_id(12, true);
        slot.x.set(10);
        slot.y.set(20);
        table.take_frame()
    }

    #[test]
    fn test_dispatch_writes_type_b_frame() {
        // Arrange
        let sink = RecordingSink::new();
        let protocol = Arc::new(TypeB::new(&touch_descriptor(10)));
        let (mut d, _tx, _running) = dispatcher(Box::new(sink.clone()), protocol);

        // Act
        let written = d.dispatch(touched_frame());

        // Assert
        assert_eq!(written, 6);
        assert_eq!(
            sink.events(),
            vec![
                InputEvent::abs(ABS_MT_SLOT, 1),
                InputEvent::abs(ABS_MT_TRACKING_ID, 12),
                InputEvent::abs(ABS_MT_POSITION_X, 10),
                InputEvent::abs(ABS_MT_POSITION_Y, 20),
                InputEvent::key(BTN_TOUCH, 1),
                InputEvent::syn(SYN_REPORT),
            ]
        );
    }

    #[test]
    fn test_button_state_carries_across_frames() {
        let sink = RecordingSink::new();
        let (mut d, _tx, _running) = dispatcher(Box::new(sink.clone()), Arc::new(TypeA));

        d.dispatch(touched_frame());
        d.dispatch(touched_frame());

        let presses = sink
            .events()
            .into_iter()
            .filter(|e| *e == InputEvent::key(BTN_TOUCH, 1))
            .count();
        assert_eq!(presses, 1);
    }

    #[test]
    fn test_write_failures_are_skipped_per_event() {
        // Arrange: the first write fails, the rest succeed
        let mut mock = MockEventSink::new();
        let mut calls = 0;
        mock.expect_write_event().times(6).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Err(RelayError::WriteFailed(io::Error::from_raw_os_error(libc::EAGAIN)))
            } else {
                Ok(())
            }
        });
        let protocol = Arc::new(TypeB::new(&touch_descriptor(10)));
        let (mut d, _tx, _running) = dispatcher(Box::new(mock), protocol);

        // Act
        let written = d.dispatch(touched_frame());

        // Assert
        assert_eq!(written, 5);
    }

    #[test]
    fn test_run_returns_sink_when_senders_disconnect() {
        // Arrange
        let sink = RecordingSink::new();
        let (d, tx, _running) = dispatcher(Box::new(sink.clone()), Arc::new(TypeA));
        let handle = thread::spawn(move || d.run());

        // Act
        tx.send(ContactTable::new(10)).unwrap();
        drop(tx);
        let mut returned = handle.join().unwrap();

        // Assert
        assert_eq!(sink.events(), vec![InputEvent::syn(SYN_REPORT)]);
        returned.destroy().unwrap();
        assert!(sink.is_destroyed());
    }

    #[test]
    fn test_run_stops_on_shutdown_flag() {
        let sink = RecordingSink::new();
        let (d, _tx, running) = dispatcher(Box::new(sink.clone()), Arc::new(TypeA));
        let handle = thread::spawn(move || d.run());

        running.store(false, Ordering::SeqCst);

        assert!(handle.join().is_ok());
        assert!(sink.events().is_empty());
    }
}
