//! Reader: folds the source device's event stream into the contact table.
//!
//! Events between two `SYN_REPORT`s are staged locally and applied to the
//! shared table in one critical section at the frame boundary.  In the same
//! critical section the reader takes the frame snapshot and hands it to the
//! dispatcher through the zero-capacity frame channel.  The table lock is
//! held until the dispatcher accepts the frame, so frames from the reader
//! and the injector reach the dispatcher in the order they were taken.  The
//! dispatcher never locks the table.  The send blocks until the dispatcher
//! accepts the frame, so a slow virtual device applies backpressure to
//! kernel reads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::SyncSender;
use std::sync::Arc;
use std::time::Duration;

use touch_core::abi::codes::{
    ABS_MT_SLOT, BTN_TOUCH, EV_ABS, EV_KEY, EV_SYN, SYN_DROPPED, SYN_REPORT,
};
use parking_lot::{Mutex, MutexGuard};
use touch_core::{ContactTable, InputEvent};
use tracing::{debug, error, trace, warn};

use crate::application::device_io::EventSource;
use crate::application::protocol::MultitouchProtocol;

/// One `EV_ABS` report waiting for the next frame boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StagedAbs {
    slot: i32,
    code: u16,
    value: i32,
}

/// Why a frame boundary could not be delivered.
#[derive(Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    Delivered,
    /// The dispatcher has exited.
    Disconnected,
}

/// The protocol state machine running on the reader thread.
pub struct Reader {
    source: Box<dyn EventSource>,
    protocol: Arc<dyn MultitouchProtocol>,
    table: Arc<Mutex<ContactTable>>,
    frames: SyncSender<ContactTable>,
    running: Arc<AtomicBool>,
    idle_poll: Duration,
    current_slot: i32,
    staged: Vec<StagedAbs>,
}

impl Reader {
    pub fn new(
        source: Box<dyn EventSource>,
        protocol: Arc<dyn MultitouchProtocol>,
        table: Arc<Mutex<ContactTable>>,
        frames: SyncSender<ContactTable>,
        running: Arc<AtomicBool>,
        idle_poll: Duration,
    ) -> Self {
        Self {
            source,
            protocol,
            table,
            frames,
            running,
            idle_poll,
            current_slot: 0,
            staged: Vec::new(),
        }
    }

    /// Runs until the shutdown flag clears, the source fails or the
    /// dispatcher goes away.  Returns the source so the caller can release
    /// its grab.
    pub fn run(mut self) -> Box<dyn EventSource> {
        debug!("reader started");
        while self.running.load(Ordering::Relaxed) {
            let event = match self.source.next_event(self.idle_poll) {
                Ok(Some(event)) => event,
                Ok(None) => continue,
                Err(e) => {
                    error!("reader stopped: {e}");
                    break;
                }
            };
            if self.handle_event(&event) == FrameOutcome::Disconnected {
                debug!("dispatcher gone; reader exiting");
                break;
            }
        }
        debug!("reader stopped");
        self.source
    }

    /// Processes one event.
    pub fn handle_event(&mut self, event: &InputEvent) -> FrameOutcome {
        match (event.event_type, event.code) {
            (EV_SYN, SYN_REPORT) => {
                trace!("SYN_REPORT");
                return self.flush_frame();
            }
            (EV_SYN, SYN_DROPPED) => {
                warn!(
                    discarded = self.staged.len(),
                    "kernel dropped input events; discarding partial frame"
                );
                self.staged.clear();
            }
            (EV_KEY, BTN_TOUCH) => {
                trace!(down = event.value == 1, "BTN_TOUCH");
            }
            (EV_ABS, ABS_MT_SLOT) => {
                trace!(slot = event.value, "ABS_MT_SLOT");
                self.current_slot = event.value;
            }
            (EV_ABS, code) => {
                trace!(code, value = event.value, slot = self.current_slot, "ABS");
                self.staged.push(StagedAbs {
                    slot: self.current_slot,
                    code,
                    value: event.value,
                });
            }
            _ => {}
        }
        FrameOutcome::Delivered
    }

    /// Applies the staged reports, snapshots the table and hands the frame
    /// to the dispatcher, all under the table lock.
    fn flush_frame(&mut self) -> FrameOutcome {
        let mut table = self.table.lock();
        for staged in self.staged.drain(..) {
            if let Some(slot) = table.source_slot_mut(staged.slot) {
                self.protocol.apply_abs(slot, staged.code, staged.value);
            }
        }
        let frame = table.take_frame();
        let outcome = match self.frames.send(frame) {
            Ok(()) => FrameOutcome::Delivered,
            Err(_) => FrameOutcome::Disconnected,
        };
        // Hand the table to a waiting injector before the next frame.
        MutexGuard::unlock_fair(table);
        outcome
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
