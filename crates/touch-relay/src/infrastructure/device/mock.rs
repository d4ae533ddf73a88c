//! In-memory device doubles for tests.
//!
//! # Why mocks? (for beginners)
//!
//! The real adapters need `/dev/input/event*` and `/dev/uinput`, which exist
//! only on a Linux machine with permission to grab devices.  The relay
//! threads only see the [`EventSource`] / [`EventSink`] ports, so tests plug
//! in these doubles instead:
//!
//! - [`ScriptedSource`] replays a fixed list of events, then idles (or fails).
//! - [`RecordingSink`] records every written event behind an `Arc`, so a
//!   clone kept by the test observes what the dispatcher thread wrote.
//!
//! [`touch_descriptor`] builds a plausible touch-screen descriptor without
//! probing hardware.

use std::collections::{BTreeMap, VecDeque};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use touch_core::abi::codes::{
    ABS_MT_POSITION_X, ABS_MT_POSITION_Y, ABS_MT_PRESSURE, ABS_MT_SLOT, ABS_MT_TOUCH_MAJOR,
    ABS_MT_TRACKING_ID, BTN_TOUCH, EV_ABS, EV_KEY, EV_SYN, INPUT_PROP_DIRECT, SYN_REPORT,
};
use touch_core::{AbsInfo, Capabilities, DeviceDescriptor, InputEvent, InputId};

use crate::application::device_io::{EventSink, EventSource};
use crate::application::error::RelayError;

/// Builds a direct touch screen descriptor with `slots` contact slots.
///
/// Axes: X `0..=1079`, Y `0..=2339`, tracking id `0..=65535`, touch major
/// and pressure `0..=255`.  A 1080x2340 display therefore maps 1:1.
pub fn touch_descriptor(slots: usize) -> DeviceDescriptor {
    touch_descriptor_with(slots, Vec::new())
}

/// Like [`touch_descriptor`], with `extra` axes declared as well.
pub fn touch_descriptor_with(
    slots: usize,
    extra: impl IntoIterator<Item = (u16, AbsInfo)>,
) -> DeviceDescriptor {
    let slot_max = i32::try_from(slots).unwrap_or(i32::MAX).saturating_sub(1);
    let mut axes: BTreeMap<u16, AbsInfo> = [
        (ABS_MT_SLOT, AbsInfo::with_range(0, slot_max)),
        (ABS_MT_TOUCH_MAJOR, AbsInfo::with_range(0, 255)),
        (ABS_MT_POSITION_X, AbsInfo::with_range(0, 1079)),
        (ABS_MT_POSITION_Y, AbsInfo::with_range(0, 2339)),
        (ABS_MT_TRACKING_ID, AbsInfo::with_range(0, 65535)),
        (ABS_MT_PRESSURE, AbsInfo::with_range(0, 255)),
    ]
    .into_iter()
    .collect();
    axes.extend(extra);

    let capabilities = Capabilities {
        event_types: [EV_SYN, EV_KEY, EV_ABS].into_iter().collect(),
        abs: axes.keys().copied().collect(),
        keys: [BTN_TOUCH].into_iter().collect(),
        props: [INPUT_PROP_DIRECT].into_iter().collect(),
    };

    DeviceDescriptor::new(
        "/dev/input/event-mock",
        "mock touchscreen",
        "mock/input0",
        0x0001_0001,
        InputId {
            bustype: 0x18,
            vendor: 0x1234,
            product: 0x5678,
            version: 1,
        },
        capabilities,
        axes,
    )
}

// ── ScriptedSource ────────────────────────────────────────────────────────────

/// Replays a scripted event list.
///
/// Once the script is exhausted, `next_event` sleeps for the requested wait
/// and reports "no event", or fails with a read error if
/// [`ScriptedSource::failing_when_exhausted`] was set.
pub struct ScriptedSource {
    events: VecDeque<InputEvent>,
    fail_when_exhausted: bool,
    released: Arc<AtomicBool>,
}

impl ScriptedSource {
    pub fn new(events: Vec<InputEvent>) -> Self {
        Self {
            events: events.into(),
            fail_when_exhausted: false,
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Makes the source fail like an unplugged device once the script ends.
    pub fn failing_when_exhausted(mut self) -> Self {
        self.fail_when_exhausted = true;
        self
    }

    /// Flag set once `release` has been called.
    pub fn released_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.released)
    }
}

impl EventSource for ScriptedSource {
    fn next_event(&mut self, wait: Duration) -> Result<Option<InputEvent>, RelayError> {
        if let Some(event) = self.events.pop_front() {
            return Ok(Some(event));
        }
        if self.fail_when_exhausted {
            return Err(RelayError::ReadFailed(io::Error::from_raw_os_error(
                libc::ENODEV,
            )));
        }
        thread::sleep(wait);
        Ok(None)
    }

    fn release(&mut self) -> Result<(), RelayError> {
        self.released.store(true, Ordering::SeqCst);
        Ok(())
    }
}

// ── RecordingSink ─────────────────────────────────────────────────────────────

/// Records written events.  Clones share the same record.
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<InputEvent>>>,
    destroyed: Arc<AtomicUsize>,
    /// When `true`, every write fails with `WriteFailed`.
    pub should_fail: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every event written so far, in order.
    pub fn events(&self) -> Vec<InputEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroy_count() > 0
    }

    pub fn destroy_count(&self) -> usize {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Number of complete frames (`SYN_REPORT`s) written so far.
    pub fn frame_count(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| **e == InputEvent::syn(SYN_REPORT))
            .count()
    }

    /// Polls until at least `frames` frames were written or `timeout`
    /// elapses.  Returns `true` if the frames arrived.
    pub fn wait_for_frames(&self, frames: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.frame_count() >= frames {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        self.frame_count() >= frames
    }
}

impl EventSink for RecordingSink {
    fn write_event(&mut self, event: &InputEvent) -> Result<(), RelayError> {
        if self.should_fail {
            return Err(RelayError::WriteFailed(io::Error::from_raw_os_error(
                libc::EIO,
            )));
        }
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(*event);
        Ok(())
    }

    fn destroy(&mut self) -> Result<(), RelayError> {
        self.destroyed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touch_descriptor_has_requested_slots_and_qualifies() {
        let descriptor = touch_descriptor(10);

        assert_eq!(descriptor.slot_count(), 10);
        assert!(descriptor.capabilities.is_touch_source());
        assert!(descriptor.features.pressure);
        assert!(descriptor.features.direct);
    }

    #[test]
    fn test_scripted_source_replays_then_idles() {
        let mut source = ScriptedSource::new(vec![InputEvent::syn(SYN_REPORT)]);

        let first = source.next_event(Duration::ZERO).unwrap();
        let second = source.next_event(Duration::ZERO).unwrap();

        assert_eq!(first, Some(InputEvent::syn(SYN_REPORT)));
        assert_eq!(second, None);
    }

    #[test]
    fn test_recording_sink_clones_share_record() {
        let sink = RecordingSink::new();
        let mut writer = sink.clone();

        writer.write_event(&InputEvent::syn(SYN_REPORT)).unwrap();

        assert_eq!(sink.frame_count(), 1);
    }

    #[test]
    fn test_recording_sink_should_fail() {
        let mut sink = RecordingSink {
            should_fail: true,
            ..RecordingSink::default()
        };

        let result = sink.write_event(&InputEvent::syn(SYN_REPORT));

        assert!(matches!(result, Err(RelayError::WriteFailed(_))));
        assert!(sink.events().is_empty());
    }
}
