//! Synthetic injector: fabricates touches in the reserved contact slot.
//!
//! # How synthetic touches reach the screen (for beginners)
//!
//! The injector never writes to the virtual device directly.  It edits the
//! reserved slot of the shared contact table, snapshots the table exactly as
//! the reader does at a `SYN_REPORT`, and hands the frame to the dispatcher
//! over the same channel while still holding the table lock.  To the
//! dispatcher a synthetic finger is just one more slot, so relayed and
//! synthetic contacts mix without special cases.
//!
//! After each frame the injector sleeps the frame interval, which bounds the
//! rate of synthetic frames.

use std::sync::mpsc::SyncSender;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};
use touch_core::{
    swipe_path, ContactSlot, ContactTable, CoordinateMapper, DeviceDescriptor, DisplaySize,
    SwipeParams, TrackingIdAllocator,
};
use tracing::debug;

use crate::application::error::RelayError;
use crate::application::protocol::{MultitouchProtocol, SyntheticContact};

/// Tunables for synthetic gestures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InjectorOptions {
    pub display: DisplaySize,
    pub frame_interval: Duration,
    pub swipe: SwipeParams,
}

/// Writes synthetic contacts into the reserved slot.
pub struct Injector {
    protocol: Arc<dyn MultitouchProtocol>,
    table: Arc<Mutex<ContactTable>>,
    frames: SyncSender<ContactTable>,
    descriptor: DeviceDescriptor,
    mapper: CoordinateMapper,
    tracking: TrackingIdAllocator,
    swipe: SwipeParams,
    frame_interval: Duration,
    /// Tracking id of the synthetic contact while it is down.
    current: Option<i32>,
}

impl Injector {
    pub fn new(
        protocol: Arc<dyn MultitouchProtocol>,
        table: Arc<Mutex<ContactTable>>,
        frames: SyncSender<ContactTable>,
        descriptor: &DeviceDescriptor,
        options: InjectorOptions,
    ) -> Self {
        Self {
            protocol,
            table,
            frames,
            mapper: CoordinateMapper::new(
                options.display,
                &descriptor.x_axis(),
                &descriptor.y_axis(),
            ),
            tracking: TrackingIdAllocator::new(&descriptor.tracking_axis()),
            descriptor: descriptor.clone(),
            swipe: options.swipe,
            frame_interval: options.frame_interval,
            current: None,
        }
    }

    /// Returns `true` while a synthetic contact is down.
    pub fn is_touching(&self) -> bool {
        self.current.is_some()
    }

    /// Re-targets the display-to-device mapping.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidDisplaySize`] if either dimension is zero.
    pub fn set_display_size(&mut self, width: u32, height: u32) -> Result<(), RelayError> {
        let display = DisplaySize::new(width, height)?;
        self.mapper = CoordinateMapper::new(
            display,
            &self.descriptor.x_axis(),
            &self.descriptor.y_axis(),
        );
        debug!(width, height, "display size updated");
        Ok(())
    }

    /// Moves the synthetic contact to display position `(x, y)`, touching
    /// down first if it is up.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::ReservedSlotUnavailable`] if the device has too
    /// few slots and [`RelayError::SessionStopped`] if the dispatcher exited.
    pub fn move_to(&mut self, x: i32, y: i32) -> Result<(), RelayError> {
        let (device_x, device_y) = self.mapper.map(x, y);
        let (tracking_id, touch_down) = match self.current {
            Some(id) => (id, false),
            None => (self.tracking.next(), true),
        };
        let contact = SyntheticContact {
            tracking_id,
            x: device_x,
            y: device_y,
            touch_down,
        };
        self.submit(|slot| self.protocol.write_synthetic(slot, &contact))?;
        self.current = Some(tracking_id);
        Ok(())
    }

    /// Lifts the synthetic contact.  Does nothing if it is not down.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::SessionStopped`] if the dispatcher exited.
    pub fn up(&mut self) -> Result<(), RelayError> {
        if self.current.is_none() {
            return Ok(());
        }
        self.submit(ContactSlot::lift)?;
        self.current = None;
        Ok(())
    }

    /// Touches down at `(x, y)` and lifts.
    ///
    /// # Errors
    ///
    /// See [`Injector::move_to`].
    pub fn tap(&mut self, x: i32, y: i32) -> Result<(), RelayError> {
        self.move_to(x, y)?;
        self.up()
    }

    /// Swipes in a straight line from `(sx, sy)` to `(ex, ey)` and lifts.
    ///
    /// # Errors
    ///
    /// See [`Injector::move_to`].
    pub fn swipe(&mut self, sx: i32, sy: i32, ex: i32, ey: i32) -> Result<(), RelayError> {
        self.move_to(sx, sy)?;
        for (x, y) in swipe_path((sx, sy), (ex, ey), self.swipe) {
            self.move_to(x, y)?;
        }
        self.move_to(ex, ey)?;
        self.up()
    }

    /// Edits the reserved slot, snapshots the table and hands the frame to
    /// the dispatcher, all under the table lock.  If the dispatcher is gone
    /// the table is restored, so a failed submit changes nothing.
    fn submit(&self, edit: impl FnOnce(&mut ContactSlot)) -> Result<(), RelayError> {
        let mut table = self.table.lock();
        let before = table.clone();
        let slots = table.len();
        let slot = table
            .reserved_slot_mut()
            .ok_or(RelayError::ReservedSlotUnavailable { slots })?;
        edit(slot);
        let frame = table.take_frame();
        if self.frames.send(frame).is_err() {
            *table = before;
            return Err(RelayError::SessionStopped);
        }
        MutexGuard::unlock_fair(table);
        thread::sleep(self.frame_interval);
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
