//! Contact table: per-slot touch state with dirty tracking.
//!
//! # Slots and dirty flags (for beginners)
//!
//! A multitouch screen reports each finger in its own numbered *slot*.  The
//! relay keeps one [`ContactSlot`] per hardware slot and, for every field,
//! remembers whether it changed since the last frame was emitted (the *dirty*
//! flag).  A dirty field is emitted once and then becomes clean, so an
//! unchanged contact costs nothing on the next frame.
//!
//! The only way to get a value out *for emission* is [`Field::take`], which
//! yields the value if and only if it is dirty and clears the flag in the same
//! step.  [`Field::value`] is a plain read for decisions such as "is this
//! position positive?".
//!
//! # Reserved slot
//!
//! Slot [`RESERVED_SLOT`] belongs to the synthetic injector.  Events coming
//! from the hardware that address it are dropped (see
//! [`ContactTable::source_slot_mut`]).

use crate::abi::codes::{
    ABS_MT_ORIENTATION, ABS_MT_POSITION_X, ABS_MT_POSITION_Y, ABS_MT_PRESSURE,
    ABS_MT_TOUCH_MAJOR, ABS_MT_TOUCH_MINOR, ABS_MT_TRACKING_ID, ABS_MT_WIDTH_MAJOR,
    ABS_MT_WIDTH_MINOR, TRACKING_ID_LIFT,
};

/// Slot index owned by the synthetic injector.
pub const RESERVED_SLOT: usize = 9;

/// Value held by the position fields of an inactive slot.
pub const POSITION_SENTINEL: i32 = -1;

// ── Field ─────────────────────────────────────────────────────────────────────

/// A value paired with its dirty flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    value: i32,
    dirty: bool,
}

impl Field {
    pub const fn new(value: i32) -> Self {
        Self {
            value,
            dirty: false,
        }
    }

    /// Stores `value` and marks the field dirty.
    pub fn set(&mut self, value: i32) {
        self.value = value;
        self.dirty = true;
    }

    /// Stores `value` without touching the dirty flag.
    pub fn store(&mut self, value: i32) {
        self.value = value;
    }

    pub fn value(&self) -> i32 {
        self.value
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns the value if dirty, clearing the flag.
    pub fn take(&mut self) -> Option<i32> {
        if self.dirty {
            self.dirty = false;
            Some(self.value)
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.dirty = false;
    }
}

// ── SlotField ─────────────────────────────────────────────────────────────────

/// Names a tracked field of a [`ContactSlot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotField {
    TrackingId,
    X,
    Y,
    TouchMajor,
    TouchMinor,
    WidthMajor,
    WidthMinor,
    Orientation,
    Pressure,
}

impl SlotField {
    /// Emission order for a slot's dirty fields.
    pub const EMIT_ORDER: [SlotField; 9] = [
        SlotField::TrackingId,
        SlotField::X,
        SlotField::Y,
        SlotField::TouchMajor,
        SlotField::TouchMinor,
        SlotField::WidthMajor,
        SlotField::WidthMinor,
        SlotField::Orientation,
        SlotField::Pressure,
    ];

    /// The `EV_ABS` code carrying this field.
    pub fn code(self) -> u16 {
        match self {
            Self::TrackingId => ABS_MT_TRACKING_ID,
            Self::X => ABS_MT_POSITION_X,
            Self::Y => ABS_MT_POSITION_Y,
            Self::TouchMajor => ABS_MT_TOUCH_MAJOR,
            Self::TouchMinor => ABS_MT_TOUCH_MINOR,
            Self::WidthMajor => ABS_MT_WIDTH_MAJOR,
            Self::WidthMinor => ABS_MT_WIDTH_MINOR,
            Self::Orientation => ABS_MT_ORIENTATION,
            Self::Pressure => ABS_MT_PRESSURE,
        }
    }

    /// Maps an `EV_ABS` code to a tracked field.
    pub fn from_code(code: u16) -> Option<Self> {
        Self::EMIT_ORDER.into_iter().find(|field| field.code() == code)
    }

    /// Returns `true` for the X and Y position fields.
    pub fn is_position(self) -> bool {
        matches!(self, Self::X | Self::Y)
    }
}

// ── ContactSlot ───────────────────────────────────────────────────────────────

/// State of one contact slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactSlot {
    active: bool,
    pub x: Field,
    pub y: Field,
    pub touch_major: Field,
    pub touch_minor: Field,
    pub width_major: Field,
    pub width_minor: Field,
    pub orientation: Field,
    pub pressure: Field,
    pub tracking_id: Field,
}

impl Default for ContactSlot {
    fn default() -> Self {
        Self {
            active: false,
            x: Field::new(POSITION_SENTINEL),
            y: Field::new(POSITION_SENTINEL),
            touch_major: Field::new(0),
            touch_minor: Field::new(0),
            width_major: Field::new(0),
            width_minor: Field::new(0),
            orientation: Field::new(0),
            pressure: Field::new(0),
            tracking_id: Field::new(TRACKING_ID_LIFT),
        }
    }
}

impl ContactSlot {
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn field(&self, field: SlotField) -> &Field {
        match field {
            SlotField::TrackingId => &self.tracking_id,
            SlotField::X => &self.x,
            SlotField::Y => &self.y,
            SlotField::TouchMajor => &self.touch_major,
            SlotField::TouchMinor => &self.touch_minor,
            SlotField::WidthMajor => &self.width_major,
            SlotField::WidthMinor => &self.width_minor,
            SlotField::Orientation => &self.orientation,
            SlotField::Pressure => &self.pressure,
        }
    }

    pub fn field_mut(&mut self, field: SlotField) -> &mut Field {
        match field {
            SlotField::TrackingId => &mut self.tracking_id,
            SlotField::X => &mut self.x,
            SlotField::Y => &mut self.y,
            SlotField::TouchMajor => &mut self.touch_major,
            SlotField::TouchMinor => &mut self.touch_minor,
            SlotField::WidthMajor => &mut self.width_major,
            SlotField::WidthMinor => &mut self.width_minor,
            SlotField::Orientation => &mut self.orientation,
            SlotField::Pressure => &mut self.pressure,
        }
    }

    /// Applies a tracking-id report: any value other than `-1` activates the
    /// slot.  With `mark_dirty` the tracking field becomes dirty even if the
    /// value did not change.  Deactivation resets the position to the
    /// sentinel without marking it dirty.
    pub fn apply_tracking_id(&mut self, tracking_id: i32, mark_dirty: bool) {
        self.active = tracking_id != TRACKING_ID_LIFT;
        if mark_dirty {
            self.tracking_id.set(tracking_id);
        } else {
            self.tracking_id.store(tracking_id);
        }
        if !self.active {
            self.reset_position();
        }
    }

    /// Lifts the contact: inactive, sentinel position, tracking id `-1` dirty.
    pub fn lift(&mut self) {
        self.apply_tracking_id(TRACKING_ID_LIFT, true);
    }

    /// Returns `true` if any field carries a dirty flag.
    pub fn is_dirty(&self) -> bool {
        SlotField::EMIT_ORDER
            .into_iter()
            .any(|field| self.field(field).is_dirty())
    }

    pub fn clear_dirty(&mut self) {
        for field in SlotField::EMIT_ORDER {
            self.field_mut(field).clear();
        }
    }

    fn reset_position(&mut self) {
        self.x.store(POSITION_SENTINEL);
        self.y.store(POSITION_SENTINEL);
    }

    /// Restores the sentinel on an inactive slot's position.
    fn normalize(&mut self) {
        if !self.active {
            self.reset_position();
        }
    }
}

// ── ContactTable ──────────────────────────────────────────────────────────────

/// One [`ContactSlot`] per hardware slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactTable {
    slots: Vec<ContactSlot>,
}

impl ContactTable {
    /// Creates `slots` inactive slots.
    pub fn new(slots: usize) -> Self {
        Self {
            slots: vec![ContactSlot::default(); slots],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns `true` if the table is large enough to host [`RESERVED_SLOT`].
    pub fn has_reserved_slot(&self) -> bool {
        self.slots.len() > RESERVED_SLOT
    }

    pub fn slot(&self, index: usize) -> Option<&ContactSlot> {
        self.slots.get(index)
    }

    pub fn slot_mut(&mut self, index: usize) -> Option<&mut ContactSlot> {
        self.slots.get_mut(index)
    }

    /// Slot addressed by a hardware event.  `None` for the reserved slot and
    /// for out-of-range indices, so such writes are dropped.
    pub fn source_slot_mut(&mut self, index: i32) -> Option<&mut ContactSlot> {
        let index = usize::try_from(index).ok()?;
        if index == RESERVED_SLOT {
            return None;
        }
        self.slots.get_mut(index)
    }

    /// The injector's slot, if the table has one.
    pub fn reserved_slot_mut(&mut self) -> Option<&mut ContactSlot> {
        self.slots.get_mut(RESERVED_SLOT)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContactSlot> + '_ {
        self.slots.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ContactSlot> + '_ {
        self.slots.iter_mut()
    }

    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_active()).count()
    }

    /// Returns `true` if no slot carries a dirty flag.
    pub fn is_clean(&self) -> bool {
        !self.slots.iter().any(ContactSlot::is_dirty)
    }

    /// Takes an owned snapshot of the table for one frame.
    ///
    /// The snapshot carries the dirty flags; the table itself is left clean.
    /// Inactive slots are normalized to the sentinel position in both.
    pub fn take_frame(&mut self) -> ContactTable {
        for slot in &mut self.slots {
            slot.normalize();
        }
        let frame = self.clone();
        for slot in &mut self.slots {
            slot.clear_dirty();
        }
        frame
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
