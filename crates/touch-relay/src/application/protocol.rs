//! Type A and Type B multitouch protocols.
//!
//! # Two wire protocols (for beginners)
//!
//! The kernel multitouch documentation defines two ways of reporting several
//! fingers at once:
//!
//! - **Type A** is stateless.  Every frame lists *all* current contacts, each
//!   followed by a `SYN_MT_REPORT` separator.  Nothing is remembered between
//!   frames, so an idle finger is re-sent every frame.
//! - **Type B** is slotted.  Each contact lives in a numbered slot selected
//!   with `ABS_MT_SLOT`; only fields that *changed* are sent.  A contact is
//!   born with a new `ABS_MT_TRACKING_ID` and dies with tracking id `-1`.
//!
//! The source touch screen always speaks Type B (enumeration requires
//! `ABS_MT_SLOT`).  The [`MultitouchProtocol`] chosen for a session decides
//! how those reports are folded into the contact table and how each frame is
//! re-emitted on the virtual device.

use std::sync::Arc;

use touch_core::abi::codes::{
    ABS_MT_ORIENTATION, ABS_MT_POSITION_X, ABS_MT_POSITION_Y, ABS_MT_PRESSURE, ABS_MT_SLOT,
    ABS_MT_TRACKING_ID, BTN_TOUCH, SYN_MT_REPORT, SYN_REPORT, TRACKING_ID_LIFT,
};
use touch_core::{
    ContactSlot, ContactTable, DeviceDescriptor, InputEvent, ProtocolKind, SlotField,
    TouchFeatures,
};

/// A synthetic contact position in device units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticContact {
    pub tracking_id: i32,
    pub x: i32,
    pub y: i32,
    /// `true` on the first write of a touch.
    pub touch_down: bool,
}

/// Protocol-specific rules shared by the reader, the dispatcher and the
/// injector.
pub trait MultitouchProtocol: Send + Sync {
    fn kind(&self) -> ProtocolKind;

    /// Folds one `EV_ABS` report for `slot` into the table.
    fn apply_abs(&self, slot: &mut ContactSlot, code: u16, value: i32);

    /// Writes a synthetic contact into the reserved slot.
    fn write_synthetic(&self, slot: &mut ContactSlot, contact: &SyntheticContact);

    /// Produces the events for one frame.  `button_down` carries the
    /// `BTN_TOUCH` state between frames.  All dirty flags of `frame` are
    /// clear afterwards.
    fn emit_frame(&self, frame: &mut ContactTable, button_down: &mut bool) -> Vec<InputEvent>;
}

/// Builds the protocol implementation for `kind`.
pub fn protocol_for(
    kind: ProtocolKind,
    descriptor: &DeviceDescriptor,
) -> Arc<dyn MultitouchProtocol> {
    match kind {
        ProtocolKind::TypeA => Arc::new(TypeA),
        ProtocolKind::TypeB => Arc::new(TypeB::new(descriptor)),
    }
}

/// Appends the `BTN_TOUCH` edge, if any, for `active` contacts.  Type A
/// closes the last contact with an empty `SYN_MT_REPORT` before the
/// release; slotted streams pass `mt_report = false`.
fn push_button_edge(
    events: &mut Vec<InputEvent>,
    active: usize,
    button_down: &mut bool,
    mt_report: bool,
) {
    if active == 0 && *button_down {
        *button_down = false;
        if mt_report {
            events.push(InputEvent::syn(SYN_MT_REPORT));
        }
        events.push(InputEvent::key(BTN_TOUCH, 0));
    } else if active > 0 && !*button_down {
        *button_down = true;
        events.push(InputEvent::key(BTN_TOUCH, 1));
    }
}

// ── Type A ────────────────────────────────────────────────────────────────────

/// Stateless protocol: positions and tracking id only.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeA;

impl MultitouchProtocol for TypeA {
    fn kind(&self) -> ProtocolKind {
        ProtocolKind::TypeA
    }

    fn apply_abs(&self, slot: &mut ContactSlot, code: u16, value: i32) {
        match code {
            ABS_MT_TRACKING_ID => slot.apply_tracking_id(value, false),
            ABS_MT_POSITION_X => slot.x.set(value),
            ABS_MT_POSITION_Y => slot.y.set(value),
            _ => {}
        }
    }

    fn write_synthetic(&self, slot: &mut ContactSlot, contact: &SyntheticContact) {
        if contact.touch_down || !slot.is_active() {
            slot.apply_tracking_id(contact.tracking_id, false);
        }
        slot.x.set(contact.x);
        slot.y.set(contact.y);
    }

    fn emit_frame(&self, frame: &mut ContactTable, button_down: &mut bool) -> Vec<InputEvent> {
        let mut events = Vec::new();
        let mut reported = 0usize;

        for (index, slot) in frame.iter_mut().enumerate() {
            if slot.is_active() && slot.x.value() > 0 && slot.y.value() > 0 {
                events.push(InputEvent::abs(ABS_MT_POSITION_X, slot.x.value()));
                events.push(InputEvent::abs(ABS_MT_POSITION_Y, slot.y.value()));
                events.push(InputEvent::abs(ABS_MT_TRACKING_ID, index as i32));
                events.push(InputEvent::syn(SYN_MT_REPORT));
                reported += 1;
            }
            slot.clear_dirty();
        }

        push_button_edge(&mut events, reported, button_down, true);
        events.push(InputEvent::syn(SYN_REPORT));
        events
    }
}

// ── Type B ────────────────────────────────────────────────────────────────────

/// Percent of each axis maximum used for a synthetic contact's shape.
const SYNTHETIC_SHAPE: [(SlotField, i64); 6] = [
    (SlotField::TouchMajor, 14),
    (SlotField::TouchMinor, 10),
    (SlotField::WidthMajor, 14),
    (SlotField::WidthMinor, 10),
    (SlotField::Orientation, 28),
    (SlotField::Pressure, 35),
];

/// Slotted protocol with per-field deltas.
#[derive(Debug, Clone)]
pub struct TypeB {
    features: TouchFeatures,
    /// Shape fields written on a synthetic touch-down, limited to the axes
    /// the device reports.
    shape: Vec<(SlotField, i32)>,
}

impl TypeB {
    pub fn new(descriptor: &DeviceDescriptor) -> Self {
        let shape = SYNTHETIC_SHAPE
            .into_iter()
            .filter(|(field, _)| descriptor.capabilities.has_abs(field.code()))
            .map(|(field, percent)| {
                let maximum = i64::from(descriptor.axis_maximum(field.code()));
                // A percentage of an i32 stays within i32.
                (field, (maximum * percent / 100) as i32)
            })
            .collect();
        Self {
            features: descriptor.features,
            shape,
        }
    }

    /// Shape defaults written on a synthetic touch-down.
    pub fn synthetic_shape(&self) -> &[(SlotField, i32)] {
        &self.shape
    }
}

impl MultitouchProtocol for TypeB {
    fn kind(&self) -> ProtocolKind {
        ProtocolKind::TypeB
    }

    fn apply_abs(&self, slot: &mut ContactSlot, code: u16, value: i32) {
        if code == ABS_MT_TRACKING_ID {
            slot.apply_tracking_id(value, true);
            return;
        }
        // Tool type, blob id, distance and tool X/Y have no slot field.
        if let Some(field) = SlotField::from_code(code) {
            if slot.is_active() {
                slot.field_mut(field).set(value);
            }
        }
    }

    fn write_synthetic(&self, slot: &mut ContactSlot, contact: &SyntheticContact) {
        if contact.touch_down || !slot.is_active() {
            slot.apply_tracking_id(contact.tracking_id, true);
            for (field, value) in &self.shape {
                slot.field_mut(*field).set(*value);
            }
        }
        slot.x.set(contact.x);
        slot.y.set(contact.y);
    }

    fn emit_frame(&self, frame: &mut ContactTable, button_down: &mut bool) -> Vec<InputEvent> {
        let mut events = Vec::new();

        for (index, slot) in frame.iter_mut().enumerate() {
            if slot.is_active() {
                if !slot.is_dirty() {
                    continue;
                }
                events.push(InputEvent::abs(ABS_MT_SLOT, index as i32));
                for field in SlotField::EMIT_ORDER {
                    if let Some(value) = slot.field_mut(field).take() {
                        events.push(InputEvent::abs(field.code(), value));
                    }
                }
            } else if slot.tracking_id.is_dirty() {
                events.push(InputEvent::abs(ABS_MT_SLOT, index as i32));
                events.push(InputEvent::abs(ABS_MT_TRACKING_ID, TRACKING_ID_LIFT));
                if self.features.pressure {
                    events.push(InputEvent::abs(ABS_MT_PRESSURE, 0));
                }
                if self.features.orientation {
                    events.push(InputEvent::abs(ABS_MT_ORIENTATION, 0));
                }
                slot.clear_dirty();
            } else {
                slot.clear_dirty();
            }
        }

        push_button_edge(&mut events, frame.active_count(), button_down, false);
        events.push(InputEvent::syn(SYN_REPORT));
        events
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use touch_core::abi::codes::{
        ABS_MT_TOOL_TYPE, ABS_MT_TOUCH_MAJOR, EV_ABS, EV_KEY, EV_SYN,
        INPUT_PROP_DIRECT,
    };
    use touch_core::{AbsInfo, Capabilities, InputId};

    fn descriptor(with_pressure: bool) -> DeviceDescriptor {
        let mut abs = vec![
            ABS_MT_SLOT,
            ABS_MT_TOUCH_MAJOR,
            ABS_MT_POSITION_X,
            ABS_MT_POSITION_Y,
            ABS_MT_TRACKING_ID,
        ];
        let mut axes = BTreeMap::from([
            (ABS_MT_SLOT, AbsInfo::with_range(0, 9)),
            (ABS_MT_TOUCH_MAJOR, AbsInfo::with_range(0, 200)),
            (ABS_MT_POSITION_X, AbsInfo::with_range(0, 1079)),
            (ABS_MT_POSITION_Y, AbsInfo::with_range(0, 2339)),
            (ABS_MT_TRACKING_ID, AbsInfo::with_range(0, 65535)),
        ]);
        if with_pressure {
            abs.push(ABS_MT_PRESSURE);
            axes.insert(ABS_MT_PRESSURE, AbsInfo::with_range(0, 1000));
        }
        let caps = Capabilities {
            event_types: [EV_SYN, EV_KEY, EV_ABS].into_iter().collect(),
            abs: abs.into_iter().collect(),
            keys: [BTN_TOUCH].into_iter().collect(),
            props: [INPUT_PROP_DIRECT].into_iter().collect(),
        };
        DeviceDescriptor::new("/dev/input/event1", "ts", "", 1, InputId::default(), caps, axes)
    }

    fn activate(
        table: &mut ContactTable,
        index: usize,
        protocol: &dyn MultitouchProtocol,
        id: i32,
        x: i32,
        y: i32,
    ) {
        let slot = table.slot_mut(index).unwrap();
        protocol.apply_abs(slot, ABS_MT_TRACKING_ID, id);
        protocol.apply_abs(slot, ABS_MT_POSITION_X, x);
        protocol.apply_abs(slot, ABS_MT_POSITION_Y, y);
    }

    fn abs_events(events: &[InputEvent]) -> Vec<&InputEvent> {
        events.iter().filter(|e| e.is_abs()).collect()
    }

    // ── Type A ────────────────────────────────────────────────────────────────

    #[test]
    fn test_type_a_two_contacts_emit_exact_sequence() {
        // Arrange
        let mut table = ContactTable::new(10);
        activate(&mut table, 0, &TypeA, 5, 100, 200);
        activate(&mut table, 3, &TypeA, 6, 300, 400);
        let mut frame = table.take_frame();
        let mut button_down = false;

        // Act
        let events = TypeA.emit_frame(&mut frame, &mut button_down);

        // Assert
        assert_eq!(
            events,
            vec![
                InputEvent::abs(ABS_MT_POSITION_X, 100),
                InputEvent::abs(ABS_MT_POSITION_Y, 200),
                InputEvent::abs(ABS_MT_TRACKING_ID, 0),
                InputEvent::syn(SYN_MT_REPORT),
                InputEvent::abs(ABS_MT_POSITION_X, 300),
                InputEvent::abs(ABS_MT_POSITION_Y, 400),
                InputEvent::abs(ABS_MT_TRACKING_ID, 3),
                InputEvent::syn(SYN_MT_REPORT),
                InputEvent::key(BTN_TOUCH, 1),
                InputEvent::syn(SYN_REPORT),
            ]
        );
        assert!(button_down);
        assert!(frame.is_clean());
    }

    #[test]
    fn test_type_a_skips_contacts_on_zero_coordinates() {
        let mut table = ContactTable::new(10);
        activate(&mut table, 0, &TypeA, 5, 0, 200);
        let mut frame = table.take_frame();
        let mut button_down = false;

        let events = TypeA.emit_frame(&mut frame, &mut button_down);

        assert_eq!(events, vec![InputEvent::syn(SYN_REPORT)]);
        assert!(!button_down);
    }

    #[test]
    fn test_type_a_release_emits_mt_report_then_button_up() {
        // Arrange
        let mut table = ContactTable::new(10);
        let mut button_down = true;
        let mut frame = table.take_frame();

        // Act
        let events = TypeA.emit_frame(&mut frame, &mut button_down);

        // Assert
        assert_eq!(
            events,
            vec![
                InputEvent::syn(SYN_MT_REPORT),
                InputEvent::key(BTN_TOUCH, 0),
                InputEvent::syn(SYN_REPORT),
            ]
        );
        assert!(!button_down);
    }

    #[test]
    fn test_type_a_idle_dispatch_is_idempotent() {
        let mut table = ContactTable::new(10);
        let mut button_down = false;
        for _ in 0..2 {
            let mut frame = table.take_frame();
            let events = TypeA.emit_frame(&mut frame, &mut button_down);
            assert_eq!(events, vec![InputEvent::syn(SYN_REPORT)]);
        }
    }

    #[test]
    fn test_type_a_stores_positions_on_inactive_slot() {
        let mut slot = ContactSlot::default();
        TypeA.apply_abs(&mut slot, ABS_MT_POSITION_X, 42);
        assert_eq!(slot.x.value(), 42);
    }

    // ── Type B: reader rules ──────────────────────────────────────────────────

    #[test]
    fn test_type_b_ignores_fields_of_inactive_slot() {
        let protocol = TypeB::new(&descriptor(true));
        let mut slot = ContactSlot::default();

        protocol.apply_abs(&mut slot, ABS_MT_POSITION_X, 42);
        protocol.apply_abs(&mut slot, ABS_MT_PRESSURE, 10);

        assert_eq!(slot.x.value(), -1);
        assert!(!slot.is_dirty());
    }

    #[test]
    fn test_type_b_tracking_id_always_marks_dirty() {
        // Arrange: slot already active with id 7, then re-reported with 7
        let protocol = TypeB::new(&descriptor(true));
        let mut slot = ContactSlot::default();
        protocol.apply_abs(&mut slot, ABS_MT_TRACKING_ID, 7);
        slot.clear_dirty();

        // Act
        protocol.apply_abs(&mut slot, ABS_MT_TRACKING_ID, 7);

        // Assert
        assert!(slot.tracking_id.is_dirty());
    }

    #[test]
    fn test_type_b_unstored_codes_are_ignored() {
        let protocol = TypeB::new(&descriptor(true));
        let mut slot = ContactSlot::default();
        protocol.apply_abs(&mut slot, ABS_MT_TRACKING_ID, 7);
        slot.clear_dirty();

        protocol.apply_abs(&mut slot, ABS_MT_TOOL_TYPE, 1);

        assert!(!slot.is_dirty());
    }

    // ── Type B: emission ──────────────────────────────────────────────────────

    #[test]
    fn test_type_b_touch_down_emits_slot_then_dirty_fields_in_order() {
        // Arrange
        let protocol = TypeB::new(&descriptor(true));
        let mut table = ContactTable::new(10);
        let slot = table.slot_mut(2).unwrap();
        protocol.apply_abs(slot, ABS_MT_TRACKING_ID, 40);
        protocol.apply_abs(slot, ABS_MT_PRESSURE, 55);
        protocol.apply_abs(slot, ABS_MT_POSITION_Y, 700);
        protocol.apply_abs(slot, ABS_MT_POSITION_X, 600);
        let mut frame = table.take_frame();
        let mut button_down = false;

        // Act
        let events = protocol.emit_frame(&mut frame, &mut button_down);

        // Assert
        assert_eq!(
            events,
            vec![
                InputEvent::abs(ABS_MT_SLOT, 2),
                InputEvent::abs(ABS_MT_TRACKING_ID, 40),
                InputEvent::abs(ABS_MT_POSITION_X, 600),
                InputEvent::abs(ABS_MT_POSITION_Y, 700),
                InputEvent::abs(ABS_MT_PRESSURE, 55),
                InputEvent::key(BTN_TOUCH, 1),
                InputEvent::syn(SYN_REPORT),
            ]
        );
    }

    #[test]
    fn test_type_b_lift_emits_slot_tracking_and_pressure_reset() {
        // Arrange: slot 4 active with tracking id 7, then lifted
        let protocol = TypeB::new(&descriptor(true));
        let mut table = ContactTable::new(10);
        activate(&mut table, 4, &protocol, 7, 10, 20);
        let mut button_down = false;
        let mut first = table.take_frame();
        protocol.emit_frame(&mut first, &mut button_down);
        protocol.apply_abs(table.slot_mut(4).unwrap(), ABS_MT_TRACKING_ID, -1);
        let mut frame = table.take_frame();

        // Act
        let events = protocol.emit_frame(&mut frame, &mut button_down);

        // Assert
        assert_eq!(
            events,
            vec![
                InputEvent::abs(ABS_MT_SLOT, 4),
                InputEvent::abs(ABS_MT_TRACKING_ID, -1),
                InputEvent::abs(ABS_MT_PRESSURE, 0),
                InputEvent::key(BTN_TOUCH, 0),
                InputEvent::syn(SYN_REPORT),
            ]
        );
        assert!(frame.is_clean());
        assert!(table.is_clean());
        assert_eq!(table.slot(4).unwrap().x.value(), -1);
    }

    #[test]
    fn test_type_b_lift_without_pressure_capability_skips_reset() {
        let protocol = TypeB::new(&descriptor(false));
        let mut table = ContactTable::new(10);
        table.slot_mut(1).unwrap().lift();
        let mut frame = table.take_frame();
        let mut button_down = false;

        let events = protocol.emit_frame(&mut frame, &mut button_down);

        assert_eq!(
            abs_events(&events),
            vec![
                &InputEvent::abs(ABS_MT_SLOT, 1),
                &InputEvent::abs(ABS_MT_TRACKING_ID, -1)
            ]
        );
    }

    #[test]
    fn test_type_b_second_dispatch_without_mutation_emits_only_syn_report() {
        // Arrange
        let protocol = TypeB::new(&descriptor(true));
        let mut table = ContactTable::new(10);
        activate(&mut table, 0, &protocol, 1, 10, 10);
        let mut button_down = false;
        let mut first = table.take_frame();
        protocol.emit_frame(&mut first, &mut button_down);

        // Act
        let mut second = table.take_frame();
        let events = protocol.emit_frame(&mut second, &mut button_down);

        // Assert
        assert_eq!(events, vec![InputEvent::syn(SYN_REPORT)]);
    }

    // ── Synthetic contacts ────────────────────────────────────────────────────

    #[test]
    fn test_type_b_synthetic_shape_uses_only_present_axes() {
        // Arrange / Act
        let protocol = TypeB::new(&descriptor(true));

        // Assert: touch major 14% of 200, pressure 35% of 1000; nothing else
        assert_eq!(
            protocol.synthetic_shape(),
            &[(SlotField::TouchMajor, 28), (SlotField::Pressure, 350)]
        );
    }

    #[test]
    fn test_type_b_synthetic_touch_down_then_move_only_dirties_position() {
        // Arrange
        let protocol = TypeB::new(&descriptor(true));
        let mut slot = ContactSlot::default();
        let mut contact = SyntheticContact {
            tracking_id: 65_300,
            x: 100,
            y: 100,
            touch_down: true,
        };
        protocol.write_synthetic(&mut slot, &contact);
        slot.clear_dirty();

        // Act
        contact.touch_down = false;
        contact.x = 110;
        protocol.write_synthetic(&mut slot, &contact);

        // Assert
        assert!(slot.x.is_dirty());
        assert!(slot.y.is_dirty());
        assert!(!slot.tracking_id.is_dirty());
        assert!(!slot.pressure.is_dirty());
        assert!(!slot.touch_minor.is_dirty());
        assert_eq!(slot.tracking_id.value(), 65_300);
        assert!(slot.is_active());
    }

    #[test]
    fn test_protocol_for_selects_implementation() {
        let desc = descriptor(false);
        assert_eq!(protocol_for(ProtocolKind::TypeA, &desc).kind(), ProtocolKind::TypeA);
        assert_eq!(protocol_for(ProtocolKind::TypeB, &desc).kind(), ProtocolKind::TypeB);
    }
}
