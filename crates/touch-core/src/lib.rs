//! # touch-core
//!
//! Shared library for touch-relay containing the kernel input ABI (event
//! codes, `ioctl` encoding, wire records), the device descriptor, the contact
//! table and the synthetic-gesture coordinate mapping.
//!
//! It has zero dependencies on OS APIs: nothing here opens a device node.
//!
//! # Architecture overview (for beginners)
//!
//! touch-relay sits between a physical touch screen and the rest of a Linux
//! system.  It grabs the screen's evdev node, re-emits every touch on a
//! virtual uinput device, and can inject its own taps and swipes on that same
//! virtual device.
//!
//! This crate is the pure foundation:
//!
//! - **`abi`** – How bytes travel to and from the kernel: 24-byte
//!   `input_event` records, `ioctl` request numbers and capability bitmaps.
//!
//! - **`domain`** – What the relay reasons about: which nodes qualify as
//!   touch screens, the per-slot contact table with dirty flags, and the
//!   display-to-device coordinate mapping used by synthetic gestures.

pub mod abi;
pub mod domain;

// Re-export the most-used types at the crate root so callers can write
// `touch_core::ContactTable` instead of `touch_core::domain::contact::ContactTable`.
pub use abi::codec::{AbiError, AbsInfo, InputEvent, InputId, UinputUserDev};
pub use domain::contact::{ContactSlot, ContactTable, Field, SlotField, RESERVED_SLOT};
pub use domain::device::{
    Capabilities, DeviceDescriptor, DeviceVariant, ProtocolKind, TouchFeatures,
};
pub use domain::mapping::{swipe_path, CoordinateMapper, DisplaySize, MappingError, SwipeParams};
pub use domain::tracking::TrackingIdAllocator;
