//! Event type and code constants from `linux/input-event-codes.h`.
//!
//! Only the subset this workspace reads or writes is listed.  The `*_CNT`
//! constants size the fixed capability bitmaps in [`crate::abi::bitmap`].
//!
//! # Event types vs. event codes (for beginners)
//!
//! Every kernel input event carries a `(type, code, value)` triple.  The
//! *type* names the family (`EV_SYN`, `EV_KEY`, `EV_ABS`, …) and the *code*
//! names the member inside that family.  The same numeric code means different
//! things in different families: code `0x35` is `ABS_MT_POSITION_X` under
//! `EV_ABS` but an ordinary keyboard key under `EV_KEY`.

// ── Event types ───────────────────────────────────────────────────────────────

/// Synchronization markers (frame boundaries).
pub const EV_SYN: u16 = 0x00;
/// Keys and buttons.
pub const EV_KEY: u16 = 0x01;
/// Absolute axes.
pub const EV_ABS: u16 = 0x03;
/// Force feedback.
pub const EV_FF: u16 = 0x15;
pub const EV_MAX: u16 = 0x1f;
pub const EV_CNT: usize = EV_MAX as usize + 1;

// ── EV_SYN codes ──────────────────────────────────────────────────────────────

/// "All fields for this instant have been delivered."
pub const SYN_REPORT: u16 = 0;
/// Type A contact separator.
pub const SYN_MT_REPORT: u16 = 2;
/// The kernel event buffer overflowed and events were lost.
pub const SYN_DROPPED: u16 = 3;

// ── EV_KEY codes ──────────────────────────────────────────────────────────────

pub const BTN_TOUCH: u16 = 0x14a;
pub const KEY_MAX: u16 = 0x2ff;
pub const KEY_CNT: usize = KEY_MAX as usize + 1;

// ── EV_ABS codes ──────────────────────────────────────────────────────────────

pub const ABS_MT_SLOT: u16 = 0x2f;
pub const ABS_MT_TOUCH_MAJOR: u16 = 0x30;
pub const ABS_MT_TOUCH_MINOR: u16 = 0x31;
pub const ABS_MT_WIDTH_MAJOR: u16 = 0x32;
pub const ABS_MT_WIDTH_MINOR: u16 = 0x33;
pub const ABS_MT_ORIENTATION: u16 = 0x34;
pub const ABS_MT_POSITION_X: u16 = 0x35;
pub const ABS_MT_POSITION_Y: u16 = 0x36;
pub const ABS_MT_TOOL_TYPE: u16 = 0x37;
pub const ABS_MT_BLOB_ID: u16 = 0x38;
pub const ABS_MT_TRACKING_ID: u16 = 0x39;
pub const ABS_MT_PRESSURE: u16 = 0x3a;
pub const ABS_MT_DISTANCE: u16 = 0x3b;
pub const ABS_MT_TOOL_X: u16 = 0x3c;
pub const ABS_MT_TOOL_Y: u16 = 0x3d;
pub const ABS_MAX: u16 = 0x3f;
pub const ABS_CNT: usize = ABS_MAX as usize + 1;

// ── Input properties ──────────────────────────────────────────────────────────

/// The device is a touch screen (contacts map directly to display positions).
pub const INPUT_PROP_DIRECT: u16 = 0x01;
pub const INPUT_PROP_MAX: u16 = 0x1f;
pub const INPUT_PROP_CNT: usize = INPUT_PROP_MAX as usize + 1;

// ── Misc ──────────────────────────────────────────────────────────────────────

/// Fixed length of the name buffer in the uinput device record and of the
/// buffers used for `EVIOCGNAME` / `EVIOCGPHYS`.
pub const UINPUT_MAX_NAME_SIZE: usize = 80;

/// Tracking-id value announcing that a contact has lifted.
pub const TRACKING_ID_LIFT: i32 = -1;
