//! Kernel device interface: the numbers and byte layouts shared with the
//! Linux evdev and uinput drivers.
//!
//! # Why a separate ABI module? (for beginners)
//!
//! Talking to `/dev/input/event*` and `/dev/uinput` means exchanging raw
//! bytes with the kernel: fixed-size records and 32-bit `ioctl` request
//! numbers.  Getting one offset or bit position wrong silently corrupts every
//! event.  Keeping all of that in one pure module means it can be unit-tested
//! on any machine, without a touch screen or root privileges.
//!
//! - **`codes`** – event type / code constants.
//! - **`ioctl`** – request-number encoding (`EVIOCG*`, `UI_*`).
//! - **`bitmap`** – fixed-size capability bitmaps.
//! - **`codec`** – little-endian wire records (`input_event`, `input_absinfo`,
//!   `input_id`, `uinput_user_dev`).

pub mod bitmap;
pub mod codec;
pub mod codes;
pub mod ioctl;

pub use bitmap::{bitmap_len, AbsBits, Bitmap, EventTypeBits, KeyBits, PropBits};
pub use codec::{AbiError, AbsInfo, InputEvent, InputId, UinputUserDev};
