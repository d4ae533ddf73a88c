//! Control-call (`ioctl`) command encoding for evdev and uinput nodes.
//!
//! Linux packs four fields into the 32-bit request number:
//!
//! ```text
//!  31 30 29                16 15          8 7           0
//! [ dir ][      size (14)     ][  type (8)  ][   nr (8)   ]
//! ```
//!
//! `dir` is [`IOC_NONE`], [`IOC_WRITE`] or [`IOC_READ`] as seen from user
//! space, `type` is the subsystem tag (`'E'` for evdev, `'U'` for uinput),
//! `nr` is the command number and `size` the payload size in bytes.
//!
//! Everything here is a `const fn` so request numbers are computed at
//! compile time and can be checked against the values in the kernel headers.

use crate::abi::codes::UINPUT_MAX_NAME_SIZE;

const IOC_NRBITS: u32 = 8;
const IOC_TYPEBITS: u32 = 8;
const IOC_SIZEBITS: u32 = 14;
const IOC_NRSHIFT: u32 = 0;
const IOC_TYPESHIFT: u32 = IOC_NRSHIFT + IOC_NRBITS;
const IOC_SIZESHIFT: u32 = IOC_TYPESHIFT + IOC_TYPEBITS;
const IOC_DIRSHIFT: u32 = IOC_SIZESHIFT + IOC_SIZEBITS;
const IOC_SIZEMASK: u32 = (1 << IOC_SIZEBITS) - 1;

pub const IOC_NONE: u32 = 0;
pub const IOC_WRITE: u32 = 1;
pub const IOC_READ: u32 = 2;

/// evdev subsystem tag.
pub const EVDEV_TYPE: u8 = b'E';
/// uinput subsystem tag.
pub const UINPUT_TYPE: u8 = b'U';

/// Size of `int` in the kernel ABI.
const INT_SIZE: usize = 4;
/// Size of `struct input_id`.
const INPUT_ID_SIZE: usize = 8;
/// Size of `struct input_absinfo`.
const ABSINFO_SIZE: usize = 24;
/// Size of a user-space pointer, used by `UI_SET_PHYS`.
const POINTER_SIZE: usize = std::mem::size_of::<usize>();

/// Encodes a request number.  Sizes wider than 14 bits are truncated the
/// same way the C macro truncates them.
pub const fn ioc(dir: u32, kind: u8, nr: u8, size: usize) -> u32 {
    (dir << IOC_DIRSHIFT)
        | (((size as u32) & IOC_SIZEMASK) << IOC_SIZESHIFT)
        | ((kind as u32) << IOC_TYPESHIFT)
        | ((nr as u32) << IOC_NRSHIFT)
}

pub const fn io(kind: u8, nr: u8) -> u32 {
    ioc(IOC_NONE, kind, nr, 0)
}

pub const fn ior(kind: u8, nr: u8, size: usize) -> u32 {
    ioc(IOC_READ, kind, nr, size)
}

pub const fn iow(kind: u8, nr: u8, size: usize) -> u32 {
    ioc(IOC_WRITE, kind, nr, size)
}

// ── evdev requests ────────────────────────────────────────────────────────────

/// Reads the driver version into an `int`.
pub const EVIOCGVERSION: u32 = ior(EVDEV_TYPE, 0x01, INT_SIZE);
/// Reads the device identity into a `struct input_id`.
pub const EVIOCGID: u32 = ior(EVDEV_TYPE, 0x02, INPUT_ID_SIZE);
/// Grabs (`1`) or releases (`0`) exclusive access.
pub const EVIOCGRAB: u32 = iow(EVDEV_TYPE, 0x90, INT_SIZE);

/// Reads the device name into a buffer of `len` bytes.
pub const fn eviocgname(len: usize) -> u32 {
    ior(EVDEV_TYPE, 0x06, len)
}

/// Reads the physical location string into a buffer of `len` bytes.
pub const fn eviocgphys(len: usize) -> u32 {
    ior(EVDEV_TYPE, 0x07, len)
}

/// Reads the property bitmap into a buffer of `len` bytes.
pub const fn eviocgprop(len: usize) -> u32 {
    ior(EVDEV_TYPE, 0x09, len)
}

/// Reads the capability bitmap for event type `ev` (`0` = the event-type
/// bitmap itself) into a buffer of `len` bytes.
pub const fn eviocgbit(ev: u16, len: usize) -> u32 {
    ior(EVDEV_TYPE, 0x20 + ev as u8, len)
}

/// Reads the calibration of absolute axis `axis` into a `struct input_absinfo`.
pub const fn eviocgabs(axis: u16) -> u32 {
    ior(EVDEV_TYPE, 0x40 + axis as u8, ABSINFO_SIZE)
}

/// Default `EVIOCGNAME` request for the fixed 80-byte buffer.
pub const EVIOCGNAME: u32 = eviocgname(UINPUT_MAX_NAME_SIZE);
/// Default `EVIOCGPHYS` request for the fixed 80-byte buffer.
pub const EVIOCGPHYS: u32 = eviocgphys(UINPUT_MAX_NAME_SIZE);

// ── uinput requests ───────────────────────────────────────────────────────────

pub const UI_DEV_CREATE: u32 = io(UINPUT_TYPE, 1);
pub const UI_DEV_DESTROY: u32 = io(UINPUT_TYPE, 2);
pub const UI_SET_EVBIT: u32 = iow(UINPUT_TYPE, 100, INT_SIZE);
pub const UI_SET_KEYBIT: u32 = iow(UINPUT_TYPE, 101, INT_SIZE);
pub const UI_SET_ABSBIT: u32 = iow(UINPUT_TYPE, 103, INT_SIZE);
pub const UI_SET_PHYS: u32 = iow(UINPUT_TYPE, 108, POINTER_SIZE);
pub const UI_SET_PROPBIT: u32 = iow(UINPUT_TYPE, 110, INT_SIZE);

// ── Tests ─────────────────────────────────────────────────────────────────────
