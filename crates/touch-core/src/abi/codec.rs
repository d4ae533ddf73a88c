//! Binary layouts of the kernel input records and their little-endian codec.
//!
//! Record layouts (64-bit kernel ABI, natural alignment, no extra padding):
//! ```text
//! input_event      [tv_sec:8][tv_usec:8][type:2][code:2][value:4]            = 24 bytes
//! input_absinfo    [value:4][min:4][max:4][fuzz:4][flat:4][resolution:4]     = 24 bytes
//! input_id         [bustype:2][vendor:2][product:2][version:2]               =  8 bytes
//! uinput_user_dev  [name:80][input_id:8][ff_effects_max:4]
//!                  [absmax:4*64][absmin:4*64][absfuzz:4*64][absflat:4*64]    = 1116 bytes
//! ```
//! All multi-byte integers are little-endian.
//!
//! Records are encoded field by field rather than transmuted from `#[repr(C)]`
//! structs, so the byte layout is explicit and testable on any host.

use thiserror::Error;

use crate::abi::codes::{ABS_CNT, EV_ABS, EV_KEY, EV_SYN, UINPUT_MAX_NAME_SIZE};

/// Size of an encoded [`InputEvent`].
pub const INPUT_EVENT_SIZE: usize = 24;
/// Size of an encoded [`AbsInfo`].
pub const ABS_INFO_SIZE: usize = 24;
/// Size of an encoded [`InputId`].
pub const INPUT_ID_SIZE: usize = 8;
/// Size of an encoded [`UinputUserDev`].
pub const UINPUT_USER_DEV_SIZE: usize =
    UINPUT_MAX_NAME_SIZE + INPUT_ID_SIZE + 4 + 4 * 4 * ABS_CNT;

/// Errors raised while decoding a kernel record.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AbiError {
    /// The buffer is shorter than the record.
    #[error("insufficient data for {record}: need {needed} bytes, got {available}")]
    InsufficientData {
        record: &'static str,
        needed: usize,
        available: usize,
    },
}

// ── input_event ───────────────────────────────────────────────────────────────

/// One `struct input_event`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputEvent {
    pub time_sec: i64,
    pub time_usec: i64,
    pub event_type: u16,
    pub code: u16,
    pub value: i32,
}

impl InputEvent {
    /// Creates an event with a zero timestamp; the kernel stamps events
    /// written to uinput itself.
    pub const fn new(event_type: u16, code: u16, value: i32) -> Self {
        Self {
            time_sec: 0,
            time_usec: 0,
            event_type,
            code,
            value,
        }
    }

    pub const fn abs(code: u16, value: i32) -> Self {
        Self::new(EV_ABS, code, value)
    }

    pub const fn key(code: u16, value: i32) -> Self {
        Self::new(EV_KEY, code, value)
    }

    pub const fn syn(code: u16) -> Self {
        Self::new(EV_SYN, code, 0)
    }

    /// Returns `true` for `EV_ABS` events.
    pub fn is_abs(&self) -> bool {
        self.event_type == EV_ABS
    }

    pub fn encode(&self) -> [u8; INPUT_EVENT_SIZE] {
        let mut buf = [0u8; INPUT_EVENT_SIZE];
        buf[0..8].copy_from_slice(&self.time_sec.to_le_bytes());
        buf[8..16].copy_from_slice(&self.time_usec.to_le_bytes());
        buf[16..18].copy_from_slice(&self.event_type.to_le_bytes());
        buf[18..20].copy_from_slice(&self.code.to_le_bytes());
        buf[20..24].copy_from_slice(&self.value.to_le_bytes());
        buf
    }

    /// Decodes one event from the start of `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`AbiError::InsufficientData`] if fewer than 24 bytes are given.
    pub fn decode(bytes: &[u8]) -> Result<Self, AbiError> {
        require_len(bytes, INPUT_EVENT_SIZE, "input_event")?;
        Ok(Self {
            time_sec: read_i64(bytes, 0),
            time_usec: read_i64(bytes, 8),
            event_type: read_u16(bytes, 16),
            code: read_u16(bytes, 18),
            value: read_i32(bytes, 20),
        })
    }
}

// ── input_absinfo ─────────────────────────────────────────────────────────────

/// Calibration of one absolute axis (`struct input_absinfo`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AbsInfo {
    pub value: i32,
    pub minimum: i32,
    pub maximum: i32,
    pub fuzz: i32,
    pub flat: i32,
    pub resolution: i32,
}

impl AbsInfo {
    /// An axis spanning `[minimum, maximum]` with no fuzz, flat or resolution.
    pub const fn with_range(minimum: i32, maximum: i32) -> Self {
        Self {
            value: 0,
            minimum,
            maximum,
            fuzz: 0,
            flat: 0,
            resolution: 0,
        }
    }

    /// Number of distinct values the axis can report (`max - min + 1`).
    pub fn range(&self) -> i64 {
        i64::from(self.maximum) - i64::from(self.minimum) + 1
    }

    pub fn encode(&self) -> [u8; ABS_INFO_SIZE] {
        let mut buf = [0u8; ABS_INFO_SIZE];
        for (i, field) in [
            self.value,
            self.minimum,
            self.maximum,
            self.fuzz,
            self.flat,
            self.resolution,
        ]
        .into_iter()
        .enumerate()
        {
            buf[i * 4..i * 4 + 4].copy_from_slice(&field.to_le_bytes());
        }
        buf
    }

    /// # Errors
    ///
    /// Returns [`AbiError::InsufficientData`] if fewer than 24 bytes are given.
    pub fn decode(bytes: &[u8]) -> Result<Self, AbiError> {
        require_len(bytes, ABS_INFO_SIZE, "input_absinfo")?;
        Ok(Self {
            value: read_i32(bytes, 0),
            minimum: read_i32(bytes, 4),
            maximum: read_i32(bytes, 8),
            fuzz: read_i32(bytes, 12),
            flat: read_i32(bytes, 16),
            resolution: read_i32(bytes, 20),
        })
    }
}

// ── input_id ──────────────────────────────────────────────────────────────────

/// Device identity (`struct input_id`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputId {
    pub bustype: u16,
    pub vendor: u16,
    pub product: u16,
    pub version: u16,
}

impl InputId {
    pub fn encode(&self) -> [u8; INPUT_ID_SIZE] {
        let mut buf = [0u8; INPUT_ID_SIZE];
        buf[0..2].copy_from_slice(&self.bustype.to_le_bytes());
        buf[2..4].copy_from_slice(&self.vendor.to_le_bytes());
        buf[4..6].copy_from_slice(&self.product.to_le_bytes());
        buf[6..8].copy_from_slice(&self.version.to_le_bytes());
        buf
    }

    /// # Errors
    ///
    /// Returns [`AbiError::InsufficientData`] if fewer than 8 bytes are given.
    pub fn decode(bytes: &[u8]) -> Result<Self, AbiError> {
        require_len(bytes, INPUT_ID_SIZE, "input_id")?;
        Ok(Self {
            bustype: read_u16(bytes, 0),
            vendor: read_u16(bytes, 2),
            product: read_u16(bytes, 4),
            version: read_u16(bytes, 6),
        })
    }
}

// ── uinput_user_dev ───────────────────────────────────────────────────────────

/// The legacy uinput setup record written to `/dev/uinput` before
/// `UI_DEV_CREATE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UinputUserDev {
    pub name: [u8; UINPUT_MAX_NAME_SIZE],
    pub id: InputId,
    pub ff_effects_max: u32,
    pub absmax: [i32; ABS_CNT],
    pub absmin: [i32; ABS_CNT],
    pub absfuzz: [i32; ABS_CNT],
    pub absflat: [i32; ABS_CNT],
}

impl Default for UinputUserDev {
    fn default() -> Self {
        Self {
            name: [0u8; UINPUT_MAX_NAME_SIZE],
            id: InputId::default(),
            ff_effects_max: 0,
            absmax: [0; ABS_CNT],
            absmin: [0; ABS_CNT],
            absfuzz: [0; ABS_CNT],
            absflat: [0; ABS_CNT],
        }
    }
}

impl UinputUserDev {
    /// Copies `name` into the fixed buffer, truncating so that at least one
    /// trailing NUL remains.
    pub fn set_name(&mut self, name: &str) {
        self.name = [0u8; UINPUT_MAX_NAME_SIZE];
        let bytes = name.as_bytes();
        let len = bytes.len().min(UINPUT_MAX_NAME_SIZE - 1);
        self.name[..len].copy_from_slice(&bytes[..len]);
    }

    /// Copies the calibration of `axis` into the four per-axis arrays.
    /// Axes outside `0..ABS_CNT` are ignored.
    pub fn set_axis(&mut self, axis: u16, info: &AbsInfo) {
        let axis = axis as usize;
        if axis >= ABS_CNT {
            return;
        }
        self.absmax[axis] = info.maximum;
        self.absmin[axis] = info.minimum;
        self.absfuzz[axis] = info.fuzz;
        self.absflat[axis] = info.flat;
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(UINPUT_USER_DEV_SIZE);
        buf.extend_from_slice(&self.name);
        buf.extend_from_slice(&self.id.encode());
        buf.extend_from_slice(&self.ff_effects_max.to_le_bytes());
        for table in [&self.absmax, &self.absmin, &self.absfuzz, &self.absflat] {
            for value in table.iter() {
                buf.extend_from_slice(&value.to_le_bytes());
            }
        }
        buf
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Interprets a NUL-terminated kernel string buffer.
pub fn c_string_lossy(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

fn require_len(bytes: &[u8], needed: usize, record: &'static str) -> Result<(), AbiError> {
    if bytes.len() < needed {
        return Err(AbiError::InsufficientData {
            record,
            needed,
            available: bytes.len(),
        });
    }
    Ok(())
}

fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn read_i32(bytes: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

fn read_i64(bytes: &[u8], offset: usize) -> i64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[offset..offset + 8]);
    i64::from_le_bytes(raw)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
