//! Device descriptor: everything probed from a source touch screen.
//!
//! # What does "probing" a device mean? (for beginners)
//!
//! An evdev node does not tell you up front what it is.  User space asks the
//! kernel a series of questions through `ioctl` calls: *which event types do
//! you emit?*, *which absolute axes?*, *which keys?*, *which properties?*,
//! and, for every axis, *what range do you report?*.  The answers come back as
//! bitmaps and [`AbsInfo`] records.
//!
//! This module turns those answers into two pure values:
//!
//! - [`Capabilities`] – the four raw bitmaps plus the qualification rule
//!   ([`Capabilities::is_touch_source`]).
//! - [`DeviceDescriptor`] – the immutable description a relay session is
//!   built from: identity, slot count, per-axis calibration and the derived
//!   [`TouchFeatures`].

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::abi::bitmap::{AbsBits, EventTypeBits, KeyBits, PropBits};
use crate::abi::codec::{AbsInfo, InputId};
use crate::abi::codes::{
    ABS_MT_ORIENTATION, ABS_MT_POSITION_X, ABS_MT_POSITION_Y, ABS_MT_PRESSURE, ABS_MT_SLOT,
    ABS_MT_TOUCH_MAJOR, ABS_MT_TOUCH_MINOR, ABS_MT_TRACKING_ID, ABS_MT_WIDTH_MAJOR,
    ABS_MT_WIDTH_MINOR, BTN_TOUCH, EV_FF, INPUT_PROP_DIRECT,
};

/// Range substituted when a device reports `min == max` for the tracking-id
/// axis.
pub const DEFAULT_TRACKING_RANGE: (i32, i32) = (-1, 0xFFFF);

// ── Protocol selection ────────────────────────────────────────────────────────

/// Multitouch protocol spoken on the virtual device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProtocolKind {
    /// Anonymous contacts separated by `SYN_MT_REPORT`.
    TypeA,
    /// Slotted contacts with per-field deltas.
    #[default]
    TypeB,
}

impl ProtocolKind {
    /// The virtual-device capability set this protocol needs.
    pub fn device_variant(self) -> DeviceVariant {
        match self {
            Self::TypeA => DeviceVariant::Restricted,
            Self::TypeB => DeviceVariant::Full,
        }
    }
}

impl std::fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TypeA => f.write_str("type-a"),
            Self::TypeB => f.write_str("type-b"),
        }
    }
}

/// How much of the source's capability set the virtual device mirrors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceVariant {
    /// Every key, axis and property bit of the source.
    Full,
    /// Keys and properties, but only the position and tracking-id axes.
    Restricted,
}

impl DeviceVariant {
    /// Returns `true` if the virtual device should declare axis `code`.
    pub fn mirrors_axis(self, code: u16) -> bool {
        match self {
            Self::Full => true,
            Self::Restricted => matches!(
                code,
                ABS_MT_POSITION_X | ABS_MT_POSITION_Y | ABS_MT_TRACKING_ID
            ),
        }
    }
}

// ── Capabilities ──────────────────────────────────────────────────────────────

/// The four capability bitmaps read from a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub event_types: EventTypeBits,
    pub abs: AbsBits,
    pub keys: KeyBits,
    pub props: PropBits,
}

impl Capabilities {
    pub fn has_abs(&self, code: u16) -> bool {
        self.abs.is_set(code as usize)
    }

    pub fn has_key(&self, code: u16) -> bool {
        self.keys.is_set(code as usize)
    }

    pub fn has_prop(&self, prop: u16) -> bool {
        self.props.is_set(prop as usize)
    }

    pub fn has_event_type(&self, ev: u16) -> bool {
        self.event_types.is_set(ev as usize)
    }

    /// Qualification rule for a slotted direct-touch screen.
    ///
    /// Requires the slot, tracking-id and X/Y axes, `INPUT_PROP_DIRECT` and
    /// `BTN_TOUCH`.  Nodes that also report axis `ABS_MT_SLOT - 1` are
    /// rejected: some non-touch devices set every bit in the abs bitmap up to
    /// an arbitrary index and only look slotted by accident.
    pub fn is_touch_source(&self) -> bool {
        self.has_abs(ABS_MT_SLOT)
            && self.has_abs(ABS_MT_TRACKING_ID)
            && self.has_abs(ABS_MT_POSITION_X)
            && self.has_abs(ABS_MT_POSITION_Y)
            && self.has_prop(INPUT_PROP_DIRECT)
            && self.has_key(BTN_TOUCH)
            && !self.has_abs(ABS_MT_SLOT - 1)
    }
}

/// Boolean capability flags derived from [`Capabilities`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TouchFeatures {
    pub touch_major: bool,
    pub touch_minor: bool,
    pub width_major: bool,
    pub width_minor: bool,
    pub orientation: bool,
    pub pressure: bool,
    pub direct: bool,
    pub btn_touch: bool,
    pub force_feedback: bool,
}

impl From<&Capabilities> for TouchFeatures {
    fn from(caps: &Capabilities) -> Self {
        Self {
            touch_major: caps.has_abs(ABS_MT_TOUCH_MAJOR),
            touch_minor: caps.has_abs(ABS_MT_TOUCH_MINOR),
            width_major: caps.has_abs(ABS_MT_WIDTH_MAJOR),
            width_minor: caps.has_abs(ABS_MT_WIDTH_MINOR),
            orientation: caps.has_abs(ABS_MT_ORIENTATION),
            pressure: caps.has_abs(ABS_MT_PRESSURE),
            direct: caps.has_prop(INPUT_PROP_DIRECT),
            btn_touch: caps.has_key(BTN_TOUCH),
            force_feedback: caps.has_event_type(EV_FF),
        }
    }
}

// ── Descriptor ────────────────────────────────────────────────────────────────

/// Immutable description of a qualifying source device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub path: PathBuf,
    pub name: String,
    /// Physical location string (`EVIOCGPHYS`), possibly empty.
    pub phys: String,
    pub driver_version: i32,
    pub id: InputId,
    pub capabilities: Capabilities,
    pub features: TouchFeatures,
    slots: usize,
    axes: BTreeMap<u16, AbsInfo>,
}

impl DeviceDescriptor {
    /// Assembles a descriptor from probed values.
    ///
    /// `axes` holds the calibration of every axis set in the abs bitmap.  The
    /// slot count is derived from the `ABS_MT_SLOT` maximum and a degenerate
    /// tracking-id range is widened to [`DEFAULT_TRACKING_RANGE`].
    pub fn new(
        path: impl Into<PathBuf>,
        name: impl Into<String>,
        phys: impl Into<String>,
        driver_version: i32,
        id: InputId,
        capabilities: Capabilities,
        mut axes: BTreeMap<u16, AbsInfo>,
    ) -> Self {
        if let Some(tracking) = axes.get_mut(&ABS_MT_TRACKING_ID) {
            if tracking.minimum == tracking.maximum {
                tracing::debug!(
                    value = tracking.minimum,
                    "degenerate tracking-id range, using default"
                );
            }
            *tracking = normalize_tracking_range(*tracking);
        }
        let slots = axes
            .get(&ABS_MT_SLOT)
            .and_then(|info| usize::try_from(i64::from(info.maximum) + 1).ok())
            .unwrap_or(0);

        Self {
            path: path.into(),
            name: name.into(),
            phys: phys.into(),
            driver_version,
            id,
            features: TouchFeatures::from(&capabilities),
            capabilities,
            slots,
            axes,
        }
    }

    /// Number of contact slots (`ABS_MT_SLOT` maximum + 1).
    pub fn slot_count(&self) -> usize {
        self.slots
    }

    /// Calibration of `axis`, if the device reports it.
    pub fn axis(&self, axis: u16) -> Option<&AbsInfo> {
        self.axes.get(&axis)
    }

    /// All reported axes in ascending code order.
    pub fn axes(&self) -> impl Iterator<Item = (u16, &AbsInfo)> + '_ {
        self.axes.iter().map(|(code, info)| (*code, info))
    }

    /// Maximum of `axis`, or `0` if the device lacks it.
    pub fn axis_maximum(&self, axis: u16) -> i32 {
        self.axes.get(&axis).map_or(0, |info| info.maximum)
    }

    /// X position calibration; zero range if missing.
    pub fn x_axis(&self) -> AbsInfo {
        self.axes
            .get(&ABS_MT_POSITION_X)
            .copied()
            .unwrap_or_default()
    }

    /// Y position calibration; zero range if missing.
    pub fn y_axis(&self) -> AbsInfo {
        self.axes
            .get(&ABS_MT_POSITION_Y)
            .copied()
            .unwrap_or_default()
    }

    /// Tracking-id calibration after normalization.
    pub fn tracking_axis(&self) -> AbsInfo {
        self.axes
            .get(&ABS_MT_TRACKING_ID)
            .copied()
            .unwrap_or_else(|| {
                AbsInfo::with_range(DEFAULT_TRACKING_RANGE.0, DEFAULT_TRACKING_RANGE.1)
            })
    }
}

/// Widens a tracking-id axis that reports `min == max`.
pub fn normalize_tracking_range(info: AbsInfo) -> AbsInfo {
    if info.minimum == info.maximum {
        AbsInfo {
            minimum: DEFAULT_TRACKING_RANGE.0,
            maximum: DEFAULT_TRACKING_RANGE.1,
            ..info
        }
    } else {
        info
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
