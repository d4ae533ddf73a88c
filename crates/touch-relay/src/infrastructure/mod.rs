//! Infrastructure layer of the relay.
//!
//! Contains the OS-facing adapters and the configuration file.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `touch_core`, but MUST NOT be imported by the `application` layer outside
//! of its tests.
//!
//! # Sub-modules
//!
//! - **`device`** – evdev enumeration and reading, uinput creation and
//!   writing, the raw `ioctl`/`poll` wrappers, `setup`, and the test doubles.
//!
//! - **`config`** – `RelayConfig`, loaded from TOML with per-field defaults.

pub mod config;
pub mod device;
