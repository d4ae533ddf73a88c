//! touch-relay library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does touch-relay do? (for beginners)
//!
//! A Linux touch screen reports fingers through an evdev node.  The relay:
//!
//! 1. Finds the touch screen under `/dev/input` and probes its axes.
//! 2. Creates a virtual twin through `/dev/uinput` and grabs the real
//!    device, so applications only see the twin.
//! 3. Reads every report from the real device, tracks contacts in a slot
//!    table, and re-emits each frame on the twin using the Type A or Type B
//!    multitouch protocol.
//! 4. Lets the caller inject a synthetic finger (move, up, tap, swipe) into
//!    a reserved slot, mixed with the real contacts.

/// Application layer: protocol rules, relay threads, injector, session.
pub mod application;

/// Infrastructure layer: device adapters and configuration.
pub mod infrastructure;

pub use application::error::RelayError;
pub use application::session::{SessionOptions, TouchRelaySession};
pub use infrastructure::config::{load_config, ConfigError, RelayConfig};
pub use infrastructure::device::setup;
