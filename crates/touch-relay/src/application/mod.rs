//! Application layer of the relay.
//!
//! # What lives here?
//!
//! - **`protocol`** – The Type A / Type B rules: how source reports fold into
//!   the contact table and how a frame becomes events.
//!
//! - **`reader`** / **`dispatcher`** – The two relay threads, coupled by a
//!   zero-capacity frame channel.
//!
//! - **`injector`** – Synthetic move/up/tap/swipe in the reserved slot.
//!
//! - **`session`** – `TouchRelaySession`, which owns all of the above and
//!   tears it down once.
//!
//! - **`device_io`** – The `EventSource` / `EventSink` ports implemented by
//!   the infrastructure layer.
//!
//! - **`error`** – `RelayError`.

pub mod device_io;
pub mod dispatcher;
pub mod error;
pub mod injector;
pub mod protocol;
pub mod reader;
pub mod session;
