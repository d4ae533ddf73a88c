//! Domain entities for touch relaying.
//!
//! This module contains pure logic with no infrastructure dependencies: it
//! never opens a file or issues an `ioctl`.
//!
//! # What is "domain" in Clean Architecture? (for beginners)
//!
//! The innermost layer holds the rules that make the system what it is, here:
//! which devices count as touch screens, how per-finger state is tracked
//! between frames, and how display pixels become device coordinates.  Outer
//! layers (the relay's reader/dispatcher threads and the evdev/uinput
//! plumbing) depend on the domain, never the reverse, so everything here can
//! be unit-tested without hardware.

/// Device descriptor, capability bitmaps and qualification rule.
pub mod device;

/// Contact table with per-field dirty tracking.
pub mod contact;

/// Display-to-device mapping and swipe interpolation.
pub mod mapping;

/// Tracking-id allocation for synthetic contacts.
pub mod tracking;
