//! Tracking-id allocation for synthetic contacts.
//!
//! # What is a tracking id? (for beginners)
//!
//! In the slotted (Type B) protocol every finger carries a *tracking id* for
//! as long as it touches the screen.  A new id announces a new touch; `-1`
//! announces the lift.  Consumers use the id to tell "the same finger moved"
//! apart from "one finger lifted and another landed in the same slot".
//!
//! Synthetic touches take their ids from a small window at the top of the
//! device's tracking range, where the hardware, which counts up from the
//! bottom, is unlikely to be.
//!
//! # Thread safety
//!
//! The allocator keeps an `AtomicU32` offset, like a sequence counter, so it
//! can be shared without a lock.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::abi::codec::AbsInfo;

/// Width of the window of ids handed out below the top of the range.
pub const TRACKING_ID_WINDOW: u32 = 256;

/// Hands out tracking ids cycling through `[base, maximum]`.
#[derive(Debug)]
pub struct TrackingIdAllocator {
    base: i32,
    span: u32,
    offset: AtomicU32,
}

impl TrackingIdAllocator {
    /// Creates an allocator for a tracking axis.  The window never reaches
    /// below `max(minimum, 0)`, so `-1` is never handed out.
    pub fn new(axis: &AbsInfo) -> Self {
        let floor = i64::from(axis.minimum.max(0));
        let top = i64::from(axis.maximum).max(floor);
        let base = (top - i64::from(TRACKING_ID_WINDOW) + 1).max(floor);
        Self {
            // `base` lies in [floor, top], both valid i32 values.
            base: base as i32,
            span: (top - base + 1) as u32,
            offset: AtomicU32::new(0),
        }
    }

    /// Returns the next id, wrapping back to the bottom of the window.
    pub fn next(&self) -> i32 {
        let step = self.offset.fetch_add(1, Ordering::Relaxed) % self.span;
        // `step < span`, so the sum stays within [base, top].
        (i64::from(self.base) + i64::from(step)) as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_ids_start_near_top_of_range() {
        // Arrange
        let alloc = TrackingIdAllocator::new(&AbsInfo::with_range(0, 65535));

        // Act
        let first = alloc.next();
        let second = alloc.next();

        // Assert
        assert_eq!(first, 65535 - 255);
        assert_eq!(second, first + 1);
    }

    #[test]
    fn test_ids_wrap_inside_window() {
        let alloc = TrackingIdAllocator::new(&AbsInfo::with_range(0, 65535));
        let ids: Vec<i32> = (0..TRACKING_ID_WINDOW + 1).map(|_| alloc.next()).collect();
        assert_eq!(ids[0], ids[TRACKING_ID_WINDOW as usize]);
        assert!(ids.iter().all(|id| (65280..=65535).contains(id)));
    }

    #[test]
    fn test_small_range_never_yields_negative_ids() {
        // Arrange: a tracking axis of [-1, 9]
        let alloc = TrackingIdAllocator::new(&AbsInfo::with_range(-1, 9));

        // Act
        let ids: Vec<i32> = (0..30).map(|_| alloc.next()).collect();

        // Assert
        assert!(ids.iter().all(|id| (0..=9).contains(id)));
        assert_eq!(ids[0], 0);
    }

    #[test]
    fn test_allocator_is_thread_safe() {
        // Arrange
        let alloc = Arc::new(TrackingIdAllocator::new(&AbsInfo::with_range(0, 65535)));

        // Act
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let a = Arc::clone(&alloc);
                thread::spawn(move || (0..32).map(|_| a.next()).collect::<Vec<_>>())
            })
            .collect();
        let mut ids: Vec<i32> = handles
            .into_iter()
            .flat_map(|h| h.join().expect("thread panicked"))
            .collect();

        // Assert – 128 allocations fit in the window without repeats
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 128);
    }
}
