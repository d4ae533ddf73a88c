//! Display-to-device coordinate mapping and swipe path generation.
//!
//! A synthetic gesture is described in display pixels (`0..width`,
//! `0..height`).  The touch controller reports positions in its own axis
//! range, typically `[min, max]` with a different resolution.  The mapping is
//! a plain integer rescale computed in 64-bit:
//!
//! ```text
//! device_x = x * (max_x - min_x + 1) / display_width + min_x
//! ```

use thiserror::Error;

use crate::abi::codec::AbsInfo;

/// Errors raised when configuring a [`CoordinateMapper`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MappingError {
    #[error("invalid display size {width}x{height}: both dimensions must be non-zero")]
    InvalidDisplaySize { width: u32, height: u32 },
}

/// Width and height of the display in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplaySize {
    pub width: u32,
    pub height: u32,
}

impl DisplaySize {
    /// # Errors
    ///
    /// Returns [`MappingError::InvalidDisplaySize`] if either dimension is zero.
    pub fn new(width: u32, height: u32) -> Result<Self, MappingError> {
        if width == 0 || height == 0 {
            return Err(MappingError::InvalidDisplaySize { width, height });
        }
        Ok(Self { width, height })
    }
}

/// One axis of the mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AxisScale {
    min: i64,
    range: i64,
    extent: i64,
}

impl AxisScale {
    fn new(axis: &AbsInfo, extent: u32) -> Self {
        Self {
            min: i64::from(axis.minimum),
            range: axis.range().max(1),
            extent: i64::from(extent),
        }
    }

    fn map(&self, value: i32) -> i32 {
        let value = i64::from(value).clamp(0, self.extent - 1);
        let mapped = value * self.range / self.extent + self.min;
        // `mapped` lies in [min, min + range - 1], which is inside the i32 axis range.
        mapped as i32
    }
}

/// Maps display coordinates into device axis space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinateMapper {
    display: DisplaySize,
    x: AxisScale,
    y: AxisScale,
}

impl CoordinateMapper {
    pub fn new(display: DisplaySize, x_axis: &AbsInfo, y_axis: &AbsInfo) -> Self {
        Self {
            display,
            x: AxisScale::new(x_axis, display.width),
            y: AxisScale::new(y_axis, display.height),
        }
    }

    pub fn display(&self) -> DisplaySize {
        self.display
    }

    /// Maps a display point.  Coordinates outside the display are clamped to
    /// its edges first.
    pub fn map(&self, x: i32, y: i32) -> (i32, i32) {
        (self.x.map(x), self.y.map(y))
    }
}

// ── Swipe path ────────────────────────────────────────────────────────────────

/// Interpolation parameters for swipes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwipeParams {
    /// Largest step, in gesture units, between consecutive points.
    pub max_move_distance: u32,
    /// Lower bound on the number of intermediate points.
    pub min_point_count: u32,
}

impl Default for SwipeParams {
    fn default() -> Self {
        Self {
            max_move_distance: 10,
            min_point_count: 2,
        }
    }
}

/// Strictly intermediate points of a straight swipe from `start` to `end`.
///
/// `N = max(min_point_count, max(|dx|, |dy|) / max_move_distance)` points are
/// returned, point `i` (1-based) lying at `start + d * i / (N + 1)`.  The
/// endpoints themselves are not included.
pub fn swipe_path(start: (i32, i32), end: (i32, i32), params: SwipeParams) -> Vec<(i32, i32)> {
    let dx = i64::from(end.0) - i64::from(start.0);
    let dy = i64::from(end.1) - i64::from(start.1);
    let step = i64::from(params.max_move_distance.max(1));
    let count = (dx.abs().max(dy.abs()) / step).max(i64::from(params.min_point_count));
    let divisor = count + 1;

    (1..=count)
        .map(|i| {
            let x = i64::from(start.0) + dx * i / divisor;
            let y = i64::from(start.1) + dy * i / divisor;
            // Both lie between the two i32 endpoints.
            (x as i32, y as i32)
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper(width: u32, height: u32, x: (i32, i32), y: (i32, i32)) -> CoordinateMapper {
        CoordinateMapper::new(
            DisplaySize::new(width, height).unwrap(),
            &AbsInfo::with_range(x.0, x.1),
            &AbsInfo::with_range(y.0, y.1),
        )
    }

    // ── DisplaySize ───────────────────────────────────────────────────────────

    #[test]
    fn test_zero_display_size_is_rejected() {
        assert_eq!(
            DisplaySize::new(0, 1920),
            Err(MappingError::InvalidDisplaySize {
                width: 0,
                height: 1920
            })
        );
        assert!(DisplaySize::new(1080, 0).is_err());
    }

    // ── Mapping ───────────────────────────────────────────────────────────────

    #[test]
    fn test_identity_mapping_when_ranges_match() {
        let m = mapper(1080, 2340, (0, 1079), (0, 2339));
        assert_eq!(m.map(0, 0), (0, 0));
        assert_eq!(m.map(540, 1170), (540, 1170));
        assert_eq!(m.map(1079, 2339), (1079, 2339));
    }

    #[test]
    fn test_mapping_scales_and_offsets() {
        // Arrange: 4096-value axis starting at 100, on a 1024-pixel display
        let m = mapper(1024, 1024, (100, 4195), (0, 4095));

        // Act
        let (x, y) = m.map(512, 256);

        // Assert
        assert_eq!(x, 512 * 4 + 100);
        assert_eq!(y, 256 * 4);
    }

    #[test]
    fn test_mapping_is_monotonic_and_bounded() {
        let m = mapper(1920, 1080, (-50, 32767), (0, 65535));
        let mut previous = i32::MIN;
        for x in 0..1920 {
            let (mapped, _) = m.map(x, 0);
            assert!(mapped >= previous, "mapping must be monotonic");
            assert!((-50..=32767).contains(&mapped));
            previous = mapped;
        }
    }

    #[test]
    fn test_out_of_display_coordinates_are_clamped() {
        let m = mapper(100, 100, (0, 999), (0, 999));
        assert_eq!(m.map(-5, 500), (0, 990));
    }

    #[test]
    fn test_large_axis_does_not_overflow() {
        let m = mapper(3, 3, (i32::MIN, i32::MAX), (0, 1));
        let (x, _) = m.map(2, 0);
        assert!(x > 0);
    }

    // ── Swipe path ────────────────────────────────────────────────────────────

    #[test]
    fn test_horizontal_swipe_produces_ten_intermediate_points() {
        // Arrange / Act
        let points = swipe_path((0, 0), (100, 0), SwipeParams::default());

        // Assert
        assert_eq!(points.len(), 10);
        let mut xs = vec![0];
        xs.extend(points.iter().map(|p| p.0));
        xs.push(100);
        assert!(xs.windows(2).all(|w| w[1] > w[0]), "X must strictly increase: {xs:?}");
        assert!(points.iter().all(|p| p.1 == 0));
    }

    #[test]
    fn test_short_swipe_uses_minimum_point_count() {
        let points = swipe_path((10, 10), (15, 10), SwipeParams::default());
        assert_eq!(points.len(), 2);
    }

    #[test]
    fn test_swipe_follows_dominant_axis_and_handles_negative_direction() {
        let points = swipe_path((500, 400), (100, 380), SwipeParams::default());
        assert_eq!(points.len(), 40);
        assert!(points.windows(2).all(|w| w[1].0 < w[0].0));
        assert!(points.iter().all(|p| (380..=400).contains(&p.1)));
    }

    #[test]
    fn test_zero_max_move_distance_is_treated_as_one() {
        let params = SwipeParams {
            max_move_distance: 0,
            min_point_count: 2,
        };
        assert_eq!(swipe_path((0, 0), (5, 0), params).len(), 5);
    }
}
