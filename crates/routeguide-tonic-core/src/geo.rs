//! Geometry over fixed-point coordinates.
//!
//! Points carry latitude and longitude as `i32` values scaled by
//! [`COORD_FACTOR`]. Nothing here allocates or fails except converting a
//! wire [`Rectangle`] with a missing corner.

use crate::{
    Error,
    proto::{Point, Rectangle},
};

/// Scale between fixed-point coordinates and degrees.
pub const COORD_FACTOR: f64 = 1e7;

/// Mean Earth radius in metres used by [`distance`].
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// An axis-aligned latitude/longitude box with normalized edges.
///
/// The corners of a [`Rectangle`] may arrive in any order, so the edges are
/// computed with an independent min/max per axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bounds {
    pub left: i32,
    pub right: i32,
    pub bottom: i32,
    pub top: i32,
}

impl Bounds {
    pub fn new(lo: &Point, hi: &Point) -> Self {
        Self {
            left: lo.longitude.min(hi.longitude),
            right: lo.longitude.max(hi.longitude),
            bottom: lo.latitude.min(hi.latitude),
            top: lo.latitude.max(hi.latitude),
        }
    }

    /// Inclusive on every edge.
    pub fn contains(&self, point: &Point) -> bool {
        point.longitude >= self.left
            && point.longitude <= self.right
            && point.latitude >= self.bottom
            && point.latitude <= self.top
    }
}

impl TryFrom<&Rectangle> for Bounds {
    type Error = Error;

    fn try_from(rect: &Rectangle) -> Result<Self, Self::Error> {
        match (rect.lo.as_ref(), rect.hi.as_ref()) {
            (Some(lo), Some(hi)) => Ok(Self::new(lo, hi)),
            (None, _) => Err(Error::InvalidRequest {
                reason: "rectangle is missing its `lo` corner".to_string(),
            }),
            (_, None) => Err(Error::InvalidRequest {
                reason: "rectangle is missing its `hi` corner".to_string(),
            }),
        }
    }
}

/// Returns whether `point` lies inside the rectangle spanned by `lo` and `hi`.
pub fn in_range(point: &Point, lo: &Point, hi: &Point) -> bool {
    Bounds::new(lo, hi).contains(point)
}

fn to_radians(fixed: i32) -> f64 {
    (f64::from(fixed) / COORD_FACTOR) * core::f64::consts::PI / 180.0
}

/// Great-circle distance between two points in whole metres, using the
/// haversine formula.
///
/// The result is truncated toward zero.
#[allow(clippy::cast_possible_truncation)]
pub fn distance(p1: &Point, p2: &Point) -> i32 {
    let lat1 = to_radians(p1.latitude);
    let lat2 = to_radians(p2.latitude);
    let lng1 = to_radians(p1.longitude);
    let lng2 = to_radians(p2.longitude);
    let dlat = lat2 - lat1;
    let dlng = lng2 - lng1;

    let a = (dlat / 2.0).sin() * (dlat / 2.0).sin()
        + lat1.cos() * lat2.cos() * (dlng / 2.0).sin() * (dlng / 2.0).sin();
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    (EARTH_RADIUS_M * c) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    const fn point(latitude: i32, longitude: i32) -> Point {
        Point {
            latitude,
            longitude,
        }
    }

    #[test]
    fn in_range_is_inclusive_on_edges() {
        let lo = point(400_000_000, -750_000_000);
        let hi = point(420_000_000, -730_000_000);

        assert!(in_range(&lo, &lo, &hi));
        assert!(in_range(&hi, &lo, &hi));
        assert!(in_range(&point(410_000_000, -740_000_000), &lo, &hi));
        assert!(!in_range(&point(399_999_999, -740_000_000), &lo, &hi));
        assert!(!in_range(&point(410_000_000, -729_999_999), &lo, &hi));
    }

    #[test]
    fn in_range_ignores_corner_order() {
        let a = point(420_000_000, -750_000_000);
        let b = point(400_000_000, -730_000_000);
        let samples = [
            point(410_000_000, -740_000_000),
            point(420_000_000, -730_000_000),
            point(430_000_000, -740_000_000),
            point(410_000_000, -760_000_000),
            point(0, 0),
        ];

        for p in &samples {
            assert_eq!(in_range(p, &a, &b), in_range(p, &b, &a));
        }
        assert_eq!(Bounds::new(&a, &b), Bounds::new(&b, &a));
    }

    #[test]
    fn bounds_require_both_corners() {
        let rect = Rectangle {
            lo: Some(point(1, 1)),
            hi: None,
        };
        assert!(matches!(
            Bounds::try_from(&rect),
            Err(Error::InvalidRequest { .. })
        ));

        let rect = Rectangle {
            lo: Some(point(5, -5)),
            hi: Some(point(-5, 5)),
        };
        let bounds = Bounds::try_from(&rect).unwrap();
        assert_eq!(
            bounds,
            Bounds {
                left: -5,
                right: 5,
                bottom: -5,
                top: 5
            }
        );
    }

    #[test]
    fn distance_to_self_is_zero() {
        for p in [
            point(0, 0),
            point(378_199_220, -1_224_782_550),
            point(-900_000_000, 1_800_000_000),
        ] {
            assert_eq!(distance(&p, &p), 0);
        }
    }

    #[test]
    fn distance_is_symmetric() {
        let a = point(407_838_351, -746_143_763);
        let b = point(408_122_808, -743_999_179);
        assert_eq!(distance(&a, &b), distance(&b, &a));
        assert_eq!(distance(&a, &b), 18_327);
    }

    #[test]
    fn one_degree_of_latitude_along_a_meridian() {
        let equator = point(0, 0);
        let one = point(10_000_000, 0);
        let two = point(20_000_000, 0);

        assert_eq!(distance(&equator, &one), 111_194);
        assert_eq!(distance(&one, &two), 111_194);
        assert_eq!(distance(&equator, &two), 222_389);
    }
}
