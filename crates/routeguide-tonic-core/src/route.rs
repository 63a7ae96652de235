//! Route aggregation for `RecordRoute`.
//!
//! [`RouteAccumulator`] is the fold state of a single client-streaming call.
//! It is fed one point at a time while the client direction is open and is
//! consumed into a [`RouteSummary`] once the client half-closes.

use crate::{
    features::FeatureStore,
    geo::distance,
    proto::{Point, RouteSummary},
};
use tokio::time::Instant;

#[derive(Debug)]
pub struct RouteAccumulator {
    point_count: i32,
    feature_count: i32,
    distance: i32,
    last_point: Option<Point>,
    started: Instant,
}

impl RouteAccumulator {
    pub const fn new(started: Instant) -> Self {
        Self {
            point_count: 0,
            feature_count: 0,
            distance: 0,
            last_point: None,
            started,
        }
    }

    /// Folds one received point into the running totals.
    pub fn observe(&mut self, point: Point, store: &FeatureStore) {
        self.point_count = self.point_count.saturating_add(1);
        if store.is_feature_location(&point) {
            self.feature_count = self.feature_count.saturating_add(1);
        }
        if let Some(last) = &self.last_point {
            self.distance = self.distance.saturating_add(distance(last, &point));
        }
        self.last_point = Some(point);
    }

    pub const fn point_count(&self) -> i32 {
        self.point_count
    }

    /// Consumes the accumulator at half-close time.
    ///
    /// `elapsed_time` is the number of whole seconds between the call start
    /// and `ended`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn finish(self, ended: Instant) -> RouteSummary {
        let elapsed = ended.saturating_duration_since(self.started).as_secs();
        RouteSummary {
            point_count: self.point_count,
            feature_count: self.feature_count,
            distance: self.distance,
            elapsed_time: elapsed.min(i32::MAX as u64) as i32,
        }
    }
}
