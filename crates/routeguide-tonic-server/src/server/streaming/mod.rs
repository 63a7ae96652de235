//! Drivers for the two streaming call shapes.
//!
//! - [`producer`] - Feeds `ListFeatures` results into a bounded response
//!   channel.
//! - [`aggregate`] - Folds a `RecordRoute` point stream into a summary.

pub mod aggregate;
pub mod producer;
