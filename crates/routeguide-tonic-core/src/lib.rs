#![doc = include_str!("../README.md")]

pub mod call;
pub mod client;
pub mod error;
pub mod features;
pub mod geo;
pub mod route;

pub use error::{Error, Result};

/// gRPC service and message definitions generated from
/// `proto/route_guide.proto`.
///
/// ## Service
///
/// - `GetFeature` - Unary lookup of the feature at an exact point.
/// - `ListFeatures` - Server-streaming listing of features inside a rectangle.
/// - `RecordRoute` - Client-streaming route upload answered with a single
///   [`RouteSummary`](proto::RouteSummary).
///
/// ## Coordinates
///
/// All coordinates are fixed-point `int32` values: degrees multiplied by
/// 10,000,000. See [`crate::geo::COORD_FACTOR`].
pub mod proto {
    tonic::include_proto!("routeguide");
    pub const FILE_DESCRIPTOR_SET: &[u8] =
        tonic::include_file_descriptor_set!("routeguide_descriptor");
}
