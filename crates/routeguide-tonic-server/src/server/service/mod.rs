//! gRPC service implementation and call admission.
//!
//! ## Structure
//!
//! - [`handler`] - gRPC service entry point (`RouteGuideService`).
//! - [`lifecycle`] - In-flight call tracking and graceful shutdown.

pub mod handler;
pub mod lifecycle;
