//! The route guide gRPC server.
//!
//! - [`config`] - CLI and environment configuration.
//! - [`router`] - Transport setup: health, reflection, gRPC-web, compression.
//! - [`service`] - The `RouteGuide` implementation and call admission.
//! - [`streaming`] - Server-streaming and client-streaming call drivers.
//! - [`telemetry`] - Logging, tracing and metrics.

pub mod config;
pub mod router;
pub mod service;
pub mod streaming;
pub mod telemetry;
