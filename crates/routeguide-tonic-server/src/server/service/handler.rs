//! gRPC service implementation for the route guide.
//!
//! This module defines [`RouteGuideService`], the concrete implementation of
//! the [`RouteGuide`] gRPC service defined in `route_guide.proto`. Each
//! RPC maps to one call shape:
//!
//! - `GetFeature`: unary lookup against the feature store.
//! - `ListFeatures`: server-streaming, driven by [`drive_features`] on its own
//!   task behind a bounded channel, with the terminal status on a separate
//!   one-shot channel.
//! - `RecordRoute`: client-streaming, folded by [`summarize_route`].
//!
//! ## Responsibilities
//!
//! - Admit calls through the shared [`Lifecycle`] and refuse them during
//!   shutdown.
//! - Validate requests and fail only the offending call.
//! - Track each call with a [`Call`] so that message counts and terminal
//!   signals follow the shape's rules.

use crate::server::{
    config::ServerConfig,
    service::lifecycle::Lifecycle,
    streaming::{
        aggregate::{RECORD_ROUTE, summarize_route},
        producer::{FeatureResponseStream, drive_features, response_stream},
    },
    telemetry::{
        increment_call_errors, increment_features_sent, increment_points_received,
        increment_requests, record_call_duration,
    },
};
use core::time::Duration;
use routeguide_tonic_core::{
    Error,
    call::{Call, CallShape},
    features::FeatureStore,
    geo::Bounds,
    proto::{Feature, Point, Rectangle, RouteSummary, route_guide_server::RouteGuide},
};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tonic::{Request, Response, Status, Streaming};

pub const GET_FEATURE: &str = "GetFeature";
pub const LIST_FEATURES: &str = "ListFeatures";

/// Route guide service backed by a read-only [`FeatureStore`].
///
/// Cloning is cheap: the store and the lifecycle are shared behind `Arc`s, so
/// every clone serves the same dataset and participates in the same shutdown.
#[derive(Clone)]
pub struct RouteGuideService {
    config: ServerConfig,
    store: FeatureStore,
    lifecycle: Arc<Lifecycle>,
}

impl RouteGuideService {
    pub fn new(config: ServerConfig, store: FeatureStore) -> Self {
        Self {
            config,
            store,
            lifecycle: Arc::new(Lifecycle::new()),
        }
    }

    pub const fn store(&self) -> &FeatureStore {
        &self.store
    }

    pub fn inflight(&self) -> usize {
        self.lifecycle.inflight()
    }

    /// Initiates a graceful shutdown.
    ///
    /// New calls are refused immediately. In-flight calls get
    /// `shutdown_timeout` seconds to finish before they are cancelled.
    pub async fn shutdown(&self) {
        self.lifecycle
            .shutdown(Duration::from_secs(self.config.shutdown_timeout))
            .await;
    }
}

/// Counts the failure and converts it for the wire.
fn reject(method: &'static str, err: Error) -> Status {
    increment_call_errors(method);
    #[cfg(feature = "tracing")]
    tracing::warn!(method, "call failed: {err}");
    err.into()
}

#[tonic::async_trait]
impl RouteGuide for RouteGuideService {
    type ListFeaturesStream = FeatureResponseStream;

    /// Returns the feature at the requested point.
    ///
    /// A point with no stored feature yields a feature with an empty name; it
    /// is not an error.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(latitude = req.get_ref().latitude, longitude = req.get_ref().longitude)))]
    async fn get_feature(&self, req: Request<Point>) -> Result<Response<Feature>, Status> {
        let _guard = self
            .lifecycle
            .admit()
            .map_err(|e| reject(GET_FEATURE, e))?;
        increment_requests(GET_FEATURE);

        let mut call = Call::new(GET_FEATURE, CallShape::Unary);
        call.on_request().map_err(|e| reject(GET_FEATURE, e))?;

        let feature = self.store.lookup(req.get_ref());
        if feature.name.is_empty() {
            #[cfg(feature = "tracing")]
            tracing::debug!("No feature was found, returning an unnamed feature");
        }

        call.on_reply()
            .and_then(|()| call.complete())
            .map_err(|e| reject(GET_FEATURE, e))?;
        record_call_duration(GET_FEATURE, call.elapsed().as_secs_f64() * 1000.0);

        Ok(Response::new(feature))
    }

    /// Streams every feature inside the requested rectangle, in load order.
    ///
    /// The rectangle's corners may be given in any order. A rectangle that
    /// encloses no features produces an empty stream that ends with `OK`.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    async fn list_features(
        &self,
        req: Request<Rectangle>,
    ) -> Result<Response<Self::ListFeaturesStream>, Status> {
        let guard = self
            .lifecycle
            .admit()
            .map_err(|e| reject(LIST_FEATURES, e))?;
        increment_requests(LIST_FEATURES);

        let mut call = Call::new(LIST_FEATURES, CallShape::ServerStreaming);
        call.on_request().map_err(|e| reject(LIST_FEATURES, e))?;

        let bounds = Bounds::try_from(req.get_ref())
            .map_err(|e| reject(LIST_FEATURES, call.fail(e)))?;

        let (data_tx, data_rx) = mpsc::channel(self.config.stream_buffer_size);
        let (term_tx, term_rx) = oneshot::channel();

        let store = self.store.clone();
        let shutdown = self.lifecycle.shutdown_token();

        let fut = async move {
            // The call stays in-flight until the producer is done.
            let _guard = guard;
            let started = call.started();
            match drive_features(call, store, bounds, data_tx, term_tx, shutdown).await {
                Ok(sent) => {
                    increment_features_sent(sent);
                    record_call_duration(LIST_FEATURES, started.elapsed().as_secs_f64() * 1000.0);
                    #[cfg(feature = "tracing")]
                    tracing::debug!("Streamed {} features", sent);
                }
                Err(e) => {
                    // The status already went out on the terminal channel.
                    let _ = reject(LIST_FEATURES, e);
                }
            }
        };
        #[cfg(feature = "tracing")]
        let fut = {
            use tracing::Instrument;
            let span = tracing::info_span!("streaming");
            fut.instrument(span)
        };

        tokio::spawn(fut);

        Ok(Response::new(response_stream(data_rx, term_rx)))
    }

    /// Consumes a stream of points and answers with a single summary once the
    /// client half-closes.
    ///
    /// If the client disconnects or is cancelled first, tonic drops this
    /// future, which releases the accumulator and the in-flight guard.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    async fn record_route(
        &self,
        req: Request<Streaming<Point>>,
    ) -> Result<Response<RouteSummary>, Status> {
        let _guard = self
            .lifecycle
            .admit()
            .map_err(|e| reject(RECORD_ROUTE, e))?;
        increment_requests(RECORD_ROUTE);

        let shutdown = self.lifecycle.shutdown_token();
        let started = tokio::time::Instant::now();
        let summary = summarize_route(&self.store, req.into_inner(), &shutdown)
            .await
            .map_err(|e| reject(RECORD_ROUTE, e))?;

        increment_points_received(summary.point_count.unsigned_abs().into());
        record_call_duration(RECORD_ROUTE, started.elapsed().as_secs_f64() * 1000.0);
        #[cfg(feature = "tracing")]
        tracing::info!(
            point_count = summary.point_count,
            feature_count = summary.feature_count,
            distance = summary.distance,
            elapsed_time = summary.elapsed_time,
            "Route recorded"
        );

        Ok(Response::new(summary))
    }
}
