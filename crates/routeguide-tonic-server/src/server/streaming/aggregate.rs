use routeguide_tonic_core::{
    Error,
    call::{Call, CallShape},
    features::FeatureStore,
    proto::{Point, RouteSummary},
    route::RouteAccumulator,
};
use tokio::time::Instant;
use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tonic::Status;

pub const RECORD_ROUTE: &str = "RecordRoute";

/// Folds a client-streamed route into a single [`RouteSummary`].
///
/// Points are consumed one at a time as the client sends them; nothing is
/// buffered beyond the running totals in [`RouteAccumulator`]. The summary is
/// produced only after the client half-closes, i.e. when `points` ends.
///
/// # Errors
///
/// - [`Error::Transport`] if the inbound stream yields an error before the
///   client half-closed. No summary is produced.
/// - [`Error::ServiceShutdown`] if `shutdown` is cancelled while waiting for
///   the next point.
pub async fn summarize_route<S>(
    store: &FeatureStore,
    mut points: S,
    shutdown: &CancellationToken,
) -> routeguide_tonic_core::Result<RouteSummary>
where
    S: Stream<Item = Result<Point, Status>> + Unpin,
{
    let mut call = Call::new(RECORD_ROUTE, CallShape::ClientStreaming);
    let mut route = RouteAccumulator::new(call.started());

    loop {
        let next = tokio::select! {
            biased;
            () = shutdown.cancelled() => return Err(call.fail(Error::ServiceShutdown)),
            next = points.next() => next,
        };

        match next {
            Some(Ok(point)) => {
                call.on_request()?;
                #[cfg(feature = "tracing")]
                tracing::trace!(
                    latitude = point.latitude,
                    longitude = point.longitude,
                    "received point"
                );
                route.observe(point, store);
            }
            Some(Err(status)) => {
                return Err(call.fail(Error::Transport {
                    context: format!(
                        "request stream broke after {} points: {}",
                        route.point_count(),
                        status.message()
                    ),
                }));
            }
            None => break,
        }
    }

    call.half_close()?;
    let summary = route.finish(Instant::now());
    call.on_reply()?;
    call.complete()?;

    Ok(summary)
}
