//! Deadline-aware client for the `RouteGuide` service.
//!
//! [`RouteGuideCaller`] wraps the generated
//! [`RouteGuideClient`](crate::proto::route_guide_client::RouteGuideClient)
//! and applies one deadline to every call. The deadline is sent to the server
//! as `grpc-timeout` and is also enforced locally with
//! [`tokio::time::timeout`], so an abandoned call returns promptly even if the
//! server never answers. Each call is tracked with a [`Call`], which rejects
//! anything the server delivers after the call was abandoned.

use crate::{
    Error, Result,
    call::{Call, CallShape},
    proto::{Feature, Point, Rectangle, RouteSummary, route_guide_client::RouteGuideClient},
};
use core::time::Duration;
use tokio::{
    sync::mpsc,
    time::{Instant, timeout, timeout_at},
};
use tokio_stream::{Stream, StreamExt, wrappers::ReceiverStream};
use tonic::{
    Request, Status, Streaming,
    transport::{Channel, Endpoint},
};

/// Deadline applied when none is configured.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(10);

/// Outbound buffer between the caller's point stream and the transport.
const ROUTE_BUFFER_SIZE: usize = 16;

#[derive(Clone, Debug)]
pub struct RouteGuideCaller {
    inner: RouteGuideClient<Channel>,
    deadline: Duration,
}

impl RouteGuideCaller {
    /// Connects to `endpoint` (e.g. `http://localhost:3000`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] for a malformed endpoint and
    /// [`Error::Transport`] if the connection cannot be established.
    pub async fn connect(endpoint: impl Into<String>, deadline: Duration) -> Result<Self> {
        let endpoint = Endpoint::from_shared(endpoint.into()).map_err(|e| Error::InvalidRequest {
            reason: format!("invalid endpoint: {e}"),
        })?;
        let channel = endpoint
            .connect_timeout(deadline)
            .connect()
            .await
            .map_err(|e| Error::Transport {
                context: format!("failed to connect: {e}"),
            })?;

        Ok(Self::new(channel, deadline))
    }

    pub fn new(channel: Channel, deadline: Duration) -> Self {
        Self {
            inner: RouteGuideClient::new(channel),
            deadline,
        }
    }

    pub const fn deadline(&self) -> Duration {
        self.deadline
    }

    fn request<T>(&self, message: T) -> Request<T> {
        let mut request = Request::new(message);
        request.set_timeout(self.deadline);
        request
    }

    /// Looks up the feature at `point`.
    ///
    /// An unknown location yields a feature with an empty name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] if no reply arrives within the deadline, or
    /// the classified server status otherwise.
    pub async fn get_feature(&mut self, point: Point) -> Result<Feature> {
        let mut call = Call::new("GetFeature", CallShape::Unary);
        call.on_request()?;

        let deadline = self.deadline;
        let request = self.request(point);
        let feature = match timeout(deadline, self.inner.get_feature(request)).await {
            Ok(Ok(response)) => response.into_inner(),
            Ok(Err(status)) => return Err(call.fail(classify(status, deadline))),
            Err(_) => return Err(call.fail(Error::Timeout { budget: deadline })),
        };

        call.on_reply()?;
        call.complete()?;
        Ok(feature)
    }

    /// Opens a `ListFeatures` stream over `rect`.
    ///
    /// Features are handed out one at a time by [`FeatureStream::message`] as
    /// they arrive. The deadline covers the whole stream, starting now.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] if the server does not accept the call within
    /// the deadline, or the classified server status if it rejects it.
    pub async fn list_features(&mut self, rect: Rectangle) -> Result<FeatureStream> {
        let mut call = Call::new("ListFeatures", CallShape::ServerStreaming);
        call.on_request()?;

        let budget = self.deadline;
        let expires = Instant::now() + budget;
        let request = self.request(rect);

        let inner = match timeout_at(expires, self.inner.list_features(request)).await {
            Ok(Ok(response)) => response.into_inner(),
            Ok(Err(status)) => return Err(call.fail(classify(status, budget))),
            Err(_) => return Err(call.fail(Error::Timeout { budget })),
        };

        Ok(FeatureStream {
            inner,
            call,
            budget,
            expires,
            delivered: 0,
        })
    }

    /// Streams `points` to the server at the pace the stream yields them and
    /// returns the server's summary.
    ///
    /// The client direction half-closes when `points` ends.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] if the summary does not arrive within the
    /// deadline, or the classified server status otherwise.
    pub async fn record_route<S>(&mut self, points: S) -> Result<RouteSummary>
    where
        S: Stream<Item = Point> + Unpin,
    {
        let mut call = Call::new("RecordRoute", CallShape::ClientStreaming);

        let deadline = self.deadline;
        let (tx, rx) = mpsc::channel(ROUTE_BUFFER_SIZE);
        let request = self.request(ReceiverStream::new(rx));
        let inner = &mut self.inner;
        let call_ref = &mut call;

        let exchanged = timeout(deadline, async move {
            let feed = async {
                let tx = tx;
                let mut points = points;
                while let Some(point) = points.next().await {
                    call_ref.on_request()?;
                    if tx.send(point).await.is_err() {
                        return Err(Error::Transport {
                            context: "server closed the request stream".to_string(),
                        });
                    }
                }
                // Dropping the sender ends the request body.
                drop(tx);
                call_ref.half_close()
            };

            let (fed, response) = tokio::join!(feed, inner.record_route(request));
            match response {
                Ok(response) => fed.map(|()| response.into_inner()),
                Err(status) => Err(classify(status, deadline)),
            }
        })
        .await;

        match exchanged {
            Ok(Ok(summary)) => {
                call.on_reply()?;
                call.complete()?;
                Ok(summary)
            }
            Ok(Err(err)) => Err(call.fail(err)),
            Err(_) => Err(call.fail(Error::Timeout { budget: deadline })),
        }
    }
}

/// Server stream of features opened by [`RouteGuideCaller::list_features`].
///
/// The stream distinguishes "received N features and then failed" from
/// "succeeded with N features": a failure after the first feature is always
/// reported as [`Error::StreamInterrupted`] carrying the count, including a
/// deadline that expires mid-stream.
#[derive(Debug)]
pub struct FeatureStream {
    inner: Streaming<Feature>,
    call: Call,
    budget: Duration,
    expires: Instant,
    delivered: usize,
}

impl FeatureStream {
    /// Waits for the next feature.
    ///
    /// Returns `Ok(None)` once the server ends the stream with `OK`, and on
    /// every call after the stream has ended or failed.
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] if the deadline expires before any feature.
    /// - [`Error::StreamInterrupted`] if the stream fails, or the deadline
    ///   expires, after at least one feature was delivered.
    /// - The classified server status if the stream fails before any feature.
    pub async fn message(&mut self) -> Result<Option<Feature>> {
        if self.call.is_closed() {
            return Ok(None);
        }
        // Features already buffered by the transport are not handed out late.
        if Instant::now() >= self.expires {
            return Err(self.interrupt(Error::Timeout {
                budget: self.budget,
            }));
        }

        match timeout_at(self.expires, self.inner.message()).await {
            Ok(Ok(Some(feature))) => {
                self.call.on_reply()?;
                self.delivered += 1;
                Ok(Some(feature))
            }
            Ok(Ok(None)) => {
                self.call.complete()?;
                Ok(None)
            }
            Ok(Err(status)) => Err(self.interrupt(classify(status, self.budget))),
            Err(_) => Err(self.interrupt(Error::Timeout {
                budget: self.budget,
            })),
        }
    }

    /// Number of features handed out so far.
    pub const fn delivered(&self) -> usize {
        self.delivered
    }

    fn interrupt(&mut self, err: Error) -> Error {
        if self.delivered == 0 {
            return self.call.fail(err);
        }
        self.call.fail(Error::StreamInterrupted {
            delivered: self.delivered,
            reason: err.to_string(),
        })
    }
}

fn classify(status: Status, deadline: Duration) -> Error {
    match Error::from(status) {
        Error::Timeout { .. } => Error::Timeout { budget: deadline },
        other => other,
    }
}
