//! Per-call lifecycle for the three RPC shapes.
//!
//! Every RPC invocation, on either side of the wire, is tracked by one
//! [`Call`]. The call starts [`CallState::Open`], moves to
//! [`CallState::HalfClosed`] once the client has signaled that no more input
//! follows, and ends in exactly one terminal [`Outcome`]. Once closed, every
//! further message or signal is rejected with [`Error::Protocol`].
//!
//! ## Shapes
//!
//! | Shape | Client messages | Server messages |
//! | --- | --- | --- |
//! | [`CallShape::Unary`] | exactly 1 (half-closes) | exactly 1 |
//! | [`CallShape::ServerStreaming`] | exactly 1 (half-closes) | 0..n |
//! | [`CallShape::ClientStreaming`] | 0..n, then half-close | exactly 1, after half-close |
//!
//! A [`Call`] is owned by the task driving the call and is never shared, so it
//! carries no synchronization.

use crate::{Error, Result};
use core::fmt;
use core::time::Duration;
use tokio::time::Instant;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallShape {
    Unary,
    ServerStreaming,
    ClientStreaming,
}

impl CallShape {
    const fn single_request(self) -> bool {
        matches!(self, Self::Unary | Self::ServerStreaming)
    }

    const fn single_reply(self) -> bool {
        matches!(self, Self::Unary | Self::ClientStreaming)
    }
}

impl fmt::Display for CallShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unary => write!(f, "unary"),
            Self::ServerStreaming => write!(f, "server-streaming"),
            Self::ClientStreaming => write!(f, "client-streaming"),
        }
    }
}

/// Terminal signal of a call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Failed(Error),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallState {
    Open,
    HalfClosed,
    Closed(Outcome),
}

/// Lifecycle tracker for a single RPC invocation.
#[derive(Debug)]
pub struct Call {
    method: &'static str,
    shape: CallShape,
    state: CallState,
    requests: u64,
    replies: u64,
    started: Instant,
}

impl Call {
    pub fn new(method: &'static str, shape: CallShape) -> Self {
        Self {
            method,
            shape,
            state: CallState::Open,
            requests: 0,
            replies: 0,
            started: Instant::now(),
        }
    }

    pub const fn method(&self) -> &'static str {
        self.method
    }

    pub const fn shape(&self) -> CallShape {
        self.shape
    }

    pub const fn state(&self) -> &CallState {
        &self.state
    }

    pub const fn is_closed(&self) -> bool {
        matches!(self.state, CallState::Closed(_))
    }

    pub const fn requests(&self) -> u64 {
        self.requests
    }

    pub const fn replies(&self) -> u64 {
        self.replies
    }

    pub const fn started(&self) -> Instant {
        self.started
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    fn violation(&self, what: &str) -> Error {
        Error::Protocol {
            reason: format!(
                "{} ({}) {what} while {:?}",
                self.method, self.shape, self.state
            ),
        }
    }

    /// Records one client-to-server message.
    ///
    /// For unary and server-streaming calls the single request also
    /// half-closes the client direction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the client direction is no longer open.
    pub fn on_request(&mut self) -> Result<()> {
        if self.state != CallState::Open {
            return Err(self.violation("received a request"));
        }

        self.requests += 1;
        if self.shape.single_request() {
            self.state = CallState::HalfClosed;
        }
        Ok(())
    }

    /// Records the client's "no more input" signal.
    ///
    /// Only meaningful for client-streaming calls; the other shapes half-close
    /// with their single request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the call is not open or is not
    /// client-streaming.
    pub fn half_close(&mut self) -> Result<()> {
        if self.state != CallState::Open || self.shape.single_request() {
            return Err(self.violation("half-closed"));
        }

        self.state = CallState::HalfClosed;
        Ok(())
    }

    /// Records one server-to-client message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the client has not half-closed yet, the
    /// call is closed, or a single-reply shape already replied. A reply that
    /// arrives after the call was abandoned is rejected here, which is what
    /// keeps late replies out of a discarded call.
    pub fn on_reply(&mut self) -> Result<()> {
        if self.state != CallState::HalfClosed {
            return Err(self.violation("sent a reply"));
        }
        if self.shape.single_reply() && self.replies > 0 {
            return Err(self.violation("sent a second reply"));
        }

        self.replies += 1;
        Ok(())
    }

    /// Moves the call to `Closed(Completed)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the client has not half-closed, or a
    /// single-reply shape has not replied.
    pub fn complete(&mut self) -> Result<()> {
        if self.state != CallState::HalfClosed {
            return Err(self.violation("completed"));
        }
        if self.shape.single_reply() && self.replies != 1 {
            return Err(self.violation("completed without its reply"));
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            method = self.method,
            shape = %self.shape,
            requests = self.requests,
            replies = self.replies,
            elapsed_ms = self.elapsed().as_millis() as u64,
            "call completed"
        );
        self.state = CallState::Closed(Outcome::Completed);
        Ok(())
    }

    /// Moves the call to `Closed(Failed)` and hands the error back for
    /// propagation.
    ///
    /// A call that is already closed keeps its first outcome.
    pub fn fail(&mut self, err: Error) -> Error {
        if !self.is_closed() {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                method = self.method,
                shape = %self.shape,
                requests = self.requests,
                replies = self.replies,
                "call failed: {err}"
            );
            self.state = CallState::Closed(Outcome::Failed(err.clone()));
        }
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_protocol<T: fmt::Debug>(res: Result<T>) {
        assert!(
            matches!(res, Err(Error::Protocol { .. })),
            "expected protocol error, got {res:?}"
        );
    }

    #[test]
    fn unary_lifecycle() {
        let mut call = Call::new("GetFeature", CallShape::Unary);
        assert_eq!(call.state(), &CallState::Open);

        call.on_request().unwrap();
        assert_eq!(call.state(), &CallState::HalfClosed);
        assert_protocol(call.on_request());

        assert_protocol(call.complete());
        call.on_reply().unwrap();
        assert_protocol(call.on_reply());
        call.complete().unwrap();

        assert_eq!(call.state(), &CallState::Closed(Outcome::Completed));
        assert_eq!((call.requests(), call.replies()), (1, 1));
    }

    #[test]
    fn unary_reply_after_abandon_is_rejected() {
        let mut call = Call::new("GetFeature", CallShape::Unary);
        call.on_request().unwrap();

        let budget = Duration::from_secs(10);
        let err = call.fail(Error::Timeout { budget });
        assert_eq!(err, Error::Timeout { budget });

        assert_protocol(call.on_reply());
        assert_eq!(call.replies(), 0);
        assert_eq!(
            call.state(),
            &CallState::Closed(Outcome::Failed(Error::Timeout { budget }))
        );
    }

    #[test]
    fn server_streaming_allows_many_or_no_replies() {
        let mut call = Call::new("ListFeatures", CallShape::ServerStreaming);
        call.on_request().unwrap();
        for _ in 0..5 {
            call.on_reply().unwrap();
        }
        call.complete().unwrap();
        assert_eq!(call.replies(), 5);

        let mut empty = Call::new("ListFeatures", CallShape::ServerStreaming);
        empty.on_request().unwrap();
        empty.complete().unwrap();
        assert!(empty.is_closed());
        assert_protocol(empty.on_reply());
    }

    #[test]
    fn server_streaming_cannot_half_close_explicitly() {
        let mut call = Call::new("ListFeatures", CallShape::ServerStreaming);
        assert_protocol(call.half_close());
    }

    #[test]
    fn client_streaming_replies_only_after_half_close() {
        let mut call = Call::new("RecordRoute", CallShape::ClientStreaming);
        for _ in 0..3 {
            call.on_request().unwrap();
        }
        assert_eq!(call.state(), &CallState::Open);
        assert_protocol(call.on_reply());

        call.half_close().unwrap();
        assert_protocol(call.on_request());
        assert_protocol(call.half_close());

        call.on_reply().unwrap();
        assert_protocol(call.on_reply());
        call.complete().unwrap();
        assert_eq!(call.requests(), 3);
    }

    #[test]
    fn client_streaming_with_no_points() {
        let mut call = Call::new("RecordRoute", CallShape::ClientStreaming);
        call.half_close().unwrap();
        call.on_reply().unwrap();
        call.complete().unwrap();
        assert_eq!(call.requests(), 0);
    }

    #[test]
    fn broken_channel_before_half_close_fails_the_call() {
        let mut call = Call::new("RecordRoute", CallShape::ClientStreaming);
        call.on_request().unwrap();
        call.fail(Error::Transport {
            context: "connection reset".into(),
        });

        assert!(call.is_closed());
        assert_protocol(call.half_close());
        assert_protocol(call.on_reply());
        assert_protocol(call.complete());
    }

    #[test]
    fn first_outcome_wins() {
        let mut call = Call::new("GetFeature", CallShape::Unary);
        call.on_request().unwrap();
        call.on_reply().unwrap();
        call.complete().unwrap();

        call.fail(Error::RequestCancelled);
        assert_eq!(call.state(), &CallState::Closed(Outcome::Completed));
    }
}
