//! Error types for the route guide service.
//!
//! This module defines the central `Error` enum, which captures every
//! reportable failure of the service and its client. It implements
//! `From<Error>` for `tonic::Status` so handlers can propagate errors to
//! clients with appropriate status codes, and `From<Status>` for `Error` so
//! the client can classify a failed call.
//!
//! ## Error Cases
//! - `Load`: The feature fixture is missing, unreadable, or malformed. Fatal
//!   at startup.
//! - `Transport`: The underlying channel broke mid-call.
//! - `ChannelError`: An internal communication failure between tasks.
//! - `StreamInterrupted`: A server stream failed after delivering some
//!   messages.
//! - `Timeout`: The client-side deadline elapsed before the call closed.
//! - `RequestCancelled`: The call was abandoned mid-flight.
//! - `InvalidRequest`: The request was malformed.
//! - `Protocol`: A call lifecycle rule was violated (e.g. a message after
//!   close).
//! - `ServiceShutdown`: A request arrived while the service was shutting down.
//!
//! A lookup that finds nothing is not an error: it yields a feature with an
//! empty name.

use core::time::Duration;
use tonic::{Code, Status};

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the route guide service.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// The feature source could not be read or parsed.
    #[error("Failed to load features from {path}: {reason}")]
    Load { path: String, reason: String },

    /// The transport channel broke before the call reached a terminal state.
    #[error("Transport error: {context}")]
    Transport { context: String },

    /// Internal channel send/receive failure (e.g., closed or full channel).
    #[error("Channel error: {context}")]
    ChannelError { context: String },

    /// A server stream failed after `delivered` messages were received.
    #[error("Stream interrupted after {delivered} messages: {reason}")]
    StreamInterrupted { delivered: usize, reason: String },

    /// The call did not complete within its deadline.
    #[error("Deadline of {budget:?} exceeded")]
    Timeout { budget: Duration },

    /// The call was abandoned.
    #[error("Request cancelled")]
    RequestCancelled,

    /// The request was invalid or malformed.
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// A message or signal was not permitted in the call's current state.
    #[error("Protocol violation: {reason}")]
    Protocol { reason: String },

    /// The service is in the process of shutting down.
    #[error("Service is shutting down")]
    ServiceShutdown,
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        match err {
            Error::Load { path, reason } => {
                Status::internal(format!("Failed to load features from {path}: {reason}"))
            }
            Error::Transport { context } => Status::unavailable(context),
            Error::ChannelError { context } => {
                Status::internal(format!("Channel error: {context}"))
            }
            Error::StreamInterrupted { delivered, reason } => Status::unavailable(format!(
                "Stream interrupted after {delivered} messages: {reason}"
            )),
            Error::Timeout { budget } => {
                Status::deadline_exceeded(format!("Deadline of {budget:?} exceeded"))
            }
            Error::RequestCancelled => Status::cancelled("Request was cancelled"),
            Error::InvalidRequest { reason } => Status::invalid_argument(reason),
            Error::Protocol { reason } => {
                Status::internal(format!("Protocol violation: {reason}"))
            }
            Error::ServiceShutdown => Status::unavailable("Service is shutting down"),
        }
    }
}

/// Classifies a status observed by the client.
///
/// The deadline budget is unknown at this level, so a `DeadlineExceeded`
/// status maps to a zero budget; [`crate::client`] substitutes the configured
/// one.
impl From<Status> for Error {
    fn from(status: Status) -> Self {
        match status.code() {
            Code::DeadlineExceeded => Error::Timeout {
                budget: Duration::ZERO,
            },
            Code::Cancelled => Error::RequestCancelled,
            Code::InvalidArgument => Error::InvalidRequest {
                reason: status.message().to_string(),
            },
            _ => Error::Transport {
                context: format!("{:?}: {}", status.code(), status.message()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_errors_to_status_codes() {
        let cases = [
            (
                Error::Load {
                    path: "db.json".into(),
                    reason: "missing".into(),
                },
                Code::Internal,
            ),
            (
                Error::Transport {
                    context: "reset".into(),
                },
                Code::Unavailable,
            ),
            (
                Error::Timeout {
                    budget: Duration::from_secs(10),
                },
                Code::DeadlineExceeded,
            ),
            (Error::RequestCancelled, Code::Cancelled),
            (
                Error::InvalidRequest {
                    reason: "missing lo".into(),
                },
                Code::InvalidArgument,
            ),
            (
                Error::Protocol {
                    reason: "closed".into(),
                },
                Code::Internal,
            ),
            (Error::ServiceShutdown, Code::Unavailable),
        ];

        for (err, code) in cases {
            assert_eq!(Status::from(err).code(), code);
        }
    }

    #[test]
    fn classifies_client_side_statuses() {
        assert!(matches!(
            Error::from(Status::deadline_exceeded("late")),
            Error::Timeout { .. }
        ));
        assert_eq!(
            Error::from(Status::cancelled("gone")),
            Error::RequestCancelled
        );
        assert_eq!(
            Error::from(Status::invalid_argument("bad rect")),
            Error::InvalidRequest {
                reason: "bad rect".into()
            }
        );
        assert!(matches!(
            Error::from(Status::unavailable("down")),
            Error::Transport { .. }
        ));
    }
}
