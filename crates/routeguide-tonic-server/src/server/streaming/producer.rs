use core::pin::Pin;
use futures::{Stream, StreamExt, future, stream};
use routeguide_tonic_core::{
    Error,
    call::Call,
    features::FeatureStore,
    geo::Bounds,
    proto::Feature,
};
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tonic::Status;

/// Response body of a `ListFeatures` call as tonic sends it.
pub type FeatureResponseStream = Pin<Box<dyn Stream<Item = Result<Feature, Status>> + Send>>;

/// Joins the data channel and the terminal channel into one response stream.
///
/// Every buffered feature is yielded first. Once the producer has dropped its
/// data sender, the stream yields the terminal status if one was sent, or
/// ends cleanly (`OK`) if the terminal sender was dropped unused. The
/// terminal never waits for data capacity, so a full buffer cannot turn a
/// failed stream into a truncated success.
pub fn response_stream(
    data: mpsc::Receiver<Feature>,
    terminal: oneshot::Receiver<Status>,
) -> FeatureResponseStream {
    let terminal = stream::once(terminal)
        .filter_map(|status| future::ready(status.ok().map(Err::<Feature, Status>)));
    Box::pin(ReceiverStream::new(data).map(Ok).chain(terminal))
}

/// Runs [`feed_features`] and reports its failure on `terminal`.
///
/// On success `terminal` is dropped unused and the response ends with `OK`.
pub async fn drive_features(
    call: Call,
    store: FeatureStore,
    bounds: Bounds,
    data: mpsc::Sender<Feature>,
    terminal: oneshot::Sender<Status>,
    shutdown: CancellationToken,
) -> routeguide_tonic_core::Result<u64> {
    let result = feed_features(call, store, bounds, data, shutdown).await;
    if let Err(err) = &result {
        // Fails only when the client is already gone.
        if terminal.send(err.clone().into()).is_err() {
            #[cfg(feature = "tracing")]
            tracing::debug!("Client left before the terminal status: {err}");
        }
    }
    result
}

/// Streams every stored feature inside `bounds` back to the client.
///
/// This is the producing half of a `ListFeatures` call. It walks the store
/// lazily, in load order, and forwards each feature over `resp_tx`. The
/// channel is bounded, so `send` suspends whenever the client is not keeping
/// up, and at most `stream_buffer_size` features are ever waiting in memory.
///
/// Returning drops `resp_tx`, which ends the data half of the response.
/// Whether the call then ends with `OK` or an error is decided by
/// [`drive_features`].
///
/// # Behavior
///
/// - Exits early with [`Error::ChannelError`] if the client disconnects
///   (the receiver was dropped).
/// - Exits early with [`Error::ServiceShutdown`] if `shutdown` is cancelled.
/// - Returns the number of features sent.
pub async fn feed_features(
    mut call: Call,
    store: FeatureStore,
    bounds: Bounds,
    resp_tx: mpsc::Sender<Feature>,
    shutdown: CancellationToken,
) -> routeguide_tonic_core::Result<u64> {
    for feature in store.list_in_range(&bounds) {
        call.on_reply()?;

        tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                return Err(call.fail(Error::ServiceShutdown));
            }
            sent = resp_tx.send(feature.clone()) => {
                if let Err(e) = sent {
                    return Err(call.fail(Error::ChannelError {
                        context: format!("Failed to forward feature: {e}"),
                    }));
                }
            }
        }
    }

    call.complete()?;
    Ok(call.replies())
}
