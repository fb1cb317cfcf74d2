//! # Channel Listener
//!
//! Receiving side of the in-memory push bus.

use crate::events::ChannelEvent;
use std::pin::Pin;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::debug;

/// Errors from listener operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ListenerError {
    /// The bus was dropped.
    #[error("Push bus closed")]
    Closed,
}

/// Stream of [`ChannelEvent`]s emitted by an [`InMemoryPushBus`].
///
/// Lagging listeners skip the events they missed.
///
/// [`InMemoryPushBus`]: crate::InMemoryPushBus
pub struct ChannelListener {
    inner: BroadcastStream<ChannelEvent>,
}

impl ChannelListener {
    pub(crate) fn new(receiver: broadcast::Receiver<ChannelEvent>) -> Self {
        Self {
            inner: BroadcastStream::new(receiver),
        }
    }

    /// Receive the next event.
    ///
    /// Returns `None` once the bus is dropped.
    pub async fn recv(&mut self) -> Option<ChannelEvent> {
        StreamExt::next(self).await
    }

    /// Receive the next event, failing if the bus is gone.
    pub async fn recv_or_closed(&mut self) -> Result<ChannelEvent, ListenerError> {
        self.recv().await.ok_or(ListenerError::Closed)
    }
}

impl Stream for ChannelListener {
    type Item = ChannelEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(event))) => return Poll::Ready(Some(event)),
                Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(count)))) => {
                    debug!(lagged = count, "Listener lagged, some events dropped");
                    continue;
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
