//! Republishes a live source to an upstream peer.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::live::consumer::Consumer;
use crate::live::shared_message::SharedMessage;

/// Sends a single corrected message upstream.
///
/// This crate implements an RTMP server only, never a client (there is no
/// handshake-as-client or command-writer-as-client here, see
/// [`crate::command_messages::error::CommandError::NoClientImplementation`]), so the
/// actual upstream dial and RTMP publish handshake are the embedder's
/// responsibility; [`Forwarder`] only drains the consumer queue and hands
/// completed messages to this trait.
pub trait ForwarderTransport: Send {
    /// Sends `msg` upstream, or returns an error to trigger a reconnect.
    fn send(&mut self, msg: &SharedMessage) -> impl Future<Output = std::io::Result<()>> + Send;
}

/// Drains a [`LiveSource`](super::source::LiveSource)'s forwarding consumer and
/// republishes every message to an upstream peer via a [`ForwarderTransport`].
///
/// On a transport error, the forwarder waits `retry_interval` and keeps draining
/// (messages produced during the outage are simply lost, consistent with this
/// server never backpressuring a publisher for a slow downstream).
pub struct Forwarder<T> {
    consumer: Arc<Consumer>,
    transport: T,
    retry_interval: Duration,
}

impl<T: ForwarderTransport> Forwarder<T> {
    /// Creates a forwarder draining `consumer` into `transport`.
    pub fn new(consumer: Arc<Consumer>, transport: T, retry_interval: Duration) -> Self {
        Self {
            consumer,
            transport,
            retry_interval,
        }
    }

    /// Runs until the source unpublishes (the consumer queue closes) or `ctx` is
    /// cancelled.
    pub async fn run(mut self, ctx: scuffle_context::Context) {
        loop {
            tokio::select! {
                _ = ctx.done() => return,
                messages = self.consumer.drain() => {
                    if messages.is_empty() {
                        // Source closed the queue: publisher is gone.
                        return;
                    }

                    for msg in &messages {
                        if let Err(err) = self.transport.send(msg).await {
                            tracing::warn!(error = %err, "forwarder transport error, retrying");
                            tokio::time::sleep(self.retry_interval).await;
                            break;
                        }
                    }
                }
            }
        }
    }
}
