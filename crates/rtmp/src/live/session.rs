//! A [`SessionHandler`] that bridges RTMP session events into the live source graph.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::command_messages::UnknownCommand;
use crate::live::registry::Registry;
use crate::live::shared_message::MessageKind;
use crate::live::source::{LiveSource, PublisherToken};
use crate::session::server::{PlayEvent, PlayedMessage, PlayedMessageKind, ServerSessionError, SessionData, SessionHandler};

/// How many batches a played connection buffers before the consumer queue's own
/// overflow policy (not this channel) starts shedding load; this just decouples the
/// consumer's drain loop from the session's write loop.
const PLAY_CHANNEL_CAPACITY: usize = 128;

/// Bridges one RTMP connection to a [`Registry`] of live sources.
///
/// Handles `publish` by claiming the publisher slot on the resolved source and
/// routing subsequent audio/video/metadata into it; handles `play` by creating a
/// consumer and forwarding its queue, merged-write batched, into the channel the
/// session drains.
pub struct LiveSessionHandler {
    registry: Registry,
    vhost: Option<String>,
    publishing: Option<(Arc<LiveSource>, u32, PublisherToken)>,
    playing: Option<(Arc<LiveSource>, u64)>,
}

impl LiveSessionHandler {
    /// Creates a handler bridging sessions into `registry`. `vhost` is the resolved
    /// virtual host for this connection (see [`crate::live::request::extract_vhost`]),
    /// or `None` to use the registry's default.
    pub fn new(registry: Registry, vhost: Option<String>) -> Self {
        Self {
            registry,
            vhost,
            publishing: None,
            playing: None,
        }
    }
}

impl SessionHandler for LiveSessionHandler {
    async fn on_publish(&mut self, stream_id: u32, app_name: &str, stream_name: &str) -> Result<(), ServerSessionError> {
        let key = Registry::stream_key(self.vhost.as_deref(), app_name, stream_name);
        let (source, token) = self.registry.claim_publisher(&key)?;
        self.publishing = Some((source, stream_id, token));
        Ok(())
    }

    async fn on_unpublish(&mut self, stream_id: u32) -> Result<(), ServerSessionError> {
        if let Some((source, publishing_stream_id, token)) = self.publishing.take() {
            if publishing_stream_id == stream_id {
                let key = source.key().to_string();
                source.on_unpublish(token);
                self.registry.dispose_if_idle(&key);
            } else {
                self.publishing = Some((source, publishing_stream_id, token));
            }
        }
        Ok(())
    }

    async fn on_data(&mut self, _stream_id: u32, data: SessionData) -> Result<(), ServerSessionError> {
        let Some((source, _, token)) = &self.publishing else {
            return Ok(());
        };

        match data {
            SessionData::Audio { timestamp, data } => source.on_audio(*token, timestamp, data),
            SessionData::Video { timestamp, data } => source.on_video(*token, timestamp, data),
            SessionData::Amf0 { timestamp, data } => source.on_meta_data(*token, timestamp, data),
        }

        Ok(())
    }

    async fn on_unknown_command(&mut self, _stream_id: u32, _command: UnknownCommand<'_>) -> Result<(), ServerSessionError> {
        // FMLE/FFmpeg-style publishers send releaseStream/FCPublish/FCUnpublish/FCSubscribe/
        // _checkbw/getStreamLength before or alongside the standard commands. None of them
        // need a reply beyond what the default no-op already provides; acknowledging with
        // silence keeps these publishers from stalling without special-casing each command.
        Ok(())
    }

    async fn on_play(
        &mut self,
        _stream_id: u32,
        app_name: &str,
        stream_name: &str,
        _reset: bool,
    ) -> Result<mpsc::Receiver<PlayEvent>, ServerSessionError> {
        let key = Registry::stream_key(self.vhost.as_deref(), app_name, stream_name);
        let (source, handle) = self.registry.attach_consumer(&key);
        let mw_latency = self.registry.config().mw_latency;

        let (tx, rx) = mpsc::channel(PLAY_CHANNEL_CAPACITY);
        let consumer = handle.consumer.clone();
        tokio::spawn(async move {
            loop {
                let messages = consumer.drain().await;
                if messages.is_empty() {
                    let _ = tx.send(PlayEvent::SourceEnded).await;
                    return;
                }

                let mut batch: Vec<PlayedMessage> = messages.into_iter().map(to_played_message).collect();

                // Accumulate further drains for up to `mw_latency` before flushing the batch,
                // amortizing the per-write syscall cost over several frames' worth of media.
                if !mw_latency.is_zero() {
                    let deadline = tokio::time::sleep(mw_latency);
                    tokio::pin!(deadline);

                    loop {
                        tokio::select! {
                            _ = &mut deadline => break,
                            more = consumer.drain() => {
                                if more.is_empty() {
                                    // Source closed mid-accumulation: flush what we have, then
                                    // report the end on the next loop iteration.
                                    break;
                                }
                                batch.extend(more.into_iter().map(to_played_message));
                            }
                        }
                    }
                }

                if tx.send(PlayEvent::Messages(batch)).await.is_err() {
                    return;
                }
            }
        });

        self.playing = Some((source, handle.id));

        Ok(rx)
    }
}

fn to_played_message(msg: crate::live::shared_message::SharedMessage) -> PlayedMessage {
    let kind = match msg.kind {
        MessageKind::Audio => PlayedMessageKind::Audio,
        MessageKind::Video => PlayedMessageKind::Video,
        MessageKind::Amf0 => PlayedMessageKind::Amf0,
    };
    PlayedMessage {
        timestamp: msg.timestamp,
        kind,
        data: msg.payload,
    }
}

impl Drop for LiveSessionHandler {
    fn drop(&mut self) {
        if let Some((source, _, token)) = self.publishing.take() {
            let key = source.key().to_string();
            source.on_unpublish(token);
            self.registry.dispose_if_idle(&key);
        }
        if let Some((source, consumer_id)) = self.playing.take() {
            let key = source.key().to_string();
            source.on_consumer_destroy(consumer_id);
            self.registry.dispose_if_idle(&key);
        }
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::live::config::{LiveConfig, PublishPolicy};

    #[tokio::test]
    async fn test_publish_then_unpublish_releases_source() {
        let registry = Registry::new(LiveConfig::default());
        let mut handler = LiveSessionHandler::new(registry.clone(), None);

        handler.on_publish(1, "live", "abc").await.unwrap();
        assert!(registry.find("_default_/live/abc").unwrap().is_publishing());

        handler.on_unpublish(1).await.unwrap();
        assert!(registry.find("_default_/live/abc").is_none());
    }

    #[tokio::test]
    async fn test_publish_rejects_second_publisher() {
        let registry = Registry::new(LiveConfig::default());
        let mut a = LiveSessionHandler::new(registry.clone(), None);
        let mut b = LiveSessionHandler::new(registry.clone(), None);

        a.on_publish(1, "live", "abc").await.unwrap();
        assert!(b.on_publish(2, "live", "abc").await.is_err());
    }

    #[tokio::test]
    async fn test_publish_replace_policy_evicts_prior_publisher() {
        let mut config = LiveConfig::default();
        config.exclusive_agent = PublishPolicy::Replace;
        let registry = Registry::new(config);
        let mut a = LiveSessionHandler::new(registry.clone(), None);
        let mut b = LiveSessionHandler::new(registry.clone(), None);

        a.on_publish(1, "live", "abc").await.unwrap();
        b.on_publish(2, "live", "abc").await.unwrap();

        // a's writes are now stale no-ops; unpublishing from a must not clear the slot.
        a.on_unpublish(1).await.unwrap();
        assert!(registry.find("_default_/live/abc").unwrap().is_publishing());
    }

    #[tokio::test]
    async fn test_on_data_forwards_to_source() {
        let registry = Registry::new(LiveConfig::default());
        let mut handler = LiveSessionHandler::new(registry.clone(), None);
        handler.on_publish(1, "live", "abc").await.unwrap();

        handler
            .on_data(1, SessionData::Video {
                timestamp: 0,
                data: Bytes::from_static(&[0x17, 0x01]),
            })
            .await
            .unwrap();

        let source = registry.find("_default_/live/abc").unwrap();
        assert_eq!(source.consumer_count(), 0);
    }

    #[tokio::test]
    async fn test_play_creates_consumer() {
        let mut config = LiveConfig::default();
        config.mw_latency = std::time::Duration::ZERO;
        let registry = Registry::new(config);
        let mut handler = LiveSessionHandler::new(registry.clone(), None);

        let mut rx = handler.on_play(1, "live", "abc", true).await.unwrap();

        let source = registry.find("_default_/live/abc").unwrap();
        assert_eq!(source.consumer_count(), 1);

        let token = source.on_publish(PublishPolicy::Reject).unwrap();
        source.on_video(token, 0, Bytes::from_static(&[0x17, 0x01]));

        let event = rx.recv().await.unwrap();
        let PlayEvent::Messages(messages) = event else {
            unreachable!("expected a batch of messages")
        };
        assert_eq!(messages[0].kind, PlayedMessageKind::Video);
    }

    #[tokio::test]
    async fn test_play_reports_source_ended_on_unpublish() {
        let mut config = LiveConfig::default();
        config.mw_latency = std::time::Duration::ZERO;
        let registry = Registry::new(config);
        let mut handler = LiveSessionHandler::new(registry.clone(), None);

        let mut rx = handler.on_play(1, "live", "abc", true).await.unwrap();
        let source = registry.find("_default_/live/abc").unwrap();
        let token = source.on_publish(PublishPolicy::Reject).unwrap();
        source.on_unpublish(token);

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, PlayEvent::SourceEnded));
    }
}
