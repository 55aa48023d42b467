//! The per-stream-key hub coupling one publisher to many players.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bytes::Bytes;

use crate::live::config::{LiveConfig, PublishPolicy};
use crate::live::consumer::Consumer;
use crate::live::error::LiveError;
use crate::live::gop_cache::GopCache;
use crate::live::shared_message::{MessageKind, SharedMessage};

/// A consumer registered with a [`LiveSource`], along with the id used to
/// unregister it again.
pub struct ConsumerHandle {
    /// Opaque id for this consumer, scoped to its source.
    pub id: u64,
    /// The consumer's queue.
    pub consumer: Arc<Consumer>,
}

/// Proof of holding the exclusive publisher slot as of a particular generation.
///
/// Returned by [`LiveSource::on_publish`] and required by every subsequent
/// publish-side call. A [`PublishPolicy::Replace`] takeover bumps the generation,
/// which silently turns every call made with the evicted publisher's stale token
/// into a no-op rather than letting its writes interleave with the new publisher's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublisherToken(u64);

struct SourceState {
    publishing: bool,
    publisher_generation: u64,
    disposing: bool,
    gop_cache: GopCache,
    metadata: Option<SharedMessage>,
    consumers: HashMap<u64, Arc<Consumer>>,
    forwarders: HashMap<u64, Arc<Consumer>>,
    next_consumer_id: u64,
    next_forwarder_id: u64,
}

impl SourceState {
    fn is_current_publisher(&self, token: PublisherToken) -> bool {
        self.publishing && self.publisher_generation == token.0
    }

    fn is_idle(&self) -> bool {
        !self.publishing && self.consumers.is_empty() && self.forwarders.is_empty()
    }
}

/// Couples exactly one publisher to any number of players for a single stream key.
///
/// Created lazily by a [`Registry`](super::registry::Registry) on first publish or
/// first play, and torn down once both the publisher and every consumer are gone.
pub struct LiveSource {
    key: String,
    config: LiveConfig,
    state: Mutex<SourceState>,
}

impl LiveSource {
    /// Creates a new, unpublished source for `key`.
    pub fn new(key: String, config: LiveConfig) -> Self {
        let gop_cache = GopCache::new(config.gop_cache);
        Self {
            key,
            config,
            state: Mutex::new(SourceState {
                publishing: false,
                publisher_generation: 0,
                disposing: false,
                gop_cache,
                metadata: None,
                consumers: HashMap::new(),
                forwarders: HashMap::new(),
                next_consumer_id: 0,
                next_forwarder_id: 0,
            }),
        }
    }

    /// The stream key this source was created for.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether a publisher is currently attached.
    pub fn is_publishing(&self) -> bool {
        self.state.lock().unwrap().publishing
    }

    /// Number of consumers currently attached.
    pub fn consumer_count(&self) -> usize {
        self.state.lock().unwrap().consumers.len()
    }

    /// Number of forwarders currently attached.
    pub fn forwarder_count(&self) -> usize {
        self.state.lock().unwrap().forwarders.len()
    }

    /// Whether this source has been marked for disposal by [`Self::mark_disposing`].
    ///
    /// A disposing source never accepts new publishers, consumers, or forwarders; a
    /// caller observing this should ask its [`Registry`](super::registry::Registry)
    /// for a fresh source under the same key instead of retrying against this one.
    pub fn is_disposing(&self) -> bool {
        self.state.lock().unwrap().disposing
    }

    /// Atomically marks this source as disposing if it is currently idle (no
    /// publisher, no consumers, no forwarders), returning whether it did so.
    ///
    /// Checking idleness and setting the flag under the same lock that every
    /// mutating entry point below also takes is what makes this race-free: once
    /// `disposing` is set, no later `on_publish`/`create_consumer`/
    /// `create_forwarder_consumer` call can sneak in and attach to a source that is
    /// about to be dropped from the registry.
    pub fn mark_disposing(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.is_idle() {
            state.disposing = true;
            true
        } else {
            false
        }
    }

    /// Claims the exclusive publisher slot for this source.
    ///
    /// Fails with [`LiveError::StreamBusy`] if another publisher is active and
    /// `policy` is [`PublishPolicy::Reject`]. Under [`PublishPolicy::Replace`], an
    /// active publisher is evicted instead: the generation counter is bumped, the
    /// GOP cache is cleared (the new publisher starts its own GOP), and the old
    /// publisher's token becomes stale. Consumers are left attached so playback
    /// continues seamlessly across the handoff.
    pub fn on_publish(&self, policy: PublishPolicy) -> Result<PublisherToken, LiveError> {
        let mut state = self.state.lock().unwrap();
        if state.disposing {
            return Err(LiveError::Disposing(self.key.clone()));
        }
        if state.publishing && policy == PublishPolicy::Reject {
            return Err(LiveError::StreamBusy(self.key.clone()));
        }
        if state.publishing {
            state.gop_cache.clear_gop();
        }
        state.publishing = true;
        state.publisher_generation += 1;
        Ok(PublisherToken(state.publisher_generation))
    }

    /// Releases the publisher slot and notifies every attached consumer and
    /// forwarder, provided `token` still names the current publisher generation.
    pub fn on_unpublish(&self, token: PublisherToken) {
        let mut state = self.state.lock().unwrap();
        if !state.is_current_publisher(token) {
            return;
        }
        state.publishing = false;
        state.gop_cache.clear_gop();
        for consumer in state.consumers.values().chain(state.forwarders.values()) {
            consumer.close();
        }
    }

    /// Stores and fans out an `onMetaData`/`@setDataFrame` message.
    pub fn on_meta_data(&self, token: PublisherToken, timestamp: u32, payload: Bytes) {
        let mut state = self.state.lock().unwrap();
        if !state.is_current_publisher(token) {
            return;
        }
        let msg = SharedMessage::new(MessageKind::Amf0, timestamp, payload);
        state.metadata = Some(msg.clone());
        for consumer in state.consumers.values().chain(state.forwarders.values()) {
            consumer.enqueue(msg.clone());
        }
    }

    /// Caches and fans out an audio message, carrying its raw publisher timestamp.
    ///
    /// Timestamps are corrected per-consumer, not here: each [`Consumer`] owns its
    /// own jitter corrector and `atc` setting, so the same raw message can be
    /// delivered as-is to one player and clamped for another.
    pub fn on_audio(&self, token: PublisherToken, timestamp: u32, payload: Bytes) {
        self.on_media(token, MessageKind::Audio, timestamp, payload);
    }

    /// Caches and fans out a video message, carrying its raw publisher timestamp.
    pub fn on_video(&self, token: PublisherToken, timestamp: u32, payload: Bytes) {
        self.on_media(token, MessageKind::Video, timestamp, payload);
    }

    fn on_media(&self, token: PublisherToken, kind: MessageKind, timestamp: u32, payload: Bytes) {
        let mut state = self.state.lock().unwrap();
        if !state.is_current_publisher(token) {
            return;
        }

        let msg = SharedMessage::new(kind, timestamp, payload);
        state.gop_cache.push(&msg);

        for consumer in state.consumers.values().chain(state.forwarders.values()) {
            consumer.enqueue(msg.clone());
        }
    }

    /// Registers a new player consumer and catches it up with cached metadata,
    /// sequence headers, and the current GOP, in that order.
    pub fn create_consumer(self: &Arc<Self>) -> Result<ConsumerHandle, LiveError> {
        self.create_catchup_consumer(false)
    }

    /// Registers a new forwarder consumer (e.g. for HLS/DVR fan-out), catching it up
    /// the same way a player consumer is.
    pub fn create_forwarder_consumer(self: &Arc<Self>) -> Result<ConsumerHandle, LiveError> {
        self.create_catchup_consumer(true)
    }

    fn create_catchup_consumer(self: &Arc<Self>, forwarder: bool) -> Result<ConsumerHandle, LiveError> {
        let mut state = self.state.lock().unwrap();
        if state.disposing {
            return Err(LiveError::Disposing(self.key.clone()));
        }

        let consumer = Arc::new(Consumer::new(&self.config));

        if let Some(metadata) = state.metadata.clone() {
            consumer.enqueue(metadata);
        }
        if let Some(audio_seq) = state.gop_cache.audio_sequence_header().cloned() {
            consumer.enqueue(audio_seq);
        }
        if let Some(video_seq) = state.gop_cache.video_sequence_header().cloned() {
            consumer.enqueue(video_seq);
        }
        for msg in state.gop_cache.gop() {
            consumer.enqueue(msg.clone());
        }

        let id = if forwarder {
            let id = state.next_forwarder_id;
            state.next_forwarder_id += 1;
            state.forwarders.insert(id, consumer.clone());
            id
        } else {
            let id = state.next_consumer_id;
            state.next_consumer_id += 1;
            state.consumers.insert(id, consumer.clone());
            id
        };

        Ok(ConsumerHandle { id, consumer })
    }

    /// Unregisters a player consumer, e.g. when the player disconnects.
    pub fn on_consumer_destroy(&self, id: u64) {
        self.state.lock().unwrap().consumers.remove(&id);
    }

    /// Unregisters a forwarder consumer, e.g. when its upstream gives up retrying.
    pub fn on_forwarder_destroy(&self, id: u64) {
        self.state.lock().unwrap().forwarders.remove(&id);
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;

    use super::*;

    #[test]
    fn test_at_most_one_publisher_rejects_by_default() {
        let source = LiveSource::new("live/test".into(), LiveConfig::default());
        assert!(source.on_publish(PublishPolicy::Reject).is_ok());
        assert!(matches!(
            source.on_publish(PublishPolicy::Reject),
            Err(LiveError::StreamBusy(_))
        ));
    }

    #[test]
    fn test_replace_policy_evicts_prior_publisher() {
        let source = LiveSource::new("live/test".into(), LiveConfig::default());
        let first = source.on_publish(PublishPolicy::Reject).unwrap();
        let second = source.on_publish(PublishPolicy::Replace).unwrap();
        assert_ne!(first, second);

        // The evicted publisher's token is now stale: its writes are no-ops.
        source.on_audio(first, 0, Bytes::from_static(&[0xAF, 0x01]));
        assert!(source.state.lock().unwrap().gop_cache.gop().is_empty());

        source.on_audio(second, 0, Bytes::from_static(&[0xAF, 0x01]));
        assert_eq!(source.state.lock().unwrap().gop_cache.gop().len(), 1);
    }

    #[test]
    fn test_unpublish_frees_slot() {
        let source = LiveSource::new("live/test".into(), LiveConfig::default());
        let token = source.on_publish(PublishPolicy::Reject).unwrap();
        source.on_unpublish(token);
        assert!(source.on_publish(PublishPolicy::Reject).is_ok());
    }

    #[test]
    fn test_stale_unpublish_token_is_ignored() {
        let source = LiveSource::new("live/test".into(), LiveConfig::default());
        let first = source.on_publish(PublishPolicy::Reject).unwrap();
        let _second = source.on_publish(PublishPolicy::Replace).unwrap();

        source.on_unpublish(first);
        // The current (second) publisher's slot is untouched by the stale unpublish.
        assert!(source.is_publishing());
    }

    #[test]
    fn test_new_consumer_receives_sequence_headers_before_gop() {
        let source = Arc::new(LiveSource::new("live/test".into(), LiveConfig::default()));
        let token = source.on_publish(PublishPolicy::Reject).unwrap();
        source.on_video(token, 0, Bytes::from_static(&[0x17, 0x00, 0x00])); // video seq header
        source.on_video(token, 10, Bytes::from_static(&[0x17, 0x01])); // keyframe

        let handle = source.create_consumer().unwrap();
        let _ = handle.consumer.enqueue(SharedMessage::new(MessageKind::Amf0, 0, Bytes::new()));

        let state = source.state.lock().unwrap();
        let cached_video_seq = state.gop_cache.video_sequence_header().cloned();
        assert!(cached_video_seq.is_some());
    }

    #[tokio::test]
    async fn test_unpublish_closes_consumers() {
        let source = Arc::new(LiveSource::new("live/test".into(), LiveConfig::default()));
        let token = source.on_publish(PublishPolicy::Reject).unwrap();
        let handle = source.create_consumer().unwrap();
        source.on_unpublish(token);
        // close() is synchronous; draining should immediately resolve with no messages.
        assert!(handle.consumer.drain().await.is_empty());
    }

    #[test]
    fn test_mark_disposing_requires_idle() {
        let source = Arc::new(LiveSource::new("live/test".into(), LiveConfig::default()));
        let handle = source.create_consumer().unwrap();
        assert!(!source.mark_disposing());

        source.on_consumer_destroy(handle.id);
        assert!(source.mark_disposing());
        assert!(source.is_disposing());
    }

    #[test]
    fn test_disposing_source_rejects_new_attachments() {
        let source = Arc::new(LiveSource::new("live/test".into(), LiveConfig::default()));
        assert!(source.mark_disposing());

        assert!(matches!(
            source.on_publish(PublishPolicy::Reject),
            Err(LiveError::Disposing(_))
        ));
        assert!(matches!(source.create_consumer(), Err(LiveError::Disposing(_))));
        assert!(matches!(source.create_forwarder_consumer(), Err(LiveError::Disposing(_))));
    }

    #[test]
    fn test_forwarders_receive_fanned_out_media() {
        let source = Arc::new(LiveSource::new("live/test".into(), LiveConfig::default()));
        let token = source.on_publish(PublishPolicy::Reject).unwrap();
        let forwarder = source.create_forwarder_consumer().unwrap();

        source.on_audio(token, 0, Bytes::from_static(&[0xAF, 0x01]));
        assert_eq!(source.forwarder_count(), 1);

        source.on_forwarder_destroy(forwarder.id);
        assert_eq!(source.forwarder_count(), 0);
    }
}
