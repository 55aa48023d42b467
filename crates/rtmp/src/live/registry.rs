//! Process-wide mapping from stream key to live source.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::live::config::LiveConfig;
use crate::live::error::LiveError;
use crate::live::forwarder::{Forwarder, ForwarderTransport};
use crate::live::source::{ConsumerHandle, LiveSource, PublisherToken};

/// Owns every [`LiveSource`] in the process, keyed by `vhost/app/stream`.
#[derive(Clone)]
pub struct Registry {
    config: LiveConfig,
    sources: Arc<Mutex<HashMap<String, Arc<LiveSource>>>>,
}

impl Registry {
    /// Creates an empty registry using `config` for every source it creates.
    pub fn new(config: LiveConfig) -> Self {
        Self {
            config,
            sources: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The configuration shared by every source this registry creates.
    pub fn config(&self) -> &LiveConfig {
        &self.config
    }

    /// Returns the source for `key`, creating it if this is the first reference to
    /// it, or if the existing entry is disposing (in which case it is replaced with
    /// a fresh source rather than handed back to the caller).
    pub fn find_or_create(&self, key: &str) -> Arc<LiveSource> {
        let mut sources = self.sources.lock().unwrap();
        if let Some(existing) = sources.get(key) {
            if !existing.is_disposing() {
                return existing.clone();
            }
        }
        let source = Arc::new(LiveSource::new(key.to_string(), self.config.clone()));
        sources.insert(key.to_string(), source.clone());
        source
    }

    /// Returns the source for `key` without creating it. A disposing source is
    /// reported as absent, since it is about to be removed from the map.
    pub fn find(&self, key: &str) -> Option<Arc<LiveSource>> {
        let source = self.sources.lock().unwrap().get(key).cloned()?;
        if source.is_disposing() { None } else { Some(source) }
    }

    /// Removes `key`'s entry if it has neither a publisher nor any consumer or
    /// forwarder left.
    ///
    /// Called opportunistically after a publisher, consumer, or forwarder detaches;
    /// a source that still has another side attached is left in place. Marking the
    /// source disposing and removing it from the map happen under the registry's
    /// lock, but the idle check itself is done by [`LiveSource::mark_disposing`]
    /// under the source's own lock, which is what actually closes the race against a
    /// concurrent `find_or_create`/`create_consumer`/`on_publish`.
    pub fn dispose_if_idle(&self, key: &str) {
        let mut sources = self.sources.lock().unwrap();
        if let Some(source) = sources.get(key) {
            if source.mark_disposing() {
                sources.remove(key);
            }
        }
    }

    /// Claims the exclusive publisher slot for `key`'s source, retrying against a
    /// fresh source if the one this call first finds is mid-disposal.
    pub fn claim_publisher(&self, key: &str) -> Result<(Arc<LiveSource>, PublisherToken), LiveError> {
        loop {
            let source = self.find_or_create(key);
            match source.on_publish(self.config.exclusive_agent) {
                Ok(token) => return Ok((source, token)),
                Err(LiveError::Disposing(_)) => continue,
                Err(err) => return Err(err),
            }
        }
    }

    /// Attaches a new player consumer to `key`'s source, creating the source if
    /// needed and retrying if it is mid-disposal.
    pub fn attach_consumer(&self, key: &str) -> (Arc<LiveSource>, ConsumerHandle) {
        loop {
            let source = self.find_or_create(key);
            match source.create_consumer() {
                Ok(handle) => return (source, handle),
                Err(LiveError::Disposing(_)) => continue,
                Err(err) => unreachable!("create_consumer only fails with Disposing: {err}"),
            }
        }
    }

    /// Attaches a forwarder to an already-live source for `key` and spawns it,
    /// calling back into the source to release the slot once the forwarder stops.
    ///
    /// Unlike [`Self::attach_consumer`], this never creates a source: forwarding
    /// only makes sense against a stream that is actually live.
    pub fn attach_forwarder<T: ForwarderTransport + Send + 'static>(
        &self,
        key: &str,
        transport: T,
        ctx: scuffle_context::Context,
    ) -> Result<(), LiveError> {
        let source = self.find(key).ok_or_else(|| LiveError::StreamNotFound(key.to_string()))?;
        let handle = source
            .create_forwarder_consumer()
            .map_err(|_| LiveError::StreamNotFound(key.to_string()))?;

        let forwarder = Forwarder::new(handle.consumer, transport, self.config.forwarder_retry_interval);
        tokio::spawn(async move {
            forwarder.run(ctx).await;
            source.on_forwarder_destroy(handle.id);
        });

        Ok(())
    }

    /// Builds the canonical stream key for a connection's app name, stream name, and
    /// vhost.
    ///
    /// `vhost` defaults to `_default_` when the connecting client didn't specify one
    /// in its `tcUrl`, matching the convention used throughout the source material
    /// this crate is grounded on.
    pub fn stream_key(vhost: Option<&str>, app: &str, stream: &str) -> String {
        format!("{}/{app}/{stream}", vhost.unwrap_or("_default_"))
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;
    use crate::live::config::PublishPolicy;

    #[test]
    fn test_find_or_create_is_idempotent() {
        let registry = Registry::new(LiveConfig::default());
        let a = registry.find_or_create("_default_/live/stream");
        let b = registry.find_or_create("_default_/live/stream");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_dispose_removes_idle_source() {
        let registry = Registry::new(LiveConfig::default());
        registry.find_or_create("_default_/live/stream");
        registry.dispose_if_idle("_default_/live/stream");
        assert!(registry.find("_default_/live/stream").is_none());
    }

    #[test]
    fn test_dispose_keeps_active_publisher() {
        let registry = Registry::new(LiveConfig::default());
        let source = registry.find_or_create("_default_/live/stream");
        source.on_publish(PublishPolicy::Reject).unwrap();
        registry.dispose_if_idle("_default_/live/stream");
        assert!(registry.find("_default_/live/stream").is_some());
    }

    #[test]
    fn test_find_or_create_replaces_disposing_entry() {
        let registry = Registry::new(LiveConfig::default());
        let stale = registry.find_or_create("_default_/live/stream");
        assert!(stale.mark_disposing());

        let fresh = registry.find_or_create("_default_/live/stream");
        assert!(!Arc::ptr_eq(&stale, &fresh));
        assert!(!fresh.is_disposing());
    }

    #[test]
    fn test_claim_publisher_retries_past_disposing_entry() {
        let registry = Registry::new(LiveConfig::default());
        let stale = registry.find_or_create("_default_/live/stream");
        assert!(stale.mark_disposing());

        let (source, _token) = registry.claim_publisher("_default_/live/stream").unwrap();
        assert!(!Arc::ptr_eq(&source, &stale));
        assert!(source.is_publishing());
    }

    #[test]
    fn test_attach_forwarder_requires_existing_source() {
        let registry = Registry::new(LiveConfig::default());
        struct NoopTransport;
        impl ForwarderTransport for NoopTransport {
            async fn send(&mut self, _msg: &crate::live::shared_message::SharedMessage) -> std::io::Result<()> {
                Ok(())
            }
        }

        let (ctx, _handler) = scuffle_context::Context::new();
        let err = registry.attach_forwarder("_default_/live/stream", NoopTransport, ctx).unwrap_err();
        assert!(matches!(err, LiveError::StreamNotFound(_)));
    }

    #[test]
    fn test_stream_key_defaults_vhost() {
        assert_eq!(Registry::stream_key(None, "live", "abc"), "_default_/live/abc");
        assert_eq!(Registry::stream_key(Some("example.com"), "live", "abc"), "example.com/live/abc");
    }
}
