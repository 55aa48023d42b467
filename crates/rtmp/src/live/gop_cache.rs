//! Per-stream group-of-pictures cache.
//!
//! Retains enough of the current stream to let a newly attached consumer start
//! rendering immediately, without waiting for the next keyframe: the most recent
//! audio/video sequence headers, plus every message since the last video keyframe.

use crate::live::shared_message::{MessageKind, SharedMessage};

/// Caches sequence headers and the current GOP for a live source.
#[derive(Debug, Default)]
pub struct GopCache {
    enabled: bool,
    audio_sequence_header: Option<SharedMessage>,
    video_sequence_header: Option<SharedMessage>,
    gop: Vec<SharedMessage>,
}

impl GopCache {
    /// Creates a cache. When `enabled` is false, only sequence headers are retained,
    /// never the per-frame GOP buffer.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Default::default()
        }
    }

    /// The cached audio sequence header, if any has been published.
    pub fn audio_sequence_header(&self) -> Option<&SharedMessage> {
        self.audio_sequence_header.as_ref()
    }

    /// The cached video sequence header, if any has been published.
    pub fn video_sequence_header(&self) -> Option<&SharedMessage> {
        self.video_sequence_header.as_ref()
    }

    /// The messages cached since the last video keyframe, in publish order.
    pub fn gop(&self) -> &[SharedMessage] {
        &self.gop
    }

    /// Feeds a newly published message into the cache.
    pub fn push(&mut self, msg: &SharedMessage) {
        if msg.is_sequence_header() {
            match msg.kind {
                MessageKind::Audio => self.audio_sequence_header = Some(msg.clone()),
                MessageKind::Video => self.video_sequence_header = Some(msg.clone()),
                MessageKind::Amf0 => {}
            }
            return;
        }

        if !self.enabled {
            return;
        }

        match msg.kind {
            MessageKind::Video if msg.is_keyframe() => {
                self.gop.clear();
                self.gop.push(msg.clone());
            }
            MessageKind::Video => {
                // Only accumulate once a keyframe has started the current GOP, otherwise
                // a partial GOP would violate the "first video message is a keyframe" invariant.
                if !self.gop.is_empty() {
                    self.gop.push(msg.clone());
                }
            }
            MessageKind::Audio => {
                if self.gop.iter().any(|m| m.kind == MessageKind::Video) {
                    self.gop.push(msg.clone());
                }
            }
            MessageKind::Amf0 => {}
        }
    }

    /// Drops the accumulated GOP, e.g. on unpublish. Sequence headers are kept, since
    /// they describe the codec configuration, not a specific GOP.
    pub fn clear_gop(&mut self) {
        self.gop.clear();
    }
}
