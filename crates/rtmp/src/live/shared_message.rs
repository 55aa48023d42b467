//! A single media or metadata message, shared by reference across every consumer
//! queue it is enqueued into.

use bytes::Bytes;

/// What kind of payload a [`SharedMessage`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// FLV AUDIODATA, as received via [`crate::session::SessionData::Audio`].
    Audio,
    /// FLV VIDEODATA, as received via [`crate::session::SessionData::Video`].
    Video,
    /// AMF0 data message (e.g. `@setDataFrame`/`onMetaData`).
    Amf0,
}

/// A message produced by a publisher, cheaply cloned into many consumer queues.
///
/// The payload is a [`Bytes`], which is already reference counted, so cloning a
/// [`SharedMessage`] never copies the underlying media bytes.
#[derive(Debug, Clone)]
pub struct SharedMessage {
    /// What kind of payload this is.
    pub kind: MessageKind,
    /// The corrected timestamp of this message, in milliseconds.
    pub timestamp: u32,
    /// The raw payload.
    pub payload: Bytes,
}

impl SharedMessage {
    /// Creates a new shared message.
    pub fn new(kind: MessageKind, timestamp: u32, payload: Bytes) -> Self {
        Self { kind, timestamp, payload }
    }

    /// Returns a copy of this message with a different timestamp.
    ///
    /// Used by the jitter corrector to rewrite timestamps per-consumer without
    /// copying the payload.
    pub fn with_timestamp(&self, timestamp: u32) -> Self {
        Self {
            kind: self.kind,
            timestamp,
            payload: self.payload.clone(),
        }
    }

    /// Whether this message is an AAC/AVC sequence header (AudioSpecificConfig or
    /// SPS/PPS), required before a decoder can make sense of subsequent frames.
    pub fn is_sequence_header(&self) -> bool {
        match self.kind {
            MessageKind::Audio => self.payload.len() >= 2 && (self.payload[0] >> 4) == 10 && self.payload[1] == 0,
            MessageKind::Video => self.payload.len() >= 2 && (self.payload[0] & 0x0f) == 7 && self.payload[1] == 0,
            MessageKind::Amf0 => false,
        }
    }

    /// Whether this is a video keyframe (FLV frame type 1).
    pub fn is_keyframe(&self) -> bool {
        self.kind == MessageKind::Video && !self.payload.is_empty() && (self.payload[0] >> 4) == 1
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_is_sequence_header() {
        let audio_seq = SharedMessage::new(MessageKind::Audio, 0, Bytes::from_static(&[0xAF, 0x00, 0x12, 0x34]));
        assert!(audio_seq.is_sequence_header());

        let audio_frame = SharedMessage::new(MessageKind::Audio, 0, Bytes::from_static(&[0xAF, 0x01, 0x00]));
        assert!(!audio_frame.is_sequence_header());

        let video_seq = SharedMessage::new(MessageKind::Video, 0, Bytes::from_static(&[0x17, 0x00, 0x00, 0x00, 0x00]));
        assert!(video_seq.is_sequence_header());
    }

    #[test]
    fn test_is_keyframe() {
        let keyframe = SharedMessage::new(MessageKind::Video, 0, Bytes::from_static(&[0x17, 0x01]));
        assert!(keyframe.is_keyframe());

        let interframe = SharedMessage::new(MessageKind::Video, 0, Bytes::from_static(&[0x27, 0x01]));
        assert!(!interframe.is_keyframe());
    }

    #[test]
    fn test_with_timestamp_preserves_payload() {
        let msg = SharedMessage::new(MessageKind::Video, 10, Bytes::from_static(&[0x17, 0x01]));
        let rewritten = msg.with_timestamp(20);
        assert_eq!(rewritten.timestamp, 20);
        assert_eq!(rewritten.payload, msg.payload);
    }
}
