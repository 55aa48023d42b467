//! Message types and definitions.

use bytes::Bytes;

use crate::command_messages::Command;
use crate::protocol_control_messages::{
    ProtocolControlMessageSetChunkSize, ProtocolControlMessageWindowAcknowledgementSize,
};

pub mod reader;

/// Different types of messages that can be sent or received.
///
/// Defined by:
/// - Legacy RTMP spec, 5.4
#[derive(Debug)]
pub enum MessageData<'a> {
    /// Set Chunk Size message
    SetChunkSize(ProtocolControlMessageSetChunkSize),
    /// Abort message. We don't reassemble partial chunks across an abort, so there is
    /// nothing to act on here.
    Abort,
    /// Acknowledgement message. We track bytes read for our own acknowledgement
    /// sending but don't need to react to the peer's.
    Acknowledgement,
    /// User control message (ping, stream begin/eof, and friends). Not currently acted
    /// on by the server.
    UserControlEvent,
    /// Set Acknowledgement Window Size message
    SetAcknowledgementWindowSize(ProtocolControlMessageWindowAcknowledgementSize),
    /// Set Peer Bandwidth message. Only ever sent by this server, never acted on when
    /// received.
    SetPeerBandwidth,
    /// Command message
    ///
    /// > Command messages carry the AMF-encoded commands between the client and the server.
    Amf0Command(Command<'a>),
    /// AMF3-encoded metadata message. Clients speak AMF0 with this server.
    DataAmf3,
    /// AMF3-encoded shared object message. Unused.
    SharedObjAmf3,
    /// AMF3-encoded command message. Unused.
    CommandAmf3,
    /// Metadata message
    ///
    /// > The client or the server sends this message to send Metadata or any
    /// > user data to the peer. Metadata includes details about the
    /// > data(audio, video etc.) like creation time, duration, theme and so on.
    DataAmf0 {
        /// The metadata.
        data: Bytes,
    },
    /// AMF0-encoded shared object message. Unused.
    SharedObjAmf0,
    /// Audio message
    ///
    /// > The client or the server sends this message to send audio data to the peer.
    ///
    /// Usually contains FLV AUDIODATA.
    AudioData {
        /// The audio data.
        data: Bytes,
    },
    /// Video message
    ///
    /// > The client or the server sends this message to send video data to the peer.
    ///
    /// Usually contains FLV VIDEODATA.
    VideoData {
        /// The video data.
        data: Bytes,
    },
    /// Aggregate message: a sequence of FLV-tag-encoded sub-messages concatenated
    /// into one chunk payload, each carrying its own type and timestamp.
    Aggregate(Vec<AggregateSubMessage>),
    /// Any message type we don't recognize at all, preserved verbatim.
    Unknown(UnknownMessage),
}

/// A message whose type id this server does not assign any particular meaning to.
#[derive(Debug, Clone)]
pub struct UnknownMessage {
    /// The raw message type id from the chunk's message header.
    pub msg_type_id: MessageType,
    /// The unparsed message payload.
    pub data: Bytes,
}

/// One FLV-tag-encoded entry inside an `Aggregate` message, already split out of the
/// concatenated payload with its absolute timestamp resolved.
#[derive(Debug, Clone)]
pub struct AggregateSubMessage {
    /// The sub-tag's message type, e.g. `MessageType::Audio`/`Video`/`DataAMF0`.
    pub msg_type_id: MessageType,
    /// Absolute timestamp, derived from the aggregate's own timestamp plus this
    /// sub-tag's offset from the aggregate's first sub-tag.
    pub timestamp: u32,
    /// The sub-tag's payload, excluding its FLV tag header and trailing backpointer.
    pub data: Bytes,
}

nutype_enum::nutype_enum! {
    /// One byte field to represent the message type.
    ///
    /// A range of type IDs (1-6) are reserved for protocol control messages.
    pub enum MessageType(u8) {
        // Protocol Control Messages
        /// Set Chunk Size
        SetChunkSize = 1,
        /// Abort
        Abort = 2,
        /// Acknowledgement
        Acknowledgement = 3,
        /// User Control Messages
        UserControlEvent = 4,
        /// Window Acknowledgement Size
        WindowAcknowledgementSize = 5,
        /// Set Peer Bandwidth
        SetPeerBandwidth = 6,
        // RTMP Command Messages
        /// Audio Data
        Audio = 8,
        /// Video Data
        Video = 9,
        /// Amf3-encoded Metadata
        DataAMF3 = 15,
        /// Amf3-encoded Shared Object
        SharedObjAMF3 = 16,
        /// Amf3-encoded Command
        CommandAMF3 = 17,
        /// Amf0-encoded Metadata
        DataAMF0 = 18,
        /// Amf0-encoded Shared Object
        SharedObjAMF0 = 19,
        /// Amf0-encoded Command
        CommandAMF0 = 20,
        /// Aggregate Message
        Aggregate = 22,
    }
}
