//! Chunk-level types shared by the reader and writer.

use bytes::Bytes;

use crate::messages::MessageType;

nutype_enum::nutype_enum! {
    /// The format of a chunk's basic + message header, RTMP 1.0 5.3.1.
    pub enum ChunkType(u8) {
        Type0 = 0,
        Type1 = 1,
        Type2 = 2,
        Type3 = 3,
    }
}

/// Preferred chunk stream ids for each message category (RTMP 1.0 does not mandate
/// these, but a fixed assignment avoids id churn across many simultaneous streams).
pub const CHUNK_STREAM_ID_PROTOCOL_CONTROL: u32 = 2;
pub const CHUNK_STREAM_ID_COMMAND: u32 = 3;
pub const CHUNK_STREAM_ID_DATA: u32 = 5;
pub const CHUNK_STREAM_ID_AUDIO: u32 = 6;
pub const CHUNK_STREAM_ID_VIDEO: u32 = 6;

/// Default chunk size until either side sends `SetChunkSize`, RTMP 1.0 5.4.1.
pub const INIT_CHUNK_SIZE: usize = 128;

/// Outbound chunk size this server uses once a session is established.
pub const CHUNK_SIZE: usize = 60000;

/// Chunk stream ids 0 and 1 are reserved for extended basic-header encodings and can
/// never identify a real message stream.
pub const MIN_CHUNK_STREAM_ID: u32 = 2;

/// Hard ceiling on a single message's reassembled payload, RTMP chunk streams have no
/// built-in limit but unbounded buffering is a memory-exhaustion vector.
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ChunkBasicHeader {
    pub(super) format: ChunkType,
    pub chunk_stream_id: u32,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ChunkMessageHeader {
    pub timestamp: u32,
    pub msg_length: u32,
    pub msg_type_id: MessageType,
    pub msg_stream_id: u32,
    pub(super) was_extended_timestamp: bool,
}

impl ChunkMessageHeader {
    #[inline]
    pub fn is_extended_timestamp(&self) -> bool {
        self.timestamp >= 0xFFFFFF
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Chunk {
    pub basic_header: ChunkBasicHeader,
    pub message_header: ChunkMessageHeader,
    pub payload: Bytes,
}

impl Chunk {
    pub fn new(chunk_stream_id: u32, timestamp: u32, msg_type_id: MessageType, msg_stream_id: u32, payload: Bytes) -> Self {
        Self {
            basic_header: ChunkBasicHeader {
                chunk_stream_id,
                format: ChunkType::Type0,
            },
            message_header: ChunkMessageHeader {
                timestamp,
                msg_length: payload.len() as u32,
                msg_type_id,
                msg_stream_id,
                was_extended_timestamp: false,
            },
            payload,
        }
    }
}
