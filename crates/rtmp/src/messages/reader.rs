//! Reading [`MessageData`].

use byteorder::{BigEndian, ReadBytesExt};
use bytes::Bytes;

use super::{AggregateSubMessage, MessageData, MessageType, UnknownMessage};
use crate::chunk::Chunk;
use crate::command_messages::Command;
use crate::protocol_control_messages::{
    ProtocolControlMessageSetChunkSize, ProtocolControlMessageWindowAcknowledgementSize,
};

/// Size of an FLV tag header: type (1) + data size (3) + timestamp (3) + timestamp
/// extension (1) + stream id (3).
const FLV_TAG_HEADER_SIZE: usize = 11;
/// Size of the backpointer FLV appends after each tag's data.
const FLV_BACK_POINTER_SIZE: usize = 4;

impl MessageData<'_> {
    /// Reads [`MessageData`] from the given chunk.
    pub fn read(chunk: &Chunk) -> Result<Self, crate::error::RtmpError> {
        match chunk.message_header.msg_type_id {
            // Protocol Control Messages
            MessageType::SetChunkSize => {
                let data = ProtocolControlMessageSetChunkSize::read(&chunk.payload)?;
                Ok(Self::SetChunkSize(data))
            }
            MessageType::Abort => Ok(Self::Abort), // Not implemented
            MessageType::Acknowledgement => Ok(Self::Acknowledgement), // Not implemented
            MessageType::UserControlEvent => Ok(Self::UserControlEvent), // Not implemented
            MessageType::WindowAcknowledgementSize => {
                let data = ProtocolControlMessageWindowAcknowledgementSize::read(&chunk.payload)?;
                Ok(Self::SetAcknowledgementWindowSize(data))
            }
            MessageType::SetPeerBandwidth => Ok(Self::SetPeerBandwidth), // Not implemented
            // RTMP Command Messages
            MessageType::Audio => Ok(Self::AudioData {
                data: chunk.payload.clone(),
            }),
            MessageType::Video => Ok(Self::VideoData {
                data: chunk.payload.clone(),
            }),
            MessageType::DataAMF3 => Ok(Self::DataAmf3), // Not implemented
            MessageType::SharedObjAMF3 => Ok(Self::SharedObjAmf3), // Not implemented
            MessageType::CommandAMF3 => Ok(Self::CommandAmf3), // Not implemented
            // Metadata
            MessageType::DataAMF0 => Ok(Self::DataAmf0 {
                data: chunk.payload.clone(),
            }),
            MessageType::SharedObjAMF0 => Ok(Self::SharedObjAmf0), // Not implemented
            MessageType::CommandAMF0 => Ok(Self::Amf0Command(Command::read(chunk.payload.clone())?)),
            MessageType::Aggregate => Ok(Self::Aggregate(Self::read_aggregate(
                &chunk.payload,
                chunk.message_header.timestamp,
            ))),
            msg_type_id => Ok(Self::Unknown(UnknownMessage {
                msg_type_id,
                data: chunk.payload.clone(),
            })),
        }
    }

    /// Splits an aggregate message's payload into its constituent FLV-tag-encoded
    /// sub-messages, resolving each one's absolute timestamp against the aggregate's
    /// own `base_timestamp`.
    ///
    /// Iterates rather than recurses, since an aggregate can contain an unbounded
    /// number of sub-tags. Stops as soon as the remaining bytes can't hold another
    /// full tag, silently discarding any trailing partial tag.
    fn read_aggregate(payload: &Bytes, base_timestamp: u32) -> Vec<AggregateSubMessage> {
        let mut sub_messages = Vec::new();
        let mut offset = 0;
        let mut first_tag_timestamp = None;

        while offset + FLV_TAG_HEADER_SIZE <= payload.len() {
            let mut header = std::io::Cursor::new(&payload[offset..offset + FLV_TAG_HEADER_SIZE]);

            let Ok(tag_type) = header.read_u8() else { break };
            let Ok(data_size) = header.read_u24::<BigEndian>() else { break };
            let Ok(timestamp_lo) = header.read_u24::<BigEndian>() else { break };
            let Ok(timestamp_hi) = header.read_u8() else { break };
            let tag_timestamp = (u32::from(timestamp_hi) << 24) | timestamp_lo;

            let data_size = data_size as usize;
            let data_start = offset + FLV_TAG_HEADER_SIZE;
            let data_end = data_start + data_size;
            if data_end > payload.len() {
                break;
            }

            let first_tag_timestamp = *first_tag_timestamp.get_or_insert(tag_timestamp);
            let timestamp = base_timestamp.wrapping_add(tag_timestamp.wrapping_sub(first_tag_timestamp));

            sub_messages.push(AggregateSubMessage {
                msg_type_id: MessageType(tag_type),
                timestamp,
                data: payload.slice(data_start..data_end),
            });

            offset = data_end + FLV_BACK_POINTER_SIZE;
        }

        sub_messages
    }
}
