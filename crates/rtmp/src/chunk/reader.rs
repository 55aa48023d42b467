//! Incremental chunk reassembly.
//!
//! [`ChunkReader::read_chunk`] is driven from an async read loop that appends newly
//! received bytes to a [`BytesMut`] and calls in repeatedly; it must never consume
//! bytes from the buffer unless a complete chunk was available, since the caller will
//! come back with more data appended to the same buffer.

use std::cmp::min;
use std::collections::HashMap;
use std::io::{Cursor, Seek, SeekFrom};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use bytes::BytesMut;

use super::define::{Chunk, ChunkBasicHeader, ChunkMessageHeader, ChunkType, INIT_CHUNK_SIZE, MAX_MESSAGE_SIZE};
use super::error::ChunkReadError;
use crate::messages::MessageType;

const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;
const MAX_PARTIAL_CHUNK_COUNT: usize = 8;
const MAX_PREVIOUS_CHUNK_HEADERS: usize = 100;

pub struct ChunkReader {
    previous_chunk_headers: HashMap<u32, ChunkMessageHeader>,
    partial_chunks: HashMap<(u32, u32), BytesMut>,
    max_chunk_size: usize,
}

impl Default for ChunkReader {
    fn default() -> Self {
        Self {
            previous_chunk_headers: HashMap::new(),
            partial_chunks: HashMap::new(),
            max_chunk_size: INIT_CHUNK_SIZE,
        }
    }
}

impl ChunkReader {
    /// Applies a `SetChunkSize` request from the peer. Returns false (and the caller
    /// should close the connection) if the size is outside the allowed range.
    pub fn update_max_chunk_size(&mut self, chunk_size: usize) -> bool {
        if chunk_size == 0 || chunk_size > MAX_CHUNK_SIZE {
            false
        } else {
            self.max_chunk_size = chunk_size;
            true
        }
    }

    /// Tries to read one complete chunk out of `buf`.
    ///
    /// Returns `Ok(None)` when `buf` does not yet hold a full chunk; in that case `buf`
    /// is left untouched so the caller can append more bytes and retry. Loops internally
    /// because a single call may need to cross several partial chunks before a message
    /// completes, and a complete chunk may immediately be followed by another complete
    /// one already sitting in the buffer.
    pub fn read_chunk(&mut self, buf: &mut BytesMut) -> Result<Option<Chunk>, ChunkReadError> {
        loop {
            let mut cursor = Cursor::new(&buf[..]);

            let header = match self.read_basic_header(&mut cursor) {
                Ok(header) => header,
                Err(None) => return Ok(None),
                Err(Some(err)) => return Err(err),
            };

            let message_header = match self.read_message_header(&header, &mut cursor) {
                Ok(message_header) => message_header,
                Err(None) => return Ok(None),
                Err(Some(err)) => return Err(err),
            };

            let (payload_start, payload_end) = match self.payload_range(&header, &message_header, &mut cursor) {
                Ok(range) => range,
                Err(None) => return Ok(None),
                Err(Some(err)) => return Err(err),
            };

            let consumed = cursor.position() as usize;
            if buf.len() < consumed {
                return Ok(None);
            }

            let data = buf.split_to(consumed).freeze();
            let payload = data.slice(payload_start..payload_end);

            let count = if self.previous_chunk_headers.contains_key(&header.chunk_stream_id) {
                self.previous_chunk_headers.len()
            } else {
                self.previous_chunk_headers.len() + 1
            };
            if count > MAX_PREVIOUS_CHUNK_HEADERS {
                return Err(ChunkReadError::TooManyPreviousChunkHeaders);
            }
            self.previous_chunk_headers.insert(header.chunk_stream_id, message_header.clone());

            if payload.len() == message_header.msg_length as usize {
                return Ok(Some(Chunk {
                    basic_header: header,
                    message_header,
                    payload,
                }));
            }

            let key = (header.chunk_stream_id, message_header.msg_stream_id);
            let partial = match self.partial_chunks.get_mut(&key) {
                Some(partial) => partial,
                None => {
                    if self.partial_chunks.len() >= MAX_PARTIAL_CHUNK_COUNT {
                        return Err(ChunkReadError::TooManyPartialChunks);
                    }
                    self.partial_chunks.entry(key).or_insert_with(BytesMut::new)
                }
            };

            let new_len = {
                if partial.len() + payload.len() > MAX_MESSAGE_SIZE {
                    return Err(ChunkReadError::PartialChunkTooLarge(partial.len() + payload.len()));
                }
                partial.extend_from_slice(&payload);
                partial.len()
            };

            if new_len == message_header.msg_length as usize {
                return Ok(Some(Chunk {
                    basic_header: header,
                    message_header,
                    payload: self.partial_chunks.remove(&key).unwrap().freeze(),
                }));
            }

            // Not enough for a full message yet; loop again in case the buffer already
            // holds the next chunk, rather than returning None and stalling the caller.
        }
    }

    fn read_basic_header(&self, cursor: &mut Cursor<&[u8]>) -> Result<ChunkBasicHeader, Option<ChunkReadError>> {
        let byte = cursor.read_u8().map_err(|_| None)?;
        let format = (byte >> 6) & 0b11;
        let format = match format {
            0 => ChunkType::Type0,
            1 => ChunkType::Type1,
            2 => ChunkType::Type2,
            3 => ChunkType::Type3,
            _ => unreachable!("2-bit value"),
        };

        let chunk_stream_id = match (byte & 0b0011_1111) as u32 {
            0 => 64 + cursor.read_u8().map_err(|_| None)? as u32,
            1 => {
                64 + cursor.read_u8().map_err(|_| None)? as u32 + cursor.read_u8().map_err(|_| None)? as u32 * 256
            }
            csid => csid,
        };

        Ok(ChunkBasicHeader { chunk_stream_id, format })
    }

    fn read_message_header(
        &self,
        header: &ChunkBasicHeader,
        cursor: &mut Cursor<&[u8]>,
    ) -> Result<ChunkMessageHeader, Option<ChunkReadError>> {
        match header.format {
            ChunkType::Type0 => {
                let timestamp = cursor.read_u24::<BigEndian>().map_err(|_| None)?;
                let msg_length = cursor.read_u24::<BigEndian>().map_err(|_| None)?;
                if msg_length as usize > MAX_MESSAGE_SIZE {
                    return Err(Some(ChunkReadError::PartialChunkTooLarge(msg_length as usize)));
                }

                let msg_type_id = MessageType(cursor.read_u8().map_err(|_| None)?);
                let msg_stream_id = cursor.read_u32::<LittleEndian>().map_err(|_| None)?;

                let (timestamp, was_extended_timestamp) = if timestamp == 0xFFFFFF {
                    (cursor.read_u32::<BigEndian>().map_err(|_| None)?, true)
                } else {
                    (timestamp, false)
                };

                Ok(ChunkMessageHeader {
                    timestamp,
                    msg_length,
                    msg_type_id,
                    msg_stream_id,
                    was_extended_timestamp,
                })
            }
            ChunkType::Type1 => {
                let timestamp_delta = cursor.read_u24::<BigEndian>().map_err(|_| None)?;
                let msg_length = cursor.read_u24::<BigEndian>().map_err(|_| None)?;
                if msg_length as usize > MAX_MESSAGE_SIZE {
                    return Err(Some(ChunkReadError::PartialChunkTooLarge(msg_length as usize)));
                }

                let msg_type_id = MessageType(cursor.read_u8().map_err(|_| None)?);

                let (timestamp_delta, was_extended_timestamp) = if timestamp_delta == 0xFFFFFF {
                    (cursor.read_u32::<BigEndian>().map_err(|_| None)?, true)
                } else {
                    (timestamp_delta, false)
                };

                let previous_header = self
                    .previous_chunk_headers
                    .get(&header.chunk_stream_id)
                    .ok_or(ChunkReadError::MissingPreviousChunkHeader(header.chunk_stream_id))?;

                let timestamp = previous_header.timestamp.checked_add(timestamp_delta).unwrap_or_else(|| {
                    tracing::warn!(
                        previous = previous_header.timestamp,
                        delta = timestamp_delta,
                        "chunk timestamp overflow, clamping to previous value"
                    );
                    previous_header.timestamp
                });

                Ok(ChunkMessageHeader {
                    timestamp,
                    msg_length,
                    msg_type_id,
                    was_extended_timestamp,
                    msg_stream_id: previous_header.msg_stream_id,
                })
            }
            ChunkType::Type2 => {
                let timestamp_delta = cursor.read_u24::<BigEndian>().map_err(|_| None)?;

                let (timestamp_delta, was_extended_timestamp) = if timestamp_delta == 0xFFFFFF {
                    (cursor.read_u32::<BigEndian>().map_err(|_| None)?, true)
                } else {
                    (timestamp_delta, false)
                };

                let previous_header = self
                    .previous_chunk_headers
                    .get(&header.chunk_stream_id)
                    .ok_or(ChunkReadError::MissingPreviousChunkHeader(header.chunk_stream_id))?;

                let timestamp = previous_header
                    .timestamp
                    .checked_add(timestamp_delta)
                    .ok_or(ChunkReadError::TimestampOverflow(previous_header.timestamp, timestamp_delta))?;

                Ok(ChunkMessageHeader {
                    timestamp,
                    msg_length: previous_header.msg_length,
                    msg_type_id: previous_header.msg_type_id,
                    msg_stream_id: previous_header.msg_stream_id,
                    was_extended_timestamp,
                })
            }
            ChunkType::Type3 => {
                let previous_header = self
                    .previous_chunk_headers
                    .get(&header.chunk_stream_id)
                    .ok_or(ChunkReadError::MissingPreviousChunkHeader(header.chunk_stream_id))?
                    .clone();

                // fmt3 continuations of an extended-timestamp message repeat the 4-byte
                // extended timestamp field even though its value never changes.
                if previous_header.was_extended_timestamp {
                    cursor.read_u32::<BigEndian>().map_err(|_| None)?;
                }

                Ok(previous_header)
            }
            _ => Err(Some(ChunkReadError::MissingPreviousChunkHeader(header.chunk_stream_id))),
        }
    }

    fn payload_range(
        &self,
        header: &ChunkBasicHeader,
        message_header: &ChunkMessageHeader,
        cursor: &mut Cursor<&[u8]>,
    ) -> Result<(usize, usize), Option<ChunkReadError>> {
        let key = (header.chunk_stream_id, message_header.msg_stream_id);

        let remaining = message_header.msg_length as usize - self.partial_chunks.get(&key).map(|d| d.len()).unwrap_or(0);
        let need = min(remaining, self.max_chunk_size);

        let pos = cursor.position() as usize;
        cursor.seek(SeekFrom::Current(need as i64)).map_err(|_| None)?;

        Ok((pos, pos + need))
    }
}

#[cfg(test)]
mod tests {
    use bytes::{BufMut, Bytes};

    use super::*;
    use crate::chunk::writer::ChunkWriter;

    #[test]
    fn test_reader_incomplete_then_complete() {
        let mut reader = ChunkReader::default();
        let mut buf = BytesMut::new();

        // Only the first byte of a basic header; not enough for anything.
        buf.put_u8(0x03);
        assert_eq!(reader.read_chunk(&mut buf).unwrap(), None);
        assert_eq!(&buf[..], &[0x03][..]);

        let mut writer = ChunkWriter::default();
        let chunk = Chunk::new(3, 0, MessageType::Audio, 1, Bytes::from_static(b"hello"));
        let mut out = Vec::new();
        writer.write_chunk(&mut out, chunk).unwrap();

        buf.clear();
        buf.extend_from_slice(&out);

        let chunk = reader.read_chunk(&mut buf).unwrap().expect("full chunk");
        assert_eq!(chunk.payload, Bytes::from_static(b"hello"));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_reader_rejects_missing_previous_header() {
        let mut reader = ChunkReader::default();
        // fmt3 basic header on a chunk stream with no prior fmt0/1/2.
        let mut buf = BytesMut::from(&[0b1100_0011u8][..]);
        let err = reader.read_chunk(&mut buf).unwrap_err();
        assert!(matches!(err, ChunkReadError::MissingPreviousChunkHeader(3)));
    }

    #[test]
    fn test_reader_update_max_chunk_size() {
        let mut reader = ChunkReader::default();
        assert!(reader.update_max_chunk_size(4096));
        assert_eq!(reader.max_chunk_size, 4096);
        assert!(!reader.update_max_chunk_size(0));
    }
}
