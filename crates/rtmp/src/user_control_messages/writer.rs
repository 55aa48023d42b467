use std::io;

use byteorder::{BigEndian, WriteBytesExt};

use super::{EventMessageStreamBegin, EventMessageStreamEof, EventMessageStreamIsRecorded, EventType};
use crate::chunk::{Chunk, ChunkWriter};
use crate::messages::MessageType;

fn write_stream_event(
    writer: &ChunkWriter,
    io: &mut impl io::Write,
    event_type: EventType,
    stream_id: u32,
) -> io::Result<()> {
    let mut data = Vec::new();

    data.write_u16::<BigEndian>(event_type.0).expect("write u16");
    data.write_u32::<BigEndian>(stream_id).expect("write u32");

    writer.write_chunk(io, Chunk::new(0x02, 0, MessageType::UserControlEvent, 0, data.into()))?;

    Ok(())
}

impl EventMessageStreamBegin {
    pub fn write(&self, writer: &ChunkWriter, io: &mut impl io::Write) -> io::Result<()> {
        write_stream_event(writer, io, EventType::StreamBegin, self.stream_id)
    }
}

impl EventMessageStreamEof {
    pub fn write(&self, writer: &ChunkWriter, io: &mut impl io::Write) -> io::Result<()> {
        write_stream_event(writer, io, EventType::StreamEOF, self.stream_id)
    }
}

impl EventMessageStreamIsRecorded {
    pub fn write(&self, writer: &ChunkWriter, io: &mut impl io::Write) -> io::Result<()> {
        write_stream_event(writer, io, EventType::StreamIsRecorded, self.stream_id)
    }
}
