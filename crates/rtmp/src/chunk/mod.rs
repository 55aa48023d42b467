//! RTMP chunk stream: reassembling chunks into messages and splitting messages back
//! into chunks, RTMP 1.0 section 5.

mod define;
pub mod error;
pub mod reader;
pub mod writer;

pub use define::{
    CHUNK_SIZE, CHUNK_STREAM_ID_AUDIO, CHUNK_STREAM_ID_COMMAND, CHUNK_STREAM_ID_DATA, CHUNK_STREAM_ID_PROTOCOL_CONTROL,
    CHUNK_STREAM_ID_VIDEO, Chunk, INIT_CHUNK_SIZE,
};
pub use error::{ChunkReadError, ChunkWriteError};
pub use reader::ChunkReader;
pub use writer::ChunkWriter;
