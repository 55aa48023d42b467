use std::io;

#[derive(Debug, thiserror::Error)]
pub enum ChunkReadError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("missing previous chunk header: {0}")]
    MissingPreviousChunkHeader(u32),
    #[error("too many partial chunks")]
    TooManyPartialChunks,
    #[error("too many previous chunk headers")]
    TooManyPreviousChunkHeaders,
    #[error("partial chunk too large: {0}")]
    PartialChunkTooLarge(usize),
    #[error("timestamp overflow: timestamp: {0}, delta: {1}")]
    TimestampOverflow(u32, u32),
}

#[derive(Debug, thiserror::Error)]
pub enum ChunkWriteError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("unknown read state")]
    UnknownReadState,
}
