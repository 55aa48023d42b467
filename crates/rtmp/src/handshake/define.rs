//! Constants and small value types shared by the simple and complex handshake.

nutype_enum::nutype_enum! {
    /// The RTMP version byte exchanged in C0/S0. We only ever respond with `Version3`.
    pub enum RtmpVersion(u8) {
        Unknown = 0x00,
        Version3 = 0x03,
    }
}

/// The state of the handshake, shared by both schemas.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ServerHandshakeState {
    ReadC0C1,
    ReadC2,
    Finish,
}

/// Total size of the C1/S1 and C2/S2 packets.
pub const RTMP_HANDSHAKE_SIZE: usize = 1536;

/// Length of the time + version header that precedes the random/digest payload.
pub const TIME_VERSION_LENGTH: usize = 8;

/// Half of the random payload, used as the schema-0/schema-1 split point.
pub const CHUNK_LENGTH: usize = (RTMP_HANDSHAKE_SIZE - TIME_VERSION_LENGTH) / 2;
