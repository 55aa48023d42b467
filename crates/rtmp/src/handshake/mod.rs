//! RTMP handshake (simple and complex schemas).

use std::io;
use std::time::SystemTime;

use bytes::Bytes;

pub mod complex;
mod define;
mod simple;

pub use define::{RTMP_HANDSHAKE_SIZE, RtmpVersion, ServerHandshakeState, TIME_VERSION_LENGTH};
pub use simple::SimpleHandshakeServer;

use complex::ComplexHandshakeServer;

/// Drives the RTMP handshake on behalf of a server.
///
/// Starts by attempting the complex (HMAC-SHA256) schema; if the client's C1 does not
/// validate against either digest layout, falls back to the simple schema once, per
/// RTMP 1.0 5.2.
pub enum HandshakeServer {
    Complex(ComplexHandshakeServer),
    Simple(SimpleHandshakeServer),
}

impl Default for HandshakeServer {
    fn default() -> Self {
        Self::Complex(ComplexHandshakeServer::default())
    }
}

impl HandshakeServer {
    pub fn is_finished(&self) -> bool {
        match self {
            Self::Complex(h) => h.is_finished(),
            Self::Simple(h) => h.is_finished(),
        }
    }

    pub fn handshake(&mut self, input: &mut io::Cursor<Bytes>, output: &mut Vec<u8>) -> Result<(), crate::error::RtmpError> {
        match self {
            Self::Complex(handshaker) => {
                let position = input.position();
                let output_mark = output.len();

                if handshaker.handshake(input, output).is_err() {
                    // Not every client speaks the complex schema; rewind both streams and
                    // retry with the simple one. No further fallback after this.
                    output.truncate(output_mark);
                    input.set_position(position);

                    let mut simple = SimpleHandshakeServer::default();
                    simple.handshake(input, output)?;
                    *self = Self::Simple(simple);
                }
            }
            Self::Simple(handshaker) => handshaker.handshake(input, output)?,
        }

        Ok(())
    }
}

/// Current time truncated to a 32-bit value, used as a handshake timestamp.
///
/// RTMP does not require this to be wall-clock accurate, only monotonic-ish and
/// echoable; we reuse it verbatim from the sender's perspective.
pub(crate) fn current_time() -> u32 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u32)
        .unwrap_or(0)
}
