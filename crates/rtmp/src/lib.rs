#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]

pub mod chunk;
pub mod command_messages;
pub mod error;
pub mod handshake;
pub mod live;
pub mod messages;
pub mod protocol_control_messages;
pub mod session;
pub mod user_control_messages;

pub use error::RtmpError;
pub use session::{ServerSession, ServerSessionError, SessionData, SessionHandler};
