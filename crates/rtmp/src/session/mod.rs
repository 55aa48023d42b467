//! High-level API to drive RTMP sessions.

pub mod server;

pub use server::{ServerSession, ServerSessionError, SessionData, SessionHandler};
