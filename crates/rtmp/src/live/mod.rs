//! The live source graph: couples publishers to players in-process.
//!
//! [`crate::session::ServerSession`] speaks the RTMP wire protocol; this module is
//! what happens to the media once a `publish`/`play` command has been accepted. A
//! [`registry::Registry`] owns one [`source::LiveSource`] per stream key; publishers
//! feed it through [`source::LiveSource::on_audio`]/`on_video`/`on_meta_data`,
//! players drain it through a [`consumer::Consumer`], and
//! [`session::LiveSessionHandler`] wires both sides to a [`SessionHandler`](crate::session::SessionHandler).

pub mod config;
pub mod consumer;
pub mod error;
pub mod forwarder;
pub mod gop_cache;
pub mod jitter;
pub mod registry;
pub mod request;
pub mod session;
pub mod shared_message;
pub mod source;

pub use config::LiveConfig;
pub use error::LiveError;
pub use registry::Registry;
pub use request::Request;
pub use session::LiveSessionHandler;
pub use source::LiveSource;
