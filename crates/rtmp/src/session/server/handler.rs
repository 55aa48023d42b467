//! Defines types for handling session events.

use bytes::Bytes;

use super::error::ServerSessionError;
use crate::command_messages::UnknownCommand;
use crate::messages::UnknownMessage;

/// Data received from a session.
#[derive(Debug, Clone)]
pub enum SessionData {
    /// Video data.
    Video {
        /// Timestamp of the data.
        timestamp: u32,
        /// Data.
        data: Bytes,
    },
    /// Audio data.
    Audio {
        /// Timestamp of the data.
        timestamp: u32,
        /// Data.
        data: Bytes,
    },
    /// Metadata.
    Amf0 {
        /// Timestamp of the data.
        timestamp: u32,
        /// Data.
        data: Bytes,
    },
}

/// A message produced for a playing session by [`SessionHandler::on_play`], to be
/// written to the client as chunk data.
#[derive(Debug, Clone)]
pub struct PlayedMessage {
    /// The corrected timestamp to send, in milliseconds.
    pub timestamp: u32,
    /// What kind of message this is.
    pub kind: PlayedMessageKind,
    /// The raw payload to send.
    pub data: Bytes,
}

/// What kind of message a [`PlayedMessage`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayedMessageKind {
    /// FLV AUDIODATA.
    Audio,
    /// FLV VIDEODATA.
    Video,
    /// AMF0 data message (e.g. `onMetaData`).
    Amf0,
}

/// An item delivered down the channel returned by [`SessionHandler::on_play`].
#[derive(Debug, Clone)]
pub enum PlayEvent {
    /// One or more messages ready to write, batched by the merged-write latency
    /// configured on the live source this channel drains.
    Messages(Vec<PlayedMessage>),
    /// The source this channel was draining has ended (unpublished, or never
    /// existed). The session should notify the client and tear down playback.
    SourceEnded,
}

/// Handler for session events.
pub trait SessionHandler {
    /// Called when a stream is published.
    fn on_publish(
        &mut self,
        stream_id: u32,
        app_name: &str,
        stream_name: &str,
    ) -> impl std::future::Future<Output = Result<(), ServerSessionError>> + Send;

    /// Called when a stream is unpublished.
    fn on_unpublish(&mut self, stream_id: u32) -> impl std::future::Future<Output = Result<(), ServerSessionError>> + Send;

    /// Called when data is received.
    fn on_data(
        &mut self,
        stream_id: u32,
        data: SessionData,
    ) -> impl std::future::Future<Output = Result<(), ServerSessionError>> + Send;

    /// Called for a command this server doesn't recognize (e.g. FFmpeg's `_checkbw`).
    /// The default implementation ignores it, since silently acking an unrecognized
    /// command is usually more interoperable than closing the connection.
    fn on_unknown_command(
        &mut self,
        stream_id: u32,
        command: UnknownCommand<'_>,
    ) -> impl std::future::Future<Output = Result<(), ServerSessionError>> + Send {
        let _ = (stream_id, command);
        std::future::ready(Ok(()))
    }

    /// Called for a message whose type id this server doesn't recognize.
    fn on_unknown_message(
        &mut self,
        stream_id: u32,
        message: UnknownMessage,
    ) -> impl std::future::Future<Output = Result<(), ServerSessionError>> + Send {
        let _ = (stream_id, message);
        std::future::ready(Ok(()))
    }

    /// Called when a client issues `play`. Implementations that support playback
    /// return a channel the session will drain and write to the client as chunk
    /// data until the channel closes or the client unsubscribes.
    ///
    /// The default implementation rejects playback, matching a publish-only server.
    fn on_play(
        &mut self,
        stream_id: u32,
        app_name: &str,
        stream_name: &str,
        reset: bool,
    ) -> impl std::future::Future<Output = Result<tokio::sync::mpsc::Receiver<PlayEvent>, ServerSessionError>> + Send {
        let _ = (stream_id, app_name, stream_name, reset);
        std::future::ready(Err(ServerSessionError::PlayNotSupported))
    }

    /// Called when a client issues `pause`. The default implementation accepts it
    /// without doing anything, which is only reachable once [`Self::on_play`] has
    /// already succeeded for this handler.
    fn on_pause(
        &mut self,
        stream_id: u32,
        paused: bool,
    ) -> impl std::future::Future<Output = Result<(), ServerSessionError>> + Send {
        let _ = (stream_id, paused);
        std::future::ready(Ok(()))
    }
}
