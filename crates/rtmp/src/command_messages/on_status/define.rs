use scuffle_amf0::Amf0Object;
use scuffle_bytes_util::StringCow;

use crate::command_messages::CommandResultLevel;

#[derive(Debug, Clone, PartialEq)]
pub struct OnStatus<'a> {
    pub code: OnStatusCode<'a>,
    pub description: Option<StringCow<'a>>,
    pub level: CommandResultLevel,
    pub others: Option<Amf0Object<'a>>,
}

/// The `code` field of an [`OnStatus`] command.
///
/// Not a nutype enum since unrecognized codes (and codes we construct from a
/// dynamic stream name, like [`OnStatusCode::NET_STREAM_PUBLISH_BAD_NAME`]'s
/// description) still need to round-trip as a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnStatusCode<'a>(pub StringCow<'a>);

impl<'a> From<&'a str> for OnStatusCode<'a> {
    fn from(value: &'a str) -> Self {
        Self(StringCow::from_ref(value))
    }
}

impl From<String> for OnStatusCode<'_> {
    fn from(value: String) -> Self {
        Self(StringCow::from_string(value))
    }
}

#[allow(unused)]
impl OnStatusCode<'static> {
    const fn new(code: &'static str) -> Self {
        Self(StringCow::StaticRef(code))
    }

    pub const NET_CONNECTION_CALL_FAILED: Self = Self::new("NetConnection.Call.Failed");
    pub const NET_CONNECTION_CONNECT_APP_SHUTDOWN: Self = Self::new("NetConnection.Connect.AppShutdown");
    pub const NET_CONNECTION_CONNECT_CLOSED: Self = Self::new("NetConnection.Connect.Closed");
    pub const NET_CONNECTION_CONNECT_FAILED: Self = Self::new("NetConnection.Connect.Failed");
    pub const NET_CONNECTION_CONNECT_REJECTED: Self = Self::new("NetConnection.Connect.Rejected");
    pub const NET_CONNECTION_CONNECT_SUCCESS: Self = Self::new("NetConnection.Connect.Success");
    pub const NET_CONNECTION_CONNECT_RECONNECT_REQUEST: Self = Self::new("NetConnection.Connect.ReconnectRequest");
    pub const NET_CONNECTION_PROXY_NOT_RESPONDING: Self = Self::new("NetConnection.Proxy.NotResponding");

    pub const NET_STREAM_PUBLISH_START: Self = Self::new("NetStream.Publish.Start");
    pub const NET_STREAM_PUBLISH_BAD_NAME: Self = Self::new("NetStream.Publish.BadName");
    pub const NET_STREAM_UNPUBLISH_SUCCESS: Self = Self::new("NetStream.Unpublish.Success");
    pub const NET_STREAM_DELETE_STREAM_SUCCESS: Self = Self::new("NetStream.DeleteStream.Suceess");
    pub const NET_STREAM_PLAY_RESET: Self = Self::new("NetStream.Play.Reset");
    pub const NET_STREAM_PLAY_START: Self = Self::new("NetStream.Play.Start");
    pub const NET_STREAM_PLAY_STOP: Self = Self::new("NetStream.Play.Stop");
    pub const NET_STREAM_PLAY_UNPUBLISH_NOTIFY: Self = Self::new("NetStream.Play.UnpublishNotify");
    pub const NET_STREAM_PLAY_FAILED: Self = Self::new("NetStream.Play.Failed");
    pub const NET_STREAM_PLAY_STREAM_NOT_FOUND: Self = Self::new("NetStream.Play.StreamNotFound");
    pub const NET_STREAM_DATA_START: Self = Self::new("NetStream.Data.Start");
    pub const NET_STREAM_PAUSE_NOTIFY: Self = Self::new("NetStream.Pause.Notify");
    pub const NET_STREAM_UNPAUSE_NOTIFY: Self = Self::new("NetStream.Unpause.Notify");
}
