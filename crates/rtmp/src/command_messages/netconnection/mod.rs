//! NetConnection command messages.

use std::collections::HashMap;

use scuffle_amf0::Amf0Value;
use scuffle_bytes_util::StringCow;
use serde_derive::{Deserialize, Serialize};

use crate::command_messages::CommandResultLevel;

pub mod reader;
pub mod writer;

/// NetConnection command `connect`.
///
/// Defined by:
/// - Legacy RTMP spec, 7.2.1.1
/// - Enhanced RTMP spec, page 36-37, Enhancing NetConnection connect Command
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(bound(deserialize = "'a: 'de"))]
pub struct NetConnectionCommandConnect<'a> {
    /// Tells the server application name the client is connected to.
    #[serde(borrow)]
    pub app: StringCow<'a>,
    /// represents capability flags which can be combined via a
    /// Bitwise OR to indicate which extended set of capabilities (i.e.,
    /// beyond the legacy RTMP specification) are supported via E-RTMP.
    /// See enum [`CapsExMask`] for the enumerated values representing the
    /// assigned bits.
    #[serde(rename = "capsEx", default, deserialize_with = "deserialize_caps_ex")]
    pub caps_ex: Option<CapsExMask>,
    /// All other parameters.
    ///
    /// Defined by:
    /// - Legacy RTMP spec, page 30
    /// - Enhanced RTMP spec, page 36-37
    #[serde(flatten, borrow)]
    pub others: HashMap<StringCow<'a>, Amf0Value<'a>>,
}

fn deserialize_caps_ex<'de, D>(deserializer: D) -> Result<Option<CapsExMask>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize as _;
    Ok(Option::<f64>::deserialize(deserializer)?.map(|bits| CapsExMask::from(bits as u8)))
}

/// Extended capabilities mask used by the [enhanced connect command](NetConnectionCommandConnect).
#[bitmask_enum::bitmask(u8)]
pub enum CapsExMask {
    /// Support for reconnection
    Reconnect = 0x01,
    /// Support for multitrack
    Multitrack = 0x02,
    /// Can parse ModEx signal
    ModEx = 0x04,
    /// Support for nano offset
    TimestampNanoOffset = 0x08,
}

/// The `properties` argument of a [`NetConnectionCommandConnectResult`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetConnectionCommandConnectResultProperties<'a> {
    /// Flash Media Server version.
    ///
    /// Usually set to "FMS/3,0,1,123".
    #[serde(rename = "fmsVer")]
    pub fms_ver: StringCow<'a>,
    /// No idea what this means, but it is used by other media servers as well.
    ///
    /// Usually set to 31.0.
    pub capabilities: f64,
}

/// The `information` argument of a [`NetConnectionCommandConnectResult`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetConnectionCommandConnectResultInformation<'a> {
    /// Result level.
    pub level: CommandResultLevel,
    /// Result code.
    ///
    /// Usually set to `NetConnection.Connect.Success`.
    pub code: StringCow<'a>,
    /// Result description.
    ///
    /// Usually set to "Connection Succeeded.".
    pub description: StringCow<'a>,
    /// Not sure what this means but it may stand for the AMF encoding version.
    ///
    /// Usually set to 0.0.
    #[serde(rename = "objectEncoding")]
    pub object_encoding: f64,
}

/// NetConnection command `connect` result.
///
/// Defined by:
/// - Legacy RTMP spec, 7.2.1.1
#[derive(Debug, Clone, PartialEq)]
pub struct NetConnectionCommandConnectResult<'a> {
    /// Properties of the connection.
    pub properties: NetConnectionCommandConnectResultProperties<'a>,
    /// Information about the connection result.
    pub information: NetConnectionCommandConnectResultInformation<'a>,
}

impl Default for NetConnectionCommandConnectResult<'_> {
    fn default() -> Self {
        Self {
            properties: NetConnectionCommandConnectResultProperties {
                fms_ver: StringCow::from_static("FMS/3,0,1,123"),
                capabilities: 31.0,
            },
            information: NetConnectionCommandConnectResultInformation {
                level: CommandResultLevel::Status,
                code: StringCow::from_static("NetConnection.Connect.Success"),
                description: StringCow::from_static("Connection Succeeded."),
                object_encoding: 0.0,
            },
        }
    }
}

/// NetConnection commands as defined in 7.2.1.
#[derive(Debug, Clone, PartialEq)]
pub enum NetConnectionCommand<'a> {
    /// Connect command.
    Connect(NetConnectionCommandConnect<'a>),
    /// Connect result.
    ///
    /// Sent from server to client in response to [`NetConnectionCommand::Connect`].
    ConnectResult(NetConnectionCommandConnectResult<'a>),
    /// Call command.
    Call {
        /// Command object.
        command_object: Amf0Value<'a>,
        /// Optional arguments.
        optional_arguments: Amf0Value<'a>,
    },
    /// Close command.
    Close,
    /// Create stream command.
    CreateStream,
    /// Create stream result.
    ///
    /// Sent from server to client in response to [`NetConnectionCommand::CreateStream`].
    CreateStreamResult {
        /// ID of the created stream.
        stream_id: f64,
    },
}
