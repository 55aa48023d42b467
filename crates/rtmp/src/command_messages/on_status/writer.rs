//! Writing [`OnStatus`].

use std::io;

use scuffle_amf0::{Amf0Encoder, Amf0Object, Amf0Value};
use scuffle_bytes_util::StringCow;

use super::OnStatus;
use crate::command_messages::error::CommandError;

impl OnStatus<'_> {
    /// Writes an [`OnStatus`] command to the given writer.
    pub fn write(self, buf: &mut impl io::Write, transaction_id: f64) -> Result<(), CommandError> {
        let mut encoder = Amf0Encoder::new(buf);

        encoder.encode_string("onStatus")?;
        encoder.encode_number(transaction_id)?;
        // command object is null
        encoder.encode_null()?;

        let mut info_object = Vec::new();

        info_object.push((StringCow::from_static("level"), Amf0Value::String(self.level.to_string().into())));
        info_object.push((StringCow::from_static("code"), Amf0Value::String(self.code.0)));

        if let Some(description) = self.description {
            info_object.push((StringCow::from_static("description"), Amf0Value::String(description)));
        }

        if let Some(others) = self.others {
            info_object.extend(others.into_owned());
        }

        let info_object: Amf0Object = info_object.into();
        encoder.encode_object(&info_object)?;

        Ok(())
    }
}
