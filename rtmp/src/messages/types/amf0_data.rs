use bytes::Bytes;
use rsl_amf0;
use rsl_amf0::Amf0Value;
use std::io::Cursor;

use crate::messages::RtmpMessage;
use crate::messages::{MessageDeserializationError, MessageSerializationError};

pub fn serialize(values: Vec<Amf0Value>) -> Result<Bytes, MessageSerializationError> {
    let bytes = rsl_amf0::serialize(&values)?;

    Ok(Bytes::from(bytes))
}

pub fn deserialize(data: Bytes) -> Result<RtmpMessage, MessageDeserializationError> {
    let mut cursor = Cursor::new(data);
    let values = rsl_amf0::deserialize(&mut cursor)?;

    Ok(RtmpMessage::Amf0Data { values })
}
