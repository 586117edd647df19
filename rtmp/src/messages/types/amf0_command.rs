use bytes::Bytes;
use rsl_amf0;
use rsl_amf0::Amf0Value;
use std::io::Cursor;

use crate::messages::RtmpMessage;
use crate::messages::{MessageDeserializationError, MessageSerializationError};

pub fn serialize(
    command_name: String,
    transaction_id: f64,
    command_object: Amf0Value,
    mut additional_arguments: Vec<Amf0Value>,
) -> Result<Bytes, MessageSerializationError> {
    let mut values = vec![
        Amf0Value::Utf8String(command_name),
        Amf0Value::Number(transaction_id),
        command_object,
    ];

    values.append(&mut additional_arguments);
    let bytes = rsl_amf0::serialize(&values)?;

    Ok(Bytes::from(bytes))
}

pub fn deserialize(data: Bytes, type_id: u8) -> Result<RtmpMessage, MessageDeserializationError> {
    // Amf3 encoded commands (type 17) carry a leading format byte of zero
    // followed by ordinary amf0 values
    let data = if type_id == 17 && !data.is_empty() {
        data.slice(1..)
    } else {
        data
    };

    let mut cursor = Cursor::new(data);
    let arguments = rsl_amf0::deserialize(&mut cursor)?;
    let mut arg_iterator = arguments.into_iter();

    let command_name = match arg_iterator
        .next()
        .ok_or(MessageDeserializationError::InvalidMessageFormat)?
    {
        Amf0Value::Utf8String(value) => value,
        _ => return Err(MessageDeserializationError::InvalidMessageFormat),
    };

    let transaction_id = match arg_iterator
        .next()
        .ok_or(MessageDeserializationError::InvalidMessageFormat)?
    {
        Amf0Value::Number(value) => value,
        _ => return Err(MessageDeserializationError::InvalidMessageFormat),
    };

    let command_object = arg_iterator
        .next()
        .ok_or(MessageDeserializationError::InvalidMessageFormat)?;

    Ok(RtmpMessage::Amf0Command {
        command_name,
        transaction_id,
        command_object,
        additional_arguments: arg_iterator.collect(),
    })
}
