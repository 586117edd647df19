//! This module contains functionality for serializing values into bytes
//! based on the AMF0 specification
//! (http://wwwimages.adobe.com/content/dam/Adobe/en/devnet/amf/pdf/amf0-file-format-specification.pdf)

use crate::errors::Amf0SerializationError;
use crate::markers;
use crate::Amf0Value;
use byteorder::{BigEndian, WriteBytesExt};

/// Serializes values into an AMF0 encoded vector of bytes
pub fn serialize(values: &[Amf0Value]) -> Result<Vec<u8>, Amf0SerializationError> {
    let mut bytes = vec![];
    for value in values {
        serialize_value(value, &mut bytes)?;
    }

    Ok(bytes)
}

fn serialize_value(value: &Amf0Value, bytes: &mut Vec<u8>) -> Result<(), Amf0SerializationError> {
    match *value {
        Amf0Value::Number(val) => serialize_number(val, bytes),
        Amf0Value::Boolean(val) => Ok(serialize_bool(val, bytes)),
        Amf0Value::Utf8String(ref val) => serialize_string(val, bytes),
        Amf0Value::Object(ref val) => serialize_object(val, bytes),
        Amf0Value::EcmaArray(ref val) => serialize_ecma_array(val, bytes),
        Amf0Value::Null => Ok(bytes.push(markers::NULL_MARKER)),
        Amf0Value::Undefined => Ok(bytes.push(markers::UNDEFINED_MARKER)),
    }
}

fn serialize_number(value: f64, bytes: &mut Vec<u8>) -> Result<(), Amf0SerializationError> {
    bytes.push(markers::NUMBER_MARKER);
    bytes.write_f64::<BigEndian>(value)?;
    Ok(())
}

fn serialize_bool(value: bool, bytes: &mut Vec<u8>) {
    bytes.push(markers::BOOLEAN_MARKER);
    bytes.push(value as u8);
}

fn serialize_string(value: &str, bytes: &mut Vec<u8>) -> Result<(), Amf0SerializationError> {
    // Strings that don't fit a u16 length prefix go out as long strings
    if value.len() > (u16::MAX as usize) {
        bytes.push(markers::LONG_STRING_MARKER);
        bytes.write_u32::<BigEndian>(value.len() as u32)?;
        bytes.extend(value.as_bytes());
        return Ok(());
    }

    bytes.push(markers::STRING_MARKER);
    bytes.write_u16::<BigEndian>(value.len() as u16)?;
    bytes.extend(value.as_bytes());
    Ok(())
}

fn serialize_object(
    properties: &[(String, Amf0Value)],
    bytes: &mut Vec<u8>,
) -> Result<(), Amf0SerializationError> {
    bytes.push(markers::OBJECT_MARKER);
    serialize_properties(properties, bytes)
}

fn serialize_ecma_array(
    properties: &[(String, Amf0Value)],
    bytes: &mut Vec<u8>,
) -> Result<(), Amf0SerializationError> {
    bytes.push(markers::ECMA_ARRAY_MARKER);
    bytes.write_u32::<BigEndian>(properties.len() as u32)?;
    serialize_properties(properties, bytes)
}

fn serialize_properties(
    properties: &[(String, Amf0Value)],
    bytes: &mut Vec<u8>,
) -> Result<(), Amf0SerializationError> {
    for (name, value) in properties {
        if name.len() > (u16::MAX as usize) {
            return Err(Amf0SerializationError::PropertyNameTooLong);
        }

        bytes.write_u16::<BigEndian>(name.len() as u16)?;
        bytes.extend(name.as_bytes());
        serialize_value(value, bytes)?;
    }

    bytes.write_u16::<BigEndian>(markers::UTF_8_EMPTY_MARKER)?;
    bytes.push(markers::OBJECT_END_MARKER);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::Amf0Value;
    use super::serialize;
    use crate::markers;
    use byteorder::{BigEndian, WriteBytesExt};
    use std::io::Cursor;

    #[test]
    fn can_serialize_number() {
        let number: f64 = 332.0;

        let input = vec![Amf0Value::Number(number)];
        let result = serialize(&input).unwrap();

        let mut expected = vec![];
        expected.write_u8(markers::NUMBER_MARKER).unwrap();
        expected.write_f64::<BigEndian>(number).unwrap();

        assert_eq!(result, expected);
    }

    #[test]
    fn can_serialize_true_boolean() {
        let input = vec![Amf0Value::Boolean(true)];
        let result = serialize(&input).unwrap();

        let mut expected = vec![];
        expected.write_u8(markers::BOOLEAN_MARKER).unwrap();
        expected.write_u8(1).unwrap();

        assert_eq!(result, expected);
    }

    #[test]
    fn can_serialize_false_boolean() {
        let input = vec![Amf0Value::Boolean(false)];
        let result = serialize(&input).unwrap();

        let mut expected = vec![];
        expected.write_u8(markers::BOOLEAN_MARKER).unwrap();
        expected.write_u8(0).unwrap();

        assert_eq!(result, expected);
    }

    #[test]
    fn can_serialize_string() {
        let value = "test";

        let input = vec![Amf0Value::Utf8String(value.to_string())];
        let result = serialize(&input).unwrap();

        let mut expected = vec![];
        expected.write_u8(markers::STRING_MARKER).unwrap();
        expected.write_u16::<BigEndian>(value.len() as u16).unwrap();
        expected.extend(value.as_bytes());

        assert_eq!(result, expected);
    }

    #[test]
    fn long_string_form_used_when_too_long_for_u16_length() {
        let value = "a".repeat((u16::MAX as usize) + 1);

        let input = vec![Amf0Value::Utf8String(value.clone())];
        let result = serialize(&input).unwrap();

        let mut expected = vec![];
        expected.write_u8(markers::LONG_STRING_MARKER).unwrap();
        expected.write_u32::<BigEndian>(value.len() as u32).unwrap();
        expected.extend(value.as_bytes());

        assert_eq!(result, expected);
    }

    #[test]
    fn can_serialize_null() {
        let input = vec![Amf0Value::Null];
        let result = serialize(&input).unwrap();

        let expected = vec![markers::NULL_MARKER];
        assert_eq!(result, expected);
    }

    #[test]
    fn can_serialize_undefined() {
        let input = vec![Amf0Value::Undefined];
        let result = serialize(&input).unwrap();

        let expected = vec![markers::UNDEFINED_MARKER];
        assert_eq!(result, expected);
    }

    #[test]
    fn can_serialize_object_in_property_order() {
        const NUMBER: f64 = 332.0;

        let properties = vec![
            ("test".to_string(), Amf0Value::Number(NUMBER)),
            ("app".to_string(), Amf0Value::Utf8String("live".to_string())),
        ];

        let input = vec![Amf0Value::Object(properties)];
        let result = serialize(&input).unwrap();

        let mut expected = vec![];
        expected.push(markers::OBJECT_MARKER);
        expected.write_u16::<BigEndian>(4).unwrap();
        expected.extend("test".as_bytes());
        expected.push(markers::NUMBER_MARKER);
        expected.write_f64::<BigEndian>(NUMBER).unwrap();
        expected.write_u16::<BigEndian>(3).unwrap();
        expected.extend("app".as_bytes());
        expected.push(markers::STRING_MARKER);
        expected.write_u16::<BigEndian>(4).unwrap();
        expected.extend("live".as_bytes());
        expected
            .write_u16::<BigEndian>(markers::UTF_8_EMPTY_MARKER)
            .unwrap();
        expected.push(markers::OBJECT_END_MARKER);

        assert_eq!(result, expected);
    }

    #[test]
    fn can_serialize_ecma_array() {
        let properties = vec![("key".to_string(), Amf0Value::Number(1.0))];

        let input = vec![Amf0Value::EcmaArray(properties)];
        let result = serialize(&input).unwrap();

        let mut expected = vec![];
        expected.push(markers::ECMA_ARRAY_MARKER);
        expected.write_u32::<BigEndian>(1).unwrap();
        expected.write_u16::<BigEndian>(3).unwrap();
        expected.extend("key".as_bytes());
        expected.push(markers::NUMBER_MARKER);
        expected.write_f64::<BigEndian>(1.0).unwrap();
        expected
            .write_u16::<BigEndian>(markers::UTF_8_EMPTY_MARKER)
            .unwrap();
        expected.push(markers::OBJECT_END_MARKER);

        assert_eq!(result, expected);
    }

    #[test]
    fn round_trips_nested_values() {
        let input = vec![
            Amf0Value::Number(8.5),
            Amf0Value::Object(vec![
                ("name".to_string(), Amf0Value::Utf8String("abc".to_string())),
                (
                    "inner".to_string(),
                    Amf0Value::Object(vec![("flag".to_string(), Amf0Value::Boolean(true))]),
                ),
                (
                    "list".to_string(),
                    Amf0Value::EcmaArray(vec![("0".to_string(), Amf0Value::Number(1.0))]),
                ),
            ]),
            Amf0Value::Null,
            Amf0Value::Undefined,
        ];

        let bytes = serialize(&input).unwrap();
        let mut cursor = Cursor::new(bytes);
        let result = super::super::deserialize(&mut cursor).unwrap();

        assert_eq!(result, input);
    }
}
