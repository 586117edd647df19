//! This module contains functionality to deserialize values from bytes
//! that were encoded via the AMF0 specification
//! (http://wwwimages.adobe.com/content/dam/Adobe/en/devnet/amf/pdf/amf0-file-format-specification.pdf)

use crate::errors::Amf0DeserializationError;
use crate::markers;
use crate::Amf0Value;
use byteorder::{BigEndian, ReadBytesExt};
use std::io::{Read, Seek, SeekFrom};

enum DecodeStep {
    Value(Amf0Value),
    Skipped,
    EndOfInput,
}

/// Reads all AMF0 values from a readable byte stream until it is exhausted.
///
/// Markers outside the supported set (movieclip, reference, strict array,
/// date, recordset, xml document, typed object) are logged and skipped
/// without producing a value; decoding continues at the next byte.
pub fn deserialize<R: Read + Seek>(
    bytes: &mut R,
) -> Result<Vec<Amf0Value>, Amf0DeserializationError> {
    let mut results = vec![];

    loop {
        match read_next_value(bytes)? {
            DecodeStep::Value(x) => results.push(x),
            DecodeStep::Skipped => (),
            DecodeStep::EndOfInput => break,
        };
    }

    Ok(results)
}

fn read_next_value<R: Read + Seek>(
    bytes: &mut R,
) -> Result<DecodeStep, Amf0DeserializationError> {
    let mut buffer: [u8; 1] = [0];
    let bytes_read = bytes.read(&mut buffer)?;

    if bytes_read == 0 {
        return Ok(DecodeStep::EndOfInput);
    }

    match buffer[0] {
        markers::NUMBER_MARKER => parse_number(bytes).map(DecodeStep::Value),
        markers::BOOLEAN_MARKER => parse_bool(bytes).map(DecodeStep::Value),
        markers::STRING_MARKER => parse_string(bytes).map(DecodeStep::Value),
        markers::OBJECT_MARKER => parse_object(bytes).map(DecodeStep::Value),
        markers::NULL_MARKER => Ok(DecodeStep::Value(Amf0Value::Null)),
        markers::UNDEFINED_MARKER => Ok(DecodeStep::Value(Amf0Value::Undefined)),
        markers::ECMA_ARRAY_MARKER => parse_ecma_array(bytes).map(DecodeStep::Value),
        markers::OBJECT_END_MARKER => Ok(DecodeStep::Skipped),
        markers::LONG_STRING_MARKER => parse_long_string(bytes).map(DecodeStep::Value),
        marker => {
            log::warn!("Unsupported AMF0 marker {}, value skipped", marker);
            Ok(DecodeStep::Skipped)
        }
    }
}

fn parse_number<R: Read>(bytes: &mut R) -> Result<Amf0Value, Amf0DeserializationError> {
    let number = bytes.read_f64::<BigEndian>()?;
    Ok(Amf0Value::Number(number))
}

fn parse_bool<R: Read>(bytes: &mut R) -> Result<Amf0Value, Amf0DeserializationError> {
    let value = bytes.read_u8()?;
    Ok(Amf0Value::Boolean(value != 0))
}

fn parse_string<R: Read>(bytes: &mut R) -> Result<Amf0Value, Amf0DeserializationError> {
    let length = bytes.read_u16::<BigEndian>()?;
    let mut buffer: Vec<u8> = vec![0_u8; length as usize];
    bytes.read_exact(&mut buffer)?;

    let value = String::from_utf8(buffer)?;
    Ok(Amf0Value::Utf8String(value))
}

fn parse_long_string<R: Read>(bytes: &mut R) -> Result<Amf0Value, Amf0DeserializationError> {
    let length = bytes.read_u32::<BigEndian>()?;
    let mut buffer: Vec<u8> = vec![0_u8; length as usize];
    bytes.read_exact(&mut buffer)?;

    let value = String::from_utf8(buffer)?;
    Ok(Amf0Value::Utf8String(value))
}

fn parse_object<R: Read + Seek>(bytes: &mut R) -> Result<Amf0Value, Amf0DeserializationError> {
    parse_object_properties(bytes).map(Amf0Value::Object)
}

fn parse_ecma_array<R: Read + Seek>(
    bytes: &mut R,
) -> Result<Amf0Value, Amf0DeserializationError> {
    // The associative count can't be trusted (real encoders end the array
    // with the same empty-key + end-marker sequence objects use), so the
    // entries are read exactly like an object's.
    let _associative_count = bytes.read_u32::<BigEndian>()?;
    parse_object_properties(bytes).map(Amf0Value::EcmaArray)
}

fn parse_object_properties<R: Read + Seek>(
    bytes: &mut R,
) -> Result<Vec<(String, Amf0Value)>, Amf0DeserializationError> {
    let mut properties = Vec::new();

    loop {
        let label_length = match read_label_length(bytes)? {
            Some(length) => length,
            None => break,
        };

        if label_length == 0 {
            let mut next: [u8; 1] = [0];
            if bytes.read(&mut next)? == 0 {
                break;
            }

            if next[0] == markers::OBJECT_END_MARKER {
                break;
            }

            // ffmpeg sometimes emits a stray byte before the end of an
            // object, making the empty label appear one byte early.  Back up
            // over the peeked byte plus one and retry the label.
            bytes.seek(SeekFrom::Current(-2))?;
            continue;
        }

        let mut label_buffer = vec![0; label_length as usize];
        bytes.read_exact(&mut label_buffer)?;
        let label = String::from_utf8(label_buffer)?;

        match read_next_value(bytes)? {
            DecodeStep::Value(value) => properties.push((label, value)),
            DecodeStep::Skipped => properties.push((label, Amf0Value::Undefined)),
            DecodeStep::EndOfInput => return Err(Amf0DeserializationError::UnexpectedEof),
        }
    }

    Ok(properties)
}

// A property label cut short by the end of the input ends the object rather
// than failing, but half a length prefix is a real error.
fn read_label_length<R: Read>(bytes: &mut R) -> Result<Option<u16>, Amf0DeserializationError> {
    let mut buffer: [u8; 2] = [0; 2];
    let bytes_read = bytes.read(&mut buffer)?;
    match bytes_read {
        0 => Ok(None),
        1 => Err(Amf0DeserializationError::UnexpectedEof),
        _ => Ok(Some(u16::from_be_bytes(buffer))),
    }
}

#[cfg(test)]
mod tests {
    use super::super::Amf0Value;
    use super::deserialize;
    use crate::markers;
    use byteorder::{BigEndian, WriteBytesExt};
    use std::io::Cursor;

    #[test]
    fn can_deserialize_number() {
        let number: f64 = 332.0;

        let mut vector = vec![];
        vector.write_u8(markers::NUMBER_MARKER).unwrap();
        vector.write_f64::<BigEndian>(number).unwrap();

        let mut input = Cursor::new(vector);
        let result = deserialize(&mut input).unwrap();

        let expected = vec![Amf0Value::Number(number)];
        assert_eq!(result, expected);
    }

    #[test]
    fn can_deserialize_true_boolean() {
        let mut vector = vec![];
        vector.write_u8(markers::BOOLEAN_MARKER).unwrap();
        vector.write_u8(1).unwrap();

        let mut input = Cursor::new(vector);
        let result = deserialize(&mut input).unwrap();

        let expected = vec![Amf0Value::Boolean(true)];
        assert_eq!(result, expected);
    }

    #[test]
    fn can_deserialize_false_boolean() {
        let mut vector = vec![];
        vector.write_u8(markers::BOOLEAN_MARKER).unwrap();
        vector.write_u8(0).unwrap();

        let mut input = Cursor::new(vector);
        let result = deserialize(&mut input).unwrap();

        let expected = vec![Amf0Value::Boolean(false)];
        assert_eq!(result, expected);
    }

    #[test]
    fn can_deserialize_string() {
        let value = "test";

        let mut vector = vec![];
        vector.write_u8(markers::STRING_MARKER).unwrap();
        vector.write_u16::<BigEndian>(value.len() as u16).unwrap();
        vector.extend(value.as_bytes());

        let mut input = Cursor::new(vector);
        let result = deserialize(&mut input).unwrap();

        let expected = vec![Amf0Value::Utf8String(value.to_string())];
        assert_eq!(result, expected);
    }

    #[test]
    fn can_deserialize_long_string() {
        let value = "a longer string";

        let mut vector = vec![];
        vector.write_u8(markers::LONG_STRING_MARKER).unwrap();
        vector.write_u32::<BigEndian>(value.len() as u32).unwrap();
        vector.extend(value.as_bytes());

        let mut input = Cursor::new(vector);
        let result = deserialize(&mut input).unwrap();

        let expected = vec![Amf0Value::Utf8String(value.to_string())];
        assert_eq!(result, expected);
    }

    #[test]
    fn can_deserialize_null() {
        let mut vector = vec![];
        vector.write_u8(markers::NULL_MARKER).unwrap();

        let mut input = Cursor::new(vector);
        let result = deserialize(&mut input).unwrap();

        let expected = vec![Amf0Value::Null];
        assert_eq!(result, expected);
    }

    #[test]
    fn can_deserialize_undefined() {
        let mut vector = vec![];
        vector.write_u8(markers::UNDEFINED_MARKER).unwrap();

        let mut input = Cursor::new(vector);
        let result = deserialize(&mut input).unwrap();

        let expected = vec![Amf0Value::Undefined];
        assert_eq!(result, expected);
    }

    #[test]
    fn can_deserialize_object() {
        const NUMBER: f64 = 332.0;

        let mut vector = vec![];
        vector.push(markers::OBJECT_MARKER);
        vector.write_u16::<BigEndian>(4).unwrap();
        vector.extend("test".as_bytes());
        vector.push(markers::NUMBER_MARKER);
        vector.write_f64::<BigEndian>(NUMBER).unwrap();
        vector
            .write_u16::<BigEndian>(markers::UTF_8_EMPTY_MARKER)
            .unwrap();
        vector.push(markers::OBJECT_END_MARKER);

        let mut input = Cursor::new(vector);
        let result = deserialize(&mut input).unwrap();

        let properties = vec![("test".to_string(), Amf0Value::Number(NUMBER))];
        let expected = vec![Amf0Value::Object(properties)];
        assert_eq!(result, expected);
    }

    #[test]
    fn object_preserves_property_order() {
        let mut vector = vec![];
        vector.push(markers::OBJECT_MARKER);
        for name in ["b", "a", "c"] {
            vector.write_u16::<BigEndian>(1).unwrap();
            vector.extend(name.as_bytes());
            vector.push(markers::NULL_MARKER);
        }
        vector
            .write_u16::<BigEndian>(markers::UTF_8_EMPTY_MARKER)
            .unwrap();
        vector.push(markers::OBJECT_END_MARKER);

        let mut input = Cursor::new(vector);
        let result = deserialize(&mut input).unwrap();

        let expected = vec![Amf0Value::Object(vec![
            ("b".to_string(), Amf0Value::Null),
            ("a".to_string(), Amf0Value::Null),
            ("c".to_string(), Amf0Value::Null),
        ])];
        assert_eq!(result, expected);
    }

    #[test]
    fn can_deserialize_ecma_array() {
        let mut vector = vec![];
        vector.push(markers::ECMA_ARRAY_MARKER);
        vector.write_u32::<BigEndian>(2).unwrap();
        vector.write_u16::<BigEndian>(5).unwrap();
        vector.extend("test1".as_bytes());
        vector.push(markers::NUMBER_MARKER);
        vector.write_f64::<BigEndian>(1.0).unwrap();
        vector.write_u16::<BigEndian>(5).unwrap();
        vector.extend("test2".as_bytes());
        vector.write_u8(markers::STRING_MARKER).unwrap();
        vector.write_u16::<BigEndian>(6).unwrap();
        vector.extend("second".as_bytes());
        vector
            .write_u16::<BigEndian>(markers::UTF_8_EMPTY_MARKER)
            .unwrap();
        vector.push(markers::OBJECT_END_MARKER);

        let mut input = Cursor::new(vector);
        let result = deserialize(&mut input).unwrap();

        let properties = vec![
            ("test1".to_string(), Amf0Value::Number(1.0)),
            (
                "test2".to_string(),
                Amf0Value::Utf8String("second".to_string()),
            ),
        ];
        let expected = vec![Amf0Value::EcmaArray(properties)];
        assert_eq!(result, expected);
    }

    #[test]
    fn unsupported_marker_is_skipped_and_decoding_continues() {
        let mut vector = vec![];
        vector.write_u8(4).unwrap(); // movieclip, not supported
        vector.write_u8(markers::NUMBER_MARKER).unwrap();
        vector.write_f64::<BigEndian>(5.0).unwrap();

        let mut input = Cursor::new(vector);
        let result = deserialize(&mut input).unwrap();

        let expected = vec![Amf0Value::Number(5.0)];
        assert_eq!(result, expected);
    }

    #[test]
    fn object_with_stray_byte_before_end_marker_is_tolerated() {
        // ffmpeg can leave one extra 0x00 before the closing empty key
        let mut vector = vec![];
        vector.push(markers::OBJECT_MARKER);
        vector.write_u16::<BigEndian>(3).unwrap();
        vector.extend("app".as_bytes());
        vector.push(markers::NULL_MARKER);
        vector.push(0);
        vector
            .write_u16::<BigEndian>(markers::UTF_8_EMPTY_MARKER)
            .unwrap();
        vector.push(markers::OBJECT_END_MARKER);
        vector.push(markers::NULL_MARKER);

        let mut input = Cursor::new(vector);
        let result = deserialize(&mut input).unwrap();

        let expected = vec![
            Amf0Value::Object(vec![("app".to_string(), Amf0Value::Null)]),
            Amf0Value::Null,
        ];
        assert_eq!(result, expected);
    }

    #[test]
    fn object_cut_off_at_empty_label_ends_cleanly() {
        let mut vector = vec![];
        vector.push(markers::OBJECT_MARKER);
        vector.write_u16::<BigEndian>(3).unwrap();
        vector.extend("key".as_bytes());
        vector.push(markers::NULL_MARKER);

        let mut input = Cursor::new(vector);
        let result = deserialize(&mut input).unwrap();

        let expected = vec![Amf0Value::Object(vec![(
            "key".to_string(),
            Amf0Value::Null,
        )])];
        assert_eq!(result, expected);
    }
}
