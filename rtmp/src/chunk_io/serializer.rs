use super::chunk_header::{ChunkHeader, ChunkHeaderFormat};
use crate::chunk_io::ChunkSerializationError;
use crate::messages::{MessagePayload, RtmpMessage};
use crate::time::RtmpTimestamp;
use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use std::cmp::min;
use std::collections::HashMap;
use std::io::{Cursor, Write};

const INITIAL_MAX_CHUNK_SIZE: u32 = 128;
const MAX_INITIAL_TIMESTAMP: u32 = 16777215;
const MAX_MESSAGE_LENGTH: usize = 16777215;

/// An outbound packet containing one serialized RTMP message as one or more
/// RTMP chunks, ready to be written to the transport.
#[derive(Debug, PartialEq)]
pub struct Packet {
    pub bytes: Vec<u8>,
}

/// Allows serializing RTMP messages into RTMP chunks.
///
/// Due to the nature of the RTMP chunking protocol, the same serializer should
/// be used for all messages that need to be sent to the same peer.
pub struct ChunkSerializer {
    previous_headers: HashMap<u32, ChunkHeader>,
    max_chunk_size: u32,
}

impl ChunkSerializer {
    /// Creates a new serializer with the mandated starting chunk size of 128 bytes.
    pub fn new() -> ChunkSerializer {
        ChunkSerializer {
            max_chunk_size: INITIAL_MAX_CHUNK_SIZE,
            previous_headers: HashMap::new(),
        }
    }

    /// Changes the chunk boundary used for all subsequent messages.
    ///
    /// The peer has to be told about the change before it sees any chunk cut
    /// at the new size, so this returns the serialized `SetChunkSize` message
    /// which must be sent and cannot be discarded.
    pub fn set_max_chunk_size(
        &mut self,
        new_size: u32,
        time: RtmpTimestamp,
    ) -> Result<Packet, ChunkSerializationError> {
        if new_size as usize > MAX_MESSAGE_LENGTH {
            return Err(ChunkSerializationError::InvalidMaxChunkSize {
                chunk_size: new_size,
            });
        }

        let set_chunk_size_message = RtmpMessage::SetChunkSize { size: new_size };
        let message_payload = MessagePayload::from_rtmp_message(set_chunk_size_message, time, 0)?;
        let packet = self.serialize(&message_payload, true)?;

        self.max_chunk_size = new_size;
        Ok(packet)
    }

    /// Turns an RTMP message payload into wire bytes.
    ///
    /// The most compact header form is chosen by comparing the message
    /// against the previous header sent on the same chunk stream.  Passing
    /// `force_uncompressed` pins a full type 0 header; protocol control and
    /// command responses are conventionally sent that way.
    ///
    /// Payloads larger than the current max chunk size are split into
    /// multiple chunks, with every continuation carrying a type 3 header.
    pub fn serialize(
        &mut self,
        message: &MessagePayload,
        force_uncompressed: bool,
    ) -> Result<Packet, ChunkSerializationError> {
        if message.data.len() > MAX_MESSAGE_LENGTH {
            return Err(ChunkSerializationError::MessageTooLong {
                size: message.data.len() as u32,
            });
        }

        let mut bytes = Cursor::new(Vec::new());

        for (index, slice) in message
            .data
            .chunks(self.max_chunk_size as usize)
            .enumerate()
        {
            self.add_chunk(&mut bytes, force_uncompressed, message, index > 0, slice)?;
        }

        Ok(Packet {
            bytes: bytes.into_inner(),
        })
    }

    fn add_chunk(
        &mut self,
        bytes: &mut Cursor<Vec<u8>>,
        force_uncompressed: bool,
        message: &MessagePayload,
        continued_chunk: bool,
        data_to_write: &[u8],
    ) -> Result<(), ChunkSerializationError> {
        let mut header = ChunkHeader {
            chunk_stream_id: get_csid_for_message_type(message.type_id),
            timestamp: message.timestamp,
            timestamp_field: 0,
            message_type_id: message.type_id,
            message_stream_id: message.message_stream_id,
            message_length: message.data.len() as u32,
        };

        let header_format = if force_uncompressed {
            ChunkHeaderFormat::Full
        } else if continued_chunk {
            // Continuations of a split message always get a type 3 header
            ChunkHeaderFormat::Empty
        } else {
            match self.previous_headers.get(&header.chunk_stream_id) {
                None => ChunkHeaderFormat::Full,
                Some(previous_header) => {
                    let time_delta = header.timestamp - previous_header.timestamp;
                    header.timestamp_field = time_delta.value;

                    get_header_format(&header, previous_header)
                }
            }
        };

        add_basic_header(bytes, &header_format, header.chunk_stream_id)?;
        add_initial_timestamp(bytes, &header_format, &header)?;
        add_message_length_and_type_id(
            bytes,
            &header_format,
            header.message_length,
            header.message_type_id,
        )?;
        add_message_stream_id(bytes, &header_format, header.message_stream_id)?;
        add_extended_timestamp(bytes, &header_format, &header)?;
        bytes.write_all(data_to_write)?;

        self.previous_headers.insert(header.chunk_stream_id, header);
        Ok(())
    }
}

fn add_basic_header(
    bytes: &mut dyn Write,
    format: &ChunkHeaderFormat,
    csid: u32,
) -> Result<(), ChunkSerializationError> {
    debug_assert!(
        (2..64).contains(&csid),
        "outgoing csids always fit the single byte form"
    );

    let format_mask = match *format {
        ChunkHeaderFormat::Full => 0b00000000,
        ChunkHeaderFormat::TimeDeltaWithoutMessageStreamId => 0b01000000,
        ChunkHeaderFormat::TimeDeltaOnly => 0b10000000,
        ChunkHeaderFormat::Empty => 0b11000000,
    };

    bytes.write_u8(csid as u8 | format_mask)?;
    Ok(())
}

fn add_initial_timestamp(
    bytes: &mut Cursor<Vec<u8>>,
    format: &ChunkHeaderFormat,
    header: &ChunkHeader,
) -> Result<(), ChunkSerializationError> {
    if *format == ChunkHeaderFormat::Empty {
        return Ok(());
    }

    let value_to_write = match *format {
        ChunkHeaderFormat::Full => header.timestamp.value,
        _ => header.timestamp_field,
    };

    let capped_value = min(value_to_write, MAX_INITIAL_TIMESTAMP);
    bytes.write_u24::<BigEndian>(capped_value)?;

    Ok(())
}

fn add_message_length_and_type_id(
    bytes: &mut Cursor<Vec<u8>>,
    format: &ChunkHeaderFormat,
    length: u32,
    type_id: u8,
) -> Result<(), ChunkSerializationError> {
    if *format == ChunkHeaderFormat::Empty || *format == ChunkHeaderFormat::TimeDeltaOnly {
        return Ok(());
    }

    bytes.write_u24::<BigEndian>(length)?;
    bytes.write_u8(type_id)?;
    Ok(())
}

fn add_message_stream_id(
    bytes: &mut dyn Write,
    format: &ChunkHeaderFormat,
    stream_id: u32,
) -> Result<(), ChunkSerializationError> {
    if *format != ChunkHeaderFormat::Full {
        return Ok(());
    }

    // The one little endian field in the protocol
    bytes.write_u32::<LittleEndian>(stream_id)?;
    Ok(())
}

fn add_extended_timestamp(
    bytes: &mut dyn Write,
    format: &ChunkHeaderFormat,
    header: &ChunkHeader,
) -> Result<(), ChunkSerializationError> {
    let timestamp = match *format {
        ChunkHeaderFormat::Full => header.timestamp.value,
        ChunkHeaderFormat::Empty => {
            if header.timestamp_field == 0 {
                header.timestamp.value
            } else {
                header.timestamp_field
            }
        }
        _ => header.timestamp_field,
    };

    if timestamp < MAX_INITIAL_TIMESTAMP {
        return Ok(());
    }

    bytes.write_u32::<BigEndian>(timestamp)?;
    Ok(())
}

// Spreads messages across chunk streams by type so a run of traffic of one
// kind can take advantage of header compression.
fn get_csid_for_message_type(message_type_id: u8) -> u32 {
    match message_type_id {
        1..=6 => 2,
        17 | 20 => 3,
        15 | 18 => 4,
        9 => 5,
        8 => 6,
        _ => 7,
    }
}

fn get_header_format(
    current_header: &ChunkHeader,
    previous_header: &ChunkHeader,
) -> ChunkHeaderFormat {
    if current_header.message_stream_id != previous_header.message_stream_id {
        return ChunkHeaderFormat::Full;
    }

    if current_header.message_type_id != previous_header.message_type_id
        || current_header.message_length != previous_header.message_length
    {
        return ChunkHeaderFormat::TimeDeltaWithoutMessageStreamId;
    }

    if current_header.timestamp_field != previous_header.timestamp_field {
        return ChunkHeaderFormat::TimeDeltaOnly;
    }

    ChunkHeaderFormat::Empty
}
