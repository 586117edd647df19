use crate::time::RtmpTimestamp;

#[derive(Eq, PartialEq, Debug)]
pub enum ChunkHeaderFormat {
    Full,                            // Format 0
    TimeDeltaWithoutMessageStreamId, // Format 1
    TimeDeltaOnly,                   // Format 2
    Empty,                           // Format 3
}

/// The last fully resolved message header seen on a chunk stream.  The
/// `timestamp_field` holds the raw 3 byte wire value (an absolute time for
/// type 0 chunks, a delta for everything else) so compressed headers can be
/// resolved against it.
#[derive(Debug)]
pub struct ChunkHeader {
    pub chunk_stream_id: u32,
    pub timestamp: RtmpTimestamp,
    pub timestamp_field: u32,
    pub message_length: u32,
    pub message_type_id: u8,
    pub message_stream_id: u32,
}

impl ChunkHeader {
    pub fn new() -> ChunkHeader {
        ChunkHeader {
            chunk_stream_id: 0,
            timestamp: RtmpTimestamp::new(0),
            timestamp_field: 0,
            message_length: 0,
            message_type_id: 0,
            message_stream_id: 0,
        }
    }
}
