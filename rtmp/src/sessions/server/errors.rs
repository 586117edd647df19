use crate::chunk_io::{ChunkDeserializationError, ChunkSerializationError};
use crate::handshake::HandshakeError;
use crate::messages::{MessageDeserializationError, MessageSerializationError};
use thiserror::Error;

/// Represents the type of error a server session can encounter.
///
/// These are internal failures only.  Protocol level rejections (a bad
/// connect path, an unauthorized stream key) are answered on the wire and do
/// not surface as errors.
#[derive(Debug, Error)]
pub enum ServerSessionError {
    /// Encountered when an error occurs while deserializing the incoming byte data
    #[error("An error occurred deserializing incoming data: {0}")]
    ChunkDeserializationError(#[from] ChunkDeserializationError),

    /// Encountered when an error occurs while serializing outbound messages
    #[error("An error occurred serializing outbound messages: {0}")]
    ChunkSerializationError(#[from] ChunkSerializationError),

    /// Encountered when an error occurs while turning an RTMP message into a message payload
    #[error("An error occurred while attempting to turn an RTMP message into a message payload: {0}")]
    MessageSerializationError(#[from] MessageSerializationError),

    /// Encountered when an error occurs while turning a message payload into an RTMP message
    #[error("An error occurred while attempting to turn a message payload into an RTMP message: {0}")]
    MessageDeserializationError(#[from] MessageDeserializationError),

    /// Encountered when an error occurs while performing the handshake
    #[error("An error occurred while performing the handshake: {0}")]
    HandshakeError(#[from] HandshakeError),
}
