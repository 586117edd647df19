use crate::messages::MessageSerializationError;
use std::io;
use thiserror::Error;

/// An enumeration defining all the possible errors that could occur while
/// serializing RTMP messages into RTMP chunks.
#[derive(Debug, Error)]
pub enum ChunkSerializationError {
    /// A message cannot be more than 16777215 bytes, even when split across multiple RTMP chunks
    #[error("The current message has a length of {size} bytes, which is over the allowed size of 16777215 bytes")]
    MessageTooLong { size: u32 },

    /// An outgoing chunk boundary can never usefully exceed the maximum message length
    #[error("Requested an invalid max chunk size of {chunk_size}.  The largest chunk size possible is 16777215")]
    InvalidMaxChunkSize { chunk_size: u32 },

    /// An I/O error occurred while writing the output buffer
    #[error("{0}")]
    Io(#[from] io::Error),

    /// Occurs when the SetChunkSize message announcing a new chunk size can't be created
    #[error("Failed to create SetChunkSize message: {0}")]
    SetChunkSizeMessageCreationFailure(#[from] MessageSerializationError),
}
