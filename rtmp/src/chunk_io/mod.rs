//! The chunk transport layer.  RTMP messages ride on numbered chunk streams
//! whose headers are delta compressed against the previous chunk seen on the
//! same stream, so a single `ChunkSerializer` / `ChunkDeserializer` pair must
//! see every byte exchanged with a peer, in order.

mod chunk_header;
mod deserialization_errors;
mod deserializer;
mod serialization_errors;
mod serializer;

pub use self::deserialization_errors::ChunkDeserializationError;
pub use self::deserializer::ChunkDeserializer;
pub use self::serialization_errors::ChunkSerializationError;
pub use self::serializer::{ChunkSerializer, Packet};
