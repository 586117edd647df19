//! This crate provides the server side of the RTMP protocol: the version and
//! random-data handshake, serialization and deserialization of the chunked
//! message transport, typed RTMP messages, and a session layer that drives
//! the connect / createStream / publish lifecycle.
//!
//! All processing is performed on in-memory buffers.  Nothing in this crate
//! performs network I/O; callers feed inbound bytes in and write the returned
//! packets out on whatever transport they manage.

pub mod chunk_io;
pub mod handshake;
pub mod media;
pub mod messages;
pub mod sessions;
pub mod time;
