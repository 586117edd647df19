use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("Handshake has already been completed")]
    HandshakeAlreadyCompleted,

    #[error("IO error occurred: {0}")]
    Io(#[from] io::Error),
}
