use std::{io, string};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Amf0DeserializationError {
    #[error("Hit end of the byte buffer but was expecting more data")]
    UnexpectedEof,

    #[error("IO error occurred: {0}")]
    Io(#[from] io::Error),

    #[error("String bytes were not valid UTF-8: {0}")]
    FromUtf8Error(#[from] string::FromUtf8Error),
}

#[derive(Debug, Error)]
pub enum Amf0SerializationError {
    #[error("Object property name length greater than 65,535")]
    PropertyNameTooLong,

    #[error("IO error occurred: {0}")]
    Io(#[from] io::Error),
}
