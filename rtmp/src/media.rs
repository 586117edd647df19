//! Pluggable decoding of audio and video payloads.
//!
//! The session hands every media payload it receives to a decoder before
//! raising an event for it.  Most deployments relay the bytes untouched via
//! [`PassthroughDecoder`], but a custom decoder can parse codec headers or
//! transcode on the way through.

use bytes::Bytes;
use std::convert::Infallible;
use std::fmt;

/// Turns raw media payload bytes into frames.
///
/// A decoder reports how many input bytes it consumed together with the frame
/// it produced.  Decode failures are not fatal to the session; the offending
/// payload is dropped and processing continues with the next message.
pub trait FrameDecoder {
    type Frame;
    type Error: fmt::Display;

    fn decode(&mut self, data: &[u8]) -> Result<(usize, Self::Frame), Self::Error>;
}

/// A decoder that passes payload bytes through unmodified.
#[derive(Debug, Default)]
pub struct PassthroughDecoder;

impl PassthroughDecoder {
    pub fn new() -> PassthroughDecoder {
        PassthroughDecoder
    }
}

impl FrameDecoder for PassthroughDecoder {
    type Frame = Bytes;
    type Error = Infallible;

    fn decode(&mut self, data: &[u8]) -> Result<(usize, Self::Frame), Self::Error> {
        Ok((data.len(), Bytes::copy_from_slice(data)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_decoder_returns_input_unchanged() {
        let mut decoder = PassthroughDecoder::new();
        let input = [1_u8, 2_u8, 3_u8, 4_u8];

        let (consumed, frame) = decoder.decode(&input).unwrap();

        assert_eq!(consumed, 4, "Incorrect consumed count");
        assert_eq!(&frame[..], &input[..], "Incorrect frame contents");
    }
}
