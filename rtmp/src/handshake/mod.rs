//! Server side of the RTMP handshake.
//!
//! The client opens with C0 (a single version byte) and C1 (epoch time,
//! four reserved zero bytes and 1528 bytes of random data).  The server stays
//! silent until C1 has fully arrived, then answers with S0, S1 and S2 as one
//! combined write: S1 carries our own epoch and fresh random data, S2 echoes
//! C1's epoch and random bytes back unchanged.  Once the client's C2 has been
//! consumed the handshake is done and any bytes past it belong to the chunk
//! stream.
//!
//! A version byte below 3 is not an error; the machine simply refuses to
//! progress, leaving the connection to the host's inactivity timeout.

mod errors;

pub use self::errors::HandshakeError;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use rand::Rng;
use std::io::{Cursor, Read, Write};
use std::time::{SystemTime, UNIX_EPOCH};

const RANDOM_DATA_SIZE: usize = 1528;
const PACKET_SIZE: usize = 8 + RANDOM_DATA_SIZE;
const MIN_SUPPORTED_VERSION: u8 = 3;

#[derive(Eq, PartialEq, Debug, Clone)]
enum Stage {
    WaitingForC0,
    WaitingForC1,
    WaitingForC2,
    Complete,
}

/// The result of processing inbound handshake bytes
#[derive(Debug, PartialEq)]
pub enum HandshakeProcessResult {
    /// The handshake needs more bytes; any response bytes produced so far
    /// must be sent to the peer.
    InProgress { response_bytes: Vec<u8> },

    /// The handshake finished.  Any response bytes must still be sent, and
    /// bytes that arrived after C2 are handed back for chunk processing.
    Completed {
        response_bytes: Vec<u8>,
        remaining_bytes: Vec<u8>,
    },
}

/// State machine performing the server half of an RTMP handshake.  Inbound
/// bytes may be fed in at any fragmentation; the machine buffers internally
/// and only consumes whole packets.
pub struct HandshakeServer {
    current_stage: Stage,
    my_epoch: u32,
    buffer: Vec<u8>,
}

impl HandshakeServer {
    pub fn new() -> HandshakeServer {
        HandshakeServer {
            current_stage: Stage::WaitingForC0,
            my_epoch: current_epoch(),
            buffer: Vec::new(),
        }
    }

    /// Returns true once C2 has been consumed
    pub fn is_complete(&self) -> bool {
        self.current_stage == Stage::Complete
    }

    pub fn process_bytes(
        &mut self,
        data: &[u8],
    ) -> Result<HandshakeProcessResult, HandshakeError> {
        if self.current_stage == Stage::Complete {
            return Err(HandshakeError::HandshakeAlreadyCompleted);
        }

        self.buffer.extend_from_slice(data);

        let mut response_bytes = Vec::new();
        let mut remaining_bytes = Vec::new();

        loop {
            let starting_stage = self.current_stage.clone();
            match self.current_stage {
                Stage::WaitingForC0 => self.parse_c0(),
                Stage::WaitingForC1 => self.parse_c1(&mut response_bytes)?,
                Stage::WaitingForC2 => self.parse_c2(&mut remaining_bytes),
                Stage::Complete => break,
            }

            if self.current_stage == starting_stage {
                // Stage didn't advance, so the current packet isn't fully
                // buffered yet (or the version byte was unsupported)
                break;
            }
        }

        if self.current_stage == Stage::Complete {
            Ok(HandshakeProcessResult::Completed {
                response_bytes,
                remaining_bytes,
            })
        } else {
            Ok(HandshakeProcessResult::InProgress { response_bytes })
        }
    }

    fn parse_c0(&mut self) {
        if self.buffer.is_empty() {
            return;
        }

        let version = self.buffer.remove(0);
        if version < MIN_SUPPORTED_VERSION {
            log::warn!(
                "Client requested unsupported RTMP version {}, refusing to progress",
                version
            );
            return;
        }

        self.current_stage = Stage::WaitingForC1;
    }

    fn parse_c1(&mut self, response_bytes: &mut Vec<u8>) -> Result<(), HandshakeError> {
        if self.buffer.len() < PACKET_SIZE {
            return Ok(());
        }

        let c1: Vec<u8> = self.buffer.drain(..PACKET_SIZE).collect();

        let mut cursor = Cursor::new(c1);
        let client_epoch = cursor.read_u32::<BigEndian>()?;
        let _reserved = cursor.read_u32::<BigEndian>()?;
        let mut client_random = [0_u8; RANDOM_DATA_SIZE];
        cursor.read_exact(&mut client_random)?;

        let mut response = Cursor::new(Vec::with_capacity(1 + PACKET_SIZE * 2));
        response.write_u8(MIN_SUPPORTED_VERSION)?; // s0
        response.write_u32::<BigEndian>(self.my_epoch)?; // s1
        response.write_u32::<BigEndian>(0)?;
        response.write_all(&create_random_data())?;
        response.write_u32::<BigEndian>(client_epoch)?; // s2
        response.write_u32::<BigEndian>(0)?;
        response.write_all(&client_random)?;

        response_bytes.extend(response.into_inner());
        self.current_stage = Stage::WaitingForC2;
        Ok(())
    }

    fn parse_c2(&mut self, remaining_bytes: &mut Vec<u8>) {
        if self.buffer.len() < PACKET_SIZE {
            return;
        }

        // C2 contents aren't validated, the packet just has to arrive
        self.buffer.drain(..PACKET_SIZE);
        remaining_bytes.extend(self.buffer.drain(..));
        self.current_stage = Stage::Complete;
    }
}

fn create_random_data() -> [u8; RANDOM_DATA_SIZE] {
    let mut random_data = [0_u8; RANDOM_DATA_SIZE];
    rand::thread_rng().fill(&mut random_data[..]);
    random_data
}

fn current_epoch() -> u32 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(duration) => duration.as_millis() as u32,
        Err(_) => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
    use std::io::{Cursor, Read, Write};

    fn build_c0_and_c1(epoch: u32, random_byte: u8) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        cursor.write_u8(3).unwrap();
        cursor.write_u32::<BigEndian>(epoch).unwrap();
        cursor.write_u32::<BigEndian>(0).unwrap();
        cursor.write_all(&[random_byte; RANDOM_DATA_SIZE]).unwrap();
        cursor.into_inner()
    }

    #[test]
    fn no_response_sent_before_c1_arrives() {
        let mut handshake = HandshakeServer::new();

        let result = handshake.process_bytes(&[3]).unwrap();

        match result {
            HandshakeProcessResult::InProgress { response_bytes } => {
                assert!(response_bytes.is_empty(), "expected no response after c0");
            }
            x => panic!("Unexpected process_bytes result: {:?}", x),
        }
    }

    #[test]
    fn combined_response_sent_after_c1_echoes_client_random() {
        let mut handshake = HandshakeServer::new();

        let result = handshake.process_bytes(&build_c0_and_c1(111, 53)).unwrap();
        let response = match result {
            HandshakeProcessResult::InProgress { response_bytes } => response_bytes,
            x => panic!("Unexpected process_bytes result: {:?}", x),
        };

        assert_eq!(response.len(), 1 + PACKET_SIZE * 2, "s0+s1+s2 expected");

        let mut cursor = Cursor::new(response);
        let version = cursor.read_u8().unwrap();
        assert_eq!(version, 3, "wrong s0 version");

        let s1_epoch = cursor.read_u32::<BigEndian>().unwrap();
        let s1_zeros = cursor.read_u32::<BigEndian>().unwrap();
        let mut s1_random = [0_u8; RANDOM_DATA_SIZE];
        cursor.read_exact(&mut s1_random).unwrap();
        assert_eq!(s1_epoch, handshake.my_epoch, "wrong s1 epoch");
        assert_eq!(s1_zeros, 0, "s1 reserved field not zeroed");

        let s2_epoch = cursor.read_u32::<BigEndian>().unwrap();
        let _ = cursor.read_u32::<BigEndian>().unwrap();
        let mut s2_random = [0_u8; RANDOM_DATA_SIZE];
        cursor.read_exact(&mut s2_random).unwrap();
        assert_eq!(s2_epoch, 111, "s2 should echo c1's epoch");
        assert_eq!(&s2_random[..], &[53_u8; RANDOM_DATA_SIZE][..]);
    }

    #[test]
    fn completes_after_c2_and_returns_leftover_bytes() {
        let extra_bytes = [5_u8; 10];

        let mut handshake = HandshakeServer::new();
        handshake.process_bytes(&build_c0_and_c1(0, 1)).unwrap();

        let mut c2 = Vec::new();
        c2.write_u32::<BigEndian>(handshake.my_epoch).unwrap();
        c2.write_u32::<BigEndian>(0).unwrap();
        c2.extend([9_u8; RANDOM_DATA_SIZE]);
        c2.extend(extra_bytes);

        let result = handshake.process_bytes(&c2).unwrap();
        match result {
            HandshakeProcessResult::Completed {
                response_bytes,
                remaining_bytes,
            } => {
                assert!(response_bytes.is_empty());
                assert_eq!(&remaining_bytes[..], &extra_bytes[..]);
            }
            x => panic!("Unexpected process_bytes result: {:?}", x),
        }

        assert!(handshake.is_complete());
    }

    #[test]
    fn whole_handshake_can_arrive_in_one_buffer() {
        let mut input = build_c0_and_c1(500, 77);
        input.extend([0_u8; PACKET_SIZE]); // c2
        input.extend([1, 2, 3]);

        let mut handshake = HandshakeServer::new();
        let result = handshake.process_bytes(&input).unwrap();

        match result {
            HandshakeProcessResult::Completed {
                response_bytes,
                remaining_bytes,
            } => {
                assert_eq!(response_bytes.len(), 1 + PACKET_SIZE * 2);
                assert_eq!(remaining_bytes, vec![1, 2, 3]);
            }
            x => panic!("Unexpected process_bytes result: {:?}", x),
        }
    }

    #[test]
    fn byte_at_a_time_input_still_completes() {
        let mut input = build_c0_and_c1(500, 77);
        input.extend([0_u8; PACKET_SIZE]);

        let mut handshake = HandshakeServer::new();
        let mut completed = false;
        for byte in input {
            match handshake.process_bytes(&[byte]).unwrap() {
                HandshakeProcessResult::InProgress { .. } => (),
                HandshakeProcessResult::Completed { remaining_bytes, .. } => {
                    assert!(remaining_bytes.is_empty());
                    completed = true;
                }
            }
        }

        assert!(completed, "handshake never completed");
    }

    #[test]
    fn version_below_3_stalls_without_error() {
        let mut handshake = HandshakeServer::new();

        let result = handshake.process_bytes(&[2]).unwrap();
        match result {
            HandshakeProcessResult::InProgress { response_bytes } => {
                assert!(response_bytes.is_empty());
            }
            x => panic!("Unexpected process_bytes result: {:?}", x),
        }

        // Even a full c1 afterwards must not produce a response
        let c1 = vec![0_u8; PACKET_SIZE];
        let result = handshake.process_bytes(&c1).unwrap();
        match result {
            HandshakeProcessResult::InProgress { response_bytes } => {
                assert!(response_bytes.is_empty());
            }
            x => panic!("Unexpected process_bytes result: {:?}", x),
        }

        assert!(!handshake.is_complete());
    }
}
