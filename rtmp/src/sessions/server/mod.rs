mod config;
mod errors;
mod events;
mod published_stream;
mod registry;
mod result;


use self::published_stream::PublishedStream;
use crate::chunk_io::{ChunkDeserializer, ChunkSerializer, Packet};
use crate::handshake::{HandshakeProcessResult, HandshakeServer};
use crate::media::FrameDecoder;
use crate::messages::{PeerBandwidthLimitType, RtmpMessage};
use crate::time::RtmpTimestamp;
use bytes::Bytes;
use rsl_amf0::Amf0Value;
use std::cmp::{max, min};
use std::collections::HashMap;
use std::sync::Arc;

pub use self::config::ServerSessionConfig;
pub use self::errors::ServerSessionError;
pub use self::events::{ServerSessionEvent, StreamPayload};
pub use self::registry::ServerRegistry;
pub use self::result::ServerSessionResult;

const MAX_NEGOTIABLE_CHUNK_SIZE: u32 = 16777215;

/// A session that represents the server side of a single RTMP connection.
///
/// The `ServerSession` drives the whole server half of the wire protocol: it
/// performs the handshake, parses RTMP chunks coming in from a client into
/// RTMP messages and performs common server side workflows to handle those
/// messages.  It provides pre-serialized packets to be sent back to the client
/// as well as events that parent applications can perform custom logic against
/// (like reacting to media frames on a published stream).
///
/// The `ServerSession` does not care how bytes come in or get sent out, but
/// leaves that up to the application utilizing it.
///
/// Due to the header compression properties of the RTMP chunking protocol it
/// is required that every byte received from the client is passed into the
/// `ServerSession`, that all responses it returns are sent to the client
/// **in order**, and that no additional bytes are sent to the client.  Any
/// violation of these rules has a high probability of causing RTMP chunk
/// parsing errors by the peer or by the `ServerSession` instance itself.
pub struct ServerSession<A: FrameDecoder, V: FrameDecoder> {
    config: ServerSessionConfig,
    registry: Arc<ServerRegistry>,
    connection_id: Option<u64>,
    handshake: HandshakeServer,
    handshake_complete: bool,
    serializer: ChunkSerializer,
    deserializer: ChunkDeserializer,
    audio_decoder: A,
    video_decoder: V,
    connected_app: Option<String>,
    allowed_stream_names: Vec<String>,
    created_stream_count: u32,
    streams: HashMap<u32, PublishedStream>,
    bytes_received: u64,
    last_ack_sent: u64,
    ack_window: u32,
}

impl<A: FrameDecoder, V: FrameDecoder> ServerSession<A, V> {
    /// Creates a new server session.
    ///
    /// The session stays silent until the client's first handshake packet has
    /// fully arrived, so there are no initial outbound packets.
    pub fn new(
        config: ServerSessionConfig,
        registry: Arc<ServerRegistry>,
        audio_decoder: A,
        video_decoder: V,
    ) -> ServerSession<A, V> {
        let ack_window = config.window_ack_size;
        let allowed_stream_names = config.allowed_stream_names.clone();

        ServerSession {
            config,
            registry,
            connection_id: None,
            handshake: HandshakeServer::new(),
            handshake_complete: false,
            serializer: ChunkSerializer::new(),
            deserializer: ChunkDeserializer::new(),
            audio_decoder,
            video_decoder,
            connected_app: None,
            allowed_stream_names,
            created_stream_count: 0,
            streams: HashMap::new(),
            bytes_received: 0,
            last_ack_sent: 0,
            ack_window,
        }
    }

    /// Takes in bytes received from the client and returns any responses or events that can
    /// be reacted to.
    ///
    /// Until the handshake has completed the bytes feed the handshake state
    /// machine; everything after that is parsed as RTMP chunks.
    pub fn handle_input(
        &mut self,
        bytes: &[u8],
    ) -> Result<Vec<ServerSessionResult<A::Frame, V::Frame>>, ServerSessionError> {
        self.bytes_received += bytes.len() as u64;

        let mut results = Vec::new();

        if !self.handshake_complete {
            match self.handshake.process_bytes(bytes)? {
                HandshakeProcessResult::InProgress { response_bytes } => {
                    if !response_bytes.is_empty() {
                        results.push(ServerSessionResult::OutboundResponse(Packet {
                            bytes: response_bytes,
                        }));
                    }

                    return Ok(results);
                }

                HandshakeProcessResult::Completed {
                    response_bytes,
                    remaining_bytes,
                } => {
                    if !response_bytes.is_empty() {
                        results.push(ServerSessionResult::OutboundResponse(Packet {
                            bytes: response_bytes,
                        }));
                    }

                    self.handshake_complete = true;
                    self.handle_chunk_bytes(&remaining_bytes, &mut results)?;
                }
            }
        } else {
            self.handle_chunk_bytes(bytes, &mut results)?;
        }

        self.append_acknowledgement(&mut results)?;
        Ok(results)
    }

    /// Tells the session the connection is going away.  Any actively published
    /// streams are closed out and the connection slot is given back to the
    /// registry.
    pub fn finish(&mut self) -> Vec<ServerSessionResult<A::Frame, V::Frame>> {
        let mut results = Vec::new();
        let app_name = self.connected_app.clone().unwrap_or_default();

        for (_, stream) in self.streams.drain() {
            results.push(ServerSessionResult::RaisedEvent(
                ServerSessionEvent::PublishStreamFinished {
                    app_name: app_name.clone(),
                    stream_key: stream.stream_key,
                },
            ));
        }

        if let Some(id) = self.connection_id.take() {
            self.registry.connection_closed(id);
        }

        results
    }

    fn handle_chunk_bytes(
        &mut self,
        bytes: &[u8],
        results: &mut Vec<ServerSessionResult<A::Frame, V::Frame>>,
    ) -> Result<(), ServerSessionError> {
        let mut bytes_to_process = bytes;

        loop {
            let payload = match self.deserializer.get_next_message(bytes_to_process) {
                Ok(None) => break,
                Ok(Some(payload)) => payload,
                Err(error) => {
                    // Chunk state disagreement with the peer.  Stop parsing this buffer
                    // rather than guess; teardown is the host's call.
                    log::error!("Failed to deserialize an incoming chunk: {}", error);
                    break;
                }
            };

            let message = match payload.to_rtmp_message() {
                Ok(message) => message,
                Err(error) => {
                    // The peer and us disagree about the contents of the stream.  Anything
                    // parsed after this point is suspect, so stop here.
                    log::error!("Received a message that could not be decoded: {}", error);
                    break;
                }
            };

            let keep_going = match message {
                RtmpMessage::Abort { stream_id } => {
                    log::debug!("Abort received for chunk stream {}", stream_id);
                    self.deserializer.abort_chunk_stream(stream_id);
                    true
                }

                RtmpMessage::Acknowledgement { sequence_number } => {
                    log::debug!("Acknowledgement received for {} bytes", sequence_number);
                    true
                }

                RtmpMessage::SetChunkSize { size } => self.handle_set_chunk_size(size)?,

                RtmpMessage::SetPeerBandwidth { size, limit_type } => {
                    log::debug!(
                        "SetPeerBandwidth received (size {}, type {:?}), ignoring",
                        size,
                        limit_type
                    );
                    true
                }

                RtmpMessage::WindowAcknowledgement { size } => {
                    self.ack_window = size;
                    true
                }

                RtmpMessage::Amf0Command {
                    command_name,
                    transaction_id,
                    command_object,
                    additional_arguments,
                } => self.handle_amf0_command(
                    payload.message_stream_id,
                    command_name,
                    transaction_id,
                    command_object,
                    additional_arguments,
                    results,
                )?,

                RtmpMessage::Amf0Data { values } => {
                    self.handle_amf0_data(payload.message_stream_id, payload.timestamp, values, results);
                    true
                }

                RtmpMessage::AudioData { data } => {
                    self.handle_audio_data(payload.message_stream_id, payload.timestamp, data, results);
                    true
                }

                RtmpMessage::VideoData { data } => {
                    self.handle_video_data(payload.message_stream_id, payload.timestamp, data, results);
                    true
                }

                RtmpMessage::Unknown { type_id, .. } => {
                    log::warn!("Received message with unsupported type id {}", type_id);
                    results.push(ServerSessionResult::UnhandleableMessageReceived(payload));
                    true
                }
            };

            if !keep_going {
                break;
            }

            bytes_to_process = &[];
        }

        Ok(())
    }

    fn handle_set_chunk_size(&mut self, size: u32) -> Result<bool, ServerSessionError> {
        let clamped_size = min(size, MAX_NEGOTIABLE_CHUNK_SIZE);
        if clamped_size != size {
            log::warn!(
                "Client requested a chunk size of {}, clamping to {}",
                size,
                clamped_size
            );
        }

        self.deserializer.set_max_chunk_size(clamped_size as usize)?;
        log::debug!("Client chunk size set to {}", clamped_size);
        Ok(true)
    }

    fn handle_amf0_command(
        &mut self,
        stream_id: u32,
        name: String,
        transaction_id: f64,
        command_object: Amf0Value,
        additional_arguments: Vec<Amf0Value>,
        results: &mut Vec<ServerSessionResult<A::Frame, V::Frame>>,
    ) -> Result<bool, ServerSessionError> {
        let keep_going = match name.as_str() {
            "connect" => self.handle_command_connect(transaction_id, command_object, results)?,
            "createStream" => self.handle_command_create_stream(transaction_id, results)?,
            "publish" => {
                self.handle_command_publish(stream_id, additional_arguments, results)?
            }
            "deleteStream" | "closeStream" => {
                self.handle_command_delete_stream(additional_arguments, results);
                true
            }
            "releaseStream" | "FCPublish" => {
                // Encoders send these ahead of publishing; no response is expected
                log::info!("{} command received, ignoring", name);
                true
            }

            _ => {
                results.push(ServerSessionResult::RaisedEvent(
                    ServerSessionEvent::UnhandleableAmf0Command {
                        command_name: name,
                        transaction_id,
                        command_object,
                        additional_values: additional_arguments,
                    },
                ));

                true
            }
        };

        Ok(keep_going)
    }

    fn handle_command_connect(
        &mut self,
        transaction_id: f64,
        command_object: Amf0Value,
        results: &mut Vec<ServerSessionResult<A::Frame, V::Frame>>,
    ) -> Result<bool, ServerSessionError> {
        let app_name = match command_object.get_property("app") {
            Some(Amf0Value::Utf8String(app)) => app.trim_matches('/').to_string(),
            _ => String::new(),
        };

        if app_name.is_empty()
            || self.connected_app.is_some()
            || !self.registry.is_path_accepted(&app_name)
        {
            log::warn!("Rejecting connection request for app '{}'", app_name);
            return self.reject_connection(transaction_id, app_name, results);
        }

        let connection_id = match self.registry.try_add_connection() {
            Some(id) => id,
            None => {
                log::warn!(
                    "Rejecting connection request for app '{}', server is at capacity",
                    app_name
                );
                return self.reject_connection(transaction_id, app_name, results);
            }
        };

        self.connection_id = Some(connection_id);
        self.connected_app = Some(app_name.clone());

        let window_ack_message = RtmpMessage::WindowAcknowledgement {
            size: self.config.window_ack_size,
        };
        results.push(self.serialize_control_response(window_ack_message)?);

        let peer_bandwidth_message = RtmpMessage::SetPeerBandwidth {
            size: self.config.peer_bandwidth,
            limit_type: PeerBandwidthLimitType::Dynamic,
        };
        results.push(self.serialize_control_response(peer_bandwidth_message)?);

        let chunk_size_packet = self
            .serializer
            .set_max_chunk_size(self.config.chunk_size, RtmpTimestamp::new(0))?;
        results.push(ServerSessionResult::OutboundResponse(chunk_size_packet));

        let result_message = RtmpMessage::Amf0Command {
            command_name: "_result".to_string(),
            transaction_id,
            command_object: Amf0Value::Object(vec![
                (
                    "fmsVer".to_string(),
                    Amf0Value::Utf8String(self.config.fms_version.clone()),
                ),
                ("capabilities".to_string(), Amf0Value::Number(31.0)),
            ]),
            additional_arguments: vec![Amf0Value::Object(vec![
                (
                    "level".to_string(),
                    Amf0Value::Utf8String("status".to_string()),
                ),
                (
                    "code".to_string(),
                    Amf0Value::Utf8String("NetConnection.Connect.Success".to_string()),
                ),
                (
                    "description".to_string(),
                    Amf0Value::Utf8String("Connection succeeded.".to_string()),
                ),
                ("objectEncoding".to_string(), Amf0Value::Number(0.0)),
            ])],
        };
        results.push(self.serialize_control_response(result_message)?);

        log::info!("Connection accepted on app '{}'", app_name);
        results.push(ServerSessionResult::RaisedEvent(
            ServerSessionEvent::ConnectionAccepted { app_name },
        ));

        Ok(true)
    }

    fn reject_connection(
        &mut self,
        transaction_id: f64,
        app_name: String,
        results: &mut Vec<ServerSessionResult<A::Frame, V::Frame>>,
    ) -> Result<bool, ServerSessionError> {
        let error_message = RtmpMessage::Amf0Command {
            command_name: "_error".to_string(),
            transaction_id,
            command_object: Amf0Value::Null,
            additional_arguments: vec![Amf0Value::Object(vec![
                (
                    "level".to_string(),
                    Amf0Value::Utf8String("error".to_string()),
                ),
                (
                    "code".to_string(),
                    Amf0Value::Utf8String("NetConnection.Connect.Failed".to_string()),
                ),
                (
                    "description".to_string(),
                    Amf0Value::Utf8String("Connection failed.".to_string()),
                ),
            ])],
        };

        results.push(self.serialize_control_response(error_message)?);
        results.push(ServerSessionResult::RaisedEvent(
            ServerSessionEvent::ConnectionRejected { app_name },
        ));

        // Nothing useful can follow a failed connect
        Ok(false)
    }

    fn handle_command_create_stream(
        &mut self,
        transaction_id: f64,
        results: &mut Vec<ServerSessionResult<A::Frame, V::Frame>>,
    ) -> Result<bool, ServerSessionError> {
        // Closed streams give their slot back, so the cap is on streams still open
        let open_stream_count = self.streams.len() as u32;
        if self.connected_app.is_none() || open_stream_count >= self.config.max_stream_count {
            log::warn!(
                "Refusing stream creation ({} of {} streams in use)",
                open_stream_count,
                self.config.max_stream_count
            );

            let error_message = RtmpMessage::Amf0Command {
                command_name: "_error".to_string(),
                transaction_id,
                command_object: Amf0Value::Null,
                additional_arguments: Vec::new(),
            };
            results.push(self.serialize_control_response(error_message)?);
            return Ok(true);
        }

        let stream_id = open_stream_count + 1;
        self.created_stream_count = max(self.created_stream_count, stream_id);

        let result_message = RtmpMessage::Amf0Command {
            command_name: "_result".to_string(),
            transaction_id,
            command_object: Amf0Value::Null,
            additional_arguments: vec![Amf0Value::Number(stream_id as f64)],
        };
        results.push(self.serialize_control_response(result_message)?);
        results.push(ServerSessionResult::RaisedEvent(
            ServerSessionEvent::StreamCreated { stream_id },
        ));

        Ok(true)
    }

    fn handle_command_publish(
        &mut self,
        stream_id: u32,
        additional_arguments: Vec<Amf0Value>,
        results: &mut Vec<ServerSessionResult<A::Frame, V::Frame>>,
    ) -> Result<bool, ServerSessionError> {
        let app_name = match self.connected_app {
            Some(ref app) => app.clone(),
            None => {
                log::warn!("Publish command received before a successful connect, ignoring");
                return Ok(true);
            }
        };

        let mut arguments = additional_arguments.into_iter();
        let stream_key = match arguments.next() {
            Some(Amf0Value::Utf8String(key)) => key,
            _ => String::new(),
        };

        let publish_type = match arguments.next() {
            Some(Amf0Value::Utf8String(publish_type)) => publish_type,
            _ => String::new(),
        };

        let stream_id_is_valid = stream_id > 0
            && stream_id <= self.created_stream_count
            && !self.streams.contains_key(&stream_id);

        if publish_type != "live"
            || stream_key.is_empty()
            || !self.is_stream_name_allowed(&stream_key)
            || !stream_id_is_valid
        {
            log::warn!(
                "Refusing publish of '{}' (type '{}') on stream id {}",
                stream_key,
                publish_type,
                stream_id
            );

            let status_message = make_on_status(
                "error",
                "NetStream.Publish.Failed",
                "Unable to start publishing",
            );
            let payload =
                status_message.into_message_payload(RtmpTimestamp::new(0), stream_id)?;
            let packet = self.serializer.serialize(&payload, true)?;
            results.push(ServerSessionResult::OutboundResponse(packet));
            return Ok(true);
        }

        self.streams.insert(
            stream_id,
            PublishedStream {
                stream_key: stream_key.clone(),
            },
        );

        let status_message = RtmpMessage::Amf0Command {
            command_name: "onStatus".to_string(),
            transaction_id: 0.0,
            command_object: Amf0Value::Null,
            additional_arguments: vec![Amf0Value::Object(vec![
                (
                    "level".to_string(),
                    Amf0Value::Utf8String("status".to_string()),
                ),
                (
                    "code".to_string(),
                    Amf0Value::Utf8String("NetStream.Publish.Start".to_string()),
                ),
                (
                    "description".to_string(),
                    Amf0Value::Utf8String("Start publishing".to_string()),
                ),
                ("audioCodecs".to_string(), Amf0Value::Number(1024.0)),
                ("videoCodecs".to_string(), Amf0Value::Number(128.0)),
            ])],
        };

        let payload = status_message.into_message_payload(RtmpTimestamp::new(0), stream_id)?;
        let packet = self.serializer.serialize(&payload, true)?;
        results.push(ServerSessionResult::OutboundResponse(packet));

        log::info!("Publishing started on '{}/{}'", app_name, stream_key);
        results.push(ServerSessionResult::RaisedEvent(
            ServerSessionEvent::PublishStreamStarted {
                app_name,
                stream_key,
                stream_id,
            },
        ));

        Ok(true)
    }

    fn handle_command_delete_stream(
        &mut self,
        mut additional_arguments: Vec<Amf0Value>,
        results: &mut Vec<ServerSessionResult<A::Frame, V::Frame>>,
    ) {
        if additional_arguments.is_empty() {
            return;
        }

        let stream_id = match additional_arguments.remove(0) {
            Amf0Value::Number(stream_id) => stream_id as u32,
            _ => return,
        };

        if let Some(stream) = self.streams.remove(&stream_id) {
            let app_name = self.connected_app.clone().unwrap_or_default();
            log::info!("Publishing ended on '{}/{}'", app_name, stream.stream_key);
            results.push(ServerSessionResult::RaisedEvent(
                ServerSessionEvent::PublishStreamFinished {
                    app_name,
                    stream_key: stream.stream_key,
                },
            ));
        }
    }

    fn handle_amf0_data(
        &mut self,
        stream_id: u32,
        timestamp: RtmpTimestamp,
        values: Vec<Amf0Value>,
        results: &mut Vec<ServerSessionResult<A::Frame, V::Frame>>,
    ) {
        let (app_name, stream_key) = match self.stream_details(stream_id) {
            Some(details) => details,
            None => {
                log::warn!("Data message received on unknown stream id {}", stream_id);
                return;
            }
        };

        results.push(ServerSessionResult::RaisedEvent(
            ServerSessionEvent::StreamPayloadReceived {
                app_name,
                stream_key,
                timestamp,
                payload: StreamPayload::Data { values },
            },
        ));
    }

    fn handle_audio_data(
        &mut self,
        stream_id: u32,
        timestamp: RtmpTimestamp,
        data: Bytes,
        results: &mut Vec<ServerSessionResult<A::Frame, V::Frame>>,
    ) {
        let (app_name, stream_key) = match self.stream_details(stream_id) {
            Some(details) => details,
            None => {
                log::warn!("Audio received on unknown stream id {}", stream_id);
                return;
            }
        };

        match self.audio_decoder.decode(&data) {
            Ok((_, frame)) => {
                results.push(ServerSessionResult::RaisedEvent(
                    ServerSessionEvent::StreamPayloadReceived {
                        app_name,
                        stream_key,
                        timestamp,
                        payload: StreamPayload::Audio { frame },
                    },
                ));
            }

            Err(error) => {
                log::warn!("Dropping audio payload that failed to decode: {}", error);
            }
        }
    }

    fn handle_video_data(
        &mut self,
        stream_id: u32,
        timestamp: RtmpTimestamp,
        data: Bytes,
        results: &mut Vec<ServerSessionResult<A::Frame, V::Frame>>,
    ) {
        let (app_name, stream_key) = match self.stream_details(stream_id) {
            Some(details) => details,
            None => {
                log::warn!("Video received on unknown stream id {}", stream_id);
                return;
            }
        };

        match self.video_decoder.decode(&data) {
            Ok((_, frame)) => {
                results.push(ServerSessionResult::RaisedEvent(
                    ServerSessionEvent::StreamPayloadReceived {
                        app_name,
                        stream_key,
                        timestamp,
                        payload: StreamPayload::Video { frame },
                    },
                ));
            }

            Err(error) => {
                log::warn!("Dropping video payload that failed to decode: {}", error);
            }
        }
    }

    fn append_acknowledgement(
        &mut self,
        results: &mut Vec<ServerSessionResult<A::Frame, V::Frame>>,
    ) -> Result<(), ServerSessionError> {
        if self.last_ack_sent != 0
            && self.bytes_received - self.last_ack_sent < self.ack_window as u64
        {
            return Ok(());
        }

        let message = RtmpMessage::Acknowledgement {
            sequence_number: self.bytes_received as u32,
        };
        results.push(self.serialize_control_response(message)?);
        self.last_ack_sent = self.bytes_received;
        Ok(())
    }

    fn serialize_control_response(
        &mut self,
        message: RtmpMessage,
    ) -> Result<ServerSessionResult<A::Frame, V::Frame>, ServerSessionError> {
        let payload = message.into_message_payload(RtmpTimestamp::new(0), 0)?;
        let packet = self.serializer.serialize(&payload, true)?;
        Ok(ServerSessionResult::OutboundResponse(packet))
    }

    fn stream_details(&self, stream_id: u32) -> Option<(String, String)> {
        let stream = self.streams.get(&stream_id)?;
        let app_name = self.connected_app.clone().unwrap_or_default();
        Some((app_name, stream.stream_key.clone()))
    }

    /// Allows this connection to publish under the given stream name.  The name `"*"`
    /// permits any stream name.  Names from the session config are allowed from the start.
    pub fn allow_stream_name(&mut self, name: String) {
        if !self.allowed_stream_names.contains(&name) {
            self.allowed_stream_names.push(name);
        }
    }

    fn is_stream_name_allowed(&self, stream_key: &str) -> bool {
        self.allowed_stream_names
            .iter()
            .any(|name| name == "*" || name == stream_key)
    }
}

fn make_on_status(level: &str, code: &str, description: &str) -> RtmpMessage {
    RtmpMessage::Amf0Command {
        command_name: "onStatus".to_string(),
        transaction_id: 0.0,
        command_object: Amf0Value::Null,
        additional_arguments: vec![Amf0Value::Object(vec![
            (
                "level".to_string(),
                Amf0Value::Utf8String(level.to_string()),
            ),
            ("code".to_string(), Amf0Value::Utf8String(code.to_string())),
            (
                "description".to_string(),
                Amf0Value::Utf8String(description.to_string()),
            ),
        ])],
    }
}
