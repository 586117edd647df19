use crate::time::RtmpTimestamp;
use rsl_amf0::Amf0Value;

/// The content of a single message received on a published stream.  Audio and
/// video frames come out of whatever decoders the session was built with.
#[derive(Debug, PartialEq, Clone)]
pub enum StreamPayload<AF, VF> {
    Audio { frame: AF },
    Video { frame: VF },
    Data { values: Vec<Amf0Value> },
}

/// An event that a server session can raise
#[derive(Debug, PartialEq, Clone)]
pub enum ServerSessionEvent<AF, VF> {
    /// The client successfully connected to a registered application path
    ConnectionAccepted { app_name: String },

    /// The client asked to connect to a path that is not registered, or the
    /// server is at its connection capacity.  An error response has already
    /// been queued for the client.
    ConnectionRejected { app_name: String },

    /// The client created a new message stream to publish or play on
    StreamCreated { stream_id: u32 },

    /// The client began publishing on the specified stream key
    PublishStreamStarted {
        app_name: String,
        stream_key: String,
        stream_id: u32,
    },

    /// The client is finished publishing on the specified stream key
    PublishStreamFinished {
        app_name: String,
        stream_key: String,
    },

    /// A media or data message arrived on an actively published stream
    StreamPayloadReceived {
        app_name: String,
        stream_key: String,
        timestamp: RtmpTimestamp,
        payload: StreamPayload<AF, VF>,
    },

    /// The client sent an Amf0 command that was not able to be handled
    UnhandleableAmf0Command {
        command_name: String,
        transaction_id: f64,
        command_object: Amf0Value,
        additional_values: Vec<Amf0Value>,
    },
}
