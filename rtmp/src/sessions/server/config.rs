use std::time::Duration;

/// The configuration options that govern how an RTMP server session should operate
#[derive(Clone)]
pub struct ServerSessionConfig {
    /// Version string reported to clients in the connect response
    pub fms_version: String,

    /// The outbound chunk size negotiated right after a successful connect
    pub chunk_size: u32,

    /// Bandwidth limit announced to the peer
    pub peer_bandwidth: u32,

    /// How many received bytes may accumulate before an acknowledgement is sent
    pub window_ack_size: u32,

    /// How many message streams a single connection may create
    pub max_stream_count: u32,

    /// Stream keys clients are allowed to publish under.  A single `"*"` entry
    /// allows any key.
    pub allowed_stream_names: Vec<String>,

    /// How long a connection may sit idle before the hosting application
    /// should drop it.  The session itself performs no timing; this exists so
    /// hosts have one place to read the intended policy from.
    pub inactivity_timeout: Duration,
}

impl ServerSessionConfig {
    /// Creates a new server session config with overridable defaults
    pub fn new() -> ServerSessionConfig {
        ServerSessionConfig {
            fms_version: "FMS/3,0,1,123".to_string(),
            chunk_size: 4096,
            peer_bandwidth: 5_000_000,
            window_ack_size: 5_000_000,
            max_stream_count: 1,
            allowed_stream_names: vec!["*".to_string()],
            inactivity_timeout: Duration::from_secs(15),
        }
    }
}
