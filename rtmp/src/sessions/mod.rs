/// This module contains implemented session abstractions.
///
/// A session is an abstraction that reacts to incoming RTMP messages (encoded as RTMP chunks)
/// with packets to be sent as a response, as well as raising events that applications can
/// perform custom logic on.
mod server;

pub use self::server::ServerRegistry;
pub use self::server::ServerSession;
pub use self::server::ServerSessionConfig;
pub use self::server::ServerSessionError;
pub use self::server::ServerSessionEvent;
pub use self::server::ServerSessionResult;
pub use self::server::StreamPayload;
