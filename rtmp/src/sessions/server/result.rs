use super::events::ServerSessionEvent;
use crate::chunk_io::Packet;
use crate::messages::MessagePayload;

/// A single result that is returned when a server session processes some bytes
#[derive(PartialEq, Debug)]
pub enum ServerSessionResult<AF, VF> {
    /// A packet that is slated to be sent to the peer.  Packets must *ALWAYS* be sent
    /// in the order they were produced.  Failing to do so may cause RTMP chunk
    /// deserialization errors on the other end due to RTMP chunk header compression.
    OutboundResponse(Packet),

    /// An event the server session is raising so consuming applications can perform custom logic
    RaisedEvent(ServerSessionEvent<AF, VF>),

    /// The server session received a message that it could not handle.  This result
    /// allows the consumer application to do something with it if it wants to (special logging)
    UnhandleableMessageReceived(MessagePayload),
}
