/// A message stream the client is actively publishing on, keyed in the
/// session by its message stream id.
pub struct PublishedStream {
    pub stream_key: String,
}
