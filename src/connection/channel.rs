use super::ConnectionError;
use crate::protocol::pipeline::Pipeline;
use bytes::Bytes;
use std::sync::Mutex;

/// Notified once a write has been handed to the transport, or failed.
pub type WriteCallback = Box<dyn FnOnce(Result<(), ConnectionError>) + Send>;

/// A duplex transport carrying whole frames.
///
/// Outbound frames pass through the channel's [`Pipeline`] before they
/// reach the wire; inbound frames pass through it before they reach the
/// [`InboundSink`].
pub trait Channel: Send + Sync {
    fn is_open(&self) -> bool;

    /// Pauses or resumes delivery of inbound frames.
    fn set_auto_read(&self, enabled: bool);

    fn is_auto_read(&self) -> bool;

    /// Queues one frame (packet id plus body) for writing. Frames are
    /// written in call order.
    fn write(&self, frame: Bytes, callback: Option<WriteCallback>);

    fn flush(&self);

    /// Closes the transport. Closing a closed channel does nothing.
    fn close(&self);

    fn pipeline(&self) -> &Mutex<Pipeline>;

    /// Whether both peers live in this process.
    fn is_memory(&self) -> bool;

    fn remote_address(&self) -> String;
}

/// Receives events from a [`Channel`]'s read side.
pub trait InboundSink: Send + Sync {
    fn frame_received(&self, frame: Bytes);

    /// The transport has closed.
    fn channel_inactive(&self);

    fn exception_caught(&self, error: ConnectionError);
}
