//! One end of a protocol connection.
//!
//! A [`Connection`] owns the current [`Phase`], the registered listener and
//! a queue of packets written before the transport was ready. Outbound
//! packets are looked up in the registry, id-prefixed, encoded and handed
//! to the [`Channel`]; inbound frames are decoded in the current phase and
//! dispatched to the listener, hopping onto the listener's simulation
//! thread when it has one.
//!
//! Phase changes are driven by what is sent: writing a packet registered
//! in another phase moves the connection into that phase first, with
//! inbound reading paused across the switch so no frame is decoded in
//! the wrong phase.

pub mod channel;
pub mod memory;
pub mod tcp;

pub use channel::{Channel, InboundSink, WriteCallback};
pub use memory::MemoryChannel;
pub use tcp::TcpChannel;

use crate::{
    config::ConnectionConfig,
    executor::{ensure_running_on_same_thread, Affinity},
    lock,
    protocol::{
        packet::{server, side, ConnectionHandle, Packet, PacketListener, Side},
        pipeline::{
            CompressionEncoder, DecompressionDecoder, EncryptionKey, PipelineError, COMPRESS, DECOMPRESS, DECRYPT,
            ENCRYPT,
        },
        DecodeError, Decoder, EncodeError, Encoder, Phase, ProtocolRegistry,
    },
};
use bytes::Bytes;
use once_cell::sync::OnceCell;
use std::{
    collections::VecDeque,
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicU32, Ordering},
        Arc, Mutex, Weak,
    },
};

#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("timed out")]
    Timeout,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("cannot move from phase {from} to {to}")]
    PhaseRegression { from: Phase, to: Phase },
    #[error("packet {0} is not registered for this direction")]
    Unregistered(&'static str),
    #[error("encryption already enabled")]
    AlreadyEncrypted,
    #[error("channel closed")]
    Closed,
    #[error("packet skipped")]
    Skipped,
}

struct QueuedPacket<S: Side> {
    packet: Box<dyn Packet<S::PeerHandler>>,
    callback: Option<WriteCallback>,
}

#[derive(Debug, Default)]
struct PacketStats {
    tick_count: u32,
    average_sent: f32,
    average_received: f32,
}

/// A connection seen from side `S`.
pub struct Connection<S: Side> {
    this: Weak<Self>,
    registry: Arc<ProtocolRegistry>,
    config: ConnectionConfig,
    channel: OnceCell<Arc<dyn Channel>>,
    phase: Mutex<Phase>,
    listener: Mutex<Option<Arc<S::Handler>>>,
    queue: Mutex<VecDeque<QueuedPacket<S>>>,
    disconnect_reason: OnceCell<String>,
    disconnection_handled: AtomicBool,
    handling_fault: AtomicBool,
    encrypted: AtomicBool,
    sent_packets: AtomicU32,
    received_packets: AtomicU32,
    stats: Mutex<PacketStats>,
}

impl<S: Side> fmt::Debug for Connection<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("phase", &self.phase())
            .field("connected", &self.is_connected())
            .field("queued", &lock(&self.queue).len())
            .finish_non_exhaustive()
    }
}

impl<S: Side> Connection<S> {
    pub fn new(registry: Arc<ProtocolRegistry>, config: ConnectionConfig) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            registry,
            config,
            channel: OnceCell::new(),
            phase: Mutex::new(Phase::Handshake),
            listener: Mutex::new(None),
            queue: Mutex::new(VecDeque::new()),
            disconnect_reason: OnceCell::new(),
            disconnection_handled: AtomicBool::new(false),
            handling_fault: AtomicBool::new(false),
            encrypted: AtomicBool::new(false),
            sent_packets: AtomicU32::new(0),
            received_packets: AtomicU32::new(0),
            stats: Mutex::new(PacketStats::default()),
        })
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn registry(&self) -> &ProtocolRegistry {
        &self.registry
    }

    pub fn set_listener(&self, listener: Arc<S::Handler>) {
        *lock(&self.listener) = Some(listener);
    }

    pub fn listener(&self) -> Option<Arc<S::Handler>> {
        lock(&self.listener).clone()
    }

    pub fn phase(&self) -> Phase {
        *lock(&self.phase)
    }

    /// Enters `phase` and resumes inbound reading. Moving back to an
    /// earlier phase is refused and leaves the phase untouched.
    pub fn set_phase(&self, phase: Phase) -> Result<(), ConnectionError> {
        {
            let mut current = lock(&self.phase);
            let previous = *current;
            if !previous.can_transition_to(phase) {
                tracing::error!(from = %previous, to = %phase, "Refusing to move back a phase");
                return Err(ConnectionError::PhaseRegression {
                    from: previous,
                    to: phase,
                });
            }
            *current = phase;
            if previous != phase {
                tracing::debug!(%previous, %phase, "Switching phase");
            }
        }
        if let Some(channel) = self.channel.get() {
            channel.set_auto_read(true);
        }
        Ok(())
    }

    /// Whether a channel is attached and open.
    pub fn is_connected(&self) -> bool {
        self.channel.get().is_some_and(|channel| channel.is_open())
    }

    /// Whether no channel has been attached yet.
    pub fn is_connecting(&self) -> bool {
        self.channel.get().is_none()
    }

    pub fn is_memory(&self) -> bool {
        self.channel.get().is_some_and(|channel| channel.is_memory())
    }

    pub fn is_encrypted(&self) -> bool {
        self.encrypted.load(Ordering::SeqCst)
    }

    pub fn remote_address(&self) -> Option<String> {
        self.channel.get().map(|channel| channel.remote_address())
    }

    /// The reason given to the first effective [`Connection::disconnect`].
    pub fn disconnect_reason(&self) -> Option<&str> {
        self.disconnect_reason.get().map(String::as_str)
    }

    pub fn channel(&self) -> Option<&Arc<dyn Channel>> {
        self.channel.get()
    }

    /// Attaches the transport and starts reading from it. Packets queued
    /// so far are written on the next send or tick.
    pub fn channel_active(&self, channel: Arc<dyn Channel>) {
        if self.channel.set(Arc::clone(&channel)).is_err() {
            tracing::warn!("Channel activated twice");
            return;
        }
        tracing::debug!(remote = %channel.remote_address(), "Channel active");
        channel.set_auto_read(true);
    }

    pub fn queued_packets(&self) -> usize {
        lock(&self.queue).len()
    }

    /// Smoothed packets sent per stats interval.
    pub fn average_sent_packets(&self) -> f32 {
        lock(&self.stats).average_sent
    }

    /// Smoothed packets received per stats interval.
    pub fn average_received_packets(&self) -> f32 {
        lock(&self.stats).average_received
    }

    pub fn send(&self, packet: impl Packet<S::PeerHandler>) {
        self.send_boxed(Box::new(packet), None);
    }

    /// Sends `packet`, invoking `callback` once the write completes or fails.
    pub fn send_with(
        &self,
        packet: impl Packet<S::PeerHandler>,
        callback: impl FnOnce(Result<(), ConnectionError>) + Send + 'static,
    ) {
        self.send_boxed(Box::new(packet), Some(Box::new(callback)));
    }

    /// Writes `packet` now if connected, after anything still queued;
    /// otherwise queues it.
    pub fn send_boxed(&self, packet: Box<dyn Packet<S::PeerHandler>>, callback: Option<WriteCallback>) {
        if self.is_connected() {
            self.flush_queue();
            self.dispatch_packet(packet, callback);
        } else {
            lock(&self.queue).push_back(QueuedPacket { packet, callback });
        }
    }

    fn flush_queue(&self) {
        if !self.is_connected() {
            return;
        }
        loop {
            let next = lock(&self.queue).pop_front();
            let Some(QueuedPacket { packet, callback }) = next else {
                break;
            };
            self.dispatch_packet(packet, callback);
        }
    }

    fn dispatch_packet(&self, packet: Box<dyn Packet<S::PeerHandler>>, callback: Option<WriteCallback>) {
        let Some(channel) = self.channel.get() else {
            return;
        };
        let table = S::outbound(&self.registry);
        let Some((packet_phase, id)) = table.packet_id(&*packet) else {
            tracing::error!(packet = packet.name(), "Tried to send an unregistered packet");
            fail(callback, ConnectionError::Unregistered(packet.name()));
            self.exception_caught(ConnectionError::Unregistered(packet.name()));
            return;
        };
        self.sent_packets.fetch_add(1, Ordering::Relaxed);

        let current = self.phase();
        if packet_phase != current {
            if !current.can_transition_to(packet_phase) {
                tracing::error!(packet = packet.name(), from = %current, to = %packet_phase, "Refusing to move back a phase");
                fail(
                    callback,
                    ConnectionError::PhaseRegression {
                        from: current,
                        to: packet_phase,
                    },
                );
                return;
            }
            channel.set_auto_read(false);
        }

        let mut frame = Vec::new();
        let result = {
            let mut encoder = Encoder::new(&mut frame);
            encoder.write_var_int(id);
            packet.encode(&mut encoder)
        };
        if let Err(e) = result {
            if packet.is_skippable() {
                tracing::debug!(packet = packet.name(), error = %e, "Skipping packet due to errors");
                fail(callback, ConnectionError::Skipped);
            } else {
                tracing::error!(packet = packet.name(), error = %e, "Failed to encode packet");
                let message = e.to_string();
                fail(callback, e.into());
                self.exception_caught(EncodeError::Other(anyhow::anyhow!(message)).into());
            }
            if packet_phase != current {
                channel.set_auto_read(true);
            }
            return;
        }

        if packet_phase != current {
            if let Err(e) = self.set_phase(packet_phase) {
                channel.set_auto_read(true);
                fail(callback, e);
                return;
            }
        }
        tracing::trace!(packet = packet.name(), id, bytes = frame.len(), "Sending packet");
        channel.write(Bytes::from(frame), callback);
        channel.flush();
    }

    /// Writes queued packets, ticks the listener, flushes the channel and
    /// periodically updates the packet rate averages.
    pub fn tick(&self) {
        self.flush_queue();
        if let Some(listener) = self.listener() {
            listener.tick();
        }
        if let Some(channel) = self.channel.get() {
            channel.flush();
        }

        let mut stats = lock(&self.stats);
        if stats.tick_count % self.config.stats_interval_ticks.max(1) == 0 {
            let sent = self.sent_packets.swap(0, Ordering::Relaxed) as f32;
            let received = self.received_packets.swap(0, Ordering::Relaxed) as f32;
            stats.average_sent = stats.average_sent * 0.75 + sent * 0.25;
            stats.average_received = stats.average_received * 0.75 + received * 0.25;
        }
        stats.tick_count = stats.tick_count.wrapping_add(1);
    }

    /// Turns compression on with `threshold`, adjusts the threshold if it
    /// is already on, or turns it off when `threshold` is negative.
    pub fn setup_compression(&self, threshold: i32) -> Result<(), ConnectionError> {
        let channel = self.channel.get().ok_or(ConnectionError::Closed)?;
        let mut pipeline = lock(channel.pipeline());
        match usize::try_from(threshold) {
            Ok(threshold) => {
                match pipeline.get_mut::<DecompressionDecoder>(DECOMPRESS) {
                    Some(stage) => stage.set_threshold(threshold),
                    None => pipeline.add_last(DECOMPRESS, DecompressionDecoder::new(threshold))?,
                }
                match pipeline.get_mut::<CompressionEncoder>(COMPRESS) {
                    Some(stage) => stage.set_threshold(threshold),
                    None => pipeline.add_last(COMPRESS, CompressionEncoder::new(threshold))?,
                }
                tracing::debug!(threshold, "Compression enabled");
            }
            Err(_) => {
                pipeline.remove(DECOMPRESS);
                pipeline.remove(COMPRESS);
                tracing::debug!("Compression disabled");
            }
        }
        Ok(())
    }

    /// Installs the cipher stages. Encryption cannot be changed once on.
    pub fn set_encryption(&self, key: EncryptionKey) -> Result<(), ConnectionError> {
        let channel = self.channel.get().ok_or(ConnectionError::Closed)?;
        if self.encrypted.swap(true, Ordering::SeqCst) {
            return Err(ConnectionError::AlreadyEncrypted);
        }
        let mut pipeline = lock(channel.pipeline());
        pipeline.add_first(DECRYPT, key.decryptor())?;
        pipeline.add_first(ENCRYPT, key.encryptor())?;
        tracing::debug!("Encryption enabled");
        Ok(())
    }

    /// Closes the channel, recording `reason` if this is the call that
    /// closed it.
    pub fn disconnect(&self, reason: &str) {
        match self.channel.get() {
            Some(channel) if channel.is_open() => {
                // Recorded before closing so the inactive notification
                // cannot claim the reason.
                let _ = self.disconnect_reason.set(reason.to_owned());
                tracing::debug!(reason, "Disconnecting");
                channel.close();
            }
            Some(_) => {}
            None => {
                let _ = self.disconnect_reason.set(reason.to_owned());
            }
        }
    }

    /// Notifies the listener that the connection closed. Does nothing
    /// without a channel or while it is still open; later calls only warn.
    pub fn handle_disconnection(&self) {
        if self.channel.get().map_or(true, |channel| channel.is_open()) {
            return;
        }
        if self.disconnection_handled.swap(true, Ordering::SeqCst) {
            tracing::warn!("handle_disconnection() called twice");
            return;
        }
        let listener = lock(&self.listener).take();
        if let Some(listener) = listener {
            listener.on_disconnect(self.disconnect_reason().unwrap_or("Disconnected"));
        }
    }

    pub fn is_disconnection_handled(&self) -> bool {
        self.disconnection_handled.load(Ordering::SeqCst)
    }

    fn process_packet(&self, packet: Box<dyn Packet<S::Handler>>) {
        let Some(listener) = self.listener() else {
            tracing::debug!(packet = packet.name(), "No listener; dropping packet");
            return;
        };
        let packet = match listener.executor() {
            Some(executor) => match ensure_running_on_same_thread(packet, &listener, executor) {
                Affinity::ProcessNow(packet) => packet,
                Affinity::Handled => return,
            },
            None => packet,
        };
        packet.dispatch(&*listener);
    }
}

fn fail(callback: Option<WriteCallback>, error: ConnectionError) {
    if let Some(callback) = callback {
        callback(Err(error));
    }
}

impl<S: Side> InboundSink for Connection<S> {
    fn frame_received(&self, frame: Bytes) {
        if !self.is_connected() {
            return;
        }
        self.received_packets.fetch_add(1, Ordering::Relaxed);
        let phase = self.phase();
        let mut decoder = Decoder::with_nbt_budget(&frame, self.config.nbt_budget_bytes);
        let result = decoder
            .read_var_int()
            .and_then(|id| S::inbound(&self.registry).decode(phase, id, &mut decoder));
        match result {
            Ok(packet) => {
                tracing::trace!(packet = packet.name(), "Received packet");
                self.process_packet(packet);
            }
            Err(e) => self.exception_caught(e.into()),
        }
    }

    fn channel_inactive(&self) {
        self.disconnect("End of stream");
    }

    fn exception_caught(&self, error: ConnectionError) {
        let first_fault = !self.handling_fault.swap(true, Ordering::SeqCst);
        let Some(channel) = self.channel.get() else {
            return;
        };
        if !channel.is_open() {
            return;
        }
        if matches!(error, ConnectionError::Timeout) {
            tracing::debug!("Timeout");
            self.disconnect("Timed out");
            return;
        }

        let reason = format!("Internal Exception: {error}");
        if !first_fault {
            tracing::debug!(%error, "Double fault");
            self.disconnect(&reason);
            return;
        }
        tracing::debug!(%error, "Failed to handle connection");
        match S::disconnect_notice(self.phase(), &reason) {
            Some(notice) => {
                let this = self.this.clone();
                let callback: WriteCallback = Box::new(move |_| {
                    if let Some(connection) = this.upgrade() {
                        connection.disconnect(&reason);
                    }
                });
                self.dispatch_packet(notice, Some(callback));
                channel.set_auto_read(false);
            }
            None => self.disconnect(&reason),
        }
    }
}

impl<S: Side> ConnectionHandle for Connection<S> {
    fn is_connected(&self) -> bool {
        Connection::is_connected(self)
    }

    fn disconnect(&self, reason: &str) {
        Connection::disconnect(self, reason)
    }

    fn phase(&self) -> Phase {
        Connection::phase(self)
    }
}

impl<S: Side> Connection<S> {
    /// Attaches `channel` and routes its inbound events here.
    pub fn connect_memory(self: &Arc<Self>, channel: Arc<MemoryChannel>) {
        let sink: Weak<dyn InboundSink> = Arc::downgrade(self) as Weak<dyn InboundSink>;
        channel.bind(sink);
        self.channel_active(channel);
    }
}

impl Connection<side::Server> {
    /// Tells the client the configured compression threshold and
    /// compresses everything written after it. A negative threshold
    /// leaves compression off.
    pub fn negotiate_compression(&self) -> Result<(), ConnectionError> {
        let threshold = self.config.compression_threshold;
        if threshold < 0 {
            return Ok(());
        }
        if !self.is_connected() {
            return Err(ConnectionError::Closed);
        }
        let phase = self.phase();
        if !phase.can_transition_to(Phase::Login) {
            return Err(ConnectionError::PhaseRegression {
                from: phase,
                to: Phase::Login,
            });
        }
        self.flush_queue();
        self.send(server::login::LoginCompression { threshold });
        self.setup_compression(threshold)
    }
}
