//! An in-process channel. Frames are handed over without a length
//! prefix, but still pass through the pipeline.

use super::{
    channel::{Channel, InboundSink, WriteCallback},
    ConnectionError,
};
use crate::{lock, protocol::pipeline::Pipeline};
use bytes::{Bytes, BytesMut};
use once_cell::sync::OnceCell;
use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, Weak,
    },
    thread,
};

pub struct MemoryChannel {
    open: AtomicBool,
    auto_read: AtomicBool,
    auto_read_history: Mutex<Vec<bool>>,
    pipeline: Mutex<Pipeline>,
    outbound: Mutex<Option<flume::Sender<Bytes>>>,
    sink: OnceCell<Weak<dyn InboundSink>>,
    /// Inbound frames held back while auto-read is off.
    held: Mutex<VecDeque<Bytes>>,
    draining: Mutex<()>,
}

impl MemoryChannel {
    /// Creates an open channel. Everything written to it comes out of
    /// the returned receiver, after the outbound pipeline.
    pub fn new() -> (Arc<Self>, flume::Receiver<Bytes>) {
        let (sender, receiver) = flume::unbounded();
        let channel = Arc::new(Self {
            open: AtomicBool::new(true),
            auto_read: AtomicBool::new(true),
            auto_read_history: Mutex::new(Vec::new()),
            pipeline: Mutex::new(Pipeline::new()),
            outbound: Mutex::new(Some(sender)),
            sink: OnceCell::new(),
            held: Mutex::new(VecDeque::new()),
            draining: Mutex::new(()),
        });
        (channel, receiver)
    }

    /// Creates two channels wired to each other: what one writes, the
    /// other receives. Closing either closes both.
    pub fn pair() -> (Arc<Self>, Arc<Self>) {
        let (a, a_out) = Self::new();
        let (b, b_out) = Self::new();
        pump(a_out, Arc::downgrade(&b));
        pump(b_out, Arc::downgrade(&a));
        (a, b)
    }

    /// Sets the receiver of inbound events. Only the first call has
    /// any effect.
    pub fn bind(&self, sink: Weak<dyn InboundSink>) {
        if self.sink.set(sink).is_err() {
            tracing::warn!("Memory channel bound twice");
        }
    }

    fn sink(&self) -> Option<Arc<dyn InboundSink>> {
        self.sink.get().and_then(Weak::upgrade)
    }

    /// Feeds one frame into the read side.
    pub fn deliver(&self, frame: Bytes) {
        if !self.is_open() {
            return;
        }
        let result = lock(&self.pipeline).inbound(BytesMut::from(&frame[..]));
        match result {
            Ok(frame) => {
                lock(&self.held).push_back(frame.freeze());
                self.drain_held();
            }
            Err(e) => {
                if let Some(sink) = self.sink() {
                    sink.exception_caught(e.into());
                }
            }
        }
    }

    fn drain_held(&self) {
        loop {
            {
                // Re-entrant calls leave the frames to the outer loop.
                let Ok(_guard) = self.draining.try_lock() else {
                    return;
                };
                while self.is_auto_read() {
                    let next = lock(&self.held).pop_front();
                    let Some(frame) = next else {
                        break;
                    };
                    match self.sink() {
                        Some(sink) => sink.frame_received(frame),
                        None => break,
                    }
                }
            }
            if !self.is_auto_read() || lock(&self.held).is_empty() || self.sink().is_none() {
                return;
            }
        }
    }

    /// Every value passed to [`Channel::set_auto_read`], in order.
    pub fn auto_read_history(&self) -> Vec<bool> {
        lock(&self.auto_read_history).clone()
    }

    pub fn held_frames(&self) -> usize {
        lock(&self.held).len()
    }
}

fn pump(frames: flume::Receiver<Bytes>, peer: Weak<MemoryChannel>) {
    thread::Builder::new()
        .name("memory-channel".to_owned())
        .spawn(move || {
            for frame in frames.iter() {
                match peer.upgrade() {
                    Some(peer) => peer.deliver(frame),
                    None => return,
                }
            }
            if let Some(peer) = peer.upgrade() {
                peer.close();
            }
        })
        .map(drop)
        .unwrap_or_else(|e| tracing::error!("Failed to spawn memory channel pump: {e}"));
}

impl Channel for MemoryChannel {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn set_auto_read(&self, enabled: bool) {
        lock(&self.auto_read_history).push(enabled);
        self.auto_read.store(enabled, Ordering::SeqCst);
        if enabled {
            self.drain_held();
        }
    }

    fn is_auto_read(&self) -> bool {
        self.auto_read.load(Ordering::SeqCst)
    }

    fn write(&self, frame: Bytes, callback: Option<WriteCallback>) {
        let result = if self.is_open() {
            let data = lock(&self.pipeline).outbound(BytesMut::from(&frame[..]));
            data.map_err(ConnectionError::from).and_then(|data| {
                let sent = lock(&self.outbound)
                    .as_ref()
                    .is_some_and(|sender| sender.send(data.freeze()).is_ok());
                if sent {
                    Ok(())
                } else {
                    Err(ConnectionError::Closed)
                }
            })
        } else {
            Err(ConnectionError::Closed)
        };
        if let Some(callback) = callback {
            callback(result);
        }
    }

    fn flush(&self) {}

    fn close(&self) {
        if !self.open.swap(false, Ordering::SeqCst) {
            return;
        }
        lock(&self.outbound).take();
        if let Some(sink) = self.sink() {
            sink.channel_inactive();
        }
    }

    fn pipeline(&self) -> &Mutex<Pipeline> {
        &self.pipeline
    }

    fn is_memory(&self) -> bool {
        true
    }

    fn remote_address(&self) -> String {
        "local".to_owned()
    }
}
