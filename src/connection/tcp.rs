//! A channel over a TCP socket.
//!
//! Reading and writing are offloaded to Tokio tasks. The read task splits
//! the byte stream into frames with [`FrameCodec`], applying stream stages
//! before framing and frame stages after; it waits while auto-read is off.
//! Writes are transformed in the calling thread, under the pipeline lock,
//! and handed to the write task in order.

use super::{
    channel::{Channel, InboundSink, WriteCallback},
    ConnectionError,
};
use crate::{
    config::ConnectionConfig,
    lock,
    protocol::{
        pipeline::{Direction, Layer, Pipeline},
        FrameCodec,
    },
};
use bytes::{Bytes, BytesMut};
use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, Weak,
    },
    time::Duration,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt, BufWriter},
    net::{
        tcp::{OwnedReadHalf, OwnedWriteHalf},
        TcpStream, ToSocketAddrs,
    },
    sync::watch,
    task::{self, JoinHandle},
    time::timeout,
};
use tokio_util::codec::{Decoder as _, Encoder as _};

enum Command {
    Write(Bytes, Option<WriteCallback>),
    Flush,
    Close,
}

pub struct TcpChannel {
    open: AtomicBool,
    auto_read: watch::Sender<bool>,
    pipeline: Mutex<Pipeline>,
    commands: flume::Sender<Command>,
    reader: Mutex<Option<JoinHandle<()>>>,
    sink: Weak<dyn InboundSink>,
    remote: SocketAddr,
    max_frame_length: usize,
}

impl TcpChannel {
    /// Connects to `address` and starts the I/O tasks.
    pub async fn connect(
        address: impl ToSocketAddrs,
        sink: Weak<dyn InboundSink>,
        config: &ConnectionConfig,
    ) -> Result<Arc<Self>, ConnectionError> {
        let stream = TcpStream::connect(address).await?;
        Self::start(stream, sink, config)
    }

    /// Starts the I/O tasks for an established stream. Must be called
    /// within a Tokio runtime. Nothing is read until auto-read is enabled.
    pub fn start(
        stream: TcpStream,
        sink: Weak<dyn InboundSink>,
        config: &ConnectionConfig,
    ) -> Result<Arc<Self>, ConnectionError> {
        stream.set_nodelay(true)?;
        let remote = stream.peer_addr()?;
        let (reader, writer) = stream.into_split();
        let (commands, receiver) = flume::unbounded();
        let (auto_read, _) = watch::channel(false);

        let channel = Arc::new(Self {
            open: AtomicBool::new(true),
            auto_read,
            pipeline: Mutex::new(Pipeline::new()),
            commands,
            reader: Mutex::new(None),
            sink,
            remote,
            max_frame_length: config.max_frame_length,
        });

        task::spawn(write_loop(BufWriter::new(writer), receiver));
        let handle = task::spawn(read_loop(Arc::clone(&channel), reader, config.read_timeout));
        *lock(&channel.reader) = Some(handle);
        tracing::debug!(%remote, "TCP channel started");
        Ok(channel)
    }

    fn sink(&self) -> Option<Arc<dyn InboundSink>> {
        self.sink.upgrade()
    }
}

fn encode_frame(pipeline: &mut Pipeline, max_frame_length: usize, frame: Bytes) -> Result<Bytes, ConnectionError> {
    let frame = pipeline.run(Direction::Outbound, Layer::Frame, BytesMut::from(&frame[..]))?;
    let mut framed = BytesMut::with_capacity(frame.len() + 3);
    FrameCodec::new(max_frame_length).encode(frame.freeze(), &mut framed)?;
    Ok(pipeline.run(Direction::Outbound, Layer::Stream, framed)?.freeze())
}

async fn read_loop(channel: Arc<TcpChannel>, mut reader: OwnedReadHalf, read_timeout: Duration) {
    let mut auto_read = channel.auto_read.subscribe();
    let mut codec = FrameCodec::new(channel.max_frame_length);
    let mut plain = BytesMut::new();
    let mut raw = BytesMut::with_capacity(8192);

    loop {
        loop {
            if auto_read.wait_for(|enabled| *enabled).await.is_err() || !channel.is_open() {
                return;
            }
            let Some(sink) = channel.sink() else {
                return;
            };
            let frame = match codec.decode(&mut plain) {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => {
                    sink.exception_caught(e.into());
                    return;
                }
            };
            let result = lock(&channel.pipeline).run(Direction::Inbound, Layer::Frame, frame);
            match result {
                Ok(frame) => sink.frame_received(frame.freeze()),
                Err(e) => {
                    sink.exception_caught(e.into());
                    return;
                }
            }
        }

        raw.reserve(8192);
        let read = timeout(read_timeout, reader.read_buf(&mut raw)).await;
        match read {
            Err(_) => {
                if let Some(sink) = channel.sink() {
                    sink.exception_caught(ConnectionError::Timeout);
                }
                channel.close();
                return;
            }
            Ok(Ok(0)) => {
                channel.close();
                return;
            }
            Ok(Ok(_)) => {
                let result = lock(&channel.pipeline).run(Direction::Inbound, Layer::Stream, raw.split());
                match result {
                    Ok(data) => plain.extend_from_slice(&data),
                    Err(e) => {
                        if let Some(sink) = channel.sink() {
                            sink.exception_caught(e.into());
                        }
                        channel.close();
                        return;
                    }
                }
            }
            Ok(Err(e)) => {
                if let Some(sink) = channel.sink() {
                    sink.exception_caught(e.into());
                }
                channel.close();
                return;
            }
        }
    }
}

async fn write_loop(mut writer: BufWriter<OwnedWriteHalf>, commands: flume::Receiver<Command>) {
    while let Ok(command) = commands.recv_async().await {
        match command {
            Command::Write(data, callback) => {
                let result = writer.write_all(&data).await;
                let errored = result.is_err();
                match callback {
                    Some(callback) => callback(result.map_err(ConnectionError::from)),
                    None => {
                        if let Err(e) = result {
                            tracing::debug!(error = %e, "Write failed");
                        }
                    }
                }
                if errored {
                    break;
                }
            }
            Command::Flush => {
                if let Err(e) = writer.flush().await {
                    tracing::debug!(error = %e, "Flush failed");
                    break;
                }
            }
            Command::Close => {
                writer.flush().await.ok();
                writer.shutdown().await.ok();
                break;
            }
        }
    }
}

impl Channel for TcpChannel {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn set_auto_read(&self, enabled: bool) {
        self.auto_read.send_replace(enabled);
    }

    fn is_auto_read(&self) -> bool {
        *self.auto_read.borrow()
    }

    fn write(&self, frame: Bytes, callback: Option<WriteCallback>) {
        if !self.is_open() {
            if let Some(callback) = callback {
                callback(Err(ConnectionError::Closed));
            }
            return;
        }
        // Enqueued under the pipeline lock so stream stages see frames
        // in write order.
        let mut pipeline = lock(&self.pipeline);
        let rejected = match encode_frame(&mut pipeline, self.max_frame_length, frame) {
            Ok(data) => match self.commands.send(Command::Write(data, callback)) {
                Ok(()) => None,
                Err(flume::SendError(Command::Write(_, Some(callback)))) => Some((callback, ConnectionError::Closed)),
                Err(_) => None,
            },
            Err(e) => callback.map(|callback| (callback, e)),
        };
        drop(pipeline);
        if let Some((callback, error)) = rejected {
            callback(Err(error));
        }
    }

    fn flush(&self) {
        self.commands.send(Command::Flush).ok();
    }

    fn close(&self) {
        if !self.open.swap(false, Ordering::SeqCst) {
            return;
        }
        self.commands.send(Command::Close).ok();
        if let Some(reader) = lock(&self.reader).take() {
            reader.abort();
        }
        tracing::debug!(remote = %self.remote, "TCP channel closed");
        if let Some(sink) = self.sink() {
            sink.channel_inactive();
        }
    }

    fn pipeline(&self) -> &Mutex<Pipeline> {
        &self.pipeline
    }

    fn is_memory(&self) -> bool {
        false
    }

    fn remote_address(&self) -> String {
        self.remote.to_string()
    }
}
