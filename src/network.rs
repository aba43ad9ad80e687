//! The set of live server-side connections, and helpers to open new ones.

pub mod status;

use crate::{
    config::ConnectionConfig,
    connection::{Connection, ConnectionError, InboundSink, MemoryChannel, TcpChannel},
    lock,
    protocol::{
        packet::{side, ClientHandler, ServerHandler},
        ProtocolRegistry,
    },
};
use std::{
    net::SocketAddr,
    sync::{Arc, Mutex, Weak},
};
use tokio::{
    net::{TcpListener, TcpStream, ToSocketAddrs},
    task,
};

pub type ServerConnection = Connection<side::Server>;
pub type ClientConnection = Connection<side::Client>;

/// Builds the listener for a newly accepted connection.
pub type ListenerFactory = Arc<dyn Fn(&Arc<ServerConnection>) -> Arc<dyn ServerHandler> + Send + Sync>;

fn sink_of<S: crate::protocol::packet::Side>(connection: &Arc<Connection<S>>) -> Weak<dyn InboundSink> {
    Arc::downgrade(connection) as Weak<dyn InboundSink>
}

/// Owns the server's connections. [`NetworkSystem::tick`] is called once
/// per simulation tick.
pub struct NetworkSystem {
    registry: Arc<ProtocolRegistry>,
    config: ConnectionConfig,
    connections: Mutex<Vec<Arc<ServerConnection>>>,
}

impl NetworkSystem {
    pub fn new(registry: Arc<ProtocolRegistry>, config: ConnectionConfig) -> Arc<Self> {
        Arc::new(Self {
            registry,
            config,
            connections: Mutex::new(Vec::new()),
        })
    }

    pub fn registry(&self) -> &Arc<ProtocolRegistry> {
        &self.registry
    }

    pub fn len(&self) -> usize {
        lock(&self.connections).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.connections).is_empty()
    }

    pub fn connections(&self) -> Vec<Arc<ServerConnection>> {
        lock(&self.connections).clone()
    }

    fn new_connection(&self) -> Arc<ServerConnection> {
        Connection::new(Arc::clone(&self.registry), self.config.clone())
    }

    /// Listens on `address` and accepts connections in a background
    /// task. Returns the bound address.
    pub async fn bind(self: &Arc<Self>, address: impl ToSocketAddrs, factory: ListenerFactory) -> Result<SocketAddr, ConnectionError> {
        let listener = TcpListener::bind(address).await?;
        let local = listener.local_addr()?;
        tracing::info!("Listening on {local}");

        let system = Arc::clone(self);
        task::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, remote)) => {
                        tracing::info!("Accepted connection from {remote}");
                        if let Err(e) = system.accept(stream, &factory) {
                            tracing::warn!("Failed to set up connection from {remote}: {e}");
                        }
                    }
                    Err(e) => tracing::warn!("Accept failed: {e}"),
                }
            }
        });
        Ok(local)
    }

    /// Adopts an accepted stream.
    pub fn accept(&self, stream: TcpStream, factory: &ListenerFactory) -> Result<Arc<ServerConnection>, ConnectionError> {
        let connection = self.new_connection();
        let channel = TcpChannel::start(stream, sink_of(&connection), &self.config)?;
        connection.set_listener(factory(&connection));
        connection.channel_active(channel);
        lock(&self.connections).push(Arc::clone(&connection));
        Ok(connection)
    }

    /// Opens an in-process connection. Returns the server end, already
    /// registered, and the client end's channel.
    pub fn connect_in_memory(
        &self,
        factory: impl FnOnce(&Arc<ServerConnection>) -> Arc<dyn ServerHandler>,
    ) -> (Arc<ServerConnection>, Arc<MemoryChannel>) {
        let (server_end, client_end) = MemoryChannel::pair();
        let connection = self.new_connection();
        connection.set_listener(factory(&connection));
        connection.connect_memory(server_end);
        lock(&self.connections).push(Arc::clone(&connection));
        (connection, client_end)
    }

    /// Ticks every open connection. Closed ones get their disconnection
    /// handled and are dropped.
    pub fn tick(&self) {
        let connections = self.connections();
        let mut closed = 0;
        for connection in &connections {
            if connection.is_connecting() {
                continue;
            }
            if connection.is_connected() {
                connection.tick();
            } else {
                connection.handle_disconnection();
                closed += 1;
            }
        }
        if closed > 0 {
            lock(&self.connections).retain(|connection| !connection.is_disconnection_handled());
            tracing::debug!(closed, "Removed closed connections");
        }
    }

    /// Disconnects every connection.
    pub fn stop(&self) {
        for connection in self.connections() {
            connection.disconnect("Server closed");
        }
    }
}

/// Connects to a server over TCP.
pub async fn connect_to_server(
    address: impl ToSocketAddrs,
    registry: Arc<ProtocolRegistry>,
    config: ConnectionConfig,
    factory: impl FnOnce(&Arc<ClientConnection>) -> Arc<dyn ClientHandler>,
) -> Result<Arc<ClientConnection>, ConnectionError> {
    let connection = Connection::<side::Client>::new(registry, config);
    let channel = TcpChannel::connect(address, sink_of(&connection), connection.config()).await?;
    connection.set_listener(factory(&connection));
    connection.channel_active(channel);
    Ok(connection)
}
