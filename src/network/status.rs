//! A listener that answers server list pings and turns away logins.

use super::ServerConnection;
use crate::protocol::{
    packet::{
        client,
        server::{self, TextComponent},
        ConnectionHandle, PacketListener, ServerHandler,
    },
    Phase, PROTOCOL_VERSION,
};
use serde::Serialize;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

pub const VERSION_NAME: &str = "1.16.5";

/// What the server list shows.
#[derive(Debug, Clone)]
pub struct ServerStatus {
    pub motd: String,
    pub max_players: u32,
    pub online_players: u32,
}

#[derive(Serialize)]
struct StatusJson<'a> {
    version: VersionJson,
    players: PlayersJson,
    description: &'a TextComponent,
}

#[derive(Serialize)]
struct VersionJson {
    name: &'static str,
    protocol: i32,
}

#[derive(Serialize)]
struct PlayersJson {
    max: u32,
    online: u32,
}

impl ServerStatus {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&StatusJson {
            version: VersionJson {
                name: VERSION_NAME,
                protocol: PROTOCOL_VERSION,
            },
            players: PlayersJson {
                max: self.max_players,
                online: self.online_players,
            },
            description: &TextComponent::plain(self.motd.as_str()),
        })
    }
}

/// Holds its connection strongly; the cycle is broken when the
/// connection drops its listener on disconnection.
pub struct StatusListener {
    connection: Arc<ServerConnection>,
    status: ServerStatus,
    answered: AtomicBool,
}

impl StatusListener {
    pub fn new(connection: &Arc<ServerConnection>, status: ServerStatus) -> Arc<Self> {
        Arc::new(Self {
            connection: Arc::clone(connection),
            status,
            answered: AtomicBool::new(false),
        })
    }
}

impl PacketListener for StatusListener {
    fn on_disconnect(&self, reason: &str) {
        tracing::debug!("Status connection closed: {reason}");
    }

    fn connection(&self) -> &dyn ConnectionHandle {
        &*self.connection
    }
}

impl ServerHandler for StatusListener {
    fn handle_intention(&self, packet: client::handshake::ClientIntention) {
        let connection = &self.connection;
        let phase = packet.next_phase.phase();
        if connection.set_phase(phase).is_err() {
            connection.disconnect("Protocol error");
            return;
        }
        if phase == Phase::Login {
            let reason = if packet.protocol_version != PROTOCOL_VERSION {
                format!("Outdated client! Please use {VERSION_NAME}")
            } else {
                "This server only answers status requests".to_owned()
            };
            let notice = match server::text_component(&reason) {
                Ok(reason) => server::login::LoginDisconnect { reason },
                Err(e) => {
                    tracing::error!(error = %e, "Failed to write disconnect reason");
                    connection.disconnect(&reason);
                    return;
                }
            };
            let weak = Arc::downgrade(connection);
            connection.send_with(notice, move |_| {
                if let Some(connection) = weak.upgrade() {
                    connection.disconnect(&reason);
                }
            });
        }
    }

    fn handle_status_request(&self, _packet: client::status::StatusRequest) {
        if self.answered.swap(true, Ordering::SeqCst) {
            self.connection.disconnect("Protocol error");
            return;
        }
        match self.status.to_json() {
            Ok(json) => self.connection.send(server::status::StatusResponse { json }),
            Err(e) => {
                tracing::error!(error = %e, "Failed to write server status");
                self.connection.disconnect("Internal error");
            }
        }
    }

    fn handle_ping_request(&self, packet: client::status::PingRequest) {
        self.connection.send(server::status::Pong { time: packet.time });
        self.connection.disconnect("Status request has been handled.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_json_is_well_formed() {
        let status = ServerStatus {
            motd: "Hello \"world\"".to_owned(),
            max_players: 20,
            online_players: 3,
        };
        assert_eq!(
            status.to_json().unwrap(),
            r#"{"version":{"name":"1.16.5","protocol":754},"players":{"max":20,"online":3},"description":{"text":"Hello \"world\""}}"#
        );
    }
}
