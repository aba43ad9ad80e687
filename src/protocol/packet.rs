//! The packet contract and the baseline packet set.
//!
//! Every packet type can write itself through an [`Encoder`](super::Encoder),
//! be constructed from a [`Decoder`](super::Decoder) and dispatch itself
//! to one method of the handler for its direction: packets in [`client`]
//! are sent by the client and handled by a [`ServerHandler`], packets in
//! [`server`] are sent by the server and handled by a [`ClientHandler`].

use super::{Encode, PacketFlow, PacketTable, Phase, ProtocolRegistry};
use crate::executor::SimulationExecutor;
use std::{any::TypeId, fmt::Debug};

pub mod client;
pub mod server;

/// A message that can be written to the wire and handled by `H`.
pub trait Packet<H: ?Sized>: Encode + Debug + Send + 'static {
    /// Calls the handler method for this packet.
    fn dispatch(self: Box<Self>, handler: &H);

    /// Whether a failure to encode this packet may be logged and
    /// dropped instead of tearing down the connection.
    fn is_skippable(&self) -> bool {
        false
    }

    fn packet_type_id(&self) -> TypeId {
        TypeId::of::<Self>()
    }

    fn name(&self) -> &'static str {
        let name = std::any::type_name::<Self>();
        name.rsplit("::").next().unwrap_or(name)
    }
}

/// Connection operations available to handlers.
pub trait ConnectionHandle: Send + Sync {
    fn is_connected(&self) -> bool;

    fn disconnect(&self, reason: &str);

    fn phase(&self) -> Phase;
}

/// Capabilities shared by the handlers of both directions.
pub trait PacketListener: Send + Sync + 'static {
    /// Called exactly once when the connection has closed.
    fn on_disconnect(&self, reason: &str);

    fn connection(&self) -> &dyn ConnectionHandle;

    /// Per-tick maintenance, such as keep-alive bookkeeping.
    fn tick(&self) {}

    /// The executor packets must be handled on, if any. When set,
    /// packets decoded on another thread are re-dispatched onto it.
    fn executor(&self) -> Option<&SimulationExecutor> {
        None
    }
}

macro_rules! handler_methods {
    ($($method:ident($packet:ty);)*) => {
        $(
            fn $method(&self, packet: $packet) {
                tracing::debug!(?packet, "Ignoring unhandled packet");
            }
        )*
    };
}

/// Handles packets sent by the client.
pub trait ServerHandler: PacketListener {
    handler_methods! {
        handle_intention(client::handshake::ClientIntention);
        handle_status_request(client::status::StatusRequest);
        handle_ping_request(client::status::PingRequest);
        handle_hello(client::login::Hello);
        handle_key(client::login::Key);
        handle_keep_alive(client::play::KeepAlive);
        handle_chat(client::play::Chat);
        handle_set_creative_mode_slot(client::play::SetCreativeModeSlot);
        handle_use_item_on(client::play::UseItemOn);
    }
}

/// Handles packets sent by the server.
pub trait ClientHandler: PacketListener {
    handler_methods! {
        handle_status_response(server::status::StatusResponse);
        handle_pong(server::status::Pong);
        handle_login_disconnect(server::login::LoginDisconnect);
        handle_hello(server::login::Hello);
        handle_game_profile(server::login::GameProfile);
        handle_login_compression(server::login::LoginCompression);
        handle_keep_alive(server::play::KeepAlive);
        handle_disconnect(server::play::Disconnect);
        handle_chat(server::play::Chat);
        handle_block_entity_data(server::play::BlockEntityData);
        handle_container_set_slot(server::play::ContainerSetSlot);
    }
}

/// Type encoding for a side (client or server).
pub trait Side: Send + Sync + 'static + Copy + Clone {
    /// Handler for the packets this side receives.
    type Handler: PacketListener + ?Sized;
    /// Handler for the packets this side sends.
    type PeerHandler: ?Sized + 'static;

    /// Direction of the packets this side receives.
    const RECEIVES: PacketFlow;

    fn inbound(registry: &ProtocolRegistry) -> &PacketTable<Self::Handler>;

    fn outbound(registry: &ProtocolRegistry) -> &PacketTable<Self::PeerHandler>;

    /// A packet telling the peer why the connection is closing, if
    /// this side has one for `phase`.
    fn disconnect_notice(phase: Phase, reason: &str) -> Option<Box<dyn Packet<Self::PeerHandler>>>;
}

pub mod side {
    use super::*;

    #[derive(Debug, Copy, Clone)]
    pub struct Server;
    impl Side for Server {
        type Handler = dyn ServerHandler;
        type PeerHandler = dyn ClientHandler;

        const RECEIVES: PacketFlow = PacketFlow::Serverbound;

        fn inbound(registry: &ProtocolRegistry) -> &PacketTable<Self::Handler> {
            registry.serverbound()
        }

        fn outbound(registry: &ProtocolRegistry) -> &PacketTable<Self::PeerHandler> {
            registry.clientbound()
        }

        fn disconnect_notice(phase: Phase, reason: &str) -> Option<Box<dyn Packet<Self::PeerHandler>>> {
            let reason = server::text_component(reason).ok()?;
            match phase {
                Phase::Login => Some(Box::new(server::login::LoginDisconnect { reason })),
                Phase::Play => Some(Box::new(server::play::Disconnect { reason })),
                Phase::Handshake | Phase::Status => None,
            }
        }
    }

    #[derive(Debug, Copy, Clone)]
    pub struct Client;
    impl Side for Client {
        type Handler = dyn ClientHandler;
        type PeerHandler = dyn ServerHandler;

        const RECEIVES: PacketFlow = PacketFlow::Clientbound;

        fn inbound(registry: &ProtocolRegistry) -> &PacketTable<Self::Handler> {
            registry.clientbound()
        }

        fn outbound(registry: &ProtocolRegistry) -> &PacketTable<Self::PeerHandler> {
            registry.serverbound()
        }

        fn disconnect_notice(_phase: Phase, _reason: &str) -> Option<Box<dyn Packet<Self::PeerHandler>>> {
            None
        }
    }
}

/// Implements [`Packet`] for each listed type, dispatching to the
/// named handler method.
macro_rules! packets {
    ($handler:ty { $($packet:ty => $method:ident;)* }) => {
        $(
            impl $crate::protocol::packet::Packet<$handler> for $packet {
                fn dispatch(self: Box<Self>, handler: &$handler) {
                    handler.$method(*self);
                }
            }
        )*
    };
}

pub(crate) use packets;
