//! Lookup tables between packet types and their (phase, id) on the wire,
//! built once per process and shared by every connection.

use super::{
    packet::{client, server, ClientHandler, Packet, ServerHandler},
    Decode, DecodeError, Decoder, PacketFlow, Phase,
};
use ahash::AHashMap;
use std::any::TypeId;

/// Reads one packet body.
pub type PacketConstructor<H> = fn(&mut Decoder) -> Result<Box<dyn Packet<H>>, DecodeError>;

fn construct<H, P>(decoder: &mut Decoder) -> Result<Box<dyn Packet<H>>, DecodeError>
where
    H: ?Sized + 'static,
    P: Packet<H> + Decode,
{
    Ok(Box::new(P::decode(decoder)?))
}

struct Entry<H: ?Sized + 'static> {
    construct: PacketConstructor<H>,
    name: &'static str,
}

/// Packets of one direction, handled by `H`.
pub struct PacketTable<H: ?Sized + 'static> {
    flow: PacketFlow,
    by_id: AHashMap<(Phase, i32), Entry<H>>,
    by_type: AHashMap<TypeId, (Phase, i32)>,
}

impl<H: ?Sized + 'static> PacketTable<H> {
    pub fn new(flow: PacketFlow) -> Self {
        Self {
            flow,
            by_id: AHashMap::new(),
            by_type: AHashMap::new(),
        }
    }

    pub fn flow(&self) -> PacketFlow {
        self.flow
    }

    /// Registers `P` under `id` in `phase`.
    ///
    /// # Panics
    /// Panics if the id or the type is already registered; tables are
    /// built once at startup from a fixed list.
    pub fn register<P>(&mut self, phase: Phase, id: i32) -> &mut Self
    where
        P: Packet<H> + Decode,
    {
        let name = std::any::type_name::<P>();
        let previous = self.by_id.insert(
            (phase, id),
            Entry {
                construct: construct::<H, P>,
                name,
            },
        );
        assert!(previous.is_none(), "duplicate packet id {id:#04x} in {phase:?} for {name}");
        let previous = self.by_type.insert(TypeId::of::<P>(), (phase, id));
        assert!(previous.is_none(), "packet {name} registered twice");
        self
    }

    /// The phase and id of `packet`, if its type is registered.
    pub fn packet_id(&self, packet: &dyn Packet<H>) -> Option<(Phase, i32)> {
        self.by_type.get(&packet.packet_type_id()).copied()
    }

    pub fn packet_name(&self, phase: Phase, id: i32) -> Option<&'static str> {
        self.by_id.get(&(phase, id)).map(|entry| entry.name)
    }

    /// Decodes a packet body with the constructor registered for
    /// `(phase, id)`. Bytes left over after the body are an error.
    pub fn decode(&self, phase: Phase, id: i32, decoder: &mut Decoder) -> Result<Box<dyn Packet<H>>, DecodeError> {
        let entry = self
            .by_id
            .get(&(phase, id))
            .ok_or(DecodeError::UnknownPacket { phase, id })?;
        let packet = (entry.construct)(decoder)?;
        if !decoder.is_finished() {
            return Err(DecodeError::TrailingBytes {
                packet: packet.name(),
                remaining: decoder.remaining(),
            });
        }
        Ok(packet)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Both directions of the protocol.
pub struct ProtocolRegistry {
    serverbound: PacketTable<dyn ServerHandler>,
    clientbound: PacketTable<dyn ClientHandler>,
}

impl ProtocolRegistry {
    pub fn new(
        serverbound: PacketTable<dyn ServerHandler>,
        clientbound: PacketTable<dyn ClientHandler>,
    ) -> Self {
        Self {
            serverbound,
            clientbound,
        }
    }

    /// The baseline packet set of protocol 754.
    pub fn vanilla() -> Self {
        let mut serverbound = PacketTable::new(PacketFlow::Serverbound);
        serverbound
            .register::<client::handshake::ClientIntention>(Phase::Handshake, 0x00)
            .register::<client::status::StatusRequest>(Phase::Status, 0x00)
            .register::<client::status::PingRequest>(Phase::Status, 0x01)
            .register::<client::login::Hello>(Phase::Login, 0x00)
            .register::<client::login::Key>(Phase::Login, 0x01)
            .register::<client::play::Chat>(Phase::Play, 0x03)
            .register::<client::play::KeepAlive>(Phase::Play, 0x10)
            .register::<client::play::SetCreativeModeSlot>(Phase::Play, 0x28)
            .register::<client::play::UseItemOn>(Phase::Play, 0x2E);

        let mut clientbound = PacketTable::new(PacketFlow::Clientbound);
        clientbound
            .register::<server::status::StatusResponse>(Phase::Status, 0x00)
            .register::<server::status::Pong>(Phase::Status, 0x01)
            .register::<server::login::LoginDisconnect>(Phase::Login, 0x00)
            .register::<server::login::Hello>(Phase::Login, 0x01)
            .register::<server::login::GameProfile>(Phase::Login, 0x02)
            .register::<server::login::LoginCompression>(Phase::Login, 0x03)
            .register::<server::play::BlockEntityData>(Phase::Play, 0x09)
            .register::<server::play::Chat>(Phase::Play, 0x0E)
            .register::<server::play::ContainerSetSlot>(Phase::Play, 0x15)
            .register::<server::play::Disconnect>(Phase::Play, 0x19)
            .register::<server::play::KeepAlive>(Phase::Play, 0x1F);

        Self::new(serverbound, clientbound)
    }

    pub fn serverbound(&self) -> &PacketTable<dyn ServerHandler> {
        &self.serverbound
    }

    pub fn clientbound(&self) -> &PacketTable<dyn ClientHandler> {
        &self.clientbound
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Encode, Encoder};

    #[test]
    fn ids_resolve_both_ways() {
        let registry = ProtocolRegistry::vanilla();
        let packet: Box<dyn Packet<dyn ClientHandler>> = Box::new(server::play::KeepAlive { id: 7 });
        assert_eq!(registry.clientbound().packet_id(&*packet), Some((Phase::Play, 0x1F)));
        assert_eq!(registry.serverbound().packet_id(&client::play::KeepAlive { id: 7 }), Some((Phase::Play, 0x10)));
        assert!(registry
            .clientbound()
            .packet_name(Phase::Play, 0x0E)
            .is_some_and(|name| name.ends_with("Chat")));
    }

    #[test]
    fn decode_rejects_unknown_and_trailing() {
        let registry = ProtocolRegistry::vanilla();
        let table = registry.clientbound();

        assert!(matches!(
            table.decode(Phase::Play, 0x7F, &mut Decoder::new(&[])),
            Err(DecodeError::UnknownPacket { phase: Phase::Play, id: 0x7F })
        ));

        let mut buf = Vec::new();
        server::status::Pong { time: 5 }.encode(&mut Encoder::new(&mut buf)).unwrap();
        buf.push(0);
        assert!(matches!(
            table.decode(Phase::Status, 0x01, &mut Decoder::new(&buf)),
            Err(DecodeError::TrailingBytes { remaining: 1, .. })
        ));
        buf.pop();
        let packet = table.decode(Phase::Status, 0x01, &mut Decoder::new(&buf)).unwrap();
        assert_eq!(packet.name(), "Pong");
    }
}
