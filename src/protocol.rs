//! The wire protocol: the byte-level encoder/decoder pair, the packet
//! contract with its registry, and the transform stages applied to
//! frames on their way through a connection.

pub const PROTOCOL_VERSION: i32 = 754; // 1.16.5

mod decoder;
mod encoder;
mod frame_codec;
mod identifier;
mod item;
pub mod packet;
pub mod pipeline;
mod position;
mod registry;

pub use decoder::{Decode, DecodeError, Decoder};
pub use encoder::{Encode, EncodeError, Encoder};
pub use frame_codec::{FrameCodec, MAX_FRAME_LENGTH};
pub use identifier::{Identifier, InvalidIdentifier};
pub use item::{ItemStack, TagMode};
pub use position::{BlockFace, BlockPosition, BlockRayHit, ChunkPosition};
pub use registry::{PacketTable, ProtocolRegistry};

/// Default ceiling, in characters, for strings.
pub const MAX_STRING_LENGTH: usize = i16::MAX as usize;

/// Ceiling for chat components carried as JSON.
pub const MAX_TEXT_LENGTH: usize = 262_144;

/// Largest uncompressed packet a peer may announce.
pub const MAX_PACKET_SIZE: usize = 2_097_152;

/// Phase of a connection's protocol lifecycle. Each packet type
/// belongs to exactly one phase.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, strum::Display)]
pub enum Phase {
    Handshake,
    Status,
    Login,
    Play,
}

impl Phase {
    /// Phases only move forward: handshake to status or login, and
    /// login to play.
    pub fn can_transition_to(self, next: Phase) -> bool {
        matches!(
            (self, next),
            (Phase::Handshake, Phase::Status | Phase::Login) | (Phase::Login, Phase::Play)
        ) || self == next
    }
}

/// Which way a packet travels.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PacketFlow {
    /// Sent by the client, handled by the server.
    Serverbound,
    /// Sent by the server, handled by the client.
    Clientbound,
}

/// An enum carried on the wire as its VarInt ordinal.
pub trait EnumOrdinal: Copy {
    const NAME: &'static str;

    fn ordinal(self) -> i32;

    fn from_ordinal(ordinal: i32) -> Option<Self>;
}

macro_rules! enum_ordinal {
    ($($ty:ty),* $(,)?) => {
        $(
            impl EnumOrdinal for $ty {
                const NAME: &'static str = stringify!($ty);

                fn ordinal(self) -> i32 {
                    self as i32
                }

                fn from_ordinal(ordinal: i32) -> Option<Self> {
                    u8::try_from(ordinal).ok().and_then(Self::from_repr)
                }
            }
        )*
    };
}

pub(crate) use enum_ordinal;

enum_ordinal!(BlockFace);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_only_move_forward() {
        assert!(Phase::Handshake.can_transition_to(Phase::Login));
        assert!(Phase::Handshake.can_transition_to(Phase::Status));
        assert!(Phase::Login.can_transition_to(Phase::Play));
        assert!(Phase::Play.can_transition_to(Phase::Play));
        assert!(!Phase::Play.can_transition_to(Phase::Handshake));
        assert!(!Phase::Status.can_transition_to(Phase::Login));
        assert!(!Phase::Handshake.can_transition_to(Phase::Play));
    }

    #[test]
    fn enum_ordinals() {
        assert_eq!(BlockFace::East.ordinal(), 5);
        assert_eq!(BlockFace::from_ordinal(2), Some(BlockFace::North));
        assert_eq!(BlockFace::from_ordinal(6), None);
        assert_eq!(BlockFace::from_ordinal(-1), None);
    }
}
