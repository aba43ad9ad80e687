//! Packets sent by the client.

pub mod handshake;
pub mod login;
pub mod play;
pub mod status;
