//! Networking core for a Minecraft 1.16.5 (protocol 754) server or client.
//!
//! The crate is layered bottom-up:
//!
//! * [`nbt`]: the tag tree carried by item stacks and block entities, with a
//!   size accountant that bounds what a decoder may allocate, plus the
//!   binary, compressed-file and SNBT text forms.
//! * [`protocol`]: the wire buffer ([`protocol::Encoder`] /
//!   [`protocol::Decoder`]), the packet contract and registry, and the
//!   pipeline stages for framing, compression and encryption.
//! * [`connection`]: the per-connection state machine. Packets sent before
//!   the transport is ready are queued; sending a packet of a later phase
//!   switches phase with inbound reading paused across the switch.
//! * [`executor`]: the simulation thread and the gate that moves packet
//!   handling onto it.
//! * [`network`]: the server's set of connections, ticked once per
//!   simulation tick.
//!
//! Encryption here is the protocol's own AES/CFB8 stream cipher. Whether a
//! peer is allowed in (authentication, whitelists) is up to the listener.

pub mod config;
pub mod connection;
pub mod executor;
pub mod nbt;
pub mod network;
pub mod protocol;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks `mutex`, ignoring poisoning. State guarded by the crate's
/// mutexes stays consistent across a panicking handler.
pub(crate) fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
