use crate::protocol::{
    packet::{packets, ServerHandler},
    Phase,
};
use mcnet_macros::{Decode, Encode};

/// First packet of every connection, announcing the protocol version
/// and which phase the client wants next.
#[derive(Debug, Clone, Encode, Decode)]
pub struct ClientIntention {
    #[encoding(varint)]
    pub protocol_version: i32,
    #[encoding(max_length = 255)]
    pub host: String,
    pub port: u16,
    pub next_phase: NextPhase,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Encode, Decode)]
#[encoding(discriminant = "varint")]
pub enum NextPhase {
    #[encoding(id = 1)]
    Status,
    #[encoding(id = 2)]
    Login,
}

impl NextPhase {
    pub fn phase(self) -> Phase {
        match self {
            NextPhase::Status => Phase::Status,
            NextPhase::Login => Phase::Login,
        }
    }
}

packets!(dyn ServerHandler {
    ClientIntention => handle_intention;
});
