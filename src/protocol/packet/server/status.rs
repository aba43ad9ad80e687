use crate::protocol::packet::{packets, ClientHandler};
use mcnet_macros::{Decode, Encode};

/// The server list entry, as JSON.
#[derive(Debug, Clone, Encode, Decode)]
pub struct StatusResponse {
    pub json: String,
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct Pong {
    pub time: i64,
}

packets!(dyn ClientHandler {
    StatusResponse => handle_status_response;
    Pong => handle_pong;
});
