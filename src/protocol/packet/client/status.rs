use crate::protocol::packet::{packets, ServerHandler};
use mcnet_macros::{Decode, Encode};

#[derive(Debug, Clone, Encode, Decode)]
pub struct StatusRequest;

#[derive(Debug, Clone, Encode, Decode)]
pub struct PingRequest {
    pub time: i64,
}

packets!(dyn ServerHandler {
    StatusRequest => handle_status_request;
    PingRequest => handle_ping_request;
});
