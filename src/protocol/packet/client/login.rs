use crate::protocol::packet::{packets, ServerHandler};
use mcnet_macros::{Decode, Encode};

#[derive(Debug, Clone, Encode, Decode)]
pub struct Hello {
    #[encoding(max_length = 16)]
    pub name: String,
}

/// The shared secret and verify token, both encrypted with the
/// server's public key.
#[derive(Debug, Clone, Encode, Decode)]
pub struct Key {
    #[encoding(length_prefix = "varint", max_length = 256)]
    pub key_bytes: Vec<u8>,
    #[encoding(length_prefix = "varint", max_length = 256)]
    pub nonce: Vec<u8>,
}

packets!(dyn ServerHandler {
    Hello => handle_hello;
    Key => handle_key;
});
