use crate::protocol::packet::{packets, ClientHandler};
use mcnet_macros::{Decode, Encode};

#[derive(Debug, Clone, Encode, Decode)]
pub struct LoginDisconnect {
    #[encoding(text)]
    pub reason: String,
}

/// Encryption request: the server's public key and a verify token.
#[derive(Debug, Clone, Encode, Decode)]
pub struct Hello {
    #[encoding(max_length = 20)]
    pub server_id: String,
    #[encoding(length_prefix = "varint", max_length = 512)]
    pub public_key: Vec<u8>,
    #[encoding(length_prefix = "varint", max_length = 16)]
    pub nonce: Vec<u8>,
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct GameProfile {
    pub uuid: u128,
    #[encoding(max_length = 16)]
    pub name: String,
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct LoginCompression {
    #[encoding(varint)]
    pub threshold: i32,
}

packets!(dyn ClientHandler {
    LoginDisconnect => handle_login_disconnect;
    Hello => handle_hello;
    GameProfile => handle_game_profile;
    LoginCompression => handle_login_compression;
});
