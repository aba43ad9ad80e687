use crate::{
    nbt::CompoundTag,
    protocol::{
        enum_ordinal,
        packet::{packets, ClientHandler, Packet},
        BlockPosition, Decode, DecodeError, Decoder, Encode, EncodeError, Encoder, EnumOrdinal,
        ItemStack,
    },
};
use mcnet_macros::{Decode, Encode};
use strum::FromRepr;

#[derive(Debug, Clone, Encode, Decode)]
pub struct KeepAlive {
    pub id: i64,
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct Disconnect {
    #[encoding(text)]
    pub reason: String,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, FromRepr)]
#[repr(u8)]
pub enum ChatType {
    Chat,
    System,
    GameInfo,
}

enum_ordinal!(ChatType);

/// A chat line. A broken chat message is not worth a connection, so
/// encode failures drop just this packet.
#[derive(Debug, Clone)]
pub struct Chat {
    pub message: String,
    pub kind: ChatType,
    pub sender: u128,
}

impl Encode for Chat {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), EncodeError> {
        encoder.write_text(&self.message)?;
        encoder.write_u8(self.kind.ordinal() as u8);
        encoder.write_uuid(self.sender);
        Ok(())
    }
}

impl Decode for Chat {
    fn decode(decoder: &mut Decoder) -> Result<Self, DecodeError> {
        let message = decoder.read_text()?;
        let ordinal = decoder.read_u8()?;
        let kind = ChatType::from_ordinal(i32::from(ordinal)).ok_or(DecodeError::UnknownOrdinal {
            ordinal: i32::from(ordinal),
            name: ChatType::NAME,
        })?;
        let sender = decoder.read_uuid()?;
        Ok(Self {
            message,
            kind,
            sender,
        })
    }
}

impl Packet<dyn ClientHandler> for Chat {
    fn dispatch(self: Box<Self>, handler: &dyn ClientHandler) {
        handler.handle_chat(*self);
    }

    fn is_skippable(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct BlockEntityData {
    pub position: BlockPosition,
    pub action: u8,
    pub tag: Option<CompoundTag>,
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct ContainerSetSlot {
    pub container_id: i8,
    pub slot: i16,
    pub item: ItemStack,
}

packets!(dyn ClientHandler {
    KeepAlive => handle_keep_alive;
    Disconnect => handle_disconnect;
    BlockEntityData => handle_block_entity_data;
    ContainerSetSlot => handle_container_set_slot;
});
