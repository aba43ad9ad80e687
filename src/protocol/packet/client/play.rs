use crate::protocol::{
    packet::{packets, ServerHandler},
    BlockRayHit, ItemStack,
};
use mcnet_macros::{Decode, Encode};

#[derive(Debug, Clone, Encode, Decode)]
pub struct KeepAlive {
    pub id: i64,
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct Chat {
    #[encoding(max_length = 256)]
    pub message: String,
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct SetCreativeModeSlot {
    pub slot: i16,
    pub item: ItemStack,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Encode, Decode)]
#[encoding(discriminant = "varint")]
pub enum Hand {
    #[encoding(id = 0)]
    MainHand,
    #[encoding(id = 1)]
    OffHand,
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct UseItemOn {
    pub hand: Hand,
    pub hit: BlockRayHit,
}

packets!(dyn ServerHandler {
    KeepAlive => handle_keep_alive;
    Chat => handle_chat;
    SetCreativeModeSlot => handle_set_creative_mode_slot;
    UseItemOn => handle_use_item_on;
});
