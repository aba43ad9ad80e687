use super::{Decode, DecodeError, Decoder, Encode, EncodeError, Encoder};
use crate::nbt::CompoundTag;

/// Which tag an item stack carries on the wire.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TagMode {
    /// Only the shared tag. Used for ordinary network transfer.
    Shared,
    /// The shared tag merged with the private tag. Only for trusted
    /// peers, such as an in-process connection.
    Full,
}

/// A stack of items: an item id, a count and optional tag data.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct ItemStack {
    pub item: i32,
    pub count: u8,
    pub tag: Option<CompoundTag>,
    /// Data never sent to untrusted peers. Decoded stacks have none.
    pub private_tag: Option<CompoundTag>,
}

impl ItemStack {
    pub const EMPTY: ItemStack = ItemStack {
        item: 0,
        count: 0,
        tag: None,
        private_tag: None,
    };

    pub fn new(item: i32, count: u8) -> Self {
        Self {
            item,
            count,
            ..Self::EMPTY
        }
    }

    pub fn with_tag(mut self, tag: CompoundTag) -> Self {
        self.tag = Some(tag);
        self
    }

    /// Air or a zero count.
    pub fn is_empty(&self) -> bool {
        self.item == 0 || self.count == 0
    }

    /// The tag written for `mode`.
    pub fn wire_tag(&self, mode: TagMode) -> Option<CompoundTag> {
        match (mode, &self.tag, &self.private_tag) {
            (TagMode::Full, Some(shared), Some(private)) => {
                let mut full = shared.clone();
                full.merge(private);
                Some(full)
            }
            (TagMode::Full, None, Some(private)) => Some(private.clone()),
            (_, shared, _) => shared.clone(),
        }
    }

    pub fn write(&self, encoder: &mut Encoder, mode: TagMode) -> Result<(), EncodeError> {
        if self.is_empty() {
            encoder.write_bool(false);
            return Ok(());
        }
        encoder.write_bool(true);
        encoder.write_var_int(self.item);
        encoder.write_u8(self.count);
        encoder.write_compound(self.wire_tag(mode).as_ref())
    }

    pub fn read(decoder: &mut Decoder) -> Result<Self, DecodeError> {
        if !decoder.read_bool()? {
            return Ok(Self::EMPTY);
        }
        let item = decoder.read_var_int()?;
        let count = decoder.read_u8()?;
        let tag = decoder.read_compound()?;
        Ok(Self {
            item,
            count,
            tag,
            private_tag: None,
        })
    }
}

impl Encode for ItemStack {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), EncodeError> {
        self.write(encoder, TagMode::Shared)
    }
}

impl Decode for ItemStack {
    fn decode(decoder: &mut Decoder) -> Result<Self, DecodeError> {
        Self::read(decoder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack() -> ItemStack {
        let mut shared = CompoundTag::new();
        shared.put_int("Damage", 3);
        let mut private = CompoundTag::new();
        private.put_string("Owner", "alex");
        ItemStack {
            private_tag: Some(private),
            ..ItemStack::new(276, 1).with_tag(shared)
        }
    }

    fn round_trip(stack: &ItemStack, mode: TagMode) -> ItemStack {
        let mut buf = Vec::new();
        stack.write(&mut Encoder::new(&mut buf), mode).unwrap();
        let mut decoder = Decoder::new(&buf);
        let decoded = ItemStack::read(&mut decoder).unwrap();
        assert!(decoder.is_finished());
        decoded
    }

    #[test]
    fn shared_mode_omits_private_data() {
        let decoded = round_trip(&stack(), TagMode::Shared);
        let tag = decoded.tag.unwrap();
        assert_eq!(tag.get_int("Damage"), 3);
        assert!(!tag.contains_key("Owner"));
    }

    #[test]
    fn full_mode_merges_private_data() {
        let decoded = round_trip(&stack(), TagMode::Full);
        let tag = decoded.tag.unwrap();
        assert_eq!(tag.get_int("Damage"), 3);
        assert_eq!(tag.get_string("Owner"), "alex");
    }

    #[test]
    fn empty_stack_is_single_byte() {
        let mut buf = Vec::new();
        ItemStack::new(1, 0).encode(&mut Encoder::new(&mut buf)).unwrap();
        assert_eq!(buf, [0]);
        assert_eq!(ItemStack::decode(&mut Decoder::new(&buf)).unwrap(), ItemStack::EMPTY);
    }
}
