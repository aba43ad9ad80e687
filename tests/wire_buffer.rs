use mcnet::{
    nbt::CompoundTag,
    protocol::{BlockFace, BlockPosition, BlockRayHit, DecodeError, Decoder, EncodeError, Encoder, ItemStack, TagMode},
};
use proptest::prelude::*;

fn encode(f: impl FnOnce(&mut Encoder)) -> Vec<u8> {
    let mut buf = Vec::new();
    f(&mut Encoder::new(&mut buf));
    buf
}

#[test]
fn var_int_known_encodings() {
    assert_eq!(encode(|e| drop(e.write_var_int(300))), [0xAC, 0x02]);
    assert_eq!(encode(|e| drop(e.write_var_int(0))), [0x00]);
    assert_eq!(encode(|e| drop(e.write_var_int(127))), [0x7F]);
    assert_eq!(encode(|e| drop(e.write_var_int(128))), [0x80, 0x01]);
    assert_eq!(encode(|e| drop(e.write_var_int(-1))), [0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);
    assert_eq!(
        encode(|e| drop(e.write_var_int(i32::MIN))),
        [0x80, 0x80, 0x80, 0x80, 0x08]
    );
    assert_eq!(encode(|e| drop(e.write_var_long(-1))).len(), 10);
}

#[test]
fn var_int_too_big() {
    let bytes = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01];
    assert!(matches!(
        Decoder::new(&bytes).read_var_int(),
        Err(DecodeError::VarIntTooLong)
    ));
    assert_eq!(DecodeError::VarIntTooLong.to_string(), "VarInt too big");

    let bytes = [0xFF; 11];
    assert!(matches!(
        Decoder::new(&bytes).read_var_long(),
        Err(DecodeError::VarLongTooLong)
    ));
}

#[test]
fn truncated_input_reports_end_of_stream() {
    assert!(matches!(
        Decoder::new(&[0x80]).read_var_int(),
        Err(DecodeError::EndOfStream(_))
    ));
    assert!(matches!(Decoder::new(&[0, 1]).read_i32(), Err(DecodeError::EndOfStream(_))));
}

#[test]
fn string_with_oversized_byte_length_fails_before_decoding() {
    // Declared length of 5 * max bytes; the body is never read.
    let buf = encode(|e| drop(e.write_var_int(5 * 16)));
    assert!(matches!(
        Decoder::new(&buf).read_string_max(16),
        Err(DecodeError::StringTooLong { length: 80, max: 64 })
    ));

    let buf = encode(|e| drop(e.write_var_int(-3)));
    assert!(matches!(
        Decoder::new(&buf).read_string_max(16),
        Err(DecodeError::NegativeStringLength)
    ));
}

#[test]
fn string_char_count_is_checked() {
    let buf = encode(|e| e.write_string("abcdefgh").unwrap());
    assert!(matches!(
        Decoder::new(&buf).read_string_max(4),
        Err(DecodeError::StringCharsTooLong { length: 8, max: 4 })
    ));
    assert_eq!(Decoder::new(&buf).read_string_max(8).unwrap(), "abcdefgh");

    let mut buf = Vec::new();
    assert!(matches!(
        Encoder::new(&mut buf).write_string_max("abcde", 4),
        Err(EncodeError::StringTooLong { .. })
    ));
}

#[test]
fn block_position_packs_negative_coordinates() {
    let position = BlockPosition::new(-1, -64, 30_000_000 - 1);
    let buf = encode(|e| e.write_block_position(position));
    assert_eq!(buf.len(), 8);
    assert_eq!(Decoder::new(&buf).read_block_position().unwrap(), position);
}

#[test]
fn ray_hit_round_trips() {
    let hit = BlockRayHit {
        position: BlockPosition::new(10, 64, -10),
        face: BlockFace::North,
        location: [10.5, 64.25, -9.75],
        inside: false,
    };
    let buf = encode(|e| e.write_block_ray_hit(&hit));
    let decoded = Decoder::new(&buf).read_block_ray_hit().unwrap();
    assert_eq!(decoded.position, hit.position);
    assert_eq!(decoded.face, BlockFace::North);
    assert!(!decoded.inside);
    assert!((decoded.location[1] - 64.25).abs() < 1e-6);
}

#[test]
fn unknown_enum_ordinal() {
    let buf = encode(|e| drop(e.write_var_int(9)));
    assert!(matches!(
        Decoder::new(&buf).read_enum::<BlockFace>(),
        Err(DecodeError::UnknownOrdinal { ordinal: 9, .. })
    ));
}

#[test]
fn compound_absent_marker() {
    let buf = encode(|e| e.write_compound(None).unwrap());
    assert_eq!(buf, [0]);
    assert_eq!(Decoder::new(&buf).read_compound().unwrap(), None);
}

#[test]
fn compound_exceeding_budget_is_rejected() {
    let mut tag = CompoundTag::new();
    tag.put_byte_array("blob", vec![0; 4096]);
    let buf = encode(|e| e.write_compound(Some(&tag)).unwrap());

    assert_eq!(Decoder::new(&buf).read_compound().unwrap(), Some(tag));
    assert!(matches!(
        Decoder::with_nbt_budget(&buf, 1024).read_compound(),
        Err(DecodeError::Nbt(_))
    ));
}

#[test]
fn item_tag_modes() {
    let mut public = CompoundTag::new();
    public.put_int("Damage", 3);
    let mut private = CompoundTag::new();
    private.put_string("Owner", "server");
    let item = ItemStack {
        private_tag: Some(private),
        ..ItemStack::new(1, 1).with_tag(public)
    };

    let shared = encode(|e| item.write(e, TagMode::Shared).unwrap());
    let full = encode(|e| item.write(e, TagMode::Full).unwrap());
    assert!(full.len() > shared.len());

    let decoded = ItemStack::read(&mut Decoder::new(&full)).unwrap();
    let tag = decoded.tag.unwrap();
    assert_eq!(tag.get_int("Damage"), 3);
    assert_eq!(tag.get_string("Owner"), "server");

    let empty = encode(|e| ItemStack::EMPTY.write(e, TagMode::Shared).unwrap());
    assert_eq!(empty, [0]);
}

proptest! {
    #[test]
    fn var_int_round_trip(x in any::<i32>()) {
        let buf = encode(|e| drop(e.write_var_int(x)));
        prop_assert!(buf.len() <= 5);
        let (decoded, size) = Decoder::new(&buf).read_var_int_with_size().unwrap();
        prop_assert_eq!(decoded, x);
        prop_assert_eq!(size, buf.len());
    }

    #[test]
    fn var_long_round_trip(x in any::<i64>()) {
        let buf = encode(|e| drop(e.write_var_long(x)));
        prop_assert!(buf.len() <= 10);
        prop_assert_eq!(Decoder::new(&buf).read_var_long().unwrap(), x);
    }

    #[test]
    fn string_round_trip(s in "\\PC{0,64}") {
        let buf = encode(|e| e.write_string(&s).unwrap());
        let mut decoder = Decoder::new(&buf);
        prop_assert_eq!(decoder.read_string().unwrap(), s.as_str());
        prop_assert!(decoder.is_finished());
    }
}

#[test]
fn derived_enums_reject_unknown_ids() {
    use mcnet::protocol::{packet::client::handshake::NextPhase, Decode};

    let buf = encode(|e| drop(e.write_var_int(2)));
    assert_eq!(NextPhase::decode(&mut Decoder::new(&buf)).unwrap(), NextPhase::Login);

    let buf = encode(|e| drop(e.write_var_int(3)));
    assert!(matches!(
        NextPhase::decode(&mut Decoder::new(&buf)),
        Err(DecodeError::UnknownOrdinal { ordinal: 3, name: "NextPhase" })
    ));
}

#[test]
fn derived_lists_enforce_their_ceiling() {
    use mcnet::protocol::{packet::server::login::Hello, Decode, Encode};

    let hello = Hello {
        server_id: String::new(),
        public_key: vec![1; 513],
        nonce: vec![2; 4],
    };
    let buf = encode(|e| hello.encode(e).unwrap());
    assert!(matches!(
        Hello::decode(&mut Decoder::new(&buf)),
        Err(DecodeError::ArrayTooLong { length: 513, max: 512 })
    ));
}
