use mcnet::nbt::{self, CompoundTag, ListTag, NbtError, SizeAccountant, Tag, TagType};
use proptest::prelude::*;

fn leaf() -> impl Strategy<Value = Tag> {
    prop_oneof![
        any::<i8>().prop_map(Tag::Byte),
        any::<i16>().prop_map(Tag::Short),
        any::<i32>().prop_map(Tag::Int),
        any::<i64>().prop_map(Tag::Long),
        (-1.0e6f32..1.0e6).prop_map(Tag::Float),
        (-1.0e12f64..1.0e12).prop_map(Tag::Double),
        "\\PC{0,12}".prop_map(Tag::String),
        prop::collection::vec(any::<i8>(), 0..8).prop_map(Tag::ByteArray),
        prop::collection::vec(any::<i32>(), 0..8).prop_map(Tag::IntArray),
        prop::collection::vec(any::<i64>(), 0..8).prop_map(Tag::LongArray),
    ]
}

fn tag() -> impl Strategy<Value = Tag> {
    leaf().prop_recursive(4, 64, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(|elements| {
                // Keep the elements that match the first one's type.
                let mut list = ListTag::new();
                for element in elements {
                    let _ = list.push(element);
                }
                Tag::List(list)
            }),
            prop::collection::btree_map("[a-zA-Z_]{1,8}", inner, 0..6).prop_map(|entries| {
                let mut compound = CompoundTag::new();
                for (key, value) in entries {
                    compound.put(key, value).unwrap();
                }
                Tag::Compound(compound)
            }),
        ]
    })
}

fn root() -> impl Strategy<Value = CompoundTag> {
    prop::collection::btree_map("\\PC{0,8}", tag(), 0..6).prop_map(|entries| {
        let mut compound = CompoundTag::new();
        for (key, value) in entries {
            compound.put(key, value).unwrap();
        }
        compound
    })
}

fn write_root(root: &CompoundTag) -> Vec<u8> {
    let mut out = Vec::new();
    nbt::write_root(&mut out, root).unwrap();
    out
}

proptest! {
    #[test]
    fn binary_round_trip(root in root()) {
        let bytes = write_root(&root);
        let decoded = nbt::read_root(&mut bytes.as_slice(), &mut SizeAccountant::unlimited()).unwrap();
        prop_assert_eq!(decoded, root);
    }

    #[test]
    fn snbt_round_trip(root in root()) {
        let text = Tag::Compound(root.clone()).to_string();
        prop_assert_eq!(nbt::parse_snbt(&text).unwrap(), root);
    }
}

#[test]
fn named_root_layout() {
    let mut root = CompoundTag::new();
    root.put_short("s", 7);
    let mut bytes = Vec::new();
    nbt::write_named(&mut bytes, "hi", &Tag::Compound(root)).unwrap();
    assert_eq!(bytes, [10, 0, 2, b'h', b'i', 2, 0, 1, b's', 0, 7, 0]);

    let (name, tag) = nbt::read_named(&mut bytes.as_slice(), &mut SizeAccountant::unlimited()).unwrap();
    assert_eq!(name, "hi");
    assert_eq!(tag.as_compound().map(|c| c.get_short("s")), Some(7));
}

#[test]
fn root_must_be_compound() {
    let mut bytes = Vec::new();
    nbt::write_named(&mut bytes, "", &Tag::Int(1)).unwrap();
    let error = nbt::read_root(&mut bytes.as_slice(), &mut SizeAccountant::unlimited()).unwrap_err();
    assert!(matches!(error, NbtError::RootNotCompound(_)));
    assert!(error.to_string().starts_with("root tag must be a named compound tag"));
}

#[test]
fn size_budget_aborts_decode() {
    let mut root = CompoundTag::new();
    root.put_long_array("data", vec![0; 10_000]);
    let bytes = write_root(&root);

    let error = nbt::read_root(&mut bytes.as_slice(), &mut SizeAccountant::new(1024)).unwrap_err();
    assert!(matches!(error, NbtError::SizeLimit { limit: 1024, .. }));
    assert!(nbt::read_root(&mut bytes.as_slice(), &mut SizeAccountant::network()).is_ok());
}

#[test]
fn deep_nesting_is_rejected() {
    let mut tag = Tag::List(ListTag::new());
    for _ in 0..nbt::MAX_DEPTH + 2 {
        let mut list = ListTag::new();
        list.push(tag).unwrap();
        tag = Tag::List(list);
    }
    let mut root = CompoundTag::new();
    root.put("deep", tag).unwrap();
    let bytes = write_root(&root);

    let error = nbt::read_root(&mut bytes.as_slice(), &mut SizeAccountant::unlimited()).unwrap_err();
    assert!(matches!(error, NbtError::DepthExceeded(_)));
}

#[test]
fn list_rejects_mixed_types() {
    let mut list = ListTag::new();
    list.push(1i32).unwrap();
    assert!(matches!(list.push("x"), Err(NbtError::ListTypeMismatch { .. })));
    assert_eq!(list.element_type(), TagType::Int);
    list.remove(0);
    assert_eq!(list.element_type(), TagType::End);
    list.push("x").unwrap();
}

#[test]
fn compressed_files_round_trip() {
    let dir = std::env::temp_dir().join(format!("mcnet-nbt-{}", std::process::id()));
    fs_err::create_dir_all(&dir).unwrap();

    let mut root = CompoundTag::new();
    root.put_string("name", "level");
    root.put_uuid("id", 0x0123_4567_89ab_cdef_0123_4567_89ab_cdef);

    for compressed in [true, false] {
        let path = dir.join(format!("level-{compressed}.dat"));
        nbt::io::write_file(&root, &path, compressed).unwrap();
        let bytes = fs_err::read(&path).unwrap();
        assert_eq!(bytes.starts_with(&[0x1f, 0x8b]), compressed);
        assert_eq!(nbt::io::read_file(&path).unwrap(), root);
    }
    fs_err::remove_dir_all(&dir).unwrap();
}
