use mcnet::nbt::{self, parse_snbt, parse_snbt_value, CompoundTag, ListTag, SnbtErrorKind, Tag, TagType};

#[test]
fn parses_typed_numbers() {
    let cases = [
        ("1b", Tag::Byte(1)),
        ("-2s", Tag::Short(-2)),
        ("3", Tag::Int(3)),
        ("4L", Tag::Long(4)),
        ("5.5f", Tag::Float(5.5)),
        ("6d", Tag::Double(6.0)),
        ("7.25", Tag::Double(7.25)),
        (".5", Tag::Double(0.5)),
        ("1e3f", Tag::Float(1000.0)),
        ("true", Tag::Byte(1)),
        ("false", Tag::Byte(0)),
    ];
    for (input, expected) in cases {
        assert_eq!(parse_snbt_value(input).unwrap(), expected, "{input}");
    }
}

#[test]
fn out_of_range_numbers_become_strings() {
    assert_eq!(parse_snbt_value("300b").unwrap(), Tag::String("300b".to_owned()));
    assert_eq!(parse_snbt_value("01").unwrap(), Tag::String("01".to_owned()));
    assert_eq!(parse_snbt_value("minecraft.stone").unwrap(), Tag::String("minecraft.stone".to_owned()));
}

#[test]
fn parses_nested_structures() {
    let root = parse_snbt(r#"{ name: "Steve", 'pos': [1.0d, 2.0d, 3.0d], inv: [{id: "stone", Count: 3b}], ids: [I; 1, -2] }"#)
        .unwrap();
    assert_eq!(root.get_string("name"), "Steve");
    let pos = root.get_list("pos", TagType::Double);
    assert_eq!(pos.len(), 3);
    assert_eq!(pos.get_double(2), 3.0);
    let inventory = root.get_list("inv", TagType::Compound);
    assert_eq!(inventory.get_compound(0).get_byte("Count"), 3);
    assert_eq!(root.get_int_array("ids"), [1, -2]);
}

#[test]
fn quoted_strings_unescape() {
    assert_eq!(parse_snbt_value(r#""a\"b\\c""#).unwrap(), Tag::String(r#"a"b\c"#.to_owned()));
    assert_eq!(parse_snbt_value(r#"'it\'s'"#).unwrap(), Tag::String("it's".to_owned()));
    assert_eq!(
        parse_snbt_value(r#""\q""#).unwrap_err().kind,
        SnbtErrorKind::InvalidEscape('q')
    );
    assert_eq!(parse_snbt_value(r#""open"#).unwrap_err().kind, SnbtErrorKind::UnclosedQuote);
}

#[test]
fn errors_carry_position_and_context() {
    let error = parse_snbt("{abcdefghijkl:1,").unwrap_err();
    assert_eq!(error.kind, SnbtErrorKind::ExpectedKey);
    assert_eq!(error.cursor, 16);
    assert_eq!(error.context, "...fghijkl:1,");
    assert!(error.to_string().ends_with("<--[HERE]"));

    assert_eq!(parse_snbt("{a:1} x").unwrap_err().kind, SnbtErrorKind::TrailingData);
    assert!(parse_snbt("{a:1,}").is_ok());
    assert_eq!(parse_snbt("{a:}").unwrap_err().kind, SnbtErrorKind::ExpectedValue);
    assert_eq!(parse_snbt("[1]").unwrap_err().kind, SnbtErrorKind::Expected('{'));
}

#[test]
fn lists_and_arrays_must_be_homogeneous() {
    assert!(matches!(
        parse_snbt_value("[1, 2b]").unwrap_err().kind,
        SnbtErrorKind::MixedList { found: TagType::Byte, expected: TagType::Int }
    ));
    assert!(matches!(
        parse_snbt_value("[B; 1b, 2]").unwrap_err().kind,
        SnbtErrorKind::MixedArray { found: TagType::Int, array: TagType::ByteArray }
    ));
    assert_eq!(parse_snbt_value("[Q; 1]").unwrap_err().kind, SnbtErrorKind::InvalidArray('Q'));
    assert_eq!(parse_snbt_value("[]").unwrap(), Tag::List(ListTag::new()));
    assert_eq!(parse_snbt_value("[L;]").unwrap(), Tag::LongArray(Vec::new()));
}

#[test]
fn display_writes_parseable_snbt() {
    let mut root = CompoundTag::new();
    root.put_byte("b", 1);
    root.put_float("f", 5.0);
    root.put_double("d", 6.0);
    root.put_string("s", "say \"hi\"");
    root.put_byte_array("bytes", vec![1, 2]);
    root.put_long_array("longs", vec![3]);

    let tag = Tag::Compound(root.clone());
    assert_eq!(root.get("f").map(ToString::to_string).as_deref(), Some("5.0f"));
    let text = tag.to_string();
    assert!(text.contains("d:6.0d"));
    assert!(text.contains(r#"s:'say "hi"'"#));
    assert!(text.contains("bytes:[B;1B,2B]"));
    assert!(text.contains("longs:[L;3L]"));
    assert_eq!(parse_snbt(&text).unwrap(), root);
}

#[test]
fn pretty_output_sorts_keys() {
    let root = parse_snbt("{b:2,a:{y:1,x:[1,2]}}").unwrap();
    let pretty = Tag::Compound(root).to_pretty_snbt("  ");
    let a = pretty.find("a:").unwrap();
    let b = pretty.find("b:").unwrap();
    let x = pretty.find("x:").unwrap();
    let y = pretty.find("y:").unwrap();
    assert!(a < b);
    assert!(x < y);
    assert!(pretty.contains('\n'));
}

#[test]
fn deep_nesting_is_an_error_not_a_crash() {
    let error = parse_snbt_value(&"[".repeat(200_000)).unwrap_err();
    assert_eq!(error.kind, SnbtErrorKind::DepthExceeded(nbt::MAX_DEPTH));
    assert_eq!(error.cursor, nbt::MAX_DEPTH);

    let error = parse_snbt(&"{a:".repeat(10_000)).unwrap_err();
    assert_eq!(error.kind, SnbtErrorKind::DepthExceeded(nbt::MAX_DEPTH));

    let shallow = format!("{}1{}", "[".repeat(64), "]".repeat(64));
    assert!(parse_snbt_value(&shallow).is_ok());
}
