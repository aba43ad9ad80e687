use super::{error::Result, ListTag, NbtError, Tag, TagType, ANY_NUMERIC};
use ahash::AHashMap;
use once_cell::sync::Lazy;

static EMPTY_COMPOUND: Lazy<CompoundTag> = Lazy::new(CompoundTag::new);
static EMPTY_LIST: Lazy<ListTag> = Lazy::new(ListTag::new);

/// A map of unique string keys to tags.
///
/// Iteration order is unspecified. Typed getters never fail: a missing
/// key or a tag of the wrong type yields the zero value of the requested
/// type. Numeric getters convert between numeric variants.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompoundTag {
    entries: AHashMap<String, Tag>,
}

impl CompoundTag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tag)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Entries sorted by key, for stable display.
    pub fn sorted_entries(&self) -> Vec<(&str, &Tag)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }

    pub fn get(&self, key: &str) -> Option<&Tag> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Tag> {
        self.entries.get_mut(key)
    }

    /// Stores `tag` under `key`, returning the previous value.
    ///
    /// End tags are rejected; remove the key instead.
    pub fn put(&mut self, key: impl Into<String>, tag: impl Into<Tag>) -> Result<Option<Tag>> {
        let key = key.into();
        let tag = tag.into();
        if tag.tag_type() == TagType::End {
            return Err(NbtError::EndTagValue(key));
        }
        Ok(self.entries.insert(key, tag))
    }

    /// Inserts without the end-tag check. Used by decoders, which never
    /// produce end tags as values.
    pub(super) fn insert_raw(&mut self, key: String, tag: Tag) -> Option<Tag> {
        self.entries.insert(key, tag)
    }

    pub fn put_byte(&mut self, key: impl Into<String>, value: i8) {
        self.entries.insert(key.into(), Tag::Byte(value));
    }

    pub fn put_short(&mut self, key: impl Into<String>, value: i16) {
        self.entries.insert(key.into(), Tag::Short(value));
    }

    pub fn put_int(&mut self, key: impl Into<String>, value: i32) {
        self.entries.insert(key.into(), Tag::Int(value));
    }

    pub fn put_long(&mut self, key: impl Into<String>, value: i64) {
        self.entries.insert(key.into(), Tag::Long(value));
    }

    pub fn put_float(&mut self, key: impl Into<String>, value: f32) {
        self.entries.insert(key.into(), Tag::Float(value));
    }

    pub fn put_double(&mut self, key: impl Into<String>, value: f64) {
        self.entries.insert(key.into(), Tag::Double(value));
    }

    pub fn put_string(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), Tag::String(value.into()));
    }

    pub fn put_bool(&mut self, key: impl Into<String>, value: bool) {
        self.put_byte(key, value.into());
    }

    pub fn put_byte_array(&mut self, key: impl Into<String>, value: Vec<i8>) {
        self.entries.insert(key.into(), Tag::ByteArray(value));
    }

    pub fn put_int_array(&mut self, key: impl Into<String>, value: Vec<i32>) {
        self.entries.insert(key.into(), Tag::IntArray(value));
    }

    pub fn put_long_array(&mut self, key: impl Into<String>, value: Vec<i64>) {
        self.entries.insert(key.into(), Tag::LongArray(value));
    }

    pub fn put_compound(&mut self, key: impl Into<String>, value: CompoundTag) {
        self.entries.insert(key.into(), Tag::Compound(value));
    }

    pub fn put_list(&mut self, key: impl Into<String>, value: ListTag) {
        self.entries.insert(key.into(), Tag::List(value));
    }

    /// Stores a UUID as an int array of four big-endian words.
    pub fn put_uuid(&mut self, key: impl Into<String>, uuid: u128) {
        let words = (0..4)
            .map(|i| (uuid >> (96 - 32 * i)) as u32 as i32)
            .collect();
        self.put_int_array(key, words);
    }

    pub fn remove(&mut self, key: &str) -> Option<Tag> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Whether `key` holds a tag with discriminant `wanted`.
    /// [`ANY_NUMERIC`] matches every numeric type.
    pub fn contains(&self, key: &str, wanted: u8) -> bool {
        self.tag_id(key).is_some_and(|ty| ty.matches(wanted))
    }

    pub fn tag_id(&self, key: &str) -> Option<TagType> {
        self.entries.get(key).map(Tag::tag_type)
    }

    fn numeric(&self, key: &str) -> Option<&Tag> {
        self.entries.get(key).filter(|tag| tag.is_numeric())
    }

    pub fn get_byte(&self, key: &str) -> i8 {
        self.numeric(key).and_then(Tag::as_byte).unwrap_or(0)
    }

    pub fn get_short(&self, key: &str) -> i16 {
        self.numeric(key).and_then(Tag::as_short).unwrap_or(0)
    }

    pub fn get_int(&self, key: &str) -> i32 {
        self.numeric(key).and_then(Tag::as_int).unwrap_or(0)
    }

    pub fn get_long(&self, key: &str) -> i64 {
        self.numeric(key).and_then(Tag::as_long).unwrap_or(0)
    }

    pub fn get_float(&self, key: &str) -> f32 {
        self.numeric(key).and_then(Tag::as_float).unwrap_or(0.0)
    }

    pub fn get_double(&self, key: &str) -> f64 {
        self.numeric(key).and_then(Tag::as_double).unwrap_or(0.0)
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get_byte(key) != 0
    }

    pub fn get_string(&self, key: &str) -> &str {
        self.entries.get(key).and_then(Tag::as_str).unwrap_or("")
    }

    pub fn get_byte_array(&self, key: &str) -> &[i8] {
        match self.entries.get(key) {
            Some(Tag::ByteArray(x)) => x,
            _ => &[],
        }
    }

    pub fn get_int_array(&self, key: &str) -> &[i32] {
        match self.entries.get(key) {
            Some(Tag::IntArray(x)) => x,
            _ => &[],
        }
    }

    pub fn get_long_array(&self, key: &str) -> &[i64] {
        match self.entries.get(key) {
            Some(Tag::LongArray(x)) => x,
            _ => &[],
        }
    }

    pub fn get_compound(&self, key: &str) -> &CompoundTag {
        self.entries
            .get(key)
            .and_then(Tag::as_compound)
            .unwrap_or(&EMPTY_COMPOUND)
    }

    /// The list under `key` if its elements have type `element_type`
    /// (or it is empty); otherwise an empty list.
    pub fn get_list(&self, key: &str, element_type: TagType) -> &ListTag {
        match self.entries.get(key) {
            Some(Tag::List(list))
                if list.is_empty() || list.element_type() == element_type =>
            {
                list
            }
            _ => &EMPTY_LIST,
        }
    }

    pub fn has_uuid(&self, key: &str) -> bool {
        self.get_int_array(key).len() == 4
    }

    pub fn get_uuid(&self, key: &str) -> Option<u128> {
        let words = self.get_int_array(key);
        if words.len() != 4 {
            return None;
        }
        Some(
            words
                .iter()
                .fold(0u128, |acc, &w| (acc << 32) | u128::from(w as u32)),
        )
    }

    /// Recursively merges `other` into `self`. Nested compounds are
    /// unioned; every other tag in `other` overwrites.
    pub fn merge(&mut self, other: &CompoundTag) -> &mut Self {
        for (key, tag) in &other.entries {
            match (tag, self.entries.get_mut(key)) {
                (Tag::Compound(theirs), Some(Tag::Compound(ours))) => {
                    ours.merge(theirs);
                }
                _ => {
                    self.entries.insert(key.clone(), tag.copy());
                }
            }
        }
        self
    }

    pub fn copy(&self) -> CompoundTag {
        self.clone()
    }
}

impl<K: Into<String>, V: Into<Tag>> FromIterator<(K, V)> for CompoundTag {
    /// Collects entries, silently skipping end tags.
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut compound = CompoundTag::new();
        for (key, value) in iter {
            let _ = compound.put(key, value);
        }
        compound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_rejects_end_tags() {
        let mut compound = CompoundTag::new();
        assert!(matches!(
            compound.put("gone", Tag::End),
            Err(NbtError::EndTagValue(_))
        ));
        assert!(!compound.contains_key("gone"));
    }

    #[test]
    fn getters_default_on_mismatch() {
        let mut compound = CompoundTag::new();
        compound.put_string("name", "steve");
        compound.put_byte("level", 3);

        assert_eq!(compound.get_int("name"), 0);
        assert_eq!(compound.get_int("level"), 3);
        assert_eq!(compound.get_string("level"), "");
        assert_eq!(compound.get_string("name"), "steve");
        assert!(compound.get_int_array("name").is_empty());
        assert!(compound.get_compound("missing").is_empty());
    }

    #[test]
    fn getters_never_fail_on_huge_floats() {
        let mut compound = CompoundTag::new();
        compound.put_float("f", -3.0e9);
        compound.put_double("d", -1.0e12);
        assert_eq!(compound.get_int("f"), i32::MIN);
        assert_eq!(compound.get_int("d"), i32::MIN);
        assert_eq!(compound.get_short("d"), 0);
        assert_eq!(compound.get_byte("f"), 0);
        assert!(!compound.get_bool("d"));
    }

    #[test]
    fn contains_with_numeric_wildcard() {
        let mut compound = CompoundTag::new();
        compound.put_float("speed", 0.5);
        compound.put_string("id", "x");
        assert!(compound.contains("speed", ANY_NUMERIC));
        assert!(compound.contains("speed", TagType::Float.id()));
        assert!(!compound.contains("id", ANY_NUMERIC));
        assert!(!compound.contains("missing", ANY_NUMERIC));
    }

    #[test]
    fn get_list_checks_element_type() {
        let mut list = ListTag::new();
        list.push(1i32).unwrap();
        let mut compound = CompoundTag::new();
        compound.put_list("numbers", list);

        assert_eq!(compound.get_list("numbers", TagType::Int).len(), 1);
        assert!(compound.get_list("numbers", TagType::String).is_empty());
    }

    #[test]
    fn merge_is_recursive() {
        let mut ours = CompoundTag::new();
        let mut inner = CompoundTag::new();
        inner.put_int("a", 1);
        inner.put_int("b", 2);
        ours.put_compound("inner", inner);
        ours.put_string("kept", "yes");

        let mut theirs = CompoundTag::new();
        let mut inner = CompoundTag::new();
        inner.put_int("b", 20);
        inner.put_int("c", 30);
        theirs.put_compound("inner", inner);
        theirs.put_int("kept", 5);

        ours.merge(&theirs);
        let inner = ours.get_compound("inner");
        assert_eq!(inner.get_int("a"), 1);
        assert_eq!(inner.get_int("b"), 20);
        assert_eq!(inner.get_int("c"), 30);
        assert_eq!(ours.get_int("kept"), 5);
    }

    #[test]
    fn uuid_round_trips_through_int_array() {
        let uuid = 0x0123_4567_89ab_cdef_fedc_ba98_7654_3210u128;
        let mut compound = CompoundTag::new();
        compound.put_uuid("owner", uuid);
        assert!(compound.has_uuid("owner"));
        assert_eq!(compound.get_uuid("owner"), Some(uuid));
    }
}
