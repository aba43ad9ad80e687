use super::{error::Result, CompoundTag, NbtError, Tag, TagType};
use once_cell::sync::Lazy;

static EMPTY_COMPOUND: Lazy<CompoundTag> = Lazy::new(CompoundTag::new);

/// A homogeneous list of tags.
///
/// An empty list has element type [`TagType::End`] and adopts the type
/// of the first tag inserted. Inserting a tag of any other type fails
/// and leaves the list untouched. End tags can never be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct ListTag {
    element_type: TagType,
    elements: Vec<Tag>,
}

impl Default for ListTag {
    fn default() -> Self {
        Self::new()
    }
}

impl ListTag {
    pub fn new() -> Self {
        Self {
            element_type: TagType::End,
            elements: Vec::new(),
        }
    }

    /// Builds a list from decoded parts. The caller guarantees every
    /// element has type `element_type`.
    pub(super) fn from_parts(element_type: TagType, elements: Vec<Tag>) -> Self {
        Self {
            element_type,
            elements,
        }
    }

    pub fn element_type(&self) -> TagType {
        self.element_type
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Tag> {
        self.elements.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Tag> {
        self.elements.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tag> {
        self.elements.iter()
    }

    /// Checks whether `tag` may be stored in this list, fixing the
    /// element type if the list is currently untyped.
    fn accept(&mut self, tag: &Tag) -> Result<()> {
        let found = tag.tag_type();
        if found == TagType::End {
            return Err(self.mismatch(found));
        }
        if self.element_type == TagType::End {
            self.element_type = found;
            Ok(())
        } else if self.element_type == found {
            Ok(())
        } else {
            Err(self.mismatch(found))
        }
    }

    fn mismatch(&self, found: TagType) -> NbtError {
        NbtError::ListTypeMismatch {
            expected: self.element_type.id(),
            found: found.id(),
        }
    }

    pub fn push(&mut self, tag: impl Into<Tag>) -> Result<()> {
        let tag = tag.into();
        self.accept(&tag)?;
        self.elements.push(tag);
        Ok(())
    }

    /// Inserts at `index`, shifting later elements.
    ///
    /// # Panics
    /// Panics if `index > len`.
    pub fn insert(&mut self, index: usize, tag: impl Into<Tag>) -> Result<()> {
        let len = self.elements.len();
        assert!(index <= len, "insertion index (is {index}) should be <= len (is {len})");
        let tag = tag.into();
        self.accept(&tag)?;
        self.elements.insert(index, tag);
        Ok(())
    }

    /// Replaces the element at `index`, returning the old one.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    pub fn set(&mut self, index: usize, tag: impl Into<Tag>) -> Result<Tag> {
        let len = self.elements.len();
        assert!(index < len, "index out of bounds: the len is {len} but the index is {index}");
        let tag = tag.into();
        self.accept(&tag)?;
        Ok(std::mem::replace(&mut self.elements[index], tag))
    }

    /// Removes the element at `index`. Removing the last element
    /// resets the list to untyped.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    pub fn remove(&mut self, index: usize) -> Tag {
        let removed = self.elements.remove(index);
        if self.elements.is_empty() {
            self.element_type = TagType::End;
        }
        removed
    }

    pub fn clear(&mut self) {
        self.elements.clear();
        self.element_type = TagType::End;
    }

    pub fn copy(&self) -> ListTag {
        self.clone()
    }

    /// Compound at `index`, or an empty compound on mismatch.
    pub fn get_compound(&self, index: usize) -> &CompoundTag {
        match self.elements.get(index) {
            Some(Tag::Compound(c)) => c,
            _ => &EMPTY_COMPOUND,
        }
    }

    pub fn get_list(&self, index: usize) -> Option<&ListTag> {
        self.elements.get(index).and_then(Tag::as_list)
    }

    pub fn get_short(&self, index: usize) -> i16 {
        match self.elements.get(index) {
            Some(Tag::Short(x)) => *x,
            _ => 0,
        }
    }

    pub fn get_int(&self, index: usize) -> i32 {
        match self.elements.get(index) {
            Some(Tag::Int(x)) => *x,
            _ => 0,
        }
    }

    pub fn get_float(&self, index: usize) -> f32 {
        match self.elements.get(index) {
            Some(Tag::Float(x)) => *x,
            _ => 0.0,
        }
    }

    pub fn get_double(&self, index: usize) -> f64 {
        match self.elements.get(index) {
            Some(Tag::Double(x)) => *x,
            _ => 0.0,
        }
    }

    pub fn get_int_array(&self, index: usize) -> &[i32] {
        match self.elements.get(index) {
            Some(Tag::IntArray(x)) => x,
            _ => &[],
        }
    }

    /// String form of the element at `index`: the string itself for a
    /// string element, its SNBT for anything else, empty if absent.
    pub fn get_string(&self, index: usize) -> String {
        match self.elements.get(index) {
            Some(Tag::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        }
    }
}

impl<'a> IntoIterator for &'a ListTag {
    type Item = &'a Tag;
    type IntoIter = std::slice::Iter<'a, Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

impl IntoIterator for ListTag {
    type Item = Tag;
    type IntoIter = std::vec::IntoIter<Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_iter()
    }
}

impl TryFrom<Vec<Tag>> for ListTag {
    type Error = NbtError;

    fn try_from(tags: Vec<Tag>) -> Result<Self> {
        let mut list = ListTag::new();
        for tag in tags {
            list.push(tag)?;
        }
        Ok(list)
    }
}
