//! Binary tag format: a discriminant byte followed by the payload,
//! big-endian, recursively.

use super::{
    error::Result, mutf8, CompoundTag, ListTag, NbtError, SizeAccountant, Tag, TagType,
};
use std::io::{Read, Write};

/// Hard ceiling on compound/list nesting.
pub const MAX_DEPTH: usize = 512;

// Per-node costs, in bits, charged before the payload is read.
const END_COST: u64 = 64;
const BYTE_COST: u64 = 72;
const SHORT_COST: u64 = 80;
const INT_COST: u64 = 96;
const LONG_COST: u64 = 128;
const FLOAT_COST: u64 = 96;
const DOUBLE_COST: u64 = 128;
const ARRAY_COST: u64 = 192;
const STRING_COST: u64 = 288;
const LIST_COST: u64 = 296;
const COMPOUND_COST: u64 = 384;
const ENTRY_COST: u64 = 224;
const DUPLICATE_KEY_COST: u64 = 288;
const CHAR_COST: u64 = 16;

fn read_array<const N: usize>(input: &mut impl Read) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    input.read_exact(&mut buf)?;
    Ok(buf)
}

fn read_length(input: &mut impl Read, what: &'static str) -> Result<usize> {
    let length = i32::from_be_bytes(read_array(input)?);
    usize::try_from(length).map_err(|_| NbtError::NegativeLength(length, what))
}

fn write_length(out: &mut impl Write, length: usize) -> Result<()> {
    let length = i32::try_from(length).map_err(|_| NbtError::LengthOverflow(length))?;
    out.write_all(&length.to_be_bytes())?;
    Ok(())
}

fn read_string(input: &mut impl Read, accountant: &mut SizeAccountant) -> Result<String> {
    let s = mutf8::read(input)?;
    accountant.charge_elements(CHAR_COST, s.len() as u64)?;
    Ok(s)
}

impl Tag {
    /// Writes the payload of this tag. The caller is responsible for the
    /// discriminant byte and, for named entries, the name.
    pub fn write_payload(&self, out: &mut impl Write) -> Result<()> {
        match self {
            Tag::End => {}
            Tag::Byte(x) => out.write_all(&x.to_be_bytes())?,
            Tag::Short(x) => out.write_all(&x.to_be_bytes())?,
            Tag::Int(x) => out.write_all(&x.to_be_bytes())?,
            Tag::Long(x) => out.write_all(&x.to_be_bytes())?,
            Tag::Float(x) => out.write_all(&x.to_be_bytes())?,
            Tag::Double(x) => out.write_all(&x.to_be_bytes())?,
            Tag::ByteArray(bytes) => {
                write_length(out, bytes.len())?;
                out.write_all(bytemuck::cast_slice::<i8, u8>(bytes))?;
            }
            Tag::String(s) => mutf8::write(out, s)?,
            Tag::List(list) => {
                let element_type = if list.is_empty() {
                    TagType::End
                } else {
                    list.element_type()
                };
                out.write_all(&[element_type.id()])?;
                write_length(out, list.len())?;
                for element in list {
                    element.write_payload(out)?;
                }
            }
            Tag::Compound(compound) => compound.write_payload(out)?,
            Tag::IntArray(ints) => {
                write_length(out, ints.len())?;
                for x in ints {
                    out.write_all(&x.to_be_bytes())?;
                }
            }
            Tag::LongArray(longs) => {
                write_length(out, longs.len())?;
                for x in longs {
                    out.write_all(&x.to_be_bytes())?;
                }
            }
        }
        Ok(())
    }

    /// Decodes the payload of a tag with discriminant `tag_type`.
    ///
    /// `depth` is the nesting level of this tag; compounds and lists
    /// deeper than [`MAX_DEPTH`] are rejected.
    pub fn read_payload(
        tag_type: u8,
        input: &mut impl Read,
        depth: usize,
        accountant: &mut SizeAccountant,
    ) -> Result<Tag> {
        let tag_type = TagType::from_id(tag_type).ok_or(NbtError::UnknownTagType(tag_type))?;
        let tag = match tag_type {
            TagType::End => {
                accountant.charge_bits(END_COST)?;
                Tag::End
            }
            TagType::Byte => {
                accountant.charge_bits(BYTE_COST)?;
                Tag::Byte(i8::from_be_bytes(read_array(input)?))
            }
            TagType::Short => {
                accountant.charge_bits(SHORT_COST)?;
                Tag::Short(i16::from_be_bytes(read_array(input)?))
            }
            TagType::Int => {
                accountant.charge_bits(INT_COST)?;
                Tag::Int(i32::from_be_bytes(read_array(input)?))
            }
            TagType::Long => {
                accountant.charge_bits(LONG_COST)?;
                Tag::Long(i64::from_be_bytes(read_array(input)?))
            }
            TagType::Float => {
                accountant.charge_bits(FLOAT_COST)?;
                Tag::Float(f32::from_be_bytes(read_array(input)?))
            }
            TagType::Double => {
                accountant.charge_bits(DOUBLE_COST)?;
                Tag::Double(f64::from_be_bytes(read_array(input)?))
            }
            TagType::ByteArray => {
                accountant.charge_bits(ARRAY_COST)?;
                let length = read_length(input, "byte array")?;
                accountant.charge_elements(8, length as u64)?;
                let mut bytes = vec![0u8; length];
                input.read_exact(&mut bytes)?;
                Tag::ByteArray(bytes.into_iter().map(|b| b as i8).collect())
            }
            TagType::String => {
                accountant.charge_bits(STRING_COST)?;
                Tag::String(read_string(input, accountant)?)
            }
            TagType::List => Tag::List(read_list(input, depth, accountant)?),
            TagType::Compound => Tag::Compound(read_compound(input, depth, accountant)?),
            TagType::IntArray => {
                accountant.charge_bits(ARRAY_COST)?;
                let length = read_length(input, "int array")?;
                accountant.charge_elements(32, length as u64)?;
                let mut ints = Vec::with_capacity(length);
                for _ in 0..length {
                    ints.push(i32::from_be_bytes(read_array(input)?));
                }
                Tag::IntArray(ints)
            }
            TagType::LongArray => {
                accountant.charge_bits(ARRAY_COST)?;
                let length = read_length(input, "long array")?;
                accountant.charge_elements(64, length as u64)?;
                let mut longs = Vec::with_capacity(length);
                for _ in 0..length {
                    longs.push(i64::from_be_bytes(read_array(input)?));
                }
                Tag::LongArray(longs)
            }
        };
        Ok(tag)
    }
}

fn read_list(
    input: &mut impl Read,
    depth: usize,
    accountant: &mut SizeAccountant,
) -> Result<ListTag> {
    accountant.charge_bits(LIST_COST)?;
    if depth > MAX_DEPTH {
        return Err(NbtError::DepthExceeded(MAX_DEPTH));
    }
    let [element_id] = read_array(input)?;
    let declared = i32::from_be_bytes(read_array(input)?);
    if element_id == TagType::End.id() && declared > 0 {
        return Err(NbtError::MissingListType(declared));
    }
    // Negative lengths decode as an empty list.
    let length = usize::try_from(declared).unwrap_or(0);
    accountant.charge_elements(32, length as u64)?;

    if length == 0 {
        return Ok(ListTag::new());
    }
    let element_type =
        TagType::from_id(element_id).ok_or(NbtError::UnknownTagType(element_id))?;
    let mut elements = Vec::new();
    for _ in 0..length {
        elements.push(Tag::read_payload(element_id, input, depth + 1, accountant)?);
    }
    Ok(ListTag::from_parts(element_type, elements))
}

fn read_compound(
    input: &mut impl Read,
    depth: usize,
    accountant: &mut SizeAccountant,
) -> Result<CompoundTag> {
    accountant.charge_bits(COMPOUND_COST)?;
    if depth > MAX_DEPTH {
        return Err(NbtError::DepthExceeded(MAX_DEPTH));
    }
    let mut compound = CompoundTag::new();
    loop {
        let [tag_type] = read_array(input)?;
        if tag_type == TagType::End.id() {
            break;
        }
        let key = mutf8::read(input)?;
        accountant.charge_bits(ENTRY_COST + CHAR_COST * key.len() as u64)?;
        let tag = Tag::read_payload(tag_type, input, depth + 1, accountant)?;
        if compound.insert_raw(key, tag).is_some() {
            accountant.charge_bits(DUPLICATE_KEY_COST)?;
        }
    }
    Ok(compound)
}

impl CompoundTag {
    /// Writes the entries followed by the end marker.
    pub fn write_payload(&self, out: &mut impl Write) -> Result<()> {
        for (key, tag) in self.iter() {
            out.write_all(&[tag.id()])?;
            if tag.tag_type() != TagType::End {
                mutf8::write(out, key)?;
                tag.write_payload(out)?;
            }
        }
        out.write_all(&[TagType::End.id()])?;
        Ok(())
    }
}

/// Writes a named root tag: discriminant, name, payload.
pub fn write_named(out: &mut impl Write, name: &str, tag: &Tag) -> Result<()> {
    out.write_all(&[tag.id()])?;
    if tag.tag_type() != TagType::End {
        mutf8::write(out, name)?;
        tag.write_payload(out)?;
    }
    Ok(())
}

/// Writes `root` as an unnamed root compound, the form used on the
/// network and in files.
pub fn write_root(out: &mut impl Write, root: &CompoundTag) -> Result<()> {
    out.write_all(&[TagType::Compound.id()])?;
    mutf8::write(out, "")?;
    root.write_payload(out)
}

/// Reads a named root tag. A leading end marker yields `("", Tag::End)`.
pub fn read_named(input: &mut impl Read, accountant: &mut SizeAccountant) -> Result<(String, Tag)> {
    let [tag_type] = read_array(input)?;
    if tag_type == TagType::End.id() {
        return Ok((String::new(), Tag::End));
    }
    let name = mutf8::read(input)?;
    accountant.charge_elements(CHAR_COST, name.len() as u64)?;
    let tag = Tag::read_payload(tag_type, input, 0, accountant)?;
    Ok((name, tag))
}

/// Reads a named root that must be a compound.
pub fn read_root(input: &mut impl Read, accountant: &mut SizeAccountant) -> Result<CompoundTag> {
    match read_named(input, accountant)? {
        (_, Tag::Compound(compound)) => Ok(compound),
        (_, other) => Err(NbtError::RootNotCompound(other.tag_type().pretty_name())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(tag: &Tag) -> Vec<u8> {
        let mut out = Vec::new();
        tag.write_payload(&mut out).unwrap();
        out
    }

    #[test]
    fn length_wider_than_i32_is_refused() {
        let mut out = Vec::new();
        assert!(matches!(
            write_length(&mut out, i32::MAX as usize + 1),
            Err(NbtError::LengthOverflow(_))
        ));
        assert!(out.is_empty());
        write_length(&mut out, 3).unwrap();
        assert_eq!(out, [0, 0, 0, 3]);
    }

    #[test]
    fn empty_compound_is_single_end_byte() {
        assert_eq!(encode(&Tag::Compound(CompoundTag::new())), vec![0]);
    }

    #[test]
    fn unknown_discriminant_fails() {
        let mut accountant = SizeAccountant::unlimited();
        let err = Tag::read_payload(13, &mut &[][..], 0, &mut accountant).unwrap_err();
        assert!(matches!(err, NbtError::UnknownTagType(13)));
    }

    #[test]
    fn declared_array_length_is_charged_before_allocation() {
        // int array claiming a billion elements but supplying none
        let bytes = 1_000_000_000i32.to_be_bytes();
        let mut accountant = SizeAccountant::new(1024);
        let err = Tag::read_payload(TagType::IntArray.id(), &mut &bytes[..], 0, &mut accountant)
            .unwrap_err();
        assert!(matches!(err, NbtError::SizeLimit { .. }));
    }

    #[test]
    fn negative_array_length_fails() {
        let bytes = (-1i32).to_be_bytes();
        let mut accountant = SizeAccountant::unlimited();
        let err = Tag::read_payload(TagType::ByteArray.id(), &mut &bytes[..], 0, &mut accountant)
            .unwrap_err();
        assert!(matches!(err, NbtError::NegativeLength(-1, _)));
    }

    #[test]
    fn list_without_type_but_with_elements_fails() {
        let mut bytes = vec![0u8];
        bytes.extend(3i32.to_be_bytes());
        let mut accountant = SizeAccountant::unlimited();
        let err = Tag::read_payload(TagType::List.id(), &mut &bytes[..], 0, &mut accountant)
            .unwrap_err();
        assert!(matches!(err, NbtError::MissingListType(3)));
    }

    #[test]
    fn nesting_past_ceiling_fails() {
        // MAX_DEPTH + 2 nested single-element lists of lists
        let mut bytes = Vec::new();
        for _ in 0..MAX_DEPTH + 2 {
            bytes.push(TagType::List.id());
            bytes.extend(1i32.to_be_bytes());
        }
        bytes.push(TagType::End.id());
        bytes.extend(0i32.to_be_bytes());

        let mut accountant = SizeAccountant::unlimited();
        let err = Tag::read_payload(TagType::List.id(), &mut &bytes[..], 0, &mut accountant)
            .unwrap_err();
        assert!(matches!(err, NbtError::DepthExceeded(MAX_DEPTH)));
    }

    #[test]
    fn root_must_be_compound() {
        let mut out = Vec::new();
        write_named(&mut out, "", &Tag::Int(5)).unwrap();
        let err = read_root(&mut &out[..], &mut SizeAccountant::unlimited()).unwrap_err();
        assert!(matches!(err, NbtError::RootNotCompound("TAG_Int")));
    }
}
