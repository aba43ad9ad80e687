//! Modified UTF-8 as used for tag strings and compound keys.
//!
//! Differs from standard UTF-8 in two ways: NUL is written as the two
//! bytes `C0 80`, and characters outside the BMP are written as two
//! separately encoded UTF-16 surrogates (three bytes each).

use super::NbtError;
use std::io::{Read, Write};

pub const MAX_ENCODED_LENGTH: usize = u16::MAX as usize;

pub fn encoded_len(s: &str) -> usize {
    s.encode_utf16()
        .map(|unit| match unit {
            0x0001..=0x007F => 1,
            0x0000 | 0x0080..=0x07FF => 2,
            _ => 3,
        })
        .sum()
}

pub fn encode(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    for unit in s.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | (unit >> 6) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | (unit >> 12) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    out
}

pub fn decode(bytes: &[u8]) -> Result<String, NbtError> {
    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        let unit = match b >> 4 {
            0x0..=0x7 => {
                i += 1;
                u16::from(b)
            }
            0xC | 0xD => {
                let b2 = continuation(bytes, i + 1)?;
                i += 2;
                (u16::from(b & 0x1F) << 6) | b2
            }
            0xE => {
                let b2 = continuation(bytes, i + 1)?;
                let b3 = continuation(bytes, i + 2)?;
                i += 3;
                (u16::from(b & 0x0F) << 12) | (b2 << 6) | b3
            }
            _ => return Err(NbtError::MalformedString),
        };
        units.push(unit);
    }
    String::from_utf16(&units).map_err(|_| NbtError::MalformedString)
}

fn continuation(bytes: &[u8], index: usize) -> Result<u16, NbtError> {
    match bytes.get(index) {
        Some(&b) if b & 0xC0 == 0x80 => Ok(u16::from(b & 0x3F)),
        _ => Err(NbtError::MalformedString),
    }
}

/// Writes a `u16` length prefix followed by the encoded string.
pub fn write(out: &mut impl Write, s: &str) -> Result<(), NbtError> {
    let encoded = encode(s);
    if encoded.len() > MAX_ENCODED_LENGTH {
        return Err(NbtError::StringTooLong(encoded.len()));
    }
    out.write_all(&(encoded.len() as u16).to_be_bytes())?;
    out.write_all(&encoded)?;
    Ok(())
}

pub fn read(input: &mut impl Read) -> Result<String, NbtError> {
    let mut len = [0u8; 2];
    input.read_exact(&mut len)?;
    let mut bytes = vec![0u8; usize::from(u16::from_be_bytes(len))];
    input.read_exact(&mut bytes)?;
    decode(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nul_uses_two_bytes() {
        assert_eq!(encode("a\0"), vec![b'a', 0xC0, 0x80]);
        assert_eq!(decode(&[b'a', 0xC0, 0x80]).unwrap(), "a\0");
    }

    #[test]
    fn supplementary_characters_use_surrogates() {
        let s = "\u{1F600}";
        let encoded = encode(s);
        assert_eq!(encoded.len(), 6);
        assert_eq!(encoded_len(s), 6);
        assert_eq!(decode(&encoded).unwrap(), s);
    }

    #[test]
    fn rejects_truncated_sequences() {
        assert!(decode(&[0xE2, 0x82]).is_err());
        assert!(decode(&[0xF0, 0x9F, 0x98, 0x80]).is_err());
    }

    #[test]
    fn write_rejects_oversized() {
        let s = "é".repeat(40_000);
        assert!(matches!(
            write(&mut Vec::new(), &s),
            Err(NbtError::StringTooLong(80_000))
        ));
    }
}
