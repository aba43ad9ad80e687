use super::{
    identifier::Identifier,
    position::{BlockPosition, BlockRayHit},
    EnumOrdinal, MAX_STRING_LENGTH, MAX_TEXT_LENGTH,
};
use crate::nbt::{self, CompoundTag, NbtError};

/// An error while encoding packets.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("string too big (was {length} bytes encoded, max {max})")]
    StringTooLong { length: usize, max: usize },
    #[error("length {0} does not fit in a VarInt")]
    LengthOverflow(usize),
    #[error("can't serialize unregistered packet {0}")]
    Unregistered(&'static str),
    #[error(transparent)]
    Nbt(#[from] NbtError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T, E = EncodeError> = std::result::Result<T, E>;

/// A raw encoder for a Minecraft bitstream.
#[derive(Debug)]
pub struct Encoder<'a> {
    buffer: &'a mut Vec<u8>,
}

impl<'a> Encoder<'a> {
    /// Creates an encoder that will append to the provided
    /// byte buffer.
    ///
    /// Any existing contents of `buffer` are left untouched.
    pub fn new(buffer: &'a mut Vec<u8>) -> Self {
        Self { buffer }
    }

    /// Number of bytes in the underlying buffer.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Writes an unsigned byte to the stream.
    pub fn write_u8(&mut self, x: u8) {
        self.buffer.push(x);
    }

    /// Writes a signed byte to the stream.
    pub fn write_i8(&mut self, x: i8) {
        self.write_u8(bytemuck::cast(x));
    }

    /// Writes an unsigned short to the stream.
    pub fn write_u16(&mut self, x: u16) {
        self.buffer.extend(x.to_be_bytes());
    }

    /// Writes a signed short to the stream.
    pub fn write_i16(&mut self, x: i16) {
        self.buffer.extend(x.to_be_bytes());
    }

    /// Writes an unsigned int to the stream.
    pub fn write_u32(&mut self, x: u32) {
        self.buffer.extend(x.to_be_bytes());
    }

    /// Writes a signed int to the stream.
    pub fn write_i32(&mut self, x: i32) {
        self.buffer.extend(x.to_be_bytes());
    }

    /// Writes an unsigned long to the stream.
    pub fn write_u64(&mut self, x: u64) {
        self.buffer.extend(x.to_be_bytes());
    }

    /// Writes a signed long to the stream.
    pub fn write_i64(&mut self, x: i64) {
        self.buffer.extend(x.to_be_bytes());
    }

    /// Writes a float to the stream.
    pub fn write_f32(&mut self, x: f32) {
        self.buffer.extend(x.to_be_bytes());
    }

    /// Writes a double to the stream.
    pub fn write_f64(&mut self, x: f64) {
        self.buffer.extend(x.to_be_bytes());
    }

    /// Writes a boolean to the stream.
    pub fn write_bool(&mut self, x: bool) {
        self.write_u8(if x { 0x01 } else { 0x00 });
    }

    /// Writes a series of bytes to the stream. Does not write
    /// any sort of length prefix.
    pub fn write_slice(&mut self, slice: &[u8]) {
        self.buffer.extend_from_slice(slice);
    }

    /// Writes a VarInt to the stream. Returns the number of bytes written.
    pub fn write_var_int(&mut self, x: i32) -> usize {
        let mut x: u32 = bytemuck::cast(x);
        let mut bytes_written = 0;
        loop {
            let mut temp = (x & 0b0111_1111) as u8;
            x >>= 7;
            if x != 0 {
                temp |= 0b1000_0000;
            }

            self.buffer.push(temp);
            bytes_written += 1;

            if x == 0 {
                break bytes_written;
            }
        }
    }

    /// Writes a VarLong to the stream. Returns the number of bytes written.
    pub fn write_var_long(&mut self, x: i64) -> usize {
        let mut x: u64 = bytemuck::cast(x);
        let mut bytes_written = 0;
        loop {
            let mut temp = (x & 0b0111_1111) as u8;
            x >>= 7;
            if x != 0 {
                temp |= 0b1000_0000;
            }

            self.buffer.push(temp);
            bytes_written += 1;

            if x == 0 {
                break bytes_written;
            }
        }
    }

    /// Writes a collection length as a VarInt.
    pub fn write_length(&mut self, length: usize) -> Result<()> {
        let length = i32::try_from(length).map_err(|_| EncodeError::LengthOverflow(length))?;
        self.write_var_int(length);
        Ok(())
    }

    /// Writes a VarInt-prefixed string to the stream, with the default
    /// ceiling of 32767.
    pub fn write_string(&mut self, x: &str) -> Result<()> {
        self.write_string_max(x, MAX_STRING_LENGTH)
    }

    /// Writes a VarInt-prefixed string whose UTF-8 length may not
    /// exceed `max`.
    pub fn write_string_max(&mut self, x: &str, max: usize) -> Result<()> {
        if x.len() > max {
            return Err(EncodeError::StringTooLong {
                length: x.len(),
                max,
            });
        }
        self.write_length(x.len())?;
        self.buffer.extend_from_slice(x.as_bytes());
        Ok(())
    }

    pub fn write_text(&mut self, json: &str) -> Result<()> {
        self.write_string_max(json, MAX_TEXT_LENGTH)
    }

    pub fn write_identifier(&mut self, id: &Identifier) -> Result<()> {
        self.write_string(&id.to_string())
    }

    /// Writes a VarInt-prefixed byte array.
    pub fn write_byte_array(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_length(bytes.len())?;
        self.write_slice(bytes);
        Ok(())
    }

    pub fn write_var_int_array(&mut self, values: &[i32]) -> Result<()> {
        self.write_length(values.len())?;
        for &value in values {
            self.write_var_int(value);
        }
        Ok(())
    }

    pub fn write_long_array(&mut self, values: &[i64]) -> Result<()> {
        self.write_length(values.len())?;
        for &value in values {
            self.write_i64(value);
        }
        Ok(())
    }

    /// Writes a UUID as two big-endian longs.
    pub fn write_uuid(&mut self, uuid: u128) {
        self.write_u64((uuid >> 64) as u64);
        self.write_u64(uuid as u64);
    }

    /// Writes an enum constant as its VarInt ordinal.
    pub fn write_enum<E: EnumOrdinal>(&mut self, value: E) {
        self.write_var_int(value.ordinal());
    }

    /// Writes an optional root compound; `None` is a single zero byte.
    pub fn write_compound(&mut self, tag: Option<&CompoundTag>) -> Result<()> {
        match tag {
            Some(tag) => nbt::write_root(&mut *self.buffer, tag)?,
            None => self.write_u8(0),
        }
        Ok(())
    }

    pub fn write_block_position(&mut self, position: BlockPosition) {
        self.write_i64(position.pack());
    }

    pub fn write_block_ray_hit(&mut self, hit: &BlockRayHit) {
        self.write_block_position(hit.position);
        self.write_enum(hit.face);
        for component in hit.cursor() {
            self.write_f32(component);
        }
        self.write_bool(hit.inside);
    }

    /// Writes a fixed-point-encoded angle to the stream.
    pub fn write_angle(&mut self, degrees: f32) {
        let x = (degrees.rem_euclid(360.0) * 256.0 / 360.0) as u8;
        self.buffer.push(x);
    }
}

/// A type that can be written to an [`Encoder`].
pub trait Encode {
    fn encode(&self, encoder: &mut Encoder) -> Result<()>;
}

macro_rules! encode_primitives {
    ($($ty:ty => $write:ident),* $(,)?) => {
        $(
            impl Encode for $ty {
                fn encode(&self, encoder: &mut Encoder) -> Result<()> {
                    encoder.$write(*self);
                    Ok(())
                }
            }
        )*
    };
}

encode_primitives! {
    u8 => write_u8,
    i8 => write_i8,
    u16 => write_u16,
    i16 => write_i16,
    u32 => write_u32,
    i32 => write_i32,
    u64 => write_u64,
    i64 => write_i64,
    f32 => write_f32,
    f64 => write_f64,
    bool => write_bool,
    u128 => write_uuid,
    BlockPosition => write_block_position,
}

impl Encode for String {
    fn encode(&self, encoder: &mut Encoder) -> Result<()> {
        encoder.write_string(self)
    }
}

impl Encode for Identifier {
    fn encode(&self, encoder: &mut Encoder) -> Result<()> {
        encoder.write_identifier(self)
    }
}

impl Encode for BlockRayHit {
    fn encode(&self, encoder: &mut Encoder) -> Result<()> {
        encoder.write_block_ray_hit(self);
        Ok(())
    }
}

impl Encode for Option<CompoundTag> {
    fn encode(&self, encoder: &mut Encoder) -> Result<()> {
        encoder.write_compound(self.as_ref())
    }
}

impl Encode for () {
    fn encode(&self, _encoder: &mut Encoder) -> Result<()> {
        Ok(())
    }
}
