use super::{
    identifier::{Identifier, InvalidIdentifier},
    position::{BlockFace, BlockPosition, BlockRayHit},
    EnumOrdinal, Phase, MAX_STRING_LENGTH, MAX_TEXT_LENGTH,
};
use crate::nbt::{self, CompoundTag, NbtError, SizeAccountant, NETWORK_BUDGET};
use std::{convert::Infallible, num::TryFromIntError, str::Utf8Error};

/// An error while decoding packets.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("need at least {0} more bytes")]
    EndOfStream(usize),
    #[error("invalid boolean pattern {0} - expected either 0 or 1")]
    InvalidBool(u8),
    #[error("VarInt too big")]
    VarIntTooLong,
    #[error("VarLong too big")]
    VarLongTooLong,
    #[error("the received encoded string buffer length is longer than maximum allowed ({length} > {max})")]
    StringTooLong { length: usize, max: usize },
    #[error("the received encoded string buffer length is less than zero")]
    NegativeStringLength,
    #[error("the received string length is longer than maximum allowed ({length} > {max})")]
    StringCharsTooLong { length: usize, max: usize },
    #[error("declared array length {length} exceeds maximum of {max}")]
    ArrayTooLong { length: usize, max: usize },
    #[error("unknown ordinal {ordinal} for {name}")]
    UnknownOrdinal { ordinal: i32, name: &'static str },
    #[error("bad packet id {id} in phase {phase:?}")]
    UnknownPacket { phase: Phase, id: i32 },
    #[error("packet {packet} was larger than expected, found {remaining} bytes extra")]
    TrailingBytes { packet: &'static str, remaining: usize },
    #[error(transparent)]
    Identifier(#[from] InvalidIdentifier),
    #[error(transparent)]
    Nbt(#[from] NbtError),
    #[error(transparent)]
    Utf8(#[from] Utf8Error),
    #[error(transparent)]
    IntConversion(#[from] TryFromIntError),
    /// Special variant for derive macro integer conversions to work.
    /// Cannot occur.
    #[error(transparent)]
    Infallible(#[from] Infallible),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T, E = DecodeError> = std::result::Result<T, E>;

/// A raw decoder for a Minecraft bitstream.
#[derive(Debug)]
pub struct Decoder<'a> {
    buffer: &'a [u8],
    nbt_budget: u64,
}

impl<'a> Decoder<'a> {
    /// Creates a decoder from the buffer it will read from.
    pub fn new(buffer: &'a [u8]) -> Self {
        Self::with_nbt_budget(buffer, NETWORK_BUDGET)
    }

    /// Creates a decoder whose embedded tag trees are each bounded by
    /// `nbt_budget` bytes.
    pub fn with_nbt_budget(buffer: &'a [u8], nbt_budget: u64) -> Self {
        Self { buffer, nbt_budget }
    }

    /// Creates a new decoder at the same position.
    pub fn duplicate(&self) -> Self {
        Self {
            buffer: self.buffer,
            nbt_budget: self.nbt_budget,
        }
    }

    /// Gets the remaining buffer.
    pub fn buffer(&self) -> &'a [u8] {
        self.buffer
    }

    /// Returns if there is no data left in the buffer.
    pub fn is_finished(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len()
    }

    /// Consumes `n` bytes from the buffer, returning them as a slice.
    pub fn consume_slice(&mut self, n: usize) -> Result<&'a [u8]> {
        if n <= self.buffer.len() {
            let (data, buffer) = self.buffer.split_at(n);
            self.buffer = buffer;
            Ok(data)
        } else {
            Err(DecodeError::EndOfStream(n - self.buffer.len()))
        }
    }

    /// Consumes `N` bytes into an array.
    pub fn consume<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut array = [0u8; N];
        array.copy_from_slice(self.consume_slice(N)?);
        Ok(array)
    }

    /// Consumes everything left in the buffer.
    pub fn consume_rest(&mut self) -> &'a [u8] {
        std::mem::take(&mut self.buffer)
    }

    /// Reads an unsigned byte from the stream.
    pub fn read_u8(&mut self) -> Result<u8> {
        self.consume::<1>().map(|[x]| x)
    }

    /// Reads a signed byte from the stream.
    pub fn read_i8(&mut self) -> Result<i8> {
        self.consume().map(i8::from_be_bytes)
    }

    /// Reads an unsigned short from the stream.
    pub fn read_u16(&mut self) -> Result<u16> {
        self.consume().map(u16::from_be_bytes)
    }

    /// Reads a signed short from the stream.
    pub fn read_i16(&mut self) -> Result<i16> {
        self.consume().map(i16::from_be_bytes)
    }

    /// Reads an unsigned int from the stream.
    pub fn read_u32(&mut self) -> Result<u32> {
        self.consume().map(u32::from_be_bytes)
    }

    /// Reads a signed int from the stream.
    pub fn read_i32(&mut self) -> Result<i32> {
        self.consume().map(i32::from_be_bytes)
    }

    /// Reads an unsigned long from the stream.
    pub fn read_u64(&mut self) -> Result<u64> {
        self.consume().map(u64::from_be_bytes)
    }

    /// Reads a signed long from the stream.
    pub fn read_i64(&mut self) -> Result<i64> {
        self.consume().map(i64::from_be_bytes)
    }

    /// Reads a float from the stream.
    pub fn read_f32(&mut self) -> Result<f32> {
        self.consume().map(f32::from_be_bytes)
    }

    /// Reads a double from the stream.
    pub fn read_f64(&mut self) -> Result<f64> {
        self.consume().map(f64::from_be_bytes)
    }

    /// Reads a boolean from the stream.
    pub fn read_bool(&mut self) -> Result<bool> {
        let x = self.read_u8()?;
        match x {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(DecodeError::InvalidBool(x)),
        }
    }

    /// Reads a VarInt from the stream.
    pub fn read_var_int(&mut self) -> Result<i32> {
        self.read_var_int_with_size().map(|(x, _)| x)
    }

    /// Reads a VarInt from the stream, additionally
    /// returning the number of bytes read.
    ///
    /// Fails once five bytes have been read without a terminating byte.
    pub fn read_var_int_with_size(&mut self) -> Result<(i32, usize)> {
        let mut num_read = 0;
        let mut result: u32 = 0;

        loop {
            let read = self.read_u8()?;
            result |= u32::from(read & 0b0111_1111) << (7 * num_read);
            num_read += 1;

            if read & 0b1000_0000 == 0 {
                break;
            }
            if num_read >= 5 {
                return Err(DecodeError::VarIntTooLong);
            }
        }
        Ok((bytemuck::cast(result), num_read as usize))
    }

    /// Reads a VarLong from the stream.
    ///
    /// Fails once ten bytes have been read without a terminating byte.
    pub fn read_var_long(&mut self) -> Result<i64> {
        let mut num_read = 0;
        let mut result: u64 = 0;

        loop {
            let read = self.read_u8()?;
            result |= u64::from(read & 0b0111_1111) << (7 * num_read);
            num_read += 1;

            if read & 0b1000_0000 == 0 {
                break;
            }
            if num_read >= 10 {
                return Err(DecodeError::VarLongTooLong);
            }
        }
        Ok(bytemuck::cast(result))
    }

    /// Reads a VarInt length prefix and checks it against `max`.
    pub fn read_length(&mut self, max: usize) -> Result<usize> {
        let length = usize::try_from(self.read_var_int()?)?;
        if length > max {
            return Err(DecodeError::ArrayTooLong { length, max });
        }
        Ok(length)
    }

    /// Reads a string from the stream, with the default
    /// ceiling of 32767 characters.
    pub fn read_string(&mut self) -> Result<&'a str> {
        self.read_string_max(MAX_STRING_LENGTH)
    }

    /// Reads a string of at most `max_chars` UTF-16 units.
    ///
    /// The declared byte length is checked against `4 * max_chars`
    /// before anything is decoded; the character count is checked after.
    pub fn read_string_max(&mut self, max_chars: usize) -> Result<&'a str> {
        let length = self.read_var_int()?;
        let max_bytes = max_chars.saturating_mul(4);
        let length = usize::try_from(length).map_err(|_| DecodeError::NegativeStringLength)?;
        if length > max_bytes {
            return Err(DecodeError::StringTooLong {
                length,
                max: max_bytes,
            });
        }

        let s = std::str::from_utf8(self.consume_slice(length)?)?;
        let chars = s.encode_utf16().count();
        if chars > max_chars {
            return Err(DecodeError::StringCharsTooLong {
                length: chars,
                max: max_chars,
            });
        }
        Ok(s)
    }

    /// Reads a chat component, carried as its JSON text.
    pub fn read_text(&mut self) -> Result<String> {
        self.read_string_max(MAX_TEXT_LENGTH).map(str::to_owned)
    }

    pub fn read_identifier(&mut self) -> Result<Identifier> {
        Ok(self.read_string()?.parse()?)
    }

    /// Reads a VarInt-prefixed byte array of at most `max` bytes.
    pub fn read_byte_array(&mut self, max: usize) -> Result<&'a [u8]> {
        let length = self.read_length(max)?;
        self.consume_slice(length)
    }

    /// Reads a VarInt-prefixed array of VarInts.
    pub fn read_var_int_array(&mut self, max: usize) -> Result<Vec<i32>> {
        let length = self.read_length(max)?;
        let mut array = Vec::with_capacity(length.min(self.remaining()));
        for _ in 0..length {
            array.push(self.read_var_int()?);
        }
        Ok(array)
    }

    /// Reads a VarInt-prefixed array of longs.
    pub fn read_long_array(&mut self, max: usize) -> Result<Vec<i64>> {
        let length = self.read_length(max)?;
        let mut array = Vec::with_capacity(length.min(self.remaining() / 8));
        for _ in 0..length {
            array.push(self.read_i64()?);
        }
        Ok(array)
    }

    /// Reads a UUID as two big-endian longs.
    pub fn read_uuid(&mut self) -> Result<u128> {
        let most = self.read_u64()?;
        let least = self.read_u64()?;
        Ok(u128::from(most) << 64 | u128::from(least))
    }

    /// Reads an enum constant by its VarInt ordinal.
    pub fn read_enum<E: EnumOrdinal>(&mut self) -> Result<E> {
        let ordinal = self.read_var_int()?;
        E::from_ordinal(ordinal).ok_or(DecodeError::UnknownOrdinal {
            ordinal,
            name: E::NAME,
        })
    }

    /// Reads an optional root compound. A zero discriminant byte means
    /// no tag.
    pub fn read_compound(&mut self) -> Result<Option<CompoundTag>> {
        let mut accountant = SizeAccountant::new(self.nbt_budget);
        self.read_compound_with(&mut accountant)
    }

    pub fn read_compound_with(&mut self, accountant: &mut SizeAccountant) -> Result<Option<CompoundTag>> {
        match self.buffer.first() {
            None => Err(DecodeError::EndOfStream(1)),
            Some(0) => {
                self.read_u8()?;
                Ok(None)
            }
            Some(_) => {
                let mut reader = self.buffer;
                let root = nbt::read_root(&mut reader, accountant)?;
                self.buffer = reader;
                Ok(Some(root))
            }
        }
    }

    pub fn read_block_position(&mut self) -> Result<BlockPosition> {
        self.read_i64().map(BlockPosition::unpack)
    }

    pub fn read_block_ray_hit(&mut self) -> Result<BlockRayHit> {
        let position = self.read_block_position()?;
        let face: BlockFace = self.read_enum()?;
        let cursor = [self.read_f32()?, self.read_f32()?, self.read_f32()?];
        let inside = self.read_bool()?;
        Ok(BlockRayHit::from_cursor(position, face, cursor, inside))
    }

    pub fn read_angle(&mut self) -> Result<f32> {
        let fixed = self.read_u8()?;
        Ok(f32::from(fixed) * 360.0 / 256.0)
    }
}

/// A type that can be read from a [`Decoder`].
pub trait Decode: Sized {
    fn decode(decoder: &mut Decoder) -> Result<Self>;
}

macro_rules! decode_primitives {
    ($($ty:ty => $read:ident),* $(,)?) => {
        $(
            impl Decode for $ty {
                fn decode(decoder: &mut Decoder) -> Result<Self> {
                    decoder.$read()
                }
            }
        )*
    };
}

decode_primitives! {
    u8 => read_u8,
    i8 => read_i8,
    u16 => read_u16,
    i16 => read_i16,
    u32 => read_u32,
    i32 => read_i32,
    u64 => read_u64,
    i64 => read_i64,
    f32 => read_f32,
    f64 => read_f64,
    bool => read_bool,
    u128 => read_uuid,
    BlockPosition => read_block_position,
    BlockRayHit => read_block_ray_hit,
    Identifier => read_identifier,
}

impl Decode for String {
    fn decode(decoder: &mut Decoder) -> Result<Self> {
        decoder.read_string().map(str::to_owned)
    }
}

impl Decode for Option<CompoundTag> {
    fn decode(decoder: &mut Decoder) -> Result<Self> {
        decoder.read_compound()
    }
}

impl Decode for () {
    fn decode(_decoder: &mut Decoder) -> Result<Self> {
        Ok(())
    }
}
