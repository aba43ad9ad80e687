//! Splits a byte stream into frames prefixed by a VarInt length of at
//! most three bytes, and prepends that length on the way out.

use super::pipeline::PipelineError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec;

/// Largest length that fits in a three-byte VarInt.
pub const MAX_FRAME_LENGTH: usize = (1 << 21) - 1;

const MAX_HEADER_SIZE: usize = 3;

#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_length: usize,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(MAX_FRAME_LENGTH)
    }
}

impl FrameCodec {
    pub fn new(max_length: usize) -> Self {
        Self {
            max_length: max_length.min(MAX_FRAME_LENGTH),
        }
    }

    /// Parses the length header, returning the length and header size,
    /// or `None` if the header is incomplete.
    fn peek_length(src: &[u8]) -> Result<Option<(usize, usize)>, PipelineError> {
        let mut length = 0usize;
        for (i, &byte) in src.iter().take(MAX_HEADER_SIZE).enumerate() {
            length |= usize::from(byte & 0x7F) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(Some((length, i + 1)));
            }
        }
        if src.len() >= MAX_HEADER_SIZE {
            Err(PipelineError::LengthTooWide)
        } else {
            Ok(None)
        }
    }
}

impl codec::Decoder for FrameCodec {
    type Item = BytesMut;
    type Error = PipelineError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some((length, header)) = Self::peek_length(src)? else {
            return Ok(None);
        };
        if length > self.max_length {
            return Err(PipelineError::FrameTooLarge {
                length,
                max: self.max_length,
            });
        }
        if src.len() < header + length {
            src.reserve(header + length - src.len());
            return Ok(None);
        }
        src.advance(header);
        Ok(Some(src.split_to(length)))
    }
}

impl codec::Encoder<Bytes> for FrameCodec {
    type Error = PipelineError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let mut length = item.len();
        if length > MAX_FRAME_LENGTH {
            return Err(PipelineError::FrameTooLarge {
                length,
                max: MAX_FRAME_LENGTH,
            });
        }
        dst.reserve(MAX_HEADER_SIZE + item.len());
        loop {
            let byte = (length & 0x7F) as u8;
            length >>= 7;
            if length == 0 {
                dst.put_u8(byte);
                break;
            }
            dst.put_u8(byte | 0x80);
        }
        dst.extend_from_slice(&item);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::codec::{Decoder, Encoder};

    #[test]
    fn splits_partial_input() {
        let mut codec = FrameCodec::default();
        let mut stream = BytesMut::new();
        codec.encode(Bytes::from_static(&[1, 2, 3]), &mut stream).unwrap();
        codec.encode(Bytes::from(vec![7u8; 300]), &mut stream).unwrap();
        assert_eq!(&stream[..4], &[3, 1, 2, 3]);

        let mut input = BytesMut::from(&stream[..100]);
        assert_eq!(&codec.decode(&mut input).unwrap().unwrap()[..], &[1, 2, 3]);
        assert!(codec.decode(&mut input).unwrap().is_none());

        input.extend_from_slice(&stream[100..]);
        assert_eq!(codec.decode(&mut input).unwrap().unwrap().len(), 300);
        assert!(input.is_empty());
    }

    #[test]
    fn rejects_wide_length() {
        let mut input = BytesMut::from(&[0x80u8, 0x80, 0x80, 0x01][..]);
        assert!(matches!(
            FrameCodec::default().decode(&mut input),
            Err(PipelineError::LengthTooWide)
        ));
    }

    #[test]
    fn rejects_oversized_frame() {
        let mut input = BytesMut::from(&[0x81u8, 0x01][..]);
        assert!(matches!(
            FrameCodec::new(64).decode(&mut input),
            Err(PipelineError::FrameTooLarge { length: 129, max: 64 })
        ));
    }
}
