//! zlib compression of frames above a size threshold.
//!
//! A compressed frame starts with the VarInt length of the inflated
//! data, or zero if the rest of the frame is stored uncompressed.

use super::{Direction, Layer, PipelineError, Stage};
use crate::protocol::{Decoder, Encoder, MAX_PACKET_SIZE};
use bytes::BytesMut;
use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};
use std::{
    any::Any,
    io::{Read, Write},
};

#[derive(Debug)]
pub struct CompressionEncoder {
    threshold: usize,
}

impl CompressionEncoder {
    pub fn new(threshold: usize) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: usize) {
        self.threshold = threshold;
    }
}

impl Stage for CompressionEncoder {
    fn direction(&self) -> Direction {
        Direction::Outbound
    }

    fn layer(&self) -> Layer {
        Layer::Frame
    }

    fn apply(&mut self, data: BytesMut) -> Result<BytesMut, PipelineError> {
        if data.len() > MAX_PACKET_SIZE {
            return Err(PipelineError::AboveMaximum {
                size: data.len(),
                max: MAX_PACKET_SIZE,
            });
        }
        let mut out = Vec::with_capacity(data.len() + 5);
        let mut encoder = Encoder::new(&mut out);
        if data.len() < self.threshold {
            encoder.write_var_int(0);
            encoder.write_slice(&data);
        } else {
            // Bounded by MAX_PACKET_SIZE above.
            encoder.write_var_int(data.len() as i32);
            let mut zlib = ZlibEncoder::new(out, Compression::default());
            zlib.write_all(&data)?;
            out = zlib.finish()?;
        }
        Ok(BytesMut::from(&out[..]))
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct DecompressionDecoder {
    threshold: usize,
}

impl DecompressionDecoder {
    pub fn new(threshold: usize) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: usize) {
        self.threshold = threshold;
    }
}

impl Stage for DecompressionDecoder {
    fn direction(&self) -> Direction {
        Direction::Inbound
    }

    fn layer(&self) -> Layer {
        Layer::Frame
    }

    fn apply(&mut self, data: BytesMut) -> Result<BytesMut, PipelineError> {
        let mut decoder = Decoder::new(&data);
        let size = usize::try_from(decoder.read_var_int()?).map_err(|_| PipelineError::BelowThreshold {
            size: 0,
            threshold: self.threshold,
        })?;
        if size == 0 {
            return Ok(BytesMut::from(decoder.buffer()));
        }
        if size < self.threshold {
            return Err(PipelineError::BelowThreshold {
                size,
                threshold: self.threshold,
            });
        }
        if size > MAX_PACKET_SIZE {
            return Err(PipelineError::AboveMaximum {
                size,
                max: MAX_PACKET_SIZE,
            });
        }

        let mut inflated = Vec::with_capacity(size);
        ZlibDecoder::new(decoder.buffer())
            .take(size as u64 + 1)
            .read_to_end(&mut inflated)?;
        if inflated.len() != size {
            return Err(PipelineError::LengthMismatch {
                declared: size,
                actual: inflated.len(),
            });
        }
        Ok(BytesMut::from(&inflated[..]))
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_frames_stay_raw() {
        let out = CompressionEncoder::new(64)
            .apply(BytesMut::from(&b"hello"[..]))
            .unwrap();
        assert_eq!(&out[..], b"\0hello");
        let back = DecompressionDecoder::new(64).apply(out).unwrap();
        assert_eq!(&back[..], b"hello");
    }

    #[test]
    fn large_frames_round_trip() {
        let data = vec![42u8; 1000];
        let out = CompressionEncoder::new(64)
            .apply(BytesMut::from(&data[..]))
            .unwrap();
        assert!(out.len() < data.len());
        assert_eq!(&out[..2], &[0xE8, 0x07]);
        let back = DecompressionDecoder::new(64).apply(out).unwrap();
        assert_eq!(&back[..], &data[..]);
    }

    #[test]
    fn rejects_compressed_frame_under_threshold() {
        let out = CompressionEncoder::new(16)
            .apply(BytesMut::from(&[7u8; 32][..]))
            .unwrap();
        assert!(matches!(
            DecompressionDecoder::new(64).apply(out),
            Err(PipelineError::BelowThreshold { size: 32, threshold: 64 })
        ));
    }

    #[test]
    fn refuses_to_compress_oversized_frames() {
        let data = vec![0u8; MAX_PACKET_SIZE + 1];
        assert!(matches!(
            CompressionEncoder::new(64).apply(BytesMut::from(&data[..])),
            Err(PipelineError::AboveMaximum { .. })
        ));
    }

    #[test]
    fn rejects_oversized_declaration() {
        let mut frame = Vec::new();
        Encoder::new(&mut frame).write_var_int(MAX_PACKET_SIZE as i32 + 1);
        assert!(matches!(
            DecompressionDecoder::new(64).apply(BytesMut::from(&frame[..])),
            Err(PipelineError::AboveMaximum { .. })
        ));
    }
}
