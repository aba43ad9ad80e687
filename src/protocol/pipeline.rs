//! An ordered list of named transform stages that frames pass through
//! between the packet codec and the socket.
//!
//! Stages are looked up by name, so reconfiguring compression or turning
//! on encryption replaces or adjusts the existing stage rather than
//! stacking a second one. Inbound data visits stages in list order and
//! outbound data in reverse.

mod compression;
mod encryption;

pub use compression::{CompressionEncoder, DecompressionDecoder};
pub use encryption::{CipherDecoder, CipherEncoder, EncryptionKey};

use bytes::BytesMut;
use std::{any::Any, fmt};

pub const DECRYPT: &str = "decrypt";
pub const ENCRYPT: &str = "encrypt";
pub const DECOMPRESS: &str = "decompress";
pub const COMPRESS: &str = "compress";

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("badly compressed packet - size of {size} is below server threshold of {threshold}")]
    BelowThreshold { size: usize, threshold: usize },
    #[error("badly compressed packet - size of {size} is larger than protocol maximum of {max}")]
    AboveMaximum { size: usize, max: usize },
    #[error("badly compressed packet - declared {declared} bytes but inflated to {actual}")]
    LengthMismatch { declared: usize, actual: usize },
    #[error("frame length wider than 21 bits")]
    LengthTooWide,
    #[error("frame of {length} bytes exceeds maximum of {max}")]
    FrameTooLarge { length: usize, max: usize },
    #[error("no stage named '{0}'")]
    MissingStage(String),
    #[error("stage '{0}' already present")]
    DuplicateStage(String),
    #[error(transparent)]
    Decode(#[from] super::DecodeError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Which way a stage transforms data.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Inbound,
    Outbound,
}

/// Where a stage sits relative to framing. Stream stages see raw
/// socket bytes; frame stages see one length-delimited frame at a time.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Layer {
    Stream,
    Frame,
}

pub trait Stage: Any + Send {
    fn direction(&self) -> Direction;

    fn layer(&self) -> Layer;

    fn apply(&mut self, data: BytesMut) -> Result<BytesMut, PipelineError>;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

#[derive(Default)]
pub struct Pipeline {
    stages: Vec<(String, Box<dyn Stage>)>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> Vec<&str> {
        self.stages.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.stages.iter().position(|(n, _)| n == name)
    }

    pub fn add_last(&mut self, name: impl Into<String>, stage: impl Stage) -> Result<(), PipelineError> {
        let name = name.into();
        if self.contains(&name) {
            return Err(PipelineError::DuplicateStage(name));
        }
        self.stages.push((name, Box::new(stage)));
        Ok(())
    }

    pub fn add_first(&mut self, name: impl Into<String>, stage: impl Stage) -> Result<(), PipelineError> {
        let name = name.into();
        if self.contains(&name) {
            return Err(PipelineError::DuplicateStage(name));
        }
        self.stages.insert(0, (name, Box::new(stage)));
        Ok(())
    }

    pub fn add_before(
        &mut self,
        base: &str,
        name: impl Into<String>,
        stage: impl Stage,
    ) -> Result<(), PipelineError> {
        let name = name.into();
        if self.contains(&name) {
            return Err(PipelineError::DuplicateStage(name));
        }
        let index = self
            .position(base)
            .ok_or_else(|| PipelineError::MissingStage(base.to_owned()))?;
        self.stages.insert(index, (name, Box::new(stage)));
        Ok(())
    }

    /// Swaps the stage under `name` for `stage`, keeping its position.
    pub fn replace(&mut self, name: &str, stage: impl Stage) -> Result<Box<dyn Stage>, PipelineError> {
        let index = self
            .position(name)
            .ok_or_else(|| PipelineError::MissingStage(name.to_owned()))?;
        Ok(std::mem::replace(&mut self.stages[index].1, Box::new(stage)))
    }

    pub fn remove(&mut self, name: &str) -> Option<Box<dyn Stage>> {
        let index = self.position(name)?;
        Some(self.stages.remove(index).1)
    }

    /// The stage under `name`, if it exists and has type `T`.
    pub fn get_mut<T: Stage>(&mut self, name: &str) -> Option<&mut T> {
        self.stages
            .iter_mut()
            .find(|(n, _)| n == name)
            .and_then(|(_, stage)| stage.as_any_mut().downcast_mut::<T>())
    }

    /// Runs `data` through every stage matching `direction` and `layer`.
    pub fn run(&mut self, direction: Direction, layer: Layer, mut data: BytesMut) -> Result<BytesMut, PipelineError> {
        let selected = |stage: &dyn Stage| stage.direction() == direction && stage.layer() == layer;
        match direction {
            Direction::Inbound => {
                for (_, stage) in self.stages.iter_mut() {
                    if selected(&**stage) {
                        data = stage.apply(data)?;
                    }
                }
            }
            Direction::Outbound => {
                for (_, stage) in self.stages.iter_mut().rev() {
                    if selected(&**stage) {
                        data = stage.apply(data)?;
                    }
                }
            }
        }
        Ok(data)
    }

    /// Runs an outbound frame through frame stages, then stream stages.
    /// For transports that carry frames without a length prefix.
    pub fn outbound(&mut self, frame: BytesMut) -> Result<BytesMut, PipelineError> {
        let frame = self.run(Direction::Outbound, Layer::Frame, frame)?;
        self.run(Direction::Outbound, Layer::Stream, frame)
    }

    /// Inverse of [`Pipeline::outbound`].
    pub fn inbound(&mut self, frame: BytesMut) -> Result<BytesMut, PipelineError> {
        let frame = self.run(Direction::Inbound, Layer::Stream, frame)?;
        self.run(Direction::Inbound, Layer::Frame, frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Xor(u8, Direction);

    impl Stage for Xor {
        fn direction(&self) -> Direction {
            self.1
        }

        fn layer(&self) -> Layer {
            Layer::Stream
        }

        fn apply(&mut self, mut data: BytesMut) -> Result<BytesMut, PipelineError> {
            data.iter_mut().for_each(|b| *b ^= self.0);
            Ok(data)
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[test]
    fn stages_are_named_and_unique() {
        let mut pipeline = Pipeline::new();
        pipeline.add_last("a", Xor(1, Direction::Inbound)).unwrap();
        pipeline.add_last("c", Xor(2, Direction::Inbound)).unwrap();
        pipeline.add_before("c", "b", Xor(4, Direction::Outbound)).unwrap();
        assert_eq!(pipeline.names(), ["a", "b", "c"]);

        assert!(matches!(
            pipeline.add_last("a", Xor(1, Direction::Inbound)),
            Err(PipelineError::DuplicateStage(_))
        ));
        assert!(pipeline.add_before("missing", "d", Xor(1, Direction::Inbound)).is_err());

        pipeline.get_mut::<Xor>("b").unwrap().0 = 8;
        pipeline.replace("a", Xor(16, Direction::Inbound)).unwrap();
        assert!(pipeline.remove("c").is_some());
        assert_eq!(pipeline.names(), ["a", "b"]);

        let data = pipeline.inbound(BytesMut::from(&[0u8][..])).unwrap();
        assert_eq!(&data[..], &[16]);
        let data = pipeline.outbound(BytesMut::from(&[0u8][..])).unwrap();
        assert_eq!(&data[..], &[8]);
    }
}
