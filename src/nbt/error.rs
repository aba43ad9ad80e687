use super::TagType;
use std::fmt;

/// An error while decoding, encoding or mutating a tag tree.
#[derive(Debug, thiserror::Error)]
pub enum NbtError {
    #[error("invalid tag id {0}")]
    UnknownTagType(u8),
    #[error("tried to read NBT tag with too high complexity, depth > {0}")]
    DepthExceeded(usize),
    #[error("tried to read NBT tag that was too big; tried to allocate {charged} bytes where max allowed: {limit}")]
    SizeLimit { charged: u64, limit: u64 },
    #[error("negative length {0} for {1}")]
    NegativeLength(i32, &'static str),
    #[error("missing element type on non-empty list of length {0}")]
    MissingListType(i32),
    #[error("root tag must be a named compound tag, found {0}")]
    RootNotCompound(&'static str),
    #[error("length {0} does not fit in a 32-bit prefix")]
    LengthOverflow(usize),
    #[error("encoded string too long: {0} bytes")]
    StringTooLong(usize),
    #[error("malformed modified UTF-8 string")]
    MalformedString,
    #[error("trying to add tag of type {found} to list of {expected}")]
    ListTypeMismatch { expected: u8, found: u8 },
    #[error("cannot store an end tag under key '{0}'; remove the key instead")]
    EndTagValue(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = NbtError> = std::result::Result<T, E>;

/// A syntax error while parsing SNBT.
///
/// The message carries up to ten characters of input preceding
/// the failure position, marked with `<--[HERE]`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at position {cursor}: {context}<--[HERE]")]
pub struct SnbtError {
    pub kind: SnbtErrorKind,
    pub cursor: usize,
    pub context: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnbtErrorKind {
    TrailingData,
    ExpectedKey,
    ExpectedValue,
    Expected(char),
    InvalidEscape(char),
    UnclosedQuote,
    MixedList { found: TagType, expected: TagType },
    MixedArray { found: TagType, array: TagType },
    InvalidArray(char),
    DepthExceeded(usize),
}

impl fmt::Display for SnbtErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TrailingData => f.write_str("unexpected trailing data"),
            Self::ExpectedKey => f.write_str("expected key"),
            Self::ExpectedValue => f.write_str("expected value"),
            Self::Expected(c) => write!(f, "expected '{c}'"),
            Self::InvalidEscape(c) => write!(f, "invalid escape sequence '\\{c}' in quoted string"),
            Self::UnclosedQuote => f.write_str("unclosed quoted string"),
            Self::MixedList { found, expected } => write!(
                f,
                "can't insert {} into list of {}",
                found.name(),
                expected.name()
            ),
            Self::MixedArray { found, array } => write!(
                f,
                "can't insert {} into {}",
                found.name(),
                array.name()
            ),
            Self::InvalidArray(c) => write!(f, "invalid array type '{c}'"),
            Self::DepthExceeded(max) => write!(f, "tag nested deeper than {max}"),
        }
    }
}
