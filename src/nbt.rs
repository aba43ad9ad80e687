//! The NBT ("named binary tag") value model.
//!
//! A tag tree is a closed set of typed values: signed integers of four
//! widths, two float widths, strings, three numeric arrays, homogeneous
//! lists and string-keyed compounds. Trees are built programmatically,
//! decoded from the binary format (see [`Tag::read_payload`]) or parsed
//! from the textual SNBT grammar (see [`parse_snbt`]).
//!
//! Decoding untrusted input always goes through a [`SizeAccountant`],
//! which aborts the decode once a byte budget is exhausted.

mod accountant;
mod binary;
mod compound;
mod error;
pub mod io;
mod list;
mod mutf8;
mod snbt;
mod tag;

pub use accountant::{SizeAccountant, NETWORK_BUDGET};
pub use binary::{read_named, read_root, write_named, write_root, MAX_DEPTH};
pub use compound::CompoundTag;
pub use error::{NbtError, SnbtError, SnbtErrorKind};
pub use list::ListTag;
pub use snbt::{parse_snbt, parse_snbt_value};
pub use tag::{Tag, TagType, ANY_NUMERIC};
