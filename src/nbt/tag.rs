use super::{CompoundTag, ListTag};

/// Wildcard accepted by [`CompoundTag::contains`] meaning "any numeric type".
pub const ANY_NUMERIC: u8 = 99;

/// Type descriptor of a tag variant.
///
/// The discriminant is the byte written on the wire in front of
/// every tag payload.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, strum::FromRepr, strum::EnumIter)]
#[repr(u8)]
pub enum TagType {
    End = 0,
    Byte = 1,
    Short = 2,
    Int = 3,
    Long = 4,
    Float = 5,
    Double = 6,
    ByteArray = 7,
    String = 8,
    List = 9,
    Compound = 10,
    IntArray = 11,
    LongArray = 12,
}

impl TagType {
    pub fn from_id(id: u8) -> Option<Self> {
        Self::from_repr(id)
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    /// Short human name, e.g. `BYTE[]`.
    pub fn name(self) -> &'static str {
        match self {
            Self::End => "END",
            Self::Byte => "BYTE",
            Self::Short => "SHORT",
            Self::Int => "INT",
            Self::Long => "LONG",
            Self::Float => "FLOAT",
            Self::Double => "DOUBLE",
            Self::ByteArray => "BYTE[]",
            Self::String => "STRING",
            Self::List => "LIST",
            Self::Compound => "COMPOUND",
            Self::IntArray => "INT[]",
            Self::LongArray => "LONG[]",
        }
    }

    /// Display name used in diagnostics, e.g. `TAG_Byte_Array`.
    pub fn pretty_name(self) -> &'static str {
        match self {
            Self::End => "TAG_End",
            Self::Byte => "TAG_Byte",
            Self::Short => "TAG_Short",
            Self::Int => "TAG_Int",
            Self::Long => "TAG_Long",
            Self::Float => "TAG_Float",
            Self::Double => "TAG_Double",
            Self::ByteArray => "TAG_Byte_Array",
            Self::String => "TAG_String",
            Self::List => "TAG_List",
            Self::Compound => "TAG_Compound",
            Self::IntArray => "TAG_Int_Array",
            Self::LongArray => "TAG_Long_Array",
        }
    }

    /// Whether this is an immutable leaf type. List elements of a
    /// value type never need a deep copy.
    pub fn is_value(self) -> bool {
        matches!(
            self,
            Self::End
                | Self::Byte
                | Self::Short
                | Self::Int
                | Self::Long
                | Self::Float
                | Self::Double
                | Self::String
        )
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::Byte | Self::Short | Self::Int | Self::Long | Self::Float | Self::Double
        )
    }

    /// Whether a tag of this type satisfies a `contains` query for
    /// `wanted`, where [`ANY_NUMERIC`] matches every numeric type.
    pub fn matches(self, wanted: u8) -> bool {
        self.id() == wanted || (wanted == ANY_NUMERIC && self.is_numeric())
    }
}

/// A single node of a tag tree.
///
/// Equality is structural and sensitive to the variant: `Byte(1)`
/// never equals `Short(1)`.
#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    End,
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<i8>),
    String(String),
    List(ListTag),
    Compound(CompoundTag),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

impl Tag {
    pub fn tag_type(&self) -> TagType {
        match self {
            Self::End => TagType::End,
            Self::Byte(_) => TagType::Byte,
            Self::Short(_) => TagType::Short,
            Self::Int(_) => TagType::Int,
            Self::Long(_) => TagType::Long,
            Self::Float(_) => TagType::Float,
            Self::Double(_) => TagType::Double,
            Self::ByteArray(_) => TagType::ByteArray,
            Self::String(_) => TagType::String,
            Self::List(_) => TagType::List,
            Self::Compound(_) => TagType::Compound,
            Self::IntArray(_) => TagType::IntArray,
            Self::LongArray(_) => TagType::LongArray,
        }
    }

    pub fn id(&self) -> u8 {
        self.tag_type().id()
    }

    /// Structural clone of the whole subtree.
    pub fn copy(&self) -> Tag {
        self.clone()
    }

    pub fn is_numeric(&self) -> bool {
        self.tag_type().is_numeric()
    }

    pub fn as_long(&self) -> Option<i64> {
        Some(match *self {
            Self::Byte(x) => x.into(),
            Self::Short(x) => x.into(),
            Self::Int(x) => x.into(),
            Self::Long(x) => x,
            Self::Float(x) => x as i64,
            Self::Double(x) => x.floor() as i64,
            _ => return None,
        })
    }

    pub fn as_int(&self) -> Option<i32> {
        Some(match *self {
            Self::Byte(x) => x.into(),
            Self::Short(x) => x.into(),
            Self::Int(x) => x,
            Self::Long(x) => x as i32,
            Self::Float(x) => floor_f32(x),
            Self::Double(x) => floor_f64(x),
            _ => return None,
        })
    }

    pub fn as_short(&self) -> Option<i16> {
        match *self {
            Self::Byte(x) => Some(x.into()),
            Self::Short(x) => Some(x),
            _ => self.as_int().map(|x| x as i16),
        }
    }

    pub fn as_byte(&self) -> Option<i8> {
        match *self {
            Self::Byte(x) => Some(x),
            _ => self.as_int().map(|x| x as i8),
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        Some(match *self {
            Self::Byte(x) => x.into(),
            Self::Short(x) => x.into(),
            Self::Int(x) => x.into(),
            Self::Long(x) => x as f64,
            Self::Float(x) => x.into(),
            Self::Double(x) => x,
            _ => return None,
        })
    }

    pub fn as_float(&self) -> Option<f32> {
        match *self {
            Self::Float(x) => Some(x),
            Self::Double(x) => Some(x as f32),
            Self::Long(x) => Some(x as f32),
            Self::Int(x) => Some(x as f32),
            _ => self.as_double().map(|x| x as f32),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_compound(&self) -> Option<&CompoundTag> {
        match self {
            Self::Compound(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_compound_mut(&mut self) -> Option<&mut CompoundTag> {
        match self {
            Self::Compound(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ListTag> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }
}

/// Floors toward negative infinity, saturating at the `i32` range.
/// NaN maps to zero.
fn floor_f32(x: f32) -> i32 {
    x.floor() as i32
}

fn floor_f64(x: f64) -> i32 {
    x.floor() as i32
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Tag {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

impl_from! {
    i8 => Byte,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    Vec<i8> => ByteArray,
    String => String,
    ListTag => List,
    CompoundTag => Compound,
    Vec<i32> => IntArray,
    Vec<i64> => LongArray,
}

impl From<&str> for Tag {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<bool> for Tag {
    fn from(value: bool) -> Self {
        Self::Byte(value.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_table_is_consistent() {
        for id in 0..=12u8 {
            let ty = TagType::from_id(id).unwrap();
            assert_eq!(ty.id(), id);
        }
        assert_eq!(TagType::from_id(13), None);
        assert_eq!(TagType::ByteArray.pretty_name(), "TAG_Byte_Array");
        assert!(TagType::String.is_value());
        assert!(!TagType::IntArray.is_value());
    }

    #[test]
    fn equality_is_discriminant_sensitive() {
        assert_ne!(Tag::Byte(1), Tag::Short(1));
        assert_eq!(Tag::Int(7), Tag::from(7));
    }

    #[test]
    fn numeric_coercion_floors_floats() {
        assert_eq!(Tag::Float(-1.5).as_int(), Some(-2));
        assert_eq!(Tag::Double(2.9).as_long(), Some(2));
        assert_eq!(Tag::Int(300).as_byte(), Some(44));
        assert_eq!(Tag::Long(1 << 40).as_int(), Some(0));
        assert_eq!(Tag::from("x").as_int(), None);
    }

    #[test]
    fn coercion_saturates_out_of_range_floats() {
        assert_eq!(Tag::Float(-3.0e9).as_int(), Some(i32::MIN));
        assert_eq!(Tag::Double(-1.0e12).as_int(), Some(i32::MIN));
        assert_eq!(Tag::Double(1.0e12).as_int(), Some(i32::MAX));
        assert_eq!(Tag::Float(f32::NAN).as_int(), Some(0));
        assert_eq!(Tag::Double(-1.0e12).as_short(), Some(0));
        assert_eq!(Tag::Float(-3.0e9).as_byte(), Some(0));
    }

    #[test]
    fn any_numeric_wildcard() {
        assert!(TagType::Double.matches(ANY_NUMERIC));
        assert!(!TagType::String.matches(ANY_NUMERIC));
        assert!(TagType::String.matches(8));
    }
}
