//! Resource types and decoded item payloads

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Resource type ordinal as stored in the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum ResType {
    Values = 0,
    Animation = 1,
    Drawable = 2,
    Layout = 3,
    Menu = 4,
    Mipmap = 5,
    Raw = 6,
    Xml = 7,
    Integer = 8,
    String = 9,
    StringArray = 10,
    IntArray = 11,
    Boolean = 12,
    Dimen = 13,
    Color = 14,
    Id = 15,
    Theme = 16,
    Plurals = 17,
    Float = 18,
    Media = 19,
    Prof = 20,
    Svg = 21,
    Pattern = 22,
    Symbol = 23,
}

/// Number of defined type ordinals; anything at or above is malformed.
pub const MAX_RES_TYPE: u32 = 24;

impl ResType {
    pub const ALL: [ResType; 24] = [
        ResType::Values,
        ResType::Animation,
        ResType::Drawable,
        ResType::Layout,
        ResType::Menu,
        ResType::Mipmap,
        ResType::Raw,
        ResType::Xml,
        ResType::Integer,
        ResType::String,
        ResType::StringArray,
        ResType::IntArray,
        ResType::Boolean,
        ResType::Dimen,
        ResType::Color,
        ResType::Id,
        ResType::Theme,
        ResType::Plurals,
        ResType::Float,
        ResType::Media,
        ResType::Prof,
        ResType::Svg,
        ResType::Pattern,
        ResType::Symbol,
    ];

    #[must_use]
    pub fn from_u32(raw: u32) -> Option<Self> {
        Self::ALL.get(raw as usize).copied()
    }

    /// Types whose payload is a list of strings.
    #[must_use]
    pub fn is_array(self) -> bool {
        matches!(
            self,
            ResType::StringArray | ResType::IntArray | ResType::Theme | ResType::Pattern | ResType::Plurals
        )
    }

    /// Bit in a [`SelectedTypes`] mask, `None` for types that are never filtered.
    #[must_use]
    pub fn select_bit(self) -> Option<u32> {
        Some(match self {
            ResType::Integer => 0x0001,
            ResType::String => 0x0002,
            ResType::StringArray => 0x0004,
            ResType::IntArray => 0x0008,
            ResType::Boolean => 0x0010,
            ResType::Color => 0x0020,
            ResType::Theme => 0x0040,
            ResType::Plurals => 0x0080,
            ResType::Float => 0x0100,
            ResType::Media => 0x0200,
            ResType::Prof => 0x0400,
            ResType::Pattern => 0x0800,
            ResType::Symbol => 0x1000,
            _ => return None,
        })
    }

    /// Name used inside `$name:id` references, for the types that can be referenced.
    #[must_use]
    pub fn ref_name(self) -> Option<&'static str> {
        Some(match self {
            ResType::String => "string",
            ResType::Boolean => "boolean",
            ResType::Color => "color",
            ResType::Float => "float",
            ResType::Integer => "integer",
            ResType::Pattern => "pattern",
            ResType::Theme => "theme",
            ResType::Media => "media",
            ResType::Symbol => "symbol",
            ResType::Plurals => "plural",
            _ => return None,
        })
    }

    #[must_use]
    pub fn from_ref_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.ref_name() == Some(name))
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ResType::Values => "values",
            ResType::Animation => "animation",
            ResType::Drawable => "drawable",
            ResType::Layout => "layout",
            ResType::Menu => "menu",
            ResType::Mipmap => "mipmap",
            ResType::Raw => "raw",
            ResType::Xml => "xml",
            ResType::Integer => "integer",
            ResType::String => "string",
            ResType::StringArray => "strarray",
            ResType::IntArray => "intarray",
            ResType::Boolean => "boolean",
            ResType::Dimen => "dimen",
            ResType::Color => "color",
            ResType::Id => "id",
            ResType::Theme => "theme",
            ResType::Plurals => "plural",
            ResType::Float => "float",
            ResType::Media => "media",
            ResType::Prof => "prof",
            ResType::Svg => "svg",
            ResType::Pattern => "pattern",
            ResType::Symbol => "symbol",
        }
    }
}

impl fmt::Display for ResType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ResType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.name() == lower)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown resource type '{s}'")))
    }
}

/// Bitmask restricting which resource types a load decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SelectedTypes(u32);

impl SelectedTypes {
    pub const ALL: SelectedTypes = SelectedTypes(0xFFFF_FFFF);

    #[must_use]
    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    #[must_use]
    pub fn bits(self) -> u32 {
        self.0
    }

    #[must_use]
    pub fn is_all(self) -> bool {
        self == Self::ALL
    }

    /// Build a mask from a list of types; types without a bit are ignored.
    pub fn from_types<I: IntoIterator<Item = ResType>>(types: I) -> Self {
        Self(types.into_iter().filter_map(ResType::select_bit).fold(0, |acc, bit| acc | bit))
    }

    /// Whether items of `res_type` are decoded; unfiltered types always are.
    #[must_use]
    pub fn contains(self, res_type: ResType) -> bool {
        self.is_all() || res_type.select_bit().is_none_or(|bit| self.0 & bit != 0)
    }
}

impl Default for SelectedTypes {
    fn default() -> Self {
        Self::ALL
    }
}

impl From<u32> for SelectedTypes {
    fn from(bits: u32) -> Self {
        Self(bits)
    }
}

/// Raw payload of an item: one string, or a list for array types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ItemValue {
    Single(String),
    Array(Vec<String>),
}

impl ItemValue {
    /// Number of strings in the payload.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            ItemValue::Single(_) => 1,
            ItemValue::Array(values) => values.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One decoded resource item.
///
/// The numeric id is carried by the table entry, not the item, so the same
/// payload can be republished under a remapped id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdItem {
    pub res_type: ResType,
    pub value: ItemValue,
    pub name: String,
}

impl IdItem {
    #[must_use]
    pub fn single(res_type: ResType, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            res_type,
            value: ItemValue::Single(value.into()),
            name: name.into(),
        }
    }

    #[must_use]
    pub fn array(res_type: ResType, name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            res_type,
            value: ItemValue::Array(values),
            name: name.into(),
        }
    }

    #[must_use]
    pub fn is_array(&self) -> bool {
        matches!(self.value, ItemValue::Array(_))
    }

    /// The scalar value, `None` for arrays.
    #[must_use]
    pub fn value_str(&self) -> Option<&str> {
        match &self.value {
            ItemValue::Single(s) => Some(s),
            ItemValue::Array(_) => None,
        }
    }

    /// The array values; a scalar reads as a one-element list.
    #[must_use]
    pub fn values(&self) -> &[String] {
        match &self.value {
            ItemValue::Single(s) => std::slice::from_ref(s),
            ItemValue::Array(values) => values,
        }
    }
}
