//! Resolved resource values and the literal grammars behind them

use std::fmt;
use std::path::PathBuf;
use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::error::{Error, Result};

/// Unit suffix of a dimension value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DimensionUnit {
    /// Physical pixels
    Px,
    /// Virtual pixels, scaled by density
    Vp,
    /// Font pixels, scaled by density and font size
    Fp,
}

impl DimensionUnit {
    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "px" => Some(DimensionUnit::Px),
            "vp" => Some(DimensionUnit::Vp),
            "fp" => Some(DimensionUnit::Fp),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DimensionUnit::Px => "px",
            DimensionUnit::Vp => "vp",
            DimensionUnit::Fp => "fp",
        }
    }
}

/// A fully resolved resource value.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedValue {
    Str(String),
    Array(Vec<String>),
    Bool(bool),
    Int(i32),
    Float {
        value: f32,
        unit: Option<DimensionUnit>,
    },
    /// `0xAARRGGBB`
    Color(u32),
    /// Pattern, theme or plural entries
    Map(IndexMap<String, String>),
    /// Media file, relative paths joined onto the package root
    Media(PathBuf),
}

impl fmt::Display for ResolvedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedValue::Str(value) => f.write_str(value),
            ResolvedValue::Array(values) => write!(f, "[{}]", values.join(", ")),
            ResolvedValue::Bool(value) => write!(f, "{value}"),
            ResolvedValue::Int(value) => write!(f, "{value}"),
            ResolvedValue::Float { value, unit } => {
                write!(f, "{value}{}", unit.map(DimensionUnit::as_str).unwrap_or_default())
            }
            ResolvedValue::Color(argb) => write!(f, "#{argb:08X}"),
            ResolvedValue::Map(entries) => {
                f.write_str("{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
            ResolvedValue::Media(path) => write!(f, "{}", path.display()),
        }
    }
}

fn dimension_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^\s*(-?(?:\d+\.?\d*|\.\d+))\s*(px|vp|fp)?\s*$").ok())
        .as_ref()
}

pub fn parse_boolean(value: &str) -> Result<bool> {
    match value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(Error::ParseValue {
            value: value.to_string(),
            kind: "boolean",
        }),
    }
}

pub fn parse_integer(value: &str) -> Result<i32> {
    value.trim().parse().map_err(|_| Error::ParseValue {
        value: value.to_string(),
        kind: "integer",
    })
}

/// `12`, `12.5vp`, `-3px`, `14fp`
pub fn parse_float(value: &str) -> Result<(f32, Option<DimensionUnit>)> {
    let err = || Error::ParseValue {
        value: value.to_string(),
        kind: "float",
    };
    let captures = dimension_pattern()
        .and_then(|pattern| pattern.captures(value))
        .ok_or_else(err)?;
    let number = captures[1].parse().map_err(|_| err())?;
    let unit = captures.get(2).and_then(|unit| DimensionUnit::from_suffix(unit.as_str()));
    Ok((number, unit))
}

/// `#RGB`, `#ARGB`, `#RRGGBB` or `#AARRGGBB` as `0xAARRGGBB`; alpha defaults to opaque.
pub fn parse_color(value: &str) -> Result<u32> {
    let err = || Error::ParseValue {
        value: value.to_string(),
        kind: "color",
    };
    let hex = value.trim().strip_prefix('#').ok_or_else(err)?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(err());
    }
    let expanded: String = match hex.len() {
        3 => format!("f{hex}").chars().flat_map(|c| [c, c]).collect(),
        4 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 => format!("ff{hex}"),
        8 => hex.to_string(),
        _ => return Err(err()),
    };
    u32::from_str_radix(&expanded, 16).map_err(|_| err())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("#fff").unwrap(), 0xFFFF_FFFF);
        assert_eq!(parse_color("#8f00").unwrap(), 0x88FF_0000);
        assert_eq!(parse_color("#336699").unwrap(), 0xFF33_6699);
        assert_eq!(parse_color("#80336699").unwrap(), 0x8033_6699);
        assert!(parse_color("336699").is_err());
        assert!(parse_color("#33669").is_err());
        assert!(parse_color("#zzzzzz").is_err());
    }

    #[test]
    fn test_parse_float() {
        assert_eq!(parse_float("12").unwrap(), (12.0, None));
        assert_eq!(parse_float("12.5vp").unwrap(), (12.5, Some(DimensionUnit::Vp)));
        assert_eq!(parse_float("-3px").unwrap(), (-3.0, Some(DimensionUnit::Px)));
        assert!(parse_float("12em").is_err());
        assert!(parse_float("").is_err());
    }

    #[test]
    fn test_parse_scalars() {
        assert!(parse_boolean("true").unwrap());
        assert!(!parse_boolean("false").unwrap());
        assert!(parse_boolean("yes").is_err());
        assert_eq!(parse_integer(" 42 ").unwrap(), 42);
        assert!(matches!(parse_integer("4.2"), Err(Error::ParseValue { kind: "integer", .. })));
    }

    #[test]
    fn test_display() {
        assert_eq!(ResolvedValue::Color(0xFF33_6699).to_string(), "#FF336699");
        let float = ResolvedValue::Float {
            value: 16.0,
            unit: Some(DimensionUnit::Fp),
        };
        assert_eq!(float.to_string(), "16fp");
    }
}
