//! Qualifier dimensions and their on-disk key parameters
//!
//! Every key in a resource index is a list of `(type, value)` pairs. The
//! enums here give those values a typed meaning; each dimension has a
//! `NotSet` sentinel that matches everything.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Undefined mobile country / network code.
pub const MCC_UNDEFINED: u32 = 0;
/// Undefined mobile network code.
pub const MNC_UNDEFINED: u32 = 0;

/// Base DPI that a density factor of 1.0 corresponds to.
pub const DPI_BASE: f32 = 160.0;

/// Qualifier dimension ordinal as stored in the index.
///
/// Ordinal 9 is reserved: it never decodes and never sets a limit-key bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum KeyType {
    Language = 0,
    Region = 1,
    ScreenDensity = 2,
    Direction = 3,
    DeviceType = 4,
    Script = 5,
    ColorMode = 6,
    Mcc = 7,
    Mnc = 8,
    InputDevice = 10,
}

impl KeyType {
    /// Reserved ordinal between `Mnc` and `InputDevice`.
    pub const RESERVED: u32 = 9;

    /// All decodable key types in ordinal order.
    pub const ALL: [KeyType; 10] = [
        KeyType::Language,
        KeyType::Region,
        KeyType::ScreenDensity,
        KeyType::Direction,
        KeyType::DeviceType,
        KeyType::Script,
        KeyType::ColorMode,
        KeyType::Mcc,
        KeyType::Mnc,
        KeyType::InputDevice,
    ];

    #[must_use]
    pub fn from_u32(raw: u32) -> Option<Self> {
        Some(match raw {
            0 => KeyType::Language,
            1 => KeyType::Region,
            2 => KeyType::ScreenDensity,
            3 => KeyType::Direction,
            4 => KeyType::DeviceType,
            5 => KeyType::Script,
            6 => KeyType::ColorMode,
            7 => KeyType::Mcc,
            8 => KeyType::Mnc,
            10 => KeyType::InputDevice,
            _ => return None,
        })
    }

    /// Bit this dimension occupies in a limit-keys mask.
    #[must_use]
    pub fn limit_bit(self) -> u32 {
        1 << (self as u32)
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            KeyType::Language => "language",
            KeyType::Region => "region",
            KeyType::ScreenDensity => "screen_density",
            KeyType::Direction => "direction",
            KeyType::DeviceType => "device_type",
            KeyType::Script => "script",
            KeyType::ColorMode => "color_mode",
            KeyType::Mcc => "mcc",
            KeyType::Mnc => "mnc",
            KeyType::InputDevice => "input_device",
        }
    }
}

/// One raw `(type, value)` pair from a key block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyParam {
    /// Raw key type ordinal; see [`KeyType::from_u32`].
    pub raw_type: u32,
    /// Raw value; packed ASCII for language/region/script.
    pub value: u32,
}

impl KeyParam {
    #[must_use]
    pub fn new(key_type: KeyType, value: u32) -> Self {
        Self {
            raw_type: key_type as u32,
            value,
        }
    }

    /// Build a language/region/script parameter from its text form.
    pub fn text(key_type: KeyType, text: &str) -> Result<Self> {
        Ok(Self::new(key_type, pack_ascii(text)?))
    }

    #[must_use]
    pub fn key_type(&self) -> Option<KeyType> {
        KeyType::from_u32(self.raw_type)
    }

    /// Text form of a language/region/script value.
    #[must_use]
    pub fn as_text(&self) -> String {
        unpack_ascii(self.value)
    }
}

/// Pack up to four ASCII bytes into a u32, first character most significant.
pub fn pack_ascii(text: &str) -> Result<u32> {
    if text.is_empty() || text.len() > 4 || !text.is_ascii() {
        return Err(Error::InvalidArgument(format!(
            "qualifier text '{text}' must be 1-4 ASCII characters"
        )));
    }
    Ok(text.bytes().fold(0u32, |acc, b| (acc << 8) | u32::from(b)))
}

/// Inverse of [`pack_ascii`]; zero bytes are skipped.
#[must_use]
pub fn unpack_ascii(value: u32) -> String {
    value
        .to_be_bytes()
        .iter()
        .filter(|&&b| b != 0)
        .map(|&b| char::from(b))
        .collect()
}

// ============================================================================
// Dimension enums
// ============================================================================

/// Screen orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    #[default]
    NotSet,
    Vertical,
    Horizontal,
}

impl Direction {
    /// Decode a key value; 0 is vertical and anything else horizontal.
    #[must_use]
    pub fn from_key_value(value: u32) -> Self {
        if value == 0 {
            Direction::Vertical
        } else {
            Direction::Horizontal
        }
    }

    #[must_use]
    pub fn key_value(self) -> Option<u32> {
        match self {
            Direction::NotSet => None,
            Direction::Vertical => Some(0),
            Direction::Horizontal => Some(1),
        }
    }

    #[must_use]
    pub fn is_set(self) -> bool {
        self != Direction::NotSet
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::NotSet => "",
            Direction::Vertical => "vertical",
            Direction::Horizontal => "horizontal",
        }
    }
}

/// Device class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeviceType {
    #[default]
    NotSet,
    Phone,
    Tablet,
    Car,
    Pad,
    Tv,
    Wearable,
    TwoInOne,
}

impl DeviceType {
    /// Decode a key value; unknown values decode as `NotSet`.
    #[must_use]
    pub fn from_key_value(value: u32) -> Self {
        match value {
            0 => DeviceType::Phone,
            1 => DeviceType::Tablet,
            2 => DeviceType::Car,
            3 => DeviceType::Pad,
            4 => DeviceType::Tv,
            6 => DeviceType::Wearable,
            7 => DeviceType::TwoInOne,
            _ => DeviceType::NotSet,
        }
    }

    #[must_use]
    pub fn key_value(self) -> Option<u32> {
        match self {
            DeviceType::NotSet => None,
            DeviceType::Phone => Some(0),
            DeviceType::Tablet => Some(1),
            DeviceType::Car => Some(2),
            DeviceType::Pad => Some(3),
            DeviceType::Tv => Some(4),
            DeviceType::Wearable => Some(6),
            DeviceType::TwoInOne => Some(7),
        }
    }

    #[must_use]
    pub fn is_set(self) -> bool {
        self != DeviceType::NotSet
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceType::NotSet => "",
            DeviceType::Phone => "phone",
            DeviceType::Tablet => "tablet",
            DeviceType::Car => "car",
            DeviceType::Pad => "pad",
            DeviceType::Tv => "tv",
            DeviceType::Wearable => "wearable",
            DeviceType::TwoInOne => "2in1",
        }
    }
}

/// Light or dark appearance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorMode {
    #[default]
    NotSet,
    Dark,
    Light,
}

impl ColorMode {
    /// Decode a key value; 0 is dark and anything else light.
    #[must_use]
    pub fn from_key_value(value: u32) -> Self {
        if value == 0 {
            ColorMode::Dark
        } else {
            ColorMode::Light
        }
    }

    #[must_use]
    pub fn key_value(self) -> Option<u32> {
        match self {
            ColorMode::NotSet => None,
            ColorMode::Dark => Some(0),
            ColorMode::Light => Some(1),
        }
    }

    #[must_use]
    pub fn is_set(self) -> bool {
        self != ColorMode::NotSet
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ColorMode::NotSet => "",
            ColorMode::Dark => "dark",
            ColorMode::Light => "light",
        }
    }
}

/// Attached input device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InputDevice {
    #[default]
    NotSet,
    PointingDevice,
}

impl InputDevice {
    #[must_use]
    pub fn from_key_value(value: u32) -> Self {
        if value == 0 {
            InputDevice::PointingDevice
        } else {
            InputDevice::NotSet
        }
    }

    #[must_use]
    pub fn key_value(self) -> Option<u32> {
        match self {
            InputDevice::NotSet => None,
            InputDevice::PointingDevice => Some(0),
        }
    }

    #[must_use]
    pub fn is_set(self) -> bool {
        self != InputDevice::NotSet
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            InputDevice::NotSet => "",
            InputDevice::PointingDevice => "pointingdevice",
        }
    }
}

/// Screen density bucket, valued in DPI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum ScreenDensity {
    #[default]
    NotSet,
    Sdpi,
    Mdpi,
    Ldpi,
    Xldpi,
    Xxldpi,
    Xxxldpi,
}

impl ScreenDensity {
    /// Set buckets in ascending DPI order.
    pub const BUCKETS: [ScreenDensity; 6] = [
        ScreenDensity::Sdpi,
        ScreenDensity::Mdpi,
        ScreenDensity::Ldpi,
        ScreenDensity::Xldpi,
        ScreenDensity::Xxldpi,
        ScreenDensity::Xxxldpi,
    ];

    #[must_use]
    pub fn dpi(self) -> u32 {
        match self {
            ScreenDensity::NotSet => 0,
            ScreenDensity::Sdpi => 120,
            ScreenDensity::Mdpi => 160,
            ScreenDensity::Ldpi => 240,
            ScreenDensity::Xldpi => 320,
            ScreenDensity::Xxldpi => 480,
            ScreenDensity::Xxxldpi => 640,
        }
    }

    /// Exact DPI to bucket; `0` is `NotSet` and unknown values are `None`.
    #[must_use]
    pub fn from_dpi(dpi: u32) -> Option<Self> {
        if dpi == 0 {
            return Some(ScreenDensity::NotSet);
        }
        Self::BUCKETS.into_iter().find(|b| b.dpi() == dpi)
    }

    /// Map a density factor (1.0 = 160 dpi) to the first bucket at or above it.
    ///
    /// Factors above the largest bucket clamp to `Xxxldpi`; non-positive
    /// factors give `NotSet`.
    #[must_use]
    pub fn from_factor(factor: f32) -> Self {
        if factor <= 0.0 || !factor.is_finite() {
            return ScreenDensity::NotSet;
        }
        let device_dpi = factor * DPI_BASE;
        Self::BUCKETS
            .into_iter()
            .find(|b| device_dpi <= b.dpi() as f32)
            .unwrap_or(ScreenDensity::Xxxldpi)
    }

    #[must_use]
    pub fn is_set(self) -> bool {
        self != ScreenDensity::NotSet
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ScreenDensity::NotSet => "",
            ScreenDensity::Sdpi => "sdpi",
            ScreenDensity::Mdpi => "mdpi",
            ScreenDensity::Ldpi => "ldpi",
            ScreenDensity::Xldpi => "xldpi",
            ScreenDensity::Xxldpi => "xxldpi",
            ScreenDensity::Xxxldpi => "xxxldpi",
        }
    }
}

/// Validate a caller-supplied density override: `0` or an exact bucket DPI.
pub fn validate_density(density: u32) -> Result<()> {
    if ScreenDensity::from_dpi(density).is_none() {
        return Err(Error::InvalidArgument(format!(
            "density {density} is not one of 0, 120, 160, 240, 320, 480, 640"
        )));
    }
    Ok(())
}

macro_rules! qualifier_from_str {
    ($ty:ident, $kind:literal, [$($variant:ident),+]) => {
        impl FromStr for $ty {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                let lower = s.to_ascii_lowercase();
                $(
                    if lower == $ty::$variant.as_str() {
                        return Ok($ty::$variant);
                    }
                )+
                Err(Error::InvalidArgument(format!("unknown {} '{s}'", $kind)))
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

qualifier_from_str!(Direction, "direction", [Vertical, Horizontal]);
qualifier_from_str!(DeviceType, "device type", [Phone, Tablet, Car, Pad, Tv, Wearable, TwoInOne]);
qualifier_from_str!(ColorMode, "color mode", [Dark, Light]);
qualifier_from_str!(InputDevice, "input device", [PointingDevice]);
qualifier_from_str!(ScreenDensity, "screen density", [Sdpi, Mdpi, Ldpi, Xldpi, Xxldpi, Xxxldpi]);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_ascii() {
        assert_eq!(pack_ascii("zh").unwrap(), (u32::from(b'z') << 8) | u32::from(b'h'));
        assert_eq!(unpack_ascii(pack_ascii("Hans").unwrap()), "Hans");
        assert_eq!(unpack_ascii(pack_ascii("CN").unwrap()), "CN");
        assert!(pack_ascii("toolong").is_err());
        assert!(pack_ascii("").is_err());
    }

    #[test]
    fn test_density_from_factor() {
        assert_eq!(ScreenDensity::from_factor(1.0), ScreenDensity::Mdpi);
        assert_eq!(ScreenDensity::from_factor(2.0), ScreenDensity::Xldpi);
        assert_eq!(ScreenDensity::from_factor(2.5), ScreenDensity::Xxldpi);
        assert_eq!(ScreenDensity::from_factor(3.0), ScreenDensity::Xxldpi);
        assert_eq!(ScreenDensity::from_factor(3.5), ScreenDensity::Xxxldpi);
        assert_eq!(ScreenDensity::from_factor(9.0), ScreenDensity::Xxxldpi);
        assert_eq!(ScreenDensity::from_factor(0.0), ScreenDensity::NotSet);
    }

    #[test]
    fn test_reserved_key_type() {
        assert_eq!(KeyType::from_u32(KeyType::RESERVED), None);
        assert_eq!(KeyType::from_u32(10), Some(KeyType::InputDevice));
        assert_eq!(KeyType::InputDevice.limit_bit(), 1 << 10);
    }

    #[test]
    fn test_validate_density() {
        assert!(validate_density(0).is_ok());
        assert!(validate_density(480).is_ok());
        assert!(validate_density(481).is_err());
    }

    #[test]
    fn test_qualifier_parse() {
        assert_eq!("2in1".parse::<DeviceType>().unwrap(), DeviceType::TwoInOne);
        assert_eq!("DARK".parse::<ColorMode>().unwrap(), ColorMode::Dark);
        assert!("sideways".parse::<Direction>().is_err());
    }
}
