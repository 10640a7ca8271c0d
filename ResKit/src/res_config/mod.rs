//! Device configuration model
//!
//! A [`ResConfig`] is used two ways: as the *request* describing the running
//! device, and as the qualifier of one resource variant decoded from a key.
//! Matching and ranking live in [`matching`].

pub mod locale;
pub mod matching;
pub mod qualifier;

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

pub use locale::{DefaultLocaleMatcher, LocaleMatcher, ResLocale};
pub use qualifier::{
    ColorMode, DeviceType, Direction, InputDevice, KeyParam, KeyType, MCC_UNDEFINED, MNC_UNDEFINED,
    ScreenDensity,
};

/// A device/runtime configuration, or the qualifier of one resource variant.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResConfig {
    locale: Option<ResLocale>,
    preferred_locale: Option<ResLocale>,
    direction: Direction,
    device_type: DeviceType,
    color_mode: ColorMode,
    input_device: InputDevice,
    density: ScreenDensity,
    density_factor: f32,
    mcc: u32,
    mnc: u32,
    app_color_mode: bool,
    app_dark_res: bool,
}

impl ResConfig {
    /// Every dimension unset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Application default: unset everywhere except light color mode.
    #[must_use]
    pub fn app_default() -> Self {
        Self {
            color_mode: ColorMode::Light,
            ..Self::default()
        }
    }

    // ==================== Builders ====================

    #[must_use]
    pub fn with_locale(mut self, locale: ResLocale) -> Self {
        self.locale = (!locale.is_empty()).then_some(locale);
        self
    }

    /// Parse and set the locale from a tag such as `zh-Hans-CN`.
    pub fn with_locale_tag(self, tag: &str) -> Result<Self> {
        Ok(self.with_locale(tag.parse()?))
    }

    #[must_use]
    pub fn with_preferred_locale(mut self, locale: Option<ResLocale>) -> Self {
        self.preferred_locale = locale.filter(|l| !l.is_empty());
        self
    }

    #[must_use]
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    #[must_use]
    pub fn with_device_type(mut self, device_type: DeviceType) -> Self {
        self.device_type = device_type;
        self
    }

    #[must_use]
    pub fn with_color_mode(mut self, color_mode: ColorMode) -> Self {
        self.color_mode = color_mode;
        self
    }

    #[must_use]
    pub fn with_input_device(mut self, input_device: InputDevice) -> Self {
        self.input_device = input_device;
        self
    }

    /// Set the density bucket directly.
    #[must_use]
    pub fn with_density(mut self, density: ScreenDensity) -> Self {
        self.density = density;
        self.density_factor = density.dpi() as f32 / qualifier::DPI_BASE;
        self
    }

    /// Set the density from a factor where 1.0 means 160 dpi.
    #[must_use]
    pub fn with_density_factor(mut self, factor: f32) -> Self {
        self.density_factor = factor;
        self.density = ScreenDensity::from_factor(factor);
        self
    }

    #[must_use]
    pub fn with_mcc_mnc(mut self, mcc: u32, mnc: u32) -> Self {
        self.mcc = mcc;
        self.mnc = mnc;
        self
    }

    /// Declare that the application adapts to dark mode itself.
    #[must_use]
    pub fn with_app_color_mode(mut self, adapts: bool) -> Self {
        self.app_color_mode = adapts;
        self
    }

    /// Declare that the application ships dark-mode resources.
    #[must_use]
    pub fn with_app_dark_res(mut self, has_dark: bool) -> Self {
        self.app_dark_res = has_dark;
        self
    }

    pub(crate) fn set_app_dark_res(&mut self, has_dark: bool) {
        self.app_dark_res = has_dark;
    }

    // ==================== Accessors ====================

    pub fn locale(&self) -> Option<&ResLocale> {
        self.locale.as_ref()
    }

    pub fn preferred_locale(&self) -> Option<&ResLocale> {
        self.preferred_locale.as_ref()
    }

    pub fn is_locale_set(&self) -> bool {
        self.locale.is_some()
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn device_type(&self) -> DeviceType {
        self.device_type
    }

    pub fn color_mode(&self) -> ColorMode {
        self.color_mode
    }

    pub fn input_device(&self) -> InputDevice {
        self.input_device
    }

    pub fn density(&self) -> ScreenDensity {
        self.density
    }

    pub fn density_factor(&self) -> f32 {
        self.density_factor
    }

    pub fn mcc(&self) -> u32 {
        self.mcc
    }

    pub fn mnc(&self) -> u32 {
        self.mnc
    }

    pub fn app_color_mode(&self) -> bool {
        self.app_color_mode
    }

    pub fn app_dark_res(&self) -> bool {
        self.app_dark_res
    }

    // ==================== Derivations ====================

    /// Copy every explicitly set field of `overrides` on top of `self`.
    ///
    /// This is the effective configuration used by override-aware lookups.
    #[must_use]
    pub fn merge_override(&self, overrides: &ResConfig) -> ResConfig {
        let mut merged = self.clone();
        if overrides.locale.is_some() {
            merged.locale.clone_from(&overrides.locale);
        }
        if overrides.preferred_locale.is_some() {
            merged.preferred_locale.clone_from(&overrides.preferred_locale);
        }
        if overrides.direction.is_set() {
            merged.direction = overrides.direction;
        }
        if overrides.device_type.is_set() {
            merged.device_type = overrides.device_type;
        }
        if overrides.color_mode.is_set() {
            merged.color_mode = overrides.color_mode;
        }
        if overrides.input_device.is_set() {
            merged.input_device = overrides.input_device;
        }
        if overrides.density.is_set() {
            merged.density = overrides.density;
            merged.density_factor = overrides.density_factor;
        }
        if overrides.mcc != MCC_UNDEFINED {
            merged.mcc = overrides.mcc;
            merged.mnc = overrides.mnc;
        }
        merged
    }

    /// Copy of a variant qualifier with an unset color mode read as light.
    #[must_use]
    pub fn as_light_default(&self) -> ResConfig {
        let mut light = self.clone();
        if !light.color_mode.is_set() {
            light.color_mode = ColorMode::Light;
        }
        light
    }

    /// Whether the combination of fields describes a real configuration.
    ///
    /// An mnc without an mcc is not a defined state.
    pub fn is_valid(&self) -> bool {
        !(self.mcc == MCC_UNDEFINED && self.mnc != MNC_UNDEFINED)
    }

    // ==================== Key parameters ====================

    /// Build a variant qualifier from the parameters of one index key.
    ///
    /// Parameters with an unknown or reserved type are ignored.
    pub fn from_key_params(params: &[KeyParam]) -> Self {
        let mut config = ResConfig::default();
        let mut language = None;
        let mut script = None;
        let mut region = None;

        for param in params {
            let Some(key_type) = param.key_type() else {
                continue;
            };
            match key_type {
                KeyType::Language => language = Some(param.as_text()),
                KeyType::Region => region = Some(param.as_text()),
                KeyType::Script => script = Some(param.as_text()),
                KeyType::ScreenDensity => {
                    config.density = ScreenDensity::from_dpi(param.value).unwrap_or_default();
                    config.density_factor = config.density.dpi() as f32 / qualifier::DPI_BASE;
                }
                KeyType::Direction => config.direction = Direction::from_key_value(param.value),
                KeyType::DeviceType => config.device_type = DeviceType::from_key_value(param.value),
                KeyType::ColorMode => config.color_mode = ColorMode::from_key_value(param.value),
                KeyType::InputDevice => config.input_device = InputDevice::from_key_value(param.value),
                KeyType::Mcc => config.mcc = param.value,
                KeyType::Mnc => config.mnc = param.value,
            }
        }

        let locale = ResLocale::new(language.as_deref(), script.as_deref(), region.as_deref());
        config.with_locale(locale)
    }

    /// Inverse of [`from_key_params`](Self::from_key_params), in key-type order.
    pub fn to_key_params(&self) -> Result<Vec<KeyParam>> {
        let mut params = Vec::new();
        if let Some(locale) = &self.locale {
            if let Some(language) = &locale.language {
                params.push(KeyParam::text(KeyType::Language, language)?);
            }
            if let Some(region) = &locale.region {
                params.push(KeyParam::text(KeyType::Region, region)?);
            }
        }
        if self.density.is_set() {
            params.push(KeyParam::new(KeyType::ScreenDensity, self.density.dpi()));
        }
        if let Some(v) = self.direction.key_value() {
            params.push(KeyParam::new(KeyType::Direction, v));
        }
        if let Some(v) = self.device_type.key_value() {
            params.push(KeyParam::new(KeyType::DeviceType, v));
        }
        if let Some(script) = self.locale.as_ref().and_then(|l| l.script.as_ref()) {
            params.push(KeyParam::text(KeyType::Script, script)?);
        }
        if let Some(v) = self.color_mode.key_value() {
            params.push(KeyParam::new(KeyType::ColorMode, v));
        }
        if self.mcc != MCC_UNDEFINED {
            params.push(KeyParam::new(KeyType::Mcc, self.mcc));
            if self.mnc != MNC_UNDEFINED {
                params.push(KeyParam::new(KeyType::Mnc, self.mnc));
            }
        }
        if let Some(v) = self.input_device.key_value() {
            params.push(KeyParam::new(KeyType::InputDevice, v));
        }
        Ok(params)
    }

    // ==================== Qualifier folder names ====================

    /// Folder name of this qualifier, `base` when nothing is set.
    ///
    /// Layout: `mcc460_mnc01-zh_Hans_CN-vertical-phone-dark-pointingdevice-xldpi`.
    pub fn qualifier_path(&self) -> String {
        let mut segments: Vec<String> = Vec::new();
        if self.mcc != MCC_UNDEFINED {
            let mut mcc = format!("mcc{}", self.mcc);
            if self.mnc != MNC_UNDEFINED {
                mcc.push_str(&format!("_mnc{:02}", self.mnc));
            }
            segments.push(mcc);
        }
        if let Some(locale) = &self.locale {
            segments.push(locale.to_folder_name());
        }
        for part in [
            self.direction.as_str(),
            self.device_type.as_str(),
            self.color_mode.as_str(),
            self.input_device.as_str(),
            self.density.as_str(),
        ] {
            if !part.is_empty() {
                segments.push(part.to_string());
            }
        }
        if segments.is_empty() {
            return "base".to_string();
        }
        segments.join("-")
    }

    /// Parse a qualifier folder name produced by [`qualifier_path`](Self::qualifier_path).
    pub fn from_qualifier_path(path: &str) -> Result<Self> {
        let mut config = ResConfig::default();
        if path == "base" || path.is_empty() {
            return Ok(config);
        }
        for segment in path.split('-') {
            if let Some(rest) = segment.strip_prefix("mcc") {
                let (mcc, mnc) = match rest.split_once("_mnc") {
                    Some((mcc, mnc)) => (mcc, Some(mnc)),
                    None => (rest, None),
                };
                config.mcc = parse_code(mcc, segment)?;
                config.mnc = mnc.map(|m| parse_code(m, segment)).transpose()?.unwrap_or(MNC_UNDEFINED);
            } else if let Ok(direction) = segment.parse::<Direction>() {
                config.direction = direction;
            } else if let Ok(device) = segment.parse::<DeviceType>() {
                config.device_type = device;
            } else if let Ok(color) = segment.parse::<ColorMode>() {
                config.color_mode = color;
            } else if let Ok(input) = segment.parse::<InputDevice>() {
                config.input_device = input;
            } else if let Ok(density) = segment.parse::<ScreenDensity>() {
                config = config.with_density(density);
            } else {
                let locale: ResLocale = segment.parse().map_err(|_| {
                    Error::InvalidArgument(format!("unknown qualifier '{segment}' in '{path}'"))
                })?;
                config = config.with_locale(locale);
            }
        }
        Ok(config)
    }
}

fn parse_code(digits: &str, segment: &str) -> Result<u32> {
    digits
        .parse()
        .map_err(|_| Error::InvalidArgument(format!("invalid mcc/mnc qualifier '{segment}'")))
}

impl fmt::Display for ResConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualifier_path())
    }
}

impl FromStr for ResConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_qualifier_path(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_qualifier_path() {
        assert_eq!(ResConfig::new().qualifier_path(), "base");

        let config = ResConfig::new()
            .with_mcc_mnc(460, 1)
            .with_locale_tag("zh-Hans-CN")
            .unwrap()
            .with_direction(Direction::Vertical)
            .with_device_type(DeviceType::Phone)
            .with_color_mode(ColorMode::Dark)
            .with_input_device(InputDevice::PointingDevice)
            .with_density(ScreenDensity::Xldpi);
        let path = config.qualifier_path();
        assert_eq!(path, "mcc460_mnc01-zh_Hans_CN-vertical-phone-dark-pointingdevice-xldpi");

        let parsed = ResConfig::from_qualifier_path(&path).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_key_params() {
        let config = ResConfig::new()
            .with_locale_tag("en-US")
            .unwrap()
            .with_color_mode(ColorMode::Dark)
            .with_density(ScreenDensity::Xxldpi);
        let params = config.to_key_params().unwrap();
        assert_eq!(params.len(), 4);
        assert_eq!(ResConfig::from_key_params(&params), config);
    }

    #[test]
    fn test_reserved_param_ignored() {
        let params = [
            KeyParam { raw_type: KeyType::RESERVED, value: 7 },
            KeyParam::new(KeyType::ColorMode, 0),
        ];
        let config = ResConfig::from_key_params(&params);
        assert_eq!(config, ResConfig::new().with_color_mode(ColorMode::Dark));
    }

    #[test]
    fn test_merge_override() {
        let active = ResConfig::new()
            .with_locale_tag("en")
            .unwrap()
            .with_color_mode(ColorMode::Light)
            .with_device_type(DeviceType::Phone);
        let overrides = ResConfig::new().with_color_mode(ColorMode::Dark);
        let merged = active.merge_override(&overrides);
        assert_eq!(merged.color_mode(), ColorMode::Dark);
        assert_eq!(merged.device_type(), DeviceType::Phone);
        assert_eq!(merged.locale().and_then(|l| l.language.as_deref()), Some("en"));
    }

    #[test]
    fn test_invalid_config() {
        assert!(!ResConfig::new().with_mcc_mnc(0, 1).is_valid());
        assert!(ResConfig::new().with_mcc_mnc(460, 0).is_valid());
    }
}
