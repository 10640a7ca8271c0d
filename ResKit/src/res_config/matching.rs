//! Candidate matching and ranking
//!
//! `matches` decides whether a variant is usable at all for a request;
//! `suitability_cmp` ranks two usable variants. The ranking is a strict
//! ordering: swapping the operands always reverses the result, so a scan
//! over candidates never depends on which side a comparison is asked from.

use std::cmp::Ordering;

use super::locale::{DefaultLocaleMatcher, LocaleMatcher};
use super::qualifier::{ColorMode, MCC_UNDEFINED, MNC_UNDEFINED};
use super::ResConfig;

/// Distance rule between two densities measured against the same target.
///
/// Nearest at-or-above the target wins; anything above beats anything below;
/// below the target the closest wins.
#[must_use]
pub fn is_density_more_suitable(this_dist: i64, other_dist: i64) -> bool {
    if this_dist >= 0 && other_dist >= 0 {
        return this_dist <= other_dist;
    }
    if this_dist > 0 {
        return true;
    }
    if other_dist > 0 {
        return false;
    }
    this_dist >= other_dist
}

fn density_distance_cmp(this: u32, other: u32, target: u32) -> Ordering {
    let this_dist = i64::from(this) - i64::from(target);
    let other_dist = i64::from(other) - i64::from(target);
    if is_density_more_suitable(this_dist, other_dist) {
        Ordering::Greater
    } else {
        Ordering::Less
    }
}

fn sign_to_ordering(sign: i8) -> Ordering {
    sign.cmp(&0)
}

/// 2 for an exact match with the request, 1 for unset, 0 otherwise.
fn request_rank<T: PartialEq>(value: T, requested: T, unset: T) -> u8 {
    if value == requested {
        2
    } else if value == unset {
        1
    } else {
        0
    }
}

fn mcc_mnc_weight(config: &ResConfig) -> u8 {
    u8::from(config.mcc != MCC_UNDEFINED) + u8::from(config.mnc != MNC_UNDEFINED)
}

impl ResConfig {
    /// Whether `candidate` can be used for the request `self`.
    #[must_use]
    pub fn matches(&self, candidate: &ResConfig, check_dark_adaptation: bool) -> bool {
        self.matches_with(&DefaultLocaleMatcher, candidate, check_dark_adaptation)
    }

    /// [`matches`](Self::matches) with an explicit locale matcher.
    pub fn matches_with(
        &self,
        matcher: &dyn LocaleMatcher,
        candidate: &ResConfig,
        check_dark_adaptation: bool,
    ) -> bool {
        self.mcc_mnc_matches(candidate)
            && self.locale_matches(matcher, candidate)
            && (!self.direction.is_set()
                || !candidate.direction.is_set()
                || self.direction == candidate.direction)
            && (!self.device_type.is_set()
                || !candidate.device_type.is_set()
                || self.device_type == candidate.device_type)
            && self.color_mode_matches(candidate.color_mode, check_dark_adaptation)
            && (!self.input_device.is_set()
                || !candidate.input_device.is_set()
                || self.input_device == candidate.input_device)
    }

    /// Locale test: a preferred locale, when present, decides alone.
    pub fn locale_matches(&self, matcher: &dyn LocaleMatcher, candidate: &ResConfig) -> bool {
        match &self.preferred_locale {
            Some(preferred) => matcher.matches(Some(preferred), candidate.locale.as_ref()),
            None => matcher.matches(self.locale.as_ref(), candidate.locale.as_ref()),
        }
    }

    fn mcc_mnc_matches(&self, candidate: &ResConfig) -> bool {
        if candidate.mcc == MCC_UNDEFINED && candidate.mnc == MNC_UNDEFINED {
            return true;
        }
        self.mcc == candidate.mcc && (candidate.mnc == MNC_UNDEFINED || self.mnc == candidate.mnc)
    }

    fn color_mode_matches(&self, candidate: ColorMode, check_dark_adaptation: bool) -> bool {
        if check_dark_adaptation
            && self.color_mode == ColorMode::Dark
            && !self.app_color_mode
            && !self.app_dark_res
        {
            return candidate == ColorMode::NotSet;
        }
        !self.color_mode.is_set() || !candidate.is_set() || self.color_mode == candidate
    }

    /// Whether `self` fits `request` strictly better than `other`.
    ///
    /// `density` is an explicit target DPI; `0` means use the request's own
    /// density. Without a request only specificity is compared.
    #[must_use]
    pub fn is_more_suitable(&self, other: &ResConfig, request: Option<&ResConfig>, density: u32) -> bool {
        self.suitability_cmp(&DefaultLocaleMatcher, other, request, density) == Ordering::Greater
    }

    /// [`is_more_suitable`](Self::is_more_suitable) with an explicit locale matcher.
    pub fn is_more_suitable_with(
        &self,
        matcher: &dyn LocaleMatcher,
        other: &ResConfig,
        request: Option<&ResConfig>,
        density: u32,
    ) -> bool {
        self.suitability_cmp(matcher, other, request, density) == Ordering::Greater
    }

    /// Full ranking of `self` against `other`; `Greater` means `self` wins.
    pub fn suitability_cmp(
        &self,
        matcher: &dyn LocaleMatcher,
        other: &ResConfig,
        request: Option<&ResConfig>,
        density: u32,
    ) -> Ordering {
        let Some(request) = request else {
            return self.specificity_cmp(matcher, other, density);
        };

        let request_full = request.mcc != MCC_UNDEFINED && request.mnc != MNC_UNDEFINED;
        let request_mcc_only = request.mcc != MCC_UNDEFINED && request.mnc == MNC_UNDEFINED;
        let mcc_or_mnc_differ = self.mcc != other.mcc || self.mnc != other.mnc;
        if (request_full && mcc_or_mnc_differ) || (request_mcc_only && self.mcc != other.mcc) {
            let ord = mcc_mnc_weight(self).cmp(&mcc_mnc_weight(other));
            if ord != Ordering::Equal {
                return ord;
            }
        }

        if let Some(preferred) = &request.preferred_locale {
            let ord = sign_to_ordering(matcher.is_more_suitable(
                self.locale.as_ref(),
                other.locale.as_ref(),
                Some(preferred),
            ));
            if ord != Ordering::Equal {
                return ord;
            }
        }

        let ord = sign_to_ordering(matcher.is_more_suitable(
            self.locale.as_ref(),
            other.locale.as_ref(),
            request.locale.as_ref(),
        ));
        if ord != Ordering::Equal {
            return ord;
        }

        let dimensions = [
            (
                self.direction != other.direction && request.direction.is_set(),
                request_rank(self.direction, request.direction, Default::default()),
                request_rank(other.direction, request.direction, Default::default()),
            ),
            (
                self.device_type != other.device_type && request.device_type.is_set(),
                request_rank(self.device_type, request.device_type, Default::default()),
                request_rank(other.device_type, request.device_type, Default::default()),
            ),
            (
                self.color_mode != other.color_mode && request.color_mode.is_set(),
                request_rank(self.color_mode, request.color_mode, Default::default()),
                request_rank(other.color_mode, request.color_mode, Default::default()),
            ),
            (
                self.input_device != other.input_device && request.input_device.is_set(),
                request_rank(self.input_device, request.input_device, Default::default()),
                request_rank(other.input_device, request.input_device, Default::default()),
            ),
        ];
        for (compared, this_rank, other_rank) in dimensions {
            if compared {
                let ord = this_rank.cmp(&other_rank);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }

        let target = if density != 0 { density } else { request.density.dpi() };
        if target != 0 && self.density != other.density {
            return density_distance_cmp(self.density.dpi(), other.density.dpi(), target);
        }

        self.specificity_cmp(matcher, other, density)
    }

    /// Whether `self` carries more qualifiers than `other`, ignoring any request.
    #[must_use]
    pub fn is_more_specific_than(&self, other: &ResConfig, density: u32) -> bool {
        self.specificity_cmp(&DefaultLocaleMatcher, other, density) == Ordering::Greater
    }

    fn specificity_cmp(&self, matcher: &dyn LocaleMatcher, other: &ResConfig, density: u32) -> Ordering {
        let ord = mcc_mnc_weight(self).cmp(&mcc_mnc_weight(other));
        if ord != Ordering::Equal {
            return ord;
        }

        let ord = sign_to_ordering(matcher.is_more_specific_than(self.locale.as_ref(), other.locale.as_ref()));
        if ord != Ordering::Equal {
            return ord;
        }

        let set_pairs = [
            (self.direction != other.direction, self.direction.is_set(), other.direction.is_set()),
            (self.device_type != other.device_type, self.device_type.is_set(), other.device_type.is_set()),
            (self.color_mode != other.color_mode, self.color_mode.is_set(), other.color_mode.is_set()),
            (self.input_device != other.input_device, self.input_device.is_set(), other.input_device.is_set()),
        ];
        for (differ, this_set, other_set) in set_pairs {
            if differ {
                let ord = this_set.cmp(&other_set);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }

        if self.density == other.density {
            return Ordering::Equal;
        }
        if density != 0 {
            return density_distance_cmp(self.density.dpi(), other.density.dpi(), density);
        }
        match (self.density.is_set(), other.density.is_set()) {
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            _ => self.density.cmp(&other.density),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::res_config::{DeviceType, Direction, InputDevice, ScreenDensity};

    fn with_density(d: ScreenDensity) -> ResConfig {
        ResConfig::new().with_density(d)
    }

    fn locale(tag: &str) -> ResConfig {
        ResConfig::new().with_locale_tag(tag).unwrap()
    }

    #[test]
    fn test_density_distance_rule() {
        assert!(is_density_more_suitable(0, 160));
        assert!(is_density_more_suitable(160, -160));
        assert!(!is_density_more_suitable(-160, 160));
        assert!(is_density_more_suitable(-80, -160));
        assert!(is_density_more_suitable(0, -160));
    }

    #[test]
    fn test_density_target_480() {
        let request = with_density(ScreenDensity::Xxldpi);
        let d320 = with_density(ScreenDensity::Xldpi);
        let d480 = with_density(ScreenDensity::Xxldpi);
        let d640 = with_density(ScreenDensity::Xxxldpi);

        assert!(d480.is_more_suitable(&d320, Some(&request), 0));
        assert!(d480.is_more_suitable(&d640, Some(&request), 0));
        assert!(d640.is_more_suitable(&d320, Some(&request), 0));
        assert!(!d320.is_more_suitable(&d640, Some(&request), 0));

        // explicit density parameter overrides the request
        let low = with_density(ScreenDensity::Sdpi);
        assert!(d320.is_more_suitable(&d480, Some(&low), 320));
    }

    #[test]
    fn test_matches_dimensions() {
        let request = ResConfig::new()
            .with_direction(Direction::Vertical)
            .with_device_type(DeviceType::Phone);
        assert!(request.matches(&ResConfig::new(), false));
        assert!(request.matches(&ResConfig::new().with_direction(Direction::Vertical), false));
        assert!(!request.matches(&ResConfig::new().with_direction(Direction::Horizontal), false));
        assert!(!request.matches(&ResConfig::new().with_device_type(DeviceType::Tv), false));
        assert!(ResConfig::new().matches(&ResConfig::new().with_input_device(InputDevice::PointingDevice), false));
    }

    #[test]
    fn test_mcc_mnc_match() {
        let request = ResConfig::new().with_mcc_mnc(460, 1);
        assert!(request.matches(&ResConfig::new(), false));
        assert!(request.matches(&ResConfig::new().with_mcc_mnc(460, 0), false));
        assert!(request.matches(&ResConfig::new().with_mcc_mnc(460, 1), false));
        assert!(!request.matches(&ResConfig::new().with_mcc_mnc(460, 2), false));
        assert!(!request.matches(&ResConfig::new().with_mcc_mnc(310, 0), false));

        let full = ResConfig::new().with_mcc_mnc(460, 1);
        let mcc_only = ResConfig::new().with_mcc_mnc(460, 0);
        assert!(full.is_more_suitable(&mcc_only, Some(&request), 0));
        assert!(mcc_only.is_more_suitable(&ResConfig::new(), Some(&request), 0));
    }

    #[test]
    fn test_dark_adaptation_rule() {
        let dark = ResConfig::new().with_color_mode(ColorMode::Dark);
        let light_variant = ResConfig::new().with_color_mode(ColorMode::Light);
        let dark_variant = ResConfig::new().with_color_mode(ColorMode::Dark);

        assert!(dark.matches(&ResConfig::new(), true));
        assert!(!dark.matches(&light_variant, true));
        assert!(!dark.matches(&dark_variant, true));
        assert!(dark.matches(&dark_variant, false));

        let adapting = dark.clone().with_app_color_mode(true);
        assert!(adapting.matches(&dark_variant, true));
        assert!(!adapting.matches(&light_variant, true));
    }

    #[test]
    fn test_preferred_locale_decides() {
        let request = locale("en-US").with_preferred_locale(Some("zh-CN".parse().unwrap()));
        assert!(request.matches(&locale("zh"), false));
        assert!(!request.matches(&locale("en"), false));

        let zh_cn = locale("zh-CN");
        let zh = locale("zh");
        assert!(zh_cn.is_more_suitable(&zh, Some(&request), 0));
    }

    #[test]
    fn test_localeless_request_keeps_base() {
        let request = ResConfig::new().with_color_mode(ColorMode::Light);
        let base = ResConfig::new();
        let de = locale("de-DE");
        assert!(request.matches(&de, false));
        assert!(base.is_more_suitable(&de, Some(&request), 0));
        assert!(!de.is_more_suitable(&base, Some(&request), 0));
    }

    #[test]
    fn test_request_dimension_beats_unset() {
        let request = ResConfig::new().with_direction(Direction::Horizontal);
        let horizontal = ResConfig::new().with_direction(Direction::Horizontal);
        assert!(horizontal.is_more_suitable(&ResConfig::new(), Some(&request), 0));
        assert!(!ResConfig::new().is_more_suitable(&horizontal, Some(&request), 0));
    }

    #[test]
    fn test_specificity_fallback() {
        let phone = ResConfig::new().with_device_type(DeviceType::Phone);
        assert!(phone.is_more_specific_than(&ResConfig::new(), 0));
        assert!(!ResConfig::new().is_more_specific_than(&phone, 0));
        // equal configs never beat each other
        assert!(!phone.is_more_specific_than(&phone, 0));
        assert!(!phone.is_more_suitable(&phone, None, 0));
    }
}
