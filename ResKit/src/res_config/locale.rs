//! Locale qualifier and the matcher used to compare locales
//!
//! Full locale negotiation (likely-subtag completion, fallback trees) is the
//! job of an external library. [`LocaleMatcher`] is the narrow seam it plugs
//! into; [`DefaultLocaleMatcher`] covers language/script/region equality.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Language, script and region of a locale qualifier.
///
/// Any part may be absent; a key can carry only a region, for example.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ResLocale {
    pub language: Option<String>,
    pub script: Option<String>,
    pub region: Option<String>,
}

impl ResLocale {
    /// Build a locale from its parts, normalising letter case.
    #[must_use]
    pub fn new(language: Option<&str>, script: Option<&str>, region: Option<&str>) -> Self {
        let mut locale = Self {
            language: language.filter(|s| !s.is_empty()).map(str::to_string),
            script: script.filter(|s| !s.is_empty()).map(str::to_string),
            region: region.filter(|s| !s.is_empty()).map(str::to_string),
        };
        DefaultLocaleMatcher.normalize(&mut locale);
        locale
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.language.is_none() && self.script.is_none() && self.region.is_none()
    }

    /// `language[-Script][-REGION]`, the form used in locale listings.
    #[must_use]
    pub fn to_tag(&self) -> String {
        self.join('-')
    }

    /// `language[_Script][_REGION]`, the form used in qualifier folder names.
    #[must_use]
    pub fn to_folder_name(&self) -> String {
        self.join('_')
    }

    fn join(&self, sep: char) -> String {
        let mut out = String::new();
        for part in [&self.language, &self.script, &self.region].into_iter().flatten() {
            if !out.is_empty() {
                out.push(sep);
            }
            out.push_str(part);
        }
        out
    }
}

impl FromStr for ResLocale {
    type Err = Error;

    /// Parse `zh`, `zh-CN`, `zh_Hans_CN`, `en-US` and similar tags.
    fn from_str(s: &str) -> Result<Self> {
        let mut language = None;
        let mut script = None;
        let mut region = None;

        for (i, part) in s.split(['-', '_']).enumerate() {
            let alpha = part.chars().all(|c| c.is_ascii_alphabetic());
            let digits = part.chars().all(|c| c.is_ascii_digit());
            match part.len() {
                2 | 3 if i == 0 && alpha => language = Some(part),
                4 if i > 0 && alpha && script.is_none() && region.is_none() => script = Some(part),
                2 if i > 0 && alpha && region.is_none() => region = Some(part),
                3 if i > 0 && digits && region.is_none() => region = Some(part),
                _ => {
                    return Err(Error::InvalidArgument(format!(
                        "invalid locale tag '{s}' at '{part}'"
                    )));
                }
            }
        }

        if language.is_none() {
            return Err(Error::InvalidArgument(format!("locale tag '{s}' has no language")));
        }
        Ok(Self::new(language, script, region))
    }
}

impl fmt::Display for ResLocale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_tag())
    }
}

/// Locale comparison seam.
///
/// `is_more_suitable` and `is_more_specific_than` return a sign: positive
/// when `this` wins, negative when `other` wins, zero on a tie. Implementations
/// must be antisymmetric: swapping `this` and `other` negates the result.
pub trait LocaleMatcher: Send + Sync {
    /// Whether a candidate locale is usable for a request locale.
    fn matches(&self, request: Option<&ResLocale>, candidate: Option<&ResLocale>) -> bool;

    /// Which candidate fits the request better.
    fn is_more_suitable(
        &self,
        this: Option<&ResLocale>,
        other: Option<&ResLocale>,
        request: Option<&ResLocale>,
    ) -> i8;

    /// Which candidate is more specific, ignoring any request.
    fn is_more_specific_than(&self, this: Option<&ResLocale>, other: Option<&ResLocale>) -> i8;

    /// Normalise a locale in place. Returns `true` if anything changed.
    fn normalize(&self, locale: &mut ResLocale) -> bool;
}

/// Equality-based matcher without likely-subtag data.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultLocaleMatcher;

fn eq_ignore_case(a: Option<&String>, b: Option<&String>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        _ => false,
    }
}

fn ordering_sign(ordering: Ordering) -> i8 {
    match ordering {
        Ordering::Greater => 1,
        Ordering::Less => -1,
        Ordering::Equal => 0,
    }
}

impl DefaultLocaleMatcher {
    /// Rank of a candidate against a request: language, then region, then script.
    fn suitability(candidate: Option<&ResLocale>, request: &ResLocale) -> (u8, u8, u8) {
        let Some(candidate) = candidate else {
            return (0, 1, 0);
        };
        let language = u8::from(eq_ignore_case(candidate.language.as_ref(), request.language.as_ref()));
        let region = match &candidate.region {
            None => 1,
            Some(_) if eq_ignore_case(candidate.region.as_ref(), request.region.as_ref()) => 2,
            Some(_) => 0,
        };
        let script = u8::from(eq_ignore_case(candidate.script.as_ref(), request.script.as_ref()));
        (language, region, script)
    }

    fn specificity(locale: Option<&ResLocale>) -> (bool, bool, bool) {
        locale.map_or((false, false, false), |l| {
            (l.language.is_some(), l.region.is_some(), l.script.is_some())
        })
    }
}

impl LocaleMatcher for DefaultLocaleMatcher {
    fn matches(&self, request: Option<&ResLocale>, candidate: Option<&ResLocale>) -> bool {
        let (Some(request), Some(candidate)) = (request, candidate) else {
            return true;
        };
        if candidate.language.is_some()
            && !eq_ignore_case(candidate.language.as_ref(), request.language.as_ref())
        {
            return false;
        }
        if candidate.script.is_some()
            && request.script.is_some()
            && !eq_ignore_case(candidate.script.as_ref(), request.script.as_ref())
        {
            return false;
        }
        candidate.region.is_none() || eq_ignore_case(candidate.region.as_ref(), request.region.as_ref())
    }

    fn is_more_suitable(
        &self,
        this: Option<&ResLocale>,
        other: Option<&ResLocale>,
        request: Option<&ResLocale>,
    ) -> i8 {
        // A request without a locale prefers the candidate without one.
        let Some(request) = request else {
            return match (this, other) {
                (None, Some(_)) => 1,
                (Some(_), None) => -1,
                _ => 0,
            };
        };
        ordering_sign(Self::suitability(this, request).cmp(&Self::suitability(other, request)))
    }

    fn is_more_specific_than(&self, this: Option<&ResLocale>, other: Option<&ResLocale>) -> i8 {
        ordering_sign(Self::specificity(this).cmp(&Self::specificity(other)))
    }

    fn normalize(&self, locale: &mut ResLocale) -> bool {
        let before = locale.clone();
        if let Some(language) = locale.language.as_mut() {
            language.make_ascii_lowercase();
        }
        if let Some(script) = locale.script.as_mut() {
            script.make_ascii_lowercase();
            if let Some(first) = script.get_mut(0..1) {
                first.make_ascii_uppercase();
            }
        }
        if let Some(region) = locale.region.as_mut() {
            region.make_ascii_uppercase();
        }
        *locale != before
    }
}
