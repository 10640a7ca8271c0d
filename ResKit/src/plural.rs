//! Plural category selection for plural resources

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};

/// CLDR plural category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluralCategory {
    Zero,
    One,
    Two,
    Few,
    Many,
    Other,
}

impl PluralCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            PluralCategory::Zero => "zero",
            PluralCategory::One => "one",
            PluralCategory::Two => "two",
            PluralCategory::Few => "few",
            PluralCategory::Many => "many",
            PluralCategory::Other => "other",
        }
    }
}

impl fmt::Display for PluralCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PluralCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "zero" => Ok(PluralCategory::Zero),
            "one" => Ok(PluralCategory::One),
            "two" => Ok(PluralCategory::Two),
            "few" => Ok(PluralCategory::Few),
            "many" => Ok(PluralCategory::Many),
            "other" => Ok(PluralCategory::Other),
            _ => Err(Error::ParseValue {
                value: s.to_string(),
                kind: "plural category",
            }),
        }
    }
}

/// Plural rule of one language.
pub type PluralRule = fn(f64) -> PluralCategory;

/// Source of plural rules by language subtag.
pub trait PluralRuleProvider: Send + Sync + fmt::Debug {
    fn rule_for(&self, language: &str) -> PluralRule;
}

/// Rules for a handful of common languages; anything else follows English.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimplePluralRules;

fn is_integer(n: f64) -> bool {
    n.fract().abs() < f64::EPSILON
}

fn english(n: f64) -> PluralCategory {
    if (n - 1.0).abs() < f64::EPSILON {
        PluralCategory::One
    } else {
        PluralCategory::Other
    }
}

fn no_plural(_: f64) -> PluralCategory {
    PluralCategory::Other
}

fn french(n: f64) -> PluralCategory {
    if (0.0..2.0).contains(&n) {
        PluralCategory::One
    } else {
        PluralCategory::Other
    }
}

fn east_slavic(n: f64) -> PluralCategory {
    if !is_integer(n) {
        return PluralCategory::Other;
    }
    let n = n.abs() as u64;
    match (n % 10, n % 100) {
        (1, m) if m != 11 => PluralCategory::One,
        (2..=4, m) if !(12..=14).contains(&m) => PluralCategory::Few,
        _ => PluralCategory::Many,
    }
}

fn polish(n: f64) -> PluralCategory {
    if !is_integer(n) {
        return PluralCategory::Other;
    }
    let n = n.abs() as u64;
    match (n, n % 10, n % 100) {
        (1, _, _) => PluralCategory::One,
        (_, 2..=4, m) if !(12..=14).contains(&m) => PluralCategory::Few,
        _ => PluralCategory::Many,
    }
}

fn arabic(n: f64) -> PluralCategory {
    if !is_integer(n) {
        return PluralCategory::Other;
    }
    let n = n.abs() as u64;
    match (n, n % 100) {
        (0, _) => PluralCategory::Zero,
        (1, _) => PluralCategory::One,
        (2, _) => PluralCategory::Two,
        (_, 3..=10) => PluralCategory::Few,
        (_, 11..=99) => PluralCategory::Many,
        _ => PluralCategory::Other,
    }
}

impl PluralRuleProvider for SimplePluralRules {
    fn rule_for(&self, language: &str) -> PluralRule {
        match language {
            "zh" | "ja" | "ko" | "th" | "vi" | "id" | "ms" => no_plural,
            "fr" => french,
            "ru" | "uk" | "be" => east_slavic,
            "pl" => polish,
            "ar" => arabic,
            _ => english,
        }
    }
}

/// Recently used rules, at most `capacity` languages; the oldest is evicted first.
#[derive(Debug)]
pub struct PluralCache {
    provider: Arc<dyn PluralRuleProvider>,
    capacity: usize,
    rules: Mutex<Vec<(String, PluralRule)>>,
}

impl PluralCache {
    pub fn new(provider: Arc<dyn PluralRuleProvider>, capacity: usize) -> Self {
        Self {
            provider,
            capacity: capacity.max(1),
            rules: Mutex::new(Vec::new()),
        }
    }

    /// Plural category of `quantity` in `language`.
    pub fn select(&self, language: &str, quantity: f64) -> Result<PluralCategory> {
        let mut rules = self.rules.lock().map_err(|_| Error::LockPoisoned("plural cache"))?;
        let rule = if let Some((_, rule)) = rules.iter().find(|(lang, _)| lang == language) {
            *rule
        } else {
            let rule = self.provider.rule_for(language);
            if rules.len() >= self.capacity {
                let evicted = rules.remove(0);
                tracing::debug!("Evicted plural rules for {}", evicted.0);
            }
            rules.push((language.to_string(), rule));
            rule
        };
        Ok(rule(quantity))
    }

    /// Languages currently cached, oldest first.
    pub fn languages(&self) -> Vec<String> {
        self.rules
            .lock()
            .map(|rules| rules.iter().map(|(lang, _)| lang.clone()).collect())
            .unwrap_or_default()
    }
}

impl Default for PluralCache {
    fn default() -> Self {
        Self::new(Arc::new(SimplePluralRules), 3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_rules() {
        let rules = SimplePluralRules;
        assert_eq!(rules.rule_for("en")(1.0), PluralCategory::One);
        assert_eq!(rules.rule_for("en")(2.0), PluralCategory::Other);
        assert_eq!(rules.rule_for("zh")(1.0), PluralCategory::Other);
        assert_eq!(rules.rule_for("fr")(1.5), PluralCategory::One);
        assert_eq!(rules.rule_for("ru")(21.0), PluralCategory::One);
        assert_eq!(rules.rule_for("ru")(23.0), PluralCategory::Few);
        assert_eq!(rules.rule_for("ru")(12.0), PluralCategory::Many);
        assert_eq!(rules.rule_for("pl")(22.0), PluralCategory::Few);
        assert_eq!(rules.rule_for("pl")(21.0), PluralCategory::Many);
        assert_eq!(rules.rule_for("ar")(0.0), PluralCategory::Zero);
        assert_eq!(rules.rule_for("ar")(2.0), PluralCategory::Two);
        assert_eq!(rules.rule_for("ar")(105.0), PluralCategory::Few);
        assert_eq!(rules.rule_for("ar")(111.0), PluralCategory::Many);
        assert_eq!(rules.rule_for("ar")(100.0), PluralCategory::Other);
    }

    #[test]
    fn test_cache_evicts_oldest() {
        let cache = PluralCache::default();
        for lang in ["en", "fr", "ru", "en", "ar"] {
            cache.select(lang, 1.0).unwrap();
        }
        assert_eq!(cache.languages(), vec!["fr", "ru", "ar"]);
    }

    #[test]
    fn test_category_names() {
        assert_eq!("few".parse::<PluralCategory>().unwrap(), PluralCategory::Few);
        assert!("lots".parse::<PluralCategory>().is_err());
    }
}
