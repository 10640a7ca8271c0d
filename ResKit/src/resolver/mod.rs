//! Reference and inheritance resolution
//!
//! Resource values may point at other resources with `$<type>:<id>`, for
//! example `$string:16777216` or `$color:16777220`. Patterns and themes store
//! flat key/value lists; an odd-length list carries a reference to its parent
//! in slot 0 and inherits every key it does not redefine.
//!
//! Both walks are bounded by a maximum depth so that cycles terminate.

mod format;
mod getters;
mod value;

use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;
use regex::Regex;

use crate::error::{Error, Result};
use crate::index::{IdItem, ResType};
use crate::manager::ResourcePackageManager;
use crate::package::{QualifierVariant, ResourceQuery};

pub use format::{FormatArg, format_string};
pub use value::{DimensionUnit, ResolvedValue, parse_boolean, parse_color, parse_float, parse_integer};

fn reference_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^\$([a-z]+):(.*)$").ok())
        .as_ref()
}

/// A parsed `$<type>:<id>` reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceRef {
    pub res_type: ResType,
    pub id: u32,
}

impl ResourceRef {
    /// Parse `value` as a reference.
    ///
    /// Anything that is not a known type name followed by a `u32` id is a
    /// literal and yields `None`.
    pub fn parse(value: &str) -> Option<Self> {
        let captures = reference_pattern()?.captures(value)?;
        let res_type = ResType::from_ref_name(&captures[1])?;
        let id = captures[2].parse().ok()?;
        Some(Self { res_type, id })
    }
}

/// Follows references against one manager's current configuration.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceResolver<'a> {
    manager: &'a ResourcePackageManager,
    max_depth: usize,
    use_override: bool,
    density: u32,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(manager: &'a ResourcePackageManager) -> Self {
        Self {
            manager,
            max_depth: manager.options().max_reference_depth,
            use_override: false,
            density: 0,
        }
    }

    /// Resolve against the active config merged with the override config.
    #[must_use]
    pub fn with_override(mut self, use_override: bool) -> Self {
        self.use_override = use_override;
        self
    }

    /// Explicit target density; `0` uses the configuration's own.
    #[must_use]
    pub fn with_density(mut self, density: u32) -> Self {
        self.density = density;
        self
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn manager(&self) -> &'a ResourcePackageManager {
        self.manager
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Best variant for `query` and its decoded item.
    pub fn find(&self, query: &ResourceQuery) -> Result<(QualifierVariant, Arc<IdItem>)> {
        let variant = self
            .manager
            .find_best_variant(query, self.use_override, self.density)?;
        let item = variant.value.item()?;
        Ok((variant, item))
    }

    /// Like [`find`](Self::find), but the item must be of type `expected`.
    pub fn find_typed(
        &self,
        query: &ResourceQuery,
        expected: ResType,
    ) -> Result<(QualifierVariant, Arc<IdItem>)> {
        let (variant, item) = self.find(query)?;
        if item.res_type != expected {
            return Err(Error::TypeMismatch {
                id: variant.id,
                expected,
                found: item.res_type,
            });
        }
        Ok((variant, item))
    }

    fn follow(&self, reference: ResourceRef) -> Result<String> {
        if reference.res_type.is_array() {
            return Err(Error::InvalidArgument(format!(
                "{} resource {:#x} cannot be referenced as a value",
                reference.res_type, reference.id
            )));
        }
        let (_, item) = self.find_typed(&ResourceQuery::Id(reference.id), reference.res_type)?;
        item.value_str().map(str::to_string).ok_or(Error::TypeMismatch {
            id: reference.id,
            expected: reference.res_type,
            found: item.res_type,
        })
    }

    /// Follow `value` through references until it is a literal.
    ///
    /// A chain of exactly `max_depth` references resolves; one more fails
    /// with [`Error::ReferenceTooDeep`].
    pub fn resolve_reference(&self, value: &str) -> Result<String> {
        let mut current = value.to_string();
        for _ in 0..self.max_depth {
            let Some(reference) = ResourceRef::parse(&current) else {
                return Ok(current);
            };
            current = self.follow(reference)?;
        }
        if ResourceRef::parse(&current).is_some() {
            tracing::warn!("Reference chain from '{}' exceeds {} steps", value, self.max_depth);
            return Err(Error::ReferenceTooDeep {
                value: value.to_string(),
                depth: self.max_depth,
            });
        }
        Ok(current)
    }

    /// Flatten a pattern or theme and its ancestors into one map.
    ///
    /// Keys defined closer to `item` win. Every value is resolved, and any
    /// failure fails the whole map. The depth limit counts parents across the
    /// whole chain.
    pub fn resolve_parent_chain(&self, item: &IdItem) -> Result<IndexMap<String, String>> {
        if !matches!(item.res_type, ResType::Pattern | ResType::Theme) {
            return Err(Error::InvalidArgument(format!(
                "'{}' is a {}, not a pattern or theme",
                item.name, item.res_type
            )));
        }

        let mut resolved = IndexMap::new();
        let mut current = Arc::new(item.clone());
        let mut depth = 0;
        loop {
            let values = current.values();
            let (parent, pairs) = if values.len() % 2 == 1 {
                (Some(values[0].clone()), &values[1..])
            } else {
                (None, values)
            };
            for pair in pairs.chunks_exact(2) {
                if !resolved.contains_key(&pair[0]) {
                    let value = self.resolve_reference(&pair[1])?;
                    resolved.insert(pair[0].clone(), value);
                }
            }

            let Some(parent) = parent else {
                return Ok(resolved);
            };
            depth += 1;
            if depth > self.max_depth {
                tracing::warn!("Parent chain of '{}' exceeds {} levels", item.name, self.max_depth);
                return Err(Error::ReferenceTooDeep {
                    value: item.name.clone(),
                    depth: self.max_depth,
                });
            }
            let reference = ResourceRef::parse(&parent).ok_or_else(|| {
                Error::InvalidArgument(format!("parent '{parent}' of '{}' is not a reference", item.name))
            })?;
            if reference.res_type != item.res_type {
                return Err(Error::TypeMismatch {
                    id: reference.id,
                    expected: item.res_type,
                    found: reference.res_type,
                });
            }
            let (_, next) = self.find_typed(&ResourceQuery::Id(reference.id), item.res_type)?;
            current = next;
        }
    }
}
