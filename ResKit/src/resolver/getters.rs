//! Typed accessors
//!
//! Each getter takes an id or a `(name, type)` query, checks the stored type,
//! resolves references and parses the literal. Array results are
//! all-or-nothing.

use std::path::PathBuf;

use indexmap::IndexMap;

use super::format::{FormatArg, format_string};
use super::value::{DimensionUnit, ResolvedValue, parse_boolean, parse_color, parse_float, parse_integer};
use super::ReferenceResolver;
use crate::error::{Error, Result};
use crate::index::{IdItem, ResType};
use crate::package::ResourceQuery;
use crate::plural::PluralCategory;

impl ReferenceResolver<'_> {
    fn single(&self, query: impl Into<ResourceQuery>, expected: ResType) -> Result<String> {
        let (variant, item) = self.find_typed(&query.into(), expected)?;
        let value = item.value_str().ok_or(Error::TypeMismatch {
            id: variant.id,
            expected,
            found: item.res_type,
        })?;
        self.resolve_reference(value)
    }

    fn resolve_all(&self, item: &IdItem) -> Result<Vec<String>> {
        item.values()
            .iter()
            .map(|value| self.resolve_reference(value))
            .collect()
    }

    pub fn get_string(&self, query: impl Into<ResourceQuery>) -> Result<String> {
        self.single(query, ResType::String)
    }

    /// [`get_string`](Self::get_string) with its placeholders filled from `args`.
    pub fn get_string_format(&self, query: impl Into<ResourceQuery>, args: &[FormatArg]) -> Result<String> {
        format_string(&self.get_string(query)?, args)
    }

    pub fn get_symbol(&self, query: impl Into<ResourceQuery>) -> Result<String> {
        self.single(query, ResType::Symbol)
    }

    pub fn get_boolean(&self, query: impl Into<ResourceQuery>) -> Result<bool> {
        parse_boolean(&self.single(query, ResType::Boolean)?)
    }

    pub fn get_integer(&self, query: impl Into<ResourceQuery>) -> Result<i32> {
        parse_integer(&self.single(query, ResType::Integer)?)
    }

    /// Number and optional `px`/`vp`/`fp` unit.
    pub fn get_float(&self, query: impl Into<ResourceQuery>) -> Result<(f32, Option<DimensionUnit>)> {
        parse_float(&self.single(query, ResType::Float)?)
    }

    /// Color as `0xAARRGGBB`.
    pub fn get_color(&self, query: impl Into<ResourceQuery>) -> Result<u32> {
        parse_color(&self.single(query, ResType::Color)?)
    }

    pub fn get_string_array(&self, query: impl Into<ResourceQuery>) -> Result<Vec<String>> {
        let (_, item) = self.find_typed(&query.into(), ResType::StringArray)?;
        self.resolve_all(&item)
    }

    pub fn get_int_array(&self, query: impl Into<ResourceQuery>) -> Result<Vec<i32>> {
        let (_, item) = self.find_typed(&query.into(), ResType::IntArray)?;
        self.resolve_all(&item)?
            .iter()
            .map(|value| parse_integer(value))
            .collect()
    }

    /// Plural entries as category to resolved text.
    pub fn get_plurals(&self, query: impl Into<ResourceQuery>) -> Result<IndexMap<String, String>> {
        let (_, item) = self.find_typed(&query.into(), ResType::Plurals)?;
        item.values()
            .chunks_exact(2)
            .map(|pair| Ok((pair[0].clone(), self.resolve_reference(&pair[1])?)))
            .collect()
    }

    /// Text for `quantity` in the language of the effective configuration.
    ///
    /// Falls back to the `other` entry when the selected category is missing.
    pub fn get_plural_string(&self, query: impl Into<ResourceQuery>, quantity: f64) -> Result<String> {
        let query = query.into();
        let entries = self.get_plurals(query.clone())?;
        let language = self
            .manager
            .effective_config(self.use_override)
            .and_then(|config| config.locale().and_then(|locale| locale.language.clone()))
            .unwrap_or_default();
        let category = self.manager.plurals().select(&language, quantity)?;
        entries
            .get(category.as_str())
            .or_else(|| entries.get(PluralCategory::Other.as_str()))
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("plural '{category}' of {query}")))
    }

    pub fn get_plural_string_format(
        &self,
        query: impl Into<ResourceQuery>,
        quantity: f64,
        args: &[FormatArg],
    ) -> Result<String> {
        format_string(&self.get_plural_string(query, quantity)?, args)
    }

    pub fn get_pattern(&self, query: impl Into<ResourceQuery>) -> Result<IndexMap<String, String>> {
        let (_, item) = self.find_typed(&query.into(), ResType::Pattern)?;
        self.resolve_parent_chain(&item)
    }

    pub fn get_theme(&self, query: impl Into<ResourceQuery>) -> Result<IndexMap<String, String>> {
        let (_, item) = self.find_typed(&query.into(), ResType::Theme)?;
        self.resolve_parent_chain(&item)
    }

    /// Path of a media resource, joined onto the root of the package it came from.
    pub fn get_media_path(&self, query: impl Into<ResourceQuery>) -> Result<PathBuf> {
        let (variant, item) = self.find_typed(&query.into(), ResType::Media)?;
        let value = item.value_str().ok_or(Error::TypeMismatch {
            id: variant.id,
            expected: ResType::Media,
            found: item.res_type,
        })?;
        let relative = self.resolve_reference(value)?;
        Ok(variant.package.resources_root().join(relative))
    }

    /// Resolve whatever `query` names into the matching [`ResolvedValue`].
    pub fn resolve(&self, query: impl Into<ResourceQuery>) -> Result<ResolvedValue> {
        let (variant, item) = self.find(&query.into())?;
        let scalar = || match item.value_str() {
            Some(value) => self.resolve_reference(value),
            None => Err(Error::TypeMismatch {
                id: variant.id,
                expected: item.res_type,
                found: item.res_type,
            }),
        };
        let resolved = match item.res_type {
            ResType::Boolean => ResolvedValue::Bool(parse_boolean(&scalar()?)?),
            ResType::Integer => ResolvedValue::Int(parse_integer(&scalar()?)?),
            ResType::Float => {
                let (value, unit) = parse_float(&scalar()?)?;
                ResolvedValue::Float { value, unit }
            }
            ResType::Color => ResolvedValue::Color(parse_color(&scalar()?)?),
            ResType::Media => ResolvedValue::Media(variant.package.resources_root().join(scalar()?)),
            ResType::Pattern | ResType::Theme => ResolvedValue::Map(self.resolve_parent_chain(&item)?),
            ResType::Plurals => ResolvedValue::Map(
                item.values()
                    .chunks_exact(2)
                    .map(|pair| Ok((pair[0].clone(), self.resolve_reference(&pair[1])?)))
                    .collect::<Result<_>>()?,
            ),
            _ if item.is_array() => ResolvedValue::Array(self.resolve_all(&item)?),
            _ => ResolvedValue::Str(scalar()?),
        };
        tracing::trace!("Resolved {:#x} ({}) to {}", variant.id, item.res_type, resolved);
        Ok(resolved)
    }
}
