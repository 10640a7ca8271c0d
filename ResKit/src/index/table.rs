//! In-memory candidate table produced by both index decoders

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, OnceLock};

use super::lazy;
use super::types::{IdItem, ResType};
use super::IndexFormat;
use crate::error::Result;
use crate::res_config::{ColorMode, KeyParam, ResConfig};

/// One qualifier key of the index and the configuration it decodes to.
#[derive(Debug, Clone)]
pub struct ResKey {
    pub params: Vec<KeyParam>,
    pub config: Arc<ResConfig>,
    /// The same configuration with an unset color mode read as light.
    pub light: Arc<ResConfig>,
}

impl ResKey {
    fn new(params: Vec<KeyParam>) -> Self {
        let config = ResConfig::from_key_params(&params);
        let light = config.as_light_default();
        Self {
            params,
            config: Arc::new(config),
            light: Arc::new(light),
        }
    }
}

/// Buffer shared by every deferred value of a lazily decoded table.
#[derive(Debug)]
pub(crate) struct LazySource {
    pub(crate) data: Arc<[u8]>,
    /// Config id from the index to position in [`ResourceTable::keys`].
    pub(crate) config_keys: HashMap<u32, usize>,
}

/// A value that is either decoded or decoded on first access.
#[derive(Debug, Clone)]
pub enum ValueHandle {
    Ready(Arc<IdItem>),
    Deferred(Arc<LazyValue>),
}

impl ValueHandle {
    /// The decoded item, decoding it now if needed.
    pub fn item(&self) -> Result<Arc<IdItem>> {
        match self {
            ValueHandle::Ready(item) => Ok(Arc::clone(item)),
            ValueHandle::Deferred(lazy) => lazy.get(),
        }
    }

    #[must_use]
    pub fn res_type(&self) -> ResType {
        match self {
            ValueHandle::Ready(item) => item.res_type,
            ValueHandle::Deferred(lazy) => lazy.res_type,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            ValueHandle::Ready(item) => &item.name,
            ValueHandle::Deferred(lazy) => &lazy.name,
        }
    }
}

/// Memoised accessor for one value in a lazily decoded buffer.
///
/// Holds its own reference to the buffer so the bytes outlive every handle.
#[derive(Debug)]
pub struct LazyValue {
    data: Arc<[u8]>,
    offset: usize,
    res_type: ResType,
    name: String,
    cell: OnceLock<Arc<IdItem>>,
}

impl LazyValue {
    pub(crate) fn new(data: Arc<[u8]>, offset: usize, res_type: ResType, name: String) -> Self {
        Self {
            data,
            offset,
            res_type,
            name,
            cell: OnceLock::new(),
        }
    }

    pub fn get(&self) -> Result<Arc<IdItem>> {
        if let Some(item) = self.cell.get() {
            return Ok(Arc::clone(item));
        }
        let decoded = Arc::new(lazy::decode_value(&self.data, self.offset, self.res_type, &self.name)?);
        Ok(Arc::clone(self.cell.get_or_init(|| decoded)))
    }

    #[must_use]
    pub fn is_decoded(&self) -> bool {
        self.cell.get().is_some()
    }
}

/// One variant of an id: the key it was declared under and its value.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub key: usize,
    pub value: ValueHandle,
}

#[derive(Debug)]
enum Candidates {
    Decoded(Vec<Candidate>),
    Deferred {
        source: Arc<LazySource>,
        offset: usize,
        cell: OnceLock<Vec<Candidate>>,
    },
}

/// Every candidate of one resource id.
#[derive(Debug)]
pub struct TableEntry {
    pub id: u32,
    pub res_type: ResType,
    pub name: String,
    candidates: Candidates,
}

impl TableEntry {
    /// The candidate list, decoding the per-id value table on first access.
    pub fn candidates(&self) -> Result<&[Candidate]> {
        match &self.candidates {
            Candidates::Decoded(list) => Ok(list),
            Candidates::Deferred { source, offset, cell } => {
                if let Some(list) = cell.get() {
                    return Ok(list);
                }
                let decoded = lazy::decode_candidates(source, self.id, *offset, self.res_type, &self.name)?;
                Ok(cell.get_or_init(|| decoded))
            }
        }
    }
}

/// Decoded contents of one resource index.
#[derive(Debug)]
pub struct ResourceTable {
    format: IndexFormat,
    keys: Vec<ResKey>,
    entries: Vec<TableEntry>,
    by_id: HashMap<u32, usize>,
    by_name: HashMap<(ResType, String), usize>,
    limit_keys: u32,
    locales: BTreeSet<String>,
    has_dark: bool,
}

/// One row of [`ResourceTable::snapshot`]: qualifier path and decoded item.
pub type SnapshotRow = (String, IdItem);

impl ResourceTable {
    #[must_use]
    pub fn format(&self) -> IndexFormat {
        self.format
    }

    #[must_use]
    pub fn keys(&self) -> &[ResKey] {
        &self.keys
    }

    #[must_use]
    pub fn key(&self, index: usize) -> Option<&ResKey> {
        self.keys.get(index)
    }

    pub fn entries(&self) -> impl Iterator<Item = &TableEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn entry(&self, id: u32) -> Option<&TableEntry> {
        self.by_id.get(&id).map(|&i| &self.entries[i])
    }

    #[must_use]
    pub fn entry_by_name(&self, name: &str, res_type: ResType) -> Option<&TableEntry> {
        self.by_name
            .get(&(res_type, name.to_string()))
            .map(|&i| &self.entries[i])
    }

    /// Bit `1 << key_type` for every key dimension used by any key.
    #[must_use]
    pub fn limit_keys(&self) -> u32 {
        self.limit_keys
    }

    /// `language[-Script][-REGION]` of every key that names a language.
    #[must_use]
    pub fn locales(&self) -> &BTreeSet<String> {
        &self.locales
    }

    /// Whether any key selects dark color mode.
    #[must_use]
    pub fn has_dark(&self) -> bool {
        self.has_dark
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fully decoded, ordered view of the table, for comparing decoders.
    pub fn snapshot(&self) -> Result<BTreeMap<u32, Vec<SnapshotRow>>> {
        let mut out = BTreeMap::new();
        for entry in &self.entries {
            let mut rows = Vec::new();
            for candidate in entry.candidates()? {
                let qualifier = self
                    .keys
                    .get(candidate.key)
                    .map(|k| k.config.qualifier_path())
                    .unwrap_or_default();
                rows.push((qualifier, (*candidate.value.item()?).clone()));
            }
            rows.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.value.cmp(&b.1.value)));
            if !rows.is_empty() {
                out.insert(entry.id, rows);
            }
        }
        Ok(out)
    }
}

/// Incremental construction of a [`ResourceTable`] shared by both decoders.
#[derive(Debug)]
pub(crate) struct TableBuilder {
    keys: Vec<ResKey>,
    entries: Vec<TableEntry>,
    by_id: HashMap<u32, usize>,
    by_name: HashMap<(ResType, String), usize>,
    limit_keys: u32,
    locales: BTreeSet<String>,
    has_dark: bool,
}

impl TableBuilder {
    pub(crate) fn new() -> Self {
        Self {
            keys: Vec::new(),
            entries: Vec::new(),
            by_id: HashMap::new(),
            by_name: HashMap::new(),
            limit_keys: 0,
            locales: BTreeSet::new(),
            has_dark: false,
        }
    }

    /// Register a key, folding it into the limit-key mask, locale set and dark flag.
    pub(crate) fn add_key(&mut self, params: Vec<KeyParam>) -> usize {
        for param in &params {
            if let Some(key_type) = param.key_type() {
                self.limit_keys |= key_type.limit_bit();
            }
        }
        let key = ResKey::new(params);
        if let Some(locale) = key.config.locale() {
            if locale.language.is_some() {
                self.locales.insert(locale.to_tag());
            }
        }
        if key.config.color_mode() == ColorMode::Dark {
            self.has_dark = true;
        }
        self.keys.push(key);
        self.keys.len() - 1
    }

    pub(crate) fn key_config(&self, key: usize) -> Option<&Arc<ResConfig>> {
        self.keys.get(key).map(|k| &k.config)
    }

    /// Append an eagerly decoded candidate for `id`.
    pub(crate) fn push_candidate(&mut self, id: u32, key: usize, item: IdItem) {
        let res_type = item.res_type;
        let name = item.name.clone();
        let index = self.entry_index(id, res_type, &name);
        if let Candidates::Decoded(list) = &mut self.entries[index].candidates {
            list.push(Candidate {
                key,
                value: ValueHandle::Ready(Arc::new(item)),
            });
        }
    }

    /// Register an id whose candidates live at `offset` in a lazy buffer.
    pub(crate) fn push_deferred(&mut self, id: u32, res_type: ResType, name: String, source: &Arc<LazySource>, offset: usize) {
        let entry = TableEntry {
            id,
            res_type,
            name: name.clone(),
            candidates: Candidates::Deferred {
                source: Arc::clone(source),
                offset,
                cell: OnceLock::new(),
            },
        };
        let index = match self.by_id.get(&id) {
            Some(&existing) => {
                self.entries[existing] = entry;
                existing
            }
            None => {
                self.entries.push(entry);
                self.by_id.insert(id, self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        self.by_name.insert((res_type, name), index);
    }

    fn entry_index(&mut self, id: u32, res_type: ResType, name: &str) -> usize {
        if let Some(&index) = self.by_id.get(&id) {
            return index;
        }
        self.entries.push(TableEntry {
            id,
            res_type,
            name: name.to_string(),
            candidates: Candidates::Decoded(Vec::new()),
        });
        let index = self.entries.len() - 1;
        self.by_id.insert(id, index);
        self.by_name.insert((res_type, name.to_string()), index);
        index
    }

    pub(crate) fn finish(self, format: IndexFormat) -> ResourceTable {
        ResourceTable {
            format,
            keys: self.keys,
            entries: self.entries,
            by_id: self.by_id,
            by_name: self.by_name,
            limit_keys: self.limit_keys,
            locales: self.locales,
            has_dark: self.has_dark,
        }
    }
}
