//! Resource index writing
//!
//! SPDX-FileCopyrightText: 2025 `CyberDeco`
//!
//! SPDX-License-Identifier: MIT

#![allow(clippy::cast_possible_truncation)]

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};

use super::types::{IdItem, ItemValue, ResType};
use super::{EAGER_HEADER_LEN, IDSS_TAG, IndexFormat, KEYS_TAG, LAZY_HEADER_LEN, VERSION_LEN};
use crate::error::{Error, Result};
use crate::res_config::{KeyParam, ResConfig};

const KEY_HEADER_LEN: usize = 12;
const KEY_PARAM_LEN: usize = 8;
const IDS_HEADER_LEN: usize = 16;
const TYPE_INFO_LEN: usize = 12;
const RES_ITEM_LEN: usize = 12;
const RES_INFO_LEN: usize = 12;
const CONFIG_ITEM_LEN: usize = 8;
const ITEM_HEADER_LEN: usize = 12;

#[derive(Debug, Clone)]
struct Entry {
    key: usize,
    id: u32,
    item: IdItem,
}

/// In-memory description of an index that can be serialised in either layout.
#[derive(Debug, Clone)]
pub struct IndexWriter {
    version: String,
    keys: Vec<Vec<KeyParam>>,
    entries: Vec<Entry>,
}

impl Default for IndexWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexWriter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: format!("ResKit {}", crate::VERSION),
            keys: Vec::new(),
            entries: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Add a key for a configuration; returns its index.
    pub fn add_key(&mut self, config: &ResConfig) -> Result<usize> {
        Ok(self.add_key_params(config.to_key_params()?))
    }

    /// Add a key from raw parameters; returns its index.
    pub fn add_key_params(&mut self, params: Vec<KeyParam>) -> usize {
        self.keys.push(params);
        self.keys.len() - 1
    }

    /// Declare `item` as the value of `id` under key `key`.
    pub fn add_value(&mut self, key: usize, id: u32, item: IdItem) -> Result<()> {
        if key >= self.keys.len() {
            return Err(Error::InvalidArgument(format!(
                "key {key} does not exist ({} keys)",
                self.keys.len()
            )));
        }
        if item.res_type.is_array() != item.is_array() {
            return Err(Error::InvalidArgument(format!(
                "{} value '{}' must {}be an array",
                item.res_type,
                item.name,
                if item.res_type.is_array() { "" } else { "not " }
            )));
        }
        if let Some(existing) = self.entries.iter().find(|e| e.id == id) {
            if existing.item.res_type != item.res_type {
                return Err(Error::InvalidArgument(format!(
                    "id {id:#x} already declared as {}",
                    existing.item.res_type
                )));
            }
        }
        self.entries.push(Entry { key, id, item });
        Ok(())
    }

    #[must_use]
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    pub fn to_bytes(&self, format: IndexFormat) -> Result<Vec<u8>> {
        match format {
            IndexFormat::Eager => self.to_eager_bytes(),
            IndexFormat::Lazy => self.to_lazy_bytes(),
        }
    }

    /// Serialise and write to `path`.
    pub fn write_to<P: AsRef<Path>>(&self, path: P, format: IndexFormat) -> Result<()> {
        fs::write(path, self.to_bytes(format)?)?;
        Ok(())
    }

    // ==================== Eager layout ====================

    pub fn to_eager_bytes(&self) -> Result<Vec<u8>> {
        let items = self
            .entries
            .iter()
            .map(|e| encode_eager_item(e.id, &e.item))
            .collect::<Result<Vec<_>>>()?;
        let per_key: Vec<Vec<usize>> = (0..self.keys.len())
            .map(|k| (0..self.entries.len()).filter(|&i| self.entries[i].key == k).collect())
            .collect();

        let keys_len: usize = self.keys.iter().map(|p| KEY_HEADER_LEN + p.len() * KEY_PARAM_LEN).sum();
        let mut id_block_offsets = Vec::with_capacity(self.keys.len());
        let mut cursor = EAGER_HEADER_LEN + keys_len;
        for members in &per_key {
            id_block_offsets.push(cursor);
            cursor += 8 + members.len() * 8;
        }
        let mut item_offsets = vec![0usize; items.len()];
        for members in &per_key {
            for &i in members {
                item_offsets[i] = cursor;
                cursor += items[i].len();
            }
        }
        let total = cursor;

        let mut out = Vec::with_capacity(total);
        write_version(&mut out, &self.version)?;
        out.write_u32::<LittleEndian>(to_u32(total, "index length")?)?;
        out.write_u32::<LittleEndian>(to_u32(self.keys.len(), "key count")?)?;

        for (params, &ids_offset) in self.keys.iter().zip(&id_block_offsets) {
            out.extend_from_slice(KEYS_TAG);
            out.write_u32::<LittleEndian>(to_u32(ids_offset, "id block offset")?)?;
            write_params(&mut out, params)?;
        }
        for members in &per_key {
            out.extend_from_slice(IDSS_TAG);
            out.write_u32::<LittleEndian>(to_u32(members.len(), "id count")?)?;
            for &i in members {
                out.write_u32::<LittleEndian>(self.entries[i].id)?;
                out.write_u32::<LittleEndian>(to_u32(item_offsets[i], "item offset")?)?;
            }
        }
        for members in &per_key {
            for &i in members {
                out.extend_from_slice(&items[i]);
            }
        }
        Ok(out)
    }

    // ==================== Lazy layout ====================

    pub fn to_lazy_bytes(&self) -> Result<Vec<u8>> {
        // type -> id -> (name, [(key, item)])
        let mut grouped: BTreeMap<ResType, BTreeMap<u32, (&str, Vec<(usize, &IdItem)>)>> = BTreeMap::new();
        for entry in &self.entries {
            let slot = grouped
                .entry(entry.item.res_type)
                .or_default()
                .entry(entry.id)
                .or_insert_with(|| (entry.item.name.as_str(), Vec::new()));
            slot.1.push((entry.key, &entry.item));
        }
        for ids in grouped.values_mut() {
            for (_, values) in ids.values_mut() {
                values.sort_by_key(|(key, _)| *key);
            }
        }

        let keys_len: usize = self.keys.iter().map(|p| KEY_HEADER_LEN + p.len() * KEY_PARAM_LEN).sum();
        let ids_len: usize = IDS_HEADER_LEN
            + grouped
                .values()
                .map(|ids| TYPE_INFO_LEN + ids.values().map(|(name, _)| RES_ITEM_LEN + name.len()).sum::<usize>())
                .sum::<usize>();
        let data_block_offset = LAZY_HEADER_LEN + keys_len + ids_len;

        // data block, recording where each id's value table lands
        let mut data_block = Vec::new();
        let mut info_offsets: BTreeMap<u32, usize> = BTreeMap::new();
        for ids in grouped.values() {
            for (&id, (_, values)) in ids {
                let info_offset = data_block_offset + data_block.len();
                info_offsets.insert(id, info_offset);
                let encoded = values
                    .iter()
                    .map(|(_, item)| encode_lazy_value(item))
                    .collect::<Result<Vec<_>>>()?;
                let info_len = RES_INFO_LEN + values.len() * CONFIG_ITEM_LEN;
                data_block.write_u32::<LittleEndian>(id)?;
                data_block.write_u32::<LittleEndian>(to_u32(info_len, "value table length")?)?;
                data_block.write_u32::<LittleEndian>(to_u32(values.len(), "value count")?)?;
                let mut value_offset = info_offset + info_len;
                for ((key, _), bytes) in values.iter().zip(&encoded) {
                    data_block.write_u32::<LittleEndian>(to_u32(*key, "config id")?)?;
                    data_block.write_u32::<LittleEndian>(to_u32(value_offset, "value offset")?)?;
                    value_offset += bytes.len();
                }
                for bytes in &encoded {
                    data_block.extend_from_slice(bytes);
                }
            }
        }
        let total = data_block_offset + data_block.len();

        let mut out = Vec::with_capacity(total);
        write_version(&mut out, &self.version)?;
        out.write_u32::<LittleEndian>(to_u32(total, "index length")?)?;
        out.write_u32::<LittleEndian>(to_u32(self.keys.len(), "key count")?)?;
        out.write_u32::<LittleEndian>(to_u32(data_block_offset, "data block offset")?)?;

        for (config_id, params) in self.keys.iter().enumerate() {
            out.extend_from_slice(KEYS_TAG);
            out.write_u32::<LittleEndian>(to_u32(config_id, "config id")?)?;
            write_params(&mut out, params)?;
        }

        let id_count: usize = grouped.values().map(BTreeMap::len).sum();
        out.extend_from_slice(IDSS_TAG);
        out.write_u32::<LittleEndian>(to_u32(ids_len, "id block length")?)?;
        out.write_u32::<LittleEndian>(to_u32(grouped.len(), "type count")?)?;
        out.write_u32::<LittleEndian>(to_u32(id_count, "id count")?)?;
        for (res_type, ids) in &grouped {
            let type_len = TYPE_INFO_LEN + ids.values().map(|(name, _)| RES_ITEM_LEN + name.len()).sum::<usize>();
            out.write_u32::<LittleEndian>(*res_type as u32)?;
            out.write_u32::<LittleEndian>(to_u32(type_len, "type block length")?)?;
            out.write_u32::<LittleEndian>(to_u32(ids.len(), "type item count")?)?;
            for (id, (name, _)) in ids {
                out.write_u32::<LittleEndian>(*id)?;
                out.write_u32::<LittleEndian>(to_u32(info_offsets[id], "value table offset")?)?;
                out.write_u32::<LittleEndian>(to_u32(name.len(), "name length")?)?;
                out.extend_from_slice(name.as_bytes());
            }
        }
        out.extend_from_slice(&data_block);
        Ok(out)
    }
}

fn to_u32(value: usize, what: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::InvalidArgument(format!("{what} {value} does not fit in 32 bits")))
}

fn to_u16(value: usize, what: &str) -> Result<u16> {
    u16::try_from(value).map_err(|_| Error::InvalidArgument(format!("{what} {value} does not fit in 16 bits")))
}

fn write_version(out: &mut Vec<u8>, version: &str) -> Result<()> {
    let mut field = [0u8; VERSION_LEN];
    let bytes = version.as_bytes();
    let len = bytes.len().min(VERSION_LEN - 1);
    field[..len].copy_from_slice(&bytes[..len]);
    out.extend_from_slice(&field);
    Ok(())
}

fn write_params(out: &mut Vec<u8>, params: &[KeyParam]) -> Result<()> {
    out.write_u32::<LittleEndian>(to_u32(params.len(), "parameter count")?)?;
    for param in params {
        out.write_u32::<LittleEndian>(param.raw_type)?;
        out.write_u32::<LittleEndian>(param.value)?;
    }
    Ok(())
}

fn encode_eager_item(id: u32, item: &IdItem) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    match &item.value {
        ItemValue::Single(value) => write_eager_string(&mut body, value)?,
        ItemValue::Array(values) => {
            let total = values.iter().map(|v| 2 + v.len() + 1).sum::<usize>() + 1;
            body.write_u16::<LittleEndian>(to_u16(total, "array length")?)?;
            for value in values {
                body.write_u16::<LittleEndian>(to_u16(value.len(), "string length")?)?;
                body.extend_from_slice(value.as_bytes());
                body.write_u8(0)?;
            }
            body.write_u8(0)?;
        }
    }
    write_eager_string(&mut body, &item.name)?;

    let mut out = Vec::with_capacity(ITEM_HEADER_LEN + body.len());
    out.write_u32::<LittleEndian>(to_u32(ITEM_HEADER_LEN + body.len(), "item size")?)?;
    out.write_u32::<LittleEndian>(item.res_type as u32)?;
    out.write_u32::<LittleEndian>(id)?;
    out.extend_from_slice(&body);
    Ok(out)
}

fn write_eager_string(out: &mut Vec<u8>, value: &str) -> Result<()> {
    out.write_u16::<LittleEndian>(to_u16(value.len() + 1, "string length")?)?;
    out.extend_from_slice(value.as_bytes());
    out.write_u8(0)?;
    Ok(())
}

fn encode_lazy_value(item: &IdItem) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    match &item.value {
        ItemValue::Single(value) => {
            out.write_u16::<LittleEndian>(to_u16(value.len(), "string length")?)?;
            out.extend_from_slice(value.as_bytes());
            out.write_u8(0)?;
        }
        ItemValue::Array(values) => {
            let total = values.iter().map(|v| 2 + v.len() + 1).sum::<usize>();
            out.write_u16::<LittleEndian>(to_u16(total, "array length")?)?;
            for value in values {
                out.write_u16::<LittleEndian>(to_u16(value.len(), "string length")?)?;
                out.extend_from_slice(value.as_bytes());
                out.write_u8(0)?;
            }
        }
    }
    Ok(out)
}
