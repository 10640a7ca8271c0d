//! Lazy index layout
//!
//! ```text
//! header   version[128] | length u32 | key_count u32 | data_block_offset u32
//! key      "KEYS" | config_id u32 | param_count u32 | (type u32, value u32)*
//! ids      "IDSS" | length u32 | type_count u32 | id_count u32
//! type     type u32 | length u32 | count u32
//! item     res_id u32 | offset u32 | name_len u32 | name
//! -- data block --
//! res_info res_id u32 | length u32 | value_count u32 | (config_id u32, value_offset u32)*
//! string   len u16 | bytes | NUL
//! array    total u16 | (len u16 | bytes | NUL)*
//! ```
//!
//! Only keys and the id table are read up front. The per-id value table and
//! each value are decoded on first access from the retained buffer.

use std::collections::HashMap;
use std::sync::Arc;

use super::cursor::ByteReader;
use super::eager::read_key_params;
use super::table::{Candidate, LazySource, LazyValue, ResourceTable, TableBuilder, ValueHandle};
use super::types::{IdItem, ItemValue, ResType};
use super::{DecodeOptions, IDSS_TAG, IndexDecoder, IndexFormat, KEYS_TAG, VERSION_LEN};
use crate::error::{Error, Result};

/// Decoder for the lazy layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct LazyDecoder;

impl IndexDecoder for LazyDecoder {
    fn format(&self) -> IndexFormat {
        IndexFormat::Lazy
    }

    fn decode(&self, data: Arc<[u8]>, _options: &DecodeOptions) -> Result<ResourceTable> {
        let mut reader = ByteReader::new(&data);
        reader.skip(VERSION_LEN)?;
        let length = reader.read_u32()?;
        let key_count = reader.read_u32()?;
        let data_block_offset = reader.read_usize()?;
        if key_count == 0 || length == 0 || data_block_offset > data.len() {
            return Err(Error::malformed(
                format!(
                    "header declares length {length}, {key_count} keys, data block at {data_block_offset}"
                ),
                VERSION_LEN,
            ));
        }

        let mut builder = TableBuilder::new();
        let mut config_keys = HashMap::new();
        for _ in 0..key_count {
            reader.expect_tag(KEYS_TAG)?;
            let config_id = reader.read_u32()?;
            let param_count = reader.read_usize()?;
            let params = read_key_params(&mut reader, param_count)?;
            config_keys.insert(config_id, builder.add_key(params));
        }
        let source = Arc::new(LazySource {
            data: Arc::clone(&data),
            config_keys,
        });

        let ids_start = reader.position();
        reader.expect_tag(IDSS_TAG)?;
        let ids_length = reader.read_usize()?;
        let type_count = reader.read_u32()?;
        let id_count = reader.read_u32()?;
        // a key set without any resources has neither types nor ids
        if ids_start + ids_length > data_block_offset || (type_count == 0) != (id_count == 0) {
            return Err(Error::malformed(
                format!("id block declares length {ids_length}, {type_count} types, {id_count} ids"),
                ids_start,
            ));
        }

        for _ in 0..type_count {
            let type_start = reader.position();
            let raw_type = reader.read_u32()?;
            let type_length = reader.read_usize()?;
            let count = reader.read_u32()?;
            let res_type = ResType::from_u32(raw_type)
                .ok_or_else(|| Error::malformed(format!("resource type {raw_type} out of range"), type_start))?;
            if type_start + type_length > data_block_offset || count > id_count {
                return Err(Error::malformed(
                    format!("type {res_type} declares length {type_length} and {count} items"),
                    type_start,
                ));
            }
            for _ in 0..count {
                let res_id = reader.read_u32()?;
                let offset = reader.read_usize()?;
                let name_len = reader.read_usize()?;
                let name = reader.read_text(name_len)?.trim_end_matches('\0').to_string();
                builder.push_deferred(res_id, res_type, name, &source, offset);
            }
        }

        if reader.position() != data_block_offset {
            return Err(Error::malformed(
                format!("id block ends before data block offset {data_block_offset}"),
                reader.position(),
            ));
        }
        Ok(builder.finish(IndexFormat::Lazy))
    }
}

/// Decode the value table of one id.
pub(crate) fn decode_candidates(
    source: &Arc<LazySource>,
    id: u32,
    offset: usize,
    res_type: ResType,
    name: &str,
) -> Result<Vec<Candidate>> {
    let mut reader = ByteReader::at(&source.data, offset)?;
    let res_id = reader.read_u32()?;
    if res_id != id {
        return Err(Error::malformed(
            format!("value table for {id:#x} names resource {res_id:#x}"),
            offset,
        ));
    }
    let _length = reader.read_u32()?;
    let value_count = reader.read_u32()?;

    let mut candidates = Vec::new();
    for _ in 0..value_count {
        let item_start = reader.position();
        let config_id = reader.read_u32()?;
        let value_offset = reader.read_usize()?;
        let key = *source
            .config_keys
            .get(&config_id)
            .ok_or_else(|| Error::malformed(format!("unknown config id {config_id}"), item_start))?;
        let value = LazyValue::new(Arc::clone(&source.data), value_offset, res_type, name.to_string());
        candidates.push(Candidate {
            key,
            value: ValueHandle::Deferred(Arc::new(value)),
        });
    }
    Ok(candidates)
}

/// Decode one value.
pub(crate) fn decode_value(data: &[u8], offset: usize, res_type: ResType, name: &str) -> Result<IdItem> {
    let mut reader = ByteReader::at(data, offset)?;
    let value = if res_type.is_array() {
        ItemValue::Array(read_array(&mut reader)?)
    } else {
        let len = reader.read_u16()? as usize;
        ItemValue::Single(reader.read_text(len)?)
    };
    Ok(IdItem {
        res_type,
        value,
        name: name.to_string(),
    })
}

fn read_array(reader: &mut ByteReader<'_>) -> Result<Vec<String>> {
    let arr_len = reader.read_u16()? as usize;
    let start = reader.position();
    let mut values = Vec::new();
    while reader.position() - start < arr_len {
        let len = reader.read_u16()? as usize;
        values.push(reader.read_text(len)?);
        reader.skip(1)?;
    }
    if reader.position() - start != arr_len {
        return Err(Error::malformed(
            format!("array elements overrun declared length {arr_len}"),
            start,
        ));
    }
    Ok(values)
}
