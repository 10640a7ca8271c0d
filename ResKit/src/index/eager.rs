//! Eager index layout
//!
//! ```text
//! header   version[128] | length u32 | key_count u32
//! key      "KEYS" | id_block_offset u32 | param_count u32 | (type u32, value u32)*
//! ids      "IDSS" | count u32 | (id u32, item_offset u32)*
//! item     size u32 | type u32 | id u32 | value | name
//! string   len u16 (incl. NUL) | bytes | NUL
//! array    total u16 | (len u16 | bytes | NUL)* | NUL
//! ```

use std::sync::Arc;

use super::cursor::ByteReader;
use super::table::{ResourceTable, TableBuilder};
use super::types::{IdItem, ItemValue, ResType, SelectedTypes};
use super::{DecodeOptions, IDSS_TAG, IndexDecoder, IndexFormat, KEYS_TAG, VERSION_LEN};
use crate::error::{Error, Result};
use crate::res_config::{DefaultLocaleMatcher, KeyParam, ResConfig};

/// Decoder for the eager layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct EagerDecoder;

impl IndexDecoder for EagerDecoder {
    fn format(&self) -> IndexFormat {
        IndexFormat::Eager
    }

    fn decode(&self, data: Arc<[u8]>, options: &DecodeOptions) -> Result<ResourceTable> {
        let mut reader = ByteReader::new(&data);
        reader.skip(VERSION_LEN)?;
        let length = reader.read_u32()?;
        let key_count = reader.read_u32()?;
        if key_count == 0 || length == 0 {
            return Err(Error::malformed(
                format!("header declares length {length} and {key_count} keys"),
                VERSION_LEN,
            ));
        }

        let mut builder = TableBuilder::new();
        let mut skipped = 0usize;
        for _ in 0..key_count {
            reader.expect_tag(KEYS_TAG)?;
            let ids_offset = reader.read_usize()?;
            let param_count = reader.read_usize()?;
            let params = read_key_params(&mut reader, param_count)?;
            let key = builder.add_key(params);
            let Some(config) = builder.key_config(key).cloned() else {
                continue;
            };
            if skip_key(&config, options) {
                skipped += 1;
                continue;
            }
            decode_id_block(&data, ids_offset, key, options.selected_types, &mut builder)?;
        }

        if skipped > 0 {
            tracing::debug!("Skipped {} of {} keys while decoding", skipped, key_count);
        }
        Ok(builder.finish(IndexFormat::Eager))
    }
}

/// Read `count` key parameters.
pub(crate) fn read_key_params(reader: &mut ByteReader<'_>, count: usize) -> Result<Vec<KeyParam>> {
    let mut params = Vec::new();
    for _ in 0..count {
        let raw_type = reader.read_u32()?;
        let value = reader.read_u32()?;
        params.push(KeyParam { raw_type, value });
    }
    Ok(params)
}

/// Whether a key cannot contribute to a load with these options.
fn skip_key(config: &ResConfig, options: &DecodeOptions) -> bool {
    if !options.selected_types.is_all() {
        if let Some(request) = &options.request {
            if !request.matches(config, false) {
                return true;
            }
        }
    }
    if options.load_all {
        return false;
    }
    if !config.is_locale_set() {
        return options.is_update;
    }
    options
        .request
        .as_ref()
        .is_some_and(|request| !request.locale_matches(&DefaultLocaleMatcher, config))
}

fn decode_id_block(
    data: &[u8],
    offset: usize,
    key: usize,
    selected: SelectedTypes,
    builder: &mut TableBuilder,
) -> Result<()> {
    let mut reader = ByteReader::at(data, offset)?;
    reader.expect_tag(IDSS_TAG)?;
    let count = reader.read_u32()?;
    for _ in 0..count {
        let id = reader.read_u32()?;
        let item_offset = reader.read_usize()?;
        if let Some(item) = decode_item(data, item_offset, selected)? {
            builder.push_candidate(id, key, item);
        }
    }
    Ok(())
}

fn decode_item(data: &[u8], offset: usize, selected: SelectedTypes) -> Result<Option<IdItem>> {
    let mut reader = ByteReader::at(data, offset)?;
    let _size = reader.read_u32()?;
    let raw_type = reader.read_u32()?;
    let _id = reader.read_u32()?;
    let res_type = ResType::from_u32(raw_type)
        .ok_or_else(|| Error::malformed(format!("resource type {raw_type} out of range"), offset + 4))?;
    if !selected.contains(res_type) {
        return Ok(None);
    }

    let value = if res_type.is_array() {
        ItemValue::Array(read_array(&mut reader)?)
    } else {
        ItemValue::Single(read_string(&mut reader)?)
    };
    let name = read_string(&mut reader)?;
    Ok(Some(IdItem { res_type, value, name }))
}

/// Length-prefixed string whose length counts the trailing NUL.
fn read_string(reader: &mut ByteReader<'_>) -> Result<String> {
    let start = reader.position();
    let len = reader.read_u16()? as usize;
    if len == 0 {
        return Err(Error::malformed("zero-length string", start));
    }
    let text = reader.read_text(len - 1)?;
    reader.skip(1)?;
    Ok(text)
}

/// String list prefixed by its total byte length, terminated by one NUL.
fn read_array(reader: &mut ByteReader<'_>) -> Result<Vec<String>> {
    let arr_len = reader.read_u16()? as usize;
    if arr_len <= 1 {
        reader.skip(arr_len)?;
        return Ok(Vec::new());
    }

    let start = reader.position();
    let mut values = Vec::new();
    loop {
        let len = reader.read_u16()? as usize;
        values.push(reader.read_text(len)?);
        reader.skip(1)?;

        let read = reader.position() - start;
        if read + 1 == arr_len {
            reader.skip(1)?;
            return Ok(values);
        }
        if read + 1 > arr_len {
            return Err(Error::malformed(
                format!("array elements overrun declared length {arr_len}"),
                start,
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexWriter;
    use crate::res_config::ColorMode;

    fn sample() -> Vec<u8> {
        let mut writer = IndexWriter::new();
        let base = writer.add_key(&ResConfig::new()).unwrap();
        let zh = writer.add_key(&ResConfig::new().with_locale_tag("zh-CN").unwrap()).unwrap();
        let dark = writer.add_key(&ResConfig::new().with_color_mode(ColorMode::Dark)).unwrap();
        writer.add_value(base, 0x0100_0001, IdItem::single(ResType::String, "app_name", "App")).unwrap();
        writer.add_value(zh, 0x0100_0001, IdItem::single(ResType::String, "app_name", "应用")).unwrap();
        writer.add_value(dark, 0x0100_0002, IdItem::single(ResType::Color, "bg", "#000000")).unwrap();
        writer
            .add_value(
                base,
                0x0100_0003,
                IdItem::array(ResType::StringArray, "days", vec!["mon".into(), "tue".into()]),
            )
            .unwrap();
        writer.to_eager_bytes().unwrap()
    }

    #[test]
    fn test_decode_eager() {
        let table = EagerDecoder.decode(Arc::from(sample()), &DecodeOptions::default()).unwrap();
        assert_eq!(table.format(), IndexFormat::Eager);
        assert_eq!(table.keys().len(), 3);
        assert!(table.has_dark());
        assert!(table.locales().contains("zh-CN"));

        let entry = table.entry(0x0100_0001).unwrap();
        assert_eq!(entry.candidates().unwrap().len(), 2);
        let days = table.entry_by_name("days", ResType::StringArray).unwrap();
        let item = days.candidates().unwrap()[0].value.item().unwrap();
        assert_eq!(item.values(), ["mon".to_string(), "tue".to_string()]);
    }

    #[test]
    fn test_selected_types_skip_items() {
        let options = DecodeOptions {
            selected_types: SelectedTypes::from_types([ResType::Color]),
            ..DecodeOptions::default()
        };
        let table = EagerDecoder.decode(Arc::from(sample()), &options).unwrap();
        assert!(table.entry(0x0100_0001).is_none());
        assert!(table.entry(0x0100_0002).is_some());
        // keys are still accounted for
        assert_eq!(table.keys().len(), 3);
    }

    #[test]
    fn test_locale_prefilter() {
        let options = DecodeOptions {
            request: Some(ResConfig::new().with_locale_tag("en-US").unwrap()),
            ..DecodeOptions::default()
        };
        let table = EagerDecoder.decode(Arc::from(sample()), &options).unwrap();
        let candidates = table.entry(0x0100_0001).unwrap().candidates().unwrap();
        assert_eq!(candidates.len(), 1);
        assert!(table.locales().contains("zh-CN"));

        let update = DecodeOptions { is_update: true, ..options };
        let table = EagerDecoder.decode(Arc::from(sample()), &update).unwrap();
        assert!(table.entry(0x0100_0001).is_none());
    }

    #[test]
    fn test_empty_header_rejected() {
        let mut data = sample();
        data[VERSION_LEN + 4..VERSION_LEN + 8].copy_from_slice(&0u32.to_le_bytes());
        let err = EagerDecoder.decode(Arc::from(data), &DecodeOptions::default()).unwrap_err();
        assert!(matches!(err, Error::MalformedData { .. }));
    }

    #[test]
    fn test_truncated_rejected() {
        let mut data = sample();
        data.truncate(data.len() - 3);
        let err = EagerDecoder.decode(Arc::from(data), &DecodeOptions::default()).unwrap_err();
        assert!(matches!(err, Error::AllocationFailure { .. }));
    }
}
