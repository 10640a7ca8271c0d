//! Overlay id remapping
//!
//! Overlays are built separately from the package they customise, so the
//! same resource usually carries a different numeric id in each. Before an
//! overlay joins a manager its ids are rewritten to the base package's ids,
//! matched by `(type, name)`. Overlay resources the base does not declare
//! keep their own id.

use std::collections::HashMap;
use std::sync::Arc;

use super::ResourcePackage;
use crate::index::ResType;

/// Mapping between the ids callers use and the ids stored in a table.
#[derive(Debug, Clone, Default)]
pub struct IdRemap {
    to_table: HashMap<u32, u32>,
    to_public: HashMap<u32, u32>,
}

impl IdRemap {
    /// Table id for a public id, `None` if nothing answers to it.
    pub fn to_table(&self, public_id: u32) -> Option<u32> {
        self.to_table.get(&public_id).copied()
    }

    pub fn to_public(&self, table_id: u32) -> u32 {
        self.to_public.get(&table_id).copied().unwrap_or(table_id)
    }

    /// Number of ids that changed.
    pub fn remapped(&self) -> usize {
        self.to_public
            .iter()
            .filter(|(table_id, public_id)| table_id != public_id)
            .count()
    }
}

impl ResourcePackage {
    /// `(type, name)` to public id for every resource in the package.
    pub fn name_type_id_mapping(&self) -> HashMap<(ResType, String), u32> {
        self.table()
            .entries()
            .map(|entry| ((entry.res_type, entry.name.clone()), self.public_id(entry.id)))
            .collect()
    }

    /// A handle on the same table whose ids follow `mapping`.
    #[must_use]
    pub fn with_remapped_ids(&self, mapping: &HashMap<(ResType, String), u32>) -> ResourcePackage {
        let mut remap = IdRemap::default();
        for entry in self.table().entries() {
            let public_id = mapping
                .get(&(entry.res_type, entry.name.clone()))
                .copied()
                .unwrap_or(entry.id);
            remap.to_table.insert(public_id, entry.id);
            remap.to_public.insert(entry.id, public_id);
        }
        tracing::debug!(
            "Remapped {} of {} ids of {}",
            remap.remapped(),
            self.table().len(),
            self.path().display()
        );
        ResourcePackage {
            meta: Arc::clone(&self.meta),
            table: Arc::clone(&self.table),
            remap: Some(Arc::new(remap)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{DecodeOptions, IdItem, IndexFormat, IndexWriter};
    use crate::package::{PackageKind, ResourceQuery};
    use crate::res_config::ResConfig;
    use std::path::PathBuf;

    fn package(path: &str, kind: PackageKind, items: &[(u32, &str, &str)]) -> ResourcePackage {
        let mut writer = IndexWriter::new();
        let base = writer.add_key(&ResConfig::new()).unwrap();
        for (id, name, value) in items {
            writer.add_value(base, *id, IdItem::single(ResType::String, *name, *value)).unwrap();
        }
        ResourcePackage::from_bytes(
            PathBuf::from(path),
            kind,
            None,
            writer.to_bytes(IndexFormat::Lazy).unwrap(),
            &DecodeOptions::all(),
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_overlay_ids_follow_base() {
        let base = package("/base/resources.index", PackageKind::APP, &[(0x0100_0001, "title", "Base")]);
        let overlay = package(
            "/overlay/resources.index",
            PackageKind::OVERLAY,
            &[(0x0100_0009, "title", "Overlay"), (0x0100_0010, "extra", "Only here")],
        );
        let remapped = overlay.with_remapped_ids(&base.name_type_id_mapping());
        assert!(remapped.shares_table(&overlay));

        let title = remapped.get_variants(&ResourceQuery::Id(0x0100_0001), false).unwrap();
        assert_eq!(title.len(), 1);
        assert_eq!(title[0].id, 0x0100_0001);
        assert_eq!(title[0].value.item().unwrap().value_str(), Some("Overlay"));

        // the overlay's own id no longer answers
        assert!(remapped.get_variants(&ResourceQuery::Id(0x0100_0009), false).unwrap().is_empty());
        // unmapped ids are kept
        assert_eq!(remapped.get_variants(&ResourceQuery::Id(0x0100_0010), false).unwrap().len(), 1);
        assert_eq!(remapped.name_type_id_mapping()[&(ResType::String, "title".to_string())], 0x0100_0001);
    }
}
