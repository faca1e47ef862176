use std::collections::BTreeMap;

use log::debug;

use layoutcheck_api::{
    catalog::{CatalogEntry, DeviceCatalog},
    error::{DeviceDiscoveryError, LayoutCheckError, ReportError},
};

/// Device names known to a catalog, captured once.
///
/// Enumerating a catalog can be slow, so lookups are answered from the
/// captured entries. Devices that appear after `populate` are invisible
/// until the cache is invalidated or populated again.
#[derive(Debug, Default, Clone)]
pub struct DeviceNameCache {
    entries: Option<BTreeMap<String, CatalogEntry>>,
}

impl DeviceNameCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_populated(&self) -> bool {
        self.entries.is_some()
    }

    /// Replaces the cached entries with a fresh enumeration of `catalog`.
    pub fn populate(&mut self, catalog: &impl DeviceCatalog) -> Result<(), LayoutCheckError> {
        let entries = catalog
            .enumerate()
            .structured(DeviceDiscoveryError::EnumerateDevices)?;
        debug!("Cached {} device name(s)", entries.len());

        self.entries = Some(
            entries
                .into_iter()
                .map(|entry| (entry.name.clone(), entry))
                .collect(),
        );
        Ok(())
    }

    /// Populates the cache unless it already is.
    pub fn ensure_populated(
        &mut self,
        catalog: &impl DeviceCatalog,
    ) -> Result<(), LayoutCheckError> {
        if !self.is_populated() {
            self.populate(catalog)?;
        }
        Ok(())
    }

    pub fn invalidate(&mut self) {
        self.entries = None;
    }

    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.as_ref()?.get(name)
    }

    /// Cached entries, ordered by name.
    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter().flat_map(|entries| entries.values())
    }

    /// Whether `name` is a cached disk realized on hardware.
    pub fn is_real_disk(&self, name: &str) -> bool {
        self.get(name).is_some_and(|entry| entry.real_disk)
    }
}

#[cfg(test)]
mod tests {
    use layoutcheck_api::{
        layout::{
            device::{Device, DeviceKind},
            devicetree::DeviceTree,
        },
        primitives::bytes::ByteCount,
    };

    use super::*;

    fn tree(names: &[&str]) -> DeviceTree {
        DeviceTree::new(
            names
                .iter()
                .map(|name| {
                    let kind = if name.ends_with(|c: char| c.is_ascii_digit()) {
                        DeviceKind::Partition
                    } else {
                        DeviceKind::Disk
                    };
                    Device::new(*name, kind, ByteCount::from_mib(1))
                })
                .collect(),
        )
    }

    #[test]
    fn test_populate_and_invalidate() {
        let mut cache = DeviceNameCache::new();
        assert!(!cache.is_populated());
        assert!(!cache.is_real_disk("sda"));

        cache.populate(&tree(&["sdb", "sda", "sda1"])).unwrap();
        assert!(cache.is_populated());
        assert!(cache.is_real_disk("sda"));
        assert!(!cache.is_real_disk("sda1"));
        assert!(!cache.is_real_disk("sdc"));

        let names: Vec<_> = cache.entries().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["sda", "sda1", "sdb"]);

        cache.invalidate();
        assert!(!cache.is_populated());
        assert_eq!(cache.entries().count(), 0);
    }

    #[test]
    fn test_stale_until_repopulated() {
        let mut cache = DeviceNameCache::new();
        cache.ensure_populated(&tree(&["sda"])).unwrap();

        // Already populated, so the new disk is not seen
        cache.ensure_populated(&tree(&["sda", "sdb"])).unwrap();
        assert!(!cache.is_real_disk("sdb"));

        cache.populate(&tree(&["sda", "sdb"])).unwrap();
        assert!(cache.is_real_disk("sdb"));
    }
}
