use anyhow::Error;
use serde::{Deserialize, Serialize};

use crate::{
    catalog::{CatalogEntry, DeviceCatalog},
    constants::{
        DEV_MAPPER_PREFIX, DEV_MD_PREFIX, DEV_PATH_PREFIX, LABEL_SPEC_PREFIX,
        PARTLABEL_SPEC_PREFIX, PARTUUID_SPEC_PREFIX, UUID_SPEC_PREFIX,
    },
};

use super::device::{Device, DeviceKind};

/// Converts a device node path into a device name. Names are returned
/// unchanged.
pub fn device_path_to_name(path: &str) -> &str {
    [DEV_MAPPER_PREFIX, DEV_MD_PREFIX, DEV_PATH_PREFIX]
        .iter()
        .find_map(|prefix| path.strip_prefix(prefix))
        .unwrap_or(path)
}

/// All devices of a layout, in discovery order.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct DeviceTree {
    devices: Vec<Device>,
}

impl DeviceTree {
    pub fn new(devices: Vec<Device>) -> Self {
        Self { devices }
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Adds a device, replacing any existing device with the same name.
    pub fn add_device(&mut self, device: Device) {
        match self.devices.iter_mut().find(|d| d.name == device.name) {
            Some(existing) => *existing = device,
            None => self.devices.push(device),
        }
    }

    /// Removes a device by name, returning it when it was present.
    pub fn remove_device(&mut self, name: &str) -> Option<Device> {
        let index = self.devices.iter().position(|d| d.name == name)?;
        Some(self.devices.remove(index))
    }

    pub fn get_device_by_name(&self, name: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.name == name)
    }

    pub fn get_device_by_name_mut(&mut self, name: &str) -> Option<&mut Device> {
        self.devices.iter_mut().find(|d| d.name == name)
    }

    /// Resolves a device specification: a name, a device node path, a
    /// symlink to a device node, or one of `LABEL=`, `UUID=`, `PARTUUID=`
    /// and `PARTLABEL=`. Symlinks may be given relative to `/dev`.
    pub fn resolve_device(&self, spec: &str) -> Option<&Device> {
        if let Some(label) = spec.strip_prefix(LABEL_SPEC_PREFIX) {
            self.devices
                .iter()
                .find(|d| d.format.label.as_deref() == Some(label))
        } else if let Some(uuid) = spec.strip_prefix(UUID_SPEC_PREFIX) {
            self.devices.iter().find(|d| {
                d.format
                    .uuid
                    .as_deref()
                    .is_some_and(|u| u.eq_ignore_ascii_case(uuid))
            })
        } else if let Some(uuid) = spec.strip_prefix(PARTUUID_SPEC_PREFIX) {
            self.devices.iter().find(|d| {
                d.part_uuid
                    .as_deref()
                    .is_some_and(|u| u.eq_ignore_ascii_case(uuid))
            })
        } else if let Some(label) = spec.strip_prefix(PARTLABEL_SPEC_PREFIX) {
            self.devices
                .iter()
                .find(|d| d.part_label.as_deref() == Some(label))
        } else {
            self.get_device_by_name(device_path_to_name(spec))
                .or_else(|| self.get_device_by_link(spec))
        }
    }

    /// Finds the device a node symlink points to.
    fn get_device_by_link(&self, link: &str) -> Option<&Device> {
        if link.is_empty() {
            return None;
        }

        let path = if link.starts_with(DEV_PATH_PREFIX) {
            link.to_string()
        } else {
            format!("{DEV_PATH_PREFIX}{link}")
        };
        self.devices.iter().find(|d| d.has_node_path(&path))
    }

    /// Partitions whose disk is `disk`.
    pub fn partitions_on<'a>(&'a self, disk: &'a str) -> impl Iterator<Item = &'a Device> + 'a {
        self.devices
            .iter()
            .filter(move |d| d.kind == DeviceKind::Partition && d.disk() == Some(disk))
    }

    /// Every device `device` is built on, directly or indirectly, nearest
    /// first. Unknown parents are skipped.
    pub fn ancestors(&self, device: &Device) -> Vec<&Device> {
        let mut ancestors: Vec<&Device> = Vec::new();
        let mut pending: Vec<&str> = device.parents.iter().map(String::as_str).collect();

        while !pending.is_empty() {
            let mut next = Vec::new();
            for name in pending {
                if ancestors.iter().any(|a| a.name == name) {
                    continue;
                }
                if let Some(parent) = self.get_device_by_name(name) {
                    next.extend(parent.parents.iter().map(String::as_str));
                    ancestors.push(parent);
                }
            }
            pending = next;
        }

        ancestors
    }
}

impl DeviceCatalog for DeviceTree {
    fn enumerate(&self) -> Result<Vec<CatalogEntry>, Error> {
        Ok(self
            .devices
            .iter()
            .map(|d| CatalogEntry {
                name: d.name.clone(),
                kind: d.kind,
                real_disk: d.is_disk(),
                links: d.links.clone(),
            })
            .collect())
    }

    fn resolve_devspec(&self, spec: &str) -> Option<String> {
        self.resolve_device(spec).map(|d| d.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use sysdefs::filesystems::FilesystemType;

    use crate::{layout::device::Format, primitives::bytes::ByteCount};

    use super::*;

    fn sample_tree() -> DeviceTree {
        let gib = ByteCount(1 << 30);
        DeviceTree::new(vec![
            Device {
                links: vec!["/dev/disk/by-id/ata-QEMU_HARDDISK_QM00001".into()],
                ..Device::new("sda", DeviceKind::Disk, gib * 100)
            },
            Device {
                links: vec![
                    "/dev/disk/by-id/ata-QEMU_HARDDISK_QM00001-part1".into(),
                    "/dev/disk/by-partuuid/b46b76eb-b2f9-441a-9686-8b24fa2b2161".into(),
                ],
                part_uuid: Some("B46B76EB-B2F9-441A-9686-8B24FA2B2161".into()),
                part_label: Some("esp".into()),
                ..Device::new("sda1", DeviceKind::Partition, gib).with_parent("sda")
            },
            Device::new("sda2", DeviceKind::Partition, gib * 99)
                .with_parent("sda")
                .with_format(Format {
                    label: Some("root".into()),
                    uuid: Some("f4c40183-0a2d-4d97-b71e-25a4043ce01f".into()),
                    ..Format::new(FilesystemType::Xfs)
                }),
            Device::new("md0", DeviceKind::RaidArray, gib)
                .with_parent("sda1")
                .with_parent("sdb1"),
            Device::new("sdb", DeviceKind::Disk, gib * 100),
            Device::new("sdb1", DeviceKind::Partition, gib).with_parent("sdb"),
            Device::new("luks-md0", DeviceKind::Other, gib).with_parent("md0"),
        ])
    }

    #[test]
    fn test_device_path_to_name() {
        assert_eq!(device_path_to_name("/dev/sda"), "sda");
        assert_eq!(device_path_to_name("/dev/mapper/luks-root"), "luks-root");
        assert_eq!(device_path_to_name("/dev/md/root"), "root");
        assert_eq!(device_path_to_name("sda"), "sda");
        assert_eq!(device_path_to_name("LABEL=root"), "LABEL=root");
    }

    #[test]
    fn test_resolve_device() {
        let tree = sample_tree();
        let resolve = |spec| tree.resolve_device(spec).map(|d| d.name.as_str());

        assert_eq!(resolve("sda"), Some("sda"));
        assert_eq!(resolve("/dev/sdb1"), Some("sdb1"));
        assert_eq!(resolve("/dev/md/md0"), Some("md0"));
        assert_eq!(resolve("LABEL=root"), Some("sda2"));
        assert_eq!(
            resolve("UUID=F4C40183-0A2D-4D97-B71E-25A4043CE01F"),
            Some("sda2")
        );
        assert_eq!(
            resolve("PARTUUID=b46b76eb-b2f9-441a-9686-8b24fa2b2161"),
            Some("sda1")
        );
        assert_eq!(resolve("PARTLABEL=esp"), Some("sda1"));
        assert_eq!(
            resolve("/dev/disk/by-id/ata-QEMU_HARDDISK_QM00001"),
            Some("sda")
        );
        assert_eq!(
            resolve("disk/by-partuuid/b46b76eb-b2f9-441a-9686-8b24fa2b2161"),
            Some("sda1")
        );
        assert_eq!(resolve("/dev/disk/by-id/ata-QEMU_HARDDISK_QM00002"), None);
        assert_eq!(resolve("LABEL=home"), None);
        assert_eq!(resolve("sdz"), None);
        assert_eq!(resolve(""), None);
    }

    #[test]
    fn test_partitions_and_ancestors() {
        let tree = sample_tree();

        let names: Vec<_> = tree.partitions_on("sda").map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["sda1", "sda2"]);

        let luks = tree.get_device_by_name("luks-md0").unwrap();
        let names: Vec<_> = tree
            .ancestors(luks)
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(names, vec!["md0", "sda1", "sdb1", "sda", "sdb"]);
    }

    #[test]
    fn test_add_and_remove() {
        let mut tree = sample_tree();
        let count = tree.devices().len();

        tree.add_device(Device::new("sda", DeviceKind::Disk, ByteCount(1)));
        assert_eq!(tree.devices().len(), count);
        assert_eq!(tree.get_device_by_name("sda").unwrap().size, ByteCount(1));

        assert!(tree.remove_device("sdb1").is_some());
        assert!(tree.remove_device("sdb1").is_none());
        assert_eq!(tree.devices().len(), count - 1);
    }

    #[test]
    fn test_catalog_impl() {
        let tree = sample_tree();
        let entries = tree.enumerate().unwrap();
        assert_eq!(entries.len(), 7);
        assert!(entries[0].real_disk);
        assert!(!entries[1].real_disk);
        assert_eq!(
            entries[0].node_paths().collect::<Vec<_>>(),
            vec!["/dev/sda", "/dev/disk/by-id/ata-QEMU_HARDDISK_QM00001"]
        );
        assert_eq!(tree.resolve_devspec("LABEL=root"), Some("sda2".into()));
    }
}
