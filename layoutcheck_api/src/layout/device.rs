use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIs};

use sysdefs::{
    disklabel::DiskLabelType,
    filesystems::{FormatType, SpecialFormatType},
};

use crate::primitives::bytes::ByteCount;

/// Kind of block device.
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumIs,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum DeviceKind {
    /// A top-level block device.
    Disk,
    Partition,
    LogicalVolume,
    RaidArray,
    RaidMember,
    #[default]
    Other,
}

/// The format (filesystem or other on-disk structure) a device carries or is
/// going to carry.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct Format {
    /// Format type tag, e.g. `ext4`, `swap`, `luks`, `biosboot`.
    #[serde(rename = "type")]
    pub format_type: FormatType,

    /// Whether the format already exists on disk, as opposed to being
    /// scheduled for creation.
    pub exists: bool,

    pub uuid: Option<String>,

    pub label: Option<String>,

    /// For LUKS, whether a passphrase or key file is available.
    pub has_key: bool,

    /// Overrides the format type's default minimum size.
    pub min_size: Option<ByteCount>,

    /// Overrides the format type's default maximum size.
    pub max_size: Option<ByteCount>,
}

impl Format {
    pub fn new(format_type: impl Into<FormatType>) -> Self {
        Self {
            format_type: format_type.into(),
            ..Default::default()
        }
    }

    pub fn is(&self, special: SpecialFormatType) -> bool {
        self.format_type == FormatType::Special(special)
    }

    pub fn is_mountable(&self) -> bool {
        self.format_type.is_mountable()
    }

    pub fn is_linux_native(&self) -> bool {
        self.format_type.is_linux_native()
    }

    pub fn min_size(&self) -> ByteCount {
        self.min_size
            .unwrap_or_else(|| ByteCount(self.format_type.min_size()))
    }

    pub fn max_size(&self) -> Option<ByteCount> {
        self.max_size.or_else(|| self.format_type.max_size().map(ByteCount))
    }
}

/// A block device known to the layout, either present on the system or
/// scheduled for creation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Device {
    /// Unique kernel-style name, e.g. `sda1`.
    pub name: String,

    #[serde(default)]
    pub kind: DeviceKind,

    pub size: ByteCount,

    /// Whether the device itself already exists.
    #[serde(default)]
    pub exists: bool,

    /// Names of the devices this one is built directly on. For a partition,
    /// the first parent is its disk.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,

    #[serde(default)]
    pub format: Format,

    /// Partition table on the device, for disks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disklabel: Option<DiskLabelType>,

    /// Whether the partition table on this device is one the installer can
    /// work with.
    #[serde(default = "default_true")]
    pub disklabel_supported: bool,

    /// Offset of a partition from the start of its disk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<ByteCount>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_uuid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_label: Option<String>,

    /// Symlinks to the device node, e.g. `/dev/disk/by-id/ata-QEMU_HARDDISK`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl Device {
    pub fn new(name: impl Into<String>, kind: DeviceKind, size: ByteCount) -> Self {
        Self {
            name: name.into(),
            kind,
            size,
            exists: false,
            parents: Vec::new(),
            format: Format::default(),
            disklabel: None,
            disklabel_supported: true,
            start: None,
            part_uuid: None,
            part_label: None,
            links: Vec::new(),
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parents.push(parent.into());
        self
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn with_disklabel(mut self, disklabel: DiskLabelType) -> Self {
        self.disklabel = Some(disklabel);
        self
    }

    pub fn existing(mut self) -> Self {
        self.exists = true;
        self
    }

    pub fn is_disk(&self) -> bool {
        self.kind.is_disk()
    }

    /// Path of the device node.
    pub fn path(&self) -> String {
        format!("{}{}", crate::constants::DEV_PATH_PREFIX, self.name)
    }

    /// Whether `path` is the device node or one of its symlinks.
    pub fn has_node_path(&self, path: &str) -> bool {
        self.path() == path || self.links.iter().any(|link| link == path)
    }

    /// Disk a partition lives on.
    pub fn disk(&self) -> Option<&str> {
        match self.kind {
            DeviceKind::Partition => self.parents.first().map(String::as_str),
            _ => None,
        }
    }

    /// Compares the device size against the size limits of its format.
    /// Returns `Less` when too small, `Greater` when too large.
    pub fn check_size(&self) -> Ordering {
        if self.size < self.format.min_size() {
            return Ordering::Less;
        }

        match self.format.max_size() {
            Some(max) if self.size > max => Ordering::Greater,
            _ => Ordering::Equal,
        }
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    #[test]
    fn test_deserialize_device() {
        let device: Device = serde_yaml::from_str(indoc! {r#"
            name: sda2
            kind: partition
            size: 20 GiB
            exists: true
            parents: [sda]
            format:
              type: xfs
              exists: true
              uuid: 7c1a6b4e-0d53-4b0e-9b1e-0f4c2f0a9d11
        "#})
        .unwrap();

        assert_eq!(device.name, "sda2");
        assert_eq!(device.kind, DeviceKind::Partition);
        assert_eq!(device.size, ByteCount(20 << 30));
        assert_eq!(device.disk(), Some("sda"));
        assert!(device.format.is_mountable());
        assert!(device.disklabel_supported);
        assert_eq!(device.path(), "/dev/sda2");
        assert!(device.links.is_empty());
    }

    #[test]
    fn test_has_node_path() {
        let device: Device = serde_yaml::from_str(indoc! {r#"
            name: sda
            kind: disk
            size: 20 GiB
            links:
              - /dev/disk/by-id/ata-QEMU_HARDDISK_QM00001
              - /dev/disk/by-path/pci-0000:00:01.1-ata-1
        "#})
        .unwrap();

        assert!(device.has_node_path("/dev/sda"));
        assert!(device.has_node_path("/dev/disk/by-id/ata-QEMU_HARDDISK_QM00001"));
        assert!(device.has_node_path("/dev/disk/by-path/pci-0000:00:01.1-ata-1"));
        assert!(!device.has_node_path("sda"));
        assert!(!device.has_node_path("/dev/disk/by-id/ata-QEMU_HARDDISK_QM00002"));
    }

    #[test]
    fn test_check_size() {
        let biosboot = Format::new(SpecialFormatType::Biosboot);

        let part = Device::new("sda1", DeviceKind::Partition, ByteCount::from_mib(1))
            .with_format(biosboot.clone());
        assert_eq!(part.check_size(), Ordering::Equal);

        let part = Device::new("sda1", DeviceKind::Partition, ByteCount(1024))
            .with_format(biosboot.clone());
        assert_eq!(part.check_size(), Ordering::Less);

        let part = Device::new("sda1", DeviceKind::Partition, ByteCount::from_mib(2))
            .with_format(biosboot);
        assert_eq!(part.check_size(), Ordering::Greater);

        // Explicit limits win over the format type defaults
        let part = Device::new("sda1", DeviceKind::Partition, ByteCount::from_mib(2))
            .with_format(Format {
                max_size: Some(ByteCount::from_mib(4)),
                ..Format::new(SpecialFormatType::Biosboot)
            });
        assert_eq!(part.check_size(), Ordering::Equal);

        // Unformatted devices have no limits
        let disk = Device::new("sda", DeviceKind::Disk, ByteCount(1));
        assert_eq!(disk.check_size(), Ordering::Equal);
    }

    #[test]
    fn test_disk_of_non_partition() {
        let lv = Device::new("root", DeviceKind::LogicalVolume, ByteCount::from_mib(10))
            .with_parent("vg");
        assert_eq!(lv.disk(), None);
    }
}
