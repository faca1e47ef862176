//! Boot loader placement rules.
//!
//! Where the boot loader can be staged depends on the firmware: BIOS machines
//! embed GRUB2 in a disk's boot sector, UEFI machines need an EFI System
//! Partition, and Open Firmware machines need a PReP partition. The stage2
//! device (where the kernel and boot loader configuration live) follows the
//! same rules on every flavor.

use serde::{Deserialize, Serialize};
use strum_macros::IntoStaticStr;

use sysdefs::{
    disklabel::DiskLabelType,
    filesystems::{FilesystemType, FormatType, SpecialFormatType},
    firmware::Firmware,
};

use crate::{
    constants::{BOOT_MOUNT_POINT_PATH, ESP_MOUNT_POINT_PATH, ROOT_MOUNT_POINT_PATH},
    primitives::bytes::{ByteCount, GIB, KIB},
};

use super::{
    device::{Device, DeviceKind},
    LayoutModel,
};

/// Below this gap before the first partition of an MBR disk, GRUB2 cannot
/// embed its core image at all.
const BASE_EMBED_GAP: ByteCount = ByteCount(32256);

/// Below this gap, GRUB2 can only embed a minimal core image.
const ADVANCED_EMBED_GAP: ByteCount = ByteCount(512 * KIB);

/// PReP partitions must end within the first 4 GiB of their disk.
const PREP_BOOT_LIMIT: ByteCount = ByteCount(4 * GIB);

/// Errors and warnings gathered while validating a boot loader stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl StageReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

/// Firmware-specific boot loader variant.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum BootloaderFlavor {
    /// GRUB2 embedded in the boot sector of a BIOS disk.
    Bios,

    /// Boot loader on an EFI System Partition.
    Efi,

    /// Boot loader on an HFS+ ESP on Apple hardware.
    MacEfi,

    /// GRUB2 on a PReP boot partition.
    Prep,
}

impl From<Firmware> for BootloaderFlavor {
    fn from(firmware: Firmware) -> Self {
        match firmware {
            Firmware::Bios => BootloaderFlavor::Bios,
            Firmware::Uefi => BootloaderFlavor::Efi,
            Firmware::MacUefi => BootloaderFlavor::MacEfi,
            Firmware::OpenFirmware => BootloaderFlavor::Prep,
        }
    }
}

impl BootloaderFlavor {
    /// Explanation of what the platform needs when no stage1 device could be
    /// found.
    pub fn stage1_missing_error(self) -> Option<&'static str> {
        Some(match self {
            Self::Bios => {
                "You must include at least one MBR- or GPT-formatted disk as an install target."
            }
            Self::Efi => {
                "For a UEFI installation, you must include an EFI System Partition on a \
                GPT-formatted disk, mounted at /boot/efi."
            }
            Self::MacEfi => {
                "For a UEFI installation, you must include a Linux HFS+ ESP on a GPT-formatted \
                disk, mounted at /boot/efi."
            }
            Self::Prep => {
                "You must include a PReP Boot Partition within the first 4GiB of an MBR- or \
                GPT-formatted disk."
            }
        })
    }

    /// Whether the platform needs a `biosboot` partition to boot from a GPT
    /// disk.
    pub fn requires_biosboot(self) -> bool {
        matches!(self, Self::Bios)
    }

    /// Kinds of device the stage1 may be placed on.
    fn stage1_device_kinds(self) -> &'static [DeviceKind] {
        match self {
            Self::Bios => &[DeviceKind::Disk],
            Self::Efi | Self::MacEfi | Self::Prep => &[DeviceKind::Partition],
        }
    }

    /// Format the stage1 device must carry, if any.
    fn stage1_format(self) -> Option<FormatType> {
        match self {
            Self::Bios => None,
            Self::Efi => Some(FilesystemType::Efi.into()),
            Self::MacEfi => Some(FilesystemType::Macefi.into()),
            Self::Prep => Some(SpecialFormatType::Prepboot.into()),
        }
    }

    /// Mount point the stage1 device must be mounted at, if any.
    fn stage1_mount_point(self) -> Option<&'static str> {
        match self {
            Self::Efi | Self::MacEfi => Some(ESP_MOUNT_POINT_PATH),
            Self::Bios | Self::Prep => None,
        }
    }

    /// Disk labels the stage1 device's disk may carry.
    fn stage1_disklabels(self) -> &'static [DiskLabelType] {
        match self {
            Self::Bios | Self::Prep => &[DiskLabelType::Msdos, DiskLabelType::Gpt],
            Self::Efi | Self::MacEfi => &[DiskLabelType::Gpt],
        }
    }

    fn stage1_description(self) -> &'static str {
        match self {
            Self::Bios => "Master Boot Record",
            Self::Efi => "EFI System Partition",
            Self::MacEfi => "Apple EFI Boot Partition",
            Self::Prep => "PReP Boot Partition",
        }
    }
}

const STAGE2_DEVICE_KINDS: [DeviceKind; 3] = [
    DeviceKind::Partition,
    DeviceKind::RaidArray,
    DeviceKind::LogicalVolume,
];

const STAGE2_MOUNT_POINTS: [&str; 2] = [BOOT_MOUNT_POINT_PATH, ROOT_MOUNT_POINT_PATH];

const STAGE2_DESCRIPTION: &str = "/boot file system";

/// Boot loader descriptor of a layout.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Bootloader {
    pub flavor: BootloaderFlavor,

    /// Do not install a boot loader at all.
    #[serde(default)]
    pub skip: bool,

    /// Name of the device the boot loader is installed onto.
    #[serde(default)]
    pub stage1_device: Option<String>,

    /// Name of the device the boot loader boots from.
    #[serde(default)]
    pub stage2_device: Option<String>,
}

impl Bootloader {
    pub fn new(flavor: BootloaderFlavor) -> Self {
        Self {
            flavor,
            skip: false,
            stage1_device: None,
            stage2_device: None,
        }
    }

    /// Validates `device` as the stage1 target for this boot loader.
    pub fn is_valid_stage1_device(&self, device: &Device, layout: &LayoutModel) -> StageReport {
        let mut report = StageReport::default();
        let description = self.flavor.stage1_description();

        let kinds = self.flavor.stage1_device_kinds();
        if !kinds.contains(&device.kind) {
            report.error(format!(
                "{description} cannot be of type {}.",
                device.kind
            ));
        }

        if let Some(format) = self.flavor.stage1_format() {
            if device.format.format_type != format {
                report.error(format!("{description} must be of type {format}."));
            }
        }

        if let Some(mount_point) = self.flavor.stage1_mount_point() {
            if layout.mount_point_of(&device.name) != Some(mount_point) {
                report.error(format!("{description} must be mounted on {mount_point}."));
            }
        }

        if device.check_size() != std::cmp::Ordering::Equal {
            report.error(format!(
                "{description} must be between {} and {} in size.",
                device.format.min_size(),
                device
                    .format
                    .max_size()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "unlimited".into()),
            ));
        }

        if self.flavor == BootloaderFlavor::Prep {
            if let Some(start) = device.start {
                if start + device.size > PREP_BOOT_LIMIT {
                    report.error(format!(
                        "{description} must be within the first {PREP_BOOT_LIMIT} of the disk."
                    ));
                }
            }
        }

        self.check_disklabels(
            device,
            layout,
            self.flavor.stage1_disklabels(),
            description,
            &mut report,
        );

        report
    }

    /// Validates `device` as the stage2 location for this boot loader. A
    /// missing device yields an empty report.
    pub fn is_valid_stage2_device(
        &self,
        device: Option<&Device>,
        layout: &LayoutModel,
    ) -> StageReport {
        let mut report = StageReport::default();
        let Some(device) = device else {
            return report;
        };

        if !STAGE2_DEVICE_KINDS.contains(&device.kind) {
            report.error(format!(
                "{STAGE2_DESCRIPTION} cannot be of type {}.",
                device.kind
            ));
        }

        if !(device.format.is_mountable() && device.format.is_linux_native()) {
            report.error(format!(
                "{STAGE2_DESCRIPTION} cannot be of type {}.",
                device.format.format_type
            ));
        }

        match layout.mount_point_of(&device.name) {
            Some(mount_point) if STAGE2_MOUNT_POINTS.contains(&mount_point) => (),
            _ => report.error(format!(
                "{STAGE2_DESCRIPTION} must be mounted on one of {}.",
                STAGE2_MOUNT_POINTS.join(", ")
            )),
        }

        let encrypted = std::iter::once(device)
            .chain(layout.devicetree.ancestors(device))
            .any(|d| d.format.is(SpecialFormatType::Luks));
        if encrypted {
            report.error(format!(
                "{STAGE2_DESCRIPTION} cannot be on an encrypted block device."
            ));
        }

        self.check_disklabels(
            device,
            layout,
            &[DiskLabelType::Msdos, DiskLabelType::Gpt],
            STAGE2_DESCRIPTION,
            &mut report,
        );

        report
    }

    /// Final placement check once both stages are chosen. On BIOS machines
    /// booting from an MBR disk, GRUB2 needs room before the first partition
    /// to embed its core image.
    pub fn check(&self, layout: &LayoutModel) -> StageReport {
        let mut report = StageReport::default();
        if self.flavor != BootloaderFlavor::Bios {
            return report;
        }

        let Some(stage1) = self
            .stage1_device
            .as_deref()
            .and_then(|name| layout.devicetree.get_device_by_name(name))
        else {
            return report;
        };

        if !stage1.is_disk() || stage1.disklabel != Some(DiskLabelType::Msdos) {
            return report;
        }

        let Some(first_start) = layout
            .devicetree
            .partitions_on(&stage1.name)
            .filter_map(|p| p.start)
            .min()
        else {
            return report;
        };

        let stage2_format = self
            .stage2_device
            .as_deref()
            .and_then(|name| layout.devicetree.get_device_by_name(name))
            .map(|d| d.format.format_type.to_string())
            .unwrap_or_else(|| "unknown".into());
        let message = format!(
            "{} may not have enough space for grub2 to embed core.img when using the {} file \
            system.",
            stage1.name, stage2_format
        );

        if first_start < BASE_EMBED_GAP {
            report.error(message);
        } else if first_start < ADVANCED_EMBED_GAP {
            report.warning(message);
        }

        report
    }

    /// The disk holding `device` must carry one of `labels`, and no ancestor
    /// may sit on an unsupported disk label.
    fn check_disklabels(
        &self,
        device: &Device,
        layout: &LayoutModel,
        labels: &[DiskLabelType],
        description: &str,
        report: &mut StageReport,
    ) {
        let ancestors = layout.devicetree.ancestors(device);
        let disks = std::iter::once(device)
            .chain(ancestors.iter().copied())
            .filter(|d| d.is_disk());

        for disk in disks {
            match disk.disklabel {
                Some(label) if labels.contains(&label) => (),
                Some(label) => report.error(format!(
                    "{description} cannot be on a disk with a {} disk label.",
                    <&str>::from(label)
                )),
                None => report.error(format!(
                    "{description} must be on a disk with a partition table."
                )),
            }
        }

        if std::iter::once(device)
            .chain(ancestors.iter().copied())
            .any(|d| !d.disklabel_supported)
        {
            report.error(format!(
                "{description} is on a disk with an unsupported disk label."
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        layout::device::Format,
        primitives::bytes::{ByteCount, MIB},
    };

    use super::*;

    fn efi_layout() -> LayoutModel {
        let mut layout = LayoutModel::default();
        let tree = &mut layout.devicetree;
        tree.add_device(
            Device::new("sda", DeviceKind::Disk, ByteCount(20 * GIB))
                .with_disklabel(DiskLabelType::Gpt)
                .existing(),
        );
        tree.add_device(
            Device::new("sda1", DeviceKind::Partition, ByteCount(600 * MIB))
                .with_parent("sda")
                .with_format(Format::new(FilesystemType::Efi)),
        );
        tree.add_device(
            Device::new("sda2", DeviceKind::Partition, ByteCount(19 * GIB))
                .with_parent("sda")
                .with_format(Format::new(FilesystemType::Ext4)),
        );
        layout.mount("/", "sda2");
        layout.mount("/boot/efi", "sda1");
        layout.bootloader = Some(Bootloader {
            stage1_device: Some("sda1".into()),
            stage2_device: Some("sda2".into()),
            ..Bootloader::new(BootloaderFlavor::Efi)
        });
        layout
    }

    fn bios_layout(first_partition_start: u64) -> LayoutModel {
        let mut layout = LayoutModel::default();
        let tree = &mut layout.devicetree;
        tree.add_device(
            Device::new("sda", DeviceKind::Disk, ByteCount(20 * GIB))
                .with_disklabel(DiskLabelType::Msdos),
        );
        tree.add_device(Device {
            start: Some(ByteCount(first_partition_start)),
            ..Device::new("sda1", DeviceKind::Partition, ByteCount(19 * GIB))
                .with_parent("sda")
                .with_format(Format::new(FilesystemType::Xfs))
        });
        layout.mount("/", "sda1");
        layout.bootloader = Some(Bootloader {
            stage1_device: Some("sda".into()),
            stage2_device: Some("sda1".into()),
            ..Bootloader::new(BootloaderFlavor::Bios)
        });
        layout
    }

    fn stages(layout: &LayoutModel) -> (StageReport, StageReport) {
        let bootloader = layout.bootloader.as_ref().unwrap();
        let stage1 = layout.devicetree.get_device_by_name("sda1").unwrap();
        let stage2 = layout.devicetree.get_device_by_name("sda2");
        (
            bootloader.is_valid_stage1_device(stage1, layout),
            bootloader.is_valid_stage2_device(stage2, layout),
        )
    }

    #[test]
    fn test_valid_efi_layout() {
        let layout = efi_layout();
        let (stage1, stage2) = stages(&layout);
        assert_eq!(stage1, StageReport::default());
        assert_eq!(stage2, StageReport::default());
        let bootloader = layout.bootloader.as_ref().unwrap();
        assert!(bootloader.check(&layout).is_valid());
    }

    #[test]
    fn test_invalid_esp() {
        let mut layout = efi_layout();
        layout.fsset.mounts.remove("/boot/efi");
        let esp = layout.devicetree.get_device_by_name_mut("sda1").unwrap();
        esp.format = Format::new(FilesystemType::Vfat);
        let disk = layout.devicetree.get_device_by_name_mut("sda").unwrap();
        disk.disklabel = Some(DiskLabelType::Msdos);

        let (stage1, _) = stages(&layout);
        assert_eq!(
            stage1.errors,
            vec![
                "EFI System Partition must be of type efi.",
                "EFI System Partition must be mounted on /boot/efi.",
                "EFI System Partition cannot be on a disk with a msdos disk label.",
            ]
        );
        assert!(stage1.warnings.is_empty());
    }

    #[test]
    fn test_esp_size() {
        let mut layout = efi_layout();
        let esp = layout.devicetree.get_device_by_name_mut("sda1").unwrap();
        esp.size = ByteCount(10 * MIB);

        let (stage1, _) = stages(&layout);
        assert_eq!(
            stage1.errors,
            vec!["EFI System Partition must be between 50 MiB and 2 GiB in size."]
        );
    }

    #[test]
    fn test_invalid_stage2() {
        let mut layout = efi_layout();
        layout.devicetree.add_device(
            Device::new("luks-sda2", DeviceKind::Other, ByteCount(19 * GIB))
                .with_parent("sda2")
                .with_format(Format::new(FilesystemType::Ext4)),
        );
        layout
            .devicetree
            .get_device_by_name_mut("sda2")
            .unwrap()
            .format = Format::new(SpecialFormatType::Luks);
        layout.mount("/", "luks-sda2");

        let bootloader = layout.bootloader.as_ref().unwrap();
        let stage2 = layout.devicetree.get_device_by_name("luks-sda2");
        let report = bootloader.is_valid_stage2_device(stage2, &layout);
        assert_eq!(
            report.errors,
            vec![
                "/boot file system cannot be of type other.",
                "/boot file system cannot be on an encrypted block device.",
            ]
        );

        // Nothing to validate without a device
        assert!(bootloader.is_valid_stage2_device(None, &layout).is_valid());
    }

    #[test]
    fn test_stage1_on_unsupported_disklabel() {
        let mut layout = efi_layout();
        layout
            .devicetree
            .get_device_by_name_mut("sda")
            .unwrap()
            .disklabel_supported = false;

        let (stage1, stage2) = stages(&layout);
        assert_eq!(
            stage1.errors,
            vec!["EFI System Partition is on a disk with an unsupported disk label."]
        );
        assert_eq!(
            stage2.errors,
            vec!["/boot file system is on a disk with an unsupported disk label."]
        );
    }

    #[test]
    fn test_bios_embedding_gap() {
        let layout = bios_layout(MIB);
        let bootloader = layout.bootloader.as_ref().unwrap();
        assert_eq!(bootloader.check(&layout), StageReport::default());

        let layout = bios_layout(63 * 512);
        let report = layout.bootloader.as_ref().unwrap().check(&layout);
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(
            report.warnings[0],
            "sda may not have enough space for grub2 to embed core.img when using the xfs \
            file system."
        );

        let layout = bios_layout(2048);
        let report = layout.bootloader.as_ref().unwrap().check(&layout);
        assert_eq!(report.errors.len(), 1);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_bios_stage1_must_be_disk() {
        let layout = bios_layout(MIB);
        let bootloader = layout.bootloader.as_ref().unwrap();
        let partition = layout.devicetree.get_device_by_name("sda1").unwrap();
        let report = bootloader.is_valid_stage1_device(partition, &layout);
        assert_eq!(
            report.errors,
            vec!["Master Boot Record cannot be of type partition."]
        );
    }

    #[test]
    fn test_flavor() {
        assert_eq!(
            BootloaderFlavor::from(Firmware::Uefi),
            BootloaderFlavor::Efi
        );
        assert_eq!(
            BootloaderFlavor::from(Firmware::OpenFirmware),
            BootloaderFlavor::Prep
        );
        assert!(BootloaderFlavor::Bios.requires_biosboot());
        assert!(!BootloaderFlavor::Efi.requires_biosboot());
        assert!(BootloaderFlavor::Prep
            .stage1_missing_error()
            .unwrap()
            .contains("PReP Boot Partition"));
    }
}
