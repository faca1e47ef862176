use std::process::Command;

use anyhow::{Context, Error};
use log::{debug, warn};
use serde::Deserialize;

use layoutcheck_api::{
    layout::{
        device::{Device, DeviceKind, Format},
        devicetree::DeviceTree,
    },
    primitives::bytes::ByteCount,
};
use sysdefs::{
    disklabel::DiskLabelType,
    filesystems::{FilesystemType, FormatType, SpecialFormatType},
};

use crate::{devlinks::DeviceLinks, exe::RunAndCheck};

/// Columns requested from lsblk, matching the fields of `BlockDevice`.
const LSBLK_COLUMNS: &str =
    "NAME,TYPE,SIZE,FSTYPE,LABEL,UUID,PARTUUID,PARTLABEL,PARTTYPE,PTTYPE,START";

/// lsblk reports partition offsets in 512-byte sectors regardless of the
/// device's logical sector size.
const LSBLK_SECTOR_SIZE: u64 = 512;

/// GPT type GUID of an EFI System Partition.
const ESP_PART_TYPE: &str = "c12a7328-f81f-11d2-ba4b-00a0c93ec93b";

/// GPT type GUID of a BIOS boot partition.
const BIOS_BOOT_PART_TYPE: &str = "21686148-6449-6e6f-744e-656564454649";

/// GPT type GUID and MBR type ID of a PReP boot partition.
const PREP_BOOT_PART_TYPES: [&str; 2] = ["9e1a2d38-c612-4316-aa26-8b49521e5a8b", "0x41"];

/// Disk name prefixes of memory-backed disks.
const VIRTUAL_DISK_PREFIXES: [&str; 2] = ["zram", "ram"];

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
pub struct LsBlkOutput {
    pub blockdevices: Vec<BlockDevice>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
pub struct BlockDevice {
    pub name: String,

    #[serde(rename = "type")]
    pub device_type: String,

    pub size: u64,

    pub fstype: Option<String>,

    pub label: Option<String>,

    pub uuid: Option<String>,

    #[serde(rename = "partuuid")]
    pub part_uuid: Option<String>,

    #[serde(rename = "partlabel")]
    pub part_label: Option<String>,

    #[serde(rename = "parttype")]
    pub part_type: Option<String>,

    #[serde(rename = "pttype")]
    pub partition_table_type: Option<String>,

    /// Partition offset, in 512-byte sectors.
    pub start: Option<u64>,

    pub children: Option<Vec<BlockDevice>>,
}

impl BlockDevice {
    pub fn kind(&self) -> DeviceKind {
        match self.device_type.as_str() {
            "disk" => DeviceKind::Disk,
            "part" => DeviceKind::Partition,
            "lvm" => DeviceKind::LogicalVolume,
            t if t.starts_with("raid") || t == "md" => DeviceKind::RaidArray,
            _ => DeviceKind::Other,
        }
    }

    /// Whether this is a disk realized on hardware, as opposed to a memory
    /// backed one.
    pub fn is_real_disk(&self) -> bool {
        self.kind() == DeviceKind::Disk
            && !VIRTUAL_DISK_PREFIXES
                .iter()
                .any(|prefix| self.name.starts_with(prefix))
    }

    fn format_type(&self) -> FormatType {
        let part_type = self.part_type.as_deref().map(str::to_ascii_lowercase);
        match (self.fstype.as_deref(), part_type.as_deref()) {
            (Some("vfat"), Some(ESP_PART_TYPE)) => FilesystemType::Efi.into(),
            (_, Some(BIOS_BOOT_PART_TYPE)) => SpecialFormatType::Biosboot.into(),
            (_, Some(t)) if PREP_BOOT_PART_TYPES.contains(&t) => {
                SpecialFormatType::Prepboot.into()
            }
            (Some("crypto_LUKS"), _) => SpecialFormatType::Luks.into(),
            (Some("LVM2_member"), _) => SpecialFormatType::Lvmpv.into(),
            (Some("linux_raid_member"), _) => SpecialFormatType::Mdmember.into(),
            (Some(fstype), _) => FormatType::from(fstype),
            (None, _) => FormatType::None,
        }
    }

    fn to_device(&self) -> Device {
        let mut device =
            Device::new(self.name.as_str(), self.kind(), ByteCount(self.size)).existing();

        let format_type = self.format_type();
        let exists = !format_type.is_none();
        device.format = Format {
            exists,
            uuid: self.uuid.clone(),
            label: self.label.clone(),
            ..Format::new(format_type)
        };
        device.part_uuid = self.part_uuid.clone();
        device.part_label = self.part_label.clone();
        device.start = self.start.map(|s| ByteCount(s * LSBLK_SECTOR_SIZE));

        if device.is_disk() {
            if let Some(pttype) = self.partition_table_type.as_deref() {
                match parse_disklabel(pttype) {
                    Some(disklabel) => device.disklabel = Some(disklabel),
                    None => {
                        debug!("Disk '{}' has unsupported disk label '{pttype}'", self.name);
                        device.disklabel_supported = false;
                    }
                }
            }
        }

        device
    }
}

fn parse_disklabel(pttype: &str) -> Option<DiskLabelType> {
    Some(match pttype {
        "gpt" => DiskLabelType::Gpt,
        "dos" | "msdos" | "mbr" => DiskLabelType::Msdos,
        "mac" => DiskLabelType::Mac,
        "dasd" => DiskLabelType::Dasd,
        _ => return None,
    })
}

/// Lists every block device on the system.
pub fn list() -> Result<Vec<BlockDevice>, Error> {
    let output = Command::new("lsblk")
        .arg("--json")
        .arg("--bytes")
        .arg("--output")
        .arg(LSBLK_COLUMNS)
        .output_and_check()
        .context("Failed to execute lsblk")?;

    let parsed = parse_lsblk_output(&output);
    if parsed.is_err() {
        warn!("lsblk output: {output}");
    }

    parsed
}

fn parse_lsblk_output(output: &str) -> Result<Vec<BlockDevice>, Error> {
    let parsed: LsBlkOutput =
        serde_json::from_str(output).context("Failed to parse lsblk output")?;

    Ok(parsed.blockdevices)
}

/// Builds a device tree out of lsblk's device hierarchy. A device shown
/// under several parents (e.g. a RAID array) is added once, with all of its
/// parents. Devices get their symlinks from `links`.
pub fn to_device_tree(block_devices: &[BlockDevice], links: &DeviceLinks) -> DeviceTree {
    let mut tree = DeviceTree::default();
    let mut pending: Vec<(&BlockDevice, Option<&str>)> =
        block_devices.iter().rev().map(|bd| (bd, None)).collect();

    while let Some((block_device, parent)) = pending.pop() {
        match tree.get_device_by_name_mut(&block_device.name) {
            Some(existing) => {
                if let Some(parent) = parent {
                    if !existing.parents.iter().any(|p| p == parent) {
                        existing.parents.push(parent.into());
                    }
                }
                // Children were already visited through the first parent
                continue;
            }
            None => {
                let mut device = block_device.to_device();
                device.parents.extend(parent.map(String::from));
                if let Some(device_links) = links.get(&device.name) {
                    device.links = device_links.clone();
                }
                tree.add_device(device);
            }
        }

        if let Some(children) = &block_device.children {
            pending.extend(
                children
                    .iter()
                    .rev()
                    .map(|child| (child, Some(block_device.name.as_str()))),
            );
        }
    }

    tree
}

/// Flattens lsblk's device hierarchy, depth first.
pub fn flatten(block_devices: &[BlockDevice]) -> Vec<&BlockDevice> {
    let mut flat = Vec::new();
    for block_device in block_devices {
        flat.push(block_device);
        if let Some(children) = &block_device.children {
            flat.extend(flatten(children));
        }
    }
    flat
}
