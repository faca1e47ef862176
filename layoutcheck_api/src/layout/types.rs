//! Vocabulary shared by layout front ends: device types offered to the
//! operator, automatic partitioning schemes and descriptions of well-known
//! mount points.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, IntoStaticStr};

/// Kind of device an operator can ask for when creating a mount point.
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceType {
    #[strum(to_string = "LVM")]
    Lvm,

    #[strum(to_string = "LVM Thin Provisioning")]
    LvmThinProvisioning,

    #[strum(to_string = "RAID")]
    Raid,

    #[strum(to_string = "Standard Partition")]
    StandardPartition,

    #[strum(to_string = "Btrfs")]
    Btrfs,

    #[strum(to_string = "Disk")]
    Disk,
}

/// Device types whose instances carry an operator-chosen name.
pub const NAMED_DEVICE_TYPES: [DeviceType; 4] = [
    DeviceType::Btrfs,
    DeviceType::Lvm,
    DeviceType::Raid,
    DeviceType::LvmThinProvisioning,
];

/// Device types that are containers for other devices.
pub const CONTAINER_DEVICE_TYPES: [DeviceType; 3] = [
    DeviceType::Lvm,
    DeviceType::Btrfs,
    DeviceType::LvmThinProvisioning,
];

impl DeviceType {
    pub fn is_named(self) -> bool {
        NAMED_DEVICE_TYPES.contains(&self)
    }

    pub fn is_container(self) -> bool {
        CONTAINER_DEVICE_TYPES.contains(&self)
    }
}

/// Automatic partitioning scheme.
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumIter,
)]
#[serde(rename_all = "kebab-case")]
pub enum AutopartType {
    #[strum(to_string = "Standard Partition")]
    Plain,

    #[strum(to_string = "Btrfs")]
    Btrfs,

    #[default]
    #[strum(to_string = "LVM")]
    Lvm,

    #[strum(to_string = "LVM Thin Provisioning")]
    LvmThinp,
}

impl From<AutopartType> for DeviceType {
    fn from(autopart: AutopartType) -> Self {
        match autopart {
            AutopartType::Plain => DeviceType::StandardPartition,
            AutopartType::Btrfs => DeviceType::Btrfs,
            AutopartType::Lvm => DeviceType::Lvm,
            AutopartType::LvmThinp => DeviceType::LvmThinProvisioning,
        }
    }
}

/// Device type an automatic partitioning scheme creates its volumes as.
pub fn device_type_from_autopart(autopart: AutopartType) -> DeviceType {
    autopart.into()
}

/// Operator-facing explanation of a well-known mount point role, or `None`
/// for roles without one. Roles are `Swap`, `Boot`, `Root`, `Home`,
/// `BIOS Boot` and `PReP Boot`.
pub fn mount_point_description(role: &str) -> Option<&'static str> {
    Some(match role {
        "Swap" => {
            "The 'swap' area on your computer is used by the operating\n\
            system when running low on memory."
        }
        "Boot" => {
            "The 'boot' area on your computer is where files needed\n\
            to start the operating system are stored."
        }
        "Root" => {
            "The 'root' area on your computer is where core system\n\
            files and applications are stored."
        }
        "Home" => "The 'home' area on your computer is where all your personal\ndata is stored.",
        "BIOS Boot" => {
            "The BIOS boot partition is required to enable booting\n\
            from GPT-partitioned disks on BIOS hardware."
        }
        "PReP Boot" => {
            "The PReP boot partition is required as part of the\n\
            boot loader configuration on some PPC platforms."
        }
        _ => return None,
    })
}
