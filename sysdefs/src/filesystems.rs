use std::fmt::Display;

use serde::{
    de::{
        value::{Error, StrDeserializer},
        IntoDeserializer,
    },
    Deserialize, Deserializer, Serialize,
};
use strum_macros::{EnumIs, IntoStaticStr};

const KIB: u64 = 1 << 10;
const MIB: u64 = 1 << 20;
const GIB: u64 = 1 << 30;
const TIB: u64 = 1 << 40;
const EIB: u64 = 1 << 60;

/// Superset of every format a block device can carry.
///
/// A format is either a filesystem that can be mounted, a special on-disk
/// structure that is not mountable (swap, LUKS headers, boot loader areas,
/// volume-manager metadata), or something unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, EnumIs)]
pub enum FormatType {
    /// The device carries no recognizable format.
    #[default]
    None,
    Filesystem(FilesystemType),
    Special(SpecialFormatType),
    Other(String),
}

impl From<FilesystemType> for FormatType {
    fn from(fs: FilesystemType) -> Self {
        FormatType::Filesystem(fs)
    }
}

impl From<SpecialFormatType> for FormatType {
    fn from(special: SpecialFormatType) -> Self {
        FormatType::Special(special)
    }
}

impl From<&str> for FormatType {
    fn from(name: &str) -> Self {
        if name.is_empty() || name == "none" {
            return FormatType::None;
        }

        if let Ok(fs) = FilesystemType::deserialize(str_deserializer(name)) {
            return fs.into();
        }

        SpecialFormatType::deserialize(str_deserializer(name))
            .map(FormatType::from)
            .unwrap_or_else(|_| FormatType::Other(name.to_string()))
    }
}

impl FormatType {
    /// Name of the format type as it appears in configuration and on disk.
    pub fn as_str(&self) -> &str {
        match self {
            FormatType::None => "none",
            FormatType::Filesystem(fs) => {
                let name: &'static str = (*fs).into();
                name
            }
            FormatType::Special(special) => {
                let name: &'static str = (*special).into();
                name
            }
            FormatType::Other(name) => name.as_str(),
        }
    }

    /// Whether a device with this format can be mounted somewhere in the
    /// filesystem hierarchy.
    pub fn is_mountable(&self) -> bool {
        matches!(self, FormatType::Filesystem(_))
    }

    /// Whether the format belongs to the native Linux family.
    pub fn is_linux_native(&self) -> bool {
        match self {
            FormatType::Filesystem(fs) => matches!(
                fs,
                FilesystemType::Ext2
                    | FilesystemType::Ext3
                    | FilesystemType::Ext4
                    | FilesystemType::Xfs
                    | FilesystemType::Btrfs
            ),
            FormatType::Special(special) => matches!(
                special,
                SpecialFormatType::Swap
                    | SpecialFormatType::Luks
                    | SpecialFormatType::Lvmpv
                    | SpecialFormatType::Mdmember
            ),
            FormatType::None | FormatType::Other(_) => false,
        }
    }

    /// Whether the format may only ever live directly on a partition.
    pub fn is_partition_only(&self) -> bool {
        matches!(
            self,
            FormatType::Filesystem(FilesystemType::Macefi)
                | FormatType::Special(
                    SpecialFormatType::Prepboot
                        | SpecialFormatType::Biosboot
                        | SpecialFormatType::Appleboot
                )
        )
    }

    /// Default minimum device size, in bytes, for this format.
    pub fn min_size(&self) -> u64 {
        match self {
            FormatType::Filesystem(fs) => match fs {
                FilesystemType::Xfs => 16 * MIB,
                FilesystemType::Btrfs => 256 * MIB,
                FilesystemType::Efi | FilesystemType::Macefi => 50 * MIB,
                _ => 0,
            },
            FormatType::Special(special) => match special {
                SpecialFormatType::Biosboot => 512 * KIB,
                SpecialFormatType::Prepboot => 4 * MIB,
                SpecialFormatType::Appleboot => 768 * KIB,
                SpecialFormatType::Luks => 2 * MIB,
                _ => 0,
            },
            FormatType::None | FormatType::Other(_) => 0,
        }
    }

    /// Default maximum device size, in bytes, for this format. `None` means
    /// unbounded.
    pub fn max_size(&self) -> Option<u64> {
        match self {
            FormatType::Filesystem(fs) => match fs {
                FilesystemType::Ext2 => Some(8 * TIB),
                FilesystemType::Ext3 => Some(16 * TIB),
                FilesystemType::Ext4 => Some(EIB),
                FilesystemType::Vfat => Some(TIB),
                FilesystemType::Efi | FilesystemType::Macefi => Some(2 * GIB),
                FilesystemType::Hfsplus => Some(2 * TIB),
                FilesystemType::Xfs
                | FilesystemType::Btrfs
                | FilesystemType::Ntfs
                | FilesystemType::Iso9660 => None,
            },
            FormatType::Special(special) => match special {
                SpecialFormatType::Biosboot | SpecialFormatType::Appleboot => Some(MIB),
                SpecialFormatType::Prepboot => Some(10 * MIB),
                SpecialFormatType::Swap => Some(16 * TIB),
                SpecialFormatType::Luks
                | SpecialFormatType::Lvmpv
                | SpecialFormatType::Mdmember => None,
            },
            FormatType::None | FormatType::Other(_) => None,
        }
    }
}

impl Display for FormatType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FormatType {
    fn deserialize<D>(deserializer: D) -> Result<FormatType, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(FormatType::from(
            String::deserialize(deserializer)?.to_lowercase().as_str(),
        ))
    }
}

impl Serialize for FormatType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// Mountable filesystem types understood by the layout checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, IntoStaticStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FilesystemType {
    Btrfs,
    /// FAT filesystem marked as an EFI System Partition.
    Efi,
    Ext2,
    Ext3,
    Ext4,
    Hfsplus,
    Iso9660,
    /// HFS+ filesystem used as an ESP on Apple hardware.
    Macefi,
    Ntfs,
    Vfat,
    Xfs,
}

/// Non-mountable on-disk formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, IntoStaticStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SpecialFormatType {
    Appleboot,
    Biosboot,
    Luks,
    Lvmpv,
    Mdmember,
    Prepboot,
    Swap,
}

/// Wraps a &str so serde can map it onto a unit enum variant.
fn str_deserializer(name: &str) -> StrDeserializer<'_, Error> {
    name.into_deserializer()
}
