use serde::{Deserialize, Serialize};
use strum_macros::{EnumIs, IntoStaticStr};

/// Partition table formats that may be written to a disk.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, IntoStaticStr, EnumIs,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DiskLabelType {
    /// GUID Partition Table.
    Gpt,

    /// Legacy MBR partition table, reported as `dos` by some tools.
    #[serde(alias = "dos", alias = "mbr")]
    Msdos,

    /// Apple Partition Map.
    Mac,

    /// IBM DASD label.
    Dasd,
}
