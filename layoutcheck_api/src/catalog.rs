//! Device discovery capability consumed by spec resolution.

use anyhow::Error;
use serde::{Deserialize, Serialize};

use crate::{constants::DEV_PATH_PREFIX, layout::device::DeviceKind};

/// One device as reported by hardware discovery.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub name: String,

    pub kind: DeviceKind,

    /// Whether the device is a disk backed by hardware, as opposed to a
    /// virtual disk such as a loop or zram device.
    pub real_disk: bool,

    /// Symlinks to the device node, such as the ones under `/dev/disk/by-id`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,
}

impl CatalogEntry {
    /// The device node path followed by every symlink to it.
    pub fn node_paths(&self) -> impl Iterator<Item = String> + '_ {
        std::iter::once(format!("{DEV_PATH_PREFIX}{}", self.name))
            .chain(self.links.iter().cloned())
    }
}

/// A source of truth about the block devices present on a system.
///
/// Enumeration may be slow (it can involve waiting for udev to settle), so
/// callers should cache the result where they can.
pub trait DeviceCatalog {
    /// Enumerates every device currently present.
    fn enumerate(&self) -> Result<Vec<CatalogEntry>, Error>;

    /// Resolves a device specification to a device name. Unlike glob
    /// matching, this understands `LABEL=`, `UUID=`, `PARTUUID=` and
    /// `PARTLABEL=` specifications as well as names and node paths.
    fn resolve_devspec(&self, spec: &str) -> Option<String>;
}

impl<T: DeviceCatalog + ?Sized> DeviceCatalog for &T {
    fn enumerate(&self) -> Result<Vec<CatalogEntry>, Error> {
        (**self).enumerate()
    }

    fn resolve_devspec(&self, spec: &str) -> Option<String> {
        (**self).resolve_devspec(spec)
    }
}
