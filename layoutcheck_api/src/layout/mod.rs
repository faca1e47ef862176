use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{constants::ROOT_MOUNT_POINT_PATH, primitives::bytes::ByteCount};

pub mod bootloader;
pub mod device;
pub mod devicetree;
pub mod types;

use bootloader::Bootloader;
use device::Device;
use devicetree::DeviceTree;

/// Error reported when the root device of an existing installation is reused
/// without being reformatted.
pub const ROOT_MUST_FORMAT: &str = "You must create a new file system on the root device.";

/// Mount points and swap areas of the installation being planned.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FilesystemSet {
    /// Mount point path to device name.
    #[serde(default)]
    pub mounts: BTreeMap<String, String>,

    /// Names of swap devices.
    #[serde(default)]
    pub swaps: Vec<String>,
}

/// An operating system installation already present on the system.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ExistingRoot {
    /// Name of the installation, e.g. `Fedora 40 for x86_64`.
    pub name: String,

    /// Mount point path to device name, as configured in the installation.
    #[serde(default)]
    pub mounts: BTreeMap<String, String>,

    #[serde(default)]
    pub swaps: Vec<String>,
}

/// A proposed storage layout.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LayoutModel {
    /// Every device of the layout, existing or planned.
    #[serde(default, rename = "devices")]
    pub devicetree: DeviceTree,

    /// Installations found on the system.
    #[serde(default)]
    pub roots: Vec<ExistingRoot>,

    #[serde(default, rename = "filesystems")]
    pub fsset: FilesystemSet,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bootloader: Option<Bootloader>,

    /// Memory installed in the machine. Filled in from the running system
    /// when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed_memory: Option<ByteCount>,
}

impl LayoutModel {
    /// Mount points paired with their devices, ordered by path. Mount points
    /// naming unknown devices are skipped.
    pub fn mount_points(&self) -> Vec<(&str, &Device)> {
        self.fsset
            .mounts
            .iter()
            .filter_map(|(path, name)| {
                self.devicetree
                    .get_device_by_name(name)
                    .map(|device| (path.as_str(), device))
            })
            .collect()
    }

    pub fn mounted_device(&self, path: &str) -> Option<&Device> {
        self.fsset
            .mounts
            .get(path)
            .and_then(|name| self.devicetree.get_device_by_name(name))
    }

    /// Mount point the named device is mounted at.
    pub fn mount_point_of(&self, name: &str) -> Option<&str> {
        self.fsset
            .mounts
            .iter()
            .find(|(_, device)| *device == name)
            .map(|(path, _)| path.as_str())
    }

    pub fn root_device(&self) -> Option<&Device> {
        self.mounted_device(ROOT_MOUNT_POINT_PATH)
    }

    pub fn swap_devices(&self) -> Vec<&Device> {
        self.fsset
            .swaps
            .iter()
            .filter_map(|name| self.devicetree.get_device_by_name(name))
            .collect()
    }

    /// Mounts `device` at `path`, replacing whatever was mounted there.
    pub fn mount(&mut self, path: impl Into<String>, device: impl Into<String>) {
        self.fsset.mounts.insert(path.into(), device.into());
    }

    /// Returns an error message when `device` cannot be used without being
    /// reformatted. That is the case for the existing root filesystem of an
    /// installation already on the system.
    pub fn must_format(&self, device: &Device) -> Option<&'static str> {
        if !device.format.exists {
            return None;
        }

        self.roots
            .iter()
            .any(|root| root.mounts.get(ROOT_MOUNT_POINT_PATH) == Some(&device.name))
            .then_some(ROOT_MUST_FORMAT)
    }
}

/// Drops every device that is, or is built on, a device with an unsupported
/// disk label.
pub fn filter_unsupported_disklabel_devices<'a>(
    devicetree: &'a DeviceTree,
    devices: impl IntoIterator<Item = &'a Device>,
) -> Vec<&'a Device> {
    devices
        .into_iter()
        .filter(|device| {
            device.disklabel_supported
                && devicetree
                    .ancestors(device)
                    .iter()
                    .all(|ancestor| ancestor.disklabel_supported)
        })
        .collect()
}
