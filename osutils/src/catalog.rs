use anyhow::{Context, Error};
use log::{debug, warn};

use layoutcheck_api::{
    catalog::{CatalogEntry, DeviceCatalog},
    layout::devicetree::DeviceTree,
};

use crate::{devlinks, lsblk, udevadm};

/// Device catalog backed by the block devices of the running system.
#[derive(Debug, Default, Clone, Copy)]
pub struct LsblkCatalog;

impl LsblkCatalog {
    /// Scans the system into a device tree.
    pub fn device_tree(&self) -> Result<DeviceTree, Error> {
        settle();
        let block_devices = lsblk::list().context("Failed to list block devices")?;
        let tree = lsblk::to_device_tree(&block_devices, &devlinks::read());
        debug!("Discovered {} block device(s)", tree.devices().len());
        Ok(tree)
    }
}

/// Device nodes may lag behind hardware events, so wait for udev before
/// looking. A failure to settle only means the view may be stale.
fn settle() {
    if let Err(e) = udevadm::settle() {
        warn!("Continuing without settled udev: {e:?}");
    }
}

impl DeviceCatalog for LsblkCatalog {
    fn enumerate(&self) -> Result<Vec<CatalogEntry>, Error> {
        settle();
        let block_devices = lsblk::list().context("Failed to list block devices")?;
        let links = devlinks::read();

        let mut entries: Vec<CatalogEntry> = Vec::new();
        for block_device in lsblk::flatten(&block_devices) {
            if entries.iter().any(|e| e.name == block_device.name) {
                continue;
            }
            entries.push(CatalogEntry {
                name: block_device.name.clone(),
                kind: block_device.kind(),
                real_disk: block_device.is_real_disk(),
                links: links.get(&block_device.name).cloned().unwrap_or_default(),
            });
        }

        Ok(entries)
    }

    fn resolve_devspec(&self, spec: &str) -> Option<String> {
        match self.device_tree() {
            Ok(tree) => tree.resolve_devspec(spec),
            Err(e) => {
                warn!("Failed to resolve '{spec}': {e:?}");
                None
            }
        }
    }
}
