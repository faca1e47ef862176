use std::{collections::BTreeMap, fs, path::Path};

use log::{debug, trace};

/// Directory under which udev keeps the `by-id`, `by-path`, `by-uuid`, ...
/// symlinks to device nodes.
const DEV_DISK_DIRECTORY: &str = "/dev/disk";

/// Symlinks to device nodes, keyed by the name of the device they point to.
pub type DeviceLinks = BTreeMap<String, Vec<String>>;

/// Collects the udev symlinks to device nodes on the running system.
pub fn read() -> DeviceLinks {
    let links = read_from(Path::new(DEV_DISK_DIRECTORY));
    debug!("Found symlinks for {} device(s)", links.len());
    links
}

/// Collects the symlinks one level below the subdirectories of `directory`.
/// Entries that cannot be read are skipped. Each device's links are sorted.
fn read_from(directory: &Path) -> DeviceLinks {
    let mut links = DeviceLinks::new();

    let categories = match fs::read_dir(directory) {
        Ok(categories) => categories,
        Err(e) => {
            trace!("Cannot read '{}': {e}", directory.display());
            return links;
        }
    };

    for category in categories.flatten() {
        let Ok(entries) = fs::read_dir(category.path()) else {
            continue;
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let Ok(target) = fs::read_link(&path) else {
                continue;
            };
            let Some(name) = target.file_name().and_then(|name| name.to_str()) else {
                continue;
            };

            links
                .entry(name.to_string())
                .or_default()
                .push(path.display().to_string());
        }
    }

    links.values_mut().for_each(|paths| paths.sort());
    links
}

#[cfg(test)]
mod tests {
    use std::os::unix::fs::symlink;

    use super::*;

    #[test]
    fn test_read_from() {
        let temp_dir = tempfile::tempdir().unwrap();
        let by_id = temp_dir.path().join("by-id");
        let by_uuid = temp_dir.path().join("by-uuid");
        fs::create_dir(&by_id).unwrap();
        fs::create_dir(&by_uuid).unwrap();

        // udev links are relative and the targets need not exist
        let disk_link = by_id.join("ata-QEMU_HARDDISK_QM00001");
        let part_link = by_id.join("ata-QEMU_HARDDISK_QM00001-part1");
        let uuid_link = by_uuid.join("84A0-088E");
        symlink("../../sda", &disk_link).unwrap();
        symlink("../../sda1", &part_link).unwrap();
        symlink("../../sda1", &uuid_link).unwrap();
        fs::write(by_id.join("not-a-link"), "").unwrap();

        let links = read_from(temp_dir.path());
        assert_eq!(links.len(), 2);
        assert_eq!(links["sda"], vec![disk_link.display().to_string()]);
        assert_eq!(
            links["sda1"],
            vec![
                part_link.display().to_string(),
                uuid_link.display().to_string()
            ]
        );
    }

    #[test]
    fn test_read_from_missing_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(read_from(&temp_dir.path().join("missing")).is_empty());
    }
}
