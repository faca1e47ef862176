//! Default requests for automatic partitioning.

use serde::Serialize;

use layoutcheck_api::{
    constants::{BOOT_MOUNT_POINT_PATH, ESP_MOUNT_POINT_PATH, ROOT_MOUNT_POINT_PATH},
    layout::{
        bootloader::BootloaderFlavor,
        types::{device_type_from_autopart, AutopartType, DeviceType},
    },
    primitives::bytes::{ByteCount, GIB},
};
use sysdefs::{
    disklabel::DiskLabelType,
    filesystems::{FilesystemType, FormatType, SpecialFormatType},
};

/// Filesystem for new volumes.
pub const DEFAULT_FS: FilesystemType = FilesystemType::Xfs;

/// Filesystem for a new /boot.
pub const DEFAULT_BOOT_FS: FilesystemType = FilesystemType::Xfs;

const BOOT_SIZE: ByteCount = ByteCount::from_mib(300);
const ESP_SIZE: ByteCount = ByteCount::from_mib(200);
const BIOSBOOT_SIZE: ByteCount = ByteCount::from_mib(1);
const PREPBOOT_SIZE: ByteCount = ByteCount::from_mib(4);

/// Share of the available disk space swap may take at most.
const MAX_SWAP_DISK_RATIO: u64 = 10;

/// A volume automatic partitioning should create.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PartitionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mount_point: Option<String>,

    #[serde(rename = "fstype")]
    pub format_type: FormatType,

    pub size: ByteCount,

    /// Upper bound when growing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_size: Option<ByteCount>,

    /// Grow to fill the available space.
    pub grow: bool,

    /// Create as a logical volume rather than a plain partition.
    pub lv: bool,

    pub encrypted: bool,
}

impl PartitionRequest {
    fn new(format_type: impl Into<FormatType>, size: ByteCount) -> Self {
        Self {
            mount_point: None,
            format_type: format_type.into(),
            size,
            max_size: None,
            grow: false,
            lv: false,
            encrypted: false,
        }
    }

    fn mounted_at(mut self, mount_point: &str) -> Self {
        self.mount_point = Some(mount_point.into());
        self
    }

    /// Role of the request as shown to the operator, if it has a
    /// well-known one.
    pub fn role(&self) -> Option<&'static str> {
        match (&self.format_type, self.mount_point.as_deref()) {
            (FormatType::Special(SpecialFormatType::Swap), _) => Some("Swap"),
            (FormatType::Special(SpecialFormatType::Biosboot), _) => Some("BIOS Boot"),
            (FormatType::Special(SpecialFormatType::Prepboot), _) => Some("PReP Boot"),
            (_, Some(ROOT_MOUNT_POINT_PATH)) => Some("Root"),
            (_, Some(BOOT_MOUNT_POINT_PATH)) => Some("Boot"),
            _ => None,
        }
    }

    /// Device type the request is created as under `scheme`.
    pub fn device_type(&self, scheme: AutopartType) -> DeviceType {
        if self.lv {
            device_type_from_autopart(scheme)
        } else {
            DeviceType::StandardPartition
        }
    }
}

/// Recommended swap size for a machine with `memory` of RAM. When the
/// available disk space is known, swap takes at most a tenth of it.
pub fn swap_suggestion(memory: ByteCount, disk_space: Option<ByteCount>) -> ByteCount {
    let suggestion = if memory < ByteCount(2 * GIB) {
        memory * 2
    } else if memory < ByteCount(8 * GIB) {
        memory
    } else if memory < ByteCount(64 * GIB) {
        memory / 2
    } else {
        ByteCount(4 * GIB)
    };

    match disk_space {
        Some(space) => suggestion.min(space / MAX_SWAP_DISK_RATIO),
        None => suggestion,
    }
}

/// Requests the platform needs to boot.
fn boot_requests(flavor: BootloaderFlavor, disklabel: DiskLabelType) -> Vec<PartitionRequest> {
    let mut requests =
        vec![PartitionRequest::new(DEFAULT_BOOT_FS, BOOT_SIZE).mounted_at(BOOT_MOUNT_POINT_PATH)];

    match flavor {
        BootloaderFlavor::Bios if disklabel.is_gpt() => {
            requests.push(PartitionRequest::new(
                SpecialFormatType::Biosboot,
                BIOSBOOT_SIZE,
            ));
        }
        BootloaderFlavor::Bios => (),
        BootloaderFlavor::Efi => requests.push(
            PartitionRequest::new(FilesystemType::Efi, ESP_SIZE).mounted_at(ESP_MOUNT_POINT_PATH),
        ),
        BootloaderFlavor::MacEfi => requests.push(
            PartitionRequest::new(FilesystemType::Macefi, ESP_SIZE)
                .mounted_at(ESP_MOUNT_POINT_PATH),
        ),
        BootloaderFlavor::Prep => requests.push(PartitionRequest::new(
            SpecialFormatType::Prepboot,
            PREPBOOT_SIZE,
        )),
    }

    requests
}

/// The default automatic partitioning requests: a growable root volume, what
/// the platform needs to boot and an encrypted swap volume.
pub fn default_requests(
    flavor: BootloaderFlavor,
    disklabel: DiskLabelType,
    memory: ByteCount,
    disk_space: Option<ByteCount>,
) -> Vec<PartitionRequest> {
    let root = PartitionRequest {
        max_size: Some(ByteCount(3 * GIB)),
        grow: true,
        lv: true,
        ..PartitionRequest::new(DEFAULT_FS, ByteCount(GIB)).mounted_at(ROOT_MOUNT_POINT_PATH)
    };

    let swap = PartitionRequest {
        lv: true,
        encrypted: true,
        ..PartitionRequest::new(
            SpecialFormatType::Swap,
            swap_suggestion(memory, disk_space),
        )
    };

    let mut requests = vec![root];
    requests.extend(boot_requests(flavor, disklabel));
    requests.push(swap);
    requests
}
