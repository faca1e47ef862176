use const_format::formatcp;

use crate::primitives::bytes::ByteCount;

// Configuration constants

/// Default path to load the checker configuration from.
pub const CHECKER_CONFIG_PATH: &str = "/etc/layoutcheck/config.yaml";

/// Product name used in messages when none is configured.
pub const DEFAULT_PRODUCT_NAME: &str = "Linux";

/// Minimum RAM, in MiB, needed for an installation with swap available.
pub const DEFAULT_MIN_RAM_MIB: u64 = 320;

/// Extra RAM, in MiB, needed on top of the minimum when no swap is defined.
pub const DEFAULT_NO_SWAP_EXTRA_RAM_MIB: u64 = 200;

/// Number of device discovery failures tolerated before giving up.
pub const DEFAULT_POPULATE_RETRIES: usize = 3;

// Device path constants

/// Directory holding device nodes.
pub const DEV_DIRECTORY: &str = "/dev";

/// Prefix of an absolute device node path.
pub const DEV_PATH_PREFIX: &str = formatcp!("{DEV_DIRECTORY}/");

/// Directory holding device-mapper nodes.
pub const DEV_MAPPER_PREFIX: &str = formatcp!("{DEV_DIRECTORY}/mapper/");

/// Directory holding named MD RAID nodes.
pub const DEV_MD_PREFIX: &str = formatcp!("{DEV_DIRECTORY}/md/");

/// Separator between alternative sub-specs in a device specification.
pub const DEVICE_SPEC_ALTERNATION: char = '|';

// Device specification prefixes

pub const LABEL_SPEC_PREFIX: &str = "LABEL=";
pub const UUID_SPEC_PREFIX: &str = "UUID=";
pub const PARTUUID_SPEC_PREFIX: &str = "PARTUUID=";
pub const PARTLABEL_SPEC_PREFIX: &str = "PARTLABEL=";

// Mount point constants

/// Root volume mount point path.
pub const ROOT_MOUNT_POINT_PATH: &str = "/";

/// Boot volume mount point path.
pub const BOOT_MOUNT_POINT_PATH: &str = "/boot";

/// ESP mount point path.
pub const ESP_MOUNT_POINT_PATH: &str = "/boot/efi";

// Sanity check thresholds

/// Smallest root filesystem that does not trigger a warning.
pub const ROOT_MIN_SIZE: ByteCount = ByteCount::from_mib(250);

/// Recommended minimum sizes for well-known separate mount points, in the
/// order they are checked.
pub const RECOMMENDED_MOUNT_SIZES: [(&str, ByteCount); 5] = [
    ("/usr", ByteCount::from_mib(250)),
    ("/tmp", ByteCount::from_mib(50)),
    ("/var", ByteCount::from_mib(384)),
    ("/home", ByteCount::from_mib(100)),
    ("/boot", ByteCount::from_mib(200)),
];

/// Mount points that must live on a mountable, Linux-native filesystem.
pub const MUST_BE_ON_LINUX_FS: [&str; 7] = [
    "/",
    "/var",
    "/tmp",
    "/usr",
    "/home",
    "/usr/share",
    "/usr/lib",
];

/// Directories that must be part of the root filesystem and can never be
/// separate mount points.
pub const MUST_BE_ON_ROOT: [&str; 9] = [
    "/bin",
    "/dev",
    "/sbin",
    "/etc",
    "/lib",
    "/root",
    "/mnt",
    "lost+found",
    "/proc",
];

/// Installed memory is reported rounded up to a multiple of this block size.
pub const MEMORY_ROUNDING_BLOCK: ByteCount = ByteCount::from_mib(128);
