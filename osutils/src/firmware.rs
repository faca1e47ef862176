use std::{fs, path::Path};

use log::debug;

use sysdefs::{arch::SystemArchitecture, firmware::Firmware};

/// Present when the kernel was booted through UEFI.
const EFI_SYSFS_PATH: &str = "/sys/firmware/efi";

const DMI_SYS_VENDOR_PATH: &str = "/sys/class/dmi/id/sys_vendor";

/// Detects the firmware interface of the running machine.
pub fn detect() -> Firmware {
    let efi = Path::new(EFI_SYSFS_PATH).exists();
    let vendor = fs::read_to_string(DMI_SYS_VENDOR_PATH).unwrap_or_default();
    let firmware = classify(SystemArchitecture::current(), efi, &vendor);
    debug!("Detected {} firmware", <&str>::from(firmware));
    firmware
}

fn classify(arch: SystemArchitecture, efi: bool, vendor: &str) -> Firmware {
    match Firmware::for_architecture(arch, efi) {
        Firmware::Uefi if vendor.trim().starts_with("Apple") => Firmware::MacUefi,
        firmware => firmware,
    }
}
