use serde::{Deserialize, Serialize};
use strum_macros::IntoStaticStr;

use crate::arch::SystemArchitecture;

/// Firmware interface the machine boots through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, IntoStaticStr)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Firmware {
    /// Legacy PC BIOS.
    Bios,

    /// UEFI firmware.
    Uefi,

    /// UEFI firmware on Apple hardware.
    MacUefi,

    /// IEEE 1275 Open Firmware booting from a PReP partition.
    OpenFirmware,
}

impl Firmware {
    /// Firmware a machine of the given architecture uses, given whether the
    /// firmware exposes an EFI runtime.
    pub fn for_architecture(arch: SystemArchitecture, efi: bool) -> Self {
        match arch {
            SystemArchitecture::Ppc64le => Firmware::OpenFirmware,
            SystemArchitecture::Aarch64 => Firmware::Uefi,
            SystemArchitecture::Amd64 | SystemArchitecture::S390x if efi => Firmware::Uefi,
            SystemArchitecture::Amd64 | SystemArchitecture::S390x => Firmware::Bios,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_architecture() {
        assert_eq!(
            Firmware::for_architecture(SystemArchitecture::Amd64, false),
            Firmware::Bios
        );
        assert_eq!(
            Firmware::for_architecture(SystemArchitecture::Amd64, true),
            Firmware::Uefi
        );
        assert_eq!(
            Firmware::for_architecture(SystemArchitecture::Aarch64, false),
            Firmware::Uefi
        );
        assert_eq!(
            Firmware::for_architecture(SystemArchitecture::Ppc64le, true),
            Firmware::OpenFirmware
        );
    }
}
