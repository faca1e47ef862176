use strum_macros::IntoStaticStr;

/// System architecture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr)]
pub enum SystemArchitecture {
    /// 64-bit x86
    #[strum(serialize = "amd64")]
    Amd64,

    /// 64-bit ARM
    #[strum(serialize = "arm64")]
    Aarch64,

    /// 64-bit little-endian POWER
    #[strum(serialize = "ppc64le")]
    Ppc64le,

    /// IBM Z
    #[strum(serialize = "s390x")]
    S390x,
}

impl SystemArchitecture {
    /// Get the current system architecture
    pub const fn current() -> Self {
        #[cfg(target_arch = "aarch64")]
        {
            SystemArchitecture::Aarch64
        }

        #[cfg(target_arch = "powerpc64")]
        {
            SystemArchitecture::Ppc64le
        }

        #[cfg(target_arch = "s390x")]
        {
            SystemArchitecture::S390x
        }

        #[cfg(not(any(
            target_arch = "aarch64",
            target_arch = "powerpc64",
            target_arch = "s390x"
        )))]
        {
            SystemArchitecture::Amd64
        }
    }
}
