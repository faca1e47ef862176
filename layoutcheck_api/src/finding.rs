//! Findings produced by the layout sanity checks.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use strum_macros::{EnumIs, IntoStaticStr};

/// How serious a finding is. Any `Error` blocks the installation; warnings
/// are only shown to the operator.
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIs,
    IntoStaticStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Severity {
    Error,
    Warning,
}

/// Which rule produced a finding.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum FindingKind {
    MissingRoot,
    SmallRoot,
    SmallMountPoint,
    FormatSize,
    BootloaderStage1,
    BootloaderStage2,
    MissingBiosBoot,
    NoSwap,
    SwapWithoutUuid,
    MountPlacement,
    RootMustFormat,
    LuksWithoutKey,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub severity: Severity,
    pub kind: FindingKind,
    pub message: String,
}

impl Finding {
    pub fn error(kind: FindingKind, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            kind,
            message: message.into(),
        }
    }

    pub fn warning(kind: FindingKind, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity.is_error()
    }
}

impl Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}",
            <&str>::from(self.severity),
            self.message
        )
    }
}
