use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    constants::{
        DEFAULT_MIN_RAM_MIB, DEFAULT_NO_SWAP_EXTRA_RAM_MIB, DEFAULT_POPULATE_RETRIES,
        DEFAULT_PRODUCT_NAME,
    },
    error::{InitializationError, LayoutCheckError, ReportError},
    primitives::bytes::ByteCount,
};

/// Definition of the checker's configuration file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct CheckerConfig {
    /// Name of the product being installed, used in messages.
    pub product_name: String,

    /// Minimum RAM in MiB needed for the installation with swap available.
    pub min_ram: u64,

    /// Additional RAM in MiB needed when no swap is defined.
    pub no_swap_extra_ram: u64,

    /// Device discovery failures tolerated before aborting.
    pub populate_retries: usize,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            product_name: DEFAULT_PRODUCT_NAME.into(),
            min_ram: DEFAULT_MIN_RAM_MIB,
            no_swap_extra_ram: DEFAULT_NO_SWAP_EXTRA_RAM_MIB,
            populate_retries: DEFAULT_POPULATE_RETRIES,
        }
    }
}

impl CheckerConfig {
    /// Loads the configuration from a YAML file. A missing file yields the
    /// defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LayoutCheckError> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file '{}' not found, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(path).structured(InitializationError::LoadConfig {
                path: path.display().to_string(),
            })?;

        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, LayoutCheckError> {
        serde_yaml::from_str(contents).structured(InitializationError::ParseConfig)
    }

    pub fn no_swap_margin(&self) -> ByteCount {
        ByteCount::from_mib(self.no_swap_extra_ram)
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use crate::error::ErrorKind;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = CheckerConfig::from_yaml("{}").unwrap();
        assert_eq!(config, CheckerConfig::default());
        assert_eq!(config.min_ram, 320);
        assert_eq!(config.no_swap_margin(), ByteCount::from_mib(200));
    }

    #[test]
    fn test_parse() {
        let config = CheckerConfig::from_yaml(indoc! {r#"
            productName: Example OS
            minRam: 1024
            populateRetries: 5
        "#})
        .unwrap();

        assert_eq!(config.product_name, "Example OS");
        assert_eq!(config.min_ram, 1024);
        assert_eq!(config.no_swap_extra_ram, DEFAULT_NO_SWAP_EXTRA_RAM_MIB);
        assert_eq!(config.populate_retries, 5);
    }

    #[test]
    fn test_unknown_field() {
        let error = CheckerConfig::from_yaml("swapiness: 12").unwrap_err();
        assert_eq!(
            error.kind(),
            &ErrorKind::Initialization(InitializationError::ParseConfig)
        );
    }

    #[test]
    fn test_missing_file() {
        let config = CheckerConfig::load("/does/not/exist/config.yaml").unwrap();
        assert_eq!(config, CheckerConfig::default());
    }
}
