use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::PathBuf,
};

use clap::{Parser, Subcommand};
use log::LevelFilter;

use layoutcheck_api::{constants::CHECKER_CONFIG_PATH, layout::types::AutopartType};

use crate::LAYOUTCHECK_VERSION;

#[derive(Parser, Debug)]
#[clap(version = LAYOUTCHECK_VERSION)]
pub struct Cli {
    /// Logging verbosity [OFF, ERROR, WARN, INFO, DEBUG, TRACE]
    #[arg(global = true, short, long, default_value_t = LevelFilter::Warn)]
    pub verbosity: LevelFilter,

    /// Emit JSON trace events to stderr
    #[arg(global = true, long)]
    pub trace: bool,

    /// Path to the checker configuration
    #[arg(global = true, long, default_value = CHECKER_CONFIG_PATH)]
    pub config: PathBuf,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve a device specification to device names
    ///
    /// Specifications are '|'-separated alternatives, each a device name, a
    /// /dev path, a glob such as 'sd*', or a LABEL=/UUID=/PARTUUID=/PARTLABEL=
    /// identifier.
    Resolve {
        /// The device specification
        #[clap(index = 1)]
        spec: String,

        /// Only return whole disks
        #[clap(long)]
        disks_only: bool,

        /// Resolve names through the discovered device tree, which also
        /// understands labels and UUIDs
        #[clap(long)]
        devicetree: bool,
    },

    /// Check a proposed storage layout for problems
    Check {
        /// Path to the layout YAML
        #[clap(index = 1)]
        layout: PathBuf,

        /// Memory in MiB needed by the installation when swap is available
        #[clap(long)]
        min_ram: Option<u64>,

        /// Path to save an eventual fatal error
        #[clap(short, long)]
        error: Option<PathBuf>,
    },

    /// Discover the block devices of this system and print them as a layout
    Scan,

    /// Print the default automatic partitioning requests for this system
    Autopart {
        /// Disk space available for the installation, e.g. '64 GiB'
        #[clap(long)]
        disk_space: Option<String>,

        /// Partitioning scheme used to report device types
        #[clap(long, default_value = "lvm", value_parser = parse_scheme)]
        scheme: AutopartType,
    },
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Resolve { .. } => "resolve",
            Commands::Check { .. } => "check",
            Commands::Scan => "scan",
            Commands::Autopart { .. } => "autopart",
        }
    }
}

impl Display for Commands {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.name())
    }
}

fn parse_scheme(value: &str) -> Result<AutopartType, String> {
    serde_yaml::from_str(value).map_err(|_| {
        format!("unknown scheme '{value}', expected one of plain, btrfs, lvm, lvm-thinp")
    })
}
