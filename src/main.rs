use std::{path::Path, process::ExitCode};

use anyhow::{Context, Error};
use clap::Parser;
use log::{error, info, warn};
use serde::Serialize;

use layoutcheck::{
    autopart::{self, PartitionRequest},
    cli::{Cli, Commands},
    populate::{self, RetryLimit},
    ExitKind, SanityChecker, SpecResolver, StorageSnapshot, LAYOUTCHECK_VERSION,
};
use layoutcheck_api::{
    config::CheckerConfig,
    error::{
        DeviceDiscoveryError, InternalError, InvalidInputError, LayoutCheckError,
        LayoutCheckResultExt, ReportError,
    },
    layout::{
        bootloader::{Bootloader, BootloaderFlavor},
        devicetree::DeviceTree,
        filter_unsupported_disklabel_devices,
        types::{mount_point_description, AutopartType, DeviceType},
        LayoutModel,
    },
    primitives::bytes::ByteCount,
};
use osutils::{catalog::LsblkCatalog, firmware, meminfo};
use sysdefs::disklabel::DiskLabelType;

/// A partitioning request as printed by `autopart`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestReport<'a> {
    #[serde(flatten)]
    request: &'a PartitionRequest,
    device_type: DeviceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'static str>,
}

/// Scans the system, retrying as often as the configuration allows.
fn discover_devices(config: &CheckerConfig) -> Result<DeviceTree, LayoutCheckError> {
    populate::try_populate(
        || LsblkCatalog.device_tree(),
        RetryLimit::new(config.populate_retries),
    )
    .message("Failed to discover block devices")
}

fn installed_memory() -> Result<ByteCount, LayoutCheckError> {
    meminfo::total_memory().structured(DeviceDiscoveryError::ReadMemoryInfo)
}

fn load_layout(path: &Path) -> Result<LayoutModel, LayoutCheckError> {
    let contents = std::fs::read_to_string(path).structured(InvalidInputError::LoadLayout {
        path: path.display().to_string(),
    })?;
    serde_yaml::from_str(&contents).structured(InvalidInputError::ParseLayout)
}

fn to_yaml(value: &impl Serialize) -> Result<String, LayoutCheckError> {
    serde_yaml::to_string(value).structured(InternalError::SerializeOutput)
}

fn resolve(
    config: &CheckerConfig,
    spec: &str,
    disks_only: bool,
    use_devicetree: bool,
) -> Result<ExitKind, LayoutCheckError> {
    let devicetree = if use_devicetree {
        Some(discover_devices(config)?)
    } else {
        None
    };

    let mut resolver = SpecResolver::new(LsblkCatalog);
    for name in resolver.resolve(spec, devicetree.as_ref(), disks_only)? {
        println!("{name}");
    }

    Ok(ExitKind::Done)
}

fn check(
    config: &CheckerConfig,
    layout_path: &Path,
    min_ram: Option<u64>,
) -> Result<ExitKind, LayoutCheckError> {
    let mut layout = load_layout(layout_path)?;
    if layout.installed_memory.is_none() {
        layout.installed_memory = Some(installed_memory()?);
    }

    let findings = SanityChecker::new(config).check(&layout, min_ram.unwrap_or(config.min_ram));
    for finding in &findings {
        println!("{finding}");
    }

    if findings.iter().any(|f| f.is_error()) {
        return Ok(ExitKind::Blocked);
    }
    Ok(ExitKind::Done)
}

fn scan(config: &CheckerConfig) -> Result<ExitKind, LayoutCheckError> {
    let devicetree = discover_devices(config)?;

    let unusable = devicetree.devices().len()
        - filter_unsupported_disklabel_devices(&devicetree, devicetree.devices()).len();
    if unusable > 0 {
        warn!("{unusable} device(s) are on disks with an unsupported disk label");
    }

    let layout = LayoutModel {
        devicetree,
        bootloader: Some(Bootloader::new(firmware::detect().into())),
        installed_memory: Some(installed_memory()?),
        ..Default::default()
    };

    // The on-disk view of the system, before anything is planned on top of it
    let snapshot = StorageSnapshot::from_layout(&layout);
    let storage = snapshot
        .storage()
        .structured(InternalError::Internal("Storage snapshot missing after scan"))?;
    print!("{}", to_yaml(storage)?);

    Ok(ExitKind::Done)
}

fn autopart(disk_space: Option<&str>, scheme: AutopartType) -> Result<ExitKind, LayoutCheckError> {
    let disk_space = disk_space
        .map(|value| {
            ByteCount::from_input(value).structured(InvalidInputError::InvalidSize {
                value: value.into(),
            })
        })
        .transpose()?;

    let flavor = BootloaderFlavor::from(firmware::detect());
    let requests = autopart::default_requests(
        flavor,
        DiskLabelType::Gpt,
        installed_memory()?,
        disk_space,
    );
    info!(
        "Default partitioning for {} boot uses {scheme}",
        <&str>::from(flavor)
    );

    let reports: Vec<_> = requests
        .iter()
        .map(|request| RequestReport {
            request,
            device_type: request.device_type(scheme),
            description: request.role().and_then(mount_point_description),
        })
        .collect();
    print!("{}", to_yaml(&reports)?);

    Ok(ExitKind::Done)
}

fn run(args: &Cli) -> Result<ExitKind, LayoutCheckError> {
    info!("Layout checker version: {LAYOUTCHECK_VERSION}");

    let config = CheckerConfig::load(&args.config).message("Failed to load configuration")?;

    let res = match &args.command {
        Commands::Resolve {
            spec,
            disks_only,
            devicetree,
        } => resolve(&config, spec, *disks_only, *devicetree),
        Commands::Check {
            layout,
            min_ram,
            error,
        } => {
            let res = check(&config, layout, *min_ram);

            // return error if requested
            if let (Some(error_path), Err(e)) = (error, &res) {
                if let Err(e2) =
                    std::fs::write(error_path, serde_yaml::to_string(&e).unwrap_or("".into()))
                {
                    error!("Failed to write error to file: {e2}");
                }
            }

            res
        }
        Commands::Scan => scan(&config),
        Commands::Autopart { disk_space, scheme } => autopart(disk_space.as_deref(), *scheme),
    };

    res.message(format!("Failed to execute '{}' command", args.command))
}

fn setup_logging(args: &Cli) -> Result<(), Error> {
    env_logger::builder()
        .format_timestamp(None)
        .filter_level(args.verbosity)
        .try_init()
        .context("Logger already registered")
}

fn setup_tracing(args: &Cli) -> Result<(), Error> {
    use tracing_subscriber::{filter, layer::SubscriberExt, Layer};

    if !args.trace {
        return Ok(());
    }

    let layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_filter(filter::LevelFilter::INFO);

    tracing::subscriber::set_global_default(tracing_subscriber::Registry::default().with(layer))
        .context("Failed to set global default subscriber")
}

fn main() -> ExitCode {
    // Parse args
    let args = Cli::parse();

    if let Err(e) = setup_logging(&args) {
        eprintln!("Failed to initialize logging: {e:?}");
        return ExitCode::from(2);
    }

    if let Err(e) = setup_tracing(&args) {
        error!("Failed to initialize tracing: {e:?}");
        return ExitCode::from(2);
    }

    match run(&args) {
        Ok(ExitKind::Done) => ExitCode::SUCCESS,
        Ok(ExitKind::Blocked) => ExitCode::from(1),
        Err(e) => {
            error!("Layout checker failed: {e:?}");
            ExitCode::from(2)
        }
    }
}
