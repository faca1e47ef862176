//! The sanity rules, in the order they are evaluated:
//!
//! 1. root: a root filesystem exists and is not tiny
//! 2. mount_sizes: well-known mount points meet their recommended size
//! 3. format_sizes: mounted devices fit their format's size limits
//! 4. bootloader_stage1: the boot loader has a valid target
//! 5. bootloader_stage2: the boot loader has a valid boot partition
//! 6. biosboot: BIOS machines booting GPT disks have a biosboot partition
//! 7. swap: swap exists, or there is enough memory to go without
//! 8. swap_uuid: existing swap can be referred to by UUID
//! 9. mount_placement: system directories are placed sensibly
//! 10. root_format: an old root filesystem is reformatted
//! 11. luks_keys: new encrypted devices have a key

use std::cmp::Ordering;

use layoutcheck_api::{
    constants::{MUST_BE_ON_LINUX_FS, MUST_BE_ON_ROOT, RECOMMENDED_MOUNT_SIZES, ROOT_MIN_SIZE},
    finding::{Finding, FindingKind},
    layout::{bootloader::Bootloader, device::Device, LayoutModel},
    primitives::bytes::ByteCount,
};
use sysdefs::{disklabel::DiskLabelType, filesystems::SpecialFormatType};

/// Everything a rule may look at.
pub(super) struct Context<'a> {
    pub layout: &'a LayoutModel,
    pub product_name: &'a str,
    pub min_ram: ByteCount,
    pub no_swap_margin: ByteCount,
}

impl Context<'_> {
    /// The boot loader, unless there is none or it is skipped.
    fn bootloader(&self) -> Option<&Bootloader> {
        self.layout.bootloader.as_ref().filter(|b| !b.skip)
    }

    fn device(&self, name: Option<&str>) -> Option<&Device> {
        name.and_then(|name| self.layout.devicetree.get_device_by_name(name))
    }
}

pub(super) struct Rule {
    pub name: &'static str,
    pub check: fn(&Context) -> Vec<Finding>,
}

pub(super) const RULES: [Rule; 11] = [
    Rule {
        name: "root",
        check: check_root,
    },
    Rule {
        name: "mount_sizes",
        check: check_mount_sizes,
    },
    Rule {
        name: "format_sizes",
        check: check_format_sizes,
    },
    Rule {
        name: "bootloader_stage1",
        check: check_bootloader_stage1,
    },
    Rule {
        name: "bootloader_stage2",
        check: check_bootloader_stage2,
    },
    Rule {
        name: "biosboot",
        check: check_biosboot,
    },
    Rule {
        name: "swap",
        check: check_swap,
    },
    Rule {
        name: "swap_uuid",
        check: check_swap_uuid,
    },
    Rule {
        name: "mount_placement",
        check: check_mount_placement,
    },
    Rule {
        name: "root_format",
        check: check_root_format,
    },
    Rule {
        name: "luks_keys",
        check: check_luks_keys,
    },
];

fn check_root(ctx: &Context) -> Vec<Finding> {
    let product = ctx.product_name;
    match ctx.layout.root_device() {
        None => vec![Finding::error(
            FindingKind::MissingRoot,
            format!(
                "You have not defined a root partition (/), which is required for installation \
                of {product} to continue."
            ),
        )],
        Some(root) if root.size < ROOT_MIN_SIZE => vec![Finding::warning(
            FindingKind::SmallRoot,
            format!(
                "Your root partition is less than 250 megabytes which is usually too small to \
                install {product}."
            ),
        )],
        Some(_) => Vec::new(),
    }
}

fn check_mount_sizes(ctx: &Context) -> Vec<Finding> {
    RECOMMENDED_MOUNT_SIZES
        .iter()
        .filter_map(|(mount, size)| {
            let device = ctx.layout.mounted_device(mount)?;
            (device.size < *size).then(|| {
                Finding::warning(
                    FindingKind::SmallMountPoint,
                    format!(
                        "Your {mount} partition is less than {size} which is lower than \
                        recommended for a normal {} install.",
                        ctx.product_name
                    ),
                )
            })
        })
        .collect()
}

fn check_format_sizes(ctx: &Context) -> Vec<Finding> {
    ctx.layout
        .mount_points()
        .into_iter()
        .filter_map(|(mount, device)| {
            let problem = match device.check_size() {
                Ordering::Less => "small",
                Ordering::Greater => "large",
                Ordering::Equal => return None,
            };
            let max_size = device
                .format
                .max_size()
                .map(|size| size.to_string())
                .unwrap_or_else(|| "unlimited".into());
            Some(Finding::error(
                FindingKind::FormatSize,
                format!(
                    "Your {mount} partition is too {problem} for {} formatting (allowable size \
                    is {} to {max_size})",
                    device.format.format_type,
                    device.format.min_size(),
                ),
            ))
        })
        .collect()
}

fn check_bootloader_stage1(ctx: &Context) -> Vec<Finding> {
    let Some(bootloader) = ctx.bootloader() else {
        return Vec::new();
    };

    let Some(stage1) = ctx.device(bootloader.stage1_device.as_deref()) else {
        let mut findings = vec![Finding::error(
            FindingKind::BootloaderStage1,
            "No valid boot loader target device found. See below for details.",
        )];
        findings.extend(
            bootloader
                .flavor
                .stage1_missing_error()
                .map(|message| Finding::error(FindingKind::BootloaderStage1, message)),
        );
        return findings;
    };

    let report = bootloader.is_valid_stage1_device(stage1, ctx.layout);
    report_findings(
        FindingKind::BootloaderStage1,
        report.errors,
        report.warnings,
    )
}

fn check_bootloader_stage2(ctx: &Context) -> Vec<Finding> {
    let Some(bootloader) = ctx.bootloader() else {
        return Vec::new();
    };

    let stage1 = ctx.device(bootloader.stage1_device.as_deref());
    let stage2 = ctx.device(bootloader.stage2_device.as_deref());
    if stage1.is_some() && stage2.is_none() {
        return vec![Finding::error(
            FindingKind::BootloaderStage2,
            "You have not created a bootable partition.",
        )];
    }

    let report = bootloader.is_valid_stage2_device(stage2, ctx.layout);
    let mut findings = report_findings(
        FindingKind::BootloaderStage2,
        report.errors,
        report.warnings,
    );

    // Only errors of the final placement check are reported
    let report = bootloader.check(ctx.layout);
    findings.extend(report_findings(
        FindingKind::BootloaderStage2,
        report.errors,
        Vec::new(),
    ));

    findings
}

fn check_biosboot(ctx: &Context) -> Vec<Finding> {
    let Some(bootloader) = ctx.bootloader() else {
        return Vec::new();
    };
    if !bootloader.flavor.requires_biosboot() {
        return Vec::new();
    }

    let Some(stage1) = ctx.device(bootloader.stage1_device.as_deref()) else {
        return Vec::new();
    };
    if !stage1.is_disk() || stage1.disklabel != Some(DiskLabelType::Gpt) {
        return Vec::new();
    }

    let has_biosboot = ctx
        .layout
        .devicetree
        .partitions_on(&stage1.name)
        .any(|part| part.format.is(SpecialFormatType::Biosboot));
    if has_biosboot {
        return Vec::new();
    }

    vec![Finding::error(
        FindingKind::MissingBiosBoot,
        "Your BIOS-based system needs a special partition to boot from a GPT disk label. To \
        continue, please create a 1MiB 'biosboot' type partition.",
    )]
}

fn check_swap(ctx: &Context) -> Vec<Finding> {
    if !ctx.layout.swap_devices().is_empty() {
        return Vec::new();
    }

    // Unknown memory cannot be shown to be enough
    let installed = ctx.layout.installed_memory.unwrap_or_default();
    let required = ctx.min_ram + ctx.no_swap_margin;

    if installed < required {
        vec![Finding::error(
            FindingKind::NoSwap,
            format!(
                "You have not specified a swap partition.  {required} of memory is required to \
                continue installation without a swap partition, but you only have {installed}."
            ),
        )]
    } else {
        vec![Finding::warning(
            FindingKind::NoSwap,
            "You have not specified a swap partition.  Although not strictly required in all \
            cases, it will significantly improve performance for most installations.",
        )]
    }
}

fn check_swap_uuid(ctx: &Context) -> Vec<Finding> {
    let no_uuid = ctx
        .layout
        .swap_devices()
        .iter()
        .any(|swap| swap.format.exists && swap.format.uuid.is_none());
    if !no_uuid {
        return Vec::new();
    }

    vec![Finding::warning(
        FindingKind::SwapWithoutUuid,
        "At least one of your swap devices does not have a UUID, which is common in swap space \
        created using older versions of mkswap. These devices will be referred to by device \
        path in /etc/fstab, which is not ideal since device paths can change under a variety \
        of circumstances. ",
    )]
}

fn check_mount_placement(ctx: &Context) -> Vec<Finding> {
    let mut findings = Vec::new();
    for (mount, device) in ctx.layout.mount_points() {
        if MUST_BE_ON_ROOT.contains(&mount) {
            findings.push(Finding::error(
                FindingKind::MountPlacement,
                format!(
                    "This mount point is invalid.  The {mount} directory must be on the / file \
                    system."
                ),
            ));
        }

        if MUST_BE_ON_LINUX_FS.contains(&mount)
            && !(device.format.is_mountable() && device.format.is_linux_native())
        {
            findings.push(Finding::error(
                FindingKind::MountPlacement,
                format!("The mount point {mount} must be on a linux file system."),
            ));
        }
    }
    findings
}

fn check_root_format(ctx: &Context) -> Vec<Finding> {
    ctx.layout
        .root_device()
        .filter(|root| root.format.exists)
        .and_then(|root| ctx.layout.must_format(root))
        .map(|message| Finding::error(FindingKind::RootMustFormat, message))
        .into_iter()
        .collect()
}

fn check_luks_keys(ctx: &Context) -> Vec<Finding> {
    ctx.layout
        .devicetree
        .devices()
        .iter()
        .filter(|d| d.format.is(SpecialFormatType::Luks) && !d.format.exists && !d.format.has_key)
        .map(|d| {
            Finding::error(
                FindingKind::LuksWithoutKey,
                format!("LUKS device {} has no encryption key", d.name),
            )
        })
        .collect()
}

fn report_findings(kind: FindingKind, errors: Vec<String>, warnings: Vec<String>) -> Vec<Finding> {
    errors
        .into_iter()
        .map(|message| Finding::error(kind, message))
        .chain(
            warnings
                .into_iter()
                .map(|message| Finding::warning(kind, message)),
        )
        .collect()
}
