//! Resolution of device specifications into device names.
//!
//! A specification is one or more sub-specs separated by `|`, each of which
//! is a device name, a node path, a glob such as `sd*`, or an identifier
//! such as `LABEL=root`. Sub-specs are resolved left to right and the result
//! keeps the first occurrence of every name:
//!
//! `"sd*|hd*|vd*"` may resolve to `["sda", "sda1", "sda2", "sdb", "sdb1",
//! "vdb"]`, or to `["sda", "sdb", "vdb"]` when only disks are wanted.

use glob::Pattern;
use log::{debug, trace};

use layoutcheck_api::{
    catalog::DeviceCatalog,
    constants::{DEVICE_SPEC_ALTERNATION, DEV_PATH_PREFIX},
    error::LayoutCheckError,
    layout::devicetree::DeviceTree,
};

use crate::cache::DeviceNameCache;

/// Resolves device specifications against a catalog, keeping a cache of the
/// catalog's device names.
pub struct SpecResolver<C> {
    catalog: C,
    cache: DeviceNameCache,
}

impl<C: DeviceCatalog> SpecResolver<C> {
    pub fn new(catalog: C) -> Self {
        Self {
            catalog,
            cache: DeviceNameCache::new(),
        }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn cache(&self) -> &DeviceNameCache {
        &self.cache
    }

    /// Forgets the cached device names. The next lookup enumerates the
    /// catalog again.
    pub fn invalidate_cache(&mut self) {
        self.cache.invalidate();
    }

    /// Reports whether `name` is a disk.
    ///
    /// With a device tree the tree answers. Without one the device-name cache
    /// answers, counting only disks realized on hardware; it is built on
    /// first use and rebuilt when `refresh` is set.
    pub fn device_name_is_disk(
        &mut self,
        name: &str,
        devicetree: Option<&DeviceTree>,
        refresh: bool,
    ) -> Result<bool, LayoutCheckError> {
        if let Some(devicetree) = devicetree {
            return Ok(devicetree
                .get_device_by_name(name)
                .is_some_and(|device| device.is_disk()));
        }

        if name.is_empty() {
            return Ok(false);
        }

        if refresh {
            self.cache.populate(&self.catalog)?;
        } else {
            self.cache.ensure_populated(&self.catalog)?;
        }

        Ok(self.cache.is_real_disk(name))
    }

    /// Returns the names of the devices matching `spec`, without duplicates,
    /// in the order they were found. Unresolvable sub-specs contribute
    /// nothing.
    ///
    /// Globs are always matched against the catalog's device names. The
    /// direct lookup of each sub-spec goes through `devicetree` when one is
    /// given, and through the catalog otherwise.
    pub fn resolve(
        &mut self,
        spec: &str,
        devicetree: Option<&DeviceTree>,
        disks_only: bool,
    ) -> Result<Vec<String>, LayoutCheckError> {
        let mut matches: Vec<String> = Vec::new();

        for sub_spec in spec.split(DEVICE_SPEC_ALTERNATION) {
            let full_spec = normalize_device_path(sub_spec);

            for name in self.glob(&full_spec)? {
                if matches.contains(&name) {
                    continue;
                }
                if disks_only && !self.device_name_is_disk(&name, None, false)? {
                    continue;
                }
                matches.push(name);
            }

            // The sub-spec is passed on unnormalized, so that identifiers
            // such as LABEL=root are not mistaken for paths
            let direct = match devicetree {
                None => {
                    let mut name = self.catalog.resolve_devspec(sub_spec);
                    if let Some(resolved) = &name {
                        if disks_only && !self.device_name_is_disk(resolved, None, false)? {
                            name = None;
                        }
                    }
                    name
                }
                Some(tree) => tree
                    .resolve_device(sub_spec)
                    .filter(|device| !disks_only || device.is_disk())
                    .map(|device| device.name.clone()),
            };

            if let Some(name) = direct {
                if !matches.contains(&name) {
                    matches.push(name);
                }
            }
        }

        debug!("Device spec '{spec}' resolved to {matches:?}");
        tracing::info!(
            metric_name = "device_spec_resolved",
            spec,
            disks_only,
            value = matches.len()
        );

        Ok(matches)
    }

    /// Names of the cached devices whose node path, or a symlink to it,
    /// matches the glob `pattern`, ordered by name.
    fn glob(&mut self, pattern: &str) -> Result<Vec<String>, LayoutCheckError> {
        let pattern = match Pattern::new(&collapse_wildcards(pattern)) {
            Ok(pattern) => pattern,
            Err(e) => {
                trace!("'{pattern}' is not a valid glob: {e}");
                return Ok(Vec::new());
            }
        };

        self.cache.ensure_populated(&self.catalog)?;
        Ok(self
            .cache
            .entries()
            .filter(|entry| entry.node_paths().any(|path| pattern.matches(&path)))
            .map(|entry| entry.name.clone())
            .collect())
    }
}

/// Collapses runs of `*` into one. `glob::Pattern` rejects `**` unless it is
/// a whole path segment, and `*` already matches across separators.
fn collapse_wildcards(pattern: &str) -> String {
    let mut collapsed = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if c == '*' && collapsed.ends_with('*') {
            continue;
        }
        collapsed.push(c);
    }
    collapsed
}

/// Turns a sub-spec into an absolute device node path. Paths already under
/// `/dev/` are returned as they are; anything else is placed under `/dev/`
/// with redundant separators and `.`/`..` segments collapsed.
pub fn normalize_device_path(sub_spec: &str) -> String {
    if sub_spec.starts_with(DEV_PATH_PREFIX) {
        return sub_spec.to_string();
    }

    let joined = format!("{DEV_PATH_PREFIX}{sub_spec}");
    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => (),
            ".." => {
                segments.pop();
            }
            segment => segments.push(segment),
        }
    }

    format!("/{}", segments.join("/"))
}
