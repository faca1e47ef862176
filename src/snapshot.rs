use log::debug;

use layoutcheck_api::{
    error::{LayoutCheckError, PreconditionError, ReportError},
    layout::LayoutModel,
};

/// A stored copy of a storage layout that a live layout can be rolled back
/// to.
///
/// The stored copy is owned by the snapshot and never handed out for
/// in-place use, so edits to the live layout cannot reach it.
#[derive(Debug, Clone, Default)]
pub struct StorageSnapshot {
    snapshot: Option<LayoutModel>,
}

impl StorageSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a snapshot of `layout` right away.
    pub fn from_layout(layout: &LayoutModel) -> Self {
        let mut snapshot = Self::new();
        snapshot.create(layout);
        snapshot
    }

    /// The stored layout, if a snapshot was created.
    pub fn storage(&self) -> Option<&LayoutModel> {
        self.snapshot.as_ref()
    }

    pub fn created(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Stores a copy of `layout`, replacing any previous snapshot.
    pub fn create(&mut self, layout: &LayoutModel) {
        if self.snapshot.is_some() {
            debug!("Replacing existing storage snapshot");
        }
        self.snapshot = Some(layout.clone());
    }

    /// Drops the stored snapshot, if any.
    pub fn dispose(&mut self) {
        self.snapshot = None;
    }

    /// Restores the device tree, existing roots and filesystem set of
    /// `layout` from the snapshot. With `dispose` the snapshot is dropped
    /// afterwards.
    pub fn reset(
        &mut self,
        layout: &mut LayoutModel,
        dispose: bool,
    ) -> Result<(), LayoutCheckError> {
        let LayoutModel {
            devicetree,
            roots,
            fsset,
            ..
        } = self
            .snapshot
            .clone()
            .structured(PreconditionError::SnapshotNotCreated)?;

        layout.devicetree = devicetree;
        layout.roots = roots;
        layout.fsset = fsset;
        debug!("Storage layout reset from snapshot");

        if dispose {
            self.dispose();
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use layoutcheck_api::{
        error::ErrorKind,
        layout::device::{Device, DeviceKind},
        primitives::bytes::ByteCount,
    };

    use super::*;

    fn layout() -> LayoutModel {
        let mut layout = LayoutModel::default();
        layout.devicetree.add_device(
            Device::new("sda", DeviceKind::Disk, ByteCount::from_mib(10240)).existing(),
        );
        layout.devicetree.add_device(
            Device::new("sda1", DeviceKind::Partition, ByteCount::from_mib(1024))
                .with_parent("sda"),
        );
        layout.mount("/", "sda1");
        layout
    }

    fn assert_not_created(result: Result<(), LayoutCheckError>) {
        assert_eq!(
            result.unwrap_err().kind(),
            &ErrorKind::Precondition(PreconditionError::SnapshotNotCreated)
        );
    }

    #[test]
    fn test_reset_without_create() {
        let mut snapshot = StorageSnapshot::new();
        let mut layout = layout();
        assert!(!snapshot.created());
        assert_not_created(snapshot.reset(&mut layout, false));

        // The layout is left alone
        assert_eq!(layout, self::layout());
    }

    #[test]
    fn test_reset_keeps_snapshot() {
        let mut layout = layout();
        let mut snapshot = StorageSnapshot::from_layout(&layout);

        layout.devicetree.remove_device("sda1");
        layout.fsset.mounts.clear();
        snapshot.reset(&mut layout, false).unwrap();
        assert_eq!(layout, self::layout());

        layout.mount("/home", "sda1");
        snapshot.reset(&mut layout, false).unwrap();
        assert_eq!(layout, self::layout());
        assert!(snapshot.created());
    }

    #[test]
    fn test_reset_and_dispose() {
        let mut layout = layout();
        let mut snapshot = StorageSnapshot::from_layout(&layout);

        snapshot.reset(&mut layout, true).unwrap();
        assert!(!snapshot.created());
        assert_not_created(snapshot.reset(&mut layout, false));
    }

    #[test]
    fn test_snapshot_isolation() {
        let mut layout = layout();
        let mut snapshot = StorageSnapshot::new();
        snapshot.create(&layout);

        layout
            .devicetree
            .get_device_by_name_mut("sda1")
            .unwrap()
            .size = ByteCount(1);
        layout.mount("/var", "sda");
        assert_eq!(snapshot.storage(), Some(&self::layout()));

        // Edits after a reset do not leak into the snapshot either
        snapshot.reset(&mut layout, false).unwrap();
        layout.devicetree.remove_device("sda");
        assert_eq!(snapshot.storage(), Some(&self::layout()));
    }

    #[test]
    fn test_reset_restores_only_storage() {
        let mut layout = layout();
        let snapshot_memory = layout.installed_memory;
        let mut snapshot = StorageSnapshot::from_layout(&layout);

        layout.installed_memory = Some(ByteCount::from_mib(2048));
        layout.fsset.swaps.push("sda2".into());
        snapshot.reset(&mut layout, false).unwrap();

        assert!(layout.fsset.swaps.is_empty());
        assert_ne!(layout.installed_memory, snapshot_memory);
    }

    #[test]
    fn test_create_replaces_and_dispose_is_idempotent() {
        let mut layout = layout();
        let mut snapshot = StorageSnapshot::from_layout(&layout);

        layout.mount("/home", "sda");
        snapshot.create(&layout);
        assert_eq!(snapshot.storage(), Some(&layout));

        snapshot.dispose();
        snapshot.dispose();
        assert_eq!(snapshot.storage(), None);
    }
}
