//! Metadata store and sub-asset dependency graph
//!
//! One arena of records keyed by handle. Each record owns its metadata, its
//! parent link and its set of children, so both directions of an edge are
//! always updated together.

use crate::error::AssetError;
use crate::metadata::AssetMetadata;
use crate::AssetHandle;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct AssetRecord {
    pub metadata: AssetMetadata,
    pub parent: Option<AssetHandle>,
    pub children: BTreeSet<AssetHandle>,
}

impl AssetRecord {
    fn new(metadata: AssetMetadata) -> Self {
        Self {
            metadata,
            parent: None,
            children: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct MetadataStore {
    records: HashMap<AssetHandle, AssetRecord>,
    /// Root-relative source path → handle, file-backed records only.
    by_path: HashMap<PathBuf, AssetHandle>,
    invalid: AssetMetadata,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record. Graph edges of an existing record survive.
    pub fn insert(&mut self, metadata: AssetMetadata) -> Result<(), AssetError> {
        if !metadata.is_valid() || !metadata.handle.is_valid() {
            return Err(AssetError::InvalidHandle(metadata.handle));
        }

        let handle = metadata.handle;
        if let Some(previous) = self.records.get(&handle) {
            if !previous.metadata.is_memory_only {
                self.by_path.remove(&previous.metadata.path);
            }
        }
        if !metadata.is_memory_only {
            self.by_path.insert(metadata.path.clone(), handle);
        }

        match self.records.get_mut(&handle) {
            Some(record) => record.metadata = metadata,
            None => {
                self.records.insert(handle, AssetRecord::new(metadata));
            }
        }
        Ok(())
    }

    /// Metadata for `handle`, or the invalid sentinel.
    pub fn get(&self, handle: AssetHandle) -> &AssetMetadata {
        self.records
            .get(&handle)
            .map(|record| &record.metadata)
            .unwrap_or(&self.invalid)
    }

    pub fn get_by_path(&self, path: &Path) -> &AssetMetadata {
        self.by_path
            .get(path)
            .map(|handle| self.get(*handle))
            .unwrap_or(&self.invalid)
    }

    pub fn record(&self, handle: AssetHandle) -> Option<&AssetRecord> {
        self.records.get(&handle)
    }

    #[inline]
    pub fn contains(&self, handle: AssetHandle) -> bool {
        self.records.contains_key(&handle)
    }

    pub fn parent(&self, handle: AssetHandle) -> Option<AssetHandle> {
        self.records.get(&handle).and_then(|record| record.parent)
    }

    pub fn children(&self, handle: AssetHandle) -> BTreeSet<AssetHandle> {
        self.records
            .get(&handle)
            .map(|record| record.children.clone())
            .unwrap_or_default()
    }

    /// Parent `child` under `parent`.
    ///
    /// Re-parenting detaches `child` from its previous parent first.
    pub fn register_sub_asset(
        &mut self,
        parent: AssetHandle,
        child: AssetHandle,
    ) -> Result<(), AssetError> {
        if parent == child {
            return Err(AssetError::StructuralViolation(format!(
                "asset {child} cannot be its own sub-asset"
            )));
        }
        if !self.records.contains_key(&parent) {
            return Err(AssetError::StructuralViolation(format!(
                "parent {parent} of sub-asset {child} is not registered"
            )));
        }
        match self.records.get(&child) {
            None => {
                return Err(AssetError::StructuralViolation(format!(
                    "sub-asset {child} is not registered"
                )))
            }
            Some(record) if !record.metadata.is_memory_only => {
                return Err(AssetError::StructuralViolation(format!(
                    "sub-asset {child} is file-backed"
                )))
            }
            Some(_) => {}
        }
        if self.is_ancestor(child, parent) {
            return Err(AssetError::StructuralViolation(format!(
                "parenting {child} under {parent} would create a cycle"
            )));
        }

        if let Some(previous) = self.parent(child) {
            if previous == parent {
                return Ok(());
            }
            tracing::warn!(
                "Sub-asset {} re-registered: moving from {} to {}",
                child,
                previous,
                parent
            );
            if let Some(record) = self.records.get_mut(&previous) {
                record.children.remove(&child);
            }
        }

        if let Some(record) = self.records.get_mut(&child) {
            record.parent = Some(parent);
        }
        if let Some(record) = self.records.get_mut(&parent) {
            record.children.insert(child);
        }
        Ok(())
    }

    /// Whether `ancestor` is a strict ancestor of `handle`.
    pub fn is_ancestor(&self, ancestor: AssetHandle, mut handle: AssetHandle) -> bool {
        while let Some(parent) = self.parent(handle) {
            if parent == ancestor {
                return true;
            }
            handle = parent;
        }
        false
    }

    /// Remove every descendant of `handle` (post-order) and return them in
    /// removal order. `handle` itself stays.
    pub fn remove_descendants(&mut self, handle: AssetHandle) -> Vec<AssetHandle> {
        let mut removed = Vec::new();
        let children = match self.records.get_mut(&handle) {
            Some(record) => std::mem::take(&mut record.children),
            None => return removed,
        };
        for child in children {
            self.remove_subtree_into(child, &mut removed);
        }
        removed
    }

    /// Remove `handle` and all of its descendants, detaching it from its
    /// parent. Returns the removed handles, `handle` last.
    pub fn remove_subtree(&mut self, handle: AssetHandle) -> Vec<AssetHandle> {
        let mut removed = Vec::new();
        if let Some(parent) = self.parent(handle) {
            if let Some(record) = self.records.get_mut(&parent) {
                record.children.remove(&handle);
            }
        }
        self.remove_subtree_into(handle, &mut removed);
        removed
    }

    fn remove_subtree_into(&mut self, handle: AssetHandle, removed: &mut Vec<AssetHandle>) {
        let Some(record) = self.records.remove(&handle) else {
            return;
        };
        for child in record.children {
            self.remove_subtree_into(child, removed);
        }
        if !record.metadata.is_memory_only
            && self.by_path.get(&record.metadata.path) == Some(&handle)
        {
            self.by_path.remove(&record.metadata.path);
        }
        removed.push(handle);
    }

    pub fn handles(&self) -> impl Iterator<Item = AssetHandle> + '_ {
        self.records.keys().copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
