//! Change reconciliation policy.
//!
//! Decides, for every store change event, whether the current tree can be
//! patched in place or has gone structurally stale. The classification never
//! fails outward: lookups that error degrade to the cheapest safe action and
//! the next full rebuild restores correctness.

use crate::error::StoreError;
use crate::resolver::ItemRoot;
use crate::store::FileStore;
use crate::tree::{DependencyTree, ResolvedPath};
use crate::types::Version;
use std::sync::Arc;
use tracing::{trace, warn};

/// What to do about one changed path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    /// Path is irrelevant to this session, or the entry remains valid.
    Ignore,
    /// Path is owned by the root but unknown to the tree: the structure may
    /// be stale in ways a point patch cannot infer.
    RequestRebuild,
    /// Path is a known entry that no longer exists in the store.
    PointRemove,
}

pub struct ChangeReconciler {
    store: Arc<dyn FileStore>,
}

impl ChangeReconciler {
    pub fn new(store: Arc<dyn FileStore>) -> Self {
        Self { store }
    }

    /// Classify a change event against the current tree.
    pub async fn classify(
        &self,
        root: Option<&ItemRoot>,
        tree: &DependencyTree,
        path: &str,
        version: Version,
    ) -> ReconcileAction {
        if path.trim().is_empty() {
            return ReconcileAction::Ignore;
        }
        let Some(root) = root else {
            trace!(path, "change skipped, no item loaded");
            return ReconcileAction::Ignore;
        };
        if !root.owns(path) {
            trace!(path, root = %root.id, "change skipped, outside root ownership");
            return ReconcileAction::Ignore;
        }

        if tree.resolve(path) == ResolvedPath::NotFound {
            trace!(path, version, "changed path unknown to tree, rebuild needed");
            return ReconcileAction::RequestRebuild;
        }

        match self.store.exists(path).await {
            Ok(true) => ReconcileAction::Ignore,
            Ok(false) => ReconcileAction::PointRemove,
            Err(error) => {
                // Best effort: a missed point removal is corrected by the
                // next full rebuild.
                warn!(path, %error, "existence check failed during reconcile");
                ReconcileAction::Ignore
            }
        }
    }
}
