//! Item session: the surface the host application drives.
//!
//! One session exists per loaded item. It owns the dependency tree, the
//! selection tracker, and the rebuild scheduler, and serializes every
//! mutation through one async mutex so resolver results computed on worker
//! tasks are only applied after being handed back here.

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::gate::ConfirmationGate;
use crate::reconcile::{ChangeReconciler, ReconcileAction};
use crate::resolver::{ItemRoot, RootResolver};
use crate::scheduler::{RebuildRunner, RebuildScheduler};
use crate::selection::{SelectionTracker, Target};
use crate::store::{FileStore, StoreEvent};
use crate::tree::builder::TreeBuilder;
use crate::tree::{DependencyTree, ResolvedPath};
use crate::types::{Level, Version};
use crate::views::{self, EntryView, LevelView};
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Currently selected key at each level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub model: String,
    pub material: String,
    pub texture: String,
}

#[derive(Debug)]
struct SessionState {
    root: Option<ItemRoot>,
    variant: Option<i32>,
    item_label: String,
    item_name: String,
    tree: DependencyTree,
    tracker: SelectionTracker,
    selected: Selection,
    focus: Option<Level>,
    models: LevelView,
    materials: LevelView,
    textures: LevelView,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            root: None,
            variant: None,
            item_label: String::new(),
            item_name: "No Item Selected".to_string(),
            tree: DependencyTree::new(),
            tracker: SelectionTracker::new(),
            selected: Selection::default(),
            focus: None,
            models: LevelView::disabled(),
            materials: LevelView::disabled(),
            textures: LevelView::disabled(),
        }
    }
}

impl SessionState {
    fn reset_for_load(&mut self) {
        let name = "Loading Item...".to_string();
        *self = Self {
            item_name: name,
            focus: self.focus,
            ..Self::default()
        };
    }

    /// Path of the file shown in the focused panel, if any.
    fn viewed_path(&self) -> Option<String> {
        let key = match self.focus? {
            Level::Model => &self.selected.model,
            Level::Material => &self.selected.material,
            Level::Texture => &self.selected.texture,
        };
        if key.is_empty() {
            None
        } else {
            Some(key.clone())
        }
    }

    /// Levels whose open files a navigation to `resolved` would replace,
    /// and which therefore gate on unsaved changes.
    fn affected_levels(&self, resolved: &ResolvedPath) -> Vec<Level> {
        let model_of = |resolved: &ResolvedPath| match resolved {
            ResolvedPath::Model(model) => Some(model.clone()),
            ResolvedPath::Material { model, .. } | ResolvedPath::Texture { model, .. } => {
                Some(model.clone())
            }
            ResolvedPath::NotFound => None,
        };
        match resolved {
            ResolvedPath::NotFound => vec![Level::Model, Level::Material, Level::Texture],
            _ if model_of(resolved).as_deref() != Some(self.selected.model.as_str()) => {
                vec![Level::Model, Level::Material]
            }
            ResolvedPath::Material { material, .. } | ResolvedPath::Texture { material, .. }
                if *material != self.selected.material =>
            {
                vec![Level::Material]
            }
            _ => Vec::new(),
        }
    }
}

fn target_for_path(tree: &DependencyTree, path: &str) -> Target {
    if path.is_empty() {
        return Target::Clear;
    }
    match tree.resolve(path) {
        ResolvedPath::NotFound => Target::NotInTree,
        ResolvedPath::Model(model) => Target::File {
            model,
            material: None,
            texture: None,
        },
        ResolvedPath::Material { model, material } => Target::File {
            model,
            material: Some(material),
            texture: None,
        },
        ResolvedPath::Texture {
            model,
            material,
            texture,
        } => Target::File {
            model,
            material: Some(material),
            texture: Some(texture),
        },
    }
}

struct SessionInner {
    resolver: Arc<dyn RootResolver>,
    store: Arc<dyn FileStore>,
    gate: Arc<dyn ConfirmationGate>,
    reconciler: ChangeReconciler,
    scheduler: RebuildScheduler,
    state: Mutex<SessionState>,
}

pub struct ItemSession {
    inner: Arc<SessionInner>,
}

impl ItemSession {
    pub fn new(
        resolver: Arc<dyn RootResolver>,
        store: Arc<dyn FileStore>,
        gate: Arc<dyn ConfirmationGate>,
        config: SessionConfig,
    ) -> Self {
        let inner = Arc::new(SessionInner {
            resolver,
            reconciler: ChangeReconciler::new(Arc::clone(&store)),
            store,
            gate,
            scheduler: RebuildScheduler::new(config.quiet_window()),
            state: Mutex::new(SessionState::default()),
        });
        let runner: Arc<dyn RebuildRunner> = Arc::clone(&inner) as Arc<dyn RebuildRunner>;
        inner.scheduler.start(Arc::downgrade(&runner));
        Self { inner }
    }

    /// Load an item and populate all three levels.
    ///
    /// `Ok(false)` means the user declined to discard unsaved changes (or a
    /// newer load superseded this one); an error means resolution failed and
    /// the session holds no usable tree for this root.
    pub async fn load_item(
        &self,
        root: ItemRoot,
        variant: Option<i32>,
        item_label: &str,
        target_path: Option<&str>,
    ) -> Result<bool, SessionError> {
        let all_levels = [Level::Model, Level::Material, Level::Texture];
        if !self.inner.confirm_levels(&all_levels).await {
            return Ok(false);
        }

        // Re-loading the same item keeps the user on the file they were
        // viewing unless the caller asked for a specific one.
        let target_path = {
            let st = self.inner.state.lock().await;
            match target_path {
                Some(path) => Some(path.to_string()),
                None if st.root.as_ref() == Some(&root) => st.viewed_path(),
                None => None,
            }
        };

        let generation = self.inner.scheduler.invalidate();
        {
            let mut st = self.inner.state.lock().await;
            st.reset_for_load();
        }
        info!(root = %root.id, "loading item");

        let built = TreeBuilder::new(self.inner.resolver.as_ref(), &root)
            .with_variant(variant)
            .build()
            .await;
        let tree = match built {
            Ok(tree) => tree,
            Err(error) => {
                warn!(root = %root.id, %error, "item load failed");
                let mut st = self.inner.state.lock().await;
                st.item_name = item_label.to_string();
                return Err(SessionError::Load(error));
            }
        };

        let mut st = self.inner.state.lock().await;
        if self.inner.scheduler.generation() != generation {
            debug!(root = %root.id, "item load superseded, discarding result");
            return Ok(false);
        }
        st.item_name = views::display_name(&root, variant, item_label);
        st.item_label = item_label.to_string();
        st.root = Some(root);
        st.variant = variant;
        st.tree = tree;
        let target = match target_path.as_deref() {
            Some(path) => target_for_path(&st.tree, path),
            None => Target::Clear,
        };
        st.tracker.set_target(target);
        self.inner.apply_selection(&mut st).await;
        Ok(true)
    }

    /// Re-load the current item, e.g. after a metadata save whose breadth of
    /// changes cannot be patched in. Keeps the user on the viewed file.
    pub async fn reload(&self) -> Result<bool, SessionError> {
        let (root, variant, label) = {
            let st = self.inner.state.lock().await;
            let root = st.root.clone().ok_or(SessionError::NoItem)?;
            (root, st.variant, st.item_label.clone())
        };
        self.load_item(root, variant, &label, None).await
    }

    /// Clear the session back to its unloaded state.
    pub async fn unload(&self) -> Result<bool, SessionError> {
        let all_levels = [Level::Model, Level::Material, Level::Texture];
        if !self.inner.confirm_levels(&all_levels).await {
            return Ok(false);
        }
        self.inner.scheduler.invalidate();
        let mut st = self.inner.state.lock().await;
        *st = SessionState::default();
        Ok(true)
    }

    /// Navigate the three levels to `path`.
    ///
    /// A path that vanished from the store is reconciled out instead, and a
    /// path unknown to the tree becomes a pinned no-panel selection plus a
    /// debounced rebuild, since the tree may be stale. `Ok(false)` means the
    /// user kept their unsaved changes.
    pub async fn navigate_to(&self, path: &str) -> Result<bool, SessionError> {
        let (resolved, levels) = {
            let st = self.inner.state.lock().await;
            if st.root.is_none() {
                return Err(SessionError::NoItem);
            }
            let resolved = st.tree.resolve(path);
            let levels = st.affected_levels(&resolved);
            (resolved, levels)
        };
        if !self.inner.confirm_levels(&levels).await {
            return Ok(false);
        }

        if resolved != ResolvedPath::NotFound {
            let exists = match self.inner.store.exists(path).await {
                Ok(exists) => exists,
                Err(error) => {
                    warn!(path, %error, "existence check failed, assuming file present");
                    true
                }
            };
            if !exists {
                let mut st = self.inner.state.lock().await;
                self.inner.safe_remove_locked(&mut st, path).await;
                return Ok(true);
            }
        }

        let mut st = self.inner.state.lock().await;
        let target = target_for_path(&st.tree, path);
        if target == Target::NotInTree {
            let owned = st.root.as_ref().map(|r| r.owns(path)).unwrap_or(false);
            if owned {
                self.inner.scheduler.request_rebuild();
            }
        }
        st.tracker.set_target(target);
        self.inner.apply_selection(&mut st).await;
        Ok(true)
    }

    /// Drop `path` from the tree if the store no longer has it, moving the
    /// selection to the least disruptive neighbour. Returns whether the tree
    /// changed.
    pub async fn safe_remove_file(&self, path: &str) -> Result<bool, SessionError> {
        let mut st = self.inner.state.lock().await;
        if st.root.is_none() {
            return Err(SessionError::NoItem);
        }
        Ok(self.inner.safe_remove_locked(&mut st, path).await)
    }

    /// Patch a known addition into the tree without a rebuild and navigate
    /// to it. No-op when every key is already present.
    pub async fn safe_add_file(
        &self,
        model: &str,
        material: Option<&str>,
        texture: Option<&str>,
    ) -> Result<bool, SessionError> {
        let mut st = self.inner.state.lock().await;
        if st.root.is_none() {
            return Err(SessionError::NoItem);
        }
        if model.trim().is_empty() {
            return Ok(false);
        }
        let changed = st.tree.add(
            model.to_string(),
            material.map(str::to_string),
            texture.map(str::to_string),
        );
        if !changed {
            return Ok(false);
        }
        st.tracker.set_target(Target::File {
            model: model.to_string(),
            material: material.map(str::to_string),
            texture: texture.map(str::to_string),
        });
        self.inner.apply_selection(&mut st).await;
        Ok(true)
    }

    /// Consume one event from the store's change feed. Never fails; a
    /// missed reconciliation is recovered by the next full rebuild.
    pub async fn on_store_event(&self, event: StoreEvent) {
        match event {
            StoreEvent::FileChanged { path, version } => {
                self.on_file_changed(&path, version).await;
            }
            StoreEvent::TransactionCommitted => {
                let loaded = self.inner.state.lock().await.root.is_some();
                if loaded {
                    self.inner.scheduler.request_rebuild();
                }
            }
        }
    }

    pub async fn on_file_changed(&self, path: &str, version: Version) {
        let action = {
            let st = self.inner.state.lock().await;
            self.inner
                .reconciler
                .classify(st.root.as_ref(), &st.tree, path, version)
                .await
        };
        match action {
            ReconcileAction::Ignore => {}
            ReconcileAction::RequestRebuild => self.inner.scheduler.request_rebuild(),
            ReconcileAction::PointRemove => {
                let mut st = self.inner.state.lock().await;
                self.inner.safe_remove_locked(&mut st, path).await;
            }
        }
    }

    /// Explicitly request a debounced rebuild.
    pub fn request_rebuild(&self) {
        self.inner.scheduler.request_rebuild();
    }

    /// Tear the session down. Pending and in-flight rebuilds are discarded.
    pub async fn close(&self) {
        self.inner.scheduler.invalidate();
        self.inner.scheduler.stop().await;
    }

    pub async fn models(&self) -> LevelView {
        self.inner.state.lock().await.models.clone()
    }

    pub async fn materials(&self) -> LevelView {
        self.inner.state.lock().await.materials.clone()
    }

    pub async fn textures(&self) -> LevelView {
        self.inner.state.lock().await.textures.clone()
    }

    pub async fn selection(&self) -> Selection {
        self.inner.state.lock().await.selected.clone()
    }

    pub async fn item_name(&self) -> String {
        self.inner.state.lock().await.item_name.clone()
    }

    pub async fn focused_level(&self) -> Option<Level> {
        self.inner.state.lock().await.focus
    }

    pub async fn viewed_path(&self) -> Option<String> {
        self.inner.state.lock().await.viewed_path()
    }
}

impl SessionInner {
    async fn confirm_levels(&self, levels: &[Level]) -> bool {
        let mut confirmed = Vec::new();
        for &level in levels {
            if self.gate.has_unsaved(level) {
                if !self.gate.confirm_discard(level).await {
                    return false;
                }
                confirmed.push(level);
            }
        }
        for level in confirmed {
            self.gate.mark_discarded(level);
        }
        true
    }

    async fn safe_remove_locked(&self, st: &mut SessionState, path: &str) -> bool {
        if path.trim().is_empty() {
            return false;
        }
        match self.store.exists(path).await {
            Ok(false) => {}
            Ok(true) => return false,
            Err(error) => {
                warn!(path, %error, "existence check failed, leaving entry in place");
                return false;
            }
        }

        let level = match st.tree.resolve(path) {
            ResolvedPath::NotFound => return false,
            ResolvedPath::Model(_) => Level::Model,
            ResolvedPath::Material { .. } => Level::Material,
            ResolvedPath::Texture { .. } => Level::Texture,
        };
        st.tree.remove(path);

        // Retarget the first entry of the removed file's level, stepping one
        // level up when that first entry was the file itself.
        let first_of = |view: &LevelView| view.first_key().unwrap_or_default().to_string();
        let neighbour = match level {
            Level::Texture => {
                let first = first_of(&st.textures);
                if first == path {
                    first_of(&st.materials)
                } else {
                    first
                }
            }
            Level::Material => {
                let first = first_of(&st.materials);
                if first == path {
                    first_of(&st.models)
                } else {
                    first
                }
            }
            Level::Model => {
                let first = first_of(&st.models);
                if first == path {
                    String::new()
                } else {
                    first
                }
            }
        };

        let target = target_for_path(&st.tree, &neighbour);
        st.tracker.set_target(target);
        self.apply_selection(st).await;
        info!(path, "removed vanished file from tree");
        true
    }

    /// Rebuild all three views from the tree, resolving the selection
    /// strictly top-down: each level's candidates derive from the level
    /// selected above it.
    async fn apply_selection(&self, st: &mut SessionState) {
        let Some(root) = st.root.clone() else {
            st.models = LevelView::disabled();
            st.materials = LevelView::disabled();
            st.textures = LevelView::disabled();
            st.selected = Selection::default();
            return;
        };

        let model_keys = st.tree.model_keys();
        let model_sel = st.tracker.resolve_level(Level::Model, &model_keys);
        st.models = LevelView::new(
            model_keys
                .iter()
                .map(|key| EntryView {
                    label: views::model_label(key, &root),
                    key: key.clone(),
                })
                .collect(),
        );

        let material_keys = st.tree.material_keys(&model_sel.key);
        let material_sel = st.tracker.resolve_level(Level::Material, &material_keys);
        st.materials = LevelView::new(
            material_keys
                .iter()
                .map(|key| EntryView {
                    label: views::material_label(key),
                    key: key.clone(),
                })
                .collect(),
        );

        let texture_keys = st.tree.texture_keys(&model_sel.key, &material_sel.key);
        let texture_sel = st.tracker.resolve_level(Level::Texture, &texture_keys);
        let usages = join_all(texture_keys.iter().map(|key| {
            let material = material_sel.key.clone();
            async move {
                if key.is_empty() || material.is_empty() {
                    return None;
                }
                self.resolver
                    .texture_usage(&material, key)
                    .await
                    .unwrap_or_default()
            }
        }))
        .await;
        st.textures = LevelView::new(
            texture_keys
                .iter()
                .zip(usages)
                .map(|(key, usage)| EntryView {
                    label: views::texture_label(key, usage.as_deref()),
                    key: key.clone(),
                })
                .collect(),
        );

        if model_sel.focus {
            st.focus = Some(Level::Model);
        }
        if material_sel.focus {
            st.focus = Some(Level::Material);
        }
        if texture_sel.focus {
            st.focus = Some(Level::Texture);
        }

        st.selected = Selection {
            model: model_sel.key,
            material: material_sel.key,
            texture: texture_sel.key,
        };
        debug!(
            model = %st.selected.model,
            material = %st.selected.material,
            texture = %st.selected.texture,
            "selection applied"
        );
    }
}

#[async_trait]
impl RebuildRunner for SessionInner {
    async fn run_rebuild(&self, generation: u64) {
        let (root, variant) = {
            let mut st = self.state.lock().await;
            let Some(root) = st.root.clone() else {
                return;
            };
            // Keep the user on the file they are looking at, resolved
            // against the tree as it is now; the keys re-match against the
            // rebuilt tree when the selection is applied.
            if !st.tracker.target().is_set() {
                if let Some(viewed) = st.viewed_path() {
                    let target = target_for_path(&st.tree, &viewed);
                    st.tracker.set_target(target);
                }
            }
            (root, st.variant)
        };

        let built = TreeBuilder::new(self.resolver.as_ref(), &root)
            .with_variant(variant)
            .build()
            .await;
        let tree = match built {
            Ok(tree) => tree,
            Err(error) => {
                warn!(root = %root.id, %error, "rebuild failed, keeping previous tree");
                return;
            }
        };

        let mut st = self.state.lock().await;
        if self.scheduler.generation() != generation || st.root.as_ref() != Some(&root) {
            debug!(root = %root.id, "discarding rebuild for a torn-down session");
            return;
        }
        st.tree = tree;
        self.apply_selection(&mut st).await;
        debug!(root = %root.id, "tree rebuilt from change events");
    }
}
