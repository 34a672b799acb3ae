//! Shared fakes for the integration suite: a scripted resolver, an
//! in-memory file store, and a recording confirmation gate.
#![allow(dead_code)]

use async_trait::async_trait;
use itemgraph::config::SessionConfig;
use itemgraph::error::StoreError;
use itemgraph::gate::ConfirmationGate;
use itemgraph::resolver::{ItemRoot, RootClass, RootResolver};
use itemgraph::session::ItemSession;
use itemgraph::store::FileStore;
use itemgraph::types::Level;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const ROOT_PREFIX: &str = "chara/equipment/e6180/";

pub fn equipment_root() -> ItemRoot {
    ItemRoot {
        id: "e6180".to_string(),
        prefix: ROOT_PREFIX.to_string(),
        base_name: "c0101e6180_top".to_string(),
        class: RootClass::Standard,
        has_secondary: false,
    }
}

pub fn owned(name: &str) -> String {
    format!("{ROOT_PREFIX}{name}")
}

/// Scripted resolver with call recording. Scripts can be swapped mid-test
/// to simulate the store shifting under the session.
#[derive(Default)]
pub struct FakeResolver {
    pub models: RwLock<Vec<String>>,
    pub materials: RwLock<HashMap<String, Vec<String>>>,
    pub orphans: RwLock<Vec<String>>,
    pub textures: RwLock<HashMap<String, Vec<String>>>,
    pub usages: RwLock<HashMap<String, String>>,
    pub calls: Mutex<Vec<String>>,
    pub fail_models: AtomicBool,
}

impl FakeResolver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_models(&self, models: &[&str]) {
        *self.models.write() = models.iter().map(|m| m.to_string()).collect();
    }

    pub fn set_materials(&self, model: &str, materials: &[&str]) {
        self.materials.write().insert(
            model.to_string(),
            materials.iter().map(|m| m.to_string()).collect(),
        );
    }

    pub fn set_textures(&self, material: &str, textures: &[&str]) {
        self.textures.write().insert(
            material.to_string(),
            textures.iter().map(|t| t.to_string()).collect(),
        );
    }

    pub fn build_count(&self) -> usize {
        self.calls.lock().iter().filter(|c| *c == "models").count()
    }
}

#[async_trait]
impl RootResolver for FakeResolver {
    async fn model_files(&self, _root: &ItemRoot) -> Result<Vec<String>, StoreError> {
        self.calls.lock().push("models".to_string());
        if self.fail_models.load(Ordering::SeqCst) {
            return Err(StoreError::Resolution("metadata unavailable".to_string()));
        }
        Ok(self.models.read().clone())
    }

    async fn material_files(
        &self,
        _root: &ItemRoot,
        model: &str,
        _variant: Option<i32>,
    ) -> Result<Vec<String>, StoreError> {
        self.calls.lock().push(format!("materials:{model}"));
        Ok(self.materials.read().get(model).cloned().unwrap_or_default())
    }

    async fn orphan_materials(
        &self,
        _root: &ItemRoot,
        _variant: Option<i32>,
    ) -> Result<Vec<String>, StoreError> {
        self.calls.lock().push("orphans".to_string());
        Ok(self.orphans.read().clone())
    }

    async fn texture_paths(&self, material: &str) -> Result<Vec<String>, StoreError> {
        self.calls.lock().push(format!("textures:{material}"));
        Ok(self.textures.read().get(material).cloned().unwrap_or_default())
    }

    async fn texture_usage(
        &self,
        _material: &str,
        texture: &str,
    ) -> Result<Option<String>, StoreError> {
        Ok(self.usages.read().get(texture).cloned())
    }
}

/// In-memory stand-in for the host's versioned file store.
#[derive(Default)]
pub struct FakeStore {
    pub present: RwLock<HashSet<String>>,
}

impl FakeStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert(&self, path: &str) {
        self.present.write().insert(path.to_string());
    }

    pub fn remove(&self, path: &str) {
        self.present.write().remove(path);
    }
}

#[async_trait]
impl FileStore for FakeStore {
    async fn exists(&self, path: &str) -> Result<bool, StoreError> {
        Ok(self.present.read().contains(path))
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        if self.present.read().contains(path) {
            Ok(path.as_bytes().to_vec())
        } else {
            Err(StoreError::NotFound(path.to_string()))
        }
    }
}

/// Gate with scriptable unsaved flags and a prompt log.
#[derive(Default)]
pub struct RecordingGate {
    unsaved: Mutex<HashSet<Level>>,
    accept: AtomicBool,
    pub prompts: Mutex<Vec<Level>>,
}

impl RecordingGate {
    pub fn accepting() -> Arc<Self> {
        let gate = Self::default();
        gate.accept.store(true, Ordering::SeqCst);
        Arc::new(gate)
    }

    pub fn set_unsaved(&self, level: Level) {
        self.unsaved.lock().insert(level);
    }

    pub fn set_accept(&self, accept: bool) {
        self.accept.store(accept, Ordering::SeqCst);
    }

    pub fn prompted(&self) -> Vec<Level> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl ConfirmationGate for RecordingGate {
    fn has_unsaved(&self, level: Level) -> bool {
        self.unsaved.lock().contains(&level)
    }

    async fn confirm_discard(&self, level: Level) -> bool {
        self.prompts.lock().push(level);
        self.accept.load(Ordering::SeqCst)
    }

    fn mark_discarded(&self, level: Level) {
        self.unsaved.lock().remove(&level);
    }
}

/// A session over the fakes with a short quiet window.
pub fn session(
    resolver: &Arc<FakeResolver>,
    store: &Arc<FakeStore>,
    gate: &Arc<RecordingGate>,
) -> ItemSession {
    let config = SessionConfig {
        quiet_window_ms: 300,
        ..SessionConfig::default()
    };
    ItemSession::new(
        Arc::clone(resolver) as Arc<dyn RootResolver>,
        Arc::clone(store) as Arc<dyn FileStore>,
        Arc::clone(gate) as Arc<dyn ConfirmationGate>,
        config,
    )
}

/// Scripts the standard two-model fixture:
/// model a has material m1 with textures t1/t2, model b has nothing.
pub fn script_standard_item(resolver: &FakeResolver, store: &FakeStore) {
    let a = owned("model/c0101e6180_top.mdl");
    let b = owned("model/c0201e6180_top.mdl");
    let m1 = owned("material/mt_c0101e6180_top_a.mtrl");
    let t1 = owned("texture/c0101e6180_top_a.tex");
    let t2 = owned("texture/c0101e6180_top_b.tex");

    resolver.set_models(&[&a, &b]);
    resolver.set_materials(&a, &[&m1]);
    resolver.set_textures(&m1, &[&t1, &t2]);

    for path in [&a, &b, &m1, &t1, &t2] {
        store.insert(path);
    }
}
