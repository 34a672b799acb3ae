//! Dependency tree: the three-level Model -> Material -> Texture cache.
//!
//! One tree exists per loaded item. It is rebuilt wholesale by
//! [`TreeBuilder`](crate::tree::builder::TreeBuilder) and patched in place by
//! the reconciler for cheap point changes. Entries keep resolver order;
//! texture sets are kept sorted for deterministic iteration.

pub mod builder;

use crate::types::{MaterialKey, ModelKey, TextureKey, EMPTY_KEY};
use std::collections::BTreeSet;

/// Location of a path within the tree, as returned by
/// [`DependencyTree::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedPath {
    /// Path is not a key at any level.
    NotFound,
    Model(ModelKey),
    Material {
        model: ModelKey,
        material: MaterialKey,
    },
    Texture {
        model: ModelKey,
        material: MaterialKey,
        texture: TextureKey,
    },
}

/// Second-level node: materials of one model, each with its referenced
/// texture set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelNode {
    materials: Vec<MaterialEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct MaterialEntry {
    key: MaterialKey,
    textures: BTreeSet<TextureKey>,
}

impl ModelNode {
    /// Material keys in insertion order, with the placeholder synthesized
    /// when the node holds nothing. Consumers never observe an empty level.
    pub fn material_keys(&self) -> Vec<MaterialKey> {
        if self.materials.is_empty() {
            return vec![EMPTY_KEY.to_string()];
        }
        self.materials.iter().map(|m| m.key.clone()).collect()
    }

    /// Texture keys of one material, placeholder-backed like
    /// [`material_keys`](Self::material_keys).
    pub fn texture_keys(&self, material: &str) -> Vec<TextureKey> {
        let textures = self
            .materials
            .iter()
            .find(|m| m.key == material)
            .map(|m| &m.textures);
        match textures {
            Some(set) if !set.is_empty() => set.iter().cloned().collect(),
            _ => vec![EMPTY_KEY.to_string()],
        }
    }

    pub fn contains_material(&self, material: &str) -> bool {
        self.materials.iter().any(|m| m.key == material)
    }

    fn entry_mut(&mut self, material: &str) -> Option<&mut MaterialEntry> {
        self.materials.iter_mut().find(|m| m.key == material)
    }

    fn insert_material(&mut self, material: MaterialKey) -> bool {
        if self.contains_material(&material) {
            return false;
        }
        self.materials.push(MaterialEntry {
            key: material,
            textures: BTreeSet::new(),
        });
        true
    }
}

/// The per-item dependency cache.
///
/// Model entries keep the order the resolver produced them in; "first entry"
/// fallbacks everywhere in the crate rely on that order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyTree {
    models: Vec<(ModelKey, ModelNode)>,
}

impl DependencyTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Model keys in insertion order, placeholder-backed.
    pub fn model_keys(&self) -> Vec<ModelKey> {
        if self.models.is_empty() {
            return vec![EMPTY_KEY.to_string()];
        }
        self.models.iter().map(|(k, _)| k.clone()).collect()
    }

    /// Material keys under `model`, placeholder-backed. An unknown model key
    /// behaves like an empty node.
    pub fn material_keys(&self, model: &str) -> Vec<MaterialKey> {
        match self.node(model) {
            Some(node) => node.material_keys(),
            None => vec![EMPTY_KEY.to_string()],
        }
    }

    /// Texture keys under `(model, material)`, placeholder-backed.
    pub fn texture_keys(&self, model: &str, material: &str) -> Vec<TextureKey> {
        match self.node(model) {
            Some(node) => node.texture_keys(material),
            None => vec![EMPTY_KEY.to_string()],
        }
    }

    pub fn node(&self, model: &str) -> Option<&ModelNode> {
        self.models.iter().find(|(k, _)| k == model).map(|(_, n)| n)
    }

    pub fn contains_model(&self, model: &str) -> bool {
        self.models.iter().any(|(k, _)| k == model)
    }

    pub fn first_model(&self) -> ModelKey {
        self.models
            .first()
            .map(|(k, _)| k.clone())
            .unwrap_or_else(|| EMPTY_KEY.to_string())
    }

    /// Number of real (non-placeholder) model entries.
    pub fn model_count(&self) -> usize {
        self.models.iter().filter(|(k, _)| !k.is_empty()).count()
    }

    /// Locate `path` within the tree. Each path can be a key at exactly one
    /// level, so the first match is the only match.
    pub fn resolve(&self, path: &str) -> ResolvedPath {
        if path.is_empty() {
            return ResolvedPath::NotFound;
        }
        for (model, node) in &self.models {
            if model == path {
                return ResolvedPath::Model(model.clone());
            }
            for entry in &node.materials {
                if entry.key == path {
                    return ResolvedPath::Material {
                        model: model.clone(),
                        material: entry.key.clone(),
                    };
                }
                if entry.textures.contains(path) {
                    return ResolvedPath::Texture {
                        model: model.clone(),
                        material: entry.key.clone(),
                        texture: path.to_string(),
                    };
                }
            }
        }
        ResolvedPath::NotFound
    }

    /// Remove the deepest entry matching `path`. Parent nodes left empty are
    /// not deleted; the placeholder is synthesized on the next read instead
    /// of walking the tree again here.
    pub fn remove(&mut self, path: &str) -> bool {
        match self.resolve(path) {
            ResolvedPath::NotFound => false,
            ResolvedPath::Model(model) => {
                self.models.retain(|(k, _)| *k != model);
                true
            }
            ResolvedPath::Material { model, material } => {
                if let Some(node) = self.node_mut(&model) {
                    node.materials.retain(|m| m.key != material);
                }
                true
            }
            ResolvedPath::Texture {
                model,
                material,
                texture,
            } => {
                if let Some(entry) = self
                    .node_mut(&model)
                    .and_then(|node| node.entry_mut(&material))
                {
                    entry.textures.remove(&texture);
                }
                true
            }
        }
    }

    /// Insert missing keys at each requested level, creating intermediate
    /// nodes as needed. Returns whether anything was actually inserted.
    pub fn add(
        &mut self,
        model: ModelKey,
        material: Option<MaterialKey>,
        texture: Option<TextureKey>,
    ) -> bool {
        if model.is_empty() {
            return false;
        }

        let mut changed = false;
        if !self.contains_model(&model) {
            self.models.push((model.clone(), ModelNode::default()));
            changed = true;
        }

        let Some(material) = material else {
            return changed;
        };
        let node = self
            .node_mut(&model)
            .expect("model entry inserted above");
        if node.insert_material(material.clone()) {
            changed = true;
        }

        let Some(texture) = texture else {
            return changed;
        };
        let entry = node
            .entry_mut(&material)
            .expect("material entry inserted above");
        if entry.textures.insert(texture) {
            changed = true;
        }
        changed
    }

    fn node_mut(&mut self, model: &str) -> Option<&mut ModelNode> {
        self.models
            .iter_mut()
            .find(|(k, _)| k == model)
            .map(|(_, n)| n)
    }

    /// Append a model entry, used by the builder which guarantees key
    /// uniqueness from the resolver output.
    pub(crate) fn push_model(&mut self, model: ModelKey) {
        if !self.contains_model(&model) {
            self.models.push((model, ModelNode::default()));
        }
    }

    pub(crate) fn push_material(&mut self, model: &str, material: MaterialKey) {
        if let Some(node) = self.node_mut(model) {
            node.insert_material(material);
        }
    }

    pub(crate) fn push_texture(&mut self, model: &str, material: &str, texture: TextureKey) {
        if let Some(entry) = self
            .node_mut(model)
            .and_then(|node| node.entry_mut(material))
        {
            entry.textures.insert(texture);
        }
    }

    /// Backfill placeholders so every level holds at least one entry.
    pub(crate) fn ensure_placeholders(&mut self) {
        if self.models.is_empty() {
            self.models
                .push((EMPTY_KEY.to_string(), ModelNode::default()));
        }
        for (_, node) in &mut self.models {
            if node.materials.is_empty() {
                node.insert_material(EMPTY_KEY.to_string());
            }
        }
    }
}
