//! Dependency-root descriptor and resolver contract.
//!
//! The metadata service that knows which files belong to an item root stays
//! in the host; the cache drives it through [`RootResolver`] and never looks
//! at file contents itself.

use crate::error::StoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Identity class of a root, controlling how materials attach to models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RootClass {
    /// Materials are resolved per model and variant.
    Standard,
    /// Many equipment variants share one physical body mesh; materials are
    /// resolved once for the whole item and attached to the first model.
    SharedBody,
}

/// Opaque descriptor of an item's asset family, handed in by the host at
/// load time and immutable for the lifetime of one tree snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRoot {
    /// Stable identifier, used only for logging.
    pub id: String,
    /// Path prefix owned by this root; the reverse path-to-root check.
    pub prefix: String,
    /// Base file name the root's files derive their names from.
    pub base_name: String,
    pub class: RootClass,
    /// Whether the root carries a real secondary identifier. When it does,
    /// orphan materials snap onto the first model entry instead of being
    /// matched by embedded identifier.
    pub has_secondary: bool,
}

impl ItemRoot {
    /// Whether `path` falls under this root's ownership.
    pub fn owns(&self, path: &str) -> bool {
        !path.is_empty() && path.starts_with(&self.prefix)
    }
}

/// Resolver for the files an item root owns, level by level.
///
/// Calls are sequenced by the builder: models first, then materials keyed by
/// model, then textures keyed by material.
#[async_trait]
pub trait RootResolver: Send + Sync {
    /// Model files owned by `root`.
    async fn model_files(&self, root: &ItemRoot) -> Result<Vec<String>, StoreError>;

    /// Materials referenced by one model under the given variant. A
    /// [`RootClass::SharedBody`] root is queried once with the placeholder
    /// model key and no variant.
    async fn material_files(
        &self,
        root: &ItemRoot,
        model: &str,
        variant: Option<i32>,
    ) -> Result<Vec<String>, StoreError>;

    /// Materials owned by the root but not referenced by any model, e.g.
    /// shared across variants.
    async fn orphan_materials(
        &self,
        root: &ItemRoot,
        variant: Option<i32>,
    ) -> Result<Vec<String>, StoreError>;

    /// Texture paths referenced by one material.
    async fn texture_paths(&self, material: &str) -> Result<Vec<String>, StoreError>;

    /// Usage slot of a texture within a material, for display labels.
    /// Defaults to none; resolvers that parse materials can do better.
    async fn texture_usage(
        &self,
        _material: &str,
        _texture: &str,
    ) -> Result<Option<String>, StoreError> {
        Ok(None)
    }
}
