//! Sequential tree construction against the root resolver.
//!
//! Later levels are keyed by the results of earlier ones, so the three
//! resolution passes cannot overlap. A resolver failure at any stage aborts
//! the build and the partial tree is dropped; the caller keeps whatever tree
//! it already had.

use super::DependencyTree;
use crate::error::StoreError;
use crate::paths::secondary_id;
use crate::resolver::{ItemRoot, RootClass, RootResolver};
use crate::types::EMPTY_KEY;
use tracing::debug;

pub struct TreeBuilder<'a> {
    resolver: &'a dyn RootResolver,
    root: &'a ItemRoot,
    variant: Option<i32>,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(resolver: &'a dyn RootResolver, root: &'a ItemRoot) -> Self {
        Self {
            resolver,
            root,
            variant: None,
        }
    }

    pub fn with_variant(mut self, variant: Option<i32>) -> Self {
        self.variant = variant;
        self
    }

    /// Build a complete tree for the root. Deterministic for identical
    /// resolver responses; the result is only installed by the caller once
    /// the whole build has succeeded.
    pub async fn build(&self) -> Result<DependencyTree, StoreError> {
        let mut tree = DependencyTree::new();

        self.resolve_models(&mut tree).await?;
        self.resolve_materials(&mut tree).await?;
        self.resolve_orphans(&mut tree).await?;
        self.resolve_textures(&mut tree).await?;

        tree.ensure_placeholders();
        debug!(
            root = %self.root.id,
            models = tree.model_count(),
            "dependency tree built"
        );
        Ok(tree)
    }

    async fn resolve_models(&self, tree: &mut DependencyTree) -> Result<(), StoreError> {
        let models = self.resolver.model_files(self.root).await?;
        for model in models {
            tree.push_model(model);
        }
        if tree.model_count() == 0 {
            // Downstream passes attach to the first entry, so the
            // placeholder has to exist before they run.
            tree.push_model(EMPTY_KEY.to_string());
        }
        Ok(())
    }

    async fn resolve_materials(&self, tree: &mut DependencyTree) -> Result<(), StoreError> {
        if self.root.class == RootClass::SharedBody {
            // One physical body mesh shared by every variant: resolve the
            // item's materials once and hang them off the first model.
            let first = tree.first_model();
            let materials = self
                .resolver
                .material_files(self.root, EMPTY_KEY, None)
                .await?;
            for material in materials {
                tree.push_material(&first, material);
            }
            return Ok(());
        }

        for model in tree.model_keys() {
            let materials = self
                .resolver
                .material_files(self.root, &model, self.variant)
                .await?;
            for material in materials {
                tree.push_material(&model, material);
            }
        }
        Ok(())
    }

    async fn resolve_orphans(&self, tree: &mut DependencyTree) -> Result<(), StoreError> {
        let orphans = self
            .resolver
            .orphan_materials(self.root, self.variant)
            .await?;
        if orphans.is_empty() {
            return Ok(());
        }

        if self.root.has_secondary {
            // At most one model on roots with a real secondary identifier.
            let first = tree.first_model();
            for orphan in orphans {
                tree.push_material(&first, orphan);
            }
            return Ok(());
        }

        let models = tree.model_keys();
        for orphan in orphans {
            let wanted = secondary_id(&orphan);
            let target = models
                .iter()
                .find(|model| secondary_id(model) == wanted && wanted.is_some())
                .cloned()
                .unwrap_or_else(|| tree.first_model());
            tree.push_material(&target, orphan);
        }
        Ok(())
    }

    async fn resolve_textures(&self, tree: &mut DependencyTree) -> Result<(), StoreError> {
        let pairs: Vec<(String, String)> = tree
            .model_keys()
            .into_iter()
            .flat_map(|model| {
                tree.material_keys(&model)
                    .into_iter()
                    .filter(|material| !material.is_empty())
                    .map(move |material| (model.clone(), material))
                    .collect::<Vec<_>>()
            })
            .collect();

        for (model, material) in pairs {
            let textures = self.resolver.texture_paths(&material).await?;
            for texture in textures {
                tree.push_texture(&model, &material, texture);
            }
        }
        Ok(())
    }
}
