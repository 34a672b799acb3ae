//! Target selection and restoration across rebuilds.
//!
//! The tracker records where navigation wants to land and re-applies it
//! level by level after every rebuild. Resolution is strictly top-down: the
//! model chosen here decides which materials the next level even considers.

use crate::types::{Level, MaterialKey, ModelKey, TextureKey};

/// Navigation target for the next selection pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Target {
    /// No target; every level takes its first candidate.
    #[default]
    Clear,
    /// The file of interest is known but intentionally outside the tree.
    /// Selection proceeds first-candidate and no panel is forced visible.
    NotInTree,
    /// Land on these keys, as deep as they are specified.
    File {
        model: ModelKey,
        material: Option<MaterialKey>,
        texture: Option<TextureKey>,
    },
}

impl Target {
    /// Whether a target is recorded at all (including the pinned marker).
    pub fn is_set(&self) -> bool {
        !matches!(self, Target::Clear)
    }

    fn key_for(&self, level: Level) -> Option<&str> {
        match self {
            Target::File {
                model,
                material,
                texture,
            } => match level {
                Level::Model => Some(model.as_str()),
                Level::Material => material.as_deref(),
                Level::Texture => texture.as_deref(),
            },
            _ => None,
        }
    }

    /// Whether the pass should surface the panel for `level`: only at the
    /// deepest targeted level, and never for the pinned marker.
    fn focuses(&self, level: Level) -> bool {
        match self {
            Target::File {
                material, texture, ..
            } => match level {
                Level::Model => material.is_none() && texture.is_none(),
                Level::Material => material.is_some() && texture.is_none(),
                Level::Texture => texture.is_some(),
            },
            _ => false,
        }
    }
}

/// Outcome of resolving one level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelSelection {
    pub key: String,
    /// The caller should make this level's panel visible.
    pub focus: bool,
}

#[derive(Debug, Default)]
pub struct SelectionTracker {
    target: Target,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_target(&mut self, target: Target) {
        self.target = target;
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn clear(&mut self) {
        self.target = Target::Clear;
    }

    /// Pick the entry for one level: the targeted key when it is among the
    /// candidates, the first candidate otherwise. Candidates are never empty
    /// by the tree's placeholder invariant.
    ///
    /// A texture-level pass consumes the target: the next rebuild falls back
    /// to the default-first policy unless navigation sets a new one.
    pub fn resolve_level(&mut self, level: Level, candidates: &[String]) -> LevelSelection {
        debug_assert!(!candidates.is_empty(), "levels are placeholder-backed");

        let key = match self.target.key_for(level) {
            Some(wanted) if candidates.iter().any(|c| c == wanted) => wanted.to_string(),
            _ => candidates.first().cloned().unwrap_or_default(),
        };
        let focus = self.target.focuses(level);

        if level == Level::Texture {
            self.target = Target::Clear;
        }
        LevelSelection { key, focus }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn default_policy_picks_first_candidate() {
        let mut tracker = SelectionTracker::new();
        let sel = tracker.resolve_level(Level::Model, &keys(&["a.mdl", "b.mdl"]));
        assert_eq!(sel.key, "a.mdl");
        assert!(!sel.focus);
    }

    #[test]
    fn target_selected_when_present() {
        let mut tracker = SelectionTracker::new();
        tracker.set_target(Target::File {
            model: "b.mdl".to_string(),
            material: None,
            texture: None,
        });
        let sel = tracker.resolve_level(Level::Model, &keys(&["a.mdl", "b.mdl"]));
        assert_eq!(sel.key, "b.mdl");
        assert!(sel.focus);
    }

    #[test]
    fn missing_target_falls_back_to_first() {
        let mut tracker = SelectionTracker::new();
        tracker.set_target(Target::File {
            model: "gone.mdl".to_string(),
            material: None,
            texture: None,
        });
        let sel = tracker.resolve_level(Level::Model, &keys(&["a.mdl", "b.mdl"]));
        assert_eq!(sel.key, "a.mdl");
    }

    #[test]
    fn texture_pass_consumes_target() {
        let mut tracker = SelectionTracker::new();
        tracker.set_target(Target::File {
            model: "a.mdl".to_string(),
            material: Some("m1.mtrl".to_string()),
            texture: Some("t1.tex".to_string()),
        });

        let model = tracker.resolve_level(Level::Model, &keys(&["a.mdl"]));
        assert!(!model.focus);
        let material = tracker.resolve_level(Level::Material, &keys(&["m1.mtrl"]));
        assert!(!material.focus);
        let texture = tracker.resolve_level(Level::Texture, &keys(&["t1.tex", "t2.tex"]));
        assert_eq!(texture.key, "t1.tex");
        assert!(texture.focus);

        assert_eq!(*tracker.target(), Target::Clear);
    }

    #[test]
    fn pinned_target_selects_default_without_focus() {
        let mut tracker = SelectionTracker::new();
        tracker.set_target(Target::NotInTree);
        let sel = tracker.resolve_level(Level::Model, &keys(&["a.mdl", "b.mdl"]));
        assert_eq!(sel.key, "a.mdl");
        assert!(!sel.focus);

        let sel = tracker.resolve_level(Level::Texture, &keys(&["t.tex"]));
        assert!(!sel.focus);
        assert_eq!(*tracker.target(), Target::Clear);
    }

    #[test]
    fn focus_lands_on_deepest_specified_level() {
        let mut tracker = SelectionTracker::new();
        tracker.set_target(Target::File {
            model: "a.mdl".to_string(),
            material: Some("m1.mtrl".to_string()),
            texture: None,
        });
        assert!(!tracker.resolve_level(Level::Model, &keys(&["a.mdl"])).focus);
        assert!(tracker.resolve_level(Level::Material, &keys(&["m1.mtrl"])).focus);
        assert!(!tracker.resolve_level(Level::Texture, &keys(&[""])).focus);
    }
}
