//! Core types for the item dependency cache.

/// ModelKey: internal path of a model file. The empty string is the
/// placeholder entry inserted when a level resolves to nothing.
pub type ModelKey = String;

/// MaterialKey: internal path of a material file, or the empty placeholder.
pub type MaterialKey = String;

/// TextureKey: internal path of a texture file.
pub type TextureKey = String;

/// Store version/offset attached to change events.
pub type Version = i64;

/// Placeholder key used so no level of the tree is ever empty.
pub const EMPTY_KEY: &str = "";

/// The three levels of the dependency tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Model,
    Material,
    Texture,
}
