//! Unsaved-change confirmation contract.
//!
//! Editors live in the host; the session only needs to know whether a level
//! holds unsaved work and to ask before discarding it. Prompting completes
//! before any navigation-driven mutation proceeds; a negative answer aborts
//! the navigation with nothing mutated.

use crate::types::Level;
use async_trait::async_trait;

#[async_trait]
pub trait ConfirmationGate: Send + Sync {
    /// Whether the editor for `level` holds unsaved changes.
    fn has_unsaved(&self, level: Level) -> bool;

    /// Ask the user to discard the unsaved changes for `level`. Async
    /// because the answer comes from dialog UI.
    async fn confirm_discard(&self, level: Level) -> bool;

    /// Clear the unsaved flag once the user agreed to discard.
    fn mark_discarded(&self, level: Level);
}

/// Gate for hosts without editors; never prompts.
pub struct NoEditors;

#[async_trait]
impl ConfirmationGate for NoEditors {
    fn has_unsaved(&self, _level: Level) -> bool {
        false
    }

    async fn confirm_discard(&self, _level: Level) -> bool {
        true
    }

    fn mark_discarded(&self, _level: Level) {}
}
