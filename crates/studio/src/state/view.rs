//! Process-wide view settings and the scoped export override

use serde::{Deserialize, Serialize};
use shared::{Unit, ViewMode};

use super::ModelStore;

/// Display settings shared by every view of the active model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub view_mode: ViewMode,
    pub unit: Unit,
    pub wireframe: bool,
    pub show_dimensions: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            view_mode: ViewMode::Assembled,
            unit: Unit::Mm,
            wireframe: false,
            show_dimensions: true,
        }
    }
}

/// Forces a view mode and wireframe for the lifetime of the guard.
///
/// The prior mode and wireframe flag are restored on drop, whichever way the
/// holder exits.
pub struct ViewOverride<'a> {
    store: &'a ModelStore,
    prior_mode: ViewMode,
    prior_wireframe: bool,
}

impl<'a> ViewOverride<'a> {
    pub fn capture(store: &'a ModelStore) -> Self {
        let view = store.view();
        Self {
            store,
            prior_mode: view.view_mode,
            prior_wireframe: view.wireframe,
        }
    }

    /// Switch to `mode` with wireframe on
    pub fn apply(&self, mode: ViewMode) -> ViewState {
        self.store.set_view_mode(mode);
        self.store.set_wireframe(true);
        self.store.view()
    }
}

impl Drop for ViewOverride<'_> {
    fn drop(&mut self) {
        self.store.set_view_mode(self.prior_mode);
        self.store.set_wireframe(self.prior_wireframe);
        tracing::debug!(
            "Restored view mode '{}' and wireframe={}",
            self.prior_mode.as_str(),
            self.prior_wireframe
        );
    }
}
