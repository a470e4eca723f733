//! Model store: the model collection, the active model and view settings.
//!
//! The store is an explicit value handed to whoever needs it; storage and the
//! AI collaborator are injected so tests can swap them out.

pub mod slot;
pub mod storage;
pub mod view;

use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use shared::{ImagePayload, Model, ModelId, ModelSummary, Unit, ViewMode};
use thiserror::Error;

use crate::ai::{AiCollaborator, AiError, TutorContext};
use crate::ingest::{self, IngestError};
pub use slot::{SlotGuard, TaskSlot};
pub use storage::{JsonFileStorage, MemoryStorage, ModelStorage, StorageError};
pub use view::{ViewOverride, ViewState};

/// The one key the whole collection is stored under
pub const STORAGE_KEY: &str = "graphite_models";

const DEFAULT_INVALID_REASON: &str = "Not an engineering drawing.";

/// Failures of `generate_model`
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("a model generation is already in progress")]
    Busy,

    #[error("Invalid Image: {reason}")]
    InvalidDrawing { reason: String },

    #[error(transparent)]
    Ai(#[from] AiError),

    #[error("generated model rejected: {0}")]
    Ingest(#[from] IngestError),
}

/// Failures of the tutor chat
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("model '{0}' not found")]
    UnknownModel(String),

    #[error("message is empty")]
    EmptyMessage,

    #[error(transparent)]
    Ai(#[from] AiError),
}

#[derive(Default)]
struct StoreState {
    /// Newest first
    models: Vec<Model>,
    /// Lookup key into `models`, never a second owner
    current: Option<ModelId>,
    view: ViewState,
    /// Bumped on every collection change that needs persisting
    revision: u64,
}

/// Copy of the collection taken under the lock, written after it is released
struct Snapshot {
    revision: u64,
    models: Vec<Model>,
}

/// Write `snapshot` unless a newer one already reached storage.
fn persist(
    storage: &dyn ModelStorage,
    written: &Mutex<u64>,
    snapshot: &Snapshot,
) -> Result<bool, StorageError> {
    let mut last = written.lock().unwrap_or_else(PoisonError::into_inner);
    if snapshot.revision <= *last {
        return Ok(false);
    }
    storage.set(STORAGE_KEY, &snapshot.models)?;
    *last = snapshot.revision;
    Ok(true)
}

pub struct ModelStore {
    state: RwLock<StoreState>,
    storage: Arc<dyn ModelStorage>,
    /// Revision of the last snapshot written to storage
    written: Arc<Mutex<u64>>,
    ai: Arc<dyn AiCollaborator>,
    generation: TaskSlot,
    export: TaskSlot,
}

impl ModelStore {
    pub fn new(storage: Arc<dyn ModelStorage>, ai: Arc<dyn AiCollaborator>) -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            storage,
            written: Arc::new(Mutex::new(0)),
            ai,
            generation: TaskSlot::default(),
            export: TaskSlot::default(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Collection ────────────────────────────────────────────

    pub fn models(&self) -> Vec<Model> {
        self.read().models.clone()
    }

    pub fn model_count(&self) -> usize {
        self.read().models.len()
    }

    /// History listing, newest first
    pub fn summaries(&self) -> Vec<ModelSummary> {
        self.read().models.iter().map(Model::summary).collect()
    }

    pub fn model(&self, id: &str) -> Option<Model> {
        self.read().models.iter().find(|m| m.id == id).cloned()
    }

    /// Prepend `model`, persist the whole collection and make it active.
    ///
    /// Storage is written on the calling thread after the store lock is
    /// released. A failed write is logged; the in-memory collection keeps the
    /// model.
    pub fn add_model(&self, model: Model) {
        let id = model.id.clone();
        let snapshot = self.insert(model);
        if let Err(e) = persist(self.storage.as_ref(), &self.written, &snapshot) {
            tracing::error!("Failed to persist models after adding {id}: {e}");
        }
    }

    /// `add_model` for async callers: the write runs on the blocking pool.
    pub async fn add_model_async(&self, model: Model) {
        let id = model.id.clone();
        let snapshot = self.insert(model);
        let storage = Arc::clone(&self.storage);
        let written = Arc::clone(&self.written);
        let result =
            tokio::task::spawn_blocking(move || persist(storage.as_ref(), &written, &snapshot)).await;
        match result {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => tracing::error!("Failed to persist models after adding {id}: {e}"),
            Err(e) => tracing::error!("Persist task for {id} did not finish: {e}"),
        }
    }

    fn insert(&self, model: Model) -> Snapshot {
        let mut state = self.write();
        state.current = Some(model.id.clone());
        state.models.insert(0, model);
        state.revision += 1;
        Snapshot {
            revision: state.revision,
            models: state.models.clone(),
        }
    }

    /// Make `id` active. Unknown ids leave the active model untouched.
    pub fn set_current_model(&self, id: &str) -> bool {
        let mut state = self.write();
        if state.models.iter().any(|m| m.id == id) {
            state.current = Some(id.to_string());
            true
        } else {
            tracing::debug!("set_current_model: no model {id}");
            false
        }
    }

    pub fn current_model_id(&self) -> Option<ModelId> {
        self.read().current.clone()
    }

    pub fn current_model(&self) -> Option<Model> {
        let state = self.read();
        let id = state.current.as_deref()?;
        state.models.iter().find(|m| m.id == id).cloned()
    }

    /// Replace the collection with what storage holds.
    ///
    /// Read failures are treated as "no history" and leave the collection as it
    /// was.
    pub fn load_models_from_storage(&self) {
        match self.storage.get(STORAGE_KEY) {
            Ok(Some(models)) => {
                tracing::info!("Loaded {} models from storage", models.len());
                self.write().models = models;
            }
            Ok(None) => tracing::debug!("No stored models"),
            Err(e) => tracing::warn!("Failed to load history: {e}"),
        }
    }

    // ── View settings ─────────────────────────────────────────

    pub fn view(&self) -> ViewState {
        self.read().view
    }

    pub fn set_view_mode(&self, mode: ViewMode) {
        self.write().view.view_mode = mode;
    }

    pub fn set_unit(&self, unit: Unit) {
        self.write().view.unit = unit;
    }

    pub fn set_wireframe(&self, on: bool) {
        self.write().view.wireframe = on;
    }

    pub fn toggle_wireframe(&self) -> bool {
        let mut state = self.write();
        state.view.wireframe = !state.view.wireframe;
        state.view.wireframe
    }

    pub fn toggle_show_dimensions(&self) -> bool {
        let mut state = self.write();
        state.view.show_dimensions = !state.view.show_dimensions;
        state.view.show_dimensions
    }

    // ── Long-running operations ───────────────────────────────

    pub fn is_generating(&self) -> bool {
        self.generation.is_busy()
    }

    pub fn is_exporting(&self) -> bool {
        self.export.is_busy()
    }

    pub(crate) fn export_slot(&self) -> &TaskSlot {
        &self.export
    }

    /// Validate, generate, ingest and add a model for `image` (a data URL).
    ///
    /// Validation fails open: a broken validator only logs a warning, while an
    /// explicit "not a drawing" verdict always aborts. Nothing is added to the
    /// collection unless every step succeeds.
    pub async fn generate_model(
        &self,
        image: &str,
        credential: &str,
    ) -> Result<ModelId, GenerateError> {
        let _slot = self.generation.try_acquire().ok_or(GenerateError::Busy)?;
        let payload = ImagePayload::parse(image);

        match self.ai.validate_drawing(&payload, credential).await {
            Ok(verdict) if !verdict.is_valid => {
                let reason = match verdict.reason.trim() {
                    "" => DEFAULT_INVALID_REASON.to_string(),
                    r => r.to_string(),
                };
                tracing::info!("Drawing rejected by validator: {reason}");
                return Err(GenerateError::InvalidDrawing { reason });
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("Validation check failed or skipped, proceeding with caution: {e}");
            }
        }

        let generated = self.ai.generate_parts(&payload, credential).await.map_err(|e| {
            tracing::error!("Generation error: {e}");
            e
        })?;
        let model = ingest::build_model(generated, image.to_string())?;
        let id = model.id.clone();
        tracing::info!("Generated model '{}' with {} parts", model.name, model.parts.len());
        self.add_model_async(model).await;
        Ok(id)
    }

    /// Ask the tutor about model `model_id`.
    pub async fn chat(
        &self,
        model_id: &str,
        message: &str,
        credential: &str,
    ) -> Result<String, ChatError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let model = self
            .model(model_id)
            .ok_or_else(|| ChatError::UnknownModel(model_id.to_string()))?;
        let context = TutorContext::from_model(&model);
        Ok(self.ai.chat(&context, message, credential).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::harness::ScriptedAi;
    use std::sync::{OnceLock, Weak};

    /// Records whether the store was readable while each write ran
    #[derive(Default)]
    struct ReentrantStorage {
        store: OnceLock<Weak<ModelStore>>,
        readable: Mutex<Vec<bool>>,
        inner: MemoryStorage,
    }

    impl ModelStorage for ReentrantStorage {
        fn get(&self, key: &str) -> Result<Option<Vec<Model>>, StorageError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, models: &[Model]) -> Result<(), StorageError> {
            let readable = match self.store.get().and_then(Weak::upgrade) {
                Some(store) => {
                    let unlocked = store.state.try_read().is_ok();
                    unlocked
                }
                None => false,
            };
            self.readable.lock().unwrap().push(readable);
            self.inner.set(key, models)
        }
    }

    fn store_with(storage: &Arc<ReentrantStorage>) -> Arc<ModelStore> {
        let store = Arc::new(ModelStore::new(storage.clone(), Arc::new(ScriptedAi::new())));
        storage.store.set(Arc::downgrade(&store)).unwrap();
        store
    }

    #[test]
    fn test_add_model_writes_outside_the_lock() {
        let storage = Arc::new(ReentrantStorage::default());
        let store = store_with(&storage);

        store.add_model(fixtures::bracket_model());
        assert_eq!(*storage.readable.lock().unwrap(), vec![true]);
        assert_eq!(storage.inner.stored(STORAGE_KEY).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_generated_model_is_persisted_off_the_lock() {
        let storage = Arc::new(ReentrantStorage::default());
        let store = store_with(&storage);

        let id = store
            .generate_model(&fixtures::png_data_url(), "key")
            .await
            .unwrap();
        assert_eq!(*storage.readable.lock().unwrap(), vec![true]);
        let stored = storage.inner.stored(STORAGE_KEY).unwrap();
        assert_eq!(stored[0].id, id);
    }

    #[test]
    fn test_stale_snapshot_is_not_written() {
        let storage = MemoryStorage::new();
        let written = Mutex::new(0);
        let newer = Snapshot {
            revision: 2,
            models: vec![fixtures::bracket_model(), fixtures::bracket_model()],
        };
        let older = Snapshot {
            revision: 1,
            models: vec![fixtures::bracket_model()],
        };

        assert!(persist(&storage, &written, &newer).unwrap());
        assert!(!persist(&storage, &written, &older).unwrap());
        assert_eq!(storage.stored(STORAGE_KEY).unwrap().len(), 2);
    }
}
