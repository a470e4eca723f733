//! Headless test harness: a model store wired to in-memory storage, a
//! scripted AI collaborator and a fake renderer that produces PNG frames.

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use shared::{DrawingVerdict, GeneratedModel, ImagePayload, Model, ViewMode};
use tokio::sync::Notify;

use crate::ai::{AiCollaborator, AiError, TutorContext};
use crate::fixtures;
use crate::layout::Scene;
use crate::report::{ExportError, ExportMode, ExportOptions, Frame, RenderError, Renderer, Report, ReportExporter};
use crate::state::{MemoryStorage, ModelStorage, ModelStore, StorageError, STORAGE_KEY};

// ── AI collaborator ─────────────────────────────────────────────

/// What `validate_drawing` answers
#[derive(Debug, Clone)]
pub enum ScriptedVerdict {
    Valid,
    Invalid(String),
    /// Transport-style failure
    Fail(String),
}

/// AI collaborator with canned answers and call counters
pub struct ScriptedAi {
    verdict: Mutex<ScriptedVerdict>,
    generation: Mutex<Result<GeneratedModel, String>>,
    chat_reply: String,
    /// When set, `generate_parts` waits for one notification first
    gate: Option<Arc<Notify>>,
    validate_calls: AtomicUsize,
    generate_calls: AtomicUsize,
    chat_calls: AtomicUsize,
    last_chat: Mutex<Option<(TutorContext, String)>>,
}

impl Default for ScriptedAi {
    fn default() -> Self {
        Self {
            verdict: Mutex::new(ScriptedVerdict::Valid),
            generation: Mutex::new(Ok(fixtures::bracket_generation())),
            chat_reply: "Start with the base plate.".to_string(),
            gate: None,
            validate_calls: AtomicUsize::new(0),
            generate_calls: AtomicUsize::new(0),
            chat_calls: AtomicUsize::new(0),
            last_chat: Mutex::new(None),
        }
    }
}

impl ScriptedAi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_verdict(self, verdict: ScriptedVerdict) -> Self {
        self.set_verdict(verdict);
        self
    }

    pub fn with_generation(self, generation: Result<GeneratedModel, String>) -> Self {
        *self.generation.lock().unwrap_or_else(PoisonError::into_inner) = generation;
        self
    }

    pub fn with_gate(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn set_verdict(&self, verdict: ScriptedVerdict) {
        *self.verdict.lock().unwrap_or_else(PoisonError::into_inner) = verdict;
    }

    pub fn validate_calls(&self) -> usize {
        self.validate_calls.load(Ordering::SeqCst)
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub fn chat_calls(&self) -> usize {
        self.chat_calls.load(Ordering::SeqCst)
    }

    /// Context and message of the most recent chat call
    pub fn last_chat(&self) -> Option<(TutorContext, String)> {
        self.last_chat.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl AiCollaborator for ScriptedAi {
    async fn validate_drawing(
        &self,
        _image: &ImagePayload,
        _credential: &str,
    ) -> Result<DrawingVerdict, AiError> {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        let verdict = self.verdict.lock().unwrap_or_else(PoisonError::into_inner).clone();
        match verdict {
            ScriptedVerdict::Valid => Ok(DrawingVerdict {
                is_valid: true,
                reason: String::new(),
            }),
            ScriptedVerdict::Invalid(reason) => Ok(DrawingVerdict {
                is_valid: false,
                reason,
            }),
            ScriptedVerdict::Fail(message) => Err(AiError::Transport(message)),
        }
    }

    async fn generate_parts(
        &self,
        _image: &ImagePayload,
        _credential: &str,
    ) -> Result<GeneratedModel, AiError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.generation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .map_err(AiError::Transport)
    }

    async fn chat(
        &self,
        context: &TutorContext,
        message: &str,
        _credential: &str,
    ) -> Result<String, AiError> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_chat.lock().unwrap_or_else(PoisonError::into_inner) =
            Some((context.clone(), message.to_string()));
        Ok(self.chat_reply.clone())
    }
}

// ── Storage ─────────────────────────────────────────────────────

/// Storage where every read and write fails
#[derive(Default)]
pub struct FailingStorage;

impl ModelStorage for FailingStorage {
    fn get(&self, _key: &str) -> Result<Option<Vec<Model>>, StorageError> {
        Err(StorageError::Unavailable("read refused".to_string()))
    }

    fn set(&self, _key: &str, _models: &[Model]) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("write refused".to_string()))
    }
}

// ── Renderer ────────────────────────────────────────────────────

/// What the fake renderer saw when a frame was captured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureRecord {
    pub mode: ViewMode,
    pub wireframe: bool,
    pub placements: usize,
}

/// Renderer that keeps what it was handed and returns solid PNG frames
pub struct FakeRenderer {
    pub surface: bool,
    pub fail_capture: bool,
    pub frame_size: (u32, u32),
    pub presented: Vec<Scene>,
    pub captures: Vec<CaptureRecord>,
    pub fits: usize,
    pub settles: Vec<Duration>,
}

impl Default for FakeRenderer {
    fn default() -> Self {
        Self {
            surface: true,
            fail_capture: false,
            frame_size: (64, 40),
            presented: Vec::new(),
            captures: Vec::new(),
            fits: 0,
            settles: Vec::new(),
        }
    }
}

impl FakeRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn without_surface() -> Self {
        Self {
            surface: false,
            ..Self::default()
        }
    }

    pub fn failing_capture() -> Self {
        Self {
            fail_capture: true,
            ..Self::default()
        }
    }

    fn encode_frame(&self) -> Result<Vec<u8>, RenderError> {
        let (w, h) = self.frame_size;
        let img = image::RgbImage::from_pixel(w, h, image::Rgb([0xf8, 0xfa, 0xfc]));
        let mut bytes = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut bytes, image::ImageFormat::Png)
            .map_err(|e| RenderError::Capture(e.to_string()))?;
        Ok(bytes.into_inner())
    }
}

#[async_trait]
impl Renderer for FakeRenderer {
    fn has_surface(&self) -> bool {
        self.surface
    }

    fn present(&mut self, scene: &Scene) -> Result<(), RenderError> {
        self.presented.push(scene.clone());
        Ok(())
    }

    fn fit_to_content(&mut self) {
        self.fits += 1;
    }

    async fn settled(&mut self, delay: Duration) {
        self.settles.push(delay);
    }

    fn capture_frame(&mut self) -> Result<Frame, RenderError> {
        if self.fail_capture {
            return Err(RenderError::Capture("device lost".to_string()));
        }
        let scene = self
            .presented
            .last()
            .ok_or_else(|| RenderError::Capture("nothing presented".to_string()))?;
        self.captures.push(CaptureRecord {
            mode: scene.mode,
            wireframe: scene.wireframe,
            placements: scene.placements.len(),
        });
        Ok(Frame::new(self.encode_frame()?))
    }
}

// ── Harness ─────────────────────────────────────────────────────

/// Store, collaborators and renderer wired together
pub struct TestHarness {
    pub storage: Arc<MemoryStorage>,
    pub ai: Arc<ScriptedAi>,
    pub store: Arc<ModelStore>,
    pub renderer: FakeRenderer,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_ai(ScriptedAi::new())
    }

    pub fn with_ai(ai: ScriptedAi) -> Self {
        Self::build(MemoryStorage::new(), ai)
    }

    /// Harness whose storage already holds `models`
    pub fn with_stored(models: Vec<Model>) -> Self {
        Self::build(MemoryStorage::with_models(STORAGE_KEY, models), ScriptedAi::new())
    }

    fn build(storage: MemoryStorage, ai: ScriptedAi) -> Self {
        let storage = Arc::new(storage);
        let ai = Arc::new(ai);
        let store = Arc::new(ModelStore::new(storage.clone(), ai.clone()));
        Self {
            storage,
            ai,
            store,
            renderer: FakeRenderer::new(),
        }
    }

    /// Add the bracket model and return its id
    pub fn add_bracket(&self) -> String {
        let model = fixtures::bracket_model();
        let id = model.id.clone();
        self.store.add_model(model);
        id
    }

    /// Models currently persisted under the store's key
    pub fn persisted(&self) -> Vec<Model> {
        self.storage.stored(STORAGE_KEY).unwrap_or_default()
    }

    pub async fn generate(&self) -> Result<String, crate::state::GenerateError> {
        self.store.generate_model(&fixtures::png_data_url(), "test-key").await
    }

    pub async fn export(&mut self, mode: ExportMode) -> Result<Report, ExportError> {
        let options = ExportOptions {
            settle_delay: Duration::ZERO,
            ..ExportOptions::default()
        };
        ReportExporter::with_options(&self.store, &mut self.renderer, options)
            .export(mode)
            .await
    }
}
