//! Integration tests for the model store: collection, persistence, generation
//! and tutor chat against scripted collaborators.

use std::sync::Arc;

use graphite_studio::fixtures::*;
use graphite_studio::harness::{FailingStorage, ScriptedAi, ScriptedVerdict, TestHarness};
use graphite_studio::ingest::UNTITLED_MODEL;
use graphite_studio::state::{ChatError, ModelStore};
use graphite_studio::{AiError, GenerateError};
use shared::{GeneratedModel, Unit, ViewMode};
use tokio::sync::Notify;

// ── Collection ──────────────────────────────────────────────────

#[test]
fn test_add_model_goes_to_head_and_becomes_active() {
    let h = TestHarness::new();
    h.store.add_model(model_with_parts("a", bracket_parts()));
    h.store.add_model(model_with_parts("b", bracket_parts()));

    let ids: Vec<String> = h.store.models().iter().map(|m| m.id.clone()).collect();
    assert_eq!(ids, vec!["b", "a"]);
    assert_eq!(h.store.current_model_id().as_deref(), Some("b"));

    let persisted: Vec<String> = h.persisted().iter().map(|m| m.id.clone()).collect();
    assert_eq!(persisted, ids);
}

#[test]
fn test_unknown_id_leaves_active_model() {
    let h = TestHarness::new();
    h.store.add_model(model_with_parts("a", bracket_parts()));
    h.store.add_model(model_with_parts("b", bracket_parts()));

    assert!(h.store.set_current_model("a"));
    assert!(!h.store.set_current_model("missing"));
    assert_eq!(h.store.current_model_id().as_deref(), Some("a"));
    assert_eq!(h.store.current_model().map(|m| m.id), Some("a".to_string()));
}

#[test]
fn test_load_replaces_collection() {
    let h = TestHarness::with_stored(vec![bracket_model(), model_with_parts("old", bracket_parts())]);
    assert_eq!(h.store.model_count(), 0);

    h.store.load_models_from_storage();
    assert_eq!(h.store.model_count(), 2);
    assert_eq!(h.store.models()[0].id, "bracket");
    assert!(h.store.current_model_id().is_none());
}

#[test]
fn test_storage_failures_are_contained() {
    let store = ModelStore::new(Arc::new(FailingStorage), Arc::new(ScriptedAi::new()));
    store.add_model(bracket_model());

    store.load_models_from_storage();
    assert_eq!(store.model_count(), 1);
    assert_eq!(store.current_model_id().as_deref(), Some("bracket"));
}

#[test]
fn test_summaries_flag_pdf_sources() {
    let h = TestHarness::new();
    let mut pdf = model_with_parts("pdf", bracket_parts());
    pdf.original_image = pdf_data_url();
    h.store.add_model(bracket_model());
    h.store.add_model(pdf);

    let summaries = h.store.summaries();
    assert_eq!(summaries.len(), 2);
    assert!(summaries[0].is_pdf);
    assert!(!summaries[1].is_pdf);
    assert_eq!(summaries[1].part_count, 5);
}

#[test]
fn test_view_settings() {
    let h = TestHarness::new();
    let view = h.store.view();
    assert_eq!(view.view_mode, ViewMode::Assembled);
    assert_eq!(view.unit, Unit::Mm);
    assert!(!view.wireframe);
    assert!(view.show_dimensions);

    h.store.set_view_mode(ViewMode::Separated);
    h.store.set_unit(Unit::Cm);
    assert!(h.store.toggle_wireframe());
    assert!(!h.store.toggle_show_dimensions());

    let view = h.store.view();
    assert_eq!(view.view_mode, ViewMode::Separated);
    assert_eq!(view.unit, Unit::Cm);
    assert!(view.wireframe);
    assert!(!view.show_dimensions);
}

// ── Generation ──────────────────────────────────────────────────

#[tokio::test]
async fn test_generate_adds_active_model() {
    let h = TestHarness::new();
    let id = h.generate().await.unwrap();

    assert!(!h.store.is_generating());
    assert_eq!(h.store.current_model_id(), Some(id.clone()));
    let model = h.store.model(&id).unwrap();
    assert_eq!(model.name, "Angle Bracket");
    assert_eq!(model.parts.len(), 5);
    assert_eq!(model.original_image, png_data_url());
    assert!(model.timestamp > 0);
    assert_eq!(h.persisted().len(), 1);
    assert_eq!(h.ai.validate_calls(), 1);
    assert_eq!(h.ai.generate_calls(), 1);
}

#[tokio::test]
async fn test_rejected_drawing_reason_is_surfaced() {
    let ai = ScriptedAi::new().with_verdict(ScriptedVerdict::Invalid("This is a cat.".to_string()));
    let h = TestHarness::with_ai(ai);

    let err = h.generate().await.unwrap_err();
    assert!(matches!(&err, GenerateError::InvalidDrawing { reason } if reason == "This is a cat."));
    assert_eq!(err.to_string(), "Invalid Image: This is a cat.");
    assert_eq!(h.store.model_count(), 0);
    assert_eq!(h.ai.generate_calls(), 0);
    assert!(!h.store.is_generating());
}

#[tokio::test]
async fn test_rejection_without_reason_gets_default() {
    let ai = ScriptedAi::new().with_verdict(ScriptedVerdict::Invalid(String::new()));
    let h = TestHarness::with_ai(ai);

    let err = h.generate().await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid Image: Not an engineering drawing.");
}

#[tokio::test]
async fn test_validation_failure_fails_open() {
    let ai = ScriptedAi::new().with_verdict(ScriptedVerdict::Fail("timeout".to_string()));
    let h = TestHarness::with_ai(ai);

    let id = h.generate().await.unwrap();
    assert_eq!(h.store.current_model_id(), Some(id));
    assert_eq!(h.ai.generate_calls(), 1);
}

#[tokio::test]
async fn test_generation_failure_leaves_store_unchanged() {
    let h = TestHarness::with_ai(ScriptedAi::new().with_generation(Err("quota".to_string())));
    h.store.add_model(bracket_model());

    let err = h.generate().await.unwrap_err();
    assert!(matches!(err, GenerateError::Ai(AiError::Transport(_))));
    assert!(!h.store.is_generating());
    assert_eq!(h.store.model_count(), 1);
    assert_eq!(h.store.current_model_id().as_deref(), Some("bracket"));
}

#[tokio::test]
async fn test_empty_generation_is_rejected() {
    let empty = GeneratedModel {
        name: "Nothing".to_string(),
        parts: vec![],
    };
    let h = TestHarness::with_ai(ScriptedAi::new().with_generation(Ok(empty)));

    let err = h.generate().await.unwrap_err();
    assert!(matches!(err, GenerateError::Ingest(_)));
    assert_eq!(h.store.model_count(), 0);
    assert!(h.persisted().is_empty());
}

#[tokio::test]
async fn test_blank_generated_name_gets_placeholder() {
    let mut generated = bracket_generation();
    generated.name = String::new();
    let h = TestHarness::with_ai(ScriptedAi::new().with_generation(Ok(generated)));

    let id = h.generate().await.unwrap();
    assert_eq!(h.store.model(&id).unwrap().name, UNTITLED_MODEL);
}

#[tokio::test]
async fn test_second_generation_is_busy() {
    let gate = Arc::new(Notify::new());
    let h = TestHarness::with_ai(ScriptedAi::new().with_gate(gate.clone()));

    let first = h.generate();
    let second = async {
        tokio::task::yield_now().await;
        assert!(h.store.is_generating());
        let result = h.generate().await;
        gate.notify_one();
        result
    };
    let (first, second) = tokio::join!(first, second);

    assert!(first.is_ok());
    assert!(matches!(second, Err(GenerateError::Busy)));
    assert_eq!(h.store.model_count(), 1);
    assert_eq!(h.ai.generate_calls(), 1);
    assert!(!h.store.is_generating());
}

#[tokio::test]
async fn test_generated_ids_are_fresh() {
    let h = TestHarness::new();
    let a = h.generate().await.unwrap();
    let b = h.generate().await.unwrap();
    assert_ne!(a, b);

    let first = h.store.model(&a).unwrap();
    let second = h.store.model(&b).unwrap();
    for (x, y) in first.parts.iter().zip(&second.parts) {
        assert_ne!(x.id, y.id);
    }
}

// ── Tutor chat ──────────────────────────────────────────────────

#[tokio::test]
async fn test_chat_passes_model_context() {
    let h = TestHarness::new();
    let id = h.add_bracket();

    let reply = h.store.chat(&id, "  Why two holes?  ", "key").await.unwrap();
    assert_eq!(reply, "Start with the base plate.");

    let (context, message) = h.ai.last_chat().unwrap();
    assert_eq!(message, "Why two holes?");
    assert_eq!(context.model_name, "Angle Bracket");
    assert_eq!(context.part_count, 5);
}

#[tokio::test]
async fn test_chat_rejects_empty_and_unknown() {
    let h = TestHarness::new();
    let id = h.add_bracket();

    assert!(matches!(h.store.chat(&id, "   ", "key").await, Err(ChatError::EmptyMessage)));
    assert!(matches!(
        h.store.chat("nope", "hello", "key").await,
        Err(ChatError::UnknownModel(_))
    ));
    assert_eq!(h.ai.chat_calls(), 0);
}

