//! Ingestion of generator output: validation, id and timestamp assignment.
//!
//! Ids coming from the generator are never trusted; every part and the model
//! get fresh UUIDs here. All lengths are millimetres by contract with the
//! generator, so the checks below are sanity bounds on that contract.

use shared::{GeneratedModel, Model, Part, PartOperation, PartSpec};
use thiserror::Error;

/// Largest accepted dimension, in millimetres.
pub const MAX_DIMENSION_MM: f64 = 100_000.0;
pub const UNTITLED_MODEL: &str = "Untitled Model";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IngestError {
    #[error("generated model has no parts")]
    NoParts,

    #[error("part {index}: {field} must be finite")]
    NonFinite { index: usize, field: &'static str },

    #[error("part {index}: dimension {value} is negative")]
    NegativeDimension { index: usize, value: f64 },

    #[error("part {index}: dimension {value}mm exceeds the {limit}mm sanity limit")]
    Oversized { index: usize, value: f64, limit: f64 },
}

/// Check one generator part
pub fn validate_spec(index: usize, spec: &PartSpec) -> Result<(), IngestError> {
    let fields: [(&'static str, &[f64; 3]); 3] = [
        ("dimensions", &spec.dimensions),
        ("position", &spec.position),
        ("rotation", &spec.rotation),
    ];
    for (field, values) in fields {
        if values.iter().any(|v| !v.is_finite()) {
            return Err(IngestError::NonFinite { index, field });
        }
    }

    for &value in &spec.dimensions {
        if value < 0.0 {
            return Err(IngestError::NegativeDimension { index, value });
        }
        if value > MAX_DIMENSION_MM {
            return Err(IngestError::Oversized {
                index,
                value,
                limit: MAX_DIMENSION_MM,
            });
        }
    }
    Ok(())
}

/// Validate every part and assign ids, preserving order.
pub fn ingest_parts(specs: Vec<PartSpec>) -> Result<Vec<Part>, IngestError> {
    if specs.is_empty() {
        return Err(IngestError::NoParts);
    }
    for (i, spec) in specs.iter().enumerate() {
        validate_spec(i, spec)?;
    }

    let parts: Vec<Part> = specs
        .into_iter()
        .map(|spec| Part::from_spec(uuid::Uuid::new_v4().to_string(), spec))
        .collect();
    Ok(parts)
}

/// The first part is the anchor whatever it declares; layout and rendering
/// rely on position only. Mismatches are reported, not rejected.
fn check_anchor(model: &Model) {
    if let Some(first) = model.anchor() {
        if first.operation != PartOperation::Base {
            tracing::warn!(
                "First part is '{}', not 'base'; treating it as the anchor anyway",
                first.operation
            );
        }
    }
    let bases = model
        .parts
        .iter()
        .filter(|p| p.operation == PartOperation::Base)
        .count();
    if bases > 1 {
        tracing::warn!("Generated model has {bases} base parts; only the first anchors the layout");
    }
}

/// Build a complete model from generator output and the source image.
pub fn build_model(generated: GeneratedModel, original_image: String) -> Result<Model, IngestError> {
    let parts = ingest_parts(generated.parts)?;
    let name = match generated.name.trim() {
        "" => UNTITLED_MODEL.to_string(),
        trimmed => trimmed.to_string(),
    };

    let model = Model {
        id: uuid::Uuid::new_v4().to_string(),
        name,
        timestamp: chrono::Utc::now().timestamp_millis(),
        parts,
        original_image,
    };
    check_anchor(&model);
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use std::collections::HashSet;

    #[test]
    fn test_ids_are_assigned_and_unique() {
        let generated = fixtures::bracket_generation();
        let count = generated.parts.len();
        let model = build_model(generated, fixtures::png_data_url()).unwrap();
        let ids: HashSet<&str> = model.parts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids.len(), count);
        assert!(!ids.contains(model.id.as_str()));
        assert!(model.timestamp > 0);
    }

    #[test]
    fn test_order_is_preserved() {
        let generated = fixtures::bracket_generation();
        let explanations: Vec<String> =
            generated.parts.iter().map(|p| p.explanation.clone()).collect();
        let model = build_model(generated, String::new()).unwrap();
        let got: Vec<String> = model.parts.iter().map(|p| p.explanation.clone()).collect();
        assert_eq!(got, explanations);
    }

    #[test]
    fn test_empty_parts_rejected() {
        let generated = GeneratedModel {
            name: "Nothing".to_string(),
            parts: vec![],
        };
        assert_eq!(build_model(generated, String::new()), Err(IngestError::NoParts));
    }

    #[test]
    fn test_negative_dimension_rejected() {
        let mut generated = fixtures::bracket_generation();
        generated.parts[1].dimensions[0] = -4.0;
        assert_eq!(
            ingest_parts(generated.parts),
            Err(IngestError::NegativeDimension { index: 1, value: -4.0 })
        );
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut generated = fixtures::bracket_generation();
        generated.parts[0].position[2] = f64::NAN;
        assert_eq!(
            ingest_parts(generated.parts),
            Err(IngestError::NonFinite { index: 0, field: "position" })
        );
    }

    #[test]
    fn test_oversized_rejected() {
        let mut generated = fixtures::bracket_generation();
        generated.parts[0].dimensions[1] = 250_000.0;
        assert!(matches!(
            ingest_parts(generated.parts),
            Err(IngestError::Oversized { index: 0, .. })
        ));
    }

    #[test]
    fn test_non_base_first_part_is_kept() {
        let mut generated = fixtures::bracket_generation();
        generated.parts[0].operation = PartOperation::Add;
        let model = build_model(generated, String::new()).unwrap();
        let anchor = model.anchor().unwrap();
        assert_eq!(anchor.operation, PartOperation::Add);
        assert_eq!(anchor.id, model.parts[0].id);
    }

    #[test]
    fn test_blank_name_gets_placeholder() {
        let mut generated = fixtures::bracket_generation();
        generated.name = "   ".to_string();
        let model = build_model(generated, String::new()).unwrap();
        assert_eq!(model.name, UNTITLED_MODEL);
    }
}
