//! Construction narration: one deterministic instruction line per part.
//!
//! The step list and the exported instructions page both go through
//! `construction_steps`, so the two never drift apart.

use serde::Serialize;
use shared::{display_length, Part, PartId, PartOperation, Unit};

/// `"<Action> a <shape>: <explanation>. Dims: <d1 x d2 ...>"`
///
/// Zero dimensions (unused slots, flat parts) are left out.
pub fn narrate(part: &Part, unit: Unit) -> String {
    let dims = part
        .dimensions
        .iter()
        .filter(|d| **d > 0.0)
        .map(|d| display_length(*d, unit))
        .collect::<Vec<_>>()
        .join(" x ");

    format!(
        "{} a {}: {}. Dims: {}",
        part.operation.action(),
        part.shape,
        part.explanation,
        dims
    )
}

/// One entry of the step list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstructionStep {
    /// 1-based position in construction order
    pub ordinal: usize,
    pub part_id: PartId,
    pub operation: PartOperation,
    pub text: String,
}

impl ConstructionStep {
    pub fn new(index: usize, part: &Part, unit: Unit) -> Self {
        Self {
            ordinal: index + 1,
            part_id: part.id.clone(),
            operation: part.operation,
            text: narrate(part, unit),
        }
    }

    /// `"<ordinal>. <text>"`, as printed on the instructions page
    pub fn numbered(&self) -> String {
        format!("{}. {}", self.ordinal, self.text)
    }
}

pub fn construction_steps(parts: &[Part], unit: Unit) -> Vec<ConstructionStep> {
    parts
        .iter()
        .enumerate()
        .map(|(i, part)| ConstructionStep::new(i, part, unit))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_narrate_base_cube() {
        let mut part = fixtures::cube("a", PartOperation::Base, [54.0, 20.0, 30.0], [0.0; 3]);
        part.explanation = "Main Base Block".to_string();
        assert_eq!(
            narrate(&part, Unit::Mm),
            "Start with a cube: Main Base Block. Dims: 54.0mm x 20.0mm x 30.0mm"
        );
    }

    #[test]
    fn test_narrate_filters_zero_dimensions() {
        let mut part = fixtures::cylinder("h", PartOperation::Subtract, 5.0, 22.0, [0.0; 3]);
        part.explanation = "Mounting Hole Left".to_string();
        assert_eq!(
            narrate(&part, Unit::Cm),
            "Subtract a cylinder: Mounting Hole Left. Dims: 0.5cm x 2.2cm"
        );
    }

    #[test]
    fn test_narrate_add_uses_add() {
        let part = fixtures::sphere("s", PartOperation::Add, 4.0, [0.0; 3]);
        assert!(narrate(&part, Unit::Mm).starts_with("Add a sphere: "));
        assert!(narrate(&part, Unit::Mm).ends_with("Dims: 4.0mm"));
    }

    #[test]
    fn test_steps_are_numbered_in_order() {
        let model = fixtures::bracket_model();
        let steps = construction_steps(&model.parts, Unit::Mm);
        assert_eq!(steps.len(), model.parts.len());
        for (i, step) in steps.iter().enumerate() {
            assert_eq!(step.ordinal, i + 1);
            assert_eq!(step.part_id, model.parts[i].id);
            assert_eq!(step.numbered(), format!("{}. {}", i + 1, narrate(&model.parts[i], Unit::Mm)));
        }
    }

    #[test]
    fn test_narration_matches_dimension_labels() {
        use crate::dimensions::annotate;

        let part = fixtures::cube("a", PartOperation::Base, [54.0, 20.0, 30.0], [0.0; 3]);
        for unit in Unit::all() {
            let text = narrate(&part, *unit);
            for line in annotate(&part, *unit) {
                assert!(text.contains(&line.label), "{text} missing {}", line.label);
            }
        }
    }
}
