//! Factory functions for creating test data.
//!
//! Parts, a reference bracket model, the AI generation that produces it and
//! small data-URL payloads.

use shared::*;

/// 1x1 white PNG
const PNG_1X1_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAIAAACQd1PeAAAADElEQVR4nGP4//8/AAX+Av4N70a4AAAAAElFTkSuQmCC";

/// `%PDF-1.4\n`
const PDF_STUB_BASE64: &str = "JVBERi0xLjQK";

// ── Part factories ──────────────────────────────────────────────

fn part(
    id: &str,
    shape: ShapeKind,
    operation: PartOperation,
    dimensions: [f64; 3],
    position: [f64; 3],
) -> Part {
    Part {
        id: id.to_string(),
        shape,
        operation,
        dimensions,
        position,
        rotation: [0.0; 3],
        explanation: String::new(),
    }
}

/// Cube `w x h x d` centred at `pos`
pub fn cube(id: &str, operation: PartOperation, dims: [f64; 3], pos: [f64; 3]) -> Part {
    part(id, ShapeKind::Cube, operation, dims, pos)
}

pub fn cylinder(id: &str, operation: PartOperation, radius: f64, height: f64, pos: [f64; 3]) -> Part {
    part(id, ShapeKind::Cylinder, operation, [radius, height, 0.0], pos)
}

pub fn sphere(id: &str, operation: PartOperation, radius: f64, pos: [f64; 3]) -> Part {
    part(id, ShapeKind::Sphere, operation, [radius, 0.0, 0.0], pos)
}

pub fn wedge(id: &str, operation: PartOperation, dims: [f64; 3], pos: [f64; 3]) -> Part {
    part(id, ShapeKind::Wedge, operation, dims, pos)
}

fn explained(mut part: Part, explanation: &str) -> Part {
    part.explanation = explanation.to_string();
    part
}

// ── Models ──────────────────────────────────────────────────────

/// Angle bracket: base plate, upright, gusset and two bolt holes.
pub fn bracket_parts() -> Vec<Part> {
    vec![
        explained(
            cube("plate", PartOperation::Base, [54.0, 6.0, 30.0], [0.0, 3.0, 0.0]),
            "Base plate",
        ),
        explained(
            cube("upright", PartOperation::Add, [6.0, 30.0, 30.0], [-24.0, 21.0, 0.0]),
            "Vertical flange",
        ),
        explained(
            wedge("gusset", PartOperation::Add, [12.0, 12.0, 4.0], [-15.0, 12.0, 0.0]),
            "Stiffening gusset",
        ),
        explained(
            cylinder("hole_1", PartOperation::Subtract, 3.0, 8.0, [12.0, 3.0, -8.0]),
            "Mounting hole",
        ),
        explained(
            cylinder("hole_2", PartOperation::Subtract, 3.0, 8.0, [12.0, 3.0, 8.0]),
            "Mounting hole",
        ),
    ]
}

pub fn bracket_model() -> Model {
    Model {
        id: "bracket".to_string(),
        name: "Angle Bracket".to_string(),
        timestamp: 1_700_000_000_000,
        parts: bracket_parts(),
        original_image: png_data_url(),
    }
}

/// Model with `parts` and a generic name
pub fn model_with_parts(id: &str, parts: Vec<Part>) -> Model {
    Model {
        id: id.to_string(),
        name: format!("Model {id}"),
        timestamp: 1_700_000_000_000,
        parts,
        original_image: png_data_url(),
    }
}

/// What the AI returns for the bracket drawing (no ids)
pub fn bracket_generation() -> GeneratedModel {
    GeneratedModel {
        name: "Angle Bracket".to_string(),
        parts: bracket_parts()
            .into_iter()
            .map(|p| PartSpec {
                shape: p.shape,
                operation: p.operation,
                dimensions: p.dimensions,
                position: p.position,
                rotation: p.rotation,
                explanation: p.explanation,
            })
            .collect(),
    }
}

// ── Payloads ────────────────────────────────────────────────────

pub fn png_data_url() -> String {
    format!("data:image/png;base64,{PNG_1X1_BASE64}")
}

pub fn pdf_data_url() -> String {
    format!("data:application/pdf;base64,{PDF_STUB_BASE64}")
}
