//! Layout engine: turns a part list plus view state into a render scene.
//!
//! Assembled mode keeps authored transforms. Separated mode ignores them and
//! puts every part on a deterministic grid with a text label to its right.
//! Both are pure functions of `(parts, view)`.

use glam::DVec3;
use serde::Serialize;
use shared::{Part, PartOperation, ShapeKind, Unit, ViewMode};

use crate::dimensions::{annotate, DimensionLine};
use crate::state::ViewState;
use crate::text;

pub const MAX_GRID_COLUMNS: usize = 2;
pub const GRID_SPACING_X: f64 = 70.0;
pub const GRID_SPACING_Y: f64 = 50.0;

/// Distance between a part's widest half-extent and its label.
pub const LABEL_GAP: f64 = 8.0;
pub const LABEL_WRAP_WIDTH: f64 = 18.0;
pub const LABEL_TITLE_SIZE: f64 = 1.2;
pub const LABEL_OPERATION_SIZE: f64 = 0.8;
pub const LABEL_OPERATION_DROP: f64 = 1.8;
pub const LABEL_DESCRIPTION_SIZE: f64 = 0.9;
pub const LABEL_DESCRIPTION_DROP: f64 = 3.5;
const LABEL_LINE_HEIGHT: f64 = LABEL_DESCRIPTION_SIZE * 1.2;

/// Outline colour drawn on top of every shape (#1e293b).
pub const EDGE_COLOR: [u8; 3] = [0x1e, 0x29, 0x3b];

// ── Grid ────────────────────────────────────────────────────────

/// Columns used for `count` parts: one for a single part, otherwise two.
pub fn grid_columns(count: usize) -> usize {
    count.clamp(1, MAX_GRID_COLUMNS)
}

/// Cell of part `index` in a separated grid of `count` parts
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GridCell {
    pub column: usize,
    pub row: usize,
    pub offset: [f64; 3],
}

pub fn grid_cell(index: usize, count: usize) -> GridCell {
    let columns = grid_columns(count);
    let column = index % columns;
    let row = index / columns;
    let x = (column as f64 - (columns as f64 - 1.0) / 2.0) * GRID_SPACING_X;
    let y = -(row as f64) * GRID_SPACING_Y;
    GridCell {
        column,
        row,
        offset: [x, y, 0.0],
    }
}

// ── Scene ───────────────────────────────────────────────────────

/// Surface material for one part
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Material {
    pub color: [u8; 3],
    /// Outline drawn over the surface
    pub edge_color: [u8; 3],
    pub opacity: f64,
    pub transparent: bool,
    pub wireframe: bool,
}

impl Material {
    /// Subtractive parts are a translucent red overlay; there is no boolean
    /// evaluation behind them.
    pub fn for_operation(operation: PartOperation, wireframe: bool) -> Self {
        match operation {
            PartOperation::Subtract => Self {
                color: [0xef, 0x44, 0x44],
                edge_color: EDGE_COLOR,
                opacity: 0.5,
                transparent: true,
                wireframe,
            },
            PartOperation::Base => Self {
                color: [0x94, 0xa3, 0xb8],
                edge_color: EDGE_COLOR,
                opacity: 1.0,
                transparent: false,
                wireframe,
            },
            PartOperation::Add => Self {
                color: [0x64, 0x74, 0x8b],
                edge_color: EDGE_COLOR,
                opacity: 1.0,
                transparent: false,
                wireframe,
            },
        }
    }
}

/// Text block shown to the right of a part in separated mode
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartLabel {
    /// Left/middle anchor, relative to the placement position
    pub anchor: [f64; 3],
    /// "Part N"
    pub title: String,
    /// "[ADD]"
    pub operation: String,
    /// Explanation wrapped to `LABEL_WRAP_WIDTH`
    pub description: Vec<String>,
}

impl PartLabel {
    fn for_part(part: &Part, ordinal: usize) -> Self {
        let description = if part.explanation.is_empty() {
            "No description"
        } else {
            part.explanation.as_str()
        };
        Self {
            anchor: [part.max_dimension() / 2.0 + LABEL_GAP, 0.0, 0.0],
            title: format!("Part {ordinal}"),
            operation: format!("[{}]", part.operation.keyword()),
            description: text::wrap(description, LABEL_WRAP_WIDTH, LABEL_DESCRIPTION_SIZE),
        }
    }

    fn bounds(&self, origin: DVec3) -> Bounds {
        let anchor = origin + DVec3::from_array(self.anchor);
        let widest = self
            .description
            .iter()
            .map(|line| text::text_width(line, LABEL_DESCRIPTION_SIZE))
            .fold(text::text_width(&self.title, LABEL_TITLE_SIZE), f64::max);
        let bottom = LABEL_DESCRIPTION_DROP + self.description.len() as f64 * LABEL_LINE_HEIGHT;
        Bounds {
            min: (anchor - DVec3::new(0.0, bottom, 0.0)).to_array(),
            max: (anchor + DVec3::new(widest, LABEL_TITLE_SIZE / 2.0, 0.0)).to_array(),
        }
    }
}

/// Where and how one part is drawn
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Placement {
    pub part: Part,
    /// 1-based construction order
    pub ordinal: usize,
    /// Effective bounding-box centre
    pub position: [f64; 3],
    /// Effective rotation, degrees XYZ
    pub rotation: [f64; 3],
    pub material: Material,
    /// Lines relative to `position`, unrotated
    pub dimension_lines: Vec<DimensionLine>,
    pub label: Option<PartLabel>,
}

impl Placement {
    /// Mesh origin for the renderer. A wedge is extruded from its corner, so
    /// its origin sits half a size below the bounding-box centre.
    pub fn mesh_origin(&self) -> [f64; 3] {
        let position = DVec3::from_array(self.position);
        match self.part.shape {
            ShapeKind::Wedge => (position - DVec3::from_array(self.part.half_extents())).to_array(),
            _ => self.position,
        }
    }

    /// Effective rotation, which separated mode zeroes whatever the part says.
    pub fn is_rotated(&self) -> bool {
        self.rotation.iter().any(|r| *r != 0.0)
    }

    /// Conservative bounds: rotated parts use their circumscribed sphere.
    pub fn bounds(&self) -> Bounds {
        let centre = DVec3::from_array(self.position);
        let half = DVec3::from_array(self.part.bounding_half_extents());
        let half = if self.is_rotated() {
            DVec3::splat(half.length())
        } else {
            half
        };
        let mut bounds = Bounds {
            min: (centre - half).to_array(),
            max: (centre + half).to_array(),
        };
        for line in &self.dimension_lines {
            for point in [line.start, line.end, line.label_position] {
                bounds.include((centre + DVec3::from_array(point)).to_array());
            }
        }
        if let Some(label) = &self.label {
            bounds = bounds.union(&label.bounds(centre));
        }
        bounds
    }
}

/// Axis-aligned box in scene coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl Bounds {
    pub fn include(&mut self, point: [f64; 3]) {
        let p = DVec3::from_array(point);
        self.min = DVec3::from_array(self.min).min(p).to_array();
        self.max = DVec3::from_array(self.max).max(p).to_array();
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            min: DVec3::from_array(self.min).min(DVec3::from_array(other.min)).to_array(),
            max: DVec3::from_array(self.max).max(DVec3::from_array(other.max)).to_array(),
        }
    }

    pub fn center(&self) -> [f64; 3] {
        ((DVec3::from_array(self.min) + DVec3::from_array(self.max)) / 2.0).to_array()
    }
}

/// Everything a renderer needs to draw one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scene {
    pub mode: ViewMode,
    pub unit: Unit,
    pub wireframe: bool,
    pub placements: Vec<Placement>,
}

impl Scene {
    /// Bounds of all placements, `None` for an empty scene.
    pub fn bounds(&self) -> Option<Bounds> {
        self.placements
            .iter()
            .map(Placement::bounds)
            .reduce(|a, b| a.union(&b))
    }
}

// ── Composition ─────────────────────────────────────────────────

/// Compose the scene for `parts` under `view`.
pub fn compose(parts: &[Part], view: &ViewState) -> Scene {
    let placements = match view.view_mode {
        ViewMode::Assembled => parts
            .iter()
            .enumerate()
            .map(|(i, part)| place_assembled(part, i, view))
            .collect(),
        ViewMode::Separated => parts
            .iter()
            .enumerate()
            .map(|(i, part)| place_separated(part, i, parts.len(), view))
            .collect(),
    };

    Scene {
        mode: view.view_mode,
        unit: view.unit,
        wireframe: view.wireframe,
        placements,
    }
}

/// Authored transform verbatim. Subtractive cavities are never dimensioned
/// here: they overlap the solid and the lines would be ambiguous.
pub fn place_assembled(part: &Part, index: usize, view: &ViewState) -> Placement {
    let dimension_lines = if view.show_dimensions && part.operation != PartOperation::Subtract {
        annotate(part, view.unit)
    } else {
        Vec::new()
    };

    Placement {
        part: part.clone(),
        ordinal: index + 1,
        position: part.position,
        rotation: part.rotation,
        material: Material::for_operation(part.operation, view.wireframe),
        dimension_lines,
        label: None,
    }
}

/// Grid cell position, no rotation, label on the right.
pub fn place_separated(part: &Part, index: usize, count: usize, view: &ViewState) -> Placement {
    let cell = grid_cell(index, count);
    let dimension_lines = if view.show_dimensions {
        annotate(part, view.unit)
    } else {
        Vec::new()
    };

    Placement {
        part: part.clone(),
        ordinal: index + 1,
        position: cell.offset,
        rotation: [0.0; 3],
        material: Material::for_operation(part.operation, view.wireframe),
        dimension_lines,
        label: Some(PartLabel::for_part(part, index + 1)),
    }
}
