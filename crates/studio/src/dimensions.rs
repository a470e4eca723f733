//! Dimension annotations for a part's bounding box.
//!
//! Lines are computed in the part's local frame (centre at the origin, no
//! rotation). The layout engine anchors them at the part's placement.

use glam::DVec3;
use serde::Serialize;
use shared::{display_length, Part, Unit};

/// Gap between the shape and its width/height/depth lines.
pub const DIMENSION_OFFSET: f64 = 3.0;
/// Label height above the midpoint of a line.
pub const LABEL_LIFT: f64 = 2.0;
/// Half length of the end tick marks.
pub const TICK_HALF_LENGTH: f64 = 0.5;
/// Annotation colour (#dc2626).
pub const DIMENSION_COLOR: [u8; 3] = [0xdc, 0x26, 0x26];

/// Which bounding-box measurement a line shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DimensionAxis {
    Width,
    Height,
    Depth,
}

/// One measurement line with end ticks and a label
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionLine {
    pub axis: DimensionAxis,
    pub start: [f64; 3],
    pub end: [f64; 3],
    /// Tick segments at `start` and `end`, perpendicular to the line
    pub ticks: [[[f64; 3]; 2]; 2],
    pub label: String,
    pub label_position: [f64; 3],
    pub color: [u8; 3],
    /// Measured value in millimetres
    pub value_mm: f64,
}

impl DimensionLine {
    fn new(axis: DimensionAxis, start: DVec3, end: DVec3, value_mm: f64, unit: Unit) -> Self {
        let tick = match axis {
            DimensionAxis::Width | DimensionAxis::Depth => DVec3::Y * TICK_HALF_LENGTH,
            DimensionAxis::Height => DVec3::X * TICK_HALF_LENGTH,
        };
        let mid = (start + end) / 2.0 + DVec3::Y * LABEL_LIFT;

        Self {
            axis,
            start: start.to_array(),
            end: end.to_array(),
            ticks: [
                [(start - tick).to_array(), (start + tick).to_array()],
                [(end - tick).to_array(), (end + tick).to_array()],
            ],
            label: display_length(value_mm, unit),
            label_position: mid.to_array(),
            color: DIMENSION_COLOR,
            value_mm,
        }
    }

    pub fn length(&self) -> f64 {
        DVec3::from_array(self.end).distance(DVec3::from_array(self.start))
    }
}

/// Width, height and (unless the part is flat) depth lines for `part`.
pub fn annotate(part: &Part, unit: Unit) -> Vec<DimensionLine> {
    let [hx, hy, hz] = part.half_extents();
    let [width, height, depth] = part.dimensions;

    let mut lines = vec![
        DimensionLine::new(
            DimensionAxis::Width,
            DVec3::new(-hx, -hy - DIMENSION_OFFSET, 0.0),
            DVec3::new(hx, -hy - DIMENSION_OFFSET, 0.0),
            width,
            unit,
        ),
        DimensionLine::new(
            DimensionAxis::Height,
            DVec3::new(hx + DIMENSION_OFFSET, -hy, 0.0),
            DVec3::new(hx + DIMENSION_OFFSET, hy, 0.0),
            height,
            unit,
        ),
    ];

    if !part.is_flat() {
        lines.push(DimensionLine::new(
            DimensionAxis::Depth,
            DVec3::new(hx, -hy, -hz - DIMENSION_OFFSET),
            DVec3::new(hx, -hy, hz + DIMENSION_OFFSET),
            depth,
            unit,
        ));
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use shared::PartOperation;

    #[test]
    fn test_flat_cube_has_two_lines() {
        let part = fixtures::cube("p", PartOperation::Base, [54.0, 20.0, 0.0], [0.0; 3]);
        let lines = annotate(&part, Unit::Mm);
        assert_eq!(lines.len(), 2);

        let width = &lines[0];
        assert_eq!(width.axis, DimensionAxis::Width);
        assert_eq!(width.start, [-27.0, -13.0, 0.0]);
        assert_eq!(width.end, [27.0, -13.0, 0.0]);
        assert_eq!(width.label, "54.0mm");

        let height = &lines[1];
        assert_eq!(height.axis, DimensionAxis::Height);
        assert_eq!(height.start, [30.0, -10.0, 0.0]);
        assert_eq!(height.end, [30.0, 10.0, 0.0]);
        assert_eq!(height.label, "20.0mm");
    }

    #[test]
    fn test_depth_line_spans_past_the_box() {
        let part = fixtures::cube("p", PartOperation::Add, [10.0, 4.0, 6.0], [0.0; 3]);
        let lines = annotate(&part, Unit::Cm);
        assert_eq!(lines.len(), 3);

        let depth = &lines[2];
        assert_eq!(depth.axis, DimensionAxis::Depth);
        assert_eq!(depth.start, [5.0, -2.0, -6.0]);
        assert_eq!(depth.end, [5.0, -2.0, 6.0]);
        assert_eq!(depth.label, "0.6cm");
        assert!((depth.length() - 12.0).abs() < 1e-12);
    }

    #[test]
    fn test_label_sits_above_midpoint() {
        let part = fixtures::cube("p", PartOperation::Base, [54.0, 20.0, 0.0], [0.0; 3]);
        let lines = annotate(&part, Unit::Mm);
        assert_eq!(lines[0].label_position, [0.0, -11.0, 0.0]);
        assert_eq!(lines[1].label_position, [30.0, 2.0, 0.0]);
    }

    #[test]
    fn test_ticks_are_perpendicular() {
        let part = fixtures::cube("p", PartOperation::Base, [10.0, 10.0, 10.0], [0.0; 3]);
        let lines = annotate(&part, Unit::Mm);

        for line in &lines {
            let dir = DVec3::from_array(line.end) - DVec3::from_array(line.start);
            for [a, b] in line.ticks {
                let tick = DVec3::from_array(b) - DVec3::from_array(a);
                assert!((tick.length() - 2.0 * TICK_HALF_LENGTH).abs() < 1e-12);
                assert_eq!(dir.dot(tick), 0.0);
            }
        }
        // start tick straddles the start point
        assert_eq!(lines[0].ticks[0], [[-5.0, -8.5, 0.0], [-5.0, -7.5, 0.0]]);
    }

    #[test]
    fn test_labels_follow_unit() {
        let part = fixtures::cylinder("p", PartOperation::Subtract, 5.0, 22.0, [0.0; 3]);
        let labels: Vec<String> = annotate(&part, Unit::M).into_iter().map(|l| l.label).collect();
        assert_eq!(labels, vec!["0.0m", "0.0m"]);
        let labels: Vec<String> = annotate(&part, Unit::Cm).into_iter().map(|l| l.label).collect();
        assert_eq!(labels, vec!["0.5cm", "2.2cm"]);
    }
}
