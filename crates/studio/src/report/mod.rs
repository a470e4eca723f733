//! PDF report export.
//!
//! An export walks a small state machine: for every view the mode asks for,
//! force that view (wireframe on), hand the composed scene to the renderer,
//! wait for it to settle and capture a frame; then append the numbered
//! construction steps. The prior view is restored whichever way the export
//! ends, and nothing is returned unless every step succeeded.

pub mod document;
pub mod renderer;

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use shared::{Model, Part, Unit, ViewMode};
use thiserror::Error;

use crate::config::StudioConfig;
use crate::layout;
use crate::narration::construction_steps;
use crate::state::{ModelStore, ViewOverride};
use crate::text;
pub use document::{PageFormat, PageKind, RasterImage, ReportDocument};
pub use renderer::{Frame, RenderError, Renderer, DEFAULT_SETTLE_DELAY};

pub const DEFAULT_MARGIN_MM: f64 = 10.0;

const TITLE_FONT_PT: f64 = 16.0;
const TITLE_COLOR: [u8; 3] = [40, 40, 40];
const BODY_FONT_PT: f64 = 10.0;
const BODY_COLOR: [u8; 3] = [60, 60, 60];
const HEADER_FONT_PT: f64 = 14.0;
const LINE_HEIGHT_MM: f64 = 5.0;
const ENTRY_GAP_MM: f64 = 2.0;
/// Vertical room kept free for the title band when an image is height-limited
const HEADER_BAND_MM: f64 = 40.0;
const MM_PER_PT: f64 = 25.4 / 72.0;

pub const INSTRUCTIONS_HEADER: &str = "Construction Instructions & Parts List";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportMode {
    /// Assembled view only
    Whole,
    /// Exploded view and instructions
    Split,
    /// Assembled view, exploded view and instructions
    Combined,
}

impl ExportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportMode::Whole => "whole",
            ExportMode::Split => "split",
            ExportMode::Combined => "combined",
        }
    }
}

impl FromStr for ExportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "whole" => Ok(ExportMode::Whole),
            "split" => Ok(ExportMode::Split),
            "combined" => Ok(ExportMode::Combined),
            other => Err(format!("unknown export mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportPhase {
    Idle,
    CapturingAssembled,
    CapturingSeparated,
    Done,
}

/// One view to capture
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureStep {
    pub phase: ExportPhase,
    pub view_mode: ViewMode,
    pub title: String,
}

/// What an export of a given mode produces, in order
#[derive(Debug, Clone, PartialEq)]
pub struct ExportPlan {
    pub captures: Vec<CaptureStep>,
    pub instructions: bool,
}

impl ExportPlan {
    pub fn new(mode: ExportMode, model_name: &str) -> Self {
        let name = if model_name.is_empty() {
            "Untitled"
        } else {
            model_name
        };
        let assembled = CaptureStep {
            phase: ExportPhase::CapturingAssembled,
            view_mode: ViewMode::Assembled,
            title: format!("Assembled View - {name}"),
        };
        let separated = CaptureStep {
            phase: ExportPhase::CapturingSeparated,
            view_mode: ViewMode::Separated,
            title: format!("Exploded View - {name}"),
        };

        match mode {
            ExportMode::Whole => Self {
                captures: vec![assembled],
                instructions: false,
            },
            ExportMode::Split => Self {
                captures: vec![separated],
                instructions: true,
            },
            ExportMode::Combined => Self {
                captures: vec![assembled, separated],
                instructions: true,
            },
        }
    }
}

/// `Graphite_Export_<name>.pdf`, path separators replaced
pub fn export_file_name(model_name: &str) -> String {
    let name = if model_name.is_empty() {
        "Model"
    } else {
        model_name
    };
    let safe: String = name
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    format!("Graphite_Export_{safe}.pdf")
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportOptions {
    pub format: PageFormat,
    pub margin_mm: f64,
    pub settle_delay: Duration,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: PageFormat::A4_LANDSCAPE,
            margin_mm: DEFAULT_MARGIN_MM,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

impl From<&StudioConfig> for ExportOptions {
    fn from(config: &StudioConfig) -> Self {
        Self {
            format: config.export.page,
            margin_mm: config.export.margin_mm,
            settle_delay: config.settle_delay(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("an export is already in progress")]
    Busy,

    #[error("no render surface to capture from")]
    NoSurface,

    #[error("no active model to export")]
    NoActiveModel,

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("captured frame could not be decoded: {0}")]
    Frame(#[from] image::ImageError),

    #[error("PDF assembly failed: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),
}

/// A finished export
#[derive(Debug, Clone)]
pub struct Report {
    pub file_name: String,
    pub pages: Vec<PageKind>,
    pub bytes: Vec<u8>,
}

impl Report {
    /// Write into `dir` under `file_name`
    pub fn save(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

/// Drives a renderer through the captures of one export
pub struct ReportExporter<'a, R: Renderer + ?Sized> {
    store: &'a ModelStore,
    renderer: &'a mut R,
    options: ExportOptions,
    phase: ExportPhase,
}

impl<'a, R: Renderer + ?Sized> ReportExporter<'a, R> {
    pub fn new(store: &'a ModelStore, renderer: &'a mut R) -> Self {
        Self::with_options(store, renderer, ExportOptions::default())
    }

    pub fn with_options(store: &'a ModelStore, renderer: &'a mut R, options: ExportOptions) -> Self {
        Self {
            store,
            renderer,
            options,
            phase: ExportPhase::Idle,
        }
    }

    pub fn phase(&self) -> ExportPhase {
        self.phase
    }

    /// Export the active model.
    ///
    /// Fails with `Busy` if another export holds the store's export slot.
    pub async fn export(&mut self, mode: ExportMode) -> Result<Report, ExportError> {
        let store = self.store;
        let _slot = store.export_slot().try_acquire().ok_or(ExportError::Busy)?;

        if !self.renderer.has_surface() {
            tracing::error!("Export failed: no render surface");
            return Err(ExportError::NoSurface);
        }
        let model = store.current_model().ok_or(ExportError::NoActiveModel)?;

        tracing::info!("Exporting '{}' as {}", model.name, mode.as_str());
        let result = self.run(&model, mode).await;
        match &result {
            Ok(report) => {
                self.phase = ExportPhase::Done;
                tracing::info!("Exported {} ({} pages)", report.file_name, report.pages.len());
            }
            Err(e) => {
                self.phase = ExportPhase::Idle;
                tracing::error!("Export failed: {e}");
            }
        }
        result
    }

    async fn run(&mut self, model: &Model, mode: ExportMode) -> Result<Report, ExportError> {
        let plan = ExportPlan::new(mode, &model.name);
        let view = ViewOverride::capture(self.store);
        let mut doc = ReportDocument::new(self.options.format);
        let mut unit = self.store.view().unit;

        for (i, step) in plan.captures.iter().enumerate() {
            if i > 0 {
                doc.add_page();
            }
            self.phase = step.phase;
            tracing::debug!("Capturing {:?}", step.phase);

            let state = view.apply(step.view_mode);
            unit = state.unit;
            let scene = layout::compose(&model.parts, &state);
            self.renderer.present(&scene)?;
            self.renderer.fit_to_content();
            self.renderer.settled(self.options.settle_delay).await;
            let frame = self.renderer.capture_frame()?;
            let raster = RasterImage::decode(&frame.encoded)?;
            self.place_frame(&mut doc, &step.title, raster);
        }

        if plan.instructions {
            self.write_instructions(&mut doc, &model.parts, unit);
        }
        drop(view);

        let bytes = doc.to_pdf(&model.name)?;
        Ok(Report {
            file_name: export_file_name(&model.name),
            pages: doc.page_kinds(),
            bytes,
        })
    }

    fn place_frame(&self, doc: &mut ReportDocument, title: &str, raster: RasterImage) {
        let format = doc.format();
        let margin = self.options.margin_mm;

        doc.mark(PageKind::Image);
        doc.text(
            &[title.to_string()],
            margin,
            margin + 5.0,
            TITLE_FONT_PT,
            TITLE_COLOR,
            LINE_HEIGHT_MM,
        );

        let (width, height) = fit_image(
            raster.width,
            raster.height,
            format.width_mm - 2.0 * margin,
            format.height_mm - HEADER_BAND_MM,
        );
        let x = (format.width_mm - width) / 2.0;
        doc.image(raster, x, margin + 10.0, width, height);
    }

    fn write_instructions(&self, doc: &mut ReportDocument, parts: &[Part], unit: Unit) {
        let format = doc.format();
        let margin = self.options.margin_mm;
        let max_width = format.width_mm - 2.0 * margin;
        let bottom = format.height_mm - margin;

        doc.add_page();
        doc.mark(PageKind::Instructions);
        doc.text(
            &[INSTRUCTIONS_HEADER.to_string()],
            margin,
            margin + 10.0,
            HEADER_FONT_PT,
            TITLE_COLOR,
            LINE_HEIGHT_MM,
        );

        let mut y = margin + 20.0;
        for step in construction_steps(parts, unit) {
            let lines = text::wrap(&step.numbered(), max_width, BODY_FONT_PT * MM_PER_PT);
            let block = lines.len() as f64 * LINE_HEIGHT_MM;
            if y + block > bottom {
                doc.add_page();
                doc.mark(PageKind::Instructions);
                y = margin + 10.0;
            }
            doc.text(&lines, margin, y, BODY_FONT_PT, BODY_COLOR, LINE_HEIGHT_MM);
            y += block + ENTRY_GAP_MM;
        }
    }
}

/// Scale `width x height` pixels to `max_width` mm, or to `max_height` mm if
/// that would overflow. Returns the placed size in mm.
pub fn fit_image(width: u32, height: u32, max_width: f64, max_height: f64) -> (f64, f64) {
    if width == 0 || height == 0 {
        return (max_width, 0.0);
    }
    let aspect = f64::from(height) / f64::from(width);
    let mut w = max_width;
    let mut h = w * aspect;
    if h > max_height {
        h = max_height;
        w = h / aspect;
    }
    (w, h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_whole() {
        let plan = ExportPlan::new(ExportMode::Whole, "Bracket");
        assert_eq!(plan.captures.len(), 1);
        assert_eq!(plan.captures[0].view_mode, ViewMode::Assembled);
        assert_eq!(plan.captures[0].title, "Assembled View - Bracket");
        assert!(!plan.instructions);
    }

    #[test]
    fn test_plan_split() {
        let plan = ExportPlan::new(ExportMode::Split, "Bracket");
        assert_eq!(plan.captures.len(), 1);
        assert_eq!(plan.captures[0].phase, ExportPhase::CapturingSeparated);
        assert!(plan.instructions);
    }

    #[test]
    fn test_plan_combined_order() {
        let plan = ExportPlan::new(ExportMode::Combined, "");
        let modes: Vec<_> = plan.captures.iter().map(|c| c.view_mode).collect();
        assert_eq!(modes, vec![ViewMode::Assembled, ViewMode::Separated]);
        assert_eq!(plan.captures[1].title, "Exploded View - Untitled");
    }

    #[test]
    fn test_whitespace_name_is_not_replaced() {
        let plan = ExportPlan::new(ExportMode::Whole, " ");
        assert_eq!(plan.captures[0].title, "Assembled View -  ");
        assert_eq!(export_file_name(" "), "Graphite_Export_ .pdf");
    }

    #[test]
    fn test_export_file_name() {
        assert_eq!(export_file_name("Bracket"), "Graphite_Export_Bracket.pdf");
        assert_eq!(export_file_name(""), "Graphite_Export_Model.pdf");
        assert_eq!(export_file_name("a/b"), "Graphite_Export_a_b.pdf");
    }

    #[test]
    fn test_fit_image_width_limited() {
        let (w, h) = fit_image(200, 100, 277.0, 170.0);
        assert_eq!(w, 277.0);
        assert_eq!(h, 138.5);
    }

    #[test]
    fn test_fit_image_height_limited() {
        let (w, h) = fit_image(100, 100, 277.0, 170.0);
        assert_eq!(h, 170.0);
        assert_eq!(w, 170.0);
    }

    #[test]
    fn test_options_from_config() {
        let mut config = StudioConfig::default();
        config.export.settle_delay_ms = 200;
        config.export.margin_mm = 15.0;
        let options = ExportOptions::from(&config);
        assert_eq!(options.settle_delay, Duration::from_millis(200));
        assert_eq!(options.margin_mm, 15.0);
        assert_eq!(options.format, PageFormat::A4_LANDSCAPE);
    }

    #[test]
    fn test_export_mode_parse() {
        assert_eq!("Combined".parse::<ExportMode>(), Ok(ExportMode::Combined));
        assert!("pdf".parse::<ExportMode>().is_err());
    }
}
