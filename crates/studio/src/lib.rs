// Library crate: the CSG model pipeline behind the studio.
// Rendering, capture devices and the HTTP surface live outside; they reach this
// crate through the `Renderer`, `AiCollaborator` and `ModelStorage` traits.

pub mod ai;
pub mod config;
pub mod dimensions;
pub mod fixtures;
pub mod harness;
pub mod ingest;
pub mod layout;
pub mod narration;
pub mod report;
pub mod state;
pub mod text;

pub use ai::{AiCollaborator, AiError, TutorContext};
pub use config::StudioConfig;
pub use report::{ExportMode, Renderer, Report, ReportExporter};
pub use state::{GenerateError, ModelStore, ViewState};
