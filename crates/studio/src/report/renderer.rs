//! Renderer collaborator contract

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::layout::Scene;

/// How long to wait after a view change when the renderer has no readiness
/// signal of its own.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no render surface available")]
    NoSurface,

    #[error("renderer rejected the scene: {0}")]
    Present(String),

    #[error("frame capture failed: {0}")]
    Capture(String),
}

/// One captured frame, encoded (PNG or JPEG)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub encoded: Vec<u8>,
}

impl Frame {
    pub fn new(encoded: Vec<u8>) -> Self {
        Self { encoded }
    }
}

/// Something that draws scenes and hands back raster frames.
///
/// The exporter calls, in order: `present`, `fit_to_content`, `settled`,
/// `capture_frame`.
#[async_trait]
pub trait Renderer: Send {
    /// Whether there is a surface to capture from at all
    fn has_surface(&self) -> bool;

    /// Commit `scene` as the content of the next frames
    fn present(&mut self, scene: &Scene) -> Result<(), RenderError>;

    /// Refit camera bounds to the presented content
    fn fit_to_content(&mut self);

    /// Resolve once the presented scene is on screen.
    ///
    /// The default only waits `delay`: there is no acknowledgement from the
    /// render pipeline, so a slow frame can still be captured half-drawn.
    /// Renderers with a frame-ready signal should override this.
    async fn settled(&mut self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }

    fn capture_frame(&mut self) -> Result<Frame, RenderError>;
}
