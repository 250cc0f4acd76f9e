//! Renderer error types.

use thiserror::Error;

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that can occur while exporting a plan.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Rasterisation or encoding failed.
    #[error("Export failed: {0}")]
    Export(String),

    /// Scale multiplier outside 1..=8.
    #[error("Export scale must be between 1 and 8, got {0}")]
    InvalidScale(u32),

    /// The region to export has no area, or nothing is selected.
    #[error("Nothing to export in the selected region")]
    EmptySelection,

    /// Another export is still running.
    #[error("An export is already in progress")]
    Busy,

    /// Unknown output format name.
    #[error("Unsupported export format: {0}")]
    UnknownFormat(String),

    /// Writing the SVG markup failed.
    #[error("SVG markup could not be written")]
    Markup(#[from] std::fmt::Error),
}
