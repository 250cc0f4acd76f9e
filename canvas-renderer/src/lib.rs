//! # Garden Renderer
//!
//! Export pipeline for garden plans.
//!
//! ## Pipeline
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌──────────────┐   ┌────────────┐
//! │  Scene   │──►│ SVG markup   │──►│ resvg raster │──►│ PNG / JPEG │
//! │ + region │   │ (grid, elts) │   │ (tiny-skia)  │   │  encoding  │
//! └──────────┘   └──────────────┘   └──────────────┘   └────────────┘
//! ```
//!
//! Only one export runs at a time; a second request gets
//! [`RenderError::Busy`] until the first finishes.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod guard;
pub mod options;
pub mod svg;

#[cfg(feature = "export")]
pub mod export;

pub use error::{RenderError, RenderResult};
pub use guard::{ExportGuard, ExportLock};
pub use options::{plot_bounds, selection_bounds, ExportFormat, ExportOptions};
pub use svg::render_svg;

#[cfg(feature = "export")]
pub use export::SceneExporter;
