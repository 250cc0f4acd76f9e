//! # Garden Core
//!
//! Interaction core for a garden plan canvas: coordinates, geometry,
//! elements, undo history and the tool-driven editor.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                garden-core                  │
//! ├─────────────────────────────────────────────┤
//! │  Editor          │  Scene                   │
//! │  - Tools         │  - Elements              │
//! │  - Gestures      │  - Settings / scale      │
//! │  - Shortcuts     │  - Selection             │
//! ├─────────────────────────────────────────────┤
//! │  History         │  Worker                  │
//! │  - Undo / redo   │  - Path simplification   │
//! │  - Debounce      │  - Viewport culling      │
//! ├─────────────────────────────────────────────┤
//! │  Coords / Geometry / Metrics │  Sync queue  │
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod config;
pub mod consts;
pub mod coords;
pub mod editor;
pub mod element;
pub mod error;
pub mod event;
pub mod geometry;
pub mod history;
pub mod metrics;
pub mod scene;
pub mod settings;
pub mod shortcuts;
pub mod sync;
pub mod timer;
pub mod tool;
pub mod worker;
pub mod zoom;

pub use catalog::{Catalog, CatalogEntry, MemoryCatalog};
pub use config::EditorConfig;
pub use coords::{Bounds, Position, Size};
pub use editor::{Action, Editor, Gesture};
pub use element::{Element, ElementId, ElementKind, TerrainShape};
pub use error::{CanvasError, CanvasResult};
pub use event::{InputEvent, KeyModifiers};
pub use geometry::ResizeHandle;
pub use history::{History, HistoryConfig};
pub use metrics::{CanvasMetrics, RealSize};
pub use scene::Scene;
pub use settings::CanvasSettings;
pub use shortcuts::{Command, ShortcutKey, ShortcutRegistry};
pub use sync::{
    diff_operations, FileRepository, MemoryRepository, Operation, SyncQueue, SyncRepository,
    SyncResult,
};
pub use timer::{Debouncer, Throttle};
pub use tool::{BrushMode, Tool};
pub use worker::{Worker, WorkerRequest, WorkerResponse};
pub use zoom::{ZoomLimits, ZoomState};

/// Garden core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
