//! # Garden CLI
//!
//! Command-line host for the garden planner.
//!
//! Loads a plan saved as JSON, optionally replays a recorded list of input
//! events through the [`Editor`], and exports the result as an image.
//!
//! ## Usage
//!
//! ```bash
//! garden-cli --plan plot.json --out plot.png --scale 4
//! garden-cli --plan plot.json --events session.json --save-plan edited.json --out edited.jpg
//! garden-cli --plan plot.json --selection --out beds.png
//! garden-cli --plan plot.json --events session.json --sync-queue pending.json --out plot.svg
//! ```
//!
//! ## Architecture
//!
//! - `CliArgs` - Command-line arguments parsed with clap
//! - `CliConfig` - Resolved paths and export settings
//! - [`run`] - Load, replay, export

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context};
use clap::Parser;
use garden_core::{
    Bounds, Editor, EditorConfig, FileRepository, InputEvent, Scene, SyncQueue, SyncRepository,
};
use garden_renderer::{selection_bounds, ExportFormat, ExportOptions, SceneExporter};

/// Command-line arguments for garden-cli.
#[derive(Debug, Clone, Parser)]
#[command(name = "garden-cli")]
#[command(about = "Replay edits onto a garden plan and export it as an image")]
#[command(version)]
pub struct CliArgs {
    /// Plan to load (scene JSON)
    #[arg(long, env = "GARDEN_PLAN")]
    pub plan: PathBuf,

    /// Output file
    #[arg(long, short)]
    pub out: PathBuf,

    /// Pixel multiplier, 1 to 8
    #[arg(long, default_value = "2", env = "GARDEN_EXPORT_SCALE")]
    pub scale: u32,

    /// Output format (png, jpeg, svg). Defaults to the output file extension.
    #[arg(long)]
    pub format: Option<ExportFormat>,

    /// Canvas-space region to export as `x,y,width,height`
    #[arg(long, value_parser = parse_region, conflicts_with = "selection")]
    pub region: Option<Bounds>,

    /// Export only the bounds of the selected elements
    #[arg(long)]
    pub selection: bool,

    /// Editor configuration (JSON)
    #[arg(long, env = "GARDEN_EDITOR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Recorded input events to replay before exporting (JSON array)
    #[arg(long)]
    pub events: Option<PathBuf>,

    /// Write the plan back out after replaying events
    #[arg(long)]
    pub save_plan: Option<PathBuf>,

    /// Append the replayed edits to a sync queue file (JSON)
    #[arg(long, env = "GARDEN_SYNC_QUEUE")]
    pub sync_queue: Option<PathBuf>,

    /// JPEG quality 1-100
    #[arg(long, default_value = "90")]
    pub quality: u8,
}

/// Parse `x,y,width,height` into canvas-space bounds.
///
/// # Errors
///
/// Returns a message if there are not exactly four numbers or the area is empty.
pub fn parse_region(value: &str) -> Result<Bounds, String> {
    let parts = value
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid region '{value}': {e}"))?;

    let [x, y, width, height] = parts[..] else {
        return Err(format!(
            "invalid region '{value}': expected x,y,width,height"
        ));
    };
    if width <= 0.0 || height <= 0.0 {
        return Err(format!("invalid region '{value}': width and height must be positive"));
    }
    Ok(Bounds::new(x, y, width, height))
}

/// Where the exported area comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegionSource {
    /// The whole plot.
    Plot,
    /// An explicit canvas-space rectangle.
    Fixed(Bounds),
    /// The union of the selected elements after replay.
    Selection,
}

/// Resolved CLI configuration.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Plan to load.
    pub plan: PathBuf,
    /// Output file.
    pub out: PathBuf,
    /// Optional editor configuration file.
    pub editor_config: Option<PathBuf>,
    /// Optional event recording.
    pub events: Option<PathBuf>,
    /// Optional path for the edited plan.
    pub save_plan: Option<PathBuf>,
    /// Optional sync queue receiving the replayed edits.
    pub sync_queue: Option<PathBuf>,
    /// Export area.
    pub region: RegionSource,
    /// Pixel multiplier.
    pub scale: u32,
    /// Output format.
    pub format: ExportFormat,
    /// JPEG quality.
    pub jpeg_quality: u8,
}

impl From<CliArgs> for CliConfig {
    fn from(args: CliArgs) -> Self {
        let format = args
            .format
            .or_else(|| format_from_extension(&args.out))
            .unwrap_or_default();
        let region = match (args.selection, args.region) {
            (true, _) => RegionSource::Selection,
            (false, Some(bounds)) => RegionSource::Fixed(bounds),
            (false, None) => RegionSource::Plot,
        };
        Self {
            plan: args.plan,
            out: args.out,
            editor_config: args.config,
            events: args.events,
            save_plan: args.save_plan,
            sync_queue: args.sync_queue,
            region,
            scale: args.scale,
            format,
            jpeg_quality: args.quality,
        }
    }
}

fn format_from_extension(path: &Path) -> Option<ExportFormat> {
    path.extension()?.to_str()?.parse().ok()
}

/// What an export produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSummary {
    /// Number of elements in the exported plan.
    pub elements: usize,
    /// Number of replayed events.
    pub events: usize,
    /// Bytes written to the output file.
    pub bytes: usize,
    /// Operations waiting in the sync queue, when one is attached.
    pub pending_sync: Option<usize>,
}

/// Load the plan, replay events, export.
///
/// # Errors
///
/// Returns an error if any input file cannot be read or parsed, the export
/// options are invalid, nothing is selected for a selection export, or an
/// output file cannot be written.
pub fn run(config: &CliConfig) -> anyhow::Result<ExportSummary> {
    let scene = load_plan(&config.plan)?;
    let editor_config = match &config.editor_config {
        Some(path) => {
            let json = read(path)?;
            EditorConfig::from_json(&json)
                .with_context(|| format!("invalid editor config {}", path.display()))?
        }
        None => EditorConfig::default(),
    };

    let mut editor = Editor::new(scene, editor_config);
    if let Some(path) = &config.sync_queue {
        editor = editor.with_sync(FileRepository::new(path));
    }
    let events = match &config.events {
        Some(path) => load_events(path)?,
        None => Vec::new(),
    };
    replay(&mut editor, &events);

    if let Some(path) = &config.save_plan {
        let json = editor.scene().to_json()?;
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), "Saved edited plan");
    }

    let region = match config.region {
        RegionSource::Plot => None,
        RegionSource::Fixed(bounds) => Some(bounds),
        RegionSource::Selection => Some(selection_bounds(editor.scene())?),
    };
    let options = ExportOptions {
        scale: config.scale,
        format: config.format,
        region,
        jpeg_quality: config.jpeg_quality,
        ..ExportOptions::default()
    };

    let bytes = SceneExporter::new().export(editor.scene(), &options)?;
    fs::write(&config.out, &bytes)
        .with_context(|| format!("failed to write {}", config.out.display()))?;
    tracing::info!(
        path = %config.out.display(),
        bytes = bytes.len(),
        "Export complete"
    );

    let pending_sync = editor
        .sync_repository()
        .map(|repository| repository.load().map(|queue| SyncQueue::len(&queue)))
        .transpose()
        .context("failed to read sync queue")?;

    Ok(ExportSummary {
        elements: editor.scene().element_count(),
        events: events.len(),
        bytes: bytes.len(),
        pending_sync,
    })
}

/// Feed recorded events to the editor, one throttle interval apart, then
/// let the history settle.
pub fn replay(editor: &mut Editor, events: &[InputEvent]) {
    let step = editor.config().pointer_throttle();
    let mut now = Instant::now();
    for event in events {
        now += step;
        editor.process_event(event, now);
    }
    let settle = std::time::Duration::from_millis(editor.config().history.debounce_ms);
    editor.tick(now + settle);
    tracing::debug!(events = events.len(), "Replayed events");
}

fn load_plan(path: &Path) -> anyhow::Result<Scene> {
    let json = read(path)?;
    let scene =
        Scene::from_json(&json).with_context(|| format!("invalid plan {}", path.display()))?;
    let ppm = scene.settings().pixels_per_meter();
    if !ppm.is_finite() || ppm <= 0.0 {
        bail!("plan {} has no usable canvas size", path.display());
    }
    Ok(scene)
}

fn load_events(path: &Path) -> anyhow::Result<Vec<InputEvent>> {
    let json = read(path)?;
    serde_json::from_str(&json).with_context(|| format!("invalid event list {}", path.display()))
}

fn read(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> CliArgs {
        let mut argv = vec!["garden-cli", "--plan", "plot.json", "--out", "plot.png"];
        argv.extend_from_slice(extra);
        CliArgs::try_parse_from(argv).expect("parse args")
    }

    #[test]
    fn test_parse_region() {
        assert_eq!(
            parse_region("10, 20,30,40").expect("region"),
            Bounds::new(10.0, 20.0, 30.0, 40.0)
        );
        assert!(parse_region("10,20,30").is_err());
        assert!(parse_region("a,b,c,d").is_err());
        assert!(parse_region("0,0,0,10").is_err());
    }

    #[test]
    fn test_defaults() {
        let config = CliConfig::from(args(&[]));
        assert_eq!(config.scale, 2);
        assert_eq!(config.format, ExportFormat::Png);
        assert_eq!(config.region, RegionSource::Plot);
        assert_eq!(config.jpeg_quality, 90);
        assert!(config.events.is_none());
    }

    #[test]
    fn test_format_follows_extension() {
        let parsed =
            CliArgs::try_parse_from(["garden-cli", "--plan", "p.json", "--out", "p.JPG"])
                .expect("parse args");
        assert_eq!(CliConfig::from(parsed).format, ExportFormat::Jpeg);

        let explicit = CliConfig::from(args(&["--format", "svg"]));
        assert_eq!(explicit.format, ExportFormat::Svg);
    }

    #[test]
    fn test_unknown_format_rejected() {
        let argv = ["garden-cli", "--plan", "p.json", "--out", "p", "--format", "gif"];
        assert!(CliArgs::try_parse_from(argv).is_err());
    }

    #[test]
    fn test_region_sources() {
        let fixed = CliConfig::from(args(&["--region", "0,0,100,50"]));
        assert_eq!(
            fixed.region,
            RegionSource::Fixed(Bounds::new(0.0, 0.0, 100.0, 50.0))
        );

        let selection = CliConfig::from(args(&["--selection"]));
        assert_eq!(selection.region, RegionSource::Selection);

        let argv = [
            "garden-cli", "--plan", "p.json", "--out", "p.png", "--selection", "--region",
            "0,0,1,1",
        ];
        assert!(CliArgs::try_parse_from(argv).is_err());
    }
}
