//! # Atlas Highlight
//!
//! Cross-view highlighting between the map and the chart.
//!
//! ```text
//! ┌──────────────┐  toggle / ensure   ┌───────────────────────┐
//! │  dashboard   │ ─────────────────> │ HighlightSynchronizer │
//! └──────────────┘                    └───────────┬───────────┘
//!        │ set_selected_keys                      │ source + layer
//!        ▼                                        ▼
//! ┌──────────────┐                    ┌───────────────────────┐
//! │ ChartSurface │                    │      MapSurface       │
//! └──────────────┘                    └───────────────────────┘
//! ```
//!
//! The surfaces are command interfaces. [`recording`] provides headless
//! implementations used by the CLI and the tests.

pub mod chart;
pub mod recording;
pub mod surface;
pub mod synchronizer;

pub use chart::ChartSelection;
pub use recording::{CameraMove, ChartDisplay, MapCommand, RecordingChart, RecordingMap};
pub use surface::{ChartSurface, ColorSource, FilterExpr, FitOptions, LayerSpec, LayerStyle, MapSurface};
pub use synchronizer::{EntityKind, HighlightChange, HighlightSynchronizer, STREET_OUTLINE, TOWN_OUTLINE};
