//! # Atlas Dashboard
//!
//! Top-level orchestrator of the resale atlas.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                              DASHBOARD                               │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │                                                                      │
//! │   user event ──> SelectionStore ──┬──> DataCoordinator (fetch/cancel)│
//! │                                   │                                  │
//! │                                   ├──> HighlightSynchronizer ──> map │
//! │                                   │                                  │
//! │   resident data ──> JoinCache ────┴──> markers ──────────────> map   │
//! │                 └─> derive_chart_view ───────────────────────> chart │
//! │                                                                      │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The dashboard is the only owner of the selection and of both surface
//! handles. Fetch results are applied on its side, through [`Dashboard::pump`]
//! or [`Dashboard::settle`].

pub mod dashboard;
pub mod map_view;
pub mod status;

pub use dashboard::Dashboard;
pub use map_view::{marker_features, ColorMode, MapView, MARKER_LAYER, MARKER_SOURCE};
pub use status::{Banner, ChartSummary, DashboardStatus};

pub type Result<T> = std::result::Result<T, DashboardError>;

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("Selection error: {0}")]
    Selection(#[from] atlas_selection::SelectionError),
}
