//! # Atlas Selection
//!
//! The user's selection and everything derived from it.
//!
//! - [`SelectionStore`]: town list, flat type and year range, mutated only
//!   through its toggle/set operations and published on a watch channel
//! - [`derive_chart_view`]: the slice of aggregated prices the chart draws,
//!   or a loading state while that slice is still being fetched
//! - [`controls`]: dropdown, counter and timeline values for the side panel
//!
//! The view mode is never stored. It is computed from the town list every
//! time it is read.

pub mod controls;
pub mod pipeline;
pub mod ranking;
pub mod state;

pub use controls::{
    completion_timeline, dropdown_label, flat_type_options, property_count, town_options,
    TimelineSeries,
};
pub use pipeline::{derive_chart_view, BaseState, ChartFrame, ChartInputs, ChartView};
pub use ranking::{rank_groups, GroupStat, Ranking};
pub use state::{SelectionChange, SelectionState, SelectionStore, YearRange};

pub type Result<T> = std::result::Result<T, SelectionError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SelectionError {
    #[error("invalid year range: {start} > {end}")]
    InvalidYearRange { start: i32, end: i32 },
}
