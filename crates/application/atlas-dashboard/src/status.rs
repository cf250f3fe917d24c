//! Read-only snapshot of the dashboard

use atlas_core::{FlatType, ViewMode};
use atlas_fetch::{DataError, LoadPhase};
use atlas_selection::{ChartView, GroupStat, YearRange};
use serde::Serialize;

use crate::map_view::ColorMode;

/// The single error slot as the user sees it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Banner {
    /// Nothing can be shown until a retry succeeds
    Blocking { message: String },
    /// Earlier data is still on screen
    Dismissible { message: String },
}

impl Banner {
    pub fn from_error(error: &DataError) -> Self {
        let message = error.to_string();
        if error.is_fatal() {
            Banner::Blocking { message }
        } else {
            Banner::Dismissible { message }
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Banner::Blocking { message } | Banner::Dismissible { message } => message,
        }
    }

    pub fn is_blocking(&self) -> bool {
        matches!(self, Banner::Blocking { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ChartSummary {
    Loading,
    Failed,
    Ready {
        group_key: &'static str,
        groups: Vec<String>,
        records: usize,
        top: Vec<GroupStat>,
        bottom: Vec<GroupStat>,
    },
}

impl From<&ChartView> for ChartSummary {
    fn from(view: &ChartView) -> Self {
        match view {
            ChartView::Loading => ChartSummary::Loading,
            ChartView::Failed => ChartSummary::Failed,
            ChartView::Ready(frame) => ChartSummary::Ready {
                group_key: frame.group_key(),
                groups: frame.group_names().into_iter().map(str::to_string).collect(),
                records: frame.records.len(),
                top: frame.ranking.top.clone(),
                bottom: frame.ranking.bottom.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStatus {
    pub phase: LoadPhase,
    pub loading: bool,
    pub banner: Option<Banner>,
    pub towns: Vec<String>,
    /// Text on the town dropdown button
    pub town_label: String,
    pub view_mode: ViewMode,
    pub flat_type: FlatType,
    pub year_range: YearRange,
    pub color_mode: ColorMode,
    pub chart: ChartSummary,
    pub chart_keys: Vec<String>,
    pub highlighted: Vec<String>,
    pub markers: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_fetch::{Endpoint, FetchError};

    #[test]
    fn test_banner_severity_follows_error() {
        let cause = FetchError::Status {
            endpoint: Endpoint::Properties,
            status: 500,
        };
        let blocking = Banner::from_error(&DataError::BaseLoadFailure(cause.clone()));
        assert!(blocking.is_blocking());
        assert!(blocking.message().contains("/api/properties"));

        let soft = Banner::from_error(&DataError::DynamicLoadFailure(cause));
        assert!(!soft.is_blocking());
    }
}
