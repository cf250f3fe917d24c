//! Derived-View Filter Pipeline
//!
//! Pure recomputation of what the chart should draw from the selection and
//! whatever aggregate data is resident right now.
//!
//! ```text
//!   base failed              ──> Failed
//!   base pending             ──> Loading
//!   town mode                ──> town prices  ∩ towns? ∩ flat type
//!   street mode, fetching    ──> Loading     (never a false "0 results")
//!   street mode, settled     ──> street prices ∩ flat type
//! ```

use atlas_core::{PriceRecord, ViewMode};
use serde::Serialize;

use crate::ranking::{rank_groups, Ranking};
use crate::state::SelectionState;

/// Base dataset availability as seen by the views
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseState {
    Pending,
    Ready,
    Failed,
}

/// Resident aggregate data, borrowed from the data layer
#[derive(Debug, Clone, Copy)]
pub struct ChartInputs<'a> {
    pub base: BaseState,
    pub town_prices: &'a [PriceRecord],
    pub street_prices: &'a [PriceRecord],
    /// A street-level fetch for the current selection is in flight
    pub dynamic_loading: bool,
}

/// One renderable chart dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartFrame {
    pub mode: ViewMode,
    pub records: Vec<PriceRecord>,
    pub ranking: Ranking,
}

impl ChartFrame {
    pub fn new(mode: ViewMode, records: Vec<PriceRecord>) -> Self {
        let ranking = rank_groups(&records, mode);
        Self {
            mode,
            records,
            ranking,
        }
    }

    /// Field the chart groups its series by
    pub fn group_key(&self) -> &'static str {
        match self.mode {
            ViewMode::Town => "town",
            ViewMode::Street => "street",
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct group names in first-seen order
    pub fn group_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for name in self.records.iter().filter_map(|r| r.group_key(self.mode)) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}

/// What the chart should show
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ChartView {
    /// Data for the current selection is still on its way
    Loading,
    /// The base load failed; there is nothing to draw
    Failed,
    /// Settled data, possibly empty
    Ready(ChartFrame),
}

impl ChartView {
    pub fn frame(&self) -> Option<&ChartFrame> {
        match self {
            ChartView::Ready(frame) => Some(frame),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, ChartView::Loading)
    }
}

/// Select the chart's records for `selection`
pub fn derive_chart_view(selection: &SelectionState, inputs: ChartInputs<'_>) -> ChartView {
    match inputs.base {
        BaseState::Failed => return ChartView::Failed,
        BaseState::Pending => return ChartView::Loading,
        BaseState::Ready => {}
    }

    let flat_type = selection.flat_type();
    let mode = selection.view_mode();
    let records: Vec<PriceRecord> = match mode {
        ViewMode::Town => inputs
            .town_prices
            .iter()
            .filter(|r| {
                selection.is_unfiltered()
                    || r.town.as_deref().is_some_and(|t| selection.has_town(t))
            })
            .filter(|r| &r.flat_type == flat_type)
            .cloned()
            .collect(),
        ViewMode::Street => {
            if inputs.dynamic_loading {
                return ChartView::Loading;
            }
            // already scoped to the selected towns when fetched
            inputs
                .street_prices
                .iter()
                .filter(|r| &r.flat_type == flat_type)
                .cloned()
                .collect()
        }
    };

    ChartView::Ready(ChartFrame::new(mode, records))
}
