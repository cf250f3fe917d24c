//! The orchestrator
//!
//! Every user event enters through a [`Dashboard`] method, which mutates
//! the selection first and then lets the data layer, the highlight
//! synchronizer and the two views catch up in that order.

use atlas_config::AtlasConfig;
use atlas_core::{FlatType, ViewMode, ALL_TOWNS};
use atlas_fetch::{Applied, DataCoordinator, DynamicRequest, LoadPhase, PriceSource};
use atlas_highlight::{
    ChartSelection, ChartSurface, EntityKind, HighlightChange, HighlightSynchronizer, MapSurface,
};
use atlas_join::{EnrichedProperty, JoinCache, JoinKey};
use atlas_selection::{
    derive_chart_view, dropdown_label, BaseState, ChartInputs, ChartView, SelectionChange, SelectionState,
    SelectionStore, YearRange,
};
use std::sync::Arc;
use tokio::sync::watch;

use crate::map_view::{ColorMode, MapView};
use crate::status::{Banner, ChartSummary, DashboardStatus};
use crate::Result;

pub struct Dashboard<M, C> {
    store: SelectionStore,
    coordinator: DataCoordinator,
    highlights: HighlightSynchronizer,
    chart_selection: ChartSelection,
    join: JoinCache,
    map_view: MapView,
    map: M,
    chart: C,
    /// Join inputs the marker source currently reflects
    rendered_join: Option<JoinKey>,
    /// Last view handed to the chart
    chart_view: Option<ChartView>,
}

impl<M: MapSurface, C: ChartSurface> Dashboard<M, C> {
    pub fn new(config: &AtlasConfig, source: Arc<dyn PriceSource>, map: M, chart: C) -> Result<Self> {
        Ok(Self {
            store: SelectionStore::from_config(&config.selection)?,
            coordinator: DataCoordinator::new(source, &config.fetch),
            highlights: HighlightSynchronizer::new(config.map.highlight_zoom),
            chart_selection: ChartSelection::new(),
            join: JoinCache::new(),
            map_view: MapView::new(config.map.clone()),
            map,
            chart,
            rendered_join: None,
            chart_view: None,
        })
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn chart(&self) -> &C {
        &self.chart
    }

    pub fn selection(&self) -> &SelectionState {
        self.store.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<SelectionState> {
        self.store.subscribe()
    }

    pub fn coordinator(&self) -> &DataCoordinator {
        &self.coordinator
    }

    pub fn highlights(&self) -> &HighlightSynchronizer {
        &self.highlights
    }

    pub fn chart_selection(&self) -> &ChartSelection {
        &self.chart_selection
    }

    /// Properties joined with prices for the selected flat type
    pub fn enriched(&self) -> Option<Arc<Vec<EnrichedProperty>>> {
        self.join.current()
    }

    pub fn join_computations(&self) -> u64 {
        self.join.computations()
    }

    /// Kick off the base load
    pub fn start(&mut self) -> bool {
        let started = self.coordinator.begin_base_load();
        self.refresh();
        started
    }

    /// Town dropdown entry clicked
    pub fn select_town(&mut self, name: &str) -> SelectionChange {
        let change = self.store.toggle_town(name);
        if change.is_empty() {
            return change;
        }

        if name == ALL_TOWNS {
            self.highlights.clear(&mut self.map);
            if self.chart_selection.clear() {
                self.chart.set_selected_keys(self.chart_selection.keys());
            }
        } else if self.store.state().has_town(name) {
            let snapshot = &self.coordinator.data().properties;
            self.highlights.ensure(&mut self.map, name, EntityKind::Town, snapshot);
        } else if let HighlightChange::Removed { names } =
            self.highlights.release_town(&mut self.map, name)
        {
            if self.chart_selection.remove(&names) {
                self.chart.set_selected_keys(self.chart_selection.keys());
            }
        }

        self.request_prices();
        let state = self.store.state();
        self.map_view.frame_towns(
            &mut self.map,
            state.towns(),
            &self.coordinator.data().boundaries,
            state.is_unfiltered(),
        );
        self.refresh();
        change
    }

    /// Chart dot clicked. In town mode this also drills into the town.
    pub fn click_chart_dot(&mut self, name: &str) -> HighlightChange {
        let mode = self.store.state().view_mode();

        self.chart_selection.toggle(name);
        self.chart.set_selected_keys(self.chart_selection.keys());

        let kind = match mode {
            ViewMode::Town => EntityKind::Town,
            ViewMode::Street => EntityKind::Street,
        };
        let snapshot = &self.coordinator.data().properties;
        let change = self.highlights.toggle(&mut self.map, name, kind, snapshot);

        if mode == ViewMode::Town && !self.store.set_single_town(name).is_empty() {
            self.request_prices();
        }
        self.refresh();
        change
    }

    /// Map marker on `street` in `town` clicked
    pub fn click_map_marker(&mut self, street: &str, town: &str) -> HighlightChange {
        if !self.store.ensure_town(town).is_empty() {
            self.request_prices();
        }

        let snapshot = &self.coordinator.data().properties;
        let change = self.highlights.toggle(&mut self.map, street, EntityKind::Street, snapshot);

        // the chart key follows the highlight
        let changed = match &change {
            HighlightChange::Added { .. } => self.chart_selection.insert(street),
            HighlightChange::Removed { names } => self.chart_selection.remove(names),
            HighlightChange::NoPoints { .. } | HighlightChange::Unchanged => false,
        };
        if changed {
            self.chart.set_selected_keys(self.chart_selection.keys());
        }

        self.refresh();
        change
    }

    pub fn set_flat_type(&mut self, flat_type: FlatType) -> SelectionChange {
        let change = self.store.set_flat_type(flat_type);
        if !change.is_empty() {
            self.refresh();
        }
        change
    }

    pub fn set_year_range(&mut self, start: i32, end: i32) -> Result<SelectionChange> {
        let change = self.store.set_year_range(YearRange::new(start, end)?);
        if !change.is_empty() {
            self.map_view.apply_years(&mut self.map, self.store.state().year_range());
        }
        Ok(change)
    }

    pub fn set_color_mode(&mut self, mode: ColorMode) -> bool {
        self.map_view.set_color_mode(&mut self.map, mode)
    }

    /// Re-attempt the failed load behind the banner
    pub fn retry(&mut self) -> bool {
        let issued = self.coordinator.retry();
        self.refresh();
        issued
    }

    pub fn dismiss_error(&mut self) -> bool {
        self.coordinator.dismiss_error()
    }

    /// Apply finished fetches without waiting
    pub fn pump(&mut self) -> Vec<Applied> {
        let applied = self.coordinator.pump();
        if !applied.is_empty() {
            self.refresh();
        }
        applied
    }

    /// Wait for every outstanding fetch, then redraw
    pub async fn settle(&mut self) -> Vec<Applied> {
        let applied = self.coordinator.settle().await;
        self.refresh();
        applied
    }

    pub fn status(&self) -> DashboardStatus {
        let state = self.store.state();
        DashboardStatus {
            phase: self.coordinator.base_phase(),
            loading: self.coordinator.is_loading(),
            banner: self.coordinator.error().map(Banner::from_error),
            towns: state.towns().to_vec(),
            town_label: dropdown_label(state),
            view_mode: state.view_mode(),
            flat_type: state.flat_type().clone(),
            year_range: state.year_range(),
            color_mode: self.map_view.color_mode(),
            chart: self
                .chart_view
                .as_ref()
                .map(ChartSummary::from)
                .unwrap_or(ChartSummary::Loading),
            chart_keys: self.chart_selection.keys().to_vec(),
            highlighted: self.highlights.names(),
            markers: self.join.current().map(|e| e.len()).unwrap_or(0),
        }
    }

    fn request_prices(&mut self) -> DynamicRequest {
        self.coordinator.request_towns(self.store.state().towns())
    }

    /// Bring the marker source and the chart in line with the selection
    /// and whatever data is resident
    fn refresh(&mut self) {
        let state = self.store.state();
        let data = self.coordinator.data();
        let base = match self.coordinator.base_phase() {
            LoadPhase::Ready => BaseState::Ready,
            LoadPhase::Failed => BaseState::Failed,
            LoadPhase::Idle | LoadPhase::Loading => BaseState::Pending,
        };

        if base == BaseState::Ready {
            let key = JoinKey {
                properties_revision: data.base_revision,
                address_prices_revision: data.base_revision,
                flat_type: state.flat_type().clone(),
            };
            if self.rendered_join.as_ref() != Some(&key) {
                let enriched = self
                    .join
                    .get_or_compute(key.clone(), &data.properties, &data.address_prices);
                self.map_view
                    .show_markers(&mut self.map, &enriched, state.year_range());
                self.rendered_join = Some(key);
            }
        }

        let view = derive_chart_view(
            state,
            ChartInputs {
                base,
                town_prices: &data.town_prices,
                street_prices: &data.street_prices,
                dynamic_loading: self.coordinator.is_dynamic_loading(),
            },
        );
        self.draw_chart(view);
    }

    fn draw_chart(&mut self, view: ChartView) {
        if self.chart_view.as_ref() == Some(&view) {
            return;
        }

        match &view {
            ChartView::Loading => self.chart.show_loading(),
            // the blocking banner stands in for the chart
            ChartView::Failed => {}
            ChartView::Ready(frame) => {
                self.chart.render(frame);
                if frame.mode == ViewMode::Town {
                    self.chart_selection.retain_matching(&frame.group_names());
                }
                self.chart.set_selected_keys(self.chart_selection.keys());
            }
        }
        self.chart_view = Some(view);
    }
}
