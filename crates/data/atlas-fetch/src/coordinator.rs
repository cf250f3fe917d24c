//! Data Fetch Coordinator
//!
//! Single owner of the resident datasets. Fetches run as spawned tasks and
//! report back over an mpsc channel; the owner applies their results with
//! [`DataCoordinator::pump`] or [`DataCoordinator::settle`], so every
//! mutation of resident data happens on the owner's side.

use atlas_config::FetchConfig;
use atlas_core::{FeatureCollection, PriceRecord, PropertyRecord};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::query::{PriceQuery, PriceWindow, TownScope};
use crate::source::{load_base, BaseData, PriceSource};
use crate::{DataError, FetchResult};

/// Token of the most recent dynamic request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct FetchEpoch(u64);

impl FetchEpoch {
    pub fn value(&self) -> u64 {
        self.0
    }

    fn next(self) -> Self {
        FetchEpoch(self.0 + 1)
    }
}

/// Completion report from a fetch task
#[derive(Debug)]
pub enum FetchEvent {
    BaseLoaded(FetchResult<BaseData>),
    PricesLoaded {
        epoch: FetchEpoch,
        towns: Vec<String>,
        result: FetchResult<Vec<PriceRecord>>,
    },
}

/// Lifecycle of the base load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadPhase {
    Idle,
    Loading,
    Ready,
    Failed,
}

/// What [`DataCoordinator::request_towns`] decided
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DynamicRequest {
    /// Same town list as the previous request; nothing issued
    Unchanged,
    /// Empty selection; street prices cleared without a request
    Cleared,
    /// A debounced request was spawned
    Scheduled { epoch: FetchEpoch },
}

/// Effect of applying one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Base,
    BaseFailed,
    Prices,
    PricesFailed,
    /// Superseded response, discarded
    Stale,
}

/// Everything fetched so far
#[derive(Debug, Default)]
pub struct ResidentData {
    pub properties: Vec<Arc<PropertyRecord>>,
    /// Aggregated per town
    pub town_prices: Vec<PriceRecord>,
    pub boundaries: FeatureCollection,
    /// Per block address, joined onto properties
    pub address_prices: Vec<PriceRecord>,
    /// Aggregated per street, scoped to the last applied town selection
    pub street_prices: Vec<PriceRecord>,
    /// Bumped whenever the base datasets are replaced
    pub base_revision: u64,
    /// Bumped whenever `street_prices` is replaced
    pub street_revision: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CoordinatorStats {
    pub base_loads: u64,
    pub requests_scheduled: u64,
    pub requests_skipped: u64,
    pub selections_cleared: u64,
    pub requests_cancelled: u64,
    pub stale_dropped: u64,
    pub responses_applied: u64,
}

pub struct DataCoordinator {
    source: Arc<dyn PriceSource>,
    debounce: Duration,
    window_years: u32,

    data: ResidentData,
    base_phase: LoadPhase,

    epoch: FetchEpoch,
    /// Town list of the latest dynamic request, `None` forces a re-issue
    last_requested: Option<Vec<String>>,
    inflight: Option<JoinHandle<()>>,
    dynamic_loading: bool,

    error: Option<DataError>,
    stats: CoordinatorStats,

    events_tx: mpsc::UnboundedSender<FetchEvent>,
    events_rx: mpsc::UnboundedReceiver<FetchEvent>,
}

impl DataCoordinator {
    pub fn new(source: Arc<dyn PriceSource>, config: &FetchConfig) -> Self {
        Self::with_settings(source, config.debounce(), config.price_window_years)
    }

    pub fn with_settings(source: Arc<dyn PriceSource>, debounce: Duration, window_years: u32) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            source,
            debounce,
            window_years,
            data: ResidentData::default(),
            base_phase: LoadPhase::Idle,
            epoch: FetchEpoch::default(),
            // the initial selection is empty and needs no request
            last_requested: Some(Vec::new()),
            inflight: None,
            dynamic_loading: false,
            error: None,
            stats: CoordinatorStats::default(),
            events_tx,
            events_rx,
        }
    }

    pub fn data(&self) -> &ResidentData {
        &self.data
    }

    pub fn base_phase(&self) -> LoadPhase {
        self.base_phase
    }

    pub fn epoch(&self) -> FetchEpoch {
        self.epoch
    }

    /// Base load or a dynamic fetch in flight
    pub fn is_loading(&self) -> bool {
        self.base_phase == LoadPhase::Loading || self.dynamic_loading
    }

    pub fn is_base_loading(&self) -> bool {
        self.base_phase == LoadPhase::Loading
    }

    pub fn is_dynamic_loading(&self) -> bool {
        self.dynamic_loading
    }

    pub fn error(&self) -> Option<&DataError> {
        self.error.as_ref()
    }

    /// Clear a dismissible error. Base failures stay until a retry.
    pub fn dismiss_error(&mut self) -> bool {
        match &self.error {
            Some(err) if !err.is_fatal() => {
                self.error = None;
                true
            }
            _ => false,
        }
    }

    pub fn stats(&self) -> &CoordinatorStats {
        &self.stats
    }

    /// Start the one-time base load. Returns false when it is already
    /// running or done.
    pub fn begin_base_load(&mut self) -> bool {
        if matches!(self.base_phase, LoadPhase::Loading | LoadPhase::Ready) {
            return false;
        }

        tracing::info!("loading base datasets");
        self.base_phase = LoadPhase::Loading;
        self.stats.base_loads += 1;

        let source = Arc::clone(&self.source);
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = load_base(source.as_ref()).await;
            let _ = tx.send(FetchEvent::BaseLoaded(result));
        });
        true
    }

    /// React to a town selection.
    ///
    /// Skips identical selections, clears on an empty one, otherwise
    /// supersedes whatever request is in flight with a debounced new one.
    pub fn request_towns(&mut self, towns: &[String]) -> DynamicRequest {
        if self.last_requested.as_deref() == Some(towns) {
            self.stats.requests_skipped += 1;
            tracing::debug!(?towns, "selection unchanged, no request");
            return DynamicRequest::Unchanged;
        }

        self.last_requested = Some(towns.to_vec());
        self.epoch = self.epoch.next();
        self.cancel_inflight();

        if towns.is_empty() {
            self.stats.selections_cleared += 1;
            self.dynamic_loading = false;
            self.data.street_prices.clear();
            self.data.street_revision += 1;
            tracing::debug!(epoch = self.epoch.value(), "selection empty, street prices cleared");
            return DynamicRequest::Cleared;
        }

        let epoch = self.epoch;
        let query = PriceQuery::new(
            TownScope::from_selection(towns),
            PriceWindow::current(self.window_years),
        );
        let towns = towns.to_vec();
        let source = Arc::clone(&self.source);
        let tx = self.events_tx.clone();
        let debounce = self.debounce;

        tracing::debug!(epoch = epoch.value(), ?towns, "price request scheduled");
        self.stats.requests_scheduled += 1;
        self.dynamic_loading = true;
        self.inflight = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            let result = source.prices(&query).await;
            let _ = tx.send(FetchEvent::PricesLoaded {
                epoch,
                towns,
                result,
            });
        }));

        DynamicRequest::Scheduled { epoch }
    }

    /// Re-attempt whatever failed last. Returns true when a request was
    /// issued.
    pub fn retry(&mut self) -> bool {
        match self.error.take() {
            Some(DataError::BaseLoadFailure(_)) => {
                self.base_phase = LoadPhase::Idle;
                self.begin_base_load()
            }
            Some(DataError::DynamicLoadFailure(_)) => {
                let towns = self.last_requested.take().unwrap_or_default();
                matches!(self.request_towns(&towns), DynamicRequest::Scheduled { .. })
            }
            None => false,
        }
    }

    fn cancel_inflight(&mut self) {
        if let Some(handle) = self.inflight.take() {
            if !handle.is_finished() {
                handle.abort();
                self.stats.requests_cancelled += 1;
                tracing::debug!("in-flight price request cancelled");
            }
        }
    }

    /// Apply one completion report
    pub fn apply(&mut self, event: FetchEvent) -> Applied {
        match event {
            FetchEvent::BaseLoaded(Ok(base)) => {
                self.data.properties = base.properties.into_iter().map(Arc::new).collect();
                self.data.town_prices = base.town_prices;
                self.data.boundaries = base.boundaries;
                self.data.address_prices = base.address_prices;
                self.data.base_revision += 1;
                self.base_phase = LoadPhase::Ready;
                self.stats.responses_applied += 1;

                tracing::info!(
                    properties = self.data.properties.len(),
                    town_prices = self.data.town_prices.len(),
                    boundaries = self.data.boundaries.len(),
                    address_prices = self.data.address_prices.len(),
                    "base datasets ready"
                );
                Applied::Base
            }
            FetchEvent::BaseLoaded(Err(err)) => {
                tracing::warn!(error = %err, "base load failed");
                self.base_phase = LoadPhase::Failed;
                self.error = Some(DataError::BaseLoadFailure(err));
                Applied::BaseFailed
            }
            FetchEvent::PricesLoaded { epoch, towns, .. } if epoch != self.epoch => {
                self.stats.stale_dropped += 1;
                tracing::debug!(
                    stale = epoch.value(),
                    current = self.epoch.value(),
                    ?towns,
                    "stale price response dropped"
                );
                Applied::Stale
            }
            FetchEvent::PricesLoaded {
                towns,
                result: Ok(records),
                ..
            } => {
                self.inflight = None;
                self.dynamic_loading = false;
                self.data.street_prices = records;
                self.data.street_revision += 1;
                self.stats.responses_applied += 1;
                if matches!(self.error, Some(DataError::DynamicLoadFailure(_))) {
                    self.error = None;
                }

                tracing::debug!(?towns, rows = self.data.street_prices.len(), "street prices applied");
                Applied::Prices
            }
            FetchEvent::PricesLoaded {
                towns,
                result: Err(err),
                ..
            } => {
                self.inflight = None;
                self.dynamic_loading = false;
                tracing::warn!(?towns, error = %err, "price request failed");
                if !matches!(self.error, Some(DataError::BaseLoadFailure(_))) {
                    self.error = Some(DataError::DynamicLoadFailure(err));
                }
                Applied::PricesFailed
            }
        }
    }

    /// Apply every report that has already arrived, without waiting
    pub fn pump(&mut self) -> Vec<Applied> {
        let mut applied = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            applied.push(self.apply(event));
        }
        applied
    }

    /// Wait for the next report
    pub async fn next_event(&mut self) -> Option<FetchEvent> {
        self.events_rx.recv().await
    }

    /// Wait until nothing is loading, applying reports as they arrive
    pub async fn settle(&mut self) -> Vec<Applied> {
        let mut applied = self.pump();
        while self.is_loading() {
            match self.next_event().await {
                Some(event) => applied.push(self.apply(event)),
                None => break,
            }
        }
        applied
    }
}

impl Drop for DataCoordinator {
    fn drop(&mut self) {
        if let Some(handle) = self.inflight.take() {
            handle.abort();
        }
    }
}
