//! Selection State Store

use atlas_config::SelectionConfig;
use atlas_core::{FlatType, ViewMode, ALL_TOWNS};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::{Result, SelectionError};

/// Inclusive completion-year range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct YearRange {
    start: i32,
    end: i32,
}

impl YearRange {
    pub fn new(start: i32, end: i32) -> Result<Self> {
        if start > end {
            return Err(SelectionError::InvalidYearRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> i32 {
        self.start
    }

    pub fn end(&self) -> i32 {
        self.end
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.start..=self.end).contains(&year)
    }
}

/// Snapshot of what the user has selected
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionState {
    towns: Vec<String>,
    flat_type: FlatType,
    year_range: YearRange,
}

impl SelectionState {
    pub fn new(flat_type: FlatType, year_range: YearRange) -> Self {
        Self {
            towns: Vec::new(),
            flat_type,
            year_range,
        }
    }

    /// Selected towns in selection order
    pub fn towns(&self) -> &[String] {
        &self.towns
    }

    pub fn flat_type(&self) -> &FlatType {
        &self.flat_type
    }

    pub fn year_range(&self) -> YearRange {
        self.year_range
    }

    /// Always derived from the town list
    pub fn view_mode(&self) -> ViewMode {
        ViewMode::for_towns(&self.towns)
    }

    /// No town filter in effect
    pub fn is_unfiltered(&self) -> bool {
        self.view_mode() == ViewMode::Town
    }

    pub fn has_town(&self, town: &str) -> bool {
        self.towns.iter().any(|t| t == town)
    }
}

/// Which parts of the selection a mutation touched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionChange {
    pub towns: bool,
    pub flat_type: bool,
    pub year_range: bool,
}

impl SelectionChange {
    pub fn is_empty(&self) -> bool {
        !(self.towns || self.flat_type || self.year_range)
    }

    fn towns() -> Self {
        Self {
            towns: true,
            ..Self::default()
        }
    }
}

/// Owner of the selection. Every change is published to subscribers.
pub struct SelectionStore {
    state: SelectionState,
    revision: u64,
    tx: watch::Sender<SelectionState>,
}

impl SelectionStore {
    pub fn new(initial: SelectionState) -> Self {
        let (tx, _rx) = watch::channel(initial.clone());
        Self {
            state: initial,
            revision: 0,
            tx,
        }
    }

    /// Configured flat type, years from `first_year` to this year
    pub fn from_config(config: &SelectionConfig) -> Result<Self> {
        let current_year = chrono::Local::now().year();
        let range = YearRange::new(config.first_year, current_year)?;
        Ok(Self::new(SelectionState::new(
            FlatType::from(config.flat_type.as_str()),
            range,
        )))
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    /// Incremented on every effective change
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn subscribe(&self) -> watch::Receiver<SelectionState> {
        self.tx.subscribe()
    }

    /// Multi-select toggle. The all-towns sentinel clears the list.
    pub fn toggle_town(&mut self, name: &str) -> SelectionChange {
        if name == ALL_TOWNS {
            return self.clear_towns();
        }
        if let Some(pos) = self.state.towns.iter().position(|t| t == name) {
            self.state.towns.remove(pos);
        } else {
            self.state.towns.push(name.to_string());
        }

        self.publish(SelectionChange::towns())
    }

    /// Replace the list with exactly `name`. The sentinel is never stored,
    /// so selecting it alone clears the list.
    pub fn set_single_town(&mut self, name: &str) -> SelectionChange {
        if name == ALL_TOWNS {
            return self.clear_towns();
        }
        if self.state.towns.len() == 1 && self.state.towns[0] == name {
            return SelectionChange::default();
        }
        self.state.towns = vec![name.to_string()];
        self.publish(SelectionChange::towns())
    }

    /// Add `name` unless already selected
    pub fn ensure_town(&mut self, name: &str) -> SelectionChange {
        if self.state.has_town(name) {
            return SelectionChange::default();
        }
        self.toggle_town(name)
    }

    pub fn set_flat_type(&mut self, flat_type: FlatType) -> SelectionChange {
        if self.state.flat_type == flat_type {
            return SelectionChange::default();
        }
        self.state.flat_type = flat_type;
        self.publish(SelectionChange {
            flat_type: true,
            ..SelectionChange::default()
        })
    }

    pub fn set_year_range(&mut self, range: YearRange) -> SelectionChange {
        if self.state.year_range == range {
            return SelectionChange::default();
        }
        self.state.year_range = range;
        self.publish(SelectionChange {
            year_range: true,
            ..SelectionChange::default()
        })
    }

    fn clear_towns(&mut self) -> SelectionChange {
        if self.state.towns.is_empty() {
            return SelectionChange::default();
        }
        self.state.towns.clear();
        self.publish(SelectionChange::towns())
    }

    fn publish(&mut self, change: SelectionChange) -> SelectionChange {
        self.revision += 1;
        tracing::debug!(
            revision = self.revision,
            towns = ?self.state.towns,
            flat_type = %self.state.flat_type,
            mode = %self.state.view_mode(),
            "selection changed"
        );
        self.tx.send_replace(self.state.clone());
        change
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SelectionStore {
        SelectionStore::new(SelectionState::new(
            FlatType::FourRoom,
            YearRange::new(1960, 2024).unwrap(),
        ))
    }

    #[test]
    fn test_year_range_ordering() {
        assert!(YearRange::new(2000, 1990).is_err());
        let range = YearRange::new(1990, 2000).unwrap();
        assert!(range.contains(1990));
        assert!(range.contains(2000));
        assert!(!range.contains(2001));
    }

    #[test]
    fn test_toggle_adds_and_removes() {
        let mut store = store();
        store.toggle_town("BEDOK");
        store.toggle_town("TAMPINES");
        assert_eq!(store.state().towns(), ["BEDOK", "TAMPINES"]);
        assert_eq!(store.state().view_mode(), ViewMode::Street);

        store.toggle_town("BEDOK");
        assert_eq!(store.state().towns(), ["TAMPINES"]);
    }

    #[test]
    fn test_toggle_twice_is_identity() {
        let mut store = store();
        store.toggle_town("BEDOK");
        let before = store.state().clone();

        for town in ["TAMPINES", "BEDOK", "YISHUN"] {
            let mut probe = SelectionStore::new(before.clone());
            probe.toggle_town(town);
            probe.toggle_town(town);
            assert_eq!(probe.state(), &before, "toggling {} twice", town);
            assert_eq!(probe.state().view_mode(), before.view_mode());
        }
    }

    #[test]
    fn test_all_towns_sentinel_clears() {
        let mut store = store();
        store.toggle_town("BEDOK");
        store.toggle_town("TAMPINES");

        assert!(store.toggle_town(ALL_TOWNS).towns);
        assert!(store.state().towns().is_empty());
        assert_eq!(store.state().view_mode(), ViewMode::Town);
        assert!(store.toggle_town(ALL_TOWNS).is_empty());
    }

    #[test]
    fn test_set_single_town_replaces() {
        let mut store = store();
        store.toggle_town("BEDOK");
        store.toggle_town("TAMPINES");
        store.set_single_town("YISHUN");
        assert_eq!(store.state().towns(), ["YISHUN"]);
        assert!(store.set_single_town("YISHUN").is_empty());
    }

    #[test]
    fn test_sentinel_is_never_stored() {
        let mut store = store();
        store.toggle_town("BEDOK");
        assert!(store.set_single_town(ALL_TOWNS).towns);
        assert!(store.state().towns().is_empty());
        assert!(store.state().is_unfiltered());
        assert!(store.set_single_town(ALL_TOWNS).is_empty());

        store.toggle_town("BEDOK");
        assert_eq!(store.state().towns(), ["BEDOK"]);
        assert_eq!(store.state().view_mode(), ViewMode::Street);
    }

    #[test]
    fn test_toggle_twice_from_sentinel_is_identity() {
        let mut store = store();
        store.set_single_town(ALL_TOWNS);
        let before = store.state().clone();

        store.toggle_town("BEDOK");
        store.toggle_town("BEDOK");
        assert_eq!(store.state(), &before);
        assert_eq!(store.state().view_mode(), ViewMode::Town);
    }

    #[test]
    fn test_ensure_town_is_idempotent() {
        let mut store = store();
        assert!(store.ensure_town("BEDOK").towns);
        assert!(store.ensure_town("BEDOK").is_empty());
        assert_eq!(store.revision(), 1);
    }

    #[test]
    fn test_no_op_setters_do_not_publish() {
        let mut store = store();
        assert!(store.set_flat_type(FlatType::FourRoom).is_empty());
        assert!(store.set_year_range(YearRange::new(1960, 2024).unwrap()).is_empty());
        assert_eq!(store.revision(), 0);

        assert!(store.set_flat_type(FlatType::Executive).flat_type);
        assert!(store.set_year_range(YearRange::new(1980, 1990).unwrap()).year_range);
        assert_eq!(store.revision(), 2);
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let mut store = store();
        let mut rx = store.subscribe();

        store.toggle_town("BEDOK");
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().towns(), ["BEDOK"]);
        assert_eq!(rx.borrow().view_mode(), ViewMode::Street);
    }

    #[test]
    fn test_from_config() {
        let store = SelectionStore::from_config(&SelectionConfig::default()).unwrap();
        assert_eq!(store.state().flat_type(), &FlatType::FourRoom);
        assert_eq!(store.state().year_range().start(), 1960);
    }
}
