//! Highlight Synchronizer
//!
//! Keeps the set of highlighted towns and streets in lock-step with the
//! outline layers on the map.
//!
//! ```text
//!              toggle(name)                     toggle(name)
//!   ┌───────────────┐ ──── points > 0 ────> ┌─────────────┐
//!   │ unhighlighted │                       │ highlighted │──┐
//!   └───────────────┘ <──── remove ──────── └─────────────┘  │ town removed:
//!          ▲                                                 │ cascade to its
//!          └─────────────────────────────────────────────────┘ streets
//! ```
//!
//! A name is tracked exactly when its source and layer exist on the map.
//! Every create and remove is guarded by an existence check, so repeated
//! or re-entrant calls are harmless.

use atlas_core::{Feature, FeatureCollection, Geometry, LngLat, PropertyRecord};
use serde::Serialize;
use serde_json::{json, Map};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::surface::{LayerSpec, LayerStyle, MapSurface};

/// Ring colour of a town highlight
pub const TOWN_OUTLINE: &str = "white";
/// Ring colour of a street highlight
pub const STREET_OUTLINE: &str = "black";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Town,
    Street,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Town => f.write_str("town"),
            EntityKind::Street => f.write_str("street"),
        }
    }
}

/// Outcome of a highlight operation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum HighlightChange {
    Added { name: String, points: usize },
    /// Names removed, the requested one first, cascaded streets after it
    Removed { names: Vec<String> },
    /// Nothing in the snapshot belongs to the name; nothing drawn
    NoPoints { name: String },
    Unchanged,
}

#[derive(Debug, Clone)]
struct Entry {
    kind: EntityKind,
    /// Towns the highlighted points lie in
    towns: BTreeSet<String>,
}

/// Owner of the highlight set
#[derive(Debug)]
pub struct HighlightSynchronizer {
    entries: BTreeMap<String, Entry>,
    zoom: f64,
}

pub fn source_id(name: &str) -> String {
    format!("highlight-source/{}", name)
}

pub fn layer_id(name: &str) -> String {
    format!("highlight-layer/{}", name)
}

impl HighlightSynchronizer {
    /// `zoom` is used when recentring on a newly highlighted town
    pub fn new(zoom: f64) -> Self {
        Self {
            entries: BTreeMap::new(),
            zoom,
        }
    }

    pub fn is_highlighted(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn kind_of(&self, name: &str) -> Option<EntityKind> {
        self.entries.get(name).map(|e| e.kind)
    }

    /// Highlighted names, sorted
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flip the highlight of `name`
    pub fn toggle(
        &mut self,
        map: &mut dyn MapSurface,
        name: &str,
        kind: EntityKind,
        snapshot: &[Arc<PropertyRecord>],
    ) -> HighlightChange {
        if self.entries.contains_key(name) {
            self.remove(map, name)
        } else {
            self.add(map, name, kind, snapshot)
        }
    }

    /// Highlight `name` unless it already is
    pub fn ensure(
        &mut self,
        map: &mut dyn MapSurface,
        name: &str,
        kind: EntityKind,
        snapshot: &[Arc<PropertyRecord>],
    ) -> HighlightChange {
        if self.entries.contains_key(name) {
            return HighlightChange::Unchanged;
        }
        self.add(map, name, kind, snapshot)
    }

    /// Remove `name`, and for a town every street highlight inside it
    pub fn remove(&mut self, map: &mut dyn MapSurface, name: &str) -> HighlightChange {
        let Some(entry) = self.entries.remove(name) else {
            return HighlightChange::Unchanged;
        };
        detach(map, name);
        let mut names = vec![name.to_string()];
        if entry.kind == EntityKind::Town {
            self.cascade(map, name, &mut names);
        }

        tracing::debug!(removed = ?names, "highlight removed");
        HighlightChange::Removed { names }
    }

    /// A town left the selection: drop its highlight, if any, and every
    /// street highlight inside it
    pub fn release_town(&mut self, map: &mut dyn MapSurface, town: &str) -> HighlightChange {
        if self.kind_of(town) == Some(EntityKind::Town) {
            return self.remove(map, town);
        }
        let mut names = Vec::new();
        self.cascade(map, town, &mut names);
        if names.is_empty() {
            return HighlightChange::Unchanged;
        }
        tracing::debug!(removed = ?names, %town, "street highlights released");
        HighlightChange::Removed { names }
    }

    fn cascade(&mut self, map: &mut dyn MapSurface, town: &str, removed: &mut Vec<String>) {
        let orphans: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, e)| {
                e.kind == EntityKind::Street && e.towns.iter().any(|t| t.eq_ignore_ascii_case(town))
            })
            .map(|(street, _)| street.clone())
            .collect();

        for street in orphans {
            self.entries.remove(&street);
            detach(map, &street);
            removed.push(street);
        }
    }

    /// Drop every highlight
    pub fn clear(&mut self, map: &mut dyn MapSurface) -> Vec<String> {
        let names = self.names();
        for name in &names {
            detach(map, name);
        }
        self.entries.clear();
        if !names.is_empty() {
            tracing::debug!(removed = ?names, "all highlights cleared");
        }
        names
    }

    /// Every tracked name has its pair on the map
    pub fn is_consistent_with(&self, map: &dyn MapSurface) -> bool {
        self.entries
            .keys()
            .all(|name| map.has_source(&source_id(name)) && map.has_layer(&layer_id(name)))
    }

    fn add(
        &mut self,
        map: &mut dyn MapSurface,
        name: &str,
        kind: EntityKind,
        snapshot: &[Arc<PropertyRecord>],
    ) -> HighlightChange {
        let points: Vec<&Arc<PropertyRecord>> = snapshot
            .iter()
            .filter(|p| match kind {
                EntityKind::Town => p.in_town(name),
                EntityKind::Street => p.on_street(name),
            })
            .collect();

        if points.is_empty() {
            tracing::debug!(%name, %kind, "nothing to highlight");
            return HighlightChange::NoPoints {
                name: name.to_string(),
            };
        }

        let source = source_id(name);
        let layer = layer_id(name);
        if !map.has_source(&source) {
            map.upsert_source(&source, outline_features(&points));
        }
        if !map.has_layer(&layer) {
            let color = match kind {
                EntityKind::Town => TOWN_OUTLINE,
                EntityKind::Street => STREET_OUTLINE,
            };
            map.add_layer(LayerSpec::new(
                layer,
                source,
                LayerStyle::Outline {
                    color: color.to_string(),
                },
            ));
        }

        if kind == EntityKind::Town {
            if let Some(center) = LngLat::centroid(points.iter().map(|p| p.position())) {
                map.fly_to(center, self.zoom);
            }
        }

        let towns = points.iter().filter_map(|p| p.town.clone()).collect();
        self.entries.insert(name.to_string(), Entry { kind, towns });

        tracing::debug!(%name, %kind, points = points.len(), "highlight added");
        HighlightChange::Added {
            name: name.to_string(),
            points: points.len(),
        }
    }
}

/// Remove a name's layer, then its source; absent pieces are skipped
fn detach(map: &mut dyn MapSurface, name: &str) {
    let layer = layer_id(name);
    if map.has_layer(&layer) {
        map.remove_layer(&layer);
    }
    let source = source_id(name);
    if map.has_source(&source) {
        map.remove_source(&source);
    }
}

fn outline_features(points: &[&Arc<PropertyRecord>]) -> FeatureCollection {
    FeatureCollection::new(
        points
            .iter()
            .map(|p| {
                let mut properties = Map::new();
                properties.insert("street".into(), json!(p.street));
                properties.insert("town".into(), json!(p.town));
                Feature::new(Geometry::point(p.position()), properties)
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{CameraMove, RecordingMap};
    use atlas_core::decode_properties;
    use serde_json::json;

    fn snapshot() -> Vec<Arc<PropertyRecord>> {
        decode_properties(
            vec![
                json!({"address": "1 Bedok North Ave", "street": "Block 1 Bedok North Ave", "town": "Bedok", "lat": 1.32, "lon": 103.92, "tag": "Residential"}),
                json!({"address": "2 Bedok North Ave", "street": "Bedok North Ave 2", "town": "Bedok", "lat": 1.34, "lon": 103.94, "tag": "Residential"}),
                json!({"address": "9 Tampines St 11", "street": "Tampines St 11", "town": "Tampines", "lat": 1.35, "lon": 103.95, "tag": "Residential"}),
            ],
            2024,
        )
        .unwrap()
        .into_iter()
        .map(Arc::new)
        .collect()
    }

    #[test]
    fn test_town_removal_cascades_to_its_streets() {
        let snap = snapshot();
        let mut map = RecordingMap::new();
        let mut sync = HighlightSynchronizer::new(15.0);

        sync.toggle(&mut map, "Bedok", EntityKind::Town, &snap);
        sync.toggle(&mut map, "Block 1 Bedok North Ave", EntityKind::Street, &snap);
        assert_eq!(sync.len(), 2);
        assert!(sync.is_consistent_with(&map));

        let change = sync.toggle(&mut map, "Bedok", EntityKind::Town, &snap);
        assert_eq!(
            change,
            HighlightChange::Removed {
                names: vec!["Bedok".into(), "Block 1 Bedok North Ave".into()]
            }
        );
        assert!(sync.is_empty());
        assert!(map.layer_ids().is_empty());
        assert!(map.source_ids().is_empty());
        assert_eq!(map.violations(), 0);
    }

    #[test]
    fn test_cascade_spares_other_towns() {
        let snap = snapshot();
        let mut map = RecordingMap::new();
        let mut sync = HighlightSynchronizer::new(15.0);

        sync.toggle(&mut map, "Bedok", EntityKind::Town, &snap);
        sync.toggle(&mut map, "Tampines St 11", EntityKind::Street, &snap);
        sync.toggle(&mut map, "Bedok", EntityKind::Town, &snap);

        assert_eq!(sync.names(), vec!["Tampines St 11"]);
        assert!(sync.is_consistent_with(&map));
    }

    #[test]
    fn test_release_town_without_town_highlight() {
        let snap = snapshot();
        let mut map = RecordingMap::new();
        let mut sync = HighlightSynchronizer::new(15.0);

        sync.toggle(&mut map, "Block 1 Bedok North Ave", EntityKind::Street, &snap);
        sync.toggle(&mut map, "Tampines St 11", EntityKind::Street, &snap);

        assert_eq!(
            sync.release_town(&mut map, "BEDOK"),
            HighlightChange::Removed {
                names: vec!["Block 1 Bedok North Ave".into()]
            }
        );
        assert_eq!(sync.release_town(&mut map, "BEDOK"), HighlightChange::Unchanged);
        assert_eq!(sync.names(), vec!["Tampines St 11"]);
    }

    #[test]
    fn test_town_highlight_recentres_street_does_not() {
        let snap = snapshot();
        let mut map = RecordingMap::new();
        let mut sync = HighlightSynchronizer::new(15.0);

        sync.toggle(&mut map, "Tampines St 11", EntityKind::Street, &snap);
        assert!(map.camera().is_none());

        sync.toggle(&mut map, "Bedok", EntityKind::Town, &snap);
        let Some(CameraMove::FlyTo { center, zoom }) = map.camera() else {
            panic!("expected a fly-to, got {:?}", map.camera());
        };
        assert!((center.lon - 103.93).abs() < 1e-9);
        assert!((center.lat - 1.33).abs() < 1e-9);
        assert_eq!(*zoom, 15.0);
    }

    #[test]
    fn test_unknown_name_draws_nothing() {
        let snap = snapshot();
        let mut map = RecordingMap::new();
        let mut sync = HighlightSynchronizer::new(15.0);

        let change = sync.toggle(&mut map, "Punggol", EntityKind::Town, &snap);
        assert!(matches!(change, HighlightChange::NoPoints { .. }));
        assert!(sync.is_empty());
        assert!(map.commands().is_empty());
    }

    #[test]
    fn test_existing_layer_is_not_recreated() {
        let snap = snapshot();
        let mut map = RecordingMap::new();
        let mut sync = HighlightSynchronizer::new(15.0);

        // a leftover pair from an earlier render pass
        map.upsert_source(&source_id("Bedok"), FeatureCollection::default());
        map.add_layer(LayerSpec::new(
            layer_id("Bedok"),
            source_id("Bedok"),
            LayerStyle::Outline { color: TOWN_OUTLINE.into() },
        ));

        sync.ensure(&mut map, "Bedok", EntityKind::Town, &snap);
        assert_eq!(sync.ensure(&mut map, "Bedok", EntityKind::Town, &snap), HighlightChange::Unchanged);
        assert_eq!(map.violations(), 0);
        assert_eq!(map.layer_ids().len(), 1);
    }

    #[test]
    fn test_removal_tolerates_missing_pair() {
        let snap = snapshot();
        let mut map = RecordingMap::new();
        let mut sync = HighlightSynchronizer::new(15.0);

        sync.toggle(&mut map, "Bedok", EntityKind::Town, &snap);
        // collaborator lost the layer, e.g. after a style reload
        map.remove_layer(&layer_id("Bedok"));
        assert!(!sync.is_consistent_with(&map));

        sync.remove(&mut map, "Bedok");
        assert!(sync.is_empty());
        assert!(map.source_ids().is_empty());
        assert_eq!(map.violations(), 0);
        assert_eq!(sync.remove(&mut map, "Bedok"), HighlightChange::Unchanged);
    }

    #[test]
    fn test_clear_removes_everything() {
        let snap = snapshot();
        let mut map = RecordingMap::new();
        let mut sync = HighlightSynchronizer::new(15.0);

        sync.toggle(&mut map, "Bedok", EntityKind::Town, &snap);
        sync.toggle(&mut map, "Tampines", EntityKind::Town, &snap);
        sync.toggle(&mut map, "Tampines St 11", EntityKind::Street, &snap);

        assert_eq!(sync.clear(&mut map).len(), 3);
        assert!(sync.is_empty());
        assert!(map.layer_ids().is_empty());
        assert!(map.source_ids().is_empty());
    }
}
