//! Headless surfaces
//!
//! In-memory map and chart that keep the state a real renderer would hold
//! and log every command they receive. Commands that a real map would
//! reject (duplicate layer, dangling source) are recorded as violations
//! instead of panicking, so callers can assert on them.

use atlas_core::{Bounds, Feature, FeatureCollection, LngLat};
use atlas_selection::ChartFrame;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::surface::{ChartSurface, ColorSource, FilterExpr, FitOptions, LayerSpec, MapSurface};

/// Last camera instruction
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "move", rename_all = "snake_case")]
pub enum CameraMove {
    FlyTo { center: LngLat, zoom: f64 },
    FitBounds { bounds: Bounds, options: FitOptions },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum MapCommand {
    UpsertSource { id: String, features: usize },
    RemoveSource { id: String },
    AddLayer { id: String, source: String },
    RemoveLayer { id: String },
    SetFilter { layer: String },
    SetFill { layer: String },
    Camera(CameraMove),
}

#[derive(Debug, Default)]
pub struct RecordingMap {
    sources: BTreeMap<String, FeatureCollection>,
    layers: BTreeMap<String, LayerSpec>,
    filters: BTreeMap<String, FilterExpr>,
    fills: BTreeMap<String, ColorSource>,
    camera: Option<CameraMove>,
    commands: Vec<MapCommand>,
    violations: Vec<String>,
}

impl RecordingMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source_ids(&self) -> Vec<&str> {
        self.sources.keys().map(String::as_str).collect()
    }

    pub fn layer_ids(&self) -> Vec<&str> {
        self.layers.keys().map(String::as_str).collect()
    }

    pub fn source(&self, id: &str) -> Option<&FeatureCollection> {
        self.sources.get(id)
    }

    pub fn layer(&self, id: &str) -> Option<&LayerSpec> {
        self.layers.get(id)
    }

    pub fn filter(&self, layer_id: &str) -> Option<&FilterExpr> {
        self.filters.get(layer_id)
    }

    pub fn fill(&self, layer_id: &str) -> Option<&ColorSource> {
        self.fills.get(layer_id)
    }

    pub fn camera(&self) -> Option<&CameraMove> {
        self.camera.as_ref()
    }

    pub fn commands(&self) -> &[MapCommand] {
        &self.commands
    }

    /// Number of rejected commands so far
    pub fn violations(&self) -> usize {
        self.violations.len()
    }

    pub fn violation_log(&self) -> &[String] {
        &self.violations
    }

    /// Features of a layer's source that pass its filter
    pub fn visible_features(&self, layer_id: &str) -> Vec<&Feature> {
        let Some(layer) = self.layers.get(layer_id) else {
            return Vec::new();
        };
        let Some(source) = self.sources.get(&layer.source) else {
            return Vec::new();
        };
        let filter = self.filters.get(layer_id);
        source
            .features
            .iter()
            .filter(|f| filter.map_or(true, |expr| expr.matches(&f.properties)))
            .collect()
    }

    fn reject(&mut self, message: String) {
        tracing::warn!(%message, "map command rejected");
        self.violations.push(message);
    }
}

impl MapSurface for RecordingMap {
    fn upsert_source(&mut self, id: &str, data: FeatureCollection) {
        self.commands.push(MapCommand::UpsertSource {
            id: id.to_string(),
            features: data.len(),
        });
        self.sources.insert(id.to_string(), data);
    }

    fn remove_source(&mut self, id: &str) {
        self.commands.push(MapCommand::RemoveSource { id: id.to_string() });
        if let Some(layer) = self.layers.values().find(|l| l.source == id) {
            let message = format!("source {} still used by layer {}", id, layer.id);
            self.reject(message);
            return;
        }
        if self.sources.remove(id).is_none() {
            self.reject(format!("source {} does not exist", id));
        }
    }

    fn has_source(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    fn add_layer(&mut self, spec: LayerSpec) {
        self.commands.push(MapCommand::AddLayer {
            id: spec.id.clone(),
            source: spec.source.clone(),
        });
        if self.layers.contains_key(&spec.id) {
            self.reject(format!("layer {} already exists", spec.id));
            return;
        }
        if !self.sources.contains_key(&spec.source) {
            self.reject(format!("layer {} references missing source {}", spec.id, spec.source));
            return;
        }
        self.layers.insert(spec.id.clone(), spec);
    }

    fn remove_layer(&mut self, id: &str) {
        self.commands.push(MapCommand::RemoveLayer { id: id.to_string() });
        if self.layers.remove(id).is_none() {
            self.reject(format!("layer {} does not exist", id));
            return;
        }
        self.filters.remove(id);
        self.fills.remove(id);
    }

    fn has_layer(&self, id: &str) -> bool {
        self.layers.contains_key(id)
    }

    fn set_filter(&mut self, layer_id: &str, filter: FilterExpr) {
        self.commands.push(MapCommand::SetFilter {
            layer: layer_id.to_string(),
        });
        if !self.layers.contains_key(layer_id) {
            self.reject(format!("filter on missing layer {}", layer_id));
            return;
        }
        self.filters.insert(layer_id.to_string(), filter);
    }

    fn set_fill(&mut self, layer_id: &str, fill: ColorSource) {
        self.commands.push(MapCommand::SetFill {
            layer: layer_id.to_string(),
        });
        if !self.layers.contains_key(layer_id) {
            self.reject(format!("fill on missing layer {}", layer_id));
            return;
        }
        self.fills.insert(layer_id.to_string(), fill);
    }

    fn fly_to(&mut self, center: LngLat, zoom: f64) {
        let camera = CameraMove::FlyTo { center, zoom };
        self.commands.push(MapCommand::Camera(camera.clone()));
        self.camera = Some(camera);
    }

    fn fit_bounds(&mut self, bounds: Bounds, options: FitOptions) {
        let camera = CameraMove::FitBounds { bounds, options };
        self.commands.push(MapCommand::Camera(camera.clone()));
        self.camera = Some(camera);
    }
}

/// What the chart is currently showing
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "showing", rename_all = "snake_case")]
pub enum ChartDisplay {
    Blank,
    Loading,
    Frame(ChartFrame),
}

#[derive(Debug)]
pub struct RecordingChart {
    display: ChartDisplay,
    selected: Vec<String>,
    renders: usize,
    loading_shown: usize,
}

impl Default for RecordingChart {
    fn default() -> Self {
        Self {
            display: ChartDisplay::Blank,
            selected: Vec::new(),
            renders: 0,
            loading_shown: 0,
        }
    }
}

impl RecordingChart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn display(&self) -> &ChartDisplay {
        &self.display
    }

    pub fn frame(&self) -> Option<&ChartFrame> {
        match &self.display {
            ChartDisplay::Frame(frame) => Some(frame),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.display, ChartDisplay::Loading)
    }

    pub fn selected_keys(&self) -> &[String] {
        &self.selected
    }

    pub fn renders(&self) -> usize {
        self.renders
    }

    pub fn loading_shown(&self) -> usize {
        self.loading_shown
    }
}

impl ChartSurface for RecordingChart {
    fn render(&mut self, frame: &ChartFrame) {
        self.renders += 1;
        self.display = ChartDisplay::Frame(frame.clone());
    }

    fn show_loading(&mut self) {
        self.loading_shown += 1;
        self.display = ChartDisplay::Loading;
    }

    fn set_selected_keys(&mut self, keys: &[String]) {
        self.selected = keys.to_vec();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::LayerStyle;
    use atlas_core::Geometry;
    use serde_json::{json, Map};

    fn point(year: i32) -> Feature {
        let mut props = Map::new();
        props.insert("year".into(), json!(year));
        Feature::new(Geometry::point(LngLat::new(103.9, 1.3)), props)
    }

    fn outline(id: &str, source: &str) -> LayerSpec {
        LayerSpec::new(id, source, LayerStyle::Outline { color: "white".into() })
    }

    #[test]
    fn test_rejects_what_a_real_map_would() {
        let mut map = RecordingMap::new();
        map.add_layer(outline("l", "missing"));
        map.upsert_source("s", FeatureCollection::default());
        map.add_layer(outline("l", "s"));
        map.add_layer(outline("l", "s"));
        map.remove_source("s");
        map.set_filter("nope", FilterExpr::between("year", 0.0, 1.0));
        map.remove_layer("nope");

        assert_eq!(map.violations(), 5);
        assert_eq!(map.layer_ids(), vec!["l"]);
        assert_eq!(map.source_ids(), vec!["s"]);
        assert_eq!(map.commands().len(), 7);
    }

    #[test]
    fn test_visible_features_apply_filter() {
        let mut map = RecordingMap::new();
        map.upsert_source("s", FeatureCollection::new(vec![point(1970), point(1990), point(2010)]));
        map.add_layer(LayerSpec::new(
            "markers",
            "s",
            LayerStyle::Markers { fill: ColorSource::property("color") },
        ));
        assert_eq!(map.visible_features("markers").len(), 3);

        map.set_filter("markers", FilterExpr::between("year", 1980.0, 2000.0));
        assert_eq!(map.visible_features("markers").len(), 1);

        map.remove_layer("markers");
        map.remove_source("s");
        assert!(map.visible_features("markers").is_empty());
        assert_eq!(map.violations(), 0);
    }

    #[test]
    fn test_chart_tracks_latest_display() {
        let mut chart = RecordingChart::new();
        assert_eq!(chart.display(), &ChartDisplay::Blank);
        chart.show_loading();
        assert!(chart.is_loading());

        chart.render(&ChartFrame::new(atlas_core::ViewMode::Town, Vec::new()));
        assert!(chart.frame().is_some());
        assert_eq!((chart.renders(), chart.loading_shown()), (1, 1));

        chart.set_selected_keys(&["BEDOK".to_string()]);
        assert_eq!(chart.selected_keys(), ["BEDOK"]);
    }
}
