//! Base marker layer and camera framing

use atlas_config::MapConfig;
use atlas_core::{Feature, FeatureCollection, Geometry, LngLat};
use atlas_highlight::{ColorSource, FilterExpr, FitOptions, LayerSpec, LayerStyle, MapSurface};
use atlas_join::EnrichedProperty;
use atlas_selection::YearRange;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map};
use std::fmt;
use std::str::FromStr;

pub const MARKER_SOURCE: &str = "markers";
pub const MARKER_LAYER: &str = "circle";

/// Which classification colours the markers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Property category
    #[default]
    Type,
    Age,
    Price,
}

impl ColorMode {
    /// Feature property holding this mode's colour
    pub fn property(&self) -> &'static str {
        match self {
            ColorMode::Type => "color",
            ColorMode::Age => "ageColor",
            ColorMode::Price => "priceColor",
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorMode::Type => write!(f, "type"),
            ColorMode::Age => write!(f, "age"),
            ColorMode::Price => write!(f, "price"),
        }
    }
}

impl FromStr for ColorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "type" => Ok(ColorMode::Type),
            "age" => Ok(ColorMode::Age),
            "price" => Ok(ColorMode::Price),
            other => Err(format!("unknown colour mode: {}", other)),
        }
    }
}

/// One point feature per enriched property
pub fn marker_features(enriched: &[EnrichedProperty]) -> FeatureCollection {
    FeatureCollection::new(
        enriched
            .iter()
            .map(|entry| {
                let record = &entry.record;
                let mut properties = Map::new();
                properties.insert("address".into(), json!(record.address));
                properties.insert("blockStreet".into(), json!(entry.block_street));
                properties.insert("town".into(), json!(record.town));
                properties.insert("street".into(), json!(record.street));
                properties.insert("tag".into(), json!(record.tag.label()));
                properties.insert("year".into(), json!(record.year));
                properties.insert("age".into(), json!(record.age));
                properties.insert("price".into(), json!(entry.price));
                properties.insert("color".into(), json!(record.tag_color()));
                properties.insert("ageColor".into(), json!(record.age_color()));
                properties.insert("priceColor".into(), json!(entry.price_color));
                Feature::new(Geometry::point(record.position()), properties)
            })
            .collect(),
    )
}

/// Owner of the marker layer and the camera defaults
#[derive(Debug, Clone)]
pub struct MapView {
    config: MapConfig,
    color_mode: ColorMode,
}

impl MapView {
    pub fn new(config: MapConfig) -> Self {
        Self {
            config,
            color_mode: ColorMode::default(),
        }
    }

    pub fn color_mode(&self) -> ColorMode {
        self.color_mode
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    /// Replace the marker data; creates the layer on first use
    pub fn show_markers(&self, map: &mut dyn MapSurface, enriched: &[EnrichedProperty], years: YearRange) {
        map.upsert_source(MARKER_SOURCE, marker_features(enriched));
        if !map.has_layer(MARKER_LAYER) {
            map.add_layer(LayerSpec::new(
                MARKER_LAYER,
                MARKER_SOURCE,
                LayerStyle::Markers {
                    fill: ColorSource::property(self.color_mode.property()),
                },
            ));
            self.apply_years(map, years);
        }
        tracing::debug!(markers = enriched.len(), "marker source updated");
    }

    pub fn apply_years(&self, map: &mut dyn MapSurface, years: YearRange) {
        if map.has_layer(MARKER_LAYER) {
            map.set_filter(MARKER_LAYER, year_filter(years));
        }
    }

    pub fn set_color_mode(&mut self, map: &mut dyn MapSurface, mode: ColorMode) -> bool {
        if self.color_mode == mode {
            return false;
        }
        self.color_mode = mode;
        if map.has_layer(MARKER_LAYER) {
            map.set_fill(MARKER_LAYER, ColorSource::property(mode.property()));
        }
        true
    }

    /// Fit the selected towns' boundaries, or return to the default view
    /// when no specific town is selected
    pub fn frame_towns(
        &self,
        map: &mut dyn MapSurface,
        towns: &[String],
        boundaries: &FeatureCollection,
        unfiltered: bool,
    ) {
        if unfiltered {
            let [lon, lat] = self.config.center;
            map.fly_to(LngLat::new(lon, lat), self.config.zoom);
            return;
        }

        match boundaries.towns_bounds(towns) {
            Some(bounds) => {
                let max_zoom = if towns.len() == 1 {
                    self.config.single_town_zoom
                } else {
                    self.config.multi_town_zoom
                };
                map.fit_bounds(
                    bounds,
                    FitOptions {
                        padding: self.config.padding,
                        max_zoom,
                    },
                );
            }
            None => tracing::debug!(?towns, "no boundary for selection, camera unchanged"),
        }
    }
}

pub fn year_filter(years: YearRange) -> FilterExpr {
    FilterExpr::between("year", f64::from(years.start()), f64::from(years.end()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_core::{decode_properties, PropertyRecord};
    use atlas_highlight::{CameraMove, RecordingMap};
    use atlas_join::enrich;
    use std::sync::Arc;

    fn enriched() -> Vec<EnrichedProperty> {
        let props: Vec<Arc<PropertyRecord>> = decode_properties(
            vec![
                json!({"address": "1 Bedok Rd", "street": "BEDOK RD", "town": "BEDOK", "lat": 1.32, "lon": 103.93, "tag": "Residential", "year": 1975}),
                json!({"address": "7 Tampines St 11", "street": "TAMPINES ST 11", "town": "TAMPINES", "lat": 1.35, "lon": 103.95, "tag": "Commercial", "year": 2005}),
            ],
            2024,
        )
        .unwrap()
        .into_iter()
        .map(Arc::new)
        .collect();
        enrich(&props, &[], &atlas_core::FlatType::FourRoom)
    }

    fn boundaries() -> FeatureCollection {
        serde_json::from_value(json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"PLN_AREA_N": "BEDOK"},
                 "geometry": {"type": "Polygon", "coordinates": [[[103.90, 1.31], [103.95, 1.31], [103.95, 1.34], [103.90, 1.31]]]}},
                {"type": "Feature", "properties": {"PLN_AREA_N": "TAMPINES"},
                 "geometry": {"type": "Polygon", "coordinates": [[[103.93, 1.34], [103.97, 1.34], [103.97, 1.37], [103.93, 1.34]]]}}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_marker_features_carry_every_colour() {
        let features = marker_features(&enriched());
        let props = &features.features[0].properties;
        assert_eq!(props["color"], json!("#FF00FF"));
        assert_eq!(props["priceColor"], json!("gray"));
        assert_eq!(props["price"], json!("NA"));
        assert_eq!(props["year"], json!(1975));
        assert!(props["ageColor"].is_string());
    }

    #[test]
    fn test_layer_created_once_with_year_filter() {
        let view = MapView::new(MapConfig::default());
        let mut map = RecordingMap::new();
        let years = YearRange::new(1970, 1990).unwrap();

        view.show_markers(&mut map, &enriched(), years);
        view.show_markers(&mut map, &enriched(), years);

        assert_eq!(map.violations(), 0);
        assert_eq!(map.layer_ids(), vec![MARKER_LAYER]);
        assert_eq!(map.visible_features(MARKER_LAYER).len(), 1);
    }

    #[test]
    fn test_color_mode_switches_fill() {
        let mut view = MapView::new(MapConfig::default());
        let mut map = RecordingMap::new();
        view.show_markers(&mut map, &enriched(), YearRange::new(1960, 2024).unwrap());

        assert!(view.set_color_mode(&mut map, ColorMode::Price));
        assert!(!view.set_color_mode(&mut map, ColorMode::Price));
        assert_eq!(map.fill(MARKER_LAYER), Some(&ColorSource::property("priceColor")));
        assert_eq!("AGE".parse::<ColorMode>(), Ok(ColorMode::Age));
    }

    #[test]
    fn test_camera_framing() {
        let view = MapView::new(MapConfig::default());
        let mut map = RecordingMap::new();
        let bounds = boundaries();

        view.frame_towns(&mut map, &["BEDOK".to_string()], &bounds, false);
        match map.camera() {
            Some(CameraMove::FitBounds { bounds, options }) => {
                assert_eq!(options.max_zoom, 14.0);
                assert_eq!(options.padding, 20);
                assert_eq!(bounds.east, 103.95);
            }
            other => panic!("unexpected camera {:?}", other),
        }

        view.frame_towns(&mut map, &["bedok".to_string(), "TAMPINES".to_string()], &bounds, false);
        match map.camera() {
            Some(CameraMove::FitBounds { bounds, options }) => {
                assert_eq!(options.max_zoom, 12.5);
                assert_eq!(bounds.north, 1.37);
            }
            other => panic!("unexpected camera {:?}", other),
        }

        view.frame_towns(&mut map, &[], &bounds, true);
        assert_eq!(
            map.camera(),
            Some(&CameraMove::FlyTo {
                center: LngLat::new(103.9, 1.35),
                zoom: 12.2
            })
        );
    }
}
