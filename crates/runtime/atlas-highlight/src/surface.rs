//! Command interfaces of the two rendering collaborators
//!
//! One component owns each live handle; everything else reaches the map
//! and chart only through these commands.

use atlas_core::{Bounds, FeatureCollection, LngLat};
use atlas_selection::ChartFrame;
use serde::Serialize;
use serde_json::{json, Map, Value};

/// Where a layer takes its fill colour from
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorSource {
    /// A feature property holding a colour string
    Property(String),
    Fixed(String),
}

impl ColorSource {
    pub fn property(name: &str) -> Self {
        ColorSource::Property(name.to_string())
    }

    pub fn to_expression(&self) -> Value {
        match self {
            ColorSource::Property(name) => json!(["get", name]),
            ColorSource::Fixed(color) => json!(color),
        }
    }
}

/// How a layer draws its source
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "style", rename_all = "lowercase")]
pub enum LayerStyle {
    /// Filled circles
    Markers { fill: ColorSource },
    /// Hollow circles with a coloured ring
    Outline { color: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerSpec {
    pub id: String,
    pub source: String,
    pub style: LayerStyle,
}

impl LayerSpec {
    pub fn new(id: impl Into<String>, source: impl Into<String>, style: LayerStyle) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            style,
        }
    }
}

/// Feature predicate for a layer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterExpr {
    /// Numeric property within an inclusive range
    Between { property: String, min: f64, max: f64 },
    /// String property equal to one of the values
    In { property: String, values: Vec<String> },
    All(Vec<FilterExpr>),
}

impl FilterExpr {
    pub fn between(property: &str, min: f64, max: f64) -> Self {
        FilterExpr::Between {
            property: property.to_string(),
            min,
            max,
        }
    }

    /// Expression array in the map's filter syntax
    pub fn to_expression(&self) -> Value {
        match self {
            FilterExpr::Between { property, min, max } => json!([
                "all",
                [">=", ["get", property], min],
                ["<=", ["get", property], max]
            ]),
            FilterExpr::In { property, values } => {
                json!(["in", ["get", property], ["literal", values]])
            }
            FilterExpr::All(parts) => {
                let mut expr = vec![json!("all")];
                expr.extend(parts.iter().map(FilterExpr::to_expression));
                Value::Array(expr)
            }
        }
    }

    /// Evaluate against a feature's properties
    pub fn matches(&self, properties: &Map<String, Value>) -> bool {
        match self {
            FilterExpr::Between { property, min, max } => properties
                .get(property)
                .and_then(Value::as_f64)
                .is_some_and(|v| v >= *min && v <= *max),
            FilterExpr::In { property, values } => properties
                .get(property)
                .and_then(Value::as_str)
                .is_some_and(|v| values.iter().any(|candidate| candidate == v)),
            FilterExpr::All(parts) => parts.iter().all(|p| p.matches(properties)),
        }
    }
}

/// Options for [`MapSurface::fit_bounds`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FitOptions {
    pub padding: u32,
    pub max_zoom: f64,
}

/// The map collaborator
pub trait MapSurface {
    /// Create or replace a GeoJSON source
    fn upsert_source(&mut self, id: &str, data: FeatureCollection);
    fn remove_source(&mut self, id: &str);
    fn has_source(&self, id: &str) -> bool;

    fn add_layer(&mut self, spec: LayerSpec);
    fn remove_layer(&mut self, id: &str);
    fn has_layer(&self, id: &str) -> bool;

    fn set_filter(&mut self, layer_id: &str, filter: FilterExpr);
    fn set_fill(&mut self, layer_id: &str, fill: ColorSource);

    fn fly_to(&mut self, center: LngLat, zoom: f64);
    fn fit_bounds(&mut self, bounds: Bounds, options: FitOptions);
}

/// The chart collaborator
pub trait ChartSurface {
    /// Draw a frame, replacing whatever was drawn before
    fn render(&mut self, frame: &ChartFrame);
    /// Neutral placeholder while data is on its way
    fn show_loading(&mut self);
    /// Visually select the groups named in `keys`
    fn set_selected_keys(&mut self, keys: &[String]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_filter_expression() {
        let filter = FilterExpr::between("year", 1980.0, 2000.0);
        assert_eq!(
            filter.to_expression(),
            json!(["all", [">=", ["get", "year"], 1980.0], ["<=", ["get", "year"], 2000.0]])
        );
    }

    #[test]
    fn test_filter_evaluation() {
        let mut props = Map::new();
        props.insert("year".into(), json!(1990));
        props.insert("town".into(), json!("BEDOK"));

        assert!(FilterExpr::between("year", 1980.0, 2000.0).matches(&props));
        assert!(!FilterExpr::between("year", 1991.0, 2000.0).matches(&props));

        let both = FilterExpr::All(vec![
            FilterExpr::between("year", 1980.0, 2000.0),
            FilterExpr::In {
                property: "town".into(),
                values: vec!["TAMPINES".into()],
            },
        ]);
        assert!(!both.matches(&props));
        // missing property never matches
        assert!(!FilterExpr::between("age", 0.0, 100.0).matches(&props));
    }

    #[test]
    fn test_color_source_expression() {
        assert_eq!(ColorSource::property("priceColor").to_expression(), json!(["get", "priceColor"]));
        assert_eq!(ColorSource::Fixed("white".into()).to_expression(), json!("white"));
    }
}
