//! Threshold classifier
//!
//! Maps a numeric value onto a discrete colour bucket. The same scale type
//! serves prices and building ages; only the tables differ.
//!
//! ```text
//!   thresholds:   0      300K     600K     800K     1M
//!                 │───────│────────│────────│────────│──────>
//!   bucket:       0       1        2        3        4
//!
//!   650_000  ──> bucket 2 (greatest threshold <= value)
//!   -5       ──> below range (policy decides)
//!   NaN/None ──> Unavailable
//! ```

use serde_json::Value;

use crate::numeric::loose_number;

/// Colour used for any value that cannot be classified
pub const UNAVAILABLE_COLOR: &str = "gray";

/// What a scale does with values under its first threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BelowRange {
    /// Clamp into the first bucket
    FirstBucket,
    /// Treat as not classifiable
    Unavailable,
}

/// Result of classifying one value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bucket {
    Band {
        index: usize,
        lower: f64,
        color: &'static str,
    },
    Unavailable,
}

impl Bucket {
    /// Display colour, gray when unavailable
    pub fn color(&self) -> &'static str {
        match self {
            Bucket::Band { color, .. } => *color,
            Bucket::Unavailable => UNAVAILABLE_COLOR,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Bucket::Band { .. })
    }

    pub fn index(&self) -> Option<usize> {
        match self {
            Bucket::Band { index, .. } => Some(*index),
            Bucket::Unavailable => None,
        }
    }
}

/// One legend pill
#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub label: String,
    pub color: &'static str,
}

/// Ascending thresholds paired one-to-one with colours
#[derive(Debug, Clone, Copy)]
pub struct ThresholdScale {
    thresholds: &'static [f64],
    colors: &'static [&'static str],
    below: BelowRange,
}

/// Resale price buckets
pub const PRICE_SCALE: ThresholdScale = ThresholdScale::new(
    &[0.0, 300_000.0, 600_000.0, 800_000.0, 1_000_000.0],
    &["white", "#99f6e4", "#2dd4bf", "#FF7F50", "#FFD700"],
    BelowRange::Unavailable,
);

/// Building age buckets, sampled from a blue-purple ramp
pub const AGE_SCALE: ThresholdScale = ThresholdScale::new(
    &[0.0, 10.0, 20.0, 30.0, 40.0, 50.0],
    &["#f7fcfd", "#ccddec", "#9ebcda", "#8c8fc3", "#88509f", "#4d004b"],
    BelowRange::FirstBucket,
);

impl ThresholdScale {
    /// Build a scale. Panics at compile time when used in a const with
    /// mismatched or empty tables.
    pub const fn new(
        thresholds: &'static [f64],
        colors: &'static [&'static str],
        below: BelowRange,
    ) -> Self {
        assert!(!thresholds.is_empty(), "scale needs at least one threshold");
        assert!(thresholds.len() == colors.len(), "one colour per threshold");
        Self {
            thresholds,
            colors,
            below,
        }
    }

    pub fn thresholds(&self) -> &'static [f64] {
        self.thresholds
    }

    pub fn colors(&self) -> &'static [&'static str] {
        self.colors
    }

    /// Classify an optional value
    pub fn classify(&self, value: Option<f64>) -> Bucket {
        let value = match value {
            Some(v) if v.is_finite() => v,
            _ => return Bucket::Unavailable,
        };

        let above = self.thresholds.partition_point(|t| *t <= value);
        let index = match (above, self.below) {
            (0, BelowRange::Unavailable) => return Bucket::Unavailable,
            (0, BelowRange::FirstBucket) => 0,
            (n, _) => n - 1,
        };

        Bucket::Band {
            index,
            lower: self.thresholds[index],
            color: self.colors[index],
        }
    }

    /// Classify a raw wire value, tolerating strings and invalid markers
    pub fn classify_value(&self, value: &Value) -> Bucket {
        self.classify(loose_number(value))
    }

    /// Shorthand for `classify(value).color()`
    pub fn color(&self, value: Option<f64>) -> &'static str {
        self.classify(value).color()
    }

    /// Range labels for the legend: `0 - 300K`, ..., `Above 1.0M`
    pub fn legend(&self) -> Vec<LegendEntry> {
        let mut entries: Vec<LegendEntry> = self
            .thresholds
            .windows(2)
            .zip(self.colors.iter().copied())
            .map(|(pair, color)| LegendEntry {
                label: format!("{} - {}", format_threshold(pair[0]), format_threshold(pair[1])),
                color,
            })
            .collect();

        let last = self.thresholds.len() - 1;
        entries.push(LegendEntry {
            label: format!("Above {}", format_threshold(self.thresholds[last])),
            color: self.colors[last],
        });
        entries
    }
}

/// Compact number for legend labels
pub fn format_threshold(value: f64) -> String {
    if value >= 1_000_000.0 {
        format!("{:.1}M", value / 1_000_000.0)
    } else if value >= 1_000.0 {
        format!("{:.0}K", value / 1_000.0)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_price_bucket_is_greatest_threshold_below_value() {
        let bucket = PRICE_SCALE.classify(Some(650_000.0));
        assert_eq!(bucket.index(), Some(2));
        assert_eq!(bucket.color(), "#2dd4bf");

        assert_eq!(PRICE_SCALE.classify(Some(600_000.0)).index(), Some(2));
        assert_eq!(PRICE_SCALE.classify(Some(0.0)).index(), Some(0));
        assert_eq!(PRICE_SCALE.classify(Some(2_500_000.0)).index(), Some(4));
    }

    #[test]
    fn test_negative_price_is_unavailable() {
        let bucket = PRICE_SCALE.classify(Some(-5.0));
        assert_eq!(bucket, Bucket::Unavailable);
        assert_eq!(bucket.color(), UNAVAILABLE_COLOR);
    }

    #[test]
    fn test_non_numeric_is_unavailable() {
        assert_eq!(PRICE_SCALE.classify(None), Bucket::Unavailable);
        assert_eq!(PRICE_SCALE.classify(Some(f64::NAN)), Bucket::Unavailable);
        assert_eq!(PRICE_SCALE.classify_value(&json!("NaN")), Bucket::Unavailable);
        assert_eq!(PRICE_SCALE.classify_value(&json!(null)), Bucket::Unavailable);
        assert_eq!(PRICE_SCALE.classify_value(&json!("450000")).index(), Some(1));
    }

    #[test]
    fn test_age_below_range_clamps_to_first_bucket() {
        assert_eq!(AGE_SCALE.classify(Some(-2.0)).index(), Some(0));
        assert_eq!(AGE_SCALE.classify(Some(35.0)).index(), Some(3));
        assert_eq!(AGE_SCALE.classify(Some(70.0)).index(), Some(5));
        assert_eq!(AGE_SCALE.classify(None), Bucket::Unavailable);
    }

    #[test]
    fn test_price_legend_labels() {
        let labels: Vec<String> = PRICE_SCALE.legend().into_iter().map(|e| e.label).collect();
        assert_eq!(
            labels,
            vec!["0 - 300K", "300K - 600K", "600K - 800K", "800K - 1.0M", "Above 1.0M"]
        );
    }
}
