//! Property categories and their marker colours

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a building
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PropertyTag {
    Miscellaneous,
    Residential,
    MarketAndHawker,
    MultiStoreyCarpark,
    Commercial,
    /// Category outside the known set, kept verbatim
    Other(String),
}

impl PropertyTag {
    /// Known categories in legend order
    pub const KNOWN: [PropertyTag; 5] = [
        PropertyTag::Miscellaneous,
        PropertyTag::Residential,
        PropertyTag::MarketAndHawker,
        PropertyTag::MultiStoreyCarpark,
        PropertyTag::Commercial,
    ];

    /// Wire label
    pub fn label(&self) -> &str {
        match self {
            Self::Miscellaneous => "Miscellaneous",
            Self::Residential => "Residential",
            Self::MarketAndHawker => "Market and hawker",
            Self::MultiStoreyCarpark => "Multi-storey carpark",
            Self::Commercial => "Commercial",
            Self::Other(label) => label,
        }
    }

    /// Marker colour for the "type" colour mode
    pub fn color(&self) -> &'static str {
        match self {
            Self::Miscellaneous => "#22d3ee",
            Self::Residential => "#FF00FF",
            Self::MarketAndHawker => "#FFD700",
            Self::MultiStoreyCarpark => "#d6d3d1",
            Self::Commercial => "#FF7F50",
            Self::Other(_) => "#000000",
        }
    }

    /// Position in legend order; unknown tags sort last
    pub fn legend_index(&self) -> usize {
        Self::KNOWN
            .iter()
            .position(|known| known == self)
            .unwrap_or(Self::KNOWN.len())
    }
}

impl From<String> for PropertyTag {
    fn from(label: String) -> Self {
        match label.as_str() {
            "Miscellaneous" => Self::Miscellaneous,
            "Residential" => Self::Residential,
            "Market and hawker" => Self::MarketAndHawker,
            "Multi-storey carpark" => Self::MultiStoreyCarpark,
            "Commercial" => Self::Commercial,
            _ => Self::Other(label),
        }
    }
}

impl From<PropertyTag> for String {
    fn from(tag: PropertyTag) -> Self {
        tag.label().to_string()
    }
}

impl fmt::Display for PropertyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_round_trips_through_label() {
        for tag in PropertyTag::KNOWN {
            assert_eq!(PropertyTag::from(tag.label().to_string()), tag);
        }
    }

    #[test]
    fn test_unknown_tag_is_black() {
        let tag: PropertyTag = serde_json::from_str("\"Pavilion\"").unwrap();
        assert_eq!(tag, PropertyTag::Other("Pavilion".into()));
        assert_eq!(tag.color(), "#000000");
        assert_eq!(tag.legend_index(), PropertyTag::KNOWN.len());
    }

    #[test]
    fn test_tag_serializes_as_label() {
        let json = serde_json::to_string(&PropertyTag::MarketAndHawker).unwrap();
        assert_eq!(json, "\"Market and hawker\"");
    }
}
