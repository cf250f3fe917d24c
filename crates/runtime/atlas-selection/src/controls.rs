//! Values shown by the side-panel controls

use atlas_core::{FlatType, PriceRecord, PropertyRecord, PropertyTag, ALL_TOWNS};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::state::SelectionState;

/// `All Towns` followed by every town with a property, sorted
pub fn town_options(properties: &[Arc<PropertyRecord>]) -> Vec<String> {
    let towns: BTreeSet<&str> = properties
        .iter()
        .filter_map(|p| p.town.as_deref())
        .filter(|t| !t.is_empty())
        .collect();

    std::iter::once(ALL_TOWNS.to_string())
        .chain(towns.into_iter().map(str::to_string))
        .collect()
}

/// Text of the town dropdown button
pub fn dropdown_label(selection: &SelectionState) -> String {
    if selection.is_unfiltered() {
        return ALL_TOWNS.to_string();
    }
    match selection.towns() {
        [single] => single.clone(),
        towns => format!("{} towns selected", towns.len()),
    }
}

/// Properties completed within the year range and in the selected towns
pub fn property_count(properties: &[Arc<PropertyRecord>], selection: &SelectionState) -> usize {
    let range = selection.year_range();
    properties
        .iter()
        .filter(|p| p.year.is_some_and(|y| range.contains(y)))
        .filter(|p| {
            selection.is_unfiltered()
                || selection.towns().iter().any(|t| p.in_town(t))
        })
        .count()
}

/// Flat types present in the town aggregates, sorted, without `1 ROOM`
pub fn flat_type_options(town_prices: &[PriceRecord]) -> Vec<FlatType> {
    town_prices
        .iter()
        .map(|r| &r.flat_type)
        .filter(|f| **f != FlatType::OneRoom)
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Cumulative completions of one property category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineSeries {
    pub tag: PropertyTag,
    pub color: &'static str,
    /// `(year, properties completed up to and including year)`
    pub points: Vec<(i32, usize)>,
}

/// Per category, cumulative completed properties for every year from
/// `first_year` up to but excluding `current_year`
pub fn completion_timeline(
    properties: &[Arc<PropertyRecord>],
    first_year: i32,
    current_year: i32,
) -> Vec<TimelineSeries> {
    let mut per_tag: BTreeMap<(usize, String), (PropertyTag, BTreeMap<i32, usize>)> = BTreeMap::new();
    for property in properties {
        let Some(year) = property.year else { continue };
        let key = (property.tag.legend_index(), property.tag.label().to_string());
        let (_, years) = per_tag
            .entry(key)
            .or_insert_with(|| (property.tag.clone(), BTreeMap::new()));
        *years.entry(year).or_insert(0) += 1;
    }

    per_tag
        .into_values()
        .map(|(tag, years)| {
            let mut running: usize = years.range(..first_year).map(|(_, n)| n).sum();
            let points = (first_year..current_year)
                .map(|year| {
                    running += years.get(&year).copied().unwrap_or(0);
                    (year, running)
                })
                .collect();
            TimelineSeries {
                color: tag.color(),
                tag,
                points,
            }
        })
        .collect()
}
