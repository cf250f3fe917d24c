//! Recent-price ranking of chart groups

use atlas_core::{PriceRecord, ViewMode};
use chrono::Months;
use serde::Serialize;
use std::collections::BTreeMap;

/// Months of data, counted back from the latest observation, that feed
/// the ranking
pub const RECENT_MONTHS: u32 = 6;
pub const TOP_COUNT: usize = 3;
pub const BOTTOM_COUNT: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStat {
    pub name: String,
    pub mean_price: f64,
    pub observations: usize,
}

/// Most and least expensive groups
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Ranking {
    /// Highest mean first
    pub top: Vec<GroupStat>,
    /// Lowest mean first
    pub bottom: Vec<GroupStat>,
}

/// Rank groups by mean price over the last [`RECENT_MONTHS`] of data.
/// Rows without a valid price or date are ignored.
pub fn rank_groups(records: &[PriceRecord], mode: ViewMode) -> Ranking {
    let Some(latest) = records.iter().filter_map(|r| r.date).max() else {
        return Ranking::default();
    };
    let cutoff = latest
        .checked_sub_months(Months::new(RECENT_MONTHS))
        .unwrap_or(latest);

    let mut sums: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for record in records {
        let (Some(name), Some(date), Some(price)) = (record.group_key(mode), record.date, record.price) else {
            continue;
        };
        if date <= cutoff {
            continue;
        }
        let entry = sums.entry(name).or_insert((0.0, 0));
        entry.0 += price;
        entry.1 += 1;
    }

    let mut stats: Vec<GroupStat> = sums
        .into_iter()
        .map(|(name, (sum, count))| GroupStat {
            name: name.to_string(),
            mean_price: sum / count as f64,
            observations: count,
        })
        .collect();
    stats.sort_by(|a, b| b.mean_price.total_cmp(&a.mean_price));

    let top = stats.iter().take(TOP_COUNT).cloned().collect();
    let bottom = stats.iter().rev().take(BOTTOM_COUNT).cloned().collect();
    Ranking { top, bottom }
}
