//! Dynamic price request parameters

use atlas_core::{ViewMode, ALL_TOWNS};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use url::Url;

use crate::source::Endpoint;
use crate::{FetchError, FetchResult};

/// Which towns a price request covers
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum TownScope {
    All,
    Towns(Vec<String>),
}

impl TownScope {
    /// Scope for a town selection; a selection led by the all-towns
    /// sentinel is unscoped
    pub fn from_selection(towns: &[String]) -> Self {
        match ViewMode::for_towns(towns) {
            ViewMode::Town => TownScope::All,
            ViewMode::Street => TownScope::Towns(towns.to_vec()),
        }
    }

    /// Whether a row's town falls inside the scope
    pub fn includes(&self, town: Option<&str>) -> bool {
        match self {
            TownScope::All => true,
            TownScope::Towns(towns) => town.is_some_and(|t| {
                towns.iter().any(|selected| selected.eq_ignore_ascii_case(t))
            }),
        }
    }

    /// Comma-separated `towns` parameter, `None` when unscoped
    pub fn param(&self) -> Option<String> {
        match self {
            TownScope::All => None,
            TownScope::Towns(towns) => Some(
                towns
                    .iter()
                    .filter(|t| t.as_str() != ALL_TOWNS)
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(","),
            ),
        }
    }
}

/// Month-resolution date window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PriceWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl PriceWindow {
    /// The `years` years up to and including the month of `today`
    pub fn trailing_years(today: NaiveDate, years: u32) -> Self {
        let end = today.with_day(1).unwrap_or(today);
        let start = NaiveDate::from_ymd_opt(end.year() - years as i32, end.month(), 1).unwrap_or(end);
        Self { start, end }
    }

    /// Trailing window ending this month
    pub fn current(years: u32) -> Self {
        Self::trailing_years(chrono::Local::now().date_naive(), years)
    }

    pub fn start_param(&self) -> String {
        self.start.format("%Y-%m").to_string()
    }

    pub fn end_param(&self) -> String {
        self.end.format("%Y-%m").to_string()
    }
}

/// One dynamic price request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PriceQuery {
    pub scope: TownScope,
    pub window: PriceWindow,
}

impl PriceQuery {
    pub fn new(scope: TownScope, window: PriceWindow) -> Self {
        Self { scope, window }
    }

    /// `<base>/api/prices?towns=..&start_date=YYYY-MM&end_date=YYYY-MM`
    pub fn url(&self, base: &Url) -> FetchResult<Url> {
        let mut url = base
            .join(Endpoint::Prices.path().trim_start_matches('/'))
            .map_err(|e| FetchError::InvalidEndpoint(e.to_string()))?;

        {
            let mut pairs = url.query_pairs_mut();
            if let Some(towns) = self.scope.param() {
                pairs.append_pair("towns", &towns);
            }
            pairs.append_pair("start_date", &self.window.start_param());
            pairs.append_pair("end_date", &self.window.end_param());
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> PriceWindow {
        PriceWindow::trailing_years(NaiveDate::from_ymd_opt(2024, 6, 18).unwrap(), 3)
    }

    #[test]
    fn test_trailing_window() {
        let w = window();
        assert_eq!(w.start_param(), "2021-06");
        assert_eq!(w.end_param(), "2024-06");
    }

    #[test]
    fn test_scope_from_selection() {
        assert_eq!(TownScope::from_selection(&[]), TownScope::All);
        assert_eq!(TownScope::from_selection(&[ALL_TOWNS.to_string()]), TownScope::All);
        assert_eq!(
            TownScope::from_selection(&["BEDOK".to_string()]),
            TownScope::Towns(vec!["BEDOK".to_string()])
        );
    }

    #[test]
    fn test_scope_includes() {
        let scope = TownScope::Towns(vec!["BEDOK".into()]);
        assert!(scope.includes(Some("Bedok")));
        assert!(!scope.includes(Some("TAMPINES")));
        assert!(!scope.includes(None));
        assert!(TownScope::All.includes(None));
    }

    #[test]
    fn test_url_with_towns() {
        let base = Url::parse("http://127.0.0.1:8000/").unwrap();
        let query = PriceQuery::new(TownScope::Towns(vec!["BEDOK".into(), "ANG MO KIO".into()]), window());
        let url = query.url(&base).unwrap();

        assert_eq!(url.path(), "/api/prices");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("towns".to_string(), "BEDOK,ANG MO KIO".to_string()),
                ("start_date".to_string(), "2021-06".to_string()),
                ("end_date".to_string(), "2024-06".to_string()),
            ]
        );
    }

    #[test]
    fn test_url_without_towns() {
        let base = Url::parse("http://localhost:8000/").unwrap();
        let url = PriceQuery::new(TownScope::All, window()).url(&base).unwrap();
        assert!(url.query_pairs().all(|(k, _)| k != "towns"));
    }
}
