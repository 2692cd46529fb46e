//! URL building utilities for the fixtures endpoints

use chrono::NaiveDate;

/// Builds the URL listing every fixture on one calendar date.
///
/// # Arguments
/// * `api_domain` - The base API domain, with or without a trailing slash
/// * `date` - The calendar date to list
/// * `timezone` - Optional IANA timezone upstream uses to resolve the date
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use fixture_cache::data_fetcher::api::build_fixtures_url;
///
/// let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
/// let url = build_fixtures_url("https://api.example.com", date, None);
/// assert_eq!(url, "https://api.example.com/fixtures?date=2025-03-10");
/// ```
pub fn build_fixtures_url(api_domain: &str, date: NaiveDate, timezone: Option<&str>) -> String {
    let base = api_domain.trim_end_matches('/');
    match timezone {
        Some(tz) => format!("{base}/fixtures?date={date}&timezone={tz}"),
        None => format!("{base}/fixtures?date={date}"),
    }
}

/// Builds the URL listing every fixture currently in progress.
///
/// # Example
/// ```
/// use fixture_cache::data_fetcher::api::build_live_fixtures_url;
///
/// let url = build_live_fixtures_url("https://api.example.com/");
/// assert_eq!(url, "https://api.example.com/fixtures?live=all");
/// ```
pub fn build_live_fixtures_url(api_domain: &str) -> String {
    format!("{}/fixtures?live=all", api_domain.trim_end_matches('/'))
}
