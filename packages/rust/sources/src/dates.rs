//! Date parsing for the product and project tables.
//!
//! Products carry `YYYY.M` stamps with a zero-based month. Projects carry
//! free-form dates in whatever format the spreadsheet export produced.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;

use osccat_shared::{CatalogError, Result};

/// `YYYY` on its own.
static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})$").expect("year regex"));

/// `YYYY-MM` without a day.
static YEAR_MONTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{1,2})$").expect("year-month regex"));

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

// Slash dates are month-first unless that is impossible, then day-first.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%Y/%m/%d",
    "%d.%m.%Y",
    "%d %B %Y",
    "%B %d, %Y",
    "%B %d %Y",
];

/// Parse a product `Start`/`End` stamp.
///
/// `"2017.0"` is January 2017, `"2017.11"` is December 2017. Empty input
/// means the date is unknown.
pub fn parse_product_date(source: &str) -> Result<Option<NaiveDateTime>> {
    let source = source.trim();
    if source.is_empty() {
        return Ok(None);
    }

    let (year, month) = source
        .split_once('.')
        .ok_or_else(|| CatalogError::parse(format!("product date '{source}' is not YYYY.M")))?;

    let year: i32 = year
        .parse()
        .map_err(|_| CatalogError::parse(format!("product date '{source}' has a bad year")))?;
    let month_index: u32 = month
        .parse()
        .map_err(|_| CatalogError::parse(format!("product date '{source}' has a bad month")))?;

    NaiveDate::from_ymd_opt(year, month_index.saturating_add(1), 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(Some)
        .ok_or_else(|| {
            CatalogError::parse(format!(
                "product date '{source}': month index {month_index} is outside 0..=11"
            ))
        })
}

/// Parse a project start or end date.
pub fn parse_project_date(source: &str) -> Result<NaiveDateTime> {
    let source = source.trim();
    if source.is_empty() {
        return Err(CatalogError::parse("project date is empty"));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(source) {
        return Ok(dt.naive_local());
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(source, fmt) {
            return Ok(dt);
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(source, fmt) {
            return Ok(midnight(d));
        }
    }

    if let Some(caps) = YEAR_MONTH_RE.captures(source) {
        let year: i32 = caps[1].parse().unwrap_or_default();
        let month: u32 = caps[2].parse().unwrap_or_default();
        if let Some(d) = NaiveDate::from_ymd_opt(year, month, 1) {
            return Ok(midnight(d));
        }
    }

    if let Some(caps) = YEAR_RE.captures(source) {
        let year: i32 = caps[1].parse().unwrap_or_default();
        if let Some(d) = NaiveDate::from_ymd_opt(year, 1, 1) {
            return Ok(midnight(d));
        }
    }

    Err(CatalogError::parse(format!("unrecognized date '{source}'")))
}

/// ISO 8601 without offset, e.g. `2021-03-01T00:00:00`.
pub fn iso_local(dt: &NaiveDateTime) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// STAC `datetime` value (UTC, `Z` suffix).
pub fn stac_datetime(dt: &NaiveDateTime) -> String {
    dt.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

fn midnight(d: NaiveDate) -> NaiveDateTime {
    d.and_hms_opt(0, 0, 0).unwrap_or_default()
}
