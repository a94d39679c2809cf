//! OpenSearch index naming.
//!
//! The target index is partitioned by calendar month. Its name is resolved
//! from a template once, at startup, and stays fixed for the process
//! lifetime: a process running across a month boundary keeps writing to the
//! index resolved at start.

use chrono::NaiveDate;

/// Placeholder in the index-name template, replaced with the year-month at
/// resolution time.
pub const DATE_PLACEHOLDER: &str = "{DATE}";

/// The default index-name template.
pub const DEFAULT_INDEX_TEMPLATE: &str = "carpark-availability-{DATE}";

/// Configuration for the search index.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// The resolved index name (used for all operations).
    pub name: String,
}

impl IndexConfig {
    /// Create a configuration with an already-resolved index name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Resolve an index-name template against the given date.
    ///
    /// Every occurrence of `{DATE}` is replaced with `YYYY-MM`. A template
    /// without the placeholder is used as-is.
    ///
    /// # Arguments
    ///
    /// * `template` - The index-name template (e.g. `carpark-availability-{DATE}`)
    /// * `at` - The date whose year-month fills the placeholder
    pub fn from_template(template: &str, at: NaiveDate) -> Self {
        let year_month = at.format("%Y-%m").to_string();
        Self {
            name: template.replace(DATE_PLACEHOLDER, &year_month),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_from_template_resolves_year_month() {
        let config = IndexConfig::from_template(DEFAULT_INDEX_TEMPLATE, date(2024, 1, 15));
        assert_eq!(config.name, "carpark-availability-2024-01");
    }

    #[test]
    fn test_from_template_pads_single_digit_month() {
        let config = IndexConfig::from_template(DEFAULT_INDEX_TEMPLATE, date(2025, 9, 1));
        assert_eq!(config.name, "carpark-availability-2025-09");
    }

    #[test]
    fn test_from_template_without_placeholder() {
        let config = IndexConfig::from_template("fixed-name", date(2024, 1, 15));
        assert_eq!(config.name, "fixed-name");
    }

    #[test]
    fn test_from_template_replaces_all_occurrences() {
        let config = IndexConfig::from_template("{DATE}-carpark-{DATE}", date(2024, 3, 2));
        assert_eq!(config.name, "2024-03-carpark-2024-03");
    }
}
