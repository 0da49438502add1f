use std::fmt::Write;

use chrono::NaiveDate;

pub const DEFAULT_TITLE_FORMAT: &str = "%b %Y";

/// What a formatted date is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    ShortWeekday,
    NumericDay,
    MonthTitle,
    SlashDate,
}

pub trait DateFormatter {
    fn format(&self, date: NaiveDate, kind: DateFormat) -> String;
}

/// strftime-backed formatter; only the month title pattern is configurable.
#[derive(Debug, Clone)]
pub struct ChronoFormatter {
    title_format: String,
}

impl ChronoFormatter {
    pub fn new(title_format: impl Into<String>) -> Self {
        Self {
            title_format: title_format.into(),
        }
    }
}

impl Default for ChronoFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_TITLE_FORMAT)
    }
}

impl DateFormatter for ChronoFormatter {
    fn format(&self, date: NaiveDate, kind: DateFormat) -> String {
        let pattern = match kind {
            DateFormat::ShortWeekday => "%a",
            DateFormat::NumericDay => "%-d",
            DateFormat::MonthTitle => self.title_format.as_str(),
            DateFormat::SlashDate => "%m/%d/%Y",
        };
        try_format(date, pattern)
            .or_else(|| try_format(date, DEFAULT_TITLE_FORMAT))
            .unwrap_or_default()
    }
}

fn try_format(date: NaiveDate, pattern: &str) -> Option<String> {
    let mut out = String::new();
    write!(out, "{}", date.format(pattern)).ok()?;
    Some(out)
}

/// Checks that a strftime pattern can render a plain date. Time and zone
/// specifiers fail here since a date carries neither.
pub fn validate_pattern(pattern: &str) -> bool {
    if pattern.trim().is_empty() {
        return false;
    }
    let sample_date = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or(NaiveDate::MIN);
    try_format(sample_date, pattern).is_some()
}
