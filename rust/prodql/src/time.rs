//! Date utilities for translating natural-language date expressions to calendar ranges.

use chrono::{Datelike, Duration, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Inclusive calendar range. Bounds are kept ordered by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn start_iso(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    pub fn end_iso(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }
}

/// A date expression found in a query, not yet anchored to a calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSpec {
    /// Named month (1-12) of the reference year.
    Month(u32),
    RelativeDays(i64),
    Yesterday,
    Today,
    /// Nothing matched: first of the current month through today.
    MonthToDate,
}

impl DateSpec {
    pub fn resolve(&self, today: NaiveDate, reference_year: i32) -> DateRange {
        match *self {
            DateSpec::Month(month) => {
                month_bounds(reference_year, month).unwrap_or_else(|| month_to_date(today))
            }
            DateSpec::RelativeDays(days) => {
                let start = today
                    .checked_sub_signed(Duration::days(days))
                    .unwrap_or(NaiveDate::MIN);
                DateRange::new(start, today)
            }
            DateSpec::Yesterday => {
                let day = today.pred_opt().unwrap_or(today);
                DateRange::new(day, day)
            }
            DateSpec::Today => DateRange::new(today, today),
            DateSpec::MonthToDate => month_to_date(today),
        }
    }
}

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

static MONTH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)\b({})\b", MONTHS.join("|"))).expect("month pattern")
});

/// Months that double as everyday words ("may I", "march through").
const AMBIGUOUS_MONTHS: [u32; 2] = [3, 5];

static MONTH_LEAD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:in|for|during|of|since|until|till|through|from|to|last|this|early|mid|late)\s+$")
        .expect("month lead pattern")
});

static MONTH_TRAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\s,]+\d{4}\b").expect("month trail pattern"));

#[derive(Debug, Clone, Copy)]
enum Relative {
    Days,
    Weeks,
    Week,
    Yesterday,
    Today,
}

static RELATIVE_RULES: Lazy<Vec<(Regex, Relative)>> = Lazy::new(|| {
    [
        (r"(?i)\b(?:last|past|previous)\s+(\d{1,3})\s+days?\b", Relative::Days),
        (r"(?i)\b(?:last|past|previous)\s+(\d{1,2})\s+weeks?\b", Relative::Weeks),
        (r"(?i)\b(?:last|past|previous)\s+week\b", Relative::Week),
        (r"(?i)\byesterday\b", Relative::Yesterday),
        (r"(?i)\btoday\b", Relative::Today),
    ]
    .into_iter()
    .map(|(pattern, rule)| (Regex::new(pattern).expect("relative date pattern"), rule))
    .collect()
});

impl Relative {
    fn to_spec(self, caps: &regex::Captures<'_>) -> Option<DateSpec> {
        let count = || caps.get(1)?.as_str().parse::<i64>().ok();
        match self {
            Relative::Days => count().map(DateSpec::RelativeDays),
            Relative::Weeks => count().map(|weeks| DateSpec::RelativeDays(weeks * 7)),
            Relative::Week => Some(DateSpec::RelativeDays(7)),
            Relative::Yesterday => Some(DateSpec::Yesterday),
            Relative::Today => Some(DateSpec::Today),
        }
    }
}

/// Finds the highest-priority date expression: month names, then relative phrases.
pub fn detect_date_spec(query: &str) -> DateSpec {
    if let Some(month) = detect_month(query) {
        return DateSpec::Month(month);
    }

    for (regex, rule) in RELATIVE_RULES.iter() {
        if let Some(spec) = regex.captures(query).and_then(|caps| rule.to_spec(&caps)) {
            return spec;
        }
    }

    DateSpec::MonthToDate
}

/// Whether the query names any date at all.
pub fn mentions_date(query: &str) -> bool {
    detect_date_spec(query) != DateSpec::MonthToDate
}

/// First month name used as a month. "may" and "march" need a leading
/// preposition ("in may") or a trailing year ("march 2025").
fn detect_month(query: &str) -> Option<u32> {
    MONTH_RE.captures_iter(query).find_map(|caps| {
        let name = caps.get(1)?;
        let month = month_number(name.as_str())?;
        if AMBIGUOUS_MONTHS.contains(&month)
            && !MONTH_LEAD_RE.is_match(&query[..name.start()])
            && !MONTH_TRAIL_RE.is_match(&query[name.end()..])
        {
            return None;
        }
        Some(month)
    })
}

fn month_number(name: &str) -> Option<u32> {
    let lowered = name.to_lowercase();
    MONTHS
        .iter()
        .position(|candidate| *candidate == lowered)
        .map(|idx| idx as u32 + 1)
}

fn month_bounds(year: i32, month: u32) -> Option<DateRange> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some(DateRange::new(first, next_first.pred_opt()?))
}

fn month_to_date(today: NaiveDate) -> DateRange {
    DateRange::new(today.with_day(1).unwrap_or(today), today)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn month_names_resolve_to_full_reference_year_month() {
        let today = date(2026, 10, 19);
        let cases = [
            ("production in april", (date(2025, 4, 1), date(2025, 4, 30))),
            ("data for MARCH", (date(2025, 3, 1), date(2025, 3, 31))),
            ("may 2025 report", (date(2025, 5, 1), date(2025, 5, 31))),
            ("production in may", (date(2025, 5, 1), date(2025, 5, 31))),
            ("February energy", (date(2025, 2, 1), date(2025, 2, 28))),
            ("december utilisation", (date(2025, 12, 1), date(2025, 12, 31))),
        ];
        for (query, (start, end)) in cases {
            let range = detect_date_spec(query).resolve(today, 2025);
            assert_eq!((range.start(), range.end()), (start, end), "query: {query}");
        }
    }

    #[test]
    fn leap_year_february_ends_on_the_29th() {
        let range = DateSpec::Month(2).resolve(date(2024, 6, 1), 2024);
        assert_eq!(range.end(), date(2024, 2, 29));
    }

    #[test]
    fn month_name_outranks_relative_phrase() {
        assert_eq!(
            detect_date_spec("april compared to the last 7 days"),
            DateSpec::Month(4)
        );
    }

    #[test]
    fn modal_may_and_verb_march_are_not_months() {
        let today = date(2025, 6, 15);
        for query in [
            "may I see today's production for stenter 2",
            "can you march me through production today",
        ] {
            let range = detect_date_spec(query).resolve(today, 2025);
            assert_eq!((range.start(), range.end()), (today, today), "query: {query}");
        }
        assert_eq!(
            detect_date_spec("may I compare march 2025 with april"),
            DateSpec::Month(3)
        );
        assert_eq!(detect_date_spec("may I see output"), DateSpec::MonthToDate);
    }

    #[test]
    fn month_names_need_word_boundaries() {
        assert_eq!(detect_date_spec("show marching orders"), DateSpec::MonthToDate);
    }

    #[test]
    fn relative_week_spans_seven_days() {
        let today = date(2025, 6, 15);
        for query in ["last 7 days production", "energy for the past week"] {
            let range = detect_date_spec(query).resolve(today, 2025);
            assert_eq!(range.start(), date(2025, 6, 8), "query: {query}");
            assert_eq!(range.end(), today);
            assert_eq!((range.end() - range.start()).num_days(), 7);
        }
    }

    #[test]
    fn relative_days_accept_any_count() {
        let range = detect_date_spec("past 30 days").resolve(date(2025, 6, 15), 2025);
        assert_eq!(range.start(), date(2025, 5, 16));
    }

    #[test]
    fn yesterday_and_today_are_single_days() {
        let today = date(2025, 3, 1);
        let range = detect_date_spec("yesterday's output").resolve(today, 2025);
        assert_eq!((range.start(), range.end()), (date(2025, 2, 28), date(2025, 2, 28)));

        let range = detect_date_spec("output today").resolve(today, 2025);
        assert_eq!((range.start(), range.end()), (today, today));
    }

    #[test]
    fn defaults_to_month_to_date() {
        let range = detect_date_spec("show production").resolve(date(2025, 6, 15), 2025);
        assert_eq!(range.start_iso(), "2025-06-01");
        assert_eq!(range.end_iso(), "2025-06-15");
    }

    #[test]
    fn range_constructor_orders_bounds() {
        let range = DateRange::new(date(2025, 6, 15), date(2025, 6, 1));
        assert!(range.start() <= range.end());
        assert_eq!(
            serde_json::to_value(range).unwrap(),
            serde_json::json!({"start": "2025-06-01", "end": "2025-06-15"})
        );
    }
}
