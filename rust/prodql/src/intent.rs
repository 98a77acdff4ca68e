//! Entity and intent extraction for production analytics questions.
//!
//! Every decision is made by an ordered table of pre-compiled patterns; the
//! first matching rule wins and unmatched dimensions fall back to defaults.
//! Extraction never fails.

use crate::{
    catalog::Catalog,
    models::{Category, ChartType, Granularity, Metric},
    time::{detect_date_spec, mentions_date, DateRange, DateSpec},
};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Structured reading of one natural-language question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryIntent {
    pub category: Category,
    /// Metric families mentioned, in canonical order. Never empty.
    pub metrics: Vec<Metric>,
    pub granularity: Granularity,
    /// Canonical machine identifiers; empty means no device filter.
    pub machines: Vec<String>,
    pub date_range: DateRange,
    pub wants_visualization: bool,
    pub chart_type: ChartType,
}

impl QueryIntent {
    /// Metric used for device resolution of single-metric queries.
    pub fn primary_metric(&self) -> Metric {
        self.metrics.first().copied().unwrap_or(Metric::Production)
    }
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static intent pattern")
}

static CASUAL_RE: Lazy<Regex> = Lazy::new(|| {
    compile(
        r"(?i)\b(?:hello|hi|hey|good\s+(?:morning|afternoon|evening)|thank\s+you|thanks|thx|bye|goodbye|ok|okay|cool|great|nice|help|who\s+are\s+you)\b",
    )
});

static DOMAIN_RE: Lazy<Regex> = Lazy::new(|| {
    compile(
        r"(?i)\b(?:stenters?|machines?|reports?|data|charts?|graphs?|plot|show|hours?|hourly|days?|daily|months?|monthly)\b",
    )
});

static METRIC_RULES: Lazy<Vec<(Regex, Metric)>> = Lazy::new(|| {
    vec![
        (
            compile(r"(?i)\b(?:production|produced?|fabric\s+length|length|output)\b"),
            Metric::Production,
        ),
        (
            compile(r"(?i)\b(?:energy|consumption|consumed|power|kwh)\b"),
            Metric::Energy,
        ),
        (
            compile(r"(?i)\b(?:utili[sz]ation|efficiency|uptime|downtime|status)\b"),
            Metric::Utilization,
        ),
    ]
});

static MACHINE_RE: Lazy<Regex> = Lazy::new(|| compile(r"(?i)\bstenter[\s_-]*(\d{1,2})\b"));

static ALL_MACHINES_RE: Lazy<Regex> = Lazy::new(|| {
    compile(r"(?i)\b(?:all|every|each)\s+(?:(?:the|of\s+the)\s+)?(?:machines?|stenters?)\b")
});

static GRANULARITY_RULES: Lazy<Vec<(Regex, Granularity)>> = Lazy::new(|| {
    vec![
        (
            compile(r"(?i)\bhourly\b|\b(?:per|by|each|every)\s+hour\b"),
            Granularity::Hourly,
        ),
        (
            compile(r"(?i)\bdaily\b|\b(?:per|by|each|every)\s+day\b"),
            Granularity::Daily,
        ),
        (
            compile(r"(?i)\bmonthly\b|\b(?:per|by|each|every)\s+month\b"),
            Granularity::Monthly,
        ),
        (compile(r"(?i)\bhours?\b"), Granularity::Hourly),
        (compile(r"(?i)\bmonths?\b"), Granularity::Monthly),
        (compile(r"(?i)\bdays?\b"), Granularity::Daily),
    ]
});

static VISUALIZATION_RE: Lazy<Regex> =
    Lazy::new(|| compile(r"(?i)\b(?:plot|chart|graph|visuali[sz]e|show)\b"));

static CHART_RULES: Lazy<Vec<(Regex, ChartType)>> = Lazy::new(|| {
    vec![
        (compile(r"(?i)\bline\b"), ChartType::Line),
        (compile(r"(?i)\bpie\b"), ChartType::Pie),
        (compile(r"(?i)\bbar\b"), ChartType::Bar),
    ]
});

/// Small talk carries no domain vocabulary. An empty query is small talk.
pub fn is_casual(query: &str) -> bool {
    let query = query.trim();
    if query.is_empty() {
        return true;
    }
    CASUAL_RE.is_match(query) && !mentions_domain(query)
}

fn mentions_domain(query: &str) -> bool {
    DOMAIN_RE.is_match(query)
        || METRIC_RULES.iter().any(|(regex, _)| regex.is_match(query))
        || mentions_date(query)
}

/// Metric families named in the query, in canonical order.
pub fn detect_metrics(query: &str) -> Vec<Metric> {
    let metrics: Vec<Metric> = METRIC_RULES
        .iter()
        .filter(|(regex, _)| regex.is_match(query))
        .map(|(_, metric)| *metric)
        .collect();
    if metrics.is_empty() {
        vec![Metric::Production]
    } else {
        metrics
    }
}

/// Explicitly named machines as unpadded identifiers, first mention first.
pub fn detect_machines(query: &str) -> Vec<String> {
    let mut machines: Vec<String> = Vec::new();
    for caps in MACHINE_RE.captures_iter(query) {
        let Ok(number) = caps[1].parse::<u32>() else {
            continue;
        };
        let id = format!("stenter{number}");
        if !machines.contains(&id) {
            machines.push(id);
        }
    }
    machines
}

pub fn detect_granularity(query: &str) -> Granularity {
    GRANULARITY_RULES
        .iter()
        .find(|(regex, _)| regex.is_match(query))
        .map(|(_, granularity)| *granularity)
        .unwrap_or(Granularity::Daily)
}

pub fn detect_chart_type(query: &str) -> ChartType {
    CHART_RULES
        .iter()
        .find(|(regex, _)| regex.is_match(query))
        .map(|(_, chart)| *chart)
        .unwrap_or_default()
}

#[derive(Debug, Clone)]
pub struct IntentExtractor {
    catalog: Arc<Catalog>,
}

impl IntentExtractor {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    /// Reads `query` relative to `today`. Deterministic in both arguments.
    ///
    /// Small talk yields `Category::Casual` with no machines and every other
    /// dimension at its default.
    pub fn extract(&self, query: &str, today: NaiveDate) -> QueryIntent {
        let reference_year = self.catalog.settings.reference_year;
        if is_casual(query) {
            return QueryIntent {
                category: Category::Casual,
                metrics: vec![Metric::Production],
                granularity: Granularity::Daily,
                machines: Vec::new(),
                date_range: DateSpec::MonthToDate.resolve(today, reference_year),
                wants_visualization: false,
                chart_type: ChartType::default(),
            };
        }

        let metrics = detect_metrics(query);
        let category = match metrics.as_slice() {
            [single] => Category::from(*single),
            _ => Category::MultiMetric,
        };

        let mut intent = QueryIntent {
            category,
            metrics,
            granularity: detect_granularity(query),
            machines: detect_machines(query),
            date_range: detect_date_spec(query).resolve(today, reference_year),
            wants_visualization: VISUALIZATION_RE.is_match(query),
            chart_type: detect_chart_type(query),
        };
        if intent.machines.is_empty() && ALL_MACHINES_RE.is_match(query) {
            intent.machines = self
                .catalog
                .mapping
                .all_identifiers(intent.primary_metric());
        }
        debug!(
            category = %intent.category,
            granularity = %intent.granularity,
            machines = intent.machines.len(),
            start = %intent.date_range.start(),
            end = %intent.date_range.end(),
            "extracted intent"
        );
        intent
    }
}
