//! Chart planning over query results: picks axes, labels and chart kinds
//! from column names and value shapes.

use crate::{
    intent::detect_metrics,
    models::{ChartType, Granularity, Metric},
};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPlan {
    pub kind: ChartType,
    pub title: String,
    pub x: String,
    pub y: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
    pub x_label: String,
    pub y_label: String,
    pub columns: Vec<ColumnMeta>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub suggestions: Vec<VizSuggestion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnMeta {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic: Option<ColumnSemantic>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnSemantic {
    Time,
    Series,
    Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VizSuggestion {
    pub kind: ChartType,
    pub x: String,
    pub y: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
}

const TIME_TOKENS: &[&str] = &["hour", "date", "day", "time", "timestamp", "month", "period"];
const MACHINE_TOKENS: &[&str] = &["machine", "stenter", "device"];
const VALUE_HINTS: &[&str] = &[
    "production",
    "length",
    "consumption",
    "energy",
    "utilization",
    "utilisation",
    "value",
];

/// Plans a chart of `chart_type` for the result set, or `None` when there is
/// nothing numeric to draw.
pub fn plan_chart(
    columns: &[String],
    rows: &[Vec<Value>],
    chart_type: ChartType,
    query: &str,
) -> Option<ChartPlan> {
    if rows.is_empty() || columns.is_empty() {
        return None;
    }

    let time_idx = columns.iter().position(|name| has_token(name, TIME_TOKENS));
    let machine_idx = columns
        .iter()
        .position(|name| has_token(name, MACHINE_TOKENS));
    let numeric = |idx: usize| Some(idx) != time_idx && Some(idx) != machine_idx && is_numeric(rows, idx);
    let value_idx = columns
        .iter()
        .enumerate()
        .find(|(idx, name)| {
            let lowered = name.to_lowercase();
            VALUE_HINTS.iter().any(|hint| lowered.contains(hint)) && numeric(*idx)
        })
        .map(|(idx, _)| idx)
        .or_else(|| (0..columns.len()).find(|idx| numeric(*idx)))?;

    let time_col = time_idx.map(|idx| columns[idx].clone());
    let machine_col = machine_idx.map(|idx| columns[idx].clone());
    let value_col = columns[value_idx].clone();
    let distinct_machines = machine_idx.map_or(0, |idx| distinct_count(rows, idx));

    let mut suggestions = Vec::new();
    if let Some(time) = &time_col {
        for kind in [ChartType::Line, ChartType::Bar] {
            suggestions.push(VizSuggestion {
                kind,
                x: time.clone(),
                y: value_col.clone(),
                series: machine_col.clone(),
            });
        }
    }
    if let (Some(machine), true) = (&machine_col, distinct_machines > 1) {
        suggestions.push(VizSuggestion {
            kind: ChartType::Pie,
            x: machine.clone(),
            y: value_col.clone(),
            series: None,
        });
    }

    // Pie slices are categories; line and bar prefer the time axis.
    let (x, series) = match chart_type {
        ChartType::Pie => (machine_col.clone().or_else(|| time_col.clone()), None),
        ChartType::Line | ChartType::Bar => match (&time_col, &machine_col) {
            (Some(time), machine) => (Some(time.clone()), machine.clone()),
            (None, machine) => (machine.clone(), None),
        },
    };
    let x = x.unwrap_or_else(|| columns[0].clone());

    let metric = metric_label(query, &value_col);
    let granularity = time_col.as_deref().map(granularity_of).unwrap_or(Granularity::Unknown);
    let title = chart_title(granularity, metric, machine_col.is_some() && distinct_machines > 1);

    let columns = columns
        .iter()
        .enumerate()
        .map(|(idx, name)| ColumnMeta {
            name: name.clone(),
            semantic: if Some(idx) == time_idx {
                Some(ColumnSemantic::Time)
            } else if Some(idx) == machine_idx {
                Some(ColumnSemantic::Series)
            } else if idx == value_idx {
                Some(ColumnSemantic::Value)
            } else {
                None
            },
        })
        .collect();

    Some(ChartPlan {
        kind: chart_type,
        title,
        x_label: axis_label(&x),
        y_label: metric.to_string(),
        x,
        y: value_col,
        series,
        columns,
        suggestions,
    })
}

fn has_token(name: &str, tokens: &[&str]) -> bool {
    name.to_lowercase()
        .split(|ch: char| !ch.is_ascii_alphanumeric())
        .any(|part| tokens.contains(&part))
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Every non-null cell parses as a number, and at least one cell is present.
fn is_numeric(rows: &[Vec<Value>], idx: usize) -> bool {
    let mut seen = false;
    for cell in rows.iter().filter_map(|row| row.get(idx)) {
        if cell.is_null() {
            continue;
        }
        if as_number(cell).is_none() {
            return false;
        }
        seen = true;
    }
    seen
}

fn distinct_count(rows: &[Vec<Value>], idx: usize) -> usize {
    rows.iter()
        .filter_map(|row| row.get(idx))
        .filter(|cell| !cell.is_null())
        .map(Value::to_string)
        .collect::<HashSet<_>>()
        .len()
}

fn granularity_of(column: &str) -> Granularity {
    if has_token(column, &["hour"]) {
        Granularity::Hourly
    } else if has_token(column, &["month"]) {
        Granularity::Monthly
    } else if has_token(column, &["date", "day", "period"]) {
        Granularity::Daily
    } else {
        Granularity::Unknown
    }
}

fn metric_label(query: &str, value_col: &str) -> &'static str {
    let metrics = detect_metrics(query);
    if let [single] = metrics.as_slice() {
        return single.label();
    }
    let lowered = value_col.to_lowercase();
    Metric::ALL
        .into_iter()
        .find(|metric| match metric {
            Metric::Production => lowered.contains("production") || lowered.contains("length"),
            Metric::Energy => lowered.contains("energy") || lowered.contains("consumption"),
            Metric::Utilization => lowered.contains("utili"),
        })
        .unwrap_or(Metric::Production)
        .label()
}

fn chart_title(granularity: Granularity, metric: &str, by_machine: bool) -> String {
    let mut title = match granularity {
        Granularity::Unknown => metric.to_string(),
        other => format!("{} {metric}", other.label()),
    };
    if by_machine {
        title.push_str(" by Machine");
    }
    title
}

fn axis_label(column: &str) -> String {
    column
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    fn daily_rows() -> Vec<Vec<Value>> {
        vec![
            vec![json!("TJ-Stenter01 Length(ioid2)"), json!("2025-06-01"), json!(1200.5)],
            vec![json!("TJ-Stenter02 Length(ioid1)"), json!("2025-06-01"), json!("980")],
            vec![json!("TJ-Stenter01 Length(ioid2)"), json!("2025-06-02"), json!(1100)],
        ]
    }

    #[test]
    fn empty_results_have_no_chart() {
        let columns = cols(&["machine", "date", "production_length"]);
        assert_eq!(plan_chart(&columns, &[], ChartType::Bar, "production"), None);
    }

    #[test]
    fn non_numeric_results_have_no_chart() {
        let columns = cols(&["machine", "note"]);
        let rows = vec![vec![json!("a"), json!("b")]];
        assert_eq!(plan_chart(&columns, &rows, ChartType::Bar, "status"), None);
    }

    #[test]
    fn daily_production_plans_time_axis_with_machine_series() {
        let columns = cols(&["machine", "date", "production_length"]);
        let plan = plan_chart(&columns, &daily_rows(), ChartType::Line, "daily production").unwrap();
        assert_eq!(plan.x, "date");
        assert_eq!(plan.y, "production_length");
        assert_eq!(plan.series.as_deref(), Some("machine"));
        assert_eq!(plan.title, "Daily Production by Machine");
        assert_eq!(plan.x_label, "Date");
        assert_eq!(plan.y_label, "Production");
        let kinds: Vec<_> = plan.suggestions.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![ChartType::Line, ChartType::Bar, ChartType::Pie]);
    }

    #[test]
    fn pie_uses_machine_categories() {
        let columns = cols(&["machine", "date", "production_length"]);
        let plan = plan_chart(&columns, &daily_rows(), ChartType::Pie, "production share").unwrap();
        assert_eq!(plan.x, "machine");
        assert_eq!(plan.series, None);
    }

    #[test]
    fn downtime_is_a_value_not_a_time_axis() {
        let columns = cols(&["machine", "hour", "utilization_percent", "downtime_percent"]);
        let rows = vec![vec![json!("TJ-Stenter03 Status"), json!("2025-06-01 08:00:00"), json!(91.2), json!(8.8)]];
        let plan = plan_chart(&columns, &rows, ChartType::Bar, "hourly utilisation").unwrap();
        assert_eq!(plan.x, "hour");
        assert_eq!(plan.y, "utilization_percent");
        assert_eq!(plan.title, "Hourly Utilisation");
        assert!(!plan.suggestions.iter().any(|s| s.kind == ChartType::Pie));
        assert_eq!(plan.columns[3].semantic, None);
    }

    #[test]
    fn multi_metric_label_follows_value_column() {
        let columns = cols(&["machine", "month", "energy_consumption", "utilization_percent"]);
        let rows = vec![vec![json!("TJ-Stenter01"), json!("2025-04-01"), json!(null), json!(88)]];
        let plan = plan_chart(&columns, &rows, ChartType::Bar, "energy and utilization").unwrap();
        assert_eq!(plan.y, "utilization_percent");
        assert_eq!(plan.y_label, "Utilisation");
        assert_eq!(plan.title, "Monthly Utilisation");
    }
}
