//! Vocabulary shared by the extractor, the mapping table and the SQL builder.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Metric family a device stream belongs to. Mapping lookups are always scoped by one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Production,
    Energy,
    Utilization,
}

impl Metric {
    /// Canonical order used whenever several metrics are reported together.
    pub const ALL: [Metric; 3] = [Metric::Production, Metric::Energy, Metric::Utilization];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Production => "production",
            Metric::Energy => "energy",
            Metric::Utilization => "utilization",
        }
    }

    /// Label used in chart titles and axis names.
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Production => "Production",
            Metric::Energy => "Consumption",
            Metric::Utilization => "Utilisation",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Production,
    Energy,
    Utilization,
    MultiMetric,
    Casual,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Production => "production",
            Category::Energy => "energy",
            Category::Utilization => "utilization",
            Category::MultiMetric => "multi_metric",
            Category::Casual => "casual",
        }
    }

    /// The single metric family behind a single-metric category.
    pub fn metric(&self) -> Option<Metric> {
        match self {
            Category::Production => Some(Metric::Production),
            Category::Energy => Some(Metric::Energy),
            Category::Utilization => Some(Metric::Utilization),
            Category::MultiMetric | Category::Casual => None,
        }
    }
}

impl From<Metric> for Category {
    fn from(metric: Metric) -> Self {
        match metric {
            Metric::Production => Category::Production,
            Metric::Energy => Category::Energy,
            Metric::Utilization => Category::Utilization,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Hourly,
    Daily,
    Monthly,
    Unknown,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Hourly => "hourly",
            Granularity::Daily => "daily",
            Granularity::Monthly => "monthly",
            Granularity::Unknown => "unknown",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Granularity::Hourly => "Hourly",
            Granularity::Daily => "Daily",
            Granularity::Monthly => "Monthly",
            Granularity::Unknown => "",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartType {
    #[default]
    Bar,
    Line,
    Pie,
}

impl ChartType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::Bar => "bar",
            ChartType::Line => "line",
            ChartType::Pie => "pie",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_snake_case_names() {
        assert_eq!(
            serde_json::to_value(Category::MultiMetric).unwrap(),
            serde_json::json!("multi_metric")
        );
        assert_eq!(
            serde_json::to_value(Granularity::Hourly).unwrap(),
            serde_json::json!("hourly")
        );
        assert_eq!(Category::MultiMetric.to_string(), "multi_metric");
    }

    #[test]
    fn single_metric_categories_map_back_to_metrics() {
        for metric in Metric::ALL {
            assert_eq!(Category::from(metric).metric(), Some(metric));
        }
        assert_eq!(Category::MultiMetric.metric(), None);
        assert_eq!(Category::Casual.metric(), None);
    }
}
