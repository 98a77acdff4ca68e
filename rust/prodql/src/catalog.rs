//! Static query catalog: machine mappings, metric parameters, SQL templates
//! and analysis settings. Loaded once at startup and shared read-only.

use crate::{
    error::{Result, ServiceError},
    mapping::{MachineMapping, PerMetric},
    models::Metric,
    template::{SqlTemplate, TemplateSet},
};
use chrono::NaiveTime;
use serde::Deserialize;
use std::{collections::BTreeMap, fs, path::Path};
use tracing::info;

const EMBEDDED_CATALOG: &str = include_str!("../config/catalog.toml");

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AnalysisSettings {
    /// Year that bare month names ("april") resolve into.
    #[serde(default = "default_reference_year")]
    pub reference_year: i32,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_work_start")]
    pub work_start: String,
    #[serde(default = "default_work_end")]
    pub work_end: String,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            reference_year: default_reference_year(),
            timezone: default_timezone(),
            work_start: default_work_start(),
            work_end: default_work_end(),
        }
    }
}

const fn default_reference_year() -> i32 {
    2025
}

fn default_timezone() -> String {
    "Asia/Colombo".to_string()
}

fn default_work_start() -> String {
    "07:30:00".to_string()
}

fn default_work_end() -> String {
    "19:30:00".to_string()
}

#[derive(Debug, Deserialize)]
struct RawCatalog {
    #[serde(default)]
    settings: AnalysisSettings,
    parameters: PerMetric<String>,
    machines: PerMetric<BTreeMap<String, String>>,
    #[serde(default)]
    templates: Vec<SqlTemplate>,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    pub settings: AnalysisSettings,
    pub mapping: MachineMapping,
    pub templates: TemplateSet,
}

impl Catalog {
    /// The catalog compiled into the binary.
    pub fn embedded() -> Result<Self> {
        Self::from_toml_str(EMBEDDED_CATALOG)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|err| {
            ServiceError::Config(format!("failed to read catalog {}: {err}", path.display()))
        })?;
        let catalog = Self::from_toml_str(&raw)?;
        info!(path = %path.display(), templates = catalog.templates.len(), "loaded query catalog");
        Ok(catalog)
    }

    /// Reads `path` when given, otherwise falls back to the embedded catalog.
    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::from_path(path),
            None => Self::embedded(),
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let raw: RawCatalog = toml::from_str(raw)
            .map_err(|err| ServiceError::Config(format!("invalid catalog: {err}")))?;
        validate_settings(&raw.settings)?;
        validate_parameters(&raw.parameters)?;

        Ok(Self {
            mapping: MachineMapping::new(raw.machines, raw.parameters)?,
            templates: TemplateSet::new(raw.templates)?,
            settings: raw.settings,
        })
    }
}

fn validate_settings(settings: &AnalysisSettings) -> Result<()> {
    for (field, value) in [
        ("work_start", &settings.work_start),
        ("work_end", &settings.work_end),
    ] {
        NaiveTime::parse_from_str(value, "%H:%M:%S").map_err(|_| {
            ServiceError::Config(format!("{field} must be HH:MM:SS, got '{value}'"))
        })?;
    }

    let tz_ok = !settings.timezone.is_empty()
        && settings
            .timezone
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '/' | '_' | '-' | '+'));
    if !tz_ok {
        return Err(ServiceError::Config(format!(
            "timezone '{}' is not a valid zone name",
            settings.timezone
        )));
    }

    Ok(())
}

/// Parameter names are interpolated into SQL string literals unquoted.
fn validate_parameters(parameters: &PerMetric<String>) -> Result<()> {
    for metric in Metric::ALL {
        let value = parameters.get(metric);
        let ok = !value.is_empty()
            && value
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.'));
        if !ok {
            return Err(ServiceError::Config(format!(
                "{metric} parameter '{value}' may only contain letters, digits, '_', '-' or '.'"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Granularity};

    const MINIMAL: &str = r#"
[parameters]
production = "length"
energy = "TotalEnergy"
utilization = "status"

[machines.production]
stenter01 = "TJ-Stenter01 Length(ioid2)"

[machines.energy]

[machines.utilization]
"#;

    #[test]
    fn embedded_catalog_loads() {
        let catalog = Catalog::embedded().unwrap();
        assert_eq!(catalog.settings.reference_year, 2025);
        assert_eq!(catalog.settings.timezone, "Asia/Colombo");
        assert_eq!(catalog.templates.len(), 11);
        assert_eq!(catalog.mapping.all_identifiers(Metric::Energy).len(), 9);
        assert_eq!(
            catalog.mapping.resolve("stenter7", Metric::Energy),
            Some("TJ-Stenter07A")
        );
        assert!(catalog
            .templates
            .get(Category::MultiMetric, Granularity::Hourly)
            .is_err());
    }

    #[test]
    fn settings_default_when_omitted() {
        let catalog = Catalog::from_toml_str(MINIMAL).unwrap();
        assert_eq!(catalog.settings, AnalysisSettings::default());
        assert!(catalog.templates.is_empty());
        assert_eq!(
            catalog.mapping.resolve("stenter1", Metric::Production),
            Some("TJ-Stenter01 Length(ioid2)")
        );
    }

    #[test]
    fn malformed_work_hours_are_rejected() {
        let raw = format!("[settings]\nwork_start = \"7am\"\n{MINIMAL}");
        let err = Catalog::from_toml_str(&raw).unwrap_err();
        assert!(err.to_string().contains("work_start"));
    }

    #[test]
    fn timezone_cannot_carry_sql() {
        let raw = format!("[settings]\ntimezone = \"UTC'; DROP TABLE devices\"\n{MINIMAL}");
        assert!(matches!(
            Catalog::from_toml_str(&raw),
            Err(ServiceError::Config(_))
        ));
    }

    #[test]
    fn parameters_cannot_carry_sql() {
        let raw = MINIMAL.replace(
            r#"energy = "TotalEnergy""#,
            r#"energy = "TotalEnergy' OR '1' = '1""#,
        );
        let err = Catalog::from_toml_str(&raw).unwrap_err();
        assert!(matches!(err, ServiceError::Config(ref msg) if msg.contains("energy parameter")));

        let raw = MINIMAL.replace(r#"utilization = "status""#, r#"utilization = """#);
        assert!(Catalog::from_toml_str(&raw).is_err());
    }

    #[test]
    fn missing_catalog_file_is_a_config_error() {
        let err = Catalog::from_path("/nonexistent/catalog.toml").unwrap_err();
        assert!(matches!(err, ServiceError::Config(_)));
    }
}
