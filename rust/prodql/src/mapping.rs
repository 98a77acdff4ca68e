//! Machine mapping table: abstract machine identifiers to per-metric device names.

use crate::{
    error::{Result, ServiceError},
    models::Metric,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One value per metric family.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PerMetric<T> {
    pub production: T,
    pub energy: T,
    pub utilization: T,
}

impl<T> PerMetric<T> {
    pub fn get(&self, metric: Metric) -> &T {
        match metric {
            Metric::Production => &self.production,
            Metric::Energy => &self.energy,
            Metric::Utilization => &self.utilization,
        }
    }

    pub fn get_mut(&mut self, metric: Metric) -> &mut T {
        match metric {
            Metric::Production => &mut self.production,
            Metric::Energy => &mut self.energy,
            Metric::Utilization => &mut self.utilization,
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(Metric, &T) -> U) -> PerMetric<U> {
        PerMetric {
            production: f(Metric::Production, &self.production),
            energy: f(Metric::Energy, &self.energy),
            utilization: f(Metric::Utilization, &self.utilization),
        }
    }
}

/// Device names for one machine, resolved independently per metric.
pub type MultiMetricDevices = PerMetric<Option<String>>;

#[derive(Debug, Clone)]
pub struct MachineMapping {
    devices: PerMetric<HashMap<String, String>>,
    parameters: PerMetric<String>,
}

impl MachineMapping {
    /// Builds the table, folding aliases such as `stenter01` onto `stenter1`.
    pub fn new(
        devices: PerMetric<BTreeMap<String, String>>,
        parameters: PerMetric<String>,
    ) -> Result<Self> {
        let mut folded = PerMetric::<HashMap<String, String>>::default();
        for metric in Metric::ALL {
            let target = folded.get_mut(metric);
            for (raw, device) in devices.get(metric) {
                let device = device.trim();
                if device.is_empty() {
                    return Err(ServiceError::Config(format!(
                        "{metric} device name for '{raw}' is empty"
                    )));
                }
                let id = canonical_identifier(raw);
                if let Some(existing) = target.get(&id) {
                    if existing != device {
                        return Err(ServiceError::Config(format!(
                            "{metric} mapping for '{id}' is ambiguous: '{existing}' vs '{device}'"
                        )));
                    }
                    continue;
                }
                target.insert(id, device.to_string());
            }
        }

        Ok(Self {
            devices: folded,
            parameters,
        })
    }

    pub fn resolve(&self, identifier: &str, metric: Metric) -> Option<&str> {
        self.devices
            .get(metric)
            .get(&canonical_identifier(identifier))
            .map(String::as_str)
    }

    /// Every identifier known for `metric`, in machine-number order.
    pub fn all_identifiers(&self, metric: Metric) -> Vec<String> {
        let mut ids: Vec<String> = self.devices.get(metric).keys().cloned().collect();
        ids.sort_by_key(|id| natural_key(id));
        ids
    }

    pub fn multi_metric_devices(&self, identifier: &str) -> MultiMetricDevices {
        self.parameters
            .map(|metric, _| self.resolve(identifier, metric).map(str::to_string))
    }

    /// Value of the store's `parameter` column carrying `metric` readings.
    pub fn parameter(&self, metric: Metric) -> &str {
        self.parameters.get(metric)
    }
}

/// `Stenter 07`, `stenter_7` and `stenter7` all name the same machine.
pub fn canonical_identifier(raw: &str) -> String {
    let compact: String = raw
        .chars()
        .filter(|ch| !ch.is_whitespace() && *ch != '_' && *ch != '-')
        .flat_map(char::to_lowercase)
        .collect();
    let digits_at = compact
        .find(|ch: char| ch.is_ascii_digit())
        .unwrap_or(compact.len());
    let (prefix, number) = compact.split_at(digits_at);
    if number.is_empty() || !number.chars().all(|ch| ch.is_ascii_digit()) {
        return compact;
    }
    let trimmed = number.trim_start_matches('0');
    format!("{prefix}{}", if trimmed.is_empty() { "0" } else { trimmed })
}

fn natural_key(id: &str) -> (String, u64) {
    let digits_at = id.find(|ch: char| ch.is_ascii_digit()).unwrap_or(id.len());
    let (prefix, number) = id.split_at(digits_at);
    (prefix.to_string(), number.parse().unwrap_or(u64::MAX))
}
