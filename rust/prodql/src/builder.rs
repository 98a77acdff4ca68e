//! Turns a [`QueryIntent`] into executable SQL by resolving machines to
//! device names and rendering the matching catalog template.

use crate::{
    catalog::Catalog,
    error::Result,
    intent::QueryIntent,
    mapping::PerMetric,
    models::{Category, Metric},
    template::Params,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Rendered SQL plus the device resolution that went into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuiltQuery {
    pub template: String,
    pub sql: String,
    /// Device names the query is restricted to, in machine order.
    pub devices: Vec<String>,
    /// Machine identifiers that did not resolve and were left out.
    pub dropped: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceFilter {
    pub clause: String,
    pub devices: Vec<String>,
    pub dropped: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SqlBuilder {
    catalog: Arc<Catalog>,
}

impl SqlBuilder {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    /// Resolves `machines` for `metric` and renders the device predicate.
    /// Unresolvable identifiers are skipped; nothing resolved means no filter.
    pub fn build_device_filter(&self, machines: &[String], metric: Metric) -> DeviceFilter {
        let mut filter = DeviceFilter::default();
        for machine in machines {
            match self.catalog.mapping.resolve(machine, metric) {
                Some(device) => push_unique(&mut filter.devices, device),
                None => {
                    warn!(machine = %machine, metric = %metric, "no device mapped for machine, skipping");
                    filter.dropped.push(machine.clone());
                }
            }
        }

        filter.clause = match filter.devices.as_slice() {
            [] => String::new(),
            [device] => format!(
                "AND device_id = (SELECT virtual_device_id FROM devices WHERE device_name = {})",
                quote_literal(device)
            ),
            devices => format!(
                "AND device_id IN (SELECT virtual_device_id FROM devices WHERE device_name IN ({}))",
                quote_list(devices)
            ),
        };
        filter
    }

    pub fn build(&self, intent: &QueryIntent) -> Result<BuiltQuery> {
        let settings = &self.catalog.settings;
        let mut params = Params::new();
        params
            .bind("start_date", intent.date_range.start_iso())
            .bind("end_date", intent.date_range.end_iso())
            .bind("timezone", settings.timezone.as_str())
            .bind("work_start", settings.work_start.as_str())
            .bind("work_end", settings.work_end.as_str());

        let (devices, dropped) = match intent.category.metric() {
            Some(metric) => {
                let filter = self.build_device_filter(&intent.machines, metric);
                params
                    .bind("device_filter", filter.clause)
                    .bind("parameter", self.catalog.mapping.parameter(metric));
                (filter.devices, filter.dropped)
            }
            None if intent.category == Category::MultiMetric => {
                let lists = self.multi_metric_lists(&intent.machines);
                params
                    .bind("production_devices", quote_list(&lists.devices.production))
                    .bind("energy_devices", quote_list(&lists.devices.energy))
                    .bind("utilization_devices", quote_list(&lists.devices.utilization));
                for metric in Metric::ALL {
                    params.bind(parameter_binding(metric), self.catalog.mapping.parameter(metric));
                }
                let mut devices = Vec::new();
                for metric in Metric::ALL {
                    for device in lists.devices.get(metric) {
                        push_unique(&mut devices, device);
                    }
                }
                (devices, lists.dropped)
            }
            None => (Vec::new(), Vec::new()),
        };

        let template = self.catalog.templates.get(intent.category, intent.granularity)?;
        let sql = template.render(&params)?;
        debug!(
            template = %template.name,
            devices = devices.len(),
            dropped = dropped.len(),
            "rendered query"
        );

        Ok(BuiltQuery {
            template: template.name.clone(),
            sql,
            devices,
            dropped,
        })
    }

    fn multi_metric_lists(&self, machines: &[String]) -> MultiMetricLists {
        let mapping = &self.catalog.mapping;
        let mut lists = MultiMetricLists::default();

        if machines.is_empty() {
            for metric in Metric::ALL {
                *lists.devices.get_mut(metric) = mapping
                    .all_identifiers(metric)
                    .iter()
                    .filter_map(|id| mapping.resolve(id, metric).map(str::to_string))
                    .collect();
            }
            return lists;
        }

        for machine in machines {
            let resolved = mapping.multi_metric_devices(machine);
            let mut any = false;
            for metric in Metric::ALL {
                if let Some(device) = resolved.get(metric) {
                    push_unique(lists.devices.get_mut(metric), device);
                    any = true;
                }
            }
            if !any {
                warn!(machine = %machine, "no device mapped for machine under any metric, skipping");
                lists.dropped.push(machine.clone());
            }
        }
        lists
    }
}

#[derive(Debug, Default)]
struct MultiMetricLists {
    devices: PerMetric<Vec<String>>,
    dropped: Vec<String>,
}

fn parameter_binding(metric: Metric) -> &'static str {
    match metric {
        Metric::Production => "production_parameter",
        Metric::Energy => "energy_parameter",
        Metric::Utilization => "utilization_parameter",
    }
}

fn push_unique(devices: &mut Vec<String>, device: &str) {
    if !devices.iter().any(|existing| existing == device) {
        devices.push(device.to_string());
    }
}

/// Quotes `value` as a SQL string literal.
pub fn quote_literal(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}

/// Comma-separated literals; `NULL` for an empty list so `IN (NULL)` matches nothing.
pub fn quote_list<S: AsRef<str>>(values: &[S]) -> String {
    if values.is_empty() {
        return "NULL".to_string();
    }
    values
        .iter()
        .map(|value| quote_literal(value.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}
