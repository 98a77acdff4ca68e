//! Named-placeholder SQL templates keyed by `(category, granularity)`.
//!
//! Placeholders are written `{name}`; `{{` and `}}` produce literal braces.

use crate::{
    error::{Result, ServiceError},
    models::{Category, Granularity},
};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

/// Bindings understood by single-metric templates.
pub const SINGLE_METRIC_BINDINGS: &[&str] = &[
    "device_filter",
    "start_date",
    "end_date",
    "parameter",
    "timezone",
    "work_start",
    "work_end",
];

/// Bindings understood by multi-metric templates.
pub const MULTI_METRIC_BINDINGS: &[&str] = &[
    "production_devices",
    "energy_devices",
    "utilization_devices",
    "production_parameter",
    "energy_parameter",
    "utilization_parameter",
    "start_date",
    "end_date",
    "timezone",
    "work_start",
    "work_end",
];

pub fn allowed_bindings(category: Category) -> &'static [&'static str] {
    match category {
        Category::Production | Category::Energy | Category::Utilization => SINGLE_METRIC_BINDINGS,
        Category::MultiMetric => MULTI_METRIC_BINDINGS,
        Category::Casual => &[],
    }
}

/// Values bound to placeholder names for one render.
#[derive(Debug, Clone, Default)]
pub struct Params {
    values: BTreeMap<&'static str, String>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, name: &'static str, value: impl Into<String>) -> &mut Self {
        self.values.insert(name, value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SqlTemplate {
    pub name: String,
    pub category: Category,
    pub granularity: Granularity,
    #[serde(rename = "sql")]
    pub body: String,
}

#[derive(Debug, PartialEq, Eq)]
enum Segment<'a> {
    Text(&'a str),
    Brace(char),
    Placeholder(&'a str),
}

impl SqlTemplate {
    pub fn new(
        name: impl Into<String>,
        category: Category,
        granularity: Granularity,
        body: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            granularity,
            body: body.into(),
        }
    }

    /// Placeholder names in order of appearance, repeats included.
    pub fn placeholders(&self) -> Result<Vec<&str>> {
        Ok(self
            .segments()?
            .into_iter()
            .filter_map(|segment| match segment {
                Segment::Placeholder(name) => Some(name),
                _ => None,
            })
            .collect())
    }

    pub fn render(&self, params: &Params) -> Result<String> {
        let mut out = String::with_capacity(self.body.len() + 256);
        for segment in self.segments()? {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Brace(ch) => out.push(ch),
                Segment::Placeholder(name) => {
                    let value = params.get(name).ok_or_else(|| self.missing(name))?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }

    fn segments(&self) -> Result<Vec<Segment<'_>>> {
        let body = self.body.as_str();
        let mut segments = Vec::new();
        let mut text_start = 0;
        let mut idx = 0;
        let bytes = body.as_bytes();

        while idx < bytes.len() {
            match bytes[idx] {
                b'{' | b'}' if bytes.get(idx + 1) == Some(&bytes[idx]) => {
                    segments.push(Segment::Text(&body[text_start..idx]));
                    segments.push(Segment::Brace(bytes[idx] as char));
                    idx += 2;
                    text_start = idx;
                }
                b'{' => {
                    let close = body[idx + 1..]
                        .find(|ch: char| ch == '}' || ch == '{' || ch == '\n')
                        .map(|offset| idx + 1 + offset)
                        .filter(|end| bytes[*end] == b'}');
                    let Some(close) = close else {
                        let fragment: String = body[idx..].chars().take(24).collect();
                        return Err(self.missing(&fragment));
                    };
                    segments.push(Segment::Text(&body[text_start..idx]));
                    segments.push(Segment::Placeholder(body[idx + 1..close].trim()));
                    idx = close + 1;
                    text_start = idx;
                }
                _ => idx += 1,
            }
        }
        segments.push(Segment::Text(&body[text_start..]));
        segments.retain(|segment| *segment != Segment::Text(""));
        Ok(segments)
    }

    fn missing(&self, placeholder: &str) -> ServiceError {
        ServiceError::MissingParameter {
            template: self.name.clone(),
            placeholder: placeholder.to_string(),
        }
    }
}

/// Registry of templates; at most one per `(category, granularity)`.
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    templates: HashMap<(Category, Granularity), SqlTemplate>,
}

impl TemplateSet {
    /// Registers every template after validating it, rejecting duplicate keys.
    pub fn new(templates: impl IntoIterator<Item = SqlTemplate>) -> Result<Self> {
        let mut set = Self::default();
        for template in templates {
            set.validate(&template)?;
            let key = (template.category, template.granularity);
            if let Some(existing) = set.templates.get(&key) {
                return Err(ServiceError::Config(format!(
                    "templates '{}' and '{}' both register {} {}",
                    existing.name, template.name, key.0, key.1
                )));
            }
            set.templates.insert(key, template);
        }
        Ok(set)
    }

    pub fn get(&self, category: Category, granularity: Granularity) -> Result<&SqlTemplate> {
        self.templates
            .get(&(category, granularity))
            .ok_or_else(|| ServiceError::TemplateNotFound {
                category: category.to_string(),
                granularity: granularity.to_string(),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &SqlTemplate> {
        self.templates.values()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    fn validate(&self, template: &SqlTemplate) -> Result<()> {
        if template.category == Category::Casual {
            return Err(ServiceError::Config(format!(
                "template '{}' cannot serve casual queries",
                template.name
            )));
        }
        let allowed = allowed_bindings(template.category);
        let placeholders = template
            .placeholders()
            .map_err(|err| ServiceError::Config(err.to_string()))?;
        if let Some(unknown) = placeholders.iter().find(|name| !allowed.contains(*name)) {
            return Err(ServiceError::Config(format!(
                "template '{}' references unknown placeholder '{unknown}'",
                template.name
            )));
        }
        Ok(())
    }
}
