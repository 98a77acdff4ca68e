//! Query orchestration: small talk gets a canned reply, everything else is
//! extracted and built into SQL.

use crate::{
    builder::SqlBuilder,
    catalog::Catalog,
    error::Result,
    intent::{IntentExtractor, QueryIntent},
    models::{Category, ChartType},
};
use chrono::{FixedOffset, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Decision {
    CasualReply {
        text: String,
    },
    DataQuery {
        sql: String,
        template: String,
        wants_visualization: bool,
        chart_type: ChartType,
        intent: QueryIntent,
    },
}

static REPLIES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (
            r"(?i)\b(?:thank\s+you|thanks|thx)\b",
            "You're welcome! Ask me about production, energy or utilisation whenever you need it.",
        ),
        (
            r"(?i)\b(?:bye|goodbye)\b",
            "Goodbye! Come back any time for your stenter reports.",
        ),
        (
            r"(?i)\b(?:help|who\s+are\s+you)\b",
            "I answer questions about stenter production, energy consumption and utilisation. Try \"daily production for stenter 1 in april\" or \"plot energy for all machines last 7 days\".",
        ),
        (
            r"(?i)\b(?:hello|hi|hey|good\s+(?:morning|afternoon|evening))\b",
            "Hello! What would you like to know about the stenters today?",
        ),
    ]
    .into_iter()
    .map(|(pattern, reply)| (Regex::new(pattern).expect("static reply pattern"), reply))
    .collect()
});

const FALLBACK_REPLY: &str =
    "I'm here to help with production, energy and utilisation data. What would you like to see?";

pub fn casual_reply(query: &str) -> &'static str {
    REPLIES
        .iter()
        .find(|(regex, _)| regex.is_match(query))
        .map(|(_, reply)| *reply)
        .unwrap_or(FALLBACK_REPLY)
}

/// Stateless per request; share behind an `Arc`.
#[derive(Debug, Clone)]
pub struct QueryRouter {
    extractor: IntentExtractor,
    builder: SqlBuilder,
    utc_offset: FixedOffset,
}

impl QueryRouter {
    pub fn new(catalog: Arc<Catalog>, utc_offset: FixedOffset) -> Self {
        Self {
            extractor: IntentExtractor::new(Arc::clone(&catalog)),
            builder: SqlBuilder::new(catalog),
            utc_offset,
        }
    }

    pub fn route(&self, query: &str, today: NaiveDate) -> Result<Decision> {
        let intent = self.extractor.extract(query, today);
        if intent.category == Category::Casual {
            debug!("casual query, replying without SQL");
            return Ok(Decision::CasualReply {
                text: casual_reply(query).to_string(),
            });
        }

        let built = self.builder.build(&intent)?;
        info!(
            template = %built.template,
            category = %intent.category,
            devices = built.devices.len(),
            "routed data query"
        );

        Ok(Decision::DataQuery {
            sql: built.sql,
            template: built.template,
            wants_visualization: intent.wants_visualization,
            chart_type: intent.chart_type,
            intent,
        })
    }

    /// Routes against the plant's current local date.
    pub fn route_now(&self, query: &str) -> Result<Decision> {
        self.route(query, self.today())
    }

    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.utc_offset).date_naive()
    }
}
