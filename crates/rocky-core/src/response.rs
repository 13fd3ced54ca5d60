//! Turn output contract
//!
//! Every turn yields a `TurnResponse`: a message, a kind, and an optional
//! payload the presenter renders (results table, detail record, chart).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::chart::ChartSeries;
use crate::models::Opportunity;

/// Record fields rendered as percentages in the detail view.
const PERCENT_FIELDS: &[&str] = &[
    "apy", "apyBase", "apyReward", "apyPct1D", "apyPct7D", "apyPct30D", "apyMean30d",
];

const LIST_FIELDS: &[&str] = &["rewardTokens", "underlyingTokens"];

const NOT_AVAILABLE: &str = "No disponible";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    None,
    Results,
    Details,
    Chart,
    Error,
}

/// One row of the results table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub position: usize,
    pub chain: String,
    pub project: String,
    pub symbol: String,
    #[serde(rename = "tvlUsd")]
    pub tvl_usd: String,
    pub apy: String,
    #[serde(rename = "ilRisk")]
    pub il_risk: String,
    pub exposure: String,
}

impl ResultRow {
    pub fn from_opportunity(position: usize, opp: &Opportunity) -> Self {
        Self {
            position,
            chain: opp.chain.clone(),
            project: opp.project.clone(),
            symbol: opp.symbol.clone(),
            tvl_usd: opp.tvl_usd.map(format_usd).unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            apy: opp.apy.map(format_percent).unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            il_risk: opp.il_risk.clone(),
            exposure: opp.exposure.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Payload {
    Results(Vec<ResultRow>),
    Details(Map<String, Value>),
    Chart(Vec<ChartSeries>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnResponse {
    pub message: String,
    pub kind: ResponseKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
}

impl TurnResponse {
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: ResponseKind::None,
            payload: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: ResponseKind::Error,
            payload: None,
        }
    }

    pub fn results(message: impl Into<String>, rows: Vec<ResultRow>) -> Self {
        Self {
            message: message.into(),
            kind: ResponseKind::Results,
            payload: Some(Payload::Results(rows)),
        }
    }

    pub fn details(message: impl Into<String>, record: Map<String, Value>) -> Self {
        Self {
            message: message.into(),
            kind: ResponseKind::Details,
            payload: Some(Payload::Details(record)),
        }
    }

    pub fn chart(message: impl Into<String>, series: Vec<ChartSeries>) -> Self {
        Self {
            message: message.into(),
            kind: ResponseKind::Chart,
            payload: Some(Payload::Chart(series)),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == ResponseKind::Error
    }
}

// =============================================================================
// Conversation history
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One message of the conversation, kept for replay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Payload>,
}

// =============================================================================
// Formatting
// =============================================================================

/// `1234567.891` → `$1,234,567.89`
pub fn format_usd(value: f64) -> String {
    if !value.is_finite() {
        return NOT_AVAILABLE.to_string();
    }

    let cents = (value.abs() * 100.0).round() as u128;
    let digits = (cents / 100).to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, grouped, cents % 100)
}

pub fn format_percent(value: f64) -> String {
    if !value.is_finite() {
        return NOT_AVAILABLE.to_string();
    }
    format!("{:.2}%", value)
}

/// Full record of an opportunity with money, percentage and list fields
/// rendered for display.
pub fn format_details(opp: &Opportunity) -> Map<String, Value> {
    let Ok(Value::Object(raw)) = serde_json::to_value(opp) else {
        return Map::new();
    };

    raw.into_iter()
        .map(|(key, value)| {
            let rendered = if key == "tvlUsd" {
                Value::String(value.as_f64().map(format_usd).unwrap_or_else(|| NOT_AVAILABLE.to_string()))
            } else if PERCENT_FIELDS.contains(&key.as_str()) {
                Value::String(value.as_f64().map(format_percent).unwrap_or_else(|| NOT_AVAILABLE.to_string()))
            } else if LIST_FIELDS.contains(&key.as_str()) {
                let joined = value
                    .as_array()
                    .map(|items| {
                        items
                            .iter()
                            .filter_map(|v| v.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    })
                    .filter(|s| !s.is_empty());
                Value::String(joined.unwrap_or_else(|| "Ninguno".to_string()))
            } else {
                value
            };
            (key, rendered)
        })
        .collect()
}
