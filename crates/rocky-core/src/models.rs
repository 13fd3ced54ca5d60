//! Data models shared by the extractor, the agent and the search
//!
//! `Opportunity` and `ChartPoint` mirror the DeFiLlama yields payloads;
//! `FilterState` is the agent's working memory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// Filter State
// =============================================================================

/// The slots the conversation fills in. An unset slot imposes no filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterState {
    /// Canonical chain id (see `lexicon::CHAINS`)
    pub blockchain: Option<String>,
    /// Case-insensitive substring of the pool symbol
    pub token: Option<String>,
    /// Canonical protocol id, or the folded name of an unlisted protocol
    pub protocol: Option<String>,
    /// Minimum TVL in USD
    pub tvl_min: Option<f64>,
    /// Minimum APY in percent
    pub apy_min: Option<f64>,
}

impl FilterState {
    pub fn is_empty(&self) -> bool {
        self.blockchain.is_none()
            && self.token.is_none()
            && self.protocol.is_none()
            && self.tvl_min.is_none()
            && self.apy_min.is_none()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Merge the slots present in `updates`, leaving the others untouched.
    ///
    /// Returns one confirmation line per slot written.
    pub fn apply(&mut self, updates: &SlotUpdates) -> Vec<String> {
        let mut notes = Vec::new();

        if let Some(chain) = &updates.blockchain {
            self.blockchain = Some(chain.clone());
            notes.push(format!("Blockchain actualizado a: {}", chain));
        }
        if let Some(token) = &updates.token {
            self.token = Some(token.clone());
            notes.push(format!("Token actualizado a: {}", token));
        }
        if let Some(protocol) = &updates.protocol {
            self.protocol = Some(protocol.clone());
            notes.push(format!("Protocolo actualizado a: {}", protocol));
        }
        if let Some(tvl) = updates.tvl_min {
            self.tvl_min = Some(tvl);
            notes.push(format!("TVL minimo actualizado a: {}$", tvl));
        }
        if let Some(apy) = updates.apy_min {
            self.apy_min = Some(apy);
            notes.push(format!("APY minimo actualizado a: {}%", apy));
        }

        notes
    }
}

/// Slot values proposed by one utterance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlotUpdates {
    pub blockchain: Option<String>,
    pub token: Option<String>,
    pub protocol: Option<String>,
    pub tvl_min: Option<f64>,
    pub apy_min: Option<f64>,
}

impl SlotUpdates {
    pub fn is_empty(&self) -> bool {
        self.blockchain.is_none()
            && self.token.is_none()
            && self.protocol.is_none()
            && self.tvl_min.is_none()
            && self.apy_min.is_none()
    }

    /// Drop proposals that would not change `prior`.
    pub fn without_noops(mut self, prior: &FilterState) -> Self {
        if self.blockchain == prior.blockchain {
            self.blockchain = None;
        }
        if self.token == prior.token {
            self.token = None;
        }
        if self.protocol == prior.protocol {
            self.protocol = None;
        }
        if self.tvl_min == prior.tvl_min {
            self.tvl_min = None;
        }
        if self.apy_min == prior.apy_min {
            self.apy_min = None;
        }
        self
    }
}

// =============================================================================
// Yields Dataset
// =============================================================================

/// One pool from the yields dataset.
///
/// Fields the agent does not filter on are kept verbatim in `extra` so the
/// detail view can show the full record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    #[serde(default, deserialize_with = "lenient_string")]
    pub chain: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub project: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub symbol: String,

    #[serde(rename = "tvlUsd", default, deserialize_with = "lenient_f64")]
    pub tvl_usd: Option<f64>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub apy: Option<f64>,

    #[serde(rename = "ilRisk", default, deserialize_with = "lenient_string")]
    pub il_risk: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub exposure: String,

    /// Opaque pool id used for the historical chart lookup
    #[serde(rename = "pool", default, deserialize_with = "lenient_string")]
    pub pool_id: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Opportunity {
    /// APY with missing or non-finite values coerced to 0
    pub fn apy_or_zero(&self) -> f64 {
        self.apy.filter(|v| v.is_finite()).unwrap_or(0.0)
    }

    /// TVL with missing or non-finite values coerced to 0
    pub fn tvl_or_zero(&self) -> f64 {
        self.tvl_usd.filter(|v| v.is_finite()).unwrap_or(0.0)
    }
}

/// One point of a pool's historical series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub timestamp: DateTime<Utc>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub apy: Option<f64>,

    #[serde(rename = "tvlUsd", default, deserialize_with = "lenient_f64")]
    pub tvl_usd: Option<f64>,
}

// =============================================================================
// Lenient field decoding
// =============================================================================

/// Numbers, numeric strings, or nothing. Anything else decodes to `None`
/// instead of failing the whole payload.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => s,
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    })
}
