//! Opportunity search
//!
//! Fetches the pools dataset through a `PoolSource`, applies the filter state
//! conjunctively, ranks by APY and keeps the top entries.

use serde::Deserialize;

use crate::error::SearchError;
use crate::lexicon::{chain_key, fold, protocol_key};
use crate::models::{ChartPoint, FilterState, Opportunity};
use crate::response::ResultRow;

pub const DEFAULT_TOP_N: usize = 5;

/// Where pools and their history come from.
#[allow(async_fn_in_trait)]
pub trait PoolSource {
    /// The full current pools dataset
    async fn fetch_pools(&self) -> Result<Vec<Opportunity>, SearchError>;

    /// Historical points for one pool
    async fn fetch_chart(&self, pool_id: &str) -> Result<Vec<ChartPoint>, SearchError>;
}

/// `{status, data}` wrapper used by the yields API.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub data: Option<Vec<T>>,
}

impl<T> ApiEnvelope<T> {
    pub fn into_data(self) -> Result<Vec<T>, SearchError> {
        match (self.status.as_deref(), self.data) {
            (Some("success"), Some(data)) => Ok(data),
            (Some("success"), None) => Err(SearchError::Malformed("missing data".to_string())),
            (status, _) => Err(SearchError::Malformed(format!(
                "unexpected status {:?}",
                status.unwrap_or("none")
            ))),
        }
    }
}

// =============================================================================
// Candidate Set
// =============================================================================

/// The ranked, truncated result of one search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateSet {
    opportunities: Vec<Opportunity>,
}

impl CandidateSet {
    pub fn is_empty(&self) -> bool {
        self.opportunities.is_empty()
    }

    pub fn len(&self) -> usize {
        self.opportunities.len()
    }

    pub fn get(&self, index: usize) -> Option<&Opportunity> {
        self.opportunities.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Opportunity> {
        self.opportunities.iter()
    }

    /// Table rows with 1-based positions
    pub fn rows(&self) -> Vec<ResultRow> {
        self.opportunities
            .iter()
            .enumerate()
            .map(|(i, opp)| ResultRow::from_opportunity(i + 1, opp))
            .collect()
    }
}

impl From<Vec<Opportunity>> for CandidateSet {
    fn from(opportunities: Vec<Opportunity>) -> Self {
        Self { opportunities }
    }
}

// =============================================================================
// Filtering and ranking
// =============================================================================

/// Whether `opp` satisfies every slot set in `filters`.
pub fn matches(opp: &Opportunity, filters: &FilterState) -> bool {
    if let Some(chain) = &filters.blockchain {
        if chain_key(&opp.chain) != *chain {
            return false;
        }
    }

    if let Some(protocol) = &filters.protocol {
        if protocol_key(&opp.project) != *protocol {
            return false;
        }
    }

    if let Some(token) = &filters.token {
        if !fold(&opp.symbol).contains(&fold(token)) {
            return false;
        }
    }

    if let Some(min) = filters.tvl_min {
        if opp.tvl_or_zero() < min {
            return false;
        }
    }

    if let Some(min) = filters.apy_min {
        if opp.apy_or_zero() < min {
            return false;
        }
    }

    true
}

/// Filter, sort by APY descending (stable, missing APY last) and keep `limit`.
pub fn rank(pools: Vec<Opportunity>, filters: &FilterState, limit: usize) -> CandidateSet {
    let mut selected: Vec<Opportunity> = pools.into_iter().filter(|p| matches(p, filters)).collect();
    selected.sort_by(|a, b| b.apy_or_zero().total_cmp(&a.apy_or_zero()));
    selected.truncate(limit);
    CandidateSet::from(selected)
}

// =============================================================================
// Search
// =============================================================================

pub struct OpportunitySearch<S> {
    source: S,
    limit: usize,
}

impl<S: PoolSource> OpportunitySearch<S> {
    pub fn new(source: S, limit: usize) -> Self {
        Self { source, limit }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub async fn search(&self, filters: &FilterState) -> Result<CandidateSet, SearchError> {
        let pools = self.source.fetch_pools().await?;
        let fetched = pools.len();
        let candidates = rank(pools, filters, self.limit);

        tracing::info!(
            fetched,
            selected = candidates.len(),
            ?filters,
            "Opportunity search complete"
        );

        Ok(candidates)
    }
}
