//! # Rocky Core
//!
//! Conversational slot filling for DeFi yield discovery.
//!
//! Mixed Spanish/English utterances are routed to an intent, parsed into
//! filter slots (chain, token, protocol, minimum TVL, minimum APY) and turned
//! into a ranked shortlist of pools from the yields dataset.

pub mod agent;
pub mod chart;
pub mod error;
pub mod extract;
pub mod intent;
pub mod lexicon;
pub mod models;
pub mod portfolio;
pub mod response;
pub mod search;

pub use agent::{Agent, AgentPhase, AgentSettings, Session};
pub use chart::ChartSeries;
pub use error::*;
pub use extract::{RuleExtractor, SlotExtractor};
pub use intent::{route, Intent};
pub use models::*;
pub use portfolio::{GroupBy, Holding, Portfolio, PositionFilter, TokenCategory};
pub use response::*;
pub use search::{ApiEnvelope, CandidateSet, OpportunitySearch, PoolSource};
