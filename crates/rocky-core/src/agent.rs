//! Conversational agent
//!
//! Routes each utterance, mutates the session's filter state and cached
//! results, and turns every outcome (including failures) into a
//! `TurnResponse`. All I/O goes through the `PoolSource` the agent was built
//! with.

use serde::Serialize;

use crate::chart::{build_series, DEFAULT_CHART_DAYS};
use crate::error::{ExtractError, SearchError, TurnError, TurnResult};
use crate::extract::{RuleExtractor, SlotExtractor};
use crate::intent::{route, Intent};
use crate::lexicon::supported_chains;
use crate::models::FilterState;
use crate::response::{format_details, ConversationTurn, Role, TurnResponse};
use crate::search::{CandidateSet, OpportunitySearch, PoolSource, DEFAULT_TOP_N};

const RESET_DONE: &str =
    "Variables reseteadas. Ahora puedes establecer nuevos criterios de búsqueda.";
const SEARCH_FIRST: &str = "Posicion no disponible. Por favor, primero busca oportunidades.";
const NOTHING_TO_CHART: &str =
    "No hay oportunidades para comparar. Por favor, primero busca oportunidades.";
const NO_MATCHES: &str = "No se encontraron oportunidades que cumplan con los criterios actuales.";
const SEARCH_DONE: &str = "Búsqueda realizada con éxito";

// =============================================================================
// Session
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentPhase {
    /// Nothing set, nothing cached
    #[default]
    Idle,
    /// Filters changed since the last search result
    Filtered,
    /// The cache holds at least one opportunity
    HasResults,
    /// The last search matched nothing
    NoResults,
}

/// Everything one conversation remembers between turns.
#[derive(Debug, Clone, Default)]
pub struct Session {
    filters: FilterState,
    last_opportunities: CandidateSet,
    history: Vec<ConversationTurn>,
    phase: AgentPhase,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn last_opportunities(&self) -> &CandidateSet {
        &self.last_opportunities
    }

    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    /// The newest `limit` turns, oldest first.
    pub fn recent_history(&self, limit: usize) -> &[ConversationTurn] {
        let start = self.history.len().saturating_sub(limit);
        &self.history[start..]
    }

    pub fn phase(&self) -> AgentPhase {
        self.phase
    }

    /// Clear filters and cached results. History is kept.
    pub fn reset(&mut self) {
        self.filters.clear();
        self.last_opportunities = CandidateSet::default();
        self.phase = AgentPhase::Idle;
    }

    fn record(&mut self, role: Role, response: Option<&TurnResponse>, content: &str) {
        self.history.push(ConversationTurn {
            role,
            content: content.to_string(),
            attachment: response.and_then(|r| r.payload.clone()),
        });
    }
}

// =============================================================================
// Agent
// =============================================================================

#[derive(Debug, Clone, Copy)]
pub struct AgentSettings {
    pub top_n: usize,
    pub chart_days: i64,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            chart_days: DEFAULT_CHART_DAYS,
        }
    }
}

pub struct Agent<S, E = RuleExtractor> {
    search: OpportunitySearch<S>,
    extractor: E,
    settings: AgentSettings,
}

impl<S: PoolSource> Agent<S> {
    pub fn new(source: S, settings: AgentSettings) -> Self {
        Self::with_extractor(source, RuleExtractor, settings)
    }
}

impl<S: PoolSource, E: SlotExtractor> Agent<S, E> {
    pub fn with_extractor(source: S, extractor: E, settings: AgentSettings) -> Self {
        Self {
            search: OpportunitySearch::new(source, settings.top_n),
            extractor,
            settings,
        }
    }

    pub fn source(&self) -> &S {
        self.search.source()
    }

    /// Process one user message against `session`.
    pub async fn handle_turn(&self, session: &mut Session, utterance: &str) -> TurnResponse {
        session.record(Role::User, None, utterance);

        let intent = route(utterance);
        tracing::info!(?intent, phase = ?session.phase, "Handling turn");

        let response = match self.dispatch(session, intent, utterance).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Turn failed");
                TurnResponse::error(describe(&e))
            }
        };

        session.record(Role::Assistant, Some(&response), &response.message);
        response
    }

    async fn dispatch(
        &self,
        session: &mut Session,
        intent: Intent,
        utterance: &str,
    ) -> TurnResult<TurnResponse> {
        match intent {
            Intent::Reset => {
                session.reset();
                Ok(TurnResponse::text(RESET_DONE))
            }
            Intent::ChartRequest => self.chart(session).await,
            Intent::PositionDetail { position } => position_detail(session, position),
            Intent::SlotUpdateOrSearch => self.update_and_search(session, utterance).await,
        }
    }

    async fn update_and_search(
        &self,
        session: &mut Session,
        utterance: &str,
    ) -> TurnResult<TurnResponse> {
        let updates = self.extractor.extract(utterance, &session.filters)?;

        let notes = if updates.is_empty() {
            Vec::new()
        } else {
            let notes = session.filters.apply(&updates);
            session.phase = AgentPhase::Filtered;
            notes
        };

        let candidates = self.search.search(&session.filters).await?;

        if candidates.is_empty() {
            session.last_opportunities = candidates;
            session.phase = AgentPhase::NoResults;
            return Ok(TurnResponse::text(NO_MATCHES));
        }

        let rows = candidates.rows();
        session.last_opportunities = candidates;
        session.phase = AgentPhase::HasResults;

        let message = if notes.is_empty() {
            SEARCH_DONE.to_string()
        } else {
            notes.join("\n")
        };
        Ok(TurnResponse::results(message, rows))
    }

    async fn chart(&self, session: &Session) -> TurnResult<TurnResponse> {
        if session.phase != AgentPhase::HasResults || session.last_opportunities.is_empty() {
            return Err(TurnError::NothingToChart);
        }

        let mut series = Vec::new();
        let mut last_error: Option<SearchError> = None;

        for (i, opp) in session.last_opportunities.iter().enumerate() {
            match self.search.source().fetch_chart(&opp.pool_id).await {
                Ok(points) => {
                    series.push(build_series(i + 1, opp, points, self.settings.chart_days))
                }
                Err(e) => {
                    tracing::warn!(pool_id = %opp.pool_id, error = %e, "Skipping chart series");
                    last_error = Some(e);
                }
            }
        }

        if series.is_empty() {
            if let Some(e) = last_error {
                return Err(e.into());
            }
        }

        let message = format!(
            "Evolución del APY en los últimos {} días",
            self.settings.chart_days
        );
        Ok(TurnResponse::chart(message, series))
    }
}

/// `position` is 1-based.
fn position_detail(session: &Session, position: usize) -> TurnResult<TurnResponse> {
    let out_of_range = TurnError::PositionOutOfRange {
        position,
        available: session.last_opportunities.len(),
    };

    if session.phase != AgentPhase::HasResults {
        return Err(out_of_range);
    }

    let opp = position
        .checked_sub(1)
        .and_then(|index| session.last_opportunities.get(index))
        .ok_or(out_of_range)?;

    Ok(TurnResponse::details(
        format!("Detalles de la posición {}:", position),
        format_details(opp),
    ))
}

/// User-facing text for a failed turn.
pub fn describe(error: &TurnError) -> String {
    match error {
        TurnError::Extract(ExtractError::UnsupportedChain(name)) => format!(
            "La blockchain '{}' no está soportada. Blockchains disponibles: {}",
            name,
            supported_chains().join(", ")
        ),
        TurnError::Search(e) => format!("Error al buscar oportunidades DeFi: {}", e),
        TurnError::PositionOutOfRange { .. } => SEARCH_FIRST.to_string(),
        TurnError::NothingToChart => NOTHING_TO_CHART.to_string(),
    }
}
