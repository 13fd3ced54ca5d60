//! Error types for Rocky Core

use thiserror::Error;

/// A magnitude or keyword that could not be interpreted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Not a numeric magnitude: {0}")]
    Magnitude(String),

    #[error("Unknown grouping dimension: {0}")]
    Dimension(String),
}

/// Slot extraction failure that invalidates the whole utterance.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Unsupported blockchain: {0}")]
    UnsupportedChain(String),
}

/// Failure talking to the yields data source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Yields API returned status {0}")]
    Status(u16),

    #[error("Yields API request timed out")]
    Timeout,

    #[error("Malformed payload: {0}")]
    Malformed(String),
}

/// Anything that stops a turn from producing its normal output.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TurnError {
    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error("Position {position} not available ({available} cached)")]
    PositionOutOfRange { position: usize, available: usize },

    #[error("No cached opportunities to chart")]
    NothingToChart,
}

pub type TurnResult<T> = Result<T, TurnError>;
