//! Error types for the Rocky MCP server

use rocky_core::ParseError;
use thiserror::Error;

const MAX_MESSAGE_CHARS: usize = 500;
const MAX_HISTORY_LIMIT: u64 = 200;

#[derive(Error, Debug)]
pub enum RockyMcpError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid parameter: {0}")]
    Parse(#[from] ParseError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(String),
}

pub type Result<T> = std::result::Result<T, RockyMcpError>;

/// Validate a chat message
pub fn validate_message(message: &str) -> Result<()> {
    if message.trim().is_empty() {
        return Err(RockyMcpError::InvalidParameter("Message cannot be empty".into()));
    }
    if message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(RockyMcpError::InvalidParameter(format!(
            "Message too long (max {} characters)",
            MAX_MESSAGE_CHARS
        )));
    }
    Ok(())
}

/// Validate a history page size
pub fn validate_limit(limit: u64) -> Result<()> {
    if limit == 0 || limit > MAX_HISTORY_LIMIT {
        return Err(RockyMcpError::InvalidParameter(format!(
            "Limit must be between 1 and {}",
            MAX_HISTORY_LIMIT
        )));
    }
    Ok(())
}

/// Validate an optional USD value range
pub fn validate_usd_range(min: Option<f64>, max: Option<f64>) -> Result<()> {
    for value in [min, max].into_iter().flatten() {
        if !value.is_finite() || value < 0.0 {
            return Err(RockyMcpError::InvalidParameter(
                "USD bounds must be non-negative numbers".into(),
            ));
        }
    }
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(RockyMcpError::InvalidParameter(format!(
                "min_usd ({}) is greater than max_usd ({})",
                min, max
            )));
        }
    }
    Ok(())
}
