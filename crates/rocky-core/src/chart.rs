//! APY history selection for comparative charts

use chrono::Duration;
use serde::Serialize;

use crate::models::{ChartPoint, Opportunity};

pub const DEFAULT_CHART_DAYS: i64 = 7;
pub const MAX_CHART_DAYS: i64 = 365;

/// One pool's recent history, labeled for the legend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub rank: usize,
    pub legend: String,
    pub pool_id: String,
    pub points: Vec<ChartPoint>,
}

/// `"{rank}: {symbol} ({project} - {chain})"`
pub fn legend(rank: usize, opp: &Opportunity) -> String {
    format!("{}: {} ({} - {})", rank, opp.symbol, opp.project, opp.chain)
}

/// Points within `days` of the newest point, oldest first.
///
/// `days` is clamped to `1..=MAX_CHART_DAYS`.
pub fn recent_window(mut points: Vec<ChartPoint>, days: i64) -> Vec<ChartPoint> {
    points.sort_by_key(|p| p.timestamp);

    let Some(newest) = points.last().map(|p| p.timestamp) else {
        return points;
    };
    let cutoff = newest - Duration::days(days.clamp(1, MAX_CHART_DAYS));

    points.retain(|p| p.timestamp >= cutoff);
    points
}

pub fn build_series(rank: usize, opp: &Opportunity, points: Vec<ChartPoint>, days: i64) -> ChartSeries {
    ChartSeries {
        rank,
        legend: legend(rank, opp),
        pool_id: opp.pool_id.clone(),
        points: recent_window(points, days),
    }
}
