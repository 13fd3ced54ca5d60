//! Portfolio aggregation over a static set of holdings

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::lexicon::fold;

const STABLECOINS: &[&str] = &["USDT", "USDC", "DAI", "BUSD"];
const BLUECHIPS: &[&str] = &["ETH", "BTC", "SOL"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenCategory {
    Stablecoin,
    Bluechip,
    Altcoin,
}

impl fmt::Display for TokenCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenCategory::Stablecoin => write!(f, "Stablecoin"),
            TokenCategory::Bluechip => write!(f, "Bluechip"),
            TokenCategory::Altcoin => write!(f, "Altcoin"),
        }
    }
}

/// Category of a token or pair label. Stablecoins win over bluechips, so
/// `ETH/USDC` is a stablecoin position.
pub fn classify_token(token: &str) -> TokenCategory {
    let upper = token.to_uppercase();
    if STABLECOINS.iter().any(|s| upper.contains(s)) {
        TokenCategory::Stablecoin
    } else if BLUECHIPS.iter().any(|s| upper.contains(s)) {
        TokenCategory::Bluechip
    } else {
        TokenCategory::Altcoin
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub id: u32,
    pub wallet: String,
    pub chain: String,
    pub protocol: String,
    pub token: String,
    pub usd: f64,
}

impl Holding {
    fn new(id: u32, wallet: &str, chain: &str, protocol: &str, token: &str, usd: f64) -> Self {
        Self {
            id,
            wallet: wallet.to_string(),
            chain: chain.to_string(),
            protocol: protocol.to_string(),
            token: token.to_string(),
            usd,
        }
    }

    pub fn category(&self) -> TokenCategory {
        classify_token(&self.token)
    }
}

/// The hand-entered demo holdings.
pub fn sample_holdings() -> Vec<Holding> {
    vec![
        Holding::new(1, "Wallet #1", "base", "Uniswap V3", "ODOS", 21.91),
        Holding::new(2, "Wallet #1", "mantle", "Pendle V2", "ETH/cmETH", 554.81),
        Holding::new(3, "Wallet #2", "base", "aave", "USDT", 2191.0),
        Holding::new(4, "Wallet #3", "solana", "meteora", "JLP/SOL", 551.0),
        Holding::new(5, "Wallet #1", "ethereum", "Aave V3", "ETH", 3.50),
    ]
}

// =============================================================================
// Grouping
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    Wallet,
    Chain,
    Protocol,
    Category,
}

impl GroupBy {
    fn key(&self, holding: &Holding) -> String {
        match self {
            GroupBy::Wallet => holding.wallet.clone(),
            GroupBy::Chain => holding.chain.clone(),
            GroupBy::Protocol => holding.protocol.clone(),
            GroupBy::Category => holding.category().to_string(),
        }
    }
}

impl FromStr for GroupBy {
    type Err = ParseError;

    /// Accepts English and Spanish names for each dimension.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match fold(s.trim()).as_str() {
            "wallet" | "wallets" | "billetera" | "cartera" => Ok(GroupBy::Wallet),
            "chain" | "chains" | "blockchain" | "blockchains" | "cadena" => Ok(GroupBy::Chain),
            "protocol" | "protocols" | "protocolo" => Ok(GroupBy::Protocol),
            "category" | "categories" | "categoria" | "tipo" => Ok(GroupBy::Category),
            _ => Err(ParseError::Dimension(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTotal {
    pub key: String,
    pub usd: f64,
    /// Percentage of the portfolio total
    pub share: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PortfolioStats {
    pub count: usize,
    pub total: f64,
    pub mean: f64,
    pub max: f64,
    pub min: f64,
}

// =============================================================================
// Position filtering
// =============================================================================

/// Every set field must match; string fields compare case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PositionFilter {
    pub wallet: Option<String>,
    pub chain: Option<String>,
    pub category: Option<String>,
    pub min_usd: Option<f64>,
    pub max_usd: Option<f64>,
}

impl PositionFilter {
    fn matches(&self, holding: &Holding) -> bool {
        let same = |wanted: &Option<String>, actual: &str| {
            wanted.as_ref().map_or(true, |w| fold(w) == fold(actual))
        };

        same(&self.wallet, &holding.wallet)
            && same(&self.chain, &holding.chain)
            && same(&self.category, &holding.category().to_string())
            && self.min_usd.map_or(true, |min| holding.usd >= min)
            && self.max_usd.map_or(true, |max| holding.usd <= max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionView {
    #[serde(flatten)]
    pub holding: Holding,
    pub category: TokenCategory,
    /// Percentage of the filtered selection
    pub share: f64,
}

// =============================================================================
// Portfolio
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct Portfolio {
    holdings: Vec<Holding>,
}

impl Portfolio {
    pub fn new(holdings: Vec<Holding>) -> Self {
        Self { holdings }
    }

    pub fn sample() -> Self {
        Self::new(sample_holdings())
    }

    pub fn total_value(&self) -> f64 {
        self.holdings.iter().map(|h| h.usd).sum()
    }

    /// Summed value per group, largest first.
    pub fn group_by(&self, dimension: GroupBy) -> Vec<GroupTotal> {
        let mut sums: HashMap<String, f64> = HashMap::new();
        for holding in &self.holdings {
            *sums.entry(dimension.key(holding)).or_insert(0.0) += holding.usd;
        }

        let total = self.total_value();
        let mut groups: Vec<GroupTotal> = sums
            .into_iter()
            .map(|(key, usd)| GroupTotal {
                key,
                usd,
                share: percent(usd, total),
            })
            .collect();

        groups.sort_by(|a, b| b.usd.total_cmp(&a.usd).then_with(|| a.key.cmp(&b.key)));
        groups
    }

    pub fn stats(&self) -> PortfolioStats {
        let count = self.holdings.len();
        let total = self.total_value();
        let values = self.holdings.iter().map(|h| h.usd);

        PortfolioStats {
            count,
            total,
            mean: if count == 0 { 0.0 } else { total / count as f64 },
            max: values.clone().reduce(f64::max).unwrap_or(0.0),
            min: values.reduce(f64::min).unwrap_or(0.0),
        }
    }

    pub fn filter_positions(&self, filter: &PositionFilter) -> Vec<PositionView> {
        let selected: Vec<&Holding> = self.holdings.iter().filter(|h| filter.matches(h)).collect();
        let total: f64 = selected.iter().map(|h| h.usd).sum();

        selected
            .into_iter()
            .map(|h| PositionView {
                holding: h.clone(),
                category: h.category(),
                share: percent(h.usd, total),
            })
            .collect()
    }
}

fn percent(part: f64, total: f64) -> f64 {
    if total > 0.0 {
        part / total * 100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_token() {
        assert_eq!(classify_token("USDT"), TokenCategory::Stablecoin);
        assert_eq!(classify_token("ETH/USDC"), TokenCategory::Stablecoin);
        assert_eq!(classify_token("ETH/cmETH"), TokenCategory::Bluechip);
        assert_eq!(classify_token("JLP/SOL"), TokenCategory::Bluechip);
        assert_eq!(classify_token("ODOS"), TokenCategory::Altcoin);
    }

    #[test]
    fn test_total_and_stats() {
        let portfolio = Portfolio::sample();
        let total = portfolio.total_value();
        assert!((total - 3322.22).abs() < 1e-9);

        let stats = portfolio.stats();
        assert_eq!(stats.count, 5);
        assert_eq!(stats.max, 2191.0);
        assert_eq!(stats.min, 3.5);
        assert!((stats.mean - total / 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_group_by_wallet() {
        let groups = Portfolio::sample().group_by(GroupBy::Wallet);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].key, "Wallet #2");
        assert_eq!(groups[1].key, "Wallet #1");
        assert!((groups[1].usd - 580.22).abs() < 1e-9);

        let share: f64 = groups.iter().map(|g| g.share).sum();
        assert!((share - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_group_by_category() {
        let groups = Portfolio::sample().group_by(GroupBy::Category);
        let keys: Vec<_> = groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["Stablecoin", "Bluechip", "Altcoin"]);
    }

    #[test]
    fn test_group_by_parses_spanish() {
        assert_eq!("billetera".parse::<GroupBy>(), Ok(GroupBy::Wallet));
        assert_eq!("Categoría".parse::<GroupBy>(), Ok(GroupBy::Category));
        assert_eq!("cadena".parse::<GroupBy>(), Ok(GroupBy::Chain));
        assert_eq!(
            "color".parse::<GroupBy>(),
            Err(ParseError::Dimension("color".to_string()))
        );
    }

    #[test]
    fn test_filter_positions_share_is_relative() {
        let portfolio = Portfolio::sample();
        let filter = PositionFilter {
            chain: Some("Base".to_string()),
            ..Default::default()
        };

        let views = portfolio.filter_positions(&filter);
        assert_eq!(views.len(), 2);
        let share: f64 = views.iter().map(|v| v.share).sum();
        assert!((share - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_filter_positions_value_range() {
        let filter = PositionFilter {
            min_usd: Some(100.0),
            max_usd: Some(1000.0),
            ..Default::default()
        };
        let ids: Vec<_> = Portfolio::sample()
            .filter_positions(&filter)
            .iter()
            .map(|v| v.holding.id)
            .collect();
        assert_eq!(ids, vec![2, 4]);
    }
}
