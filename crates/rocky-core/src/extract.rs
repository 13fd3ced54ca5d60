//! Rule-based slot extractor
//!
//! Turns a free-form utterance into proposed slot updates. Each slot has an
//! ordered table of `(pattern, capture group)` rules evaluated first-match-wins,
//! and the slots themselves run in a fixed order:
//!
//! 1. token (so "UNI token" is never read as a chain or protocol)
//! 2. blockchain, only when no token was claimed; an unknown word in a
//!    chain-shaped phrase aborts the whole utterance
//! 3. protocol
//! 4. minimum TVL (with K/M suffixes)
//! 5. minimum APY
//! 6. free-token fallback, only when nothing else matched and the user used
//!    a search verb
//!
//! All matching runs on folded text (see `lexicon::fold`).

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ExtractError;
use crate::lexicon::{
    self, canonicalize_chain, canonicalize_protocol, is_filler, is_search_verb, Term,
};
use crate::models::{FilterState, SlotUpdates};

/// Anything that can turn an utterance into slot updates.
///
/// The rule-based extractor below is self-contained; a model-backed
/// implementation can satisfy the same contract.
pub trait SlotExtractor {
    fn extract(&self, utterance: &str, prior: &FilterState) -> Result<SlotUpdates, ExtractError>;
}

// =============================================================================
// Rule tables
// =============================================================================

/// A compiled pattern and the capture group that holds the value.
struct Rule {
    pattern: Regex,
    group: usize,
}

impl Rule {
    fn new(pattern: &str, group: usize) -> Self {
        Self {
            pattern: Regex::new(pattern).expect("static extractor pattern"),
            group,
        }
    }

    /// Every captured value, left to right.
    fn candidates<'a>(&'a self, text: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pattern
            .captures_iter(text)
            .filter_map(move |caps| caps.get(self.group))
            .map(|m| m.as_str())
    }
}

/// A known term together with the contextual patterns that select it.
struct TermRules {
    term: &'static Term,
    /// `(alias, compiled patterns)` in evaluation order
    patterns: Vec<(&'static str, Vec<Regex>)>,
}

impl TermRules {
    fn compile(terms: &'static [Term], templates: &[&str]) -> Vec<Self> {
        terms
            .iter()
            .map(|term| {
                let patterns = term
                    .aliases
                    .iter()
                    .map(|alias| {
                        let escaped = regex::escape(alias);
                        let mut compiled: Vec<Regex> = templates
                            .iter()
                            .map(|t| {
                                Regex::new(&t.replace("{term}", &escaped))
                                    .expect("static term pattern")
                            })
                            .collect();
                        if term.bare {
                            compiled.push(
                                Regex::new(&format!(r"\b{}\b", escaped))
                                    .expect("static term pattern"),
                            );
                        }
                        (*alias, compiled)
                    })
                    .collect();
                TermRules { term, patterns }
            })
            .collect()
    }

    /// First alias with any matching pattern, skipping `excluded`.
    fn find(&self, text: &str, excluded: Option<&str>) -> Option<&'static str> {
        self.patterns
            .iter()
            .filter(|(alias, _)| Some(*alias) != excluded)
            .find(|(_, patterns)| patterns.iter().any(|p| p.is_match(text)))
            .map(|(alias, _)| *alias)
    }
}

const WORD: &str = r"([a-z0-9]+)";
const PROTOCOL_WORD: &str = r"([a-z][a-z0-9\-]*)";
const MAGNITUDE: &str = r"(\$?\d[\d.,]*(?:\s?[km])?)\b";
const PERCENT: &str = r"(\d[\d.,]*)\s*%?";

static TOKEN_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        // "token eth", "el token de usdc", "selecciona el token wbtc"
        Rule::new(&format!(r"\btokens?\s+(?:de\s+|del\s+|called\s+|named\s+)?{WORD}"), 1),
        // "eth token"
        Rule::new(&format!(r"\b{WORD}\s+tokens?\b"), 1),
        // "busca pools de usdc"
        Rule::new(
            &format!(
                r"\b(?:busca|buscar|buscame|search|find|encuentra|encontrar)\s+(?:pools?|oportunidades|opportunities|yields?)\s+(?:de|del|con|for|of|with)\s+{WORD}"
            ),
            1,
        ),
    ]
});

const CHAIN_TEMPLATES: &[&str] = &[
    r"\bblockchain\s+(?:de\s+)?{term}\b",
    r"\ben\s+(?:la\s+)?{term}\b",
    r"\b(?:red|cadena)\s+(?:de\s+)?{term}\b",
    r"\b{term}\s+(?:blockchain|cadena|red|chain|network)\b",
    r"\bselecciona(?:r)?\s+(?:la\s+)?(?:blockchain|cadena|red)\s+(?:de\s+)?{term}\b",
    r"\b(?:select|on)\s+{term}\b",
];

static CHAIN_RULES: Lazy<Vec<TermRules>> =
    Lazy::new(|| TermRules::compile(lexicon::CHAINS, CHAIN_TEMPLATES));

/// Chain-shaped phrases whose word must be a supported chain.
static UNKNOWN_CHAIN_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        Rule::new(r"\bblockchain\s+(?:de\s+)?(?:la\s+)?([a-z][a-z0-9]*)", 1),
        Rule::new(r"\b(?:red|cadena)\s+(?:de\s+)?(?:la\s+)?([a-z][a-z0-9]*)", 1),
        Rule::new(r"\b(?:chain|network)\s+([a-z][a-z0-9]*)", 1),
    ]
});

const PROTOCOL_TEMPLATES: &[&str] = &[
    r"\bprotocol(?:o)?\s+(?:de\s+)?{term}\b",
    r"\b(?:en|del|con|on|via|using|with)\s+(?:el\s+)?{term}\b",
    r"\b{term}\s+protocol(?:o)?\b",
    r"\bselecciona(?:r)?\s+(?:el\s+)?protocol(?:o)?\s+(?:de\s+)?{term}\b",
];

static PROTOCOL_RULES: Lazy<Vec<TermRules>> =
    Lazy::new(|| TermRules::compile(lexicon::PROTOCOLS, PROTOCOL_TEMPLATES));

/// Unlisted protocol names in explicit protocol phrasing.
static UNKNOWN_PROTOCOL_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        Rule::new(&format!(r"\bprotocol(?:o|os|s)?\s+(?:de\s+)?{PROTOCOL_WORD}"), 1),
        Rule::new(&format!(r"\b{PROTOCOL_WORD}\s+protocol(?:o)?\b"), 1),
    ]
});

static TVL_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        Rule::new(
            &format!(
                r"\btvl\s+(?:minimo|minimum|min|mayor|superior|above|over|greater)\s+(?:a\s+|de\s+|que\s+|than\s+|of\s+)?{MAGNITUDE}"
            ),
            1,
        ),
        Rule::new(&format!(r"\btvl\s+de\s+(?:al\s+menos\s+|mas\s+de\s+)?{MAGNITUDE}"), 1),
        Rule::new(
            &format!(r"\b(?:minimo|minimum|min)\s+(?:de\s+)?tvl\s+(?:de\s+|of\s+)?{MAGNITUDE}"),
            1,
        ),
        Rule::new(&format!(r"\btvl\s*(?:>=|>|=)\s*{MAGNITUDE}"), 1),
        Rule::new(&format!(r"\btvl\s+{MAGNITUDE}"), 1),
        Rule::new(&format!(r"{MAGNITUDE}\s+(?:de\s+|of\s+)?tvl\b"), 1),
    ]
});

static APY_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        Rule::new(
            &format!(
                r"\bapy\s+(?:minimo|minimum|min|mayor|superior|above|over|greater)\s+(?:a\s+|de\s+|que\s+|than\s+|of\s+)?{PERCENT}"
            ),
            1,
        ),
        Rule::new(&format!(r"\bapy\s+de\s+(?:al\s+menos\s+|mas\s+de\s+)?{PERCENT}"), 1),
        Rule::new(
            &format!(r"\b(?:minimo|minimum|min)\s+(?:de\s+)?apy\s+(?:de\s+|of\s+)?{PERCENT}"),
            1,
        ),
        Rule::new(&format!(r"\bapy\s*(?:>=|>|=)\s*{PERCENT}"), 1),
        Rule::new(&format!(r"\bapy\s+{PERCENT}"), 1),
        Rule::new(&format!(r"{PERCENT}\s*(?:de\s+|of\s+)?apy\b"), 1),
    ]
});

/// Set phrases built from a chain name that never name a chain
/// ("en línea", "en base a mi perfil", "con base en").
static IDIOM_RULE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:en\s+linea|en\s+base\s+(?:a|al|de)|con\s+base\s+en)\b").expect("static pattern")
});

static WORD_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z0-9]+").expect("static pattern"));

// =============================================================================
// Rule-based extractor
// =============================================================================

/// The layered pattern-matching extractor.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleExtractor;

impl SlotExtractor for RuleExtractor {
    fn extract(&self, utterance: &str, prior: &FilterState) -> Result<SlotUpdates, ExtractError> {
        let folded = lexicon::fold(utterance);
        let text = IDIOM_RULE.replace_all(&folded, " ");
        let mut updates = SlotUpdates::default();

        updates.token = detect_token(&text);

        if updates.token.is_none() {
            updates.blockchain = detect_chain(&text)?;
        }

        updates.protocol = detect_protocol(&text, updates.token.as_deref());
        updates.tvl_min = detect_tvl(&text);
        updates.apy_min = detect_apy(&text);

        if updates.is_empty() {
            updates.token = fallback_token(&text);
        }

        tracing::debug!(utterance = %utterance, ?updates, "Slots extracted");

        Ok(updates.without_noops(prior))
    }
}

fn accept_token(word: &str) -> bool {
    word.len() > 1
        && !is_filler(word)
        && !word.chars().all(|c| c.is_ascii_digit())
        && canonicalize_chain(word).is_none()
}

fn detect_token(text: &str) -> Option<String> {
    TOKEN_RULES
        .iter()
        .find_map(|rule| rule.candidates(text).find(|w| accept_token(w)))
        .map(str::to_string)
}

fn detect_chain(text: &str) -> Result<Option<String>, ExtractError> {
    if let Some(rules) = CHAIN_RULES.iter().find(|r| r.find(text, None).is_some()) {
        return Ok(Some(rules.term.id.to_string()));
    }

    let unknown = UNKNOWN_CHAIN_RULES
        .iter()
        .find_map(|rule| rule.candidates(text).find(|w| w.len() > 1 && !is_filler(w)));

    match unknown {
        Some(name) => {
            tracing::info!(chain = %name, "Unsupported blockchain requested");
            Err(ExtractError::UnsupportedChain(name.to_string()))
        }
        None => Ok(None),
    }
}

fn detect_protocol(text: &str, token: Option<&str>) -> Option<String> {
    if let Some(rules) = PROTOCOL_RULES.iter().find(|r| r.find(text, token).is_some()) {
        return Some(rules.term.id.to_string());
    }

    UNKNOWN_PROTOCOL_RULES
        .iter()
        .find_map(|rule| {
            rule.candidates(text).find(|w| {
                w.len() > 1
                    && !is_filler(w)
                    && Some(*w) != token
                    && canonicalize_chain(w).is_none()
            })
        })
        .map(|name| {
            canonicalize_protocol(name)
                .map(str::to_string)
                .unwrap_or_else(|| name.to_string())
        })
}

fn detect_tvl(text: &str) -> Option<f64> {
    let raw = TVL_RULES.iter().find_map(|rule| rule.candidates(text).next())?;
    match lexicon::normalize_magnitude(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(error = %e, "Dropping TVL slot");
            None
        }
    }
}

fn detect_apy(text: &str) -> Option<f64> {
    let raw = APY_RULES.iter().find_map(|rule| rule.candidates(text).next())?;
    match lexicon::normalize_number(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(error = %e, "Dropping APY slot");
            None
        }
    }
}

/// First meaningful word of a search request ("busca usdc" → "usdc").
fn fallback_token(text: &str) -> Option<String> {
    let words: Vec<&str> = WORD_SPLIT.find_iter(text).map(|m| m.as_str()).collect();
    if !words.iter().any(|w| is_search_verb(w)) {
        return None;
    }

    words
        .into_iter()
        .filter(|w| !is_search_verb(w))
        .find(|w| accept_token(w))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> SlotUpdates {
        RuleExtractor.extract(text, &FilterState::default()).unwrap()
    }

    #[test]
    fn test_full_criteria_sentence() {
        let updates = extract("Blockchain de Arbitrum con TVL mínimo 1M y APY mayor a 5%");
        assert_eq!(updates.blockchain.as_deref(), Some("arbitrum"));
        assert_eq!(updates.tvl_min, Some(1_000_000.0));
        assert_eq!(updates.apy_min, Some(5.0));
        assert_eq!(updates.token, None);
    }

    #[test]
    fn test_token_claim_blocks_chain() {
        let updates = extract("Token ETH en Arbitrum con TVL mínimo 1M");
        assert_eq!(updates.token.as_deref(), Some("eth"));
        assert_eq!(updates.blockchain, None);
        assert_eq!(updates.tvl_min, Some(1_000_000.0));
    }

    #[test]
    fn test_sym_token_phrasing() {
        let updates = extract("quiero el UNI token");
        assert_eq!(updates.token.as_deref(), Some("uni"));
        assert_eq!(updates.blockchain, None);
    }

    #[test]
    fn test_token_rejects_stopwords_and_chain_names() {
        // "en" is rejected, "solana" is a chain, so the chain slot wins
        let updates = extract("tokens en solana");
        assert_eq!(updates.token, None);
        assert_eq!(updates.blockchain.as_deref(), Some("solana"));
    }

    #[test]
    fn test_search_verb_token_phrase() {
        let updates = extract("busca pools de usdc");
        assert_eq!(updates.token.as_deref(), Some("usdc"));
    }

    #[test]
    fn test_chain_aliases() {
        assert_eq!(extract("pools en binance").blockchain.as_deref(), Some("bsc"));
        assert_eq!(extract("select polygon").blockchain.as_deref(), Some("polygon"));
        assert_eq!(extract("la red de optimism").blockchain.as_deref(), Some("optimism"));
    }

    #[test]
    fn test_ambiguous_chain_needs_context() {
        assert_eq!(extract("apy base de 4").blockchain, None);
        assert_eq!(extract("en base").blockchain.as_deref(), Some("base"));
    }

    #[test]
    fn test_unsupported_chain_is_hard_stop() {
        let result = RuleExtractor.extract(
            "blockchain de marte con apy minimo 5",
            &FilterState::default(),
        );
        assert_eq!(result, Err(ExtractError::UnsupportedChain("marte".to_string())));
    }

    #[test]
    fn test_chain_phrase_with_filler_is_not_an_error() {
        let updates = extract("la blockchain con mas apy");
        assert_eq!(updates.blockchain, None);
    }

    #[test]
    fn test_protocol_known_and_unknown() {
        assert_eq!(extract("en el protocolo Aave").protocol.as_deref(), Some("aave"));
        assert_eq!(extract("usando curve").protocol.as_deref(), Some("curve"));
        assert_eq!(extract("protocolo stakewise").protocol.as_deref(), Some("stakewise"));
        assert_eq!(extract("el protocolo").protocol, None);
    }

    #[test]
    fn test_protocol_skips_claimed_token() {
        let updates = extract("token sushi en ethereum");
        assert_eq!(updates.token.as_deref(), Some("sushi"));
        assert_eq!(updates.protocol, None);
        assert_eq!(updates.blockchain, None);
    }

    #[test]
    fn test_tvl_patterns() {
        assert_eq!(extract("tvl mayor a 500k").tvl_min, Some(500_000.0));
        assert_eq!(extract("tvl de 2.5m").tvl_min, Some(2_500_000.0));
        assert_eq!(extract("minimo de tvl 750").tvl_min, Some(750.0));
        assert_eq!(extract("tvl > $10k").tvl_min, Some(10_000.0));
        assert_eq!(extract("con 1m de tvl").tvl_min, Some(1_000_000.0));
    }

    #[test]
    fn test_apy_patterns() {
        assert_eq!(extract("apy minimo de 7.5").apy_min, Some(7.5));
        assert_eq!(extract("APY superior a 10%").apy_min, Some(10.0));
        assert_eq!(extract("apy >= 3").apy_min, Some(3.0));
        assert_eq!(extract("al menos 12% de apy").apy_min, Some(12.0));
    }

    #[test]
    fn test_numbers_with_separators() {
        assert_eq!(extract("tvl mayor a 1,000,000").tvl_min, Some(1_000_000.0));
        assert_eq!(extract("tvl de 1.000.000 y apy de 4").tvl_min, Some(1_000_000.0));
        assert_eq!(extract("tvl de 1,5m").tvl_min, Some(1_500_000.0));
        assert_eq!(extract("apy minimo 5,5").apy_min, Some(5.5));
        assert_eq!(extract("apy de 10, tvl de 2m").apy_min, Some(10.0));
        assert_eq!(extract("al menos 7,25% de apy").apy_min, Some(7.25));
    }

    #[test]
    fn test_malformed_numbers_drop_the_slot() {
        let updates = extract("tvl mayor a 1,2,3 con apy minimo 4");
        assert_eq!(updates.tvl_min, None);
        assert_eq!(updates.apy_min, Some(4.0));
        assert_eq!(extract("apy minimo 1.2.3").apy_min, None);
    }

    #[test]
    fn test_filler_words_are_not_names() {
        let updates = extract("cualquier protocolo en arbitrum");
        assert_eq!(updates.protocol, None);
        assert_eq!(updates.blockchain.as_deref(), Some("arbitrum"));

        assert_eq!(extract("prefiero otro protocolo").protocol, None);
        assert_eq!(extract("ningun protocolo nuevo").protocol, None);
        assert_eq!(extract("prefiero otra red"), SlotUpdates::default());
    }

    #[test]
    fn test_fee_talk_is_not_an_unsupported_chain() {
        let result = RuleExtractor.extract("pools con bajos network fees", &FilterState::default());
        assert_eq!(result, Ok(SlotUpdates::default()));
        assert!(RuleExtractor.extract("red con gas barato", &FilterState::default()).is_ok());
    }

    #[test]
    fn test_chain_idioms_are_not_chains() {
        let updates = extract("muestrame en línea los pools de usdc");
        assert_eq!(updates.blockchain, None);
        assert_eq!(updates.token.as_deref(), Some("usdc"));

        let updates = extract("busca pools en base a mi perfil con apy minimo 5");
        assert_eq!(updates.blockchain, None);
        assert_eq!(updates.apy_min, Some(5.0));

        assert_eq!(extract("con base en el apy de 3").blockchain, None);
        assert_eq!(extract("pools en linea").blockchain, None);
    }

    #[test]
    fn test_linea_needs_chain_context() {
        assert_eq!(extract("red linea").blockchain.as_deref(), Some("linea"));
        assert_eq!(extract("blockchain de linea").blockchain.as_deref(), Some("linea"));
        assert_eq!(extract("linea chain").blockchain.as_deref(), Some("linea"));
        assert_eq!(extract("una linea de texto").blockchain, None);
    }

    #[test]
    fn test_fallback_token_needs_search_verb() {
        assert_eq!(extract("busca usdc").token.as_deref(), Some("usdc"));
        assert_eq!(extract("muestrame las oportunidades").token, None);
        assert!(extract("hola que tal").is_empty());
    }

    #[test]
    fn test_fallback_only_when_nothing_else_matched() {
        let updates = extract("busca en arbitrum");
        assert_eq!(updates.blockchain.as_deref(), Some("arbitrum"));
        assert_eq!(updates.token, None);
    }

    #[test]
    fn test_noop_updates_are_dropped() {
        let prior = FilterState {
            blockchain: Some("arbitrum".to_string()),
            ..Default::default()
        };
        let updates = RuleExtractor.extract("en arbitrum con apy de 4", &prior).unwrap();
        assert_eq!(updates.blockchain, None);
        assert_eq!(updates.apy_min, Some(4.0));
    }
}
