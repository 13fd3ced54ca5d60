//! Static vocabulary and text normalization
//!
//! Chain and protocol tables map the surface forms users type to the
//! canonical identifiers stored in the filter state. Table order matters:
//! the extractor walks the tables top to bottom and the first hit wins.

use crate::error::ParseError;

// =============================================================================
// Terms
// =============================================================================

/// A named entity the user can refer to in several ways.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Term {
    /// Canonical identifier stored in the filter state
    pub id: &'static str,
    /// Name as it appears in the yields dataset
    pub display: &'static str,
    /// Folded (lowercase, no diacritics) surface forms
    pub aliases: &'static [&'static str],
    /// Whether a bare mention without surrounding context counts as a match.
    /// Disabled for names that are also ordinary words.
    pub bare: bool,
}

pub const CHAINS: &[Term] = &[
    Term { id: "ethereum", display: "Ethereum", aliases: &["ethereum"], bare: true },
    Term { id: "arbitrum", display: "Arbitrum", aliases: &["arbitrum"], bare: true },
    Term { id: "solana", display: "Solana", aliases: &["solana"], bare: true },
    Term { id: "avalanche", display: "Avalanche", aliases: &["avalanche"], bare: true },
    Term { id: "polygon", display: "Polygon", aliases: &["polygon"], bare: true },
    Term { id: "bsc", display: "BSC", aliases: &["bsc", "binance", "bnb chain"], bare: true },
    Term { id: "optimism", display: "Optimism", aliases: &["optimism"], bare: true },
    Term { id: "fantom", display: "Fantom", aliases: &["fantom"], bare: true },
    Term { id: "cardano", display: "Cardano", aliases: &["cardano"], bare: true },
    Term { id: "base", display: "Base", aliases: &["base"], bare: false },
    Term { id: "mantle", display: "Mantle", aliases: &["mantle"], bare: true },
    Term { id: "linea", display: "Linea", aliases: &["linea"], bare: false },
    Term { id: "scroll", display: "Scroll", aliases: &["scroll"], bare: false },
    Term { id: "blast", display: "Blast", aliases: &["blast"], bare: false },
    Term { id: "sui", display: "Sui", aliases: &["sui"], bare: true },
    Term { id: "aptos", display: "Aptos", aliases: &["aptos"], bare: true },
    Term { id: "tron", display: "Tron", aliases: &["tron"], bare: true },
    Term { id: "zksync", display: "zkSync Era", aliases: &["zksync era", "zksync"], bare: true },
];

pub const PROTOCOLS: &[Term] = &[
    Term { id: "aave", display: "Aave", aliases: &["aave"], bare: true },
    Term { id: "curve", display: "Curve", aliases: &["curve"], bare: true },
    Term { id: "uniswap", display: "Uniswap", aliases: &["uniswap"], bare: true },
    Term { id: "compound", display: "Compound", aliases: &["compound"], bare: true },
    Term { id: "sushiswap", display: "SushiSwap", aliases: &["sushiswap", "sushi"], bare: true },
    Term { id: "convex", display: "Convex", aliases: &["convex"], bare: true },
    Term { id: "balancer", display: "Balancer", aliases: &["balancer"], bare: true },
    Term { id: "lido", display: "Lido", aliases: &["lido"], bare: true },
    Term { id: "pendle", display: "Pendle", aliases: &["pendle"], bare: true },
    Term { id: "yearn", display: "Yearn", aliases: &["yearn"], bare: true },
    Term { id: "morpho", display: "Morpho", aliases: &["morpho"], bare: true },
    Term { id: "gmx", display: "GMX", aliases: &["gmx"], bare: true },
    Term { id: "raydium", display: "Raydium", aliases: &["raydium"], bare: true },
    Term { id: "orca", display: "Orca", aliases: &["orca"], bare: true },
    Term { id: "kamino", display: "Kamino", aliases: &["kamino"], bare: true },
    Term { id: "jupiter", display: "Jupiter", aliases: &["jupiter"], bare: true },
    Term { id: "meteora", display: "Meteora", aliases: &["meteora"], bare: true },
    Term { id: "marinade", display: "Marinade", aliases: &["marinade"], bare: true },
    Term { id: "beefy", display: "Beefy", aliases: &["beefy"], bare: true },
    Term { id: "velodrome", display: "Velodrome", aliases: &["velodrome"], bare: true },
    Term { id: "aerodrome", display: "Aerodrome", aliases: &["aerodrome"], bare: true },
    Term { id: "stargate", display: "Stargate", aliases: &["stargate"], bare: true },
    Term {
        id: "rocket-pool",
        display: "Rocket Pool",
        aliases: &["rocket pool", "rocketpool", "rocket-pool"],
        bare: true,
    },
];

// =============================================================================
// Word lists
// =============================================================================

/// Articles, prepositions and conversational filler (Spanish and English).
pub const STOPWORDS: &[&str] = &[
    "a", "al", "el", "la", "lo", "los", "las", "de", "del", "en", "con", "por", "para", "un",
    "una", "unos", "unas", "y", "o", "u", "que", "me", "mi", "mis", "tu", "su", "se", "es",
    "hay", "este", "esta", "ese", "esa", "algo", "algun", "alguna", "todo", "todos", "todas",
    "cual", "cuales", "mejor", "mejores", "mas", "menos", "quiero", "dame", "hola", "porfa",
    "favor", "gracias", "solo", "sobre", "entre", "sin", "the", "an", "of", "in", "on", "at",
    "with", "for", "and", "or", "to", "my", "some", "any", "all", "best", "top", "please",
    "want", "give", "hi", "hello", "thanks", "is", "are", "it", "that", "this", "from",
    "cualquier", "cualquiera", "otro", "otra", "otros", "otras", "nuevo", "nueva", "nuevos",
    "nuevas", "ningun", "ninguno", "ninguna", "bajo", "bajos", "baja", "bajas", "alto", "altos",
    "alta", "altas", "prefiero", "other", "another", "new", "no", "low", "high",
];

/// Domain vocabulary that is never itself a token, chain or protocol name.
pub const RESERVED: &[&str] = &[
    "token", "tokens", "blockchain", "blockchains", "chain", "chains", "cadena", "red",
    "network", "protocolo", "protocolos", "protocol", "protocols", "tvl", "apy", "minimo",
    "min", "minimum", "mayor", "superior", "above", "over", "pool", "pools", "oportunidad",
    "oportunidades", "opportunity", "opportunities", "yield", "yields", "rendimiento",
    "rendimientos", "posicion", "posiciones", "position", "positions", "defi", "crypto",
    "cripto", "inversion", "inversiones", "investment", "fee", "fees", "gas", "comision",
    "comisiones",
];

/// Verbs that mark an utterance as an explicit search request.
pub const SEARCH_VERBS: &[&str] = &[
    "buscar", "busca", "buscame", "busco", "mostrar", "muestra", "muestrame", "ver",
    "encontrar", "encuentra", "encuentrame", "search", "find", "show", "look",
];

pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(&word)
}

pub fn is_reserved(word: &str) -> bool {
    RESERVED.contains(&word)
}

/// Stopword or reserved domain word.
pub fn is_filler(word: &str) -> bool {
    is_stopword(word) || is_reserved(word)
}

pub fn is_search_verb(word: &str) -> bool {
    SEARCH_VERBS.contains(&word)
}

// =============================================================================
// Normalization
// =============================================================================

/// Lowercase and strip the diacritics Spanish input commonly carries.
pub fn fold(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}

/// Resolve a chain surface form ("Binance", "BSC", "arbitrum") to its id.
pub fn canonicalize_chain(surface: &str) -> Option<&'static str> {
    let needle = fold(surface.trim());
    CHAINS
        .iter()
        .find(|c| {
            c.id == needle
                || fold(c.display) == needle
                || c.aliases.iter().any(|a| *a == needle)
        })
        .map(|c| c.id)
}

/// Resolve a protocol surface form to its id.
///
/// Exact alias matches win, then prefix matches, then substring matches, so
/// dataset project slugs like `aave-v3` or `morpho-aave` land on the family
/// they start with.
pub fn canonicalize_protocol(surface: &str) -> Option<&'static str> {
    let needle = fold(surface.trim());
    if needle.len() < 2 {
        return None;
    }

    let by = |pred: &dyn Fn(&str) -> bool| {
        PROTOCOLS
            .iter()
            .find(|p| pred(p.id) || p.aliases.iter().any(|&a| pred(a)))
            .map(|p| p.id)
    };

    by(&|a: &str| a == needle)
        .or_else(|| by(&|a: &str| needle.starts_with(a)))
        .or_else(|| by(&|a: &str| needle.contains(a)))
}

/// Key a dataset `project` is compared on: the canonical id when known,
/// otherwise the folded project name.
pub fn protocol_key(project: &str) -> String {
    canonicalize_protocol(project)
        .map(str::to_string)
        .unwrap_or_else(|| fold(project.trim()))
}

/// Key a dataset `chain` is compared on.
pub fn chain_key(chain: &str) -> String {
    canonicalize_chain(chain)
        .map(str::to_string)
        .unwrap_or_else(|| fold(chain.trim()))
}

/// Ids of every supported chain, in table order.
pub fn supported_chains() -> Vec<&'static str> {
    CHAINS.iter().map(|c| c.id).collect()
}

/// Parse a plain non-negative number.
///
/// Accepts comma or dot thousands grouping (`1,000,000`, `1.000.000`), a
/// single decimal comma (`5,5`) and mixed forms (`1,234.5`, `1.234,5`).
/// Trailing punctuation is ignored. Anything else is a `ParseError`.
pub fn normalize_number(text: &str) -> Result<f64, ParseError> {
    let invalid = || ParseError::Magnitude(text.to_string());
    let raw = text.trim().trim_end_matches(|c: char| c == '.' || c == ',');

    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',') {
        return Err(invalid());
    }

    let commas = raw.matches(',').count();
    let dots = raw.matches('.').count();

    let canonical = match (commas, dots) {
        (0, 0) | (0, 1) => raw.to_string(),
        (0, _) if is_grouped(raw, '.') => raw.replace('.', ""),
        (_, 0) if is_grouped(raw, ',') => raw.replace(',', ""),
        (1, 0) => raw.replace(',', "."),
        _ => split_grouped(raw, ',', '.')
            .or_else(|| split_grouped(raw, '.', ','))
            .ok_or_else(invalid)?,
    };

    canonical.parse::<f64>().map_err(|_| invalid())
}

/// `1,234,567`: a 1-3 digit head followed by at least one 3 digit group.
fn is_grouped(digits: &str, separator: char) -> bool {
    let mut parts = digits.split(separator);
    let head = parts.next().unwrap_or_default();
    let mut groups = 0;
    let tail_ok = parts.all(|p| {
        groups += 1;
        p.len() == 3 && p.chars().all(|c| c.is_ascii_digit())
    });

    (1..=3).contains(&head.len()) && head.chars().all(|c| c.is_ascii_digit()) && tail_ok && groups > 0
}

/// Grouped integer part plus a fractional part after `decimal`.
fn split_grouped(raw: &str, group: char, decimal: char) -> Option<String> {
    let (int, frac) = raw.rsplit_once(decimal)?;
    if frac.is_empty() || frac.contains(group) || !is_grouped(int, group) {
        return None;
    }
    Some(format!("{}.{}", int.replace(group, ""), frac))
}

/// Parse an amount with an optional `k` (thousand) or `m` (million) suffix.
///
/// A leading `$` and whitespace before the suffix are tolerated.
pub fn normalize_magnitude(text: &str) -> Result<f64, ParseError> {
    let cleaned = text.trim().trim_start_matches('$').trim();

    let (digits, factor) = match cleaned.chars().last() {
        Some('k' | 'K') => (&cleaned[..cleaned.len() - 1], 1_000.0),
        Some('m' | 'M') => (&cleaned[..cleaned.len() - 1], 1_000_000.0),
        _ => (cleaned, 1.0),
    };

    normalize_number(digits)
        .map(|value| value * factor)
        .map_err(|_| ParseError::Magnitude(text.to_string()))
}
