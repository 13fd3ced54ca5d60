//! Intent routing
//!
//! Classifies an utterance before any slot parsing. Priority is fixed:
//! reset, then chart request, then position detail, then the default
//! slot update + search path.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::lexicon;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Clear every slot and the cached results
    Reset,
    /// Compare the cached opportunities' APY history
    ChartRequest,
    /// Show the full record at a 1-based position of the cached results
    PositionDetail { position: usize },
    /// Parse slots (if any) and search
    SlotUpdateOrSearch,
}

static RESET_RULE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:reset|borra|limpia|reinicia|clear\b|start\s+over)").expect("static pattern")
});

static CHART_RULES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\bgrafic[oa]s?\b",
        r"\bcharts?\b",
        r"\bgraph\b",
        r"\bplot\b",
        r"\bcompar(?:a|ar|ame|e|acion|ison|ativa)\b",
        r"\bevolucion\b",
        r"\bevolution\b",
        r"\btendencias?\b",
        r"\btrends?\b",
        r"\bhistoric[oa]\b",
        r"\bhistor(?:y|ial)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static pattern"))
    .collect()
});

static POSITION_RULES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\bmas\s*info(?:rmacion)?\s*(?:de|sobre|del)?\s*(?:la|el)?\s*(?:posicion)?\s*#?(\d+)",
        r"\binfo(?:rmacion)?\s*(?:de|sobre|del)?\s*(?:la|el)?\s*(?:posicion)?\s*#?(\d+)",
        r"\bdetalles?\s*(?:de|sobre|del)?\s*(?:la|el)?\s*(?:posicion)?\s*#?(\d+)",
        r"\bdame\s*(?:mas)?\s*(?:info)?\s*(?:de|sobre)?\s*(?:la|el)?\s*(?:posicion)?\s*#?(\d+)",
        r"\bver\s*(?:la|el)?\s*(?:posicion)?\s*#?(\d+)",
        r"\bmostrar\s*(?:la|el)?\s*(?:posicion)?\s*#?(\d+)",
        r"\bmas\s*sobre\s*(?:el|la)?\s*(?:posicion)?\s*#?(\d+)",
        r"\b(?:details?|more\s+info|info)\s+(?:about|on|of|for)\s+(?:position\s*)?#?(\d+)",
        r"\b(?:posicion|position)\s*#?(\d+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static pattern"))
    .collect()
});

static STRIP_RULE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"['"()]"#).expect("static pattern"));

/// Nouns that turn "dame 5 pools" into a listing request rather than a
/// reference to position 5.
const COUNTED_NOUNS: &[&str] = &[
    "pools", "pool", "oportunidades", "opportunities", "resultados", "results", "mejores",
    "tokens", "opciones", "options",
];

/// Classify an utterance.
pub fn route(utterance: &str) -> Intent {
    let text = lexicon::fold(utterance);

    if RESET_RULE.is_match(&text) {
        return Intent::Reset;
    }

    if CHART_RULES.iter().any(|rule| rule.is_match(&text)) {
        return Intent::ChartRequest;
    }

    if let Some(position) = detect_position(&text) {
        return Intent::PositionDetail { position };
    }

    Intent::SlotUpdateOrSearch
}

/// 1-based position referenced by a detail request, if any.
pub fn detect_position(utterance: &str) -> Option<usize> {
    let text = STRIP_RULE.replace_all(&lexicon::fold(utterance), "").into_owned();

    for rule in POSITION_RULES.iter() {
        let Some(caps) = rule.captures(&text) else {
            continue;
        };
        let Some(number) = caps.get(1) else {
            continue;
        };

        let next_word = text[number.end()..].split_whitespace().next().unwrap_or("");
        if COUNTED_NOUNS.contains(&next_word) {
            continue;
        }

        if let Ok(position) = number.as_str().parse::<usize>() {
            return Some(position);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_synonyms() {
        for text in ["reset", "Resetear todo", "borrar filtros", "limpiar", "reinicia por favor", "clear"] {
            assert_eq!(route(text), Intent::Reset, "{text}");
        }
    }

    #[test]
    fn test_reset_needs_word_start() {
        // "clearpool" is a protocol, not a reset
        assert_ne!(route("protocolo clearpool"), Intent::Reset);
    }

    #[test]
    fn test_position_detail_variants() {
        assert_eq!(detect_position("Más información de la posición 2"), Some(2));
        assert_eq!(detect_position("info 3"), Some(3));
        assert_eq!(detect_position("detalles del 1"), Some(1));
        assert_eq!(detect_position("dame la posicion (4)"), Some(4));
        assert_eq!(detect_position("ver \"5\""), Some(5));
        assert_eq!(detect_position("more info about position 2"), Some(2));
        assert_eq!(detect_position("apy minimo 5"), None);
    }

    #[test]
    fn test_counted_listing_is_not_a_position() {
        assert_eq!(detect_position("dame 5 pools en arbitrum"), None);
    }

    #[test]
    fn test_position_zero_is_still_a_detail_request() {
        assert_eq!(route("info 0"), Intent::PositionDetail { position: 0 });
    }

    #[test]
    fn test_chart_requests() {
        assert_eq!(route("hazme un gráfico"), Intent::ChartRequest);
        assert_eq!(route("compara las posiciones"), Intent::ChartRequest);
        assert_eq!(route("show me the APY trend"), Intent::ChartRequest);
        assert_eq!(route("evolución del apy"), Intent::ChartRequest);
    }

    #[test]
    fn test_priority_reset_over_chart() {
        assert_eq!(route("borrar el grafico"), Intent::Reset);
    }

    #[test]
    fn test_priority_chart_over_position() {
        assert_eq!(route("grafico de la posicion 2"), Intent::ChartRequest);
    }

    #[test]
    fn test_priority_position_over_slots() {
        assert_eq!(
            route("info de la posicion 2 en arbitrum"),
            Intent::PositionDetail { position: 2 }
        );
    }

    #[test]
    fn test_default_is_slot_update() {
        assert_eq!(route("token ETH en arbitrum"), Intent::SlotUpdateOrSearch);
        assert_eq!(route("apy mayor a 5"), Intent::SlotUpdateOrSearch);
    }
}
