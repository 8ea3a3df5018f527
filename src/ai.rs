//! Natural-language-to-filters translation (§4.8, §6 `/ai/search`).
//!
//! A small rule-based extractor rather than a call out to a hosted LLM: no
//! AI-provider crate appears anywhere in the corpus this crate is grounded
//! on, so free-text search terms, a price ceiling, and a coffee-origin
//! country are pulled out with known vocabularies and handed to
//! [`crate::search`] the same way a model's structured output would be.

use regex::Regex;
use std::sync::OnceLock;

use crate::canon::country::normalize_country;
use crate::search::SearchParams;

struct NoteKeyword {
    trigger: &'static str,
    pattern: &'static str,
}

const NOTE_KEYWORDS: &[NoteKeyword] = &[
    NoteKeyword { trigger: "fruity", pattern: "fruit*|berry*" },
    NoteKeyword { trigger: "fruit", pattern: "fruit*|berry*" },
    NoteKeyword { trigger: "berry", pattern: "berry*" },
    NoteKeyword { trigger: "floral", pattern: "floral*|jasmine*|rose*" },
    NoteKeyword { trigger: "chocolate", pattern: "chocolate*|cocoa*" },
    NoteKeyword { trigger: "chocolatey", pattern: "chocolate*|cocoa*" },
    NoteKeyword { trigger: "nutty", pattern: "nut*|almond*|hazelnut*" },
    NoteKeyword { trigger: "citrus", pattern: "citrus*|lemon*|orange*" },
    NoteKeyword { trigger: "sweet", pattern: "sweet*|honey*|caramel*" },
];

fn price_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:under|below|less than|<)\s*[£$€]?\s*(\d+(?:\.\d+)?)").unwrap()
    })
}

fn decaf_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bdecaf(?:feinated)?\b").unwrap())
}

/// `normalize_country` is grounded on the scraper-facing noun forms
/// ("Ethiopia"); natural-language queries tend to use the demonym
/// ("Ethiopian") instead, so translate the common ones here before
/// delegating to the shared table.
const DEMONYMS: &[(&str, &str)] = &[
    ("ethiopian", "ethiopia"),
    ("colombian", "colombia"),
    ("kenyan", "kenya"),
    ("brazilian", "brazil"),
    ("guatemalan", "guatemala"),
    ("panamanian", "panama"),
    ("honduran", "honduras"),
    ("salvadoran", "el salvador"),
    ("nicaraguan", "nicaragua"),
    ("mexican", "mexico"),
    ("peruvian", "peru"),
    ("bolivian", "bolivia"),
    ("ecuadorian", "ecuador"),
    ("rwandan", "rwanda"),
    ("burundian", "burundi"),
    ("ugandan", "uganda"),
    ("tanzanian", "tanzania"),
    ("yemeni", "yemen"),
    ("indonesian", "indonesia"),
    ("indian", "india"),
    ("chinese", "china"),
    ("taiwanese", "taiwan"),
    ("vietnamese", "vietnam"),
    ("jamaican", "jamaica"),
    ("haitian", "haiti"),
];

fn demonym_to_noun(word: &str) -> &str {
    DEMONYMS
        .iter()
        .find(|(demonym, _)| *demonym == word)
        .map(|(_, noun)| *noun)
        .unwrap_or(word)
}

/// Heuristically translate free text into [`SearchParams`]. Never fails:
/// an unrecognized query degrades to a plain substring search over `text`.
pub fn translate(text: &str) -> SearchParams {
    let mut params = SearchParams::default();
    let lower = text.to_lowercase();

    if let Some(caps) = price_pattern().captures(&lower) {
        if let Ok(price) = caps[1].parse::<f64>() {
            params.max_price = Some(price);
        }
    }

    if decaf_pattern().is_match(&lower) {
        params.is_decaf = Some(true);
    }

    let mut notes = Vec::new();
    for keyword in NOTE_KEYWORDS {
        if lower.contains(keyword.trigger) && !notes.contains(&keyword.pattern) {
            notes.push(keyword.pattern);
        }
    }
    if !notes.is_empty() {
        params.tasting_notes_query = Some(notes.join("|"));
    }

    let words: Vec<&str> = lower.split_whitespace().collect();
    let mut countries = Vec::new();
    for window in 1..=2 {
        for chunk in words.windows(window) {
            let candidate = chunk.join(" ");
            if candidate.len() < 3 {
                continue;
            }
            let normalized = normalize_country(demonym_to_noun(&candidate));
            if normalized.len() == 2 && normalized.chars().all(|c| c.is_ascii_uppercase()) && !countries.contains(&normalized)
            {
                countries.push(normalized);
            }
        }
    }
    if !countries.is_empty() {
        params.origin = countries;
    }

    // Leftover free text (anything not already captured as a structured
    // field) still seeds a substring search, so an unrecognized phrase
    // isn't discarded entirely.
    if notes_is_empty(&params) && params.origin.is_empty() {
        params.query = Some(text.trim().to_string());
    }

    params
}

fn notes_is_empty(params: &SearchParams) -> bool {
    params.tasting_notes_query.is_none()
}

/// Render a canonical `/v1/search` query string for `params`, for the
/// `/ai/search/redirect` endpoint (§6).
pub fn to_search_query_string(params: &SearchParams) -> String {
    let mut parts = Vec::new();
    if let Some(q) = &params.query {
        parts.push(format!("query={}", urlencode(q)));
    }
    if let Some(q) = &params.tasting_notes_query {
        parts.push(format!("tasting_notes_query={}", urlencode(q)));
    }
    if !params.origin.is_empty() {
        parts.push(format!("origin={}", urlencode(&params.origin.join(","))));
    }
    if let Some(p) = params.max_price {
        parts.push(format!("max_price={p}"));
    }
    if let Some(d) = params.is_decaf {
        parts.push(format!("is_decaf={d}"));
    }
    format!("/v1/search?{}", parts.join("&"))
}

fn urlencode(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' | '~' => c.to_string(),
            ' ' => "+".to_string(),
            _ => c.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_origin_price_and_tasting_notes() {
        let params = translate("fruity Ethiopian under £25");
        assert_eq!(params.origin, vec!["ET".to_string()]);
        assert_eq!(params.max_price, Some(25.0));
        assert_eq!(params.tasting_notes_query.as_deref(), Some("fruit*|berry*"));
    }

    #[test]
    fn decaf_keyword_sets_flag() {
        let params = translate("decaf Colombian");
        assert_eq!(params.is_decaf, Some(true));
        assert_eq!(params.origin, vec!["CO".to_string()]);
    }

    #[test]
    fn unrecognized_text_falls_back_to_substring_query() {
        let params = translate("something obscure");
        assert_eq!(params.query.as_deref(), Some("something obscure"));
    }

    #[test]
    fn redirect_query_string_includes_extracted_fields() {
        let params = translate("fruity Ethiopian under £25");
        let qs = to_search_query_string(&params);
        assert!(qs.starts_with("/v1/search?"));
        assert!(qs.contains("origin=ET"));
        assert!(qs.contains("max_price=25"));
    }
}
