//! Name-similarity and shared-producer signals for farm clustering (§4.9
//! step 2): "name similarity (token-sorted, accent-stripped) >= threshold
//! AND any shared producer surname".

use unicode_normalization::UnicodeNormalization;

/// Accent-strip and lowercase, then sort tokens so word order doesn't
/// depress the similarity score ("Finca El Paraiso" vs "El Paraiso Finca").
fn token_sorted_fold(name: &str) -> String {
    let stripped: String = name.nfkd().filter(char::is_ascii).collect();
    let mut tokens: Vec<String> = stripped
        .split_whitespace()
        .map(|t| t.to_lowercase())
        .collect();
    tokens.sort();
    tokens.join(" ")
}

/// Jaro-Winkler similarity over token-sorted, accent-stripped names, in
/// `0.0..=1.0`.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    strsim::jaro_winkler(&token_sorted_fold(a), &token_sorted_fold(b))
}

/// Last whitespace-separated token of each producer name, lowercased; a
/// cheap proxy for "shared surname" without a dedicated name-parsing crate.
fn surname(producer: &str) -> Option<String> {
    producer
        .split_whitespace()
        .last()
        .map(|s| s.to_lowercase())
        .filter(|s| !s.is_empty())
}

/// True when any producer listed for `a` shares a surname with any
/// producer listed for `b`.
pub fn shares_producer_surname(producers_a: &[String], producers_b: &[String]) -> bool {
    let surnames_a: Vec<String> = producers_a.iter().filter_map(|p| surname(p)).collect();
    producers_b
        .iter()
        .filter_map(|p| surname(p))
        .any(|s| surnames_a.contains(&s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_order_does_not_depress_similarity() {
        let score = name_similarity("Finca El Paraiso", "El Paraiso Finca");
        assert!(score > 0.95, "expected near-identical score, got {score}");
    }

    #[test]
    fn accents_are_folded_before_comparison() {
        let score = name_similarity("Finca El Paraíso", "Finca El Paraiso");
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn shared_surname_detected_regardless_of_given_name() {
        assert!(shares_producer_surname(
            &["Carlos Mendoza".to_string()],
            &["Ana Mendoza".to_string()]
        ));
        assert!(!shares_producer_surname(
            &["Carlos Mendoza".to_string()],
            &["Ana Ruiz".to_string()]
        ));
    }
}
