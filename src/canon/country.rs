//! Country name/alpha-3/common-alias normalization to ISO alpha-2 (§4.3 step
//! 11). Deliberately a static table rather than a full ISO-3166 dependency:
//! coverage is scoped to coffee-origin countries and the aliases scrapers
//! commonly emit. Unrecognized values pass through unchanged, per spec.

use std::collections::HashMap;
use std::sync::OnceLock;

fn table() -> &'static HashMap<&'static str, &'static str> {
    static TABLE: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut m = HashMap::new();
        let entries: &[(&str, &str)] = &[
            ("ethiopia", "ET"),
            ("eth", "ET"),
            ("colombia", "CO"),
            ("col", "CO"),
            ("kenya", "KE"),
            ("ken", "KE"),
            ("brazil", "BR"),
            ("bra", "BR"),
            ("guatemala", "GT"),
            ("gtm", "GT"),
            ("costa rica", "CR"),
            ("cri", "CR"),
            ("panama", "PA"),
            ("pan", "PA"),
            ("honduras", "HN"),
            ("hnd", "HN"),
            ("el salvador", "SV"),
            ("slv", "SV"),
            ("nicaragua", "NI"),
            ("nic", "NI"),
            ("mexico", "MX"),
            ("méxico", "MX"),
            ("mex", "MX"),
            ("peru", "PE"),
            ("perú", "PE"),
            ("per", "PE"),
            ("bolivia", "BO"),
            ("bol", "BO"),
            ("ecuador", "EC"),
            ("ecu", "EC"),
            ("rwanda", "RW"),
            ("rwa", "RW"),
            ("burundi", "BI"),
            ("bdi", "BI"),
            ("uganda", "UG"),
            ("uga", "UG"),
            ("tanzania", "TZ"),
            ("tza", "TZ"),
            ("yemen", "YE"),
            ("yem", "YE"),
            ("indonesia", "ID"),
            ("idn", "ID"),
            ("papua new guinea", "PG"),
            ("png", "PG"),
            ("india", "IN"),
            ("ind", "IN"),
            ("china", "CN"),
            ("chn", "CN"),
            ("taiwan", "TW"),
            ("twn", "TW"),
            ("vietnam", "VN"),
            ("viet nam", "VN"),
            ("vnm", "VN"),
            ("dominican republic", "DO"),
            ("dom", "DO"),
            ("jamaica", "JM"),
            ("jam", "JM"),
            ("haiti", "HT"),
            ("hti", "HT"),
            ("united states", "US"),
            ("usa", "US"),
            ("united states of america", "US"),
        ];
        for (k, v) in entries {
            m.insert(*k, *v);
        }
        m
    })
}

/// Normalize a country name, alpha-3, or known alias to ISO alpha-2. Values
/// that already look like an alpha-2 code, or that aren't recognized, are
/// returned unchanged (uppercased if two letters) per §4.3 step 11.
pub fn normalize_country(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.len() == 2 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        return trimmed.to_uppercase();
    }
    match table().get(trimmed.to_lowercase().as_str()) {
        Some(alpha2) => alpha2.to_string(),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_through_existing_alpha2() {
        assert_eq!(normalize_country("co"), "CO");
        assert_eq!(normalize_country("ET"), "ET");
    }

    #[test]
    fn maps_full_name_and_alias() {
        assert_eq!(normalize_country("Colombia"), "CO");
        assert_eq!(normalize_country("Costa Rica"), "CR");
        assert_eq!(normalize_country("gtm"), "GT");
    }

    #[test]
    fn unknown_value_passes_through() {
        assert_eq!(normalize_country("Atlantis"), "Atlantis");
    }
}
