//! Slug normalization shared by region and farm canonicalization (§4.2).
//!
//! NFKD-decompose, strip to ASCII, lowercase, collapse non-alphanumerics to
//! single hyphens, trim. Grounded on the original Python `normalize_region_name`
//! / `normalize_farm_name` (`api/db.py`), translated to the `unicode-normalization`
//! crate instead of Python's `unicodedata`.

use unicode_normalization::UnicodeNormalization;

/// Normalize a region or farm name into a URL-friendly slug.
pub fn normalize_slug(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }
    let ascii_only: String = input.nfkd().filter(char::is_ascii).collect();
    let mut slug = String::with_capacity(ascii_only.len());
    let mut last_was_hyphen = true; // suppress leading hyphens
    for ch in ascii_only.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Alias retained for call sites that name the field they're slugging.
pub fn normalize_region_name(region: &str) -> String {
    normalize_slug(region)
}

pub fn normalize_farm_name(farm: &str) -> String {
    normalize_slug(farm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_accents_and_hyphenates() {
        assert_eq!(normalize_slug("Huila"), "huila");
        assert_eq!(normalize_slug("Nariño"), "narino");
        assert_eq!(normalize_slug("Finca El Paraíso"), "finca-el-paraiso");
    }

    #[test]
    fn empty_input_is_empty_slug() {
        assert_eq!(normalize_slug(""), "");
    }

    #[test]
    fn collapses_runs_of_punctuation() {
        assert_eq!(normalize_slug("San  José -- Farm!!"), "san-jose-farm");
    }
}
