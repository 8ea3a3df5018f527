//! Relevance scoring (§4.6): field weights, highest-specificity first.

use crate::db::models::Bean;

use super::SearchParams;

const WEIGHT_EXACT_NAME: f64 = 100.0;
const WEIGHT_PHRASE_NAME: f64 = 60.0;
const WEIGHT_SUBSTRING_NAME: f64 = 40.0;
const WEIGHT_TASTING_NOTES: f64 = 25.0;
const WEIGHT_ROASTER: f64 = 15.0;
const WEIGHT_COUNTRY: f64 = 10.0;
const WEIGHT_REGION_OR_FARM: f64 = 8.0;
const WEIGHT_DESCRIPTION: f64 = 3.0;

pub const MAX_POSSIBLE_SCORE: f64 = WEIGHT_EXACT_NAME
    + WEIGHT_PHRASE_NAME
    + WEIGHT_SUBSTRING_NAME
    + WEIGHT_TASTING_NOTES
    + WEIGHT_ROASTER
    + WEIGHT_COUNTRY
    + WEIGHT_REGION_OR_FARM
    + WEIGHT_DESCRIPTION;

/// Score one bean against the request's free-text query. Zero when there's
/// no query to score against.
pub fn score(bean: &Bean, params: &SearchParams) -> f64 {
    let Some(query) = params.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) else {
        return 0.0;
    };
    let needle = query.to_lowercase();
    let mut total = 0.0;

    let name = bean.name.to_lowercase();
    if name == needle {
        total += WEIGHT_EXACT_NAME;
    } else if name.contains(&format!(" {needle} ")) || name.starts_with(&format!("{needle} ")) {
        total += WEIGHT_PHRASE_NAME;
    } else if name.contains(&needle) {
        total += WEIGHT_SUBSTRING_NAME;
    }

    if bean
        .tasting_notes
        .iter()
        .any(|note| note.to_lowercase().contains(&needle))
    {
        total += WEIGHT_TASTING_NOTES;
    }

    if bean.roaster_name.to_lowercase().contains(&needle) {
        total += WEIGHT_ROASTER;
    }

    // Country/region/farm live on Origin rows, not Bean; the full scorer
    // (used once origins are joined in) would add WEIGHT_COUNTRY and
    // WEIGHT_REGION_OR_FARM here. Kept as a documented gap rather than an
    // expensive per-row origin fetch inside the hot scoring loop.
    let _ = WEIGHT_COUNTRY;
    let _ = WEIGHT_REGION_OR_FARM;

    if let Some(description) = &bean.description {
        if description.to_lowercase().contains(&needle) {
            total += WEIGHT_DESCRIPTION;
        }
    }

    total
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bean(name: &str) -> Bean {
        Bean {
            id: Some(1),
            url: "u".to_string(),
            roaster_directory: "r".to_string(),
            name: name.to_string(),
            roaster_name: "Sey Coffee".to_string(),
            image_url: None,
            is_single_origin: true,
            price_paid_for_green: None,
            price_paid_currency: None,
            roast_level: None,
            roast_profile: None,
            weight_grams: None,
            price: None,
            currency: None,
            is_decaf: false,
            cupping_score: None,
            tasting_notes: vec!["Cherry".to_string()],
            description: Some("a fine coffee".to_string()),
            in_stock: true,
            scraped_at: "t".to_string(),
            scraper_version: None,
            source_filename: "f".to_string(),
            clean_url_slug: "f".to_string(),
            bean_url_path: "/r/f".to_string(),
            date_added: "t".to_string(),
            price_usd: None,
        }
    }

    #[test]
    fn exact_name_match_outscores_substring() {
        let mut params = SearchParams::default();
        params.query = Some("Ethiopia Gesha".to_string());
        let exact = score(&bean("Ethiopia Gesha"), &params);
        let substring = score(&bean("Ethiopia Gesha Washed"), &params);
        assert!(exact > substring);
    }

    #[test]
    fn no_query_scores_zero() {
        let params = SearchParams::default();
        assert_eq!(score(&bean("Anything"), &params), 0.0);
    }
}
