//! Full Bean-record JSON shape (§3, §6) and its validation.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct RawOrigin {
    pub country: Option<String>,
    pub region: Option<String>,
    pub producer: Option<String>,
    pub farm: Option<String>,
    pub elevation_min: Option<i64>,
    pub elevation_max: Option<i64>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub process: Option<String>,
    pub variety: Option<String>,
    pub harvest_date: Option<String>,
}

impl RawOrigin {
    fn validate(&self) -> Result<()> {
        if let (Some(min), Some(max)) = (self.elevation_min, self.elevation_max) {
            if min > max {
                return Err(Error::Validation(format!(
                    "elevation_min ({min}) > elevation_max ({max})"
                )));
            }
        }
        for elevation in [self.elevation_min, self.elevation_max].into_iter().flatten() {
            if !(0..=3000).contains(&elevation) {
                return Err(Error::Validation(format!(
                    "elevation {elevation} outside 0..3000"
                )));
            }
        }
        if let Some(harvest) = &self.harvest_date {
            if let Ok(date) = NaiveDate::parse_from_str(harvest, "%Y-%m-%d") {
                let floor = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
                if date < floor {
                    return Err(Error::Validation(format!(
                        "harvest_date {harvest} before 2020-01-01"
                    )));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawBean {
    pub url: String,
    pub name: String,
    pub roaster: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_single_origin: bool,
    #[serde(default)]
    pub price_paid_for_green: Option<f64>,
    #[serde(default)]
    pub price_paid_currency: Option<String>,
    #[serde(default)]
    pub roast_level: Option<String>,
    #[serde(default)]
    pub roast_profile: Option<String>,
    #[serde(default)]
    pub weight_grams: Option<i64>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub is_decaf: bool,
    #[serde(default)]
    pub cupping_score: Option<f64>,
    #[serde(default)]
    pub tasting_notes: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Tri-valued in the source; see the Open Question in the design notes.
    /// `None` is coerced to `Some(true)` by [`RawBean::resolved_in_stock`].
    #[serde(default)]
    pub in_stock: Option<bool>,
    pub scraped_at: String,
    #[serde(default)]
    pub scraper_version: Option<String>,
    #[serde(default)]
    pub origins: Vec<RawOrigin>,
}

impl RawBean {
    /// §9 open question: null `in_stock` is coerced to `true` at ingest,
    /// matching historical behavior, rather than left tri-valued.
    pub fn resolved_in_stock(&self) -> bool {
        self.in_stock.unwrap_or(true)
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(Error::Validation("url must not be empty".to_string()));
        }
        if self.name.trim().is_empty() {
            return Err(Error::Validation("name must not be empty".to_string()));
        }
        if self.origins.is_empty() {
            return Err(Error::Validation(format!(
                "bean {} has no origins",
                self.url
            )));
        }
        if let Some(price) = self.price {
            if price <= 0.0 {
                return Err(Error::Validation(format!("price {price} must be positive")));
            }
        }
        if let Some(weight) = self.weight_grams {
            if !(50..=10_000).contains(&weight) {
                return Err(Error::Validation(format!(
                    "weight_grams {weight} outside 50..10000"
                )));
            }
        }
        if let Some(score) = self.cupping_score {
            if !(70.0..=100.0).contains(&score) {
                return Err(Error::Validation(format!(
                    "cupping_score {score} outside 70..100"
                )));
            }
        }
        for origin in &self.origins {
            origin.validate()?;
        }
        Ok(())
    }

    /// Tasting notes deduplicated and title-cased, per the Bean invariant in
    /// §3. Order of first appearance is preserved.
    pub fn normalized_tasting_notes(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for note in &self.tasting_notes {
            let titled = title_case(note.trim());
            if titled.is_empty() {
                continue;
            }
            if seen.insert(titled.to_lowercase()) {
                out.push(titled);
            }
        }
        out
    }
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse and validate a full Bean-record JSON file.
pub fn parse_and_validate(text: &str) -> Result<RawBean> {
    let bean: RawBean = serde_json::from_str(text)?;
    bean.validate()?;
    Ok(bean)
}
