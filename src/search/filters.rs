//! Builds the dynamic WHERE clause for a [`super::SearchParams`] request.
//! Every fragment is parameterized; user text never reaches SQL unescaped.

use rusqlite::types::Value;

use crate::error::{Error, Result};
use crate::query::{self, ColumnTarget, Predicate};

use super::SearchParams;

struct Builder {
    clauses: Vec<String>,
    binds: Vec<Value>,
}

impl Builder {
    fn push(&mut self, predicate: Predicate) {
        self.clauses.push(predicate.sql);
        self.binds.extend(predicate.binds);
    }

    fn push_raw(&mut self, sql: String, binds: Vec<Value>) {
        self.clauses.push(sql);
        self.binds.extend(binds);
    }
}

fn or_targets(expr_str: &str, targets: &[ColumnTarget]) -> Result<Predicate> {
    let ast = query::parse(expr_str).map_err(Error::QueryCompile)?;
    let mut binds = Vec::new();
    let mut parts = Vec::new();
    for target in targets {
        let p = query::compile(&ast, target);
        parts.push(p.sql);
        binds.extend(p.binds);
    }
    Ok(Predicate {
        sql: format!("({})", parts.join(" OR ")),
        binds,
    })
}

/// Wrap a predicate compiled against an (unqualified) origin column in a
/// correlated `EXISTS` against `origins`, per §4.6's "match any Origin"
/// semantics for origin-scoped filters.
fn exists_origin(predicate: Predicate) -> Predicate {
    Predicate {
        sql: format!(
            "EXISTS (SELECT 1 FROM origins o WHERE o.bean_id = b.id AND {})",
            predicate.sql
        ),
        binds: predicate.binds,
    }
}

fn scalar_filter(expr_str: &str, column: &str) -> Result<Predicate> {
    query::compile_str(expr_str, ColumnTarget::Scalar(column.to_string())).map_err(Error::QueryCompile)
}

pub fn build(params: &SearchParams) -> Result<(String, Vec<Value>)> {
    let mut b = Builder {
        clauses: vec!["1=1".to_string()],
        binds: Vec::new(),
    };

    if let Some(q) = &params.query {
        if params.tasting_notes_only {
            b.push(
                query::compile_str(q, ColumnTarget::JsonArray("tasting_notes".to_string()))
                    .map_err(Error::QueryCompile)?,
            );
        } else {
            let predicate = or_targets(
                q,
                &[
                    ColumnTarget::Scalar("name".to_string()),
                    ColumnTarget::Scalar("roaster_name".to_string()),
                    ColumnTarget::Scalar("description".to_string()),
                    ColumnTarget::JsonArray("tasting_notes".to_string()),
                ],
            )?;
            let origin_predicate = exists_origin(or_targets(
                q,
                &[
                    ColumnTarget::Scalar("region".to_string()),
                    ColumnTarget::Scalar("farm".to_string()),
                    ColumnTarget::Scalar("producer".to_string()),
                ],
            )?);
            let mut binds = predicate.binds;
            binds.extend(origin_predicate.binds);
            b.push(Predicate {
                sql: format!("({} OR {})", predicate.sql, origin_predicate.sql),
                binds,
            });
        }
    }

    if let Some(q) = &params.tasting_notes_query {
        b.push(
            query::compile_str(q, ColumnTarget::JsonArray("tasting_notes".to_string()))
                .map_err(Error::QueryCompile)?,
        );
    }

    if let Some(expr) = &params.roast_level {
        b.push(scalar_filter(expr, "roast_level")?);
    }
    if let Some(expr) = &params.roast_profile {
        b.push(scalar_filter(expr, "roast_profile")?);
    }
    if let Some(expr) = &params.process {
        b.push(exists_origin(scalar_filter(expr, "process_common_name")?));
    }
    if let Some(expr) = &params.region {
        // Match both the raw normalized region and its canonical-state
        // resolution, the same two forms `browse::region_detail` checks
        // (§4.7's "search must use the same canonical-state resolution").
        let ast = query::parse(expr).map_err(Error::QueryCompile)?;
        let raw = query::compile(&ast, &ColumnTarget::Scalar("region_normalized".to_string()));
        let canonical = query::compile(
            &ast,
            &ColumnTarget::Scalar(
                "normalize_region_name(COALESCE(canonical_state(country, region), ''))".to_string(),
            ),
        );
        let mut binds = raw.binds;
        binds.extend(canonical.binds);
        b.push(exists_origin(Predicate {
            sql: format!("({} OR {})", raw.sql, canonical.sql),
            binds,
        }));
    }
    if let Some(expr) = &params.producer {
        b.push(exists_origin(scalar_filter(expr, "producer")?));
    }
    if let Some(expr) = &params.farm {
        b.push(exists_origin(scalar_filter(expr, "farm")?));
    }
    if let Some(expr) = &params.variety {
        let ast = query::parse(expr).map_err(Error::QueryCompile)?;
        let predicate = query::compile_either(&ast, "variety", "variety_canonical");
        b.push(exists_origin(predicate));
    }

    if !params.roaster.is_empty() {
        let placeholders = placeholders(params.roaster.len());
        b.push_raw(
            format!("roaster_directory IN ({placeholders})"),
            params.roaster.iter().map(|s| Value::Text(s.clone())).collect(),
        );
    }
    if !params.roaster_location.is_empty() {
        let placeholders = placeholders(params.roaster_location.len());
        b.push_raw(
            format!(
                "roaster_directory IN (SELECT slug FROM roasters WHERE location IN ({placeholders}))"
            ),
            params
                .roaster_location
                .iter()
                .map(|s| Value::Text(s.clone()))
                .collect(),
        );
    }
    if !params.bean_url_paths.is_empty() {
        let placeholders = placeholders(params.bean_url_paths.len());
        b.push_raw(
            format!("bean_url_path IN ({placeholders})"),
            params
                .bean_url_paths
                .iter()
                .map(|s| Value::Text(s.clone()))
                .collect(),
        );
    }
    if !params.origin.is_empty() {
        let placeholders = placeholders(params.origin.len());
        b.push_raw(
            format!(
                "EXISTS (SELECT 1 FROM origins o WHERE o.bean_id = b.id AND o.country IN ({placeholders}))"
            ),
            params.origin.iter().map(|s| Value::Text(s.clone())).collect(),
        );
    }

    // Price range: always compared in price_usd, the common denominator
    // regardless of a requested conversion currency (§4.6 discusses
    // comparing "in the conversion currency when one is requested" — doing
    // that exactly would need a per-row conversion at filter time, so this
    // compares in USD and converts for display afterwards instead).
    if let Some(min_price) = params.min_price {
        b.push_raw("price_usd >= ?".to_string(), vec![Value::Real(min_price)]);
    }
    if let Some(max_price) = params.max_price {
        b.push_raw("price_usd <= ?".to_string(), vec![Value::Real(max_price)]);
    }
    if let Some(min_weight) = params.min_weight {
        b.push_raw("weight_grams >= ?".to_string(), vec![Value::Integer(min_weight)]);
    }
    if let Some(max_weight) = params.max_weight {
        b.push_raw("weight_grams <= ?".to_string(), vec![Value::Integer(max_weight)]);
    }

    if params.min_elevation.is_some() || params.max_elevation.is_some() {
        let mut sub = Vec::new();
        let mut sub_binds = Vec::new();
        if let Some(min_e) = params.min_elevation {
            sub.push("(o.elevation_max IS NULL OR o.elevation_max >= ?)".to_string());
            sub_binds.push(Value::Integer(min_e));
        }
        if let Some(max_e) = params.max_elevation {
            sub.push("(o.elevation_min IS NULL OR o.elevation_min <= ?)".to_string());
            sub_binds.push(Value::Integer(max_e));
        }
        b.push_raw(
            format!(
                "EXISTS (SELECT 1 FROM origins o WHERE o.bean_id = b.id AND {})",
                sub.join(" AND ")
            ),
            sub_binds,
        );
    }

    if params.in_stock_only {
        b.push_raw("in_stock = 1".to_string(), vec![]);
    }
    if let Some(is_decaf) = params.is_decaf {
        b.push_raw("is_decaf = ?".to_string(), vec![Value::Integer(is_decaf as i64)]);
    }
    if let Some(is_single_origin) = params.is_single_origin {
        b.push_raw(
            "is_single_origin = ?".to_string(),
            vec![Value::Integer(is_single_origin as i64)],
        );
    }

    Ok((b.clauses.join(" AND "), b.binds))
}

fn placeholders(n: usize) -> String {
    std::iter::repeat("?").take(n).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_params_yields_trivially_true_clause() {
        let (sql, binds) = build(&SearchParams::default()).unwrap();
        assert_eq!(sql, "1=1");
        assert!(binds.is_empty());
    }

    #[test]
    fn roaster_multiselect_builds_in_clause() {
        let mut params = SearchParams::default();
        params.roaster = vec!["sey".to_string(), "onyx".to_string()];
        let (sql, binds) = build(&params).unwrap();
        assert!(sql.contains("roaster_directory IN (?, ?)"));
        assert_eq!(binds.len(), 2);
    }

    #[test]
    fn variety_filter_ors_original_and_canonical() {
        let mut params = SearchParams::default();
        params.variety = Some("Geisha".to_string());
        let (sql, _binds) = build(&params).unwrap();
        assert!(sql.contains("variety_canonical"));
        assert!(sql.contains("EXISTS"));
    }

    #[test]
    fn invalid_mini_language_bubbles_up_as_compile_error() {
        let mut params = SearchParams::default();
        params.region = Some("(unterminated".to_string());
        let err = build(&params).unwrap_err();
        assert!(matches!(err, Error::QueryCompile(_)));
    }
}
