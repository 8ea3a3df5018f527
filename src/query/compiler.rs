//! Second pass (§4.5, §9): turns an [`Expr`] into a parameterized SQL
//! fragment and its bind values. Never interpolates user text into SQL.

use rusqlite::types::Value;

use super::ast::Expr;

/// Where a compiled predicate attaches.
#[derive(Debug, Clone)]
pub enum ColumnTarget {
    /// An ordinary scalar text column, e.g. `region` or `producer`.
    Scalar(String),
    /// A JSON array column (`tasting_notes`, `variety_canonical`); the
    /// compiled predicate becomes an existential over `json_each`, per the
    /// tasting-notes special case in §4.5.
    JsonArray(String),
}

/// A compiled predicate fragment: SQL text with `?` placeholders, and the
/// bind values in the order they appear.
#[derive(Debug, Clone)]
pub struct Predicate {
    pub sql: String,
    pub binds: Vec<Value>,
}

impl Predicate {
    fn leaf(sql: String, binds: Vec<Value>) -> Self {
        Self { sql, binds }
    }
}

/// Compile `expr` against `target`.
pub fn compile(expr: &Expr, target: &ColumnTarget) -> Predicate {
    match target {
        ColumnTarget::Scalar(col) => compile_scalar(expr, col),
        ColumnTarget::JsonArray(col) => {
            let inner = compile_scalar(expr, "value");
            Predicate::leaf(
                format!(
                    "EXISTS (SELECT 1 FROM json_each({col}) WHERE {})",
                    inner.sql
                ),
                inner.binds,
            )
        }
    }
}

/// Compile `expr` against both `original_col` and the JSON array
/// `canonical_col`, OR-ing the two branches (§4.5 variety special case).
pub fn compile_either(expr: &Expr, original_col: &str, canonical_col: &str) -> Predicate {
    let a = compile(expr, &ColumnTarget::Scalar(original_col.to_string()));
    let b = compile(expr, &ColumnTarget::JsonArray(canonical_col.to_string()));
    let mut binds = a.binds;
    binds.extend(b.binds);
    Predicate::leaf(format!("({} OR {})", a.sql, b.sql), binds)
}

fn compile_scalar(expr: &Expr, col: &str) -> Predicate {
    match expr {
        Expr::Or(parts) => combine(parts, col, " OR "),
        Expr::And(parts) => combine(parts, col, " AND "),
        Expr::Not(inner) => {
            let p = compile_scalar(inner, col);
            Predicate::leaf(format!("(NOT {})", p.sql), p.binds)
        }
        Expr::Phrase(text) => Predicate::leaf(
            format!("(LOWER({col}) = LOWER(?))"),
            vec![Value::Text(text.clone())],
        ),
        Expr::Term(term) => {
            let has_wildcard = term.contains('*') || term.contains('?');
            let pattern = escape_like(term);
            let pattern = if has_wildcard {
                pattern.replace('*', "%").replace('?', "_")
            } else {
                format!("%{pattern}%")
            };
            Predicate::leaf(
                format!("({col} LIKE ? ESCAPE '\\')"),
                vec![Value::Text(pattern)],
            )
        }
    }
}

fn combine(parts: &[Expr], col: &str, joiner: &str) -> Predicate {
    let compiled: Vec<Predicate> = parts.iter().map(|p| compile_scalar(p, col)).collect();
    let sql = compiled
        .iter()
        .map(|p| p.sql.clone())
        .collect::<Vec<_>>()
        .join(joiner);
    let binds = compiled.into_iter().flat_map(|p| p.binds).collect();
    Predicate::leaf(format!("({sql})"), binds)
}

/// Escape SQL LIKE metacharacters that are literal in the source term,
/// before wildcard substitution replaces `*`/`?` with `%`/`_`.
fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        match c {
            '%' | '_' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ast::parse;

    #[test]
    fn bare_term_is_substring_match() {
        let expr = parse("huila").unwrap();
        let p = compile(&expr, &ColumnTarget::Scalar("region".to_string()));
        assert_eq!(p.binds, vec![Value::Text("%huila%".to_string())]);
        assert!(p.sql.contains("region LIKE ?"));
    }

    #[test]
    fn wildcard_term_maps_to_percent_and_underscore() {
        let expr = parse("fruit*").unwrap();
        let p = compile(&expr, &ColumnTarget::Scalar("tasting_notes".to_string()));
        assert_eq!(p.binds, vec![Value::Text("fruit%".to_string())]);
    }

    #[test]
    fn literal_percent_is_escaped() {
        let expr = parse("100%").unwrap();
        let p = compile(&expr, &ColumnTarget::Scalar("name".to_string()));
        assert_eq!(p.binds, vec![Value::Text("%100\\%%".to_string())]);
    }

    #[test]
    fn phrase_is_exact_case_insensitive() {
        let expr = parse("\"Costa Rica\"").unwrap();
        let p = compile(&expr, &ColumnTarget::Scalar("country_full_name".to_string()));
        assert!(p.sql.contains("LOWER(country_full_name) = LOWER(?)"));
        assert_eq!(p.binds, vec![Value::Text("Costa Rica".to_string())]);
    }

    #[test]
    fn json_array_target_wraps_in_exists() {
        let expr = parse("cherry").unwrap();
        let p = compile(&expr, &ColumnTarget::JsonArray("tasting_notes".to_string()));
        assert!(p.sql.starts_with("EXISTS (SELECT 1 FROM json_each(tasting_notes)"));
    }

    #[test]
    fn either_target_ors_original_and_canonical() {
        let expr = parse("geisha").unwrap();
        let p = compile_either(&expr, "variety", "variety_canonical");
        assert!(p.sql.contains(" OR "));
        assert_eq!(p.binds.len(), 2);
    }

    #[test]
    fn not_and_and_or_combine() {
        let expr = parse("a&!b").unwrap();
        let p = compile(&expr, &ColumnTarget::Scalar("process".to_string()));
        assert!(p.sql.contains("AND"));
        assert!(p.sql.contains("NOT"));
    }
}
