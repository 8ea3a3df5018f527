//! Wildcard/boolean mini-language compiler (§4.5): tokenizes and parses an
//! expression into an AST, then compiles it into a parameterized SQL
//! predicate fragment. Shared by every text-search filter in §4.6.

pub mod ast;
pub mod compiler;

use thiserror::Error;

pub use ast::{parse, Expr};
pub use compiler::{compile, compile_either, ColumnTarget, Predicate};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("unterminated quoted phrase")]
    UnterminatedPhrase,
    #[error("empty expression")]
    EmptyExpression,
    #[error("mismatched parentheses")]
    MismatchedParens,
}

/// Parse and compile `expr` against `target` in one step.
pub fn compile_str(expr: &str, target: ColumnTarget) -> Result<Predicate, CompileError> {
    let ast = parse(expr)?;
    Ok(compile(&ast, &target))
}

/// Parse and compile `expr` against both the original column and a JSON
/// canonical-names array, OR-ing the branches (§4.5 variety special case).
pub fn compile_str_either(
    expr: &str,
    original_col: &str,
    canonical_col: &str,
) -> Result<Predicate, CompileError> {
    let ast = parse(expr)?;
    Ok(compile_either(&ast, original_col, canonical_col))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_str_roundtrips_through_parse_and_compile() {
        let predicate =
            compile_str("Huila|Nariño", ColumnTarget::Scalar("region".to_string())).unwrap();
        assert!(predicate.sql.contains("OR"));
    }

    #[test]
    fn compile_str_propagates_compile_error() {
        let err = compile_str("(unterminated", ColumnTarget::Scalar("region".to_string()))
            .unwrap_err();
        assert_eq!(err, CompileError::MismatchedParens);
    }
}
