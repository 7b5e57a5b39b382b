//! # JMESPath Queries
//!
//! Compile JMESPath expressions and evaluate them against JSON documents:
//! - Field access, indexing, slicing with negative bounds and steps
//! - List, flatten, and object projections with null-dropping semantics
//! - Filters, multi-select lists and hashes, pipes, literals
//! - Built-in functions (`sort_by`)
//!
//! The usual entry points are [`search`] for one-shot evaluation and
//! [`compile`] when an expression is evaluated against many documents.
//!
//! ```rust
//! use jmesquery::query::search;
//! use serde_json::json;
//!
//! let doc = json!({"xs": [{"k": 1}, {"k": 2}, {"k": 3}]});
//! assert_eq!(search(&doc, "xs[?k > `1`].k").unwrap(), json!([2, 3]));
//! ```

pub mod error;
pub mod parser;
pub mod selector;

mod common;
mod context;
mod functions;

use serde_json::Value;

// Re-exports
pub use common::{Comparator, Slice};
pub use error::{ErrorCode, QueryError};
pub use functions::Builtin;
pub use parser::compile;
pub use selector::{Expression, Selector};

/// Evaluate `expression` against `root` and return the derived value.
///
/// This is the one-shot form of [`compile`] followed by
/// [`Expression::search`]; prefer the two-step form to reuse a compiled
/// expression across documents.
///
/// # Examples
///
/// ```rust
/// use jmesquery::query::search;
/// use serde_json::json;
///
/// let doc = json!({"a": {"b": {"c": 42}}});
/// assert_eq!(search(&doc, "a.b.c").unwrap(), json!(42));
/// ```
///
/// # Errors
///
/// Returns a [`QueryError`] when the expression fails to compile or a
/// built-in function is invoked with bad arguments.
pub fn search(root: &Value, expression: &str) -> Result<Value, QueryError> {
    compile(expression)?.search(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dotted_chain_reaches_nested_values() {
        let doc = json!({"a": {"b": {"c": 42}}});
        assert_eq!(search(&doc, "a.b.c").unwrap(), json!(42));
    }

    #[test]
    fn member_access_returns_the_member_unchanged() {
        let nested = json!({"deep": [1, {"x": null}]});
        let doc = json!({"a": nested.clone()});
        assert_eq!(search(&doc, "a").unwrap(), nested);
    }

    #[test]
    fn sort_by_orders_an_array_of_objects() {
        let doc = json!({"xs": [{"n": 3}, {"n": 1}, {"n": 2}]});
        assert_eq!(
            search(&doc, "sort_by(xs, &n)").unwrap(),
            json!([{"n": 1}, {"n": 2}, {"n": 3}])
        );
    }

    #[test]
    fn slices_step_and_reverse() {
        let doc = json!({"xs": [1, 2, 3, 4]});
        assert_eq!(search(&doc, "xs[0:4:2]").unwrap(), json!([1, 3]));
        assert_eq!(search(&doc, "xs[::-1]").unwrap(), json!([4, 3, 2, 1]));
    }

    #[test]
    fn slice_with_unit_step_round_trips_the_array() {
        let doc = json!({"xs": ["a", "b", "c"]});
        assert_eq!(search(&doc, "xs[0:3]").unwrap(), doc["xs"]);
    }

    #[test]
    fn filters_compose_with_projections() {
        let doc = json!({"xs": [{"k": 1}, {"k": 2}, {"k": 3}]});
        assert_eq!(search(&doc, "xs[?k > `1`].k").unwrap(), json!([2, 3]));
        assert_eq!(search(&doc, "xs[?k == `2`].k").unwrap(), json!([2]));
        assert_eq!(search(&doc, "xs[?k != `2`].k").unwrap(), json!([1, 3]));
    }

    #[test]
    fn flatten_splices_one_level() {
        let doc = json!({"xs": [[1, 2], [3, [4, 5]], 6]});
        assert_eq!(search(&doc, "xs[]").unwrap(), json!([1, 2, 3, [4, 5], 6]));
    }

    #[test]
    fn multi_select_hash_builds_an_object() {
        let doc = json!({"a": {"x": 1, "y": 2}});
        assert_eq!(
            search(&doc, "a.{p: x, q: y}").unwrap(),
            json!({"p": 1, "q": 2})
        );
    }

    #[test]
    fn pipe_applies_to_the_whole_array() {
        let doc = json!({"xs": [{"n": 1}, {"n": 2}]});
        assert_eq!(search(&doc, "xs | [1].n").unwrap(), json!(2));
    }

    #[test]
    fn pipe_over_a_non_array_yields_null() {
        let doc = json!({"a": {"b": 1}});
        assert_eq!(search(&doc, "a | b").unwrap(), json!(null));
    }

    #[test]
    fn projections_over_empty_collections_are_empty() {
        assert_eq!(search(&json!({"xs": []}), "xs[*]").unwrap(), json!([]));
        assert_eq!(search(&json!({"o": {}}), "o.*.x").unwrap(), json!([]));
    }

    #[test]
    fn missing_paths_prune_to_null() {
        let doc = json!({"a": 1});
        assert_eq!(search(&doc, "b.c.d").unwrap(), json!(null));
        assert_eq!(search(&doc, "a.b").unwrap(), json!(null));
    }

    #[test]
    fn object_projection_collects_values() {
        let doc = json!({"ops": {"a": {"n": 1}, "b": {"n": 2}}});
        assert_eq!(search(&doc, "ops.*.n").unwrap(), json!([1, 2]));
    }

    #[test]
    fn parse_failures_surface_with_codes() {
        let doc = json!({});
        let err = search(&doc, "a..").unwrap_err();
        assert_eq!(err.code(), ErrorCode::ExpectedIdentifier);
    }
}
