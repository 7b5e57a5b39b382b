/*!
# Built-in Functions

The function table for call expressions such as `sort_by(xs, &n)`. The
table is a closed enum so selectors stay comparable and cloneable; adding
a built-in means adding a variant, a [`Builtin::lookup`] row, and a
dispatch arm.
*/

use serde_json::Value;

use super::common::value_cmp;
use super::context::EvalContext;
use super::error::{ErrorCode, QueryError};
use super::selector::Selector;

/// A function the compiler can resolve by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// `sort_by(array_expr, key_expr)`: sort an array by a key computed
    /// per element.
    SortBy,
}

impl Builtin {
    /// Resolve a function name, as spelled in an expression.
    #[must_use]
    pub fn lookup(name: &str) -> Option<Self> {
        match name {
            "sort_by" => Some(Self::SortBy),
            _ => None,
        }
    }

    /// The name this function is called by.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SortBy => "sort_by",
        }
    }

    /// Dispatch a call with already-compiled argument selectors.
    pub(crate) fn invoke<'a>(
        self,
        ctx: &'a EvalContext,
        current: &'a Value,
        args: &'a [Selector],
    ) -> Result<&'a Value, QueryError> {
        match self {
            Self::SortBy => sort_by(ctx, current, args),
        }
    }
}

/// `sort_by(array_expr, key_expr)`.
///
/// Evaluates the first argument against the current value and requires it
/// to be an array; anything else is an argument error. The key expression
/// is evaluated once per element up front, then the elements are
/// stable-sorted by the total value order of their keys.
fn sort_by<'a>(
    ctx: &'a EvalContext,
    current: &'a Value,
    args: &'a [Selector],
) -> Result<&'a Value, QueryError> {
    if args.len() != 2 {
        return Err(QueryError::runtime(ErrorCode::InvalidArgument));
    }

    let base = args[0].evaluate(ctx, current)?;
    let Value::Array(items) = base else {
        return Err(QueryError::runtime(ErrorCode::InvalidArgument));
    };
    let key_expr = &args[1];

    let mut keyed: Vec<(Value, Value)> = Vec::with_capacity(items.len());
    for item in items {
        let key = key_expr.evaluate(ctx, item)?.clone();
        keyed.push((key, item.clone()));
    }
    keyed.sort_by(|(a, _), (b, _)| value_cmp(a, b));

    let sorted = keyed.into_iter().map(|(_, item)| item).collect();
    Ok(ctx.store(Value::Array(sorted)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::compile;
    use serde_json::json;

    #[test]
    fn lookup_known_and_unknown() {
        assert_eq!(Builtin::lookup("sort_by"), Some(Builtin::SortBy));
        assert_eq!(Builtin::lookup("sortby"), None);
        assert_eq!(Builtin::SortBy.name(), "sort_by");
    }

    #[test]
    fn sort_by_orders_by_key() {
        let doc = json!({"xs": [{"n": 3}, {"n": 1}, {"n": 2}]});
        let result = compile("sort_by(xs, &n)").unwrap().search(&doc).unwrap();
        assert_eq!(result, json!([{"n": 1}, {"n": 2}, {"n": 3}]));
    }

    #[test]
    fn sort_by_is_stable() {
        let doc = json!({"xs": [
            {"n": 1, "tag": "a"},
            {"n": 0, "tag": "b"},
            {"n": 1, "tag": "c"},
        ]});
        let result = compile("sort_by(xs, &n)").unwrap().search(&doc).unwrap();
        assert_eq!(
            result,
            json!([
                {"n": 0, "tag": "b"},
                {"n": 1, "tag": "a"},
                {"n": 1, "tag": "c"},
            ])
        );
    }

    #[test]
    fn sort_by_sorts_strings() {
        let doc = json!({"people": [{"name": "zoe"}, {"name": "amy"}]});
        let result =
            compile("sort_by(people, &name)").unwrap().search(&doc).unwrap();
        assert_eq!(result, json!([{"name": "amy"}, {"name": "zoe"}]));
    }

    #[test]
    fn sort_by_wrong_arity_is_an_argument_error() {
        let doc = json!({"xs": [1, 2]});
        let err = compile("sort_by(xs)").unwrap().search(&doc).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
    }

    #[test]
    fn sort_by_requires_an_array() {
        let doc = json!({"xs": {"n": 1}});
        let err = compile("sort_by(xs, &n)").unwrap().search(&doc).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
        assert!(err.position().is_some());
    }
}
