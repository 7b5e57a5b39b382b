/*!
# Selector IR

The evaluable intermediate representation of a compiled expression. The
compiler emits a tree of [`Selector`] nodes; evaluation walks that tree
over a JSON document, threading an [`EvalContext`](super::context) that
owns every intermediate value built along the way.

Selectors are deliberately forgiving: applying one to a value of the wrong
kind yields `null` rather than an error, which is what lets expressions
like `a.b.c` prune silently when `b` is missing. Errors are reserved for
bad function arguments.

## Examples

Compiled expressions evaluate against `serde_json` values:

```rust
use jmesquery::query::compile;
use serde_json::json;

let expr = compile("xs[*].name").unwrap();
let doc = json!({"xs": [{"name": "a"}, {"name": "b"}]});
assert_eq!(expr.search(&doc).unwrap(), json!(["a", "b"]));
```
*/

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use super::common::{Comparator, Slice};
use super::context::{EvalContext, NULL};
use super::error::{ErrorCode, QueryError};
use super::functions::Builtin;

/// A node in the compiled expression tree.
///
/// Compound variants own their children. The `lhs`/`rhs` pairs of the
/// projection-like variants hold the expression producing the collection
/// to walk and the selector sequence applied to each element.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    /// Sequential composition: each child consumes the previous child's
    /// output. An empty sequence is the identity.
    SubExpression(Vec<Selector>),
    /// Field access by name, with a fallback that maps the access across
    /// an array of objects.
    Identifier(String),
    /// Positional array access; negative indices count from the end.
    Index(i64),
    /// Array slice access.
    Slice(Slice),
    /// A constant embedded in the expression (`` `…` `` or `'…'`).
    Literal(Value),
    /// `lhs[*]`: map `rhs` across the elements of an array.
    ListProjection {
        lhs: Box<Selector>,
        rhs: Vec<Selector>,
    },
    /// `lhs[]`: splice nested arrays one level, then map `rhs`.
    FlattenProjection {
        lhs: Box<Selector>,
        rhs: Vec<Selector>,
    },
    /// `lhs.*`: map `rhs` across the values of an object.
    ObjectProjection {
        lhs: Box<Selector>,
        rhs: Vec<Selector>,
    },
    /// `lhs | rhs`: feed the left-hand array to the right as a single
    /// value (no per-element fanout); a non-array left result is null.
    Pipe {
        lhs: Box<Selector>,
        rhs: Vec<Selector>,
    },
    /// `lhs[?left CMP right]`: keep the elements for which the comparison
    /// holds.
    Filter {
        cmp: Comparator,
        lhs: Box<Selector>,
        rhs: Vec<Selector>,
    },
    /// `[e1, e2, …]`: evaluate every child on the same input and collect
    /// the results into an array.
    MultiSelectList(Vec<Selector>),
    /// `{k1: e1, k2: e2, …}`: evaluate every child on the same input and
    /// collect the results into an object, preserving entry order.
    MultiSelectHash(Vec<(String, Selector)>),
    /// A call to a built-in function with compiled argument selectors.
    Function {
        builtin: Builtin,
        args: Vec<Selector>,
    },
    /// Wrap a child's result in a single-key object.
    NameExpression {
        name: String,
        inner: Box<Selector>,
    },
}

impl Selector {
    /// Append `child` to the variant's accumulating sequence: the children
    /// of a sub-expression, the arguments of a function call, or the
    /// right-hand sequence of a projection, pipe, or filter.
    ///
    /// The compiler only calls this on frames holding one of those kinds;
    /// the remaining kinds take no children and ignore the call.
    pub(crate) fn add_child(&mut self, child: Selector) {
        match self {
            Self::SubExpression(children) => children.push(child),
            Self::Function { args, .. } => args.push(child),
            Self::ListProjection { rhs, .. }
            | Self::FlattenProjection { rhs, .. }
            | Self::ObjectProjection { rhs, .. }
            | Self::Pipe { rhs, .. }
            | Self::Filter { rhs, .. } => rhs.push(child),
            _ => {}
        }
    }

    /// Evaluate this selector against `current`, returning a reference
    /// into the input document, the compiled expression, or `ctx`.
    pub(crate) fn evaluate<'a>(
        &'a self,
        ctx: &'a EvalContext,
        current: &'a Value,
    ) -> Result<&'a Value, QueryError> {
        match self {
            Self::SubExpression(children) => apply(children, ctx, current),
            Self::Identifier(name) => match current {
                Value::Object(map) => Ok(map.get(name).unwrap_or(&NULL)),
                Value::Array(items) => {
                    let mut found = Vec::new();
                    for item in items {
                        if let Value::Object(map) = item
                            && let Some(value) = map.get(name)
                        {
                            found.push(value.clone());
                        }
                    }
                    Ok(ctx.store(Value::Array(found)))
                }
                _ => Ok(&NULL),
            },
            Self::Index(index) => {
                let Value::Array(items) = current else {
                    return Ok(&NULL);
                };
                let len = items.len() as i64;
                let resolved = if *index >= 0 { *index } else { len + *index };
                if (0..len).contains(&resolved) {
                    Ok(&items[resolved as usize])
                } else {
                    Ok(&NULL)
                }
            }
            Self::Slice(slice) => {
                let Value::Array(items) = current else {
                    return Ok(&NULL);
                };
                // Unreachable through the compiler, which rejects a zero
                // step, but hand-built selectors must not spin forever.
                if slice.step == 0 {
                    return Err(QueryError::runtime(ErrorCode::InvalidArgument));
                }
                let start = slice.resolved_start(items.len());
                let end = slice.resolved_end(items.len());
                let mut taken = Vec::new();
                if slice.step > 0 {
                    let mut i = start;
                    while i < end {
                        taken.push(items[i as usize].clone());
                        i += slice.step;
                    }
                } else {
                    let mut i = end - 1;
                    while i >= start {
                        taken.push(items[i as usize].clone());
                        i += slice.step;
                    }
                }
                Ok(ctx.store(Value::Array(taken)))
            }
            Self::Literal(value) => Ok(value),
            Self::ListProjection { lhs, rhs } => {
                let Value::Array(items) = lhs.evaluate(ctx, current)? else {
                    return Ok(&NULL);
                };
                project(rhs, ctx, items.iter())
            }
            Self::FlattenProjection { lhs, rhs } => {
                let Value::Array(items) = lhs.evaluate(ctx, current)? else {
                    return Ok(&NULL);
                };
                let mut spliced: Vec<&Value> = Vec::new();
                for item in items {
                    match item {
                        Value::Array(inner) => spliced.extend(inner.iter()),
                        other => spliced.push(other),
                    }
                }
                project(rhs, ctx, spliced)
            }
            Self::ObjectProjection { lhs, rhs } => {
                let Value::Object(map) = lhs.evaluate(ctx, current)? else {
                    return Ok(&NULL);
                };
                project(rhs, ctx, map.values())
            }
            Self::Pipe { lhs, rhs } => {
                let piped = lhs.evaluate(ctx, current)?;
                if !piped.is_array() {
                    return Ok(&NULL);
                }
                apply(rhs, ctx, piped)
            }
            Self::Filter { cmp, lhs, rhs } => {
                let Value::Array(items) = current else {
                    return Ok(&NULL);
                };
                let mut kept = Vec::new();
                for item in items {
                    let left = lhs.evaluate(ctx, item)?;
                    let right = apply(rhs, ctx, item)?;
                    if cmp.compare(left, right) == Some(true) {
                        kept.push(item.clone());
                    }
                }
                Ok(ctx.store(Value::Array(kept)))
            }
            Self::MultiSelectList(children) => {
                if !current.is_object() {
                    return Ok(&NULL);
                }
                let mut collected = Vec::with_capacity(children.len());
                for child in children {
                    collected.push(child.evaluate(ctx, current)?.clone());
                }
                Ok(ctx.store(Value::Array(collected)))
            }
            Self::MultiSelectHash(entries) => {
                if !current.is_object() {
                    return Ok(&NULL);
                }
                let mut collected = Map::new();
                for (key, child) in entries {
                    let value = child.evaluate(ctx, current)?.clone();
                    collected.entry(key.clone()).or_insert(value);
                }
                Ok(ctx.store(Value::Object(collected)))
            }
            Self::Function { builtin, args } => builtin.invoke(ctx, current, args),
            Self::NameExpression { name, inner } => {
                let mut wrapped = Map::new();
                let value = inner.evaluate(ctx, current)?.clone();
                wrapped.insert(name.clone(), value);
                Ok(ctx.store(Value::Object(wrapped)))
            }
        }
    }
}

/// Fold a selector sequence over a single value.
fn apply<'a>(
    selectors: &'a [Selector],
    ctx: &'a EvalContext,
    value: &'a Value,
) -> Result<&'a Value, QueryError> {
    let mut current = value;
    for selector in selectors {
        current = selector.evaluate(ctx, current)?;
    }
    Ok(current)
}

/// Map a right-hand selector sequence across `items`, dropping every
/// element whose final value is null.
fn project<'a>(
    rhs: &'a [Selector],
    ctx: &'a EvalContext,
    items: impl IntoIterator<Item = &'a Value>,
) -> Result<&'a Value, QueryError> {
    let mut collected = Vec::new();
    for item in items {
        let value = apply(rhs, ctx, item)?;
        if !value.is_null() {
            collected.push(value.clone());
        }
    }
    Ok(ctx.store(Value::Array(collected)))
}

impl fmt::Display for Selector {
    /// Best-effort rendering of an equivalent expression, for diagnostics.
    /// The output is not guaranteed to round-trip through the compiler
    /// character for character.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SubExpression(children) => fmt_chain(f, false, children),
            Self::Identifier(name) => {
                if needs_quoting(name) {
                    write!(f, "\"{}\"", escape_quoted(name))
                } else {
                    write!(f, "{name}")
                }
            }
            Self::Index(index) => write!(f, "[{index}]"),
            Self::Slice(slice) => {
                write!(f, "[{}:", slice.start)?;
                if let Some(end) = slice.end {
                    write!(f, "{end}")?;
                }
                if slice.step != 1 {
                    write!(f, ":{}", slice.step)?;
                }
                write!(f, "]")
            }
            Self::Literal(value) => {
                let text = serde_json::to_string(value).map_err(|_| fmt::Error)?;
                write!(f, "`{text}`")
            }
            Self::ListProjection { lhs, rhs } => {
                write!(f, "{lhs}[*]")?;
                fmt_chain(f, true, rhs)
            }
            Self::FlattenProjection { lhs, rhs } => {
                write!(f, "{lhs}[]")?;
                fmt_chain(f, true, rhs)
            }
            Self::ObjectProjection { lhs, rhs } => {
                let base = lhs.to_string();
                if base.is_empty() {
                    write!(f, "*")?;
                } else {
                    write!(f, "{base}.*")?;
                }
                fmt_chain(f, true, rhs)
            }
            Self::Pipe { lhs, rhs } => {
                write!(f, "{lhs} | ")?;
                fmt_chain(f, false, rhs)
            }
            Self::Filter { cmp, lhs, rhs } => {
                write!(f, "[?{lhs} {} ", cmp.symbol())?;
                fmt_chain(f, false, rhs)?;
                write!(f, "]")
            }
            Self::MultiSelectList(children) => {
                write!(f, "[")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{child}")?;
                }
                write!(f, "]")
            }
            Self::MultiSelectHash(entries) => {
                write!(f, "{{")?;
                for (i, (key, child)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {child}")?;
                }
                write!(f, "}}")
            }
            Self::Function { builtin, args } => {
                write!(f, "{}(", builtin.name())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Self::NameExpression { name, inner } => {
                write!(f, "{{{name}: {inner}}}")
            }
        }
    }
}

/// Join a selector sequence, inserting `.` except before bracketed steps.
fn fmt_chain(
    f: &mut fmt::Formatter<'_>,
    mut preceded: bool,
    items: &[Selector],
) -> fmt::Result {
    for item in items {
        let rendered = item.to_string();
        if rendered.is_empty() {
            continue;
        }
        if preceded && !rendered.starts_with('[') {
            f.write_str(".")?;
        }
        f.write_str(&rendered)?;
        preceded = true;
    }
    Ok(())
}

/// Whether an identifier cannot be written without quotes.
fn needs_quoting(name: &str) -> bool {
    let mut chars = name.chars();
    let head_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    !(head_ok && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
}

/// Escape a quoted identifier for display.
fn escape_quoted(name: &str) -> String {
    let mut escaped = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// A compiled expression, ready to evaluate against any number of
/// documents.
///
/// # Examples
///
/// ```rust
/// use jmesquery::query::Expression;
/// use serde_json::json;
///
/// let expr: Expression = "a.b".parse().unwrap();
/// assert_eq!(expr.search(&json!({"a": {"b": 7}})).unwrap(), json!(7));
/// assert_eq!(expr.search(&json!({"a": 1})).unwrap(), json!(null));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    root: Selector,
    end_line: usize,
    end_column: usize,
}

impl Expression {
    pub(crate) const fn new(root: Selector, end_line: usize, end_column: usize) -> Self {
        Self { root, end_line, end_column }
    }

    /// Evaluate against `root`, returning the derived value.
    ///
    /// The result is deep-copied out of the evaluation arena, so it owns
    /// its data and outlives both the document and the expression.
    ///
    /// # Errors
    ///
    /// Returns a [`QueryError`] when a built-in function is invoked with
    /// bad arguments. Type mismatches during navigation are not errors;
    /// they produce `null`.
    pub fn search(&self, root: &Value) -> Result<Value, QueryError> {
        let ctx = EvalContext::new();
        let result = self
            .root
            .evaluate(&ctx, root)
            .map_err(|err| err.positioned(self.end_line, self.end_column))?;
        Ok(result.clone())
    }

    /// The root of the compiled selector tree.
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.root
    }
}

impl FromStr for Expression {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        super::parser::compile(s)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.root.fmt(f)
    }
}
