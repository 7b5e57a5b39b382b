/*!
# Shared Types

Types shared between the compiler and the evaluator: slice bounds, filter
comparators, and the value comparison helpers that back filters and
`sort_by`.
*/

use std::cmp::Ordering;

use serde_json::Value;

/// Bounds of an array slice, `[start:end:step]`.
///
/// Normalization to concrete indices is deferred until evaluation, when the
/// target array's length is known. Negative `start`/`end` count back from
/// the end of the array; a negative `step` walks the array in reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slice {
    /// First index of the slice. Defaults to `0`.
    pub start: i64,
    /// One-past-the-last index of the slice, or the array length when
    /// absent.
    pub end: Option<i64>,
    /// Distance between selected elements. Defaults to `1`; may be
    /// negative, never zero.
    pub step: i64,
}

impl Default for Slice {
    fn default() -> Self {
        Self { start: 0, end: None, step: 1 }
    }
}

impl Slice {
    /// The concrete start index for an array of `len` elements, clamped to
    /// `[0, len]`.
    pub(crate) fn resolved_start(&self, len: usize) -> i64 {
        resolve_index(self.start, len)
    }

    /// The concrete end index for an array of `len` elements, clamped to
    /// `[0, len]`.
    pub(crate) fn resolved_end(&self, len: usize) -> i64 {
        match self.end {
            Some(end) => resolve_index(end, len),
            None => len as i64,
        }
    }
}

/// Wrap a possibly-negative index around the end of an array of `len`
/// elements and clamp it into `[0, len]`.
fn resolve_index(index: i64, len: usize) -> i64 {
    let len = len as i64;
    let resolved = if index >= 0 { index } else { len + index };
    resolved.clamp(0, len)
}

/// The comparison operator of a filter expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl Comparator {
    /// The operator as written in an expression.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    /// Apply the comparison. Equality is defined for every pair of values;
    /// the ordered comparisons are defined only when both operands are
    /// numbers, and return `None` otherwise so the filter can exclude the
    /// element.
    pub(crate) fn compare(self, lhs: &Value, rhs: &Value) -> Option<bool> {
        match self {
            Self::Eq => Some(value_eq(lhs, rhs)),
            Self::Ne => Some(!value_eq(lhs, rhs)),
            Self::Lt | Self::Le | Self::Gt | Self::Ge => {
                let left = lhs.as_f64()?;
                let right = rhs.as_f64()?;
                Some(match self {
                    Self::Lt => left < right,
                    Self::Le => left <= right,
                    Self::Gt => left > right,
                    Self::Ge => left >= right,
                    Self::Eq | Self::Ne => unreachable!(),
                })
            }
        }
    }
}

/// Deep equality over values. Numbers compare by numeric value rather than
/// by representation, so `1` equals `1.0`.
pub(crate) fn value_eq(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => a == b,
        },
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| value_eq(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter().all(|(k, v)| b.get(k).is_some_and(|w| value_eq(v, w)))
        }
        _ => lhs == rhs,
    }
}

/// Total order over values, used by `sort_by`.
///
/// Numbers order by numeric value. Values of different kinds order by kind
/// (null, boolean, number, string, array, object); the order within
/// non-number kinds follows the natural order of their contents.
pub(crate) fn value_cmp(lhs: &Value, rhs: &Value) -> Ordering {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => {
            let x = a.as_f64().unwrap_or(0.0);
            let y = b.as_f64().unwrap_or(0.0);
            x.total_cmp(&y)
        }
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Array(a), Value::Array(b)) => {
            for (x, y) in a.iter().zip(b) {
                let ordering = value_cmp(x, y);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            a.len().cmp(&b.len())
        }
        (Value::Object(a), Value::Object(b)) => {
            for ((ka, va), (kb, vb)) in a.iter().zip(b) {
                let ordering = ka.cmp(kb).then_with(|| value_cmp(va, vb));
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            a.len().cmp(&b.len())
        }
        _ => kind_rank(lhs).cmp(&kind_rank(rhs)),
    }
}

/// Rank of a value kind within the total order.
const fn kind_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}
