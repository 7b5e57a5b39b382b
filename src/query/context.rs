//! # Evaluation Context
//!
//! Owning storage for values constructed while evaluating a single
//! expression. Every intermediate array or object a selector builds is
//! moved into the context, which hands back a reference that stays valid
//! until the context is dropped at the end of the search call.

use serde_json::Value;
use typed_arena::Arena;

/// The shared null returned when a selector does not apply to its input.
/// Callers never compare it by identity.
pub(crate) static NULL: Value = Value::Null;

/// Per-call arena for intermediate values.
///
/// The arena is a bag, not a stack: allocation order carries no meaning,
/// and nothing is freed until the whole context goes away.
pub(crate) struct EvalContext {
    storage: Arena<Value>,
}

impl EvalContext {
    pub(crate) fn new() -> Self {
        Self { storage: Arena::new() }
    }

    /// Move `value` into the context and borrow it back for the rest of
    /// the evaluation.
    pub(crate) fn store(&self, value: Value) -> &Value {
        self.storage.alloc(value)
    }
}
