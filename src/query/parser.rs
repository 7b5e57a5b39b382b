/*!
# Expression Compiler

Compiles expression strings into [`Expression`] trees.

The compiler is a character-level pushdown machine. A stack of
[`ParseState`]s tracks the current lexical mode; a stack of selector
frames holds partially built selectors (and pending multi-select hash
keys); a stack of frame indices marks the base of each open bracket,
brace, or parenthesis group so that closing a group can fold the frames
above the mark into their parent.

The delicate part is the rewriting discipline: when a postfix operator
such as `[*]`, `[?…]`, or `|` is recognized, the selector on top of the
frame stack is replaced in place by an operator node that takes the old
selector as its left-hand side and accumulates subsequent children as its
right-hand sequence.

## Examples

```rust
use jmesquery::query::compile;
use serde_json::json;

let expr = compile("a.b.c").unwrap();
assert_eq!(expr.search(&json!({"a": {"b": {"c": 42}}})).unwrap(), json!(42));
```

Failures report the position of the offending character:

```rust
use jmesquery::query::{compile, ErrorCode};

let err = compile("xs[?k > ]").unwrap_err();
assert_eq!(err.code(), ErrorCode::ExpectedIdentifier);
```
*/

use serde_json::Value;

use super::common::{Comparator, Slice};
use super::error::{ErrorCode, QueryError};
use super::functions::Builtin;
use super::selector::{Expression, Selector};

/// The lexical modes of the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    Start,
    Expression,
    SubExpression,
    KeyExpr,
    ValExpr,
    IdentifierOrFunction,
    ArgOrRightParen,
    QuotedString,
    RawString,
    JsonValue,
    UnquotedString,
    Number,
    Digit,
    BracketSpecifier,
    BracketSpecifier2,
    BracketSpecifier3,
    BracketSpecifier4,
    BracketSpecifier9,
    MultiSelectHash,
    KeyValExpr,
    Comparator,
    CmpLtOrLe,
    CmpEq,
    CmpGtOrGe,
    CmpNe,
    ExpectDot,
    ExpectColon,
    ExpectRightBracket,
    ExpectRightBracket4,
    ExpectRightBrace,
}

/// A frame on the selector stack: a selector under construction, plus the
/// pending key when the frame is a multi-select hash entry.
#[derive(Debug)]
struct Frame {
    key: Option<String>,
    selector: Selector,
}

impl Frame {
    fn new() -> Self {
        Self { key: None, selector: Selector::SubExpression(Vec::new()) }
    }
}

/// Compile an expression string into an [`Expression`].
///
/// # Errors
///
/// Returns a [`QueryError`] carrying one of the parse error codes and the
/// line/column of the offending character.
pub fn compile(expression: &str) -> Result<Expression, QueryError> {
    Compiler::new(expression).run()
}

struct Compiler<'a> {
    input: &'a [u8],
    pos: usize,
    line: usize,
    column: usize,
    states: Vec<ParseState>,
    frames: Vec<Frame>,
    offsets: Vec<usize>,
    buffer: Vec<u8>,
    slice: Slice,
    /// Set when a call names an unknown function. Reported once the call
    /// itself parses, so that a truncated expression still surfaces as
    /// `unexpected end of input`.
    unknown_function: Option<QueryError>,
}

impl<'a> Compiler<'a> {
    fn new(expression: &'a str) -> Self {
        Self {
            input: expression.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
            states: vec![ParseState::Start],
            frames: vec![Frame::new()],
            offsets: Vec::new(),
            buffer: Vec::new(),
            slice: Slice::default(),
            unknown_function: None,
        }
    }

    fn run(mut self) -> Result<Expression, QueryError> {
        while self.pos < self.input.len() {
            let b = self.input[self.pos];
            match self.state() {
                ParseState::Start => {
                    self.set_state(ParseState::SubExpression);
                    self.states.push(ParseState::Expression);
                }
                ParseState::Expression => match b {
                    b' ' | b'\t' | b'\r' | b'\n' => self.skip_space(),
                    b'"' => {
                        self.states.pop();
                        self.states.push(ParseState::ValExpr);
                        self.states.push(ParseState::QuotedString);
                        self.bump();
                    }
                    b'\'' => {
                        self.states.pop();
                        self.states.push(ParseState::RawString);
                        self.bump();
                    }
                    b'`' => {
                        self.states.pop();
                        self.states.push(ParseState::JsonValue);
                        self.bump();
                    }
                    b'[' => {
                        self.states.pop();
                        self.states.push(ParseState::BracketSpecifier);
                        self.bump();
                    }
                    b'{' => {
                        self.states.pop();
                        self.states.push(ParseState::MultiSelectHash);
                        self.bump();
                    }
                    b'*' => {
                        self.wrap_top(|lhs| Selector::ObjectProjection {
                            lhs,
                            rhs: Vec::new(),
                        });
                        self.states.push(ParseState::ExpectDot);
                        self.bump();
                    }
                    // Expression-reference marker, as in `sort_by(xs, &n)`.
                    // The argument compiles to an ordinary selector.
                    b'&' => self.bump(),
                    b'A'..=b'Z' | b'a'..=b'z' | b'_' => {
                        self.states.pop();
                        self.states.push(ParseState::IdentifierOrFunction);
                        self.states.push(ParseState::UnquotedString);
                        self.buffer.push(b);
                        self.bump();
                    }
                    _ => return Err(self.fail(ErrorCode::ExpectedIdentifier)),
                },
                ParseState::KeyExpr => {
                    let key = self.take_buffer();
                    self.top().key = Some(key);
                    self.states.pop();
                }
                ParseState::ValExpr => {
                    let name = self.take_buffer();
                    self.top().selector.add_child(Selector::Identifier(name));
                    self.states.pop();
                }
                ParseState::IdentifierOrFunction => match b {
                    b'(' => {
                        let name = self.take_buffer();
                        match Builtin::lookup(&name) {
                            Some(builtin) => {
                                self.top().selector = Selector::Function {
                                    builtin,
                                    args: Vec::new(),
                                };
                            }
                            None => {
                                if self.unknown_function.is_none() {
                                    self.unknown_function =
                                        Some(QueryError::parse(
                                            ErrorCode::FunctionNameNotFound,
                                            self.line,
                                            self.column,
                                        ));
                                }
                                // Placeholder so argument parsing can
                                // proceed; the pending error wins later.
                                self.top().selector =
                                    Selector::SubExpression(Vec::new());
                            }
                        }
                        self.offsets.push(self.frames.len());
                        self.frames.push(Frame::new());
                        self.set_state(ParseState::ArgOrRightParen);
                        self.states.push(ParseState::Expression);
                        self.bump();
                    }
                    _ => {
                        let name = self.take_buffer();
                        self.top().selector.add_child(Selector::Identifier(name));
                        self.states.pop();
                    }
                },
                ParseState::ArgOrRightParen => match b {
                    b' ' | b'\t' | b'\r' | b'\n' => self.skip_space(),
                    b',' => {
                        self.frames.push(Frame::new());
                        self.states.push(ParseState::Expression);
                        self.bump();
                    }
                    b')' => {
                        self.close_function();
                        self.states.pop();
                        self.bump();
                    }
                    _ => return Err(self.fail(ErrorCode::ExpectedRightBracket)),
                },
                ParseState::QuotedString => {
                    match b {
                        b'"' => {
                            self.states.pop();
                        }
                        b'\\' => {
                            if self.pos + 1 < self.input.len() {
                                self.bump();
                                self.buffer.push(self.input[self.pos]);
                            } else {
                                return Err(
                                    self.fail(ErrorCode::UnexpectedEndOfInput)
                                );
                            }
                        }
                        _ => self.buffer.push(b),
                    }
                    self.bump();
                }
                ParseState::UnquotedString => match b {
                    b' ' | b'\t' | b'\r' | b'\n' => {
                        self.states.pop();
                        self.skip_space();
                    }
                    b'0'..=b'9' | b'A'..=b'Z' | b'a'..=b'z' | b'_' => {
                        self.buffer.push(b);
                        self.bump();
                    }
                    _ => {
                        self.states.pop();
                    }
                },
                ParseState::RawString => match b {
                    b'\'' => {
                        // In key position the buffer is claimed by the key
                        // state underneath instead of becoming a literal.
                        if self.under_key_expr() {
                            self.states.pop();
                        } else {
                            let text = self.take_buffer();
                            self.top()
                                .selector
                                .add_child(Selector::Literal(Value::String(text)));
                            self.states.pop();
                        }
                        self.bump();
                    }
                    b'\\' => {
                        self.bump();
                        if self.pos < self.input.len() {
                            self.bump();
                        }
                    }
                    _ => {
                        self.buffer.push(b);
                        self.bump();
                    }
                },
                ParseState::JsonValue => match b {
                    b'`' => {
                        let text = self.take_buffer();
                        let parsed: Value = serde_json::from_str(&text)
                            .map_err(|_| {
                                self.fail(ErrorCode::UnidentifiedError)
                            })?;
                        self.top().selector.add_child(Selector::Literal(parsed));
                        self.states.pop();
                        self.bump();
                    }
                    b'\\' => {
                        // An escaped backtick embeds a backtick; any other
                        // escape is left for the JSON parser.
                        if self.input.get(self.pos + 1) == Some(&b'`') {
                            self.buffer.push(b'`');
                            self.bump();
                        } else {
                            self.buffer.push(b'\\');
                        }
                        self.bump();
                    }
                    _ => {
                        self.buffer.push(b);
                        self.bump();
                    }
                },
                ParseState::Number => match b {
                    b'-' => {
                        self.buffer.push(b);
                        self.set_state(ParseState::Digit);
                        self.bump();
                    }
                    _ => self.set_state(ParseState::Digit),
                },
                ParseState::Digit => match b {
                    b'0'..=b'9' => {
                        self.buffer.push(b);
                        self.bump();
                    }
                    _ => {
                        self.states.pop();
                    }
                },
                ParseState::SubExpression => match b {
                    b' ' | b'\t' | b'\r' | b'\n' => self.skip_space(),
                    b'.' => {
                        self.bump();
                        self.states.push(ParseState::Expression);
                    }
                    b'|' => {
                        self.bump();
                        self.wrap_top(|lhs| Selector::Pipe {
                            lhs,
                            rhs: Vec::new(),
                        });
                        self.states.push(ParseState::Expression);
                    }
                    b'[' | b'{' => self.states.push(ParseState::Expression),
                    _ => return Err(self.fail(ErrorCode::ExpectedIndex)),
                },
                ParseState::BracketSpecifier => match b {
                    b'*' => {
                        self.wrap_top(|lhs| Selector::ListProjection {
                            lhs,
                            rhs: Vec::new(),
                        });
                        self.set_state(ParseState::BracketSpecifier4);
                        self.bump();
                    }
                    b']' => {
                        self.wrap_top(|lhs| Selector::FlattenProjection {
                            lhs,
                            rhs: Vec::new(),
                        });
                        self.states.pop();
                        self.bump();
                    }
                    b'?' => {
                        self.offsets.push(self.frames.len());
                        self.frames.push(Frame::new());
                        self.set_state(ParseState::Comparator);
                        self.states.push(ParseState::Expression);
                        self.bump();
                    }
                    b':' => {
                        self.set_state(ParseState::BracketSpecifier2);
                        self.states.push(ParseState::Number);
                        self.bump();
                    }
                    b'-' | b'0'..=b'9' => {
                        self.set_state(ParseState::BracketSpecifier9);
                        self.states.push(ParseState::Number);
                    }
                    _ => {
                        self.wrap_top(|lhs| Selector::ListProjection {
                            lhs,
                            rhs: Vec::new(),
                        });
                        self.offsets.push(self.frames.len());
                        self.frames.push(Frame::new());
                        self.set_state(ParseState::ExpectRightBracket4);
                        self.states.push(ParseState::Expression);
                    }
                },
                ParseState::MultiSelectHash => {
                    // The `{…}` form is a sequential step on the current
                    // frame, so `a.{p: x}` keeps working on objects; only
                    // the entry frames are grouped.
                    self.offsets.push(self.frames.len());
                    self.frames.push(Frame::new());
                    self.set_state(ParseState::KeyValExpr);
                }
                ParseState::BracketSpecifier9 => match b {
                    b']' => {
                        if self.buffer.is_empty() {
                            self.wrap_top(|lhs| Selector::FlattenProjection {
                                lhs,
                                rhs: Vec::new(),
                            });
                        } else {
                            let index = self.parse_int()?;
                            self.top().selector.add_child(Selector::Index(index));
                        }
                        self.states.pop();
                        self.bump();
                    }
                    b':' => {
                        if !self.buffer.is_empty() {
                            self.slice.start = self.parse_int()?;
                        }
                        self.set_state(ParseState::BracketSpecifier2);
                        self.states.push(ParseState::Number);
                        self.bump();
                    }
                    _ => return Err(self.fail(ErrorCode::ExpectedRightBracket)),
                },
                ParseState::BracketSpecifier2 => {
                    if !self.buffer.is_empty() {
                        self.slice.end = Some(self.parse_int()?);
                    }
                    match b {
                        b']' => {
                            self.finish_slice();
                            self.states.pop();
                            self.bump();
                        }
                        b':' => {
                            self.set_state(ParseState::BracketSpecifier3);
                            self.states.push(ParseState::Number);
                            self.bump();
                        }
                        _ => {
                            return Err(
                                self.fail(ErrorCode::ExpectedRightBracket)
                            );
                        }
                    }
                }
                ParseState::BracketSpecifier3 => {
                    if !self.buffer.is_empty() {
                        let step = self.parse_int()?;
                        if step == 0 {
                            return Err(self.fail(ErrorCode::InvalidNumber));
                        }
                        self.slice.step = step;
                    }
                    match b {
                        b']' => {
                            self.finish_slice();
                            self.states.pop();
                            self.bump();
                        }
                        _ => {
                            return Err(
                                self.fail(ErrorCode::ExpectedRightBracket)
                            );
                        }
                    }
                }
                ParseState::BracketSpecifier4 => match b {
                    b']' => {
                        self.states.pop();
                        self.bump();
                    }
                    _ => return Err(self.fail(ErrorCode::ExpectedRightBracket)),
                },
                ParseState::KeyValExpr => match b {
                    b' ' | b'\t' | b'\r' | b'\n' => self.skip_space(),
                    b'"' => {
                        self.set_state(ParseState::ExpectColon);
                        self.states.push(ParseState::KeyExpr);
                        self.states.push(ParseState::QuotedString);
                        self.bump();
                    }
                    b'\'' => {
                        self.set_state(ParseState::ExpectColon);
                        self.states.push(ParseState::KeyExpr);
                        self.states.push(ParseState::RawString);
                        self.bump();
                    }
                    b'A'..=b'Z' | b'a'..=b'z' | b'_' => {
                        self.set_state(ParseState::ExpectColon);
                        self.states.push(ParseState::KeyExpr);
                        self.states.push(ParseState::UnquotedString);
                        self.buffer.push(b);
                        self.bump();
                    }
                    _ => return Err(self.fail(ErrorCode::ExpectedKey)),
                },
                ParseState::Comparator => match b {
                    b' ' | b'\t' | b'\r' | b'\n' => self.skip_space(),
                    b'.' => {
                        self.bump();
                        self.states.push(ParseState::Expression);
                    }
                    b'<' => {
                        self.set_state(ParseState::CmpLtOrLe);
                        self.bump();
                    }
                    b'=' => {
                        self.set_state(ParseState::CmpEq);
                        self.bump();
                    }
                    b'>' => {
                        self.set_state(ParseState::CmpGtOrGe);
                        self.bump();
                    }
                    b'!' => {
                        self.set_state(ParseState::CmpNe);
                        self.bump();
                    }
                    _ => return Err(self.fail(ErrorCode::ExpectedComparator)),
                },
                ParseState::CmpLtOrLe => match b {
                    b'=' => {
                        self.install_filter(Comparator::Le);
                        self.bump();
                    }
                    _ => self.install_filter(Comparator::Lt),
                },
                ParseState::CmpEq => match b {
                    b'=' => {
                        self.install_filter(Comparator::Eq);
                        self.bump();
                    }
                    _ => return Err(self.fail(ErrorCode::ExpectedComparator)),
                },
                ParseState::CmpGtOrGe => match b {
                    b'=' => {
                        self.install_filter(Comparator::Ge);
                        self.bump();
                    }
                    _ => self.install_filter(Comparator::Gt),
                },
                ParseState::CmpNe => match b {
                    b'=' => {
                        self.install_filter(Comparator::Ne);
                        self.bump();
                    }
                    _ => return Err(self.fail(ErrorCode::ExpectedComparator)),
                },
                ParseState::ExpectDot => match b {
                    b' ' | b'\t' | b'\r' | b'\n' => self.skip_space(),
                    b'.' => {
                        self.states.pop();
                        self.bump();
                    }
                    _ => return Err(self.fail(ErrorCode::ExpectedDot)),
                },
                ParseState::ExpectColon => match b {
                    b' ' | b'\t' | b'\r' | b'\n' => self.skip_space(),
                    b':' => {
                        self.set_state(ParseState::ExpectRightBrace);
                        self.states.push(ParseState::Expression);
                        self.bump();
                    }
                    _ => return Err(self.fail(ErrorCode::ExpectedColon)),
                },
                ParseState::ExpectRightBracket => match b {
                    b' ' | b'\t' | b'\r' | b'\n' => self.skip_space(),
                    b']' => {
                        self.states.pop();
                        self.close_filter();
                        self.bump();
                    }
                    _ => return Err(self.fail(ErrorCode::ExpectedRightBracket)),
                },
                ParseState::ExpectRightBracket4 => match b {
                    b' ' | b'\t' | b'\r' | b'\n' => self.skip_space(),
                    b',' => {
                        self.frames.push(Frame::new());
                        self.states.push(ParseState::Expression);
                        self.bump();
                    }
                    b'[' => self.states.push(ParseState::Expression),
                    b'.' => {
                        self.states.push(ParseState::Expression);
                        self.bump();
                    }
                    b'|' => {
                        self.bump();
                        self.wrap_top(|lhs| Selector::Pipe {
                            lhs,
                            rhs: Vec::new(),
                        });
                        self.states.push(ParseState::Expression);
                    }
                    b']' => {
                        self.states.pop();
                        self.close_multi_select_list();
                        self.bump();
                    }
                    _ => return Err(self.fail(ErrorCode::ExpectedRightBracket)),
                },
                ParseState::ExpectRightBrace => match b {
                    b' ' | b'\t' | b'\r' | b'\n' => self.skip_space(),
                    b',' => {
                        self.frames.push(Frame::new());
                        self.set_state(ParseState::KeyValExpr);
                        self.bump();
                    }
                    b'[' | b'{' => self.states.push(ParseState::Expression),
                    b'.' => {
                        self.states.push(ParseState::Expression);
                        self.bump();
                    }
                    b'}' => {
                        self.states.pop();
                        self.close_multi_select_hash();
                        self.bump();
                    }
                    _ => return Err(self.fail(ErrorCode::ExpectedRightBrace)),
                },
            }
        }

        self.finish()
    }

    /// End-of-input handling: a trailing unquoted identifier is still in
    /// the buffer, everything else must already be reduced.
    fn finish(mut self) -> Result<Expression, QueryError> {
        if self.states.len() >= 3
            && self.states.last() == Some(&ParseState::UnquotedString)
        {
            self.states.pop();
            if matches!(
                self.states.last(),
                Some(ParseState::ValExpr | ParseState::IdentifierOrFunction)
            ) {
                let name = self.take_buffer();
                self.top().selector.add_child(Selector::Identifier(name));
                self.states.pop();
            }
        }

        if self.states.len() > 1 {
            return Err(QueryError::parse(
                ErrorCode::UnexpectedEndOfInput,
                self.line,
                self.column,
            ));
        }
        if !matches!(
            self.states.pop(),
            Some(ParseState::Expression | ParseState::SubExpression)
        ) {
            return Err(QueryError::parse(
                ErrorCode::UnexpectedEndOfInput,
                self.line,
                self.column,
            ));
        }
        if let Some(err) = self.unknown_function {
            return Err(err);
        }

        debug_assert!(self.offsets.is_empty());
        debug_assert_eq!(self.frames.len(), 1);
        let root = self
            .frames
            .pop()
            .expect("frame stack holds the program frame")
            .selector;
        Ok(Expression::new(root, self.line, self.column))
    }

    fn state(&self) -> ParseState {
        *self.states.last().expect("state stack is never empty")
    }

    fn set_state(&mut self, state: ParseState) {
        *self.states.last_mut().expect("state stack is never empty") = state;
    }

    fn top(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("frame stack is never empty")
    }

    /// Replace the top frame's selector with an operator node wrapping it.
    /// The frame's pending key, if any, survives the rewrite.
    fn wrap_top(&mut self, wrap: impl FnOnce(Box<Selector>) -> Selector) {
        let frame = self.frames.last_mut().expect("frame stack is never empty");
        let lhs = std::mem::replace(
            &mut frame.selector,
            Selector::SubExpression(Vec::new()),
        );
        frame.selector = wrap(Box::new(lhs));
    }

    /// Install a filter over the frame opened by `[?`, wrapping the
    /// already-parsed left-hand expression.
    fn install_filter(&mut self, cmp: Comparator) {
        self.wrap_top(|lhs| Selector::Filter { cmp, lhs, rhs: Vec::new() });
        self.set_state(ParseState::ExpectRightBracket);
        self.states.push(ParseState::Expression);
    }

    /// `)`: fold the argument frames into the function selector below the
    /// group mark.
    fn close_function(&mut self) {
        let pos = self.offsets.pop().expect("open parenthesis group");
        let args = self.frames.split_off(pos);
        let parent = &mut self.top().selector;
        for frame in args {
            parent.add_child(frame.selector);
        }
    }

    /// `]` closing `[? … ]`: fold the trailing frames into the filter,
    /// then splice the filter after the left-hand chain as a fresh
    /// sequence.
    fn close_filter(&mut self) {
        let pos = self.offsets.pop().expect("open filter group");
        let mut group = self.frames.split_off(pos).into_iter();
        let mut filter = group.next().expect("filter group holds its frame");
        for frame in group {
            filter.selector.add_child(frame.selector);
        }
        let frame = self.frames.last_mut().expect("frame stack is never empty");
        let lhs = std::mem::replace(
            &mut frame.selector,
            Selector::SubExpression(Vec::new()),
        );
        frame.selector = Selector::SubExpression(vec![lhs, filter.selector]);
    }

    /// `]` closing `[e1, e2, …]`: collect the group frames into a
    /// multi-select list on the frame below the mark.
    fn close_multi_select_list(&mut self) {
        let pos = self.offsets.pop().expect("open multi-select group");
        let children: Vec<Selector> = self
            .frames
            .split_off(pos)
            .into_iter()
            .map(|frame| frame.selector)
            .collect();
        self.top()
            .selector
            .add_child(Selector::MultiSelectList(children));
    }

    /// `}`: collect the keyed group frames into a multi-select hash on the
    /// frame below the mark.
    fn close_multi_select_hash(&mut self) {
        let pos = self.offsets.pop().expect("open multi-select hash group");
        let entries: Vec<(String, Selector)> = self
            .frames
            .split_off(pos)
            .into_iter()
            .map(|frame| (frame.key.unwrap_or_default(), frame.selector))
            .collect();
        self.top()
            .selector
            .add_child(Selector::MultiSelectHash(entries));
    }

    /// Emit the accumulated slice and reset the scratch bounds.
    fn finish_slice(&mut self) {
        let slice = std::mem::take(&mut self.slice);
        self.top().selector.add_child(Selector::Slice(slice));
    }

    fn bump(&mut self) {
        self.pos += 1;
        self.column += 1;
    }

    /// Consume one whitespace character, tracking line boundaries.
    fn skip_space(&mut self) {
        match self.input[self.pos] {
            b' ' | b'\t' => self.bump(),
            b'\r' => {
                if self.input.get(self.pos + 1) == Some(&b'\n') {
                    self.pos += 1;
                }
                self.line += 1;
                self.column = 1;
                self.pos += 1;
            }
            b'\n' => {
                self.line += 1;
                self.column = 1;
                self.pos += 1;
            }
            _ => {}
        }
    }

    fn take_buffer(&mut self) -> String {
        let text = String::from_utf8_lossy(&self.buffer).into_owned();
        self.buffer.clear();
        text
    }

    fn parse_int(&mut self) -> Result<i64, QueryError> {
        let text = self.take_buffer();
        text.parse::<i64>()
            .map_err(|_| self.fail(ErrorCode::InvalidNumber))
    }

    /// Whether the state below the current one is a hash key, which claims
    /// the buffer instead of turning it into a literal.
    fn under_key_expr(&self) -> bool {
        self.states.len() >= 2
            && self.states[self.states.len() - 2] == ParseState::KeyExpr
    }

    /// A parse error at the current position. A pending unknown-function
    /// error takes precedence, since it was the first thing wrong.
    fn fail(&self, code: ErrorCode) -> QueryError {
        self.unknown_function
            .clone()
            .unwrap_or_else(|| QueryError::parse(code, self.line, self.column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Comparator;
    use serde_json::json;

    fn ident(name: &str) -> Selector {
        Selector::Identifier(name.to_string())
    }

    #[test]
    fn compiles_dotted_chain() {
        let expr = compile("a.b.c").unwrap();
        assert_eq!(
            expr.selector(),
            &Selector::SubExpression(vec![ident("a"), ident("b"), ident("c")])
        );
    }

    #[test]
    fn whitespace_between_steps_is_ignored() {
        let spaced = compile("a . b").unwrap();
        let tight = compile("a.b").unwrap();
        assert_eq!(spaced.selector(), tight.selector());
    }

    #[test]
    fn compiles_indexes_and_slices() {
        let expr = compile("xs[-1]").unwrap();
        assert_eq!(
            expr.selector(),
            &Selector::SubExpression(vec![ident("xs"), Selector::Index(-1)])
        );

        let expr = compile("xs[1:3:2]").unwrap();
        assert_eq!(
            expr.selector(),
            &Selector::SubExpression(vec![
                ident("xs"),
                Selector::Slice(crate::query::Slice {
                    start: 1,
                    end: Some(3),
                    step: 2
                }),
            ])
        );

        let expr = compile("xs[::-1]").unwrap();
        assert_eq!(
            expr.selector(),
            &Selector::SubExpression(vec![
                ident("xs"),
                Selector::Slice(crate::query::Slice {
                    start: 0,
                    end: None,
                    step: -1
                }),
            ])
        );
    }

    #[test]
    fn compiles_projections() {
        let expr = compile("xs[*].k").unwrap();
        assert_eq!(
            expr.selector(),
            &Selector::ListProjection {
                lhs: Box::new(Selector::SubExpression(vec![ident("xs")])),
                rhs: vec![ident("k")],
            }
        );

        let expr = compile("xs[].k").unwrap();
        assert_eq!(
            expr.selector(),
            &Selector::FlattenProjection {
                lhs: Box::new(Selector::SubExpression(vec![ident("xs")])),
                rhs: vec![ident("k")],
            }
        );

        let expr = compile("o.*.k").unwrap();
        assert_eq!(
            expr.selector(),
            &Selector::ObjectProjection {
                lhs: Box::new(Selector::SubExpression(vec![ident("o")])),
                rhs: vec![ident("k")],
            }
        );
    }

    #[test]
    fn compiles_filter_as_spliced_sequence() {
        let expr = compile("xs[?k > `1`].k").unwrap();
        assert_eq!(
            expr.selector(),
            &Selector::SubExpression(vec![
                Selector::SubExpression(vec![ident("xs")]),
                Selector::Filter {
                    cmp: Comparator::Gt,
                    lhs: Box::new(Selector::SubExpression(vec![ident("k")])),
                    rhs: vec![Selector::Literal(json!(1))],
                },
                ident("k"),
            ])
        );
    }

    #[test]
    fn compiles_multi_select_hash_as_sequential_step() {
        let expr = compile("a.{p: x, q: y}").unwrap();
        assert_eq!(
            expr.selector(),
            &Selector::SubExpression(vec![
                ident("a"),
                Selector::MultiSelectHash(vec![
                    (
                        "p".to_string(),
                        Selector::SubExpression(vec![ident("x")])
                    ),
                    (
                        "q".to_string(),
                        Selector::SubExpression(vec![ident("y")])
                    ),
                ]),
            ])
        );
    }

    #[test]
    fn compiles_multi_select_list_under_projection() {
        let expr = compile("a.[x, y]").unwrap();
        assert_eq!(
            expr.selector(),
            &Selector::ListProjection {
                lhs: Box::new(Selector::SubExpression(vec![ident("a")])),
                rhs: vec![Selector::MultiSelectList(vec![
                    Selector::SubExpression(vec![ident("x")]),
                    Selector::SubExpression(vec![ident("y")]),
                ])],
            }
        );
    }

    #[test]
    fn compiles_pipe() {
        let expr = compile("a | b").unwrap();
        assert_eq!(
            expr.selector(),
            &Selector::Pipe {
                lhs: Box::new(Selector::SubExpression(vec![ident("a")])),
                rhs: vec![ident("b")],
            }
        );
    }

    #[test]
    fn compiles_quoted_identifiers_and_escapes() {
        let expr = compile(r#""key space".x"#).unwrap();
        assert_eq!(
            expr.selector(),
            &Selector::SubExpression(vec![ident("key space"), ident("x")])
        );

        let expr = compile(r#""a\"b".x"#).unwrap();
        assert_eq!(
            expr.selector(),
            &Selector::SubExpression(vec![ident("a\"b"), ident("x")])
        );
    }

    #[test]
    fn compiles_literals() {
        let expr = compile("'hello'").unwrap();
        assert_eq!(
            expr.selector(),
            &Selector::SubExpression(vec![Selector::Literal(json!("hello"))])
        );

        let expr = compile(r#"`{"a": [1, 2]}`"#).unwrap();
        assert_eq!(
            expr.selector(),
            &Selector::SubExpression(vec![Selector::Literal(
                json!({"a": [1, 2]})
            )])
        );
    }

    #[test]
    fn compiles_raw_string_hash_keys() {
        let expr = compile("{'k v': x}").unwrap();
        assert_eq!(
            expr.selector(),
            &Selector::SubExpression(vec![Selector::MultiSelectHash(vec![(
                "k v".to_string(),
                Selector::SubExpression(vec![ident("x")])
            )])])
        );
    }

    #[test]
    fn compiles_function_calls() {
        let expr = compile("sort_by(xs, &n)").unwrap();
        assert_eq!(
            expr.selector(),
            &Selector::Function {
                builtin: crate::query::Builtin::SortBy,
                args: vec![
                    Selector::SubExpression(vec![ident("xs")]),
                    Selector::SubExpression(vec![ident("n")]),
                ],
            }
        );
    }

    #[test]
    fn double_dot_is_an_identifier_error() {
        let err = compile("a..").unwrap_err();
        assert_eq!(err.code(), ErrorCode::ExpectedIdentifier);
        assert_eq!(err.position(), Some((1, 3)));
    }

    #[test]
    fn truncated_call_is_end_of_input() {
        let err = compile("foo(").unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnexpectedEndOfInput);
    }

    #[test]
    fn unknown_function_is_reported_when_the_call_parses() {
        let err = compile("xyz(1)").unwrap_err();
        assert_eq!(err.code(), ErrorCode::FunctionNameNotFound);
        assert_eq!(err.position(), Some((1, 4)));
    }

    #[test]
    fn empty_filter_operand_is_an_identifier_error() {
        let err = compile("[? a > ]").unwrap_err();
        assert_eq!(err.code(), ErrorCode::ExpectedIdentifier);
    }

    #[test]
    fn empty_and_truncated_inputs_are_end_of_input() {
        assert_eq!(
            compile("").unwrap_err().code(),
            ErrorCode::UnexpectedEndOfInput
        );
        assert_eq!(
            compile("xs[0").unwrap_err().code(),
            ErrorCode::UnexpectedEndOfInput
        );
        assert_eq!(
            compile("'unterminated").unwrap_err().code(),
            ErrorCode::UnexpectedEndOfInput
        );
    }

    #[test]
    fn stray_character_after_expression_is_an_index_error() {
        let err = compile("a$").unwrap_err();
        assert_eq!(err.code(), ErrorCode::ExpectedIndex);
    }

    #[test]
    fn missing_colon_and_key_are_reported() {
        assert_eq!(
            compile("{a b}").unwrap_err().code(),
            ErrorCode::ExpectedColon
        );
        assert_eq!(compile("{1: a}").unwrap_err().code(), ErrorCode::ExpectedKey);
    }

    #[test]
    fn zero_step_slice_is_rejected() {
        let err = compile("xs[::0]").unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidNumber);
    }

    #[test]
    fn overflowing_index_is_an_invalid_number() {
        let err = compile("xs[99999999999999999999]").unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidNumber);
    }

    #[test]
    fn positions_track_lines() {
        let err = compile("a\n..b").unwrap_err();
        assert_eq!(err.code(), ErrorCode::ExpectedIdentifier);
        assert_eq!(err.position(), Some((2, 2)));
    }
}
