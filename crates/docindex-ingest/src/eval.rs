//! Condition expressions evaluated against a single indexed document.
//!
//! Grammar:
//!
//! ```text
//! or      := and ( "||" and )*
//! and     := unary ( "&&" unary )*
//! unary   := "!" unary | compare
//! compare := primary ( ( "==" | "!=" | "<" | "<=" | ">" | ">=" ) primary )?
//! primary := NUMBER | STRING | "@" NAME | "(" or ")"
//! ```
//!
//! Strings are single- or double-quoted with backslash escapes.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use docindex_index::SearchIndex;
use docindex_types::{Document, ErrorCode, IngestError, SortableValue};
use tracing::{debug, warn};

use crate::field_type::parse_numeric;
use crate::store::DocumentStore;

/// A runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Num(f64),
    Str(String),
}

impl Value {
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Num(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Value::Num(n) => Some(*n),
            Value::Str(s) => parse_numeric(s),
            Value::Nil => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Num(if b { 1.0 } else { 0.0 })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Parsed expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Property(String),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare(CmpOp, Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Names of every `@property` in the expression.
    pub fn properties(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.collect_properties(&mut out);
        out
    }

    fn collect_properties<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Property(name) => {
                out.insert(name.as_str());
            }
            Expr::Not(e) => e.collect_properties(out),
            Expr::And(a, b) | Expr::Or(a, b) | Expr::Compare(_, a, b) => {
                a.collect_properties(out);
                b.collect_properties(out);
            }
        }
    }

    /// Evaluate with `lookup` resolving property names.
    pub fn eval<F>(&self, lookup: &F) -> Value
    where
        F: Fn(&str) -> Value,
    {
        match self {
            Expr::Literal(v) => v.clone(),
            Expr::Property(name) => lookup(name),
            Expr::Not(e) => (!e.eval(lookup).is_truthy()).into(),
            Expr::And(a, b) => (a.eval(lookup).is_truthy() && b.eval(lookup).is_truthy()).into(),
            Expr::Or(a, b) => (a.eval(lookup).is_truthy() || b.eval(lookup).is_truthy()).into(),
            Expr::Compare(op, a, b) => compare(*op, &a.eval(lookup), &b.eval(lookup)).into(),
        }
    }
}

fn compare(op: CmpOp, left: &Value, right: &Value) -> bool {
    if matches!(left, Value::Nil) || matches!(right, Value::Nil) {
        let both = left == right;
        return match op {
            CmpOp::Eq => both,
            CmpOp::Ne => !both,
            _ => false,
        };
    }

    let ord = match (left.as_number(), right.as_number()) {
        (Some(l), Some(r)) => l.partial_cmp(&r),
        _ => {
            let l = match left {
                Value::Str(s) => s.clone(),
                Value::Num(n) => n.to_string(),
                Value::Nil => String::new(),
            };
            let r = match right {
                Value::Str(s) => s.clone(),
                Value::Num(n) => n.to_string(),
                Value::Nil => String::new(),
            };
            Some(l.cmp(&r))
        }
    };

    let Some(ord) = ord else { return false };
    match op {
        CmpOp::Eq => ord == Ordering::Equal,
        CmpOp::Ne => ord != Ordering::Equal,
        CmpOp::Lt => ord == Ordering::Less,
        CmpOp::Le => ord != Ordering::Greater,
        CmpOp::Gt => ord == Ordering::Greater,
        CmpOp::Ge => ord != Ordering::Less,
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Num(f64),
    Str(String),
    Prop(String),
    Cmp(CmpOp),
    And,
    Or,
    Not,
    LParen,
    RParen,
}

fn parse_error(detail: impl Into<String>) -> IngestError {
    IngestError::new(ErrorCode::ParseError, detail)
}

fn lex(input: &str) -> Result<Vec<Tok>, IngestError> {
    let chars: Vec<char> = input.chars().collect();
    let mut toks = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                toks.push(Tok::LParen);
                i += 1;
            }
            ')' => {
                toks.push(Tok::RParen);
                i += 1;
            }
            '&' if next == Some('&') => {
                toks.push(Tok::And);
                i += 2;
            }
            '|' if next == Some('|') => {
                toks.push(Tok::Or);
                i += 2;
            }
            '=' if next == Some('=') => {
                toks.push(Tok::Cmp(CmpOp::Eq));
                i += 2;
            }
            '!' if next == Some('=') => {
                toks.push(Tok::Cmp(CmpOp::Ne));
                i += 2;
            }
            '!' => {
                toks.push(Tok::Not);
                i += 1;
            }
            '<' | '>' => {
                let or_equal = next == Some('=');
                toks.push(Tok::Cmp(match (c, or_equal) {
                    ('<', false) => CmpOp::Lt,
                    ('<', true) => CmpOp::Le,
                    ('>', false) => CmpOp::Gt,
                    _ => CmpOp::Ge,
                }));
                i += if or_equal { 2 } else { 1 };
            }
            '@' => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && (chars[end].is_alphanumeric() || chars[end] == '_') {
                    end += 1;
                }
                if end == start {
                    return Err(parse_error(format!("Missing property name at offset {}", i)));
                }
                toks.push(Tok::Prop(chars[start..end].iter().collect()));
                i = end;
            }
            '\'' | '"' => {
                let quote = c;
                let mut s = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err(parse_error("Unterminated string")),
                        Some('\\') => {
                            if let Some(escaped) = chars.get(i + 1) {
                                s.push(*escaped);
                            }
                            i += 2;
                        }
                        Some(ch) if *ch == quote => {
                            i += 1;
                            break;
                        }
                        Some(ch) => {
                            s.push(*ch);
                            i += 1;
                        }
                    }
                }
                toks.push(Tok::Str(s));
            }
            c if c.is_ascii_digit() || c == '-' || c == '.' => {
                let start = i;
                i += 1;
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric() || chars[i] == '.' || chars[i] == '+'
                        || (chars[i] == '-' && matches!(chars[i - 1], 'e' | 'E')))
                {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let value = parse_numeric(&text)
                    .ok_or_else(|| parse_error(format!("Invalid number `{}`", text)))?;
                toks.push(Tok::Num(value));
            }
            other => {
                return Err(parse_error(format!(
                    "Unexpected character `{}` at offset {}",
                    other, i
                )))
            }
        }
    }
    Ok(toks)
}

/// Longest accepted expression, in tokens. Bounds the depth of operator chains.
const MAX_TOKENS: usize = 4096;

/// Deepest accepted nesting of parentheses and `!`.
const MAX_DEPTH: usize = 128;

struct Parser {
    toks: Vec<Tok>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn enter(&mut self) -> Result<(), IngestError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(parse_error("Expression is nested too deeply"));
        }
        Ok(())
    }

    fn peek(&self) -> Option<&Tok> {
        self.toks.get(self.pos)
    }

    fn next(&mut self) -> Option<Tok> {
        let tok = self.toks.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn or(&mut self) -> Result<Expr, IngestError> {
        let mut left = self.and()?;
        while self.peek() == Some(&Tok::Or) {
            self.pos += 1;
            left = Expr::Or(Box::new(left), Box::new(self.and()?));
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr, IngestError> {
        let mut left = self.unary()?;
        while self.peek() == Some(&Tok::And) {
            self.pos += 1;
            left = Expr::And(Box::new(left), Box::new(self.unary()?));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, IngestError> {
        if self.peek() == Some(&Tok::Not) {
            self.pos += 1;
            self.enter()?;
            let inner = self.unary()?;
            self.depth -= 1;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.compare()
    }

    fn compare(&mut self) -> Result<Expr, IngestError> {
        let left = self.primary()?;
        if let Some(Tok::Cmp(op)) = self.peek() {
            let op = *op;
            self.pos += 1;
            let right = self.primary()?;
            return Ok(Expr::Compare(op, Box::new(left), Box::new(right)));
        }
        Ok(left)
    }

    fn primary(&mut self) -> Result<Expr, IngestError> {
        match self.next() {
            Some(Tok::Num(n)) => Ok(Expr::Literal(Value::Num(n))),
            Some(Tok::Str(s)) => Ok(Expr::Literal(Value::Str(s))),
            Some(Tok::Prop(name)) => Ok(Expr::Property(name)),
            Some(Tok::LParen) => {
                self.enter()?;
                let inner = self.or()?;
                self.depth -= 1;
                match self.next() {
                    Some(Tok::RParen) => Ok(inner),
                    _ => Err(parse_error("Missing closing parenthesis")),
                }
            }
            Some(tok) => Err(parse_error(format!("Unexpected token {:?}", tok))),
            None => Err(parse_error("Unexpected end of expression")),
        }
    }
}

/// Parse an expression.
pub fn parse(input: &str) -> Result<Expr, IngestError> {
    let toks = lex(input)?;
    if toks.is_empty() {
        return Err(parse_error("Empty expression"));
    }
    if toks.len() > MAX_TOKENS {
        return Err(parse_error("Expression is too long"));
    }
    let mut parser = Parser { toks, pos: 0, depth: 0 };
    let expr = parser.or()?;
    if let Some(tok) = parser.peek() {
        return Err(parse_error(format!("Unexpected token {:?}", tok)));
    }
    Ok(expr)
}

/// Evaluate `input` against the indexed document `key`.
///
/// Sortable fields are read from the document's sort vector, everything
/// else from the document store. Fields the document lacks are nil.
pub fn evaluate_document(
    input: &str,
    key: &str,
    index: &SearchIndex,
    store: &dyn DocumentStore,
) -> Result<bool, IngestError> {
    let md = index
        .docs()
        .get_by_key(key)
        .map_err(|e| IngestError::new(ErrorCode::IndexGeneric, e.to_string()))?
        .ok_or_else(|| IngestError::new(ErrorCode::NoDocument, format!("No such document `{}`", key)))?;

    let expr = parse(input)?;
    let schema = index.schema();

    let mut values: Vec<(String, Value)> = Vec::new();
    let mut stored = Vec::new();
    for name in expr.properties() {
        let fs = schema
            .field(name)
            .ok_or_else(|| parse_error(format!("Unknown property `{}`", name)))?;
        let sortable = schema
            .field_sorting_index(name)
            .and_then(|slot| md.sort_vector.as_ref().and_then(|sv| sv.get(slot)));
        match sortable {
            Some(value) => {
                let value = match value {
                    SortableValue::Nil => Value::Nil,
                    SortableValue::Str(s) => Value::Str(s.clone()),
                    SortableValue::Num(n) => Value::Num(*n),
                };
                values.push((name.to_string(), value));
            }
            None => stored.push((name, fs.name.as_str())),
        }
    }

    if !stored.is_empty() {
        let names: Vec<&str> = stored.iter().map(|(_, field)| *field).collect();
        let fields = store.load_fields(key, &names).map_err(|e| {
            warn!(key = %key, error = %e, "Document store read failed");
            IngestError::new(ErrorCode::IndexGeneric, e.to_string())
        })?;
        let loaded = Document {
            fields: fields.unwrap_or_default(),
            ..Document::new(key)
        };
        for (prop, field) in stored {
            let value = loaded
                .field(field)
                .map(|f| Value::Str(f.value.clone()))
                .unwrap_or(Value::Nil);
            values.push((prop.to_string(), value));
        }
    }

    let result = expr
        .eval(&|name: &str| {
            values
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.clone())
                .unwrap_or(Value::Nil)
        })
        .is_truthy();
    debug!(key = %key, result, "Evaluated condition");
    Ok(result)
}
