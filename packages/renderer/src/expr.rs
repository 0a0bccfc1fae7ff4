//! Expression parser and interpreter behind [`crate::DirectEvaluator`]
//!
//! Supports a small JavaScript-like subset:
//!
//! ```text
//! expr        := conditional
//! conditional := or ( "?" expr ":" expr )?
//! or          := and ( "||" and )*
//! and         := equality ( "&&" equality )*
//! equality    := relational ( ("==" | "!=" | "===" | "!==") relational )*
//! relational  := additive ( ("<" | "<=" | ">" | ">=") additive )*
//! additive    := multiplicative ( ("+" | "-") multiplicative )*
//! multiplicative := unary ( ("*" | "/" | "%") unary )*
//! unary       := ("!" | "-" | "+") unary | postfix
//! postfix     := primary ( "." ident | "[" expr "]" | "(" args ")" )*
//! primary     := number | string | true | false | null | undefined | ident | "(" expr ")"
//! ```

use crate::error::{EvalError, EvalResult};
use logos::Logos;
use serde_json::{Map, Number, Value};
use std::ops::Range;
use stencil_model::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Ident(String),
    Member(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Call(Box<Expr>, Vec<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
}

/// Deepest nesting of groups, operators and member chains accepted
pub const MAX_DEPTH: usize = 128;

const TOO_DEEP: &str = "Expression nested too deeply";

// ---- parsing ----------------------------------------------------------------

pub fn parse_expression(source: &str) -> EvalResult<Expr> {
    let mut tokens = Vec::new();
    for (result, span) in Token::lexer(source).spanned() {
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(()) => {
                return Err(EvalError::Syntax {
                    message: format!("Unexpected character '{}'", &source[span.clone()]),
                    position: span.start,
                })
            }
        }
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        end: source.len(),
        depth: 0,
    };
    if parser.tokens.is_empty() {
        return Err(parser.error("Empty expression"));
    }

    let expr = parser.expression()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(parser.error(format!("Unexpected {}", token))),
    }
}

struct Parser<'src> {
    tokens: Vec<(Token<'src>, Range<usize>)>,
    pos: usize,
    end: usize,
    depth: usize,
}

impl<'src> Parser<'src> {
    fn peek(&self) -> Option<Token<'src>> {
        self.tokens.get(self.pos).map(|(token, _)| *token)
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(_, span)| span.start)
            .unwrap_or(self.end)
    }

    fn error(&self, message: impl Into<String>) -> EvalError {
        EvalError::Syntax {
            message: message.into(),
            position: self.position(),
        }
    }

    fn enter(&mut self) -> EvalResult<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.error(TOO_DEEP));
        }
        Ok(())
    }

    fn advance(&mut self) -> Option<Token<'src>> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: Token<'_>) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token<'_>) -> EvalResult<()> {
        if self.eat(expected) {
            Ok(())
        } else {
            match self.peek() {
                Some(found) => Err(self.error(format!("Expected '{}', found {}", expected, found))),
                None => Err(self.error(format!("Expected '{}', found end of expression", expected))),
            }
        }
    }

    fn expression(&mut self) -> EvalResult<Expr> {
        let condition = self.or()?;
        if !self.eat(Token::Question) {
            return Ok(condition);
        }
        self.enter()?;
        let then = self.expression()?;
        self.expect(Token::Colon)?;
        let otherwise = self.expression()?;
        self.depth -= 1;
        Ok(Expr::Conditional(
            Box::new(condition),
            Box::new(then),
            Box::new(otherwise),
        ))
    }

    fn binary_level(
        &mut self,
        next: fn(&mut Self) -> EvalResult<Expr>,
        operator: fn(Token<'_>) -> Option<BinaryOp>,
    ) -> EvalResult<Expr> {
        let mut left = next(self)?;
        // each link deepens the left-leaning tree
        let mut links = 0;
        while let Some(op) = self.peek().and_then(operator) {
            self.pos += 1;
            self.enter()?;
            links += 1;
            let right = next(self)?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        self.depth -= links;
        Ok(left)
    }

    fn or(&mut self) -> EvalResult<Expr> {
        self.binary_level(Self::and, |t| (t == Token::Or).then_some(BinaryOp::Or))
    }

    fn and(&mut self) -> EvalResult<Expr> {
        self.binary_level(Self::equality, |t| (t == Token::And).then_some(BinaryOp::And))
    }

    fn equality(&mut self) -> EvalResult<Expr> {
        self.binary_level(Self::relational, |t| match t {
            Token::Eq => Some(BinaryOp::Eq),
            Token::NotEq => Some(BinaryOp::NotEq),
            Token::StrictEq => Some(BinaryOp::StrictEq),
            Token::StrictNotEq => Some(BinaryOp::StrictNotEq),
            _ => None,
        })
    }

    fn relational(&mut self) -> EvalResult<Expr> {
        self.binary_level(Self::additive, |t| match t {
            Token::Lt => Some(BinaryOp::Lt),
            Token::Le => Some(BinaryOp::Le),
            Token::Gt => Some(BinaryOp::Gt),
            Token::Ge => Some(BinaryOp::Ge),
            _ => None,
        })
    }

    fn additive(&mut self) -> EvalResult<Expr> {
        self.binary_level(Self::multiplicative, |t| match t {
            Token::Plus => Some(BinaryOp::Add),
            Token::Minus => Some(BinaryOp::Sub),
            _ => None,
        })
    }

    fn multiplicative(&mut self) -> EvalResult<Expr> {
        self.binary_level(Self::unary, |t| match t {
            Token::Star => Some(BinaryOp::Mul),
            Token::Slash => Some(BinaryOp::Div),
            Token::Percent => Some(BinaryOp::Rem),
            _ => None,
        })
    }

    fn unary(&mut self) -> EvalResult<Expr> {
        let op = match self.peek() {
            Some(Token::Not) => UnaryOp::Not,
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Plus) => UnaryOp::Plus,
            _ => return self.postfix(),
        };
        self.pos += 1;
        self.enter()?;
        let operand = self.unary()?;
        self.depth -= 1;
        Ok(Expr::Unary(op, Box::new(operand)))
    }

    fn postfix(&mut self) -> EvalResult<Expr> {
        let mut expr = self.primary()?;
        let mut links = 0;
        loop {
            if matches!(self.peek(), Some(Token::Dot | Token::LBracket | Token::LParen)) {
                self.enter()?;
                links += 1;
            }
            if self.eat(Token::Dot) {
                match self.advance() {
                    Some(Token::Ident(name)) => expr = Expr::Member(Box::new(expr), name.to_string()),
                    _ => return Err(self.error("Expected property name after '.'")),
                }
            } else if self.eat(Token::LBracket) {
                let index = self.expression()?;
                self.expect(Token::RBracket)?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else if self.eat(Token::LParen) {
                let mut args = Vec::new();
                if !self.eat(Token::RParen) {
                    loop {
                        args.push(self.expression()?);
                        if self.eat(Token::RParen) {
                            break;
                        }
                        self.expect(Token::Comma)?;
                    }
                }
                expr = Expr::Call(Box::new(expr), args);
            } else {
                self.depth -= links;
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> EvalResult<Expr> {
        let position = self.position();
        match self.advance() {
            Some(Token::Number(raw)) => raw
                .parse::<f64>()
                .ok()
                .and_then(number_value)
                .map(Expr::Literal)
                .ok_or(EvalError::Syntax {
                    message: format!("Invalid number '{}'", raw),
                    position,
                }),
            Some(Token::String(raw)) => Ok(Expr::Literal(Value::String(unquote(raw)))),
            Some(Token::True) => Ok(Expr::Literal(Value::Bool(true))),
            Some(Token::False) => Ok(Expr::Literal(Value::Bool(false))),
            Some(Token::Null) | Some(Token::Undefined) => Ok(Expr::Literal(Value::Null)),
            Some(Token::Ident(name)) => Ok(Expr::Ident(name.to_string())),
            Some(Token::LParen) => {
                self.enter()?;
                let expr = self.expression()?;
                self.expect(Token::RParen)?;
                self.depth -= 1;
                Ok(expr)
            }
            Some(token) => Err(EvalError::Syntax {
                message: format!("Unexpected {}", token),
                position,
            }),
            None => Err(self.error("Unexpected end of expression")),
        }
    }
}

fn unquote(raw: &str) -> String {
    let inner = &raw[1..raw.len().saturating_sub(1).max(1)];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

// ---- values -----------------------------------------------------------------

/// JSON number, integral when possible; `None` for NaN and infinities
pub fn number_value(f: f64) -> Option<Value> {
    if !f.is_finite() {
        None
    } else if f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 {
        Some(Value::Number(Number::from(f as i64)))
    } else {
        Number::from_f64(f).map(Value::Number)
    }
}

/// JavaScript truthiness over JSON values
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Text shown when a value is substituted into content
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(display_value).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
    }
}

fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Null => Some(0.0),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => n.as_f64(),
        Value::String(s) if s.trim().is_empty() => Some(0.0),
        Value::String(s) => s.trim().parse().ok(),
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn arithmetic(result: f64) -> EvalResult<Value> {
    number_value(result).ok_or_else(|| EvalError::Type("Result is not a finite number".to_string()))
}

fn numeric(value: &Value, op: &str) -> EvalResult<f64> {
    to_number(value).ok_or_else(|| {
        EvalError::Type(format!("Cannot use {} as a number with '{}'", type_name(value), op))
    })
}

fn strict_equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

fn loose_equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Number(_) | Value::Bool(_), Value::String(_) | Value::Bool(_) | Value::Number(_))
        | (Value::String(_), Value::Number(_) | Value::Bool(_)) => {
            match (to_number(left), to_number(right)) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            }
        }
        _ => strict_equals(left, right),
    }
}

fn compare(op: BinaryOp, left: &Value, right: &Value) -> bool {
    let ordering = match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => match (to_number(left), to_number(right)) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
    };
    match ordering {
        Some(ordering) => match op {
            BinaryOp::Lt => ordering.is_lt(),
            BinaryOp::Le => ordering.is_le(),
            BinaryOp::Gt => ordering.is_gt(),
            BinaryOp::Ge => ordering.is_ge(),
            _ => false,
        },
        None => false,
    }
}

// ---- evaluation -------------------------------------------------------------

pub fn evaluate(expr: &Expr, context: &Map<String, Value>) -> EvalResult<Value> {
    eval_at(expr, context, 0)
}

fn eval_at(expr: &Expr, context: &Map<String, Value>, depth: usize) -> EvalResult<Value> {
    // parsed trees stay within the bound; hand-built ones may not
    if depth > MAX_DEPTH * 2 {
        return Err(EvalError::Syntax {
            message: TOO_DEEP.to_string(),
            position: 0,
        });
    }
    let evaluate = |expr: &Expr, context: &Map<String, Value>| eval_at(expr, context, depth + 1);

    match expr {
        Expr::Literal(value) => Ok(value.clone()),

        Expr::Ident(name) => context
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::UnknownIdentifier(name.clone())),

        Expr::Member(object, property) => {
            let target = evaluate(object, context)?;
            member(&target, property)
        }

        Expr::Index(object, index) => {
            let target = evaluate(object, context)?;
            let key = evaluate(index, context)?;
            match (&target, &key) {
                (Value::Array(items), Value::Number(n)) => Ok(n
                    .as_u64()
                    .and_then(|i| items.get(i as usize))
                    .cloned()
                    .unwrap_or(Value::Null)),
                (Value::String(s), Value::Number(n)) => Ok(n
                    .as_u64()
                    .and_then(|i| s.chars().nth(i as usize))
                    .map(|c| Value::String(c.to_string()))
                    .unwrap_or(Value::Null)),
                _ => member(&target, &display_value(&key)),
            }
        }

        Expr::Call(callee, args) => {
            let args = args
                .iter()
                .map(|arg| evaluate(arg, context))
                .collect::<EvalResult<Vec<_>>>()?;
            match callee.as_ref() {
                Expr::Member(object, method) => match object.as_ref() {
                    Expr::Ident(name) if name == "Math" && !context.contains_key("Math") => {
                        call_math(method, &args)
                    }
                    _ => {
                        let target = evaluate(object, context)?;
                        call_method(&target, method, &args)
                    }
                },
                Expr::Ident(name) => call_global(name, &args),
                _ => Err(EvalError::UnknownFunction("expression".to_string())),
            }
        }

        Expr::Unary(op, operand) => {
            let value = evaluate(operand, context)?;
            match op {
                UnaryOp::Not => Ok(Value::Bool(!is_truthy(&value))),
                UnaryOp::Neg => arithmetic(-numeric(&value, "-")?),
                UnaryOp::Plus => arithmetic(numeric(&value, "+")?),
            }
        }

        Expr::Binary(BinaryOp::And, left, right) => {
            let left = evaluate(left, context)?;
            if is_truthy(&left) {
                evaluate(right, context)
            } else {
                Ok(left)
            }
        }

        Expr::Binary(BinaryOp::Or, left, right) => {
            let left = evaluate(left, context)?;
            if is_truthy(&left) {
                Ok(left)
            } else {
                evaluate(right, context)
            }
        }

        Expr::Binary(op, left, right) => {
            let left = evaluate(left, context)?;
            let right = evaluate(right, context)?;
            binary(*op, &left, &right)
        }

        Expr::Conditional(condition, then, otherwise) => {
            if is_truthy(&evaluate(condition, context)?) {
                evaluate(then, context)
            } else {
                evaluate(otherwise, context)
            }
        }
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> EvalResult<Value> {
    match op {
        BinaryOp::Add => {
            let concat = |v: &Value| matches!(v, Value::String(_) | Value::Array(_) | Value::Object(_));
            if concat(left) || concat(right) {
                Ok(Value::String(format!("{}{}", display_value(left), display_value(right))))
            } else {
                arithmetic(numeric(left, "+")? + numeric(right, "+")?)
            }
        }
        BinaryOp::Sub => arithmetic(numeric(left, "-")? - numeric(right, "-")?),
        BinaryOp::Mul => arithmetic(numeric(left, "*")? * numeric(right, "*")?),
        BinaryOp::Div => arithmetic(numeric(left, "/")? / numeric(right, "/")?),
        BinaryOp::Rem => arithmetic(numeric(left, "%")? % numeric(right, "%")?),
        BinaryOp::Eq => Ok(Value::Bool(loose_equals(left, right))),
        BinaryOp::NotEq => Ok(Value::Bool(!loose_equals(left, right))),
        BinaryOp::StrictEq => Ok(Value::Bool(strict_equals(left, right))),
        BinaryOp::StrictNotEq => Ok(Value::Bool(!strict_equals(left, right))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            Ok(Value::Bool(compare(op, left, right)))
        }
        // short-circuited in `evaluate`
        BinaryOp::And | BinaryOp::Or => Ok(Value::Bool(is_truthy(left) && is_truthy(right))),
    }
}

fn member(target: &Value, property: &str) -> EvalResult<Value> {
    match target {
        Value::Null => Err(EvalError::Type(format!(
            "Cannot read properties of null (reading '{}')",
            property
        ))),
        Value::Object(map) => Ok(map.get(property).cloned().unwrap_or(Value::Null)),
        Value::Array(items) if property == "length" => Ok(Value::from(items.len())),
        Value::String(s) if property == "length" => Ok(Value::from(s.chars().count())),
        _ => Ok(Value::Null),
    }
}

fn arg<'a>(args: &'a [Value], index: usize) -> &'a Value {
    args.get(index).unwrap_or(&Value::Null)
}

fn call_method(target: &Value, method: &str, args: &[Value]) -> EvalResult<Value> {
    match (target, method) {
        (Value::String(s), "toUpperCase") => Ok(Value::String(s.to_uppercase())),
        (Value::String(s), "toLowerCase") => Ok(Value::String(s.to_lowercase())),
        (Value::String(s), "trim") => Ok(Value::String(s.trim().to_string())),
        (Value::String(s), "includes") => Ok(Value::Bool(s.contains(&display_value(arg(args, 0))))),
        (Value::String(s), "startsWith") => {
            Ok(Value::Bool(s.starts_with(&display_value(arg(args, 0)))))
        }
        (Value::String(s), "endsWith") => Ok(Value::Bool(s.ends_with(&display_value(arg(args, 0))))),
        (Value::Number(n), "toFixed") => {
            let digits = arg(args, 0).as_u64().unwrap_or(0).min(20) as usize;
            let f = n.as_f64().unwrap_or(0.0);
            Ok(Value::String(format!("{:.*}", digits, f)))
        }
        (Value::Array(items), "join") => {
            let separator = match arg(args, 0) {
                Value::Null => ",".to_string(),
                other => display_value(other),
            };
            Ok(Value::String(
                items.iter().map(display_value).collect::<Vec<_>>().join(&separator),
            ))
        }
        (Value::Array(items), "includes") => {
            let needle = arg(args, 0);
            Ok(Value::Bool(items.iter().any(|item| strict_equals(item, needle))))
        }
        (Value::Null, _) => Err(EvalError::Type(format!(
            "Cannot read properties of null (reading '{}')",
            method
        ))),
        _ => Err(EvalError::UnknownFunction(format!("{}.{}", type_name(target), method))),
    }
}

fn call_global(name: &str, args: &[Value]) -> EvalResult<Value> {
    let value = arg(args, 0);
    match name {
        "String" => Ok(Value::String(display_value(value))),
        "Number" => Ok(to_number(value).and_then(number_value).unwrap_or(Value::Null)),
        "Boolean" => Ok(Value::Bool(is_truthy(value))),
        _ => Err(EvalError::UnknownFunction(name.to_string())),
    }
}

fn call_math(function: &str, args: &[Value]) -> EvalResult<Value> {
    let numbers = args
        .iter()
        .map(|value| numeric(value, function))
        .collect::<EvalResult<Vec<f64>>>()?;
    let first = numbers.first().copied().unwrap_or(f64::NAN);

    let result = match function {
        "round" => first.round(),
        "floor" => first.floor(),
        "ceil" => first.ceil(),
        "abs" => first.abs(),
        "min" => numbers.iter().copied().fold(f64::INFINITY, f64::min),
        "max" => numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        _ => return Err(EvalError::UnknownFunction(format!("Math.{}", function))),
    };
    arithmetic(result)
}
