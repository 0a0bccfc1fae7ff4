//! Expression lexer and lexical path scanner
//!
//! Expressions are opaque to the engine. The lexer exists so that the schema
//! analyzer can find path-like substrings and the bundled direct evaluator can
//! parse the small JS-like subset it supports.

use logos::Logos;
use std::fmt;
use std::ops::Range;

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Token<'src> {
    // Keywords
    #[token("true")]
    True,

    #[token("false")]
    False,

    #[token("null")]
    Null,

    #[token("undefined")]
    Undefined,

    #[regex(r"[a-zA-Z_$][a-zA-Z0-9_$]*", |lex| lex.slice())]
    Ident(&'src str),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| lex.slice())]
    #[regex(r"'([^'\\]|\\.)*'", |lex| lex.slice())]
    String(&'src str),

    #[regex(r"[0-9]+(\.[0-9]+)?", |lex| lex.slice())]
    Number(&'src str),

    // Symbols
    #[token(".")]
    Dot,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token(",")]
    Comma,

    #[token("?")]
    Question,

    #[token(":")]
    Colon,

    // Operators
    #[token("===")]
    StrictEq,

    #[token("!==")]
    StrictNotEq,

    #[token("==")]
    Eq,

    #[token("!=")]
    NotEq,

    #[token("<=")]
    Le,

    #[token(">=")]
    Ge,

    #[token("<")]
    Lt,

    #[token(">")]
    Gt,

    #[token("&&")]
    And,

    #[token("||")]
    Or,

    #[token("!")]
    Not,

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("%")]
    Percent,
}

impl<'src> fmt::Display for Token<'src> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::Null => write!(f, "null"),
            Token::Undefined => write!(f, "undefined"),
            Token::Ident(s) => write!(f, "identifier '{}'", s),
            Token::String(s) => write!(f, "string {}", s),
            Token::Number(n) => write!(f, "number {}", n),
            Token::Dot => write!(f, "."),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
            Token::Question => write!(f, "?"),
            Token::Colon => write!(f, ":"),
            Token::StrictEq => write!(f, "==="),
            Token::StrictNotEq => write!(f, "!=="),
            Token::Eq => write!(f, "=="),
            Token::NotEq => write!(f, "!="),
            Token::Le => write!(f, "<="),
            Token::Ge => write!(f, ">="),
            Token::Lt => write!(f, "<"),
            Token::Gt => write!(f, ">"),
            Token::And => write!(f, "&&"),
            Token::Or => write!(f, "||"),
            Token::Not => write!(f, "!"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
        }
    }
}

/// Tokenize an expression, dropping characters the lexer does not recognize
pub fn tokenize(source: &str) -> Vec<(Token<'_>, Range<usize>)> {
    Token::lexer(source)
        .spanned()
        .filter_map(|(result, span)| result.ok().map(|token| (token, span)))
        .collect()
}

/// Namespaces and functions provided by the evaluator rather than the data
pub const BUILTINS: [&str; 4] = ["Math", "String", "Number", "Boolean"];

/// Path-like substrings of an expression, in first-seen order.
///
/// A path is an identifier followed by any number of `.name`, `[digits]` or
/// `[]` segments. Literals and keywords never start a path, identifiers that
/// follow a `.` belong to the preceding path, function names are dropped and
/// a trailing method segment (`items.filter(...)`) is trimmed. Calls into a
/// [`BUILTINS`] namespace (`Math.round(...)`) contribute no path.
pub fn scan_paths(source: &str) -> Vec<String> {
    let tokens: Vec<Token<'_>> = tokenize(source).into_iter().map(|(t, _)| t).collect();
    let mut paths: Vec<String> = Vec::new();
    let mut i = 0;

    while i < tokens.len() {
        let root = match tokens[i] {
            Token::Ident(name) if i == 0 || tokens[i - 1] != Token::Dot => name,
            _ => {
                i += 1;
                continue;
            }
        };

        let mut segments: Vec<String> = Vec::new();
        let mut j = i + 1;
        loop {
            match (tokens.get(j), tokens.get(j + 1), tokens.get(j + 2)) {
                (Some(Token::Dot), Some(Token::Ident(name)), _) => {
                    segments.push(format!(".{}", name));
                    j += 2;
                }
                (Some(Token::LBracket), Some(Token::Number(n)), Some(Token::RBracket)) => {
                    segments.push(format!("[{}]", n));
                    j += 3;
                }
                (Some(Token::LBracket), Some(Token::RBracket), _) => {
                    segments.push("[]".to_string());
                    j += 2;
                }
                _ => break,
            }
        }

        if tokens.get(j) == Some(&Token::LParen) {
            match segments.last() {
                Some(last) if last.starts_with('.') => {
                    segments.pop();
                    if segments.is_empty() && BUILTINS.contains(&root) {
                        i = j;
                        continue;
                    }
                }
                Some(_) => {}
                None => {
                    // bare function call
                    i = j;
                    continue;
                }
            }
        }

        let path = format!("{}{}", root, segments.concat());
        if !paths.contains(&path) {
            paths.push(path);
        }
        i = j;
    }

    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_and_identifiers() {
        let tokens = tokenize("true false null undefined truthy");

        assert_eq!(tokens[0].0, Token::True);
        assert_eq!(tokens[1].0, Token::False);
        assert_eq!(tokens[2].0, Token::Null);
        assert_eq!(tokens[3].0, Token::Undefined);
        assert_eq!(tokens[4].0, Token::Ident("truthy"));
    }

    #[test]
    fn test_operators() {
        let tokens = tokenize("a === b && c !== d || !e");
        let kinds: Vec<_> = tokens.into_iter().map(|(t, _)| t).collect();

        assert_eq!(
            kinds,
            vec![
                Token::Ident("a"),
                Token::StrictEq,
                Token::Ident("b"),
                Token::And,
                Token::Ident("c"),
                Token::StrictNotEq,
                Token::Ident("d"),
                Token::Or,
                Token::Not,
                Token::Ident("e"),
            ]
        );
    }

    #[test]
    fn test_scan_simple_paths() {
        assert_eq!(
            scan_paths("customer.name + ' ' + customer.address.city"),
            vec!["customer.name", "customer.address.city"]
        );
    }

    #[test]
    fn test_scan_indexed_paths() {
        assert_eq!(scan_paths("items[0].price * 2"), vec!["items[0].price"]);
        assert_eq!(scan_paths("items[].name"), vec!["items[].name"]);
    }

    #[test]
    fn test_scan_skips_literals_and_keywords() {
        assert_eq!(
            scan_paths("total > 100 && vip === true || note !== 'x.y'"),
            vec!["total", "vip", "note"]
        );
        assert!(scan_paths("null").is_empty());
    }

    #[test]
    fn test_scan_drops_function_names() {
        assert_eq!(scan_paths("formatDate(order.date)"), vec!["order.date"]);
        assert_eq!(scan_paths("items.filter(x)"), vec!["items", "x"]);
    }

    #[test]
    fn test_scan_skips_builtin_namespaces() {
        assert_eq!(scan_paths("Math.round(total)"), vec!["total"]);
        assert_eq!(
            scan_paths("Math.max(a.b, c) + String(d)"),
            vec!["a.b", "c", "d"]
        );
        // a data field that happens to share the name is still a path
        assert_eq!(scan_paths("Math.score"), vec!["Math.score"]);
    }

    #[test]
    fn test_scan_deduplicates() {
        assert_eq!(scan_paths("a.b + a.b"), vec!["a.b"]);
    }
}
