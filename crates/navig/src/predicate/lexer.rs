use crate::diagnostics::{Diagnostic, Span};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Number,
    String,
    Symbol,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Source text, except for strings where escapes are already resolved.
    pub text: String,
    pub span: Span,
}

const SYMBOLS: &[&str] = &[
    "===", "!==", "==", "!=", "<=", ">=", "&&", "||", "(", ")", "[", "]", ".", "!", "-", "+",
    "*", "/", "%", "<", ">",
];

pub fn lex(content: &str) -> (Vec<Token>, Vec<Diagnostic>) {
    let mut tokens = Vec::new();
    let mut diagnostics = Vec::new();

    let chars: Vec<char> = content.chars().collect();
    let mut index = 0usize;
    let mut line = 1usize;
    let mut col = 1usize;

    while index < chars.len() {
        let ch = chars[index];

        if ch == '\n' {
            index += 1;
            line += 1;
            col = 1;
            continue;
        }

        if ch.is_whitespace() {
            index += 1;
            col += 1;
            continue;
        }

        if ch == '"' || ch == '\'' {
            let start = index;
            let start_col = col;
            index += 1;
            col += 1;
            let mut text = String::new();
            let mut closed = false;
            while index < chars.len() && chars[index] != '\n' {
                let c = chars[index];
                if c == '\\' && index + 1 < chars.len() && chars[index + 1] != '\n' {
                    text.push(match chars[index + 1] {
                        'n' => '\n',
                        't' => '\t',
                        other => other,
                    });
                    index += 2;
                    col += 2;
                    continue;
                }
                index += 1;
                col += 1;
                if c == ch {
                    closed = true;
                    break;
                }
                text.push(c);
            }
            let span = Span::single(line, start_col, index - start);
            if !closed {
                diagnostics.push(
                    Diagnostic::new("E2001", "unterminated string literal", span.clone())
                        .with_label("string literal started here", Span::single(line, start_col, 1)),
                );
            }
            tokens.push(Token {
                kind: TokenKind::String,
                text,
                span,
            });
            continue;
        }

        if is_ident_start(ch) {
            let start = index;
            let start_col = col;
            while index < chars.len() && is_ident_continue(chars[index]) {
                index += 1;
                col += 1;
            }
            tokens.push(Token {
                kind: TokenKind::Ident,
                text: chars[start..index].iter().collect(),
                span: Span::single(line, start_col, index - start),
            });
            continue;
        }

        if ch.is_ascii_digit() {
            let start = index;
            let start_col = col;
            while index < chars.len() && chars[index].is_ascii_digit() {
                index += 1;
                col += 1;
            }
            if index + 1 < chars.len() && chars[index] == '.' && chars[index + 1].is_ascii_digit() {
                index += 1;
                col += 1;
                while index < chars.len() && chars[index].is_ascii_digit() {
                    index += 1;
                    col += 1;
                }
            }
            tokens.push(Token {
                kind: TokenKind::Number,
                text: chars[start..index].iter().collect(),
                span: Span::single(line, start_col, index - start),
            });
            continue;
        }

        if let Some(symbol) = SYMBOLS.iter().find(|symbol| matches_at(&chars, index, symbol)) {
            let len = symbol.chars().count();
            tokens.push(Token {
                kind: TokenKind::Symbol,
                text: symbol.to_string(),
                span: Span::single(line, col, len),
            });
            index += len;
            col += len;
            continue;
        }

        diagnostics.push(Diagnostic::new(
            "E2002",
            format!("unexpected character '{ch}'"),
            Span::single(line, col, 1),
        ));
        index += 1;
        col += 1;
    }

    (tokens, diagnostics)
}

fn matches_at(chars: &[char], index: usize, symbol: &str) -> bool {
    let mut offset = index;
    for expected in symbol.chars() {
        if chars.get(offset) != Some(&expected) {
            return false;
        }
        offset += 1;
    }
    true
}

fn is_ident_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || ch == '$'
}

fn is_ident_continue(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}
