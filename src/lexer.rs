//! A small Go scanner.
//!
//! Only distinguishes what the annotator needs: identifiers, keywords,
//! comments, and everything else. Whitespace produces no tokens.

use std::ops::Range;

/// Go's reserved words.
const KEYWORDS: [&str; 25] = [
    "break",
    "case",
    "chan",
    "const",
    "continue",
    "default",
    "defer",
    "else",
    "fallthrough",
    "for",
    "func",
    "go",
    "goto",
    "if",
    "import",
    "interface",
    "map",
    "package",
    "range",
    "return",
    "select",
    "struct",
    "switch",
    "type",
    "var",
];

/// One lexical token and the bytes it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// What the token is.
    pub kind: TokenKind,
    /// Byte range in the scanned text.
    pub range: Range<usize>,
}

/// Token classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `// line` or `/* block */` comment.
    Comment,
    /// Identifier, including predeclared names like `nil` and `_`.
    Ident,
    /// Reserved word.
    Keyword,
    /// Literal, operator, or delimiter.
    Other,
}

/// Cursor over the text being scanned.
struct Scanner<'a> {
    /// Byte offset of the next unread character.
    pos: usize,
    /// Text being scanned.
    src: &'a str,
}

impl Scanner<'_> {
    /// Consume one character.
    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos = self.pos.saturating_add(c.len_utf8());
        return Some(c);
    }

    /// Consume characters while `pred` holds.
    fn eat_while(&mut self, pred: impl Fn(char) -> bool) {
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
    }

    /// Consume a quoted literal whose opening `quote` was already read.
    ///
    /// Unterminated literals stop at the end of the line, except raw strings,
    /// which may span lines.
    fn eat_quoted(&mut self, quote: char) {
        while let Some(c) = self.peek() {
            if c == '\n' && quote != '`' {
                return;
            }
            self.bump();
            if c == quote {
                return;
            }
            if c == '\\' && quote != '`' {
                self.bump();
            }
        }
    }

    /// Character after the next one.
    fn peek_second(&self) -> Option<char> {
        let mut chars = self.rest().chars();
        chars.next();
        return chars.next();
    }

    /// Next character, without consuming it.
    fn peek(&self) -> Option<char> {
        return self.rest().chars().next();
    }

    /// Unread text.
    fn rest(&self) -> &str {
        return self.src.get(self.pos..).unwrap_or("");
    }

    /// Scan one token starting at the current position, or `None` at the end.
    fn token(&mut self) -> Option<Token> {
        self.eat_while(char::is_whitespace);
        let start = self.pos;
        let c = self.bump()?;

        let kind = match c {
            '/' if self.peek() == Some('/') => {
                self.eat_while(|c| return c != '\n');
                TokenKind::Comment
            },
            '/' if self.peek() == Some('*') => {
                self.bump();
                match self.rest().find("*/") {
                    Some(end) => self.pos = self.pos.saturating_add(end).saturating_add(2),
                    None => self.pos = self.src.len(),
                }
                TokenKind::Comment
            },
            '"' | '\'' | '`' => {
                self.eat_quoted(c);
                TokenKind::Other
            },
            c if is_ident_start(c) => {
                self.eat_while(is_ident_continue);
                let word = self.src.get(start..self.pos).unwrap_or("");
                if KEYWORDS.contains(&word) {
                    TokenKind::Keyword
                } else {
                    TokenKind::Ident
                }
            },
            c if c.is_ascii_digit() => {
                self.eat_number();
                TokenKind::Other
            },
            '.' if self.peek().is_some_and(|c| return c.is_ascii_digit()) => {
                self.eat_number();
                TokenKind::Other
            },
            _ => TokenKind::Other,
        };

        return Some(Token {
            kind,
            range: start..self.pos,
        });
    }

    /// Consume the rest of a numeric literal, including exponents.
    fn eat_number(&mut self) {
        let mut prev = '0';
        while let Some(c) = self.peek() {
            let exponent_sign = matches!(c, '+' | '-') && matches!(prev, 'e' | 'E' | 'p' | 'P');
            let part = c.is_ascii_alphanumeric() || c == '_' || c == '.';
            if !part && !exponent_sign {
                return;
            }
            if c == '.' && self.peek_second() == Some('.') {
                return;
            }
            prev = c;
            self.bump();
        }
    }
}

/// Split Go source into tokens, in order.
pub fn tokenize(src: &str) -> Vec<Token> {
    let mut scanner = Scanner { pos: 0, src };
    let mut tokens = Vec::new();
    while let Some(token) = scanner.token() {
        tokens.push(token);
    }
    return tokens;
}

/// Whether `c` can begin an identifier.
fn is_ident_start(c: char) -> bool {
    return c == '_' || c.is_alphabetic();
}

/// Whether `c` can continue an identifier.
fn is_ident_continue(c: char) -> bool {
    return c == '_' || c.is_alphanumeric();
}
