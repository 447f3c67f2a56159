//! Tokenizer for selector text.
//!
//! Follows the CSS Syntax Level 3 token shapes that can appear inside a
//! selector list. Block and at-rule tokens are not produced; `{`, `}`, `;`
//! and `@` come through as [`CssToken::Delim`] and are rejected by the parser.

/// Selector-relevant CSS token.
#[derive(Debug, Clone, PartialEq)]
pub enum CssToken {
    Ident(String),
    /// An identifier immediately followed by `(`, e.g. `not(`.
    Function(String),
    Hash(String),
    String(String),
    Number(f64),
    Dimension { value: f64, unit: String },
    Whitespace,
    Colon,
    Comma,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Delim(char),
}

pub struct CssTokenizer {
    input: Vec<char>,
    pos: usize,
}

impl CssTokenizer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
        }
    }

    /// Tokenize the whole input. Comments are dropped.
    pub fn tokenize_all(&mut self) -> Vec<CssToken> {
        let mut tokens = Vec::new();
        while let Some(tok) = self.next_token() {
            tokens.push(tok);
        }
        tokens
    }

    pub fn next_token(&mut self) -> Option<CssToken> {
        self.skip_comments();
        let ch = self.peek()?;

        if is_whitespace(ch) {
            while self.peek().is_some_and(is_whitespace) {
                self.pos += 1;
            }
            return Some(CssToken::Whitespace);
        }

        let tok = match ch {
            '"' | '\'' => self.consume_string(ch),
            '#' => {
                self.pos += 1;
                if self.peek().is_some_and(is_name_char) || self.starts_escape(self.pos) {
                    CssToken::Hash(self.consume_name())
                } else {
                    CssToken::Delim('#')
                }
            }
            '+' | '.' if self.starts_number(self.pos) => self.consume_numeric(),
            '-' if self.starts_number(self.pos) => self.consume_numeric(),
            '-' if self.starts_ident(self.pos) => self.consume_ident_like(),
            c if c.is_ascii_digit() => self.consume_numeric(),
            ':' => self.single(CssToken::Colon),
            ',' => self.single(CssToken::Comma),
            '[' => self.single(CssToken::LBracket),
            ']' => self.single(CssToken::RBracket),
            '(' => self.single(CssToken::LParen),
            ')' => self.single(CssToken::RParen),
            c if is_name_start_char(c) || self.starts_escape(self.pos) => self.consume_ident_like(),
            c => self.single(CssToken::Delim(c)),
        };
        Some(tok)
    }

    fn single(&mut self, tok: CssToken) -> CssToken {
        self.pos += 1;
        tok
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn at(&self, idx: usize) -> Option<char> {
        self.input.get(idx).copied()
    }

    fn skip_comments(&mut self) {
        while self.at(self.pos) == Some('/') && self.at(self.pos + 1) == Some('*') {
            self.pos += 2;
            loop {
                match (self.at(self.pos), self.at(self.pos + 1)) {
                    (Some('*'), Some('/')) => {
                        self.pos += 2;
                        break;
                    }
                    (Some(_), _) => self.pos += 1,
                    (None, _) => return,
                }
            }
        }
    }

    fn starts_escape(&self, idx: usize) -> bool {
        self.at(idx) == Some('\\') && self.at(idx + 1).is_some_and(|c| c != '\n')
    }

    fn starts_ident(&self, idx: usize) -> bool {
        match self.at(idx) {
            Some(c) if is_name_start_char(c) => true,
            Some('-') => match self.at(idx + 1) {
                Some(c) if is_name_start_char(c) || c == '-' => true,
                Some('\\') => self.starts_escape(idx + 1),
                _ => false,
            },
            Some('\\') => self.starts_escape(idx),
            _ => false,
        }
    }

    fn starts_number(&self, idx: usize) -> bool {
        match self.at(idx) {
            Some(c) if c.is_ascii_digit() => true,
            Some('+') | Some('-') => match self.at(idx + 1) {
                Some(c) if c.is_ascii_digit() => true,
                Some('.') => self.at(idx + 2).is_some_and(|c| c.is_ascii_digit()),
                _ => false,
            },
            Some('.') => self.at(idx + 1).is_some_and(|c| c.is_ascii_digit()),
            _ => false,
        }
    }

    fn consume_string(&mut self, quote: char) -> CssToken {
        self.pos += 1;
        let mut value = String::new();
        while let Some(ch) = self.peek() {
            self.pos += 1;
            match ch {
                c if c == quote => break,
                '\n' => break,
                '\\' => match self.peek() {
                    None => break,
                    Some('\n') => self.pos += 1,
                    Some(_) => value.push(self.consume_escape()),
                },
                c => value.push(c),
            }
        }
        CssToken::String(value)
    }

    /// Consume the escape body after a backslash.
    fn consume_escape(&mut self) -> char {
        let Some(ch) = self.peek() else {
            return '\u{FFFD}';
        };
        self.pos += 1;
        if !ch.is_ascii_hexdigit() {
            return ch;
        }
        let mut hex = String::from(ch);
        while hex.len() < 6 && self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
            hex.push(self.input[self.pos]);
            self.pos += 1;
        }
        if self.peek().is_some_and(is_whitespace) {
            self.pos += 1;
        }
        u32::from_str_radix(&hex, 16)
            .ok()
            .and_then(char::from_u32)
            .unwrap_or('\u{FFFD}')
    }

    fn consume_name(&mut self) -> String {
        let mut name = String::new();
        while let Some(ch) = self.peek() {
            if is_name_char(ch) {
                name.push(ch);
                self.pos += 1;
            } else if self.starts_escape(self.pos) {
                self.pos += 1;
                name.push(self.consume_escape());
            } else {
                break;
            }
        }
        name
    }

    fn consume_ident_like(&mut self) -> CssToken {
        let name = self.consume_name();
        if self.peek() == Some('(') {
            self.pos += 1;
            return CssToken::Function(name);
        }
        CssToken::Ident(name)
    }

    fn consume_numeric(&mut self) -> CssToken {
        let mut repr = String::new();
        if let Some(sign @ ('+' | '-')) = self.peek() {
            repr.push(sign);
            self.pos += 1;
        }
        while let Some(c) = self.peek().filter(char::is_ascii_digit) {
            repr.push(c);
            self.pos += 1;
        }
        if self.peek() == Some('.') && self.at(self.pos + 1).is_some_and(|c| c.is_ascii_digit()) {
            repr.push('.');
            self.pos += 1;
            while let Some(c) = self.peek().filter(char::is_ascii_digit) {
                repr.push(c);
                self.pos += 1;
            }
        }
        let value = repr.parse::<f64>().unwrap_or(0.0);
        if self.starts_ident(self.pos) {
            let unit = self.consume_name();
            return CssToken::Dimension { value, unit };
        }
        CssToken::Number(value)
    }
}

fn is_whitespace(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n' | '\r' | '\x0C')
}

fn is_name_start_char(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || !ch.is_ascii()
}

fn is_name_char(ch: char) -> bool {
    is_name_start_char(ch) || ch.is_ascii_digit() || ch == '-'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<CssToken> {
        CssTokenizer::new(input).tokenize_all()
    }

    #[test]
    fn class_and_id() {
        assert_eq!(
            tokens("div.foo#bar"),
            vec![
                CssToken::Ident("div".into()),
                CssToken::Delim('.'),
                CssToken::Ident("foo".into()),
                CssToken::Hash("bar".into()),
            ]
        );
    }

    #[test]
    fn pseudo_function() {
        assert_eq!(
            tokens(":not(.a)"),
            vec![
                CssToken::Colon,
                CssToken::Function("not".into()),
                CssToken::Delim('.'),
                CssToken::Ident("a".into()),
                CssToken::RParen,
            ]
        );
    }

    #[test]
    fn attribute_with_string() {
        assert_eq!(
            tokens(r#"[type="checkbox"]"#),
            vec![
                CssToken::LBracket,
                CssToken::Ident("type".into()),
                CssToken::Delim('='),
                CssToken::String("checkbox".into()),
                CssToken::RBracket,
            ]
        );
    }

    #[test]
    fn nth_arguments() {
        assert_eq!(
            tokens("2n+1"),
            vec![
                CssToken::Dimension {
                    value: 2.0,
                    unit: "n".into()
                },
                CssToken::Number(1.0),
            ]
        );
        assert_eq!(tokens("-n"), vec![CssToken::Ident("-n".into())]);
    }

    #[test]
    fn comments_and_whitespace() {
        assert_eq!(
            tokens("h1 /* heading */ ,h2"),
            vec![
                CssToken::Ident("h1".into()),
                CssToken::Whitespace,
                CssToken::Whitespace,
                CssToken::Comma,
                CssToken::Ident("h2".into()),
            ]
        );
    }

    #[test]
    fn escaped_class_name() {
        assert_eq!(
            tokens(r".a\:b"),
            vec![CssToken::Delim('.'), CssToken::Ident("a:b".into())]
        );
    }
}
