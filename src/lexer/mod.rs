//! Lexer for Neon source code.
//!
//! Characters are pulled line by line from a [`CodeProvider`]; tokens are
//! produced on demand with arbitrary lookahead via [`Lexer::peek`]. Keywords
//! win over identifiers, and punctuation uses longest match (`==` before `=`).

mod token;

pub use token::*;

use std::collections::{HashMap, VecDeque};

use once_cell::sync::Lazy;

use crate::{diagnostics::Diagnostics, loader::CodeProvider};

static KEYWORDS: Lazy<HashMap<&'static str, TokenKind>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("fun", TokenKind::Fun);
    m.insert("return", TokenKind::Return);
    m.insert("if", TokenKind::If);
    m.insert("else", TokenKind::Else);
    m.insert("for", TokenKind::For);
    m.insert("true", TokenKind::True);
    m.insert("false", TokenKind::False);
    m.insert("and", TokenKind::And);
    m.insert("or", TokenKind::Or);
    m.insert("not", TokenKind::Not);
    m.insert("import", TokenKind::Import);
    m.insert("extern", TokenKind::Extern);
    m.insert("assert", TokenKind::Assert);
    m.insert("type", TokenKind::Type);
    m.insert("int", TokenKind::DataType);
    m.insert("float", TokenKind::DataType);
    m.insert("bool", TokenKind::DataType);
    m.insert("void", TokenKind::DataType);
    m
});

pub struct Lexer {
    provider: Box<dyn CodeProvider>,
    line: Vec<char>,
    line_no: usize,
    col: usize,
    exhausted: bool,
    buffered: VecDeque<Token>,
}

impl Lexer {
    pub fn new(provider: Box<dyn CodeProvider>) -> Self {
        Self {
            provider,
            line: vec![],
            line_no: 0,
            col: 0,
            exhausted: false,
            buffered: VecDeque::new(),
        }
    }

    /// Returns the k-th upcoming token without consuming it.
    pub fn peek(&mut self, k: usize, diagnostics: &mut Diagnostics) -> &Token {
        while self.buffered.len() <= k {
            let token = self.read_token(diagnostics);
            self.buffered.push_back(token);
        }
        &self.buffered[k]
    }

    /// Consumes and returns the next token.
    pub fn next(&mut self, diagnostics: &mut Diagnostics) -> Token {
        self.peek(0, diagnostics);
        self.buffered
            .pop_front()
            .unwrap_or_else(|| Token::end_of_file((self.line_no, self.col + 1)))
    }

    fn current(&self) -> Option<char> {
        self.line.get(self.col).copied()
    }

    fn lookahead(&self, offset: usize) -> Option<char> {
        self.line.get(self.col + offset).copied()
    }

    fn advance(&mut self) {
        self.col += 1;
    }

    /// Moves to the next character with content, pulling new lines as needed.
    fn skip_whitespace(&mut self) {
        loop {
            match self.current() {
                Some(c) if c.is_whitespace() => self.advance(),
                Some(_) => return,
                None => {
                    let Some(line) = self.provider.next_line() else {
                        self.exhausted = true;
                        return;
                    };
                    self.line = line.chars().collect();
                    self.line_no += 1;
                    self.col = 0;
                }
            }
        }
    }

    fn read_token(&mut self, diagnostics: &mut Diagnostics) -> Token {
        loop {
            self.skip_whitespace();
            if self.exhausted {
                return Token::end_of_file((self.line_no, self.col + 1));
            }

            let position = (self.line_no, self.col + 1);
            let Some(c) = self.current() else {
                continue;
            };

            if c.is_ascii_alphabetic() || c == '_' {
                return self.read_word(position);
            }
            if c.is_ascii_digit() {
                return self.read_number(position);
            }
            if c == '"' {
                return self.read_string(position, diagnostics);
            }
            if let Some(token) = self.read_punctuation(position) {
                return token;
            }

            diagnostics.report(format!(
                "unrecognised character '{c}' at {}:{}",
                position.0, position.1
            ));
            self.advance();
        }
    }

    fn read_word(&mut self, position: Position) -> Token {
        let mut word = String::new();
        while let Some(c) = self.current() {
            if !c.is_ascii_alphanumeric() && c != '_' {
                break;
            }
            word.push(c);
            self.advance();
        }

        match KEYWORDS.get(word.as_str()) {
            Some(kind) => Token::new(*kind, word, position),
            None => Token::new(TokenKind::VariableName, word, position),
        }
    }

    fn read_number(&mut self, position: Position) -> Token {
        let mut number = String::new();
        while let Some(c) = self.current() {
            if !c.is_ascii_digit() {
                break;
            }
            number.push(c);
            self.advance();
        }

        // a dot only belongs to the number when digits follow it
        let is_float = self.current() == Some('.')
            && self.lookahead(1).is_some_and(|c| c.is_ascii_digit());
        if is_float {
            number.push('.');
            self.advance();
            while let Some(c) = self.current() {
                if !c.is_ascii_digit() {
                    break;
                }
                number.push(c);
                self.advance();
            }
            return Token::new(TokenKind::Float, number, position);
        }

        Token::new(TokenKind::Integer, number, position)
    }

    fn read_string(&mut self, position: Position, diagnostics: &mut Diagnostics) -> Token {
        self.advance();
        let mut content = String::new();
        loop {
            match self.current() {
                Some('"') => {
                    self.advance();
                    break;
                }
                Some(c) => {
                    content.push(c);
                    self.advance();
                }
                None => {
                    diagnostics.report(format!(
                        "unterminated string literal at {}:{}",
                        position.0, position.1
                    ));
                    break;
                }
            }
        }

        let content = unescape::unescape(&content).unwrap_or(content);
        Token::new(TokenKind::StringLiteral, content, position)
    }

    fn read_punctuation(&mut self, position: Position) -> Option<Token> {
        let c = self.current()?;
        let followed_by_equals = self.lookahead(1) == Some('=');

        let (kind, len) = match c {
            '=' if followed_by_equals => (TokenKind::DoubleEquals, 2),
            '=' => (TokenKind::SingleEquals, 1),
            '!' if followed_by_equals => (TokenKind::NotEquals, 2),
            '<' if followed_by_equals => (TokenKind::LessEquals, 2),
            '<' => (TokenKind::LessThan, 1),
            '>' if followed_by_equals => (TokenKind::GreaterEquals, 2),
            '>' => (TokenKind::GreaterThan, 1),
            '(' => (TokenKind::LeftParen, 1),
            ')' => (TokenKind::RightParen, 1),
            '{' => (TokenKind::LeftCurly, 1),
            '}' => (TokenKind::RightCurly, 1),
            '[' => (TokenKind::LeftBracket, 1),
            ']' => (TokenKind::RightBracket, 1),
            ',' => (TokenKind::Comma, 1),
            ';' => (TokenKind::Semicolon, 1),
            '+' => (TokenKind::Plus, 1),
            '-' => (TokenKind::Minus, 1),
            '*' => (TokenKind::Star, 1),
            '/' => (TokenKind::Div, 1),
            _ => return None,
        };

        let content: String = self.line[self.col..self.col + len].iter().collect();
        for _ in 0..len {
            self.advance();
        }
        Some(Token::new(kind, content, position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::StringCodeProvider;

    fn lex_all(source: &str) -> (Vec<Token>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let provider = StringCodeProvider::from_source(source);
        let mut lexer = Lexer::new(Box::new(provider));
        let mut tokens = vec![];
        loop {
            let token = lexer.next(&mut diagnostics);
            let done = token.kind == TokenKind::EndOfFile;
            tokens.push(token);
            if done {
                break;
            }
        }
        (tokens, diagnostics)
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex_all(source).0.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_lex_identifier() {
        let (tokens, diagnostics) = lex_all("counter");
        assert!(diagnostics.is_empty());
        assert_eq!(
            tokens[0],
            Token::new(TokenKind::VariableName, "counter", (1, 1))
        );
    }

    #[test]
    fn test_keyword_wins_over_identifier() {
        assert_eq!(
            kinds("fun funny"),
            vec![
                TokenKind::Fun,
                TokenKind::VariableName,
                TokenKind::EndOfFile
            ]
        );
    }

    #[test]
    fn test_lex_numbers() {
        assert_eq!(
            kinds("42 1.5"),
            vec![TokenKind::Integer, TokenKind::Float, TokenKind::EndOfFile]
        );

        let (tokens, _) = lex_all("1.5");
        assert_eq!(tokens[0].content, "1.5");
    }

    #[test]
    fn test_dot_without_digits_is_not_a_float() {
        let (tokens, diagnostics) = lex_all("1.");
        assert_eq!(tokens[0].kind, TokenKind::Integer);
        // the stray dot is an unrecognised character
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_longest_match_punctuation() {
        assert_eq!(
            kinds("== = <= < >= > !="),
            vec![
                TokenKind::DoubleEquals,
                TokenKind::SingleEquals,
                TokenKind::LessEquals,
                TokenKind::LessThan,
                TokenKind::GreaterEquals,
                TokenKind::GreaterThan,
                TokenKind::NotEquals,
                TokenKind::EndOfFile
            ]
        );
    }

    #[test]
    fn test_lex_variable_definition() {
        let (tokens, diagnostics) = lex_all("int a = 1;");
        assert!(diagnostics.is_empty());
        assert_eq!(
            tokens,
            vec![
                Token::new(TokenKind::DataType, "int", (1, 1)),
                Token::new(TokenKind::VariableName, "a", (1, 5)),
                Token::new(TokenKind::SingleEquals, "=", (1, 7)),
                Token::new(TokenKind::Integer, "1", (1, 9)),
                Token::new(TokenKind::Semicolon, ";", (1, 10)),
                Token::end_of_file((1, 11)),
            ]
        );
    }

    #[test]
    fn test_lex_string_literal() {
        let (tokens, _) = lex_all("import \"lib/math.ne\";");
        assert_eq!(tokens[1].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[1].content, "lib/math.ne");
    }

    #[test]
    fn test_unrecognised_character_is_skipped() {
        let (tokens, diagnostics) = lex_all("1 @ 2");
        assert_eq!(
            tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![TokenKind::Integer, TokenKind::Integer, TokenKind::EndOfFile]
        );
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut diagnostics = Diagnostics::new();
        let provider = StringCodeProvider::from_source("1 + 2");
        let mut lexer = Lexer::new(Box::new(provider));

        assert_eq!(lexer.peek(2, &mut diagnostics).kind, TokenKind::Integer);
        assert_eq!(lexer.peek(0, &mut diagnostics).kind, TokenKind::Integer);
        assert_eq!(lexer.next(&mut diagnostics).kind, TokenKind::Integer);
        assert_eq!(lexer.next(&mut diagnostics).kind, TokenKind::Plus);
    }

    #[test]
    fn test_end_of_input_repeats() {
        let mut diagnostics = Diagnostics::new();
        let provider = StringCodeProvider::from_source("");
        let mut lexer = Lexer::new(Box::new(provider));

        assert_eq!(lexer.next(&mut diagnostics).kind, TokenKind::EndOfFile);
        assert_eq!(lexer.next(&mut diagnostics).kind, TokenKind::EndOfFile);
    }
}
