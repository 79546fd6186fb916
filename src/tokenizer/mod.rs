//=====================================================
// File: tokenizer/mod.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: FSK lexical analysis
// Objective: Turn FSK source text into a positioned token stream, including
//            template literals with embedded `${ ... }` segments
//=====================================================

use std::collections::HashMap;
use std::fmt;

/// Represents the position of a token in the source code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Position {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// One segment of a template literal. Code segments are re-tokenized by the parser.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateChunk {
    Text(String),
    Code { source: String, position: Position },
}

/// All possible token types in FSK
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Number(f64),
    String(String),
    Template(Vec<TemplateChunk>),
    Identifier(String),

    // Keywords
    And,
    Or,
    Class,
    Else,
    True,
    False,
    Nil,
    For,
    While,
    Fn,
    If,
    Print,
    Return,
    Super,
    This,
    Let,
    Const,
    Async,
    Await,
    Import,
    Try,
    Catch,
    Throw,
    Match,
    New,
    Break,
    Continue,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    AmpAmp,
    PipePipe,
    QuestionQuestion,
    QuestionDot,
    PipeGreater,
    Arrow,
    FatArrow,
    Ellipsis,

    // Delimiters
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Comma,
    Dot,
    Semicolon,
    Colon,

    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Number(n) => write!(f, "{}", n),
            TokenKind::String(s) => write!(f, "\"{}\"", s),
            TokenKind::Template(_) => f.write_str("template literal"),
            TokenKind::Identifier(name) => f.write_str(name),
            TokenKind::And => f.write_str("and"),
            TokenKind::Or => f.write_str("or"),
            TokenKind::Class => f.write_str("class"),
            TokenKind::Else => f.write_str("else"),
            TokenKind::True => f.write_str("true"),
            TokenKind::False => f.write_str("false"),
            TokenKind::Nil => f.write_str("nil"),
            TokenKind::For => f.write_str("for"),
            TokenKind::While => f.write_str("while"),
            TokenKind::Fn => f.write_str("fn"),
            TokenKind::If => f.write_str("if"),
            TokenKind::Print => f.write_str("print"),
            TokenKind::Return => f.write_str("return"),
            TokenKind::Super => f.write_str("super"),
            TokenKind::This => f.write_str("this"),
            TokenKind::Let => f.write_str("let"),
            TokenKind::Const => f.write_str("const"),
            TokenKind::Async => f.write_str("async"),
            TokenKind::Await => f.write_str("await"),
            TokenKind::Import => f.write_str("import"),
            TokenKind::Try => f.write_str("try"),
            TokenKind::Catch => f.write_str("catch"),
            TokenKind::Throw => f.write_str("throw"),
            TokenKind::Match => f.write_str("match"),
            TokenKind::New => f.write_str("new"),
            TokenKind::Break => f.write_str("break"),
            TokenKind::Continue => f.write_str("continue"),
            TokenKind::Plus => f.write_str("+"),
            TokenKind::Minus => f.write_str("-"),
            TokenKind::Star => f.write_str("*"),
            TokenKind::Slash => f.write_str("/"),
            TokenKind::Percent => f.write_str("%"),
            TokenKind::Bang => f.write_str("!"),
            TokenKind::BangEqual => f.write_str("!="),
            TokenKind::Equal => f.write_str("="),
            TokenKind::EqualEqual => f.write_str("=="),
            TokenKind::Less => f.write_str("<"),
            TokenKind::LessEqual => f.write_str("<="),
            TokenKind::Greater => f.write_str(">"),
            TokenKind::GreaterEqual => f.write_str(">="),
            TokenKind::AmpAmp => f.write_str("&&"),
            TokenKind::PipePipe => f.write_str("||"),
            TokenKind::QuestionQuestion => f.write_str("??"),
            TokenKind::QuestionDot => f.write_str("?."),
            TokenKind::PipeGreater => f.write_str("|>"),
            TokenKind::Arrow => f.write_str("->"),
            TokenKind::FatArrow => f.write_str("=>"),
            TokenKind::Ellipsis => f.write_str("..."),
            TokenKind::LeftParen => f.write_str("("),
            TokenKind::RightParen => f.write_str(")"),
            TokenKind::LeftBrace => f.write_str("{"),
            TokenKind::RightBrace => f.write_str("}"),
            TokenKind::LeftBracket => f.write_str("["),
            TokenKind::RightBracket => f.write_str("]"),
            TokenKind::Comma => f.write_str(","),
            TokenKind::Dot => f.write_str("."),
            TokenKind::Semicolon => f.write_str(";"),
            TokenKind::Colon => f.write_str(":"),
            TokenKind::Eof => f.write_str("end of input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: Position,
}

impl Token {
    pub fn new(kind: TokenKind, position: Position) -> Self {
        Self { kind, position }
    }
}

/// Tokenizer for FSK
pub struct Tokenizer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    keywords: HashMap<&'static str, TokenKind>,
    tokens: Vec<Token>,
}

impl Tokenizer {
    pub fn new(input: &str) -> Self {
        Self::starting_at(input, Position::new(1, 1, 0))
    }

    /// Tokenize a fragment (template interpolation) while reporting positions
    /// relative to the enclosing file.
    pub fn starting_at(input: &str, origin: Position) -> Self {
        let keywords = HashMap::from([
            ("and", TokenKind::And),
            ("or", TokenKind::Or),
            ("class", TokenKind::Class),
            ("else", TokenKind::Else),
            ("true", TokenKind::True),
            ("false", TokenKind::False),
            ("nil", TokenKind::Nil),
            ("for", TokenKind::For),
            ("while", TokenKind::While),
            ("fn", TokenKind::Fn),
            ("if", TokenKind::If),
            ("print", TokenKind::Print),
            ("return", TokenKind::Return),
            ("super", TokenKind::Super),
            ("this", TokenKind::This),
            ("let", TokenKind::Let),
            ("const", TokenKind::Const),
            ("async", TokenKind::Async),
            ("await", TokenKind::Await),
            ("import", TokenKind::Import),
            ("try", TokenKind::Try),
            ("catch", TokenKind::Catch),
            ("throw", TokenKind::Throw),
            ("match", TokenKind::Match),
            ("new", TokenKind::New),
            ("break", TokenKind::Break),
            ("continue", TokenKind::Continue),
        ]);

        Self {
            input: input.chars().collect(),
            position: 0,
            line: origin.line,
            column: origin.column,
            keywords,
            tokens: Vec::new(),
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>, String> {
        loop {
            self.skip_whitespace_and_comments()?;
            if self.is_at_end() {
                break;
            }

            let start = self.current_position();
            let ch = self.current_char();

            if ch == '"' || ch == '\'' {
                self.handle_string(ch, start)?;
            } else if ch == '`' {
                self.handle_template_string(start)?;
            } else if ch.is_ascii_digit() {
                self.handle_number(start)?;
            } else if ch.is_alphabetic() || ch == '_' {
                self.handle_identifier(start);
            } else {
                self.handle_operator_or_delimiter(start)?;
            }
        }

        let end = self.current_position();
        self.tokens.push(Token::new(TokenKind::Eof, end));
        Ok(std::mem::take(&mut self.tokens))
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn current_char(&self) -> char {
        self.input.get(self.position).copied().unwrap_or('\0')
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn advance(&mut self) -> char {
        let ch = self.current_char();
        self.position += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        ch
    }

    fn matches(&mut self, expected: char) -> bool {
        if self.current_char() == expected && !self.is_at_end() {
            self.advance();
            true
        } else {
            false
        }
    }

    fn current_position(&self) -> Position {
        Position::new(self.line, self.column, self.position)
    }

    fn emit_token(&mut self, kind: TokenKind, position: Position) {
        self.tokens.push(Token::new(kind, position));
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), String> {
        while !self.is_at_end() {
            match self.current_char() {
                ' ' | '\t' | '\r' | '\n' => {
                    self.advance();
                }
                '/' if self.peek_char() == Some('/') => {
                    while !self.is_at_end() && self.current_char() != '\n' {
                        self.advance();
                    }
                }
                '/' if self.peek_char() == Some('*') => {
                    let start = self.current_position();
                    self.advance();
                    self.advance();
                    loop {
                        if self.is_at_end() {
                            return Err(format!("Unterminated block comment at {}", start));
                        }
                        if self.current_char() == '*' && self.peek_char() == Some('/') {
                            self.advance();
                            self.advance();
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    // Unknown escapes keep the escaped character, so `\'`, `\"` and `` \` `` need no arms.
    fn read_escape(&mut self) -> Result<char, String> {
        if self.is_at_end() {
            return Err("Unterminated escape sequence".to_string());
        }
        Ok(match self.advance() {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            other => other,
        })
    }

    fn handle_string(&mut self, quote: char, start: Position) -> Result<(), String> {
        self.advance(); // consume opening quote
        let mut value = String::new();

        while !self.is_at_end() && self.current_char() != quote {
            if self.current_char() == '\\' {
                self.advance();
                value.push(self.read_escape()?);
            } else {
                value.push(self.advance());
            }
        }

        if self.is_at_end() {
            return Err(format!("Unterminated string starting at {}", start));
        }

        self.advance(); // consume closing quote
        self.emit_token(TokenKind::String(value), start);
        Ok(())
    }

    fn handle_template_string(&mut self, start: Position) -> Result<(), String> {
        self.advance(); // consume opening backtick

        let mut chunks = Vec::new();
        let mut text = String::new();

        loop {
            if self.is_at_end() {
                return Err(format!("Unterminated template string starting at {}", start));
            }
            match self.current_char() {
                '`' => {
                    self.advance();
                    break;
                }
                '\\' => {
                    self.advance();
                    text.push(self.read_escape()?);
                }
                '$' if self.peek_char() == Some('{') => {
                    self.advance();
                    self.advance();
                    if !text.is_empty() {
                        chunks.push(TemplateChunk::Text(std::mem::take(&mut text)));
                    }
                    let position = self.current_position();
                    let source = self.read_interpolation(start)?;
                    chunks.push(TemplateChunk::Code { source, position });
                }
                _ => text.push(self.advance()),
            }
        }

        if !text.is_empty() || chunks.is_empty() {
            chunks.push(TemplateChunk::Text(text));
        }
        self.emit_token(TokenKind::Template(chunks), start);
        Ok(())
    }

    // Reads up to the matching `}`; nested braces and quoted text are kept intact.
    fn read_interpolation(&mut self, start: Position) -> Result<String, String> {
        let mut depth = 1usize;
        let mut source = String::new();
        let mut quote: Option<char> = None;

        while !self.is_at_end() {
            let ch = self.advance();
            if let Some(q) = quote {
                source.push(ch);
                if ch == '\\' && !self.is_at_end() {
                    source.push(self.advance());
                } else if ch == q {
                    quote = None;
                }
                continue;
            }
            match ch {
                '"' | '\'' => {
                    quote = Some(ch);
                    source.push(ch);
                }
                '{' => {
                    depth += 1;
                    source.push(ch);
                }
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(source);
                    }
                    source.push(ch);
                }
                _ => source.push(ch),
            }
        }
        Err(format!("Unterminated template interpolation starting at {}", start))
    }

    fn handle_number(&mut self, start: Position) -> Result<(), String> {
        let mut number = String::new();

        while self.current_char().is_ascii_digit() {
            number.push(self.advance());
        }
        if self.current_char() == '.' && self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            number.push(self.advance());
            while self.current_char().is_ascii_digit() {
                number.push(self.advance());
            }
        }

        let value = number
            .parse::<f64>()
            .map_err(|_| format!("Invalid number literal '{}' at {}", number, start))?;
        self.emit_token(TokenKind::Number(value), start);
        Ok(())
    }

    fn handle_identifier(&mut self, start: Position) {
        let mut identifier = String::new();
        while !self.is_at_end()
            && (self.current_char().is_alphanumeric() || self.current_char() == '_')
        {
            identifier.push(self.advance());
        }
        let kind = self
            .keywords
            .get(identifier.as_str())
            .cloned()
            .unwrap_or(TokenKind::Identifier(identifier));
        self.emit_token(kind, start);
    }

    fn handle_operator_or_delimiter(&mut self, start: Position) -> Result<(), String> {
        let ch = self.advance();

        let kind = match ch {
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            ':' => TokenKind::Colon,
            '+' => TokenKind::Plus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '.' => {
                if self.current_char() == '.' && self.peek_char() == Some('.') {
                    self.advance();
                    self.advance();
                    TokenKind::Ellipsis
                } else {
                    TokenKind::Dot
                }
            }
            '-' => {
                if self.matches('>') {
                    TokenKind::Arrow
                } else {
                    TokenKind::Minus
                }
            }
            '!' => {
                if self.matches('=') {
                    TokenKind::BangEqual
                } else {
                    TokenKind::Bang
                }
            }
            '=' => {
                if self.matches('=') {
                    TokenKind::EqualEqual
                } else if self.matches('>') {
                    TokenKind::FatArrow
                } else {
                    TokenKind::Equal
                }
            }
            '<' => {
                if self.matches('=') {
                    TokenKind::LessEqual
                } else {
                    TokenKind::Less
                }
            }
            '>' => {
                if self.matches('=') {
                    TokenKind::GreaterEqual
                } else {
                    TokenKind::Greater
                }
            }
            '&' => {
                if self.matches('&') {
                    TokenKind::AmpAmp
                } else {
                    return Err(format!("Unexpected character '&' at {}", start));
                }
            }
            '|' => {
                if self.matches('|') {
                    TokenKind::PipePipe
                } else if self.matches('>') {
                    TokenKind::PipeGreater
                } else {
                    return Err(format!("Unexpected character '|' at {}", start));
                }
            }
            '?' => {
                if self.matches('?') {
                    TokenKind::QuestionQuestion
                } else if self.matches('.') {
                    TokenKind::QuestionDot
                } else {
                    return Err(format!("Unexpected character '?' at {}", start));
                }
            }
            other => return Err(format!("Unexpected character '{}' at {}", other, start)),
        };

        self.emit_token(kind, start);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Tokenizer::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn test_basic_tokenization() {
        let tokens = kinds("let x = 5 + 3 * (2 - 1);");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Let,
                TokenKind::Identifier("x".into()),
                TokenKind::Equal,
                TokenKind::Number(5.0),
                TokenKind::Plus,
                TokenKind::Number(3.0),
                TokenKind::Star,
                TokenKind::LeftParen,
                TokenKind::Number(2.0),
                TokenKind::Minus,
                TokenKind::Number(1.0),
                TokenKind::RightParen,
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_compound_operators() {
        let tokens = kinds("a ?? b |> f ?. c ... => -> != == <= >= && ||");
        assert!(tokens.contains(&TokenKind::QuestionQuestion));
        assert!(tokens.contains(&TokenKind::PipeGreater));
        assert!(tokens.contains(&TokenKind::QuestionDot));
        assert!(tokens.contains(&TokenKind::Ellipsis));
        assert!(tokens.contains(&TokenKind::FatArrow));
        assert!(tokens.contains(&TokenKind::Arrow));
        assert!(tokens.contains(&TokenKind::AmpAmp));
        assert!(tokens.contains(&TokenKind::PipePipe));
    }

    #[test]
    fn test_string_literals_and_escapes() {
        let tokens = kinds(r#""a\nb" 'it\'s'"#);
        assert_eq!(tokens[0], TokenKind::String("a\nb".into()));
        assert_eq!(tokens[1], TokenKind::String("it's".into()));
    }

    #[test]
    fn test_template_chunks() {
        let tokens = kinds("`sum: ${a + {b: 1}.b} done`");
        match &tokens[0] {
            TokenKind::Template(chunks) => {
                assert_eq!(chunks.len(), 3);
                assert_eq!(chunks[0], TemplateChunk::Text("sum: ".into()));
                assert!(matches!(&chunks[1], TemplateChunk::Code { source, .. } if source == "a + {b: 1}.b"));
                assert_eq!(chunks[2], TemplateChunk::Text(" done".into()));
            }
            other => panic!("expected template, found {other:?}"),
        }
    }

    #[test]
    fn test_comments_are_skipped() {
        let tokens = kinds("1 // line\n/* block\n comment */ 2");
        assert_eq!(
            tokens,
            vec![TokenKind::Number(1.0), TokenKind::Number(2.0), TokenKind::Eof]
        );
    }

    #[test]
    fn test_number_followed_by_method_call() {
        let tokens = kinds("3.5 4.length");
        assert_eq!(tokens[0], TokenKind::Number(3.5));
        assert_eq!(tokens[1], TokenKind::Number(4.0));
        assert_eq!(tokens[2], TokenKind::Dot);
    }

    #[test]
    fn test_position_tracking() {
        let tokens = Tokenizer::new("let\n  x").tokenize().unwrap();
        assert_eq!(tokens[0].position, Position::new(1, 1, 0));
        assert_eq!(tokens[1].position.line, 2);
        assert_eq!(tokens[1].position.column, 3);
    }

    #[test]
    fn test_unterminated_string_is_error() {
        let err = Tokenizer::new("\"open").tokenize().unwrap_err();
        assert!(err.contains("Unterminated string"));
    }
}

//=====================================================
// End of file
//=====================================================
