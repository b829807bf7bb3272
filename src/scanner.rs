use std::fmt::{self, Display, Formatter};
use std::iter::Peekable;
use std::str::CharIndices;
use thiserror::Error;

#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub struct Pos {
    pub line: usize,
    pub offset_in_line: usize,
}

impl Display for Pos {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.offset_in_line)
    }
}

#[derive(Clone, Error, Debug, PartialEq, Eq)]
#[error("{} at {pos}", error.message())]
pub struct ScanError {
    pub error: ScanErrorType,
    pub pos: Pos,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanErrorType {
    UnterminatedString,
    UnrecognizedToken,
}

impl ScanErrorType {
    pub fn message(&self) -> &'static str {
        match self {
            ScanErrorType::UnterminatedString => "Unterminated string.",
            ScanErrorType::UnrecognizedToken => "Unexpected character.",
        }
    }
}

/// A token in the input stream
/// Contains a data which is the symbol variant and a position
/// Note that pos is always defined, but in the case of EOF will describe a location
/// Potentially off the end of the input stream
#[derive(Debug, PartialEq, Clone)]
pub struct Token<'code> {
    pub data: TokenType<'code>,
    pub pos: Pos,
}

#[derive(Debug, PartialEq, Clone)]
pub enum TokenType<'code> {
    Symbol(Symbol),
    Keyword(Keyword),
    Identifier(&'code str),
    String(&'code str),
    Number(f64),
    Eof,
}

impl<'code> PartialEq<Symbol> for TokenType<'code> {
    fn eq(&self, other: &Symbol) -> bool {
        matches!(self, TokenType::Symbol(symbol) if symbol == other)
    }
}

impl<'code> PartialEq<Keyword> for TokenType<'code> {
    fn eq(&self, other: &Keyword) -> bool {
        matches!(self, TokenType::Keyword(keyword) if keyword == other)
    }
}

impl<'code> Display for TokenType<'code> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TokenType::Symbol(symbol) => symbol.fmt(f),
            TokenType::Keyword(keyword) => keyword.fmt(f),
            TokenType::Identifier(identifier) => f.write_str(identifier),
            TokenType::String(string) => write!(f, "\"{}\"", string),
            TokenType::Number(number) => write!(f, "{}", number),
            TokenType::Eof => f.write_str("end of input"),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Symbol {
    // Single-character tokens.
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Comma,
    Dot,
    Minus,
    Plus,
    Semicolon,
    Slash,
    Star,
    Question,
    Colon,

    // One or two character tokens.
    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Keyword {
    And,
    Class,
    Else,
    False,
    Fun,
    For,
    If,
    Nil,
    Or,
    Print,
    Return,
    Super,
    This,
    True,
    Var,
    While,
}

const KEYWORD_LITERAL_TO_SYMBOL: [(&str, Keyword); 16] = [
    ("and", Keyword::And),
    ("class", Keyword::Class),
    ("else", Keyword::Else),
    ("false", Keyword::False),
    ("fun", Keyword::Fun),
    ("for", Keyword::For),
    ("if", Keyword::If),
    ("nil", Keyword::Nil),
    ("or", Keyword::Or),
    ("print", Keyword::Print),
    ("return", Keyword::Return),
    ("super", Keyword::Super),
    ("this", Keyword::This),
    ("true", Keyword::True),
    ("var", Keyword::Var),
    ("while", Keyword::While),
];

impl Display for Keyword {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Turns source text into tokens on demand, with a single token of lookahead for the parser.
///
/// Scan errors are produced in place of a token and scanning resumes after the offending input,
/// so a caller can always make progress towards `Eof`. Once the input is exhausted every further
/// request yields `Eof`.
pub struct Scanner<'lex> {
    code: &'lex str,
    code_iter: Peekable<CharIndices<'lex>>,
    peeked: Option<Result<Token<'lex>, ScanError>>,

    line: usize,
    offset_in_line: usize,
}

impl<'lex> Scanner<'lex> {
    pub fn new(code: &'lex str) -> Scanner<'lex> {
        Scanner {
            code,
            code_iter: code.char_indices().peekable(),
            peeked: None,
            line: 1,
            offset_in_line: 0,
        }
    }

    pub fn next(&mut self) -> Result<Token<'lex>, ScanError> {
        match self.peeked.take() {
            Some(token) => token,
            None => self.scan_token(),
        }
    }

    pub fn peek(&mut self) -> &Result<Token<'lex>, ScanError> {
        let token = match self.peeked.take() {
            Some(token) => token,
            None => self.scan_token(),
        };
        self.peeked.insert(token)
    }

    pub fn peek_pos(&mut self) -> Pos {
        match self.peek() {
            Ok(token) => token.pos,
            Err(err) => err.pos,
        }
    }

    pub fn is_at_eof(&mut self) -> bool {
        matches!(
            self.peek(),
            Ok(Token {
                data: TokenType::Eof,
                ..
            })
        )
    }

    /// Consume the next token only if it is well formed and satisfies the predicate
    pub fn next_if<F>(&mut self, predicate: F) -> Option<Token<'lex>>
    where
        F: FnOnce(&TokenType<'lex>) -> bool,
    {
        let matched = match self.peek() {
            Ok(token) => predicate(&token.data),
            Err(_) => false,
        };
        if matched {
            self.next().ok()
        } else {
            None
        }
    }

    /// Like next_if, but the predicate also extracts a value from the token
    pub fn next_if_some<T, F>(&mut self, extract: F) -> Option<T>
    where
        F: FnOnce(&TokenType<'lex>) -> Option<T>,
    {
        let extracted = match self.peek() {
            Ok(token) => extract(&token.data),
            Err(_) => None,
        };
        if extracted.is_some() {
            _ = self.next();
        }
        extracted
    }

    fn current_pos(&self) -> Pos {
        Pos {
            line: self.line,
            offset_in_line: self.offset_in_line,
        }
    }

    // Byte offset of the next unconsumed character
    fn current_offset(&mut self) -> usize {
        self.code_iter
            .peek()
            .map_or(self.code.len(), |(offset, _)| *offset)
    }

    fn consume_next_char_if_eq(&mut self, next_ch: char) -> bool {
        self.consume_next_char_if_match(|ch| ch == next_ch)
    }

    fn consume_next_char_if_neq(&mut self, not_next_ch: char) -> bool {
        self.consume_next_char_if_match(|ch| ch != not_next_ch)
    }

    fn consume_next_char_if_match<F>(&mut self, predicate: F) -> bool
    where
        F: FnOnce(char) -> bool,
    {
        let consumed = self.code_iter.next_if(|(_, ch)| predicate(*ch)).is_some();
        if consumed {
            self.offset_in_line += 1;
        }
        consumed
    }

    fn one_or_two(&mut self, second: char, double: Symbol, single: Symbol) -> Symbol {
        if self.consume_next_char_if_eq(second) {
            double
        } else {
            single
        }
    }

    fn scan_token(&mut self) -> Result<Token<'lex>, ScanError> {
        loop {
            let pos = self.current_pos();
            let Some((offset, ch)) = self.code_iter.next() else {
                return Ok(Token {
                    data: TokenType::Eof,
                    pos,
                });
            };
            self.offset_in_line += 1;
            let symbol = match ch {
                '(' => Symbol::LeftParen,
                ')' => Symbol::RightParen,
                '{' => Symbol::LeftBrace,
                '}' => Symbol::RightBrace,
                ',' => Symbol::Comma,
                '.' => Symbol::Dot,
                '-' => Symbol::Minus,
                '+' => Symbol::Plus,
                ';' => Symbol::Semicolon,
                '*' => Symbol::Star,
                '?' => Symbol::Question,
                ':' => Symbol::Colon,
                '!' => self.one_or_two('=', Symbol::BangEqual, Symbol::Bang),
                '=' => self.one_or_two('=', Symbol::EqualEqual, Symbol::Equal),
                '<' => self.one_or_two('=', Symbol::LessEqual, Symbol::Less),
                '>' => self.one_or_two('=', Symbol::GreaterEqual, Symbol::Greater),
                '/' => {
                    if self.consume_next_char_if_eq('/') {
                        // The newline is left for the next iteration to count
                        while self.consume_next_char_if_neq('\n') {}
                        continue;
                    }
                    Symbol::Slash
                }
                ' ' | '\r' | '\t' => continue,
                '\n' => {
                    self.line += 1;
                    self.offset_in_line = 0;
                    continue;
                }
                '0'..='9' => return self.number(offset, pos),
                '"' => return self.string(offset, pos),
                c if c.is_alphabetic() || c == '_' => return Ok(self.identifier(offset, pos)),
                _ => {
                    return Err(ScanError {
                        error: ScanErrorType::UnrecognizedToken,
                        pos,
                    })
                }
            };
            return Ok(Token {
                data: TokenType::Symbol(symbol),
                pos,
            });
        }
    }

    fn number(&mut self, offset: usize, pos: Pos) -> Result<Token<'lex>, ScanError> {
        while self.consume_next_char_if_match(|ch| ch.is_ascii_digit()) {}
        // A '.' only belongs to the number if a digit follows it
        let mut lookahead = self.code_iter.clone();
        if matches!(lookahead.next(), Some((_, '.')))
            && matches!(lookahead.peek(), Some((_, ch)) if ch.is_ascii_digit())
        {
            self.consume_next_char_if_eq('.');
            while self.consume_next_char_if_match(|ch| ch.is_ascii_digit()) {}
        }
        let end = self.current_offset();
        let number = self.code[offset..end]
            .parse::<f64>()
            .map_err(|_| ScanError {
                error: ScanErrorType::UnrecognizedToken,
                pos,
            })?;
        Ok(Token {
            data: TokenType::Number(number),
            pos,
        })
    }

    fn string(&mut self, offset: usize, pos: Pos) -> Result<Token<'lex>, ScanError> {
        // Strings are multiline, so the line bookkeeping continues inside the literal
        for (end, ch) in self.code_iter.by_ref() {
            match ch {
                '"' => {
                    self.offset_in_line += 1;
                    // The opening quote is a single byte
                    return Ok(Token {
                        data: TokenType::String(&self.code[offset + 1..end]),
                        pos,
                    });
                }
                '\n' => {
                    self.line += 1;
                    self.offset_in_line = 0;
                }
                _ => self.offset_in_line += 1,
            }
        }
        Err(ScanError {
            error: ScanErrorType::UnterminatedString,
            pos,
        })
    }

    fn identifier(&mut self, offset: usize, pos: Pos) -> Token<'lex> {
        while self.consume_next_char_if_match(|ch| ch.is_alphanumeric() || ch == '_') {}
        let end = self.current_offset();
        let identifier = &self.code[offset..end];
        let data = match KEYWORD_LITERAL_TO_SYMBOL
            .iter()
            .find(|(lit, _)| *lit == identifier)
        {
            Some((_, keyword)) => TokenType::Keyword(*keyword),
            None => TokenType::Identifier(identifier),
        };
        Token { data, pos }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn scan_anything() {
        let mut scanner = Scanner::new("var");
        let first_token = scanner.next().unwrap();
        assert_eq!(TokenType::Keyword(Keyword::Var), first_token.data);
        assert_eq!(
            Pos {
                offset_in_line: 0,
                line: 1
            },
            first_token.pos
        );
    }

    #[test]
    fn scan_basic_sequence() {
        let mut scanner = Scanner::new("var marco = \"9001\"");

        let token = scanner.next().unwrap();
        assert_eq!(TokenType::Keyword(Keyword::Var), token.data);

        let token = scanner.next().unwrap();
        assert_eq!(TokenType::Identifier("marco"), token.data);
        assert_eq!(
            Pos {
                offset_in_line: 4,
                line: 1
            },
            token.pos
        );

        let token = scanner.next().unwrap();
        assert_eq!(TokenType::Symbol(Symbol::Equal), token.data);
        assert_eq!(10, token.pos.offset_in_line);

        let token = scanner.next().unwrap();
        assert_eq!(TokenType::String("9001"), token.data);
        assert_eq!(12, token.pos.offset_in_line);

        assert_eq!(TokenType::Eof, scanner.next().unwrap().data);
        // Asking again past the end keeps producing Eof
        assert_eq!(TokenType::Eof, scanner.next().unwrap().data);
    }

    #[test]
    fn test_multi_line_string_pos() {
        let code = r#"
"marco
bomp";
"#;
        let mut scanner = Scanner::new(code);
        let token = scanner.next().unwrap();
        assert_eq!(TokenType::String("marco\nbomp"), token.data);
        assert_eq!(2, token.pos.line);

        let token = scanner.next().unwrap();
        assert_eq!(TokenType::Symbol(Symbol::Semicolon), token.data);
        assert_eq!(
            Pos {
                line: 3,
                offset_in_line: 5
            },
            token.pos
        );
    }

    #[test]
    fn two_character_symbols() {
        let mut scanner = Scanner::new("!= == <= >= ! = < >");
        let expected = [
            Symbol::BangEqual,
            Symbol::EqualEqual,
            Symbol::LessEqual,
            Symbol::GreaterEqual,
            Symbol::Bang,
            Symbol::Equal,
            Symbol::Less,
            Symbol::Greater,
        ];
        for symbol in expected {
            assert_eq!(TokenType::Symbol(symbol), scanner.next().unwrap().data);
        }
        assert!(scanner.is_at_eof());
    }

    #[test]
    fn numbers_do_not_swallow_trailing_dot() {
        let mut scanner = Scanner::new("12.5 7.foo");
        assert_eq!(TokenType::Number(12.5), scanner.next().unwrap().data);
        assert_eq!(TokenType::Number(7.0), scanner.next().unwrap().data);
        assert_eq!(TokenType::Symbol(Symbol::Dot), scanner.next().unwrap().data);
        assert_eq!(TokenType::Identifier("foo"), scanner.next().unwrap().data);
    }

    #[test]
    fn comments_are_skipped() {
        let mut scanner = Scanner::new("// nothing to see\nprint_it // trailing");
        let token = scanner.next().unwrap();
        assert_eq!(TokenType::Identifier("print_it"), token.data);
        assert_eq!(2, token.pos.line);
        assert!(scanner.is_at_eof());
    }

    #[test]
    fn peek_does_not_consume() {
        let mut scanner = Scanner::new("a;");
        assert_eq!(
            TokenType::Identifier("a"),
            scanner.peek().as_ref().unwrap().data
        );
        assert!(scanner.next_if(|data| *data == Symbol::Semicolon).is_none());
        assert_eq!(TokenType::Identifier("a"), scanner.next().unwrap().data);
        assert!(scanner.next_if(|data| *data == Symbol::Semicolon).is_some());
        assert!(scanner.is_at_eof());
    }

    // Verify we don't get into an infinite loop by error conditions
    #[test]
    fn no_infinite_seq_on_unterminate_string() {
        let mut scanner = Scanner::new("\"a string that isn't terminated");
        let token = scanner.next();
        assert_eq!(ScanErrorType::UnterminatedString, token.unwrap_err().error);
        assert_eq!(TokenType::Eof, scanner.next().unwrap().data);
    }

    #[test]
    fn no_infinite_seq_on_bad_token() {
        let mut scanner = Scanner::new("$var");
        let token = scanner.next();
        assert_eq!(ScanErrorType::UnrecognizedToken, token.unwrap_err().error);
        assert_eq!(TokenType::Keyword(Keyword::Var), scanner.next().unwrap().data);
    }
}
