//! Query lexer (tokenizer).
//!
//! Converts a query string into a stream of tokens for the parser. Lexing is total:
//! every input produces a token stream, and symbols with no special meaning end up
//! as term text.
//!
//! Lexing happens in two phases. A pre-scan counts `"` characters over the whole
//! input; if the count is odd, quotes are ordinary characters everywhere. Only then
//! is the input tokenized, in the mode the pre-scan chose.

use std::{iter::Peekable, str::Chars};

use serde::Serialize;
use tracing::{debug, trace};

/// The kind of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TokenKind {
    /// A bare word, or one word inside a quoted phrase.
    Term,
    /// Opening `"` of a phrase.
    PhraseStart,
    /// Closing `"` of a phrase.
    PhraseEnd,
    /// `AND` or `&`.
    And,
    /// `OR`.
    Or,
    /// `NOT`.
    Not,
    /// `-` at the start of a word.
    Minus,
    /// `%` at the start of a word.
    Percent,
    /// `(`.
    LParen,
    /// `)`.
    RParen,
    /// `[`.
    LBracket,
    /// `]`.
    RBracket,
    /// `~`.
    Tilde,
    /// `:`.
    Colon,
    /// `*`.
    Star,
    /// `!` at the start of a word.
    Bang,
    /// `?`.
    QMark,
    /// Uppercase `TO`.
    To,
    /// The `related` keyword, when directly followed by `:`.
    Related,
}

/// A token with its literal text and position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    /// What kind of token this is.
    pub kind: TokenKind,
    /// The literal text the token was read from.
    pub text: String,
    /// Byte offset of the token in the input.
    pub offset: usize,
}

impl Token {
    /// Creates a token.
    pub fn new(kind: TokenKind, text: impl Into<String>, offset: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            offset,
        }
    }

    /// Byte offset just past the end of the token.
    pub fn end(&self) -> usize {
        self.offset + self.text.len()
    }

    /// Returns true if `next` starts exactly where this token ends.
    pub fn touches(&self, next: &Self) -> bool {
        self.end() == next.offset
    }
}

/// How `"` characters are treated for a whole input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuoteMode {
    /// Quotes delimit phrases.
    Delimit,
    /// Quotes are ordinary word characters.
    Literal,
}

/// Returns true if the input contains an even number of `"` characters.
///
/// When this is false, no phrase is recognized anywhere in the input.
pub fn quotes_balanced(input: &str) -> bool {
    input.matches('"').count() % 2 == 0
}

/// Tokenizes a query string.
struct Lexer<'a> {
    /// Character iterator with one-character lookahead.
    chars: Peekable<Chars<'a>>,
    /// Current byte position in input.
    position: usize,
    /// Quote handling chosen by the pre-scan.
    mode: QuoteMode,
    /// Whether we are between the quotes of a phrase.
    in_phrase: bool,
    /// Whether the next character begins a word (prefix operators only apply there).
    word_start: bool,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input.
    fn new(input: &'a str, mode: QuoteMode) -> Self {
        Self {
            chars: input.chars().peekable(),
            position: 0,
            mode,
            in_phrase: false,
            word_start: true,
        }
    }

    /// Tokenizes the entire input.
    fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        while let Some(token) = self.next_token() {
            tokens.push(token);
        }

        tokens
    }

    /// Returns the next token, or None if at end of input.
    fn next_token(&mut self) -> Option<Token> {
        if self.in_phrase {
            return self.next_phrase_token();
        }

        if self.skip_whitespace() {
            self.word_start = true;
        }

        let &ch = self.chars.peek()?;
        let start = self.position;

        let kind = match ch {
            '"' if self.mode == QuoteMode::Delimit => {
                self.in_phrase = true;
                TokenKind::PhraseStart
            }
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '~' => TokenKind::Tilde,
            ':' => TokenKind::Colon,
            '*' => TokenKind::Star,
            '?' => TokenKind::QMark,
            '-' if self.word_start => TokenKind::Minus,
            '!' if self.word_start => TokenKind::Bang,
            '%' if self.word_start => TokenKind::Percent,
            _ => return Some(self.read_word()),
        };

        self.advance();
        self.word_start = matches!(
            kind,
            TokenKind::LParen
                | TokenKind::RParen
                | TokenKind::LBracket
                | TokenKind::RBracket
                | TokenKind::Minus
                | TokenKind::Bang
                | TokenKind::Percent
        );

        Some(Token::new(kind, ch, start))
    }

    /// Reads the next word or closing quote inside a phrase.
    fn next_phrase_token(&mut self) -> Option<Token> {
        self.skip_whitespace();

        let &ch = self.chars.peek()?;
        let start = self.position;

        if ch == '"' {
            self.advance();
            self.in_phrase = false;
            self.word_start = false;
            return Some(Token::new(TokenKind::PhraseEnd, "\"", start));
        }

        let mut word = String::new();
        while let Some(&ch) = self.chars.peek() {
            if ch.is_whitespace() || ch == '"' {
                break;
            }
            word.push(ch);
            self.advance();
        }

        Some(Token::new(TokenKind::Term, word, start))
    }

    /// Reads a bare word and classifies keywords.
    fn read_word(&mut self) -> Token {
        let start = self.position;
        let mut word = String::new();

        while let Some(&ch) = self.chars.peek() {
            if self.ends_word(ch) {
                break;
            }
            word.push(ch);
            self.advance();
        }

        self.word_start = false;

        let next = self.chars.peek().copied();
        let standalone = next.is_none_or(|c| {
            c.is_whitespace() || matches!(c, '(' | ')' | '[' | ']') || self.is_quote(c)
        });

        let kind = match word.as_str() {
            "related" if next == Some(':') => TokenKind::Related,
            "AND" | "&" if standalone => TokenKind::And,
            "OR" if standalone => TokenKind::Or,
            "NOT" if standalone => TokenKind::Not,
            "TO" if standalone => TokenKind::To,
            _ => TokenKind::Term,
        };

        Token::new(kind, word, start)
    }

    /// Returns true if `ch` terminates a bare word.
    fn ends_word(&self, ch: char) -> bool {
        ch.is_whitespace()
            || matches!(ch, '(' | ')' | '[' | ']' | '~' | ':' | '*' | '?')
            || self.is_quote(ch)
    }

    /// Returns true if `ch` is a phrase delimiter in the current mode.
    fn is_quote(&self, ch: char) -> bool {
        ch == '"' && self.mode == QuoteMode::Delimit
    }

    /// Skips whitespace characters, returning true if any were skipped.
    fn skip_whitespace(&mut self) -> bool {
        let mut skipped = false;
        while let Some(&ch) = self.chars.peek() {
            if ch.is_whitespace() {
                self.advance();
                skipped = true;
            } else {
                break;
            }
        }
        skipped
    }

    /// Advances to the next character.
    fn advance(&mut self) {
        if let Some(ch) = self.chars.next() {
            self.position += ch.len_utf8();
        }
    }
}

/// Tokenizes a query string.
///
/// Never fails. If the input has an odd number of `"` characters, quotes are
/// lexed as ordinary characters throughout.
pub fn tokenize(input: &str) -> Vec<Token> {
    let mode = if quotes_balanced(input) {
        QuoteMode::Delimit
    } else {
        QuoteMode::Literal
    };
    debug!(?mode, "tokenizing query");

    let tokens = Lexer::new(input, mode).tokenize();
    trace!(count = tokens.len(), "tokenized query");
    tokens
}
