//! Query parser.
//!
//! Parses a token stream into a query AST using recursive descent.
//!
//! # Grammar
//!
//! ```text
//! sequence   → (connector? unary)*
//! connector  → "AND" | "&" | "OR"
//! unary      → ("-" | "NOT" | "%") unary | primary
//! primary    → "(" sequence ")" | range | phrase modifier? | related
//!            | field_expr | word modifier?
//! field_expr → NAME ":" ("(" sequence ")" | primary)
//! range      → "[" WORD "TO" WORD "]"
//! phrase     → '"' WORD* '"'
//! related    → "related:" DIGITS
//! word       → "!"? (TERM | "*" | "?")+
//! modifier   → "~" NUMBER?
//! ```
//!
//! # Precedence (highest to lowest)
//!
//! 1. Grouping: `(...)`, `[...]`, quoted phrases
//! 2. Prefix operators: `-`, `!`, `NOT`, `%`
//! 3. Postfix modifiers: `~`, wildcards
//! 4. Field prefix: `field:` (binds tighter than any connector)
//! 5. `AND` / `OR`, left-associative with equal precedence
//!
//! Adjacent clauses without a connector are joined with AND, unless a negated
//! clause appears at the same grouping level, in which case they are joined with OR.
//!
//! The parser never fails. Malformed input is recovered locally and reported
//! through the diagnostics collector.

use tracing::debug;

use crate::{
    ast::{Pos, QueryExpr},
    diagnostics::{DiagnosticKind, Diagnostics},
    lexer::{Token, TokenKind, quotes_balanced, tokenize},
    pipeline::{ParsedQuery, QueryOptions},
};

/// Default fuzzy edit distance when `~` has no number.
pub const DEFAULT_FUZZY_EDITS: u32 = 2;

/// How two clauses are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Connector {
    /// Both must match.
    And,
    /// Either may match.
    Or,
}

impl Connector {
    /// Joins two expressions with this connector.
    fn join(self, left: QueryExpr, right: QueryExpr) -> QueryExpr {
        match self {
            Self::And => QueryExpr::and(left, right),
            Self::Or => QueryExpr::or(left, right),
        }
    }
}

/// A connector token waiting for its right-hand clause.
#[derive(Debug, Clone)]
struct Pending {
    /// The connector.
    connector: Connector,
    /// The token it was read from.
    token: Token,
}

/// Nesting spent so far on the path to the current clause.
///
/// Groups are limited by `max_depth`. Negations and field qualifiers draw on their
/// own budget of twice that, so they never eat into the groups a query may nest.
#[derive(Debug, Clone, Copy, Default)]
struct Depth {
    /// Enclosing parenthesized groups.
    groups: usize,
    /// Enclosing negations and field qualifiers.
    prefixes: usize,
}

/// Token kinds that make up a bare word.
fn is_word_piece(kind: TokenKind) -> bool {
    matches!(kind, TokenKind::Term | TokenKind::Star | TokenKind::QMark)
}

/// Token kinds that can begin a clause.
fn starts_clause(kind: TokenKind) -> bool {
    !matches!(kind, TokenKind::RParen | TokenKind::And | TokenKind::Or)
}

/// Token kinds that can follow `field:` as its value.
fn starts_field_value(kind: TokenKind) -> bool {
    is_word_piece(kind)
        || matches!(
            kind,
            TokenKind::Bang
                | TokenKind::LParen
                | TokenKind::LBracket
                | TokenKind::PhraseStart
                | TokenKind::Related
        )
}

/// Builds a term or wildcard node from word text.
fn word_node(text: String, offset: usize) -> QueryExpr {
    if text.contains(['*', '?']) || text.starts_with('!') {
        QueryExpr::Wildcard {
            leading: text.starts_with(['*', '!']),
            pattern: text,
            pos: Pos(offset),
        }
    } else {
        QueryExpr::Term { text }
    }
}

/// Recursive descent parser for query expressions.
struct Parser<'t> {
    /// Token stream to parse.
    tokens: &'t [Token],
    /// Current position in token stream.
    position: usize,
    /// Deepest group nesting allowed before clauses are rejected.
    max_depth: usize,
    /// Deepest chain of negations and field qualifiers allowed.
    max_prefixes: usize,
    /// Findings reported while parsing.
    diagnostics: Diagnostics,
}

impl<'t> Parser<'t> {
    /// Creates a new parser from a token stream.
    fn new(tokens: &'t [Token], max_depth: usize) -> Self {
        Self {
            tokens,
            position: 0,
            max_depth,
            max_prefixes: max_depth.saturating_mul(2),
            diagnostics: Diagnostics::new(),
        }
    }

    /// Parses the token stream into a query expression.
    fn parse(mut self) -> (Option<QueryExpr>, Diagnostics) {
        let expr = self.parse_sequence(Depth::default(), None, false);
        debug!(
            tokens = self.tokens.len(),
            diagnostics = self.diagnostics.len(),
            empty = expr.is_none(),
            "parsed query"
        );
        (expr, self.diagnostics)
    }

    /// Parses clauses and connectors at one grouping level.
    ///
    /// Stops at end of input, or at `)` when `in_group` is set. A stray `)` at the top
    /// level is reported and skipped.
    fn parse_sequence(
        &mut self,
        depth: Depth,
        field: Option<&str>,
        in_group: bool,
    ) -> Option<QueryExpr> {
        let mut clauses: Vec<(Option<Connector>, QueryExpr)> = Vec::new();
        let mut pending: Option<Pending> = None;
        // Set while the clause just read was dropped. A dropped clause takes the
        // connector before it; one after it joins the surviving neighbours.
        let mut dropped = false;

        while let Some(token) = self.peek().cloned() {
            match token.kind {
                TokenKind::RParen if in_group => break,
                TokenKind::RParen => {
                    self.diagnostics.push(
                        DiagnosticKind::UnbalancedParentheses,
                        token.offset,
                        "unmatched closing parenthesis was ignored",
                    );
                    self.advance();
                }
                TokenKind::And | TokenKind::Or => {
                    self.advance();
                    let connector = if token.kind == TokenKind::And {
                        Connector::And
                    } else {
                        Connector::Or
                    };
                    if pending.is_none() && !clauses.is_empty() {
                        pending = Some(Pending { connector, token });
                    } else if pending.is_none() && dropped {
                        // The only left operand was dropped.
                        dropped = false;
                    } else {
                        let joined_by = pending.take().map(|p| p.connector);
                        clauses.push((joined_by, self.dangling(&token)));
                    }
                }
                _ => match self.parse_unary(depth, field) {
                    Some(clause) => {
                        clauses.push((pending.take().map(|p| p.connector), clause));
                        dropped = false;
                    }
                    None => {
                        pending = None;
                        dropped = true;
                    }
                },
            }
        }

        if let Some(Pending { token, .. }) = pending {
            clauses.push((None, self.dangling(&token)));
        }

        // Negation anywhere at this level demotes the implicit connector to OR.
        let mode = if clauses.iter().any(|(_, clause)| clause.is_negation()) {
            Connector::Or
        } else {
            Connector::And
        };

        fold_clauses(clauses, mode)
    }

    /// Records an operator with no operand and turns it into literal term text.
    fn dangling(&mut self, token: &Token) -> QueryExpr {
        self.diagnostics.push(
            DiagnosticKind::DanglingOperator,
            token.offset,
            format!("'{}' has nothing to operate on and was treated as a word", token.text),
        );
        QueryExpr::term(token.text.clone())
    }

    /// Parses: unary → ("-" | "NOT" | "%") unary | primary
    fn parse_unary(&mut self, depth: Depth, field: Option<&str>) -> Option<QueryExpr> {
        let token = self.peek()?.clone();

        match token.kind {
            TokenKind::Minus | TokenKind::Not | TokenKind::Percent => {
                self.advance();
                let operand_follows = match self.peek() {
                    // `-` binds only to a word directly after it.
                    Some(next) if token.kind == TokenKind::Minus => {
                        token.touches(next) && starts_clause(next.kind)
                    }
                    Some(next) => starts_clause(next.kind),
                    None => false,
                };
                if !operand_follows {
                    return Some(self.dangling(&token));
                }

                let Some(inner) = self.descend_prefix(depth, token.offset) else {
                    self.skip_clause();
                    return None;
                };
                self.parse_unary(inner, field).map(QueryExpr::not)
            }
            _ => self.parse_primary(depth, field),
        }
    }

    /// Parses a group, range, phrase, related query, fielded query, or word.
    fn parse_primary(&mut self, depth: Depth, field: Option<&str>) -> Option<QueryExpr> {
        let token = self.peek()?.clone();

        let expr = match token.kind {
            TokenKind::LParen => self.parse_group(depth, field).map(QueryExpr::group),
            TokenKind::LBracket => self.parse_range(depth, field),
            TokenKind::PhraseStart => return self.parse_phrase(),
            TokenKind::Related if self.next_touches(TokenKind::Colon) => {
                return self.parse_related();
            }
            TokenKind::Term if self.next_touches(TokenKind::Colon) => {
                return self.parse_field(depth, &token);
            }
            TokenKind::Term | TokenKind::Star | TokenKind::QMark | TokenKind::Bang => {
                return self.parse_word();
            }
            _ => {
                // Anything else has no meaning here and stands for itself.
                self.advance();
                return Some(QueryExpr::term(token.text));
            }
        };

        self.reject_modifier("groups and ranges");
        expr
    }

    /// Returns the depth inside one more group, or reports the limit.
    fn descend_group(&mut self, depth: Depth, offset: usize) -> Option<Depth> {
        if depth.groups < self.max_depth {
            return Some(Depth {
                groups: depth.groups + 1,
                ..depth
            });
        }
        self.diagnostics.push(
            DiagnosticKind::MaxDepthExceeded,
            offset,
            format!("query nesting exceeds the maximum depth of {}", self.max_depth),
        );
        None
    }

    /// Returns the depth under one more negation or field qualifier, or reports the limit.
    fn descend_prefix(&mut self, depth: Depth, offset: usize) -> Option<Depth> {
        if depth.prefixes < self.max_prefixes {
            return Some(Depth {
                prefixes: depth.prefixes + 1,
                ..depth
            });
        }
        self.diagnostics.push(
            DiagnosticKind::MaxDepthExceeded,
            offset,
            format!(
                "query chains more than {} negations and field qualifiers",
                self.max_prefixes
            ),
        );
        None
    }

    /// Parses `( sequence )`, returning the inner expression.
    ///
    /// An unclosed group is closed at the end of input.
    fn parse_group(&mut self, depth: Depth, field: Option<&str>) -> Option<QueryExpr> {
        let open = self.peek()?.offset;
        self.advance(); // consume (

        let Some(inner) = self.descend_group(depth, open) else {
            self.skip_balanced();
            return None;
        };

        let first_inside = self.position;
        let expr = self.parse_sequence(inner, field, true);
        if expr.is_none() && self.position == first_inside {
            self.diagnostics.push(
                DiagnosticKind::EmptyClause,
                open,
                "empty group was ignored",
            );
        }

        if self.check(TokenKind::RParen) {
            self.advance(); // consume )
        } else {
            self.diagnostics.push(
                DiagnosticKind::UnbalancedParentheses,
                open,
                "unclosed parenthesis was closed at the end of the query",
            );
        }

        expr
    }

    /// Parses `NAME ":" value`.
    fn parse_field(&mut self, depth: Depth, name: &Token) -> Option<QueryExpr> {
        self.advance(); // consume name
        let colon = self.peek()?.clone();
        self.advance(); // consume :

        let has_value = self
            .peek()
            .is_some_and(|next| colon.touches(next) && starts_field_value(next.kind));
        if !has_value {
            self.diagnostics.push(
                DiagnosticKind::EmptyFieldValue,
                name.offset,
                format!("field '{}' has no value and was treated as a word", name.text),
            );
            return Some(QueryExpr::term(format!("{}:", name.text)));
        }

        let Some(inner) = self.descend_prefix(depth, name.offset) else {
            self.skip_clause();
            return None;
        };

        let expr = if self.check(TokenKind::LParen) {
            let value = self.parse_group(inner, Some(name.text.as_str()));
            self.reject_modifier("groups and ranges");
            value
        } else {
            self.parse_primary(inner, Some(name.text.as_str()))
        }?;

        Some(QueryExpr::FieldQuery {
            name: name.text.clone(),
            expr: Box::new(expr),
            pos: Pos(name.offset),
        })
    }

    /// Parses `[low TO high]`.
    ///
    /// A lowercase `to` is not the range keyword: the bracket contents are parsed
    /// again as ordinary clauses inside a group.
    fn parse_range(&mut self, depth: Depth, field: Option<&str>) -> Option<QueryExpr> {
        let open = self.peek()?.offset;
        self.advance(); // consume [
        let start = self.position;

        let mut items: Vec<(TokenKind, String)> = Vec::new();
        let end = loop {
            let Some(token) = self.peek().cloned() else {
                self.diagnostics.push(
                    DiagnosticKind::InvalidRangeSyntax,
                    open,
                    "range is missing its closing bracket",
                );
                return None;
            };
            match token.kind {
                TokenKind::RBracket => {
                    let end = self.position;
                    self.advance();
                    break end;
                }
                TokenKind::RParen => {
                    self.diagnostics.push(
                        DiagnosticKind::InvalidRangeSyntax,
                        open,
                        "range is missing its closing bracket",
                    );
                    return None;
                }
                TokenKind::To => {
                    self.advance();
                    items.push((TokenKind::To, token.text));
                }
                _ => {
                    let text = self.read_glued(|kind| {
                        !matches!(
                            kind,
                            TokenKind::RBracket | TokenKind::RParen | TokenKind::To
                        )
                    });
                    items.push((TokenKind::Term, text));
                }
            }
        };

        if let [
            (TokenKind::Term, low),
            (TokenKind::To, _),
            (TokenKind::Term, high),
        ] = items.as_slice()
        {
            return Some(QueryExpr::Range {
                field: field.map(String::from),
                low: low.clone(),
                high: high.clone(),
                inclusive: true,
                pos: Pos(open),
            });
        }

        let lowercase_to = items
            .iter()
            .any(|(kind, text)| *kind == TokenKind::Term && text.eq_ignore_ascii_case("to"));
        if !lowercase_to {
            self.diagnostics.push(
                DiagnosticKind::InvalidRangeSyntax,
                open,
                "range must have the form [low TO high]",
            );
            return None;
        }

        self.diagnostics.push(
            DiagnosticKind::MalformedRange,
            open,
            "range keyword must be uppercase TO; the brackets were read as ordinary clauses",
        );
        let mut contents = Parser::new(&self.tokens[start..end], self.max_depth);
        let expr = contents.parse_sequence(depth, field, false);
        self.diagnostics.extend(contents.diagnostics);
        expr.map(QueryExpr::group)
    }

    /// Parses a quoted phrase and an optional proximity modifier.
    fn parse_phrase(&mut self) -> Option<QueryExpr> {
        let open = self.peek()?.offset;
        self.advance(); // consume opening quote

        let mut words = Vec::new();
        while let Some(token) = self.peek() {
            if token.kind != TokenKind::Term {
                break;
            }
            words.push(token.text.clone());
            self.advance();
        }

        // Balanced quotes guarantee the closing quote.
        let close = self.peek().cloned();
        self.advance();

        let tilde = close.and_then(|close| self.take_modifier(&close));

        if words.is_empty() {
            self.diagnostics.push(
                DiagnosticKind::EmptyClause,
                open,
                "empty phrase was ignored",
            );
            return None;
        }

        let Some((tilde, value)) = tilde else {
            return Some(QueryExpr::phrase(words));
        };

        match value.as_deref().map(str::parse::<u32>) {
            Some(Ok(distance)) => Some(QueryExpr::ProximityPhrase { words, distance }),
            _ => {
                self.diagnostics.push(
                    DiagnosticKind::InvalidProximityValue,
                    tilde,
                    format!(
                        "proximity distance must be a whole number, got '{}'",
                        value.unwrap_or_default()
                    ),
                );
                Some(QueryExpr::phrase(words))
            }
        }
    }

    /// Parses `related:<id>`; non-numeric ids drop the clause.
    fn parse_related(&mut self) -> Option<QueryExpr> {
        let keyword = self.peek()?.clone();
        self.advance(); // consume related
        let colon = self.peek()?.clone();
        self.advance(); // consume :

        let value = match self.peek() {
            Some(next) if colon.touches(next) && is_word_piece(next.kind) => {
                Some(self.read_glued(is_word_piece))
            }
            _ => None,
        };

        let id = value
            .as_deref()
            .filter(|v| v.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|v| v.parse::<u64>().ok());

        match id {
            Some(id) => Some(QueryExpr::RelatedQuery { id }),
            None => {
                let message = match value {
                    Some(value) => format!(
                        "related: expects a numeric document id, got '{value}'; the clause was ignored"
                    ),
                    None => "related: is missing a document id; the clause was ignored".to_string(),
                };
                self.diagnostics
                    .push(DiagnosticKind::InvalidRelatedId, keyword.offset, message);
                None
            }
        }
    }

    /// Parses a bare word, wildcard pattern, or fuzzy term.
    fn parse_word(&mut self) -> Option<QueryExpr> {
        let first = self.peek()?.clone();

        if first.kind == TokenKind::Bang {
            let followed = self
                .tokens
                .get(self.position + 1)
                .is_some_and(|next| first.touches(next) && is_word_piece(next.kind));
            if !followed {
                self.advance();
                return Some(self.dangling(&first));
            }
        }

        let mut text = String::new();
        let mut last = first.clone();
        if first.kind == TokenKind::Bang {
            text.push('!');
            self.advance();
        }
        while let Some(token) = self.peek() {
            let glued = text.is_empty() || last.touches(token);
            if !glued || !is_word_piece(token.kind) {
                break;
            }
            text.push_str(&token.text);
            last = token.clone();
            self.advance();
        }

        let node = word_node(text, first.offset);

        let Some((tilde, value)) = self.take_modifier(&last) else {
            return Some(node);
        };

        match node {
            QueryExpr::Wildcard { .. } => {
                self.diagnostics.push(
                    DiagnosticKind::UnsupportedModifier,
                    tilde,
                    "fuzzy matching cannot be combined with wildcards",
                );
                Some(node)
            }
            QueryExpr::Term { text } => match value.as_deref().map(str::parse::<u32>) {
                None => Some(QueryExpr::FuzzyTerm {
                    term: text,
                    max_edits: DEFAULT_FUZZY_EDITS,
                    pos: Pos(first.offset),
                }),
                Some(Ok(max_edits)) => Some(QueryExpr::FuzzyTerm {
                    term: text,
                    max_edits,
                    pos: Pos(first.offset),
                }),
                Some(Err(_)) => {
                    self.diagnostics.push(
                        DiagnosticKind::InvalidFuzzyValue,
                        tilde,
                        format!(
                            "fuzzy edit distance must be 1 or 2, got '{}'",
                            value.unwrap_or_default()
                        ),
                    );
                    Some(QueryExpr::Term { text })
                }
            },
            other => Some(other),
        }
    }

    /// Consumes a `~` touching `prev`, plus the number touching the `~`.
    ///
    /// Returns the offset of the `~` and the number text, if any.
    fn take_modifier(&mut self, prev: &Token) -> Option<(usize, Option<String>)> {
        let tilde = self.peek().filter(|t| t.kind == TokenKind::Tilde && prev.touches(t))?.clone();
        self.advance();

        let value = match self.peek() {
            Some(next) if tilde.touches(next) && next.kind == TokenKind::Term => {
                let text = next.text.clone();
                self.advance();
                Some(text)
            }
            _ => None,
        };

        Some((tilde.offset, value))
    }

    /// Reports and consumes a `~` directly after a group or range.
    fn reject_modifier(&mut self, target: &str) {
        let Some(prev) = self.position.checked_sub(1).and_then(|i| self.tokens.get(i)).cloned()
        else {
            return;
        };
        if let Some((tilde, _)) = self.take_modifier(&prev) {
            self.diagnostics.push(
                DiagnosticKind::UnsupportedModifier,
                tilde,
                format!("'~' cannot be applied to {target}"),
            );
        }
    }

    /// Reads a run of touching tokens accepted by `accept` as one piece of text.
    ///
    /// The first token is always taken.
    fn read_glued(&mut self, accept: impl Fn(TokenKind) -> bool) -> String {
        let Some(first) = self.peek().cloned() else {
            return String::new();
        };
        self.advance();

        let mut text = first.text.clone();
        let mut last = first;
        while let Some(token) = self.peek() {
            if !last.touches(token) || !accept(token.kind) {
                break;
            }
            text.push_str(&token.text);
            last = token.clone();
            self.advance();
        }

        text
    }

    /// Skips one clause without building it.
    fn skip_clause(&mut self) {
        while self.peek().is_some_and(|t| {
            matches!(
                t.kind,
                TokenKind::Minus | TokenKind::Not | TokenKind::Percent | TokenKind::Bang
            )
        }) {
            self.advance();
        }

        let Some(token) = self.peek().cloned() else {
            return;
        };
        self.advance();

        match token.kind {
            TokenKind::LParen => self.skip_balanced(),
            TokenKind::LBracket => self.skip_until(TokenKind::RBracket),
            TokenKind::PhraseStart => self.skip_until(TokenKind::PhraseEnd),
            _ => {
                let mut last = token;
                while let Some(next) = self.peek().cloned() {
                    if !last.touches(&next) {
                        break;
                    }
                    self.advance();
                    match next.kind {
                        TokenKind::LParen => return self.skip_balanced(),
                        TokenKind::LBracket => return self.skip_until(TokenKind::RBracket),
                        TokenKind::PhraseStart => return self.skip_until(TokenKind::PhraseEnd),
                        _ => last = next,
                    }
                }
            }
        }
    }

    /// Skips to just past the `)` matching an already consumed `(`.
    fn skip_balanced(&mut self) {
        let mut open = 1usize;
        while let Some(token) = self.peek() {
            match token.kind {
                TokenKind::LParen => open += 1,
                TokenKind::RParen => open -= 1,
                _ => {}
            }
            self.advance();
            if open == 0 {
                return;
            }
        }
    }

    /// Skips to just past the next token of the given kind.
    fn skip_until(&mut self, kind: TokenKind) {
        while let Some(token) = self.peek() {
            let done = token.kind == kind;
            self.advance();
            if done {
                return;
            }
        }
    }

    /// Returns true if the token after the current one has `kind` and touches it.
    fn next_touches(&self, kind: TokenKind) -> bool {
        match (self.peek(), self.tokens.get(self.position + 1)) {
            (Some(current), Some(next)) => next.kind == kind && current.touches(next),
            _ => false,
        }
    }

    /// Returns the current token without consuming it.
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    /// Checks if the current token has the given kind.
    fn check(&self, kind: TokenKind) -> bool {
        self.peek().is_some_and(|t| t.kind == kind)
    }

    /// Advances to the next token.
    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }
}

/// Folds clauses left to right, using `mode` where no connector was written.
fn fold_clauses(
    clauses: Vec<(Option<Connector>, QueryExpr)>,
    mode: Connector,
) -> Option<QueryExpr> {
    let mut clauses = clauses.into_iter();
    let (_, first) = clauses.next()?;
    Some(clauses.fold(first, |left, (connector, right)| {
        connector.unwrap_or(mode).join(left, right)
    }))
}

/// Parses a token stream.
///
/// Returns the expression (None for an empty query) and everything reported while
/// parsing. Never fails.
pub fn parse_tokens(tokens: &[Token], options: &QueryOptions) -> (Option<QueryExpr>, Diagnostics) {
    Parser::new(tokens, options.max_depth).parse()
}

/// Parses a query string with default options, without validation.
pub fn parse(input: &str) -> ParsedQuery {
    parse_with(input, &QueryOptions::default())
}

/// Parses a query string, without validation.
///
/// Reports unbalanced quotes in addition to everything the parser finds.
pub fn parse_with(input: &str, options: &QueryOptions) -> ParsedQuery {
    let mut diagnostics = Diagnostics::new();
    if !quotes_balanced(input) {
        diagnostics.push(
            DiagnosticKind::UnbalancedQuotes,
            input.find('"').unwrap_or(0),
            "unbalanced quotes; all quotation marks were treated as ordinary characters",
        );
    }

    let tokens = tokenize(input);
    let (query, found) = parse_tokens(&tokens, options);
    diagnostics.extend(found);
    diagnostics.sort_by_offset();

    ParsedQuery {
        input: input.to_string(),
        query,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    fn term(s: &str) -> QueryExpr {
        QueryExpr::term(s)
    }

    fn phrase(words: &[&str]) -> QueryExpr {
        QueryExpr::phrase(words.iter().copied())
    }

    fn not(e: QueryExpr) -> QueryExpr {
        QueryExpr::not(e)
    }

    fn and(l: QueryExpr, r: QueryExpr) -> QueryExpr {
        QueryExpr::and(l, r)
    }

    fn or(l: QueryExpr, r: QueryExpr) -> QueryExpr {
        QueryExpr::or(l, r)
    }

    fn group(e: QueryExpr) -> QueryExpr {
        QueryExpr::group(e)
    }

    fn field(name: &str, e: QueryExpr) -> QueryExpr {
        QueryExpr::field(name, e)
    }

    /// Parses and returns the expression, asserting nothing was reported.
    fn clean(input: &str) -> QueryExpr {
        let parsed = parse(input);
        assert!(
            parsed.diagnostics.is_empty(),
            "unexpected diagnostics for {input:?}: {:?}",
            parsed.diagnostics
        );
        parsed.query.expect("query should not be empty")
    }

    fn kinds(input: &str) -> Vec<DiagnosticKind> {
        parse(input).diagnostics.iter().map(|d| d.kind).collect()
    }

    #[test]
    fn empty_query() {
        assert_eq!(parse("").query, None);
        assert_eq!(parse("   ").query, None);
    }

    #[test]
    fn single_term() {
        assert_eq!(clean("rust"), term("rust"));
    }

    #[test]
    fn implicit_and() {
        assert_eq!(
            clean("rust async await"),
            and(and(term("rust"), term("async")), term("await"))
        );
    }

    #[test]
    fn explicit_connectors_left_to_right() {
        assert_eq!(
            clean("a OR b AND c"),
            and(or(term("a"), term("b")), term("c"))
        );
        assert_eq!(
            clean("a AND b OR c"),
            or(and(term("a"), term("b")), term("c"))
        );
        assert_eq!(clean("a & b"), and(term("a"), term("b")));
    }

    #[test]
    fn explicit_and_with_negated_phrase() {
        assert_eq!(
            clean("immigration AND border AND -\"border patrol\""),
            and(
                and(term("immigration"), term("border")),
                not(phrase(&["border", "patrol"]))
            )
        );
    }

    #[test]
    fn negation_demotes_implicit_connector() {
        assert_eq!(
            clean("a b -c"),
            or(or(term("a"), term("b")), not(term("c")))
        );
        assert_eq!(clean("a NOT b"), or(term("a"), not(term("b"))));
        assert_eq!(clean("a %b"), or(term("a"), not(term("b"))));
    }

    #[test]
    fn demotion_is_per_level() {
        assert_eq!(
            clean("a b (c -d)"),
            and(
                and(term("a"), term("b")),
                group(or(term("c"), not(term("d"))))
            )
        );
    }

    #[test]
    fn explicit_connector_survives_demotion() {
        assert_eq!(
            clean("a AND b -c"),
            or(and(term("a"), term("b")), not(term("c")))
        );
    }

    #[test]
    fn double_negation() {
        assert_eq!(clean("--foo"), not(not(term("foo"))));
        assert_eq!(clean("NOT -foo"), not(not(term("foo"))));
    }

    #[test]
    fn grouping_is_preserved() {
        assert_eq!(
            clean("(rust OR golang) async"),
            and(group(or(term("rust"), term("golang"))), term("async"))
        );
        assert_eq!(
            clean("((a OR b) c)"),
            group(and(group(or(term("a"), term("b"))), term("c")))
        );
    }

    #[test]
    fn negated_group() {
        assert_eq!(clean("-(a b)"), not(group(and(term("a"), term("b")))));
    }

    #[test]
    fn field_with_term() {
        assert_eq!(clean("court_id:ca1"), field("court_id", term("ca1")));
    }

    #[test]
    fn field_with_group() {
        assert_eq!(
            clean("casename:(wade OR roe)"),
            field("casename", or(term("wade"), term("roe")))
        );
        assert_eq!(
            clean("casename:(wade roe)"),
            field("casename", and(term("wade"), term("roe")))
        );
    }

    #[test]
    fn field_binds_tighter_than_connectors() {
        assert_eq!(
            clean("title:guide rust"),
            and(field("title", term("guide")), term("rust"))
        );
        assert_eq!(
            clean("-title:deprecated"),
            not(field("title", term("deprecated")))
        );
    }

    #[test]
    fn field_with_phrase_and_modifiers() {
        assert_eq!(
            clean("caseName:\"roe wade\""),
            field("caseName", phrase(&["roe", "wade"]))
        );
        assert_eq!(
            clean("caseName:immigra*"),
            field("caseName", QueryExpr::wildcard("immigra*"))
        );
        assert_eq!(
            clean("caseName:immigrant~1"),
            field("caseName", QueryExpr::fuzzy("immigrant", 1))
        );
    }

    #[test]
    fn nested_fields() {
        assert_eq!(clean("a:b:c"), field("a", field("b", term("c"))));
    }

    #[test]
    fn fuzzy_terms() {
        assert_eq!(clean("immigrant~"), QueryExpr::fuzzy("immigrant", 2));
        assert_eq!(clean("immigrant~1"), QueryExpr::fuzzy("immigrant", 1));
        // Out-of-range values are the validator's call.
        assert_eq!(clean("immigrant~3"), QueryExpr::fuzzy("immigrant", 3));
    }

    #[test]
    fn fuzzy_needs_integer() {
        let parsed = parse("immigrant~0.5");
        assert_eq!(parsed.query, Some(term("immigrant")));
        assert_eq!(kinds("immigrant~0.5"), vec![DiagnosticKind::InvalidFuzzyValue]);
    }

    #[test]
    fn proximity_phrase() {
        assert_eq!(
            clean("\"border fence\"~50"),
            QueryExpr::proximity(["border", "fence"], 50)
        );
    }

    #[test]
    fn proximity_needs_number() {
        let parsed = parse("\"border fence\"~");
        assert_eq!(parsed.query, Some(phrase(&["border", "fence"])));
        assert_eq!(
            kinds("\"border fence\"~"),
            vec![DiagnosticKind::InvalidProximityValue]
        );
    }

    #[test]
    fn wildcards() {
        assert_eq!(clean("immigra*"), QueryExpr::wildcard("immigra*"));
        assert_eq!(clean("gr*mm*r"), QueryExpr::wildcard("gr*mm*r"));
        assert_eq!(clean("?mmigra*"), QueryExpr::wildcard("?mmigra*"));
        assert_eq!(clean("!immigra"), QueryExpr::wildcard("!immigra"));
        assert_eq!(clean("*ing"), QueryExpr::wildcard("*ing"));
    }

    #[test]
    fn fuzzy_wildcard_is_unsupported() {
        let parsed = parse("immigra*~1");
        assert_eq!(parsed.query, Some(QueryExpr::wildcard("immigra*")));
        assert_eq!(kinds("immigra*~1"), vec![DiagnosticKind::UnsupportedModifier]);
    }

    #[test]
    fn ranges() {
        assert_eq!(
            clean("dateFiled:[2018-10-01 TO 2018-10-31]"),
            field(
                "dateFiled",
                QueryExpr::range(Some("dateFiled"), "2018-10-01", "2018-10-31")
            )
        );
        assert_eq!(clean("[a TO b]"), QueryExpr::range(None, "a", "b"));
    }

    #[test]
    fn range_inside_field_group() {
        assert_eq!(
            clean("citation:([22 TO 23] F2)"),
            field(
                "citation",
                and(QueryExpr::range(Some("citation"), "22", "23"), term("F2"))
            )
        );
    }

    #[test]
    fn lowercase_to_falls_back() {
        let parsed = parse("[a to b]");
        assert_eq!(
            parsed.query,
            Some(group(and(and(term("a"), term("to")), term("b"))))
        );
        assert_eq!(kinds("[a to b]"), vec![DiagnosticKind::MalformedRange]);
        assert!(!parsed.diagnostics.has_fatal());

        let parsed = parse("[-5 to 5]");
        assert_eq!(
            parsed.query,
            Some(group(or(or(not(term("5")), term("to")), term("5"))))
        );
        let printed = parsed.query.unwrap().to_query_string();
        assert_eq!(parse(&printed).query, parse("[-5 to 5]").query);

        assert_eq!(
            parse("[a:b to c]").query,
            Some(group(and(and(field("a", term("b")), term("to")), term("c"))))
        );
    }

    #[test]
    fn malformed_ranges_are_fatal() {
        for input in ["[a TO]", "[a b]", "[a TO b", "(x [a TO b)", "[TO b]"] {
            let parsed = parse(input);
            assert!(
                parsed.diagnostics.contains(DiagnosticKind::InvalidRangeSyntax),
                "{input}: {:?}",
                parsed.diagnostics
            );
            assert!(parsed.diagnostics.has_fatal());
        }
    }

    #[test]
    fn related_query() {
        assert_eq!(
            clean("related:2812209"),
            QueryExpr::RelatedQuery { id: 2812209 }
        );
    }

    #[test]
    fn invalid_related_is_dropped() {
        let parsed = parse("related:abc");
        assert_eq!(parsed.query, None);
        assert_eq!(kinds("related:abc"), vec![DiagnosticKind::InvalidRelatedId]);
        assert!(!parsed.diagnostics.has_fatal());

        assert_eq!(parse("immigration related:abc").query, Some(term("immigration")));
        assert_eq!(
            parse("related:-5 AND border").query,
            Some(term("border"))
        );
    }

    #[test]
    fn connector_after_dropped_clause_is_kept() {
        assert_eq!(
            parse("a AND related:x OR b").query,
            Some(or(term("a"), term("b")))
        );
        assert_eq!(
            parse("a related:abc OR b").query,
            Some(or(term("a"), term("b")))
        );
        assert_eq!(
            kinds("related:x AND AND b"),
            vec![DiagnosticKind::InvalidRelatedId, DiagnosticKind::DanglingOperator]
        );
    }

    #[test]
    fn odd_quotes_disable_phrases() {
        let parsed = parse("\"border fence");
        assert_eq!(
            parsed.query,
            Some(and(term("\"border"), term("fence")))
        );
        assert_eq!(kinds("\"border fence"), vec![DiagnosticKind::UnbalancedQuotes]);
    }

    #[test]
    fn dangling_operators_become_words() {
        assert_eq!(parse("OR rust").query, Some(and(term("OR"), term("rust"))));
        assert_eq!(parse("rust OR").query, Some(and(term("rust"), term("OR"))));
        assert_eq!(
            parse("a AND OR b").query,
            Some(and(and(term("a"), term("OR")), term("b")))
        );
        assert_eq!(parse("rust -").query, Some(and(term("rust"), term("-"))));
        assert_eq!(parse("a NOT").query, Some(and(term("a"), term("NOT"))));
        assert_eq!(kinds("rust OR"), vec![DiagnosticKind::DanglingOperator]);
    }

    #[test]
    fn minus_needs_adjacent_operand() {
        assert_eq!(
            parse("rust - foo").query,
            Some(and(and(term("rust"), term("-")), term("foo")))
        );
    }

    #[test]
    fn lone_bang_is_a_word() {
        assert_eq!(parse("wow !").query, Some(and(term("wow"), term("!"))));
        assert_eq!(kinds("wow !"), vec![DiagnosticKind::DanglingOperator]);
    }

    #[test]
    fn unbalanced_parentheses_recover() {
        let parsed = parse("(rust async");
        assert_eq!(
            parsed.query,
            Some(group(and(term("rust"), term("async"))))
        );
        assert_eq!(kinds("(rust async"), vec![DiagnosticKind::UnbalancedParentheses]);

        let parsed = parse("rust) async");
        assert_eq!(parsed.query, Some(and(term("rust"), term("async"))));
        assert_eq!(kinds("rust) async"), vec![DiagnosticKind::UnbalancedParentheses]);
    }

    #[test]
    fn empty_field_value() {
        assert_eq!(parse("title:").query, Some(term("title:")));
        assert_eq!(kinds("title: guide"), vec![DiagnosticKind::EmptyFieldValue]);
    }

    #[test]
    fn modifier_on_group_is_unsupported() {
        assert_eq!(kinds("(a b)~2"), vec![DiagnosticKind::UnsupportedModifier]);
    }

    #[test]
    fn empty_clauses_are_dropped_with_a_warning() {
        assert_eq!(parse("a ()").query, Some(term("a")));
        assert_eq!(kinds("a ()"), vec![DiagnosticKind::EmptyClause]);
        assert_eq!(parse("\"\"").query, None);

        let parsed = parse("a \"\" OR b");
        assert_eq!(parsed.query, Some(or(term("a"), term("b"))));
        assert_eq!(kinds("a \"\" OR b"), vec![DiagnosticKind::EmptyClause]);
        assert!(!parsed.diagnostics.has_fatal());
    }

    #[test]
    fn sixty_four_levels_parse() {
        let input = format!("{}x{}", "(".repeat(64), ")".repeat(64));
        let options = QueryOptions {
            max_depth: 64,
            ..QueryOptions::default()
        };
        let parsed = parse_with(&input, &options);
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);

        let mut expected = term("x");
        for _ in 0..64 {
            expected = group(expected);
        }
        assert_eq!(parsed.query, Some(expected));
    }

    #[test]
    fn negated_fields_do_not_eat_the_group_budget() {
        let input = format!("{}x{}", "-f:(".repeat(64), ")".repeat(64));
        let parsed = parse(&input);
        assert!(
            !parsed.diagnostics.contains(DiagnosticKind::MaxDepthExceeded),
            "{:?}",
            parsed.diagnostics
        );

        let mut expected = term("x");
        for _ in 0..64 {
            expected = not(field("f", expected));
        }
        assert_eq!(parsed.query, Some(expected));
    }

    #[test]
    fn excessive_nesting_is_rejected() {
        let input = format!("a {}x{} b", "(".repeat(65), ")".repeat(65));
        let options = QueryOptions {
            max_depth: 64,
            ..QueryOptions::default()
        };
        let parsed = parse_with(&input, &options);
        assert_eq!(
            parsed
                .diagnostics
                .iter()
                .filter(|d| d.kind == DiagnosticKind::MaxDepthExceeded)
                .count(),
            1
        );
        assert!(parsed.diagnostics.has_fatal());
        // Parsing resumes after the rejected subtree.
        assert!(parsed.query.unwrap().to_query_string().ends_with("AND b"));
    }

    #[test]
    fn adversarial_nesting_does_not_overflow() {
        let parens = format!("{}x", "(".repeat(100_000));
        assert!(parse(&parens).diagnostics.contains(DiagnosticKind::MaxDepthExceeded));

        let minuses = format!("{}x", "-".repeat(100_000));
        assert!(parse(&minuses).diagnostics.contains(DiagnosticKind::MaxDepthExceeded));

        let fields = "f:".repeat(100_000) + "x";
        assert!(parse(&fields).diagnostics.contains(DiagnosticKind::MaxDepthExceeded));
    }

    #[test]
    fn performance_many_queries() {
        let queries = [
            "immigration",
            "immigration AND border AND -\"border patrol\"",
            "casename:(wade OR roe)",
            "dateFiled:[2018-10-01 TO 2018-10-31] immigra*",
            "\"border fence\"~50 immigrant~1",
            "citation:([22 TO 23] F2) related:2812209",
            "((a OR b) c) OR ((d OR e) f) -g",
        ];

        let start = Instant::now();
        for _ in 0..1000 {
            for query in &queries {
                let _ = parse(query);
            }
        }
        let elapsed = start.elapsed();

        assert!(
            elapsed.as_millis() < 2000,
            "Parsing 7,000 queries took {:?}, expected < 2s",
            elapsed
        );
    }
}
