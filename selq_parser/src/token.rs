use std::fmt;

use logos::Logos;
use serde::Serialize;
use thiserror::Error;
use tracing::trace;

/// Position range of a token (byte offset).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct Span {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
}

impl Span {
    pub(crate) fn at(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }
}

/// Token kinds recognised by the SelQ lexer.
///
/// Keywords are matched case-sensitively and outrank [`TokenKind::Identifier`]
/// when both match the same text, so `SELECT` is never an identifier while
/// `SELECTED` and `select` are.
#[derive(Logos, Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize)]
#[logos(skip r"\s+")]
pub enum TokenKind {
    /// `SELECT` keyword.
    #[token("SELECT")]
    Select,
    /// `FROM` keyword.
    #[token("FROM")]
    From,
    /// `WHERE` keyword.
    #[token("WHERE")]
    Where,
    /// `GROUP BY` keyword pair. Lexed, but accepted by no grammar rule.
    ///
    /// Produced by [`Lexer`] when the identifier `GROUP` is directly followed
    /// by ` BY`, so a bare `GROUP` stays an identifier.
    GroupBy,
    /// Comma `,`.
    #[token(",")]
    Comma,
    /// Identifier (table/column).
    #[regex(r"[a-zA-Z][a-zA-Z0-9_]*")]
    Identifier,
    /// Unsigned integer literal without leading zeros.
    #[regex(r"0|[1-9][0-9]*")]
    Integer,
    /// `=`.
    #[token("=")]
    Equal,
    /// `>`.
    #[token(">")]
    GreaterThan,
    /// `<`.
    #[token("<")]
    LessThan,
}

impl TokenKind {
    /// Name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            TokenKind::Select => "Select",
            TokenKind::From => "From",
            TokenKind::Where => "Where",
            TokenKind::GroupBy => "GroupBy",
            TokenKind::Comma => "Comma",
            TokenKind::Identifier => "Identifier",
            TokenKind::Integer => "Integer",
            TokenKind::Equal => "Equal",
            TokenKind::GreaterThan => "GreaterThan",
            TokenKind::LessThan => "LessThan",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A classified lexeme with its source span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    /// Token kind.
    pub kind: TokenKind,
    /// Matched source text.
    pub lexeme: String,
    /// Text span.
    pub span: Span,
}

impl Token {
    /// Byte offset where the token starts.
    pub fn position(&self) -> usize {
        self.span.start
    }
}

/// A character no token pattern accepts. The lexer skips it and carries on.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("unexpected character: ->{character}<- at offset: {position}, skipped 1 characters.")]
pub struct LexError {
    /// Byte offset of the rejected character.
    pub position: usize,
    /// The rejected character.
    pub character: char,
}

impl LexError {
    /// Human-readable description.
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Byte offset of the rejected character.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Bytes covered by the rejected character.
    pub fn span(&self) -> Span {
        Span {
            start: self.position,
            end: self.position + self.character.len_utf8(),
        }
    }
}

const GROUP: &str = "GROUP";
const BY_SUFFIX: &str = " BY";

/// Lexer iterator over tokens and lexical errors, in source order.
pub struct Lexer<'input> {
    source: &'input str,
    // Offset of `inner`'s slice within `source`; moves when scanning restarts.
    base: usize,
    inner: logos::Lexer<'input, TokenKind>,
}

impl<'input> Lexer<'input> {
    /// Create new lexer from SQL text slice.
    pub fn new(source: &'input str) -> Self {
        Self {
            source,
            base: 0,
            inner: TokenKind::lexer(source),
        }
    }

    fn restart_at(&mut self, offset: usize) {
        self.base = offset;
        self.inner = TokenKind::lexer(&self.source[offset..]);
    }
}

impl<'input> Iterator for Lexer<'input> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        let kind = match self.inner.next()? {
            Ok(TokenKind::Identifier)
                if self.inner.slice() == GROUP && self.inner.remainder().starts_with(BY_SUFFIX) =>
            {
                self.inner.bump(BY_SUFFIX.len());
                Ok(TokenKind::GroupBy)
            }
            other => other,
        };
        let range = self.inner.span();
        let span = Span {
            start: self.base + range.start,
            end: self.base + range.end,
        };

        match kind {
            Ok(kind) => Some(Ok(Token {
                kind,
                lexeme: self.inner.slice().to_string(),
                span,
            })),
            Err(()) => {
                let character = self.source[span.start..].chars().next()?;
                let resume = span.start + character.len_utf8();
                // Logos may reject more or less than one character; exactly one is skipped.
                if resume != span.end {
                    self.restart_at(resume);
                }
                trace!(position = span.start, %character, "skipping unrecognised character");
                Some(Err(LexError {
                    position: span.start,
                    character,
                }))
            }
        }
    }
}

/// Split `source` into tokens and lexical errors. Never fails.
pub fn tokenize(source: &str) -> (Vec<Token>, Vec<LexError>) {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    for item in Lexer::new(source) {
        match item {
            Ok(token) => tokens.push(token),
            Err(err) => errors.push(err),
        }
    }
    (tokens, errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(sql: &str) -> Vec<TokenKind> {
        tokenize(sql).0.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn tokenize_simple_select() {
        assert_eq!(
            kinds("SELECT a, b FROM t WHERE a = 1"),
            vec![
                TokenKind::Select,
                TokenKind::Identifier,
                TokenKind::Comma,
                TokenKind::Identifier,
                TokenKind::From,
                TokenKind::Identifier,
                TokenKind::Where,
                TokenKind::Identifier,
                TokenKind::Equal,
                TokenKind::Integer,
            ]
        );
    }

    #[test]
    fn spans_and_lexemes_follow_source() {
        let (tokens, errors) = tokenize("SELECT  col FROM tbl");
        assert!(errors.is_empty());
        assert_eq!(tokens[1].lexeme, "col");
        assert_eq!(tokens[1].span, Span { start: 8, end: 11 });
        assert_eq!(tokens[3].position(), 17);
        for pair in tokens.windows(2) {
            assert!(pair[0].span.end <= pair[1].span.start);
        }
    }

    #[test]
    fn keyword_spelling_is_never_an_identifier() {
        assert_eq!(
            kinds("SELECT SELECT FROM"),
            vec![TokenKind::Select, TokenKind::Select, TokenKind::From]
        );
    }

    #[test]
    fn longer_or_lowercase_words_are_identifiers() {
        assert_eq!(
            kinds("SELECTED select FROMAGE where"),
            vec![TokenKind::Identifier; 4]
        );
    }

    #[test]
    fn group_by_is_a_single_token() {
        let (tokens, _) = tokenize("GROUP BY GROUP");
        assert_eq!(tokens[0].kind, TokenKind::GroupBy);
        assert_eq!(tokens[0].lexeme, "GROUP BY");
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
    }

    #[test]
    fn integers_have_no_leading_zeros() {
        let (tokens, _) = tokenize("007 120");
        let lexemes: Vec<_> = tokens.iter().map(|t| t.lexeme.as_str()).collect();
        assert_eq!(lexemes, vec!["0", "0", "7", "120"]);
    }

    #[test]
    fn operators() {
        assert_eq!(
            kinds("= < >"),
            vec![TokenKind::Equal, TokenKind::LessThan, TokenKind::GreaterThan]
        );
    }

    #[test]
    fn unknown_character_is_skipped() {
        let (tokens, errors) = tokenize("SELECT a FROM t WHERE a # 1");
        assert_eq!(
            errors,
            vec![LexError {
                position: 24,
                character: '#'
            }]
        );
        assert_eq!(tokens.len(), 7);
        assert_eq!(tokens[5].lexeme, "a");
        assert_eq!(tokens[6].kind, TokenKind::Integer);
        assert_eq!(
            errors[0].message(),
            "unexpected character: ->#<- at offset: 24, skipped 1 characters."
        );
    }

    #[test]
    fn each_bad_character_is_reported() {
        let (tokens, errors) = tokenize("a ## _b");
        let positions: Vec<_> = errors.iter().map(LexError::position).collect();
        assert_eq!(positions, vec![2, 3, 5]);
        let lexemes: Vec<_> = tokens.iter().map(|t| t.lexeme.as_str()).collect();
        assert_eq!(lexemes, vec!["a", "b"]);
    }

    #[test]
    fn partial_group_by_stays_identifier() {
        let (tokens, errors) = tokenize("GROUP Bx");
        assert!(errors.is_empty());
        let lexemes: Vec<_> = tokens.iter().map(|t| t.lexeme.as_str()).collect();
        assert_eq!(lexemes, vec!["GROUP", "Bx"]);
    }

    #[test]
    fn multibyte_characters_are_not_split() {
        let (tokens, errors) = tokenize("a é b");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].character, 'é');
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].span.start, 5);
    }

    #[test]
    fn empty_input() {
        let (tokens, errors) = tokenize("   \n\t");
        assert!(tokens.is_empty());
        assert!(errors.is_empty());
    }

    #[test]
    fn unicode_whitespace_is_skipped() {
        for (sql, column_at) in [
            ("SELECT\u{0B}a FROM t", 7),
            ("SELECT\u{A0}a FROM t", 8),
            ("SELECT\u{2003}a FROM t", 9),
        ] {
            let (tokens, errors) = tokenize(sql);
            assert!(errors.is_empty(), "{sql:?}: {errors:?}");
            assert_eq!(tokens.len(), 4);
            assert_eq!(tokens[1].lexeme, "a");
            assert_eq!(tokens[1].span.start, column_at);
        }
    }

    #[test]
    fn lex_error_span_covers_whole_character() {
        let (_, errors) = tokenize("a é");
        assert_eq!(errors[0].span(), Span { start: 2, end: 4 });
    }
}
