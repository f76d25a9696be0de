//! Grammar recognizer: tokens in, concrete syntax tree and errors out.

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::cst::{
    AtomicExpressionCst, ExpressionCst, FromClauseCst, RelationalOperatorCst, Rule,
    SelectClauseCst, SelectStatementCst, WhereClauseCst, ATOMIC_EXPRESSIONS, RELATIONAL_OPERATORS,
};
use crate::token::{Span, Token, TokenKind};

const EOF: &str = "<EOF>";

/// What went wrong while recognising a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParseErrorKind {
    /// A specific token was required but another one (or end of input) was found.
    MismatchedToken,
    /// None of a rule's alternatives start with the found token.
    NoViableAlternative,
    /// The statement is complete but tokens remain.
    RedundantInput,
}

/// Parsing error with location info.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message}")]
pub struct ParseError {
    /// Failure category.
    pub kind: ParseErrorKind,
    /// Human-readable description.
    pub message: String,
    /// Rule being recognised when the error occurred.
    pub rule: Rule,
    /// Token kinds that would have been accepted.
    pub expected: Vec<TokenKind>,
    /// Offending token, `None` at end of input.
    pub found: Option<Token>,
    /// Byte offset of the offending token, or of the end of input.
    pub position: usize,
}

impl ParseError {
    pub(crate) fn mismatched(
        rule: Rule,
        expected: TokenKind,
        found: Option<Token>,
        eof: usize,
    ) -> Self {
        let message = format!(
            "Expecting token of type --> {expected} <-- but found --> '{}' <--",
            found_text(found.as_ref())
        );
        Self::new(ParseErrorKind::MismatchedToken, message, rule, vec![expected], found, eof)
    }

    pub(crate) fn no_viable_alternative(
        rule: Rule,
        expected: &[TokenKind],
        found: Option<Token>,
        eof: usize,
    ) -> Self {
        let names: Vec<_> = expected.iter().map(|kind| kind.name()).collect();
        let message = format!(
            "Expecting: one of these possibilities: [{}] but found: '{}'",
            names.join(", "),
            found_text(found.as_ref())
        );
        Self::new(
            ParseErrorKind::NoViableAlternative,
            message,
            rule,
            expected.to_vec(),
            found,
            eof,
        )
    }

    pub(crate) fn redundant_input(found: Token) -> Self {
        let message = format!("Redundant input, expecting EOF but found: '{}'", found.lexeme);
        let position = found.position();
        Self::new(
            ParseErrorKind::RedundantInput,
            message,
            Rule::SelectStatement,
            Vec::new(),
            Some(found),
            position,
        )
    }

    fn new(
        kind: ParseErrorKind,
        message: String,
        rule: Rule,
        expected: Vec<TokenKind>,
        found: Option<Token>,
        eof: usize,
    ) -> Self {
        let position = found.as_ref().map_or(eof, Token::position);
        Self {
            kind,
            message,
            rule,
            expected,
            found,
            position,
        }
    }

    /// Human-readable description.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Byte offset of the offending token, or of the end of input.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Bytes of the offending token; empty at end of input.
    pub fn span(&self) -> Span {
        self.found
            .as_ref()
            .map_or_else(|| Span::at(self.position), |tok| tok.span)
    }
}

fn found_text(found: Option<&Token>) -> &str {
    found.map_or(EOF, |tok| tok.lexeme.as_str())
}

/// Recursive-descent recognizer over a token slice.
///
/// Holds the cursor and the collected errors for exactly one parse; build a
/// new one per input.
pub struct Recognizer<'t> {
    tokens: &'t [Token],
    cursor: usize,
    errors: Vec<ParseError>,
}

impl<'t> Recognizer<'t> {
    /// Start recognising `tokens` from the first one.
    pub fn new(tokens: &'t [Token]) -> Self {
        Self {
            tokens,
            cursor: 0,
            errors: Vec::new(),
        }
    }

    /// Recognise a whole `selectStatement` and hand back the CST with every
    /// error collected on the way.
    pub fn select_statement(mut self) -> (Option<SelectStatementCst>, Vec<ParseError>) {
        let cst = self.select_statement_rule();
        if cst.is_some() && self.errors.is_empty() {
            if let Some(extra) = self.peek().cloned() {
                self.record(ParseError::redundant_input(extra));
            }
        }
        (cst, self.errors)
    }

    fn select_statement_rule(&mut self) -> Option<SelectStatementCst> {
        let select_clause = self.select_clause()?;
        let from_clause = self.from_clause()?;
        let where_clause = if self.at(TokenKind::Where) {
            self.where_clause()
        } else {
            None
        };
        Some(SelectStatementCst {
            select_clause,
            from_clause,
            where_clause,
        })
    }

    fn select_clause(&mut self) -> Option<SelectClauseCst> {
        let rule = Rule::SelectClause;
        let select = self.consume(TokenKind::Select, rule)?;
        let mut identifiers = vec![self.consume(TokenKind::Identifier, rule)?];
        let mut commas = Vec::new();
        while self.at(TokenKind::Comma) {
            commas.push(self.consume(TokenKind::Comma, rule)?);
            identifiers.push(self.consume(TokenKind::Identifier, rule)?);
        }
        Some(SelectClauseCst {
            select,
            identifiers,
            commas,
        })
    }

    fn from_clause(&mut self) -> Option<FromClauseCst> {
        let rule = Rule::FromClause;
        Some(FromClauseCst {
            from: self.consume(TokenKind::From, rule)?,
            identifier: self.consume(TokenKind::Identifier, rule)?,
        })
    }

    fn where_clause(&mut self) -> Option<WhereClauseCst> {
        Some(WhereClauseCst {
            where_token: self.consume(TokenKind::Where, Rule::WhereClause)?,
            expression: self.expression()?,
        })
    }

    fn expression(&mut self) -> Option<ExpressionCst> {
        Some(ExpressionCst {
            lhs: self.atomic_expression()?,
            operator: self.relational_operator()?,
            rhs: self.atomic_expression()?,
        })
    }

    fn atomic_expression(&mut self) -> Option<AtomicExpressionCst> {
        let token = self.choose(&ATOMIC_EXPRESSIONS, Rule::AtomicExpression)?;
        Some(match token.kind {
            TokenKind::Integer => AtomicExpressionCst::Integer(token),
            _ => AtomicExpressionCst::Identifier(token),
        })
    }

    fn relational_operator(&mut self) -> Option<RelationalOperatorCst> {
        let token = self.choose(&RELATIONAL_OPERATORS, Rule::RelationalOperator)?;
        Some(match token.kind {
            TokenKind::Equal => RelationalOperatorCst::Equal(token),
            TokenKind::LessThan => RelationalOperatorCst::LessThan(token),
            _ => RelationalOperatorCst::GreaterThan(token),
        })
    }

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.cursor)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek().is_some_and(|tok| tok.kind == kind)
    }

    fn eof_position(&self) -> usize {
        self.tokens.last().map_or(0, |tok| tok.span.end)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.peek()?.clone();
        self.cursor += 1;
        Some(token)
    }

    fn consume(&mut self, kind: TokenKind, rule: Rule) -> Option<Token> {
        if self.at(kind) {
            return self.advance();
        }
        let found = self.peek().cloned();
        self.record(ParseError::mismatched(rule, kind, found, self.eof_position()));
        None
    }

    fn choose(&mut self, alternatives: &[TokenKind], rule: Rule) -> Option<Token> {
        if alternatives.iter().any(|kind| self.at(*kind)) {
            return self.advance();
        }
        let found = self.peek().cloned();
        self.record(ParseError::no_viable_alternative(
            rule,
            alternatives,
            found,
            self.eof_position(),
        ));
        None
    }

    fn record(&mut self, error: ParseError) {
        debug!(rule = %error.rule, position = error.position, message = %error.message, "parse error");
        self.errors.push(error);
    }
}

/// Recognise `tokens` as a `selectStatement`.
///
/// Returns `None` for the CST only when the mandatory `SELECT`/`FROM` part
/// could not be completed; a broken `WHERE` clause is reported and dropped.
pub fn parse(tokens: &[Token]) -> (Option<SelectStatementCst>, Vec<ParseError>) {
    Recognizer::new(tokens).select_statement()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::tokenize;

    fn run(sql: &str) -> (Option<SelectStatementCst>, Vec<ParseError>) {
        let (tokens, _) = tokenize(sql);
        parse(&tokens)
    }

    #[test]
    fn parse_simple_select() {
        let (cst, errors) = run("SELECT a, b, c FROM t");
        assert!(errors.is_empty());
        let cst = cst.unwrap();
        let columns: Vec<_> = cst
            .select_clause
            .identifiers
            .iter()
            .map(|t| t.lexeme.as_str())
            .collect();
        assert_eq!(columns, vec!["a", "b", "c"]);
        assert_eq!(cst.select_clause.commas.len(), 2);
        assert_eq!(cst.from_clause.identifier.lexeme, "t");
        assert!(cst.where_clause.is_none());
    }

    #[test]
    fn parse_where_clause() {
        let (cst, errors) = run("SELECT a FROM t WHERE a < b");
        assert!(errors.is_empty());
        let expression = cst.unwrap().where_clause.unwrap().expression;
        assert!(matches!(expression.lhs, AtomicExpressionCst::Identifier(ref t) if t.lexeme == "a"));
        assert!(matches!(expression.operator, RelationalOperatorCst::LessThan(_)));
        assert!(matches!(expression.rhs, AtomicExpressionCst::Identifier(ref t) if t.lexeme == "b"));
    }

    #[test]
    fn missing_from_aborts_statement() {
        let (cst, errors) = run("SELECT a WHERE a = 1");
        assert!(cst.is_none());
        assert_eq!(errors.len(), 1);
        let err = &errors[0];
        assert_eq!(err.kind, ParseErrorKind::MismatchedToken);
        assert_eq!(err.rule, Rule::FromClause);
        assert_eq!(err.expected, vec![TokenKind::From]);
        assert_eq!(err.found.as_ref().map(|t| t.kind), Some(TokenKind::Where));
        assert_eq!(err.position(), 9);
        assert_eq!(err.span(), Span { start: 9, end: 14 });
        assert_eq!(
            err.message(),
            "Expecting token of type --> From <-- but found --> 'WHERE' <--"
        );
    }

    #[test]
    fn keyword_as_column_is_rejected() {
        let (cst, errors) = run("SELECT SELECT FROM t");
        assert!(cst.is_none());
        assert_eq!(errors[0].rule, Rule::SelectClause);
        assert_eq!(errors[0].expected, vec![TokenKind::Identifier]);
        assert_eq!(errors[0].found.as_ref().map(|t| t.kind), Some(TokenKind::Select));
    }

    #[test]
    fn trailing_comma_fails_select_clause() {
        let (cst, errors) = run("SELECT a, FROM t");
        assert!(cst.is_none());
        assert_eq!(errors[0].expected, vec![TokenKind::Identifier]);
        assert_eq!(errors[0].position(), 10);
    }

    #[test]
    fn empty_input_reports_eof() {
        let (cst, errors) = run("");
        assert!(cst.is_none());
        assert!(errors[0].found.is_none());
        assert_eq!(errors[0].position(), 0);
        assert_eq!(
            errors[0].message(),
            "Expecting token of type --> Select <-- but found --> '<EOF>' <--"
        );
    }

    #[test]
    fn broken_where_keeps_statement() {
        let (cst, errors) = run("SELECT a FROM t WHERE a");
        let cst = cst.unwrap();
        assert!(cst.where_clause.is_none());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ParseErrorKind::NoViableAlternative);
        assert_eq!(errors[0].rule, Rule::RelationalOperator);
        assert_eq!(
            errors[0].expected,
            vec![TokenKind::Equal, TokenKind::LessThan, TokenKind::GreaterThan]
        );
        assert_eq!(errors[0].position(), 23);
        assert_eq!(errors[0].span(), Span { start: 23, end: 23 });
        assert_eq!(
            errors[0].message(),
            "Expecting: one of these possibilities: [Equal, LessThan, GreaterThan] but found: '<EOF>'"
        );
    }

    #[test]
    fn bad_operand_reports_alternatives() {
        let (cst, errors) = run("SELECT a FROM t WHERE a = FROM");
        assert!(cst.unwrap().where_clause.is_none());
        assert_eq!(errors[0].rule, Rule::AtomicExpression);
        assert_eq!(errors[0].expected, vec![TokenKind::Integer, TokenKind::Identifier]);
        assert_eq!(
            errors[0].message(),
            "Expecting: one of these possibilities: [Integer, Identifier] but found: 'FROM'"
        );
    }

    #[test]
    fn group_by_is_redundant_input() {
        let (cst, errors) = run("SELECT a FROM t GROUP BY a");
        assert!(cst.is_some());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ParseErrorKind::RedundantInput);
        assert_eq!(errors[0].position(), 16);
        assert_eq!(
            errors[0].message(),
            "Redundant input, expecting EOF but found: 'GROUP BY'"
        );
    }

    #[test]
    fn recognizers_do_not_share_state() {
        let (bad, _) = tokenize("SELECT FROM");
        let (good, _) = tokenize("SELECT a FROM t");
        assert_eq!(Recognizer::new(&bad).select_statement().1.len(), 1);
        assert!(Recognizer::new(&good).select_statement().1.is_empty());
    }
}
