//! SelQ SQL-subset parser crate.
//!
//! Turns `SELECT col[, col...] FROM table [WHERE lhs op rhs]` text into a
//! [`SelectStatement`] in three forward-only stages: [`tokenize`],
//! [`parse`] and [`to_ast`]. [`parse_select_statement`] runs all three and
//! always returns both error lists next to the (optional) AST.
#![deny(missing_docs)]

mod ast;
mod cst;
mod token;
mod transform;

pub mod parser;

pub use ast::*;
pub use cst::{
    AtomicExpressionCst, CstElement, CstNode, CstRule, ExpressionCst, FromClauseCst,
    RelationalOperatorCst, Rule, SelectClauseCst, SelectStatementCst, WhereClauseCst,
};
pub use parser::{parse, ParseError, ParseErrorKind, Recognizer};
pub use token::{tokenize, LexError, Lexer, Span, Token, TokenKind};
pub use transform::to_ast;

use serde::Serialize;
use tracing::{debug, instrument};

/// Result of [`parse_select_statement`].
///
/// `ast` is only trustworthy when `parse_errors` is empty. Lexical errors do
/// not prevent an AST on their own, so check both lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseOutput {
    /// The statement, if its `SELECT` and `FROM` parts were recognised.
    pub ast: Option<SelectStatement>,
    /// Characters the lexer skipped.
    pub lex_errors: Vec<LexError>,
    /// Grammar violations in the order they were found.
    pub parse_errors: Vec<ParseError>,
}

impl ParseOutput {
    /// `true` when an AST was produced and no error of either kind occurred.
    pub fn is_ok(&self) -> bool {
        self.ast.is_some() && self.lex_errors.is_empty() && self.parse_errors.is_empty()
    }

    /// The one error worth showing first: the first parse error, else the
    /// first lexical error. Returns `(message, span)`.
    pub fn first_error(&self) -> Option<(String, Span)> {
        if let Some(err) = self.parse_errors.first() {
            return Some((err.message().to_string(), err.span()));
        }
        self.lex_errors
            .first()
            .map(|err| (err.message(), err.span()))
    }

    /// Assemble the output from stages the caller already ran: the result of
    /// [`tokenize`] and of [`parse`] over those tokens. The CST, when present,
    /// is lowered with [`to_ast`].
    pub fn from_stages(
        cst: Option<&SelectStatementCst>,
        lex_errors: Vec<LexError>,
        mut parse_errors: Vec<ParseError>,
    ) -> Self {
        let ast = cst.map(|cst| {
            let (ast, errors) = to_ast(cst);
            parse_errors.extend(errors);
            ast
        });
        debug!(ast = ast.is_some(), parse_errors = parse_errors.len(), "parsed");

        Self {
            ast,
            lex_errors,
            parse_errors,
        }
    }
}

/// Parse `input` as a single SELECT statement.
///
/// Each call builds its own lexer and recognizer, so concurrent calls never
/// observe each other's state.
#[instrument(level = "debug", skip_all, fields(input_len = input.len()))]
pub fn parse_select_statement(input: &str) -> ParseOutput {
    let (tokens, lex_errors) = tokenize(input);
    debug!(tokens = tokens.len(), lex_errors = lex_errors.len(), "tokenized");

    let (cst, parse_errors) = parse(&tokens);
    ParseOutput::from_stages(cst.as_ref(), lex_errors, parse_errors)
}
