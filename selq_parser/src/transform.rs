//! CST to AST lowering.

use crate::ast::{Expression, Operand, RelationalOperator, SelectStatement};
use crate::cst::{
    AtomicExpressionCst, ExpressionCst, RelationalOperatorCst, Rule, SelectClauseCst,
    SelectStatementCst,
};
use crate::parser::ParseError;
use crate::token::TokenKind;

/// Fold a recognised statement into its AST.
///
/// A comparison whose left operand is not a column is reported in the
/// returned errors and left out of the statement.
pub fn to_ast(cst: &SelectStatementCst) -> (SelectStatement, Vec<ParseError>) {
    let mut errors = Vec::new();
    let where_clause = cst
        .where_clause
        .as_ref()
        .and_then(|clause| match expression(&clause.expression) {
            Ok(expr) => Some(expr),
            Err(err) => {
                errors.push(err);
                None
            }
        });

    let statement = SelectStatement {
        columns: columns(&cst.select_clause),
        table: cst.from_clause.identifier.lexeme.clone(),
        where_clause,
    };
    (statement, errors)
}

fn columns(clause: &SelectClauseCst) -> Vec<String> {
    clause.identifiers.iter().map(|tok| tok.lexeme.clone()).collect()
}

fn expression(cst: &ExpressionCst) -> Result<Expression, ParseError> {
    let lhs = match &cst.lhs {
        AtomicExpressionCst::Identifier(tok) => tok.lexeme.clone(),
        AtomicExpressionCst::Integer(tok) => {
            return Err(ParseError::mismatched(
                Rule::Expression,
                TokenKind::Identifier,
                Some(tok.clone()),
                tok.span.end,
            ))
        }
    };
    Ok(Expression {
        lhs,
        operator: operator(&cst.operator),
        rhs: operand(&cst.rhs),
    })
}

fn operator(cst: &RelationalOperatorCst) -> RelationalOperator {
    match cst {
        RelationalOperatorCst::Equal(_) => RelationalOperator::Equal,
        RelationalOperatorCst::LessThan(_) => RelationalOperator::LessThan,
        RelationalOperatorCst::GreaterThan(_) => RelationalOperator::GreaterThan,
    }
}

fn operand(cst: &AtomicExpressionCst) -> Operand {
    match cst {
        AtomicExpressionCst::Integer(tok) => Operand::Integer(tok.lexeme.clone()),
        AtomicExpressionCst::Identifier(tok) => Operand::Identifier(tok.lexeme.clone()),
    }
}
