//! Concrete syntax tree.
//!
//! Every grammar rule has its own node type holding exactly the tokens and
//! sub-rules it consumed; optional parts are `Option`s filled in while the
//! recognizer runs. [`CstRule::to_node`] flattens any of them into the generic
//! [`CstNode`] shape (rule name plus role-keyed children) for dumping.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::token::{Token, TokenKind};

/// Grammar rules, named as they appear in diagnostics and CST dumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Rule {
    /// `selectClause fromClause whereClause?`
    SelectStatement,
    /// `SELECT Identifier (COMMA Identifier)*`
    SelectClause,
    /// `FROM Identifier`
    FromClause,
    /// `WHERE expression`
    WhereClause,
    /// `atomicExpression[lhs] relationalOperator atomicExpression[rhs]`
    Expression,
    /// `Integer | Identifier`
    AtomicExpression,
    /// `EQUAL | LESS_THAN | GREATER_THAN`
    RelationalOperator,
}

impl Rule {
    /// Rule name as written in the grammar.
    pub fn name(self) -> &'static str {
        match self {
            Rule::SelectStatement => "selectStatement",
            Rule::SelectClause => "selectClause",
            Rule::FromClause => "fromClause",
            Rule::WhereClause => "whereClause",
            Rule::Expression => "expression",
            Rule::AtomicExpression => "atomicExpression",
            Rule::RelationalOperator => "relationalOperator",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `selectStatement := selectClause fromClause whereClause?`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectStatementCst {
    /// Mandatory projection clause.
    pub select_clause: SelectClauseCst,
    /// Mandatory table clause.
    pub from_clause: FromClauseCst,
    /// Present only when a `WHERE` clause was recognised in full.
    pub where_clause: Option<WhereClauseCst>,
}

/// `selectClause := SELECT Identifier (COMMA Identifier)*`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectClauseCst {
    /// The `SELECT` keyword.
    pub select: Token,
    /// Column identifiers in source order; never empty.
    pub identifiers: Vec<Token>,
    /// Separators between the identifiers.
    pub commas: Vec<Token>,
}

/// `fromClause := FROM Identifier`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FromClauseCst {
    /// The `FROM` keyword.
    pub from: Token,
    /// Table identifier.
    pub identifier: Token,
}

/// `whereClause := WHERE expression`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhereClauseCst {
    /// The `WHERE` keyword.
    pub where_token: Token,
    /// The comparison.
    pub expression: ExpressionCst,
}

/// `expression := atomicExpression[lhs] relationalOperator atomicExpression[rhs]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressionCst {
    /// Left operand (`lhs` role).
    pub lhs: AtomicExpressionCst,
    /// Comparison operator.
    pub operator: RelationalOperatorCst,
    /// Right operand (`rhs` role).
    pub rhs: AtomicExpressionCst,
}

/// `atomicExpression := Integer | Identifier`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtomicExpressionCst {
    /// Integer literal alternative.
    Integer(Token),
    /// Identifier alternative.
    Identifier(Token),
}

impl AtomicExpressionCst {
    /// The consumed token, whichever alternative matched.
    pub fn token(&self) -> &Token {
        match self {
            AtomicExpressionCst::Integer(tok) | AtomicExpressionCst::Identifier(tok) => tok,
        }
    }
}

/// `relationalOperator := EQUAL | LESS_THAN | GREATER_THAN`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationalOperatorCst {
    /// `=`
    Equal(Token),
    /// `<`
    LessThan(Token),
    /// `>`
    GreaterThan(Token),
}

impl RelationalOperatorCst {
    /// The consumed token, whichever alternative matched.
    pub fn token(&self) -> &Token {
        match self {
            RelationalOperatorCst::Equal(tok)
            | RelationalOperatorCst::LessThan(tok)
            | RelationalOperatorCst::GreaterThan(tok) => tok,
        }
    }
}

/// Child of a generic [`CstNode`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CstElement {
    /// Consumed token.
    Token(Token),
    /// Sub-rule node.
    Node(CstNode),
}

/// Generic CST node: the rule name and its children keyed by role.
///
/// Roles are token kind names (`Identifier`, `Comma`, ...), sub-rule names
/// (`fromClause`, ...) or the labels `lhs`/`rhs` inside `expression`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CstNode {
    /// Rule that produced the node.
    pub rule: Rule,
    /// Children grouped by role, each group in consumption order.
    pub children: BTreeMap<&'static str, Vec<CstElement>>,
}

impl CstNode {
    fn new(rule: Rule) -> Self {
        Self {
            rule,
            children: BTreeMap::new(),
        }
    }

    fn push_token(&mut self, token: &Token) {
        self.push_token_as(token.kind.name(), token);
    }

    fn push_token_as(&mut self, role: &'static str, token: &Token) {
        self.children
            .entry(role)
            .or_default()
            .push(CstElement::Token(token.clone()));
    }

    fn push_node(&mut self, role: &'static str, node: CstNode) {
        self.children.entry(role).or_default().push(CstElement::Node(node));
    }

    /// Children stored under `role`, empty if the role is absent.
    pub fn role(&self, role: &str) -> &[CstElement] {
        self.children.get(role).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Lexemes of the tokens stored directly under `role`.
    pub fn lexemes(&self, role: &str) -> Vec<&str> {
        self.role(role)
            .iter()
            .filter_map(|child| match child {
                CstElement::Token(tok) => Some(tok.lexeme.as_str()),
                CstElement::Node(_) => None,
            })
            .collect()
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        writeln!(f, "{:indent$}{}", "", self.rule, indent = depth * 2)?;
        for (role, elements) in &self.children {
            for element in elements {
                match element {
                    CstElement::Token(tok) => writeln!(
                        f,
                        "{:indent$}{role}: {} '{}' @{}",
                        "",
                        tok.kind,
                        tok.lexeme,
                        tok.span.start,
                        indent = (depth + 1) * 2
                    )?,
                    CstElement::Node(node) => {
                        writeln!(f, "{:indent$}{role}:", "", indent = (depth + 1) * 2)?;
                        node.write_indented(f, depth + 2)?;
                    }
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for CstNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

/// A typed CST node that can be viewed as a generic [`CstNode`].
pub trait CstRule {
    /// Grammar rule this node was built by.
    const RULE: Rule;

    /// Generic role-keyed view of this node.
    fn to_node(&self) -> CstNode;
}

impl CstRule for SelectStatementCst {
    const RULE: Rule = Rule::SelectStatement;

    fn to_node(&self) -> CstNode {
        let mut node = CstNode::new(Self::RULE);
        node.push_node(Rule::SelectClause.name(), self.select_clause.to_node());
        node.push_node(Rule::FromClause.name(), self.from_clause.to_node());
        if let Some(where_clause) = &self.where_clause {
            node.push_node(Rule::WhereClause.name(), where_clause.to_node());
        }
        node
    }
}

impl CstRule for SelectClauseCst {
    const RULE: Rule = Rule::SelectClause;

    fn to_node(&self) -> CstNode {
        let mut node = CstNode::new(Self::RULE);
        node.push_token(&self.select);
        for ident in &self.identifiers {
            node.push_token(ident);
        }
        for comma in &self.commas {
            node.push_token(comma);
        }
        node
    }
}

impl CstRule for FromClauseCst {
    const RULE: Rule = Rule::FromClause;

    fn to_node(&self) -> CstNode {
        let mut node = CstNode::new(Self::RULE);
        node.push_token(&self.from);
        node.push_token(&self.identifier);
        node
    }
}

impl CstRule for WhereClauseCst {
    const RULE: Rule = Rule::WhereClause;

    fn to_node(&self) -> CstNode {
        let mut node = CstNode::new(Self::RULE);
        node.push_token(&self.where_token);
        node.push_node(Rule::Expression.name(), self.expression.to_node());
        node
    }
}

impl CstRule for ExpressionCst {
    const RULE: Rule = Rule::Expression;

    fn to_node(&self) -> CstNode {
        let mut node = CstNode::new(Self::RULE);
        node.push_node("lhs", self.lhs.to_node());
        node.push_node(Rule::RelationalOperator.name(), self.operator.to_node());
        node.push_node("rhs", self.rhs.to_node());
        node
    }
}

impl CstRule for AtomicExpressionCst {
    const RULE: Rule = Rule::AtomicExpression;

    fn to_node(&self) -> CstNode {
        let mut node = CstNode::new(Self::RULE);
        node.push_token(self.token());
        node
    }
}

impl CstRule for RelationalOperatorCst {
    const RULE: Rule = Rule::RelationalOperator;

    fn to_node(&self) -> CstNode {
        let mut node = CstNode::new(Self::RULE);
        node.push_token(self.token());
        node
    }
}

/// Kinds a `relationalOperator` may start with, in alternative order.
pub(crate) const RELATIONAL_OPERATORS: [TokenKind; 3] =
    [TokenKind::Equal, TokenKind::LessThan, TokenKind::GreaterThan];

/// Kinds an `atomicExpression` may start with, in alternative order.
pub(crate) const ATOMIC_EXPRESSIONS: [TokenKind; 2] = [TokenKind::Integer, TokenKind::Identifier];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::token::tokenize;

    fn statement(sql: &str) -> SelectStatementCst {
        let (tokens, _) = tokenize(sql);
        parse(&tokens).0.expect("statement should parse")
    }

    fn only_node(elements: &[CstElement]) -> &CstNode {
        match elements {
            [CstElement::Node(node)] => node,
            other => panic!("expected a single node, got {other:?}"),
        }
    }

    #[test]
    fn statement_roles_without_where() {
        let node = statement("SELECT a, b FROM t").to_node();
        assert_eq!(node.rule, Rule::SelectStatement);
        let roles: Vec<_> = node.children.keys().copied().collect();
        assert_eq!(roles, vec!["fromClause", "selectClause"]);

        let select = only_node(node.role("selectClause"));
        assert_eq!(select.lexemes("Identifier"), vec!["a", "b"]);
        assert_eq!(select.lexemes("Comma"), vec![","]);
        assert_eq!(select.lexemes("Select"), vec!["SELECT"]);
    }

    #[test]
    fn expression_uses_lhs_rhs_labels() {
        let node = statement("SELECT a FROM t WHERE id > 5").to_node();
        let where_clause = only_node(node.role("whereClause"));
        let expression = only_node(where_clause.role("expression"));
        let roles: Vec<_> = expression.children.keys().copied().collect();
        assert_eq!(roles, vec!["lhs", "relationalOperator", "rhs"]);

        assert_eq!(only_node(expression.role("lhs")).lexemes("Identifier"), vec!["id"]);
        assert_eq!(only_node(expression.role("rhs")).lexemes("Integer"), vec!["5"]);
        assert_eq!(
            only_node(expression.role("relationalOperator")).lexemes("GreaterThan"),
            vec![">"]
        );
    }

    #[test]
    fn missing_role_is_empty() {
        let node = statement("SELECT a FROM t").to_node();
        assert!(node.role("whereClause").is_empty());
    }

    #[test]
    fn display_is_indented_tree() {
        let dump = statement("SELECT a FROM t").to_node().to_string();
        let expected = "\
selectStatement
  fromClause:
    fromClause
      From: From 'FROM' @9
      Identifier: Identifier 't' @14
  selectClause:
    selectClause
      Identifier: Identifier 'a' @7
      Select: Select 'SELECT' @0
";
        assert_eq!(dump, expected);
    }
}
