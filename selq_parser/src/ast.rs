use std::fmt;

use serde::Serialize;

/// A parsed `SELECT ... FROM ... [WHERE ...]` statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectStatement {
    /// Projected column names in source order.
    pub columns: Vec<String>,
    /// Table name.
    pub table: String,
    /// Optional single comparison.
    #[serde(rename = "where")]
    pub where_clause: Option<Expression>,
}

/// `lhs operator rhs` comparison. The left side is always a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Expression {
    /// Column name on the left.
    pub lhs: String,
    /// Comparison operator.
    pub operator: RelationalOperator,
    /// Literal or column on the right.
    pub rhs: Operand,
}

/// Comparison operator, serialised as its source spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RelationalOperator {
    /// `=`
    #[serde(rename = "=")]
    Equal,
    /// `<`
    #[serde(rename = "<")]
    LessThan,
    /// `>`
    #[serde(rename = ">")]
    GreaterThan,
}

impl RelationalOperator {
    /// Source spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            RelationalOperator::Equal => "=",
            RelationalOperator::LessThan => "<",
            RelationalOperator::GreaterThan => ">",
        }
    }
}

/// Right-hand operand, serialised as its lexeme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Operand {
    /// Integer literal, kept verbatim.
    Integer(String),
    /// Column name.
    Identifier(String),
}

impl Operand {
    /// The operand's lexeme.
    pub fn as_str(&self) -> &str {
        match self {
            Operand::Integer(text) | Operand::Identifier(text) => text,
        }
    }
}

impl fmt::Display for RelationalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.lhs, self.operator, self.rhs)
    }
}

/// Renders the statement back as canonical SQL.
impl fmt::Display for SelectStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT {} FROM {}", self.columns.join(", "), self.table)?;
        if let Some(expr) = &self.where_clause {
            write!(f, " WHERE {expr}")?;
        }
        Ok(())
    }
}
