//! Operand tree
//!
//! Native query representation produced by [`crate::translator`]. A leaf is a
//! single attribute comparison; a composite joins a set of operands with AND
//! or OR. Composite children are kept in a canonical set, so structurally
//! identical children collapse to one and equality does not depend on
//! insertion order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Comparison performed by a leaf operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComparisonOperator {
    Equals,
    Contains,
    Starts,
    Ends,
    GreaterThan,
    LessThan,
}

impl ComparisonOperator {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOperator::Equals => "EQUALS",
            ComparisonOperator::Contains => "CONTAINS",
            ComparisonOperator::Starts => "STARTS",
            ComparisonOperator::Ends => "ENDS",
            ComparisonOperator::GreaterThan => "GREATER_THAN",
            ComparisonOperator::LessThan => "LESS_THAN",
        }
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logical operator joining the children of a composite operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogicalOperator {
    And,
    Or,
}

impl LogicalOperator {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalOperator::And => "AND",
            LogicalOperator::Or => "OR",
        }
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single attribute comparison.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Comparison {
    operator: ComparisonOperator,
    attribute_name: String,
    value: String,
    negated: bool,
}

impl Comparison {
    pub fn operator(&self) -> ComparisonOperator {
        self.operator
    }

    pub fn attribute_name(&self) -> &str {
        &self.attribute_name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }
}

/// Operands joined by a logical operator.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Composite {
    operator: LogicalOperator,
    children: BTreeSet<Operand>,
}

impl Composite {
    pub fn operator(&self) -> LogicalOperator {
        self.operator
    }

    /// Children in canonical order.
    pub fn children(&self) -> &BTreeSet<Operand> {
        &self.children
    }
}

/// Node of a boolean query expression.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    Leaf(Comparison),
    Composite(Composite),
}

impl Operand {
    /// Create a leaf comparison.
    pub fn leaf(
        operator: ComparisonOperator,
        attribute_name: impl Into<String>,
        value: impl Into<String>,
        negated: bool,
    ) -> Self {
        Operand::Leaf(Comparison {
            operator,
            attribute_name: attribute_name.into(),
            value: value.into(),
            negated,
        })
    }

    /// Create a composite; duplicate children are collapsed.
    pub fn composite(operator: LogicalOperator, children: impl IntoIterator<Item = Operand>) -> Self {
        Operand::Composite(Composite {
            operator,
            children: children.into_iter().collect(),
        })
    }

    /// Join two operands with AND.
    pub fn and(left: Operand, right: Operand) -> Self {
        Self::composite(LogicalOperator::And, [left, right])
    }

    /// Join two operands with OR.
    pub fn or(left: Operand, right: Operand) -> Self {
        Self::composite(LogicalOperator::Or, [left, right])
    }

    pub fn as_leaf(&self) -> Option<&Comparison> {
        match self {
            Operand::Leaf(leaf) => Some(leaf),
            Operand::Composite(_) => None,
        }
    }

    pub fn as_composite(&self) -> Option<&Composite> {
        match self {
            Operand::Leaf(_) => None,
            Operand::Composite(composite) => Some(composite),
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, Operand::Composite(_))
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Leaf(leaf) => {
                f.write_str("(")?;
                if leaf.negated {
                    f.write_str("NOT ")?;
                }
                write!(f, "{} {} {:?})", leaf.operator, leaf.attribute_name, leaf.value)
            }
            Operand::Composite(composite) => {
                write!(f, "({}", composite.operator)?;
                for child in &composite.children {
                    write!(f, " {child}")?;
                }
                f.write_str(")")
            }
        }
    }
}
