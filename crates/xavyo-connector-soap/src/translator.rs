//! Filter translator
//!
//! Converts framework filters into the [`Operand`] tree.

use xavyo_connector::filter::FilterTranslator;

use crate::operand::{ComparisonOperator, Operand};

/// Translates framework filters into [`Operand`]s.
///
/// Comparisons with a blank value are untranslatable. An AND or OR with an
/// untranslatable side is itself untranslatable. Greater-or-equal and
/// less-or-equal have no operator of their own: they are expressed as the
/// opposite strict comparison with the negation flag inverted.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebServiceFilterTranslator;

impl WebServiceFilterTranslator {
    pub fn new() -> Self {
        Self
    }

    fn comparison(
        operator: ComparisonOperator,
        attribute: &str,
        value: &str,
        negated: bool,
    ) -> Option<Operand> {
        if value.trim().is_empty() {
            return None;
        }
        Some(Operand::leaf(operator, attribute, value, negated))
    }
}

impl FilterTranslator<Operand> for WebServiceFilterTranslator {
    fn create_and_expression(&self, left: Option<Operand>, right: Option<Operand>) -> Option<Operand> {
        Some(Operand::and(left?, right?))
    }

    fn create_or_expression(&self, left: Option<Operand>, right: Option<Operand>) -> Option<Operand> {
        Some(Operand::or(left?, right?))
    }

    fn create_equals_expression(&self, attribute: &str, value: &str, not: bool) -> Option<Operand> {
        Self::comparison(ComparisonOperator::Equals, attribute, value, not)
    }

    fn create_contains_expression(&self, attribute: &str, value: &str, not: bool) -> Option<Operand> {
        Self::comparison(ComparisonOperator::Contains, attribute, value, not)
    }

    fn create_starts_with_expression(
        &self,
        attribute: &str,
        value: &str,
        not: bool,
    ) -> Option<Operand> {
        Self::comparison(ComparisonOperator::Starts, attribute, value, not)
    }

    fn create_ends_with_expression(&self, attribute: &str, value: &str, not: bool) -> Option<Operand> {
        Self::comparison(ComparisonOperator::Ends, attribute, value, not)
    }

    fn create_greater_than_expression(
        &self,
        attribute: &str,
        value: &str,
        not: bool,
    ) -> Option<Operand> {
        Self::comparison(ComparisonOperator::GreaterThan, attribute, value, not)
    }

    fn create_greater_than_or_equal_expression(
        &self,
        attribute: &str,
        value: &str,
        not: bool,
    ) -> Option<Operand> {
        Self::comparison(ComparisonOperator::LessThan, attribute, value, !not)
    }

    fn create_less_than_expression(&self, attribute: &str, value: &str, not: bool) -> Option<Operand> {
        Self::comparison(ComparisonOperator::LessThan, attribute, value, not)
    }

    fn create_less_than_or_equal_expression(
        &self,
        attribute: &str,
        value: &str,
        not: bool,
    ) -> Option<Operand> {
        Self::comparison(ComparisonOperator::GreaterThan, attribute, value, !not)
    }
}
