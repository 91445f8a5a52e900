//! Filter translation
//!
//! Drives the conversion of a framework [`Filter`] into a connector's native
//! query type. Connectors implement only the `create_*_expression` hooks for
//! the filter kinds they can represent; every other kind is untranslatable
//! (`None`) and is left to client-side filtering.

use crate::operation::Filter;

/// Translates framework filters into a connector-native query type `T`.
///
/// The `not` flag passed to the leaf hooks reflects the number of enclosing
/// [`Filter::Not`] nodes (odd means negated). Negated `And`/`Or` nodes are
/// rewritten by De Morgan's laws before the combination hooks are called, so
/// combination hooks never see a negation of their own.
pub trait FilterTranslator<T> {
    /// Translate a filter, returning `None` when it cannot be represented.
    fn translate(&self, filter: &Filter) -> Option<T> {
        self.translate_internal(filter, false)
    }

    #[doc(hidden)]
    fn translate_internal(&self, filter: &Filter, not: bool) -> Option<T> {
        match filter {
            Filter::Not { filter } => self.translate_internal(filter, !not),
            Filter::And { filters } if not => self.combine_or(filters, true),
            Filter::And { filters } => self.combine_and(filters, false),
            Filter::Or { filters } if not => self.combine_and(filters, true),
            Filter::Or { filters } => self.combine_or(filters, false),
            Filter::Equals { attribute, value } => {
                self.create_equals_expression(attribute, value, not)
            }
            Filter::Contains { attribute, value } => {
                self.create_contains_expression(attribute, value, not)
            }
            Filter::StartsWith { attribute, value } => {
                self.create_starts_with_expression(attribute, value, not)
            }
            Filter::EndsWith { attribute, value } => {
                self.create_ends_with_expression(attribute, value, not)
            }
            Filter::GreaterThan { attribute, value } => {
                self.create_greater_than_expression(attribute, value, not)
            }
            Filter::GreaterThanOrEquals { attribute, value } => {
                self.create_greater_than_or_equal_expression(attribute, value, not)
            }
            Filter::LessThan { attribute, value } => {
                self.create_less_than_expression(attribute, value, not)
            }
            Filter::LessThanOrEquals { attribute, value } => {
                self.create_less_than_or_equal_expression(attribute, value, not)
            }
            Filter::Present { attribute } => self.create_present_expression(attribute, not),
        }
    }

    #[doc(hidden)]
    fn combine_and(&self, filters: &[Filter], not: bool) -> Option<T> {
        let mut iter = filters.iter();
        let first = self.translate_internal(iter.next()?, not);
        iter.fold(first, |left, next| {
            let right = self.translate_internal(next, not);
            self.create_and_expression(left, right)
        })
    }

    #[doc(hidden)]
    fn combine_or(&self, filters: &[Filter], not: bool) -> Option<T> {
        let mut iter = filters.iter();
        let first = self.translate_internal(iter.next()?, not);
        iter.fold(first, |left, next| {
            let right = self.translate_internal(next, not);
            self.create_or_expression(left, right)
        })
    }

    /// Combine two translated operands with AND.
    fn create_and_expression(&self, _left: Option<T>, _right: Option<T>) -> Option<T> {
        None
    }

    /// Combine two translated operands with OR.
    fn create_or_expression(&self, _left: Option<T>, _right: Option<T>) -> Option<T> {
        None
    }

    fn create_equals_expression(&self, _attribute: &str, _value: &str, _not: bool) -> Option<T> {
        None
    }

    fn create_contains_expression(&self, _attribute: &str, _value: &str, _not: bool) -> Option<T> {
        None
    }

    fn create_starts_with_expression(
        &self,
        _attribute: &str,
        _value: &str,
        _not: bool,
    ) -> Option<T> {
        None
    }

    fn create_ends_with_expression(&self, _attribute: &str, _value: &str, _not: bool) -> Option<T> {
        None
    }

    fn create_greater_than_expression(
        &self,
        _attribute: &str,
        _value: &str,
        _not: bool,
    ) -> Option<T> {
        None
    }

    fn create_greater_than_or_equal_expression(
        &self,
        _attribute: &str,
        _value: &str,
        _not: bool,
    ) -> Option<T> {
        None
    }

    fn create_less_than_expression(&self, _attribute: &str, _value: &str, _not: bool) -> Option<T> {
        None
    }

    fn create_less_than_or_equal_expression(
        &self,
        _attribute: &str,
        _value: &str,
        _not: bool,
    ) -> Option<T> {
        None
    }

    fn create_present_expression(&self, _attribute: &str, _not: bool) -> Option<T> {
        None
    }
}
