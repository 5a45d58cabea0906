//! Condition evaluation.
//!
//! A record matches a query when it matches every condition; there is no OR.
//! Conditions on unknown fields are vacuously true, so a malformed query can
//! only widen the result set.

use crate::parse::{Condition, Operator, parse};
use crate::record::{FieldValue, QueryField, QueryRecord};
use canopy_store::{IssueStatus, IssueType};
use std::cmp::Ordering;

/// Evaluate one condition against one record.
pub fn evaluate<R: QueryRecord + ?Sized>(record: &R, condition: &Condition) -> bool {
    let Some(field) = QueryField::resolve(&condition.field) else {
        return true;
    };
    let expected = condition.value.values();

    match record.field_value(field) {
        FieldValue::Null => null_matches(condition.operator, expected),
        FieldValue::List(items) if items.is_empty() => null_matches(condition.operator, expected),
        FieldValue::List(items) => list_matches(condition.operator, &items, expected),
        FieldValue::Text(actual) => text_matches(field, condition.operator, &actual, expected),
    }
}

/// True when `record` satisfies every condition.
pub fn matches_all<R: QueryRecord + ?Sized>(record: &R, conditions: &[Condition]) -> bool {
    conditions
        .iter()
        .all(|condition| evaluate(record, condition))
}

/// Filter `records` by `query`, preserving their order.
pub fn search<'a, R: QueryRecord>(query: &str, records: &'a [R]) -> Vec<&'a R> {
    let conditions = parse(query);
    records
        .iter()
        .filter(|record| matches_all(*record, &conditions))
        .collect()
}

fn is_empty_expected(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value.eq_ignore_ascii_case("null") || value.eq_ignore_ascii_case("empty")
}

fn null_matches(operator: Operator, expected: &[String]) -> bool {
    let wants_empty = expected.iter().any(|value| is_empty_expected(value));
    match operator {
        Operator::Eq | Operator::In => wants_empty,
        Operator::NotEq => !wants_empty,
        Operator::GtEq | Operator::LtEq | Operator::Gt | Operator::Lt | Operator::Contains => false,
    }
}

fn normalize(field: QueryField, value: &str) -> String {
    let canonical: Option<&str> = match field {
        QueryField::Status => IssueStatus::parse(value).map(IssueStatus::as_str),
        QueryField::Type => IssueType::parse(value).map(IssueType::as_str),
        _ => None,
    };
    canonical.unwrap_or(value.trim()).to_lowercase()
}

fn text_matches(field: QueryField, operator: Operator, actual: &str, expected: &[String]) -> bool {
    let Some(first) = expected.first() else {
        return false;
    };
    match operator {
        Operator::Eq => normalize(field, actual) == normalize(field, first),
        Operator::NotEq => normalize(field, actual) != normalize(field, first),
        Operator::In => {
            let actual = normalize(field, actual);
            expected
                .iter()
                .any(|candidate| normalize(field, candidate) == actual)
        }
        Operator::Contains => actual
            .to_lowercase()
            .contains(&first.trim().to_lowercase()),
        Operator::GtEq => compare(actual, first).is_some_and(Ordering::is_ge),
        Operator::LtEq => compare(actual, first).is_some_and(Ordering::is_le),
        Operator::Gt => compare(actual, first) == Some(Ordering::Greater),
        Operator::Lt => compare(actual, first) == Some(Ordering::Less),
    }
}

fn list_matches(operator: Operator, items: &[String], expected: &[String]) -> bool {
    let items: Vec<String> = items.iter().map(|item| item.trim().to_lowercase()).collect();
    let contains = |value: &String| items.contains(&value.trim().to_lowercase());
    match operator {
        Operator::In => expected.iter().any(contains),
        Operator::Eq => expected.first().is_some_and(contains),
        Operator::NotEq => expected.first().is_some_and(|value| !contains(value)),
        Operator::Contains => expected.first().is_some_and(|value| {
            let needle = value.trim().to_lowercase();
            items.iter().any(|item| item.contains(&needle))
        }),
        Operator::GtEq | Operator::LtEq | Operator::Gt | Operator::Lt => false,
    }
}

/// Numeric when both sides parse as numbers, otherwise case-insensitive text.
fn compare(actual: &str, expected: &str) -> Option<Ordering> {
    let (actual, expected) = (actual.trim(), expected.trim());
    match (actual.parse::<f64>(), expected.parse::<f64>()) {
        (Ok(a), Ok(b)) => a.partial_cmp(&b),
        _ => Some(actual.to_lowercase().cmp(&expected.to_lowercase())),
    }
}
