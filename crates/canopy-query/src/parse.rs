//! Condition parser.
//!
//! Two passes over the query text:
//! 1. `<field> IN (<values>)` clauses, removed from the text once captured
//! 2. `<field> <op> <value>` comparisons in what is left
//!
//! Fragments matching neither pattern (`AND`, `ORDER BY ...`, stray words)
//! produce no condition.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
    GtEq,
    LtEq,
    Gt,
    Lt,
    Contains,
    In,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::NotEq => "!=",
            Operator::GtEq => ">=",
            Operator::LtEq => "<=",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Contains => "~",
            Operator::In => "IN",
        }
    }

    fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "=" => Some(Operator::Eq),
            "!=" => Some(Operator::NotEq),
            ">=" => Some(Operator::GtEq),
            "<=" => Some(Operator::LtEq),
            ">" => Some(Operator::Gt),
            "<" => Some(Operator::Lt),
            "~" => Some(Operator::Contains),
            _ => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionValue {
    Single(String),
    List(Vec<String>),
}

impl ConditionValue {
    pub fn values(&self) -> &[String] {
        match self {
            ConditionValue::Single(value) => std::slice::from_ref(value),
            ConditionValue::List(values) => values,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    pub value: ConditionValue,
}

fn in_clause_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b([a-z_][\w.]*)\s+IN\s*\(([^)]*)\)").expect("IN-clause regex must compile")
    })
}

fn comparison_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)\b([a-z_][\w.]*)\s*(!=|>=|<=|=|>|<|~)\s*("[^"]*"|'[^']*'|\S+)"#)
            .expect("comparison regex must compile")
    })
}

/// Parse a query into conditions. Blank input yields no conditions.
pub fn parse(query: &str) -> Vec<Condition> {
    if query.trim().is_empty() {
        return Vec::new();
    }

    let mut conditions = Vec::new();

    for captures in in_clause_re().captures_iter(query) {
        let values = captures[2]
            .split(',')
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .map(strip_quotes)
            .collect();
        conditions.push(Condition {
            field: captures[1].to_string(),
            operator: Operator::In,
            value: ConditionValue::List(values),
        });
    }

    let remainder = in_clause_re().replace_all(query, " ");
    for captures in comparison_re().captures_iter(&remainder) {
        let Some(operator) = Operator::from_symbol(&captures[2]) else {
            continue;
        };
        conditions.push(Condition {
            field: captures[1].to_string(),
            operator,
            value: ConditionValue::Single(strip_quotes(&captures[3])),
        });
    }

    tracing::trace!(query, conditions = conditions.len(), "parsed query");
    conditions
}

fn strip_quotes(raw: &str) -> String {
    let trimmed = raw.trim();
    for quote in ['"', '\''] {
        if trimmed.len() >= 2 && trimmed.starts_with(quote) && trimmed.ends_with(quote) {
            return trimmed[1..trimmed.len() - 1].to_string();
        }
    }
    trimmed.trim_matches(['"', '\'']).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(field: &str, operator: Operator, value: &str) -> Condition {
        Condition {
            field: field.to_string(),
            operator,
            value: ConditionValue::Single(value.to_string()),
        }
    }

    #[test]
    fn blank_query_has_no_conditions() {
        assert!(parse("").is_empty());
        assert!(parse("   \t").is_empty());
    }

    #[test]
    fn comparisons_accept_quoted_and_bare_values() {
        let conditions =
            parse(r#"type = Bug AND summary ~ "login page" AND assignee != 'u-2' AND storyPoints >= 3"#);
        assert_eq!(
            conditions,
            vec![
                single("type", Operator::Eq, "Bug"),
                single("summary", Operator::Contains, "login page"),
                single("assignee", Operator::NotEq, "u-2"),
                single("storyPoints", Operator::GtEq, "3"),
            ]
        );
    }

    #[test]
    fn in_clause_is_extracted_before_comparisons() {
        let conditions = parse(r#"project = PHX AND status in ("To Do", 'In Progress', Done)"#);
        assert_eq!(
            conditions,
            vec![
                Condition {
                    field: "status".to_string(),
                    operator: Operator::In,
                    value: ConditionValue::List(vec![
                        "To Do".to_string(),
                        "In Progress".to_string(),
                        "Done".to_string(),
                    ]),
                },
                single("project", Operator::Eq, "PHX"),
            ]
        );
    }

    #[test]
    fn operators_without_spaces_parse() {
        assert_eq!(
            parse("priority!=Low created<2024-02-01"),
            vec![
                single("priority", Operator::NotEq, "Low"),
                single("created", Operator::Lt, "2024-02-01"),
            ]
        );
    }

    #[test]
    fn unparseable_fragments_produce_no_conditions() {
        assert!(parse("ORDER BY created DESC").is_empty());
        assert!(parse("just some words").is_empty());
        assert_eq!(
            parse("type = Bug OR").len(),
            1,
            "dangling OR is ignored rather than failing"
        );
    }
}
