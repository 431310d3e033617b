//! Selector model and the filter/sort mini-language used by `find` commands
//!
//! Filters are written `<field><op><value>`:
//!
//! | op   | operator                |
//! |------|-------------------------|
//! | `=`  | `EQUALS`                |
//! | `~`  | `CONTAINS`              |
//! | `!~` | `NOT_CONTAINS`          |
//! | `@`  | `IN` (comma separated)  |
//! | `>`  | `GREATER_THAN`          |
//! | `<`  | `LESS_THAN`             |
//! | `>=` | `GREATER_THAN_OR_EQUAL` |
//! | `<=` | `LESS_THAN_OR_EQUAL`    |
//!
//! Sorts are written `<field>` or `<field>:asc|desc`.

use serde::{Deserialize, Serialize};

/// Page size used when a command does not ask for one
pub const DEFAULT_PAGE_LIMIT: u32 = 1000;

/// Filter operators understood by `find` endpoints
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operator {
    Equals,
    Contains,
    NotContains,
    In,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
}

impl Operator {
    /// Operator tokens in match priority: two-character ones first
    const TOKENS: [(&'static str, Operator); 8] = [
        (">=", Operator::GreaterThanOrEqual),
        ("<=", Operator::LessThanOrEqual),
        ("!~", Operator::NotContains),
        ("=", Operator::Equals),
        ("~", Operator::Contains),
        ("@", Operator::In),
        (">", Operator::GreaterThan),
        ("<", Operator::LessThan),
    ];
}

/// One filter condition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    /// Parse a direction token; anything unrecognized is ascending
    pub fn parse(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "desc" | "descending" => SortOrder::Descending,
            _ => SortOrder::Ascending,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderByItem {
    pub field: String,
    pub sort_order: SortOrder,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pagination {
    pub offset: u32,
    pub limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

/// Body of a `<resource>/find` request
///
/// Serialized as `{conditions, orderBy, pagination: {offset, limit}}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Selector {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<OrderByItem>,
    pub pagination: Pagination,
}

impl Selector {
    /// Build a selector from command-line filter and sort tokens
    pub fn from_tokens<F, S>(filters: F, sorts: S, limit: u32) -> Self
    where
        F: IntoIterator,
        F::Item: AsRef<str>,
        S: IntoIterator,
        S::Item: AsRef<str>,
    {
        Self {
            conditions: parse_filters(filters),
            order_by: parse_sorts(sorts),
            pagination: Pagination { offset: 0, limit },
        }
    }

    /// Copy of this selector starting at `offset`
    pub fn at_offset(&self, offset: u32) -> Self {
        let mut next = self.clone();
        next.pagination.offset = offset;
        next
    }
}

/// Parse one filter token
///
/// Returns `None` when no operator appears after a non-empty field name.
pub fn parse_filter(token: &str) -> Option<Condition> {
    Operator::TOKENS.iter().find_map(|(symbol, operator)| {
        match token.find(symbol) {
            Some(idx) if idx > 0 => {
                let field = &token[..idx];
                let value = &token[idx + symbol.len()..];
                let values = if *operator == Operator::In {
                    value.split(',').map(str::to_string).collect()
                } else {
                    vec![value.to_string()]
                };
                Some(Condition {
                    field: field.to_string(),
                    operator: *operator,
                    values,
                })
            }
            _ => None,
        }
    })
}

/// Parse filter tokens, skipping malformed ones
///
/// Skipped tokens are logged at `warn` level but never abort the command.
pub fn parse_filters<I>(tokens: I) -> Vec<Condition>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    tokens
        .into_iter()
        .filter_map(|token| {
            let token = token.as_ref();
            let condition = parse_filter(token);
            if condition.is_none() {
                tracing::warn!("Ignoring filter without an operator: {:?}", token);
            }
            condition
        })
        .collect()
}

/// Parse one sort token (`field` or `field:direction`)
pub fn parse_sort(token: &str) -> OrderByItem {
    match token.split_once(':') {
        Some((field, direction)) => OrderByItem {
            field: field.to_string(),
            sort_order: SortOrder::parse(direction),
        },
        None => OrderByItem {
            field: token.to_string(),
            sort_order: SortOrder::Ascending,
        },
    }
}

pub fn parse_sorts<I>(tokens: I) -> Vec<OrderByItem>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    tokens.into_iter().map(|t| parse_sort(t.as_ref())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cond(field: &str, operator: Operator, values: &[&str]) -> Condition {
        Condition {
            field: field.to_string(),
            operator,
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    #[test]
    fn test_equals() {
        assert_eq!(
            parse_filter("status=ENABLED"),
            Some(cond("status", Operator::Equals, &["ENABLED"]))
        );
    }

    #[test]
    fn test_greater_than() {
        assert_eq!(
            parse_filter("id>1000"),
            Some(cond("id", Operator::GreaterThan, &["1000"]))
        );
    }

    #[test]
    fn test_in_splits_on_commas() {
        assert_eq!(
            parse_filter("status@ENABLED,PAUSED"),
            Some(cond("status", Operator::In, &["ENABLED", "PAUSED"]))
        );
    }

    #[test]
    fn test_not_contains_beats_contains() {
        assert_eq!(
            parse_filter("name!~Test"),
            Some(cond("name", Operator::NotContains, &["Test"]))
        );
    }

    #[test]
    fn test_two_char_comparisons() {
        assert_eq!(
            parse_filter("dailyBudgetAmount>=50"),
            Some(cond("dailyBudgetAmount", Operator::GreaterThanOrEqual, &["50"]))
        );
        assert_eq!(
            parse_filter("id<=7"),
            Some(cond("id", Operator::LessThanOrEqual, &["7"]))
        );
        assert_eq!(parse_filter("id<7"), Some(cond("id", Operator::LessThan, &["7"])));
    }

    #[test]
    fn test_contains() {
        assert_eq!(
            parse_filter("name~Brand"),
            Some(cond("name", Operator::Contains, &["Brand"]))
        );
    }

    #[test]
    fn test_value_may_contain_other_operators() {
        // "=" is tried before "~", so the value keeps its tilde
        assert_eq!(
            parse_filter("name=a~b"),
            Some(cond("name", Operator::Equals, &["a~b"]))
        );
    }

    #[test]
    fn test_empty_value_is_kept() {
        assert_eq!(
            parse_filter("name="),
            Some(cond("name", Operator::Equals, &[""]))
        );
    }

    #[test]
    fn test_operator_at_start_is_rejected() {
        assert_eq!(parse_filter("=ENABLED"), None);
        assert_eq!(parse_filter("status"), None);
    }

    #[test]
    fn test_malformed_filters_are_skipped() {
        let conditions = parse_filters(["status=ENABLED", "garbage", "=x", "id>5"]);
        assert_eq!(conditions.len(), 2);
        assert_eq!(conditions[0].field, "status");
        assert_eq!(conditions[1].field, "id");
    }

    #[test]
    fn test_sorts() {
        assert_eq!(
            parse_sort("name:asc"),
            OrderByItem { field: "name".to_string(), sort_order: SortOrder::Ascending }
        );
        assert_eq!(
            parse_sort("name"),
            OrderByItem { field: "name".to_string(), sort_order: SortOrder::Ascending }
        );
        assert_eq!(
            parse_sort("name:desc"),
            OrderByItem { field: "name".to_string(), sort_order: SortOrder::Descending }
        );
        assert_eq!(parse_sort("name:DESC").sort_order, SortOrder::Descending);
        assert_eq!(parse_sort("name:sideways").sort_order, SortOrder::Ascending);
    }

    #[test]
    fn test_selector_wire_format() {
        let selector = Selector::from_tokens(["status@ENABLED,PAUSED"], ["name:desc"], 20);
        let json = serde_json::to_value(&selector).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "conditions": [
                    {"field": "status", "operator": "IN", "values": ["ENABLED", "PAUSED"]}
                ],
                "orderBy": [{"field": "name", "sortOrder": "DESCENDING"}],
                "pagination": {"offset": 0, "limit": 20}
            })
        );
    }

    #[test]
    fn test_operator_names() {
        let names: Vec<String> = Operator::TOKENS
            .iter()
            .map(|(_, op)| serde_json::to_value(op).unwrap().as_str().unwrap().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "GREATER_THAN_OR_EQUAL",
                "LESS_THAN_OR_EQUAL",
                "NOT_CONTAINS",
                "EQUALS",
                "CONTAINS",
                "IN",
                "GREATER_THAN",
                "LESS_THAN"
            ]
        );
    }

    #[test]
    fn test_at_offset_keeps_conditions() {
        let selector = Selector::from_tokens(["id>1"], ["name"], 5);
        let next = selector.at_offset(10);
        assert_eq!(next.pagination, Pagination { offset: 10, limit: 5 });
        assert_eq!(next.conditions, selector.conditions);
        assert_eq!(next.order_by, selector.order_by);
    }
}
