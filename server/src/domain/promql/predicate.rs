//! Label matcher to SQL predicate translation
//!
//! `__name__` and `service_name` compare against dedicated columns. Any other
//! label may have been recorded either on the resource or on the data point,
//! so the predicate checks both attribute maps:
//!
//! - positive operators (`=`, `=~`) hold if the label matches in either map
//! - negative operators (`!=`, `!~`) must hold in every map carrying the label;
//!   a map without the label satisfies them

use super::types::{LabelMatcher, METRIC_NAME_LABEL, MatchOp, SERVICE_NAME_LABEL};
use crate::utils::sql::quote_literal;

pub const METRIC_NAME_COLUMN: &str = "MetricName";
pub const SERVICE_NAME_COLUMN: &str = "ServiceName";
pub const RESOURCE_ATTRIBUTES_COLUMN: &str = "ResourceAttributes";
pub const ATTRIBUTES_COLUMN: &str = "Attributes";

/// Build the SQL boolean fragment for one matcher
pub fn build_predicate(matcher: &LabelMatcher) -> String {
    match matcher.name.as_str() {
        METRIC_NAME_LABEL => column_predicate(METRIC_NAME_COLUMN, matcher),
        SERVICE_NAME_LABEL => column_predicate(SERVICE_NAME_COLUMN, matcher),
        _ => attribute_predicate(matcher),
    }
}

fn column_predicate(column: &str, matcher: &LabelMatcher) -> String {
    let value = quote_literal(&matcher.value);
    match matcher.op {
        MatchOp::Equal => format!("{} = {}", column, value),
        MatchOp::NotEqual => format!("{} != {}", column, value),
        MatchOp::RegexMatch => format!("match({}, {})", column, value),
        MatchOp::RegexNotMatch => format!("NOT match({}, {})", column, value),
    }
}

fn attribute_predicate(matcher: &LabelMatcher) -> String {
    let key = quote_literal(&matcher.name);
    let value = quote_literal(&matcher.value);

    let in_map = |map: &str| -> String {
        match matcher.op {
            MatchOp::Equal => format!("(mapContains({map}, {key}) AND {map}[{key}] = {value})"),
            MatchOp::NotEqual => format!(
                "(NOT mapContains({map}, {key}) OR {map}[{key}] != {value})"
            ),
            MatchOp::RegexMatch => format!(
                "(mapContains({map}, {key}) AND match({map}[{key}], {value}))"
            ),
            MatchOp::RegexNotMatch => format!(
                "(NOT mapContains({map}, {key}) OR NOT match({map}[{key}], {value}))"
            ),
        }
    };

    let join = match matcher.op {
        MatchOp::Equal | MatchOp::RegexMatch => "OR",
        MatchOp::NotEqual | MatchOp::RegexNotMatch => "AND",
    };

    format!(
        "{} {} {}",
        in_map(RESOURCE_ATTRIBUTES_COLUMN),
        join,
        in_map(ATTRIBUTES_COLUMN)
    )
}
