//! SQL utility functions

/// Escape a value for use inside a single-quoted ClickHouse string literal.
///
/// Backslashes are escaped before quotes, so the backslash added in front of
/// a quote is never doubled.
///
/// # Example
///
/// ```
/// use promhouse_server::utils::sql::escape_string_literal;
///
/// assert_eq!(escape_string_literal("it's"), "it\\'s");
/// ```
pub fn escape_string_literal(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Render `s` as a quoted, escaped string literal
pub fn quote_literal(s: &str) -> String {
    format!("'{}'", escape_string_literal(s))
}
