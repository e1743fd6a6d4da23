//! Identifier sanitization and quoting.
//!
//! Every name that crosses from archive metadata into the SQLite namespace
//! (table, column and key names) goes through [`sanitize_identifier`], and every
//! identifier emitted into SQL text goes through [`quote_identifier`].

/// Prefix applied to identifiers that would start with a digit
pub const NUMERIC_PREFIX: &str = "col_";

/// Replacement for identifiers that sanitize to nothing
pub const EMPTY_IDENTIFIER: &str = "unnamed";

/// Sanitize a metadata name into a target identifier.
///
/// # Rules
///
/// - Every character that is not alphanumeric or `_` becomes `_`
/// - A result starting with a digit is prefixed with `col_`
/// - An empty result becomes `unnamed`
///
/// The function is idempotent: sanitizing an already sanitized name returns it
/// unchanged.
///
/// # Examples
///
/// ```
/// use siard_sqlite::validation::sanitize_identifier;
///
/// assert_eq!(sanitize_identifier("order date"), "order_date");
/// assert_eq!(sanitize_identifier("2nd"), "col_2nd");
/// assert_eq!(sanitize_identifier(""), "unnamed");
/// ```
pub fn sanitize_identifier(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    if cleaned.is_empty() {
        return EMPTY_IDENTIFIER.to_string();
    }
    if cleaned.starts_with(|c: char| c.is_numeric()) {
        return format!("{}{}", NUMERIC_PREFIX, cleaned);
    }
    cleaned
}

/// Quote an identifier for SQLite, doubling embedded quote characters.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Sanitize a string for safe use in descriptions.
///
/// Removes control characters except newlines and tabs.
pub fn sanitize_description(desc: &str) -> String {
    desc.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t' || *c == '\r')
        .collect()
}
