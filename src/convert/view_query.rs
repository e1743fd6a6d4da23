//! View query translation into the SQLite dialect
//!
//! Best effort: the rewrite is purely textual and the store has the final say
//! when the view is created.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_CREATE_VIEW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^\s*CREATE\b.*?\bVIEW\b.*?\bAS\b\s*(.*)$").expect("Invalid regex")
});

static RE_ALGORITHM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bALGORITHM\s*=\s*\w+\s*").expect("Invalid regex"));

static RE_DEFINER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)\bDEFINER\s*=\s*(?:`[^`]*`|'[^']*'|"[^"]*"|[^\s@]+)\s*@\s*(?:`[^`]*`|'[^']*'|"[^"]*"|\S+)\s*"#,
    )
    .expect("Invalid regex")
});

static RE_SQL_SECURITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bSQL\s+SECURITY\s+(?:DEFINER|INVOKER)\s*").expect("Invalid regex")
});

static RE_TOP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(\s*SELECT\s+(?:DISTINCT\s+|ALL\s+)?)TOP\s*(?:\(\s*\d+\s*\)|\d+)\s*(?:PERCENT\s+)?(?:WITH\s+TIES\s+)?")
        .expect("Invalid regex")
});

static RE_LIMIT_OFFSET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bLIMIT\s+(\d+)\s+OFFSET\s+(\d+)").expect("Invalid regex")
});

static RE_TRUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\btrue\b").expect("Invalid regex"));

static RE_FALSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bfalse\b").expect("Invalid regex"));

/// Rewrite a foreign-dialect view definition into a SQLite `SELECT`
///
/// Steps, in order: keep only the body of a `CREATE ... VIEW ... AS`
/// statement, drop `ALGORITHM`/`DEFINER`/`SQL SECURITY` clauses, remove
/// backticks, drop a leading `TOP n`, swap `LIMIT a OFFSET b` operands, turn
/// `true`/`false` into `1`/`0` and strip one trailing `;`.
///
/// # Example
///
/// ```
/// use siard_sqlite::convert::view_query::translate;
///
/// let sql = "CREATE ALGORITHM=UNDEFINED VIEW v AS SELECT a,b FROM t WHERE flag=true LIMIT 5 OFFSET 2;";
/// assert_eq!(translate(sql), "SELECT a,b FROM t WHERE flag=1 LIMIT 2 OFFSET 5");
/// ```
pub fn translate(original: &str) -> String {
    let body = extract_select(original);
    let body = strip_vendor_clauses(&body);
    let body = body.replace('`', "");
    let body = RE_TOP.replace(&body, "${1}").into_owned();
    let body = RE_LIMIT_OFFSET
        .replace_all(&body, "LIMIT ${2} OFFSET ${1}")
        .into_owned();
    let body = replace_outside_literals(&body, |segment| {
        let segment = RE_TRUE.replace_all(segment, "1");
        RE_FALSE.replace_all(&segment, "0").into_owned()
    });
    strip_terminator(&body)
}

/// Body of a `CREATE ... VIEW ... AS` statement; other text is returned as is
fn extract_select(sql: &str) -> String {
    RE_CREATE_VIEW
        .captures(sql)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| sql.to_string())
}

fn strip_vendor_clauses(sql: &str) -> String {
    let sql = RE_ALGORITHM.replace_all(sql, "");
    let sql = RE_DEFINER.replace_all(&sql, "");
    RE_SQL_SECURITY.replace_all(&sql, "").into_owned()
}

/// Apply `rewrite` to the parts of `sql` outside single-quoted literals
fn replace_outside_literals(sql: &str, rewrite: impl Fn(&str) -> String) -> String {
    let mut out = String::with_capacity(sql.len());
    // odd-indexed parts sit inside quotes; '' escapes split into an empty part
    for (i, part) in sql.split('\'').enumerate() {
        if i > 0 {
            out.push('\'');
        }
        if i % 2 == 0 {
            out.push_str(&rewrite(part));
        } else {
            out.push_str(part);
        }
    }
    out
}

fn strip_terminator(sql: &str) -> String {
    let trimmed = sql.trim();
    trimmed
        .strip_suffix(';')
        .map(str::trim_end)
        .unwrap_or(trimmed)
        .to_string()
}
