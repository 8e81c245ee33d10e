use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::error::SqlFacadeError;

static LEADING_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(SELECT|INSERT|UPDATE|DELETE)[ \t\r\n]").expect("leading keyword pattern is valid")
});

/// The four statement kinds the facade executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl QueryKind {
    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            QueryKind::Select => "SELECT",
            QueryKind::Insert => "INSERT",
            QueryKind::Update => "UPDATE",
            QueryKind::Delete => "DELETE",
        }
    }

    /// Classify a query by its leading keyword.
    ///
    /// The keyword must start at position 0 and be followed by an ASCII space, tab or line break;
    /// case is ignored.
    #[must_use]
    pub fn classify(sql: &str) -> Option<Self> {
        let caps = LEADING_KEYWORD.captures(sql)?;
        let keyword = caps.get(1)?.as_str();
        [
            QueryKind::Select,
            QueryKind::Insert,
            QueryKind::Update,
            QueryKind::Delete,
        ]
        .into_iter()
        .find(|kind| kind.keyword().eq_ignore_ascii_case(keyword))
    }

    /// Check that `sql` is a statement of this kind.
    ///
    /// # Errors
    ///
    /// Returns `SqlFacadeError::WrongQueryKind` when the leading keyword is missing or differs.
    pub fn ensure_matches(self, sql: &str) -> Result<(), SqlFacadeError> {
        if Self::classify(sql) == Some(self) {
            Ok(())
        } else {
            Err(SqlFacadeError::WrongQueryKind { expected: self })
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Query text meant for prepared execution.
///
/// The facade caches compiled statements by text, so two handles built from identical text
/// share one compiled statement. Cloning is cheap.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreparedQuery {
    sql: Arc<str>,
}

impl PreparedQuery {
    #[must_use]
    pub fn new(sql: impl Into<Arc<str>>) -> Self {
        Self { sql: sql.into() }
    }

    /// Access the raw SQL string.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [QueryKind; 4] = [
        QueryKind::Select,
        QueryKind::Insert,
        QueryKind::Update,
        QueryKind::Delete,
    ];

    #[test]
    fn classifies_leading_keyword_case_insensitively() {
        assert_eq!(QueryKind::classify("SELECT * FROM t"), Some(QueryKind::Select));
        assert_eq!(QueryKind::classify("insert into t VALUES (1)"), Some(QueryKind::Insert));
        assert_eq!(QueryKind::classify("Update t SET a = 1"), Some(QueryKind::Update));
        assert_eq!(QueryKind::classify("delete\tFROM t"), Some(QueryKind::Delete));
    }

    #[test]
    fn keyword_must_be_at_start_and_separated() {
        assert_eq!(QueryKind::classify(" SELECT 1"), None);
        assert_eq!(QueryKind::classify("SELECT"), None);
        assert_eq!(QueryKind::classify("SELECTED 1"), None);
        assert_eq!(QueryKind::classify("WITH x AS (SELECT 1) SELECT * FROM x"), None);
    }

    #[test]
    fn separator_is_ascii_whitespace_only() {
        assert_eq!(QueryKind::classify("SELECT\u{a0}1"), None);
        assert_eq!(QueryKind::classify("DELETE\u{3000}FROM t"), None);
        assert_eq!(QueryKind::classify("SELECT\n1"), Some(QueryKind::Select));
        assert_eq!(QueryKind::classify("UPDATE\r\nt SET a = 1"), Some(QueryKind::Update));
    }

    #[test]
    fn only_the_matching_kind_accepts_a_query() {
        let queries = [
            ("SELECT id FROM t", QueryKind::Select),
            ("INSERT INTO t (a) VALUES (1)", QueryKind::Insert),
            ("UPDATE t SET a = 2", QueryKind::Update),
            ("DELETE FROM t WHERE a = 2", QueryKind::Delete),
        ];
        for (sql, kind) in queries {
            for candidate in ALL {
                let res = candidate.ensure_matches(sql);
                if candidate == kind {
                    assert!(res.is_ok(), "{candidate} should accept {sql}");
                } else {
                    assert!(
                        matches!(res, Err(SqlFacadeError::WrongQueryKind { expected }) if expected == candidate),
                        "{candidate} should reject {sql}"
                    );
                }
            }
        }
    }

    #[test]
    fn prepared_queries_compare_by_text() {
        let a = PreparedQuery::new("SELECT 1 FROM t");
        let b = PreparedQuery::new(String::from("SELECT 1 FROM t"));
        assert_eq!(a, b);
        assert_eq!(a.sql(), "SELECT 1 FROM t");
    }
}
