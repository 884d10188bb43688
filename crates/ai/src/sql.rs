use thiserror::Error;

/// Why generated SQL was refused. The validator is the trust boundary for
/// LLM output; every check fails closed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SqlRejection {
    #[error("empty SQL generated by LLM")]
    Empty,
    #[error("disallowed SQL keyword {0:?} in generated query")]
    DisallowedKeyword(&'static str),
    #[error("only SELECT queries are allowed")]
    NotSelect,
    #[error("multiple statements or semicolons are not allowed")]
    MultiStatement,
    #[error("query must target solana.swaps table")]
    WrongTable,
}

// Trailing space so only full keywords match, not identifiers like
// "created_at".
const DISALLOWED_KEYWORDS: [&str; 10] = [
    "INSERT ", "UPDATE ", "DELETE ", "DROP ", "ALTER ", "TRUNCATE ", "CREATE ", "RENAME ",
    "ATTACH ", "DETACH ",
];

/// Strips code fences, a leading `sql` language tag and one trailing
/// semicolon from raw LLM output.
pub fn sanitize_sql(raw: &str) -> String {
    let mut sql = raw.trim();

    if let Some(stripped) = sql.strip_prefix("```") {
        sql = strip_sql_tag(stripped.trim());
    }
    sql = strip_sql_tag(sql.trim()).trim();

    if let Some(idx) = sql.find("```") {
        sql = &sql[..idx];
    }

    let sql = sql.trim();
    let sql = sql.strip_suffix(';').unwrap_or(sql);
    sql.trim().to_string()
}

fn strip_sql_tag(sql: &str) -> &str {
    match sql.get(..3) {
        Some(tag) if tag.eq_ignore_ascii_case("sql") => &sql[3..],
        _ => sql,
    }
}

/// Conservative safety policy for generated SQL: a single SELECT against the
/// swaps table, nothing else.
pub fn validate_sql(sql: &str) -> Result<(), SqlRejection> {
    if sql.is_empty() {
        return Err(SqlRejection::Empty);
    }

    let upper = sql.trim().to_uppercase();

    for keyword in DISALLOWED_KEYWORDS {
        if upper.contains(keyword) {
            return Err(SqlRejection::DisallowedKeyword(keyword));
        }
    }

    if !upper.starts_with("SELECT") {
        return Err(SqlRejection::NotSelect);
    }

    if sql.contains(';') {
        return Err(SqlRejection::MultiStatement);
    }

    if !upper.contains("FROM SWAPS") && !upper.contains("FROM SOLANA.SWAPS") {
        return Err(SqlRejection::WrongTable);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_code_fences_and_language_tag() {
        assert_eq!(
            sanitize_sql("```sql\nSELECT * FROM swaps\n```"),
            "SELECT * FROM swaps"
        );
        assert_eq!(
            sanitize_sql("```\nSELECT * FROM swaps\n```"),
            "SELECT * FROM swaps"
        );
        assert_eq!(
            sanitize_sql("```SQL SELECT pair FROM swaps```"),
            "SELECT pair FROM swaps"
        );
    }

    #[test]
    fn sanitize_strips_single_trailing_semicolon() {
        assert_eq!(sanitize_sql("SELECT 1 FROM swaps;"), "SELECT 1 FROM swaps");
        assert_eq!(
            sanitize_sql("  SELECT 1 FROM swaps ;  "),
            "SELECT 1 FROM swaps"
        );
    }

    #[test]
    fn sanitize_cuts_trailing_commentary_after_fence() {
        assert_eq!(
            sanitize_sql("SELECT pair FROM swaps\n```\nThis query lists pairs."),
            "SELECT pair FROM swaps"
        );
    }

    #[test]
    fn sanitize_leaves_plain_queries_alone() {
        assert_eq!(
            sanitize_sql("SELECT count() FROM solana.swaps"),
            "SELECT count() FROM solana.swaps"
        );
    }

    #[test]
    fn validate_accepts_selects_against_swaps() {
        validate_sql("SELECT pair, price FROM swaps WHERE price > 0").unwrap();
        validate_sql("select sum(amount_out) from solana.swaps").unwrap();
        validate_sql("SELECT dex, count() FROM swaps GROUP BY dex ORDER BY count() DESC LIMIT 5")
            .unwrap();
    }

    #[test]
    fn validate_rejects_empty() {
        assert_eq!(validate_sql(""), Err(SqlRejection::Empty));
    }

    #[test]
    fn validate_rejects_non_select() {
        assert_eq!(
            validate_sql("SHOW TABLES FROM swaps"),
            Err(SqlRejection::NotSelect)
        );
        assert_eq!(
            validate_sql("WITH x AS (SELECT 1) SELECT * FROM swaps"),
            Err(SqlRejection::NotSelect)
        );
    }

    #[test]
    fn validate_rejects_every_disallowed_keyword() {
        let cases = [
            ("SELECT 1 FROM swaps; INSERT INTO swaps VALUES (1)", "INSERT "),
            ("SELECT * FROM swaps WHERE 1=1 UPDATE swaps SET x=1", "UPDATE "),
            ("SELECT 1 FROM swaps WHERE delete everything", "DELETE "),
            ("DROP TABLE swaps", "DROP "),
            ("SELECT 1 FROM swaps union alter table x", "ALTER "),
            ("truncate TABLE swaps", "TRUNCATE "),
            ("SELECT 1 FROM swaps WHERE create table", "CREATE "),
            ("SELECT 1 FROM swaps rename to y", "RENAME "),
            ("SELECT 1 FROM swaps attach partition p", "ATTACH "),
            ("SELECT 1 FROM swaps detach partition p", "DETACH "),
        ];
        for (sql, keyword) in cases {
            let expected = DISALLOWED_KEYWORDS
                .iter()
                .copied()
                .find(|k| *k == keyword)
                .unwrap();
            assert_eq!(
                validate_sql(sql),
                Err(SqlRejection::DisallowedKeyword(expected)),
                "{sql}"
            );
        }
    }

    #[test]
    fn validate_keyword_match_is_case_insensitive() {
        assert_eq!(
            validate_sql("SELECT 1 FROM swaps where Drop table"),
            Err(SqlRejection::DisallowedKeyword("DROP "))
        );
    }

    #[test]
    fn validate_keyword_requires_trailing_space() {
        // Column names that merely contain a keyword must pass.
        validate_sql("SELECT created_total, updated_count FROM swaps").unwrap();
    }

    #[test]
    fn validate_rejects_embedded_semicolons() {
        assert_eq!(
            validate_sql("SELECT 1 FROM swaps; SELECT 2 FROM swaps"),
            Err(SqlRejection::MultiStatement)
        );
    }

    #[test]
    fn validate_rejects_other_tables() {
        assert_eq!(
            validate_sql("SELECT x FROM other_table"),
            Err(SqlRejection::WrongTable)
        );
    }

    #[test]
    fn drop_table_statement_reports_the_keyword_rule() {
        // The sanitizer strips the trailing semicolon before validation.
        let sql = sanitize_sql("DROP TABLE swaps;");
        assert_eq!(
            validate_sql(&sql),
            Err(SqlRejection::DisallowedKeyword("DROP "))
        );
    }
}
