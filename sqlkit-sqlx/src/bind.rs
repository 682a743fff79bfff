//! Named-parameter expansion and batch splitting.
//!
//! Statements reference parameters as `:Name` or `@Name`; the expander
//! rewrites them to the driver's placeholder syntax and collects the bound
//! values in reference order. String literals, quoted identifiers, comments,
//! and `::` casts are left untouched.

use sqlkit::{DataError, SqlParams, Value};

/// Placeholder syntax used by the underlying driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Placeholder {
    /// `?`, used by SQLite and MySQL.
    Positional,
    /// `$1`, `$2`, ..., used by PostgreSQL.
    Numbered,
}

pub(crate) fn placeholder_for(driver: &str) -> Placeholder {
    if driver == "PostgreSQL" {
        Placeholder::Numbered
    } else {
        Placeholder::Positional
    }
}

/// A statement rewritten to driver placeholders plus its values in bind
/// order. Repeated references bind the value once per occurrence.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ExpandedSql {
    pub sql: String,
    pub values: Vec<Value>,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Rewrite `:Name` / `@Name` references to driver placeholders.
///
/// Parameter names resolve case-insensitively against the bag; a reference
/// with no matching parameter is an [`DataError::InvalidInput`]. Parameters
/// in the bag that the statement never references are simply not bound.
pub(crate) fn expand(
    sql: &str,
    params: &SqlParams,
    placeholder: Placeholder,
) -> Result<ExpandedSql, DataError> {
    let chars: Vec<char> = sql.chars().collect();
    let mut out = String::with_capacity(sql.len());
    let mut values = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            // String literal; '' is an escaped quote.
            '\'' => {
                out.push(c);
                i += 1;
                while i < chars.len() {
                    out.push(chars[i]);
                    if chars[i] == '\'' {
                        if chars.get(i + 1) == Some(&'\'') {
                            out.push('\'');
                            i += 2;
                            continue;
                        }
                        i += 1;
                        break;
                    }
                    i += 1;
                }
            }
            // Quoted identifiers.
            '"' | '`' => {
                let quote = c;
                out.push(c);
                i += 1;
                while i < chars.len() {
                    out.push(chars[i]);
                    i += 1;
                    if chars[i - 1] == quote {
                        break;
                    }
                }
            }
            // Line comment.
            '-' if chars.get(i + 1) == Some(&'-') => {
                while i < chars.len() && chars[i] != '\n' {
                    out.push(chars[i]);
                    i += 1;
                }
            }
            // Block comment.
            '/' if chars.get(i + 1) == Some(&'*') => {
                out.push_str("/*");
                i += 2;
                while i < chars.len() {
                    if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
                        out.push_str("*/");
                        i += 2;
                        break;
                    }
                    out.push(chars[i]);
                    i += 1;
                }
            }
            // A `::` cast is not a parameter reference.
            ':' if chars.get(i + 1) == Some(&':') => {
                out.push_str("::");
                i += 2;
            }
            ':' | '@' if chars.get(i + 1).is_some_and(|&c| is_ident_start(c)) => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && is_ident(chars[end]) {
                    end += 1;
                }
                let name: String = chars[start..end].iter().collect();
                let value = params.get_ignore_case(&name).ok_or_else(|| {
                    DataError::InvalidInput(format!(
                        "statement references parameter '{name}' which is not in the parameter bag"
                    ))
                })?;
                values.push(value.clone());
                match placeholder {
                    Placeholder::Positional => out.push('?'),
                    Placeholder::Numbered => out.push_str(&format!("${}", values.len())),
                }
                i = end;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    Ok(ExpandedSql { sql: out, values })
}

/// Split a batch on top-level `;` into its statements, honoring the same
/// literal/comment rules as the expander. Empty fragments are dropped.
pub(crate) fn split_statements(sql: &str) -> Vec<String> {
    let chars: Vec<char> = sql.chars().collect();
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\'' => {
                current.push(c);
                i += 1;
                while i < chars.len() {
                    current.push(chars[i]);
                    if chars[i] == '\'' {
                        if chars.get(i + 1) == Some(&'\'') {
                            current.push('\'');
                            i += 2;
                            continue;
                        }
                        i += 1;
                        break;
                    }
                    i += 1;
                }
            }
            '"' | '`' => {
                let quote = c;
                current.push(c);
                i += 1;
                while i < chars.len() {
                    current.push(chars[i]);
                    i += 1;
                    if chars[i - 1] == quote {
                        break;
                    }
                }
            }
            '-' if chars.get(i + 1) == Some(&'-') => {
                while i < chars.len() && chars[i] != '\n' {
                    current.push(chars[i]);
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                current.push_str("/*");
                i += 2;
                while i < chars.len() {
                    if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
                        current.push_str("*/");
                        i += 2;
                        break;
                    }
                    current.push(chars[i]);
                    i += 1;
                }
            }
            ';' => {
                if !current.trim().is_empty() {
                    statements.push(current.trim().to_string());
                }
                current.clear();
                i += 1;
            }
            _ => {
                current.push(c);
                i += 1;
            }
        }
    }
    if !current.trim().is_empty() {
        statements.push(current.trim().to_string());
    }
    statements
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlkit::params;

    #[test]
    fn expands_named_parameters_positionally() {
        let params = params! { "Id" => 7i64, "Name" => "alice" };
        let expanded = expand(
            "SELECT * FROM t WHERE id = :Id AND name = @Name",
            &params,
            Placeholder::Positional,
        )
        .unwrap();
        assert_eq!(expanded.sql, "SELECT * FROM t WHERE id = ? AND name = ?");
        assert_eq!(
            expanded.values,
            vec![Value::Int(7), Value::Text("alice".to_string())]
        );
    }

    #[test]
    fn expands_named_parameters_numbered() {
        let params = params! { "A" => 1i64, "B" => 2i64 };
        let expanded = expand(
            "SELECT :A, :B, :A",
            &params,
            Placeholder::Numbered,
        )
        .unwrap();
        assert_eq!(expanded.sql, "SELECT $1, $2, $3");
        assert_eq!(
            expanded.values,
            vec![Value::Int(1), Value::Int(2), Value::Int(1)]
        );
    }

    #[test]
    fn parameter_names_resolve_case_insensitively() {
        let params = params! { "Skip" => 40i64 };
        let expanded = expand("LIMIT 10 OFFSET :skip", &params, Placeholder::Positional).unwrap();
        assert_eq!(expanded.values, vec![Value::Int(40)]);
    }

    #[test]
    fn unknown_parameter_reference_is_invalid_input() {
        let err = expand("SELECT :Missing", &params! {}, Placeholder::Positional).unwrap_err();
        assert!(matches!(err, DataError::InvalidInput(_)));
    }

    #[test]
    fn literals_comments_and_casts_are_left_alone() {
        let params = params! { "Id" => 1i64 };
        let sql = "SELECT ':NotAParam', \"col:name\" -- :also_not\nFROM t WHERE id = :Id::bigint /* :nor :this */";
        let expanded = expand(sql, &params, Placeholder::Numbered).unwrap();
        assert_eq!(
            expanded.sql,
            "SELECT ':NotAParam', \"col:name\" -- :also_not\nFROM t WHERE id = $1::bigint /* :nor :this */"
        );
        assert_eq!(expanded.values, vec![Value::Int(1)]);
    }

    #[test]
    fn escaped_quotes_stay_inside_the_literal() {
        let expanded = expand(
            "SELECT 'it''s :fine'",
            &params! {},
            Placeholder::Positional,
        )
        .unwrap();
        assert_eq!(expanded.sql, "SELECT 'it''s :fine'");
        assert!(expanded.values.is_empty());
    }

    #[test]
    fn unused_bag_entries_are_not_bound() {
        let params = params! { "Skip" => 40i64, "Take" => 20i64 };
        let expanded = expand("SELECT COUNT(*) FROM t", &params, Placeholder::Positional).unwrap();
        assert!(expanded.values.is_empty());
    }

    #[test]
    fn splits_on_top_level_semicolons_only() {
        let statements = split_statements(
            "SELECT COUNT(*) FROM t;SELECT 'a;b' FROM t; ;SELECT 1",
        );
        assert_eq!(
            statements,
            vec![
                "SELECT COUNT(*) FROM t",
                "SELECT 'a;b' FROM t",
                "SELECT 1",
            ]
        );
    }
}
