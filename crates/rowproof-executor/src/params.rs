//! Named bind parameters
//!
//! Validation SQL is written with `:name` placeholders. Drivers that only
//! understand positional parameters get the statement rewritten to `$1..$n`,
//! with one position per distinct name.

use crate::adapter::ExecuteError;
use rowproof_core::{Value, VariableBag};

/// A statement rewritten from `:name` to positional parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedQuery {
    sql: String,
    names: Vec<String>,
}

impl NamedQuery {
    /// Rewrite `sql`, skipping `::` casts, quoted and dollar-quoted text,
    /// `--` comments and colons glued to a preceding word (`arr[lo:hi]`)
    pub fn parse(sql: &str) -> Self {
        let chars: Vec<char> = sql.chars().collect();
        let mut out = String::with_capacity(sql.len());
        let mut names: Vec<String> = Vec::new();
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            match c {
                '\'' | '"' => {
                    // Copy through the closing quote; doubled quotes reopen naturally
                    out.push(c);
                    i += 1;
                    while i < chars.len() {
                        out.push(chars[i]);
                        i += 1;
                        if chars[i - 1] == c {
                            break;
                        }
                    }
                }
                '$' if i == 0 || !is_word_char(chars[i - 1]) => match dollar_tag(&chars[i..]) {
                    Some(tag) => {
                        // Copy through the matching closing tag, or to the end
                        let body_start = i + tag.len();
                        let close = (body_start..chars.len())
                            .find(|&j| chars[j..].starts_with(&tag))
                            .map_or(chars.len(), |j| j + tag.len());
                        out.extend(&chars[i..close]);
                        i = close;
                    }
                    None => {
                        out.push(c);
                        i += 1;
                    }
                },
                '-' if chars.get(i + 1) == Some(&'-') => {
                    while i < chars.len() && chars[i] != '\n' {
                        out.push(chars[i]);
                        i += 1;
                    }
                }
                ':' if chars.get(i + 1) == Some(&':') => {
                    out.push_str("::");
                    i += 2;
                }
                ':' if (i == 0 || !is_word_char(chars[i - 1]))
                    && chars.get(i + 1).map_or(false, |n| n.is_ascii_alphabetic() || *n == '_') =>
                {
                    let start = i + 1;
                    let mut end = start;
                    while end < chars.len() && (chars[end].is_ascii_alphanumeric() || chars[end] == '_') {
                        end += 1;
                    }
                    let name: String = chars[start..end].iter().collect();
                    let position = match names.iter().position(|n| *n == name) {
                        Some(index) => index + 1,
                        None => {
                            names.push(name);
                            names.len()
                        }
                    };
                    out.push('$');
                    out.push_str(&position.to_string());
                    i = end;
                }
                _ => {
                    out.push(c);
                    i += 1;
                }
            }
        }

        Self { sql: out, names }
    }

    /// Statement with positional parameters
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Parameter names in position order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Look up the value for every position
    pub fn bind<'a>(&self, params: &'a VariableBag) -> Result<Vec<&'a Value>, ExecuteError> {
        self.names
            .iter()
            .map(|name| {
                params
                    .get(name)
                    .ok_or_else(|| ExecuteError::MissingParameter(name.clone()))
            })
            .collect()
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Opening delimiter of a dollar-quoted string (`$$` or `$tag$`)
fn dollar_tag(chars: &[char]) -> Option<Vec<char>> {
    let mut end = 1;
    while end < chars.len() && (chars[end].is_alphanumeric() || chars[end] == '_') {
        end += 1;
    }
    let starts_with_digit = chars.get(1).map_or(false, char::is_ascii_digit);
    if starts_with_digit || chars.get(end) != Some(&'$') {
        return None;
    }
    Some(chars[..=end].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rewrites_named_parameters() {
        let query = NamedQuery::parse(
            "SELECT status FROM policy WHERE policy_number = :policy AND term = :term",
        );
        assert_eq!(
            query.sql(),
            "SELECT status FROM policy WHERE policy_number = $1 AND term = $2"
        );
        assert_eq!(query.names(), ["policy", "term"]);
    }

    #[test]
    fn repeated_names_share_a_position() {
        let query = NamedQuery::parse("SELECT :a, :b, :a");
        assert_eq!(query.sql(), "SELECT $1, $2, $1");
        assert_eq!(query.names().len(), 2);
    }

    #[test]
    fn casts_literals_and_comments_are_untouched() {
        let query = NamedQuery::parse(
            "SELECT amount::numeric, ':skip', \"col:x\" -- :comment\nFROM t WHERE id = :id",
        );
        assert_eq!(
            query.sql(),
            "SELECT amount::numeric, ':skip', \"col:x\" -- :comment\nFROM t WHERE id = $1"
        );
        assert_eq!(query.names(), ["id"]);
    }

    #[test]
    fn colons_after_a_word_are_not_parameters() {
        let query = NamedQuery::parse("SELECT arr[lo:hi], 'x' FROM t WHERE a:b = :id");
        assert_eq!(query.sql(), "SELECT arr[lo:hi], 'x' FROM t WHERE a:b = $1");
        assert_eq!(query.names(), ["id"]);
    }

    #[test]
    fn dollar_quoted_bodies_are_untouched() {
        let query = NamedQuery::parse(
            "SELECT $$ :one $$, $fn$ it's :two $fn$, $1 FROM t WHERE id = :id",
        );
        assert_eq!(
            query.sql(),
            "SELECT $$ :one $$, $fn$ it's :two $fn$, $1 FROM t WHERE id = $1"
        );
        assert_eq!(query.names(), ["id"]);
    }

    #[test]
    fn unterminated_dollar_quote_runs_to_the_end() {
        let query = NamedQuery::parse("SELECT $body$ :never");
        assert_eq!(query.sql(), "SELECT $body$ :never");
        assert!(query.names().is_empty());
    }

    #[test]
    fn cast_on_parameter() {
        let query = NamedQuery::parse("SELECT :amount::numeric");
        assert_eq!(query.sql(), "SELECT $1::numeric");
    }

    #[test]
    fn bind_reports_missing_parameter() {
        let mut params = VariableBag::new();
        params.insert("a".to_string(), Value::Int(1));

        let query = NamedQuery::parse("SELECT :a, :b");
        let err = query.bind(&params).unwrap_err();
        assert_eq!(err, ExecuteError::MissingParameter("b".to_string()));

        params.insert("b".to_string(), Value::from("x"));
        let bound = query.bind(&params).unwrap();
        assert_eq!(bound, vec![&Value::Int(1), &Value::from("x")]);
    }
}
