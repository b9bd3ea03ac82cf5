//! Properties file parser
//!
//! A properties file is a flat list of lines:
//!
//! ```text
//! psql_path=/usr/lib/postgresql/16/bin/
//! database_server=db1
//! port=5432
//! db=alpha||username=alice||password=p1
//! db=beta||username=bob||password=p2
//! ```
//!
//! A line with `=` and no `||` is a shared setting. A line with `||` is one
//! entity record made of `key=value` fields. Blank lines are skipped.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{PgBatchError, PgBatchResult};
use crate::models::{EntityRecord, SharedSettings};

/// Separator between the fields of an entity line
pub const ENTITY_SEPARATOR: &str = "||";

/// Shared settings plus entities in file order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    pub shared: SharedSettings,
    pub entities: Vec<EntityRecord>,
}

/// Read and parse a properties file
pub fn read_properties_file(path: &Path) -> PgBatchResult<Properties> {
    let text = fs::read_to_string(path).map_err(|e| {
        PgBatchError::Io(format!(
            "Failed to read properties file {}: {}",
            path.display(),
            e
        ))
    })?;
    parse_properties(&text)
}

/// Parse properties text
///
/// Fails on the first malformed line; no partial result is returned.
pub fn parse_properties(text: &str) -> PgBatchResult<Properties> {
    let mut properties = Properties::default();

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if line.contains(ENTITY_SEPARATOR) {
            let mut fields = BTreeMap::new();
            for field in line.split(ENTITY_SEPARATOR) {
                let (key, value) = split_pair(field.trim(), line_no)?;
                fields.insert(key.to_string(), value.to_string());
            }
            properties.entities.push(EntityRecord::new(line_no, fields));
        } else if line.contains('=') {
            let (key, value) = split_pair(line, line_no)?;
            properties.shared.insert(key, value);
        } else {
            return Err(PgBatchError::malformed(
                line_no,
                "expected key=value or an entity record separated by '||'",
            ));
        }
    }

    Ok(properties)
}

/// Split a `key=value` pair that must contain exactly one `=`
fn split_pair(pair: &str, line_no: usize) -> PgBatchResult<(&str, &str)> {
    let mut parts = pair.split('=');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(key), Some(value), None) => {
            let key = key.trim();
            if key.is_empty() {
                return Err(PgBatchError::malformed(line_no, "empty key before '='"));
            }
            Ok((key, value.trim()))
        }
        (_, None, _) => Err(PgBatchError::malformed(line_no, "field has no '='")),
        _ => Err(PgBatchError::malformed(
            line_no,
            format!("'{}' has more than one '='", key_hint(pair)),
        )),
    }
}

/// Key portion of a pair, so a password is never echoed into an error
fn key_hint(pair: &str) -> String {
    let key = pair.split('=').next().unwrap_or_default();
    format!("{}=...", key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const EXAMPLE: &str = "\
psql_path=
database_server=db1
port=5432

db=alpha||username=alice||password=p1
db=beta||username=bob||password=p2
";

    #[test]
    fn test_parse_example() {
        let props = parse_properties(EXAMPLE).unwrap();

        assert_eq!(props.shared.get("database_server"), Some("db1"));
        assert_eq!(props.shared.get("port"), Some("5432"));
        assert_eq!(props.shared.get("psql_path"), Some(""));

        assert_eq!(props.entities.len(), 2);
        assert_eq!(props.entities[0].username().unwrap(), "alice");
        assert_eq!(props.entities[0].database().unwrap(), "alpha");
        assert_eq!(props.entities[0].line(), 5);
        assert_eq!(props.entities[1].username().unwrap(), "bob");
        assert_eq!(props.entities[1].password().unwrap().expose(), "p2");
    }

    #[test]
    fn test_entity_count_matches_separator_lines() {
        let mut text = String::from("port=5432\n");
        for i in 0..25 {
            text.push_str(&format!("db=d{i}||username=u{i}||password=p{i}\n"));
            if i % 3 == 0 {
                text.push('\n');
            }
        }

        let props = parse_properties(&text).unwrap();
        assert_eq!(props.entities.len(), 25);
        for (i, entity) in props.entities.iter().enumerate() {
            assert_eq!(entity.username().unwrap(), format!("u{i}"));
        }
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        let props = parse_properties("  port = 5432  \n db=a || username=u || password=p \n")
            .unwrap();
        assert_eq!(props.shared.get("port"), Some("5432"));
        assert_eq!(props.entities[0].database().unwrap(), "a");
        assert_eq!(props.entities[0].password().unwrap().expose(), "p");
    }

    #[test]
    fn test_repeated_shared_key_last_wins() {
        let props = parse_properties("port=1\nport=2\n").unwrap();
        assert_eq!(props.shared.get("port"), Some("2"));
    }

    #[test]
    fn test_line_without_equals_is_malformed() {
        let err = parse_properties("port=5432\njust some words\n").unwrap_err();
        assert!(matches!(err, PgBatchError::MalformedConfigLine { line: 2, .. }));
    }

    #[test]
    fn test_shared_line_with_two_equals_is_malformed() {
        let err = parse_properties("port=54=32\n").unwrap_err();
        assert!(matches!(err, PgBatchError::MalformedConfigLine { line: 1, .. }));
    }

    #[test]
    fn test_entity_field_without_equals_is_malformed() {
        let err = parse_properties("db=a||username\n").unwrap_err();
        assert!(matches!(err, PgBatchError::MalformedConfigLine { line: 1, .. }));
    }

    #[test]
    fn test_trailing_separator_is_malformed() {
        let err = parse_properties("\n\ndb=a||username=u||\n").unwrap_err();
        assert!(matches!(err, PgBatchError::MalformedConfigLine { line: 3, .. }));
    }

    #[test]
    fn test_empty_key_is_malformed() {
        assert!(parse_properties("=5432\n").is_err());
    }

    #[test]
    fn test_malformed_password_not_echoed() {
        let err = parse_properties("db=a||username=u||password=se=cret\n").unwrap_err();
        assert!(!err.to_string().contains("se=cret"));
        assert!(err.to_string().contains("password"));
    }

    #[test]
    fn test_read_properties_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("backup.properties");
        fs::write(&path, EXAMPLE).unwrap();

        let props = read_properties_file(&path).unwrap();
        assert_eq!(props.entities.len(), 2);
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_properties_file(Path::new("/nonexistent/pgbatch.properties")).unwrap_err();
        assert!(matches!(err, PgBatchError::Io(_)));
    }
}
