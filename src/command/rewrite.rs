//! Username rewriting for restores
//!
//! A dump taken for one tenant is restored for another by replacing every
//! literal occurrence of the old username with the new one before `psql`
//! runs.
//!
//! # Known limitation
//!
//! This is a raw text substitution, not SQL-aware. A username that is a
//! substring of another identifier, keyword or data value (e.g. `app` inside
//! `application`) is replaced there too. Pick distinctive usernames or rewrite
//! the dump by hand in that case.

use std::fs;
use std::path::Path;

use crate::error::{PgBatchError, PgBatchResult};
use crate::models::{keys, EntityRecord, SharedSettings};

/// Resolved `from` -> `to` username pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsernameRewrite {
    pub from: String,
    pub to: String,
}

impl UsernameRewrite {
    /// Resolve the pair for an entity, preferring entity-level keys
    ///
    /// Returns `None` when no `from_username` is configured. Once a
    /// `from_username` is set, `to_username` is required.
    pub fn for_entity(
        shared: &SharedSettings,
        entity: &EntityRecord,
    ) -> PgBatchResult<Option<Self>> {
        let lookup = |key: &str| entity.get(key).or_else(|| shared.get(key));

        let Some(from) = lookup(keys::FROM_USERNAME) else {
            return Ok(None);
        };
        let to = lookup(keys::TO_USERNAME)
            .ok_or_else(|| PgBatchError::missing_key(keys::TO_USERNAME))?;

        Ok(Some(Self {
            from: from.to_string(),
            to: to.to_string(),
        }))
    }

    /// Replace every literal occurrence of `from` with `to`
    pub fn apply(&self, text: &str) -> String {
        if self.from.is_empty() {
            return text.to_string();
        }
        text.replace(&self.from, &self.to)
    }

    /// Rewrite a file in place, returning the number of replacements
    pub fn apply_to_file(&self, path: &Path) -> PgBatchResult<usize> {
        let content = fs::read_to_string(path).map_err(|e| {
            PgBatchError::Io(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let count = if self.from.is_empty() {
            0
        } else {
            content.matches(self.from.as_str()).count()
        };
        if count == 0 {
            return Ok(0);
        }

        fs::write(path, self.apply(&content)).map_err(|e| {
            PgBatchError::Io(format!("Failed to write {}: {}", path.display(), e))
        })?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_properties;
    use tempfile::TempDir;

    fn rewrite(from: &str, to: &str) -> UsernameRewrite {
        UsernameRewrite {
            from: from.into(),
            to: to.into(),
        }
    }

    #[test]
    fn test_apply_replaces_all_occurrences() {
        let sql = "CREATE SCHEMA alice;\nALTER TABLE alice.t OWNER TO alice;\n";
        assert_eq!(
            rewrite("alice", "carol").apply(sql),
            "CREATE SCHEMA carol;\nALTER TABLE carol.t OWNER TO carol;\n"
        );
    }

    #[test]
    fn test_apply_is_not_identifier_aware() {
        // Documented limitation: substrings of other tokens are rewritten too.
        assert_eq!(
            rewrite("app", "web").apply("GRANT ALL ON application TO app;"),
            "GRANT ALL ON weblication TO web;"
        );
    }

    #[test]
    fn test_entity_keys_override_shared() {
        let props = parse_properties(
            "from_username=old\nto_username=new\n\
             db=a||username=u||password=p||from_username=mine||to_username=yours\n\
             db=b||username=v||password=q\n",
        )
        .unwrap();

        let first = UsernameRewrite::for_entity(&props.shared, &props.entities[0])
            .unwrap()
            .unwrap();
        assert_eq!(first, rewrite("mine", "yours"));

        let second = UsernameRewrite::for_entity(&props.shared, &props.entities[1])
            .unwrap()
            .unwrap();
        assert_eq!(second, rewrite("old", "new"));
    }

    #[test]
    fn test_no_from_means_no_rewrite() {
        let props = parse_properties("db=a||username=u||password=p\n").unwrap();
        assert_eq!(
            UsernameRewrite::for_entity(&props.shared, &props.entities[0]).unwrap(),
            None
        );
    }

    #[test]
    fn test_from_without_to_is_missing_key() {
        let props = parse_properties("from_username=old\ndb=a||username=u||password=p\n").unwrap();
        let err = UsernameRewrite::for_entity(&props.shared, &props.entities[0]).unwrap_err();
        assert!(matches!(err, PgBatchError::MissingConfigKey(k) if k == "to_username"));
    }

    #[test]
    fn test_apply_to_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("dump.sql");
        fs::write(&path, "SET search_path = alice;\nCREATE TABLE alice.t();\n").unwrap();

        let count = rewrite("alice", "bob").apply_to_file(&path).unwrap();
        assert_eq!(count, 2);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "SET search_path = bob;\nCREATE TABLE bob.t();\n"
        );
    }

    #[test]
    fn test_apply_to_missing_file() {
        let err = rewrite("a", "b")
            .apply_to_file(Path::new("/nonexistent/dump.sql"))
            .unwrap_err();
        assert!(matches!(err, PgBatchError::Io(_)));
    }
}
