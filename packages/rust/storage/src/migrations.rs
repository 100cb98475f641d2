//! Schema definitions for the docset search index.
//!
//! The index is read directly by documentation viewers, so it must contain
//! exactly the `searchIndex` table they expect. Applied versions are tracked
//! in SQLite's `user_version` header field instead of a bookkeeping table.

/// A schema migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
///
/// Each migration's SQL ends by bumping `user_version` to its own version.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "searchIndex table with unique (name, type, path)",
        sql: r#"
CREATE TABLE IF NOT EXISTS searchIndex (
    id   INTEGER PRIMARY KEY,
    name TEXT,
    type TEXT,
    path TEXT
);

CREATE UNIQUE INDEX IF NOT EXISTS anchor ON searchIndex (name, type, path);

PRAGMA user_version = 1;
"#,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_ordered_and_bump_user_version() {
        let migrations = all_migrations();
        for (i, migration) in migrations.iter().enumerate() {
            assert_eq!(migration.version as usize, i + 1);
            assert!(
                migration
                    .sql
                    .contains(&format!("PRAGMA user_version = {};", migration.version)),
                "migration v{} ({}) does not record its version",
                migration.version,
                migration.description
            );
        }
    }
}
