//! Index descriptors.

use serde::{Deserialize, Serialize};

/// Describes one index of the ideal schema.
///
/// Identity is the index name. When no name is given, the schema model
/// derives one deterministically from the table and column names, so a
/// descriptor recreated on every process run still correlates with the
/// index it created earlier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSpec {
    /// Index name; derived when `None` at registration time.
    pub name: Option<String>,
    /// Indexed column(s), in order.
    pub columns: Vec<String>,
    /// Whether this is a unique index.
    pub unique: bool,
}

impl IndexSpec {
    /// Creates an index over the given columns.
    #[must_use]
    pub fn on<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: None,
            columns: columns.into_iter().map(Into::into).collect(),
            unique: false,
        }
    }

    /// Makes this a unique index.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Overrides the derived index name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns the name this index resolves to for the given table.
    #[must_use]
    pub fn resolved_name(&self, table: &str) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| derive_index_name(table, &self.columns))
    }
}

/// Derives the conventional `index_<table>_on_<columns>` name.
#[must_use]
pub fn derive_index_name(table: &str, columns: &[String]) -> String {
    format!("index_{table}_on_{}", columns.join("_and_"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_name_single_column() {
        let idx = IndexSpec::on(["email"]);
        assert_eq!(idx.resolved_name("users"), "index_users_on_email");
    }

    #[test]
    fn test_derived_name_multiple_columns() {
        let idx = IndexSpec::on(["last_name", "first_name"]);
        assert_eq!(
            idx.resolved_name("people"),
            "index_people_on_last_name_and_first_name"
        );
    }

    #[test]
    fn test_explicit_name_wins() {
        let idx = IndexSpec::on(["email"]).named("custom_email_idx");
        assert_eq!(idx.resolved_name("users"), "custom_email_idx");
    }

    #[test]
    fn test_unique_flag() {
        let idx = IndexSpec::on(["uuid"]).unique();
        assert!(idx.unique);
    }
}
