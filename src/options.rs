//! Repository configuration.

use serde::{Deserialize, Serialize};

/// Settings shared by a repository and its index tables.
///
/// Deserializable so the struct can be loaded from an application's config
/// file alongside the store client's own settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryOptions {
    /// Prefix prepended to every table name, for sharing one storage account
    /// across applications.
    #[serde(default)]
    pub table_prefix: String,

    /// Suffix appended to index table names to keep them distinct from the
    /// entity tables they shadow.
    #[serde(default = "default_index_table_suffix")]
    pub index_table_suffix: String,

    /// Page size used when a paging call does not specify one.
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,
}

impl Default for RepositoryOptions {
    fn default() -> Self {
        Self {
            table_prefix: String::new(),
            index_table_suffix: default_index_table_suffix(),
            default_page_size: default_page_size(),
        }
    }
}

fn default_index_table_suffix() -> String {
    "Index".to_string()
}

fn default_page_size() -> usize {
    25
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = RepositoryOptions::default();
        assert_eq!(options.table_prefix, "");
        assert_eq!(options.index_table_suffix, "Index");
        assert_eq!(options.default_page_size, 25);
    }

    #[test]
    fn deserializes_with_missing_fields() {
        let options: RepositoryOptions = serde_json::from_str(r#"{"table_prefix":"app1"}"#).unwrap();
        assert_eq!(options.table_prefix, "app1");
        assert_eq!(options.index_table_suffix, "Index");
        assert_eq!(options.default_page_size, 25);
    }
}
