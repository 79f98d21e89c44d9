//! Deterministic table-name derivation.
//!
//! Table names in the target store are alphanumeric only, may not start with
//! a digit, and are capped at 63 characters. Entity and index table names are
//! derived from the entity's logical name plus the configured prefix/suffix,
//! sanitized to that alphabet. Truncation favors the prefix and suffix so the
//! configured parts always survive intact.

use crate::entity::TableEntity;
use crate::options::RepositoryOptions;

const MAX_TABLE_NAME_LEN: usize = 63;

/// Sanitizes `raw` and concatenates `prefix + body + suffix`.
///
/// Non-alphanumeric characters are stripped from `raw`. When there is no
/// prefix and the stripped body does not start with an ASCII letter, an `X`
/// is prepended so the name never starts with a digit. The body is truncated
/// so the whole name fits in 63 characters.
pub fn table_name(raw: &str, prefix: &str, suffix: &str) -> String {
    let mut body: String = raw.chars().filter(char::is_ascii_alphanumeric).collect();

    if prefix.is_empty() && !body.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
        body.insert(0, 'X');
    }

    let max_body_len = MAX_TABLE_NAME_LEN.saturating_sub(prefix.len() + suffix.len());
    body.truncate(max_body_len);

    format!("{}{}{}", prefix, body, suffix)
}

/// The primary table name for entities of type `T`.
pub fn entity_table_name<T: TableEntity>(options: &RepositoryOptions) -> String {
    table_name(T::entity_name(), &options.table_prefix, "")
}

/// The index table name for entities of type `T`.
pub fn index_table_name<T: TableEntity>(options: &RepositoryOptions) -> String {
    table_name(
        T::entity_name(),
        &options.table_prefix,
        &options.index_table_suffix,
    )
}
