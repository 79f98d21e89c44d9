//! Key encoding for index records.
//!
//! Two value types encode everything an index record stores:
//!
//! - [`EntityKey`]: the two-part primary key of an entity, serialized as
//!   `{partition_key}|%|{row_key}`
//! - [`IndexKey`]: a (property name, property value) pair, serialized as
//!   `{property_name}|%|{sanitized_value}`
//!
//! Both are transient value objects rebuilt on every read/write path; the
//! serialized string is the single source of truth and carries equality and
//! hashing for both types. `from_string` on either type is total: corrupt or
//! malformed input yields `None` rather than an error, so possibly-damaged
//! rows can round-trip safely.

use crate::entity::{IndexedEntity, TableEntity};
use crate::error::{Error, Result};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Separator between the two components of a serialized key.
///
/// Chosen to be unlikely to appear in real partition or row keys.
pub const SEPARATOR: &str = "|%|";

/// Splits a serialized key at the first separator occurrence.
///
/// Returns `None` for blank input, input with no separator, or input where
/// either side of the separator is empty. The right-hand part may itself
/// contain the separator.
fn split_key(input: &str) -> Option<(&str, &str)> {
    if input.trim().is_empty() {
        return None;
    }
    let (left, right) = input.split_once(SEPARATOR)?;
    if left.is_empty() || right.is_empty() {
        return None;
    }
    Some((left, right))
}

/// The primary key of an entity in the primary table.
#[derive(Debug, Clone)]
pub struct EntityKey {
    pub partition_key: String,
    pub row_key: String,
}

impl EntityKey {
    /// Creates an entity key from its two parts.
    pub fn new(partition_key: impl Into<String>, row_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
        }
    }

    /// Builds the key of an existing entity.
    pub fn from_entity<T: TableEntity>(entity: &T) -> Self {
        Self::new(entity.partition_key(), entity.row_key())
    }

    /// Parses a key serialized by [`Display`](fmt::Display).
    ///
    /// Returns `None` on blank or malformed input.
    pub fn from_string(input: &str) -> Option<Self> {
        split_key(input).map(|(pk, rk)| Self::new(pk, rk))
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.partition_key, SEPARATOR, self.row_key)
    }
}

// Equality and hashing are defined on the serialized form, matching the
// persisted representation in index record row keys.
impl PartialEq for EntityKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl Eq for EntityKey {}

impl Hash for EntityKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_string().hash(state);
    }
}

/// The partition key of an index record: a property name paired with the
/// property's sanitized value.
///
/// The value is sanitized on construction and on every mutation, so two keys
/// built from distinct raw values that sanitize identically are equal. That
/// collision is accepted: the store's key alphabet simply cannot represent
/// the difference.
#[derive(Debug, Clone)]
pub struct IndexKey {
    property_name: String,
    property_value: String,
}

impl IndexKey {
    /// Creates an index key, sanitizing the value.
    pub fn new(property_name: impl Into<String>, property_value: &str) -> Self {
        Self {
            property_name: property_name.into(),
            property_value: Self::sanitize(property_value),
        }
    }

    /// The indexed property's name.
    pub fn property_name(&self) -> &str {
        &self.property_name
    }

    /// The indexed property's sanitized value.
    pub fn property_value(&self) -> &str {
        &self.property_value
    }

    /// Replaces the value, sanitizing the input.
    pub fn set_property_value(&mut self, value: &str) {
        self.property_value = Self::sanitize(value);
    }

    /// Replaces every character disallowed in store key fields with `*`.
    ///
    /// The disallowed class is `/`, `\`, `#`, `?`, the C0 controls
    /// (U+0000–U+001F), DEL, and the C1 controls (U+0080–U+009F). The
    /// replacement is deterministic and idempotent, and never lengthens the
    /// input.
    pub fn sanitize(value: &str) -> String {
        value
            .chars()
            .map(|c| if is_disallowed_key_char(c) { '*' } else { c })
            .collect()
    }

    /// Parses a key serialized by [`Display`](fmt::Display).
    ///
    /// Returns `None` on blank or malformed input. The value part is
    /// re-sanitized, which is a no-op for well-formed input.
    pub fn from_string(input: &str) -> Option<Self> {
        split_key(input).map(|(name, value)| Self::new(name, value))
    }

    /// Resolves an index key for a named property of `T`, validating that the
    /// property is declared as indexed.
    ///
    /// A `None` value converts to the empty string; `Some` values are
    /// rendered through their display conversion before sanitizing.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `property_name` is blank
    /// - [`Error::NotIndexed`] if `T` does not index `property_name`
    pub fn for_property<T, V>(property_name: &str, value: Option<V>) -> Result<Self>
    where
        T: IndexedEntity,
        V: fmt::Display,
    {
        if property_name.trim().is_empty() {
            return Err(Error::InvalidArgument("property_name"));
        }

        if T::indexed_field(property_name).is_none() {
            return Err(Error::NotIndexed {
                property: property_name.to_owned(),
                entity: T::entity_name(),
            });
        }

        let value = value.map(|v| v.to_string()).unwrap_or_default();
        Ok(Self::new(property_name, &value))
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.property_name, SEPARATOR, self.property_value)
    }
}

impl PartialEq for IndexKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl Eq for IndexKey {}

impl Hash for IndexKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_string().hash(state);
    }
}

fn is_disallowed_key_char(c: char) -> bool {
    matches!(c, '/' | '\\' | '#' | '?' | '\u{0000}'..='\u{001f}' | '\u{007f}'..='\u{009f}')
}
