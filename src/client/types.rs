// ABOUTME: Supporting types for session clients: lifecycle state and the address-range set
// ABOUTME: The address set renders the `|`-joined pattern pushed to the engine at bind time

use crate::client::error::{SessionError, SessionResult};
use std::collections::BTreeSet;
use std::fmt;

/// Separator between patterns in the address range handed to the engine
pub const ADDRESS_SEPARATOR: char = '|';

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not bound; credentials and settings may change
    Unbound,
    /// Bound to a message center
    Bound,
    /// Torn down; every operation fails
    Disposed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SessionState::Unbound => "Not Bound",
            SessionState::Bound => "Bound",
            SessionState::Disposed => "Disposed",
        };
        f.write_str(text)
    }
}

/// Address-range patterns a session claims to service
///
/// Order and duplicates are irrelevant; the rendered range is sorted so the
/// same set always yields the same string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressSet {
    patterns: BTreeSet<String>,
}

impl AddressSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pattern, returning false if it was already present
    ///
    /// Surrounding whitespace is trimmed. Empty patterns and patterns that
    /// contain [`ADDRESS_SEPARATOR`] are rejected.
    pub fn insert(&mut self, pattern: &str) -> SessionResult<bool> {
        let pattern = Self::validate(pattern)?;
        Ok(self.patterns.insert(pattern.to_string()))
    }

    /// Remove a pattern, returning false if it was not present
    pub fn remove(&mut self, pattern: &str) -> bool {
        self.patterns.remove(pattern.trim())
    }

    /// Remove every pattern
    pub fn clear(&mut self) {
        self.patterns.clear();
    }

    /// Returns true if the pattern is in the set
    pub fn contains(&self, pattern: &str) -> bool {
        self.patterns.contains(pattern.trim())
    }

    /// Number of distinct patterns
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Returns true if there are no patterns
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Iterate the patterns in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(String::as_str)
    }

    /// The address range string pushed to the engine
    pub fn range_pattern(&self) -> String {
        let mut range = String::new();
        for (i, pattern) in self.patterns.iter().enumerate() {
            if i > 0 {
                range.push(ADDRESS_SEPARATOR);
            }
            range.push_str(pattern);
        }
        range
    }

    fn validate(pattern: &str) -> SessionResult<&str> {
        let trimmed = pattern.trim();
        if trimmed.is_empty() || trimmed.contains(ADDRESS_SEPARATOR) {
            return Err(SessionError::InvalidAddress(pattern.to_string()));
        }
        Ok(trimmed)
    }
}
