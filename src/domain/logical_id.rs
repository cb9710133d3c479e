//! Type-safe CloudFormation logical identifier.
//!
//! [`LogicalId`] is a validated newtype around `String`. Ids derived from a
//! construct path via [`LogicalId::from_path`] carry an 8-character suffix
//! computed from a name-based (v5) UUID of the full path, so two paths that
//! flatten to the same readable prefix still get distinct ids.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StackError;

/// Namespace for path-derived logical id suffixes.
const PATH_NAMESPACE: Uuid = Uuid::from_u128(0x6b1f_3c2e_9a41_5d07_8e63_c2f4_10ab_57d9);

/// CloudFormation caps logical ids at 255 characters.
const MAX_LEN: usize = 255;

/// Length of the hash suffix appended by [`LogicalId::from_path`].
const SUFFIX_LEN: usize = 8;

/// Path components that are dropped from the readable prefix.
const HIDDEN_COMPONENTS: [&str; 2] = ["Resource", "Default"];

/// Identifier of one resource inside a template.
///
/// Must start with an ASCII letter and contain only ASCII alphanumerics.
/// Used as the key in the template's `Resources` map and as the target of
/// `Ref` / `Fn::GetAtt` intrinsics.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LogicalId(String);

impl LogicalId {
    /// Creates a `LogicalId` from a literal string.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::InvalidLogicalId`] if the string is empty,
    /// longer than 255 characters, does not start with a letter, or
    /// contains non-alphanumeric characters.
    pub fn new(value: impl Into<String>) -> Result<Self, StackError> {
        let value = value.into();
        let starts_with_letter = value.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
        if !starts_with_letter
            || value.len() > MAX_LEN
            || !value.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(StackError::InvalidLogicalId(value));
        }
        Ok(Self(value))
    }

    /// Derives a `LogicalId` from a construct path such as
    /// `["WebSocketHandler", "ServiceRole"]`.
    ///
    /// Non-alphanumeric characters are stripped from each component,
    /// `Resource` and `Default` components are hidden, and an uppercase
    /// hex suffix of the full path's v5 UUID is appended.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::InvalidLogicalId`] if the path is empty or its
    /// readable prefix does not start with a letter.
    pub fn from_path(path: &[&str]) -> Result<Self, StackError> {
        if path.is_empty() {
            return Err(StackError::InvalidLogicalId(String::new()));
        }
        let full_path = path.join("/");
        let readable: String = path
            .iter()
            .filter(|component| !HIDDEN_COMPONENTS.contains(*component))
            .flat_map(|component| component.chars())
            .filter(char::is_ascii_alphanumeric)
            .take(MAX_LEN - SUFFIX_LEN)
            .collect();
        let suffix: String = Uuid::new_v5(&PATH_NAMESPACE, full_path.as_bytes())
            .simple()
            .to_string()
            .to_ascii_uppercase()
            .chars()
            .take(SUFFIX_LEN)
            .collect();
        Self::new(format!("{readable}{suffix}")).map_err(|_| StackError::InvalidLogicalId(full_path))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for LogicalId {
    type Error = StackError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LogicalId> for String {
    fn from(id: LogicalId) -> Self {
        id.0
    }
}

impl AsRef<str> for LogicalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
