//! Validated identifier types for groups, users and requests.
//!
//! All identifiers are immutable, compared by value, and checked on
//! construction so that no illegal identifier can reach the storage layer.

use std::fmt;

use uuid::Uuid;

use crate::domain::error::ValidationError;

const MAX_GROUP_ID_LEN: usize = 100;
const MAX_GROUP_NAME_LEN: usize = 256;
const MAX_USER_NAME_LEN: usize = 100;

/// The ID of a group: lowercase alphanumerics and hyphens, starting with a
/// letter, at most 100 characters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupId(String);

impl GroupId {
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into().trim().to_string();
        if id.is_empty() {
            return Err(ValidationError::missing_parameter("group id"));
        }
        if id.len() > MAX_GROUP_ID_LEN {
            return Err(ValidationError::illegal_parameter(format!(
                "group id {} exceeds the maximum length of {}",
                id, MAX_GROUP_ID_LEN
            )));
        }
        let mut chars = id.chars();
        // non-empty, checked above
        if let Some(first) = chars.next() {
            if !first.is_ascii_lowercase() {
                return Err(ValidationError::illegal_parameter(format!(
                    "group id {} must start with a lowercase ASCII letter",
                    id
                )));
            }
        }
        for c in chars {
            if !(c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-') {
                return Err(ValidationError::illegal_parameter(format!(
                    "Illegal character in group id {}: {}",
                    id, c
                )));
            }
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The human readable name of a group: 1-256 characters, no control codes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupName(String);

impl GroupName {
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::missing_parameter("group name"));
        }
        if name.len() > MAX_GROUP_NAME_LEN {
            return Err(ValidationError::illegal_parameter(format!(
                "group name exceeds the maximum length of {}",
                MAX_GROUP_NAME_LEN
            )));
        }
        if name.chars().any(char::is_control) {
            return Err(ValidationError::illegal_parameter(
                "group name contains control characters",
            ));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A user name: lowercase alphanumerics starting with a letter, at most
/// 100 characters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UserName(String);

impl UserName {
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::missing_parameter("user name"));
        }
        if name.len() > MAX_USER_NAME_LEN {
            return Err(ValidationError::illegal_parameter(format!(
                "user name {} exceeds the maximum length of {}",
                name, MAX_USER_NAME_LEN
            )));
        }
        let mut chars = name.chars();
        if let Some(first) = chars.next() {
            if !first.is_ascii_lowercase() {
                return Err(ValidationError::illegal_parameter(format!(
                    "user name {} must start with a lowercase ASCII letter",
                    name
                )));
            }
        }
        for c in chars {
            if !(c.is_ascii_lowercase() || c.is_ascii_digit()) {
                return Err(ValidationError::illegal_parameter(format!(
                    "Illegal character in user name {}: {}",
                    name, c
                )));
            }
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The ID of a group request.
///
/// Request IDs are generated randomly and are expected to be globally
/// unique; the storage layer treats a collision as a programmer error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(id: &str) -> Result<Self, ValidationError> {
        Uuid::parse_str(id.trim()).map(Self).map_err(|_| {
            ValidationError::illegal_parameter(format!("Illegal request ID: {}", id))
        })
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
