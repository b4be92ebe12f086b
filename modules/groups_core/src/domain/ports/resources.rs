//! Resource handler port.
//!
//! A resource handler answers questions about an external resource type
//! (for example a workspace or a catalog entry) that groups may be linked
//! to. The core only depends on this interface; concrete handlers live with
//! the services that own the resources.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::error::ValidationError;
use crate::domain::ids::UserName;

/// An identifier for an external resource: a positive integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId(i64);

impl ResourceId {
    pub fn new(id: i64) -> Result<Self, ValidationError> {
        if id < 1 {
            return Err(ValidationError::illegal_parameter("Resource IDs are > 0"));
        }
        Ok(Self(id))
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

impl FromStr for ResourceId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id: i64 = s
            .trim()
            .parse()
            .map_err(|_| ValidationError::illegal_parameter(format!("Illegal resource ID: {}", s)))?;
        Self::new(id)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The level of access a user holds on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourcePermission {
    None,
    Read,
    Write,
    Admin,
}

/// Errors raised by resource handlers.
#[derive(Error, Debug)]
pub enum ResourceHandlerError {
    #[error("No such resource: {id}")]
    NoSuchResource { id: String },

    #[error("Illegal resource ID: {id}")]
    IllegalResourceId { id: String },

    #[error("Resource handler error: {message}")]
    Handler { message: String },
}

impl ResourceHandlerError {
    pub fn no_such_resource(id: impl Into<String>) -> Self {
        Self::NoSuchResource { id: id.into() }
    }

    pub fn illegal_resource_id(id: impl Into<String>) -> Self {
        Self::IllegalResourceId { id: id.into() }
    }

    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler {
            message: message.into(),
        }
    }
}

/// Answers permission and administration queries for one external resource
/// type, and can grant read access on a group's behalf.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// The permission the user holds on the resource.
    async fn get_permission(
        &self,
        user: &UserName,
        resource: &ResourceId,
    ) -> Result<ResourcePermission, ResourceHandlerError>;

    /// Whether the user administrates the resource.
    async fn is_administrator(
        &self,
        user: &UserName,
        resource: &ResourceId,
    ) -> Result<bool, ResourceHandlerError>;

    /// The administrators of the resource.
    async fn get_administrators(
        &self,
        resource: &ResourceId,
    ) -> Result<Vec<UserName>, ResourceHandlerError>;

    /// Grant the user read permission on the resource. A no-op if the user
    /// already holds read or better.
    async fn set_read_permission(
        &self,
        user: &UserName,
        resource: &ResourceId,
    ) -> Result<(), ResourceHandlerError>;
}
