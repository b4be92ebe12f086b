//! Storage error taxonomy.
//!
//! Operational errors are split from startup errors: a [`StorageError`] is
//! raised by individual storage operations and maps onto a caller-visible
//! failure, while a [`StorageInitError`] aborts startup.

use thiserror::Error;

use crate::domain::ids::{GroupId, RequestId, UserName};
use crate::domain::status::GroupRequestStatusType;

/// Errors raised by storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Group already exists: {id}")]
    GroupExists { id: GroupId },

    #[error("No such group: {id}")]
    NoSuchGroup { id: GroupId },

    #[error("No such request: {id}")]
    NoSuchRequest { id: RequestId },

    /// An equivalent open request already exists; carries the id of the
    /// existing request so callers can point the user at it.
    #[error("Request exists with ID: {0}")]
    RequestExists(RequestId),

    /// The stored request id collided with an existing one. Ids are
    /// randomly generated, so this indicates a caller bug.
    #[error(
        "ID {0} already exists in the database. \
         The programmer is responsible for maintaining unique IDs."
    )]
    IdCollision(RequestId),

    #[error("{message}")]
    UserIsMember { message: String },

    #[error("{message}")]
    NoSuchUser { message: String },

    /// The request is already closed, so the requested close did not apply.
    #[error("Request {id} is {status}, not open")]
    RequestClosed {
        id: RequestId,
        status: GroupRequestStatusType,
    },

    /// A stored value could not be rebuilt into a domain value. Indicates
    /// corruption or an out-of-band schema change.
    #[error("Unexpected value in database: {0}")]
    UnexpectedValue(String),

    #[error("{message}")]
    InvalidArgument { message: String },

    #[error("Connection to database failed: {message}")]
    Comms { message: String },
}

impl StorageError {
    pub fn group_exists(id: GroupId) -> Self {
        Self::GroupExists { id }
    }

    pub fn no_such_group(id: GroupId) -> Self {
        Self::NoSuchGroup { id }
    }

    pub fn no_such_request(id: RequestId) -> Self {
        Self::NoSuchRequest { id }
    }

    pub fn member_exists(user: &UserName, group: &GroupId) -> Self {
        Self::UserIsMember {
            message: format!("User {} is already a member of group {}", user, group),
        }
    }

    pub fn member_is_owner(user: &UserName, group: &GroupId) -> Self {
        Self::UserIsMember {
            message: format!("User {} is the owner of group {}", user, group),
        }
    }

    pub fn no_such_member(user: &UserName, group: &GroupId) -> Self {
        Self::NoSuchUser {
            message: format!("No member {} in group {}", user, group),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn unexpected_value(message: impl Into<String>) -> Self {
        Self::UnexpectedValue(message.into())
    }

    pub fn comms(message: impl Into<String>) -> Self {
        Self::Comms {
            message: message.into(),
        }
    }
}

/// Errors raised while initializing storage at startup.
#[derive(Error, Debug)]
pub enum StorageInitError {
    #[error("Incompatible database schema. Server is v{server}, DB is v{db}")]
    SchemaMismatch { server: i32, db: i32 },

    #[error(
        "The database is in the middle of an update from v{db} of the schema. Aborting startup."
    )]
    UpdateInProgress { db: i32 },

    #[error("{message}")]
    InvalidConfig { message: String },

    #[error("There was a problem communicating with the database: {message}")]
    Comms { message: String },
}

impl StorageInitError {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    pub fn comms(message: impl Into<String>) -> Self {
        Self::Comms {
            message: message.into(),
        }
    }
}
