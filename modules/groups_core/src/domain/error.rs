use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::ids::UserName;
use crate::domain::status::GroupRequestStatusType;

/// Errors raised when constructing domain values from raw input.
///
/// These are always raised at construction time and are never persisted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing input parameter: {name}")]
    MissingParameter { name: String },

    #[error("{message}")]
    IllegalParameter { message: String },
}

impl ValidationError {
    pub fn missing_parameter(name: impl Into<String>) -> Self {
        Self::MissingParameter { name: name.into() }
    }

    pub fn illegal_parameter(message: impl Into<String>) -> Self {
        Self::IllegalParameter {
            message: message.into(),
        }
    }
}

/// Errors raised when a request status transition is not permitted.
///
/// The request state machine has depth two: a request starts open and moves
/// to exactly one terminal status, after which no further transitions exist.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("The request is {status}, not open")]
    NotOpen { status: GroupRequestStatusType },

    #[error("User {user} may not {action} the request")]
    Unauthorized { user: UserName, action: &'static str },

    #[error("The request does not expire until {expires}")]
    NotExpired { expires: DateTime<Utc> },
}

impl TransitionError {
    pub fn not_open(status: GroupRequestStatusType) -> Self {
        Self::NotOpen { status }
    }

    pub fn unauthorized(user: UserName, action: &'static str) -> Self {
        Self::Unauthorized { user, action }
    }

    pub fn not_expired(expires: DateTime<Utc>) -> Self {
        Self::NotExpired { expires }
    }
}
