//! Request status values.
//!
//! A status is either the single non-terminal `Open` state or one of four
//! terminal states. A status value is immutable; changing a request's status
//! means building a new value that replaces the old one on write. The
//! actor/reason combination is checked on construction so an inconsistent
//! status can never be persisted.

use std::fmt;
use std::str::FromStr;

use crate::domain::error::ValidationError;
use crate::domain::ids::UserName;

/// The type of a request status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupRequestStatusType {
    Open,
    Canceled,
    Expired,
    Denied,
    Accepted,
}

impl GroupRequestStatusType {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_open()
    }

    /// The label stored in the database for this status type.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Canceled => "canceled",
            Self::Expired => "expired",
            Self::Denied => "denied",
            Self::Accepted => "accepted",
        }
    }
}

impl FromStr for GroupRequestStatusType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "canceled" => Ok(Self::Canceled),
            "expired" => Ok(Self::Expired),
            "denied" => Ok(Self::Denied),
            "accepted" => Ok(Self::Accepted),
            _ => Err(ValidationError::illegal_parameter(format!(
                "Invalid request status type: {}",
                s
            ))),
        }
    }
}

impl fmt::Display for GroupRequestStatusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The status of a request: its type plus, for statuses closed by a user
/// decision, the closing user and an optional free text reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRequestStatus {
    status_type: GroupRequestStatusType,
    closed_by: Option<UserName>,
    reason: Option<String>,
}

impl GroupRequestStatus {
    pub fn open() -> Self {
        Self {
            status_type: GroupRequestStatusType::Open,
            closed_by: None,
            reason: None,
        }
    }

    pub fn canceled() -> Self {
        Self {
            status_type: GroupRequestStatusType::Canceled,
            closed_by: None,
            reason: None,
        }
    }

    pub fn expired() -> Self {
        Self {
            status_type: GroupRequestStatusType::Expired,
            closed_by: None,
            reason: None,
        }
    }

    pub fn denied(closed_by: UserName, reason: Option<String>) -> Self {
        Self {
            status_type: GroupRequestStatusType::Denied,
            closed_by: Some(closed_by),
            reason: normalize_reason(reason),
        }
    }

    pub fn accepted(closed_by: UserName) -> Self {
        Self {
            status_type: GroupRequestStatusType::Accepted,
            closed_by: Some(closed_by),
            reason: None,
        }
    }

    /// Reassemble a status from its parts, typically when reading a
    /// persisted request. Fails if the actor/reason combination is
    /// inconsistent with the status type.
    pub fn from_parts(
        status_type: GroupRequestStatusType,
        closed_by: Option<UserName>,
        reason: Option<String>,
    ) -> Result<Self, ValidationError> {
        let reason = normalize_reason(reason);
        use GroupRequestStatusType::*;
        match status_type {
            Open | Canceled | Expired => {
                if closed_by.is_some() {
                    return Err(ValidationError::illegal_parameter(format!(
                        "a {} status may not have a closing user",
                        status_type
                    )));
                }
                if reason.is_some() {
                    return Err(ValidationError::illegal_parameter(format!(
                        "a {} status may not have a reason",
                        status_type
                    )));
                }
            }
            Denied => {
                if closed_by.is_none() {
                    return Err(ValidationError::missing_parameter("closed by"));
                }
            }
            Accepted => {
                if closed_by.is_none() {
                    return Err(ValidationError::missing_parameter("closed by"));
                }
                if reason.is_some() {
                    return Err(ValidationError::illegal_parameter(
                        "an accepted status may not have a reason",
                    ));
                }
            }
        }
        Ok(Self {
            status_type,
            closed_by,
            reason,
        })
    }

    pub fn status_type(&self) -> GroupRequestStatusType {
        self.status_type
    }

    pub fn is_open(&self) -> bool {
        self.status_type.is_open()
    }

    /// The user that closed the request, for statuses closed by a decision.
    pub fn closed_by(&self) -> Option<&UserName> {
        self.closed_by.as_ref()
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }
}

// An empty or whitespace-only reason is treated as absent.
fn normalize_reason(reason: Option<String>) -> Option<String> {
    reason.filter(|r| !r.trim().is_empty())
}
