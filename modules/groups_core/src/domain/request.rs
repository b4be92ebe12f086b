//! The group request aggregate and its lifecycle transitions.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::domain::error::{TransitionError, ValidationError};
use crate::domain::group::Group;
use crate::domain::ids::{GroupId, RequestId, UserName};
use crate::domain::status::GroupRequestStatus;
use crate::domain::time::CreateModAndExpireTimes;

/// The type of a group request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum GroupRequestType {
    /// A user asks to join a group. No target user.
    #[default]
    RequestGroupMembership,
    /// A group administrator invites a specific user. Target required.
    InviteToGroup,
}

impl GroupRequestType {
    /// The label stored in the database for this request type.
    pub fn label(&self) -> &'static str {
        match self {
            Self::RequestGroupMembership => "request_group_membership",
            Self::InviteToGroup => "invite_to_group",
        }
    }

    /// Whether requests of this type name a target user.
    pub fn requires_target(&self) -> bool {
        matches!(self, Self::InviteToGroup)
    }
}

impl FromStr for GroupRequestType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "request_group_membership" => Ok(Self::RequestGroupMembership),
            "invite_to_group" => Ok(Self::InviteToGroup),
            _ => Err(ValidationError::illegal_parameter(format!(
                "Invalid request type: {}",
                s
            ))),
        }
    }
}

impl fmt::Display for GroupRequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A request to change the membership of a group.
///
/// Immutable once built; the only field that changes over a request's
/// lifetime is its status, and a change means building a new
/// [`GroupRequestStatus`] (via one of the transition methods) that replaces
/// the old one on write.
///
/// Two requests are *equivalent* if they share the group, requester, type
/// and target, irrespective of id, times and status. The storage layer
/// forbids two equivalent requests that are both open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRequest {
    id: RequestId,
    group_id: GroupId,
    requester: UserName,
    request_type: GroupRequestType,
    target: Option<UserName>,
    times: CreateModAndExpireTimes,
    status: GroupRequestStatus,
}

impl GroupRequest {
    pub fn builder(
        id: RequestId,
        group_id: GroupId,
        requester: UserName,
        times: CreateModAndExpireTimes,
    ) -> GroupRequestBuilder {
        GroupRequestBuilder {
            id,
            group_id,
            requester,
            times,
            request_type: GroupRequestType::default(),
            target: None,
            status: GroupRequestStatus::open(),
        }
    }

    pub fn id(&self) -> &RequestId {
        &self.id
    }

    pub fn group_id(&self) -> &GroupId {
        &self.group_id
    }

    pub fn requester(&self) -> &UserName {
        &self.requester
    }

    pub fn request_type(&self) -> GroupRequestType {
        self.request_type
    }

    pub fn target(&self) -> Option<&UserName> {
        self.target.as_ref()
    }

    pub fn times(&self) -> &CreateModAndExpireTimes {
        &self.times
    }

    pub fn creation_date(&self) -> DateTime<Utc> {
        self.times.creation()
    }

    pub fn modification_date(&self) -> DateTime<Utc> {
        self.times.modification()
    }

    pub fn expiration_date(&self) -> DateTime<Utc> {
        self.times.expiration()
    }

    pub fn status(&self) -> &GroupRequestStatus {
        &self.status
    }

    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    /// The user that would join the group if the request were accepted.
    pub fn prospective_member(&self) -> &UserName {
        match &self.target {
            Some(target) => target,
            None => &self.requester,
        }
    }

    /// The canonical string for the equivalence tuple
    /// `{group, requester, type, target}`, used by storage for deduplication
    /// of open requests.
    pub fn natural_key(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.group_id,
            self.requester,
            self.request_type.label(),
            self.target.as_ref().map(UserName::as_str).unwrap_or("")
        )
    }

    pub fn is_equivalent(&self, other: &GroupRequest) -> bool {
        self.group_id == other.group_id
            && self.requester == other.requester
            && self.request_type == other.request_type
            && self.target == other.target
    }

    /// Cancel the request. Only the original requester may cancel.
    pub fn cancel(&self, actor: &UserName) -> Result<GroupRequestStatus, TransitionError> {
        self.ensure_open()?;
        if actor != &self.requester {
            return Err(TransitionError::unauthorized(actor.clone(), "cancel"));
        }
        Ok(GroupRequestStatus::canceled())
    }

    /// Expire the request. System initiated; permitted once the current
    /// time has reached the expiration time.
    pub fn expire(&self, now: DateTime<Utc>) -> Result<GroupRequestStatus, TransitionError> {
        self.ensure_open()?;
        if now < self.expiration_date() {
            return Err(TransitionError::not_expired(self.expiration_date()));
        }
        Ok(GroupRequestStatus::expired())
    }

    /// Deny the request. Only the designated approver may deny; the reason
    /// is optional free text.
    pub fn deny(
        &self,
        actor: &UserName,
        reason: Option<String>,
        group: &Group,
    ) -> Result<GroupRequestStatus, TransitionError> {
        self.ensure_open()?;
        self.ensure_approver(actor, group, "deny")?;
        Ok(GroupRequestStatus::denied(actor.clone(), reason))
    }

    /// Accept the request. Only the designated approver may accept. The
    /// resulting membership mutation is the caller's responsibility.
    pub fn accept(
        &self,
        actor: &UserName,
        group: &Group,
    ) -> Result<GroupRequestStatus, TransitionError> {
        self.ensure_open()?;
        self.ensure_approver(actor, group, "accept")?;
        Ok(GroupRequestStatus::accepted(actor.clone()))
    }

    fn ensure_open(&self) -> Result<(), TransitionError> {
        if !self.is_open() {
            return Err(TransitionError::not_open(self.status.status_type()));
        }
        Ok(())
    }

    // The approver is the target user for invitations and a group
    // administrator for membership requests.
    fn ensure_approver(
        &self,
        actor: &UserName,
        group: &Group,
        action: &'static str,
    ) -> Result<(), TransitionError> {
        let permitted = match (&self.request_type, &self.target) {
            (GroupRequestType::InviteToGroup, Some(target)) => actor == target,
            (GroupRequestType::RequestGroupMembership, None) => {
                group.id() == &self.group_id && group.is_administrator(actor)
            }
            // the builder guarantees target consistency
            _ => false,
        };
        if !permitted {
            return Err(TransitionError::unauthorized(actor.clone(), action));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct GroupRequestBuilder {
    id: RequestId,
    group_id: GroupId,
    requester: UserName,
    times: CreateModAndExpireTimes,
    request_type: GroupRequestType,
    target: Option<UserName>,
    status: GroupRequestStatus,
}

impl GroupRequestBuilder {
    /// Make this request an invitation of the given user to the group.
    pub fn with_invite_to_group(mut self, target: UserName) -> Self {
        self.request_type = GroupRequestType::InviteToGroup;
        self.target = Some(target);
        self
    }

    /// Set the type and target directly, typically when rebuilding a
    /// persisted request. Consistency is checked at `build`.
    pub fn with_type(mut self, request_type: GroupRequestType, target: Option<UserName>) -> Self {
        self.request_type = request_type;
        self.target = target;
        self
    }

    pub fn with_status(mut self, status: GroupRequestStatus) -> Self {
        self.status = status;
        self
    }

    pub fn build(self) -> Result<GroupRequest, ValidationError> {
        match (self.request_type.requires_target(), &self.target) {
            (true, None) => {
                return Err(ValidationError::illegal_parameter(format!(
                    "requests of type {} require a target user",
                    self.request_type
                )));
            }
            (false, Some(_)) => {
                return Err(ValidationError::illegal_parameter(format!(
                    "requests of type {} may not have a target user",
                    self.request_type
                )));
            }
            _ => {}
        }
        Ok(GroupRequest {
            id: self.id,
            group_id: self.group_id,
            requester: self.requester,
            request_type: self.request_type,
            target: self.target,
            times: self.times,
            status: self.status,
        })
    }
}
