//! Rebuild domain values from stored rows.
//!
//! Stored data already passed domain validation on the way in, so any
//! failure here means the database holds something this server version
//! cannot explain and is surfaced as [`StorageError::UnexpectedValue`].

use std::str::FromStr;

use crate::domain::error::ValidationError;
use crate::domain::fields::NumberedCustomField;
use crate::domain::group::{Group, GroupType};
use crate::domain::ids::{GroupId, GroupName, RequestId, UserName};
use crate::domain::request::{GroupRequest, GroupRequestType};
use crate::domain::status::{GroupRequestStatus, GroupRequestStatusType};
use crate::domain::time::{CreateAndModTimes, CreateModAndExpireTimes};
use crate::infra::storage::entity;
use crate::storage::StorageError;

fn unexpected(e: ValidationError) -> StorageError {
    StorageError::unexpected_value(e.to_string())
}

/// Assemble a group from its row plus its member and custom field rows.
pub fn group_from_rows(
    group: entity::groups::Model,
    members: Vec<entity::group_members::Model>,
    fields: Vec<entity::group_custom_fields::Model>,
) -> Result<Group, StorageError> {
    let id = GroupId::new(&group.id).map_err(unexpected)?;
    let name = GroupName::new(&group.name).map_err(unexpected)?;
    let owner = UserName::new(&group.owner).map_err(unexpected)?;
    let group_type = GroupType::from_str(&group.group_type).map_err(unexpected)?;
    let times = CreateAndModTimes::new(group.created_at, group.updated_at).map_err(unexpected)?;

    let mut builder = Group::builder(id, name, owner, times).with_type(group_type);
    if let Some(description) = group.description {
        builder = builder.with_description(description);
    }
    for member in members {
        builder = builder.with_member(UserName::new(&member.user_name).map_err(unexpected)?);
    }
    for field in fields {
        builder = builder.with_custom_field(
            NumberedCustomField::parse(&field.field).map_err(unexpected)?,
            field.value,
        );
    }
    builder.build().map_err(unexpected)
}

/// Rebuild a request from its row.
pub fn request_from_row(row: entity::requests::Model) -> Result<GroupRequest, StorageError> {
    let id = RequestId::new(row.id);
    let group_id = GroupId::new(&row.group_id).map_err(unexpected)?;
    let requester = UserName::new(&row.requester).map_err(unexpected)?;
    let request_type = GroupRequestType::from_str(&row.request_type).map_err(unexpected)?;
    let target = row
        .target
        .as_deref()
        .map(UserName::new)
        .transpose()
        .map_err(unexpected)?;
    let status_type = GroupRequestStatusType::from_str(&row.status).map_err(unexpected)?;
    let closed_by = row
        .closed_by
        .as_deref()
        .map(UserName::new)
        .transpose()
        .map_err(unexpected)?;
    let status = GroupRequestStatus::from_parts(status_type, closed_by, row.closed_reason)
        .map_err(unexpected)?;
    // closed rows may have a modification time past expiration
    let times = CreateModAndExpireTimes::from_stored(row.created_at, row.updated_at, row.expires_at)
        .map_err(unexpected)?;

    GroupRequest::builder(id, group_id, requester, times)
        .with_type(request_type, target)
        .with_status(status)
        .build()
        .map_err(unexpected)
}
