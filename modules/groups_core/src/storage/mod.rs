//! The storage port for groups and requests.

pub mod error;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::group::{Group, GroupUpdateParams};
use crate::domain::ids::{GroupId, RequestId, UserName};
use crate::domain::request::GroupRequest;
use crate::domain::status::GroupRequestStatus;

pub use error::{StorageError, StorageInitError};

/// Persistent storage for groups and group requests.
///
/// Implementations own the consistency guarantees the service layer relies
/// on: group ids are unique, a user appears at most once in a group's member
/// list, the owner is never a member, and at most one open request exists
/// per equivalence tuple. All uniqueness checks happen inside single
/// conditional writes so that concurrent callers cannot race past them.
#[async_trait]
pub trait GroupsStorage: Send + Sync {
    /// Store a new group. Fails with [`StorageError::GroupExists`] if the
    /// id is taken.
    async fn create_group(&self, group: &Group) -> Result<(), StorageError>;

    /// Get a group by id.
    async fn get_group(&self, group_id: &GroupId) -> Result<Group, StorageError>;

    /// Get all groups, ordered by id.
    async fn get_groups(&self) -> Result<Vec<Group>, StorageError>;

    /// Apply a sparse update to a group, setting its modification time.
    /// A no-op update leaves the modification time unchanged.
    async fn update_group(
        &self,
        update: &GroupUpdateParams,
        modification: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Add a member to a group. Fails if the user is already a member or
    /// is the group owner.
    async fn add_member(&self, group_id: &GroupId, member: &UserName)
        -> Result<(), StorageError>;

    /// Remove a member from a group. Fails if the user is not a regular
    /// member; the owner is not removable.
    async fn remove_member(
        &self,
        group_id: &GroupId,
        member: &UserName,
    ) -> Result<(), StorageError>;

    /// Store a new request.
    ///
    /// Fails with [`StorageError::RequestExists`] if an equivalent open
    /// request is already stored, and with [`StorageError::IdCollision`] if
    /// the request id is taken by a non-equivalent request.
    async fn store_request(&self, request: &GroupRequest) -> Result<(), StorageError>;

    /// Get a request by id.
    async fn get_request(&self, request_id: &RequestId) -> Result<GroupRequest, StorageError>;

    /// Atomically close an open request with the given terminal status.
    ///
    /// The status filter and the write are a single conditional update, so
    /// of any number of concurrent closers exactly one succeeds; the rest
    /// get [`StorageError::RequestClosed`].
    async fn close_request(
        &self,
        request_id: &RequestId,
        status: &GroupRequestStatus,
        modification: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Open requests created by the user, oldest first.
    async fn get_requests_by_requester(
        &self,
        requester: &UserName,
    ) -> Result<Vec<GroupRequest>, StorageError>;

    /// Open requests targeting the user, oldest first.
    async fn get_requests_by_target(
        &self,
        target: &UserName,
    ) -> Result<Vec<GroupRequest>, StorageError>;

    /// Open requests against the group that its administrators act on,
    /// oldest first. Excludes invitations, which only their targets act on.
    async fn get_requests_for_group(
        &self,
        group_id: &GroupId,
    ) -> Result<Vec<GroupRequest>, StorageError>;

    /// Open requests whose expiration time is at or before the given
    /// instant, oldest expiration first.
    async fn get_expired_requests(
        &self,
        expire_at: DateTime<Utc>,
    ) -> Result<Vec<GroupRequest>, StorageError>;
}
