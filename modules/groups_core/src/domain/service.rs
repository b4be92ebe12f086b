//! The groups service: orchestrates the domain model, the storage port and
//! the notification port.
//!
//! The service never enforces uniqueness by reading first and writing
//! second; every race-sensitive invariant (duplicate open requests,
//! duplicate members, double closes) is left to the storage layer's
//! conditional writes, and the service only translates the outcomes.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::GroupsConfig;
use crate::domain::error::{TransitionError, ValidationError};
use crate::domain::group::{Group, GroupType, GroupUpdateParams};
use crate::domain::ids::{GroupId, GroupName, RequestId, UserName};
use crate::domain::ports::Notifications;
use crate::domain::request::GroupRequest;
use crate::domain::time::{CreateAndModTimes, CreateModAndExpireTimes};
use crate::storage::{GroupsStorage, StorageError};

/// Errors surfaced by the groups service.
#[derive(Error, Debug)]
pub enum GroupsError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("User {user} is already a member of group {group}")]
    AlreadyMember { user: UserName, group: GroupId },

    #[error("User {user} may not administrate group {group}")]
    Unauthorized { user: UserName, group: GroupId },
}

impl GroupsError {
    fn already_member(user: UserName, group: GroupId) -> Self {
        Self::AlreadyMember { user, group }
    }

    fn unauthorized(user: UserName, group: GroupId) -> Self {
        Self::Unauthorized { user, group }
    }
}

/// Data for creating a new group.
pub struct NewGroup {
    pub id: GroupId,
    pub name: GroupName,
    pub owner: UserName,
    pub group_type: GroupType,
    pub description: Option<String>,
}

/// The domain service for groups and group requests.
#[derive(Clone)]
pub struct GroupsService {
    storage: Arc<dyn GroupsStorage>,
    notifications: Arc<dyn Notifications>,
    config: GroupsConfig,
}

impl GroupsService {
    pub fn new(
        storage: Arc<dyn GroupsStorage>,
        notifications: Arc<dyn Notifications>,
        config: GroupsConfig,
    ) -> Self {
        Self {
            storage,
            notifications,
            config,
        }
    }

    #[instrument(skip(self, new_group), fields(group_id = %new_group.id))]
    pub async fn create_group(&self, new_group: NewGroup) -> Result<Group, GroupsError> {
        info!("Creating group");
        let times = CreateAndModTimes::from_creation(Utc::now());
        let mut builder = Group::builder(new_group.id, new_group.name, new_group.owner, times)
            .with_type(new_group.group_type);
        if let Some(description) = new_group.description {
            builder = builder.with_description(description);
        }
        let group = builder.build()?;
        self.storage.create_group(&group).await?;
        info!("Created group");
        Ok(group)
    }

    #[instrument(skip(self), fields(group_id = %group_id))]
    pub async fn get_group(&self, group_id: &GroupId) -> Result<Group, GroupsError> {
        debug!("Getting group");
        Ok(self.storage.get_group(group_id).await?)
    }

    #[instrument(skip(self))]
    pub async fn get_groups(&self) -> Result<Vec<Group>, GroupsError> {
        debug!("Listing groups");
        Ok(self.storage.get_groups().await?)
    }

    /// Apply a sparse update to a group. Only the owner may update.
    #[instrument(skip(self, update), fields(group_id = %update.group_id(), actor = %actor))]
    pub async fn update_group(
        &self,
        actor: &UserName,
        update: GroupUpdateParams,
    ) -> Result<(), GroupsError> {
        let group = self.storage.get_group(update.group_id()).await?;
        if !group.is_administrator(actor) {
            return Err(GroupsError::unauthorized(
                actor.clone(),
                update.group_id().clone(),
            ));
        }
        if !update.has_update() {
            debug!("No update requested");
            return Ok(());
        }
        self.storage.update_group(&update, Utc::now()).await?;
        info!("Updated group");
        Ok(())
    }

    /// A user asks to join a group. Notifies the group owner.
    #[instrument(skip(self), fields(group_id = %group_id, user = %user))]
    pub async fn request_group_membership(
        &self,
        user: UserName,
        group_id: GroupId,
    ) -> Result<GroupRequest, GroupsError> {
        let group = self.storage.get_group(&group_id).await?;
        if group.is_administrator(&user) || group.is_member(&user) {
            return Err(GroupsError::already_member(user, group_id));
        }
        let request = GroupRequest::builder(
            RequestId::new_random(),
            group_id,
            user,
            self.request_times()?,
        )
        .build()?;
        self.storage.store_request(&request).await?;
        info!(request_id = %request.id(), "Stored membership request");
        self.notifications
            .notify(&[group.owner().clone()], &group, &request)
            .await;
        Ok(request)
    }

    /// A group owner invites a user to the group. Notifies the target.
    #[instrument(skip(self), fields(group_id = %group_id, actor = %actor, target = %target))]
    pub async fn invite_user_to_group(
        &self,
        actor: UserName,
        group_id: GroupId,
        target: UserName,
    ) -> Result<GroupRequest, GroupsError> {
        let group = self.storage.get_group(&group_id).await?;
        if !group.is_administrator(&actor) {
            return Err(GroupsError::unauthorized(actor, group_id));
        }
        if group.is_administrator(&target) || group.is_member(&target) {
            return Err(GroupsError::already_member(target, group_id));
        }
        let request = GroupRequest::builder(
            RequestId::new_random(),
            group_id,
            actor,
            self.request_times()?,
        )
        .with_invite_to_group(target.clone())
        .build()?;
        self.storage.store_request(&request).await?;
        info!(request_id = %request.id(), "Stored invitation");
        self.notifications
            .notify(&[target], &group, &request)
            .await;
        Ok(request)
    }

    /// The requester cancels their own open request.
    #[instrument(skip(self), fields(request_id = %request_id, actor = %actor))]
    pub async fn cancel_request(
        &self,
        actor: &UserName,
        request_id: &RequestId,
    ) -> Result<GroupRequest, GroupsError> {
        let request = self.storage.get_request(request_id).await?;
        let status = request.cancel(actor)?;
        self.storage
            .close_request(request_id, &status, Utc::now())
            .await?;
        info!("Canceled request");
        self.notifications.cancel(request_id).await;
        Ok(self.storage.get_request(request_id).await?)
    }

    /// The designated approver denies an open request.
    #[instrument(skip(self, reason), fields(request_id = %request_id, actor = %actor))]
    pub async fn deny_request(
        &self,
        actor: &UserName,
        request_id: &RequestId,
        reason: Option<String>,
    ) -> Result<GroupRequest, GroupsError> {
        let request = self.storage.get_request(request_id).await?;
        let group = self.storage.get_group(request.group_id()).await?;
        let status = request.deny(actor, reason, &group)?;
        self.storage
            .close_request(request_id, &status, Utc::now())
            .await?;
        info!("Denied request");
        let request = self.storage.get_request(request_id).await?;
        self.notifications
            .deny(&[request.requester().clone()], &request)
            .await;
        Ok(request)
    }

    /// The designated approver accepts an open request; the prospective
    /// member joins the group.
    #[instrument(skip(self), fields(request_id = %request_id, actor = %actor))]
    pub async fn accept_request(
        &self,
        actor: &UserName,
        request_id: &RequestId,
    ) -> Result<GroupRequest, GroupsError> {
        let request = self.storage.get_request(request_id).await?;
        let group = self.storage.get_group(request.group_id()).await?;
        let status = request.accept(actor, &group)?;
        // closing first makes the close the single winner selection point;
        // only the winner performs the membership mutation
        self.storage
            .close_request(request_id, &status, Utc::now())
            .await?;
        match self
            .storage
            .add_member(request.group_id(), request.prospective_member())
            .await
        {
            Ok(()) => {}
            // another accepted request already admitted them, e.g. a join
            // request and an invitation open for the same user
            Err(StorageError::UserIsMember { .. }) => {
                debug!(member = %request.prospective_member(), "Already a member");
            }
            Err(e) => return Err(e.into()),
        }
        info!(member = %request.prospective_member(), "Accepted request");
        let request = self.storage.get_request(request_id).await?;
        let mut targets = vec![request.requester().clone()];
        if let Some(target) = request.target() {
            if target != request.requester() {
                targets.push(target.clone());
            }
        }
        self.notifications.accept(&targets, &request).await;
        Ok(request)
    }

    /// Close every open request whose expiration time has passed. Returns
    /// the ids of the requests this sweep closed; requests closed by a
    /// concurrent actor are skipped.
    #[instrument(skip(self))]
    pub async fn expire_requests(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<RequestId>, GroupsError> {
        let mut closed = Vec::new();
        for request in self.storage.get_expired_requests(now).await? {
            let status = match request.expire(now) {
                Ok(status) => status,
                // raced with a concurrent close
                Err(TransitionError::NotOpen { .. }) => continue,
                Err(e) => return Err(e.into()),
            };
            match self
                .storage
                .close_request(request.id(), &status, now)
                .await
            {
                Ok(()) => {
                    self.notifications
                        .deny(&[request.requester().clone()], &request)
                        .await;
                    closed.push(*request.id());
                }
                Err(StorageError::RequestClosed { .. }) | Err(StorageError::NoSuchRequest { .. }) => {
                    warn!(request_id = %request.id(), "Request closed concurrently, skipping");
                }
                Err(e) => return Err(e.into()),
            }
        }
        info!(count = closed.len(), "Expired requests");
        Ok(closed)
    }

    fn request_times(&self) -> Result<CreateModAndExpireTimes, ValidationError> {
        let now = Utc::now();
        let lifetime = chrono::Duration::from_std(self.config.request_lifetime)
            .map_err(|_| ValidationError::illegal_parameter("request lifetime out of range"))?;
        CreateModAndExpireTimes::builder(now, now + lifetime).build()
    }
}
