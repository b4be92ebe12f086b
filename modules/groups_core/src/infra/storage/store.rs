//! SeaORM implementation of the storage port.
//!
//! Every uniqueness rule the port promises is enforced by a database
//! constraint, never by a check-then-act read: group ids and member rows by
//! primary keys, and the one-open-equivalent-request rule by the unique
//! index on `natural_key`. Closing a request is a single conditional update
//! filtered on the open status, so concurrent closers cannot both win.

use std::collections::BTreeMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, SqlErr, TransactionTrait,
};
use sea_orm_migration::MigratorTrait;

use crate::domain::fields::FieldUpdate;
use crate::domain::group::{Group, GroupUpdateParams};
use crate::domain::ids::{GroupId, RequestId, UserName};
use crate::domain::request::{GroupRequest, GroupRequestType};
use crate::domain::status::{GroupRequestStatus, GroupRequestStatusType};
use crate::infra::storage::entity::{
    group_custom_fields, group_members, groups, requests, schema_config,
};
use crate::infra::storage::mapper;
use crate::infra::storage::migrations::Migrator;
use crate::storage::{GroupsStorage, StorageError, StorageInitError};

const SCHEMA_VERSION: i32 = 1;
const SCHEMA_KEY: &str = "schema";

/// Groups storage backed by a SeaORM [`DatabaseConnection`].
#[derive(Clone, Debug)]
pub struct SeaOrmGroupsStorage {
    db: DatabaseConnection,
}

fn comms(e: DbErr) -> StorageError {
    StorageError::comms(e.to_string())
}

fn is_unique_violation(e: &DbErr) -> Option<String> {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(msg)) => Some(msg),
        _ => None,
    }
}

impl SeaOrmGroupsStorage {
    /// Connect the storage to the database: run migrations, then verify the
    /// schema version. Must complete before any other call.
    pub async fn new(db: DatabaseConnection) -> Result<Self, StorageInitError> {
        Migrator::up(&db, None)
            .await
            .map_err(|e| StorageInitError::comms(e.to_string()))?;
        let store = Self { db };
        store.check_config().await?;
        Ok(store)
    }

    /// Install the schema version row on first startup, or verify it on
    /// subsequent ones. Insert-first so two concurrent first startups
    /// cannot both install; the loser falls into the verify path.
    async fn check_config(&self) -> Result<(), StorageInitError> {
        let cfg = schema_config::ActiveModel {
            schema_key: Set(SCHEMA_KEY.to_string()),
            schema_version: Set(SCHEMA_VERSION),
            in_update: Set(false),
        };
        match schema_config::Entity::insert(cfg).exec(&self.db).await {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e).is_some() => {
                let rows = schema_config::Entity::find()
                    .all(&self.db)
                    .await
                    .map_err(|e| StorageInitError::comms(e.to_string()))?;
                if rows.len() != 1 {
                    return Err(StorageInitError::invalid_config(
                        "Multiple config objects found in the database. \
                         This should not happen, something is very wrong.",
                    ));
                }
                let cfg = &rows[0];
                if cfg.schema_version != SCHEMA_VERSION {
                    return Err(StorageInitError::SchemaMismatch {
                        server: SCHEMA_VERSION,
                        db: cfg.schema_version,
                    });
                }
                if cfg.in_update {
                    return Err(StorageInitError::UpdateInProgress {
                        db: cfg.schema_version,
                    });
                }
                Ok(())
            }
            Err(e) => Err(StorageInitError::comms(e.to_string())),
        }
    }

    async fn get_group_row(&self, group_id: &GroupId) -> Result<groups::Model, StorageError> {
        groups::Entity::find_by_id(group_id.as_str())
            .one(&self.db)
            .await
            .map_err(comms)?
            .ok_or_else(|| StorageError::no_such_group(group_id.clone()))
    }

    /// Attribute a unique index violation on a request insert to the index
    /// that fired. The driver message is backend specific, so follow-up
    /// reads are authoritative; the message only picks which read runs
    /// first.
    async fn attribute_request_collision(
        &self,
        request: &GroupRequest,
        message: &str,
    ) -> StorageError {
        let check_natural_key_first = message.contains("natural_key");
        if check_natural_key_first {
            if let Some(err) = self.find_open_equivalent(request).await {
                return err;
            }
            if let Some(err) = self.find_id_collision(request).await {
                return err;
            }
        } else {
            if let Some(err) = self.find_id_collision(request).await {
                return err;
            }
            if let Some(err) = self.find_open_equivalent(request).await {
                return err;
            }
        }
        StorageError::unexpected_value(format!(
            "unable to attribute unique index violation storing request {}: {}",
            request.id(),
            message
        ))
    }

    async fn find_open_equivalent(&self, request: &GroupRequest) -> Option<StorageError> {
        let found = requests::Entity::find()
            .filter(requests::Column::NaturalKey.eq(request.natural_key()))
            .one(&self.db)
            .await;
        match found {
            Ok(Some(row)) => Some(StorageError::RequestExists(RequestId::new(row.id))),
            Ok(None) => None,
            Err(e) => Some(comms(e)),
        }
    }

    async fn find_id_collision(&self, request: &GroupRequest) -> Option<StorageError> {
        let found = requests::Entity::find_by_id(request.id().as_uuid())
            .one(&self.db)
            .await;
        match found {
            Ok(Some(_)) => Some(StorageError::IdCollision(*request.id())),
            Ok(None) => None,
            Err(e) => Some(comms(e)),
        }
    }

    fn open_requests(
        &self,
        rows: Result<Vec<requests::Model>, DbErr>,
    ) -> Result<Vec<GroupRequest>, StorageError> {
        rows.map_err(comms)?
            .into_iter()
            .map(mapper::request_from_row)
            .collect()
    }
}

#[async_trait]
impl GroupsStorage for SeaOrmGroupsStorage {
    async fn create_group(&self, group: &Group) -> Result<(), StorageError> {
        let txn = self.db.begin().await.map_err(comms)?;
        let row = groups::ActiveModel {
            id: Set(group.id().as_str().to_string()),
            name: Set(group.name().as_str().to_string()),
            owner: Set(group.owner().as_str().to_string()),
            group_type: Set(group.group_type().label().to_string()),
            description: Set(group.description().map(str::to_string)),
            created_at: Set(group.times().creation()),
            updated_at: Set(group.times().modification()),
        };
        if let Err(e) = groups::Entity::insert(row).exec(&txn).await {
            return if is_unique_violation(&e).is_some() {
                Err(StorageError::group_exists(group.id().clone()))
            } else {
                Err(comms(e))
            };
        }
        for member in group.members() {
            let row = group_members::ActiveModel {
                group_id: Set(group.id().as_str().to_string()),
                user_name: Set(member.as_str().to_string()),
            };
            group_members::Entity::insert(row)
                .exec(&txn)
                .await
                .map_err(comms)?;
        }
        for (field, value) in group.custom_fields() {
            let row = group_custom_fields::ActiveModel {
                group_id: Set(group.id().as_str().to_string()),
                field: Set(field.to_string()),
                value: Set(value.clone()),
            };
            group_custom_fields::Entity::insert(row)
                .exec(&txn)
                .await
                .map_err(comms)?;
        }
        txn.commit().await.map_err(comms)
    }

    async fn get_group(&self, group_id: &GroupId) -> Result<Group, StorageError> {
        let group = self.get_group_row(group_id).await?;
        let members = group_members::Entity::find()
            .filter(group_members::Column::GroupId.eq(group_id.as_str()))
            .all(&self.db)
            .await
            .map_err(comms)?;
        let fields = group_custom_fields::Entity::find()
            .filter(group_custom_fields::Column::GroupId.eq(group_id.as_str()))
            .all(&self.db)
            .await
            .map_err(comms)?;
        mapper::group_from_rows(group, members, fields)
    }

    async fn get_groups(&self) -> Result<Vec<Group>, StorageError> {
        let group_rows = groups::Entity::find()
            .order_by_asc(groups::Column::Id)
            .all(&self.db)
            .await
            .map_err(comms)?;
        let mut members: BTreeMap<String, Vec<group_members::Model>> = BTreeMap::new();
        for row in group_members::Entity::find()
            .all(&self.db)
            .await
            .map_err(comms)?
        {
            members.entry(row.group_id.clone()).or_default().push(row);
        }
        let mut fields: BTreeMap<String, Vec<group_custom_fields::Model>> = BTreeMap::new();
        for row in group_custom_fields::Entity::find()
            .all(&self.db)
            .await
            .map_err(comms)?
        {
            fields.entry(row.group_id.clone()).or_default().push(row);
        }
        group_rows
            .into_iter()
            .map(|g| {
                let m = members.remove(&g.id).unwrap_or_default();
                let f = fields.remove(&g.id).unwrap_or_default();
                mapper::group_from_rows(g, m, f)
            })
            .collect()
    }

    async fn update_group(
        &self,
        update: &GroupUpdateParams,
        modification: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        if !update.has_update() {
            return Ok(());
        }
        let txn = self.db.begin().await.map_err(comms)?;
        let existing = groups::Entity::find_by_id(update.group_id().as_str())
            .one(&txn)
            .await
            .map_err(comms)?;
        if existing.is_none() {
            return Err(StorageError::no_such_group(update.group_id().clone()));
        }
        let mut row = groups::ActiveModel {
            id: Set(update.group_id().as_str().to_string()),
            ..Default::default()
        };
        if let Some(name) = update.name() {
            row.name = Set(name.as_str().to_string());
        }
        if let Some(group_type) = update.group_type() {
            row.group_type = Set(group_type.label().to_string());
        }
        match update.optional_fields().description() {
            FieldUpdate::NoAction => {}
            FieldUpdate::Remove => row.description = Set(None),
            FieldUpdate::Set(d) => row.description = Set(Some(d.clone())),
        }
        row.updated_at = Set(modification);
        row.update(&txn).await.map_err(comms)?;
        for (field, field_update) in update.optional_fields().custom_fields() {
            match field_update {
                // rejected when the update params are built
                FieldUpdate::NoAction => {}
                FieldUpdate::Remove => {
                    group_custom_fields::Entity::delete_many()
                        .filter(
                            group_custom_fields::Column::GroupId.eq(update.group_id().as_str()),
                        )
                        .filter(group_custom_fields::Column::Field.eq(field.to_string()))
                        .exec(&txn)
                        .await
                        .map_err(comms)?;
                }
                FieldUpdate::Set(value) => {
                    let row = group_custom_fields::ActiveModel {
                        group_id: Set(update.group_id().as_str().to_string()),
                        field: Set(field.to_string()),
                        value: Set(value.clone()),
                    };
                    group_custom_fields::Entity::insert(row)
                        .on_conflict(
                            OnConflict::columns([
                                group_custom_fields::Column::GroupId,
                                group_custom_fields::Column::Field,
                            ])
                            .update_column(group_custom_fields::Column::Value)
                            .to_owned(),
                        )
                        .exec(&txn)
                        .await
                        .map_err(comms)?;
                }
            }
        }
        txn.commit().await.map_err(comms)
    }

    async fn add_member(
        &self,
        group_id: &GroupId,
        member: &UserName,
    ) -> Result<(), StorageError> {
        let group = self.get_group_row(group_id).await?;
        if group.owner == member.as_str() {
            return Err(StorageError::member_is_owner(member, group_id));
        }
        let row = group_members::ActiveModel {
            group_id: Set(group_id.as_str().to_string()),
            user_name: Set(member.as_str().to_string()),
        };
        match group_members::Entity::insert(row).exec(&self.db).await {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e).is_some() => {
                Err(StorageError::member_exists(member, group_id))
            }
            Err(e) => Err(comms(e)),
        }
    }

    async fn remove_member(
        &self,
        group_id: &GroupId,
        member: &UserName,
    ) -> Result<(), StorageError> {
        // fail on a missing group rather than reporting a missing member
        self.get_group_row(group_id).await?;
        let result = group_members::Entity::delete_many()
            .filter(group_members::Column::GroupId.eq(group_id.as_str()))
            .filter(group_members::Column::UserName.eq(member.as_str()))
            .exec(&self.db)
            .await
            .map_err(comms)?;
        if result.rows_affected == 0 {
            return Err(StorageError::no_such_member(member, group_id));
        }
        Ok(())
    }

    async fn store_request(&self, request: &GroupRequest) -> Result<(), StorageError> {
        let status = request.status();
        let row = requests::ActiveModel {
            id: Set(request.id().as_uuid()),
            group_id: Set(request.group_id().as_str().to_string()),
            requester: Set(request.requester().as_str().to_string()),
            request_type: Set(request.request_type().label().to_string()),
            target: Set(request.target().map(|t| t.as_str().to_string())),
            status: Set(status.status_type().label().to_string()),
            closed_by: Set(status.closed_by().map(|u| u.as_str().to_string())),
            closed_reason: Set(status.reason().map(str::to_string)),
            created_at: Set(request.creation_date()),
            updated_at: Set(request.modification_date()),
            expires_at: Set(request.expiration_date()),
            // the deduplication key only binds while the request is open
            natural_key: Set(request.is_open().then(|| request.natural_key())),
        };
        match requests::Entity::insert(row).exec(&self.db).await {
            Ok(_) => Ok(()),
            Err(e) => match is_unique_violation(&e) {
                Some(msg) => Err(self.attribute_request_collision(request, &msg).await),
                None => Err(comms(e)),
            },
        }
    }

    async fn get_request(&self, request_id: &RequestId) -> Result<GroupRequest, StorageError> {
        let row = requests::Entity::find_by_id(request_id.as_uuid())
            .one(&self.db)
            .await
            .map_err(comms)?
            .ok_or_else(|| StorageError::no_such_request(*request_id))?;
        mapper::request_from_row(row)
    }

    async fn close_request(
        &self,
        request_id: &RequestId,
        status: &GroupRequestStatus,
        modification: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        if status.is_open() {
            return Err(StorageError::invalid_argument(
                "the replacement status may not be open",
            ));
        }
        let result = requests::Entity::update_many()
            .col_expr(
                requests::Column::Status,
                Expr::value(status.status_type().label()),
            )
            .col_expr(
                requests::Column::ClosedBy,
                Expr::value(status.closed_by().map(|u| u.as_str().to_string())),
            )
            .col_expr(
                requests::Column::ClosedReason,
                Expr::value(status.reason().map(str::to_string)),
            )
            .col_expr(requests::Column::UpdatedAt, Expr::value(modification))
            .col_expr(requests::Column::NaturalKey, Expr::value(Option::<String>::None))
            .filter(requests::Column::Id.eq(request_id.as_uuid()))
            .filter(requests::Column::Status.eq(GroupRequestStatusType::Open.label()))
            .exec(&self.db)
            .await
            .map_err(comms)?;
        if result.rows_affected == 0 {
            let row = requests::Entity::find_by_id(request_id.as_uuid())
                .one(&self.db)
                .await
                .map_err(comms)?
                .ok_or_else(|| StorageError::no_such_request(*request_id))?;
            let current = GroupRequestStatusType::from_str(&row.status)
                .map_err(|e| StorageError::unexpected_value(e.to_string()))?;
            return Err(StorageError::RequestClosed {
                id: *request_id,
                status: current,
            });
        }
        Ok(())
    }

    async fn get_requests_by_requester(
        &self,
        requester: &UserName,
    ) -> Result<Vec<GroupRequest>, StorageError> {
        let rows = requests::Entity::find()
            .filter(requests::Column::Requester.eq(requester.as_str()))
            .filter(requests::Column::Status.eq(GroupRequestStatusType::Open.label()))
            .order_by_asc(requests::Column::CreatedAt)
            .order_by_asc(requests::Column::Id)
            .all(&self.db)
            .await;
        self.open_requests(rows)
    }

    async fn get_requests_by_target(
        &self,
        target: &UserName,
    ) -> Result<Vec<GroupRequest>, StorageError> {
        let rows = requests::Entity::find()
            .filter(requests::Column::Target.eq(target.as_str()))
            .filter(requests::Column::Status.eq(GroupRequestStatusType::Open.label()))
            .order_by_asc(requests::Column::CreatedAt)
            .order_by_asc(requests::Column::Id)
            .all(&self.db)
            .await;
        self.open_requests(rows)
    }

    async fn get_requests_for_group(
        &self,
        group_id: &GroupId,
    ) -> Result<Vec<GroupRequest>, StorageError> {
        let rows = requests::Entity::find()
            .filter(requests::Column::GroupId.eq(group_id.as_str()))
            .filter(requests::Column::Status.eq(GroupRequestStatusType::Open.label()))
            // invitations are acted on by their targets, not the group
            .filter(
                requests::Column::RequestType
                    .eq(GroupRequestType::RequestGroupMembership.label()),
            )
            .order_by_asc(requests::Column::CreatedAt)
            .order_by_asc(requests::Column::Id)
            .all(&self.db)
            .await;
        self.open_requests(rows)
    }

    async fn get_expired_requests(
        &self,
        expire_at: DateTime<Utc>,
    ) -> Result<Vec<GroupRequest>, StorageError> {
        let rows = requests::Entity::find()
            .filter(requests::Column::Status.eq(GroupRequestStatusType::Open.label()))
            .filter(requests::Column::ExpiresAt.lte(expire_at))
            .order_by_asc(requests::Column::ExpiresAt)
            .order_by_asc(requests::Column::Id)
            .all(&self.db)
            .await;
        self.open_requests(rows)
    }
}
