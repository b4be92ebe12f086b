//! Core of the groups service: the group and request domain model, the
//! request lifecycle state machine, the storage port with its consistency
//! guarantees, and the SeaORM storage adapter.

pub mod config;
pub mod domain;
pub mod infra;
pub mod storage;

pub use config::GroupsConfig;
pub use domain::service::{GroupsError, GroupsService, NewGroup};
pub use infra::storage::SeaOrmGroupsStorage;
pub use storage::{GroupsStorage, StorageError, StorageInitError};
