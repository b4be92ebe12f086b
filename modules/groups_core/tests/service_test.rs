use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use sea_orm::Database;

use groups_core::domain::group::{Group, GroupType, GroupUpdateParams};
use groups_core::domain::ids::{GroupId, GroupName, RequestId, UserName};
use groups_core::domain::ports::Notifications;
use groups_core::domain::request::GroupRequest;
use groups_core::domain::status::GroupRequestStatusType;
use groups_core::{
    GroupsConfig, GroupsError, GroupsService, GroupsStorage, NewGroup, SeaOrmGroupsStorage,
    StorageError,
};

/// Records every notification so tests can assert on delivery.
#[derive(Default)]
struct RecordingNotifications {
    events: Mutex<Vec<String>>,
}

impl RecordingNotifications {
    fn record(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

fn target_list(targets: &[UserName]) -> String {
    targets
        .iter()
        .map(UserName::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

#[async_trait]
impl Notifications for RecordingNotifications {
    async fn notify(&self, targets: &[UserName], _group: &Group, request: &GroupRequest) {
        self.record(format!("notify:{}:{}", request.id(), target_list(targets)));
    }

    async fn cancel(&self, request_id: &RequestId) {
        self.record(format!("cancel:{}", request_id));
    }

    async fn deny(&self, targets: &[UserName], request: &GroupRequest) {
        self.record(format!("deny:{}:{}", request.id(), target_list(targets)));
    }

    async fn accept(&self, targets: &[UserName], request: &GroupRequest) {
        self.record(format!("accept:{}:{}", request.id(), target_list(targets)));
    }
}

async fn create_test_service() -> (
    GroupsService,
    Arc<RecordingNotifications>,
    SeaOrmGroupsStorage,
) {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to test database");
    let storage = SeaOrmGroupsStorage::new(db)
        .await
        .expect("Failed to initialize storage");
    let notifications = Arc::new(RecordingNotifications::default());
    let service = GroupsService::new(
        Arc::new(storage.clone()),
        notifications.clone(),
        GroupsConfig::default(),
    );
    (service, notifications, storage)
}

fn gid(s: &str) -> GroupId {
    GroupId::new(s).unwrap()
}

fn user(s: &str) -> UserName {
    UserName::new(s).unwrap()
}

fn new_group(id: &str, owner: &str) -> NewGroup {
    NewGroup {
        id: gid(id),
        name: GroupName::new("A Group").unwrap(),
        owner: user(owner),
        group_type: GroupType::Organization,
        description: None,
    }
}

#[test]
fn config_parses_humantime_lifetime() {
    let cfg: GroupsConfig = serde_json::from_str(r#"{"request_lifetime": "3days"}"#).unwrap();
    assert_eq!(
        cfg.request_lifetime,
        std::time::Duration::from_secs(3 * 24 * 60 * 60)
    );

    let cfg: GroupsConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(
        cfg.request_lifetime,
        std::time::Duration::from_secs(14 * 24 * 60 * 60)
    );

    assert!(serde_json::from_str::<GroupsConfig>(r#"{"bogus": 1}"#).is_err());
}

#[tokio::test]
async fn membership_request_flow() -> Result<()> {
    let (service, notifications, _storage) = create_test_service().await;
    service.create_group(new_group("g1", "alice")).await?;

    let request = service
        .request_group_membership(user("bob"), gid("g1"))
        .await?;
    assert!(request.is_open());
    assert_eq!(request.requester(), &user("bob"));

    let accepted = service
        .accept_request(&user("alice"), request.id())
        .await?;
    assert_eq!(
        accepted.status().status_type(),
        GroupRequestStatusType::Accepted
    );
    assert_eq!(accepted.status().closed_by(), Some(&user("alice")));

    let group = service.get_group(&gid("g1")).await?;
    assert!(group.is_member(&user("bob")));

    assert_eq!(
        notifications.events(),
        vec![
            format!("notify:{}:alice", request.id()),
            format!("accept:{}:bob", request.id()),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn membership_request_rejects_existing_members() -> Result<()> {
    let (service, _notifications, storage) = create_test_service().await;
    service.create_group(new_group("g1", "alice")).await?;
    storage.add_member(&gid("g1"), &user("bob")).await?;

    let err = service
        .request_group_membership(user("bob"), gid("g1"))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "User bob is already a member of group g1");

    // the owner cannot request membership in their own group
    let err = service
        .request_group_membership(user("alice"), gid("g1"))
        .await
        .unwrap_err();
    assert!(matches!(err, GroupsError::AlreadyMember { .. }));
    Ok(())
}

#[tokio::test]
async fn duplicate_membership_request_names_existing_one() -> Result<()> {
    let (service, _notifications, _storage) = create_test_service().await;
    service.create_group(new_group("g1", "alice")).await?;

    let first = service
        .request_group_membership(user("bob"), gid("g1"))
        .await?;
    let err = service
        .request_group_membership(user("bob"), gid("g1"))
        .await
        .unwrap_err();
    match err {
        GroupsError::Storage(StorageError::RequestExists(id)) => assert_eq!(id, *first.id()),
        other => panic!("expected RequestExists, got {other}"),
    }
    Ok(())
}

#[tokio::test]
async fn invitation_flow() -> Result<()> {
    let (service, notifications, _storage) = create_test_service().await;
    service.create_group(new_group("g1", "alice")).await?;

    let err = service
        .invite_user_to_group(user("bob"), gid("g1"), user("carol"))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "User bob may not administrate group g1");

    let invite = service
        .invite_user_to_group(user("alice"), gid("g1"), user("bob"))
        .await?;
    assert_eq!(invite.target(), Some(&user("bob")));

    // only the invited user may act on the invitation
    let err = service
        .accept_request(&user("alice"), invite.id())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "User alice may not accept the request");

    let denied = service
        .deny_request(&user("bob"), invite.id(), Some("no thanks".to_string()))
        .await?;
    assert_eq!(
        denied.status().status_type(),
        GroupRequestStatusType::Denied
    );
    assert_eq!(denied.status().reason(), Some("no thanks"));

    assert_eq!(
        notifications.events(),
        vec![
            format!("notify:{}:bob", invite.id()),
            format!("deny:{}:alice", invite.id()),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn accepted_invitation_adds_the_target() -> Result<()> {
    let (service, _notifications, _storage) = create_test_service().await;
    service.create_group(new_group("g1", "alice")).await?;

    let invite = service
        .invite_user_to_group(user("alice"), gid("g1"), user("bob"))
        .await?;
    service.accept_request(&user("bob"), invite.id()).await?;
    assert!(service
        .get_group(&gid("g1"))
        .await?
        .is_member(&user("bob")));
    Ok(())
}

#[tokio::test]
async fn accept_tolerates_already_admitted_member() -> Result<()> {
    let (service, notifications, _storage) = create_test_service().await;
    service.create_group(new_group("g1", "alice")).await?;

    // a join request and an invitation are not equivalent, so both can be
    // open for the same user at once
    let join = service
        .request_group_membership(user("bob"), gid("g1"))
        .await?;
    let invite = service
        .invite_user_to_group(user("alice"), gid("g1"), user("bob"))
        .await?;

    service.accept_request(&user("alice"), join.id()).await?;

    // the second accept still succeeds; bob is simply already in the group
    let accepted = service.accept_request(&user("bob"), invite.id()).await?;
    assert_eq!(
        accepted.status().status_type(),
        GroupRequestStatusType::Accepted
    );
    assert!(service
        .get_group(&gid("g1"))
        .await?
        .is_member(&user("bob")));
    assert!(notifications
        .events()
        .contains(&format!("accept:{}:alice,bob", invite.id())));
    Ok(())
}

#[tokio::test]
async fn invite_rejects_owner_and_members() -> Result<()> {
    let (service, _notifications, storage) = create_test_service().await;
    service.create_group(new_group("g1", "alice")).await?;
    storage.add_member(&gid("g1"), &user("bob")).await?;

    let err = service
        .invite_user_to_group(user("alice"), gid("g1"), user("alice"))
        .await
        .unwrap_err();
    assert!(matches!(err, GroupsError::AlreadyMember { .. }));

    let err = service
        .invite_user_to_group(user("alice"), gid("g1"), user("bob"))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "User bob is already a member of group g1");
    Ok(())
}

#[tokio::test]
async fn cancel_is_requester_only() -> Result<()> {
    let (service, notifications, _storage) = create_test_service().await;
    service.create_group(new_group("g1", "alice")).await?;
    let request = service
        .request_group_membership(user("bob"), gid("g1"))
        .await?;

    let err = service
        .cancel_request(&user("alice"), request.id())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "User alice may not cancel the request");

    let canceled = service.cancel_request(&user("bob"), request.id()).await?;
    assert_eq!(
        canceled.status().status_type(),
        GroupRequestStatusType::Canceled
    );
    assert!(notifications
        .events()
        .contains(&format!("cancel:{}", request.id())));

    // and nothing further can happen to it
    let err = service
        .accept_request(&user("alice"), request.id())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "The request is canceled, not open");
    Ok(())
}

#[tokio::test]
async fn update_group_is_owner_only() -> Result<()> {
    let (service, _notifications, _storage) = create_test_service().await;
    service.create_group(new_group("g1", "alice")).await?;

    let update = GroupUpdateParams::builder(gid("g1"))
        .with_name(GroupName::new("Renamed").unwrap())
        .build();
    let err = service
        .update_group(&user("bob"), update.clone())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "User bob may not administrate group g1");

    service.update_group(&user("alice"), update).await?;
    assert_eq!(
        service.get_group(&gid("g1")).await?.name().as_str(),
        "Renamed"
    );
    Ok(())
}

#[tokio::test]
async fn expire_requests_sweeps_past_deadline() -> Result<()> {
    let (service, notifications, _storage) = create_test_service().await;
    service.create_group(new_group("g1", "alice")).await?;
    service.create_group(new_group("g2", "alice")).await?;

    let r1 = service
        .request_group_membership(user("bob"), gid("g1"))
        .await?;
    let r2 = service
        .request_group_membership(user("bob"), gid("g2"))
        .await?;

    // nothing has expired yet
    assert!(service.expire_requests(Utc::now()).await?.is_empty());

    let after = Utc::now() + Duration::days(30);
    let mut closed = service.expire_requests(after).await?;
    closed.sort();
    let mut expected = vec![*r1.id(), *r2.id()];
    expected.sort();
    assert_eq!(closed, expected);

    // the sweep is idempotent
    assert!(service.expire_requests(after).await?.is_empty());

    for request in [&r1, &r2] {
        assert!(notifications
            .events()
            .contains(&format!("deny:{}:bob", request.id())));
    }
    Ok(())
}
