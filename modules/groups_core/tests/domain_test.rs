use chrono::{Duration, TimeZone, Utc};

use groups_core::domain::error::{TransitionError, ValidationError};
use groups_core::domain::fields::{FieldUpdate, NumberedCustomField, OptionalGroupFields};
use groups_core::domain::fields::FieldConfiguration;
use groups_core::domain::group::{Group, GroupType};
use groups_core::domain::ids::{GroupId, GroupName, RequestId, UserName};
use groups_core::domain::ports::{ResourceId, ResourcePermission};
use groups_core::domain::request::{GroupRequest, GroupRequestType};
use groups_core::domain::status::{GroupRequestStatus, GroupRequestStatusType};
use groups_core::domain::time::{CreateAndModTimes, CreateModAndExpireTimes};

fn gid(s: &str) -> GroupId {
    GroupId::new(s).expect("valid group id")
}

fn user(s: &str) -> UserName {
    UserName::new(s).expect("valid user name")
}

fn group_times() -> CreateAndModTimes {
    CreateAndModTimes::from_creation(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
}

fn request_times() -> CreateModAndExpireTimes {
    let creation = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    CreateModAndExpireTimes::builder(creation, creation + Duration::days(14))
        .build()
        .expect("valid times")
}

fn group(id: &str, owner: &str) -> Group {
    Group::builder(
        gid(id),
        GroupName::new("A Group").unwrap(),
        user(owner),
        group_times(),
    )
    .build()
    .expect("valid group")
}

fn membership_request(id: RequestId, group: &str, requester: &str) -> GroupRequest {
    GroupRequest::builder(id, gid(group), user(requester), request_times())
        .build()
        .expect("valid request")
}

#[test]
fn group_id_validation() {
    assert!(GroupId::new("g").is_ok());
    assert!(GroupId::new("my-group-42").is_ok());
    // leading/trailing whitespace is trimmed
    assert_eq!(GroupId::new("  g1  ").unwrap().as_str(), "g1");

    let err = GroupId::new("   ").unwrap_err();
    assert_eq!(err.to_string(), "Missing input parameter: group id");

    let err = GroupId::new("1group").unwrap_err();
    assert!(matches!(err, ValidationError::IllegalParameter { .. }));

    let err = GroupId::new("gro*up").unwrap_err();
    assert_eq!(err.to_string(), "Illegal character in group id gro*up: *");

    assert!(GroupId::new("g".repeat(100)).is_ok());
    assert!(GroupId::new("g".repeat(101)).is_err());
}

#[test]
fn user_name_validation() {
    assert!(UserName::new("alice42").is_ok());
    let err = UserName::new("al_ice").unwrap_err();
    assert_eq!(err.to_string(), "Illegal character in user name al_ice: _");
    let err = UserName::new("").unwrap_err();
    assert_eq!(err.to_string(), "Missing input parameter: user name");
    assert!(UserName::new("Alice").is_err());
}

#[test]
fn request_id_parse() {
    let id = RequestId::new_random();
    let parsed = RequestId::parse(&id.to_string()).unwrap();
    assert_eq!(parsed, id);
    let err = RequestId::parse("not-a-uuid").unwrap_err();
    assert_eq!(err.to_string(), "Illegal request ID: not-a-uuid");
}

#[test]
fn times_ordering() {
    let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    assert!(CreateAndModTimes::new(t0, t0).is_ok());
    assert!(CreateAndModTimes::new(t0, t0 - Duration::seconds(1)).is_err());

    // expiration must be after modification at creation
    let err = CreateModAndExpireTimes::builder(t0, t0).build().unwrap_err();
    assert!(err
        .to_string()
        .contains("is not later than modification time"));

    // a stored closed request may have been modified past expiration
    let stored =
        CreateModAndExpireTimes::from_stored(t0, t0 + Duration::days(20), t0 + Duration::days(14))
            .unwrap();
    assert_eq!(stored.expiration(), t0 + Duration::days(14));
    assert!(CreateModAndExpireTimes::from_stored(t0, t0 - Duration::days(1), t0).is_err());
}

#[test]
fn status_construction_rules() {
    let s = GroupRequestStatus::denied(user("bob"), Some("  ".to_string()));
    // whitespace-only reasons are dropped
    assert_eq!(s.reason(), None);
    assert_eq!(s.closed_by(), Some(&user("bob")));

    let err = GroupRequestStatus::from_parts(
        GroupRequestStatusType::Canceled,
        Some(user("bob")),
        None,
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "a canceled status may not have a closing user");

    let err =
        GroupRequestStatus::from_parts(GroupRequestStatusType::Denied, None, None).unwrap_err();
    assert_eq!(err.to_string(), "Missing input parameter: closed by");

    let err = GroupRequestStatus::from_parts(
        GroupRequestStatusType::Accepted,
        Some(user("bob")),
        Some("nope".to_string()),
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "an accepted status may not have a reason");

    let ok = GroupRequestStatus::from_parts(
        GroupRequestStatusType::Denied,
        Some(user("bob")),
        Some("not today".to_string()),
    )
    .unwrap();
    assert_eq!(ok.reason(), Some("not today"));
}

#[test]
fn status_labels_round_trip() {
    for status in [
        GroupRequestStatusType::Open,
        GroupRequestStatusType::Canceled,
        GroupRequestStatusType::Expired,
        GroupRequestStatusType::Denied,
        GroupRequestStatusType::Accepted,
    ] {
        assert_eq!(status.label().parse::<GroupRequestStatusType>().unwrap(), status);
    }
    let err = "shut".parse::<GroupRequestStatusType>().unwrap_err();
    assert_eq!(err.to_string(), "Invalid request status type: shut");
}

#[test]
fn numbered_custom_field_parse() {
    let f = NumberedCustomField::parse("mapping-3").unwrap();
    assert_eq!(f.field(), "mapping");
    assert_eq!(f.number(), Some(3));
    assert!(f.is_numbered());
    assert_eq!(f.to_string(), "mapping-3");

    let f = NumberedCustomField::parse("mapping").unwrap();
    assert!(!f.is_numbered());

    let err = NumberedCustomField::parse("mapping-0").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Suffix after - of field mapping-0 must be an integer > 0"
    );
    assert!(NumberedCustomField::parse("mapping-x").is_err());
    let err = NumberedCustomField::parse("map!ing").unwrap_err();
    assert_eq!(err.to_string(), "Illegal character in custom field map!ing: !");
}

#[test]
fn optional_fields_reject_noop_entries() {
    let field = NumberedCustomField::parse("mapping").unwrap();
    let err = OptionalGroupFields::builder()
        .with_custom_field(field, FieldUpdate::NoAction)
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("may not be a no-op"));

    let fields = OptionalGroupFields::builder()
        .with_description(FieldUpdate::Remove)
        .build()
        .unwrap();
    assert!(fields.has_update());
    assert!(!OptionalGroupFields::none().has_update());
}

#[test]
fn description_update_follows_group_description_rules() {
    let err = OptionalGroupFields::builder()
        .with_description(FieldUpdate::set("x".repeat(5001)).unwrap())
        .build()
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "description exceeds the maximum length of 5000"
    );

    // the stored value is the trimmed one, same as at group creation
    let fields = OptionalGroupFields::builder()
        .with_description(FieldUpdate::set("  trimmed  ").unwrap())
        .build()
        .unwrap();
    assert_eq!(fields.description().as_set(), Some("trimmed"));

    assert!(OptionalGroupFields::builder()
        .with_description(FieldUpdate::Set("  ".to_string()))
        .build()
        .is_err());
}

#[test]
fn field_configuration_defaults_and_builder() {
    let cfg = FieldConfiguration::default();
    assert!(!cfg.is_numbered());
    assert!(!cfg.is_public());
    assert!(!cfg.is_minimal_view());

    let cfg = FieldConfiguration::builder()
        .with_numbered(true)
        .with_minimal_view(true)
        .build();
    assert!(cfg.is_numbered());
    assert!(!cfg.is_public());
    assert!(cfg.is_minimal_view());
}

#[test]
fn resource_id_validation() {
    assert_eq!(ResourceId::new(42).unwrap().get(), 42);
    let err = ResourceId::new(0).unwrap_err();
    assert_eq!(err.to_string(), "Resource IDs are > 0");

    assert_eq!("7".parse::<ResourceId>().unwrap().get(), 7);
    let err = "seven".parse::<ResourceId>().unwrap_err();
    assert_eq!(err.to_string(), "Illegal resource ID: seven");

    // permissions order by strength
    assert!(ResourcePermission::Admin > ResourcePermission::Write);
    assert!(ResourcePermission::Read > ResourcePermission::None);
}

#[test]
fn group_owner_may_not_be_member() {
    let err = Group::builder(
        gid("g1"),
        GroupName::new("A Group").unwrap(),
        user("alice"),
        group_times(),
    )
    .with_member(user("alice"))
    .build()
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Group owner alice may not be a member of the group"
    );
}

#[test]
fn group_membership_queries() {
    let g = Group::builder(
        gid("g1"),
        GroupName::new("A Group").unwrap(),
        user("alice"),
        group_times(),
    )
    .with_member(user("bob"))
    .build()
    .unwrap();
    assert!(g.is_member(&user("bob")));
    // the owner is an administrator, not a member
    assert!(!g.is_member(&user("alice")));
    assert!(g.is_administrator(&user("alice")));
    assert!(!g.is_administrator(&user("bob")));
    assert_eq!(g.group_type(), GroupType::Organization);
}

#[test]
fn request_target_consistency() {
    let err = GroupRequest::builder(
        RequestId::new_random(),
        gid("g1"),
        user("alice"),
        request_times(),
    )
    .with_type(GroupRequestType::InviteToGroup, None)
    .build()
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "requests of type invite_to_group require a target user"
    );

    let err = GroupRequest::builder(
        RequestId::new_random(),
        gid("g1"),
        user("alice"),
        request_times(),
    )
    .with_type(GroupRequestType::RequestGroupMembership, Some(user("bob")))
    .build()
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "requests of type request_group_membership may not have a target user"
    );
}

#[test]
fn request_natural_key_and_equivalence() {
    let r1 = membership_request(RequestId::new_random(), "g1", "alice");
    let r2 = membership_request(RequestId::new_random(), "g1", "alice");
    assert_eq!(r1.natural_key(), "g1|alice|request_group_membership|");
    assert!(r1.is_equivalent(&r2));

    let invite = GroupRequest::builder(
        RequestId::new_random(),
        gid("g1"),
        user("alice"),
        request_times(),
    )
    .with_invite_to_group(user("bob"))
    .build()
    .unwrap();
    assert_eq!(invite.natural_key(), "g1|alice|invite_to_group|bob");
    assert!(!r1.is_equivalent(&invite));
    assert_eq!(invite.prospective_member(), &user("bob"));
    assert_eq!(r1.prospective_member(), &user("alice"));
}

#[test]
fn cancel_requires_requester() {
    let r = membership_request(RequestId::new_random(), "g1", "alice");
    let err = r.cancel(&user("bob")).unwrap_err();
    assert_eq!(err.to_string(), "User bob may not cancel the request");
    let status = r.cancel(&user("alice")).unwrap();
    assert_eq!(status.status_type(), GroupRequestStatusType::Canceled);
}

#[test]
fn expire_requires_deadline_passed() {
    let r = membership_request(RequestId::new_random(), "g1", "alice");
    let before = r.expiration_date() - Duration::seconds(1);
    assert!(matches!(
        r.expire(before),
        Err(TransitionError::NotExpired { .. })
    ));
    let status = r.expire(r.expiration_date()).unwrap();
    assert_eq!(status.status_type(), GroupRequestStatusType::Expired);
}

#[test]
fn membership_request_approver_is_owner() {
    let g = group("g1", "owner");
    let r = membership_request(RequestId::new_random(), "g1", "alice");

    let err = r.accept(&user("alice"), &g).unwrap_err();
    assert_eq!(err.to_string(), "User alice may not accept the request");

    let status = r.accept(&user("owner"), &g).unwrap();
    assert_eq!(status.status_type(), GroupRequestStatusType::Accepted);
    assert_eq!(status.closed_by(), Some(&user("owner")));

    // a different group's owner may not approve
    let other = group("g2", "owner2");
    assert!(r.deny(&user("owner2"), None, &other).is_err());
}

#[test]
fn invite_approver_is_target() {
    let g = group("g1", "owner");
    let r = GroupRequest::builder(
        RequestId::new_random(),
        gid("g1"),
        user("owner"),
        request_times(),
    )
    .with_invite_to_group(user("bob"))
    .build()
    .unwrap();

    // not even the owner may accept an invitation for the target
    let err = r.accept(&user("owner"), &g).unwrap_err();
    assert_eq!(err.to_string(), "User owner may not accept the request");

    let status = r.deny(&user("bob"), Some("no thanks".to_string()), &g).unwrap();
    assert_eq!(status.status_type(), GroupRequestStatusType::Denied);
    assert_eq!(status.reason(), Some("no thanks"));
}

#[test]
fn transitions_require_open_status() {
    let g = group("g1", "owner");
    let r = GroupRequest::builder(
        RequestId::new_random(),
        gid("g1"),
        user("alice"),
        request_times(),
    )
    .with_status(GroupRequestStatus::canceled())
    .build()
    .unwrap();

    let err = r.cancel(&user("alice")).unwrap_err();
    assert_eq!(err.to_string(), "The request is canceled, not open");
    assert!(r.expire(r.expiration_date()).is_err());
    assert!(r.accept(&user("owner"), &g).is_err());
    assert!(r.deny(&user("owner"), None, &g).is_err());
}
