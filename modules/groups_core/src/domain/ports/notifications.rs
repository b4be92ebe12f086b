//! Outbound notification port.

use async_trait::async_trait;

use crate::domain::group::Group;
use crate::domain::ids::{RequestId, UserName};
use crate::domain::request::GroupRequest;

/// Sends notifications about request lifecycle events to interested users.
///
/// Notifications are strictly fire and forget: the methods return nothing
/// and implementations must not panic on delivery failure. A lost
/// notification never invalidates the state change it described, so
/// implementations should log failures and move on.
#[async_trait]
pub trait Notifications: Send + Sync {
    /// A new request was stored; notify the users that can act on it.
    async fn notify(&self, targets: &[UserName], group: &Group, request: &GroupRequest);

    /// The request was canceled by its requester.
    async fn cancel(&self, request_id: &RequestId);

    /// The request was denied or has expired.
    async fn deny(&self, targets: &[UserName], request: &GroupRequest);

    /// The request was accepted; notify the requester and target.
    async fn accept(&self, targets: &[UserName], request: &GroupRequest);
}
