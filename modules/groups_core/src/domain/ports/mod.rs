pub mod notifications;
pub mod resources;

pub use notifications::Notifications;
pub use resources::{ResourceHandler, ResourceHandlerError, ResourceId, ResourcePermission};
