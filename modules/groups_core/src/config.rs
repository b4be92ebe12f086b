use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the groups core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupsConfig {
    /// How long a new request stays open before it may be expired.
    #[serde(default = "default_request_lifetime", with = "humantime_serde")]
    pub request_lifetime: Duration,
}

impl Default for GroupsConfig {
    fn default() -> Self {
        Self {
            request_lifetime: default_request_lifetime(),
        }
    }
}

fn default_request_lifetime() -> Duration {
    Duration::from_secs(14 * 24 * 60 * 60)
}
