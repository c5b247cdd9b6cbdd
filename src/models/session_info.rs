//! Session-info payload published by the backend home page endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    #[serde(default)]
    pub access_to_modify_expiration_date: Option<DateTime<Utc>>,
    #[serde(rename = "accessToSmashRobots", default)]
    pub access_to_smash_robots: Option<DateTime<Utc>>,
    #[serde(default)]
    pub event_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_link: Option<String>,
}

impl SessionInfo {
    pub fn event_started_at(&self, now: DateTime<Utc>) -> bool {
        self.event_date.is_some_and(|date| date < now)
    }
}
