//! Push notification envelopes for entity add/delete events.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeMethod {
    Add,
    Delete,
}

/// Entity fields carried by a constructor envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeData {
    #[serde(default)]
    pub robot_uuid: Option<Uuid>,
    #[serde(rename = "konstruktor_id", default)]
    pub constructor_id: Option<i64>,
    #[serde(rename = "uzytkownik_uuid", default)]
    pub user_uuid: Option<Uuid>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `{method, data}` pushed whenever a constructor is added to or removed from a robot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushEnvelope {
    pub method: EnvelopeMethod,
    #[serde(default)]
    pub data: Option<EnvelopeData>,
}

impl PushEnvelope {
    pub fn concerns_robot(&self, robot: Uuid) -> bool {
        self.data
            .as_ref()
            .and_then(|d| d.robot_uuid)
            .is_some_and(|uuid| uuid == robot)
    }
}
