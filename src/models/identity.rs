//! Identity record of the signed-in competitor, referee or admin.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Role tier carried in `uzytkownik_typ`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RoleTier {
    Competitor,
    Referee,
    Admin,
}

impl RoleTier {
    pub fn from_level(level: i32) -> Self {
        match level {
            l if l > 1 => RoleTier::Admin,
            1 => RoleTier::Referee,
            _ => RoleTier::Competitor,
        }
    }

    /// Referees and admins bypass the permission windows.
    pub fn is_elevated(&self) -> bool {
        *self >= RoleTier::Referee
    }
}

/// Profile fields merged with the session token into one persisted blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityRecord {
    #[serde(rename = "uzytkownik_uuid")]
    pub user_uuid: Uuid,
    #[serde(rename = "imie", default)]
    pub name: String,
    #[serde(rename = "nazwisko", default)]
    pub surname: String,
    #[serde(rename = "uzytkownik_typ", default)]
    pub role_level: i32,
    #[serde(rename = "numer_telefonu", default)]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Fields the client does not interpret, kept so the persisted blob round-trips
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl IdentityRecord {
    pub fn role(&self) -> RoleTier {
        RoleTier::from_level(self.role_level)
    }

    /// Fresh profile from the backend carrying over an existing token.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }
}

/// Payload of the `users/editUser` push event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserEdited {
    #[serde(rename = "uzytkownik_uuid", default)]
    pub user_uuid: Option<Uuid>,
    #[serde(rename = "imie")]
    pub name: String,
    #[serde(rename = "nazwisko")]
    pub surname: String,
}
