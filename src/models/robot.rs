//! Robots, the category catalogue, and robot constructors.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// A competition category from the catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "kategoria_id")]
    pub id: i64,
    #[serde(rename = "nazwa")]
    pub name: String,
    /// Scoring kind of the category, interpreted by the page layer
    #[serde(rename = "rodzaj", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<Value>,
}

/// A registered robot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Robot {
    #[serde(rename = "robot_uuid")]
    pub uuid: Uuid,
    #[serde(rename = "nazwa_robota")]
    pub name: String,
    /// Assigned category ids as sent by the backend, e.g. `"1, 4"`
    #[serde(rename = "kategorie", default)]
    pub categories: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Robot {
    pub fn category_ids(&self) -> Vec<i64> {
        self.categories
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| s.parse().ok())
            .collect()
    }
}

/// A person listed as constructor of a robot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constructor {
    #[serde(rename = "konstruktor_id")]
    pub id: i64,
    #[serde(rename = "uzytkownik_uuid")]
    pub user_uuid: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub robot_uuid: Option<Uuid>,
    #[serde(rename = "imie", default)]
    pub name: String,
    #[serde(rename = "nazwisko", default)]
    pub surname: String,
}
