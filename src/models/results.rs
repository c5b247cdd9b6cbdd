//! Competition results of a robot: fights and timed runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fight {
    #[serde(rename = "walka_id")]
    pub id: i64,
    #[serde(rename = "kategoria_id")]
    pub category_id: i64,
    #[serde(rename = "grupa_id", default)]
    pub group_id: Option<i64>,
    #[serde(rename = "czas_zakonczenia", default)]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeResult {
    #[serde(rename = "wynik_id")]
    pub id: i64,
    #[serde(rename = "kategoria_id")]
    pub category_id: i64,
    /// Run time in milliseconds
    #[serde(rename = "czas_przejazdu")]
    pub run_time: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
