//! Remote access gateway.
//!
//! The traits are the request/response contract the core consumes; [`HttpGateway`]
//! implements them against the portal REST backend.

mod http;

pub use http::*;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::RemoteFailure;
use crate::models::{Category, Constructor, Fight, IdentityRecord, Robot, SessionInfo, TimeResult};

/// Success envelope used by every backend response.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub body: T,
}

impl<T> Envelope<T> {
    pub fn new(body: T) -> Self {
        Self { body }
    }
}

/// Result of a gateway call.
pub type RemoteResult<T> = Result<T, RemoteFailure>;

/// Account, profile, and session-info endpoints.
#[async_trait]
pub trait AccountApi: Send + Sync {
    /// Bearer token attached to every subsequent request.
    fn set_token(&self, token: Option<String>);

    async fn login(&self, email: &str, password_hash: &str) -> RemoteResult<IdentityRecord>;

    async fn register(
        &self,
        name: &str,
        surname: &str,
        email: &str,
        password_hash: &str,
    ) -> RemoteResult<Value>;

    async fn remind_password(&self, email: &str) -> RemoteResult<Value>;

    async fn reset_password(
        &self,
        user_uuid: Uuid,
        code: &str,
        password_hash: &str,
    ) -> RemoteResult<Value>;

    async fn change_password(&self, old_hash: &str, new_hash: &str) -> RemoteResult<Value>;

    async fn get_user(&self) -> RemoteResult<IdentityRecord>;

    async fn edit_user(&self, name: &str, surname: &str) -> RemoteResult<Value>;

    async fn add_phone_number(&self, number: &str) -> RemoteResult<Value>;

    async fn confirm_code(&self, user_uuid: Uuid, code: &str, kind: &str) -> RemoteResult<Value>;

    async fn session_info(&self) -> RemoteResult<SessionInfo>;
}

/// Robots, categories, constructors, and results.
#[async_trait]
pub trait CompetitionApi: Send + Sync {
    async fn categories(&self) -> RemoteResult<Vec<Category>>;

    async fn all_robots(&self) -> RemoteResult<Vec<Robot>>;

    async fn user_robots(&self) -> RemoteResult<Vec<Robot>>;

    async fn update_robot(&self, robot: Uuid, name: &str) -> RemoteResult<Value>;

    async fn delete_robot(&self, robot: Uuid) -> RemoteResult<Value>;

    async fn add_robot_category(&self, robot: Uuid, category: i64) -> RemoteResult<Value>;

    async fn delete_robot_category(&self, robot: Uuid, category: i64) -> RemoteResult<Value>;

    async fn robot_constructors(&self, robot: Uuid) -> RemoteResult<Vec<Constructor>>;

    async fn add_constructor(&self, robot: Uuid, user_uuid: Uuid) -> RemoteResult<Value>;

    async fn delete_constructor(&self, robot: Uuid, constructor: i64) -> RemoteResult<Value>;

    async fn robot_fights(&self, robot: Uuid) -> RemoteResult<Vec<Fight>>;

    async fn robot_times(&self, robot: Uuid) -> RemoteResult<Vec<TimeResult>>;
}
