//! `reqwest` implementation of the gateway traits.

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::{AccountApi, CompetitionApi, Envelope, RemoteResult};
use crate::errors::RemoteFailure;
use crate::models::{Category, Constructor, Fight, IdentityRecord, Robot, SessionInfo, TimeResult};

/// Status reported when no HTTP status was received or the payload was unreadable.
pub const LOCAL_FAILURE_STATUS: u16 = 0;

/// Error body sent by the backend alongside non-2xx statuses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    body: Option<Value>,
}

pub struct HttpGateway {
    client: Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: RwLock::new(None),
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match self.token.read().as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> RemoteResult<T> {
        let response = request.send().await.map_err(|e| {
            tracing::warn!("Request failed before a response: {}", e);
            RemoteFailure::status(LOCAL_FAILURE_STATUS)
        })?;

        let status = response.status();
        if status.is_success() {
            let envelope: Envelope<T> = response.json().await.map_err(|e| {
                tracing::warn!("Unreadable response body: {}", e);
                RemoteFailure::status(LOCAL_FAILURE_STATUS)
            })?;
            return Ok(envelope.body);
        }

        let body = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|e| e.body)
            .and_then(|b| match b {
                Value::String(key) => Some(key),
                Value::Null => None,
                other => Some(other.to_string()),
            });
        tracing::debug!(status = status.as_u16(), ?body, "backend rejected request");
        Err(RemoteFailure {
            status: status.as_u16(),
            body,
        })
    }

    /// For endpoints whose success body the client does not interpret.
    async fn send_any(&self, request: RequestBuilder) -> RemoteResult<Value> {
        let body: Option<Value> = self.send(request).await?;
        Ok(body.unwrap_or(Value::Null))
    }
}

#[async_trait]
impl AccountApi for HttpGateway {
    fn set_token(&self, token: Option<String>) {
        *self.token.write() = token;
    }

    async fn login(&self, email: &str, password_hash: &str) -> RemoteResult<IdentityRecord> {
        let req = self
            .request(Method::POST, "/users/login")
            .json(&json!({ "email": email, "haslo": password_hash }));
        self.send(req).await
    }

    async fn register(
        &self,
        name: &str,
        surname: &str,
        email: &str,
        password_hash: &str,
    ) -> RemoteResult<Value> {
        let req = self.request(Method::POST, "/users/register").json(&json!({
            "imie": name,
            "nazwisko": surname,
            "email": email,
            "haslo": password_hash,
        }));
        self.send_any(req).await
    }

    async fn remind_password(&self, email: &str) -> RemoteResult<Value> {
        let req = self
            .request(Method::POST, "/users/remindPassword")
            .json(&json!({ "email": email }));
        self.send_any(req).await
    }

    async fn reset_password(
        &self,
        user_uuid: Uuid,
        code: &str,
        password_hash: &str,
    ) -> RemoteResult<Value> {
        let req = self.request(Method::POST, "/users/resetPassword").json(&json!({
            "uzytkownik_uuid": user_uuid,
            "kod": code,
            "haslo": password_hash,
        }));
        self.send_any(req).await
    }

    async fn change_password(&self, old_hash: &str, new_hash: &str) -> RemoteResult<Value> {
        let req = self
            .request(Method::PUT, "/users/changePassword")
            .json(&json!({ "stareHaslo": old_hash, "noweHaslo": new_hash }));
        self.send_any(req).await
    }

    async fn get_user(&self) -> RemoteResult<IdentityRecord> {
        self.send(self.request(Method::GET, "/users/getUser")).await
    }

    async fn edit_user(&self, name: &str, surname: &str) -> RemoteResult<Value> {
        let req = self
            .request(Method::PUT, "/users/editUser")
            .json(&json!({ "imie": name, "nazwisko": surname }));
        self.send_any(req).await
    }

    async fn add_phone_number(&self, number: &str) -> RemoteResult<Value> {
        let req = self
            .request(Method::POST, "/users/addPhoneNumber")
            .json(&json!({ "numer_telefonu": number }));
        self.send_any(req).await
    }

    async fn confirm_code(&self, user_uuid: Uuid, code: &str, kind: &str) -> RemoteResult<Value> {
        let req = self.request(Method::POST, "/users/confirmCode").json(&json!({
            "uzytkownik_uuid": user_uuid,
            "kod": code,
            "typ": kind,
        }));
        self.send_any(req).await
    }

    async fn session_info(&self) -> RemoteResult<SessionInfo> {
        self.send(self.request(Method::GET, "/home/info")).await
    }
}

#[async_trait]
impl CompetitionApi for HttpGateway {
    async fn categories(&self) -> RemoteResult<Vec<Category>> {
        self.send(self.request(Method::GET, "/categories")).await
    }

    async fn all_robots(&self) -> RemoteResult<Vec<Robot>> {
        self.send(self.request(Method::GET, "/robots")).await
    }

    async fn user_robots(&self) -> RemoteResult<Vec<Robot>> {
        self.send(self.request(Method::GET, "/robots/user")).await
    }

    async fn update_robot(&self, robot: Uuid, name: &str) -> RemoteResult<Value> {
        let req = self
            .request(Method::PUT, &format!("/robots/{}", robot))
            .json(&json!({ "nazwa_robota": name }));
        self.send_any(req).await
    }

    async fn delete_robot(&self, robot: Uuid) -> RemoteResult<Value> {
        self.send_any(self.request(Method::DELETE, &format!("/robots/{}", robot)))
            .await
    }

    async fn add_robot_category(&self, robot: Uuid, category: i64) -> RemoteResult<Value> {
        let req = self
            .request(Method::POST, &format!("/robots/{}/categories", robot))
            .json(&json!({ "kategoria_id": category }));
        self.send_any(req).await
    }

    async fn delete_robot_category(&self, robot: Uuid, category: i64) -> RemoteResult<Value> {
        let path = format!("/robots/{}/categories/{}", robot, category);
        self.send_any(self.request(Method::DELETE, &path)).await
    }

    async fn robot_constructors(&self, robot: Uuid) -> RemoteResult<Vec<Constructor>> {
        let path = format!("/robots/{}/constructors", robot);
        self.send(self.request(Method::GET, &path)).await
    }

    async fn add_constructor(&self, robot: Uuid, user_uuid: Uuid) -> RemoteResult<Value> {
        let req = self
            .request(Method::POST, &format!("/robots/{}/constructors", robot))
            .json(&json!({ "uzytkownik_uuid": user_uuid }));
        self.send_any(req).await
    }

    async fn delete_constructor(&self, robot: Uuid, constructor: i64) -> RemoteResult<Value> {
        let path = format!("/robots/{}/constructors/{}", robot, constructor);
        self.send_any(self.request(Method::DELETE, &path)).await
    }

    async fn robot_fights(&self, robot: Uuid) -> RemoteResult<Vec<Fight>> {
        let path = format!("/robots/{}/fights", robot);
        self.send(self.request(Method::GET, &path)).await
    }

    async fn robot_times(&self, robot: Uuid) -> RemoteResult<Vec<TimeResult>> {
        let path = format!("/robots/{}/times", robot);
        self.send(self.request(Method::GET, &path)).await
    }
}
