//! Shared fakes for unit and integration tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use tokio::sync::Notify;
use uuid::Uuid;

use crate::context::{Client, ClientParts};
use crate::errors::{ClientError, RemoteFailure};
use crate::gateway::{AccountApi, CompetitionApi, RemoteResult};
use crate::models::{
    Category, Constructor, Fight, IdentityRecord, Robot, SessionInfo, TimeResult,
};
use crate::push::PushHub;
use crate::storage::DurableStorage;
use crate::ui::{FeedbackKind, Navigator, Ui};

// ==================== BUILDERS ====================

/// Unsigned JWT whose `exp` claim is `expires_at`.
pub fn token_expiring_at(expires_at: DateTime<Utc>) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let claims = json!({ "sub": "test", "exp": expires_at.timestamp() });
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.signature", header, payload)
}

pub fn valid_token() -> String {
    token_expiring_at(Utc::now() + ChronoDuration::hours(1))
}

pub fn identity_record(token: Option<&str>, role_level: i32) -> IdentityRecord {
    IdentityRecord {
        user_uuid: Uuid::new_v4(),
        name: "Ada".to_string(),
        surname: "Lovelace".to_string(),
        role_level,
        phone: None,
        email: Some("ada@example.com".to_string()),
        token: token.map(str::to_string),
        extra: Map::new(),
    }
}

pub fn category(id: i64, name: &str) -> Category {
    Category {
        id,
        name: name.to_string(),
        kind: None,
    }
}

/// A fresh robot holding `categories`, e.g. `"4, 12"`.
pub fn robot(categories: &str) -> Robot {
    Robot {
        uuid: Uuid::new_v4(),
        name: "Rex".to_string(),
        categories: categories.to_string(),
        extra: Map::new(),
    }
}

pub fn constructor(id: i64, user_uuid: Uuid, robot_uuid: Uuid) -> Constructor {
    Constructor {
        id,
        user_uuid,
        robot_uuid: Some(robot_uuid),
        name: "Ada".to_string(),
        surname: "Lovelace".to_string(),
    }
}

/// Poll `condition` until it holds, failing the test after two seconds.
pub async fn wait_for(condition: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

// ==================== FAKE BACKEND ====================

#[derive(Default)]
struct BackendState {
    token: Option<String>,
    calls: Vec<String>,
    failures: HashMap<String, RemoteFailure>,
    holds: HashMap<String, Arc<Notify>>,
    login_result: Option<RemoteResult<IdentityRecord>>,
    last_login: Option<(String, String)>,
    last_register_hash: Option<String>,
    last_password_change: Option<(String, String)>,
    profile: Option<IdentityRecord>,
    session_info: SessionInfo,
    categories: Vec<Category>,
    all_robots: Vec<Robot>,
    user_robots: Vec<Robot>,
    constructors: HashMap<Uuid, Vec<Constructor>>,
    fights: Vec<Fight>,
    times: Vec<TimeResult>,
}

/// In-memory gateway that logs every call and can be told to fail.
#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<BackendState>,
}

impl FakeBackend {
    /// Log `call`; fails if a failure was queued for its operation name.
    fn record(&self, call: String) -> RemoteResult<()> {
        let mut state = self.state.lock();
        let operation = call.split(' ').next().unwrap_or_default().to_string();
        state.calls.push(call);
        match state.failures.remove(&operation) {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }

    fn ok(&self, call: String) -> RemoteResult<Value> {
        self.record(call).map(|_| json!({ "status": "ok" }))
    }

    /// Park the call until a hold placed with [`Self::hold_next`] is released.
    async fn wait_if_held(&self, operation: &str) {
        let hold = self.state.lock().holds.remove(operation);
        if let Some(hold) = hold {
            hold.notified().await;
        }
    }

    /// Make the next call to `operation` wait until the returned handle is notified.
    pub fn hold_next(&self, operation: &str) -> Arc<Notify> {
        let hold = Arc::new(Notify::new());
        self.state
            .lock()
            .holds
            .insert(operation.to_string(), Arc::clone(&hold));
        hold
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn calls_to(&self, prefix: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    pub fn token(&self) -> Option<String> {
        self.state.lock().token.clone()
    }

    pub fn fail_next(&self, operation: &str, failure: RemoteFailure) {
        self.state
            .lock()
            .failures
            .insert(operation.to_string(), failure);
    }

    pub fn set_login_result(&self, result: RemoteResult<IdentityRecord>) {
        self.state.lock().login_result = Some(result);
    }

    pub fn last_login(&self) -> Option<(String, String)> {
        self.state.lock().last_login.clone()
    }

    pub fn last_register_hash(&self) -> Option<String> {
        self.state.lock().last_register_hash.clone()
    }

    pub fn last_password_change(&self) -> Option<(String, String)> {
        self.state.lock().last_password_change.clone()
    }

    pub fn set_profile(&self, profile: IdentityRecord) {
        self.state.lock().profile = Some(profile);
    }

    pub fn set_session_info(&self, info: SessionInfo) {
        self.state.lock().session_info = info;
    }

    pub fn set_categories(&self, categories: Vec<Category>) {
        self.state.lock().categories = categories;
    }

    pub fn set_all_robots(&self, robots: Vec<Robot>) {
        self.state.lock().all_robots = robots;
    }

    pub fn set_user_robots(&self, robots: Vec<Robot>) {
        self.state.lock().user_robots = robots;
    }

    pub fn set_constructors(&self, robot: Uuid, constructors: Vec<Constructor>) {
        self.state.lock().constructors.insert(robot, constructors);
    }
}

#[async_trait]
impl AccountApi for FakeBackend {
    fn set_token(&self, token: Option<String>) {
        self.state.lock().token = token;
    }

    async fn login(&self, email: &str, password_hash: &str) -> RemoteResult<IdentityRecord> {
        self.record("login".to_string())?;
        let mut state = self.state.lock();
        state.last_login = Some((email.to_string(), password_hash.to_string()));
        state
            .login_result
            .clone()
            .unwrap_or(Err(RemoteFailure::status(401)))
    }

    async fn register(
        &self,
        _name: &str,
        _surname: &str,
        _email: &str,
        password_hash: &str,
    ) -> RemoteResult<Value> {
        let value = self.ok("register".to_string())?;
        self.state.lock().last_register_hash = Some(password_hash.to_string());
        Ok(value)
    }

    async fn remind_password(&self, _email: &str) -> RemoteResult<Value> {
        self.ok("remind_password".to_string())
    }

    async fn reset_password(
        &self,
        user_uuid: Uuid,
        code: &str,
        _password_hash: &str,
    ) -> RemoteResult<Value> {
        self.ok(format!("reset_password {} {}", user_uuid, code))
    }

    async fn change_password(&self, old_hash: &str, new_hash: &str) -> RemoteResult<Value> {
        let value = self.ok("change_password".to_string())?;
        self.state.lock().last_password_change = Some((old_hash.to_string(), new_hash.to_string()));
        Ok(value)
    }

    async fn get_user(&self) -> RemoteResult<IdentityRecord> {
        self.record("get_user".to_string())?;
        self.state
            .lock()
            .profile
            .clone()
            .ok_or(RemoteFailure::status(404))
    }

    async fn edit_user(&self, _name: &str, _surname: &str) -> RemoteResult<Value> {
        self.ok("edit_user".to_string())
    }

    async fn add_phone_number(&self, number: &str) -> RemoteResult<Value> {
        self.ok(format!("add_phone_number {}", number))
    }

    async fn confirm_code(&self, user_uuid: Uuid, code: &str, kind: &str) -> RemoteResult<Value> {
        self.ok(format!("confirm_code {} {} {}", user_uuid, code, kind))
    }

    async fn session_info(&self) -> RemoteResult<SessionInfo> {
        self.record("session_info".to_string())?;
        Ok(self.state.lock().session_info.clone())
    }
}

#[async_trait]
impl CompetitionApi for FakeBackend {
    async fn categories(&self) -> RemoteResult<Vec<Category>> {
        self.record("categories".to_string())?;
        Ok(self.state.lock().categories.clone())
    }

    async fn all_robots(&self) -> RemoteResult<Vec<Robot>> {
        self.record("all_robots".to_string())?;
        Ok(self.state.lock().all_robots.clone())
    }

    async fn user_robots(&self) -> RemoteResult<Vec<Robot>> {
        self.record("user_robots".to_string())?;
        Ok(self.state.lock().user_robots.clone())
    }

    async fn update_robot(&self, robot: Uuid, name: &str) -> RemoteResult<Value> {
        self.wait_if_held("update_robot").await;
        self.ok(format!("update_robot {} {}", robot, name))
    }

    async fn delete_robot(&self, robot: Uuid) -> RemoteResult<Value> {
        self.ok(format!("delete_robot {}", robot))
    }

    async fn add_robot_category(&self, robot: Uuid, category: i64) -> RemoteResult<Value> {
        self.ok(format!("add_robot_category {} {}", robot, category))
    }

    async fn delete_robot_category(&self, robot: Uuid, category: i64) -> RemoteResult<Value> {
        self.ok(format!("delete_robot_category {} {}", robot, category))
    }

    async fn robot_constructors(&self, robot: Uuid) -> RemoteResult<Vec<Constructor>> {
        self.record(format!("robot_constructors {}", robot))?;
        Ok(self
            .state
            .lock()
            .constructors
            .get(&robot)
            .cloned()
            .unwrap_or_default())
    }

    async fn add_constructor(&self, robot: Uuid, user_uuid: Uuid) -> RemoteResult<Value> {
        self.wait_if_held("add_constructor").await;
        self.ok(format!("add_constructor {} {}", robot, user_uuid))
    }

    async fn delete_constructor(&self, robot: Uuid, constructor: i64) -> RemoteResult<Value> {
        self.ok(format!("delete_constructor {} {}", robot, constructor))
    }

    async fn robot_fights(&self, robot: Uuid) -> RemoteResult<Vec<Fight>> {
        self.record(format!("robot_fights {}", robot))?;
        Ok(self.state.lock().fights.clone())
    }

    async fn robot_times(&self, robot: Uuid) -> RemoteResult<Vec<TimeResult>> {
        self.record(format!("robot_times {}", robot))?;
        Ok(self.state.lock().times.clone())
    }
}

// ==================== STORAGE ====================

#[derive(Default)]
pub struct MemoryStorage {
    slots: Mutex<HashMap<String, String>>,
    writes: Mutex<usize>,
    failing: Mutex<bool>,
}

impl MemoryStorage {
    pub fn value(&self, key: &str) -> Option<String> {
        self.slots.lock().get(key).cloned()
    }

    /// Seed a slot without counting it as a write.
    pub fn insert(&self, key: &str, value: &str) {
        self.slots.lock().insert(key.to_string(), value.to_string());
    }

    pub fn writes(&self) -> usize {
        *self.writes.lock()
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock() = failing;
    }

    fn check(&self) -> Result<(), ClientError> {
        if *self.failing.lock() {
            return Err(ClientError::Storage("storage unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DurableStorage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        self.check()?;
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        self.check()?;
        *self.writes.lock() += 1;
        self.insert(key, value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), ClientError> {
        self.check()?;
        *self.writes.lock() += 1;
        self.slots.lock().remove(key);
        Ok(())
    }
}

// ==================== UI PORTS ====================

pub struct RecordingUi {
    feedback: Mutex<Vec<(FeedbackKind, String)>>,
    errors: Mutex<Vec<(u16, Option<String>)>>,
    prompts: Mutex<Vec<String>>,
    confirm: Mutex<bool>,
}

impl Default for RecordingUi {
    fn default() -> Self {
        Self {
            feedback: Mutex::new(Vec::new()),
            errors: Mutex::new(Vec::new()),
            prompts: Mutex::new(Vec::new()),
            confirm: Mutex::new(true),
        }
    }
}

impl RecordingUi {
    /// Keys of every toast shown so far.
    pub fn feedback(&self) -> Vec<String> {
        self.feedback.lock().iter().map(|(_, key)| key.clone()).collect()
    }

    pub fn errors(&self) -> Vec<(u16, Option<String>)> {
        self.errors.lock().clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    /// Answer every later confirmation with `answer`.
    pub fn set_confirm(&self, answer: bool) {
        *self.confirm.lock() = answer;
    }
}

#[async_trait]
impl Ui for RecordingUi {
    fn show_feedback(&self, kind: FeedbackKind, message_key: &str, _duration: Option<Duration>) {
        self.feedback.lock().push((kind, message_key.to_string()));
    }

    fn show_error(&self, status: u16, message_key: Option<&str>) {
        self.errors
            .lock()
            .push((status, message_key.map(str::to_string)));
    }

    async fn want_to_continue(&self, prompt_key: &str) -> bool {
        self.prompts.lock().push(prompt_key.to_string());
        *self.confirm.lock()
    }
}

pub struct RecordingNavigator {
    current: Mutex<String>,
    history: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new(initial: &str) -> Self {
        Self {
            current: Mutex::new(initial.to_string()),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Every URL navigated to, oldest first.
    pub fn history(&self) -> Vec<String> {
        self.history.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, url: &str) {
        *self.current.lock() = url.to_string();
        self.history.lock().push(url.to_string());
    }

    fn current_url(&self) -> String {
        self.current.lock().clone()
    }
}

// ==================== CLIENT ====================

/// A started [`Client`] wired to fakes, with handles to each fake.
pub struct TestClient {
    pub client: Client,
    pub backend: Arc<FakeBackend>,
    pub storage: Arc<MemoryStorage>,
    pub push: Arc<PushHub>,
    pub ui: Arc<RecordingUi>,
    pub navigator: Arc<RecordingNavigator>,
}

impl TestClient {
    pub fn new() -> Self {
        let backend = Arc::new(FakeBackend::default());
        let storage = Arc::new(MemoryStorage::default());
        let push = Arc::new(PushHub::new());
        let ui = Arc::new(RecordingUi::default());
        let navigator = Arc::new(RecordingNavigator::new("/competitor-zone"));

        let client = Client::start(ClientParts {
            account: backend.clone(),
            competition: backend.clone(),
            storage: storage.clone(),
            push: push.clone(),
            ui: ui.clone(),
            navigator: navigator.clone(),
        });

        Self {
            client,
            backend,
            storage,
            push,
            ui,
            navigator,
        }
    }

    /// Sign in with a fresh one-hour credential at the given role level.
    pub async fn sign_in(&self, role_level: i32) -> IdentityRecord {
        let record = identity_record(Some(&valid_token()), role_level);
        self.client
            .session
            .set_credential(Some(record.clone()))
            .await
            .expect("test credential is valid");
        record
    }

    async fn publish_info(&self, info: SessionInfo) -> SessionInfo {
        self.backend.set_session_info(info);
        self.client
            .session
            .refresh_session_info()
            .await
            .expect("session info refresh")
    }

    /// Both permission windows open for another day.
    pub async fn open_windows(&self) -> SessionInfo {
        let now = Utc::now();
        self.publish_info(SessionInfo {
            access_to_modify_expiration_date: Some(now + ChronoDuration::days(1)),
            access_to_smash_robots: Some(now + ChronoDuration::days(1)),
            event_date: Some(now + ChronoDuration::days(2)),
            stream_link: None,
        })
        .await
    }

    /// Both permission windows closed an hour ago.
    pub async fn close_windows(&self) -> SessionInfo {
        let now = Utc::now();
        self.publish_info(SessionInfo {
            access_to_modify_expiration_date: Some(now - ChronoDuration::hours(1)),
            access_to_smash_robots: Some(now - ChronoDuration::hours(1)),
            event_date: Some(now + ChronoDuration::days(2)),
            stream_link: None,
        })
        .await
    }

    /// General window open, smash window closed.
    pub async fn close_smash_window(&self) -> SessionInfo {
        let now = Utc::now();
        self.publish_info(SessionInfo {
            access_to_modify_expiration_date: Some(now + ChronoDuration::days(1)),
            access_to_smash_robots: Some(now - ChronoDuration::hours(1)),
            event_date: Some(now + ChronoDuration::days(2)),
            stream_link: None,
        })
        .await
    }

    /// Windows still open, event already under way.
    pub async fn start_event(&self) -> SessionInfo {
        let now = Utc::now();
        self.publish_info(SessionInfo {
            access_to_modify_expiration_date: Some(now + ChronoDuration::days(1)),
            access_to_smash_robots: Some(now + ChronoDuration::days(1)),
            event_date: Some(now - ChronoDuration::minutes(5)),
            stream_link: None,
        })
        .await
    }
}
