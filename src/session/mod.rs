//! Session store.
//!
//! Owns the current credential, its expiry, and the two permission windows.
//! [`SessionStore::set_credential`] is the single path through which credential
//! state changes: it writes durable storage, the in-memory token, the identity
//! cache, the gateway token and the push channel together.

mod countdown;
mod credential;
mod permissions;

pub use countdown::*;
pub use credential::*;
pub use permissions::*;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use reqwest::Url;
use serde_json::Value;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::errors::{CallKind, ClientError};
use crate::gateway::AccountApi;
use crate::identity::{IdentityCache, PersistRequests};
use crate::models::{IdentityRecord, SessionInfo};
use crate::push::PushChannel;
use crate::storage::{DurableStorage, DETAILS_KEY};
use crate::ui::{
    surface_error, FeedbackKind, Navigator, Ui, COMPETITOR_ZONE_ROUTE, LOGIN_ROUTE,
};

/// Delay before a toast that must survive a navigation.
const AFTER_NAVIGATION_DELAY: Duration = Duration::from_millis(200);
const AFTER_LOGOUT_DELAY: Duration = Duration::from_millis(400);

#[derive(Debug, Default)]
struct SessionState {
    credential: Option<Credential>,
    windows: PermissionWindows,
    event_date: Option<DateTime<Utc>>,
    stream_link: Option<Url>,
}

pub struct SessionStore {
    api: Arc<dyn AccountApi>,
    storage: Arc<dyn DurableStorage>,
    push: Arc<dyn PushChannel>,
    identity: Arc<IdentityCache>,
    ui: Arc<dyn Ui>,
    navigator: Arc<dyn Navigator>,
    state: RwLock<SessionState>,
    /// Serializes credential writers; never held by readers
    write_gate: Mutex<()>,
    info: watch::Sender<Option<SessionInfo>>,
}

impl SessionStore {
    pub fn new(
        api: Arc<dyn AccountApi>,
        storage: Arc<dyn DurableStorage>,
        push: Arc<dyn PushChannel>,
        identity: Arc<IdentityCache>,
        ui: Arc<dyn Ui>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let (info, _) = watch::channel(None);
        Self {
            api,
            storage,
            push,
            identity,
            ui,
            navigator,
            state: RwLock::new(SessionState::default()),
            write_gate: Mutex::new(()),
            info,
        }
    }

    // ==================== CREDENTIAL LIFECYCLE ====================

    /// Replace the current credential, or clear it with `None`.
    ///
    /// A record without a decodable token is refused before anything changes.
    /// A record whose token has already expired is refused and the current
    /// credential is destroyed. Clearing always clears memory, the cache and the
    /// channel, even if the storage slot could not be removed.
    pub async fn set_credential(&self, record: Option<IdentityRecord>) -> Result<(), ClientError> {
        let _gate = self.write_gate.lock().await;

        let Some(record) = record else {
            return self.clear().await;
        };

        let token = record
            .token
            .clone()
            .ok_or_else(|| ClientError::Decode("identity record carries no token".to_string()))?;
        let credential = Credential::parse(&token)?;
        let expires_at = credential.expires_at();
        if !credential.is_valid_at(Utc::now()) {
            tracing::warn!("Refusing credential that expired at {}", expires_at);
            if let Err(e) = self.clear().await {
                tracing::warn!("Failed to clear stored credential: {}", e);
            }
            return Err(ClientError::Decode(format!(
                "credential expired at {}",
                expires_at
            )));
        }
        let blob = serde_json::to_string(&record)?;

        self.storage.set(DETAILS_KEY, &blob).await?;

        self.state.write().credential = Some(credential);
        self.identity.replace(Some(record));
        self.api.set_token(Some(token.clone()));
        self.push.reconnect(Some(&token));
        tracing::info!("Credential set, expires at {}", expires_at);
        Ok(())
    }

    /// Caller must hold the write gate.
    async fn clear(&self) -> Result<(), ClientError> {
        let removed = self.storage.remove(DETAILS_KEY).await;

        self.state.write().credential = None;
        self.identity.replace(None);
        self.api.set_token(None);
        self.push.reconnect(None);
        tracing::info!("Credential cleared");
        removed
    }

    /// Restore a persisted credential at startup. Returns whether the viewer is signed in.
    pub async fn restore(&self) -> bool {
        let stored = match self.storage.get(DETAILS_KEY).await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!("Failed to read stored credential: {}", e);
                None
            }
        };

        let Some(blob) = stored else {
            tracing::info!("No stored credential, starting signed out");
            self.push.reconnect(None);
            return false;
        };

        let record = match serde_json::from_str::<IdentityRecord>(&blob) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Discarding unreadable stored credential: {}", e);
                self.discard().await;
                return false;
            }
        };

        let now = Utc::now();
        let still_valid = record
            .token
            .as_deref()
            .and_then(|token| Credential::parse(token).ok())
            .is_some_and(|credential| credential.is_valid_at(now));
        if !still_valid {
            tracing::info!("Stored credential expired, starting signed out");
            self.discard().await;
            return false;
        }

        let token = record.token.clone();
        if let Err(e) = self.set_credential(Some(record)).await {
            tracing::warn!("Failed to restore credential: {}", e);
            self.discard().await;
            return false;
        }

        // refresh-on-start: the stored profile may be stale
        if let Some(fresh) = self.identity.fetch_profile().await {
            if let Err(e) = self.set_credential(Some(fresh.with_token(token))).await {
                tracing::warn!("Failed to store refreshed profile: {}", e);
            }
        }
        true
    }

    async fn discard(&self) {
        if let Err(e) = self.set_credential(None).await {
            tracing::warn!("Failed to clear stored credential: {}", e);
        }
    }

    /// Apply persist requests emitted by the identity cache.
    ///
    /// Requests made under a credential that is no longer current, or that has
    /// expired, are dropped.
    pub fn spawn_persist_loop(self: &Arc<Self>, mut requests: PersistRequests) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(request) = requests.recv().await {
                if !store.accepts_persist_at(&request.record, Utc::now()) {
                    tracing::debug!("Dropping persist request for a replaced or expired credential");
                    continue;
                }
                if let Err(e) = store.set_credential(Some(request.record)).await {
                    tracing::warn!("Failed to persist profile change: {}", e);
                }
            }
        })
    }

    fn accepts_persist_at(&self, record: &IdentityRecord, now: DateTime<Utc>) -> bool {
        record.token.is_some() && record.token == self.token() && self.is_logged_in_at(now)
    }

    // ==================== ACCOUNT FLOWS ====================

    /// Sign in. `None` means the attempt failed and the user has been told why.
    pub async fn login(&self, email: &str, secret: &str) -> Option<IdentityRecord> {
        let hash = hash_password(secret);
        match self.api.login(email, &hash).await {
            Ok(record) => {
                if let Err(e) = self.set_credential(Some(record.clone())).await {
                    tracing::warn!("Login payload rejected: {}", e);
                    surface_error(self.ui.as_ref(), &e);
                    return None;
                }
                self.navigator.navigate(COMPETITOR_ZONE_ROUTE);
                Some(record)
            }
            Err(failure) => {
                self.fail(ClientError::from_remote(failure, CallKind::Login), "login");
                None
            }
        }
    }

    pub async fn register(
        &self,
        name: &str,
        surname: &str,
        email: &str,
        secret: &str,
    ) -> Option<Value> {
        let hash = hash_password(secret);
        match self.api.register(name, surname, email, &hash).await {
            Ok(value) => {
                self.navigator.navigate(LOGIN_ROUTE);
                self.toast_later(
                    AFTER_NAVIGATION_DELAY,
                    "competitor-zone.register.errors.success",
                    Some(Duration::from_secs(4)),
                );
                Some(value)
            }
            Err(failure) => {
                self.fail(ClientError::from_remote(failure, CallKind::Other), "register");
                None
            }
        }
    }

    pub async fn remind_password(&self, email: &str) -> Option<Value> {
        match self.api.remind_password(email).await {
            Ok(value) => {
                self.ui.show_feedback(
                    FeedbackKind::Success,
                    "competitor-zone.forgot-password.errors.sended",
                    Some(Duration::from_secs(4)),
                );
                Some(value)
            }
            Err(failure) => {
                self.fail(
                    ClientError::from_remote(failure, CallKind::Other),
                    "remind password",
                );
                None
            }
        }
    }

    pub async fn reset_password(&self, user_uuid: Uuid, code: &str, secret: &str) -> Option<Value> {
        let hash = hash_password(secret);
        match self.api.reset_password(user_uuid, code, &hash).await {
            Ok(value) => {
                self.navigator.navigate(LOGIN_ROUTE);
                self.toast_later(
                    AFTER_NAVIGATION_DELAY,
                    "competitor-zone.reset-password.errors.success",
                    Some(Duration::from_secs(4)),
                );
                Some(value)
            }
            Err(failure) => {
                self.fail(
                    ClientError::from_remote(failure, CallKind::Other),
                    "reset password",
                );
                None
            }
        }
    }

    pub async fn change_password(&self, old_secret: &str, new_secret: &str) -> Option<Value> {
        let old_hash = hash_password(old_secret);
        let new_hash = hash_password(new_secret);
        match self.api.change_password(&old_hash, &new_hash).await {
            Ok(value) => {
                self.ui.show_feedback(
                    FeedbackKind::Success,
                    "competitor-zone.settings.errors.success",
                    None,
                );
                Some(value)
            }
            Err(failure) => {
                self.fail(
                    ClientError::from_remote(failure, CallKind::Other),
                    "change password",
                );
                None
            }
        }
    }

    pub async fn logout(&self) {
        if let Err(e) = self.set_credential(None).await {
            tracing::warn!("Logout could not clear storage: {}", e);
        }

        let url = self.navigator.current_url();
        let on_landing_page = url.len() == 1 || url.starts_with("/#");
        if !on_landing_page {
            self.navigator.navigate(LOGIN_ROUTE);
        }
        self.toast_later(
            AFTER_LOGOUT_DELAY,
            "competitor-zone.login.errors.logout",
            Some(Duration::from_secs(3)),
        );
    }

    fn fail(&self, err: ClientError, operation: &str) {
        tracing::warn!("{} failed: {}", operation, err);
        surface_error(self.ui.as_ref(), &err);
    }

    fn toast_later(&self, delay: Duration, key: &'static str, duration: Option<Duration>) {
        let ui = Arc::clone(&self.ui);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            ui.show_feedback(FeedbackKind::Success, key, duration);
        });
    }

    // ==================== SESSION INFO ====================

    /// Fetch the session-info payload and refresh the permission windows from it.
    pub async fn refresh_session_info(&self) -> Option<SessionInfo> {
        let info = match self.api.session_info().await {
            Ok(info) => info,
            Err(failure) => {
                tracing::warn!("Session info refresh failed: {}", failure);
                return None;
            }
        };

        let stream_link = info.stream_link.as_deref().and_then(|link| {
            Url::parse(link)
                .map_err(|e| tracing::warn!("Ignoring invalid stream link {}: {}", link, e))
                .ok()
        });

        {
            let mut state = self.state.write();
            state.windows = PermissionWindows::from_info(&info);
            state.event_date = info.event_date;
            state.stream_link = stream_link;
        }
        tracing::debug!(?info, "Session info refreshed");
        self.info.send_replace(Some(info.clone()));
        Some(info)
    }

    pub fn spawn_session_poller(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                store.refresh_session_info().await;
            }
        })
    }

    pub fn info(&self) -> watch::Receiver<Option<SessionInfo>> {
        self.info.subscribe()
    }

    // ==================== DERIVED PREDICATES ====================

    pub fn token(&self) -> Option<String> {
        self.state
            .read()
            .credential
            .as_ref()
            .map(|c| c.token().to_string())
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.state.read().credential.as_ref().map(Credential::expires_at)
    }

    pub fn windows(&self) -> PermissionWindows {
        self.state.read().windows
    }

    pub fn event_date(&self) -> Option<DateTime<Utc>> {
        self.state.read().event_date
    }

    pub fn stream_link(&self) -> Option<Url> {
        self.state.read().stream_link.clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.is_logged_in_at(Utc::now())
    }

    pub fn is_logged_in_at(&self, now: DateTime<Utc>) -> bool {
        self.state
            .read()
            .credential
            .as_ref()
            .is_some_and(|c| c.is_valid_at(now))
    }

    pub fn can_modify(&self) -> bool {
        self.can_modify_at(Utc::now())
    }

    pub fn can_modify_at(&self, now: DateTime<Utc>) -> bool {
        self.windows().can_modify_at(now, self.identity.role())
    }

    pub fn can_modify_smash(&self) -> bool {
        self.can_modify_smash_at(Utc::now())
    }

    pub fn can_modify_smash_at(&self, now: DateTime<Utc>) -> bool {
        self.windows().can_modify_smash_at(now, self.identity.role())
    }
}
