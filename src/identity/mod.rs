//! Identity cache.
//!
//! Holds the last-known profile of the signed-in identity and republishes it on
//! every change. The cache never writes durable storage: when a push event or a
//! local edit changes the record, it emits a [`PersistRequest`] that the session
//! store applies through its single credential entry point.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::errors::{CallKind, ClientError};
use crate::gateway::AccountApi;
use crate::models::{IdentityRecord, RoleTier, UserEdited};
use crate::push::{PushChannel, USER_EDITED_EVENT};
use crate::ui::{surface_error, FeedbackKind, Ui};

/// Code kind sent when confirming a phone number.
const PHONE_CONFIRMATION_KIND: &str = "1";

/// "Profile changed, please persist."
#[derive(Debug, Clone, PartialEq)]
pub struct PersistRequest {
    pub record: IdentityRecord,
}

pub type PersistRequests = mpsc::UnboundedReceiver<PersistRequest>;

pub struct IdentityCache {
    api: Arc<dyn AccountApi>,
    ui: Arc<dyn Ui>,
    record: watch::Sender<Option<IdentityRecord>>,
    persist: mpsc::UnboundedSender<PersistRequest>,
}

impl IdentityCache {
    /// Create the cache together with the receiving end of its persist requests.
    pub fn new(api: Arc<dyn AccountApi>, ui: Arc<dyn Ui>) -> (Self, PersistRequests) {
        let (record, _) = watch::channel(None);
        let (persist, requests) = mpsc::unbounded_channel();
        (
            Self {
                api,
                ui,
                record,
                persist,
            },
            requests,
        )
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<IdentityRecord>> {
        self.record.subscribe()
    }

    pub fn current(&self) -> Option<IdentityRecord> {
        self.record.borrow().clone()
    }

    /// Wholesale replacement; only the session store calls this.
    pub(crate) fn replace(&self, record: Option<IdentityRecord>) {
        self.record.send_replace(record);
    }

    pub fn role(&self) -> RoleTier {
        self.record
            .borrow()
            .as_ref()
            .map(IdentityRecord::role)
            .unwrap_or(RoleTier::Competitor)
    }

    pub fn is_referee(&self) -> bool {
        self.role() > RoleTier::Competitor
    }

    pub fn is_admin(&self) -> bool {
        self.role() > RoleTier::Referee
    }

    pub fn user_uuid(&self) -> Option<Uuid> {
        self.record.borrow().as_ref().map(|r| r.user_uuid)
    }

    /// Apply a pushed name edit to the cached record. Returns whether anything changed.
    pub fn apply_user_edited(&self, edit: &UserEdited) -> bool {
        let changed = self.record.send_if_modified(|current| match current {
            Some(record) if edit.user_uuid.map_or(true, |uuid| uuid == record.user_uuid) => {
                if record.name == edit.name && record.surname == edit.surname {
                    return false;
                }
                record.name = edit.name.clone();
                record.surname = edit.surname.clone();
                true
            }
            _ => false,
        });
        if changed {
            tracing::debug!("Applied pushed profile edit");
            self.request_persist();
        }
        changed
    }

    /// Record a confirmed phone number without a round trip to the backend.
    pub fn set_phone_locally(&self, phone: Option<String>) {
        let changed = self.record.send_if_modified(|current| match current {
            Some(record) => {
                record.phone = phone;
                true
            }
            None => false,
        });
        if changed {
            self.request_persist();
        }
    }

    fn request_persist(&self) {
        let Some(record) = self.current() else {
            return;
        };
        if self.persist.send(PersistRequest { record }).is_err() {
            tracing::warn!("Session store is gone, profile change stays in memory");
        }
    }

    /// Listen for `users/editUser` events until the channel closes.
    pub fn spawn_push_listener(self: &Arc<Self>, push: &dyn PushChannel) -> JoinHandle<()> {
        let mut events = push.subscribe(USER_EDITED_EVENT);
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(payload) => match serde_json::from_value::<UserEdited>(payload) {
                        Ok(edit) => {
                            cache.apply_user_edited(&edit);
                        }
                        Err(e) => tracing::warn!("Ignoring malformed user edit event: {}", e),
                    },
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("User edit listener lagged, skipped {} events", skipped)
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    // ==================== PROFILE CALLS ====================

    /// Fetch the signed-in profile from the backend.
    pub async fn fetch_profile(&self) -> Option<IdentityRecord> {
        match self.api.get_user().await {
            Ok(record) => Some(record),
            Err(failure) => {
                self.fail(ClientError::from_remote(failure, CallKind::Other), "get user");
                None
            }
        }
    }

    /// Ask the backend to rename the user; the change comes back as a push event.
    pub async fn edit_user(&self, name: &str, surname: &str) -> Option<Value> {
        match self.api.edit_user(name, surname).await {
            Ok(value) => {
                self.ui.show_feedback(
                    FeedbackKind::Success,
                    "competitor-zone.settings.errors.success-name",
                    None,
                );
                Some(value)
            }
            Err(failure) => {
                self.fail(ClientError::from_remote(failure, CallKind::Other), "edit user");
                None
            }
        }
    }

    pub async fn add_phone_number(&self, number: &str) -> Option<Value> {
        match self.api.add_phone_number(number).await {
            Ok(value) => {
                self.ui.show_feedback(
                    FeedbackKind::Success,
                    "competitor-zone.settings.errors.succesfuly-added-phone",
                    Some(Duration::from_secs(5)),
                );
                Some(value)
            }
            Err(failure) => {
                self.fail(
                    ClientError::from_remote(failure, CallKind::Other),
                    "add phone number",
                );
                None
            }
        }
    }

    pub async fn confirm_phone(&self, code: &str) -> Option<Value> {
        let Some(user_uuid) = self.user_uuid() else {
            tracing::warn!("Phone confirmation attempted while signed out");
            return None;
        };
        match self
            .api
            .confirm_code(user_uuid, code, PHONE_CONFIRMATION_KIND)
            .await
        {
            Ok(value) => {
                self.ui.show_feedback(
                    FeedbackKind::Success,
                    "competitor-zone.settings.errors.succesfuly-confirmed",
                    Some(Duration::from_secs(3)),
                );
                Some(value)
            }
            Err(failure) => {
                self.fail(
                    ClientError::from_remote(failure, CallKind::Other),
                    "confirm phone",
                );
                None
            }
        }
    }

    fn fail(&self, err: ClientError, operation: &str) {
        tracing::warn!("{} failed: {}", operation, err);
        surface_error(self.ui.as_ref(), &err);
    }
}
