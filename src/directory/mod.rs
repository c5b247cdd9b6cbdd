//! Shared list streams consumed by detail views.
//!
//! Each list is a watch channel holding the latest snapshot, `None` until first
//! fetched. Refreshes always re-emit, even when the content did not change;
//! consumers suppress unchanged snapshots themselves. Constructor envelopes are
//! queued instead: every subscriber receives each one in order.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::errors::ClientError;
use crate::gateway::CompetitionApi;
use crate::models::{Category, PushEnvelope, Robot, RoleTier};
use crate::push::{PushChannel, CONSTRUCTORS_EVENT};
use crate::ui::{surface_error, Ui};

pub type ListStream<T> = watch::Receiver<Option<Vec<T>>>;

const ENVELOPE_CAPACITY: usize = 64;

pub struct Directory {
    api: Arc<dyn CompetitionApi>,
    ui: Arc<dyn Ui>,
    categories: watch::Sender<Option<Vec<Category>>>,
    all_robots: watch::Sender<Option<Vec<Robot>>>,
    user_robots: watch::Sender<Option<Vec<Robot>>>,
    constructor_events: broadcast::Sender<PushEnvelope>,
}

impl Directory {
    pub fn new(api: Arc<dyn CompetitionApi>, ui: Arc<dyn Ui>) -> Self {
        Self {
            api,
            ui,
            categories: watch::channel(None).0,
            all_robots: watch::channel(None).0,
            user_robots: watch::channel(None).0,
            constructor_events: broadcast::channel(ENVELOPE_CAPACITY).0,
        }
    }

    pub fn categories(&self) -> ListStream<Category> {
        self.categories.subscribe()
    }

    /// Every robot for referees and admins, the viewer's own robots otherwise.
    pub fn robots_for(&self, role: RoleTier) -> ListStream<Robot> {
        if role.is_elevated() {
            self.all_robots.subscribe()
        } else {
            self.user_robots.subscribe()
        }
    }

    /// Envelopes published from now on, none dropped unless the receiver lags.
    pub fn constructor_events(&self) -> broadcast::Receiver<PushEnvelope> {
        self.constructor_events.subscribe()
    }

    pub async fn refresh_categories(&self) -> bool {
        match self.api.categories().await {
            Ok(categories) => {
                tracing::debug!("Fetched {} categories", categories.len());
                self.categories.send_replace(Some(categories));
                true
            }
            Err(failure) => {
                self.fail(failure.into(), "fetch categories");
                false
            }
        }
    }

    pub async fn refresh_all_robots(&self) -> bool {
        match self.api.all_robots().await {
            Ok(robots) => {
                tracing::debug!("Fetched {} robots", robots.len());
                self.all_robots.send_replace(Some(robots));
                true
            }
            Err(failure) => {
                self.fail(failure.into(), "fetch all robots");
                false
            }
        }
    }

    pub async fn refresh_user_robots(&self) -> bool {
        match self.api.user_robots().await {
            Ok(robots) => {
                tracing::debug!("Fetched {} own robots", robots.len());
                self.user_robots.send_replace(Some(robots));
                true
            }
            Err(failure) => {
                self.fail(failure.into(), "fetch own robots");
                false
            }
        }
    }

    pub async fn refresh_robots_for(&self, role: RoleTier) -> bool {
        if role.is_elevated() {
            self.refresh_all_robots().await
        } else {
            self.refresh_user_robots().await
        }
    }

    pub fn publish_constructor_event(&self, envelope: PushEnvelope) {
        if self.constructor_events.send(envelope).is_err() {
            tracing::trace!("No open view for constructor envelope");
        }
    }

    /// Forward constructor envelopes from the push channel until it closes.
    pub fn spawn_push_listener(self: &Arc<Self>, push: &dyn PushChannel) -> JoinHandle<()> {
        let mut events = push.subscribe(CONSTRUCTORS_EVENT);
        let directory = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(payload) => match serde_json::from_value::<PushEnvelope>(payload) {
                        Ok(envelope) => directory.publish_constructor_event(envelope),
                        Err(e) => tracing::warn!("Ignoring malformed constructor event: {}", e),
                    },
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Constructor listener lagged, skipped {} events", skipped)
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    fn fail(&self, err: ClientError, operation: &str) {
        tracing::warn!("{} failed: {}", operation, err);
        surface_error(self.ui.as_ref(), &err);
    }
}
