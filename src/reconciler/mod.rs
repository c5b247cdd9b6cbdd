//! Robot detail view: keeps one focal robot consistent with the shared lists,
//! constructor push events and session info, and runs the user's edits.
//!
//! [`RobotView::open`] spawns a driver that samples every source whenever any
//! of them changes and feeds the combined snapshot to [`RobotReconciler::apply`].
//! List and session snapshots are last-write-wins; each queued constructor
//! envelope gets a pass of its own. Dropping the view aborts the driver.

mod filter;
mod fingerprint;
mod robot;
mod state;

pub use filter::*;
pub use fingerprint::*;
pub use robot::*;
pub use state::*;

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::directory::{Directory, ListStream};
use crate::gateway::CompetitionApi;
use crate::identity::IdentityCache;
use crate::models::{Category, PushEnvelope, Robot, SessionInfo};
use crate::session::SessionStore;
use crate::ui::{Navigator, Ui};

/// Collaborators a view needs, passed in explicitly.
#[derive(Clone)]
pub struct ViewContext {
    pub session: Arc<SessionStore>,
    pub identity: Arc<IdentityCache>,
    pub directory: Arc<Directory>,
    pub competition: Arc<dyn CompetitionApi>,
    pub ui: Arc<dyn Ui>,
    pub navigator: Arc<dyn Navigator>,
}

struct Sources {
    categories: ListStream<Category>,
    robots: ListStream<Robot>,
    envelopes: broadcast::Receiver<PushEnvelope>,
    info: watch::Receiver<Option<SessionInfo>>,
}

enum Change {
    Snapshot,
    Envelope(PushEnvelope),
}

impl Sources {
    fn sample(&mut self, envelope: Option<PushEnvelope>) -> Inputs {
        Inputs {
            categories: self.categories.borrow_and_update().clone(),
            robots: self.robots.borrow_and_update().clone(),
            envelope,
            info: self.info.borrow_and_update().clone(),
        }
    }

    /// Wait for the next change. Returns `None` once a source is closed.
    async fn next(&mut self) -> Option<Change> {
        tokio::select! {
            r = self.categories.changed() => r.ok().map(|_| Change::Snapshot),
            r = self.robots.changed() => r.ok().map(|_| Change::Snapshot),
            r = self.info.changed() => r.ok().map(|_| Change::Snapshot),
            r = self.envelopes.recv() => match r {
                Ok(envelope) => Some(Change::Envelope(envelope)),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Robot view lagged, skipped {} constructor envelopes", skipped);
                    Some(Change::Snapshot)
                }
                Err(RecvError::Closed) => None,
            },
        }
    }
}

/// A live robot detail view.
pub struct RobotView {
    reconciler: Arc<RobotReconciler>,
    driver: JoinHandle<()>,
}

impl RobotView {
    pub fn open(ctx: ViewContext, robot_uuid: Uuid) -> Self {
        let role = ctx.identity.role();
        let mut sources = Sources {
            categories: ctx.directory.categories(),
            robots: ctx.directory.robots_for(role),
            envelopes: ctx.directory.constructor_events(),
            info: ctx.session.info(),
        };
        let reconciler = Arc::new(RobotReconciler::new(ctx, robot_uuid));

        let driver = {
            let reconciler = Arc::clone(&reconciler);
            tokio::spawn(async move {
                let mut envelope = None;
                loop {
                    reconciler.apply(sources.sample(envelope.take())).await;
                    if reconciler.phase() == ViewPhase::NavigatingAway {
                        break;
                    }
                    match sources.next().await {
                        Some(Change::Envelope(next)) => envelope = Some(next),
                        Some(Change::Snapshot) => {}
                        None => {
                            tracing::debug!(robot = %robot_uuid, "Robot view source closed");
                            break;
                        }
                    }
                }
            })
        };

        tracing::debug!(robot = %robot_uuid, ?role, "Robot view opened");
        Self { reconciler, driver }
    }

    pub fn reconciler(&self) -> &Arc<RobotReconciler> {
        &self.reconciler
    }
}

impl std::ops::Deref for RobotView {
    type Target = RobotReconciler;

    fn deref(&self) -> &Self::Target {
        &self.reconciler
    }
}

impl Drop for RobotView {
    fn drop(&mut self) {
        self.driver.abort();
    }
}
