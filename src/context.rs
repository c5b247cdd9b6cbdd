//! Explicitly constructed client context.
//!
//! Builds the process-wide services once and hands them to views by reference.
//! The identity cache reaches the session store only through its persist
//! channel.

use std::sync::Arc;

use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::directory::Directory;
use crate::gateway::{AccountApi, CompetitionApi};
use crate::identity::IdentityCache;
use crate::push::PushChannel;
use crate::reconciler::{RobotView, ViewContext};
use crate::session::SessionStore;
use crate::storage::DurableStorage;
use crate::ui::{Navigator, Ui};

/// External collaborators the client is built from.
pub struct ClientParts {
    pub account: Arc<dyn AccountApi>,
    pub competition: Arc<dyn CompetitionApi>,
    pub storage: Arc<dyn DurableStorage>,
    pub push: Arc<dyn PushChannel>,
    pub ui: Arc<dyn Ui>,
    pub navigator: Arc<dyn Navigator>,
}

pub struct Client {
    pub session: Arc<SessionStore>,
    pub identity: Arc<IdentityCache>,
    pub directory: Arc<Directory>,
    competition: Arc<dyn CompetitionApi>,
    ui: Arc<dyn Ui>,
    navigator: Arc<dyn Navigator>,
    tasks: Vec<JoinHandle<()>>,
}

impl Client {
    /// Wire the services and start their background listeners.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(parts: ClientParts) -> Self {
        let (identity, persist_requests) =
            IdentityCache::new(Arc::clone(&parts.account), Arc::clone(&parts.ui));
        let identity = Arc::new(identity);

        let session = Arc::new(SessionStore::new(
            parts.account,
            parts.storage,
            Arc::clone(&parts.push),
            Arc::clone(&identity),
            Arc::clone(&parts.ui),
            Arc::clone(&parts.navigator),
        ));

        let directory = Arc::new(Directory::new(
            Arc::clone(&parts.competition),
            Arc::clone(&parts.ui),
        ));

        let tasks = vec![
            session.spawn_persist_loop(persist_requests),
            identity.spawn_push_listener(parts.push.as_ref()),
            directory.spawn_push_listener(parts.push.as_ref()),
        ];
        tracing::debug!("Client services started");

        Self {
            session,
            identity,
            directory,
            competition: parts.competition,
            ui: parts.ui,
            navigator: parts.navigator,
            tasks,
        }
    }

    pub fn view_context(&self) -> ViewContext {
        ViewContext {
            session: Arc::clone(&self.session),
            identity: Arc::clone(&self.identity),
            directory: Arc::clone(&self.directory),
            competition: Arc::clone(&self.competition),
            ui: Arc::clone(&self.ui),
            navigator: Arc::clone(&self.navigator),
        }
    }

    pub fn open_robot_view(&self, robot_uuid: Uuid) -> RobotView {
        RobotView::open(self.view_context(), robot_uuid)
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
