//! Ports to the page layer: feedback toasts, error display, confirmation
//! dialogs, and navigation.
//!
//! The core only ever passes localization keys; translating them is the page
//! layer's job.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::errors::ClientError;

/// Route of the robot detail view.
pub fn robot_route(robot_uuid: &uuid::Uuid) -> String {
    format!("/competitor-zone/(outlet:robot/{})", robot_uuid)
}

/// Route of the viewer's robot list.
pub const MY_ROBOTS_ROUTE: &str = "/competitor-zone/(outlet:my-robots)";
/// Landing route after a successful login.
pub const COMPETITOR_ZONE_ROUTE: &str = "/competitor-zone";
pub const LOGIN_ROUTE: &str = "/login";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackKind {
    Success,
    Loading,
}

/// Toasts, error banners and confirmation dialogs.
#[async_trait]
pub trait Ui: Send + Sync {
    fn show_feedback(&self, kind: FeedbackKind, message_key: &str, duration: Option<Duration>);

    /// Show an error for `status`; `message_key` is absent for generic failures.
    fn show_error(&self, status: u16, message_key: Option<&str>);

    /// Ask the user to confirm a destructive action.
    async fn want_to_continue(&self, prompt_key: &str) -> bool;
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &str);
    fn current_url(&self) -> String;
}

/// Show a classified failure to the user, unless it resolves silently.
pub fn surface_error(ui: &dyn Ui, err: &ClientError) {
    if err.is_surfaced() {
        ui.show_error(err.status(), err.user_message_key());
    }
}

/// Headless [`Ui`] that logs everything and confirms nothing.
#[derive(Debug, Default)]
pub struct TracingUi;

#[async_trait]
impl Ui for TracingUi {
    fn show_feedback(&self, kind: FeedbackKind, message_key: &str, duration: Option<Duration>) {
        tracing::info!(?kind, ?duration, "feedback: {}", message_key);
    }

    fn show_error(&self, status: u16, message_key: Option<&str>) {
        tracing::warn!(status, "error: {}", message_key.unwrap_or("generic"));
    }

    async fn want_to_continue(&self, prompt_key: &str) -> bool {
        tracing::info!("declining confirmation {} in headless mode", prompt_key);
        false
    }
}

/// Headless [`Navigator`] that only tracks the current URL.
#[derive(Debug)]
pub struct TracingNavigator {
    url: Mutex<String>,
}

impl TracingNavigator {
    pub fn new(initial: &str) -> Self {
        Self {
            url: Mutex::new(initial.to_string()),
        }
    }
}

impl Navigator for TracingNavigator {
    fn navigate(&self, url: &str) {
        tracing::info!("navigate: {}", url);
        *self.url.lock() = url.to_string();
    }

    fn current_url(&self) -> String {
        self.url.lock().clone()
    }
}
