//! Reconciliation of one focal robot against its independently-updating sources.

use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::{watch, Mutex as AsyncMutex};
use uuid::Uuid;

use super::filter::available_categories;
use super::fingerprint::Fingerprint;
use super::state::{Busy, LoadingFlags, NameForm, RobotViewModel, ViewPhase};
use super::ViewContext;
use crate::errors::{ClientError, RemoteFailure};
use crate::models::{Category, EnvelopeMethod, PushEnvelope, Robot, SessionInfo};
use crate::ui::{robot_route, surface_error, FeedbackKind, MY_ROBOTS_ROUTE};

const TOAST_DURATION: Duration = Duration::from_secs(2);

/// Latest value of every source, sampled together.
#[derive(Debug, Clone, Default)]
pub struct Inputs {
    pub categories: Option<Vec<Category>>,
    pub robots: Option<Vec<Robot>>,
    /// Constructor envelope delivered since the previous pass, if any
    pub envelope: Option<PushEnvelope>,
    pub info: Option<SessionInfo>,
}

/// Result of a user-initiated operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A guard failed; nothing was sent
    Rejected,
    /// The user declined the confirmation
    Declined,
    Completed,
    /// The remote call failed and the view navigated away
    Failed,
}

/// What the pipeline has already acted on.
#[derive(Debug, Default)]
struct Tracking {
    lists: Option<Fingerprint>,
    envelope: Option<Fingerprint>,
    requested_categories: bool,
    requested_robots: bool,
    results_loaded: bool,
}

pub struct RobotReconciler {
    ctx: ViewContext,
    robot_uuid: Uuid,
    model: Mutex<RobotViewModel>,
    /// Serializes pipeline runs; holds what they have already processed
    tracking: AsyncMutex<Tracking>,
    phase: watch::Sender<ViewPhase>,
}

impl RobotReconciler {
    pub fn new(ctx: ViewContext, robot_uuid: Uuid) -> Self {
        Self {
            ctx,
            robot_uuid,
            model: Mutex::new(RobotViewModel::default()),
            tracking: AsyncMutex::new(Tracking::default()),
            phase: watch::channel(ViewPhase::Loading).0,
        }
    }

    pub fn robot_uuid(&self) -> Uuid {
        self.robot_uuid
    }

    pub fn phase(&self) -> ViewPhase {
        *self.phase.borrow()
    }

    pub fn watch_phase(&self) -> watch::Receiver<ViewPhase> {
        self.phase.subscribe()
    }

    pub fn snapshot(&self) -> RobotViewModel {
        self.model.lock().clone()
    }

    fn is_gone(&self) -> bool {
        self.phase() == ViewPhase::NavigatingAway
    }

    // ==================== PIPELINE ====================

    /// Run one reconciliation pass over the latest inputs.
    pub async fn apply(&self, inputs: Inputs) {
        let mut tracking = self.tracking.lock().await;
        if self.is_gone() {
            return;
        }

        let (categories, robots) = match (inputs.categories, inputs.robots) {
            (Some(categories), Some(robots)) => (categories, robots),
            (categories, robots) => {
                self.request_missing(&mut tracking, categories.is_none(), robots.is_none())
                    .await;
                return;
            }
        };

        let lists = Fingerprint::of(&(&categories, &robots));
        if tracking.lists == Some(lists) {
            tracing::trace!(robot = %self.robot_uuid, "Lists unchanged, skipping rebuild");
        } else {
            tracking.lists = Some(lists);
            if !self.rebuild(categories, &robots) {
                self.leave("robot no longer listed");
                return;
            }
        }

        self.on_envelope(&mut tracking, inputs.envelope).await;
        if self.is_gone() {
            return;
        }

        self.on_info(&mut tracking, inputs.info).await;
    }

    async fn request_missing(&self, tracking: &mut Tracking, categories: bool, robots: bool) {
        if robots && !tracking.requested_robots {
            tracking.requested_robots = true;
            self.ctx
                .directory
                .refresh_robots_for(self.ctx.identity.role())
                .await;
        }
        if categories && !tracking.requested_categories {
            tracking.requested_categories = true;
            self.ctx.directory.refresh_categories().await;
        }
    }

    /// Rebuild derived state from fresh lists. Returns false if the robot is gone.
    fn rebuild(&self, categories: Vec<Category>, robots: &[Robot]) -> bool {
        let Some(robot) = robots.iter().find(|r| r.uuid == self.robot_uuid).cloned() else {
            return false;
        };

        let smash_expired = self.ctx.session.windows().smash_expired_at(Utc::now());
        let available = available_categories(&categories, &robot.category_ids(), smash_expired);
        let can_modify = self.ctx.session.can_modify();

        {
            let mut model = self.model.lock();
            model.name_form = NameForm {
                original: robot.name.clone(),
                enabled: can_modify,
            };
            model.available_categories = available;
            model.categories = categories;
            model.robot = Some(robot);
            model.loading.settle(Busy::Name);
            model.loading.settle(Busy::Categories);
        }

        let first = self.phase.send_if_modified(|phase| {
            if *phase == ViewPhase::Loading {
                *phase = ViewPhase::Ready;
                true
            } else {
                false
            }
        });
        if first {
            tracing::info!(robot = %self.robot_uuid, "Robot view ready");
        } else {
            tracing::debug!(robot = %self.robot_uuid, "Robot view rebuilt");
        }
        true
    }

    async fn on_envelope(&self, tracking: &mut Tracking, envelope: Option<PushEnvelope>) {
        let fingerprint = envelope.as_ref().map(Fingerprint::of);

        if self.model.lock().constructors.is_none() {
            if fingerprint.is_some() {
                tracking.envelope = fingerprint;
            }
            self.load_constructors().await;
            return;
        }

        let Some(envelope) = envelope else {
            return;
        };
        if tracking.envelope == fingerprint {
            tracing::trace!(robot = %self.robot_uuid, "Duplicate constructor envelope ignored");
            return;
        }
        tracking.envelope = fingerprint;

        if !envelope.concerns_robot(self.robot_uuid) {
            return;
        }

        match envelope.method {
            EnvelopeMethod::Add => {
                self.model.lock().loading.set(Busy::Constructors, true);
                self.load_constructors().await;
            }
            EnvelopeMethod::Delete => {
                if self.viewer_lost_access(&envelope) {
                    self.leave("viewer removed from constructors");
                    self.ctx.directory.refresh_user_robots().await;
                } else {
                    self.model.lock().loading.set(Busy::Constructors, true);
                    self.load_constructors().await;
                }
            }
        }
    }

    /// Whether a constructor deletion removed the viewer while they look at this robot.
    fn viewer_lost_access(&self, envelope: &PushEnvelope) -> bool {
        let Some(data) = envelope.data.as_ref() else {
            return false;
        };
        let owner = data.user_uuid.or_else(|| {
            let model = self.model.lock();
            model
                .constructors
                .iter()
                .flatten()
                .find(|c| Some(c.id) == data.constructor_id)
                .map(|c| c.user_uuid)
        });
        let viewer = self.ctx.identity.user_uuid();

        owner.is_some()
            && owner == viewer
            && self.ctx.navigator.current_url() == robot_route(&self.robot_uuid)
    }

    async fn load_constructors(&self) {
        match self.ctx.competition.robot_constructors(self.robot_uuid).await {
            Ok(constructors) => {
                tracing::debug!(
                    robot = %self.robot_uuid,
                    "Loaded {} constructors",
                    constructors.len()
                );
                let mut model = self.model.lock();
                model.set_constructors(constructors);
                model.loading.settle(Busy::Constructors);
            }
            Err(failure) => self.stale(failure, "load constructors"),
        }
    }

    async fn on_info(&self, tracking: &mut Tracking, info: Option<SessionInfo>) {
        let started = info.is_some_and(|info| info.event_started_at(Utc::now()));
        if !started || tracking.results_loaded {
            return;
        }
        tracking.results_loaded = true;
        self.model.lock().is_event = true;

        let api = &self.ctx.competition;
        let (fights, times) = tokio::join!(
            api.robot_fights(self.robot_uuid),
            api.robot_times(self.robot_uuid)
        );

        let mut model = self.model.lock();
        match fights {
            Ok(fights) => {
                model.fights = Some(fights);
                model.loading.results = false;
            }
            Err(failure) => {
                tracing::warn!(robot = %self.robot_uuid, "Failed to load fights: {}", failure);
                surface_error(self.ctx.ui.as_ref(), &failure.into());
            }
        }
        match times {
            Ok(times) => {
                model.set_times(times);
                model.loading.results = false;
            }
            Err(failure) => {
                tracing::warn!(robot = %self.robot_uuid, "Failed to load times: {}", failure);
                surface_error(self.ctx.ui.as_ref(), &failure.into());
            }
        }
    }

    /// Enter the terminal state. Navigates only on the first call.
    fn leave(&self, reason: &str) -> bool {
        let left = self.phase.send_if_modified(|phase| {
            if *phase == ViewPhase::NavigatingAway {
                false
            } else {
                *phase = ViewPhase::NavigatingAway;
                true
            }
        });
        if left {
            tracing::info!(robot = %self.robot_uuid, "Leaving robot view: {}", reason);
            self.ctx.navigator.navigate(MY_ROBOTS_ROUTE);
        }
        left
    }

    /// The robot or the viewer's access to it may be gone: resolve by leaving.
    fn stale(&self, failure: RemoteFailure, operation: &str) {
        let err = ClientError::StaleReference(format!("{} on robot {}", operation, self.robot_uuid));
        tracing::warn!("{} failed: {}", err, failure);
        self.leave(operation);
    }

    // ==================== OPERATIONS ====================

    /// Claim a loading flag if `guard` holds. Returns the robot when claimed.
    fn begin(&self, busy: Busy, guard: impl FnOnce(&RobotViewModel) -> bool) -> Option<Robot> {
        if self.is_gone() || !self.ctx.session.can_modify() {
            return None;
        }
        let mut model = self.model.lock();
        let robot = model.robot.clone()?;
        if model.loading.is(busy) || !guard(&*model) {
            return None;
        }
        model.loading.claim(busy);
        Some(robot)
    }

    fn finish(&self, busy: Busy) {
        self.model.lock().loading.release(busy);
    }

    /// Same checks as [`Self::begin`], without claiming the flag.
    fn check_ready(&self, busy: Busy, guard: impl FnOnce(&RobotViewModel) -> bool) -> bool {
        if self.is_gone() || !self.ctx.session.can_modify() {
            return false;
        }
        let model = self.model.lock();
        model.robot.is_some() && !model.loading.is(busy) && guard(&*model)
    }

    fn toast(&self, key: &str) {
        self.ctx
            .ui
            .show_feedback(FeedbackKind::Success, key, Some(TOAST_DURATION));
    }

    async fn refresh_robots(&self) {
        self.ctx
            .directory
            .refresh_robots_for(self.ctx.identity.role())
            .await;
    }

    pub async fn update_name(&self, name: &str) -> Outcome {
        let Some(robot) = self.begin(Busy::Name, |m| m.name_form.is_valid(name)) else {
            return Outcome::Rejected;
        };

        let outcome = match self.ctx.competition.update_robot(robot.uuid, name).await {
            Ok(_) => {
                self.toast("competitor-zone.robot.update-name");
                self.refresh_robots().await;
                Outcome::Completed
            }
            Err(failure) => {
                self.stale(failure, "update name");
                Outcome::Failed
            }
        };
        self.finish(Busy::Name);
        outcome
    }

    pub async fn add_category(&self, category_id: i64) -> Outcome {
        let Some(robot) = self.begin(
            Busy::Categories,
            |m| {
                m.can_add_category()
                    && m.available_categories.iter().any(|c| c.id == category_id)
            },
        ) else {
            return Outcome::Rejected;
        };

        let outcome = match self
            .ctx
            .competition
            .add_robot_category(robot.uuid, category_id)
            .await
        {
            Ok(_) => {
                self.toast("competitor-zone.robot.add-category");
                self.refresh_robots().await;
                Outcome::Completed
            }
            Err(failure) => {
                self.stale(failure, "add category");
                Outcome::Failed
            }
        };
        self.finish(Busy::Categories);
        outcome
    }

    pub async fn remove_category(&self, category_id: i64) -> Outcome {
        let guard = |m: &RobotViewModel| {
            m.can_delete_category() && m.assigned_categories().contains(&category_id)
        };
        if !self.check_ready(Busy::Categories, guard) {
            return Outcome::Rejected;
        }
        if !self
            .ctx
            .ui
            .want_to_continue("competitor-zone.robot.want-to-delete-category")
            .await
        {
            return Outcome::Declined;
        }
        let Some(robot) = self.begin(Busy::Categories, guard) else {
            return Outcome::Rejected;
        };

        let outcome = match self
            .ctx
            .competition
            .delete_robot_category(robot.uuid, category_id)
            .await
        {
            Ok(_) => {
                self.toast("competitor-zone.robot.delete-category");
                self.refresh_robots().await;
                Outcome::Completed
            }
            Err(failure) => {
                self.stale(failure, "remove category");
                Outcome::Failed
            }
        };
        self.finish(Busy::Categories);
        outcome
    }

    /// Add the user identified by `user_id` as a constructor of the robot.
    pub async fn add_constructor(&self, user_id: &str) -> Outcome {
        let user_uuid = self.model.lock().constructor_form.parse(user_id);
        let Some(user_uuid) = user_uuid else {
            return Outcome::Rejected;
        };
        let Some(robot) = self.begin(Busy::Constructors, |_| true) else {
            return Outcome::Rejected;
        };

        let outcome = match self
            .ctx
            .competition
            .add_constructor(robot.uuid, user_uuid)
            .await
        {
            Ok(_) => {
                self.toast("competitor-zone.robot.add-constructor");
                Outcome::Completed
            }
            Err(failure) => {
                self.stale(failure, "add constructor");
                Outcome::Failed
            }
        };
        self.finish(Busy::Constructors);
        outcome
    }

    pub async fn delete_constructor(&self, constructor_id: i64) -> Outcome {
        let guard = |m: &RobotViewModel| {
            m.can_delete_constructor()
                && m.constructors
                    .iter()
                    .flatten()
                    .any(|c| c.id == constructor_id)
        };
        if !self.check_ready(Busy::Constructors, guard) {
            return Outcome::Rejected;
        }
        if !self
            .ctx
            .ui
            .want_to_continue("competitor-zone.robot.want-to-delete-constructor")
            .await
        {
            return Outcome::Declined;
        }
        let Some(robot) = self.begin(Busy::Constructors, guard) else {
            return Outcome::Rejected;
        };

        let outcome = match self
            .ctx
            .competition
            .delete_constructor(robot.uuid, constructor_id)
            .await
        {
            Ok(_) => {
                self.toast("competitor-zone.robot.delete-constructor");
                Outcome::Completed
            }
            Err(failure) => {
                self.stale(failure, "delete constructor");
                Outcome::Failed
            }
        };
        self.finish(Busy::Constructors);
        outcome
    }

    /// Delete the robot. The view navigates back whatever the result.
    pub async fn delete_robot(&self) -> Outcome {
        if !self.check_ready(Busy::Name, |_| true) {
            return Outcome::Rejected;
        }
        if !self
            .ctx
            .ui
            .want_to_continue("competitor-zone.robot.want-to-delete-robot")
            .await
        {
            return Outcome::Declined;
        }
        let robot = {
            let mut model = self.model.lock();
            match model.robot.clone() {
                Some(robot) if !self.is_gone() => {
                    model.loading = LoadingFlags::default();
                    robot
                }
                _ => return Outcome::Rejected,
            }
        };

        let outcome = match self.ctx.competition.delete_robot(robot.uuid).await {
            Ok(_) => Outcome::Completed,
            Err(failure) => {
                tracing::warn!(robot = %robot.uuid, "Delete robot failed: {}", failure);
                Outcome::Failed
            }
        };
        self.leave("robot deleted");
        outcome
    }

    pub fn select_category(&self, category_id: i64) {
        self.model.lock().select_category(category_id);
    }

    pub fn select_group(&self, group_id: i64) {
        self.model.lock().select_group(group_id);
    }
}

impl std::fmt::Debug for RobotReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RobotReconciler")
            .field("robot_uuid", &self.robot_uuid)
            .field("phase", &self.phase())
            .finish()
    }
}
