//! View state of the robot detail page.

use std::cmp::Reverse;

use uuid::Uuid;

use super::filter::MAX_CATEGORIES;
use crate::models::{Category, Constructor, Fight, Robot, TimeResult};

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 40;
/// Length of a textual user identifier.
pub const CONSTRUCTOR_ID_CHARS: usize = 36;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewPhase {
    Loading,
    Ready,
    /// Terminal: the view has navigated back to the robot list
    NavigatingAway,
}

/// Editable robot name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameForm {
    pub original: String,
    pub enabled: bool,
}

impl NameForm {
    pub fn is_valid(&self, name: &str) -> bool {
        self.enabled && (NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&name.chars().count())
    }

    pub fn is_changed(&self, name: &str) -> bool {
        name != self.original
    }
}

/// Candidate constructor, entered as a user identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstructorForm {
    /// Users already listed as constructors
    pub taken: Vec<Uuid>,
}

impl ConstructorForm {
    pub fn parse(&self, input: &str) -> Option<Uuid> {
        if input.chars().count() != CONSTRUCTOR_ID_CHARS {
            return None;
        }
        let user_uuid = Uuid::parse_str(input).ok()?;
        (!self.taken.contains(&user_uuid)).then_some(user_uuid)
    }
}

/// Per-operation busy flags. Everything starts busy until the first load completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadingFlags {
    pub name: bool,
    pub categories: bool,
    pub constructors: bool,
    pub results: bool,
    /// Flags owned by a user operation still in flight, one bit per [`Busy`]
    held: u8,
}

/// Operations that hold a loading flag while in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Busy {
    Name,
    Categories,
    Constructors,
}

impl Busy {
    fn bit(self) -> u8 {
        1 << self as u8
    }
}

impl LoadingFlags {
    pub fn is(&self, busy: Busy) -> bool {
        match busy {
            Busy::Name => self.name,
            Busy::Categories => self.categories,
            Busy::Constructors => self.constructors,
        }
    }

    pub fn set(&mut self, busy: Busy, value: bool) {
        match busy {
            Busy::Name => self.name = value,
            Busy::Categories => self.categories = value,
            Busy::Constructors => self.constructors = value,
        }
    }

    /// Whether a user operation owns the flag.
    pub fn is_held(&self, busy: Busy) -> bool {
        self.held & busy.bit() != 0
    }

    /// Raise the flag on behalf of a user operation.
    pub fn claim(&mut self, busy: Busy) {
        self.held |= busy.bit();
        self.set(busy, true);
    }

    /// Drop the operation's claim and lower the flag.
    pub fn release(&mut self, busy: Busy) {
        self.held &= !busy.bit();
        self.set(busy, false);
    }

    /// Lower the flag after a background load, unless an operation still owns it.
    pub fn settle(&mut self, busy: Busy) {
        if !self.is_held(busy) {
            self.set(busy, false);
        }
    }
}

impl Default for LoadingFlags {
    fn default() -> Self {
        Self {
            name: true,
            categories: true,
            constructors: true,
            results: true,
            held: 0,
        }
    }
}

/// Everything the robot page renders. Rebuilt wholesale when the lists change.
#[derive(Debug, Clone, Default)]
pub struct RobotViewModel {
    pub robot: Option<Robot>,
    pub categories: Vec<Category>,
    pub available_categories: Vec<Category>,
    pub constructors: Option<Vec<Constructor>>,
    pub name_form: NameForm,
    pub constructor_form: ConstructorForm,
    pub loading: LoadingFlags,
    pub is_event: bool,
    pub fights: Option<Vec<Fight>>,
    /// Sorted by run time, fastest first
    pub times: Option<Vec<TimeResult>>,
    pub selected_category: Option<i64>,
    pub selected_group: Option<i64>,
}

impl RobotViewModel {
    pub fn assigned_categories(&self) -> Vec<i64> {
        self.robot.as_ref().map(Robot::category_ids).unwrap_or_default()
    }

    pub fn can_add_category(&self) -> bool {
        self.robot.is_some() && self.assigned_categories().len() < MAX_CATEGORIES
    }

    pub fn can_delete_category(&self) -> bool {
        self.robot.is_some() && self.assigned_categories().len() > 1
    }

    pub fn can_delete_constructor(&self) -> bool {
        self.constructors.as_ref().is_some_and(|c| c.len() > 1)
    }

    pub fn set_constructors(&mut self, constructors: Vec<Constructor>) {
        self.constructor_form.taken = constructors.iter().map(|c| c.user_uuid).collect();
        self.constructors = Some(constructors);
    }

    pub fn set_times(&mut self, mut times: Vec<TimeResult>) {
        times.sort_by_key(|t| t.run_time);
        self.times = Some(times);
    }

    pub fn select_category(&mut self, category_id: i64) {
        self.selected_category = Some(category_id);
        self.selected_group = None;
    }

    pub fn select_group(&mut self, group_id: i64) {
        self.selected_group = Some(group_id);
    }

    /// Fights in the selected category, newest first, then ordered by finish time.
    pub fn category_fights(&self) -> Vec<Fight> {
        self.fights_where(|f| Some(f.category_id) == self.selected_category)
    }

    pub fn group_fights(&self) -> Vec<Fight> {
        self.fights_where(|f| {
            Some(f.category_id) == self.selected_category && f.group_id == self.selected_group
        })
    }

    fn fights_where(&self, keep: impl Fn(&Fight) -> bool) -> Vec<Fight> {
        let mut fights: Vec<Fight> = self
            .fights
            .iter()
            .flatten()
            .filter(|&f| keep(f))
            .cloned()
            .collect();
        fights.sort_by_key(|f| Reverse(f.id));
        // unfinished fights last
        fights.sort_by_key(|f| (f.finished_at.is_none(), f.finished_at));
        fights
    }

    /// Timed results in the selected category, newest first.
    pub fn category_times(&self) -> Vec<TimeResult> {
        let mut times: Vec<TimeResult> = self
            .times
            .iter()
            .flatten()
            .filter(|t| Some(t.category_id) == self.selected_category)
            .cloned()
            .collect();
        times.sort_by_key(|t| Reverse(t.id));
        times
    }

    pub fn category_name(&self, category_id: i64) -> String {
        self.categories
            .iter()
            .find(|c| c.id == category_id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| "???".to_string())
    }

    pub fn selected_category_kind(&self) -> Option<&serde_json::Value> {
        let selected = self.selected_category?;
        self.categories
            .iter()
            .find(|c| c.id == selected)
            .and_then(|c| c.kind.as_ref())
    }
}
