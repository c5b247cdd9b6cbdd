//! Time-boxed permission windows and the countdown derived from them.

use chrono::{DateTime, Utc};

use crate::models::{RoleTier, SessionInfo};

/// Remaining whole seconds under which a window counts as closing soon.
pub const WEEK_SECS: i64 = 604_800;

/// `now < until`; an unknown window is never active.
pub fn window_active(until: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    until.is_some_and(|until| now < until)
}

/// General modify window and the smash-category modify window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PermissionWindows {
    pub modify_until: Option<DateTime<Utc>>,
    pub smash_until: Option<DateTime<Utc>>,
}

impl PermissionWindows {
    pub fn from_info(info: &SessionInfo) -> Self {
        Self {
            modify_until: info.access_to_modify_expiration_date,
            smash_until: info.access_to_smash_robots,
        }
    }

    pub fn can_modify_at(&self, now: DateTime<Utc>, role: RoleTier) -> bool {
        role.is_elevated() || window_active(self.modify_until, now)
    }

    pub fn can_modify_smash_at(&self, now: DateTime<Utc>, role: RoleTier) -> bool {
        role.is_elevated() || window_active(self.smash_until, now)
    }

    /// True once a known smash window lies in the past.
    pub fn smash_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.smash_until.is_some_and(|until| until < now)
    }
}

/// Countdown shown while the windows are open.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionCountdown {
    /// Milliseconds left in the general window
    pub time_left: Option<i64>,
    /// Milliseconds left in the smash window
    pub time_left_smash: Option<i64>,
    pub time_is_up: bool,
    pub time_is_up_smash: bool,
    /// Display alternation flag, carries no state
    pub switcher: bool,
}

impl PermissionCountdown {
    /// Recompute from cached instants. No-op until both windows are known.
    pub fn refresh(&mut self, windows: &PermissionWindows, now: DateTime<Utc>) {
        let (Some(modify_until), Some(smash_until)) = (windows.modify_until, windows.smash_until)
        else {
            return;
        };

        let left = (modify_until - now).num_milliseconds();
        let left_smash = (smash_until - now).num_milliseconds();
        self.time_left = Some(left);
        self.time_left_smash = Some(left_smash);

        // sticky: once up, stays up
        if left.div_euclid(1000) < 0 {
            self.time_is_up = true;
        }
        if left_smash.div_euclid(1000) < 0 {
            self.time_is_up_smash = true;
        }
    }

    pub fn is_less_than_week(&self) -> bool {
        closing_soon(self.time_left)
    }

    pub fn is_less_than_week_smash(&self) -> bool {
        closing_soon(self.time_left_smash)
    }
}

fn closing_soon(left: Option<i64>) -> bool {
    matches!(left, Some(ms) if ms != 0 && ms.div_euclid(1000) < WEEK_SECS)
}
