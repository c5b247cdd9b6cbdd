//! Which categories a robot may still be entered into.

use crate::models::Category;

/// Line-follower family.
pub const LINE_FOLLOWER_FAMILY: [i64; 5] = [4, 5, 6, 7, 8];
/// Sumo family.
pub const SUMO_FAMILY: [i64; 5] = [12, 13, 14, 15, 16];
/// Gated by its own permission window.
pub const SMASH_CATEGORY: i64 = 1;
/// Holding this many categories of a family closes the rest of the family.
pub const FAMILY_CAP: usize = 2;
/// A robot may hold at most this many categories.
pub const MAX_CATEGORIES: usize = 4;

/// Offerable categories for a robot holding `assigned`.
///
/// Family and smash removals are independent set subtractions; removing the
/// already-assigned categories comes last.
pub fn available_categories(
    catalogue: &[Category],
    assigned: &[i64],
    smash_expired: bool,
) -> Vec<Category> {
    let held = |family: &[i64]| assigned.iter().filter(|id| family.contains(id)).count();
    let line_follower_full = held(&LINE_FOLLOWER_FAMILY) >= FAMILY_CAP;
    let sumo_full = held(&SUMO_FAMILY) >= FAMILY_CAP;

    catalogue
        .iter()
        .filter(|c| !(line_follower_full && LINE_FOLLOWER_FAMILY.contains(&c.id)))
        .filter(|c| !(sumo_full && SUMO_FAMILY.contains(&c.id)))
        .filter(|c| !(smash_expired && c.id == SMASH_CATEGORY))
        .filter(|c| !assigned.contains(&c.id))
        .cloned()
        .collect()
}
