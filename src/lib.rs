//! Robomotion competitor portal client core.
//!
//! Session and identity state, shared list streams, and the robot detail
//! reconciler, wired together by an explicit [`context::Client`].

pub mod config;
pub mod context;
pub mod directory;
pub mod errors;
pub mod gateway;
pub mod identity;
pub mod models;
pub mod push;
pub mod reconciler;
pub mod session;
pub mod storage;
pub mod ui;

#[cfg(test)]
mod test_support;
