//! Data models for the competitor portal client.
//!
//! Field names on the wire follow the portal backend; the Rust side uses English names.

mod identity;
mod push;
mod results;
mod robot;
mod session_info;

pub use identity::*;
pub use push::*;
pub use results::*;
pub use robot::*;
pub use session_info::*;
