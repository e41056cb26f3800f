//! Route handlers, grouped by resource.

pub mod attendance;
pub mod login;
pub mod users;
