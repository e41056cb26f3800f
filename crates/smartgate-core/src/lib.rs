//! Core types and trait definitions for the SmartGate attendance tracker.
//!
//! This crate is free of HTTP and database dependencies. The storage backend
//! and the web layer both depend on it.

// Native `async fn` in traits; the `Send` bounds are spelled out on the
// returned futures where it matters.
#![allow(async_fn_in_trait)]

pub mod attendance;
pub mod error;
pub mod identity;
pub mod memory;
pub mod store;
pub mod tracker;

pub use error::{Error, Result};
pub use tracker::AttendanceTracker;
