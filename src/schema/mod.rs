//! Collector payload schemas
//!
//! Converts the payloads produced by station collectors into
//! [`crate::types::ReadingSnapshot`]s, normalizing units on the way in.

mod netatmo;

pub use netatmo::*;
