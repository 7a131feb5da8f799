//! Backend test support utilities
//!
//! Shared by the backend's unit and integration tests: one-time logging
//! initialization, unique test identifiers and problem+json assertions.

pub mod logging;
pub mod problem_details;
pub mod unique_helpers;
