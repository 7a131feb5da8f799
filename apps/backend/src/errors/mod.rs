//! Error handling for the lobby server.

pub mod domain;
pub mod error_code;

#[cfg(test)]
mod tests_error_mapping;

pub use domain::{DomainError, IllegalMoveKind, NotFoundKind, UnauthorizedKind};
pub use error_code::ErrorCode;
