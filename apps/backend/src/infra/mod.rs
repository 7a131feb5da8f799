//! Infrastructure: wiring the process-wide state from configuration.

pub mod state;
