//! Adapters to systems outside the server.

pub mod payment_oracle;

pub use payment_oracle::{
    DisabledPaymentOracle, HttpPaymentOracle, InMemoryPaymentOracle, JoinVerification,
    OracleError, PaymentOracle, ResolvedLobby,
};
