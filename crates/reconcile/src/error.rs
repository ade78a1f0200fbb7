//! Error types for the reconcile crate
//!
//! Only structural violations are errors. Data-quality anomalies (cycles,
//! dangling references, unowned domains, kind mismatches) are logged and the
//! affected entry is dropped, so they never show up here.

use thiserror::Error;

/// Errors that abort a single reconciliation operation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Address has no local or domain part
    #[error("invalid email address: {0:?}")]
    InvalidEmail(String),

    /// Diff requested between two different accounts
    #[error("cannot diff {old} against {new}: addresses differ")]
    AddressMismatch { old: String, new: String },

    /// A user account is being created without an SSO key
    #[error("user account {0} must be created with an SSO key")]
    MissingSsoKey(String),

    /// A functional account is being created with an SSO key
    #[error("functional account {0} must not carry an SSO key")]
    UnexpectedSsoKey(String),
}

/// Result type for reconcile operations
pub type Result<T> = std::result::Result<T, Error>;
