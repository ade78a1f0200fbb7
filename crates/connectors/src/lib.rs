//! # connectors
//!
//! Blocking clients for the two directories that get reconciled:
//! - the mailbox admin API, read as the source of truth
//! - a SCIM 2.0 API, read and written as the target
//!
//! ## Example
//!
//! ```no_run
//! use connectors::{ExchangeClient, ScimClient, SourceDirectory, TargetDirectory};
//!
//! let token = connectors::auth::resolve_access_token(None)?;
//! let source = ExchangeClient::new(connectors::DEFAULT_BASE_URL, token)?;
//! let target = ScimClient::new("https://app.example.test", "api-key")?;
//!
//! let mailboxes = source.fetch_mailboxes()?;
//! let users = target.list_users()?;
//! println!("{} mailboxes, {} users", mailboxes.len(), users.len());
//! # Ok::<(), connectors::Error>(())
//! ```
//!
//! Use [`MockSource`] and [`MockTarget`] in tests.

#![warn(clippy::all)]

pub mod auth;
pub mod backend;
pub mod error;
pub mod types;

pub use backend::exchange::{DEFAULT_BASE_URL, DEFAULT_BATCH_SIZE, ExchangeClient};
pub use backend::scim::ScimClient;
pub use backend::{MockSource, MockTarget, SourceDirectory, TargetDirectory};
pub use error::{Error, ErrorCategory, Result};
pub use types::{GroupRequest, PatchRequest, UserRequest};
