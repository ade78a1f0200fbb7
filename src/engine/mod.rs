//! Plan display and application
//!
//! 1. Display - render the actions of a plan ([`differ`])
//! 2. Apply - run them against the target directory ([`executor`])

pub mod differ;
pub mod executor;

pub use differ::{display_json, display_plan};
pub use executor::{ApplySummary, apply, confirm_proceed, print_summary};
