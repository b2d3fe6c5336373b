//! Repository implementations for database access.
//!
//! Each repository follows these patterns:
//! - every query runs through the retry wrapper
//! - conflicts are handled via ON CONFLICT (no check-then-insert)
//! - reads load the full relationship graph before mapping to read schemas

pub mod companies;
pub mod users;

pub use companies::{CompanyCursor, CompanyRepo};
pub use users::{UserRepo, UserRow};
