//! Route handlers, one module per resource.

pub mod companies;
pub mod health;
pub mod users;
