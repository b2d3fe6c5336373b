//! Domain models: validated newtypes, read schemas and pagination types.

pub mod analytics;
pub mod company;
pub mod pagination;
pub mod user;
pub mod validation;

pub use analytics::{AnalyticsRead, Deviation, RatioRead};
pub use company::{Brn, CompanyCreate, CompanyName, CompanyRead, CompanySearch, CountryCode};
pub use pagination::{
    CursorPage, CursorParams, CursorToken, OffsetPage, OffsetParams, OrderBy,
};
pub use user::{EmailAddress, Nickname, UserRead};
pub use validation::ValidationError;
