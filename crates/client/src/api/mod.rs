//! Typed wrappers for the backend's REST endpoints.
//!
//! Each group holds a clone of the shared [`Transport`](crate::Transport), so
//! tokens, error normalization, and the 401 handling apply uniformly.

pub mod auth;
pub mod orders;
pub mod products;
pub mod profile;
pub mod reports;

pub use auth::{AuthApi, Registration};
pub use orders::OrdersApi;
pub use products::ProductCatalog;
pub use profile::ProfileApi;
pub use reports::{DailyEarnings, ReportsApi};
