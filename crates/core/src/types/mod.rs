//! Core types for the pharmacy client.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod contact;
pub mod id;
pub mod order;
pub mod price;
pub mod product;
pub mod role;
pub mod status;
pub mod user;

pub use cart::LineItem;
pub use contact::{ContactError, Email, Phone};
pub use id::*;
pub use order::{Order, OrderItem, OrderParty, ShippingDetails};
pub use price::Price;
pub use product::{Product, ProductDraft};
pub use role::{Role, RoleParseError};
pub use status::{OrderStatus, StatusParseError};
pub use user::{UserAccount, UserProfile};
