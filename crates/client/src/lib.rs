//! Mery Salud Client - session, cart, and backend access for the pharmacy.
//!
//! # Architecture
//!
//! Components, leaves first:
//! - [`transport`] - HTTP calls with bearer tokens and normalized errors;
//!   a 401 ends the session
//! - [`session`] - token and profile, set and cleared together, persisted in
//!   an injected [`KeyValueStore`]
//! - [`gate`] - per-navigation session check and role authorization
//! - [`cart`] - local cart for visitors, backend cart for signed-in users
//! - [`api`] - typed endpoint groups (auth, products, orders, profile, reports)
//!
//! [`PharmacyClient`] wires them together. There are no globals: every
//! component is an explicit, cheaply cloneable value.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod client;
pub mod config;
pub mod error;
pub mod gate;
pub mod notice;
pub mod session;
pub mod storage;
pub mod transport;

pub use api::{
    AuthApi, DailyEarnings, OrdersApi, ProductCatalog, ProfileApi, Registration, ReportsApi,
};
pub use cart::{CartReconciler, ProductLookup};
pub use client::PharmacyClient;
pub use config::{ClientConfig, ConfigError};
pub use error::{ApiError, AuthError, CartError, FieldError, StorageError};
pub use gate::{Access, AuthGate, GateState, NavbarVariant, Navigation, Verdict};
pub use notice::{LogPrompt, ReauthPrompt, SessionExpiryNotice};
pub use session::{Session, SessionStore};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use transport::{ApiRequest, Payload, Transport};
