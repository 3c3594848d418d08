//! Mery Salud Core - Shared domain types.
//!
//! This crate provides the types exchanged between the pharmacy backend,
//! the client library, and the command-line front end:
//! - `client` - Session, cart, and backend API client
//! - `cli` - Command-line front end driving the client
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no storage,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, roles, statuses, prices, contact values, and the
//!   product/cart/order/user payloads

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
