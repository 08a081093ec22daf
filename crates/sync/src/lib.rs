//! Mercurios Sync - Cross-system reconciliation engine.
//!
//! Keeps customer profiles and gift-voucher balances consistent across
//! three independently-owned records of truth: the Shopify storefront,
//! the internal identity store, and the ProHandel POS/ERP backend. For
//! every inbound customer or voucher event - delivered by a webhook or
//! picked up by a timed poll - the engine decides whether it represents a
//! new entity, an update to a known entity, or a status transition, and
//! applies that decision idempotently.
//!
//! # Architecture
//!
//! - [`store`] - The identity store contract and its `PostgreSQL`
//!   implementation. All find-or-create paths go through atomic inserts
//!   with unique constraints; a constraint violation is the expected
//!   signal to fall back to an update, not an error.
//! - [`shopify`] - Shopify Admin REST gateway: customer pagination, gift
//!   card creation/disablement, webhook payload types.
//! - [`prohandel`] - ProHandel gateway: token auth exchange and the
//!   changed-voucher / changed-redemption endpoints.
//! - [`reconcile`] - The reconcilers themselves plus the identity
//!   resolver and the poll sync window.
//! - [`engine`] - The facade exposed to callers; converts every failure
//!   into a structured [`engine::SyncReport`] at the boundary.
//!
//! # Delivery semantics
//!
//! Upstream delivery is at-least-once: webhooks repeat and poll windows
//! overlap by design. Correctness is enforced at the data layer - unique
//! constraints, monotonic status transitions, and per-order application
//! keys - not by in-process coordination, so no coordination between
//! concurrent triggers is required.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod engine;
pub mod error;
pub mod prohandel;
pub mod reconcile;
pub mod shopify;
pub mod store;

pub use config::SyncConfig;
pub use engine::{SyncEngine, SyncReport};
pub use error::SyncError;
