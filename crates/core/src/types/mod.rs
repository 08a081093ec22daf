//! Core types for Mercurios.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod audit;
pub mod email;
pub mod id;
pub mod money;
pub mod status;

pub use audit::{AuditAction, AuditEntry, SYSTEM_ACTOR};
pub use email::{Email, EmailError};
pub use id::*;
pub use money::CurrencyCode;
pub use status::*;
