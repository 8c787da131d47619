//! `storefront-core` — shared building blocks.
//!
//! This crate contains **pure** primitives (no IO, no transport concerns).

pub mod error;
pub mod id;

pub use error::DomainError;
pub use id::UserId;
