//! # difflog diff
//!
//! Structural diffing for JSON-like documents.
//!
//! This crate provides:
//! - The [`Delta`] sum type describing the difference between two documents
//! - The [`Differ`] computing deltas and applying them forward ([`Differ::patch`])
//!   or in reverse ([`Differ::unpatch`])
//! - The [`ElementIdentity`] strategy used to match array elements across
//!   the two sides of a diff, so reordering is expressed as moves
//!
//! Everything here is pure computation. Persistence and sequencing live in
//! `difflog_store` and `difflog_core`.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod delta;
mod differ;
mod error;
mod identity;
pub mod value;

pub use delta::{ArrayDelta, Delta};
pub use differ::Differ;
pub use error::{DiffError, DiffResult};
pub use identity::{ElementIdentity, IdFieldIdentity, IdentityKey};
pub use value::Document;
