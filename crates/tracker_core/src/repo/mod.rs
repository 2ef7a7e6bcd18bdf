//! Repository layer over SQLite.
//!
//! # Responsibility
//! - Keep SQL text and row decoding inside the persistence boundary.
//! - Surface `NotFound` separately from transport/decoding failures.

pub mod parcel_repo;
