//! Domain model for tracked parcels.
//!
//! # Invariants
//! - A parcel is identified by its store-assigned `ParcelNumber`.
//! - Deletion is permanent; there is no tombstone state.

pub mod parcel;
