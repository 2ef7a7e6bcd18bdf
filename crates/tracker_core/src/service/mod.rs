//! Use-case services above the repository layer.
//!
//! # Responsibility
//! - Enforce parcel lifecycle rules the store deliberately does not.
//! - Keep CLI callers decoupled from SQL details.

pub mod parcel_service;
