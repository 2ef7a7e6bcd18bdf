//! Parcel tracking core.
//!
//! A thin SQLite-backed store for shipment records plus a lifecycle service
//! on top of it.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status, LogTarget};
pub use model::parcel::{ClientId, Parcel, ParcelNumber, ParcelStatus};
pub use repo::parcel_repo::{ParcelRepository, ParcelStore, RepoError, RepoResult};
pub use service::parcel_service::{ParcelService, ServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
