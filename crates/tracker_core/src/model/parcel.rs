//! Parcel record and lifecycle labels.
//!
//! # Responsibility
//! - Define the shipment record persisted in the `parcel` table.
//! - Name the known status labels and their forward order.
//!
//! # Invariants
//! - `number` is assigned by storage and never reused.
//! - `client` and `created_at` do not change after creation.
//! - `status` is stored as free text; unknown labels survive a round trip.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Store-assigned parcel identifier.
pub type ParcelNumber = i64;

/// Identifier of the client who owns a parcel.
pub type ClientId = i64;

/// Known lifecycle labels.
///
/// Storage keeps the label as text, so a parcel may carry a value outside
/// this set; [`ParcelStatus::parse`] returns `None` for those.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParcelStatus {
    /// Accepted, not yet handed to a carrier.
    Registered,
    /// In transit.
    Sent,
    /// Handed to the recipient. Terminal.
    Delivered,
}

impl ParcelStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Sent => "sent",
            Self::Delivered => "delivered",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "registered" => Some(Self::Registered),
            "sent" => Some(Self::Sent),
            "delivered" => Some(Self::Delivered),
            _ => None,
        }
    }

    /// Returns the following label, or `None` once delivered.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Registered => Some(Self::Sent),
            Self::Sent => Some(Self::Delivered),
            Self::Delivered => None,
        }
    }
}

impl Display for ParcelStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One shipment record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parcel {
    /// Zero until the store assigns a number on insert.
    pub number: ParcelNumber,
    pub client: ClientId,
    pub status: String,
    pub address: String,
    /// RFC3339 timestamp string.
    pub created_at: String,
}

impl Parcel {
    /// Builds an unsaved parcel. `number` stays `0` until [`add`] assigns one.
    ///
    /// [`add`]: crate::repo::parcel_repo::ParcelRepository::add
    pub fn new(
        client: ClientId,
        status: impl Into<String>,
        address: impl Into<String>,
        created_at: impl Into<String>,
    ) -> Self {
        Self {
            number: 0,
            client,
            status: status.into(),
            address: address.into(),
            created_at: created_at.into(),
        }
    }

    /// Builds an unsaved `registered` parcel stamped with the current UTC time.
    pub fn registered(client: ClientId, address: impl Into<String>) -> Self {
        Self::new(
            client,
            ParcelStatus::Registered.as_str(),
            address,
            now_rfc3339(),
        )
    }

    /// Parses `status` into a known label.
    pub fn known_status(&self) -> Option<ParcelStatus> {
        ParcelStatus::parse(&self.status)
    }
}

impl Display for Parcel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "parcel #{} client={} status={} address={} created_at={}",
            self.number, self.client, self.status, self.address, self.created_at
        )
    }
}

/// Current UTC time as an RFC3339 string with whole seconds.
pub fn now_rfc3339() -> String {
    let now = OffsetDateTime::now_utc();
    let now = now.replace_nanosecond(0).unwrap_or(now);
    now.format(&Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}
