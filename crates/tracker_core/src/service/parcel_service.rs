//! Parcel lifecycle service.
//!
//! # Responsibility
//! - Register parcels with a fresh `registered` status and timestamp.
//! - Advance status along registered -> sent -> delivered.
//! - Allow address changes and deletion only while a parcel is `registered`.
//!
//! # Invariants
//! - Every write goes through [`ParcelRepository`]; the service never touches
//!   SQL directly.
//! - Guarded writes carry the expected status in the same statement, so a
//!   concurrent writer on another connection cannot slip in between the
//!   check and the write.

use crate::model::parcel::{ClientId, Parcel, ParcelNumber, ParcelStatus};
use crate::repo::parcel_repo::{ParcelRepository, RepoError};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors from parcel service operations.
#[derive(Debug)]
pub enum ServiceError {
    /// No parcel has this number.
    NotFound(ParcelNumber),
    /// The operation is only allowed while the parcel is `registered`.
    StatusLocked {
        number: ParcelNumber,
        status: String,
    },
    /// Another writer changed the status after it was read.
    StatusChanged {
        number: ParcelNumber,
        expected: ParcelStatus,
        actual: String,
    },
    /// The stored status is not one of the known labels.
    UnknownStatus {
        number: ParcelNumber,
        status: String,
    },
    /// Repository-level failure.
    Repo(RepoError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(number) => write!(f, "parcel not found: {number}"),
            Self::StatusLocked { number, status } => write!(
                f,
                "parcel {number} has status `{status}`; only `registered` parcels can be changed"
            ),
            Self::StatusChanged {
                number,
                expected,
                actual,
            } => write!(
                f,
                "parcel {number} changed from `{expected}` to `{actual}` concurrently"
            ),
            Self::UnknownStatus { number, status } => {
                write!(f, "parcel {number} has unknown status `{status}`")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(number) => Self::NotFound(number),
            other => Self::Repo(other),
        }
    }
}

/// Lifecycle rules over any [`ParcelRepository`].
pub struct ParcelService<R: ParcelRepository> {
    repo: R,
}

impl<R: ParcelRepository> ParcelService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Stores a new `registered` parcel and returns it with its number.
    pub fn register(&self, client: ClientId, address: impl Into<String>) -> ServiceResult<Parcel> {
        let mut parcel = Parcel::registered(client, address);
        parcel.number = self.repo.add(&parcel)?;
        info!(
            "event=parcel_register module=service status=ok number={} client={client}",
            parcel.number
        );
        Ok(parcel)
    }

    /// Loads one parcel.
    pub fn parcel(&self, number: ParcelNumber) -> ServiceResult<Parcel> {
        Ok(self.repo.get(number)?)
    }

    /// Lists the parcels owned by `client`.
    pub fn client_parcels(&self, client: ClientId) -> ServiceResult<Vec<Parcel>> {
        Ok(self.repo.get_by_client(client)?)
    }

    /// Moves the parcel one step forward.
    ///
    /// Returns the new status, or `None` when the parcel is already
    /// delivered (nothing is written then).
    pub fn next_status(&self, number: ParcelNumber) -> ServiceResult<Option<ParcelStatus>> {
        let parcel = self.repo.get(number)?;
        let current = known_status(&parcel)?;

        let Some(next) = current.next() else {
            return Ok(None);
        };

        let changed = self
            .repo
            .set_status_if_status(number, current.as_str(), next.as_str())?;
        if changed == 0 {
            let actual = self.repo.get(number)?.status;
            return Err(ServiceError::StatusChanged {
                number,
                expected: current,
                actual,
            });
        }
        info!(
            "event=parcel_next_status module=service status=ok number={number} from={current} to={next}"
        );
        Ok(Some(next))
    }

    /// Replaces the address of a `registered` parcel.
    pub fn change_address(&self, number: ParcelNumber, address: &str) -> ServiceResult<()> {
        self.ensure_registered(number)?;
        let changed = self.repo.set_address_if_status(
            number,
            ParcelStatus::Registered.as_str(),
            address,
        )?;
        if changed == 0 {
            return Err(self.locked_error(number));
        }
        info!("event=parcel_change_address module=service status=ok number={number}");
        Ok(())
    }

    /// Deletes a `registered` parcel.
    pub fn delete(&self, number: ParcelNumber) -> ServiceResult<()> {
        self.ensure_registered(number)?;
        let changed = self
            .repo
            .delete_if_status(number, ParcelStatus::Registered.as_str())?;
        if changed == 0 {
            return Err(self.locked_error(number));
        }
        info!("event=parcel_delete module=service status=ok number={number}");
        Ok(())
    }

    fn ensure_registered(&self, number: ParcelNumber) -> ServiceResult<()> {
        let parcel = self.repo.get(number)?;
        if known_status(&parcel)? != ParcelStatus::Registered {
            return Err(ServiceError::StatusLocked {
                number,
                status: parcel.status,
            });
        }
        Ok(())
    }

    /// Error for a guarded write that matched nothing after the check passed.
    fn locked_error(&self, number: ParcelNumber) -> ServiceError {
        match self.repo.get(number) {
            Ok(parcel) => ServiceError::StatusLocked {
                number,
                status: parcel.status,
            },
            Err(err) => err.into(),
        }
    }
}

fn known_status(parcel: &Parcel) -> ServiceResult<ParcelStatus> {
    parcel
        .known_status()
        .ok_or_else(|| ServiceError::UnknownStatus {
            number: parcel.number,
            status: parcel.status.clone(),
        })
}
