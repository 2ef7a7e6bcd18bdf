//! Parcel store contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide single-statement CRUD over the `parcel` table.
//! - Map rows to [`Parcel`] records.
//!
//! # Invariants
//! - Every operation is exactly one parameterized statement.
//! - Statements and row cursors are dropped before an operation returns.
//! - Updates and deletes that match no row succeed without error.
//! - `*_if_status` writes compare and write in the same statement and report
//!   the number of rows they changed.
//! - Values pass through unvalidated; lifecycle rules live in the service.

use crate::db::DbError;
use crate::model::parcel::{ClientId, Parcel, ParcelNumber};
use log::debug;
use rusqlite::{named_params, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const PARCEL_TABLE: &str = "parcel";
const PARCEL_COLUMNS: [&str; 5] = ["number", "client", "status", "address", "created_at"];

const PARCEL_SELECT_SQL: &str = "SELECT
    number,
    client,
    status,
    address,
    created_at
FROM parcel";

pub type RepoResult<T> = Result<T, RepoError>;

/// Error for parcel persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Connection, statement or row-decoding failure.
    Db(DbError),
    /// A lookup by number matched no row.
    NotFound(ParcelNumber),
    /// The connection has no usable parcel table.
    MissingRequiredTable(&'static str),
    /// The parcel table lacks a column the store reads or writes.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl RepoError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(number) => write!(f, "parcel not found: {number}"),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Data-access contract for parcels.
pub trait ParcelRepository {
    /// Inserts `parcel` (ignoring its `number`) and returns the assigned number.
    fn add(&self, parcel: &Parcel) -> RepoResult<ParcelNumber>;
    /// Loads one parcel; `NotFound` when no row has this number.
    fn get(&self, number: ParcelNumber) -> RepoResult<Parcel>;
    /// Loads every parcel owned by `client`. Empty when none match.
    fn get_by_client(&self, client: ClientId) -> RepoResult<Vec<Parcel>>;
    fn set_status(&self, number: ParcelNumber, status: &str) -> RepoResult<()>;
    fn set_address(&self, number: ParcelNumber, address: &str) -> RepoResult<()>;
    fn delete(&self, number: ParcelNumber) -> RepoResult<()>;
    /// Sets `status` only while the stored status equals `expected`.
    fn set_status_if_status(
        &self,
        number: ParcelNumber,
        expected: &str,
        status: &str,
    ) -> RepoResult<usize>;
    /// Sets `address` only while the stored status equals `expected`.
    fn set_address_if_status(
        &self,
        number: ParcelNumber,
        expected: &str,
        address: &str,
    ) -> RepoResult<usize>;
    /// Deletes the parcel only while the stored status equals `expected`.
    fn delete_if_status(&self, number: ParcelNumber, expected: &str) -> RepoResult<usize>;
}

impl<R: ParcelRepository + ?Sized> ParcelRepository for &R {
    fn add(&self, parcel: &Parcel) -> RepoResult<ParcelNumber> {
        (**self).add(parcel)
    }

    fn get(&self, number: ParcelNumber) -> RepoResult<Parcel> {
        (**self).get(number)
    }

    fn get_by_client(&self, client: ClientId) -> RepoResult<Vec<Parcel>> {
        (**self).get_by_client(client)
    }

    fn set_status(&self, number: ParcelNumber, status: &str) -> RepoResult<()> {
        (**self).set_status(number, status)
    }

    fn set_address(&self, number: ParcelNumber, address: &str) -> RepoResult<()> {
        (**self).set_address(number, address)
    }

    fn delete(&self, number: ParcelNumber) -> RepoResult<()> {
        (**self).delete(number)
    }

    fn set_status_if_status(
        &self,
        number: ParcelNumber,
        expected: &str,
        status: &str,
    ) -> RepoResult<usize> {
        (**self).set_status_if_status(number, expected, status)
    }

    fn set_address_if_status(
        &self,
        number: ParcelNumber,
        expected: &str,
        address: &str,
    ) -> RepoResult<usize> {
        (**self).set_address_if_status(number, expected, address)
    }

    fn delete_if_status(&self, number: ParcelNumber, expected: &str) -> RepoResult<usize> {
        (**self).delete_if_status(number, expected)
    }
}

/// SQLite-backed parcel store over a borrowed connection.
pub struct ParcelStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> ParcelStore<'conn> {
    /// Wraps `conn` without inspecting its schema.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Wraps `conn` after checking the parcel table and its columns exist.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_parcel_table(conn)?;
        Ok(Self { conn })
    }
}

impl ParcelRepository for ParcelStore<'_> {
    fn add(&self, parcel: &Parcel) -> RepoResult<ParcelNumber> {
        self.conn.execute(
            "INSERT INTO parcel (client, status, address, created_at)
             VALUES (:client, :status, :address, :created_at);",
            named_params! {
                ":client": parcel.client,
                ":status": parcel.status.as_str(),
                ":address": parcel.address.as_str(),
                ":created_at": parcel.created_at.as_str(),
            },
        )?;

        let number = self.conn.last_insert_rowid();
        debug!(
            "event=parcel_add module=repo status=ok number={number} client={}",
            parcel.client
        );
        Ok(number)
    }

    fn get(&self, number: ParcelNumber) -> RepoResult<Parcel> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PARCEL_SELECT_SQL} WHERE number = :number;"))?;
        let mut rows = stmt.query(named_params! { ":number": number })?;

        match rows.next()? {
            Some(row) => parse_parcel_row(row),
            None => Err(RepoError::NotFound(number)),
        }
    }

    fn get_by_client(&self, client: ClientId) -> RepoResult<Vec<Parcel>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PARCEL_SELECT_SQL} WHERE client = :client ORDER BY number ASC;"
        ))?;
        let mut rows = stmt.query(named_params! { ":client": client })?;

        let mut parcels = Vec::new();
        while let Some(row) = rows.next()? {
            parcels.push(parse_parcel_row(row)?);
        }

        Ok(parcels)
    }

    fn set_status(&self, number: ParcelNumber, status: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE parcel SET status = :status WHERE number = :number;",
            named_params! { ":status": status, ":number": number },
        )?;
        log_unmatched("parcel_set_status", number, changed);
        Ok(())
    }

    fn set_address(&self, number: ParcelNumber, address: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE parcel SET address = :address WHERE number = :number;",
            named_params! { ":address": address, ":number": number },
        )?;
        log_unmatched("parcel_set_address", number, changed);
        Ok(())
    }

    fn delete(&self, number: ParcelNumber) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM parcel WHERE number = :number;",
            named_params! { ":number": number },
        )?;
        log_unmatched("parcel_delete", number, changed);
        Ok(())
    }

    fn set_status_if_status(
        &self,
        number: ParcelNumber,
        expected: &str,
        status: &str,
    ) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "UPDATE parcel SET status = :status
             WHERE number = :number AND status = :expected;",
            named_params! { ":status": status, ":number": number, ":expected": expected },
        )?;
        log_unmatched("parcel_set_status_if_status", number, changed);
        Ok(changed)
    }

    fn set_address_if_status(
        &self,
        number: ParcelNumber,
        expected: &str,
        address: &str,
    ) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "UPDATE parcel SET address = :address
             WHERE number = :number AND status = :expected;",
            named_params! { ":address": address, ":number": number, ":expected": expected },
        )?;
        log_unmatched("parcel_set_address_if_status", number, changed);
        Ok(changed)
    }

    fn delete_if_status(&self, number: ParcelNumber, expected: &str) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "DELETE FROM parcel WHERE number = :number AND status = :expected;",
            named_params! { ":number": number, ":expected": expected },
        )?;
        log_unmatched("parcel_delete_if_status", number, changed);
        Ok(changed)
    }
}

fn parse_parcel_row(row: &Row<'_>) -> RepoResult<Parcel> {
    Ok(Parcel {
        number: row.get("number")?,
        client: row.get("client")?,
        status: row.get("status")?,
        address: row.get("address")?,
        created_at: row.get("created_at")?,
    })
}

fn log_unmatched(event: &str, number: ParcelNumber, changed: usize) {
    if changed == 0 {
        debug!("event={event} module=repo status=ok number={number} rows_affected=0");
    }
}

fn ensure_parcel_table(conn: &Connection) -> RepoResult<()> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1);")?;
    let columns = stmt
        .query_map([PARCEL_TABLE], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    if columns.is_empty() {
        return Err(RepoError::MissingRequiredTable(PARCEL_TABLE));
    }

    for column in PARCEL_COLUMNS {
        if !columns.iter().any(|name| name == column) {
            return Err(RepoError::MissingRequiredColumn {
                table: PARCEL_TABLE,
                column,
            });
        }
    }

    Ok(())
}
