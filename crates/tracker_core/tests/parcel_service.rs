use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rusqlite::Connection;
use tracker_core::db::{open_db, open_db_in_memory};
use tracker_core::{
    ClientId, Parcel, ParcelNumber, ParcelRepository, ParcelService, ParcelStatus, ParcelStore,
    RepoResult, ServiceError,
};

/// Repository whose reads are followed by a status write from another
/// connection to the same file, as if a second process raced the caller.
struct RacingWriter<'conn> {
    inner: ParcelStore<'conn>,
    other: &'conn Connection,
    status_after_read: &'static str,
}

impl ParcelRepository for RacingWriter<'_> {
    fn add(&self, parcel: &Parcel) -> RepoResult<ParcelNumber> {
        self.inner.add(parcel)
    }

    fn get(&self, number: ParcelNumber) -> RepoResult<Parcel> {
        let parcel = self.inner.get(number)?;
        ParcelStore::new(self.other).set_status(number, self.status_after_read)?;
        Ok(parcel)
    }

    fn get_by_client(&self, client: ClientId) -> RepoResult<Vec<Parcel>> {
        self.inner.get_by_client(client)
    }

    fn set_status(&self, number: ParcelNumber, status: &str) -> RepoResult<()> {
        self.inner.set_status(number, status)
    }

    fn set_address(&self, number: ParcelNumber, address: &str) -> RepoResult<()> {
        self.inner.set_address(number, address)
    }

    fn delete(&self, number: ParcelNumber) -> RepoResult<()> {
        self.inner.delete(number)
    }

    fn set_status_if_status(
        &self,
        number: ParcelNumber,
        expected: &str,
        status: &str,
    ) -> RepoResult<usize> {
        self.inner.set_status_if_status(number, expected, status)
    }

    fn set_address_if_status(
        &self,
        number: ParcelNumber,
        expected: &str,
        address: &str,
    ) -> RepoResult<usize> {
        self.inner.set_address_if_status(number, expected, address)
    }

    fn delete_if_status(&self, number: ParcelNumber, expected: &str) -> RepoResult<usize> {
        self.inner.delete_if_status(number, expected)
    }
}

fn registered_parcel_in(conn: &Connection) -> ParcelNumber {
    ParcelStore::try_new(conn)
        .unwrap()
        .add(&Parcel::registered(1000, "old"))
        .unwrap()
}

#[test]
fn register_stores_registered_parcel() {
    let conn = open_db_in_memory().unwrap();
    let store = ParcelStore::try_new(&conn).unwrap();
    let service = ParcelService::new(&store);

    let parcel = service.register(1000, "Main st. 1").unwrap();

    assert!(parcel.number > 0);
    assert_eq!(parcel.known_status(), Some(ParcelStatus::Registered));
    assert_eq!(store.get(parcel.number).unwrap(), parcel);
}

#[test]
fn next_status_walks_the_lifecycle_and_stops_at_delivered() {
    let conn = open_db_in_memory().unwrap();
    let service = ParcelService::new(ParcelStore::try_new(&conn).unwrap());
    let number = service.register(1000, "Main st. 1").unwrap().number;

    assert_eq!(service.next_status(number).unwrap(), Some(ParcelStatus::Sent));
    assert_eq!(
        service.next_status(number).unwrap(),
        Some(ParcelStatus::Delivered)
    );
    assert_eq!(service.next_status(number).unwrap(), None);
    assert_eq!(service.parcel(number).unwrap().status, "delivered");
}

#[test]
fn next_status_of_missing_parcel_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = ParcelService::new(ParcelStore::try_new(&conn).unwrap());

    let err = service.next_status(7).unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(7)));
}

#[test]
fn next_status_rejects_unknown_stored_status() {
    let conn = open_db_in_memory().unwrap();
    let store = ParcelStore::try_new(&conn).unwrap();
    let number = store
        .add(&Parcel::new(5, "lost", "Main st. 1", "2024-01-01T00:00:00Z"))
        .unwrap();
    let service = ParcelService::new(&store);

    let err = service.next_status(number).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::UnknownStatus { number: n, ref status } if n == number && status == "lost"
    ));
    assert_eq!(store.get(number).unwrap().status, "lost");
}

#[test]
fn change_address_only_while_registered() {
    let conn = open_db_in_memory().unwrap();
    let service = ParcelService::new(ParcelStore::try_new(&conn).unwrap());
    let number = service.register(1000, "old").unwrap().number;

    service.change_address(number, "new").unwrap();
    assert_eq!(service.parcel(number).unwrap().address, "new");

    service.next_status(number).unwrap();
    let err = service.change_address(number, "newer").unwrap_err();
    assert!(matches!(
        err,
        ServiceError::StatusLocked { number: n, ref status } if n == number && status == "sent"
    ));
    assert_eq!(service.parcel(number).unwrap().address, "new");
}

#[test]
fn delete_only_while_registered() {
    let conn = open_db_in_memory().unwrap();
    let service = ParcelService::new(ParcelStore::try_new(&conn).unwrap());
    let kept = service.register(1000, "kept").unwrap().number;
    let removed = service.register(1000, "removed").unwrap().number;

    service.next_status(kept).unwrap();
    assert!(matches!(
        service.delete(kept).unwrap_err(),
        ServiceError::StatusLocked { .. }
    ));
    service.delete(removed).unwrap();

    assert!(service.parcel(kept).is_ok());
    assert!(matches!(
        service.parcel(removed).unwrap_err(),
        ServiceError::NotFound(n) if n == removed
    ));
}

#[test]
fn client_parcels_lists_registered_parcels() {
    let conn = open_db_in_memory().unwrap();
    let service = ParcelService::new(ParcelStore::try_new(&conn).unwrap());
    let mut rng = StdRng::seed_from_u64(20_240_101);
    let client: ClientId = rng.gen_range(1..10_000_000);

    let mut expected: Vec<_> = (0..3)
        .map(|i| service.register(client, format!("address {i}")).unwrap())
        .collect();
    service.register(client + 1, "someone else").unwrap();

    let mut listed = service.client_parcels(client).unwrap();
    listed.sort_by_key(|parcel| parcel.number);
    expected.sort_by_key(|parcel| parcel.number);
    assert_eq!(listed, expected);
}

#[test]
fn change_address_rejects_parcel_sent_by_another_connection() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tracker.db");
    let conn = open_db(&path).unwrap();
    let other = open_db(&path).unwrap();
    let number = registered_parcel_in(&conn);

    let service = ParcelService::new(RacingWriter {
        inner: ParcelStore::try_new(&conn).unwrap(),
        other: &other,
        status_after_read: "sent",
    });
    let err = service.change_address(number, "new").unwrap_err();
    assert!(matches!(
        err,
        ServiceError::StatusLocked { number: n, ref status } if n == number && status == "sent"
    ));

    let stored = ParcelStore::try_new(&other).unwrap().get(number).unwrap();
    assert_eq!(stored.status, "sent");
    assert_eq!(stored.address, "old");
}

#[test]
fn delete_keeps_parcel_sent_by_another_connection() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tracker.db");
    let conn = open_db(&path).unwrap();
    let other = open_db(&path).unwrap();
    let number = registered_parcel_in(&conn);

    let service = ParcelService::new(RacingWriter {
        inner: ParcelStore::try_new(&conn).unwrap(),
        other: &other,
        status_after_read: "sent",
    });
    let err = service.delete(number).unwrap_err();
    assert!(matches!(err, ServiceError::StatusLocked { .. }));

    let stored = ParcelStore::try_new(&other).unwrap().get(number).unwrap();
    assert_eq!(stored.status, "sent");
}

#[test]
fn next_status_does_not_overwrite_concurrent_advance() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tracker.db");
    let conn = open_db(&path).unwrap();
    let other = open_db(&path).unwrap();
    let number = registered_parcel_in(&conn);

    let service = ParcelService::new(RacingWriter {
        inner: ParcelStore::try_new(&conn).unwrap(),
        other: &other,
        status_after_read: "delivered",
    });
    let err = service.next_status(number).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::StatusChanged {
            number: n,
            expected: ParcelStatus::Registered,
            ref actual,
        } if n == number && actual == "delivered"
    ));

    let stored = ParcelStore::try_new(&other).unwrap().get(number).unwrap();
    assert_eq!(stored.status, "delivered");
}

#[test]
fn guarded_writes_report_changed_rows() {
    let conn = open_db_in_memory().unwrap();
    let store = ParcelStore::try_new(&conn).unwrap();
    let number = registered_parcel_in(&conn);

    assert_eq!(store.set_address_if_status(number, "sent", "x").unwrap(), 0);
    assert_eq!(store.delete_if_status(number, "sent").unwrap(), 0);
    assert_eq!(
        store
            .set_status_if_status(number, "registered", "sent")
            .unwrap(),
        1
    );
    assert_eq!(store.set_address_if_status(number, "sent", "x").unwrap(), 1);
    assert_eq!(store.get(number).unwrap().address, "x");
    assert_eq!(store.delete_if_status(number, "sent").unwrap(), 1);
    assert!(store.get(number).unwrap_err().is_not_found());
    assert_eq!(store.delete_if_status(number, "sent").unwrap(), 0);
}
