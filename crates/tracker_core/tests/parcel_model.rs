use tracker_core::{Parcel, ParcelStatus};

#[test]
fn parcel_new_leaves_number_unassigned() {
    let parcel = Parcel::new(1000, "registered", "test", "2024-01-01T00:00:00Z");

    assert_eq!(parcel.number, 0);
    assert_eq!(parcel.client, 1000);
    assert_eq!(parcel.known_status(), Some(ParcelStatus::Registered));
}

#[test]
fn parcel_serialization_uses_expected_wire_fields() {
    let mut parcel = Parcel::new(1000, "sent", "test", "2024-01-01T00:00:00Z");
    parcel.number = 12;

    let json = serde_json::to_value(&parcel).unwrap();
    assert_eq!(json["number"], 12);
    assert_eq!(json["client"], 1000);
    assert_eq!(json["status"], "sent");
    assert_eq!(json["address"], "test");
    assert_eq!(json["created_at"], "2024-01-01T00:00:00Z");

    let decoded: Parcel = serde_json::from_value(json).unwrap();
    assert_eq!(decoded, parcel);
}

#[test]
fn status_serializes_as_snake_case_label() {
    let json = serde_json::to_value(ParcelStatus::Delivered).unwrap();
    assert_eq!(json, "delivered");
    assert_eq!(ParcelStatus::Delivered.to_string(), "delivered");
}

#[test]
fn parcel_display_names_every_field() {
    let mut parcel = Parcel::new(3, "registered", "Main st. 1", "2024-01-01T00:00:00Z");
    parcel.number = 9;

    assert_eq!(
        parcel.to_string(),
        "parcel #9 client=3 status=registered address=Main st. 1 created_at=2024-01-01T00:00:00Z"
    );
}
