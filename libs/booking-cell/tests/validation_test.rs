use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use booking_cell::{BookingConfig, BookingEngine, BookingField, BookingMode};
use shared_backend::BackendClient;
use shared_config::AppConfig;

fn offline_engine(mode: BookingMode) -> BookingEngine {
    // validate() never touches the network, so a dead base URL is fine
    let config = AppConfig {
        clinic_base_url: "http://127.0.0.1:9".to_string(),
        csrf_header_name: "X-CSRF-TOKEN".to_string(),
        csrf_token: "test-csrf-token".to_string(),
    };
    let booking_config = BookingConfig {
        min_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        ..BookingConfig::default()
    };
    BookingEngine::new(Arc::new(BackendClient::new(&config)), booking_config, mode)
}

#[test]
fn empty_booking_state_reports_every_field_in_order() {
    let engine = offline_engine(BookingMode::New);

    let fields: Vec<BookingField> = engine.validate().iter().map(|f| f.field).collect();
    assert_eq!(
        fields,
        vec![
            BookingField::Doctor,
            BookingField::Date,
            BookingField::Time,
            BookingField::Location,
            BookingField::Reason,
        ]
    );
}

#[test]
fn reschedule_mode_skips_booking_only_fields() {
    let engine = offline_engine(BookingMode::Reschedule {
        appointment_id: Uuid::new_v4(),
    });

    let fields: Vec<BookingField> = engine.validate().iter().map(|f| f.field).collect();
    assert_eq!(
        fields,
        vec![BookingField::Doctor, BookingField::Date, BookingField::Time]
    );
}

#[test]
fn whitespace_only_text_fields_still_fail() {
    let engine = offline_engine(BookingMode::New);
    engine.set_location("   ");
    engine.set_reason("\t");

    let failures = engine.validate();
    assert!(failures.iter().any(|f| f.field == BookingField::Location));
    assert!(failures.iter().any(|f| f.field == BookingField::Reason));
}

#[test]
fn validate_is_pure() {
    let engine = offline_engine(BookingMode::New);
    engine.set_reason("checkup");

    let first = engine.validate();
    let second = engine.validate();
    assert_eq!(first, second);
}
