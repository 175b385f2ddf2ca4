// libs/appointment-cell/tests/supabase_store_test.rs
use chrono::{TimeZone, Utc};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::models::*;
use appointment_cell::services::*;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

#[tokio::test]
async fn list_active_uses_overlap_filters() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(mock_server.uri()).to_app_config();
    let professional_id = Uuid::new_v4();
    let existing_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("professional_id", format!("eq.{}", professional_id)))
        .and(query_param("status", "in.(scheduled,confirmed)"))
        .and(query_param("start_time", "lt.2030-01-07T10:30:00Z"))
        .and(query_param("end_time", "gt.2030-01-07T10:00:00Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_response(
                existing_id,
                Uuid::new_v4(),
                professional_id,
                "2030-01-07T10:00:00Z",
                "2030-01-07T10:30:00Z",
                "confirmed",
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = SupabaseAppointmentStore::new(&config);
    let from = Utc.with_ymd_and_hms(2030, 1, 7, 10, 0, 0).unwrap();
    let to = Utc.with_ymd_and_hms(2030, 1, 7, 10, 30, 0).unwrap();

    let active = store.list_active(professional_id, Some(from), Some(to)).await.unwrap();

    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, existing_id);
    assert_eq!(active[0].status, AppointmentStatus::Confirmed);
    assert_eq!(active[0].duration_minutes(), 30);
}

#[tokio::test]
async fn insert_posts_row_and_decodes_representation() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(mock_server.uri()).to_app_config();

    let start = Utc.with_ymd_and_hms(2030, 1, 7, 9, 0, 0).unwrap();
    let appointment = Appointment::new(Uuid::new_v4(), Uuid::new_v4(), start, start + chrono::Duration::minutes(30));

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(header("Prefer", "return=representation"))
        .and(body_partial_json(json!({
            "id": appointment.id,
            "status": "scheduled",
            "payment_status": "pending"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::appointment_response(
                appointment.id,
                appointment.patient_id,
                appointment.professional_id,
                "2030-01-07T09:00:00Z",
                "2030-01-07T09:30:00Z",
                "scheduled",
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = SupabaseAppointmentStore::new(&config);
    let stored = store.insert(appointment.clone()).await.unwrap();

    assert_eq!(stored.id, appointment.id);
    assert_eq!(stored.start_time, start);
}

#[tokio::test]
async fn exclusion_violation_surfaces_as_storage_error() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(mock_server.uri()).to_app_config();

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(409).set_body_json(MockSupabaseResponses::error_response(
            "conflicting key value violates exclusion constraint",
            "23P01",
        )))
        .mount(&mock_server)
        .await;

    let store = SupabaseAppointmentStore::new(&config);
    let start = Utc.with_ymd_and_hms(2030, 1, 7, 9, 0, 0).unwrap();
    let appointment = Appointment::new(Uuid::new_v4(), Uuid::new_v4(), start, start + chrono::Duration::minutes(30));

    let err = store.insert(appointment).await.unwrap_err();
    assert!(err.to_string().contains("Constraint violation"));
}

#[test]
fn list_path_encodes_scope_ordering_and_limit() {
    let patient_id = Uuid::new_v4();
    let filter = AppointmentFilter {
        patient_id: Some(patient_id),
        starts_at_or_after: Some(Utc.with_ymd_and_hms(2030, 1, 7, 0, 0, 0).unwrap()),
        order: SortOrder::StartDescending,
        limit: Some(5),
        ..Default::default()
    };

    let path = SupabaseAppointmentStore::list_path(&filter);

    assert!(path.starts_with("/rest/v1/appointments?"));
    assert!(path.contains(&format!("patient_id=eq.{}", patient_id)));
    assert!(path.contains("start_time=gte.2030-01-07T00%3A00%3A00Z"));
    assert!(path.contains("order=start_time.desc"));
    assert!(path.ends_with("limit=5"));
    assert!(!path.contains("status="));
}

#[tokio::test]
async fn sub_second_bounds_keep_their_fraction() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(mock_server.uri()).to_app_config();
    let professional_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("start_time", "lt.2030-01-07T10:30:00.500Z"))
        .and(query_param("end_time", "gt.2030-01-07T10:00:00.250Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = SupabaseAppointmentStore::new(&config);
    let from = Utc.with_ymd_and_hms(2030, 1, 7, 10, 0, 0).unwrap() + chrono::Duration::milliseconds(250);
    let to = Utc.with_ymd_and_hms(2030, 1, 7, 10, 30, 0).unwrap() + chrono::Duration::milliseconds(500);

    let active = store.list_active(professional_id, Some(from), Some(to)).await.unwrap();
    assert!(active.is_empty());

    let filter = AppointmentFilter {
        starts_before: Some(to),
        ..Default::default()
    };
    assert!(SupabaseAppointmentStore::list_path(&filter).contains("start_time=lt.2030-01-07T10%3A30%3A00.500Z"));
}

#[tokio::test]
async fn status_write_is_conditional_on_the_status_read() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(mock_server.uri()).to_app_config();

    let start = Utc.with_ymd_and_hms(2030, 1, 7, 9, 0, 0).unwrap();
    let current = Appointment::new(Uuid::new_v4(), Uuid::new_v4(), start, start + chrono::Duration::minutes(30));

    // Another writer already moved the row on, so the filtered PATCH matches nothing
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", current.id)))
        .and(query_param("status", "eq.scheduled"))
        .and(header("Prefer", "return=representation"))
        .and(body_partial_json(json!({ "status": "cancelled" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = SupabaseAppointmentStore::new(&config);
    let result = store.update_status(&current, AppointmentStatus::Cancelled).await;

    assert!(matches!(
        result,
        Err(appointment_cell::AppointmentError::ConcurrentUpdate { appointment_id }) if appointment_id == current.id
    ));
}
