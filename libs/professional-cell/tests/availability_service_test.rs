// libs/professional-cell/tests/availability_service_test.rs
use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::NaiveTime;
use uuid::Uuid;

use professional_cell::models::*;
use professional_cell::services::*;
use professional_cell::AvailabilityError;
use shared_models::auth::{Actor, UserRole};

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn directory_user(role: UserRole) -> DirectoryUser {
    DirectoryUser {
        id: Uuid::new_v4(),
        email: format!("{}@clinic.test", role),
        first_name: "María".to_string(),
        last_name: "López".to_string(),
        role,
    }
}

async fn setup() -> (AvailabilityService, Arc<InMemoryUserDirectory>) {
    let store = Arc::new(InMemoryAvailabilityStore::new());
    let directory = Arc::new(InMemoryUserDirectory::new());
    (AvailabilityService::new(store, directory.clone()), directory)
}

#[tokio::test]
async fn overlapping_available_windows_are_rejected() {
    let (service, _) = setup().await;
    let professional_id = Uuid::new_v4();

    let first = service.add_window(professional_id, 0, t(9, 0), t(12, 0), true).await.unwrap();

    let result = service.add_window(professional_id, 0, t(11, 0), t(14, 0), true).await;
    assert_matches!(result, Err(AvailabilityError::Overlap { existing_id, .. }) if existing_id == first.id);

    let contained = service.add_window(professional_id, 0, t(10, 0), t(11, 0), true).await;
    assert_matches!(contained, Err(AvailabilityError::Overlap { .. }));
}

#[tokio::test]
async fn touching_windows_and_other_days_are_allowed() {
    let (service, _) = setup().await;
    let professional_id = Uuid::new_v4();

    service.add_window(professional_id, 0, t(9, 0), t(12, 0), true).await.unwrap();
    service.add_window(professional_id, 0, t(12, 0), t(14, 0), true).await.unwrap();
    service.add_window(professional_id, 1, t(9, 0), t(12, 0), true).await.unwrap();
    service.add_window(Uuid::new_v4(), 0, t(9, 0), t(12, 0), true).await.unwrap();

    let monday = service.list_windows(professional_id, Some(0)).await.unwrap();
    assert_eq!(monday.len(), 2);
    assert_eq!(monday[0].start_time, t(9, 0));
    assert_eq!(monday[1].start_time, t(12, 0));
}

#[tokio::test]
async fn inert_windows_do_not_conflict() {
    let (service, _) = setup().await;
    let professional_id = Uuid::new_v4();

    service.add_window(professional_id, 2, t(9, 0), t(12, 0), false).await.unwrap();
    service.add_window(professional_id, 2, t(10, 0), t(11, 0), true).await.unwrap();

    let available = service.available_windows(professional_id).await.unwrap();
    assert_eq!(available.len(), 1);
    assert_eq!(available[0].start_time, t(10, 0));
}

#[tokio::test]
async fn invalid_range_and_day_are_rejected() {
    let (service, _) = setup().await;
    let professional_id = Uuid::new_v4();

    let inverted = service.add_window(professional_id, 0, t(12, 0), t(9, 0), true).await;
    assert_matches!(inverted, Err(AvailabilityError::InvalidRange { .. }));

    let bad_day = service.add_window(professional_id, 7, t(9, 0), t(12, 0), true).await;
    assert_matches!(bad_day, Err(AvailabilityError::Validation { field: "day_of_week", .. }));
}

#[tokio::test]
async fn list_is_ordered_by_day_then_start() {
    let (service, _) = setup().await;
    let professional_id = Uuid::new_v4();

    service.add_window(professional_id, 4, t(8, 0), t(9, 0), true).await.unwrap();
    service.add_window(professional_id, 0, t(15, 0), t(18, 0), true).await.unwrap();
    service.add_window(professional_id, 0, t(8, 0), t(12, 0), true).await.unwrap();

    let windows = service.list_windows(professional_id, None).await.unwrap();
    let order: Vec<(i32, NaiveTime)> = windows.iter().map(|w| (w.day_of_week, w.start_time)).collect();
    assert_eq!(order, vec![(0, t(8, 0)), (0, t(15, 0)), (4, t(8, 0))]);
}

#[tokio::test]
async fn update_rechecks_overlap_excluding_itself() {
    let (service, _) = setup().await;
    let professional_id = Uuid::new_v4();

    let morning = service.add_window(professional_id, 0, t(9, 0), t(12, 0), true).await.unwrap();
    let afternoon = service.add_window(professional_id, 0, t(14, 0), t(17, 0), false).await.unwrap();

    // Shrinking a window overlaps only itself
    let shrunk = service
        .update_window(morning.id, UpdateAvailabilityRequest { end_time: Some(t(11, 0)), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(shrunk.end_time, t(11, 0));

    // Activating a window that now overlaps is rejected
    let stretched = service
        .update_window(
            afternoon.id,
            UpdateAvailabilityRequest {
                start_time: Some(t(10, 0)),
                is_available: Some(true),
                ..Default::default()
            },
        )
        .await;
    assert_matches!(stretched, Err(AvailabilityError::Overlap { .. }));

    let moved = service
        .update_window(
            afternoon.id,
            UpdateAvailabilityRequest { is_available: Some(true), ..Default::default() },
        )
        .await
        .unwrap();
    assert!(moved.is_available);
}

#[tokio::test]
async fn delete_removes_window_and_reports_missing() {
    let (service, _) = setup().await;
    let window = service.add_window(Uuid::new_v4(), 3, t(9, 0), t(10, 0), true).await.unwrap();

    service.delete_window(window.id).await.unwrap();
    assert!(service.get_window(window.id).await.unwrap().is_none());
    assert_matches!(service.delete_window(window.id).await, Err(AvailabilityError::NotFound(_)));
}

#[tokio::test]
async fn professionals_manage_only_their_own_windows() {
    let (service, _) = setup().await;
    let owner = Actor::new(Uuid::new_v4(), UserRole::Professional);
    let other = Actor::new(Uuid::new_v4(), UserRole::Professional);
    let patient = Actor::new(Uuid::new_v4(), UserRole::Patient);

    let request = CreateAvailabilityRequest {
        professional_id: None,
        day_of_week: 0,
        start_time: t(9, 0),
        end_time: t(12, 0),
        is_available: None,
    };

    let window = service.create_for_actor(&owner, request.clone()).await.unwrap();
    assert_eq!(window.professional_id, owner.id);
    assert!(window.is_available);

    let for_someone_else = CreateAvailabilityRequest { professional_id: Some(owner.id), ..request.clone() };
    assert_matches!(
        service.create_for_actor(&other, for_someone_else).await,
        Err(AvailabilityError::Forbidden(_))
    );
    assert_matches!(service.create_for_actor(&patient, request).await, Err(AvailabilityError::Forbidden(_)));

    assert_matches!(
        service.delete_for_actor(&other, window.id).await,
        Err(AvailabilityError::Forbidden(_))
    );
    assert_matches!(
        service.get_for_actor(&other, window.id).await,
        Err(AvailabilityError::NotFound(_))
    );

    service.delete_for_actor(&owner, window.id).await.unwrap();
}

#[tokio::test]
async fn admin_creation_resolves_professional_through_directory() {
    let (service, directory) = setup().await;
    let admin = Actor::new(Uuid::new_v4(), UserRole::Admin);
    let professional = directory_user(UserRole::Professional);
    let patient = directory_user(UserRole::Patient);
    directory.register(professional.clone()).await;
    directory.register(patient.clone()).await;

    let base = CreateAvailabilityRequest {
        professional_id: Some(professional.id),
        day_of_week: 1,
        start_time: t(9, 0),
        end_time: t(13, 0),
        is_available: Some(true),
    };

    let window = service.create_for_actor(&admin, base.clone()).await.unwrap();
    assert_eq!(window.professional_id, professional.id);

    let wrong_role = CreateAvailabilityRequest { professional_id: Some(patient.id), ..base.clone() };
    assert_matches!(
        service.create_for_actor(&admin, wrong_role).await,
        Err(AvailabilityError::InvalidRole { field: "professional_id", .. })
    );

    let missing = CreateAvailabilityRequest { professional_id: None, ..base };
    assert_matches!(
        service.create_for_actor(&admin, missing).await,
        Err(AvailabilityError::Validation { field: "professional_id", .. })
    );
}

#[tokio::test]
async fn patients_list_only_available_windows() {
    let (service, _) = setup().await;
    let professional_id = Uuid::new_v4();
    service.add_window(professional_id, 0, t(9, 0), t(12, 0), true).await.unwrap();
    service.add_window(professional_id, 1, t(9, 0), t(12, 0), false).await.unwrap();

    let patient = Actor::new(Uuid::new_v4(), UserRole::Patient);
    let params = AvailabilityQueryParams { professional_id: Some(professional_id), day: None };
    let visible = service.list_for_actor(&patient, params.clone()).await.unwrap();
    assert_eq!(visible.len(), 1);

    let owner = Actor::new(professional_id, UserRole::Professional);
    let own = service.list_for_actor(&owner, AvailabilityQueryParams::default()).await.unwrap();
    assert_eq!(own.len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_overlapping_adds_admit_exactly_one() {
    let (service, _) = setup().await;
    let service = Arc::new(service);
    let professional_id = Uuid::new_v4();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service.add_window(professional_id, 5, t(9, 0), t(12, 0), true).await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(err) => assert_matches!(err, AvailabilityError::Overlap { .. }),
        }
    }

    assert_eq!(successes, 1);
}
