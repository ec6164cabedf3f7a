//! End-to-end behavior of the switch request workflow through the public service facade and
//! HTTP router, starting from an inventory export.

mod common {
    use std::io::Cursor;
    use std::sync::Arc;

    use bed_switch::clock::{Clock, ManualClock};
    use bed_switch::workflows::inventory::InventoryImporter;
    use bed_switch::workflows::switching::{
        InMemoryAccommodations, InMemoryNotifier, InMemoryResources, InMemorySwitchRequests,
        InMemorySwitchService, RateLimiter, SwitchRequestService,
    };
    use chrono::{DateTime, TimeZone, Utc};

    pub(super) const INVENTORY: &str = "\
property_id,property_name,address,city,state,room_id,room_name,room_type,bed_id,bed_name,price,tenant_id
P1,Maple House,12 Orchard Lane,Des Moines,IA,R1,Garden Room,single,B1,Window Bed,480,tenant-7
P1,Maple House,12 Orchard Lane,Des Moines,IA,R2,Loft,shared,B2,Loft Bed A,450,
P1,Maple House,12 Orchard Lane,Des Moines,IA,R2,Loft,shared,B3,Loft Bed B,450,
P1,Maple House,12 Orchard Lane,Des Moines,IA,R3,Attic,single,B4,Attic Bed,420,tenant-8
";

    pub(super) fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 1, 9, 0, 0)
            .single()
            .expect("valid instant")
    }

    pub(super) struct World {
        pub(super) service: Arc<InMemorySwitchService>,
        pub(super) resources: Arc<InMemoryResources>,
        pub(super) accommodations: Arc<InMemoryAccommodations>,
        pub(super) notifier: Arc<InMemoryNotifier>,
        pub(super) clock: Arc<ManualClock>,
    }

    pub(super) fn world() -> World {
        let (resources, accommodations) = InventoryImporter::from_reader(Cursor::new(INVENTORY))
            .expect("inventory imports")
            .into_parts();
        let resources = Arc::new(resources);
        let accommodations = Arc::new(accommodations);
        let notifier = Arc::new(InMemoryNotifier::default());
        let clock = Arc::new(ManualClock::new(start()));
        let shared_clock: Arc<dyn Clock> = clock.clone();

        let service = Arc::new(SwitchRequestService::new(
            Arc::new(InMemorySwitchRequests::default()),
            resources.clone(),
            accommodations.clone(),
            notifier.clone(),
            RateLimiter::default(),
            shared_clock,
        ));

        World {
            service,
            resources,
            accommodations,
            notifier,
            clock,
        }
    }
}

use std::collections::BTreeSet;

use axum::http::{Request, StatusCode};
use bed_switch::workflows::switching::{
    switch_router, BedId, BedStatus, NoticeTemplate, Principal, ResourceRepository, RoomId,
    RoomStatus, SwitchError, SwitchRequestStatus, SwitchSubmission,
};
use chrono::Duration;
use common::*;
use tower::ServiceExt;

fn tenant() -> Principal {
    Principal::tenant("tenant-7")
}

fn landlord() -> Principal {
    Principal::landlord("landlord-1", ["P1"])
}

fn to(room: &str, bed: &str) -> SwitchSubmission {
    SwitchSubmission {
        requested_room_id: RoomId::new(room),
        requested_bed_id: BedId::new(bed),
    }
}

fn bed_status(world: &World, id: &str) -> BedStatus {
    world
        .resources
        .bed(&BedId::new(id))
        .expect("lookup")
        .expect("bed exists")
        .status
}

fn room_status(world: &World, id: &str) -> RoomStatus {
    world
        .resources
        .room(&RoomId::new(id))
        .expect("lookup")
        .expect("room exists")
        .status
}

fn assert_single_occupancy(world: &World) {
    let accommodations = world.accommodations.snapshot().expect("snapshot");
    let beds: BTreeSet<_> = accommodations.iter().map(|a| a.bed_id.clone()).collect();
    assert_eq!(beds.len(), accommodations.len(), "a bed is double-booked");
    for accommodation in &accommodations {
        assert_eq!(
            bed_status(world, accommodation.bed_id.as_str()),
            BedStatus::Occupied,
            "bed {} is referenced but available",
            accommodation.bed_id
        );
    }
}

#[test]
fn submit_then_approve_moves_the_tenant() {
    let world = world();

    let request = world
        .service
        .submit(&tenant(), to("R2", "B2"))
        .expect("submission succeeds");
    assert_eq!(request.status(), SwitchRequestStatus::Pending);

    world.clock.advance(Duration::hours(3));
    let approved = world
        .service
        .approve(&landlord(), &request.request_id)
        .expect("approval succeeds");

    assert_eq!(approved.status(), SwitchRequestStatus::Approved);
    assert_eq!(approved.resolved_at(), Some(start() + Duration::hours(3)));
    assert_eq!(bed_status(&world, "B1"), BedStatus::Available);
    assert_eq!(room_status(&world, "R1"), RoomStatus::Available);
    assert_eq!(bed_status(&world, "B2"), BedStatus::Occupied);
    assert_eq!(room_status(&world, "R2"), RoomStatus::Occupied);

    let current = world
        .service
        .current_assignment(&tenant())
        .expect("lookup")
        .expect("housed");
    assert_eq!(current.accommodation.bed_id, BedId::new("B2"));
    assert_eq!(current.room_name, "Loft");
    assert_single_occupancy(&world);

    let templates: Vec<_> = world
        .notifier
        .notices()
        .into_iter()
        .map(|notice| notice.template)
        .collect();
    assert_eq!(
        templates,
        vec![NoticeTemplate::SwitchRequested, NoticeTemplate::SwitchApproved]
    );
}

#[test]
fn rejection_records_reason_and_changes_nothing_else() {
    let world = world();
    let request = world
        .service
        .submit(&tenant(), to("R2", "B2"))
        .expect("submission succeeds");
    let before = world.resources.snapshot().expect("snapshot");

    let rejected = world
        .service
        .reject(&landlord(), &request.request_id, "room too small")
        .expect("rejection succeeds");

    assert_eq!(rejected.status(), SwitchRequestStatus::Rejected);
    assert_eq!(rejected.rejection_reason(), Some("room too small"));
    assert_eq!(world.resources.snapshot().expect("snapshot"), before);

    match world
        .service
        .reject(&landlord(), &request.request_id, "second thoughts")
    {
        Err(SwitchError::AlreadyResolved { status, .. }) => {
            assert_eq!(status, SwitchRequestStatus::Rejected)
        }
        other => panic!("expected already resolved, got {other:?}"),
    }
    let stored = world
        .service
        .get(&tenant(), &request.request_id)
        .expect("tenant reads own request");
    assert_eq!(stored, rejected);
}

#[test]
fn second_request_within_window_is_rate_limited() {
    let world = world();
    world
        .service
        .submit(&tenant(), to("R2", "B2"))
        .expect("first submission");

    world.clock.advance(Duration::days(10));
    match world.service.submit(&tenant(), to("R2", "B3")) {
        Err(SwitchError::RateLimited { eligible_after, .. }) => {
            assert_eq!(eligible_after, Some(start() + Duration::days(30)))
        }
        other => panic!("expected rate limited, got {other:?}"),
    }
}

#[test]
fn competing_requests_for_one_bed_resolve_once() {
    let world = world();
    let first = world
        .service
        .submit(&tenant(), to("R2", "B2"))
        .expect("tenant-7 submits");
    let second = world
        .service
        .submit(&Principal::tenant("tenant-8"), to("R2", "B2"))
        .expect("tenant-8 submits");

    let outcomes = std::thread::scope(|scope| {
        let a = scope.spawn(|| world.service.approve(&landlord(), &first.request_id));
        let b = scope.spawn(|| {
            world
                .service
                .approve(&Principal::landlord("landlord-2", ["P1"]), &second.request_id)
        });
        [
            a.join().expect("approval thread"),
            b.join().expect("approval thread"),
        ]
    });

    assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .any(|outcome| matches!(outcome, Err(SwitchError::TargetNoLongerAvailable { .. }))));
    assert_single_occupancy(&world);
}

#[tokio::test]
async fn http_round_trip_from_submission_to_approval() {
    let world = world();
    let app = switch_router(world.service.clone());

    let submit = Request::post("/api/v1/switch-requests")
        .header("content-type", "application/json")
        .header("x-principal-role", "tenant")
        .header("x-principal-id", "tenant-7")
        .body(axum::body::Body::from(
            r#"{"requested_room_id":"R2","requested_bed_id":"B3"}"#,
        ))
        .expect("request builds");
    let response = app.clone().oneshot(submit).await.expect("route executes");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    let created: serde_json::Value = serde_json::from_slice(&body).expect("json");
    let request_id = created["request_id"].as_str().expect("id").to_string();

    let approve = Request::post(format!("/api/v1/switch-requests/{request_id}/approve"))
        .header("x-principal-role", "manager")
        .header("x-principal-id", "pm-4")
        .header("x-principal-properties", "P1")
        .body(axum::body::Body::empty())
        .expect("request builds");
    let response = app.oneshot(approve).await.expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(bed_status(&world, "B3"), BedStatus::Occupied);
    assert_eq!(bed_status(&world, "B1"), BedStatus::Available);
    assert_single_occupancy(&world);
}
