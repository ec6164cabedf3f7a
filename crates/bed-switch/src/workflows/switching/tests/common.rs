use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use axum::http::{HeaderValue, Request};
use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::clock::{Clock, ManualClock};
use crate::workflows::switching::domain::{
    Accommodation, Bed, BedId, BedStatus, Property, PropertyId, Room, RoomId, RoomStatus,
    SwitchRequest, SwitchRequestId, SwitchSubmission, TenantId,
};
use crate::workflows::switching::memory::{
    InMemoryAccommodations, InMemoryNotifier, InMemoryResources, InMemorySwitchRequests,
};
use crate::workflows::switching::notification::{NotifyError, SwitchNotice, SwitchNotifier};
use crate::workflows::switching::principal::{
    Principal, ID_HEADER, PROPERTIES_HEADER, ROLE_HEADER,
};
use crate::workflows::switching::rate_limit::RateLimiter;
use crate::workflows::switching::repository::{
    AccommodationRepository, RepositoryError, ResourceRepository, SwitchRequestRepository,
};
use crate::workflows::switching::service::SwitchRequestService;

pub(super) const TENANT: &str = "tenant-7";
pub(super) const NEIGHBOUR: &str = "tenant-8";
pub(super) const LANDLORD: &str = "landlord-1";

pub(super) fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 1, 9, 0, 0)
        .single()
        .expect("valid instant")
}

pub(super) fn tenant() -> Principal {
    Principal::tenant(TENANT)
}

pub(super) fn neighbour() -> Principal {
    Principal::tenant(NEIGHBOUR)
}

pub(super) fn landlord() -> Principal {
    Principal::landlord(LANDLORD, ["P1"])
}

pub(super) fn outside_landlord() -> Principal {
    Principal::landlord("landlord-2", ["P2"])
}

pub(super) fn to_b2() -> SwitchSubmission {
    SwitchSubmission {
        requested_room_id: RoomId::new("R2"),
        requested_bed_id: BedId::new("B2"),
    }
}

pub(super) fn to_b3() -> SwitchSubmission {
    SwitchSubmission {
        requested_room_id: RoomId::new("R2"),
        requested_bed_id: BedId::new("B3"),
    }
}

fn property(id: &str, name: &str) -> Property {
    Property {
        id: PropertyId::new(id),
        name: name.to_string(),
        address: Some("12 Orchard Lane".to_string()),
        city: Some("Des Moines".to_string()),
        state: Some("IA".to_string()),
    }
}

fn room(id: &str, property_id: &str, status: RoomStatus) -> Room {
    Room {
        id: RoomId::new(id),
        property_id: PropertyId::new(property_id),
        name: format!("Room {id}"),
        room_type: Some("shared".to_string()),
        status,
        annotation: None,
    }
}

pub(super) fn bed(id: &str, room_id: &str, status: BedStatus) -> Bed {
    Bed {
        id: BedId::new(id),
        room_id: RoomId::new(room_id),
        name: format!("Bed {id}"),
        status,
        price: Some(450),
        annotation: None,
    }
}

pub(super) fn accommodation(tenant: &str, room_id: &str, bed_id: &str) -> Accommodation {
    Accommodation {
        tenant_id: TenantId::new(tenant),
        property_id: PropertyId::new("P1"),
        room_id: RoomId::new(room_id),
        bed_id: BedId::new(bed_id),
    }
}

/// P1 holds R1 (B1 taken by tenant-7), R2 (B2 and B3 free) and R3 (B4 taken by tenant-8).
/// P2 holds R9 with the free bed B9.
pub(super) fn seeded_resources() -> InMemoryResources {
    let resources = InMemoryResources::default();
    resources
        .insert_property(property("P1", "Maple House"))
        .expect("P1");
    resources
        .insert_property(property("P2", "Cedar Court"))
        .expect("P2");

    for (id, property_id, status) in [
        ("R1", "P1", RoomStatus::Occupied),
        ("R2", "P1", RoomStatus::Available),
        ("R3", "P1", RoomStatus::Occupied),
        ("R9", "P2", RoomStatus::Available),
    ] {
        resources
            .insert_room(room(id, property_id, status))
            .expect("room inserted");
    }

    for (id, room_id, status) in [
        ("B1", "R1", BedStatus::Occupied),
        ("B2", "R2", BedStatus::Available),
        ("B3", "R2", BedStatus::Available),
        ("B4", "R3", BedStatus::Occupied),
        ("B9", "R9", BedStatus::Available),
    ] {
        resources
            .insert_bed(bed(id, room_id, status))
            .expect("bed inserted");
    }

    resources
}

pub(super) fn seeded_accommodations() -> InMemoryAccommodations {
    let accommodations = InMemoryAccommodations::default();
    accommodations
        .create(accommodation(TENANT, "R1", "B1"))
        .expect("tenant housed");
    accommodations
        .create(accommodation(NEIGHBOUR, "R3", "B4"))
        .expect("neighbour housed");
    accommodations
}

pub(super) type MemoryService = SwitchRequestService<
    InMemorySwitchRequests,
    InMemoryResources,
    InMemoryAccommodations,
    InMemoryNotifier,
>;

pub(super) struct Fixture {
    pub(super) service: Arc<MemoryService>,
    pub(super) resources: Arc<InMemoryResources>,
    pub(super) accommodations: Arc<InMemoryAccommodations>,
    pub(super) requests: Arc<InMemorySwitchRequests>,
    pub(super) notifier: Arc<InMemoryNotifier>,
    pub(super) clock: Arc<ManualClock>,
}

impl Fixture {
    pub(super) fn new() -> Self {
        Self::with_limiter(RateLimiter::default())
    }

    pub(super) fn with_limiter(limiter: RateLimiter) -> Self {
        let resources = Arc::new(seeded_resources());
        let accommodations = Arc::new(seeded_accommodations());
        let requests = Arc::new(InMemorySwitchRequests::default());
        let notifier = Arc::new(InMemoryNotifier::default());
        let clock = Arc::new(ManualClock::new(start()));
        let shared_clock: Arc<dyn Clock> = clock.clone();

        let service = Arc::new(SwitchRequestService::new(
            requests.clone(),
            resources.clone(),
            accommodations.clone(),
            notifier.clone(),
            limiter,
            shared_clock,
        ));

        Self {
            service,
            resources,
            accommodations,
            requests,
            notifier,
            clock,
        }
    }

    pub(super) fn bed_status(&self, id: &str) -> BedStatus {
        self.resources
            .bed(&BedId::new(id))
            .expect("lookup")
            .expect("bed exists")
            .status
    }

    pub(super) fn room(&self, id: &str) -> Room {
        self.resources
            .room(&RoomId::new(id))
            .expect("lookup")
            .expect("room exists")
    }

    pub(super) fn housing(&self, tenant: &str) -> Option<Accommodation> {
        self.accommodations
            .current(&TenantId::new(tenant))
            .expect("lookup")
    }

    pub(super) fn stored(&self, id: &SwitchRequestId) -> SwitchRequest {
        self.requests
            .fetch(id)
            .expect("lookup")
            .expect("request stored")
    }
}

/// Shared write counter for the flaky repositories.
///
/// Once armed, the write numbered `fail_at` (1-based, counted across all three repositories)
/// fails with `Unavailable`. With `break_recovery` set, every write after it fails too.
/// `slow_writes` stretches each armed write so concurrent approvals overlap.
#[derive(Debug, Default)]
pub(super) struct FaultPlan {
    armed: AtomicBool,
    writes: AtomicUsize,
    fail_at: AtomicUsize,
    tripped: AtomicBool,
    break_recovery: AtomicBool,
    pause_ms: AtomicU64,
}

impl FaultPlan {
    pub(super) fn arm(&self, fail_at: usize, break_recovery: bool) {
        self.writes.store(0, Ordering::SeqCst);
        self.fail_at.store(fail_at, Ordering::SeqCst);
        self.tripped.store(false, Ordering::SeqCst);
        self.break_recovery.store(break_recovery, Ordering::SeqCst);
        self.armed.store(true, Ordering::SeqCst);
    }

    pub(super) fn slow_writes(&self, pause: Duration) {
        let millis = u64::try_from(pause.as_millis()).unwrap_or(u64::MAX);
        self.pause_ms.store(millis, Ordering::SeqCst);
    }

    pub(super) fn disarm(&self) {
        self.armed.store(false, Ordering::SeqCst);
    }

    fn write(&self) -> Result<(), RepositoryError> {
        if !self.armed.load(Ordering::SeqCst) {
            return Ok(());
        }
        let pause = self.pause_ms.load(Ordering::SeqCst);
        if pause > 0 {
            thread::sleep(Duration::from_millis(pause));
        }
        let number = self.writes.fetch_add(1, Ordering::SeqCst) + 1;
        if self.tripped.load(Ordering::SeqCst) && self.break_recovery.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("store still down".to_string()));
        }
        if number == self.fail_at.load(Ordering::SeqCst) {
            self.tripped.store(true, Ordering::SeqCst);
            return Err(RepositoryError::Unavailable(format!("write {number} dropped")));
        }
        Ok(())
    }
}

pub(super) struct FlakyResources {
    pub(super) inner: InMemoryResources,
    plan: Arc<FaultPlan>,
}

impl ResourceRepository for FlakyResources {
    fn property(&self, id: &PropertyId) -> Result<Option<Property>, RepositoryError> {
        self.inner.property(id)
    }

    fn rooms(&self, property_id: &PropertyId) -> Result<Vec<Room>, RepositoryError> {
        self.inner.rooms(property_id)
    }

    fn room(&self, id: &RoomId) -> Result<Option<Room>, RepositoryError> {
        self.inner.room(id)
    }

    fn beds(&self, room_id: &RoomId) -> Result<Vec<Bed>, RepositoryError> {
        self.inner.beds(room_id)
    }

    fn bed(&self, id: &BedId) -> Result<Option<Bed>, RepositoryError> {
        self.inner.bed(id)
    }

    fn update_room_status(
        &self,
        id: &RoomId,
        status: RoomStatus,
        annotation: Option<String>,
    ) -> Result<Room, RepositoryError> {
        self.plan.write()?;
        self.inner.update_room_status(id, status, annotation)
    }

    fn compare_and_set_bed_status(
        &self,
        id: &BedId,
        expected: BedStatus,
        next: BedStatus,
        annotation: Option<String>,
    ) -> Result<Bed, RepositoryError> {
        self.plan.write()?;
        self.inner
            .compare_and_set_bed_status(id, expected, next, annotation)
    }
}

pub(super) struct FlakyAccommodations {
    pub(super) inner: InMemoryAccommodations,
    plan: Arc<FaultPlan>,
}

impl AccommodationRepository for FlakyAccommodations {
    fn current(&self, tenant_id: &TenantId) -> Result<Option<Accommodation>, RepositoryError> {
        self.inner.current(tenant_id)
    }

    fn occupant(&self, bed_id: &BedId) -> Result<Option<Accommodation>, RepositoryError> {
        self.inner.occupant(bed_id)
    }

    fn retire(&self, accommodation: &Accommodation) -> Result<(), RepositoryError> {
        self.plan.write()?;
        self.inner.retire(accommodation)
    }

    fn create(&self, accommodation: Accommodation) -> Result<(), RepositoryError> {
        self.plan.write()?;
        self.inner.create(accommodation)
    }
}

pub(super) struct FlakyRequests {
    pub(super) inner: InMemorySwitchRequests,
    plan: Arc<FaultPlan>,
}

impl SwitchRequestRepository for FlakyRequests {
    fn insert(&self, record: SwitchRequest) -> Result<SwitchRequest, RepositoryError> {
        self.plan.write()?;
        self.inner.insert(record)
    }

    fn fetch(&self, id: &SwitchRequestId) -> Result<Option<SwitchRequest>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn for_tenant(&self, tenant_id: &TenantId) -> Result<Vec<SwitchRequest>, RepositoryError> {
        self.inner.for_tenant(tenant_id)
    }

    fn all(&self) -> Result<Vec<SwitchRequest>, RepositoryError> {
        self.inner.all()
    }

    fn resolve_pending(&self, record: SwitchRequest) -> Result<SwitchRequest, RepositoryError> {
        self.plan.write()?;
        self.inner.resolve_pending(record)
    }
}

pub(super) type FlakyService =
    SwitchRequestService<FlakyRequests, FlakyResources, FlakyAccommodations, InMemoryNotifier>;

pub(super) struct FlakyFixture {
    pub(super) service: FlakyService,
    pub(super) resources: Arc<FlakyResources>,
    pub(super) accommodations: Arc<FlakyAccommodations>,
    pub(super) requests: Arc<FlakyRequests>,
    pub(super) plan: Arc<FaultPlan>,
}

impl FlakyFixture {
    pub(super) fn new() -> Self {
        let plan = Arc::new(FaultPlan::default());
        let resources = Arc::new(FlakyResources {
            inner: seeded_resources(),
            plan: plan.clone(),
        });
        let accommodations = Arc::new(FlakyAccommodations {
            inner: seeded_accommodations(),
            plan: plan.clone(),
        });
        let requests = Arc::new(FlakyRequests {
            inner: InMemorySwitchRequests::default(),
            plan: plan.clone(),
        });

        let service = SwitchRequestService::new(
            requests.clone(),
            resources.clone(),
            accommodations.clone(),
            Arc::new(InMemoryNotifier::default()),
            RateLimiter::default(),
            Arc::new(ManualClock::new(start())),
        );

        Self {
            service,
            resources,
            accommodations,
            requests,
            plan,
        }
    }
}

/// Notifier whose transport is always down.
#[derive(Debug, Default)]
pub(super) struct OfflineNotifier;

impl SwitchNotifier for OfflineNotifier {
    fn publish(&self, _notice: SwitchNotice) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("smtp relay offline".to_string()))
    }
}

pub(super) fn as_principal(
    builder: axum::http::request::Builder,
    principal: &Principal,
) -> axum::http::request::Builder {
    match principal {
        Principal::Tenant(id) => builder
            .header(ROLE_HEADER, "tenant")
            .header(ID_HEADER, id.as_str()),
        Principal::Approver(approver) => {
            let properties = approver
                .properties
                .iter()
                .map(PropertyId::as_str)
                .collect::<Vec<_>>()
                .join(",");
            builder
                .header(ROLE_HEADER, "landlord")
                .header(ID_HEADER, approver.id.as_str())
                .header(
                    PROPERTIES_HEADER,
                    HeaderValue::from_str(&properties).expect("header value"),
                )
        }
    }
}

pub(super) fn json_request(
    method: &str,
    uri: &str,
    principal: &Principal,
    body: Value,
) -> Request<axum::body::Body> {
    as_principal(Request::builder().method(method).uri(uri), principal)
        .header(axum::http::header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(
            serde_json::to_vec(&body).expect("serializes"),
        ))
        .expect("request builds")
}

pub(super) fn get_request(uri: &str, principal: &Principal) -> Request<axum::body::Body> {
    as_principal(Request::builder().method("GET").uri(uri), principal)
        .body(axum::body::Body::empty())
        .expect("request builds")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
