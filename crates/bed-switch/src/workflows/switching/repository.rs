use super::domain::{
    Accommodation, Bed, BedId, BedStatus, Property, PropertyId, Room, RoomId, RoomStatus,
    SwitchRequest, SwitchRequestId, TenantId,
};

/// Error enumeration for storage failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record changed concurrently or already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Property → Room → Bed hierarchy. Status writes are reserved for the allocation engine.
pub trait ResourceRepository: Send + Sync {
    fn property(&self, id: &PropertyId) -> Result<Option<Property>, RepositoryError>;
    fn rooms(&self, property_id: &PropertyId) -> Result<Vec<Room>, RepositoryError>;
    fn room(&self, id: &RoomId) -> Result<Option<Room>, RepositoryError>;
    fn beds(&self, room_id: &RoomId) -> Result<Vec<Bed>, RepositoryError>;
    fn bed(&self, id: &BedId) -> Result<Option<Bed>, RepositoryError>;

    /// Overwrite a room's status and annotation, returning the room as it was before.
    fn update_room_status(
        &self,
        id: &RoomId,
        status: RoomStatus,
        annotation: Option<String>,
    ) -> Result<Room, RepositoryError>;

    /// Atomically move a bed from `expected` to `next`, returning the bed as it was before.
    /// Fails with `Conflict` when the stored status is not `expected`.
    fn compare_and_set_bed_status(
        &self,
        id: &BedId,
        expected: BedStatus,
        next: BedStatus,
        annotation: Option<String>,
    ) -> Result<Bed, RepositoryError>;
}

/// Active tenant → bed assignments.
pub trait AccommodationRepository: Send + Sync {
    fn current(&self, tenant_id: &TenantId) -> Result<Option<Accommodation>, RepositoryError>;
    fn occupant(&self, bed_id: &BedId) -> Result<Option<Accommodation>, RepositoryError>;
    /// Fails with `NotFound` unless exactly this accommodation is active.
    fn retire(&self, accommodation: &Accommodation) -> Result<(), RepositoryError>;
    /// Fails with `Conflict` when the bed or the tenant already has an active assignment.
    fn create(&self, accommodation: Accommodation) -> Result<(), RepositoryError>;
}

/// Switch request persistence. Records are never deleted.
pub trait SwitchRequestRepository: Send + Sync {
    fn insert(&self, record: SwitchRequest) -> Result<SwitchRequest, RepositoryError>;
    fn fetch(&self, id: &SwitchRequestId) -> Result<Option<SwitchRequest>, RepositoryError>;
    fn for_tenant(&self, tenant_id: &TenantId) -> Result<Vec<SwitchRequest>, RepositoryError>;
    fn all(&self) -> Result<Vec<SwitchRequest>, RepositoryError>;
    /// Replace a stored record only while the stored copy is still pending.
    /// Fails with `Conflict` once it has been resolved.
    fn resolve_pending(&self, record: SwitchRequest) -> Result<SwitchRequest, RepositoryError>;
}
