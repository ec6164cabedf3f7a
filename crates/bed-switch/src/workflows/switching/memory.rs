//! In-process implementations of the repository traits.
//!
//! Used by the HTTP service when no external store is configured, by the inventory importer,
//! and by tests.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::domain::{
    Accommodation, Bed, BedId, BedStatus, Property, PropertyId, Room, RoomId, RoomStatus,
    SwitchRequest, SwitchRequestId, TenantId,
};
use super::notification::{NotifyError, SwitchNotice, SwitchNotifier};
use super::repository::{
    AccommodationRepository, RepositoryError, ResourceRepository, SwitchRequestRepository,
};

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable(format!("{what} lock poisoned")))
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct ResourceState {
    properties: BTreeMap<PropertyId, Property>,
    rooms: BTreeMap<RoomId, Room>,
    beds: BTreeMap<BedId, Bed>,
}

/// Point-in-time copy of every room and bed, for consistency checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSnapshot {
    pub rooms: Vec<Room>,
    pub beds: Vec<Bed>,
}

#[derive(Debug, Default)]
pub struct InMemoryResources {
    state: Mutex<ResourceState>,
}

impl InMemoryResources {
    pub fn insert_property(&self, property: Property) -> Result<(), RepositoryError> {
        let mut state = lock(&self.state, "resource")?;
        state.properties.insert(property.id.clone(), property);
        Ok(())
    }

    pub fn insert_room(&self, room: Room) -> Result<(), RepositoryError> {
        let mut state = lock(&self.state, "resource")?;
        if !state.properties.contains_key(&room.property_id) {
            return Err(RepositoryError::NotFound);
        }
        state.rooms.insert(room.id.clone(), room);
        Ok(())
    }

    pub fn insert_bed(&self, bed: Bed) -> Result<(), RepositoryError> {
        let mut state = lock(&self.state, "resource")?;
        if !state.rooms.contains_key(&bed.room_id) {
            return Err(RepositoryError::NotFound);
        }
        if state.beds.contains_key(&bed.id) {
            return Err(RepositoryError::Conflict);
        }
        state.beds.insert(bed.id.clone(), bed);
        Ok(())
    }

    pub fn properties(&self) -> Result<Vec<Property>, RepositoryError> {
        let state = lock(&self.state, "resource")?;
        Ok(state.properties.values().cloned().collect())
    }

    pub fn snapshot(&self) -> Result<ResourceSnapshot, RepositoryError> {
        let state = lock(&self.state, "resource")?;
        Ok(ResourceSnapshot {
            rooms: state.rooms.values().cloned().collect(),
            beds: state.beds.values().cloned().collect(),
        })
    }
}

impl ResourceRepository for InMemoryResources {
    fn property(&self, id: &PropertyId) -> Result<Option<Property>, RepositoryError> {
        let state = lock(&self.state, "resource")?;
        Ok(state.properties.get(id).cloned())
    }

    fn rooms(&self, property_id: &PropertyId) -> Result<Vec<Room>, RepositoryError> {
        let state = lock(&self.state, "resource")?;
        Ok(state
            .rooms
            .values()
            .filter(|room| &room.property_id == property_id)
            .cloned()
            .collect())
    }

    fn room(&self, id: &RoomId) -> Result<Option<Room>, RepositoryError> {
        let state = lock(&self.state, "resource")?;
        Ok(state.rooms.get(id).cloned())
    }

    fn beds(&self, room_id: &RoomId) -> Result<Vec<Bed>, RepositoryError> {
        let state = lock(&self.state, "resource")?;
        Ok(state
            .beds
            .values()
            .filter(|bed| &bed.room_id == room_id)
            .cloned()
            .collect())
    }

    fn bed(&self, id: &BedId) -> Result<Option<Bed>, RepositoryError> {
        let state = lock(&self.state, "resource")?;
        Ok(state.beds.get(id).cloned())
    }

    fn update_room_status(
        &self,
        id: &RoomId,
        status: RoomStatus,
        annotation: Option<String>,
    ) -> Result<Room, RepositoryError> {
        let mut state = lock(&self.state, "resource")?;
        let room = state.rooms.get_mut(id).ok_or(RepositoryError::NotFound)?;
        let previous = room.clone();
        room.status = status;
        room.annotation = annotation;
        Ok(previous)
    }

    fn compare_and_set_bed_status(
        &self,
        id: &BedId,
        expected: BedStatus,
        next: BedStatus,
        annotation: Option<String>,
    ) -> Result<Bed, RepositoryError> {
        let mut state = lock(&self.state, "resource")?;
        let bed = state.beds.get_mut(id).ok_or(RepositoryError::NotFound)?;
        if bed.status != expected {
            return Err(RepositoryError::Conflict);
        }
        let previous = bed.clone();
        bed.status = next;
        bed.annotation = annotation;
        Ok(previous)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryAccommodations {
    by_tenant: Mutex<BTreeMap<TenantId, Accommodation>>,
}

impl InMemoryAccommodations {
    pub fn snapshot(&self) -> Result<Vec<Accommodation>, RepositoryError> {
        let guard = lock(&self.by_tenant, "accommodation")?;
        Ok(guard.values().cloned().collect())
    }
}

impl AccommodationRepository for InMemoryAccommodations {
    fn current(&self, tenant_id: &TenantId) -> Result<Option<Accommodation>, RepositoryError> {
        let guard = lock(&self.by_tenant, "accommodation")?;
        Ok(guard.get(tenant_id).cloned())
    }

    fn occupant(&self, bed_id: &BedId) -> Result<Option<Accommodation>, RepositoryError> {
        let guard = lock(&self.by_tenant, "accommodation")?;
        Ok(guard
            .values()
            .find(|accommodation| &accommodation.bed_id == bed_id)
            .cloned())
    }

    fn retire(&self, accommodation: &Accommodation) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.by_tenant, "accommodation")?;
        match guard.get(&accommodation.tenant_id) {
            Some(active) if active == accommodation => {
                guard.remove(&accommodation.tenant_id);
                Ok(())
            }
            _ => Err(RepositoryError::NotFound),
        }
    }

    fn create(&self, accommodation: Accommodation) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.by_tenant, "accommodation")?;
        let bed_taken = guard
            .values()
            .any(|active| active.bed_id == accommodation.bed_id);
        if bed_taken || guard.contains_key(&accommodation.tenant_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(accommodation.tenant_id.clone(), accommodation);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemorySwitchRequests {
    records: Mutex<BTreeMap<SwitchRequestId, SwitchRequest>>,
}

impl SwitchRequestRepository for InMemorySwitchRequests {
    fn insert(&self, record: SwitchRequest) -> Result<SwitchRequest, RepositoryError> {
        let mut guard = lock(&self.records, "switch request")?;
        if guard.contains_key(&record.request_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.request_id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &SwitchRequestId) -> Result<Option<SwitchRequest>, RepositoryError> {
        let guard = lock(&self.records, "switch request")?;
        Ok(guard.get(id).cloned())
    }

    fn for_tenant(&self, tenant_id: &TenantId) -> Result<Vec<SwitchRequest>, RepositoryError> {
        let guard = lock(&self.records, "switch request")?;
        Ok(guard
            .values()
            .filter(|record| &record.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    fn all(&self) -> Result<Vec<SwitchRequest>, RepositoryError> {
        let guard = lock(&self.records, "switch request")?;
        Ok(guard.values().cloned().collect())
    }

    fn resolve_pending(&self, record: SwitchRequest) -> Result<SwitchRequest, RepositoryError> {
        let mut guard = lock(&self.records, "switch request")?;
        let stored = guard
            .get_mut(&record.request_id)
            .ok_or(RepositoryError::NotFound)?;
        if !stored.is_pending() {
            return Err(RepositoryError::Conflict);
        }
        *stored = record.clone();
        Ok(record)
    }
}

/// Notifier that keeps every notice, for inspection by demos and tests.
#[derive(Debug, Default)]
pub struct InMemoryNotifier {
    notices: Mutex<Vec<SwitchNotice>>,
}

impl InMemoryNotifier {
    pub fn notices(&self) -> Vec<SwitchNotice> {
        self.notices
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl SwitchNotifier for InMemoryNotifier {
    fn publish(&self, notice: SwitchNotice) -> Result<(), NotifyError> {
        self.notices
            .lock()
            .map_err(|_| NotifyError::Transport("notice buffer poisoned".to_string()))?
            .push(notice);
        Ok(())
    }
}
