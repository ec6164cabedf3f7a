use std::sync::Arc;

use super::domain::{Bed, BedId, BedStatus, Property, PropertyId, Room, RoomAvailability, RoomId};
use super::error::SwitchError;
use super::repository::ResourceRepository;

/// Read-only queries over the property → room → bed hierarchy.
pub struct ResourceDirectory<D> {
    resources: Arc<D>,
}

impl<D> Clone for ResourceDirectory<D> {
    fn clone(&self) -> Self {
        Self {
            resources: self.resources.clone(),
        }
    }
}

impl<D: ResourceRepository> ResourceDirectory<D> {
    pub fn new(resources: Arc<D>) -> Self {
        Self { resources }
    }

    /// Rooms in the property with at least one available bed.
    pub fn list_available_rooms(
        &self,
        property_id: &PropertyId,
    ) -> Result<Vec<RoomAvailability>, SwitchError> {
        self.property(property_id)?;

        let mut available = Vec::new();
        for room in self.resources.rooms(property_id)? {
            let beds = self.resources.beds(&room.id)?;
            let available_beds = beds
                .iter()
                .filter(|bed| bed.status == BedStatus::Available)
                .count();
            if available_beds > 0 {
                available.push(RoomAvailability {
                    room,
                    available_beds,
                    total_beds: beds.len(),
                });
            }
        }

        Ok(available)
    }

    pub fn list_available_beds(
        &self,
        property_id: &PropertyId,
        room_id: &RoomId,
    ) -> Result<Vec<Bed>, SwitchError> {
        self.room_in_property(property_id, room_id)?;

        Ok(self
            .resources
            .beds(room_id)?
            .into_iter()
            .filter(|bed| bed.status == BedStatus::Available)
            .collect())
    }

    pub fn property(&self, property_id: &PropertyId) -> Result<Property, SwitchError> {
        self.resources
            .property(property_id)?
            .ok_or_else(|| SwitchError::not_found("property", property_id))
    }

    /// A room that belongs to another property is reported as not found.
    pub fn room_in_property(
        &self,
        property_id: &PropertyId,
        room_id: &RoomId,
    ) -> Result<Room, SwitchError> {
        self.property(property_id)?;
        self.resources
            .room(room_id)?
            .filter(|room| &room.property_id == property_id)
            .ok_or_else(|| SwitchError::not_found("room", room_id))
    }

    pub fn bed(&self, bed_id: &BedId) -> Result<Bed, SwitchError> {
        self.resources
            .bed(bed_id)?
            .ok_or_else(|| SwitchError::not_found("bed", bed_id))
    }
}
