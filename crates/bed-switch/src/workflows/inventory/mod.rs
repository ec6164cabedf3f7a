//! Seeds the in-memory resource and accommodation backends from a CSV inventory export.

mod parser;

use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::Path;

use tracing::info;

use crate::workflows::switching::domain::{
    Accommodation, Bed, BedId, BedStatus, Property, PropertyId, Room, RoomId, RoomStatus,
    TenantId,
};
use crate::workflows::switching::memory::{InMemoryAccommodations, InMemoryResources};
use crate::workflows::switching::repository::{AccommodationRepository, RepositoryError};

use parser::InventoryRecord;

#[derive(Debug)]
pub enum InventoryImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    MissingField { line: u64, field: &'static str },
    InvalidPrice { line: u64, value: String },
    DuplicateBed { line: u64, bed_id: String },
    TenantOnTwoBeds { line: u64, tenant_id: String },
    RoomInTwoProperties { line: u64, room_id: String },
    Repository(RepositoryError),
}

impl std::fmt::Display for InventoryImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InventoryImportError::Io(err) => write!(f, "failed to read inventory export: {}", err),
            InventoryImportError::Csv(err) => write!(f, "invalid inventory CSV data: {}", err),
            InventoryImportError::MissingField { line, field } => {
                write!(f, "line {}: {} is required", line, field)
            }
            InventoryImportError::InvalidPrice { line, value } => {
                write!(f, "line {}: price '{}' is not a whole amount", line, value)
            }
            InventoryImportError::DuplicateBed { line, bed_id } => {
                write!(f, "line {}: bed {} is listed more than once", line, bed_id)
            }
            InventoryImportError::TenantOnTwoBeds { line, tenant_id } => write!(
                f,
                "line {}: tenant {} already occupies another bed",
                line, tenant_id
            ),
            InventoryImportError::RoomInTwoProperties { line, room_id } => write!(
                f,
                "line {}: room {} already belongs to a different property",
                line, room_id
            ),
            InventoryImportError::Repository(err) => {
                write!(f, "could not load inventory into the store: {}", err)
            }
        }
    }
}

impl std::error::Error for InventoryImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InventoryImportError::Io(err) => Some(err),
            InventoryImportError::Csv(err) => Some(err),
            InventoryImportError::Repository(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for InventoryImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for InventoryImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<RepositoryError> for InventoryImportError {
    fn from(err: RepositoryError) -> Self {
        Self::Repository(err)
    }
}

/// Backends populated from an inventory export.
#[derive(Debug, Default)]
pub struct Inventory {
    pub resources: InMemoryResources,
    pub accommodations: InMemoryAccommodations,
}

impl Inventory {
    pub fn into_parts(self) -> (InMemoryResources, InMemoryAccommodations) {
        (self.resources, self.accommodations)
    }
}

pub struct InventoryImporter;

impl InventoryImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Inventory, InventoryImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Inventory, InventoryImportError> {
        let records = parser::parse_records(reader)?;
        let layout = Layout::collect(records)?;
        let inventory = layout.load()?;

        info!(
            properties = layout.properties.len(),
            rooms = layout.rooms.len(),
            beds = layout.beds.len(),
            tenants = layout.tenants.len(),
            "inventory imported"
        );
        Ok(inventory)
    }
}

/// Rows grouped by resource, checked for duplicates before anything is stored.
#[derive(Default)]
struct Layout {
    properties: BTreeMap<PropertyId, Property>,
    rooms: BTreeMap<RoomId, Room>,
    beds: BTreeMap<BedId, Bed>,
    tenants: BTreeMap<TenantId, Accommodation>,
}

impl Layout {
    fn collect(records: Vec<InventoryRecord>) -> Result<Self, InventoryImportError> {
        let mut layout = Layout::default();

        for record in records {
            let property_id = PropertyId::new(record.property_id);
            let room_id = RoomId::new(record.room_id);
            let bed_id = BedId::new(record.bed_id);

            layout
                .properties
                .entry(property_id.clone())
                .or_insert_with(|| Property {
                    id: property_id.clone(),
                    name: record.property_name,
                    address: record.address,
                    city: record.city,
                    state: record.state,
                });

            let room = layout.rooms.entry(room_id.clone()).or_insert_with(|| Room {
                id: room_id.clone(),
                property_id: property_id.clone(),
                name: record.room_name,
                room_type: record.room_type,
                status: RoomStatus::Available,
                annotation: None,
            });
            if room.property_id != property_id {
                return Err(InventoryImportError::RoomInTwoProperties {
                    line: record.line,
                    room_id: room_id.to_string(),
                });
            }

            if layout.beds.contains_key(&bed_id) {
                return Err(InventoryImportError::DuplicateBed {
                    line: record.line,
                    bed_id: bed_id.to_string(),
                });
            }

            let status = match record.tenant_id {
                Some(tenant) => {
                    let tenant_id = TenantId::new(tenant);
                    if layout.tenants.contains_key(&tenant_id) {
                        return Err(InventoryImportError::TenantOnTwoBeds {
                            line: record.line,
                            tenant_id: tenant_id.to_string(),
                        });
                    }
                    layout.tenants.insert(
                        tenant_id.clone(),
                        Accommodation {
                            tenant_id,
                            property_id,
                            room_id: room_id.clone(),
                            bed_id: bed_id.clone(),
                        },
                    );
                    BedStatus::Occupied
                }
                None => BedStatus::Available,
            };

            layout.beds.insert(
                bed_id.clone(),
                Bed {
                    id: bed_id,
                    room_id,
                    name: record.bed_name,
                    status,
                    price: record.price,
                    annotation: None,
                },
            );
        }

        let rooms_with_space: BTreeSet<&RoomId> = layout
            .beds
            .values()
            .filter(|bed| bed.status == BedStatus::Available)
            .map(|bed| &bed.room_id)
            .collect();
        let full_rooms: Vec<RoomId> = layout
            .rooms
            .keys()
            .filter(|room_id| !rooms_with_space.contains(room_id))
            .cloned()
            .collect();
        for room_id in full_rooms {
            if let Some(room) = layout.rooms.get_mut(&room_id) {
                room.status = RoomStatus::Occupied;
            }
        }

        Ok(layout)
    }

    fn load(&self) -> Result<Inventory, RepositoryError> {
        let inventory = Inventory::default();
        for property in self.properties.values() {
            inventory.resources.insert_property(property.clone())?;
        }
        for room in self.rooms.values() {
            inventory.resources.insert_room(room.clone())?;
        }
        for bed in self.beds.values() {
            inventory.resources.insert_bed(bed.clone())?;
        }
        for accommodation in self.tenants.values() {
            inventory.accommodations.create(accommodation.clone())?;
        }
        Ok(inventory)
    }
}
