use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use super::domain::{Accommodation, BedId, TenantId};
use super::error::SwitchError;
use super::repository::{AccommodationRepository, RepositoryError, ResourceRepository};

const UNKNOWN_NAME: &str = "N/A";

/// Current assignment with display names. Names that cannot be resolved read "N/A".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccommodationView {
    #[serde(flatten)]
    pub accommodation: Accommodation,
    pub property_name: String,
    pub room_name: String,
    pub bed_name: String,
}

/// Maps tenants to the bed they currently occupy.
pub struct AccommodationIndex<A, D> {
    accommodations: Arc<A>,
    resources: Arc<D>,
}

impl<A, D> AccommodationIndex<A, D>
where
    A: AccommodationRepository,
    D: ResourceRepository,
{
    pub fn new(accommodations: Arc<A>, resources: Arc<D>) -> Self {
        Self {
            accommodations,
            resources,
        }
    }

    pub fn current(&self, tenant_id: &TenantId) -> Result<Option<Accommodation>, SwitchError> {
        Ok(self.accommodations.current(tenant_id)?)
    }

    pub fn current_assignment(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Option<AccommodationView>, SwitchError> {
        Ok(self.current(tenant_id)?.map(|accommodation| self.enrich(accommodation)))
    }

    fn enrich(&self, accommodation: Accommodation) -> AccommodationView {
        let property_name = display_name(
            self.resources.property(&accommodation.property_id),
            |property| property.name,
        );
        let room_name = display_name(self.resources.room(&accommodation.room_id), |room| {
            room.name
        });
        let bed_name = display_name(self.resources.bed(&accommodation.bed_id), |bed| bed.name);

        AccommodationView {
            accommodation,
            property_name,
            room_name,
            bed_name,
        }
    }

    pub(crate) fn occupant(&self, bed_id: &BedId) -> Result<Option<Accommodation>, RepositoryError> {
        self.accommodations.occupant(bed_id)
    }

    pub(crate) fn retire(&self, accommodation: &Accommodation) -> Result<(), RepositoryError> {
        self.accommodations.retire(accommodation)
    }

    pub(crate) fn create(&self, accommodation: Accommodation) -> Result<(), RepositoryError> {
        self.accommodations.create(accommodation)
    }
}

fn display_name<T>(
    lookup: Result<Option<T>, RepositoryError>,
    name: impl FnOnce(T) -> String,
) -> String {
    match lookup {
        Ok(Some(record)) => name(record),
        Ok(None) => UNKNOWN_NAME.to_string(),
        Err(err) => {
            debug!(error = %err, "accommodation enrichment failed");
            UNKNOWN_NAME.to_string()
        }
    }
}
