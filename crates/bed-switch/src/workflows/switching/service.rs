use std::sync::Arc;

use tracing::warn;

use crate::clock::Clock;

use super::accommodation::{AccommodationIndex, AccommodationView};
use super::allocation::AllocationEngine;
use super::directory::ResourceDirectory;
use super::domain::{
    Bed, PropertyId, Resolution, RoomAvailability, RoomId, SwitchRequest, SwitchRequestDraft,
    SwitchRequestFilter, SwitchRequestId, SwitchSubmission, TenantId,
};
use super::error::SwitchError;
use super::notification::{SwitchNotice, SwitchNotifier};
use super::principal::{Approver, Principal};
use super::rate_limit::RateLimiter;
use super::repository::{AccommodationRepository, ResourceRepository, SwitchRequestRepository};
use super::store::SwitchRequestStore;

/// Facade composing the directory, accommodation index, store and allocation engine, with
/// authorization applied against the caller's principal.
pub struct SwitchRequestService<S, D, A, N> {
    directory: ResourceDirectory<D>,
    index: Arc<AccommodationIndex<A, D>>,
    store: Arc<SwitchRequestStore<S, D>>,
    engine: AllocationEngine<S, D, A>,
    notifier: Arc<N>,
}

impl<S, D, A, N> SwitchRequestService<S, D, A, N>
where
    S: SwitchRequestRepository + 'static,
    D: ResourceRepository + 'static,
    A: AccommodationRepository + 'static,
    N: SwitchNotifier + 'static,
{
    pub fn new(
        requests: Arc<S>,
        resources: Arc<D>,
        accommodations: Arc<A>,
        notifier: Arc<N>,
        limiter: RateLimiter,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let directory = ResourceDirectory::new(resources.clone());
        let index = Arc::new(AccommodationIndex::new(accommodations, resources.clone()));
        let store = Arc::new(SwitchRequestStore::new(
            requests,
            resources.clone(),
            limiter,
            clock,
        ));
        let engine = AllocationEngine::new(store.clone(), resources, index.clone());

        Self {
            directory,
            index,
            store,
            engine,
            notifier,
        }
    }

    pub fn directory(&self) -> &ResourceDirectory<D> {
        &self.directory
    }

    pub fn store(&self) -> &SwitchRequestStore<S, D> {
        &self.store
    }

    pub fn available_rooms(
        &self,
        principal: &Principal,
        property_id: &PropertyId,
    ) -> Result<Vec<RoomAvailability>, SwitchError> {
        self.ensure_property_access(principal, property_id)?;
        self.directory.list_available_rooms(property_id)
    }

    pub fn available_beds(
        &self,
        principal: &Principal,
        property_id: &PropertyId,
        room_id: &RoomId,
    ) -> Result<Vec<Bed>, SwitchError> {
        self.ensure_property_access(principal, property_id)?;
        self.directory.list_available_beds(property_id, room_id)
    }

    pub fn current_assignment(
        &self,
        principal: &Principal,
    ) -> Result<Option<AccommodationView>, SwitchError> {
        let tenant_id = require_tenant(principal)?;
        self.index.current_assignment(tenant_id)
    }

    pub fn can_submit(&self, principal: &Principal) -> Result<bool, SwitchError> {
        let tenant_id = require_tenant(principal)?;
        self.store.can_submit(tenant_id)
    }

    /// Submit a switch away from the caller's current bed.
    pub fn submit(
        &self,
        principal: &Principal,
        submission: SwitchSubmission,
    ) -> Result<SwitchRequest, SwitchError> {
        let tenant_id = require_tenant(principal)?;
        let current = self
            .index
            .current(tenant_id)?
            .ok_or_else(|| SwitchError::not_found("accommodation for tenant", tenant_id))?;

        let draft = SwitchRequestDraft::new(
            tenant_id.clone(),
            current.property_id,
            current.room_id,
            current.bed_id,
            submission.requested_room_id,
            submission.requested_bed_id,
        )?;

        let record = self.store.create(draft)?;
        self.notify(SwitchNotice::submitted(&record));
        Ok(record)
    }

    /// Requests outside the caller's scope read as missing.
    pub fn get(
        &self,
        principal: &Principal,
        request_id: &SwitchRequestId,
    ) -> Result<SwitchRequest, SwitchError> {
        let record = self.store.get(request_id)?;
        match principal {
            Principal::Tenant(tenant_id) if tenant_id == &record.tenant_id => Ok(record),
            Principal::Approver(approver) if approver.covers(&record.property_id) => Ok(record),
            _ => Err(SwitchError::not_found("switch request", request_id)),
        }
    }

    /// Tenants see their own requests; approvers see requests for the properties they cover.
    pub fn list(
        &self,
        principal: &Principal,
        filter: &SwitchRequestFilter,
    ) -> Result<Vec<SwitchRequest>, SwitchError> {
        match principal {
            Principal::Tenant(tenant_id) => Ok(self
                .store
                .list_by_tenant(tenant_id)?
                .into_iter()
                .filter(|record| filter.matches(record))
                .collect()),
            Principal::Approver(approver) => {
                if let Some(property_id) = &filter.property_id {
                    ensure_covers(approver, property_id)?;
                }
                Ok(self
                    .store
                    .list_all(filter)?
                    .into_iter()
                    .filter(|record| approver.covers(&record.property_id))
                    .collect())
            }
        }
    }

    pub fn approve(
        &self,
        principal: &Principal,
        request_id: &SwitchRequestId,
    ) -> Result<SwitchRequest, SwitchError> {
        let approver = self.resolving_approver(principal, request_id)?;
        let approved = self.engine.approve(request_id, &approver.id)?;
        self.notify_resolution(&approved);
        Ok(approved)
    }

    pub fn reject(
        &self,
        principal: &Principal,
        request_id: &SwitchRequestId,
        reason: &str,
    ) -> Result<SwitchRequest, SwitchError> {
        if reason.trim().is_empty() {
            return Err(SwitchError::MissingReason);
        }
        let approver = self.resolving_approver(principal, request_id)?;
        let rejected = self.store.resolve(
            request_id,
            Resolution::Rejected {
                reason: reason.to_string(),
            },
            &approver.id,
        )?;
        self.notify_resolution(&rejected);
        Ok(rejected)
    }

    fn resolving_approver<'p>(
        &self,
        principal: &'p Principal,
        request_id: &SwitchRequestId,
    ) -> Result<&'p Approver, SwitchError> {
        let Principal::Approver(approver) = principal else {
            return Err(SwitchError::Forbidden(
                "only landlords and property managers may resolve switch requests".to_string(),
            ));
        };
        let record = self.store.get(request_id)?;
        ensure_covers(approver, &record.property_id)?;
        Ok(approver)
    }

    fn ensure_property_access(
        &self,
        principal: &Principal,
        property_id: &PropertyId,
    ) -> Result<(), SwitchError> {
        match principal {
            Principal::Approver(approver) => ensure_covers(approver, property_id),
            Principal::Tenant(tenant_id) => {
                let housed_here = self
                    .index
                    .current(tenant_id)?
                    .is_some_and(|current| &current.property_id == property_id);
                if housed_here {
                    Ok(())
                } else {
                    Err(SwitchError::Forbidden(format!(
                        "tenant {tenant_id} is not housed in property {property_id}"
                    )))
                }
            }
        }
    }

    fn notify_resolution(&self, record: &SwitchRequest) {
        if let Some(notice) = SwitchNotice::resolved(record) {
            self.notify(notice);
        }
    }

    /// Runs after the state change has committed, so a failed delivery is only logged.
    fn notify(&self, notice: SwitchNotice) {
        let request_id = notice.request_id.clone();
        if let Err(err) = self.notifier.publish(notice) {
            warn!(request_id = %request_id, error = %err, "switch notification not delivered");
        }
    }
}

fn require_tenant(principal: &Principal) -> Result<&TenantId, SwitchError> {
    match principal {
        Principal::Tenant(tenant_id) => Ok(tenant_id),
        Principal::Approver(_) => Err(SwitchError::Forbidden(
            "only tenants may act on their own accommodation".to_string(),
        )),
    }
}

fn ensure_covers(approver: &Approver, property_id: &PropertyId) -> Result<(), SwitchError> {
    if approver.covers(property_id) {
        Ok(())
    } else {
        Err(SwitchError::Forbidden(format!(
            "approver {} is not scoped to property {property_id}",
            approver.id
        )))
    }
}
