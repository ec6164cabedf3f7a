use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::info;

use crate::clock::Clock;

use super::domain::{
    ApproverId, BedStatus, Resolution, SwitchRequest, SwitchRequestDraft, SwitchRequestFilter,
    SwitchRequestId, SwitchRequestState, TenantId,
};
use super::error::SwitchError;
use super::locks::{hold, LockTable};
use super::rate_limit::RateLimiter;
use super::repository::{RepositoryError, ResourceRepository, SwitchRequestRepository};

static REQUEST_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_request_id() -> SwitchRequestId {
    let id = REQUEST_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SwitchRequestId(format!("swr-{id:06}"))
}

/// Owns the switch request lifecycle: creation, lookup, listing and the single resolution.
pub struct SwitchRequestStore<S, D> {
    requests: Arc<S>,
    resources: Arc<D>,
    limiter: RateLimiter,
    clock: Arc<dyn Clock>,
    tenant_locks: LockTable<TenantId>,
}

impl<S, D> SwitchRequestStore<S, D>
where
    S: SwitchRequestRepository,
    D: ResourceRepository,
{
    pub fn new(
        requests: Arc<S>,
        resources: Arc<D>,
        limiter: RateLimiter,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            requests,
            resources,
            limiter,
            clock,
            tenant_locks: LockTable::default(),
        }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn can_submit(&self, tenant_id: &TenantId) -> Result<bool, SwitchError> {
        let history = self.requests.for_tenant(tenant_id)?;
        Ok(self.limiter.can_submit(&history, self.clock.now()))
    }

    /// Persist a new pending request after re-checking the rate limit and the target bed.
    pub fn create(&self, draft: SwitchRequestDraft) -> Result<SwitchRequest, SwitchError> {
        let slot = self.tenant_locks.slot(draft.tenant_id());
        let _tenant_guard = hold(&slot);

        let now = self.clock.now();
        let history = self.requests.for_tenant(draft.tenant_id())?;
        self.limiter.check(draft.tenant_id(), &history, now)?;

        self.ensure_target_open(&draft)?;

        let record = self
            .requests
            .insert(draft.into_pending(next_request_id(), now))?;

        info!(
            request_id = %record.request_id,
            tenant_id = %record.tenant_id,
            from_bed = %record.current_bed_id,
            to_bed = %record.requested_bed_id,
            "switch request submitted"
        );
        Ok(record)
    }

    fn ensure_target_open(&self, draft: &SwitchRequestDraft) -> Result<(), SwitchError> {
        let room = self
            .resources
            .room(draft.requested_room_id())?
            .ok_or_else(|| SwitchError::not_found("room", draft.requested_room_id()))?;
        if &room.property_id != draft.property_id() {
            return Err(SwitchError::InvalidRequest(format!(
                "room {} is not part of property {}",
                room.id,
                draft.property_id()
            )));
        }

        let bed = self
            .resources
            .bed(draft.requested_bed_id())?
            .ok_or_else(|| SwitchError::not_found("bed", draft.requested_bed_id()))?;
        if &bed.room_id != draft.requested_room_id() {
            return Err(SwitchError::InvalidRequest(format!(
                "bed {} is not part of room {}",
                bed.id, room.id
            )));
        }

        if bed.status != BedStatus::Available {
            return Err(SwitchError::NotAvailable { bed_id: bed.id });
        }

        Ok(())
    }

    pub fn get(&self, request_id: &SwitchRequestId) -> Result<SwitchRequest, SwitchError> {
        self.requests
            .fetch(request_id)?
            .ok_or_else(|| SwitchError::not_found("switch request", request_id))
    }

    /// Newest first.
    pub fn list_by_tenant(&self, tenant_id: &TenantId) -> Result<Vec<SwitchRequest>, SwitchError> {
        let mut records = self.requests.for_tenant(tenant_id)?;
        sort_newest_first(&mut records);
        Ok(records)
    }

    /// Newest first.
    pub fn list_all(&self, filter: &SwitchRequestFilter) -> Result<Vec<SwitchRequest>, SwitchError> {
        let mut records: Vec<_> = self
            .requests
            .all()?
            .into_iter()
            .filter(|record| filter.matches(record))
            .collect();
        sort_newest_first(&mut records);
        Ok(records)
    }

    /// Apply the one terminal transition a request can take.
    pub fn resolve(
        &self,
        request_id: &SwitchRequestId,
        resolution: Resolution,
        approver: &ApproverId,
    ) -> Result<SwitchRequest, SwitchError> {
        if let Resolution::Rejected { reason } = &resolution {
            if reason.trim().is_empty() {
                return Err(SwitchError::MissingReason);
            }
        }

        let mut record = self.get(request_id)?;
        if !record.is_pending() {
            return Err(already_resolved(&record));
        }

        let resolved_at = self.clock.now();
        record.state = match resolution {
            Resolution::Approved => SwitchRequestState::Approved {
                resolved_at,
                resolved_by: approver.clone(),
            },
            Resolution::Rejected { reason } => SwitchRequestState::Rejected {
                resolved_at,
                resolved_by: approver.clone(),
                rejection_reason: reason.trim().to_string(),
            },
        };

        match self.requests.resolve_pending(record) {
            Ok(resolved) => {
                info!(
                    request_id = %resolved.request_id,
                    status = resolved.status().label(),
                    approver = %approver,
                    "switch request resolved"
                );
                Ok(resolved)
            }
            Err(RepositoryError::Conflict) => Err(already_resolved(&self.get(request_id)?)),
            Err(RepositoryError::NotFound) => {
                Err(SwitchError::not_found("switch request", request_id))
            }
            Err(other) => Err(other.into()),
        }
    }
}

pub(crate) fn already_resolved(record: &SwitchRequest) -> SwitchError {
    SwitchError::AlreadyResolved {
        request_id: record.request_id.clone(),
        status: record.status(),
    }
}

fn sort_newest_first(records: &mut [SwitchRequest]) {
    records.sort_by(|left, right| {
        right
            .request_date
            .cmp(&left.request_date)
            .then_with(|| right.request_id.cmp(&left.request_id))
    });
}
