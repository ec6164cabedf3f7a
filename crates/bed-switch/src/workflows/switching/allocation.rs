//! Approval path: the occupancy swap across the vacated and the newly occupied room/bed pair.
//!
//! The backing stores offer no multi-record transaction, so approval applies its writes in a
//! fixed order and journals an undo action for each one. Any failure replays the journal in
//! reverse before the error is surfaced, leaving the request pending.

use std::sync::Arc;

use tracing::{error, info, warn};

use super::accommodation::AccommodationIndex;
use super::domain::{
    Accommodation, ApproverId, Bed, BedId, BedStatus, Resolution, Room, RoomId, RoomStatus,
    SwitchRequest, SwitchRequestId,
};
use super::error::SwitchError;
use super::locks::{hold, hold_all, LockTable};
use super::repository::{
    AccommodationRepository, RepositoryError, ResourceRepository, SwitchRequestRepository,
};
use super::store::{already_resolved, SwitchRequestStore};

const ROOM_VACATED_NOTE: &str = "vacated after switch";
const ROOM_OCCUPIED_NOTE: &str = "occupied after switch";
const BED_RELEASED_NOTE: &str = "released after switch";
const BED_ASSIGNED_NOTE: &str = "assigned after switch";

/// Writes performed by an approval, in the order they are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchStep {
    VacateCurrentBed,
    VacateCurrentRoom,
    OccupyRequestedBed,
    OccupyRequestedRoom,
    RetireAccommodation,
    CreateAccommodation,
    ResolveRequest,
}

impl SwitchStep {
    pub const ORDER: [SwitchStep; 7] = [
        SwitchStep::VacateCurrentBed,
        SwitchStep::VacateCurrentRoom,
        SwitchStep::OccupyRequestedBed,
        SwitchStep::OccupyRequestedRoom,
        SwitchStep::RetireAccommodation,
        SwitchStep::CreateAccommodation,
        SwitchStep::ResolveRequest,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            SwitchStep::VacateCurrentBed => "vacate current bed",
            SwitchStep::VacateCurrentRoom => "vacate current room",
            SwitchStep::OccupyRequestedBed => "occupy requested bed",
            SwitchStep::OccupyRequestedRoom => "occupy requested room",
            SwitchStep::RetireAccommodation => "retire accommodation",
            SwitchStep::CreateAccommodation => "create accommodation",
            SwitchStep::ResolveRequest => "resolve request",
        }
    }
}

/// Undo action for one applied write.
#[derive(Debug)]
enum Compensation {
    RestoreBed { previous: Bed, applied: BedStatus },
    RestoreRoom { previous: Room },
    Reinstate(Accommodation),
    Withdraw(Accommodation),
}

#[derive(Debug)]
struct StepFailure {
    step: SwitchStep,
    error: SwitchError,
}

impl StepFailure {
    fn at(step: SwitchStep) -> impl Fn(RepositoryError) -> StepFailure {
        move |err| StepFailure {
            step,
            error: err.into(),
        }
    }
}

type Journal = Vec<(SwitchStep, Compensation)>;

/// Performs approvals. The only writer of room and bed status during a switch.
pub struct AllocationEngine<S, D, A> {
    store: Arc<SwitchRequestStore<S, D>>,
    resources: Arc<D>,
    index: Arc<AccommodationIndex<A, D>>,
    room_locks: LockTable<RoomId>,
    bed_locks: LockTable<BedId>,
    request_locks: LockTable<SwitchRequestId>,
}

impl<S, D, A> AllocationEngine<S, D, A>
where
    S: SwitchRequestRepository,
    D: ResourceRepository,
    A: AccommodationRepository,
{
    pub fn new(
        store: Arc<SwitchRequestStore<S, D>>,
        resources: Arc<D>,
        index: Arc<AccommodationIndex<A, D>>,
    ) -> Self {
        Self {
            store,
            resources,
            index,
            room_locks: LockTable::default(),
            bed_locks: LockTable::default(),
            request_locks: LockTable::default(),
        }
    }

    /// Approve a pending request and move the tenant to the requested bed.
    ///
    /// Concurrent approvals of the same request are serialized, as are approvals touching the
    /// same room or bed; the locks are held through any rollback. The loser of a race for the
    /// requested bed receives [`SwitchError::TargetNoLongerAvailable`] and its request stays
    /// pending.
    pub fn approve(
        &self,
        request_id: &SwitchRequestId,
        approver: &ApproverId,
    ) -> Result<SwitchRequest, SwitchError> {
        let request_slot = self.request_locks.slot(request_id);
        let _request_guard = hold(&request_slot);

        let request = self.store.get(request_id)?;
        if !request.is_pending() {
            return Err(already_resolved(&request));
        }

        let room_slots = self
            .room_locks
            .slots([&request.current_room_id, &request.requested_room_id]);
        let _room_guards = hold_all(&room_slots);
        let bed_slots = self
            .bed_locks
            .slots([&request.current_bed_id, &request.requested_bed_id]);
        let _bed_guards = hold_all(&bed_slots);

        self.revalidate(&request)?;

        let mut journal = Journal::new();
        match self.apply(&request, approver, &mut journal) {
            Ok(approved) => {
                info!(
                    request_id = %approved.request_id,
                    tenant_id = %approved.tenant_id,
                    from_bed = %approved.current_bed_id,
                    to_bed = %approved.requested_bed_id,
                    approver = %approver,
                    "switch request approved"
                );
                Ok(approved)
            }
            Err(failure) => Err(self.roll_back(&request, failure, journal)),
        }
    }

    fn revalidate(&self, request: &SwitchRequest) -> Result<(), SwitchError> {
        let target_taken = || SwitchError::TargetNoLongerAvailable {
            bed_id: request.requested_bed_id.clone(),
        };

        let bed = self
            .resources
            .bed(&request.requested_bed_id)?
            .ok_or_else(|| SwitchError::not_found("bed", &request.requested_bed_id))?;
        if bed.status != BedStatus::Available {
            return Err(target_taken());
        }
        if self.index.occupant(&request.requested_bed_id)?.is_some() {
            return Err(target_taken());
        }

        let current = self.index.current(&request.tenant_id)?;
        if current.as_ref() != Some(&request.current_accommodation()) {
            return Err(SwitchError::InvalidRequest(format!(
                "tenant {} no longer occupies bed {}",
                request.tenant_id, request.current_bed_id
            )));
        }

        Ok(())
    }

    fn apply(
        &self,
        request: &SwitchRequest,
        approver: &ApproverId,
        journal: &mut Journal,
    ) -> Result<SwitchRequest, StepFailure> {
        let step = SwitchStep::VacateCurrentBed;
        let previous = self
            .resources
            .compare_and_set_bed_status(
                &request.current_bed_id,
                BedStatus::Occupied,
                BedStatus::Available,
                Some(BED_RELEASED_NOTE.to_string()),
            )
            .map_err(StepFailure::at(step))?;
        journal.push((
            step,
            Compensation::RestoreBed {
                previous,
                applied: BedStatus::Available,
            },
        ));

        let step = SwitchStep::VacateCurrentRoom;
        let previous = self
            .resources
            .update_room_status(
                &request.current_room_id,
                RoomStatus::Available,
                Some(ROOM_VACATED_NOTE.to_string()),
            )
            .map_err(StepFailure::at(step))?;
        journal.push((step, Compensation::RestoreRoom { previous }));

        let step = SwitchStep::OccupyRequestedBed;
        let previous = self
            .resources
            .compare_and_set_bed_status(
                &request.requested_bed_id,
                BedStatus::Available,
                BedStatus::Occupied,
                Some(BED_ASSIGNED_NOTE.to_string()),
            )
            .map_err(|err| match err {
                RepositoryError::Conflict => StepFailure {
                    step,
                    error: SwitchError::TargetNoLongerAvailable {
                        bed_id: request.requested_bed_id.clone(),
                    },
                },
                other => StepFailure::at(step)(other),
            })?;
        journal.push((
            step,
            Compensation::RestoreBed {
                previous,
                applied: BedStatus::Occupied,
            },
        ));

        let step = SwitchStep::OccupyRequestedRoom;
        let previous = self
            .resources
            .update_room_status(
                &request.requested_room_id,
                RoomStatus::Occupied,
                Some(ROOM_OCCUPIED_NOTE.to_string()),
            )
            .map_err(StepFailure::at(step))?;
        journal.push((step, Compensation::RestoreRoom { previous }));

        let step = SwitchStep::RetireAccommodation;
        let vacated = request.current_accommodation();
        self.index
            .retire(&vacated)
            .map_err(StepFailure::at(step))?;
        journal.push((step, Compensation::Reinstate(vacated)));

        let step = SwitchStep::CreateAccommodation;
        let assigned = request.requested_accommodation();
        self.index
            .create(assigned.clone())
            .map_err(StepFailure::at(step))?;
        journal.push((step, Compensation::Withdraw(assigned)));

        let step = SwitchStep::ResolveRequest;
        self.store
            .resolve(&request.request_id, Resolution::Approved, approver)
            .map_err(|error| StepFailure { step, error })
    }

    fn roll_back(
        &self,
        request: &SwitchRequest,
        failure: StepFailure,
        journal: Journal,
    ) -> SwitchError {
        if !journal.is_empty() {
            warn!(
                request_id = %request.request_id,
                step = failure.step.label(),
                error = %failure.error,
                writes = journal.len(),
                "switch approval failed; compensating"
            );
        }

        let mut unrecovered = Vec::new();
        for (step, compensation) in journal.into_iter().rev() {
            if let Err(err) = self.compensate(&compensation) {
                error!(
                    request_id = %request.request_id,
                    step = step.label(),
                    error = %err,
                    "compensation failed"
                );
                unrecovered.push(format!("{}: {err}", step.label()));
            }
        }

        if unrecovered.is_empty() {
            failure.error
        } else {
            SwitchError::CompensationFailed {
                request_id: request.request_id.clone(),
                cause: format!("{}: {}", failure.step.label(), failure.error),
                unrecovered,
            }
        }
    }

    fn compensate(&self, compensation: &Compensation) -> Result<(), RepositoryError> {
        match compensation {
            Compensation::RestoreBed { previous, applied } => self
                .resources
                .compare_and_set_bed_status(
                    &previous.id,
                    *applied,
                    previous.status,
                    previous.annotation.clone(),
                )
                .map(|_| ()),
            Compensation::RestoreRoom { previous } => self
                .resources
                .update_room_status(&previous.id, previous.status, previous.annotation.clone())
                .map(|_| ()),
            Compensation::Reinstate(accommodation) => self.index.create(accommodation.clone()),
            Compensation::Withdraw(accommodation) => self.index.retire(accommodation),
        }
    }
}
