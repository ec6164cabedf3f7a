//! Room/bed switch requests: tenants ask to move to another bed in their property, and a
//! landlord or property manager approves or rejects the move.
//!
//! Approval is the only path that changes occupancy. It swaps the tenant's accommodation and
//! the room/bed statuses as a single unit; see [`allocation`].

pub mod accommodation;
pub mod allocation;
pub mod directory;
pub mod domain;
pub mod error;
pub(crate) mod locks;
pub mod memory;
pub mod notification;
pub mod principal;
pub mod rate_limit;
pub mod repository;
pub mod router;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use accommodation::{AccommodationIndex, AccommodationView};
pub use allocation::{AllocationEngine, SwitchStep};
pub use directory::ResourceDirectory;
pub use domain::{
    Accommodation, ApproverId, Bed, BedId, BedStatus, Property, PropertyId, Resolution, Room,
    RoomAvailability, RoomId, RoomStatus, SwitchRequest, SwitchRequestDraft, SwitchRequestFilter,
    SwitchRequestId, SwitchRequestState, SwitchRequestStatus, SwitchSubmission, TenantId,
};
pub use error::SwitchError;
pub use memory::{
    InMemoryAccommodations, InMemoryNotifier, InMemoryResources, InMemorySwitchRequests,
    ResourceSnapshot,
};
pub use notification::{
    outcome_message, NoticeTemplate, NotifyError, Recipient, SwitchNotice, SwitchNotifier,
    SwitchRequestView,
};
pub use principal::{Approver, ApproverRole, Principal};
pub use rate_limit::{RateLimiter, WindowPolicy, DEFAULT_WINDOW_DAYS};
pub use repository::{
    AccommodationRepository, RepositoryError, ResourceRepository, SwitchRequestRepository,
};
pub use router::switch_router;
pub use service::SwitchRequestService;
pub use store::SwitchRequestStore;

/// Service wired to the in-process repositories.
pub type InMemorySwitchService<N = InMemoryNotifier> =
    SwitchRequestService<InMemorySwitchRequests, InMemoryResources, InMemoryAccommodations, N>;
