use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::SwitchError;

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

identifier!(
    /// Identifier of a managed property.
    PropertyId
);
identifier!(RoomId);
identifier!(BedId);
identifier!(
    /// Identity of the tenant as resolved by the upstream authentication layer.
    TenantId
);
identifier!(
    /// Identity of a landlord or property manager allowed to resolve requests.
    ApproverId
);
identifier!(SwitchRequestId);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub id: PropertyId,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Available,
    Occupied,
    Maintenance,
}

impl RoomStatus {
    pub const fn label(self) -> &'static str {
        match self {
            RoomStatus::Available => "available",
            RoomStatus::Occupied => "occupied",
            RoomStatus::Maintenance => "maintenance",
        }
    }
}

/// Room inside a property. Its status is an aggregate hint; beds are authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub property_id: PropertyId,
    pub name: String,
    pub room_type: Option<String>,
    pub status: RoomStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BedStatus {
    Available,
    Occupied,
}

impl BedStatus {
    pub const fn label(self) -> &'static str {
        match self {
            BedStatus::Available => "available",
            BedStatus::Occupied => "occupied",
        }
    }
}

/// The unit of occupancy and of mutual exclusion during a switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bed {
    pub id: BedId,
    pub room_id: RoomId,
    pub name: String,
    pub status: BedStatus,
    /// Monthly price in whole currency units.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
}

/// A room offered as a switch target together with its bed counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomAvailability {
    #[serde(flatten)]
    pub room: Room,
    pub available_beds: usize,
    pub total_beds: usize,
}

/// Which bed a tenant currently occupies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accommodation {
    pub tenant_id: TenantId,
    pub property_id: PropertyId,
    pub room_id: RoomId,
    pub bed_id: BedId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchRequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl SwitchRequestStatus {
    pub const fn label(self) -> &'static str {
        match self {
            SwitchRequestStatus::Pending => "pending",
            SwitchRequestStatus::Approved => "approved",
            SwitchRequestStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for SwitchRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lifecycle state. Resolution data only exists on the resolved variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SwitchRequestState {
    Pending,
    Approved {
        resolved_at: DateTime<Utc>,
        resolved_by: ApproverId,
    },
    Rejected {
        resolved_at: DateTime<Utc>,
        resolved_by: ApproverId,
        rejection_reason: String,
    },
}

impl SwitchRequestState {
    pub const fn status(&self) -> SwitchRequestStatus {
        match self {
            SwitchRequestState::Pending => SwitchRequestStatus::Pending,
            SwitchRequestState::Approved { .. } => SwitchRequestStatus::Approved,
            SwitchRequestState::Rejected { .. } => SwitchRequestStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchRequest {
    pub request_id: SwitchRequestId,
    pub tenant_id: TenantId,
    pub property_id: PropertyId,
    pub current_room_id: RoomId,
    pub current_bed_id: BedId,
    pub requested_room_id: RoomId,
    pub requested_bed_id: BedId,
    pub request_date: DateTime<Utc>,
    #[serde(flatten)]
    pub state: SwitchRequestState,
}

impl SwitchRequest {
    pub fn status(&self) -> SwitchRequestStatus {
        self.state.status()
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, SwitchRequestState::Pending)
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        match &self.state {
            SwitchRequestState::Rejected {
                rejection_reason, ..
            } => Some(rejection_reason),
            _ => None,
        }
    }

    pub fn resolved_at(&self) -> Option<DateTime<Utc>> {
        match &self.state {
            SwitchRequestState::Pending => None,
            SwitchRequestState::Approved { resolved_at, .. }
            | SwitchRequestState::Rejected { resolved_at, .. } => Some(*resolved_at),
        }
    }

    pub fn resolved_by(&self) -> Option<&ApproverId> {
        match &self.state {
            SwitchRequestState::Pending => None,
            SwitchRequestState::Approved { resolved_by, .. }
            | SwitchRequestState::Rejected { resolved_by, .. } => Some(resolved_by),
        }
    }

    /// The accommodation the tenant holds while the request is open.
    pub fn current_accommodation(&self) -> Accommodation {
        Accommodation {
            tenant_id: self.tenant_id.clone(),
            property_id: self.property_id.clone(),
            room_id: self.current_room_id.clone(),
            bed_id: self.current_bed_id.clone(),
        }
    }

    /// The accommodation the tenant holds once the request is approved.
    pub fn requested_accommodation(&self) -> Accommodation {
        Accommodation {
            tenant_id: self.tenant_id.clone(),
            property_id: self.property_id.clone(),
            room_id: self.requested_room_id.clone(),
            bed_id: self.requested_bed_id.clone(),
        }
    }
}

/// Validated input for creating a switch request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchRequestDraft {
    tenant_id: TenantId,
    property_id: PropertyId,
    current_room_id: RoomId,
    current_bed_id: BedId,
    requested_room_id: RoomId,
    requested_bed_id: BedId,
}

impl SwitchRequestDraft {
    pub fn new(
        tenant_id: TenantId,
        property_id: PropertyId,
        current_room_id: RoomId,
        current_bed_id: BedId,
        requested_room_id: RoomId,
        requested_bed_id: BedId,
    ) -> Result<Self, SwitchError> {
        let missing = [
            ("tenant_id", tenant_id.is_blank()),
            ("property_id", property_id.is_blank()),
            ("current_room_id", current_room_id.is_blank()),
            ("current_bed_id", current_bed_id.is_blank()),
            ("requested_room_id", requested_room_id.is_blank()),
            ("requested_bed_id", requested_bed_id.is_blank()),
        ]
        .into_iter()
        .filter_map(|(field, blank)| blank.then_some(field))
        .collect::<Vec<_>>();

        if !missing.is_empty() {
            return Err(SwitchError::InvalidRequest(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        }

        if requested_bed_id == current_bed_id {
            return Err(SwitchError::InvalidRequest(format!(
                "bed {requested_bed_id} is already the current bed"
            )));
        }

        Ok(Self {
            tenant_id,
            property_id,
            current_room_id,
            current_bed_id,
            requested_room_id,
            requested_bed_id,
        })
    }

    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    pub fn property_id(&self) -> &PropertyId {
        &self.property_id
    }

    pub fn current_room_id(&self) -> &RoomId {
        &self.current_room_id
    }

    pub fn current_bed_id(&self) -> &BedId {
        &self.current_bed_id
    }

    pub fn requested_room_id(&self) -> &RoomId {
        &self.requested_room_id
    }

    pub fn requested_bed_id(&self) -> &BedId {
        &self.requested_bed_id
    }

    pub(crate) fn into_pending(
        self,
        request_id: SwitchRequestId,
        request_date: DateTime<Utc>,
    ) -> SwitchRequest {
        SwitchRequest {
            request_id,
            tenant_id: self.tenant_id,
            property_id: self.property_id,
            current_room_id: self.current_room_id,
            current_bed_id: self.current_bed_id,
            requested_room_id: self.requested_room_id,
            requested_bed_id: self.requested_bed_id,
            request_date,
            state: SwitchRequestState::Pending,
        }
    }
}

/// Tenant-facing payload; the current bed is taken from the accommodation index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchSubmission {
    pub requested_room_id: RoomId,
    pub requested_bed_id: BedId,
}

/// Terminal outcome applied by `resolve`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Approved,
    Rejected { reason: String },
}

/// Listing filter. Date bounds are inclusive and compare against `request_date`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwitchRequestFilter {
    pub status: Option<SwitchRequestStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub property_id: Option<PropertyId>,
}

impl SwitchRequestFilter {
    pub fn pending() -> Self {
        Self {
            status: Some(SwitchRequestStatus::Pending),
            ..Self::default()
        }
    }

    pub fn matches(&self, request: &SwitchRequest) -> bool {
        self.status.map_or(true, |status| request.status() == status)
            && self.from.map_or(true, |from| request.request_date >= from)
            && self.to.map_or(true, |to| request.request_date <= to)
            && self
                .property_id
                .as_ref()
                .map_or(true, |property| &request.property_id == property)
    }
}
