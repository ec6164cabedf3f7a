use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    BedId, PropertyId, RoomId, SwitchRequest, SwitchRequestId, SwitchRequestStatus, TenantId,
};

/// Outbound hook for request lifecycle events (e-mail, push, chat adapters).
pub trait SwitchNotifier: Send + Sync {
    fn publish(&self, notice: SwitchNotice) -> Result<(), NotifyError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeTemplate {
    SwitchRequested,
    SwitchApproved,
    SwitchRejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Recipient {
    Tenant(TenantId),
    PropertyApprovers(PropertyId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchNotice {
    pub template: NoticeTemplate,
    pub request_id: SwitchRequestId,
    pub recipient: Recipient,
    pub details: BTreeMap<String, String>,
}

impl SwitchNotice {
    /// Tell the approvers of the property that a request is waiting.
    pub fn submitted(request: &SwitchRequest) -> Self {
        let mut details = BTreeMap::new();
        details.insert("tenant_id".to_string(), request.tenant_id.to_string());
        details.insert("from_bed".to_string(), request.current_bed_id.to_string());
        details.insert("to_bed".to_string(), request.requested_bed_id.to_string());

        Self {
            template: NoticeTemplate::SwitchRequested,
            request_id: request.request_id.clone(),
            recipient: Recipient::PropertyApprovers(request.property_id.clone()),
            details,
        }
    }

    /// Tell the tenant how their request was resolved. `None` while still pending.
    pub fn resolved(request: &SwitchRequest) -> Option<Self> {
        let template = match request.status() {
            SwitchRequestStatus::Pending => return None,
            SwitchRequestStatus::Approved => NoticeTemplate::SwitchApproved,
            SwitchRequestStatus::Rejected => NoticeTemplate::SwitchRejected,
        };

        let mut details = BTreeMap::new();
        details.insert("message".to_string(), outcome_message(request));
        if let Some(reason) = request.rejection_reason() {
            details.insert("reason".to_string(), reason.to_string());
        }

        Some(Self {
            template,
            request_id: request.request_id.clone(),
            recipient: Recipient::Tenant(request.tenant_id.clone()),
            details,
        })
    }
}

/// One-line outcome shown to the requester and the approver.
pub fn outcome_message(request: &SwitchRequest) -> String {
    match request.rejection_reason() {
        Some(reason) => format!(
            "Switch to bed {} was rejected: {}",
            request.requested_bed_id, reason
        ),
        None if request.is_pending() => format!(
            "Switch from bed {} to bed {} is awaiting approval",
            request.current_bed_id, request.requested_bed_id
        ),
        None => format!(
            "Switch approved: now assigned to bed {} in room {}",
            request.requested_bed_id, request.requested_room_id
        ),
    }
}

/// Response shape for a switch request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwitchRequestView {
    pub request_id: SwitchRequestId,
    pub tenant_id: TenantId,
    pub property_id: PropertyId,
    pub current_room_id: RoomId,
    pub current_bed_id: BedId,
    pub requested_room_id: RoomId,
    pub requested_bed_id: BedId,
    pub status: &'static str,
    pub request_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    pub message: String,
}

impl From<&SwitchRequest> for SwitchRequestView {
    fn from(request: &SwitchRequest) -> Self {
        Self {
            request_id: request.request_id.clone(),
            tenant_id: request.tenant_id.clone(),
            property_id: request.property_id.clone(),
            current_room_id: request.current_room_id.clone(),
            current_bed_id: request.current_bed_id.clone(),
            requested_room_id: request.requested_room_id.clone(),
            requested_bed_id: request.requested_bed_id.clone(),
            status: request.status().label(),
            request_date: request.request_date,
            rejection_reason: request.rejection_reason().map(str::to_string),
            resolved_at: request.resolved_at(),
            message: outcome_message(request),
        }
    }
}
