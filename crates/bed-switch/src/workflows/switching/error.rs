use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde_json::json;

use super::domain::{BedId, SwitchRequestId, SwitchRequestStatus, TenantId};
use super::repository::RepositoryError;

/// Every failure a switch operation can surface to its caller.
#[derive(Debug, thiserror::Error)]
pub enum SwitchError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("invalid switch request: {0}")]
    InvalidRequest(String),
    #[error("tenant {tenant_id} already has a pending switch request{}", eligible_suffix(.eligible_after))]
    RateLimited {
        tenant_id: TenantId,
        eligible_after: Option<DateTime<Utc>>,
    },
    #[error("bed {bed_id} is not available")]
    NotAvailable { bed_id: BedId },
    #[error("bed {bed_id} is no longer available; the request stays pending")]
    TargetNoLongerAvailable { bed_id: BedId },
    #[error("switch request {request_id} is already {status}")]
    AlreadyResolved {
        request_id: SwitchRequestId,
        status: SwitchRequestStatus,
    },
    #[error("a rejection reason is required")]
    MissingReason,
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
    #[error(
        "switch request {request_id} failed ({cause}) and could not be rolled back: {}",
        .unrecovered.join("; ")
    )]
    CompensationFailed {
        request_id: SwitchRequestId,
        cause: String,
        unrecovered: Vec<String>,
    },
    #[error("storage rejected the operation: {0}")]
    Storage(RepositoryError),
}

fn eligible_suffix(eligible_after: &Option<DateTime<Utc>>) -> String {
    match eligible_after {
        Some(instant) => format!(" (eligible after {})", instant.to_rfc3339()),
        None => " (eligible once it is resolved)".to_string(),
    }
}

impl SwitchError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Stable machine-readable name of the error kind.
    pub const fn kind(&self) -> &'static str {
        match self {
            SwitchError::NotFound { .. } => "not_found",
            SwitchError::InvalidRequest(_) => "invalid_request",
            SwitchError::RateLimited { .. } => "rate_limited",
            SwitchError::NotAvailable { .. } => "not_available",
            SwitchError::TargetNoLongerAvailable { .. } => "target_no_longer_available",
            SwitchError::AlreadyResolved { .. } => "already_resolved",
            SwitchError::MissingReason => "missing_reason",
            SwitchError::UpstreamUnavailable(_) => "upstream_unavailable",
            SwitchError::Forbidden(_) => "forbidden",
            SwitchError::Unauthenticated(_) => "unauthenticated",
            SwitchError::CompensationFailed { .. } => "compensation_failed",
            SwitchError::Storage(_) => "storage",
        }
    }

    pub const fn status_code(&self) -> StatusCode {
        match self {
            SwitchError::NotFound { .. } => StatusCode::NOT_FOUND,
            SwitchError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            SwitchError::MissingReason => StatusCode::UNPROCESSABLE_ENTITY,
            SwitchError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            SwitchError::NotAvailable { .. }
            | SwitchError::TargetNoLongerAvailable { .. }
            | SwitchError::AlreadyResolved { .. } => StatusCode::CONFLICT,
            SwitchError::Forbidden(_) => StatusCode::FORBIDDEN,
            SwitchError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            SwitchError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            SwitchError::CompensationFailed { .. } | SwitchError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<RepositoryError> for SwitchError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Unavailable(reason) => Self::UpstreamUnavailable(reason),
            other => Self::Storage(other),
        }
    }
}

impl IntoResponse for SwitchError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.to_string(),
            "kind": self.kind(),
        }));
        (status, body).into_response()
    }
}
