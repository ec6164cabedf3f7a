use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    PropertyId, RoomId, SwitchRequestFilter, SwitchRequestId, SwitchRequestStatus,
    SwitchSubmission,
};
use super::error::SwitchError;
use super::notification::{SwitchNotifier, SwitchRequestView};
use super::principal::Principal;
use super::repository::{AccommodationRepository, ResourceRepository, SwitchRequestRepository};
use super::service::SwitchRequestService;

type SharedService<S, D, A, N> = Arc<SwitchRequestService<S, D, A, N>>;

/// Router builder exposing the switch request workflow over HTTP.
pub fn switch_router<S, D, A, N>(service: SharedService<S, D, A, N>) -> Router
where
    S: SwitchRequestRepository + 'static,
    D: ResourceRepository + 'static,
    A: AccommodationRepository + 'static,
    N: SwitchNotifier + 'static,
{
    Router::new()
        .route(
            "/api/v1/properties/:property_id/rooms/available",
            get(available_rooms_handler::<S, D, A, N>),
        )
        .route(
            "/api/v1/properties/:property_id/rooms/:room_id/beds/available",
            get(available_beds_handler::<S, D, A, N>),
        )
        .route(
            "/api/v1/accommodations/current",
            get(current_assignment_handler::<S, D, A, N>),
        )
        .route(
            "/api/v1/switch-requests",
            post(submit_handler::<S, D, A, N>).get(list_handler::<S, D, A, N>),
        )
        .route(
            "/api/v1/switch-requests/:request_id",
            get(get_handler::<S, D, A, N>),
        )
        .route(
            "/api/v1/switch-requests/:request_id/approve",
            post(approve_handler::<S, D, A, N>),
        )
        .route(
            "/api/v1/switch-requests/:request_id/reject",
            post(reject_handler::<S, D, A, N>),
        )
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListQuery {
    #[serde(default)]
    pub(crate) status: Option<SwitchRequestStatus>,
    #[serde(default)]
    pub(crate) from: Option<String>,
    #[serde(default)]
    pub(crate) to: Option<String>,
    #[serde(default)]
    pub(crate) property_id: Option<String>,
}

impl ListQuery {
    fn into_filter(self) -> Result<SwitchRequestFilter, SwitchError> {
        Ok(SwitchRequestFilter {
            status: self.status,
            from: self
                .from
                .as_deref()
                .map(|raw| parse_bound(raw, false))
                .transpose()?,
            to: self
                .to
                .as_deref()
                .map(|raw| parse_bound(raw, true))
                .transpose()?,
            property_id: self
                .property_id
                .filter(|value| !value.trim().is_empty())
                .map(PropertyId::new),
        })
    }
}

/// Accepts RFC 3339 or `YYYY-MM-DD`; a bare date used as an upper bound covers the whole day.
fn parse_bound(raw: &str, end_of_day: bool) -> Result<DateTime<Utc>, SwitchError> {
    let trimmed = raw.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(instant.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|err| {
        SwitchError::InvalidRequest(format!("failed to parse '{raw}' as a date ({err})"))
    })?;
    let time = if end_of_day {
        date.and_hms_nano_opt(23, 59, 59, 999_999_999)
    } else {
        date.and_hms_opt(0, 0, 0)
    };
    time.map(|naive| naive.and_utc())
        .ok_or_else(|| SwitchError::InvalidRequest(format!("'{raw}' is out of range")))
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RejectBody {
    #[serde(default)]
    pub(crate) reason: String,
}

pub(crate) async fn available_rooms_handler<S, D, A, N>(
    State(service): State<SharedService<S, D, A, N>>,
    headers: HeaderMap,
    Path(property_id): Path<String>,
) -> Result<Response, SwitchError>
where
    S: SwitchRequestRepository + 'static,
    D: ResourceRepository + 'static,
    A: AccommodationRepository + 'static,
    N: SwitchNotifier + 'static,
{
    let principal = Principal::from_headers(&headers)?;
    let rooms = service.available_rooms(&principal, &PropertyId(property_id))?;
    Ok(Json(rooms).into_response())
}

pub(crate) async fn available_beds_handler<S, D, A, N>(
    State(service): State<SharedService<S, D, A, N>>,
    headers: HeaderMap,
    Path((property_id, room_id)): Path<(String, String)>,
) -> Result<Response, SwitchError>
where
    S: SwitchRequestRepository + 'static,
    D: ResourceRepository + 'static,
    A: AccommodationRepository + 'static,
    N: SwitchNotifier + 'static,
{
    let principal = Principal::from_headers(&headers)?;
    let beds = service.available_beds(&principal, &PropertyId(property_id), &RoomId(room_id))?;
    Ok(Json(beds).into_response())
}

pub(crate) async fn current_assignment_handler<S, D, A, N>(
    State(service): State<SharedService<S, D, A, N>>,
    headers: HeaderMap,
) -> Result<Response, SwitchError>
where
    S: SwitchRequestRepository + 'static,
    D: ResourceRepository + 'static,
    A: AccommodationRepository + 'static,
    N: SwitchNotifier + 'static,
{
    let principal = Principal::from_headers(&headers)?;
    match service.current_assignment(&principal)? {
        Some(view) => Ok(Json(view).into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "no active accommodation",
                "kind": "not_found",
            })),
        )
            .into_response()),
    }
}

pub(crate) async fn submit_handler<S, D, A, N>(
    State(service): State<SharedService<S, D, A, N>>,
    headers: HeaderMap,
    Json(submission): Json<SwitchSubmission>,
) -> Result<Response, SwitchError>
where
    S: SwitchRequestRepository + 'static,
    D: ResourceRepository + 'static,
    A: AccommodationRepository + 'static,
    N: SwitchNotifier + 'static,
{
    let principal = Principal::from_headers(&headers)?;
    let record = service.submit(&principal, submission)?;
    Ok((StatusCode::CREATED, Json(SwitchRequestView::from(&record))).into_response())
}

pub(crate) async fn list_handler<S, D, A, N>(
    State(service): State<SharedService<S, D, A, N>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Response, SwitchError>
where
    S: SwitchRequestRepository + 'static,
    D: ResourceRepository + 'static,
    A: AccommodationRepository + 'static,
    N: SwitchNotifier + 'static,
{
    let principal = Principal::from_headers(&headers)?;
    let filter = query.into_filter()?;
    let views: Vec<SwitchRequestView> = service
        .list(&principal, &filter)?
        .iter()
        .map(SwitchRequestView::from)
        .collect();
    Ok(Json(views).into_response())
}

pub(crate) async fn get_handler<S, D, A, N>(
    State(service): State<SharedService<S, D, A, N>>,
    headers: HeaderMap,
    Path(request_id): Path<String>,
) -> Result<Response, SwitchError>
where
    S: SwitchRequestRepository + 'static,
    D: ResourceRepository + 'static,
    A: AccommodationRepository + 'static,
    N: SwitchNotifier + 'static,
{
    let principal = Principal::from_headers(&headers)?;
    let record = service.get(&principal, &SwitchRequestId(request_id))?;
    Ok(Json(SwitchRequestView::from(&record)).into_response())
}

pub(crate) async fn approve_handler<S, D, A, N>(
    State(service): State<SharedService<S, D, A, N>>,
    headers: HeaderMap,
    Path(request_id): Path<String>,
) -> Result<Response, SwitchError>
where
    S: SwitchRequestRepository + 'static,
    D: ResourceRepository + 'static,
    A: AccommodationRepository + 'static,
    N: SwitchNotifier + 'static,
{
    let principal = Principal::from_headers(&headers)?;
    let record = service.approve(&principal, &SwitchRequestId(request_id))?;
    Ok(Json(SwitchRequestView::from(&record)).into_response())
}

pub(crate) async fn reject_handler<S, D, A, N>(
    State(service): State<SharedService<S, D, A, N>>,
    headers: HeaderMap,
    Path(request_id): Path<String>,
    Json(body): Json<RejectBody>,
) -> Result<Response, SwitchError>
where
    S: SwitchRequestRepository + 'static,
    D: ResourceRepository + 'static,
    A: AccommodationRepository + 'static,
    N: SwitchNotifier + 'static,
{
    let principal = Principal::from_headers(&headers)?;
    let record = service.reject(&principal, &SwitchRequestId(request_id), &body.reason)?;
    Ok(Json(SwitchRequestView::from(&record)).into_response())
}
