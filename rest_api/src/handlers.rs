// rest_api/src/handlers.rs

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use lib::service::{
    Availability, MutationOutcome, UpcomingVisits, VisitDetails, VisitPage, VisitQuery,
};
use lib::workflow::WorkflowCapabilities;
use models::errors::{FieldError, VisitError};
use models::medical::{
    AuditAction, AuditLogEntry, CheckInRequest, CheckOutRequest, ScheduleConflict, Visit,
    VisitCreateRequest, VisitUpdateRequest,
};
use security::permissions;

use crate::auth::Caller;
use crate::{AppState, RestApiError};

/// Success envelope. `conflicts` only appears when an emergency override let
/// overlapping visits through.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<ScheduleConflict>,
}

fn ok<T>(data: T) -> Json<Envelope<T>> {
    Json(Envelope {
        success: true,
        data,
        conflicts: Vec::new(),
    })
}

fn committed(outcome: MutationOutcome) -> Json<Envelope<Visit>> {
    Json(Envelope {
        success: true,
        data: outcome.visit,
        conflicts: outcome.conflicts,
    })
}

type ApiResult<T> = Result<Json<Envelope<T>>, RestApiError>;

// An id that is not a UUID cannot name a stored visit.
fn visit_id(raw: &str) -> Result<Uuid, RestApiError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| VisitError::NotFound(format!("visit {} not found", raw)).into())
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn create_visit(
    State(state): State<AppState>,
    caller: Caller,
    payload: Result<Json<VisitCreateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Envelope<Visit>>), RestApiError> {
    let actor = caller.authorize(&state, permissions::VISITS_WRITE)?;
    let Json(request) = payload?;
    let outcome = state.service.create(request, actor).await?;
    Ok((StatusCode::CREATED, committed(outcome)))
}

pub async fn list_visits(
    State(state): State<AppState>,
    caller: Caller,
    query: Result<Query<VisitQuery>, QueryRejection>,
) -> ApiResult<VisitPage> {
    caller.authorize(&state, permissions::VISITS_READ)?;
    let Query(query) = query?;
    let page = state.service.list(&query, state.page_limits).await?;
    Ok(ok(page))
}

pub async fn get_visit(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<VisitDetails> {
    caller.authorize(&state, permissions::VISITS_READ)?;
    let details = state.service.get(visit_id(&id)?).await?;
    Ok(ok(details))
}

pub async fn update_visit(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    payload: Result<Json<VisitUpdateRequest>, JsonRejection>,
) -> ApiResult<Visit> {
    let actor = caller.authorize(&state, permissions::VISITS_WRITE)?;
    let id = visit_id(&id)?;
    let Json(patch) = payload?;
    let outcome = state.service.update(id, patch, actor).await?;
    Ok(committed(outcome))
}

pub async fn delete_visit(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<Visit> {
    let actor = caller.authorize(&state, permissions::VISITS_DELETE)?;
    let outcome = state.service.delete(visit_id(&id)?, actor).await?;
    Ok(committed(outcome))
}

pub async fn check_in(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    payload: Result<Json<CheckInRequest>, JsonRejection>,
) -> ApiResult<Visit> {
    let actor = caller.authorize(&state, permissions::VISITS_CHECK_IN)?;
    let id = visit_id(&id)?;
    // Check-in data is optional; a bare POST is a plain check-in.
    let data = match payload {
        Ok(Json(data)) => data,
        Err(JsonRejection::MissingJsonContentType(_)) => CheckInRequest::default(),
        Err(rejection) => return Err(rejection.into()),
    };
    let outcome = state.service.check_in(id, data, actor).await?;
    Ok(committed(outcome))
}

pub async fn check_out(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    payload: Result<Json<CheckOutRequest>, JsonRejection>,
) -> ApiResult<Visit> {
    let actor = caller.authorize(&state, permissions::VISITS_CHECK_OUT)?;
    let id = visit_id(&id)?;
    let Json(data) = payload?;
    let outcome = state.service.check_out(id, data, actor).await?;
    Ok(committed(outcome))
}

pub async fn workflow(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<WorkflowCapabilities> {
    caller.authorize(&state, permissions::VISITS_READ)?;
    let capabilities = state.service.workflow(visit_id(&id)?).await?;
    Ok(ok(capabilities))
}

pub async fn upcoming_visits(
    State(state): State<AppState>,
    caller: Caller,
) -> ApiResult<UpcomingVisits> {
    caller.authorize(&state, permissions::VISITS_READ)?;
    Ok(ok(state.service.upcoming().await?))
}

pub async fn patient_visits(
    State(state): State<AppState>,
    caller: Caller,
    Path(patient_id): Path<String>,
) -> ApiResult<Vec<Visit>> {
    caller.authorize(&state, permissions::VISITS_READ)?;
    Ok(ok(state.service.patient_visits(&patient_id).await?))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityParams {
    pub date: Option<String>,
    pub duration: Option<u32>,
    pub doctor_id: Option<String>,
    pub location: Option<String>,
}

pub async fn availability(
    State(state): State<AppState>,
    caller: Caller,
    params: Result<Query<AvailabilityParams>, QueryRejection>,
) -> ApiResult<Availability> {
    caller.authorize(&state, permissions::VISITS_READ)?;
    let Query(params) = params?;
    let date = match params.date.as_deref().map(str::trim) {
        None | Some("") => return Err(VisitError::validation("date", "date is required").into()),
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| VisitError::validation("date", "date must be formatted as YYYY-MM-DD"))?,
    };
    let slots = state
        .service
        .availability(
            date,
            params.duration,
            params.doctor_id.as_deref(),
            params.location.as_deref(),
        )
        .await?;
    Ok(ok(slots))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditParams {
    pub visit_id: Option<String>,
    pub action: Option<String>,
}

pub async fn audit_trail(
    State(state): State<AppState>,
    caller: Caller,
    params: Result<Query<AuditParams>, QueryRejection>,
) -> ApiResult<Vec<AuditLogEntry>> {
    caller.authorize(&state, permissions::AUDIT_READ)?;
    let Query(params) = params?;

    let mut errors = Vec::new();
    let visit_id = params
        .visit_id
        .as_deref()
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .and_then(|raw| match Uuid::parse_str(raw) {
            Ok(id) => Some(id),
            Err(_) => {
                errors.push(FieldError::new("visitId", "visitId must be a UUID"));
                None
            }
        });
    let action = params
        .action
        .as_deref()
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .and_then(|raw| match raw.parse::<AuditAction>() {
            Ok(action) => Some(action),
            Err(e) => {
                errors.push(FieldError::new("action", e));
                None
            }
        });
    if !errors.is_empty() {
        return Err(VisitError::Validation(errors).into());
    }

    Ok(ok(state.service.audit_trail(visit_id, action).await?))
}
