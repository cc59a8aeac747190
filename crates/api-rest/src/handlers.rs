//! Route handlers.
//!
//! Handlers resolve the caller, hand plain values to [`AssessmentService`] and map its errors
//! through [`ApiError`]. Create and update bodies are taken as raw JSON and parsed with
//! [`parse_json`] so schema mismatches report the offending field path.
//!
//! [`AssessmentService`]: icr_core::AssessmentService

use crate::error::ApiError;
use crate::identity::Caller;
use crate::AppState;
use api_shared::{
    AdminListQuery, BulkDeleteRes, DeleteRes, ErrorRes, ExportRes, HealthRes, HealthService,
    IdsReq, LoginReq, LoginRes, PatientSearchQuery, QuickListQuery, SuccessRes,
};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use icr_core::model::PatientType;
use icr_core::{
    parse_json, AssessmentFilter, AssessmentInput, AssessmentPatch, AssessmentRecord,
    CallerIdentity, DashboardStats, PatientHistory, ReportSummary, SortSpec,
};
use serde_json::Value;

type ApiResult<T> = Result<T, ApiError>;

fn admin_filter(q: &AdminListQuery) -> ApiResult<AssessmentFilter> {
    Ok(AssessmentFilter::from_query(
        q.search.as_deref(),
        q.diagnosis.as_deref(),
        q.date_from.as_deref(),
        q.date_to.as_deref(),
        q.patient_type.as_deref(),
    )?)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReq,
    responses(
        (status = 200, description = "Logged in; session cookie set", body = LoginRes),
        (status = 400, description = "Username or password missing", body = ErrorRes),
        (status = 401, description = "Wrong password", body = ErrorRes)
    )
)]
#[axum::debug_handler]
/// Log in with any username and the shared system password.
pub(crate) async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginReq>,
) -> ApiResult<impl IntoResponse> {
    let identity = state
        .auth
        .check_credentials(req.username.as_deref(), req.password.as_deref())?;
    let token = state.auth.issue_token(&identity, chrono::Utc::now())?;
    tracing::info!("login accepted for {}", identity.username());

    Ok((
        [(header::SET_COOKIE, state.auth.session_cookie(&token))],
        Json(LoginRes {
            success: true,
            username: identity.username().to_string(),
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Session cookie cleared", body = SuccessRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::SET_COOKIE, state.auth.clear_cookie())],
        Json(SuccessRes { success: true }),
    )
}

#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "The identity this request resolves to", body = CallerIdentity)
    )
)]
#[axum::debug_handler]
pub(crate) async fn me(State(_state): State<AppState>, Caller(caller): Caller) -> Json<CallerIdentity> {
    Json(caller)
}

#[utoipa::path(
    get,
    path = "/assessments",
    params(QuickListQuery),
    responses(
        (status = 200, description = "Up to 100 assessments, newest first", body = [AssessmentRecord]),
        (status = 400, description = "Unknown patient type", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn list_assessments(
    State(state): State<AppState>,
    Query(q): Query<QuickListQuery>,
) -> ApiResult<Json<Vec<AssessmentRecord>>> {
    let patient_type = match q.patient_type.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(code) => Some(PatientType::from_wire(code).ok_or_else(|| {
            ApiError::bad_request(format!("unknown patient type '{code}'"))
        })?),
    };
    Ok(Json(state.records.quick_list(q.search.as_deref(), patient_type)))
}

#[utoipa::path(
    post,
    path = "/assessments",
    request_body = AssessmentInput,
    responses(
        (status = 201, description = "Assessment created", body = AssessmentRecord),
        (status = 400, description = "Missing hospital number or malformed field", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn create_assessment(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(body): Json<Value>,
) -> ApiResult<(StatusCode, Json<AssessmentRecord>)> {
    let input: AssessmentInput = parse_json(body)?;
    let record = state.records.create_assessment(&caller, input)?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[utoipa::path(
    get,
    path = "/assessments/{id}",
    params(("id" = String, Path, description = "Assessment id")),
    responses(
        (status = 200, description = "Assessment with its patient", body = AssessmentRecord),
        (status = 404, description = "No such assessment", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn get_assessment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<AssessmentRecord>> {
    Ok(Json(state.records.get_assessment(&id)?))
}

#[utoipa::path(
    patch,
    path = "/assessments/{id}",
    params(("id" = String, Path, description = "Assessment id")),
    request_body(content = AssessmentInput, description = "Fields to change; absent fields keep their stored values"),
    responses(
        (status = 200, description = "Updated assessment", body = AssessmentRecord),
        (status = 400, description = "Malformed field", body = ErrorRes),
        (status = 404, description = "No such assessment", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn update_assessment(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<Json<AssessmentRecord>> {
    let patch: AssessmentPatch = parse_json(body)?;
    Ok(Json(state.records.update_assessment(&caller, &id, patch)?))
}

#[utoipa::path(
    delete,
    path = "/assessments/{id}",
    params(("id" = String, Path, description = "Assessment id")),
    responses(
        (status = 200, description = "Assessment deleted", body = DeleteRes),
        (status = 404, description = "No such assessment", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn delete_assessment(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteRes>> {
    state.records.delete_assessment(&caller, &id)?;
    Ok(Json(DeleteRes {
        success: true,
        message: "Assessment deleted".into(),
    }))
}

#[utoipa::path(
    get,
    path = "/patients/search",
    params(PatientSearchQuery),
    responses(
        (status = 200, description = "Patient and their five latest assessments", body = PatientHistory),
        (status = 400, description = "hn missing", body = ErrorRes),
        (status = 404, description = "No such patient", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn search_patient(
    State(state): State<AppState>,
    Query(q): Query<PatientSearchQuery>,
) -> ApiResult<Json<PatientHistory>> {
    Ok(Json(state.records.find_patient(q.hn.as_deref())?))
}

#[utoipa::path(
    get,
    path = "/admin/assessments",
    params(AdminListQuery),
    responses(
        (status = 200, description = "Filtered and sorted assessments", body = [AssessmentRecord]),
        (status = 400, description = "Bad filter or sort value", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn admin_list(
    State(state): State<AppState>,
    Query(q): Query<AdminListQuery>,
) -> ApiResult<Json<Vec<AssessmentRecord>>> {
    let filter = admin_filter(&q)?;
    let sort = SortSpec::from_query(q.sort.as_deref(), q.order.as_deref())?;
    Ok(Json(state.records.admin_list(&filter, sort)))
}

#[utoipa::path(
    delete,
    path = "/admin/assessments/bulk-delete",
    request_body = IdsReq,
    responses(
        (status = 200, description = "Number of assessments removed", body = BulkDeleteRes),
        (status = 400, description = "Empty id list", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn bulk_delete(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(req): Json<IdsReq>,
) -> ApiResult<Json<BulkDeleteRes>> {
    let deleted = state.records.bulk_delete(&caller, &req.ids)?;
    Ok(Json(BulkDeleteRes {
        success: true,
        deleted,
    }))
}

#[utoipa::path(
    post,
    path = "/admin/assessments/export",
    request_body = IdsReq,
    responses(
        (status = 200, description = "Export rows in the order requested", body = ExportRes),
        (status = 400, description = "Empty selection", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn export_assessments(
    State(state): State<AppState>,
    Json(req): Json<IdsReq>,
) -> ApiResult<Json<ExportRes>> {
    let rows = state.records.export_rows(&req.ids)?;
    Ok(Json(ExportRes { rows }))
}

#[utoipa::path(
    get,
    path = "/admin/stats",
    responses(
        (status = 200, description = "Dashboard counts", body = DashboardStats)
    )
)]
#[axum::debug_handler]
pub(crate) async fn stats(State(state): State<AppState>) -> Json<DashboardStats> {
    Json(state.records.stats(chrono::Utc::now()))
}

#[utoipa::path(
    get,
    path = "/admin/reports",
    params(AdminListQuery),
    responses(
        (status = 200, description = "Control and stage distributions", body = ReportSummary),
        (status = 400, description = "Bad filter value", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn reports(
    State(state): State<AppState>,
    Query(q): Query<AdminListQuery>,
) -> ApiResult<Json<ReportSummary>> {
    let filter = admin_filter(&q)?;
    Ok(Json(state.records.reports(&filter)))
}
