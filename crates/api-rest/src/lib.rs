//! # API REST
//!
//! REST API implementation for ICR.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, the session cookie)
//!
//! Uses `api-shared` for wire types and session auth, and `icr-core` for everything else.

#![warn(rust_2018_idioms)]

pub mod error;
mod handlers;
pub mod identity;

use anyhow::Context;
use api_shared::AuthConfig;
use axum::{
    routing::{delete, get, post},
    Router,
};
use icr_core::{resolve_data_dir, AssessmentService, CoreConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use error::ApiError;
pub use identity::Caller;

/// Application state shared across REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub records: Arc<AssessmentService>,
    pub auth: Arc<AuthConfig>,
}

impl AppState {
    /// Open the record store described by `cfg`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store repository cannot be opened or initialised.
    pub fn new(cfg: Arc<CoreConfig>, auth: AuthConfig) -> icr_core::RecordResult<Self> {
        Ok(Self {
            records: Arc::new(AssessmentService::new(cfg)?),
            auth: Arc::new(auth),
        })
    }

    /// Build state from the process environment.
    ///
    /// # Environment Variables
    /// - `ICR_DATA_DIR`: record storage root (default: `patient_data`, created if missing)
    /// - `ICR_COMMIT_EMAIL`: email on audit commits (default: `records@icr.invalid`)
    /// - `SYSTEM_PASSWORD`: shared login password (required)
    /// - `SESSION_SECRET`: session signing key (default: `SYSTEM_PASSWORD`)
    /// - `ICR_SECURE_COOKIES`: `true` to mark the session cookie `Secure`
    ///
    /// # Errors
    ///
    /// Returns an error if `SYSTEM_PASSWORD` is unset or the record store cannot be opened.
    pub fn from_env() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir(std::env::var("ICR_DATA_DIR").ok().map(PathBuf::from))?;
        let commit_email = std::env::var("ICR_COMMIT_EMAIL")
            .unwrap_or_else(|_| icr_core::constants::DEFAULT_COMMIT_EMAIL.into());
        let cfg = Arc::new(CoreConfig::new(data_dir, commit_email)?);

        let system_password = std::env::var("SYSTEM_PASSWORD").unwrap_or_default();
        let session_secret = std::env::var("SESSION_SECRET").ok();
        let secure_cookies = std::env::var("ICR_SECURE_COOKIES")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        let auth = AuthConfig::new(&system_password, session_secret.as_deref(), secure_cookies)?;

        tracing::info!("record store at {}", cfg.data_dir().display());
        Ok(Self::new(cfg, auth)?)
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::login,
        handlers::logout,
        handlers::me,
        handlers::list_assessments,
        handlers::create_assessment,
        handlers::get_assessment,
        handlers::update_assessment,
        handlers::delete_assessment,
        handlers::search_patient,
        handlers::admin_list,
        handlers::bulk_delete,
        handlers::export_assessments,
        handlers::stats,
        handlers::reports,
    ),
    components(schemas(
        api_shared::HealthRes,
        api_shared::ErrorRes,
        api_shared::LoginReq,
        api_shared::LoginRes,
        api_shared::SuccessRes,
        api_shared::DeleteRes,
        api_shared::IdsReq,
        api_shared::BulkDeleteRes,
        api_shared::ExportRes,
        icr_core::CallerIdentity,
        icr_core::Assessment,
        icr_core::AssessmentInput,
        icr_core::AssessmentRecord,
        icr_core::AssessmentSummary,
        icr_core::Patient,
        icr_core::PatientHistory,
        icr_core::TechniqueMatrix,
        icr_core::technique::TechniqueEntry,
        icr_core::technique::TechniqueStatus,
        icr_core::model::PatientType,
        icr_core::model::AssessmentRound,
        icr_core::model::Diagnosis,
        icr_core::model::ComplianceStatus,
        icr_core::model::MedicationStatus,
        icr_core::model::SpacerType,
        icr_core::DashboardStats,
        icr_core::reporting::DiagnosisCount,
        icr_core::ReportSummary,
        icr_core::reporting::AsthmaControlDistribution,
        icr_core::reporting::CopdStageDistribution,
        icr_core::ExportRow,
    ))
)]
pub struct ApiDoc;

/// The full REST surface, with Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/auth/login", post(handlers::login))
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/me", get(handlers::me))
        .route(
            "/assessments",
            get(handlers::list_assessments).post(handlers::create_assessment),
        )
        .route(
            "/assessments/:id",
            get(handlers::get_assessment)
                .patch(handlers::update_assessment)
                .delete(handlers::delete_assessment),
        )
        .route("/patients/search", get(handlers::search_patient))
        .route("/admin/assessments", get(handlers::admin_list))
        .route(
            "/admin/assessments/bulk-delete",
            delete(handlers::bulk_delete),
        )
        .route(
            "/admin/assessments/export",
            post(handlers::export_assessments),
        )
        .route("/admin/stats", get(handlers::stats))
        .route("/admin/reports", get(handlers::reports))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `addr` and serve the router until the process stops.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails while running.
pub async fn serve(addr: &str, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}
