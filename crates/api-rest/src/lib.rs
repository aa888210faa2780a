//! # API REST
//!
//! HTTP/JSON binding for the ward core.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON bodies, status codes, CORS, acting-user headers)
//!
//! The binary that serves this router lives in the workspace root (`ward-run`).

#![warn(rust_2018_idioms)]

pub mod acting;
pub mod error;
pub mod patients;
pub mod transfusions;

use axum::{
    extract::{Path as AxumPath, State},
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;
use ward_core::{
    AdmissionService, AuditSink, BloodType, CoreConfig, FileStore, PatientStatusService,
    TransfusionService, TreatmentPlanService,
};

pub use acting::{ACTING_ROLE_HEADER, ACTING_USER_HEADER};
use error::{ApiError, ApiResult, ErrorRes};

/// Application state shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<CoreConfig>,
    pub store: Arc<FileStore>,
    pub transfusions: Arc<TransfusionService<FileStore>>,
    pub admissions: Arc<AdmissionService<FileStore>>,
    pub plans: Arc<TreatmentPlanService<FileStore>>,
    pub status: Arc<PatientStatusService<FileStore>>,
}

impl AppState {
    pub fn new(cfg: Arc<CoreConfig>, store: Arc<FileStore>, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            transfusions: Arc::new(TransfusionService::new(store.clone(), audit.clone())),
            admissions: Arc::new(AdmissionService::new(store.clone(), audit.clone())),
            plans: Arc::new(TreatmentPlanService::new(store.clone(), audit)),
            status: Arc::new(PatientStatusService::new(store.clone(), cfg.clone())),
            cfg,
            store,
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        accepted_donors,
        patients::register_patient,
        patients::patient_status,
        patients::admit,
        patients::get_admission,
        patients::request_discharge,
        patients::discharge,
        patients::create_plan,
        patients::update_progress,
        transfusions::plan_transfusion,
        transfusions::transfusion_history,
        transfusions::get_transfusion,
        transfusions::check_compatibility,
        transfusions::add_bag,
        transfusions::remove_bag,
        transfusions::update_checklist,
        transfusions::record_vitals,
        transfusions::record_complication,
        transfusions::resolve_complication,
        transfusions::start,
        transfusions::complete,
        transfusions::stop,
        transfusions::cancel,
    ),
    components(schemas(
        HealthRes,
        DonorsRes,
        ErrorRes,
        patients::RegisterPatientReq,
        patients::PatientRes,
        patients::PatientStatusRes,
        patients::AdmitReq,
        patients::AdmissionRes,
        patients::RequestDischargeReq,
        patients::DischargeReq,
        patients::CreatePlanReq,
        patients::UpdateProgressReq,
        patients::PlanRes,
        transfusions::TransfusionRes,
        transfusions::TransfusionHistoryRes,
        transfusions::PlanTransfusionReq,
        transfusions::CompatibilityCheckRes,
        transfusions::AddBagReq,
        transfusions::ChecklistReq,
        transfusions::VitalsReq,
        transfusions::ComplicationReq,
        transfusions::ResolveComplicationReq,
        transfusions::StartReq,
        transfusions::CompleteReq,
        transfusions::ReasonReq,
    ))
)]
struct ApiDoc;

/// Builds the REST router over `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/compatibility/:recipient", get(accepted_donors))
        .route("/patients", post(patients::register_patient))
        .route("/patients/:id/status", get(patients::patient_status))
        .route(
            "/patients/:id/transfusions",
            get(transfusions::transfusion_history).post(transfusions::plan_transfusion),
        )
        .route("/patients/:id/admissions", post(patients::admit))
        .route("/patients/:id/plans", post(patients::create_plan))
        .route("/admissions/:id", get(patients::get_admission))
        .route(
            "/admissions/:id/request-discharge",
            post(patients::request_discharge),
        )
        .route("/admissions/:id/discharge", post(patients::discharge))
        .route("/plans/:id/progress", put(patients::update_progress))
        .route("/transfusions/:id", get(transfusions::get_transfusion))
        .route(
            "/transfusions/:id/compatibility/:donor",
            get(transfusions::check_compatibility),
        )
        .route("/transfusions/:id/bags", post(transfusions::add_bag))
        .route(
            "/transfusions/:id/bags/:index",
            delete(transfusions::remove_bag),
        )
        .route(
            "/transfusions/:id/checklist",
            put(transfusions::update_checklist),
        )
        .route("/transfusions/:id/vitals", post(transfusions::record_vitals))
        .route(
            "/transfusions/:id/complications",
            post(transfusions::record_complication),
        )
        .route(
            "/transfusions/:id/complications/:complication_id/resolve",
            post(transfusions::resolve_complication),
        )
        .route("/transfusions/:id/start", post(transfusions::start))
        .route("/transfusions/:id/complete", post(transfusions::complete))
        .route("/transfusions/:id/stop", post(transfusions::stop))
        .route("/transfusions/:id/cancel", post(transfusions::cancel))
        .merge(
            SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Serialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct DonorsRes {
    pub recipient: String,
    /// Donor types the recipient may receive, own type first.
    pub donors: Vec<String>,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for monitoring and load balancers.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "Ward REST API is alive".into(),
    })
}

#[utoipa::path(
    get,
    path = "/compatibility/{recipient}",
    responses(
        (status = 200, description = "Compatible donor types", body = DonorsRes),
        (status = 400, description = "Unknown blood type", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn accepted_donors(
    State(_state): State<AppState>,
    AxumPath(recipient): AxumPath<String>,
) -> ApiResult<Json<DonorsRes>> {
    let recipient: BloodType = recipient
        .parse()
        .map_err(|e: ward_core::blood::ParseBloodTypeError| ApiError::bad_request(e.to_string()))?;
    Ok(Json(DonorsRes {
        recipient: recipient.to_string(),
        donors: recipient
            .accepted_donors()
            .iter()
            .map(ToString::to_string)
            .collect(),
    }))
}
