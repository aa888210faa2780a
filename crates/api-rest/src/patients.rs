//! Patient registration hand-off, admissions, treatment plans and the status view.

use crate::acting::Acting;
use crate::error::{ApiError, ApiResult, ErrorRes};
use crate::AppState;
use axum::{
    extract::{Path as AxumPath, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use ward_core::{
    AdmissionRecord, BloodType, LengthOfStay, NewAdmission, NewTreatmentPlan, PatientStatus,
    PatientSummary, RecordId, RecordStore, TreatmentPlanExecution,
};

#[derive(Deserialize, ToSchema)]
pub struct RegisterPatientReq {
    pub name: String,
    pub hospital_number: String,
    /// Clinical notation, e.g. "O-".
    pub blood_type: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct PatientRes {
    #[schema(value_type = Object)]
    pub patient: PatientSummary,
}

#[derive(Serialize, ToSchema)]
pub struct PatientStatusRes {
    #[schema(value_type = Object)]
    pub status: PatientStatus,
}

#[derive(Deserialize, ToSchema)]
pub struct AdmitReq {
    pub admission_date: Option<DateTime<Utc>>,
    pub expected_discharge_date: Option<DateTime<Utc>>,
    pub ward_location: String,
    pub diagnosis: String,
}

#[derive(Serialize, ToSchema)]
pub struct AdmissionRes {
    #[schema(value_type = Object)]
    pub admission: AdmissionRecord,
    #[schema(value_type = Object)]
    pub length_of_stay: LengthOfStay,
}

impl AdmissionRes {
    fn at(admission: AdmissionRecord, now: DateTime<Utc>) -> Self {
        Self {
            length_of_stay: LengthOfStay::of(&admission, now),
            admission,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct RequestDischargeReq {
    pub expected_discharge_date: Option<DateTime<Utc>>,
}

#[derive(Deserialize, ToSchema)]
pub struct DischargeReq {
    pub discharged_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize, ToSchema)]
pub struct CreatePlanReq {
    pub title: String,
    pub total_steps: u32,
    #[serde(default)]
    pub completed_steps: u32,
    #[serde(default)]
    pub overdue_steps: u32,
    pub start_date: Option<DateTime<Utc>>,
    pub planned_end_date: Option<DateTime<Utc>>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateProgressReq {
    pub completed_steps: u32,
    #[serde(default)]
    pub overdue_steps: u32,
}

#[derive(Serialize, ToSchema)]
pub struct PlanRes {
    #[schema(value_type = Object)]
    pub plan: TreatmentPlanExecution,
    pub completion_percentage: f64,
}

impl From<TreatmentPlanExecution> for PlanRes {
    fn from(plan: TreatmentPlanExecution) -> Self {
        Self {
            completion_percentage: plan.completion_percentage(),
            plan,
        }
    }
}

#[utoipa::path(
    post,
    path = "/patients",
    request_body = RegisterPatientReq,
    responses(
        (status = 201, description = "Patient summary stored", body = PatientRes),
        (status = 400, description = "Unknown blood type", body = ErrorRes),
        (status = 422, description = "Missing name or hospital number", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn register_patient(
    State(state): State<AppState>,
    Json(req): Json<RegisterPatientReq>,
) -> ApiResult<(StatusCode, Json<PatientRes>)> {
    let blood_type = req
        .blood_type
        .as_deref()
        .map(str::parse::<BloodType>)
        .transpose()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let patient = PatientSummary::register(&req.name, &req.hospital_number, blood_type, Utc::now())?;
    state.store.put(&patient)?;
    tracing::info!("registered patient {}", patient.id);
    Ok((StatusCode::CREATED, Json(PatientRes { patient })))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/status",
    responses(
        (status = 200, description = "Admission, plan progress and alerts", body = PatientStatusRes),
        (status = 404, description = "Patient not found", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn patient_status(
    State(state): State<AppState>,
    AxumPath(patient_id): AxumPath<RecordId>,
) -> ApiResult<Json<PatientStatusRes>> {
    state.store.get::<PatientSummary>(patient_id)?;
    Ok(Json(PatientStatusRes {
        status: state.status.patient_status(patient_id),
    }))
}

#[utoipa::path(
    post,
    path = "/patients/{id}/admissions",
    request_body = AdmitReq,
    responses(
        (status = 201, description = "Patient admitted", body = AdmissionRes),
        (status = 404, description = "Patient not found", body = ErrorRes),
        (status = 422, description = "Invalid admission", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn admit(
    State(state): State<AppState>,
    AxumPath(patient_id): AxumPath<RecordId>,
    Acting(user): Acting,
    Json(req): Json<AdmitReq>,
) -> ApiResult<(StatusCode, Json<AdmissionRes>)> {
    let now = Utc::now();
    let new = NewAdmission {
        admission_date: req.admission_date.unwrap_or(now),
        expected_discharge_date: req.expected_discharge_date,
        ward_location: req.ward_location,
        diagnosis: req.diagnosis,
    };
    let admission = state.admissions.admit(patient_id, new, &user)?;
    Ok((StatusCode::CREATED, Json(AdmissionRes::at(admission, now))))
}

#[utoipa::path(
    get,
    path = "/admissions/{id}",
    responses(
        (status = 200, description = "Admission with current length of stay", body = AdmissionRes),
        (status = 404, description = "Admission not found", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn get_admission(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<RecordId>,
) -> ApiResult<Json<AdmissionRes>> {
    Ok(Json(AdmissionRes::at(state.admissions.get(id)?, Utc::now())))
}

#[utoipa::path(
    post,
    path = "/admissions/{id}/request-discharge",
    request_body = RequestDischargeReq,
    responses(
        (status = 200, description = "Discharge requested", body = AdmissionRes),
        (status = 409, description = "Admission is not active", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn request_discharge(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<RecordId>,
    Acting(user): Acting,
    Json(req): Json<RequestDischargeReq>,
) -> ApiResult<Json<AdmissionRes>> {
    let admission = state
        .admissions
        .request_discharge(id, req.expected_discharge_date, &user)?;
    Ok(Json(AdmissionRes::at(admission, Utc::now())))
}

#[utoipa::path(
    post,
    path = "/admissions/{id}/discharge",
    request_body = DischargeReq,
    responses(
        (status = 200, description = "Patient discharged", body = AdmissionRes),
        (status = 409, description = "Already discharged", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn discharge(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<RecordId>,
    Acting(user): Acting,
    Json(req): Json<DischargeReq>,
) -> ApiResult<Json<AdmissionRes>> {
    let now = Utc::now();
    let admission = state
        .admissions
        .discharge(id, req.discharged_at.unwrap_or(now), &user)?;
    Ok(Json(AdmissionRes::at(admission, now)))
}

#[utoipa::path(
    post,
    path = "/patients/{id}/plans",
    request_body = CreatePlanReq,
    responses(
        (status = 201, description = "Treatment plan created", body = PlanRes),
        (status = 404, description = "Patient not found", body = ErrorRes),
        (status = 422, description = "Invalid counters", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn create_plan(
    State(state): State<AppState>,
    AxumPath(patient_id): AxumPath<RecordId>,
    Acting(user): Acting,
    Json(req): Json<CreatePlanReq>,
) -> ApiResult<(StatusCode, Json<PlanRes>)> {
    let new = NewTreatmentPlan {
        title: req.title,
        total_steps: req.total_steps,
        completed_steps: req.completed_steps,
        overdue_steps: req.overdue_steps,
        start_date: req.start_date.unwrap_or_else(Utc::now),
        planned_end_date: req.planned_end_date,
    };
    let plan = state.plans.create_plan(patient_id, new, &user)?;
    Ok((StatusCode::CREATED, Json(plan.into())))
}

#[utoipa::path(
    put,
    path = "/plans/{id}/progress",
    request_body = UpdateProgressReq,
    responses(
        (status = 200, description = "Progress recorded", body = PlanRes),
        (status = 409, description = "Plan already completed", body = ErrorRes),
        (status = 422, description = "Invalid counters", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn update_progress(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<RecordId>,
    Acting(user): Acting,
    Json(req): Json<UpdateProgressReq>,
) -> ApiResult<Json<PlanRes>> {
    let plan = state.plans.update_progress(
        id,
        req.completed_steps,
        req.overdue_steps,
        Utc::now(),
        &user,
    )?;
    Ok(Json(plan.into()))
}
