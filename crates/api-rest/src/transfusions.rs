//! Transfusion workflow endpoints.

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
use ward_core::blood::BloodType;
use ward_core::transfusion::{
    BloodBagInput, CompatibilityCheck, ComplicationInput, ComplicationSeverity, ComplicationType,
    NewTransfusion, SafetyChecklist, TransfusionHistory, TransfusionRecord, VitalsPhase,
    VitalsSnapshot,
};
use ward_core::RecordId;

/// A transfusion together with its derived counters.
#[derive(Serialize, ToSchema)]
pub struct TransfusionRes {
    #[schema(value_type = Object)]
    pub transfusion: TransfusionRecord,
    pub total_units: usize,
    pub adverse_events: bool,
}

impl From<TransfusionRecord> for TransfusionRes {
    fn from(transfusion: TransfusionRecord) -> Self {
        Self {
            total_units: transfusion.total_units(),
            adverse_events: transfusion.adverse_events(),
            transfusion,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct TransfusionHistoryRes {
    pub transfusions: Vec<TransfusionRes>,
}

#[derive(Deserialize, ToSchema)]
pub struct PlanTransfusionReq {
    pub indication: String,
    pub baseline_hb: f64,
    pub target_hb: Option<f64>,
    #[serde(default)]
    pub urgent: bool,
    #[serde(default)]
    pub previous_transfusions: bool,
    pub previous_reactions: Option<String>,
}

impl From<PlanTransfusionReq> for NewTransfusion {
    fn from(req: PlanTransfusionReq) -> Self {
        NewTransfusion {
            indication: req.indication,
            baseline_hb: req.baseline_hb,
            target_hb: req.target_hb,
            urgent: req.urgent,
            history: TransfusionHistory {
                previous_transfusions: req.previous_transfusions,
                previous_reactions: req.previous_reactions,
            },
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct CompatibilityCheckRes {
    /// `compatible`, `incompatible` or `recipient_unknown`.
    pub result: String,
    pub recipient: Option<String>,
    pub donor: String,
}

#[derive(Deserialize, ToSchema)]
pub struct AddBagReq {
    #[schema(value_type = Object)]
    pub bag: BloodBagInput,
    /// Must be true to attach a bag that fails the ABO/Rh check.
    #[serde(default)]
    pub override_confirmed: bool,
}

#[derive(Deserialize, ToSchema)]
pub struct ChecklistReq {
    pub consent_obtained: bool,
    pub patient_identification_verified: bool,
    pub blood_group_verified: bool,
    pub crossmatch_checked: bool,
}

#[derive(Deserialize, ToSchema)]
pub struct VitalsReq {
    #[schema(value_type = String)]
    pub phase: VitalsPhase,
    pub temperature_c: f64,
    pub pulse_bpm: u32,
    pub systolic_mmhg: u32,
    pub diastolic_mmhg: u32,
    pub respiratory_rate: u32,
    pub spo2_percent: u32,
    pub recorded_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize, ToSchema)]
pub struct ComplicationReq {
    #[schema(value_type = String, example = "febrile_reaction")]
    pub complication_type: ComplicationType,
    #[schema(value_type = String, example = "mild")]
    pub severity: ComplicationSeverity,
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub management: String,
    pub detected_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize, ToSchema)]
pub struct ResolveComplicationReq {
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize, ToSchema)]
pub struct StartReq {
    pub start_time: Option<DateTime<Utc>>,
}

#[derive(Deserialize, ToSchema)]
pub struct CompleteReq {
    pub end_time: Option<DateTime<Utc>>,
    pub post_hb: Option<f64>,
}

#[derive(Deserialize, ToSchema)]
pub struct ReasonReq {
    pub reason: String,
}

#[utoipa::path(
    post,
    path = "/patients/{id}/transfusions",
    request_body = PlanTransfusionReq,
    responses(
        (status = 201, description = "Transfusion planned", body = TransfusionRes),
        (status = 404, description = "Patient not found", body = ErrorRes),
        (status = 422, description = "Invalid request", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn plan_transfusion(
    State(state): State<AppState>,
    AxumPath(patient_id): AxumPath<RecordId>,
    Acting(user): Acting,
    Json(req): Json<PlanTransfusionReq>,
) -> ApiResult<(StatusCode, Json<TransfusionRes>)> {
    let record = state.transfusions.plan(patient_id, req.into(), &user)?;
    Ok((StatusCode::CREATED, Json(record.into())))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/transfusions",
    responses(
        (status = 200, description = "Transfusions, newest first", body = TransfusionHistoryRes),
        (status = 404, description = "Patient not found", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn transfusion_history(
    State(state): State<AppState>,
    AxumPath(patient_id): AxumPath<RecordId>,
) -> ApiResult<Json<TransfusionHistoryRes>> {
    let transfusions = state
        .transfusions
        .history(patient_id)?
        .into_iter()
        .map(TransfusionRes::from)
        .collect();
    Ok(Json(TransfusionHistoryRes { transfusions }))
}

#[utoipa::path(
    get,
    path = "/transfusions/{id}",
    responses(
        (status = 200, description = "Transfusion", body = TransfusionRes),
        (status = 404, description = "Transfusion not found", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn get_transfusion(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<RecordId>,
) -> ApiResult<Json<TransfusionRes>> {
    Ok(Json(state.transfusions.get(id)?.into()))
}

#[utoipa::path(
    get,
    path = "/transfusions/{id}/compatibility/{donor}",
    responses(
        (status = 200, description = "Advisory compatibility result", body = CompatibilityCheckRes),
        (status = 400, description = "Unknown blood type", body = ErrorRes),
        (status = 404, description = "Transfusion not found", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn check_compatibility(
    State(state): State<AppState>,
    AxumPath((id, donor)): AxumPath<(RecordId, String)>,
) -> ApiResult<Json<CompatibilityCheckRes>> {
    let donor: BloodType = donor
        .parse()
        .map_err(|e: ward_core::blood::ParseBloodTypeError| ApiError::bad_request(e.to_string()))?;
    let res = match state.transfusions.check_compatibility(id, donor)? {
        CompatibilityCheck::Compatible { recipient, donor } => CompatibilityCheckRes {
            result: "compatible".into(),
            recipient: Some(recipient.to_string()),
            donor: donor.to_string(),
        },
        CompatibilityCheck::Incompatible { recipient, donor } => CompatibilityCheckRes {
            result: "incompatible".into(),
            recipient: Some(recipient.to_string()),
            donor: donor.to_string(),
        },
        CompatibilityCheck::RecipientUnknown => CompatibilityCheckRes {
            result: "recipient_unknown".into(),
            recipient: None,
            donor: donor.to_string(),
        },
    };
    Ok(Json(res))
}

#[utoipa::path(
    post,
    path = "/transfusions/{id}/bags",
    request_body = AddBagReq,
    responses(
        (status = 200, description = "Bag attached", body = TransfusionRes),
        (status = 409, description = "Transfusion is not planned", body = ErrorRes),
        (status = 412, description = "Incompatible bag without override", body = ErrorRes),
        (status = 422, description = "Invalid bag", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn add_bag(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<RecordId>,
    Acting(user): Acting,
    Json(req): Json<AddBagReq>,
) -> ApiResult<Json<TransfusionRes>> {
    let record = state
        .transfusions
        .add_bag(id, req.bag, req.override_confirmed, &user)?;
    Ok(Json(record.into()))
}

#[utoipa::path(
    delete,
    path = "/transfusions/{id}/bags/{index}",
    responses(
        (status = 200, description = "Bag removed", body = TransfusionRes),
        (status = 404, description = "No such bag", body = ErrorRes),
        (status = 409, description = "Transfusion is not planned", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn remove_bag(
    State(state): State<AppState>,
    AxumPath((id, index)): AxumPath<(RecordId, usize)>,
    Acting(user): Acting,
) -> ApiResult<Json<TransfusionRes>> {
    Ok(Json(state.transfusions.remove_bag(id, index, &user)?.into()))
}

#[utoipa::path(
    put,
    path = "/transfusions/{id}/checklist",
    request_body = ChecklistReq,
    responses(
        (status = 200, description = "Checklist updated", body = TransfusionRes),
        (status = 409, description = "Transfusion is not planned", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn update_checklist(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<RecordId>,
    Acting(user): Acting,
    Json(req): Json<ChecklistReq>,
) -> ApiResult<Json<TransfusionRes>> {
    let checklist = SafetyChecklist {
        consent_obtained: req.consent_obtained,
        patient_identification_verified: req.patient_identification_verified,
        blood_group_verified: req.blood_group_verified,
        crossmatch_checked: req.crossmatch_checked,
    };
    Ok(Json(
        state.transfusions.update_checklist(id, checklist, &user)?.into(),
    ))
}

#[utoipa::path(
    post,
    path = "/transfusions/{id}/vitals",
    request_body = VitalsReq,
    responses(
        (status = 200, description = "Vitals recorded", body = TransfusionRes),
        (status = 409, description = "Transfusion has finished", body = ErrorRes),
        (status = 422, description = "Implausible vitals", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn record_vitals(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<RecordId>,
    Acting(user): Acting,
    Json(req): Json<VitalsReq>,
) -> ApiResult<Json<TransfusionRes>> {
    let current = state.transfusions.get(id)?;
    let snapshot = VitalsSnapshot {
        transfusion_id: id,
        patient_id: current.patient_id(),
        phase: req.phase,
        temperature_c: req.temperature_c,
        pulse_bpm: req.pulse_bpm,
        systolic_mmhg: req.systolic_mmhg,
        diastolic_mmhg: req.diastolic_mmhg,
        respiratory_rate: req.respiratory_rate,
        spo2_percent: req.spo2_percent,
        recorded_at: req.recorded_at.unwrap_or_else(Utc::now),
        recorded_by: user.name.clone(),
    };
    Ok(Json(state.transfusions.record_vitals(id, snapshot, &user)?.into()))
}

#[utoipa::path(
    post,
    path = "/transfusions/{id}/complications",
    request_body = ComplicationReq,
    responses(
        (status = 200, description = "Complication recorded", body = TransfusionRes),
        (status = 409, description = "Transfusion has finished", body = ErrorRes),
        (status = 422, description = "No symptoms given", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn record_complication(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<RecordId>,
    Acting(user): Acting,
    Json(req): Json<ComplicationReq>,
) -> ApiResult<Json<TransfusionRes>> {
    let complication = ComplicationInput {
        complication_type: req.complication_type,
        severity: req.severity,
        symptoms: req.symptoms,
        management: req.management,
        detected_at: req.detected_at.unwrap_or_else(Utc::now),
    };
    Ok(Json(
        state
            .transfusions
            .record_complication(id, complication, &user)?
            .into(),
    ))
}

#[utoipa::path(
    post,
    path = "/transfusions/{id}/complications/{complication_id}/resolve",
    request_body = ResolveComplicationReq,
    responses(
        (status = 200, description = "Complication resolved", body = TransfusionRes),
        (status = 404, description = "Complication not found", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn resolve_complication(
    State(state): State<AppState>,
    AxumPath((id, complication_id)): AxumPath<(RecordId, RecordId)>,
    Acting(user): Acting,
    Json(req): Json<ResolveComplicationReq>,
) -> ApiResult<Json<TransfusionRes>> {
    let resolved_at = req.resolved_at.unwrap_or_else(Utc::now);
    Ok(Json(
        state
            .transfusions
            .resolve_complication(id, complication_id, resolved_at, &user)?
            .into(),
    ))
}

#[utoipa::path(
    post,
    path = "/transfusions/{id}/start",
    request_body = StartReq,
    responses(
        (status = 200, description = "Transfusion started", body = TransfusionRes),
        (status = 409, description = "Transfusion is not planned", body = ErrorRes),
        (status = 412, description = "Checklist incomplete or no bags", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn start(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<RecordId>,
    Acting(user): Acting,
    Json(req): Json<StartReq>,
) -> ApiResult<Json<TransfusionRes>> {
    let start_time = req.start_time.unwrap_or_else(Utc::now);
    Ok(Json(state.transfusions.start(id, start_time, &user)?.into()))
}

#[utoipa::path(
    post,
    path = "/transfusions/{id}/complete",
    request_body = CompleteReq,
    responses(
        (status = 200, description = "Transfusion completed", body = TransfusionRes),
        (status = 409, description = "Transfusion is not in progress", body = ErrorRes),
        (status = 422, description = "End time before start", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn complete(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<RecordId>,
    Acting(user): Acting,
    Json(req): Json<CompleteReq>,
) -> ApiResult<Json<TransfusionRes>> {
    let end_time = req.end_time.unwrap_or_else(Utc::now);
    Ok(Json(
        state
            .transfusions
            .complete(id, end_time, req.post_hb, &user)?
            .into(),
    ))
}

#[utoipa::path(
    post,
    path = "/transfusions/{id}/stop",
    request_body = ReasonReq,
    responses(
        (status = 200, description = "Transfusion stopped", body = TransfusionRes),
        (status = 409, description = "Transfusion is not in progress", body = ErrorRes),
        (status = 422, description = "Reason missing", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn stop(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<RecordId>,
    Acting(user): Acting,
    Json(req): Json<ReasonReq>,
) -> ApiResult<Json<TransfusionRes>> {
    Ok(Json(state.transfusions.stop(id, &req.reason, &user)?.into()))
}

#[utoipa::path(
    post,
    path = "/transfusions/{id}/cancel",
    request_body = ReasonReq,
    responses(
        (status = 200, description = "Transfusion cancelled", body = TransfusionRes),
        (status = 409, description = "Transfusion is not planned", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn cancel(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<RecordId>,
    Acting(user): Acting,
    Json(req): Json<ReasonReq>,
) -> ApiResult<Json<TransfusionRes>> {
    Ok(Json(state.transfusions.cancel(id, &req.reason, &user)?.into()))
}
