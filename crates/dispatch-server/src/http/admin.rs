//! Token-protected JSON API for roster maintenance.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use dispatch_core::phone::Phone;
use dispatch_core::schedule::ScheduleEntry;
use dispatch_core::staff::StaffMember;
use dispatch_ports::error::HandleError;
use dispatch_ports::types::{NewScheduleEntry, OnCallNow};

use super::{AdminError, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/staff", get(list_staff).post(add_staff))
        .route("/api/staff/{phone}", delete(remove_staff))
        .route("/api/blocked", get(list_blocked).post(block))
        .route("/api/blocked/{phone}", delete(unblock))
        .route("/api/schedule", get(list_schedule).post(add_schedule))
        .route("/api/schedule/{id}", delete(remove_schedule))
        .route("/api/threads/{phone}/close", post(close_thread))
        .route("/api/on-call", get(on_call))
}

#[derive(Debug, Default, Deserialize)]
pub struct PhoneRequest {
    #[serde(default)]
    phone_number: String,
}

#[derive(Debug, Serialize)]
pub struct StaffView {
    id: String,
    phone_number: String,
    active: bool,
}

impl From<StaffMember> for StaffView {
    fn from(member: StaffMember) -> Self {
        Self {
            id: member.id().to_string(),
            phone_number: member.phone().to_string(),
            active: member.is_active(),
        }
    }
}

/// Schedule entry in the flat shape the admin API accepts.
#[derive(Debug, Serialize)]
pub struct ScheduleView {
    id: String,
    phone_number: String,
    start_time: String,
    end_time: String,
    day_of_week: Option<u8>,
    date: Option<String>,
    recurring: bool,
    always: bool,
}

impl From<ScheduleEntry> for ScheduleView {
    fn from(entry: ScheduleEntry) -> Self {
        Self {
            id: entry.id().to_string(),
            phone_number: entry.phone().to_string(),
            start_time: entry.window().start().format("%H:%M").to_string(),
            end_time: entry.window().end().format("%H:%M").to_string(),
            day_of_week: entry.day_of_week(),
            date: entry.date().map(|d| d.format("%Y-%m-%d").to_string()),
            recurring: entry.is_recurring(),
            always: entry.is_always(),
        }
    }
}

fn required(raw: &str) -> Result<&str, AdminError> {
    if raw.trim().is_empty() {
        return Err(AdminError(HandleError::Rejected(
            "Invalid request: phone_number is required".into(),
        )));
    }
    Ok(raw)
}

/// Staff number, strictly E.164.
fn parse_phone(raw: &str) -> Result<Phone, AdminError> {
    Phone::new(required(raw)?).map_err(|e| AdminError(HandleError::Rejected(e.to_string())))
}

/// Caller id as the provider reports it, for blocklist and thread operations.
fn parse_caller(raw: &str) -> Result<Phone, AdminError> {
    Phone::caller(required(raw)?).map_err(|e| AdminError(HandleError::Rejected(e.to_string())))
}

fn removed(message: &str, phone: &Phone) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": message, "phone_number": phone }))
}

async fn list_staff(State(state): State<AppState>) -> Result<Json<Vec<StaffView>>, AdminError> {
    let staff = state.roster.list_staff().await?;
    Ok(Json(staff.into_iter().map(StaffView::from).collect()))
}

async fn add_staff(
    State(state): State<AppState>,
    Json(req): Json<PhoneRequest>,
) -> Result<(StatusCode, Json<StaffView>), AdminError> {
    let phone = parse_phone(&req.phone_number)?;
    let member = state.roster.add_staff(phone).await?;
    Ok((StatusCode::CREATED, Json(member.into())))
}

async fn remove_staff(
    State(state): State<AppState>,
    Path(phone): Path<String>,
) -> Result<Json<serde_json::Value>, AdminError> {
    let phone = parse_phone(&phone)?;
    state.roster.remove_staff(&phone).await?;
    Ok(removed("Staff member removed successfully", &phone))
}

async fn list_blocked(State(state): State<AppState>) -> Result<Json<Vec<Phone>>, AdminError> {
    Ok(Json(state.roster.list_blocked().await?))
}

async fn block(
    State(state): State<AppState>,
    Json(req): Json<PhoneRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AdminError> {
    let phone = parse_caller(&req.phone_number)?;
    state.roster.block_number(phone.clone()).await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "phone_number": phone })),
    ))
}

async fn unblock(
    State(state): State<AppState>,
    Path(phone): Path<String>,
) -> Result<Json<serde_json::Value>, AdminError> {
    let phone = parse_caller(&phone)?;
    state.roster.unblock_number(&phone).await?;
    Ok(removed("Number unblocked", &phone))
}

async fn list_schedule(
    State(state): State<AppState>,
) -> Result<Json<Vec<ScheduleView>>, AdminError> {
    let entries = state.roster.list_schedule().await?;
    Ok(Json(entries.into_iter().map(ScheduleView::from).collect()))
}

async fn add_schedule(
    State(state): State<AppState>,
    Json(req): Json<NewScheduleEntry>,
) -> Result<(StatusCode, Json<ScheduleView>), AdminError> {
    let entry = state.roster.add_schedule_entry(req, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(entry.into())))
}

async fn remove_schedule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AdminError> {
    state.roster.remove_schedule_entry(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn close_thread(
    State(state): State<AppState>,
    Path(phone): Path<String>,
) -> Result<Json<serde_json::Value>, AdminError> {
    let phone = parse_caller(&phone)?;
    state.roster.close_thread(&phone).await?;
    Ok(removed("Thread closed", &phone))
}

async fn on_call(State(state): State<AppState>) -> Result<Json<OnCallNow>, AdminError> {
    Ok(Json(state.roster.on_call_now(Utc::now()).await?))
}
