use axum::{
    extract::{Form, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;

use dispatch_core::phone::Phone;
use dispatch_ports::error::HandleError;
use dispatch_ports::types::{CallStatusUpdate, DialStatus, InboundCall, InboundMessage, Reply};

use super::{AppState, WebhookError};
use crate::twiml;

#[derive(Debug, Deserialize)]
pub struct SmsForm {
    #[serde(rename = "From", default)]
    from: String,
    #[serde(rename = "Body", default)]
    body: String,
}

#[derive(Debug, Deserialize)]
pub struct VoiceForm {
    #[serde(rename = "From", default)]
    from: String,
    #[serde(rename = "CallSid", default)]
    call_sid: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    #[serde(rename = "From", default)]
    from: String,
    #[serde(rename = "CallSid", default)]
    call_sid: String,
    #[serde(rename = "DialCallStatus", default)]
    dial_call_status: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    from: Option<String>,
}

fn caller(from: &str) -> Result<Phone, WebhookError> {
    if from.trim().is_empty() {
        return Err(WebhookError(HandleError::Rejected(
            "From number is required".into(),
        )));
    }
    Phone::caller(from).map_err(|e| WebhookError(HandleError::Rejected(e.to_string())))
}

fn twiml_response(reply: &Reply, token: &str) -> Response {
    (
        [(header::CONTENT_TYPE, "text/xml")],
        twiml::render(reply, token),
    )
        .into_response()
}

pub async fn sms(
    State(state): State<AppState>,
    Form(form): Form<SmsForm>,
) -> Result<Response, WebhookError> {
    let from = caller(&form.from)?;
    tracing::info!(from = %from, "received sms");

    let reply = state
        .contacts
        .receive_message(
            InboundMessage {
                from,
                body: form.body,
            },
            Utc::now(),
        )
        .await
        .map_err(WebhookError)?;

    Ok(twiml_response(&reply, &state.auth_token))
}

pub async fn voice(
    State(state): State<AppState>,
    Form(form): Form<VoiceForm>,
) -> Result<Response, WebhookError> {
    let from = caller(&form.from)?;

    let reply = state
        .contacts
        .receive_call(
            InboundCall {
                from,
                call_sid: form.call_sid,
            },
            Utc::now(),
        )
        .await
        .map_err(WebhookError)?;

    Ok(twiml_response(&reply, &state.auth_token))
}

/// Dial `action` callback. The caller comes from the callback query, falling
/// back to the form's `From`.
pub async fn voice_status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
    Form(form): Form<StatusForm>,
) -> Result<Response, WebhookError> {
    let from = caller(query.from.as_deref().unwrap_or(&form.from))?;

    let reply = state
        .contacts
        .receive_call_status(
            CallStatusUpdate {
                from,
                call_sid: form.call_sid,
                dial_status: DialStatus::parse(&form.dial_call_status),
            },
            Utc::now(),
        )
        .await
        .map_err(WebhookError)?;

    Ok(twiml_response(&reply, &state.auth_token))
}
