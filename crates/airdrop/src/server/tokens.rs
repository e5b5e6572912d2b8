use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use airdrop_core::tokens::{
    account_field, parse_ended_flag, AccountAdded, AccountRemoved, NewToken, TokenDeleted,
    TokenFilter, TokenPatch, TokenRecord, Verification, VerifyOutcome,
};

use super::error::{error_body, map_token_error, AppError};
use super::SharedState;

// ==============================================================================
// DTOs
// ==============================================================================

#[derive(Serialize)]
pub(super) struct Envelope<T> {
    success: bool,
    message: &'static str,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    total: Option<usize>,
}

impl<T> Envelope<T> {
    fn ok(message: &'static str, data: T) -> Self {
        Self {
            success: true,
            message,
            data,
            total: None,
        }
    }
}

#[derive(Deserialize)]
pub(super) struct ListQuery {
    name: Option<String>,
    ended: Option<String>,
}

/// Request bodies are optional and loosely typed; an empty body reads as
/// `null` so every field falls back to its default.
fn parse_body(body: &Bytes) -> Result<Value, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body).map_err(|e| AppError::BadRequest(format!("invalid JSON body: {e}")))
}

// ==============================================================================
// Handlers
// ==============================================================================

pub(super) async fn list_tokens(
    State(state): State<SharedState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<TokenRecord>>, AppError> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let filter = TokenFilter {
        name: query.name,
        ended: query.ended.as_deref().map(parse_ended_flag),
    };
    let records = state
        .tokens
        .list_tokens(&filter)
        .await
        .map_err(map_token_error)?;
    Ok(Json(records))
}

pub(super) async fn issue_token(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Envelope<TokenRecord>>), AppError> {
    let body = parse_body(&body)?;
    let issued = state
        .tokens
        .issue_token(NewToken::from_json(&body))
        .await
        .map_err(map_token_error)?;

    Ok((
        StatusCode::CREATED,
        Json(Envelope {
            total: Some(issued.total),
            ..Envelope::ok("Token created successfully", issued.record)
        }),
    ))
}

pub(super) async fn update_token(
    State(state): State<SharedState>,
    Path(token): Path<String>,
    body: Bytes,
) -> Result<Json<Envelope<TokenRecord>>, AppError> {
    let body = parse_body(&body)?;
    let patch = TokenPatch::from_json(&body).map_err(map_token_error)?;
    let record = state
        .tokens
        .update_token(&token, patch)
        .await
        .map_err(map_token_error)?;
    Ok(Json(Envelope::ok("Token updated successfully", record)))
}

pub(super) async fn delete_token(
    State(state): State<SharedState>,
    Path(token): Path<String>,
) -> Result<Json<Envelope<TokenDeleted>>, AppError> {
    let deleted = state
        .tokens
        .delete_token(&token)
        .await
        .map_err(map_token_error)?;
    Ok(Json(Envelope::ok("Token deleted successfully", deleted)))
}

pub(super) async fn add_account(
    State(state): State<SharedState>,
    Path(token): Path<String>,
    body: Bytes,
) -> Result<Json<Envelope<AccountAdded>>, AppError> {
    let body = parse_body(&body)?;
    let added = state
        .tokens
        .add_account(&token, account_field(&body))
        .await
        .map_err(map_token_error)?;
    Ok(Json(Envelope::ok("Account added successfully", added)))
}

pub(super) async fn remove_account(
    State(state): State<SharedState>,
    Path(token): Path<String>,
    body: Bytes,
) -> Result<Json<Envelope<AccountRemoved>>, AppError> {
    let body = parse_body(&body)?;
    let removed = state
        .tokens
        .remove_account(&token, account_field(&body))
        .await
        .map_err(map_token_error)?;
    Ok(Json(Envelope::ok("Account deleted successfully", removed)))
}

pub(super) async fn verify_account(
    State(state): State<SharedState>,
    Path(token): Path<String>,
    body: Bytes,
) -> Result<Response, AppError> {
    let body = parse_body(&body)?;
    let outcome = state
        .tokens
        .verify_account(&token, account_field(&body))
        .await
        .map_err(map_token_error)?;

    Ok(match outcome {
        VerifyOutcome::Checked(verification) => {
            Json(Envelope::<Verification>::ok("Verification completed", verification))
                .into_response()
        }
        VerifyOutcome::UnknownToken { .. } => {
            let mut body = error_body(StatusCode::NOT_FOUND, "Token not found");
            body.insert("exists".into(), Value::Bool(false));
            (StatusCode::NOT_FOUND, Json(body)).into_response()
        }
    })
}
