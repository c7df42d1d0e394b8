// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::management::mappings::{
    EntityOptionsRequest, MappingDeleteRequest, MappingListRequest, MappingShowRequest,
    MappingUpdateRequest,
};
use crate::management::{
    EditSession, FailureResponse, FormChanges, ManagementCommand, ManagementErrorKind,
    ManagementResponse, MappingCommand, MappingError, RecordId, RequestOrigin, ResponsePayload,
};

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    messages: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBody {
    #[serde(default)]
    category: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct FormStartBody {
    #[serde(default)]
    id: Option<RecordId>,
}

#[derive(Debug, Deserialize)]
pub struct FormChangeBody {
    session: EditSession,
    #[serde(default)]
    changes: FormChanges,
}

#[derive(Debug, Deserialize)]
pub struct FormSessionBody {
    session: EditSession,
}

#[derive(Serialize)]
struct FormResponse {
    session: EditSession,
    changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

fn status_for(kind: ManagementErrorKind) -> StatusCode {
    match kind {
        ManagementErrorKind::Validation => StatusCode::BAD_REQUEST,
        ManagementErrorKind::NotFound => StatusCode::NOT_FOUND,
        ManagementErrorKind::Conflict => StatusCode::CONFLICT,
        ManagementErrorKind::Busy => StatusCode::SERVICE_UNAVAILABLE,
        ManagementErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_code(kind: ManagementErrorKind) -> &'static str {
    match kind {
        ManagementErrorKind::Validation => "validation",
        ManagementErrorKind::NotFound => "not_found",
        ManagementErrorKind::Conflict => "conflict",
        ManagementErrorKind::Busy => "busy",
        ManagementErrorKind::Internal => "internal",
    }
}

pub(crate) fn error_response(kind: ManagementErrorKind, message: impl Into<String>) -> HttpResponse {
    HttpResponse::build(status_for(kind)).json(ErrorBody {
        error: error_code(kind),
        messages: vec![message.into()],
    })
}

fn failure_response(failure: &FailureResponse) -> HttpResponse {
    HttpResponse::build(status_for(failure.kind)).json(failure)
}

fn mapping_error_response(err: &MappingError) -> HttpResponse {
    failure_response(&err.to_failure())
}

async fn send(state: &AppState, command: MappingCommand) -> Result<ManagementResponse, HttpResponse> {
    state
        .management_bus
        .send(RequestOrigin::Http, ManagementCommand::Mappings(command))
        .await
        .map_err(|err| {
            log::debug!("Management request failed: {}", err);
            error_response(err.kind(), err.message())
        })
}

fn render(response: ManagementResponse, success: StatusCode) -> HttpResponse {
    match response.payload {
        ResponsePayload::Failure(failure) => failure_response(&failure),
        ResponsePayload::Message(message) => HttpResponse::build(success).json(message),
        ResponsePayload::MappingList(list) => HttpResponse::build(success).json(list),
        ResponsePayload::MappingShow(shown) => HttpResponse::build(success).json(shown),
        ResponsePayload::EntityOptions(options) => HttpResponse::build(success).json(options),
        ResponsePayload::CategoryList(categories) => HttpResponse::build(success).json(categories),
    }
}

async fn dispatch(state: &AppState, command: MappingCommand, success: StatusCode) -> HttpResponse {
    match send(state, command).await {
        Ok(response) => render(response, success),
        Err(response) => response,
    }
}

pub async fn list_mappings(state: web::Data<AppState>) -> HttpResponse {
    dispatch(
        &state,
        MappingCommand::List(MappingListRequest {}),
        StatusCode::OK,
    )
    .await
}

pub async fn add_mapping(
    state: web::Data<AppState>,
    body: web::Json<crate::management::mappings::MappingAddRequest>,
) -> HttpResponse {
    dispatch(
        &state,
        MappingCommand::Add(body.into_inner()),
        StatusCode::CREATED,
    )
    .await
}

pub async fn show_mapping(state: web::Data<AppState>, path: web::Path<RecordId>) -> HttpResponse {
    dispatch(
        &state,
        MappingCommand::Show(MappingShowRequest {
            id: path.into_inner(),
        }),
        StatusCode::OK,
    )
    .await
}

pub async fn update_mapping(
    state: web::Data<AppState>,
    path: web::Path<RecordId>,
    body: web::Json<UpdateBody>,
) -> HttpResponse {
    dispatch(
        &state,
        MappingCommand::Update(MappingUpdateRequest {
            id: path.into_inner(),
            category: body.into_inner().category,
        }),
        StatusCode::OK,
    )
    .await
}

pub async fn delete_mapping(state: web::Data<AppState>, path: web::Path<RecordId>) -> HttpResponse {
    dispatch(
        &state,
        MappingCommand::Delete(MappingDeleteRequest {
            id: path.into_inner(),
        }),
        StatusCode::OK,
    )
    .await
}

pub async fn list_entities(state: web::Data<AppState>) -> HttpResponse {
    dispatch(
        &state,
        MappingCommand::Entities(EntityOptionsRequest {}),
        StatusCode::OK,
    )
    .await
}

fn form_response(session: EditSession, message: Option<String>) -> HttpResponse {
    let changed = session.changed();
    HttpResponse::Ok().json(FormResponse {
        session,
        changed,
        message,
    })
}

/// An empty body starts a new mapping; anything else must be a JSON `FormStartBody`.
fn parse_form_start(body: &[u8]) -> Result<FormStartBody, HttpResponse> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(FormStartBody::default());
    }
    serde_json::from_slice(body).map_err(|err| {
        error_response(
            ManagementErrorKind::Validation,
            format!("Json deserialize error: {}", err),
        )
    })
}

/// Opens an edit session for a new mapping, or for `id` when given.
pub async fn start_form(state: web::Data<AppState>, body: web::Bytes) -> HttpResponse {
    let id = match parse_form_start(&body) {
        Ok(start) => start.id,
        Err(response) => return response,
    };
    let Some(id) = id else {
        return form_response(EditSession::new_mapping(), None);
    };
    let response = match send(&state, MappingCommand::Show(MappingShowRequest { id })).await {
        Ok(response) => response,
        Err(response) => return response,
    };
    match response.payload {
        ResponsePayload::MappingShow(shown) => {
            form_response(EditSession::for_mapping(&shown), None)
        }
        other => render(
            ManagementResponse {
                payload: other,
                ..response
            },
            StatusCode::OK,
        ),
    }
}

pub async fn form_changed(body: web::Json<FormChangeBody>) -> HttpResponse {
    let FormChangeBody {
        mut session,
        changes,
    } = body.into_inner();
    if let Err(err) = session.validate_key() {
        return mapping_error_response(&err);
    }
    session.apply(changes);
    form_response(session, None)
}

pub async fn form_reset(body: web::Json<FormSessionBody>) -> HttpResponse {
    let mut session = body.into_inner().session;
    if let Err(err) = session.validate_key() {
        return mapping_error_response(&err);
    }
    let message = session.reset().to_string();
    form_response(session, Some(message))
}

pub async fn form_cancel(body: web::Json<FormSessionBody>) -> HttpResponse {
    let session = body.into_inner().session;
    if let Err(err) = session.validate_key() {
        return mapping_error_response(&err);
    }
    let message = session.cancel_message();
    form_response(session, Some(message))
}

pub async fn form_submit(state: web::Data<AppState>, body: web::Json<FormSessionBody>) -> HttpResponse {
    let session = body.into_inner().session;
    let command = match session.submit() {
        Ok(command) => command,
        Err(err) => return mapping_error_response(&err),
    };
    let success = if session.is_new() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    dispatch(&state, command, success).await
}
