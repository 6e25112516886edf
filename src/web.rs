use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use tokio_util::io::{ReaderStream, StreamReader};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, StorageError};
use crate::ingest::ContentService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ContentService>,
    // Cancelled on shutdown; requests run under child tokens.
    pub shutdown: CancellationToken,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize)]
struct DeleteResponse {}

#[derive(Debug, Deserialize)]
pub struct FileQuery {
    #[serde(rename = "fileName")]
    pub file_name: String,
}

pub fn router(state: AppState, prefix: &str, max_upload_bytes: usize) -> Router {
    let path = format!("{}/file", prefix.trim_end_matches('/'));
    Router::new()
        .route(
            &path,
            post(create_file)
                .get(read_file)
                .delete(delete_file)
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .with_state(state)
}

fn json_error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

pub fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::Storage(StorageError::NotFound(_)) => StatusCode::NOT_FOUND,
        Error::Storage(StorageError::InvalidName(_)) => StatusCode::BAD_REQUEST,
        Error::Storage(StorageError::Conflict(_)) => StatusCode::CONFLICT,
        Error::Storage(StorageError::Io { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
        Error::Preview(_) => StatusCode::UNPROCESSABLE_ENTITY,
        Error::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn error_response(err: &Error) -> Response {
    json_error(status_for(err), &err.to_string())
}

pub async fn create_file(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return json_error(StatusCode::BAD_REQUEST, "no file field in form"),
            Err(err) => {
                return json_error(StatusCode::BAD_REQUEST, &format!("invalid form: {err}"));
            }
        };
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let body = field.map_err(std::io::Error::other);
        let mut reader = StreamReader::new(Box::pin(body));
        let cancel = state.shutdown.child_token();

        return match state.service.save(&file_name, &mut reader, &cancel).await {
            Ok(result) => (StatusCode::OK, Json(result)).into_response(),
            Err(err) => error_response(&err),
        };
    }
}

pub async fn read_file(State(state): State<AppState>, Query(query): Query<FileQuery>) -> Response {
    let stored = match state.service.read(&query.file_name).await {
        Ok(stored) => stored,
        Err(err) => return error_response(&err),
    };

    let headers = [
        (header::CONTENT_TYPE, stored.content_type.to_string()),
        (header::CONTENT_LENGTH, stored.size_bytes.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{}\"", stored.name),
        ),
    ];
    let body = Body::from_stream(ReaderStream::new(stored.file));
    (StatusCode::OK, headers, body).into_response()
}

pub async fn delete_file(State(state): State<AppState>, Query(query): Query<FileQuery>) -> Response {
    match state.service.delete(&query.file_name).await {
        Ok(()) => (StatusCode::OK, Json(DeleteResponse {})).into_response(),
        Err(err) => error_response(&err),
    }
}
