//! Art generation endpoint.
//!
//! Accepts a multipart form with an optional `image`, an optional `video`
//! and an optional `prompt`. At least one file is required and each file is
//! capped at `ArtState::max_upload_bytes`.

use axum::{
    Json,
    extract::{
        Extension, Multipart,
        multipart::{Field, MultipartError, MultipartRejection},
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Instant};
use tracing::{error, info};
use utoipa::ToSchema;

use crate::art::{ArtProvider, ArtRequest, UploadedFile, format_size};

use super::{ErrorResponse, auth::AuthState, auth::session::authenticate_request, error_response};

pub struct ArtState {
    provider: Arc<dyn ArtProvider>,
    max_upload_bytes: usize,
}

impl ArtState {
    pub fn new(provider: Arc<dyn ArtProvider>, max_upload_bytes: usize) -> Self {
        Self {
            provider,
            max_upload_bytes,
        }
    }

    #[must_use]
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    #[must_use]
    pub fn provider(&self) -> &dyn ArtProvider {
        self.provider.as_ref()
    }
}

/// Documents the multipart form; the handler reads it field by field.
#[derive(ToSchema, Debug)]
#[allow(dead_code)]
pub struct ArtUpload {
    #[schema(value_type = Option<String>, format = Binary)]
    image: Option<Vec<u8>>,
    #[schema(value_type = Option<String>, format = Binary)]
    video: Option<Vec<u8>>,
    prompt: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ArtInputs {
    pub image: String,
    pub video: String,
    pub image_size: String,
    pub video_size: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ArtResponse {
    pub success: bool,
    pub message: String,
    pub art_url: String,
    pub processing_time: String,
    pub style: String,
    pub prompt_used: String,
    pub provider: String,
    pub inputs: ArtInputs,
}

#[utoipa::path(
    post,
    path = "/api/generate-art",
    request_body(content = ArtUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Art generated", body = ArtResponse),
        (status = 400, description = "Invalid upload", body = ErrorResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 500, description = "Provider failure", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "art"
)]
pub async fn generate_art(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    art_state: Extension<Arc<ArtState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> impl IntoResponse {
    let identity = match authenticate_request(&headers, &auth_state).await {
        Ok(identity) => identity,
        Err(response) => return response,
    };

    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            return error_response(StatusCode::BAD_REQUEST, rejection.body_text(), None);
        }
    };

    let start = Instant::now();

    let mut request = ArtRequest {
        requested_by: identity.email,
        image: None,
        video: None,
        prompt: None,
    };

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => return multipart_error_response(&err),
        };

        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" | "video" => {
                let slot = if name == "image" {
                    &mut request.image
                } else {
                    &mut request.video
                };
                if slot.is_some() {
                    return error_response(
                        StatusCode::BAD_REQUEST,
                        format!("Only one {name} file is allowed"),
                        None,
                    );
                }
                match read_file(field, &name, art_state.max_upload_bytes).await {
                    Ok(file) => *slot = Some(file),
                    Err(response) => return response,
                }
            }
            "prompt" => match field.text().await {
                Ok(text) => request.prompt = Some(text),
                Err(err) => return multipart_error_response(&err),
            },
            _ => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    format!("Unexpected field: {name}"),
                    None,
                );
            }
        }
    }

    if request.image.is_none() && request.video.is_none() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Please upload at least one image or video file",
            None,
        );
    }

    info!(
        image = request.image.as_ref().map(UploadedFile::size),
        video = request.video.as_ref().map(UploadedFile::size),
        "art generation requested"
    );

    let result = match art_state.provider().generate(&request) {
        Ok(result) => result,
        Err(err) => {
            error!("Art generation failed: {err:#}");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Art generation failed",
                None,
            );
        }
    };

    let response = ArtResponse {
        success: true,
        message: request.message().to_string(),
        art_url: result.art_url,
        processing_time: format!("{:.1}s", start.elapsed().as_secs_f64()),
        style: request.style(),
        prompt_used: request.prompt_used().to_string(),
        provider: result.provider,
        inputs: inputs(&request),
    };

    (StatusCode::OK, Json(response)).into_response()
}

/// Read one file field, enforcing its mime family and the size cap.
async fn read_file(
    mut field: Field<'_>,
    kind: &str,
    max_bytes: usize,
) -> Result<UploadedFile, Response> {
    let content_type = field.content_type().unwrap_or_default().to_string();
    if !content_type.starts_with(&format!("{kind}/")) {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            format!("Only {kind} files are allowed in the {kind} field"),
            None,
        ));
    }

    let file_name = field.file_name().unwrap_or_default().to_string();
    let mut data = Vec::new();
    loop {
        match field.chunk().await {
            Ok(Some(chunk)) => {
                if data.len() + chunk.len() > max_bytes {
                    return Err(error_response(
                        StatusCode::PAYLOAD_TOO_LARGE,
                        format!(
                            "{} file too large. Maximum size is {}.",
                            capitalize(kind),
                            format_size(max_bytes)
                        ),
                        None,
                    ));
                }
                data.extend_from_slice(&chunk);
            }
            Ok(None) => break,
            Err(err) => return Err(multipart_error_response(&err)),
        }
    }

    Ok(UploadedFile {
        file_name,
        content_type,
        data,
    })
}

fn multipart_error_response(err: &MultipartError) -> Response {
    let status = err.status();
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        return error_response(status, "Upload too large", None);
    }
    error_response(StatusCode::BAD_REQUEST, err.body_text(), None)
}

fn inputs(request: &ArtRequest) -> ArtInputs {
    let uploaded = |file: Option<&UploadedFile>| {
        let label = if file.is_some() { "Uploaded" } else { "None" };
        label.to_string()
    };
    let size = |file: Option<&UploadedFile>| {
        file.map_or_else(|| "None".to_string(), |file| format_size(file.size()))
    };

    ArtInputs {
        image: uploaded(request.image.as_ref()),
        video: uploaded(request.video.as_ref()),
        image_size: size(request.image.as_ref()),
        video_size: size(request.video.as_ref()),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}
