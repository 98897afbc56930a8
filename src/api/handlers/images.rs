use crate::AppState;
use crate::config::ArtifactRetention;
use crate::errors::{Error, Result};
use crate::storage::{input_artifact_name, output_artifact_name};
use axum::{
    extract::{Multipart, State, multipart::MultipartError},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};

/// Map a multipart read failure onto the error taxonomy. The body-limit
/// layer surfaces oversized uploads as a 413 from the multipart stream;
/// everything else is a malformed request.
fn multipart_error(e: MultipartError) -> Error {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::PayloadTooLarge {
            message: "Uploaded image exceeds the maximum allowed size".to_string(),
        }
    } else {
        Error::Validation {
            message: format!("Failed to parse multipart data: {e}"),
        }
    }
}

/// POST /api/remove-background - Accept a multipart image upload, run it
/// through the removal capability, and serve the processed PNG back.
///
/// The request is one linear pass: validate, persist input, read it back,
/// invoke the model, persist output, respond. Content negotiation picks the
/// response shape: browser clients (an `Accept` header mentioning
/// `text/html`) get the image inline, everything else gets it as an
/// attachment named `result.png`.
pub async fn remove_background(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Response> {
    // Pull the image field out of the multipart stream. Other fields are
    // ignored for forward compatibility.
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("image") {
            continue;
        }

        let filename = field.file_name().unwrap_or("").to_string();
        let data = field.bytes().await.map_err(multipart_error)?;
        upload = Some((filename, data.to_vec()));
        break;
    }

    let Some((filename, data)) = upload else {
        return Err(Error::validation("No image file provided"));
    };
    if filename.is_empty() {
        return Err(Error::validation("No image selected"));
    }

    // Two independent identifiers: the artifact pair of this request is
    // keyed by randomness, not by any request id visible to the caller.
    let input_name = input_artifact_name(&filename);
    let output_name = output_artifact_name();

    state.store.write_input(&input_name, &data).await?;
    tracing::info!(artifact = %input_name, bytes = data.len(), "Saved input image");

    // Round trip through storage before invoking the model, serving the
    // output from disk afterwards. Artifacts written before any failure
    // point stay on disk.
    let input_bytes = state.store.read_input(&input_name).await?;

    let output_bytes = state.remover.remove(&input_bytes).await.map_err(Error::from)?;
    tracing::info!(artifact = %output_name, "Background removed successfully");

    state.store.write_output(&output_name, &output_bytes).await?;

    let served = state.store.read_output(&output_name).await?;

    if state.config.storage.retention == ArtifactRetention::DeleteAfterResponse {
        if let Err(e) = state.store.delete_pair(&input_name, &output_name).await {
            tracing::warn!(input = %input_name, output = %output_name, error = %e, "Failed to delete served artifacts");
        }
    }

    let wants_html = headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|accept| accept.contains("text/html"));

    let mut response = ([(header::CONTENT_TYPE, "image/png")], served).into_response();
    if !wants_html {
        response.headers_mut().insert(
            header::CONTENT_DISPOSITION,
            HeaderValue::from_static("attachment; filename=\"result.png\""),
        );
    }

    Ok(response)
}
