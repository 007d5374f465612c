//! Axum route handlers for the Tailoring API.

use std::collections::HashMap;

use axum::{
    extract::{Multipart, State},
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::diff::Granularity;
use crate::errors::AppError;
use crate::extraction::{extract_upload, ExtractedDocument, Upload};
use crate::render::{render_pdf, COVER_LETTER_FILENAME, RESUME_FILENAME};
use crate::state::AppState;
use crate::tailoring::pipeline::{
    generate_cover_letter, run_tailoring, DiffView, TailorInput, TailoringOutcome,
};
use crate::tailoring::prompt_builder::Intensity;
use crate::tailoring::session::SessionGuard;

/// Header carrying the caller's UI session id.
pub const SESSION_HEADER: &str = "x-session-id";

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DiffRequest {
    pub original: String,
    pub revised: String,
    #[serde(default)]
    pub granularity: Granularity,
}

#[derive(Debug, Deserialize)]
pub struct RenderRequest {
    pub text: String,
    pub filename: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CoverLetterResponse {
    pub cover_letter: String,
    pub filename: String,
}

/// Files and plain fields collected from a multipart body.
#[derive(Debug, Default)]
struct UploadForm {
    files: HashMap<String, Upload>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::InvalidRequest(format!("Malformed multipart body: {e}")))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(filename) => {
                    let bytes = field.bytes().await.map_err(|e| {
                        AppError::InvalidRequest(format!("Could not read upload '{name}': {e}"))
                    })?;
                    form.files.insert(name, Upload { filename, bytes });
                }
                None => {
                    let text = field.text().await.map_err(|e| {
                        AppError::InvalidRequest(format!("Could not read field '{name}': {e}"))
                    })?;
                    form.fields.insert(name, text);
                }
            }
        }

        Ok(form)
    }

    fn take_file(&mut self, name: &str) -> Result<Upload, AppError> {
        self.files
            .remove(name)
            .ok_or_else(|| AppError::InvalidRequest(format!("Missing file field '{name}'")))
    }

    fn intensity(&self) -> Result<Intensity, AppError> {
        match self.fields.get("intensity") {
            Some(raw) => Ok(raw.parse::<Intensity>()?),
            None => Ok(Intensity::default()),
        }
    }

    fn flag(&self, name: &str) -> Result<bool, AppError> {
        match self.fields.get(name).map(|v| v.trim().to_ascii_lowercase()) {
            None => Ok(false),
            Some(v) => match v.as_str() {
                "true" | "1" | "yes" | "on" => Ok(true),
                "false" | "0" | "no" | "off" | "" => Ok(false),
                _ => Err(AppError::InvalidRequest(format!(
                    "Field '{name}' must be true or false"
                ))),
            },
        }
    }
}

/// Claims the caller's session slot, if the caller identified a session.
fn claim_session(state: &AppState, headers: &HeaderMap) -> Result<Option<SessionGuard>, AppError> {
    let Some(session_id) = headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
    else {
        return Ok(None);
    };

    state.sessions.try_acquire(session_id).map(Some).ok_or_else(|| {
        AppError::Conflict(
            "A tailoring request is already in progress for this session".to_string(),
        )
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/tailor
///
/// Multipart: `resume` (file), `job_description` (file), `intensity`
/// (`light` | `deep`), `include_cover_letter` (bool).
/// Returns the tailored text, its word diff against the original, and the
/// optional cover letter.
pub async fn handle_tailor(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<TailoringOutcome>, AppError> {
    let _session = claim_session(&state, &headers)?;

    let mut form = UploadForm::read(multipart).await?;
    let input = TailorInput {
        resume: form.take_file("resume")?,
        job_description: form.take_file("job_description")?,
        intensity: form.intensity()?,
        include_cover_letter: form.flag("include_cover_letter")?,
    };

    let outcome = run_tailoring(state.chat.as_ref(), &state.prompt_builder, input).await?;
    Ok(Json(outcome))
}

/// POST /api/v1/cover-letter
///
/// Multipart: `resume` (file), `job_description` (file).
pub async fn handle_cover_letter(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<CoverLetterResponse>, AppError> {
    let _session = claim_session(&state, &headers)?;

    let mut form = UploadForm::read(multipart).await?;
    let intensity = form.intensity()?;
    let resume = extract_upload(form.take_file("resume")?).await?;
    let job_description = extract_upload(form.take_file("job_description")?).await?;

    let cover_letter = generate_cover_letter(
        state.chat.as_ref(),
        &state.prompt_builder,
        &resume.text,
        &job_description.text,
        intensity,
    )
    .await?;

    Ok(Json(CoverLetterResponse {
        cover_letter,
        filename: COVER_LETTER_FILENAME.to_string(),
    }))
}

/// POST /api/v1/diff
pub async fn handle_diff(Json(request): Json<DiffRequest>) -> Json<DiffView> {
    Json(DiffView::compute(
        &request.original,
        &request.revised,
        request.granularity,
    ))
}

/// POST /api/v1/render
///
/// Returns the text laid out as a PDF attachment.
pub async fn handle_render(Json(request): Json<RenderRequest>) -> Result<Response, AppError> {
    let filename = sanitize_filename(request.filename.as_deref());
    let title = filename.trim_end_matches(".pdf").replace('_', " ");

    let pdf = tokio::task::spawn_blocking(move || render_pdf(&request.text, &title))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in render: {e}")))??;

    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid content disposition: {e}")))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        pdf,
    )
        .into_response())
}

/// POST /api/v1/extract
///
/// Multipart: `file`. Returns the detected format and extracted text.
pub async fn handle_extract(multipart: Multipart) -> Result<Json<ExtractedDocument>, AppError> {
    let mut form = UploadForm::read(multipart).await?;
    let document = extract_upload(form.take_file("file")?).await?;
    Ok(Json(document))
}

/// Keeps `[A-Za-z0-9._-]`, forces a `.pdf` suffix, and falls back to the
/// tailored-resume default when nothing usable remains.
fn sanitize_filename(requested: Option<&str>) -> String {
    let cleaned: String = requested
        .unwrap_or_default()
        .chars()
        .map(|c| if c == ' ' { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    let stem = cleaned.trim_end_matches(".pdf").trim_matches('.');

    if stem.is_empty() {
        RESUME_FILENAME.to_string()
    } else {
        format!("{stem}.pdf")
    }
}
