//! Tailoring Pipeline: orchestrates one tailoring request end to end.
//!
//! Flow: extract both uploads → build prompt → chat completion → word diff →
//!       (optional) cover letter prompt → chat completion → outcome.
//!
//! Nothing partial is returned: any failure, including the optional cover
//! letter, fails the whole request.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::diff::{highlight, render_html, DiffStats, DiffToken, Granularity};
use crate::errors::AppError;
use crate::extraction::{extract_upload, Upload};
use crate::llm_client::ChatClient;
use crate::render::{COVER_LETTER_FILENAME, RESUME_FILENAME};
use crate::tailoring::prompt_builder::{DocumentKind, Intensity, PromptBuilder, TailoringRequest};

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// Inputs for one tailoring run, as received from the client.
#[derive(Debug, Clone)]
pub struct TailorInput {
    pub resume: Upload,
    pub job_description: Upload,
    pub intensity: Intensity,
    pub include_cover_letter: bool,
}

/// Diff between the original and tailored text, ready for display.
#[derive(Debug, Clone, Serialize)]
pub struct DiffView {
    pub granularity: Granularity,
    pub tokens: Vec<DiffToken>,
    pub html: String,
    pub stats: DiffStats,
}

impl DiffView {
    pub fn compute(original: &str, revised: &str, granularity: Granularity) -> Self {
        let tokens = highlight(original, revised, granularity);
        let html = render_html(&tokens, granularity);
        let stats = DiffStats::from_tokens(&tokens);
        Self {
            granularity,
            tokens,
            html,
            stats,
        }
    }
}

/// Suggested filenames for the rendered downloads.
#[derive(Debug, Clone, Serialize)]
pub struct Downloads {
    pub resume_filename: String,
    pub cover_letter_filename: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TailoringOutcome {
    pub request_id: Uuid,
    pub original_text: String,
    pub tailored_text: String,
    pub intensity: Intensity,
    pub diff: DiffView,
    pub cover_letter: Option<String>,
    pub downloads: Downloads,
    pub model: String,
    pub generated_at: DateTime<Utc>,
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

/// Runs the full tailoring pipeline.
///
/// Steps:
/// 1. extract_upload() for resume and job description
/// 2. PromptBuilder::build() for the resume (Light or Deep)
/// 3. ChatClient::complete() → tailored text
/// 4. DiffView::compute() at word granularity
/// 5. If requested, cover letter prompt + completion
pub async fn run_tailoring(
    chat: &dyn ChatClient,
    builder: &PromptBuilder,
    input: TailorInput,
) -> Result<TailoringOutcome, AppError> {
    let request_id = Uuid::new_v4();
    info!(
        %request_id,
        "Tailoring request: resume='{}', jd='{}', intensity={:?}, cover_letter={}",
        input.resume.filename,
        input.job_description.filename,
        input.intensity,
        input.include_cover_letter
    );

    // Step 1: Extract both documents
    let resume = extract_upload(input.resume).await?;
    let job_description = extract_upload(input.job_description).await?;

    // Step 2-3: Tailor the resume
    let request = TailoringRequest::new(
        resume.text.as_str(),
        job_description.text.as_str(),
        input.intensity,
        DocumentKind::Resume,
    );
    let prompt = builder.build(&request)?;
    let tailored_text = chat
        .complete(&prompt.system_instruction, &prompt.user_prompt)
        .await?;
    info!(%request_id, "Tailored text received ({} chars)", tailored_text.len());

    // Step 4: Word-level diff
    let diff = DiffView::compute(&resume.text, &tailored_text, Granularity::Word);
    info!(
        %request_id,
        "Diff: {} unchanged, {} removed, {} added",
        diff.stats.unchanged, diff.stats.removed, diff.stats.added
    );
    if !diff.stats.has_changes() {
        warn!(%request_id, "Tailored text is identical to the original");
    }

    // Step 5: Optional cover letter
    let cover_letter = if input.include_cover_letter {
        Some(
            generate_cover_letter(
                chat,
                builder,
                &resume.text,
                &job_description.text,
                input.intensity,
            )
            .await?,
        )
    } else {
        None
    };

    Ok(TailoringOutcome {
        request_id,
        original_text: resume.text,
        tailored_text,
        intensity: input.intensity,
        diff,
        downloads: Downloads {
            resume_filename: RESUME_FILENAME.to_string(),
            cover_letter_filename: cover_letter
                .as_ref()
                .map(|_| COVER_LETTER_FILENAME.to_string()),
        },
        cover_letter,
        model: chat.model().to_string(),
        generated_at: Utc::now(),
    })
}

/// Generates a cover letter from already-extracted texts.
pub async fn generate_cover_letter(
    chat: &dyn ChatClient,
    builder: &PromptBuilder,
    resume_text: &str,
    job_description_text: &str,
    intensity: Intensity,
) -> Result<String, AppError> {
    let request = TailoringRequest::new(
        resume_text,
        job_description_text,
        intensity,
        DocumentKind::CoverLetter,
    );
    let prompt = builder.build(&request)?;
    let letter = chat
        .complete(&prompt.system_instruction, &prompt.user_prompt)
        .await?;
    info!("Cover letter generated ({} words)", letter.split_whitespace().count());
    Ok(letter)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
