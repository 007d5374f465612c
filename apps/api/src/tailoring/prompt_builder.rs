//! Prompt Builder: the single policy point mapping a tailoring request to the
//! (system instruction, user prompt) pair sent to the chat model.
//!
//! | kind         | intensity | system                 | user prompt                        |
//! |--------------|-----------|------------------------|------------------------------------|
//! | Resume       | Light     | `RESUME_LIGHT_SYSTEM`  | JD + resume + minimal-edit ask     |
//! | Resume       | Deep      | `RESUME_DEEP_SYSTEM`   | JD + resume + full-rewrite ask     |
//! | CoverLetter  | any       | `COVER_LETTER_SYSTEM`  | JD + resume + word-bounded letter  |
//!
//! Both input texts are embedded verbatim. Oversized prompts are rejected, never truncated.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;
use crate::tailoring::prompts::{
    COVER_LETTER_PROMPT_TEMPLATE, COVER_LETTER_SYSTEM, DEEP_EDIT_INSTRUCTION,
    LIGHT_EDIT_INSTRUCTION, RESUME_DEEP_SYSTEM, RESUME_LIGHT_SYSTEM, RESUME_PROMPT_TEMPLATE,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PromptError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Prompt is {length} characters, over the {limit} character limit")]
    PromptTooLong { length: usize, limit: usize },
}

// ────────────────────────────────────────────────────────────────────────────
// Request / output types
// ────────────────────────────────────────────────────────────────────────────

/// How far the model may move away from the original wording.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intensity {
    /// Keyword and phrasing touch-ups.
    #[default]
    Light,
    /// Structural rewrite of bullets.
    Deep,
}

impl FromStr for Intensity {
    type Err = PromptError;

    /// Accepts `light`/`deep` and the two radio labels of the web form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" | "light (keyword adjust)" => Ok(Intensity::Light),
            "deep" | "deep (rewrite bullets)" => Ok(Intensity::Deep),
            _ => Err(PromptError::InvalidRequest(format!(
                "intensity must be 'light' or 'deep', got '{s}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Resume,
    CoverLetter,
}

/// Everything the builder needs for one prompt. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailoringRequest {
    original_text: String,
    job_description_text: String,
    intensity: Intensity,
    document_kind: DocumentKind,
}

impl TailoringRequest {
    pub fn new(
        original_text: impl Into<String>,
        job_description_text: impl Into<String>,
        intensity: Intensity,
        document_kind: DocumentKind,
    ) -> Self {
        Self {
            original_text: original_text.into(),
            job_description_text: job_description_text.into(),
            intensity,
            document_kind,
        }
    }

    pub fn original_text(&self) -> &str {
        &self.original_text
    }

    pub fn job_description_text(&self) -> &str {
        &self.job_description_text
    }

    pub fn intensity(&self) -> Intensity {
        self.intensity
    }

    pub fn document_kind(&self) -> DocumentKind {
        self.document_kind
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptPair {
    pub system_instruction: String,
    pub user_prompt: String,
}

impl PromptPair {
    /// Combined length in characters, the unit the prompt cap is expressed in.
    pub fn char_len(&self) -> usize {
        self.system_instruction.chars().count() + self.user_prompt.chars().count()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Builder
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PromptBuilder {
    /// `None` disables the cap.
    max_prompt_chars: Option<usize>,
    cover_letter_max_words: u32,
}

impl PromptBuilder {
    pub fn new(max_prompt_chars: Option<usize>, cover_letter_max_words: u32) -> Self {
        Self {
            max_prompt_chars,
            cover_letter_max_words,
        }
    }

    /// `MAX_PROMPT_CHARS=0` means no cap.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Some(config.max_prompt_chars).filter(|&limit| limit > 0),
            config.cover_letter_max_words,
        )
    }

    pub fn build(&self, request: &TailoringRequest) -> Result<PromptPair, PromptError> {
        if request.original_text().trim().is_empty() {
            return Err(PromptError::InvalidRequest(
                "original document text is empty".to_string(),
            ));
        }
        if request.job_description_text().trim().is_empty() {
            return Err(PromptError::InvalidRequest(
                "job description text is empty".to_string(),
            ));
        }

        let jd = request.job_description_text();
        let resume = request.original_text();

        let pair = match (request.document_kind(), request.intensity()) {
            (DocumentKind::CoverLetter, _) => {
                let max_words = self.cover_letter_max_words.to_string();
                PromptPair {
                    system_instruction: COVER_LETTER_SYSTEM.to_string(),
                    user_prompt: fill_template(
                        COVER_LETTER_PROMPT_TEMPLATE,
                        &[
                            ("jd_text", jd),
                            ("resume_text", resume),
                            ("max_words", &max_words),
                        ],
                    ),
                }
            }
            (DocumentKind::Resume, intensity) => {
                let (system, instruction) = match intensity {
                    Intensity::Light => (RESUME_LIGHT_SYSTEM, LIGHT_EDIT_INSTRUCTION),
                    Intensity::Deep => (RESUME_DEEP_SYSTEM, DEEP_EDIT_INSTRUCTION),
                };
                PromptPair {
                    system_instruction: system.to_string(),
                    user_prompt: fill_template(
                        RESUME_PROMPT_TEMPLATE,
                        &[
                            ("jd_text", jd),
                            ("resume_text", resume),
                            ("edit_instruction", instruction),
                        ],
                    ),
                }
            }
        };

        if let Some(limit) = self.max_prompt_chars {
            let length = pair.char_len();
            if length > limit {
                return Err(PromptError::PromptTooLong { length, limit });
            }
        }

        Ok(pair)
    }
}

/// Replaces `{key}` placeholders in one left-to-right pass. Substituted values
/// are never rescanned, so braces inside user text survive untouched.
/// Unknown placeholders are left as-is.
pub(crate) fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let extra: usize = values.iter().map(|(_, v)| v.len()).sum();
    let mut out = String::with_capacity(template.len() + extra);
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];

        let substitution = after.find('}').and_then(|end| {
            let key = &after[..end];
            values
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, value)| (end, *value))
        });

        match substitution {
            Some((end, value)) => {
                out.push_str(value);
                rest = &after[end + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
