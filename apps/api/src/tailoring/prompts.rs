// All LLM prompt constants for the Tailoring module.
// Placeholders are filled in a single pass by `prompt_builder::fill_template`.

/// System prompt for light resume tailoring.
pub const RESUME_LIGHT_SYSTEM: &str = "You are an expert resume writer. \
    Adjust only lightly: match keywords from the job description and make minimal wording updates. \
    Preserve the existing structure and section order. \
    Do not rewrite entire bullets.";

/// System prompt for deep resume tailoring.
pub const RESUME_DEEP_SYSTEM: &str = "You are an expert resume writer. \
    Rewrite bullets for strong alignment to the job description while preserving facts. \
    Never invent employers, titles, dates, degrees, or metrics that are not in the original resume.";

/// System prompt for cover letter generation. Used for both intensities.
pub const COVER_LETTER_SYSTEM: &str = "You are a professional career coach. \
    Write a concise, persuasive cover letter that highlights why the candidate is a good fit for the job. \
    Use the resume and job description as context.";

/// Resume tailoring prompt template.
/// Placeholders: {jd_text}, {resume_text}, {edit_instruction}
pub const RESUME_PROMPT_TEMPLATE: &str = "Job Description:
{jd_text}

Original Resume:
{resume_text}

{edit_instruction}";

pub const LIGHT_EDIT_INSTRUCTION: &str = "Return the tailored resume text. \
    Keep edits minimal: adjust keywords and phrasing only, and keep every line that does not need to change.";

pub const DEEP_EDIT_INSTRUCTION: &str = "Return the tailored resume text. \
    Rewrite it fully for strong alignment with the role, keeping every fact accurate.";

/// Cover letter prompt template.
/// Placeholders: {jd_text}, {resume_text}, {max_words}
pub const COVER_LETTER_PROMPT_TEMPLATE: &str = "Job Description:
{jd_text}

Resume:
{resume_text}

Write a professional cover letter (max {max_words} words).";
