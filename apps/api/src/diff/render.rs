//! HTML rendering for diff tokens.

use serde::Serialize;

use crate::diff::{DiffToken, Granularity};

const REMOVED_STYLE: &str = "background-color:#ffefef;border-radius:3px;padding:1px;margin:1px;";
const ADDED_STYLE: &str = "background-color:#eaffea;border-radius:3px;padding:1px;margin:1px;";

/// Token counts per kind, for a quick "how much changed" summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffStats {
    pub unchanged: usize,
    pub removed: usize,
    pub added: usize,
}

impl DiffStats {
    pub fn from_tokens(tokens: &[DiffToken]) -> Self {
        tokens.iter().fold(Self::default(), |mut stats, token| {
            match token {
                DiffToken::Unchanged(_) => stats.unchanged += 1,
                DiffToken::Removed(_) => stats.removed += 1,
                DiffToken::Added(_) => stats.added += 1,
            }
            stats
        })
    }

    pub fn has_changes(&self) -> bool {
        self.removed > 0 || self.added > 0
    }
}

/// Renders tokens as an HTML fragment: removed text in a "deleted" span,
/// added text in an "inserted" span, unchanged text plain.
pub fn render_html(tokens: &[DiffToken], granularity: Granularity) -> String {
    tokens
        .iter()
        .map(|token| {
            let text = escape_html(token.text());
            match token {
                DiffToken::Unchanged(_) => text,
                DiffToken::Removed(_) => {
                    format!(r#"<span class="diff-removed" style="{REMOVED_STYLE}">{text}</span>"#)
                }
                DiffToken::Added(_) => {
                    format!(r#"<span class="diff-added" style="{ADDED_STYLE}">{text}</span>"#)
                }
            }
        })
        .collect::<Vec<_>>()
        .join(granularity.separator())
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
