//! Diff Highlighter: aligns an original and a revised text token by token.
//!
//! Tokens are whitespace-delimited words (resumes) or whole lines. The edit script
//! comes from a longest-common-subsequence table over the region left after
//! trimming the common prefix and suffix. Within every run of changes, removals
//! are emitted before additions so the rendered diff reads as "old → new" blocks.

pub mod render;

use serde::{Deserialize, Serialize};
use tracing::warn;

pub use render::{render_html, DiffStats};

/// Upper bound on LCS table cells (u32 each). Larger middles degrade to a
/// whole-block replacement rather than allocating unbounded memory.
const MAX_TABLE_CELLS: usize = 8_000_000;

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// The unit the two texts are compared in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    #[default]
    Word,
    Line,
}

impl Granularity {
    pub fn tokenize(self, text: &str) -> Vec<&str> {
        match self {
            Granularity::Word => text.split_whitespace().collect(),
            Granularity::Line => text.lines().collect(),
        }
    }

    /// Natural separator used when joining tokens back together.
    pub fn separator(self) -> &'static str {
        match self {
            Granularity::Word => " ",
            Granularity::Line => "\n",
        }
    }
}

/// One aligned token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum DiffToken {
    Unchanged(String),
    Removed(String),
    Added(String),
}

impl DiffToken {
    pub fn text(&self) -> &str {
        match self {
            DiffToken::Unchanged(t) | DiffToken::Removed(t) | DiffToken::Added(t) => t,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Public API
// ────────────────────────────────────────────────────────────────────────────

/// Aligns `original` against `revised`. Total over all inputs.
pub fn highlight(original: &str, revised: &str, granularity: Granularity) -> Vec<DiffToken> {
    let old = granularity.tokenize(original);
    let new = granularity.tokenize(revised);
    group_changes(align(&old, &new))
}

// ────────────────────────────────────────────────────────────────────────────
// Alignment
// ────────────────────────────────────────────────────────────────────────────

fn align(old: &[&str], new: &[&str]) -> Vec<DiffToken> {
    let prefix = old.iter().zip(new).take_while(|(a, b)| a == b).count();
    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let a = &old[prefix..old.len() - suffix];
    let b = &new[prefix..new.len() - suffix];

    let mut tokens = Vec::with_capacity(old.len().max(new.len()));
    tokens.extend(old[..prefix].iter().map(|t| DiffToken::Unchanged(t.to_string())));

    if (a.len() + 1).saturating_mul(b.len() + 1) > MAX_TABLE_CELLS {
        warn!(
            "Diff middle too large for LCS table ({} x {} tokens), emitting block replacement",
            a.len(),
            b.len()
        );
        tokens.extend(a.iter().map(|t| DiffToken::Removed(t.to_string())));
        tokens.extend(b.iter().map(|t| DiffToken::Added(t.to_string())));
    } else {
        lcs_walk(a, b, &mut tokens);
    }

    tokens.extend(
        old[old.len() - suffix..]
            .iter()
            .map(|t| DiffToken::Unchanged(t.to_string())),
    );
    tokens
}

/// Emits the edit script for `a` → `b` using a suffix-LCS table.
///
/// `table[i][j]` = LCS length of `a[i..]` and `b[j..]`. On a mismatch the walk
/// removes from `a` whenever that keeps the LCS length, so deletions come first.
fn lcs_walk(a: &[&str], b: &[&str], out: &mut Vec<DiffToken>) {
    let (n, m) = (a.len(), b.len());
    let width = m + 1;
    let mut table = vec![0u32; (n + 1) * width];

    for i in (0..n).rev() {
        for j in (0..m).rev() {
            table[i * width + j] = if a[i] == b[j] {
                table[(i + 1) * width + j + 1] + 1
            } else {
                table[(i + 1) * width + j].max(table[i * width + j + 1])
            };
        }
    }

    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if a[i] == b[j] {
            out.push(DiffToken::Unchanged(a[i].to_string()));
            i += 1;
            j += 1;
        } else if table[(i + 1) * width + j] >= table[i * width + j + 1] {
            out.push(DiffToken::Removed(a[i].to_string()));
            i += 1;
        } else {
            out.push(DiffToken::Added(b[j].to_string()));
            j += 1;
        }
    }
    out.extend(a[i..].iter().map(|t| DiffToken::Removed(t.to_string())));
    out.extend(b[j..].iter().map(|t| DiffToken::Added(t.to_string())));
}

/// Reorders each maximal run of changes so all removals precede all additions.
/// Relative order within each side is preserved, so reconstruction is unaffected.
fn group_changes(tokens: Vec<DiffToken>) -> Vec<DiffToken> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut removed = Vec::new();
    let mut added = Vec::new();

    for token in tokens {
        match token {
            DiffToken::Removed(_) => removed.push(token),
            DiffToken::Added(_) => added.push(token),
            DiffToken::Unchanged(_) => {
                out.append(&mut removed);
                out.append(&mut added);
                out.push(token);
            }
        }
    }
    out.append(&mut removed);
    out.append(&mut added);
    out
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
