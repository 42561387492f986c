// src/headline.rs
//! Raw headline type shared with the collection collaborator, plus the
//! boundary text normalization applied before any pipeline work.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One collected headline. Immutable once collected, except for the
/// annotation fields at the bottom, which a deduplication pass writes
/// exactly once (and a later pass over the same batch may overwrite).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawHeadline {
    /// Unique and stable within a processing run.
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    /// Which configured source produced it, e.g. "reuters-rss".
    pub source: String,

    // --- annotations written by a dedup pass ---
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dedup_group_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heat_score: Option<u32>,
    #[serde(default)]
    pub is_best_version: bool,
}

impl RawHeadline {
    /// Text fed to the embedder and to generation prompts: title and
    /// description joined with a blank line. Description-less headlines
    /// embed the title alone.
    pub fn embedding_text(&self) -> String {
        match self.description.as_deref() {
            Some(d) if !d.is_empty() => format!("{}\n\n{}", self.title, d),
            _ => self.title.clone(),
        }
    }

    /// Normalize title/description in place. Empty descriptions collapse
    /// to `None` so scoring treats them as absent.
    pub fn normalize(&mut self) {
        self.title = normalize_text(&self.title);
        if let Some(d) = self.description.take() {
            let d = normalize_text(&d);
            if !d.is_empty() {
                self.description = Some(d);
            }
        }
    }
}

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Upper bound on normalized text length, in chars. Scraped descriptions
/// occasionally carry whole article bodies.
const MAX_TEXT_CHARS: usize = 1500;

/// Normalize scraped text: decode HTML entities, strip tags, fold curly
/// quotes to ASCII, collapse whitespace, drop trailing sentence
/// punctuation, cap length.
pub fn normalize_text(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s);
    let stripped = TAG_RE.replace_all(&decoded, "");
    let quoted = stripped
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");
    let collapsed = WS_RE.replace_all(&quoted, " ");
    let mut out = collapsed
        .trim()
        .trim_end_matches(['!', '?', '.', ','])
        .to_string();
    if out.chars().count() > MAX_TEXT_CHARS {
        out = out.chars().take(MAX_TEXT_CHARS).collect();
    }
    out
}

/// Short anonymized digest for debug logging; never log raw headline text.
pub(crate) fn anon_digest(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
