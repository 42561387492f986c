// src/compile/prompts.rs
//! Prompt builders for every guided-generation call shape. All material the
//! model sees (titles, descriptions, sources) is normalized upstream; these
//! functions only assemble text.

use crate::headline::RawHeadline;

use super::StylePrefs;

pub const TOPIC_MAX_TOKENS: u32 = 24;
pub const HOOK_MAX_TOKENS: u32 = 120;
pub const SUMMARY_MAX_TOKENS: u32 = 900;
pub const GROUPING_BASE_TOKENS: u32 = 128;
pub const GROUPING_TOKENS_PER_HEADLINE: u32 = 24;

/// Numbered member block fed to hook/summary calls. Every member appears;
/// the model synthesizes across all reports, not just the representative.
pub fn render_headline_block(members: &[RawHeadline]) -> String {
    let mut out = String::new();
    for (i, m) in members.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, m.title));
        if let Some(d) = m.description.as_deref() {
            out.push_str(&format!("   {d}\n"));
        }
        out.push_str(&format!("   (source: {})\n", m.source));
    }
    out
}

/// Zero-based title list for the structured grouping call. Indices are the
/// contract: the response refers to headlines by these numbers.
pub fn render_indexed_titles(headlines: &[RawHeadline]) -> String {
    let mut out = String::new();
    for (i, h) in headlines.iter().enumerate() {
        out.push_str(&format!("{i}. {}\n", h.title));
    }
    out
}

/// Optional house-style directives, one line each. Empty when no preference
/// is set.
pub fn style_lines(prefs: &StylePrefs) -> String {
    let mut out = String::new();
    if let Some(tone) = prefs.tone.as_deref() {
        out.push_str(&format!("Tone: {tone}.\n"));
    }
    if let Some(format_pref) = prefs.format.as_deref() {
        out.push_str(&format!("Format: {format_pref}.\n"));
    }
    out
}

/// Verbatim user instructions go first, then the standing directive. Used
/// by regeneration; a `None` passes the directive through unchanged.
pub fn prepend_instructions(directive: &str, instructions: Option<&str>) -> String {
    match instructions {
        Some(extra) if !extra.trim().is_empty() => format!("{extra}\n\n{directive}"),
        _ => directive.to_string(),
    }
}

pub fn topic_system() -> String {
    "You label news stories. Given one or more headlines reporting the same story, \
     answer with a short topic label of 2 to 5 words. Plain text, no quotes, no \
     punctuation at the end. Output only the label."
        .to_string()
}

pub fn topic_user(members: &[RawHeadline]) -> String {
    format!(
        "Headlines for one story:\n{}\nTopic label:",
        render_headline_block(members)
    )
}

pub fn hook_system(prefs: &StylePrefs) -> String {
    format!(
        "You write attention hooks for compiled news stories. Write 1-2 sentences \
         that make a reader want the full story, grounded only in the material \
         given. No hashtags, no emojis, no clickbait fabrication.\n{}Output only \
         the hook.",
        style_lines(prefs)
    )
}

pub fn hook_user(members: &[RawHeadline]) -> String {
    format!(
        "Source headlines (all reporting one story):\n{}\nHook:",
        render_headline_block(members)
    )
}

pub fn summary_system(prefs: &StylePrefs) -> String {
    format!(
        "You compile news stories. Write a multi-paragraph summary that synthesizes \
         ALL the source headlines below into one standalone narrative: what \
         happened, who is involved, why it matters. A reader without access to the \
         sources must come away informed. Stick to the material given.\n{}Output \
         only the summary.",
        style_lines(prefs)
    )
}

pub fn summary_user(members: &[RawHeadline]) -> String {
    format!(
        "Source headlines (all reporting one story):\n{}\nSummary:",
        render_headline_block(members)
    )
}

pub fn grouping_system() -> String {
    "You group news headlines by story. Given a numbered list, partition the \
     numbers into topic groups. Reply with ONLY a JSON object of the form \
     {\"groups\":[{\"topic\":\"2-5 word label\",\"memberIndices\":[0,2]}]}. Every \
     index from the list appears in exactly one group; indices you cannot place \
     get their own single-member group. No prose, no code fences."
        .to_string()
}

pub fn grouping_user(headlines: &[RawHeadline]) -> String {
    format!("Headlines:\n{}", render_indexed_titles(headlines))
}

pub fn grouping_max_tokens(headline_count: usize) -> u32 {
    GROUPING_BASE_TOKENS + GROUPING_TOKENS_PER_HEADLINE * headline_count as u32
}
