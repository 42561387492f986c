// src/dedup/best_version.rs
//! Representative ("best version") selection inside one similarity group.
//! Favors the member carrying the most usable content, with a modest
//! freshness bonus so a thin-but-new wire copy does not beat a full report.

use chrono::{DateTime, Utc};

use crate::headline::RawHeadline;

const W_DESCRIPTION: f64 = 0.5;
const W_TITLE: f64 = 0.3;
const W_RECENCY: f64 = 0.2;
const RECENCY_WINDOW_DAYS: i64 = 100;

/// Weighted completeness score. Lengths are in characters; the recency
/// bonus decays linearly from 100 to 0 over [`RECENCY_WINDOW_DAYS`] and a
/// missing `published_at` contributes nothing. Future-dated timestamps
/// clamp to the full bonus.
pub fn version_score(headline: &RawHeadline, now: DateTime<Utc>) -> f64 {
    let description_len = headline
        .description
        .as_deref()
        .map(|d| d.chars().count())
        .unwrap_or(0) as f64;
    let title_len = headline.title.chars().count() as f64;
    let recency_bonus = match headline.published_at {
        Some(at) => {
            let days_since = (now - at).num_days().max(0);
            (RECENCY_WINDOW_DAYS - days_since).max(0) as f64
        }
        None => 0.0,
    };
    W_DESCRIPTION * description_len + W_TITLE * title_len + W_RECENCY * recency_bonus
}

/// Index of the best version among `members`. Single-member groups skip
/// scoring entirely. Ties keep the earliest member (strict comparison).
pub fn select_best_version(members: &[RawHeadline], now: DateTime<Utc>) -> usize {
    if members.len() <= 1 {
        return 0;
    }
    let mut best = 0usize;
    let mut best_score = version_score(&members[0], now);
    for (idx, member) in members.iter().enumerate().skip(1) {
        let score = version_score(member, now);
        if score > best_score {
            best = idx;
            best_score = score;
        }
    }
    best
}
