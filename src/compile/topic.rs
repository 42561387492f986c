// src/compile/topic.rs
//! Best-effort topic labeling. A group always ends up with a usable label:
//! guided generation first, deterministic title tokens when that fails.

use crate::generate::adapter::{sanitize_single_line, strip_code_fences};
use crate::generate::{GenerationClient, GenerationRequest};
use crate::headline::RawHeadline;
use crate::story::DeduplicationGroup;

use super::prompts;

const FALLBACK_TOKEN_COUNT: usize = 5;
const TOPIC_MAX_CHARS: usize = 80;
const TOPIC_MAX_WORDS: usize = 8;

/// Deterministic label: the first five whitespace tokens of the title. An
/// empty title falls back to the source identifier so the label is still
/// non-empty without inventing content.
pub fn fallback_topic(headline: &RawHeadline) -> String {
    let tokens: Vec<&str> = headline
        .title
        .split_whitespace()
        .take(FALLBACK_TOKEN_COUNT)
        .collect();
    if !tokens.is_empty() {
        return tokens.join(" ");
    }
    let source = headline.source.trim();
    if !source.is_empty() {
        return source.to_string();
    }
    "untitled story".to_string()
}

/// Clean a model-produced label: fences and outer quotes off, one line,
/// trailing punctuation dropped, word-capped.
pub fn sanitize_topic(raw: &str) -> String {
    let line = sanitize_single_line(strip_code_fences(raw), TOPIC_MAX_CHARS);
    let line = line
        .trim_matches(|c| matches!(c, '"' | '\'' | '`'))
        .trim_end_matches(|c| matches!(c, '.' | '!' | '?' | ','))
        .trim();
    let words: Vec<&str> = line.split_whitespace().take(TOPIC_MAX_WORDS).collect();
    words.join(" ")
}

/// Label one group. Never fails: any generation problem (including an
/// empty or unusable answer) collapses to the title-derived fallback.
pub async fn label_topic(client: &dyn GenerationClient, group: &DeduplicationGroup) -> String {
    let request = GenerationRequest::new(
        prompts::topic_system(),
        prompts::topic_user(&group.members),
        prompts::TOPIC_MAX_TOKENS,
    );
    match client.generate(&request).await {
        Ok(raw) => {
            let label = sanitize_topic(&raw);
            if label.is_empty() {
                fallback_topic(group.representative())
            } else {
                label
            }
        }
        Err(e) => {
            tracing::warn!(group = %group.group_id, error = %e, "topic labeling failed, using title tokens");
            fallback_topic(group.representative())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PipelineError, Result};
    use crate::generate::DisabledClient;
    use std::future::Future;
    use std::pin::Pin;

    fn mk(title: &str, source: &str) -> RawHeadline {
        RawHeadline {
            id: "h1".into(),
            title: title.into(),
            description: None,
            url: "https://example.test/a".into(),
            published_at: None,
            source: source.into(),
            dedup_group_id: None,
            heat_score: None,
            is_best_version: false,
        }
    }

    struct FixedClient(&'static str);

    impl GenerationClient for FixedClient {
        fn generate<'a>(
            &'a self,
            _request: &'a GenerationRequest,
        ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
            let out = self.0.to_string();
            Box::pin(async move { Ok(out) })
        }
        fn provider_name(&self) -> &'static str {
            "fixed"
        }
    }

    #[test]
    fn fallback_takes_first_five_tokens() {
        let h = mk("OpenAI raises $6.6B at $157B valuation today", "feed-a");
        assert_eq!(fallback_topic(&h), "OpenAI raises $6.6B at $157B");
    }

    #[test]
    fn fallback_keeps_short_titles_whole() {
        let h = mk("Fed cuts rates", "feed-a");
        assert_eq!(fallback_topic(&h), "Fed cuts rates");
    }

    #[test]
    fn fallback_uses_source_then_placeholder_for_empty_titles() {
        assert_eq!(fallback_topic(&mk("", "reuters-rss")), "reuters-rss");
        assert_eq!(fallback_topic(&mk("   ", "")), "untitled story");
    }

    #[test]
    fn sanitize_strips_quotes_fences_and_trailing_punct() {
        assert_eq!(sanitize_topic("\"AI Chip Funding.\""), "AI Chip Funding");
        assert_eq!(sanitize_topic("```\nRate Cut\n```"), "Rate Cut");
        assert_eq!(
            sanitize_topic("one two three four five six seven eight nine ten"),
            "one two three four five six seven eight"
        );
    }

    #[tokio::test]
    async fn labeling_falls_back_when_generation_fails() {
        let group = DeduplicationGroup::new(
            "placeholder",
            vec![mk("Company X raises five billion dollars in round", "feed-a")],
            0,
        );
        let label = label_topic(&DisabledClient, &group).await;
        assert_eq!(label, "Company X raises five billion");
    }

    #[tokio::test]
    async fn labeling_uses_sanitized_model_output() {
        let group = DeduplicationGroup::new("placeholder", vec![mk("Some title here", "feed-a")], 0);
        let label = label_topic(&FixedClient("  \"Chip Export Rules\"\n"), &group).await;
        assert_eq!(label, "Chip Export Rules");
    }

    #[tokio::test]
    async fn empty_model_output_falls_back() {
        let group = DeduplicationGroup::new("placeholder", vec![mk("Useful title words", "feed-a")], 0);
        let label = label_topic(&FixedClient("\"\""), &group).await;
        assert_eq!(label, "Useful title words");
    }
}
