use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::models::format_timestamp;
use crate::services::ai::{LlmProvider, Message};

/// Structured guess returned by a text-understanding collaborator. Times are
/// still strings here; validating them is the extractor's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawEventFields {
    pub title: String,
    pub start_time: String,
    pub end_time: String,
}

#[async_trait]
pub trait TextUnderstanding: Send + Sync {
    async fn understand(
        &self,
        text: &str,
        reference_time: NaiveDateTime,
    ) -> anyhow::Result<RawEventFields>;
}

const SYSTEM_PROMPT: &str = r#"You extract calendar events from short free-text requests.

Return ONLY a JSON object (no markdown, no explanation) with exactly these keys:
{"title": "string", "start_time": "YYYY-MM-DDTHH:mm:ss", "end_time": "YYYY-MM-DDTHH:mm:ss"}

Rules:
1. Resolve relative times ("tomorrow", "next week") against the current time given below.
2. If no date is mentioned, assume tomorrow.
3. If no duration is mentioned, assume 1 hour.
4. Use the 24-hour clock.
5. Format times exactly like 2024-03-22T15:00:00.

Example:
Input: "Meeting tomorrow at 3pm for 1 hour" (current time 2024-03-21T09:00:00)
Output: {"title": "Meeting", "start_time": "2024-03-22T15:00:00", "end_time": "2024-03-22T16:00:00"}
"#;

/// `TextUnderstanding` backed by a chat model.
pub struct LlmTextUnderstanding {
    llm: Arc<dyn LlmProvider>,
}

impl LlmTextUnderstanding {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl TextUnderstanding for LlmTextUnderstanding {
    async fn understand(
        &self,
        text: &str,
        reference_time: NaiveDateTime,
    ) -> anyhow::Result<RawEventFields> {
        let system = format!(
            "{SYSTEM_PROMPT}\nCurrent time is {}.",
            format_timestamp(&reference_time)
        );
        let response = self.llm.chat(&system, &[Message::user(text)]).await?;
        parse_event_fields(&response)
    }
}

/// Accepts a bare JSON object, or one wrapped in a single markdown fence.
/// Anything else (prose around the object, extra keys) is rejected.
pub fn parse_event_fields(response: &str) -> anyhow::Result<RawEventFields> {
    let trimmed = response.trim();
    let body = match trimmed.strip_prefix("```") {
        Some(rest) => {
            let rest = match rest.get(..4) {
                Some(tag) if tag.eq_ignore_ascii_case("json") => &rest[4..],
                _ => rest,
            };
            rest.strip_suffix("```")
                .ok_or_else(|| anyhow::anyhow!("unterminated code fence in model reply"))?
                .trim()
        }
        None => trimmed,
    };

    serde_json::from_str::<RawEventFields>(body).map_err(|e| {
        tracing::warn!(error = %e, "model reply does not match the event schema");
        anyhow::anyhow!("model reply does not match the event schema: {e}")
    })
}
