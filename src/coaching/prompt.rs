use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::form::Severity;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum PromptCategory {
    Corrective,
    Motivational,
    Instructional,
    Warning,
    Confirmation,
}

impl PromptCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptCategory::Corrective => "corrective",
            PromptCategory::Motivational => "motivational",
            PromptCategory::Instructional => "instructional",
            PromptCategory::Warning => "warning",
            PromptCategory::Confirmation => "confirmation",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum DeliveryStatus {
    Queued,
    Speaking,
    Completed,
    Skipped,
    Failed,
}

impl Default for DeliveryStatus {
    fn default() -> Self {
        DeliveryStatus::Queued
    }
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Queued => "queued",
            DeliveryStatus::Speaking => "speaking",
            DeliveryStatus::Completed => "completed",
            DeliveryStatus::Skipped => "skipped",
            DeliveryStatus::Failed => "failed",
        }
    }

    /// Whether a prompt in this state still counts as said for
    /// deduplication. Only a backend failure frees the message for a retry.
    pub fn counts_as_delivered(&self) -> bool {
        !matches!(self, DeliveryStatus::Failed)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DeliveryStatus::Completed | DeliveryStatus::Skipped | DeliveryStatus::Failed
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum DeliveryModality {
    Audio,
    Visual,
    Haptic,
}

/// The rule that produced a prompt, with the reading that tripped it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TriggerCondition {
    pub rule: String,
    pub measured_value: f32,
    pub threshold: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackPrompt {
    pub id: String,
    /// Stable phrase-table key; deduplication compares on this.
    pub message_id: String,
    pub text: String,
    pub category: PromptCategory,
    pub severity: Severity,
    pub modalities: Vec<DeliveryModality>,
    pub triggered_at_ms: u64,
    pub trigger: Option<TriggerCondition>,
    pub status: DeliveryStatus,
    pub rep_number: Option<u32>,
}

impl FeedbackPrompt {
    pub fn new(
        message_id: impl Into<String>,
        text: impl Into<String>,
        category: PromptCategory,
        severity: Severity,
        triggered_at_ms: u64,
    ) -> Self {
        let mut modalities = vec![DeliveryModality::Audio, DeliveryModality::Visual];
        if severity == Severity::Critical {
            modalities.push(DeliveryModality::Haptic);
        }

        Self {
            id: Uuid::new_v4().to_string(),
            message_id: message_id.into(),
            text: text.into(),
            category,
            severity,
            modalities,
            triggered_at_ms,
            trigger: None,
            status: DeliveryStatus::Queued,
            rep_number: None,
        }
    }

    pub fn with_trigger(mut self, rule: impl Into<String>, measured_value: f32, threshold: f32) -> Self {
        self.trigger = Some(TriggerCondition {
            rule: rule.into(),
            measured_value,
            threshold,
        });
        self
    }

    pub fn with_rep(mut self, rep_number: u32) -> Self {
        self.rep_number = Some(rep_number);
        self
    }

    /// Final status for a prompt that was cut off or never played.
    /// Critical prompts are never reported as skipped.
    pub fn interrupted_status(&self) -> DeliveryStatus {
        if self.severity == Severity::Critical {
            DeliveryStatus::Failed
        } else {
            DeliveryStatus::Skipped
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn critical_prompts_add_haptics() {
        let normal = FeedbackPrompt::new("a", "A", PromptCategory::Corrective, Severity::Normal, 0);
        let critical = FeedbackPrompt::new("b", "B", PromptCategory::Warning, Severity::Critical, 0);

        assert!(!normal.modalities.contains(&DeliveryModality::Haptic));
        assert!(critical.modalities.contains(&DeliveryModality::Haptic));
        assert_ne!(normal.id, critical.id);
        assert_eq!(normal.status, DeliveryStatus::Queued);
    }

    #[test]
    fn only_failures_free_a_message_for_repeat() {
        assert!(DeliveryStatus::Queued.counts_as_delivered());
        assert!(DeliveryStatus::Completed.counts_as_delivered());
        assert!(DeliveryStatus::Skipped.counts_as_delivered());
        assert!(!DeliveryStatus::Failed.counts_as_delivered());
    }

    #[test]
    fn interrupted_critical_prompts_fail_instead_of_skipping() {
        let high = FeedbackPrompt::new("a", "A", PromptCategory::Corrective, Severity::High, 0);
        let critical = FeedbackPrompt::new("b", "B", PromptCategory::Warning, Severity::Critical, 0);

        assert_eq!(high.interrupted_status(), DeliveryStatus::Skipped);
        assert_eq!(critical.interrupted_status(), DeliveryStatus::Failed);
    }

    #[test]
    fn serializes_camel_case() {
        let prompt = FeedbackPrompt::new("tuck_elbows", "Tuck", PromptCategory::Corrective, Severity::High, 42)
            .with_trigger("elbow_flare", 0.8, 0.6)
            .with_rep(3);
        let json = serde_json::to_value(&prompt).unwrap();

        assert_eq!(json["messageId"], "tuck_elbows");
        assert_eq!(json["category"], "corrective");
        assert_eq!(json["severity"], "high");
        assert_eq!(json["triggeredAtMs"], 42);
        assert_eq!(json["repNumber"], 3);
        assert_eq!(json["trigger"]["rule"], "elbow_flare");
    }
}
