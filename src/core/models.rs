//! Core data models for batch translation

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One unit of batch work, correlated to the caller's input by `index`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Position in the caller's input
    pub index: usize,
    /// Text to translate
    pub text: String,
    /// Target language code
    pub target_lang: String,
}

impl WorkItem {
    /// Create a work item
    pub fn new(index: usize, text: impl Into<String>, target_lang: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
            target_lang: target_lang.into(),
        }
    }
}

/// Per-item result of one upstream call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "OutcomeRecord")]
pub enum Outcome {
    /// The upstream call returned a translation
    Success {
        /// Position in the caller's input
        index: usize,
        /// Text as sent by the caller
        original_text: String,
        /// Translation returned upstream
        translated_text: String,
    },
    /// The upstream call failed, timed out, or its task died
    Failure {
        /// Position in the caller's input
        index: usize,
        /// Text as sent by the caller
        original_text: String,
        /// Human-readable cause
        error_message: String,
        /// Upstream HTTP status, when there was one
        status_code: Option<u16>,
    },
}

impl Outcome {
    /// Position in the caller's input
    pub fn index(&self) -> usize {
        match self {
            Outcome::Success { index, .. } | Outcome::Failure { index, .. } => *index,
        }
    }

    /// Whether the item was translated
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    /// Text as sent by the caller
    pub fn original_text(&self) -> &str {
        match self {
            Outcome::Success { original_text, .. } | Outcome::Failure { original_text, .. } => {
                original_text
            }
        }
    }
}

/// Wire shape of an [`Outcome`]
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeRecord {
    /// Position in the caller's input
    pub index: usize,
    /// Whether the item was translated
    pub success: bool,
    /// Text as sent by the caller
    pub original_text: String,
    /// Present on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translated_text: Option<String>,
    /// Present on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Upstream HTTP status of a failed call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

impl From<Outcome> for OutcomeRecord {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Success {
                index,
                original_text,
                translated_text,
            } => Self {
                index,
                success: true,
                original_text,
                translated_text: Some(translated_text),
                error: None,
                status_code: None,
            },
            Outcome::Failure {
                index,
                original_text,
                error_message,
                status_code,
            } => Self {
                index,
                success: false,
                original_text,
                translated_text: None,
                error: Some(error_message),
                status_code,
            },
        }
    }
}

/// Aggregate statistics over a settled batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    /// Number of items in the batch
    pub total: usize,
    /// Items that were translated
    pub successful: usize,
    /// Items that failed
    pub failed: usize,
    /// Success ratio with two decimals, e.g. `"50.00%"`
    pub success_rate_percent: String,
}

impl BatchSummary {
    /// Count outcomes and render the success rate
    pub fn from_outcomes(outcomes: &[Outcome]) -> Self {
        let total = outcomes.len();
        let successful = outcomes.iter().filter(|o| o.is_success()).count();
        let failed = total - successful;

        let rate = if total == 0 {
            0.0
        } else {
            successful as f64 * 100.0 / total as f64
        };

        Self {
            total,
            successful,
            failed,
            success_rate_percent: format!("{:.2}%", rate),
        }
    }
}

/// Ordered per-item outcomes plus summary
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BatchResult {
    /// One outcome per input item, in input order
    #[schema(value_type = Vec<OutcomeRecord>)]
    pub results: Vec<Outcome>,
    /// Counts over `results`
    pub summary: BatchSummary,
}

impl BatchResult {
    /// Build the report from outcomes already ordered by index
    pub fn new(results: Vec<Outcome>) -> Self {
        let summary = BatchSummary::from_outcomes(&results);
        Self { results, summary }
    }
}

/// Text-to-speech request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    /// Text to synthesize
    pub text: String,
    /// Voice language, e.g. `pt-BR`
    pub language_code: String,
    /// Specific voice name
    pub voice_name: Option<String>,
    /// Voice gender, `FEMALE` when unset
    pub ssml_gender: Option<String>,
}

impl SpeechRequest {
    /// Create a request with the default voice
    pub fn new(text: impl Into<String>, language_code: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language_code: language_code.into(),
            voice_name: None,
            ssml_gender: None,
        }
    }

    /// Set voice name
    pub fn with_voice_name(mut self, voice_name: impl Into<String>) -> Self {
        self.voice_name = Some(voice_name.into());
        self
    }

    /// Set voice gender
    pub fn with_ssml_gender(mut self, ssml_gender: impl Into<String>) -> Self {
        self.ssml_gender = Some(ssml_gender.into());
        self
    }
}
