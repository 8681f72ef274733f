//! Concurrent batch translation
//!
//! A batch is validated up front, then every item is sent to the translator
//! in its own task. All tasks are awaited together and each one settles into
//! its own [`Outcome`], so a failing item never affects its siblings.

use futures::future::join_all;
use regex::Regex;
use serde::Deserialize;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use utoipa::ToSchema;

use crate::core::client::Translator;
use crate::core::errors::{ProxyError, Result};
use crate::core::models::{BatchResult, Outcome, WorkItem};

/// Message recorded for items whose upstream call exceeded the per-item timeout
pub const TIMEOUT_MESSAGE: &str = "upstream request timed out";

/// Message recorded for items whose task panicked or was cancelled
pub const TASK_FAILED_MESSAGE: &str = "item task failed";

/// One caller-supplied batch entry: a bare string, or a text with its own target language
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum BatchEntry {
    /// Text translated into the request-level target language
    Text(String),
    /// Text with an optional per-entry target language
    #[serde(rename_all = "camelCase")]
    Detailed {
        /// Text to translate
        text: Option<String>,
        /// Overrides the request-level target language
        target_lang: Option<String>,
    },
}

impl BatchEntry {
    fn text(&self) -> Option<&str> {
        match self {
            BatchEntry::Text(text) => Some(text),
            BatchEntry::Detailed { text, .. } => text.as_deref(),
        }
    }

    fn target_lang(&self) -> Option<&str> {
        match self {
            BatchEntry::Text(_) => None,
            BatchEntry::Detailed { target_lang, .. } => target_lang.as_deref(),
        }
    }
}

impl From<&str> for BatchEntry {
    fn from(text: &str) -> Self {
        BatchEntry::Text(text.to_string())
    }
}

/// Whether `code` looks like a language tag such as `pt`, `zh-Hans` or `sr-Cyrl-ME`
pub fn is_valid_language_code(code: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"^[A-Za-z]{2,3}(-[A-Za-z0-9]{2,8})*$").expect("language tag pattern is valid")
        })
        .is_match(code)
}

/// Fans a batch out to the translator and gathers every outcome
#[derive(Clone)]
pub struct BatchDispatcher {
    translator: Arc<dyn Translator>,
    max_batch_size: usize,
    item_timeout: Duration,
}

impl BatchDispatcher {
    /// Create a new dispatcher
    pub fn new(translator: Arc<dyn Translator>, max_batch_size: usize, item_timeout: Duration) -> Self {
        Self {
            translator,
            max_batch_size,
            item_timeout,
        }
    }

    /// Turn caller entries into work items, rejecting structural problems.
    /// `default_target_lang` applies to every entry that does not name its own.
    pub fn validate(
        &self,
        entries: &[BatchEntry],
        default_target_lang: Option<&str>,
    ) -> Result<Vec<WorkItem>> {
        self.check_size(entries.len())?;

        let default_target_lang = default_target_lang.map(str::trim).filter(|lang| !lang.is_empty());

        entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let text = entry
                    .text()
                    .filter(|text| !text.trim().is_empty())
                    .ok_or_else(|| ProxyError::validation(format!("texts[{}] must be a non-empty string", index)))?;

                let target_lang = entry
                    .target_lang()
                    .map(str::trim)
                    .filter(|lang| !lang.is_empty())
                    .or(default_target_lang)
                    .ok_or_else(|| {
                        ProxyError::validation(format!("targetLang is required (missing for texts[{}])", index))
                    })?;

                if !is_valid_language_code(target_lang) {
                    return Err(ProxyError::validation(format!(
                        "Invalid targetLang '{}' for texts[{}]",
                        target_lang, index
                    )));
                }

                Ok(WorkItem::new(index, text, target_lang))
            })
            .collect()
    }

    /// Translate every item concurrently and report per-item outcomes in input order
    pub async fn dispatch(&self, items: Vec<WorkItem>) -> Result<BatchResult> {
        self.check_size(items.len())?;

        let total = items.len();
        let start_time = Instant::now();
        info!("Dispatching batch of {} items", total);

        // Index and text are kept outside the task so a panicking item still settles
        let (inputs, handles): (Vec<_>, Vec<_>) = items
            .into_iter()
            .map(|item| {
                let input = (item.index, item.text.clone());
                let translator = Arc::clone(&self.translator);
                let item_timeout = self.item_timeout;
                (input, tokio::spawn(translate_item(translator, item, item_timeout)))
            })
            .unzip();

        let results: Vec<Outcome> = join_all(handles)
            .await
            .into_iter()
            .zip(inputs)
            .map(|(joined, (index, original_text))| {
                joined.unwrap_or_else(|e| {
                    error!("Item {} task failed: {}", index, e);
                    Outcome::Failure {
                        index,
                        original_text,
                        error_message: TASK_FAILED_MESSAGE.to_string(),
                        status_code: None,
                    }
                })
            })
            .collect();

        check_outcomes(&results, total)?;

        let report = BatchResult::new(results);
        info!(
            "Batch completed: {} successful, {} failed ({}) in {:?}",
            report.summary.successful,
            report.summary.failed,
            report.summary.success_rate_percent,
            start_time.elapsed()
        );

        Ok(report)
    }

    fn check_size(&self, len: usize) -> Result<()> {
        if len == 0 {
            return Err(ProxyError::validation("texts cannot be empty"));
        }
        if len > self.max_batch_size {
            return Err(ProxyError::validation(format!(
                "Batch of {} items exceeds the maximum of {} items",
                len, self.max_batch_size
            )));
        }
        Ok(())
    }
}

async fn translate_item(translator: Arc<dyn Translator>, item: WorkItem, item_timeout: Duration) -> Outcome {
    let WorkItem {
        index,
        text,
        target_lang,
    } = item;

    let result = tokio::time::timeout(item_timeout, translator.translate(&text, &target_lang)).await;

    match result {
        Ok(Ok(translated_text)) => {
            debug!("Item {} translated", index);
            Outcome::Success {
                index,
                original_text: text,
                translated_text,
            }
        }
        Ok(Err(e)) => {
            if e.is_upstream() {
                warn!("Item {} failed: {}", index, e);
            } else {
                error!("Item {} failed unexpectedly: {}", index, e);
            }
            Outcome::Failure {
                index,
                original_text: text,
                status_code: e.status_code(),
                error_message: e.to_string(),
            }
        }
        Err(_) => {
            warn!("Item {} timed out after {:?}", index, item_timeout);
            Outcome::Failure {
                index,
                original_text: text,
                error_message: TIMEOUT_MESSAGE.to_string(),
                status_code: None,
            }
        }
    }
}

/// Exactly one outcome per input position, in order
fn check_outcomes(results: &[Outcome], total: usize) -> Result<()> {
    if results.len() != total {
        return Err(ProxyError::Internal(format!(
            "expected {} outcomes, got {}",
            total,
            results.len()
        )));
    }

    if let Some((position, outcome)) = results
        .iter()
        .enumerate()
        .find(|(position, outcome)| outcome.index() != *position)
    {
        return Err(ProxyError::Internal(format!(
            "outcome at position {} has index {}",
            position,
            outcome.index()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_test::{assert_err, assert_ok};

    /// Scripted translator: each text maps to a delay and a result
    #[derive(Default)]
    struct ScriptedTranslator {
        script: HashMap<String, (Duration, std::result::Result<String, u16>)>,
        calls: AtomicUsize,
    }

    impl ScriptedTranslator {
        fn ok(mut self, text: &str, translation: &str, delay_ms: u64) -> Self {
            self.script.insert(
                text.to_string(),
                (Duration::from_millis(delay_ms), Ok(translation.to_string())),
            );
            self
        }

        fn fail(mut self, text: &str, status: u16) -> Self {
            self.script
                .insert(text.to_string(), (Duration::ZERO, Err(status)));
            self
        }

        fn hang(mut self, text: &str) -> Self {
            self.script.insert(
                text.to_string(),
                (Duration::from_secs(30), Ok("never".to_string())),
            );
            self
        }
    }

    #[async_trait]
    impl Translator for ScriptedTranslator {
        async fn translate(&self, text: &str, target_lang: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let (delay, result) = self
                .script
                .get(text)
                .cloned()
                .unwrap_or((Duration::ZERO, Ok(format!("{}:{}", target_lang, text))));
            tokio::time::sleep(delay).await;
            result.map_err(|status| ProxyError::Api {
                status,
                message: "upstream rejected".to_string(),
            })
        }
    }

    fn dispatcher(translator: Arc<ScriptedTranslator>, timeout: Duration) -> BatchDispatcher {
        BatchDispatcher::new(translator, 25, timeout)
    }

    fn entries(texts: &[&str]) -> Vec<BatchEntry> {
        texts.iter().map(|text| BatchEntry::from(*text)).collect()
    }

    #[tokio::test]
    async fn test_one_success_one_timeout() {
        let translator = Arc::new(ScriptedTranslator::default().ok("hello", "olá", 0).hang("world"));
        let dispatcher = dispatcher(translator, Duration::from_millis(100));

        let items = dispatcher
            .validate(&entries(&["hello", "world"]), Some("pt"))
            .unwrap();
        let report = dispatcher.dispatch(items).await.unwrap();

        assert_eq!(
            report.results,
            vec![
                Outcome::Success {
                    index: 0,
                    original_text: "hello".to_string(),
                    translated_text: "olá".to_string(),
                },
                Outcome::Failure {
                    index: 1,
                    original_text: "world".to_string(),
                    error_message: TIMEOUT_MESSAGE.to_string(),
                    status_code: None,
                },
            ]
        );
        assert_eq!(report.summary.total, 2);
        assert_eq!(report.summary.successful, 1);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.summary.success_rate_percent, "50.00%");
    }

    #[tokio::test]
    async fn test_order_follows_input_not_completion() {
        let translator = Arc::new(
            ScriptedTranslator::default()
                .ok("a", "A", 80)
                .ok("b", "B", 50)
                .ok("c", "C", 20)
                .ok("d", "D", 0),
        );
        let dispatcher = dispatcher(translator, Duration::from_secs(2));

        let items = dispatcher.validate(&entries(&["a", "b", "c", "d"]), Some("en")).unwrap();
        let report = dispatcher.dispatch(items).await.unwrap();

        let indexes: Vec<usize> = report.results.iter().map(Outcome::index).collect();
        assert_eq!(indexes, vec![0, 1, 2, 3]);
        let originals: Vec<&str> = report.results.iter().map(Outcome::original_text).collect();
        assert_eq!(originals, vec!["a", "b", "c", "d"]);
        assert_eq!(report.summary.success_rate_percent, "100.00%");
    }

    #[tokio::test]
    async fn test_items_run_concurrently() {
        let translator = Arc::new(
            ScriptedTranslator::default()
                .ok("a", "A", 200)
                .ok("b", "B", 200)
                .ok("c", "C", 200),
        );
        let dispatcher = dispatcher(translator, Duration::from_secs(5));

        let items = dispatcher.validate(&entries(&["a", "b", "c"]), Some("en")).unwrap();
        let start = Instant::now();
        dispatcher.dispatch(items).await.unwrap();

        assert!(start.elapsed() < Duration::from_millis(550));
    }

    #[tokio::test]
    async fn test_all_failures_still_report() {
        let translator = Arc::new(ScriptedTranslator::default().fail("x", 503).fail("y", 400));
        let dispatcher = dispatcher(translator.clone(), Duration::from_secs(1));

        let items = dispatcher.validate(&entries(&["x", "y"]), Some("de")).unwrap();
        let report = assert_ok!(dispatcher.dispatch(items).await);

        assert_eq!(report.summary.successful, 0);
        assert_eq!(report.summary.failed, 2);
        assert_eq!(report.summary.success_rate_percent, "0.00%");
        assert_eq!(translator.calls.load(Ordering::SeqCst), 2);

        match &report.results[0] {
            Outcome::Failure { status_code, .. } => assert_eq!(*status_code, Some(503)),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    /// Translates everything except "boom", which panics mid-call
    struct PanickingTranslator;

    #[async_trait]
    impl Translator for PanickingTranslator {
        async fn translate(&self, text: &str, target_lang: &str) -> Result<String> {
            if text == "boom" {
                panic!("translator exploded");
            }
            Ok(format!("{}:{}", target_lang, text))
        }
    }

    #[tokio::test]
    async fn test_panicking_item_settles_as_failure() {
        let dispatcher = BatchDispatcher::new(Arc::new(PanickingTranslator), 25, Duration::from_secs(1));

        let items = dispatcher
            .validate(&entries(&["hello", "boom", "world"]), Some("pt"))
            .unwrap();
        let report = assert_ok!(dispatcher.dispatch(items).await);

        assert_eq!(
            report.results,
            vec![
                Outcome::Success {
                    index: 0,
                    original_text: "hello".to_string(),
                    translated_text: "pt:hello".to_string(),
                },
                Outcome::Failure {
                    index: 1,
                    original_text: "boom".to_string(),
                    error_message: TASK_FAILED_MESSAGE.to_string(),
                    status_code: None,
                },
                Outcome::Success {
                    index: 2,
                    original_text: "world".to_string(),
                    translated_text: "pt:world".to_string(),
                },
            ]
        );
        assert_eq!(report.summary.total, 3);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.summary.success_rate_percent, "66.67%");
    }

    #[tokio::test]
    async fn test_empty_batch_rejected_before_dispatch() {
        let translator = Arc::new(ScriptedTranslator::default());
        let dispatcher = dispatcher(translator.clone(), Duration::from_secs(1));

        let err = assert_err!(dispatcher.validate(&[], Some("pt")));
        assert!(err.is_validation());

        let err = assert_err!(dispatcher.dispatch(vec![]).await);
        assert!(err.is_validation());
        assert_eq!(translator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_oversized_batch_names_the_cap() {
        let translator = Arc::new(ScriptedTranslator::default());
        let dispatcher = dispatcher(translator.clone(), Duration::from_secs(1));

        let texts: Vec<BatchEntry> = (0..26).map(|i| BatchEntry::Text(format!("t{}", i))).collect();
        let err = dispatcher.validate(&texts, Some("pt")).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("25"));

        let items: Vec<WorkItem> = (0..26).map(|i| WorkItem::new(i, "t", "pt")).collect();
        let err = dispatcher.dispatch(items).await.unwrap_err();
        assert!(err.to_string().contains("25"));
        assert_eq!(translator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_batch_at_cap_is_accepted() {
        let translator = Arc::new(ScriptedTranslator::default());
        let dispatcher = dispatcher(translator.clone(), Duration::from_secs(1));

        let texts: Vec<BatchEntry> = (0..25).map(|i| BatchEntry::Text(format!("t{}", i))).collect();
        let items = dispatcher.validate(&texts, Some("pt")).unwrap();
        let report = dispatcher.dispatch(items).await.unwrap();

        assert_eq!(report.results.len(), 25);
        assert!(report
            .results
            .iter()
            .enumerate()
            .all(|(position, outcome)| outcome.index() == position));
        assert_eq!(translator.calls.load(Ordering::SeqCst), 25);
    }

    #[test]
    fn test_validate_per_item_target_language() {
        let translator = Arc::new(ScriptedTranslator::default());
        let dispatcher = dispatcher(translator, Duration::from_secs(1));

        let entries = vec![
            BatchEntry::from("hello"),
            BatchEntry::Detailed {
                text: Some("bonjour".to_string()),
                target_lang: Some("es".to_string()),
            },
        ];
        let items = dispatcher.validate(&entries, Some("pt")).unwrap();

        assert_eq!(items[0], WorkItem::new(0, "hello", "pt"));
        assert_eq!(items[1], WorkItem::new(1, "bonjour", "es"));
    }

    #[test]
    fn test_validate_rejects_structural_problems() {
        let translator = Arc::new(ScriptedTranslator::default());
        let dispatcher = dispatcher(translator, Duration::from_secs(1));

        let err = dispatcher.validate(&entries(&["hello"]), None).unwrap_err();
        assert!(err.to_string().contains("targetLang"));

        let err = dispatcher.validate(&entries(&["hello", "  "]), Some("pt")).unwrap_err();
        assert!(err.to_string().contains("texts[1]"));

        let err = dispatcher
            .validate(&entries(&["hello"]), Some("pt&to=de"))
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_language_codes() {
        for code in ["pt", "en", "zh-Hans", "sr-Cyrl", "mww", "pt-pt", "tlh-Latn"] {
            assert!(is_valid_language_code(code), "{}", code);
        }
        for code in ["", "p", "portuguese", "pt_BR", "pt-", "en us"] {
            assert!(!is_valid_language_code(code), "{}", code);
        }
    }

    #[test]
    fn test_entry_deserialization() {
        let parsed: Vec<BatchEntry> =
            serde_json::from_str(r#"["hello", {"text": "world", "targetLang": "es"}, {"text": "x"}]"#).unwrap();
        assert_eq!(parsed[0], BatchEntry::from("hello"));
        assert_eq!(parsed[1].target_lang(), Some("es"));
        assert_eq!(parsed[2].target_lang(), None);
    }
}
