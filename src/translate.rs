//! Word translation via a LibreTranslate-compatible HTTP service.
//!
//! The dictated word is translated from the primary locale into the
//! learning locale. The service being down, slow, or stumped never
//! breaks reading: the caller falls back to the source word, it just
//! gets told which kind of miss happened so status messaging can
//! distinguish "no translation" from "service broken".

use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::TranslateConfig;

/// What came back from the translation collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslateOutcome {
    Translated(String),
    /// The service answered but had nothing for this word.
    Unavailable,
    /// Transport, HTTP, or decode failure.
    Failed,
}

#[derive(Clone)]
pub struct Translator {
    config: TranslateConfig,
    client: Client,
}

impl Translator {
    pub fn new(config: TranslateConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// Translate one normalized word. Disabled translation reports
    /// Unavailable so the caller takes the ordinary fallback path.
    pub async fn translate(&self, word: &str) -> TranslateOutcome {
        if !self.config.enabled || word.is_empty() {
            return TranslateOutcome::Unavailable;
        }

        let body = json!({
            "q": word,
            "source": self.config.source_lang,
            "target": self.config.target_lang,
            "format": "text",
        });
        let url = format!("{}/translate", self.config.host);
        debug!("Translating {word:?} via {url}");

        match self.client.post(&url).json(&body).send().await {
            Ok(resp) => {
                if !resp.status().is_success() {
                    warn!("Translation service returned status {}", resp.status());
                    return TranslateOutcome::Failed;
                }
                match resp.json::<serde_json::Value>().await {
                    Ok(data) => match extract_translation(&data) {
                        Some(text) => {
                            debug!("Translated {word:?} -> {text:?}");
                            TranslateOutcome::Translated(text)
                        }
                        None => {
                            debug!("No translation for {word:?}");
                            TranslateOutcome::Unavailable
                        }
                    },
                    Err(e) => {
                        warn!("Failed to parse translation response: {e}");
                        TranslateOutcome::Failed
                    }
                }
            }
            Err(e) => {
                if e.is_connect() {
                    warn!("Cannot connect to translation service at {}", self.config.host);
                } else if e.is_timeout() {
                    warn!("Translation request timed out");
                } else {
                    warn!("Translation request failed: {e}");
                }
                TranslateOutcome::Failed
            }
        }
    }
}

/// Pull the translated text out of a service response body and reduce
/// it to a single normalized word (the surface reads one word at a
/// time, so a multi-word translation keeps its first word).
fn extract_translation(data: &serde_json::Value) -> Option<String> {
    normalize_word(data["translatedText"].as_str()?)
}

/// Reduce a raw transcript to the single word the reading surface will
/// carry: first whitespace token, punctuation trimmed, lowercased.
/// Returns `None` when nothing word-like survives.
pub fn normalize_word(transcript: &str) -> Option<String> {
    let token = transcript.split_whitespace().next()?;
    let trimmed: &str = token.trim_matches(|c: char| !c.is_alphanumeric());
    if trimmed.chars().any(char::is_alphabetic) {
        Some(trimmed.to_lowercase())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_and_lowercases_translated_text() {
        let data = serde_json::json!({ "translatedText": "Sun" });
        assert_eq!(extract_translation(&data), Some("sun".to_string()));
    }

    #[test]
    fn blank_or_missing_translation_is_none() {
        assert_eq!(extract_translation(&serde_json::json!({ "translatedText": "  " })), None);
        assert_eq!(extract_translation(&serde_json::json!({ "error": "nope" })), None);
    }

    #[test]
    fn normalization_takes_the_first_clean_token() {
        assert_eq!(normalize_word(" Sol."), Some("sol".to_string()));
        assert_eq!(normalize_word("¿Sol?"), Some("sol".to_string()));
        assert_eq!(normalize_word("sol brillante"), Some("sol".to_string()));
        assert_eq!(normalize_word("Árbol"), Some("árbol".to_string()));
    }

    #[test]
    fn normalization_rejects_non_words() {
        assert_eq!(normalize_word(""), None);
        assert_eq!(normalize_word("   "), None);
        assert_eq!(normalize_word("..."), None);
        assert_eq!(normalize_word("1234"), None);
    }
}
