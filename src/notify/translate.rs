//! Translation of advisory text

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::config::ServiceConfig;
use crate::language::Language;
use crate::utils::error::{DiagnosisError, Result, TranslationError};

/// One-way text translation into a target language
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(
        &self,
        text: &str,
        target: Language,
    ) -> std::result::Result<String, TranslationError>;
}

/// Client for the public Google Translate endpoint
#[derive(Debug, Clone)]
pub struct GoogleTranslator {
    client: Client,
    endpoint: String,
}

impl GoogleTranslator {
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| DiagnosisError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.translate_url.clone(),
        })
    }

    /// Extract the translation from a `translate_a/single` response.
    ///
    /// The body is a nested array whose first element lists sentence
    /// segments; the translated text of each segment is its first element.
    pub fn parse_response(body: &Value) -> std::result::Result<String, TranslationError> {
        let segments = body
            .get(0)
            .and_then(Value::as_array)
            .ok_or_else(|| TranslationError::MalformedResponse("missing segment list".to_string()))?;

        let translated: String = segments
            .iter()
            .filter_map(|segment| segment.get(0).and_then(Value::as_str))
            .collect();

        if translated.is_empty() {
            return Err(TranslationError::MalformedResponse(
                "no translated text in response".to_string(),
            ));
        }
        Ok(translated)
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(
        &self,
        text: &str,
        target: Language,
    ) -> std::result::Result<String, TranslationError> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", "auto"),
                ("tl", target.code()),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .map_err(|e| TranslationError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranslationError::Status(status.as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| TranslationError::MalformedResponse(e.to_string()))?;

        let translated = Self::parse_response(&body)?;
        debug!(language = target.code(), chars = translated.len(), "Translated");
        Ok(translated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_joins_segments() {
        let body = json!([
            [
                ["चेतावनी! ", "Warning! ", null, null, 10],
                ["यह एक सेब का पत्ता है।", "This is a Apple leaf.", null, null, 10]
            ],
            null,
            "en"
        ]);

        assert_eq!(
            GoogleTranslator::parse_response(&body).unwrap(),
            "चेतावनी! यह एक सेब का पत्ता है।"
        );
    }

    #[test]
    fn test_parse_rejects_unexpected_shapes() {
        for body in [json!({}), json!([]), json!([[]]), json!([[[null]]])] {
            assert!(matches!(
                GoogleTranslator::parse_response(&body),
                Err(TranslationError::MalformedResponse(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_blank_text_skips_the_network() {
        let config = ServiceConfig {
            translate_url: "http://127.0.0.1:9/unreachable".to_string(),
            ..ServiceConfig::default()
        };
        let translator = GoogleTranslator::new(&config).unwrap();

        assert_eq!(translator.translate("  ", Language::Hindi).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_request_error() {
        let config = ServiceConfig {
            translate_url: "http://127.0.0.1:9/unreachable".to_string(),
            timeout_secs: 2,
            ..ServiceConfig::default()
        };
        let translator = GoogleTranslator::new(&config).unwrap();

        let err = translator
            .translate("The Potato leaf is healthy!", Language::Tamil)
            .await
            .unwrap_err();
        assert!(matches!(err, TranslationError::Request(_)));
    }
}
