use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ClassificationError;

use super::classifier::{ClassificationSource, Classified, ProductClassifier};
use super::config::ClassifierSettings;
use super::factors::{
    FactorLabel, Packaging, ProductClassification, ProductionProcess, RawMaterials, ShelfLife,
    Transportation,
};

// Set to true to log prompts and raw responses at debug level
const ENABLE_LOGS: bool = false;

use crate::log_debug;

/// Classifies products by prompting a text-generation service for one label per dimension.
///
/// Exactly one request per call: no retries, bounded by the client timeout.
pub struct RemoteClassifier {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<RequestContent>,
}

#[derive(Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
}

#[derive(Debug, Deserialize)]
struct ResponseCandidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl RemoteClassifier {
    pub fn new(settings: &ClassifierSettings) -> Result<Self, ClassificationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .build()?;

        Ok(Self {
            client,
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            api_key: settings.api_key(),
        })
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

#[async_trait]
impl ProductClassifier for RemoteClassifier {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn classify(
        &self,
        product_name: &str,
        category: &str,
    ) -> Result<Classified, ClassificationError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(ClassificationError::Unavailable("no API key configured".into()));
        };

        let prompt = build_prompt(product_name, category);
        log_debug!("classifier prompt for '{}': {}", product_name, prompt);

        let body = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(self.url())
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClassificationError::Status(status.as_u16()));
        }

        let payload: GenerateResponse = response.json().await?;
        let text = extract_text(&payload).ok_or(ClassificationError::EmptyResponse)?;
        log_debug!("classifier response for '{}': {}", product_name, text);

        Ok(Classified {
            classification: parse_classification(&text)?,
            source: ClassificationSource::Remote,
        })
    }
}

fn options<T: FactorLabel>() -> String {
    T::ALL
        .iter()
        .map(|label| label.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn build_prompt(product_name: &str, category: &str) -> String {
    format!(
        "Analyze the environmental impact of the following product and provide a JSON response with these exact keys:
{{
  \"rawMaterials\": one of [{}],
  \"productionProcess\": one of [{}],
  \"packaging\": one of [{}],
  \"transportation\": one of [{}],
  \"shelfLife\": one of [{}]
}}

Product Name: {product_name}
Category: {category}

Consider raw material sustainability, production process complexity, typical packaging \
requirements, common transportation distances and expected shelf life.

Respond only with the JSON object, no additional text.",
        options::<RawMaterials>(),
        options::<ProductionProcess>(),
        options::<Packaging>(),
        options::<Transportation>(),
        options::<ShelfLife>(),
    )
}

fn extract_text(payload: &GenerateResponse) -> Option<String> {
    let text: String = payload
        .candidates
        .first()?
        .content
        .as_ref()?
        .parts
        .iter()
        .filter_map(|part| part.text.as_deref())
        .collect();
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Parses model output into a classification, tolerating markdown fences and prose
/// around the JSON object. Output with no recognizable dimension is malformed.
pub fn parse_classification(text: &str) -> Result<ProductClassification, ClassificationError> {
    let start = text
        .find('{')
        .ok_or_else(|| ClassificationError::Malformed("no JSON object in response".into()))?;
    let end = text
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| ClassificationError::Malformed("unterminated JSON object".into()))?;

    let classification: ProductClassification = serde_json::from_str(&text[start..=end])
        .map_err(|err| ClassificationError::Malformed(err.to_string()))?;

    if classification.recognized_dimensions() == 0 {
        return Err(ClassificationError::Malformed(
            "no recognized dimension labels".into(),
        ));
    }
    Ok(classification)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fenced_json() {
        let text = "```json\n{\"rawMaterials\": \"organic\", \"productionProcess\": \"traditional\", \
                    \"packaging\": \"minimal\", \"transportation\": \"local\", \"shelfLife\": \"veryShort\"}\n```";
        let classification = parse_classification(text).unwrap();
        assert_eq!(classification.recognized_dimensions(), 5);
        assert_eq!(crate::scoring::compute_score(&classification), 100);
    }

    #[test]
    fn partial_answers_keep_recognized_dimensions() {
        let classification =
            parse_classification(r#"{"packaging": "plastic", "shelfLife": "forever"}"#).unwrap();
        assert_eq!(classification.packaging, Some(Packaging::Plastic));
        assert_eq!(classification.shelf_life, None);
    }

    #[test]
    fn rejects_unparseable_output() {
        assert!(matches!(
            parse_classification("I cannot help with that."),
            Err(ClassificationError::Malformed(_))
        ));
        assert!(matches!(
            parse_classification("{\"rawMaterials\": "),
            Err(ClassificationError::Malformed(_))
        ));
        assert!(matches!(
            parse_classification(r#"{"colour": "green"}"#),
            Err(ClassificationError::Malformed(_))
        ));
    }

    #[test]
    fn extracts_concatenated_candidate_text() {
        let payload: GenerateResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "{\"packaging\":"}, {"text": " \"minimal\"}"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(
            extract_text(&payload).as_deref(),
            Some("{\"packaging\": \"minimal\"}")
        );

        let empty: GenerateResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert_eq!(extract_text(&empty), None);
    }

    #[test]
    fn prompt_lists_every_label() {
        let prompt = build_prompt("jowar", "Grains");
        assert!(prompt.contains("Product Name: jowar"));
        assert!(prompt.contains("semiAutomated"));
        assert!(prompt.contains("veryShort"));
        assert!(prompt.contains("international"));
    }

    #[tokio::test]
    async fn missing_key_is_unavailable() {
        let settings = ClassifierSettings {
            api_key_env: "GREENTRACE_TEST_UNSET_KEY".into(),
            ..ClassifierSettings::default()
        };
        let classifier = RemoteClassifier::new(&settings).unwrap();
        assert!(matches!(
            classifier.classify("bread", "Bakery").await,
            Err(ClassificationError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transport_error() {
        let settings = ClassifierSettings {
            endpoint: "http://127.0.0.1:9".into(),
            timeout_secs: 2,
            ..ClassifierSettings::default()
        };
        let classifier = RemoteClassifier::new(&settings).unwrap().with_api_key("test");
        assert!(matches!(
            classifier.classify("bread", "Bakery").await,
            Err(ClassificationError::Transport(_))
        ));
    }
}
