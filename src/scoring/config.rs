use serde::{Deserialize, Serialize};

/// Remote classifier settings. The API key itself is read from `api_key_env` at startup
/// and never written to the settings file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ClassifierSettings {
    pub enabled: bool,
    /// Base URL of the text-generation API.
    pub endpoint: String,
    pub model: String,
    pub api_key_env: String,
    /// Budget for the single request-response cycle.
    pub timeout_secs: u64,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://generativelanguage.googleapis.com/v1beta".into(),
            model: "gemini-pro".into(),
            api_key_env: "GREENTRACE_CLASSIFIER_KEY".into(),
            timeout_secs: 10,
        }
    }
}

impl ClassifierSettings {
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}
