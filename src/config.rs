use std::env;
use std::path::PathBuf;

use anyhow::Result;

/// Which extractor runs as the primary entity tier.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractorBackend {
    /// Google Natural Language API, requires GOOGLE_NLP_API_KEY
    Google,
    /// No remote calls; only the local ONNX NER model runs
    Local,
}

/// Central configuration loaded from environment variables.
///
/// All secrets come from env vars (never hardcoded). The .env file
/// is loaded automatically at startup via dotenvy.
pub struct Config {
    pub extractor_backend: ExtractorBackend,
    pub google_nlp_api_key: String,
    /// Natural Language API endpoint (defaults to the public v1 endpoint)
    pub google_nlp_api_url: String,
    /// Request pacing for the Natural Language API
    pub google_nlp_qps: f64,
    /// Directory containing the NER ONNX model files
    pub model_dir: PathBuf,
    /// Where `download-model` fetches the NER model from
    pub ner_model_url: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// The backend defaults to Google when an API key is present and to
    /// local-only otherwise.
    pub fn load() -> Result<Self> {
        let google_nlp_api_key = env::var("GOOGLE_NLP_API_KEY").unwrap_or_default();

        let extractor_backend = match env::var("TRENDFOLD_EXTRACTOR").as_deref() {
            Ok("google") => ExtractorBackend::Google,
            Ok("local") => ExtractorBackend::Local,
            Ok(other) => anyhow::bail!(
                "Unknown TRENDFOLD_EXTRACTOR value {other:?} (expected \"google\" or \"local\")"
            ),
            Err(_) if !google_nlp_api_key.is_empty() => ExtractorBackend::Google,
            Err(_) => ExtractorBackend::Local,
        };

        let google_nlp_qps = match env::var("GOOGLE_NLP_QPS") {
            Ok(raw) => raw
                .parse::<f64>()
                .ok()
                .filter(|qps| *qps > 0.0)
                .ok_or_else(|| anyhow::anyhow!("GOOGLE_NLP_QPS must be a positive number, got {raw:?}"))?,
            Err(_) => 5.0,
        };

        let model_dir = env::var("TRENDFOLD_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| crate::entities::download::default_model_dir());

        Ok(Self {
            extractor_backend,
            google_nlp_api_key,
            google_nlp_api_url: env::var("GOOGLE_NLP_API_URL")
                .unwrap_or_else(|_| crate::entities::google::DEFAULT_API_URL.to_string()),
            google_nlp_qps,
            model_dir,
            ner_model_url: env::var("TRENDFOLD_NER_MODEL_URL")
                .unwrap_or_else(|_| crate::entities::download::DEFAULT_NER_MODEL_URL.to_string()),
        })
    }

    /// Check that the Natural Language API key is configured.
    /// Call this before building the Google extractor.
    pub fn require_google(&self) -> Result<()> {
        if self.google_nlp_api_key.is_empty() {
            anyhow::bail!(
                "GOOGLE_NLP_API_KEY not set. Add it to your .env file,\n\
                 or set TRENDFOLD_EXTRACTOR=local to use only the local model."
            );
        }
        Ok(())
    }

    /// Check that the local NER model has been downloaded.
    /// The local tier backs every entity command, so this is always needed.
    pub fn require_local_model(&self) -> Result<()> {
        if !crate::entities::download::model_files_present(&self.model_dir) {
            anyhow::bail!(
                "NER model files not found in {}\n\
                 Run `trendfold download-model` to download them.",
                self.model_dir.display()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(key: &str, model_dir: PathBuf) -> Config {
        Config {
            extractor_backend: ExtractorBackend::Google,
            google_nlp_api_key: key.to_string(),
            google_nlp_api_url: crate::entities::google::DEFAULT_API_URL.to_string(),
            google_nlp_qps: 5.0,
            model_dir,
            ner_model_url: crate::entities::download::DEFAULT_NER_MODEL_URL.to_string(),
        }
    }

    #[test]
    fn test_require_google_rejects_empty_key() {
        let config = config_with("", std::env::temp_dir());
        let err = config.require_google().unwrap_err();
        assert!(err.to_string().contains("GOOGLE_NLP_API_KEY"));
    }

    #[test]
    fn test_require_google_accepts_key() {
        let config = config_with("test-key", std::env::temp_dir());
        assert!(config.require_google().is_ok());
    }

    #[test]
    fn test_require_local_model_points_at_download() {
        let dir = std::env::temp_dir().join("trendfold-config-test-missing");
        let config = config_with("", dir);
        let err = config.require_local_model().unwrap_err();
        assert!(err.to_string().contains("download-model"));
    }
}
