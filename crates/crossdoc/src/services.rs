//! AI and speech service clients.
//!
//! Every external call sits behind a small trait so the coordinator, the
//! relevance matcher, and the session driver can be exercised against plain
//! test doubles. The production implementations are a rig Ollama client for
//! the text services and a reqwest client for speech synthesis.

use rig::client::CompletionClient;
use rig::completion::Prompt;
use rig::providers::ollama;

use crossdoc_core::corpus::CorpusHeading;
use crossdoc_core::prompt::{
    build_extraction_prompt, build_insights_prompt, build_narration_prompt, build_ranking_prompt,
};

const EXTRACTION_PREAMBLE: &str = "\
You extract the structural outline of documents.
You receive a document as per-page plain text and respond with a JSON array
of heading objects. Respond with the array only: no markdown fences, no
explanations, no commentary.";

const RANKING_PREAMBLE: &str = "\
You rank document headings by relevance to a selected passage.
You respond with a JSON array of the most relevant headings, in descending
order of relevance. Respond with the array only: no markdown fences, no
explanations, no commentary.";

const INSIGHTS_PREAMBLE: &str = "\
You are a careful reading assistant. You summarize passages concisely and
factually, in plain prose.";

const NARRATION_PREAMBLE: &str = "\
You write short spoken narration scripts. Plain prose only, suitable for
text-to-speech: no markup, no stage directions.";

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("failed to create AI client: {0}")]
    Client(String),

    #[error("AI request failed: {0}")]
    Completion(String),

    #[error("speech synthesis failed: {0}")]
    Speech(String),
}

/// Endpoint and model for the text AI services.
#[derive(Debug, Clone, clap::Args)]
pub struct AiOptions {
    /// Ollama base URL
    #[clap(long, env = "OLLAMA_URL", default_value = "http://localhost:11434")]
    pub ollama_url: String,

    /// Model used for extraction, ranking, insights, and narration scripts
    #[clap(long, env = "CROSSDOC_MODEL", default_value = "llama3.1")]
    pub model: String,
}

/// Endpoint, model, and voice for speech synthesis.
#[derive(Debug, Clone, clap::Args)]
pub struct SpeechOptions {
    /// Speech synthesis base URL (OpenAI-compatible /v1/audio/speech)
    #[clap(long, env = "SPEECH_URL", default_value = "http://localhost:8880")]
    pub speech_url: String,

    /// Speech synthesis model
    #[clap(long, env = "SPEECH_MODEL", default_value = "tts-1")]
    pub speech_model: String,

    /// Voice preset
    #[clap(long, env = "SPEECH_VOICE", default_value = "alloy")]
    pub voice: String,
}

/// Whole-document heading extraction. Returns the raw model response; the
/// caller applies the JSON array contract.
#[allow(async_fn_in_trait)]
pub trait HeadingExtractionService {
    async fn extract_headings(
        &self,
        name: &str,
        pages: &[String],
    ) -> Result<String, ServiceError>;
}

/// Selection-against-corpus ranking. Returns the raw model response.
#[allow(async_fn_in_trait)]
pub trait RankingService {
    async fn rank_sections(
        &self,
        selection: &str,
        corpus: &[CorpusHeading],
    ) -> Result<String, ServiceError>;
}

/// Selection-driven prose generation: insight summaries and narration
/// scripts.
#[allow(async_fn_in_trait)]
pub trait AssistService {
    async fn summarize_insights(
        &self,
        selection: &str,
        section_titles: &[String],
    ) -> Result<String, ServiceError>;

    async fn narration_script(&self, selection: &str) -> Result<String, ServiceError>;
}

/// Text-to-speech conversion of a narration script.
#[allow(async_fn_in_trait)]
pub trait SpeechService {
    async fn synthesize(&self, script: &str) -> Result<Vec<u8>, ServiceError>;
}

/// Production text services backed by a rig Ollama client.
pub struct OllamaService {
    client: ollama::Client,
    model: String,
}

impl OllamaService {
    pub fn connect(options: &AiOptions) -> Result<Self, ServiceError> {
        use rig::client::Nothing;

        let client = ollama::Client::builder()
            .api_key(Nothing)
            .base_url(&options.ollama_url)
            .build()
            .map_err(|e| ServiceError::Client(e.to_string()))?;

        Ok(Self {
            client,
            model: options.model.clone(),
        })
    }

    async fn complete(&self, preamble: &str, prompt: &str) -> Result<String, ServiceError> {
        let agent = self.client.agent(&self.model).preamble(preamble).build();

        agent
            .prompt(prompt)
            .await
            .map_err(|e| ServiceError::Completion(e.to_string()))
    }
}

impl HeadingExtractionService for OllamaService {
    async fn extract_headings(
        &self,
        name: &str,
        pages: &[String],
    ) -> Result<String, ServiceError> {
        let prompt = build_extraction_prompt(name, pages);
        log::debug!("extraction prompt for {name}: {} chars", prompt.len());
        self.complete(EXTRACTION_PREAMBLE, &prompt).await
    }
}

impl RankingService for OllamaService {
    async fn rank_sections(
        &self,
        selection: &str,
        corpus: &[CorpusHeading],
    ) -> Result<String, ServiceError> {
        let prompt = build_ranking_prompt(selection, corpus);
        self.complete(RANKING_PREAMBLE, &prompt).await
    }
}

impl AssistService for OllamaService {
    async fn summarize_insights(
        &self,
        selection: &str,
        section_titles: &[String],
    ) -> Result<String, ServiceError> {
        let prompt = build_insights_prompt(selection, section_titles);
        self.complete(INSIGHTS_PREAMBLE, &prompt).await
    }

    async fn narration_script(&self, selection: &str) -> Result<String, ServiceError> {
        let prompt = build_narration_prompt(selection);
        self.complete(NARRATION_PREAMBLE, &prompt).await
    }
}

/// Speech synthesis against an OpenAI-compatible audio endpoint.
pub struct HttpSpeechService {
    client: reqwest::Client,
    base_url: String,
    model: String,
    voice: String,
}

impl HttpSpeechService {
    pub fn new(options: &SpeechOptions) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: options.speech_url.trim_end_matches('/').to_string(),
            model: options.speech_model.clone(),
            voice: options.voice.clone(),
        }
    }
}

impl SpeechService for HttpSpeechService {
    async fn synthesize(&self, script: &str) -> Result<Vec<u8>, ServiceError> {
        let response = self
            .client
            .post(format!("{}/v1/audio/speech", self.base_url))
            .json(&serde_json::json!({
                "model": self.model,
                "voice": self.voice,
                "input": script,
            }))
            .send()
            .await
            .map_err(|e| ServiceError::Speech(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ServiceError::Speech(format!(
                "speech endpoint returned {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ServiceError::Speech(e.to_string()))?;

        Ok(bytes.to_vec())
    }
}
