mod client;
pub(crate) mod types;

use anyhow::{anyhow, Result};

use client::GeminiClient;
use types::GenerateRequest;

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

// =============================================================================
// Gemini
// =============================================================================

#[derive(Clone)]
pub struct Gemini {
    api_key: String,
    model: String,
    base_url: Option<String>,
    temperature: Option<f32>,
}

impl Gemini {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
            temperature: None,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn client(&self) -> GeminiClient {
        let client = GeminiClient::new(&self.api_key);
        if let Some(ref url) = self.base_url {
            client.with_base_url(url)
        } else {
            client
        }
    }

    /// Send a single user prompt and return the model's text.
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        let mut request = GenerateRequest::user(prompt);
        if let Some(t) = self.temperature {
            request = request.temperature(t);
        }

        let response = self.client().generate(&self.model, &request).await?;

        response.text().ok_or_else(|| {
            anyhow!(
                "No text in Gemini response (finish reason: {})",
                response.finish_reason().unwrap_or("unknown")
            )
        })
    }
}
