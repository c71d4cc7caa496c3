use ollama_rs::Ollama;
use ollama_rs::generation::embeddings::request::{EmbeddingsInput, GenerateEmbeddingsRequest};

use crate::error::{EmbedError, Result};
use crate::provider::EmbedProvider;

/// Embedding client backed by an Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: Ollama,
    model: String,
}

impl OllamaEmbedder {
    #[must_use]
    pub fn new(base_url: &str, model: String) -> Self {
        let (host, port) = parse_host_port(base_url);
        Self {
            client: Ollama::new(host, port),
            model,
        }
    }

    async fn request(&self, input: EmbeddingsInput, sent: usize) -> Result<Vec<Vec<f32>>> {
        let request = GenerateEmbeddingsRequest::new(self.model.clone(), input);

        let response = self
            .client
            .generate_embeddings(request)
            .await
            .map_err(|e| EmbedError::Request(format!("Ollama embedding request failed: {e}")))?;

        if response.embeddings.is_empty() {
            return Err(EmbedError::EmptyResponse {
                model: self.model.clone(),
            });
        }
        if response.embeddings.len() != sent {
            return Err(EmbedError::CountMismatch {
                sent,
                received: response.embeddings.len(),
            });
        }

        tracing::debug!(model = %self.model, count = response.embeddings.len(), "embeddings generated");
        Ok(response.embeddings)
    }
}

impl EmbedProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self
            .request(EmbeddingsInput::Single(text.to_owned()), 1)
            .await?;
        Ok(vectors.remove(0))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(EmbeddingsInput::Multiple(texts.to_vec()), texts.len())
            .await
    }

    fn model(&self) -> &str {
        &self.model
    }
}

fn parse_host_port(url: &str) -> (String, u16) {
    let url = url.trim_end_matches('/');
    if let Some(colon_pos) = url.rfind(':') {
        let port_str = &url[colon_pos + 1..];
        if let Ok(port) = port_str.parse::<u16>() {
            let host = url[..colon_pos].to_string();
            return (host, port);
        }
    }
    (url.to_string(), 11434)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_host_port_with_port() {
        let (host, port) = parse_host_port("http://localhost:11434");
        assert_eq!(host, "http://localhost");
        assert_eq!(port, 11434);
    }

    #[test]
    fn parse_host_port_without_port() {
        let (host, port) = parse_host_port("http://localhost");
        assert_eq!(host, "http://localhost");
        assert_eq!(port, 11434);
    }

    #[test]
    fn parse_host_port_trailing_slash() {
        let (host, port) = parse_host_port("http://127.0.0.1:11434/");
        assert_eq!(host, "http://127.0.0.1");
        assert_eq!(port, 11434);
    }

    #[test]
    fn model_accessor() {
        let embedder = OllamaEmbedder::new("http://localhost:11434", "nomic-embed-text".into());
        assert_eq!(embedder.model(), "nomic-embed-text");
    }
}
