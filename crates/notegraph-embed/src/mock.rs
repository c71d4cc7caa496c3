//! Test-only mock embedding provider.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::{EmbedError, Result};
use crate::provider::EmbedProvider;

/// Deterministic in-process embedder for tests.
///
/// Texts primed via [`MockEmbedder::with_fixture`] return the given vector;
/// everything else gets a vector derived from the text bytes, so distinct
/// texts get distinct but stable embeddings.
#[derive(Debug, Clone)]
pub struct MockEmbedder {
    dimensions: usize,
    fixtures: HashMap<String, Vec<f32>>,
    fail: bool,
    calls: Arc<Mutex<usize>>,
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self {
            dimensions: 4,
            fixtures: HashMap::new(),
            fail: false,
            calls: Arc::new(Mutex::new(0)),
        }
    }
}

impl MockEmbedder {
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_fixture(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.fixtures.insert(text.into(), vector);
        self
    }

    /// Number of service calls made so far (one per batch).
    #[must_use]
    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        if let Some(v) = self.fixtures.get(text) {
            return v.clone();
        }
        if self.dimensions == 0 {
            return Vec::new();
        }
        let mut vector = vec![0.0f32; self.dimensions];
        for (i, byte) in text.bytes().enumerate() {
            vector[i % self.dimensions] += f32::from(byte) / 255.0;
        }
        vector
    }
}

impl EmbedProvider for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let batch = self.embed_batch(&[text.to_owned()]).await?;
        Ok(batch.into_iter().next().unwrap_or_default())
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        *self.calls.lock().unwrap() += 1;
        if self.fail {
            return Err(EmbedError::Request("mock embed failure".into()));
        }
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }

    fn model(&self) -> &str {
        "mock-embed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deterministic_for_same_text() {
        let mock = MockEmbedder::new(4);
        let a = mock.embed("hello").await.unwrap();
        let b = mock.embed("hello").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 4);
    }

    #[tokio::test]
    async fn fixture_takes_precedence() {
        let mock = MockEmbedder::new(2).with_fixture("pinned", vec![1.0, 0.0]);
        let v = mock.embed("pinned").await.unwrap();
        assert_eq!(v, vec![1.0, 0.0]);
    }

    #[tokio::test]
    async fn batch_preserves_order_and_count() {
        let mock = MockEmbedder::new(3);
        let texts = vec!["a".to_owned(), "b".to_owned(), "c".to_owned()];
        let vectors = mock.embed_batch(&texts).await.unwrap();
        assert_eq!(vectors.len(), 3);
        assert_ne!(vectors[0], vectors[1]);
    }

    #[tokio::test]
    async fn failing_mock_errors() {
        let mock = MockEmbedder::failing();
        let result = mock.embed_batch(&["x".to_owned()]).await;
        assert!(matches!(result, Err(EmbedError::Request(_))));
    }

    #[tokio::test]
    async fn counts_batch_calls() {
        let mock = MockEmbedder::new(2);
        mock.embed_batch(&["a".to_owned(), "b".to_owned()])
            .await
            .unwrap();
        mock.embed("c").await.unwrap();
        assert_eq!(mock.calls(), 2);
    }
}
