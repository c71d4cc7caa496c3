use crate::error::Result;

/// An embedding-model service: an opaque function from text to vector.
///
/// Implementations must return one vector per input text, in input order,
/// with a dimensionality that is constant for a given model.
pub trait EmbedProvider: Send + Sync {
    /// Embed a single text.
    ///
    /// # Errors
    ///
    /// Returns an error if the service call fails or the response is malformed.
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>>> + Send;

    /// Embed a batch of texts in one service call.
    ///
    /// # Errors
    ///
    /// Returns an error if the service call fails, the response is empty, or
    /// the vector count does not match the input count.
    fn embed_batch(&self, texts: &[String]) -> impl Future<Output = Result<Vec<Vec<f32>>>> + Send;

    /// Identifier of the embedding model, recorded alongside every vector.
    fn model(&self) -> &str;
}
