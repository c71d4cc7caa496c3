#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    /// The embedding service call itself failed (connection, HTTP, timeout).
    #[error("embedding request failed: {0}")]
    Request(String),

    /// The service answered but returned no vectors.
    #[error("empty embedding response from model {model}")]
    EmptyResponse { model: String },

    /// The service returned a different number of vectors than texts sent.
    #[error("malformed embedding response: sent {sent} texts, received {received} vectors")]
    CountMismatch { sent: usize, received: usize },
}

pub type Result<T> = std::result::Result<T, EmbedError>;
