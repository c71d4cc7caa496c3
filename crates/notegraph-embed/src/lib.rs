//! Embedding-model service client for notegraph.
//!
//! The engine treats the embedding model as an opaque function from text to
//! vector behind the [`EmbedProvider`] trait. The shipped implementation
//! talks to an Ollama server; a deterministic mock is available for tests
//! behind the `mock` feature.

pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod ollama;
pub mod provider;

pub use error::{EmbedError, Result};
pub use provider::EmbedProvider;
