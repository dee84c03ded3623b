//! Embedding adapter.
//!
//! `Embedder` is the seam between the core and whatever actually turns text
//! into vectors. [`LocalEmbedder`] is a deterministic, dependency-free
//! stand-in good enough to drive the bandit's warm-start math and the
//! vector index's nearest-neighbor search in tests and offline runs.
//! [`ExternalEmbedder`] (behind the `external-embed` feature) calls out to a
//! real embedding service over HTTP and falls back to the local adapter on
//! transport failure, so an unreachable service degrades the quality of
//! results rather than taking the whole request path down.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use tracing::warn;

use crate::error::CoreResult;
use crate::model::EntityClass;

/// Default vector width used by [`LocalEmbedder`] and the configuration
/// default.
pub const DEFAULT_EMBEDDING_DIM: usize = 768;

/// Turns entity text into a fixed-width, unit-norm vector. `class` is
/// available to implementations that want to condition the embedding on
/// which collection it will be stored in; [`LocalEmbedder`] ignores it.
pub trait Embedder: Send + Sync {
    fn embed(&self, class: EntityClass, text: &str) -> CoreResult<Vec<f32>>;
    fn dimension(&self) -> usize;
}

/// Deterministic, hash-based embedder. Two calls with the same text always
/// produce the same vector, which is what lets the bandit's warm-start
/// tests assert on exact similarity values instead of tolerating drift.
pub struct LocalEmbedder {
    dim: usize,
}

impl LocalEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl Default for LocalEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_EMBEDDING_DIM)
    }
}

impl Embedder for LocalEmbedder {
    fn embed(&self, _class: EntityClass, text: &str) -> CoreResult<Vec<f32>> {
        Ok(unit_norm(deterministic_vector(text, self.dim)))
    }

    fn dimension(&self) -> usize {
        self.dim
    }
}

fn deterministic_vector(text: &str, dim: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(dim);
    for i in 0..dim {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        i.hash(&mut hasher);
        let h = hasher.finish();
        let v = (h as f64) / (u64::MAX as f64);
        out.push(((v * 2.0) - 1.0) as f32);
    }
    out
}

fn unit_norm(mut v: Vec<f32>) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
    v
}

/// HTTP-backed embedder for a real embedding service, falling back to a
/// [`LocalEmbedder`] of the same dimension on any transport error so a
/// single unreachable dependency degrades quality rather than availability.
#[cfg(feature = "external-embed")]
pub struct ExternalEmbedder {
    endpoint: String,
    client: reqwest::blocking::Client,
    fallback: LocalEmbedder,
}

#[cfg(feature = "external-embed")]
impl ExternalEmbedder {
    pub fn new(endpoint: impl Into<String>, dim: usize, timeout: std::time::Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::blocking::Client::builder()
                .timeout(timeout)
                .build()
                .expect("reqwest client builds with a valid timeout"),
            fallback: LocalEmbedder::new(dim),
        }
    }
}

#[cfg(feature = "external-embed")]
#[derive(serde::Serialize)]
struct EmbedRequest<'a> {
    text: &'a str,
}

#[cfg(feature = "external-embed")]
#[derive(serde::Deserialize)]
struct EmbedResponse {
    vector: Vec<f32>,
}

#[cfg(feature = "external-embed")]
impl Embedder for ExternalEmbedder {
    fn embed(&self, class: EntityClass, text: &str) -> CoreResult<Vec<f32>> {
        let result = self
            .client
            .post(&self.endpoint)
            .json(&EmbedRequest { text })
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<EmbedResponse>());

        match result {
            Ok(body) => Ok(unit_norm(body.vector)),
            Err(err) => {
                warn!(error = %err, "external embedding service unreachable, falling back to local embedder");
                self.fallback.embed(class, text)
            }
        }
    }

    fn dimension(&self) -> usize {
        self.fallback.dimension()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embeddings_are_deterministic() {
        let embedder = LocalEmbedder::new(32);
        let a = embedder.embed(EntityClass::Candidate, "rust systems engineer").unwrap();
        let b = embedder.embed(EntityClass::Candidate, "rust systems engineer").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn embeddings_are_unit_norm() {
        let embedder = LocalEmbedder::new(32);
        let v = embedder.embed(EntityClass::Candidate, "anything").unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    fn distinct_text_yields_distinct_vectors() {
        let embedder = LocalEmbedder::new(32);
        let a = embedder.embed(EntityClass::Candidate, "rust").unwrap();
        let b = embedder.embed(EntityClass::Candidate, "python").unwrap();
        assert_ne!(a, b);
    }
}
