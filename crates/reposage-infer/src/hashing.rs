//! Deterministic feature-hashing embedder.
//!
//! Each lowercase alphanumeric token is hashed with SHA-256 into one of `dim`
//! buckets with a ±1 sign, and the bucket vector is L2-normalized. Texts that
//! share vocabulary land close together under cosine similarity, which is enough
//! for lexical retrieval without model files or network access.

use ndarray::Array1;
use sha2::{Digest, Sha256};

use crate::embedder::{EmbedderBackend, EmbeddingResult};
use reposage_core::{Error, Result};

pub struct HashingEmbedder {
    dim: usize,
    model_id: String,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            model_id: format!("feature-hash-sha256-{dim}"),
        }
    }

    fn bucket(&self, token: &str) -> (usize, f32) {
        let digest = Sha256::digest(token.as_bytes());
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        let index = (u64::from_le_bytes(head) % self.dim as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        (index, sign)
    }
}

/// Split text into lowercase alphanumeric tokens.
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

impl EmbedderBackend for HashingEmbedder {
    fn embed(&self, text: &str) -> Result<EmbeddingResult> {
        if self.dim == 0 {
            return Err(Error::Embedding("embedding dimension is zero".into()));
        }

        let mut embedding = Array1::<f32>::zeros(self.dim);
        for token in tokenize(text) {
            let (index, sign) = self.bucket(&token);
            embedding[index] += sign;
        }

        let norm = embedding.dot(&embedding).sqrt();
        if norm > 1e-9 {
            embedding /= norm;
        }

        Ok(EmbeddingResult {
            embedding,
            cached: false,
        })
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
