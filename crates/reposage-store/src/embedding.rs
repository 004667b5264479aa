//! Vector helpers: int8 quantization for storage and cosine top-k ranking.

use ndarray::Array1;

/// A float vector stored as one byte per dimension.
///
/// `original ≈ bytes * scale + offset`, mapping `[min, max]` onto `[0, 255]`.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizedVector {
    pub bytes: Vec<u8>,
    pub scale: f32,
    pub offset: f32,
}

impl QuantizedVector {
    pub fn quantize(vector: &Array1<f32>) -> Self {
        let min = vector.iter().copied().fold(f32::INFINITY, f32::min);
        let max = vector.iter().copied().fold(f32::NEG_INFINITY, f32::max);

        if vector.is_empty() || max - min < 1e-9 {
            return Self {
                bytes: vec![0; vector.len()],
                scale: 0.0,
                offset: if vector.is_empty() { 0.0 } else { min },
            };
        }

        let scale = (max - min) / 255.0;
        let bytes = vector
            .iter()
            .map(|&v| ((v - min) / scale).round().clamp(0.0, 255.0) as u8)
            .collect();

        Self {
            bytes,
            scale,
            offset: min,
        }
    }

    pub fn dequantize(&self) -> Array1<f32> {
        self.bytes
            .iter()
            .map(|&b| b as f32 * self.scale + self.offset)
            .collect()
    }
}

/// Scale `vector` to unit length. `None` for (near) zero vectors.
pub fn l2_normalize(vector: &Array1<f32>) -> Option<Array1<f32>> {
    let norm = vector.dot(vector).sqrt();
    (norm > 1e-9).then(|| vector / norm)
}

/// Indices of the `k` highest scores, best first. Ties keep insertion order.
pub fn top_k(scores: &[f32], k: usize) -> Vec<(usize, f32)> {
    let mut ranked: Vec<(usize, f32)> = scores.iter().copied().enumerate().collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(k);
    ranked
}
