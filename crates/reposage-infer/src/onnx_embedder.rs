//! ONNX-based sentence-transformer embedder.
//!
//! Loads a SentenceTransformers ONNX export (all-MiniLM-L12-v2 or any model of
//! the same family) and its tokenizer. Requires the `onnx` feature.

#[cfg(feature = "onnx")]
mod inner {
    use std::path::Path;

    use ndarray::Array1;
    use ort::session::Session;
    use ort::value::Tensor;
    use parking_lot::Mutex;
    use tokenizers::Tokenizer;
    use tracing::info;

    use crate::embedder::{EmbedderBackend, EmbeddingResult};
    use reposage_core::{Error, Result};

    /// Maximum sequence length for the model.
    const MAX_SEQ_LEN: usize = 512;

    pub struct OnnxEmbedder {
        session: Mutex<Session>,
        tokenizer: Tokenizer,
        dimension: usize,
        model_id: String,
    }

    fn onnx_err<E: std::fmt::Display>(context: &'static str) -> impl Fn(E) -> Error {
        move |e| Error::Embedding(format!("{context}: {e}"))
    }

    impl OnnxEmbedder {
        /// Load `model.onnx` and `tokenizer.json` from `model_dir`.
        ///
        /// The output dimension is probed with a one-token inference so that
        /// the vector index can be opened with the matching width.
        pub fn load(model_dir: &Path) -> Result<Self> {
            let model_path = model_dir.join("model.onnx");
            let tokenizer_path = model_dir.join("tokenizer.json");

            if !model_path.exists() {
                return Err(Error::Embedding(format!(
                    "model not found: {}",
                    model_path.display()
                )));
            }
            if !tokenizer_path.exists() {
                return Err(Error::Embedding(format!(
                    "tokenizer not found: {}",
                    tokenizer_path.display()
                )));
            }

            // With load-dynamic, ORT_DYLIB_PATH must point to libonnxruntime.
            ort::init().commit();

            let session = Session::builder()
                .map_err(onnx_err("session builder"))?
                .with_intra_threads(2)
                .map_err(onnx_err("thread config"))?
                .commit_from_file(&model_path)
                .map_err(onnx_err("model load"))?;

            let tokenizer = Tokenizer::from_file(&tokenizer_path)
                .map_err(|e| Error::Embedding(format!("tokenizer load: {e}")))?;

            let model_id = model_dir
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| format!("onnx:{n}"))
                .unwrap_or_else(|| "onnx".into());

            let mut embedder = Self {
                session: Mutex::new(session),
                tokenizer,
                dimension: 0,
                model_id,
            };
            embedder.dimension = embedder.infer("dimension probe")?.len();

            info!(
                "ONNX embedder loaded: dim={}, model={}",
                embedder.dimension,
                model_path.display()
            );
            Ok(embedder)
        }

        /// Tokenize, run the session and mean-pool to one L2-normalized vector.
        fn infer(&self, text: &str) -> Result<Array1<f32>> {
            let encoding = self
                .tokenizer
                .encode(text, true)
                .map_err(|e| Error::Embedding(format!("tokenization: {e}")))?;

            let seq_len = encoding.get_ids().len().min(MAX_SEQ_LEN);
            let input_ids = &encoding.get_ids()[..seq_len];
            let attention_mask = &encoding.get_attention_mask()[..seq_len];

            let ids: Vec<i64> = input_ids.iter().map(|&id| id as i64).collect();
            let mask: Vec<i64> = attention_mask.iter().map(|&m| m as i64).collect();
            let type_ids = vec![0i64; seq_len];

            let ids = Tensor::from_array(([1usize, seq_len], ids)).map_err(onnx_err("ids tensor"))?;
            let mask_tensor =
                Tensor::from_array(([1usize, seq_len], mask)).map_err(onnx_err("mask tensor"))?;
            let type_ids = Tensor::from_array(([1usize, seq_len], type_ids))
                .map_err(onnx_err("type ids tensor"))?;

            let mut session = self.session.lock();
            let outputs = session
                .run(ort::inputs![ids, mask_tensor, type_ids])
                .map_err(onnx_err("inference"))?;

            // Either token embeddings [1, seq, dim] or pooled [1, dim].
            let (shape, data) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(onnx_err("output tensor"))?;
            let dims: Vec<i64> = shape.iter().copied().collect();

            let mut pooled = match dims.as_slice() {
                [1, _, dim] => {
                    let dim = *dim as usize;
                    let mut acc = Array1::<f32>::zeros(dim);
                    let mut weight = 0.0f32;
                    for (i, &m) in attention_mask.iter().enumerate() {
                        if m == 0 {
                            continue;
                        }
                        weight += 1.0;
                        let row = &data[i * dim..(i + 1) * dim];
                        acc.iter_mut().zip(row).for_each(|(a, v)| *a += v);
                    }
                    if weight < 1.0 {
                        return Err(Error::Embedding("empty attention mask".into()));
                    }
                    acc / weight
                }
                [1, dim] => Array1::from_vec(data[..*dim as usize].to_vec()),
                other => {
                    return Err(Error::Embedding(format!(
                        "unexpected output shape {other:?}"
                    )))
                }
            };

            let norm = pooled.dot(&pooled).sqrt();
            if norm > 1e-9 {
                pooled /= norm;
            }
            Ok(pooled)
        }
    }

    impl EmbedderBackend for OnnxEmbedder {
        fn embed(&self, text: &str) -> Result<EmbeddingResult> {
            Ok(EmbeddingResult {
                embedding: self.infer(text)?,
                cached: false,
            })
        }

        fn dimension(&self) -> usize {
            self.dimension
        }

        fn model_id(&self) -> &str {
            &self.model_id
        }
    }
}

#[cfg(feature = "onnx")]
pub use inner::OnnxEmbedder;
