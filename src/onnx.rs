//! ONNX-backed models, run on CPU through tract.
//!
//! Both models take a model file and a HuggingFace `tokenizer.json`. A text
//! whose encoding exceeds the model's sequence limit is an inference error;
//! callers truncate or degrade.

use crate::error::{InsightError, Result};
use crate::sentiment::{PolarityModel, TransformerScores};
use crate::text::NormalizedText;
use crate::topic::{Embedder, Vocabulary};
use ndarray::{Array2, Array3, Axis};
use std::path::Path;
use std::sync::Arc;
use tokenizers::Tokenizer;
use tract_onnx::prelude::*;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Sequence limit of BERT-family encoders.
pub const MAX_SEQUENCE_TOKENS: usize = 512;

struct Encoded {
    input_ids: Vec<i64>,
    attention_mask: Vec<i64>,
    token_type_ids: Vec<i64>,
}

/// Shared model + tokenizer plumbing.
#[derive(Clone)]
struct OnnxEncoder {
    name: String,
    model: Arc<TractModel>,
    tokenizer: Arc<Tokenizer>,
    max_tokens: usize,
}

impl OnnxEncoder {
    fn load(name: &str, model_path: &Path, tokenizer_path: &Path) -> Result<Self> {
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .and_then(|m| m.into_optimized())
            .and_then(|m| m.into_runnable())
            .map_err(|e| InsightError::model_unavailable(name, e))?;
        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| InsightError::model_unavailable(name, e))?;
        tracing::info!(
            model = name,
            path = %model_path.display(),
            "loaded ONNX model"
        );
        Ok(Self {
            name: name.to_string(),
            model: Arc::new(model),
            tokenizer: Arc::new(tokenizer),
            max_tokens: MAX_SEQUENCE_TOKENS,
        })
    }

    fn encode(&self, text: &str) -> Result<Encoded> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| InsightError::model_unavailable(&self.name, e))?;
        let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| i64::from(id)).collect();
        if input_ids.len() > self.max_tokens {
            return Err(InsightError::model_unavailable(
                &self.name,
                format!(
                    "sequence of {} tokens exceeds limit of {}",
                    input_ids.len(),
                    self.max_tokens
                ),
            ));
        }
        Ok(Encoded {
            input_ids,
            attention_mask: encoding
                .get_attention_mask()
                .iter()
                .map(|&m| i64::from(m))
                .collect(),
            token_type_ids: encoding.get_type_ids().iter().map(|&t| i64::from(t)).collect(),
        })
    }

    /// Run one encoded sequence; returns the first output's shape and values.
    fn run(&self, encoded: &Encoded) -> Result<(Vec<usize>, Vec<f32>)> {
        let len = encoded.input_ids.len();
        let tensor = |data: &[i64]| {
            Tensor::from_shape(&[1, len], data)
                .map_err(|e| InsightError::model_unavailable(&self.name, e))
        };

        let mut inputs: TVec<TValue> = tvec![
            tensor(&encoded.input_ids)?.into(),
            tensor(&encoded.attention_mask)?.into(),
        ];
        if self.model.model().inputs.len() > 2 {
            inputs.push(tensor(&encoded.token_type_ids)?.into());
        }

        let outputs = self
            .model
            .run(inputs)
            .map_err(|e| InsightError::model_unavailable(&self.name, e))?;
        let first = outputs
            .first()
            .ok_or_else(|| InsightError::model_unavailable(&self.name, "model produced no output"))?;
        let view = first
            .to_array_view::<f32>()
            .map_err(|e| InsightError::model_unavailable(&self.name, e))?;
        Ok((view.shape().to_vec(), view.iter().copied().collect()))
    }
}

/// Three-class (negative, neutral, positive) sequence classifier.
#[derive(Clone)]
pub struct OnnxPolarityModel {
    encoder: OnnxEncoder,
}

impl OnnxPolarityModel {
    /// Load a classifier whose output is `[1, 3]` logits.
    ///
    /// # Errors
    ///
    /// `ModelUnavailable` when either file cannot be loaded.
    pub fn load(model_path: &Path, tokenizer_path: &Path) -> Result<Self> {
        Ok(Self {
            encoder: OnnxEncoder::load("transformer", model_path, tokenizer_path)?,
        })
    }
}

impl PolarityModel for OnnxPolarityModel {
    fn name(&self) -> &str {
        &self.encoder.name
    }

    fn predict(&self, text: &str) -> Result<TransformerScores> {
        let encoded = self.encoder.encode(text)?;
        let (_, logits) = self.encoder.run(&encoded)?;
        if logits.len() != 3 {
            return Err(InsightError::dimension_mismatch("polarity logits", 3, logits.len()));
        }
        Ok(TransformerScores::from_logits([
            f64::from(logits[0]),
            f64::from(logits[1]),
            f64::from(logits[2]),
        ]))
    }
}

/// Sentence embedder: mean pooling over the attention mask, then L2 norm.
#[derive(Clone)]
pub struct OnnxEmbedder {
    encoder: OnnxEncoder,
}

impl OnnxEmbedder {
    /// Load an encoder whose first output is `[1, seq_len, hidden]`.
    ///
    /// # Errors
    ///
    /// `ModelUnavailable` when either file cannot be loaded.
    pub fn load(model_path: &Path, tokenizer_path: &Path) -> Result<Self> {
        Ok(Self {
            encoder: OnnxEncoder::load("embedder", model_path, tokenizer_path)?,
        })
    }

    fn embed_text(&self, text: &str) -> Result<Vec<f64>> {
        let encoded = self.encoder.encode(text)?;
        let (shape, values) = self.encoder.run(&encoded)?;
        let [batch, seq_len, hidden] = shape[..] else {
            return Err(InsightError::dimension_mismatch(
                "embedder output rank",
                3,
                shape.len(),
            ));
        };
        let hidden_states = Array3::from_shape_vec((batch, seq_len, hidden), values)
            .map_err(|e| InsightError::model_unavailable(&self.encoder.name, e))?;
        let mask = Array2::from_shape_vec(
            (1, encoded.attention_mask.len()),
            encoded.attention_mask.clone(),
        )
        .map_err(|e| InsightError::model_unavailable(&self.encoder.name, e))?;
        Ok(mean_pool(&hidden_states, &mask))
    }
}

impl Embedder for OnnxEmbedder {
    fn name(&self) -> &str {
        &self.encoder.name
    }

    fn embed(&self, _vocabulary: &Vocabulary, text: &NormalizedText) -> Result<Vec<f64>> {
        self.embed_text(&text.clean_text)
    }
}

/// Mean of the unmasked token vectors of the first sequence, L2-normalized.
fn mean_pool(hidden_states: &Array3<f32>, mask: &Array2<i64>) -> Vec<f64> {
    let tokens = hidden_states.index_axis(Axis(0), 0);
    let hidden = tokens.shape()[1];
    let mut pooled = vec![0.0f64; hidden];
    let mut count = 0.0;
    for (t, row) in tokens.axis_iter(Axis(0)).enumerate() {
        if mask.get((0, t)).copied().unwrap_or(0) == 0 {
            continue;
        }
        count += 1.0;
        for (p, &v) in pooled.iter_mut().zip(row.iter()) {
            *p += f64::from(v);
        }
    }
    if count > 0.0 {
        pooled.iter_mut().for_each(|p| *p /= count);
    }
    let norm = pooled.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > 0.0 {
        pooled.iter_mut().for_each(|p| *p /= norm);
    }
    pooled
}
