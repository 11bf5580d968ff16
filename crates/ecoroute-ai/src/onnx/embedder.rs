//! Sentence embeddings from a sentence-transformers ONNX export.
//!
//! Token embeddings are mean-pooled under the attention mask and
//! L2-normalized, so the dot product of two outputs is their cosine
//! similarity. all-MiniLM-L6-v2 gives 384 dimensions.

use std::path::Path;

use anyhow::Context;
use ort::session::Session;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use super::{TokenBatch, tokenizer_error};

/// Longest token sequence fed to the model; MiniLM was trained on 256.
const MAX_TOKENS: usize = 256;
const FALLBACK_DIM: usize = 384;

pub struct Embedder {
    session: Session,
    tokenizer: Tokenizer,
    dim: usize,
}

impl Embedder {
    /// Load `model.onnx` and `tokenizer.json` from `model_dir`.
    pub fn load(model_dir: &Path) -> anyhow::Result<Self> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        anyhow::ensure!(model_path.exists(), "model.onnx not found in {model_dir:?}");
        anyhow::ensure!(
            tokenizer_path.exists(),
            "tokenizer.json not found in {model_dir:?}"
        );

        let session = Session::builder()?
            .commit_from_file(&model_path)
            .with_context(|| format!("load {}", model_path.display()))?;
        let dim = session
            .outputs()
            .first()
            .and_then(|o| infer_dim(o.dtype()))
            .unwrap_or(FALLBACK_DIM);

        let mut tokenizer =
            Tokenizer::from_file(&tokenizer_path).map_err(tokenizer_error("load tokenizer"))?;
        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: MAX_TOKENS,
                ..Default::default()
            }))
            .map_err(tokenizer_error("set truncation"))?;
        tokenizer.with_padding(Some(tokenizers::PaddingParams::default()));

        info!(dim, model = %model_path.display(), "loaded embedding model");
        Ok(Self {
            session,
            tokenizer,
            dim,
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn embed(&mut self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text])?
            .pop()
            .context("model returned no embedding")
    }

    /// One unit-length vector per input, in input order.
    pub fn embed_batch(&mut self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(tokenizer_error("tokenize"))?;
        let batch = TokenBatch::from_encodings(&encodings);
        debug!(rows = batch.rows, seq_len = batch.seq_len, "embedding batch");

        let outputs = self.session.run(ort::inputs![
            "input_ids" => batch.tensor(&batch.input_ids)?,
            "attention_mask" => batch.tensor(&batch.attention_mask)?,
            "token_type_ids" => batch.tensor(&batch.token_type_ids)?,
        ])?;

        // Token embeddings: [rows, seq_len, dim].
        let (shape, data) = outputs[0].try_extract_tensor::<f32>()?;
        check_token_shape(shape, batch.rows, batch.seq_len, self.dim)?;

        Ok(mean_pool(
            data,
            &batch.attention_mask,
            batch.rows,
            batch.seq_len,
            self.dim,
        ))
    }
}

/// The token output must share the mask's `[rows, seq_len]` layout.
fn check_token_shape(
    dims: &[i64],
    rows: usize,
    seq_len: usize,
    dim: usize,
) -> anyhow::Result<()> {
    anyhow::ensure!(
        dims.len() == 3
            && dims[0] as usize == rows
            && dims[1] as usize == seq_len
            && dims[2] as usize == dim,
        "unexpected output shape: {dims:?}, expected [{rows}, {seq_len}, {dim}]"
    );
    Ok(())
}

/// Masked mean over the token axis, then L2 normalization.
///
/// `mask` is `[rows, seq_len]`; `tokens` is `[rows, seq_len, dim]`.
fn mean_pool(
    tokens: &[f32],
    mask: &[i64],
    rows: usize,
    seq_len: usize,
    dim: usize,
) -> Vec<Vec<f32>> {
    (0..rows)
        .map(|i| {
            let mut pooled = vec![0.0f32; dim];
            let mut count = 0.0f32;
            for j in 0..seq_len {
                let m = mask[i * seq_len + j] as f32;
                if m > 0.0 {
                    let offset = (i * seq_len + j) * dim;
                    for (p, t) in pooled.iter_mut().zip(&tokens[offset..offset + dim]) {
                        *p += t * m;
                    }
                    count += m;
                }
            }
            if count > 0.0 {
                pooled.iter_mut().for_each(|p| *p /= count);
            }
            normalize(&mut pooled);
            pooled
        })
        .collect()
}

fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
}

/// Last dimension of the first output, when the export declares it.
fn infer_dim(output_type: &ort::value::ValueType) -> Option<usize> {
    match output_type {
        ort::value::ValueType::Tensor { shape, .. } => {
            shape.last().and_then(|&d| (d > 0).then_some(d as usize))
        }
        _ => None,
    }
}
