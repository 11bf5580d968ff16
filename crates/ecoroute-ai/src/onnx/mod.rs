//! ONNX Runtime backed [`Provider`](crate::Provider).
//!
//! Model directories follow the Hugging Face ONNX export layout: `model.onnx`
//! and `tokenizer.json`, plus `config.json` for the NLI model's label mapping.

mod embedder;
mod nli;
mod provider;

pub use embedder::Embedder;
pub use nli::{NliClassifier, NliLabels};
pub use provider::{
    DEFAULT_EMBEDDING_MODEL, DEFAULT_HYPOTHESIS_TEMPLATE, DEFAULT_NLI_MODEL, OnnxConfig,
    OnnxProvider,
};

use ort::value::Tensor;
use tokenizers::Encoding;

/// Padded token batch, row-major `[rows, seq_len]`.
struct TokenBatch {
    rows: usize,
    seq_len: usize,
    input_ids: Vec<i64>,
    attention_mask: Vec<i64>,
    token_type_ids: Vec<i64>,
}

impl TokenBatch {
    fn from_encodings(encodings: &[Encoding]) -> Self {
        let rows = encodings.len();
        let seq_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);

        let mut batch = Self {
            rows,
            seq_len,
            input_ids: vec![0; rows * seq_len],
            attention_mask: vec![0; rows * seq_len],
            token_type_ids: vec![0; rows * seq_len],
        };
        for (i, encoding) in encodings.iter().enumerate() {
            let offset = i * seq_len;
            let row = offset..offset + encoding.get_ids().len();
            for (dst, &id) in batch.input_ids[row.clone()].iter_mut().zip(encoding.get_ids()) {
                *dst = id as i64;
            }
            for (dst, &m) in batch.attention_mask[row.clone()]
                .iter_mut()
                .zip(encoding.get_attention_mask())
            {
                *dst = m as i64;
            }
            for (dst, &t) in batch.token_type_ids[row].iter_mut().zip(encoding.get_type_ids()) {
                *dst = t as i64;
            }
        }
        batch
    }

    fn shape(&self) -> [i64; 2] {
        [self.rows as i64, self.seq_len as i64]
    }

    fn tensor(&self, values: &[i64]) -> ort::Result<Tensor<i64>> {
        Tensor::from_array((self.shape(), values.to_vec().into_boxed_slice()))
    }
}

fn tokenizer_error(context: &str) -> impl Fn(tokenizers::Error) -> anyhow::Error + '_ {
    move |e| anyhow::anyhow!("{context}: {e}")
}
