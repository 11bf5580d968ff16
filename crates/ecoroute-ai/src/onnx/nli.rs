//! Zero-shot classification with a natural-language-inference cross-encoder.
//!
//! Each candidate label is turned into a hypothesis ("This example is
//! environmental.") and scored against the text as premise. The model's
//! entailment and contradiction logits are then turned into label scores:
//!
//! - single choice: softmax of the entailment logits across all labels, so
//!   the scores sum to one;
//! - multi label: per label, softmax over (contradiction, entailment), so
//!   every label is judged on its own.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use ort::session::Session;
use serde::Deserialize;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use super::{TokenBatch, tokenizer_error};

const MAX_TOKENS: usize = 512;

/// Placeholder replaced by the label in a hypothesis template.
pub const LABEL_PLACEHOLDER: &str = "{}";

/// Logit columns of the entailment and contradiction classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NliLabels {
    pub entailment: usize,
    pub contradiction: usize,
}

#[derive(Debug, Deserialize)]
struct ModelConfig {
    #[serde(default)]
    label2id: HashMap<String, usize>,
    #[serde(default)]
    id2label: HashMap<String, String>,
}

impl NliLabels {
    /// Read the class mapping from a Hugging Face `config.json`.
    ///
    /// `label2id` is preferred; `id2label` is the fallback. Names are matched
    /// case-insensitively by prefix ("entail…", "contra…").
    pub fn from_config(json: &str) -> anyhow::Result<Self> {
        let config: ModelConfig = serde_json::from_str(json).context("parse config.json")?;

        let mut classes: Vec<(String, usize)> = config
            .label2id
            .into_iter()
            .map(|(name, id)| (name.to_lowercase(), id))
            .collect();
        if classes.is_empty() {
            for (id, name) in config.id2label {
                let id = id
                    .parse()
                    .with_context(|| format!("non-numeric id2label key {id:?}"))?;
                classes.push((name.to_lowercase(), id));
            }
        }

        let find = |prefix: &str| {
            classes
                .iter()
                .find(|(name, _)| name.starts_with(prefix))
                .map(|&(_, id)| id)
                .with_context(|| format!("config.json has no '{prefix}*' class"))
        };
        Ok(Self {
            entailment: find("entail")?,
            contradiction: find("contra")?,
        })
    }

    fn width(&self) -> usize {
        self.entailment.max(self.contradiction) + 1
    }
}

/// Fill `template` with `label`.
pub fn hypothesis(template: &str, label: &str) -> String {
    if template.contains(LABEL_PLACEHOLDER) {
        template.replace(LABEL_PLACEHOLDER, label)
    } else {
        format!("{template} {label}")
    }
}

/// Turn per-label NLI logits (`[labels, classes]`) into label scores.
pub fn zero_shot_scores(logits: &[Vec<f32>], classes: NliLabels, multi_label: bool) -> Vec<f32> {
    if multi_label {
        logits
            .iter()
            .map(|row| {
                let pair = softmax(&[row[classes.contradiction], row[classes.entailment]]);
                pair[1]
            })
            .collect()
    } else {
        let entail: Vec<f32> = logits.iter().map(|row| row[classes.entailment]).collect();
        softmax(&entail)
    }
}

fn softmax(xs: &[f32]) -> Vec<f32> {
    let max = xs.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = xs.iter().map(|x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

pub struct NliClassifier {
    session: Session,
    tokenizer: Tokenizer,
    classes: NliLabels,
    /// DeBERTa-v3 exports take no segment ids; BERT-style ones do.
    needs_token_types: bool,
}

impl NliClassifier {
    /// Load `model.onnx`, `tokenizer.json`, and `config.json` from `model_dir`.
    pub fn load(model_dir: &Path) -> anyhow::Result<Self> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let config_path = model_dir.join("config.json");

        for path in [&model_path, &tokenizer_path, &config_path] {
            anyhow::ensure!(path.exists(), "{} not found", path.display());
        }

        let classes = NliLabels::from_config(
            &std::fs::read_to_string(&config_path)
                .with_context(|| format!("read {}", config_path.display()))?,
        )?;

        let session = Session::builder()?
            .commit_from_file(&model_path)
            .with_context(|| format!("load {}", model_path.display()))?;
        let needs_token_types = session
            .inputs()
            .iter()
            .any(|input| input.name() == "token_type_ids");

        let mut tokenizer =
            Tokenizer::from_file(&tokenizer_path).map_err(tokenizer_error("load tokenizer"))?;
        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: MAX_TOKENS,
                ..Default::default()
            }))
            .map_err(tokenizer_error("set truncation"))?;
        tokenizer.with_padding(Some(tokenizers::PaddingParams::default()));

        info!(
            entailment = classes.entailment,
            contradiction = classes.contradiction,
            needs_token_types,
            model = %model_path.display(),
            "loaded zero-shot model"
        );
        Ok(Self {
            session,
            tokenizer,
            classes,
            needs_token_types,
        })
    }

    /// Score `text` against each label, in label order.
    pub fn classify(
        &mut self,
        text: &str,
        labels: &[String],
        template: &str,
        multi_label: bool,
    ) -> anyhow::Result<Vec<f32>> {
        if labels.is_empty() {
            return Ok(vec![]);
        }

        let hypotheses: Vec<String> = labels.iter().map(|l| hypothesis(template, l)).collect();
        let pairs: Vec<(&str, &str)> = hypotheses.iter().map(|h| (text, h.as_str())).collect();
        let encodings = self
            .tokenizer
            .encode_batch(pairs, true)
            .map_err(tokenizer_error("tokenize"))?;
        let batch = TokenBatch::from_encodings(&encodings);
        debug!(labels = labels.len(), seq_len = batch.seq_len, "scoring hypotheses");

        let outputs = if self.needs_token_types {
            self.session.run(ort::inputs![
                "input_ids" => batch.tensor(&batch.input_ids)?,
                "attention_mask" => batch.tensor(&batch.attention_mask)?,
                "token_type_ids" => batch.tensor(&batch.token_type_ids)?,
            ])?
        } else {
            self.session.run(ort::inputs![
                "input_ids" => batch.tensor(&batch.input_ids)?,
                "attention_mask" => batch.tensor(&batch.attention_mask)?,
            ])?
        };

        // Logits: [labels, classes].
        let (shape, data) = outputs[0].try_extract_tensor::<f32>()?;
        let dims: &[i64] = shape;
        anyhow::ensure!(
            dims.len() == 2
                && dims[0] as usize == labels.len()
                && dims[1] as usize >= self.classes.width(),
            "unexpected logits shape: {dims:?}"
        );
        let logits: Vec<Vec<f32>> = data
            .chunks(dims[1] as usize)
            .map(<[f32]>::to_vec)
            .collect();

        Ok(zero_shot_scores(&logits, self.classes, multi_label))
    }
}
